use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LegType {
    Credit,
    Debit,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LegCategory {
    Funding,
    Transfer,
    Withdrawal,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LegStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Wallet,
    Card,
    Bank,
    Ussd,
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wallet" => Ok(Channel::Wallet),
            "card" => Ok(Channel::Card),
            "bank" => Ok(Channel::Bank),
            "ussd" => Ok(Channel::Ussd),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Channel::Wallet => "wallet",
            Channel::Card => "card",
            Channel::Bank => "bank",
            Channel::Ussd => "ussd",
        };
        f.write_str(s)
    }
}

/// A leg awaiting insertion; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewLeg {
    pub reference: Uuid,
    pub sender_account_id: Option<i64>,
    pub receiver_account_id: Option<i64>,
    pub leg_type: LegType,
    pub category: LegCategory,
    pub amount: Decimal,
    pub status: LegStatus,
    pub description: String,
    pub channel: Channel,
    pub currency: String,
    pub group_reference: Option<Uuid>,
}

/// One recorded debit or credit entry in the append-only ledger.
///
/// Immutable after creation. A transfer produces exactly two legs sharing one
/// `group_reference`; funding and withdrawal produce one leg each.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransactionLeg {
    pub id: i64,
    /// Globally unique external identifier for this leg.
    pub reference: Uuid,
    pub sender_account_id: Option<i64>,
    pub receiver_account_id: Option<i64>,
    pub leg_type: LegType,
    pub category: LegCategory,
    pub amount: Decimal,
    pub status: LegStatus,
    pub description: String,
    pub channel: Channel,
    pub currency: String,
    /// Links the two legs produced by one transfer.
    pub group_reference: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TransactionLeg {
    /// Ownership check: a leg belongs to the account that was debited or
    /// credited by it, not to anyone who knows its id.
    pub fn visible_to(&self, account_id: i64) -> bool {
        match self.leg_type {
            LegType::Debit => self.sender_account_id == Some(account_id),
            LegType::Credit => self.receiver_account_id == Some(account_id),
        }
    }
}

pub const DEFAULT_CURRENCY: &str = "NGN";
