use crate::error::WalletError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A strictly positive monetary amount entering the engine.
///
/// Wraps `rust_decimal::Decimal` so a non-positive value can never reach
/// balance arithmetic, even if upstream validation let one through.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, WalletError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(WalletError::InvalidAmount)
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = WalletError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Wallet,
    Savings,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Suspended,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Closed => "closed",
        }
    }
}

/// One wallet balance record tied to one user.
///
/// Accounts are created once with a zero balance and no PIN, mutated only by
/// engine operations, and never hard-deleted; `status` models closure.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    /// Store-assigned identifier, also the row-lock key.
    pub id: i64,
    pub user_id: i64,
    /// Externally visible unique account number.
    pub account_number: String,
    pub account_type: AccountType,
    /// Owner name shown on transfer receipts.
    pub display_name: String,
    /// Current balance; never negative.
    pub balance: Decimal,
    /// Argon2 hash of the transaction PIN. Write-once; never the plaintext.
    #[serde(skip_serializing, default)]
    pub pin_hash: Option<String>,
    pub status: AccountStatus,
}

impl Account {
    pub fn new(
        id: i64,
        user_id: i64,
        account_number: String,
        display_name: String,
        account_type: AccountType,
    ) -> Self {
        Self {
            id,
            user_id,
            account_number,
            account_type,
            display_name,
            balance: Decimal::ZERO,
            pin_hash: None,
            status: AccountStatus::Active,
        }
    }
}
