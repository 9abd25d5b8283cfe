use crate::application::pin;
use crate::domain::account::Amount;
use crate::domain::ports::{StoreHandle, StoreTx};
use crate::domain::transaction::{
    Channel, DEFAULT_CURRENCY, LegCategory, LegStatus, LegType, NewLeg, TransactionLeg,
};
use crate::error::{Result, WalletError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundRequest {
    pub account_number: String,
    pub amount: Decimal,
    /// Where the inbound value came from (bank, card, ussd).
    pub source: Channel,
    /// Caller-supplied idempotency key; becomes the leg reference so a
    /// retried request fails with `DuplicateReference` instead of
    /// double-crediting.
    pub client_reference: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender_account_number: String,
    pub recipient_account_number: String,
    pub amount: Decimal,
    pub pin: String,
    pub client_reference: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub account_number: String,
    pub amount: Decimal,
    pub bank_name: String,
    pub pin: String,
    pub client_reference: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundReceipt {
    pub reference: Uuid,
    pub account_number: String,
    pub amount: Decimal,
    pub new_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReceipt {
    pub group_reference: Uuid,
    pub debit_reference: Uuid,
    pub credit_reference: Uuid,
    pub sender_account_number: String,
    pub recipient_account_number: String,
    pub recipient_name: String,
    pub amount: Decimal,
    /// Sender's balance after the transfer.
    pub new_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawalReceipt {
    pub reference: Uuid,
    pub account_number: String,
    pub bank_name: String,
    pub amount: Decimal,
    pub new_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Orchestrates funding, transfers and withdrawals as atomic units.
///
/// Each operation opens one unit against the injected store, performs its
/// checks and mutations under row locks, appends the ledger legs, and commits
/// or rolls back as a whole. No balance is cached outside the unit.
pub struct TransferEngine {
    store: StoreHandle,
}

impl TransferEngine {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Credits inbound value from outside the wallet network. No PIN: the
    /// money is arriving, not leaving.
    pub async fn fund(&self, req: FundRequest) -> Result<FundReceipt> {
        let amount = Amount::new(req.amount)?;
        let mut tx = self.store.begin().await?;
        match fund_in_tx(tx.as_mut(), &req, amount).await {
            Ok(receipt) => {
                tx.commit().await?;
                tracing::info!(
                    reference = %receipt.reference,
                    account = %receipt.account_number,
                    amount = %receipt.amount,
                    "wallet funded"
                );
                Ok(receipt)
            }
            Err(err) => abort("fund", tx, err).await,
        }
    }

    /// Moves value between two wallet accounts, PIN-gated on the sender.
    pub async fn transfer(&self, req: TransferRequest) -> Result<TransferReceipt> {
        let amount = Amount::new(req.amount)?;
        let mut tx = self.store.begin().await?;
        match transfer_in_tx(tx.as_mut(), &req, amount).await {
            Ok(receipt) => {
                tx.commit().await?;
                tracing::info!(
                    group_reference = %receipt.group_reference,
                    sender = %receipt.sender_account_number,
                    recipient = %receipt.recipient_account_number,
                    amount = %receipt.amount,
                    "transfer completed"
                );
                Ok(receipt)
            }
            Err(err) => abort("transfer", tx, err).await,
        }
    }

    /// Debits value out to an external bank, PIN-gated.
    pub async fn withdraw(&self, req: WithdrawRequest) -> Result<WithdrawalReceipt> {
        let amount = Amount::new(req.amount)?;
        let mut tx = self.store.begin().await?;
        match withdraw_in_tx(tx.as_mut(), &req, amount).await {
            Ok(receipt) => {
                tx.commit().await?;
                tracing::info!(
                    reference = %receipt.reference,
                    account = %receipt.account_number,
                    amount = %receipt.amount,
                    "withdrawal completed"
                );
                Ok(receipt)
            }
            Err(err) => abort("withdraw", tx, err).await,
        }
    }

    /// A single leg, visible only to the account it debited or credited.
    pub async fn transaction(
        &self,
        leg_id: i64,
        owner_account_id: i64,
    ) -> Result<Option<TransactionLeg>> {
        let leg = self.store.transaction_by_id(leg_id).await?;
        Ok(leg.filter(|leg| leg.visible_to(owner_account_id)))
    }

    /// All legs touching the account, newest first.
    pub async fn transactions(&self, owner_account_id: i64) -> Result<Vec<TransactionLeg>> {
        self.store.transactions_for_account(owner_account_id).await
    }
}

async fn abort<T>(op: &str, tx: Box<dyn StoreTx>, err: WalletError) -> Result<T> {
    if let Err(rb) = tx.rollback().await {
        tracing::error!(operation = op, error = %rb, "rollback failed");
    }
    match &err {
        WalletError::Unexpected(detail) => {
            tracing::error!(operation = op, %detail, "operation failed")
        }
        other => tracing::warn!(operation = op, error = %other, "operation rejected"),
    }
    Err(err)
}

async fn fund_in_tx(
    tx: &mut dyn StoreTx,
    req: &FundRequest,
    amount: Amount,
) -> Result<FundReceipt> {
    let account = tx
        .account_by_number(&req.account_number)
        .await?
        .ok_or_else(|| WalletError::AccountNotFound(req.account_number.clone()))?;

    tx.lock_accounts(&[account.id]).await?;
    let new_balance = tx.adjust_balance(account.id, amount.value()).await?;

    let leg = tx
        .append_leg(NewLeg {
            reference: req.client_reference.unwrap_or_else(Uuid::new_v4),
            sender_account_id: None,
            receiver_account_id: Some(account.id),
            leg_type: LegType::Credit,
            category: LegCategory::Funding,
            amount: amount.value(),
            status: LegStatus::Success,
            description: format!("Wallet funded via {}", req.source),
            channel: req.source,
            currency: DEFAULT_CURRENCY.into(),
            group_reference: None,
        })
        .await?;

    Ok(FundReceipt {
        reference: leg.reference,
        account_number: account.account_number,
        amount: amount.value(),
        new_balance,
        created_at: leg.created_at,
    })
}

async fn transfer_in_tx(
    tx: &mut dyn StoreTx,
    req: &TransferRequest,
    amount: Amount,
) -> Result<TransferReceipt> {
    let sender = tx
        .account_by_number(&req.sender_account_number)
        .await?
        .ok_or_else(|| WalletError::AccountNotFound(req.sender_account_number.clone()))?;
    let recipient = tx
        .account_by_number(&req.recipient_account_number)
        .await?
        .ok_or_else(|| WalletError::RecipientNotFound(req.recipient_account_number.clone()))?;

    if sender.id == recipient.id {
        return Err(WalletError::SameAccountTransfer);
    }

    pin::check_pin(&sender, &req.pin)?;

    // Both rows locked in ascending-id order; the balance check happens
    // after acquisition, against the locked value.
    tx.lock_accounts(&[sender.id, recipient.id]).await?;
    let new_balance = tx.adjust_balance(sender.id, -amount.value()).await?;
    tx.adjust_balance(recipient.id, amount.value()).await?;

    let group_reference = Uuid::new_v4();
    let debit = tx
        .append_leg(NewLeg {
            reference: req.client_reference.unwrap_or_else(Uuid::new_v4),
            sender_account_id: Some(sender.id),
            receiver_account_id: Some(recipient.id),
            leg_type: LegType::Debit,
            category: LegCategory::Transfer,
            amount: amount.value(),
            status: LegStatus::Success,
            description: format!("Transfer to {}", recipient.account_number),
            channel: Channel::Wallet,
            currency: DEFAULT_CURRENCY.into(),
            group_reference: Some(group_reference),
        })
        .await?;
    let credit = tx
        .append_leg(NewLeg {
            reference: Uuid::new_v4(),
            sender_account_id: Some(sender.id),
            receiver_account_id: Some(recipient.id),
            leg_type: LegType::Credit,
            category: LegCategory::Transfer,
            amount: amount.value(),
            status: LegStatus::Success,
            description: format!("Received from {}", sender.account_number),
            channel: Channel::Wallet,
            currency: DEFAULT_CURRENCY.into(),
            group_reference: Some(group_reference),
        })
        .await?;

    Ok(TransferReceipt {
        group_reference,
        debit_reference: debit.reference,
        credit_reference: credit.reference,
        sender_account_number: sender.account_number,
        recipient_account_number: recipient.account_number,
        recipient_name: recipient.display_name,
        amount: amount.value(),
        new_balance,
        created_at: debit.created_at,
    })
}

async fn withdraw_in_tx(
    tx: &mut dyn StoreTx,
    req: &WithdrawRequest,
    amount: Amount,
) -> Result<WithdrawalReceipt> {
    let account = tx
        .account_by_number(&req.account_number)
        .await?
        .ok_or_else(|| WalletError::AccountNotFound(req.account_number.clone()))?;

    pin::check_pin(&account, &req.pin)?;

    tx.lock_accounts(&[account.id]).await?;
    let new_balance = tx.adjust_balance(account.id, -amount.value()).await?;

    let leg = tx
        .append_leg(NewLeg {
            reference: req.client_reference.unwrap_or_else(Uuid::new_v4),
            sender_account_id: Some(account.id),
            receiver_account_id: None,
            leg_type: LegType::Debit,
            category: LegCategory::Withdrawal,
            amount: amount.value(),
            status: LegStatus::Success,
            description: format!("Withdrawal to {}", req.bank_name),
            channel: Channel::Bank,
            currency: DEFAULT_CURRENCY.into(),
            group_reference: None,
        })
        .await?;

    Ok(WithdrawalReceipt {
        reference: leg.reference,
        account_number: account.account_number,
        bank_name: req.bank_name.clone(),
        amount: amount.value(),
        new_balance,
        created_at: leg.created_at,
    })
}
