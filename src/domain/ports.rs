use super::account::{Account, AccountType};
use super::transaction::{NewLeg, TransactionLeg};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Shared handle to a store implementation, injected into the engine.
pub type StoreHandle = Arc<dyn WalletStore>;

/// Storage port for accounts and the transaction ledger.
///
/// Plain reads run outside any atomic unit. Everything that mutates balances
/// or appends legs goes through a [`StoreTx`] obtained from [`begin`], so the
/// store transaction is the sole concurrency-control boundary.
///
/// [`begin`]: WalletStore::begin
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Creates an account with zero balance, no PIN and active status.
    async fn create_account(
        &self,
        user_id: i64,
        display_name: &str,
        account_number: &str,
        account_type: AccountType,
    ) -> Result<Account>;

    async fn account_by_number(&self, account_number: &str) -> Result<Option<Account>>;

    async fn account_by_user(&self, user_id: i64) -> Result<Option<Account>>;

    async fn account_by_id(&self, account_id: i64) -> Result<Option<Account>>;

    /// All accounts ordered by id; used for final-state reporting.
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Opens one atomic unit. All reads and writes made through the returned
    /// handle commit or roll back as a whole.
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;

    async fn transaction_by_id(&self, leg_id: i64) -> Result<Option<TransactionLeg>>;

    /// Legs where the account is the debited sender or the credited
    /// receiver, newest first.
    async fn transactions_for_account(&self, account_id: i64) -> Result<Vec<TransactionLeg>>;
}

/// One open atomic unit against the store.
///
/// Balance mutations require the account row to be locked via
/// [`lock_accounts`] first; implementations must acquire locks in ascending
/// account-id order so concurrent multi-account units cannot deadlock.
/// Dropping an uncommitted unit discards its writes.
///
/// [`lock_accounts`]: StoreTx::lock_accounts
#[async_trait]
pub trait StoreTx: Send {
    async fn account_by_number(&mut self, account_number: &str) -> Result<Option<Account>>;

    /// Takes exclusive row locks on the given accounts, held until the unit
    /// ends. Ids are locked in ascending order regardless of argument order.
    async fn lock_accounts(&mut self, account_ids: &[i64]) -> Result<()>;

    /// Applies `delta` to a locked account's balance and returns the new
    /// balance. Fails with `InsufficientFunds` if the result would be
    /// negative; the write only becomes visible at commit.
    async fn adjust_balance(&mut self, account_id: i64, delta: Decimal) -> Result<Decimal>;

    /// Stores a PIN hash for a locked account. Fails with `PinAlreadySet` if
    /// one exists; the hash is write-once.
    async fn set_pin_hash(&mut self, account_id: i64, hash: &str) -> Result<()>;

    /// Appends a leg, assigning its id and timestamp. Fails with
    /// `DuplicateReference` if the reference already exists or is reserved by
    /// another open unit.
    async fn append_leg(&mut self, leg: NewLeg) -> Result<TransactionLeg>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
