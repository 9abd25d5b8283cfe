use crate::domain::account::{Account, AccountType};
use crate::domain::ports::{StoreTx, WalletStore};
use crate::domain::transaction::{NewLeg, TransactionLeg};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};
use uuid::Uuid;

/// In-memory store providing single-node ACID atomic units.
///
/// Each account row lives behind its own `tokio::sync::Mutex`, which plays
/// the role of a relational row lock: an open unit that has locked a row
/// blocks every other unit (and plain read) touching the same account until
/// it commits or rolls back. Units touching disjoint accounts proceed fully
/// in parallel. Writes are staged inside the unit and only become visible at
/// commit.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    catalog: Arc<Mutex<Catalog>>,
    ledger: Arc<Mutex<Ledger>>,
}

#[derive(Default)]
struct Catalog {
    rows: HashMap<i64, Arc<RowLock<Account>>>,
    by_number: HashMap<String, i64>,
    by_user: HashMap<i64, i64>,
    next_account_id: i64,
}

#[derive(Default)]
struct Ledger {
    legs: Vec<TransactionLeg>,
    /// Committed references plus those reserved by open units.
    refs: HashSet<Uuid>,
    next_leg_id: i64,
}

fn locked<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| WalletError::TransientStoreFailure("store mutex poisoned".into()))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn row(&self, account_id: i64) -> Result<Option<Arc<RowLock<Account>>>> {
        let catalog = locked(&self.catalog)?;
        Ok(catalog.rows.get(&account_id).cloned())
    }

    async fn read_row(&self, account_id: i64) -> Result<Option<Account>> {
        match self.row(account_id)? {
            Some(row) => Ok(Some(row.lock().await.clone())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl WalletStore for InMemoryStore {
    async fn create_account(
        &self,
        user_id: i64,
        display_name: &str,
        account_number: &str,
        account_type: AccountType,
    ) -> Result<Account> {
        let mut catalog = locked(&self.catalog)?;
        if catalog.by_number.contains_key(account_number) {
            return Err(WalletError::Unexpected(format!(
                "account number {account_number} already exists"
            )));
        }
        catalog.next_account_id += 1;
        let id = catalog.next_account_id;
        let account = Account::new(
            id,
            user_id,
            account_number.to_string(),
            display_name.to_string(),
            account_type,
        );
        catalog.by_number.insert(account_number.to_string(), id);
        catalog.by_user.insert(user_id, id);
        catalog.rows.insert(id, Arc::new(RowLock::new(account.clone())));
        Ok(account)
    }

    async fn account_by_number(&self, account_number: &str) -> Result<Option<Account>> {
        let id = {
            let catalog = locked(&self.catalog)?;
            catalog.by_number.get(account_number).copied()
        };
        match id {
            Some(id) => self.read_row(id).await,
            None => Ok(None),
        }
    }

    async fn account_by_user(&self, user_id: i64) -> Result<Option<Account>> {
        let id = {
            let catalog = locked(&self.catalog)?;
            catalog.by_user.get(&user_id).copied()
        };
        match id {
            Some(id) => self.read_row(id).await,
            None => Ok(None),
        }
    }

    async fn account_by_id(&self, account_id: i64) -> Result<Option<Account>> {
        self.read_row(account_id).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows: Vec<Arc<RowLock<Account>>> = {
            let catalog = locked(&self.catalog)?;
            catalog.rows.values().cloned().collect()
        };
        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            accounts.push(row.lock().await.clone());
        }
        accounts.sort_by_key(|account| account.id);
        Ok(accounts)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        Ok(Box::new(InMemoryTx {
            store: self.clone(),
            row_guards: BTreeMap::new(),
            staged_balances: HashMap::new(),
            staged_pins: HashMap::new(),
            staged_legs: Vec::new(),
            reserved_refs: Vec::new(),
            finished: false,
        }))
    }

    async fn transaction_by_id(&self, leg_id: i64) -> Result<Option<TransactionLeg>> {
        let ledger = locked(&self.ledger)?;
        Ok(ledger.legs.iter().find(|leg| leg.id == leg_id).cloned())
    }

    async fn transactions_for_account(&self, account_id: i64) -> Result<Vec<TransactionLeg>> {
        let ledger = locked(&self.ledger)?;
        let mut legs: Vec<TransactionLeg> = ledger
            .legs
            .iter()
            .filter(|leg| leg.visible_to(account_id))
            .cloned()
            .collect();
        legs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(legs)
    }
}

/// One open atomic unit against [`InMemoryStore`].
///
/// Keyed by `BTreeMap` so held guards release in a deterministic order;
/// acquisition order is enforced in [`lock_accounts`](StoreTx::lock_accounts).
pub struct InMemoryTx {
    store: InMemoryStore,
    row_guards: BTreeMap<i64, OwnedMutexGuard<Account>>,
    staged_balances: HashMap<i64, Decimal>,
    staged_pins: HashMap<i64, String>,
    staged_legs: Vec<TransactionLeg>,
    reserved_refs: Vec<Uuid>,
    finished: bool,
}

impl InMemoryTx {
    fn guard(&self, account_id: i64) -> Result<&OwnedMutexGuard<Account>> {
        self.row_guards.get(&account_id).ok_or_else(|| {
            WalletError::Unexpected(format!("account {account_id} accessed without row lock"))
        })
    }

    fn release_reservations(&mut self) {
        if let Ok(mut ledger) = self.store.ledger.lock() {
            for reference in self.reserved_refs.drain(..) {
                ledger.refs.remove(&reference);
            }
        }
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn account_by_number(&mut self, account_number: &str) -> Result<Option<Account>> {
        let id = {
            let catalog = locked(&self.store.catalog)?;
            catalog.by_number.get(account_number).copied()
        };
        let Some(id) = id else { return Ok(None) };
        // Serve rows this unit already holds from the guard, so a re-read
        // inside the unit cannot block on its own lock.
        if let Some(guard) = self.row_guards.get(&id) {
            let mut account = (**guard).clone();
            if let Some(balance) = self.staged_balances.get(&id) {
                account.balance = *balance;
            }
            return Ok(Some(account));
        }
        self.store.read_row(id).await
    }

    async fn lock_accounts(&mut self, account_ids: &[i64]) -> Result<()> {
        // Canonical ascending order makes deadlock between concurrent
        // multi-account units structurally impossible.
        let mut ids: Vec<i64> = account_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        for id in ids {
            if self.row_guards.contains_key(&id) {
                continue;
            }
            let row = self.store.row(id)?.ok_or_else(|| {
                WalletError::Unexpected(format!("account {id} vanished before lock"))
            })?;
            let guard = row.lock_owned().await;
            self.row_guards.insert(id, guard);
        }
        Ok(())
    }

    async fn adjust_balance(&mut self, account_id: i64, delta: Decimal) -> Result<Decimal> {
        let committed = self.guard(account_id)?.balance;
        let current = self
            .staged_balances
            .get(&account_id)
            .copied()
            .unwrap_or(committed);
        let next = current + delta;
        if next < Decimal::ZERO {
            return Err(WalletError::InsufficientFunds);
        }
        self.staged_balances.insert(account_id, next);
        Ok(next)
    }

    async fn set_pin_hash(&mut self, account_id: i64, hash: &str) -> Result<()> {
        if self.guard(account_id)?.pin_hash.is_some()
            || self.staged_pins.contains_key(&account_id)
        {
            return Err(WalletError::PinAlreadySet);
        }
        self.staged_pins.insert(account_id, hash.to_string());
        Ok(())
    }

    async fn append_leg(&mut self, leg: NewLeg) -> Result<TransactionLeg> {
        let mut ledger = locked(&self.store.ledger)?;
        if !ledger.refs.insert(leg.reference) {
            return Err(WalletError::DuplicateReference(leg.reference));
        }
        self.reserved_refs.push(leg.reference);
        ledger.next_leg_id += 1;
        let stored = TransactionLeg {
            id: ledger.next_leg_id,
            reference: leg.reference,
            sender_account_id: leg.sender_account_id,
            receiver_account_id: leg.receiver_account_id,
            leg_type: leg.leg_type,
            category: leg.category,
            amount: leg.amount,
            status: leg.status,
            description: leg.description,
            channel: leg.channel,
            currency: leg.currency,
            group_reference: leg.group_reference,
            created_at: Utc::now(),
        };
        self.staged_legs.push(stored.clone());
        Ok(stored)
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let balances: Vec<(i64, Decimal)> = self.staged_balances.drain().collect();
        for (account_id, balance) in balances {
            if let Some(guard) = self.row_guards.get_mut(&account_id) {
                guard.balance = balance;
            }
        }
        let pins: Vec<(i64, String)> = self.staged_pins.drain().collect();
        for (account_id, hash) in pins {
            if let Some(guard) = self.row_guards.get_mut(&account_id) {
                guard.pin_hash = Some(hash);
            }
        }
        let mut staged = std::mem::take(&mut self.staged_legs);
        {
            let mut ledger = locked(&self.store.ledger)?;
            ledger.legs.append(&mut staged);
        }
        self.reserved_refs.clear();
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.release_reservations();
        self.finished = true;
        Ok(())
    }
}

impl Drop for InMemoryTx {
    fn drop(&mut self) {
        // A unit dropped without commit must not keep its references
        // reserved, or a retried request would hit DuplicateReference forever.
        if !self.finished {
            self.release_reservations();
        }
    }
}
