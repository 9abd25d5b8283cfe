use crate::domain::account::Account;
use crate::domain::ports::StoreHandle;
use crate::error::{Result, WalletError};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Argon2, PasswordHash, PasswordVerifier};

/// Per-account transaction-PIN management.
///
/// Only a salted Argon2 hash is ever stored; verification goes through the
/// Argon2 verifier, whose digest comparison is constant-time.
#[derive(Clone)]
pub struct PinVault {
    store: StoreHandle,
}

impl PinVault {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Sets the transaction PIN for an account. The hash is write-once:
    /// a second call fails with `PinAlreadySet`.
    pub async fn set_pin(&self, account_id: i64, pin: &str) -> Result<()> {
        let hash = hash_pin(pin)?;
        let mut tx = self.store.begin().await?;
        tx.lock_accounts(&[account_id]).await?;
        match tx.set_pin_hash(account_id, &hash).await {
            Ok(()) => tx.commit().await,
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    /// Verifies an account's PIN: `PinNotSet` if none exists, `InvalidPin`
    /// on mismatch.
    pub async fn verify_pin(&self, account_id: i64, pin: &str) -> Result<()> {
        let account = self
            .store
            .account_by_id(account_id)
            .await?
            .ok_or_else(|| WalletError::AccountNotFound(account_id.to_string()))?;
        check_pin(&account, pin)
    }
}

pub(crate) fn hash_pin(pin: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| WalletError::Unexpected(format!("pin hashing failed: {err}")))
}

/// PIN check against an already-loaded account row, used by the engine
/// inside its own atomic unit.
pub(crate) fn check_pin(account: &Account, pin: &str) -> Result<()> {
    let stored = account.pin_hash.as_deref().ok_or(WalletError::PinNotSet)?;
    let parsed = PasswordHash::new(stored)
        .map_err(|err| WalletError::Unexpected(format!("stored pin hash unreadable: {err}")))?;
    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed)
        .map_err(|_| WalletError::InvalidPin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::AccountType;
    use crate::domain::ports::WalletStore;
    use crate::infrastructure::in_memory::InMemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_hash_and_check_round_trip() {
        let mut account = Account::new(1, 1, "A1".into(), "Ada".into(), AccountType::Wallet);
        account.pin_hash = Some(hash_pin("4321").unwrap());
        assert!(check_pin(&account, "4321").is_ok());
        assert!(matches!(
            check_pin(&account, "1234"),
            Err(WalletError::InvalidPin)
        ));
    }

    #[test]
    fn test_check_without_pin_set() {
        let account = Account::new(1, 1, "A1".into(), "Ada".into(), AccountType::Wallet);
        assert!(matches!(
            check_pin(&account, "4321"),
            Err(WalletError::PinNotSet)
        ));
    }

    #[tokio::test]
    async fn test_set_pin_once() {
        let store = Arc::new(InMemoryStore::new());
        let account = store
            .create_account(1, "Ada", "A1", AccountType::Wallet)
            .await
            .unwrap();
        let vault = PinVault::new(store.clone());

        vault.set_pin(account.id, "4321").await.unwrap();
        assert!(matches!(
            vault.set_pin(account.id, "9999").await,
            Err(WalletError::PinAlreadySet)
        ));

        vault.verify_pin(account.id, "4321").await.unwrap();
        assert!(matches!(
            vault.verify_pin(account.id, "9999").await,
            Err(WalletError::InvalidPin)
        ));
    }

    #[tokio::test]
    async fn test_verify_before_set() {
        let store = Arc::new(InMemoryStore::new());
        let account = store
            .create_account(1, "Ada", "A1", AccountType::Wallet)
            .await
            .unwrap();
        let vault = PinVault::new(store.clone());
        assert!(matches!(
            vault.verify_pin(account.id, "4321").await,
            Err(WalletError::PinNotSet)
        ));
    }
}
