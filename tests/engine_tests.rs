use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;
use wallet_ledger::application::engine::{
    FundRequest, TransferEngine, TransferRequest, WithdrawRequest,
};
use wallet_ledger::application::pin::PinVault;
use wallet_ledger::domain::account::{Account, AccountType};
use wallet_ledger::domain::ports::WalletStore;
use wallet_ledger::domain::transaction::{Channel, LegCategory, LegStatus, LegType};
use wallet_ledger::error::WalletError;
use wallet_ledger::infrastructure::in_memory::InMemoryStore;

struct Fixture {
    store: Arc<InMemoryStore>,
    engine: TransferEngine,
    vault: PinVault,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let engine = TransferEngine::new(store.clone());
        let vault = PinVault::new(store.clone());
        Self {
            store,
            engine,
            vault,
        }
    }

    async fn open(&self, user_id: i64, name: &str, number: &str) -> Account {
        self.store
            .create_account(user_id, name, number, AccountType::Wallet)
            .await
            .unwrap()
    }

    async fn fund(&self, number: &str, amount: Decimal) {
        self.engine
            .fund(FundRequest {
                account_number: number.into(),
                amount,
                source: Channel::Bank,
                client_reference: None,
            })
            .await
            .unwrap();
    }

    async fn balance(&self, account_id: i64) -> Decimal {
        self.store
            .account_by_id(account_id)
            .await
            .unwrap()
            .unwrap()
            .balance
    }
}

fn transfer_req(sender: &str, recipient: &str, amount: Decimal, pin: &str) -> TransferRequest {
    TransferRequest {
        sender_account_number: sender.into(),
        recipient_account_number: recipient.into(),
        amount,
        pin: pin.into(),
        client_reference: None,
    }
}

#[tokio::test]
async fn test_transfer_conserves_value() {
    let fx = Fixture::new();
    let a = fx.open(1, "Ada Obi", "A1").await;
    let b = fx.open(2, "Bola Eze", "B1").await;
    fx.vault.set_pin(a.id, "4321").await.unwrap();
    fx.fund("A1", dec!(500.00)).await;

    let receipt = fx
        .engine
        .transfer(transfer_req("A1", "B1", dec!(200.00), "4321"))
        .await
        .unwrap();

    assert_eq!(fx.balance(a.id).await, dec!(300.00));
    assert_eq!(fx.balance(b.id).await, dec!(200.00));
    assert_eq!(
        fx.balance(a.id).await + fx.balance(b.id).await,
        dec!(500.00)
    );

    let debit_legs = fx.engine.transactions(a.id).await.unwrap();
    let credit_legs = fx.engine.transactions(b.id).await.unwrap();
    let debit = &debit_legs[0];
    let credit = &credit_legs[0];
    assert_eq!(debit.leg_type, LegType::Debit);
    assert_eq!(debit.category, LegCategory::Transfer);
    assert_eq!(credit.leg_type, LegType::Credit);
    assert_eq!(credit.category, LegCategory::Transfer);
    assert_eq!(debit.group_reference, Some(receipt.group_reference));
    assert_eq!(credit.group_reference, Some(receipt.group_reference));
    assert_eq!(debit.amount, credit.amount);
    assert_eq!(receipt.recipient_name, "Bola Eze");
}

#[tokio::test]
async fn test_self_transfer_always_rejected() {
    let fx = Fixture::new();
    let a = fx.open(1, "Ada", "A1").await;
    fx.vault.set_pin(a.id, "4321").await.unwrap();
    fx.fund("A1", dec!(100.00)).await;

    // Rejected regardless of PIN correctness or balance.
    for pin in ["4321", "0000"] {
        let err = fx
            .engine
            .transfer(transfer_req("A1", "A1", dec!(10.00), pin))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::SameAccountTransfer));
    }
    assert_eq!(fx.balance(a.id).await, dec!(100.00));
}

#[tokio::test]
async fn test_insufficient_funds_leaves_state_untouched() {
    let fx = Fixture::new();
    let a = fx.open(1, "Ada", "A1").await;
    let b = fx.open(2, "Bola", "B1").await;
    fx.vault.set_pin(a.id, "4321").await.unwrap();
    fx.fund("A1", dec!(50.00)).await;

    let err = fx
        .engine
        .transfer(transfer_req("A1", "B1", dec!(50.01), "4321"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds));

    let err = fx
        .engine
        .withdraw(WithdrawRequest {
            account_number: "A1".into(),
            amount: dec!(100.00),
            bank_name: "GTB".into(),
            pin: "4321".into(),
            client_reference: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds));

    assert_eq!(fx.balance(a.id).await, dec!(50.00));
    assert_eq!(fx.balance(b.id).await, dec!(0.00));
    // Only the funding leg exists; the failed attempts left no orphans.
    assert_eq!(fx.engine.transactions(a.id).await.unwrap().len(), 1);
    assert!(fx.engine.transactions(b.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_pin_blocks_mutation() {
    let fx = Fixture::new();
    let a = fx.open(1, "Ada", "A1").await;
    let b = fx.open(2, "Bola", "B1").await;
    fx.vault.set_pin(a.id, "4321").await.unwrap();
    fx.fund("A1", dec!(100.00)).await;

    let err = fx
        .engine
        .transfer(transfer_req("A1", "B1", dec!(10.00), "1111"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidPin));

    assert_eq!(fx.balance(a.id).await, dec!(100.00));
    assert_eq!(fx.balance(b.id).await, dec!(0.00));
    assert_eq!(fx.engine.transactions(a.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_transfer_without_pin_set() {
    let fx = Fixture::new();
    fx.open(1, "Ada", "A1").await;
    fx.open(2, "Bola", "B1").await;
    fx.fund("A1", dec!(100.00)).await;

    let err = fx
        .engine
        .transfer(transfer_req("A1", "B1", dec!(10.00), "4321"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::PinNotSet));
}

#[tokio::test]
async fn test_missing_accounts() {
    let fx = Fixture::new();
    let a = fx.open(1, "Ada", "A1").await;
    fx.vault.set_pin(a.id, "4321").await.unwrap();

    let err = fx
        .engine
        .transfer(transfer_req("nope", "A1", dec!(10.00), "4321"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::AccountNotFound(n) if n == "nope"));

    let err = fx
        .engine
        .transfer(transfer_req("A1", "nope", dec!(10.00), "4321"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::RecipientNotFound(n) if n == "nope"));
}

#[tokio::test]
async fn test_fund_then_list() {
    let fx = Fixture::new();
    let a = fx.open(1, "Ada", "A1").await;

    fx.engine
        .fund(FundRequest {
            account_number: "A1".into(),
            amount: dec!(100.00),
            source: Channel::Bank,
            client_reference: None,
        })
        .await
        .unwrap();

    let legs = fx.engine.transactions(a.id).await.unwrap();
    assert_eq!(legs.len(), 1);
    assert_eq!(legs[0].category, LegCategory::Funding);
    assert_eq!(legs[0].leg_type, LegType::Credit);
    assert_eq!(legs[0].amount, dec!(100.00));
    assert_eq!(legs[0].status, LegStatus::Success);
}

#[tokio::test]
async fn test_withdraw_records_bank_leg() {
    let fx = Fixture::new();
    let a = fx.open(1, "Ada", "A1").await;
    fx.vault.set_pin(a.id, "4321").await.unwrap();
    fx.fund("A1", dec!(100.00)).await;

    let receipt = fx
        .engine
        .withdraw(WithdrawRequest {
            account_number: "A1".into(),
            amount: dec!(40.00),
            bank_name: "GTB".into(),
            pin: "4321".into(),
            client_reference: None,
        })
        .await
        .unwrap();
    assert_eq!(receipt.new_balance, dec!(60.00));

    let legs = fx.engine.transactions(a.id).await.unwrap();
    let withdrawal = &legs[0];
    assert_eq!(withdrawal.category, LegCategory::Withdrawal);
    assert_eq!(withdrawal.leg_type, LegType::Debit);
    assert_eq!(withdrawal.channel, Channel::Bank);
    assert!(withdrawal.description.contains("GTB"));
    assert_eq!(withdrawal.group_reference, None);
}

#[tokio::test]
async fn test_idempotency_key_blocks_replay() {
    let fx = Fixture::new();
    let a = fx.open(1, "Ada", "A1").await;
    let b = fx.open(2, "Bola", "B1").await;
    fx.vault.set_pin(a.id, "4321").await.unwrap();
    fx.fund("A1", dec!(100.00)).await;

    let key = Uuid::new_v4();
    let mut req = transfer_req("A1", "B1", dec!(30.00), "4321");
    req.client_reference = Some(key);

    fx.engine.transfer(req.clone()).await.unwrap();
    let err = fx.engine.transfer(req).await.unwrap_err();
    assert!(matches!(err, WalletError::DuplicateReference(r) if r == key));

    // The retry spent nothing.
    assert_eq!(fx.balance(a.id).await, dec!(70.00));
    assert_eq!(fx.balance(b.id).await, dec!(30.00));
}

#[tokio::test]
async fn test_transactions_newest_first() {
    let fx = Fixture::new();
    let a = fx.open(1, "Ada", "A1").await;
    fx.fund("A1", dec!(10.00)).await;
    fx.fund("A1", dec!(20.00)).await;
    fx.fund("A1", dec!(30.00)).await;

    let legs = fx.engine.transactions(a.id).await.unwrap();
    let amounts: Vec<Decimal> = legs.iter().map(|leg| leg.amount).collect();
    assert_eq!(amounts, vec![dec!(30.00), dec!(20.00), dec!(10.00)]);
}
