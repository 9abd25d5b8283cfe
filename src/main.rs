use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wallet_ledger::application::engine::{
    FundRequest, TransferEngine, TransferRequest, WithdrawRequest,
};
use wallet_ledger::application::pin::PinVault;
use wallet_ledger::domain::account::AccountType;
use wallet_ledger::domain::ports::StoreHandle;
use wallet_ledger::domain::transaction::Channel;
use wallet_ledger::infrastructure::in_memory::InMemoryStore;
use wallet_ledger::interfaces::csv::account_writer::AccountWriter;
use wallet_ledger::interfaces::csv::op_reader::{OpKind, OpReader, OpRow};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input wallet operations CSV file
    input: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let store: StoreHandle = Arc::new(InMemoryStore::new());
    let engine = TransferEngine::new(store.clone());
    let vault = PinVault::new(store.clone());

    // Synthetic user ids for accounts opened by the batch file; user
    // registration proper lives outside this crate.
    let mut next_user_id: i64 = 0;

    let file = File::open(cli.input).into_diagnostic()?;
    for row in OpReader::new(file).ops() {
        match row {
            Ok(op) => {
                next_user_id += 1;
                if let Err(e) = apply(&engine, &vault, &store, next_user_id, op).await {
                    eprintln!("Error processing operation: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {}", e);
            }
        }
    }

    let accounts = store.list_accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(accounts).into_diagnostic()?;

    Ok(())
}

async fn apply(
    engine: &TransferEngine,
    vault: &PinVault,
    store: &StoreHandle,
    user_id: i64,
    op: OpRow,
) -> wallet_ledger::error::Result<()> {
    use wallet_ledger::error::WalletError;

    match op.op {
        OpKind::Open => {
            let name = op.detail.unwrap_or_else(|| op.account.clone());
            let account = store
                .create_account(user_id, &name, &op.account, AccountType::Wallet)
                .await?;
            if let Some(pin) = op.pin {
                vault.set_pin(account.id, &pin).await?;
            }
        }
        OpKind::Fund => {
            let source = op
                .detail
                .as_deref()
                .and_then(|s| s.parse::<Channel>().ok())
                .unwrap_or(Channel::Bank);
            engine
                .fund(FundRequest {
                    account_number: op.account,
                    amount: op.amount.ok_or(WalletError::InvalidAmount)?,
                    source,
                    client_reference: None,
                })
                .await?;
        }
        OpKind::Transfer => {
            engine
                .transfer(TransferRequest {
                    sender_account_number: op.account,
                    recipient_account_number: op
                        .detail
                        .ok_or_else(|| WalletError::RecipientNotFound(String::new()))?,
                    amount: op.amount.ok_or(WalletError::InvalidAmount)?,
                    pin: op.pin.unwrap_or_default(),
                    client_reference: None,
                })
                .await?;
        }
        OpKind::Withdraw => {
            engine
                .withdraw(WithdrawRequest {
                    account_number: op.account,
                    amount: op.amount.ok_or(WalletError::InvalidAmount)?,
                    bank_name: op.detail.unwrap_or_else(|| "bank".into()),
                    pin: op.pin.unwrap_or_default(),
                    client_reference: None,
                })
                .await?;
        }
    }
    Ok(())
}
