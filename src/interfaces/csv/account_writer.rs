use crate::domain::account::Account;
use std::io::Write;

/// Writes final account state as CSV: `account_number,balance,status`.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts(&mut self, accounts: Vec<Account>) -> csv::Result<()> {
        self.writer
            .write_record(["account_number", "balance", "status"])?;
        for account in accounts {
            self.writer.write_record([
                account.account_number.as_str(),
                &format!("{:.2}", account.balance.round_dp(2)),
                account.status.as_str(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
