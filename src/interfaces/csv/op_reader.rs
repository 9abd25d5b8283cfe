use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Open,
    Fund,
    Transfer,
    Withdraw,
}

/// One wallet operation from the batch file.
///
/// The `detail` column is overloaded per op: display name for `open`,
/// funding channel for `fund`, recipient account for `transfer`, bank name
/// for `withdraw`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OpRow {
    pub op: OpKind,
    pub account: String,
    pub detail: Option<String>,
    pub amount: Option<Decimal>,
    pub pin: Option<String>,
}

/// Reads wallet operations from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// yielding operations lazily so large batch files stream.
pub struct OpReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OpReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn ops(self) -> impl Iterator<Item = csv::Result<OpRow>> {
        self.reader.into_deserialize()
    }
}
