//! CSV export of statement transactions.
//!
//! One row per transaction, with an optional header row:
//!
//! | column             | carries                                        |
//! |--------------------|------------------------------------------------|
//! | `transaction_date` | request date, the first (`F.Oper`) layout cell  |
//! | `date`             | settlement date, the second (`F.Valor`) cell    |
//! | `subject`          | subject cells of the transaction row           |
//! | `details`          | the details row                                |
//! | `amount`           | signed amount with two decimals                |

use crate::error::Result;
use crate::types::{Statement, Transaction};
use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;
use std::io::Write;

/// Date format used in exported rows.
pub const CSV_DATE_FORMAT: &str = "%Y/%m/%d";

/// Represents a statement exported as CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvStatement {
    /// The underlying statement data.
    pub statement: Statement,

    /// Whether to write a header row first.
    pub headers: bool,
}

/// CSV transaction record structure.
#[derive(Debug, Serialize)]
struct CsvRecord {
    transaction_date: String,
    date: String,
    subject: String,
    details: String,
    amount: String,
}

impl From<&Transaction> for CsvRecord {
    fn from(tx: &Transaction) -> Self {
        Self {
            transaction_date: tx.request_date.format(CSV_DATE_FORMAT).to_string(),
            date: tx.settlement_date.format(CSV_DATE_FORMAT).to_string(),
            subject: tx.subject.clone(),
            details: tx.details.clone(),
            amount: format!("{:.2}", tx.amount),
        }
    }
}

impl CsvStatement {
    pub fn new(statement: Statement, headers: bool) -> Self {
        Self { statement, headers }
    }

    /// Write the transactions to any destination implementing `Write`.
    ///
    /// # Arguments
    ///
    /// * `writer` - A mutable reference to a type implementing `Write`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use bankstatement::csv_format::CsvStatement;
    /// use bankstatement::types::Statement;
    ///
    /// let csv = CsvStatement::new(Statement::new(), true);
    /// let mut file = File::create("output.csv")?;
    /// csv.write_to(&mut file)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut csv_writer = WriterBuilder::new().has_headers(self.headers).from_writer(writer);

        if self.headers && self.statement.transactions.is_empty() {
            csv_writer.write_record(["transaction_date", "date", "subject", "details", "amount"])?;
        }
        for transaction in &self.statement.transactions {
            csv_writer.serialize(CsvRecord::from(transaction))?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Output file name: `{holder}_{iban}_{report date}.csv`.
    ///
    /// Spaces and dots are dropped and underscores become dashes so the
    /// field separators stay unambiguous.
    pub fn file_name(&self) -> String {
        let metadata = &self.statement.metadata;
        format!(
            "{}_{}_{}.csv",
            sanitize(metadata.holder_name.as_deref().unwrap_or("")),
            sanitize(metadata.iban.as_deref().unwrap_or("")),
            metadata
                .report_date
                .as_ref()
                .map(|d: &NaiveDate| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        )
    }
}

fn sanitize(v: &str) -> String {
    v.chars()
        .filter(|c| *c != ' ' && *c != '.')
        .map(|c| if c == '_' { '-' } else { c })
        .collect()
}
