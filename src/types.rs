//! Common types produced by every layout reader.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Bank identifier for Banco Bilbao Vizcaya Argentaria.
pub const BANK_BBVA: &str = "bbva";

/// Format identifier for an original, generated PDF (not scanned).
pub const FORMAT_PDF: &str = "pdf";

/// Optional header facts about a monthly report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Date when the report was generated.
    pub report_date: Option<NaiveDate>,

    /// IBAN of the account the report was generated for.
    pub iban: Option<String>,

    /// Name of the account's holder.
    pub holder_name: Option<String>,
}

/// A single transaction executed on a bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Date when the transaction was requested.
    pub request_date: NaiveDate,

    /// Date when the transaction was executed and funds transferred.
    pub settlement_date: NaiveDate,

    /// Subject of the transaction.
    pub subject: String,

    /// Details of the transaction.
    pub details: String,

    /// Signed amount, negative for debits.
    pub amount: Decimal,
}

/// Metadata plus transactions in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Header facts read from the first page.
    pub metadata: Metadata,

    /// Transactions, top to bottom, pages ascending.
    pub transactions: Vec<Transaction>,
}

impl Statement {
    /// Create an empty statement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction to the statement.
    pub fn add_transaction(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }
}
