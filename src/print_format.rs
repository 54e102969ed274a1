//! Human-readable statement rendering: a metadata block followed by a
//! column-aligned transaction table.

use crate::error::Result;
use crate::types::{Statement, Transaction};
use std::io::Write;

const DATE_FORMAT: &str = "%Y/%m/%d";
const MIN_WIDTH: usize = 4;
const PADDING: usize = 2;

/// Represents a statement rendered for a terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintStatement<'a> {
    pub statement: &'a Statement,
}

impl<'a> PrintStatement<'a> {
    pub fn new(statement: &'a Statement) -> Self {
        Self { statement }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let metadata = &self.statement.metadata;
        let report_date = metadata
            .report_date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default();

        writeln!(writer, "Metadata:")?;
        writeln!(writer, "\tReport date: {}", report_date)?;
        writeln!(writer, "\tIBAN: {}", metadata.iban.as_deref().unwrap_or(""))?;
        writeln!(writer, "\tHolder: {}", metadata.holder_name.as_deref().unwrap_or(""))?;
        writeln!(writer)?;
        writeln!(writer, "Transactions:")?;
        writeln!(writer)?;

        let rows: Vec<[String; 5]> = self.statement.transactions.iter().map(cells).collect();
        let mut widths = [MIN_WIDTH; 4];
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        for row in &rows {
            let mut line = String::new();
            for (cell, width) in row[..4].iter().zip(widths) {
                line.push_str(cell);
                line.extend(std::iter::repeat(' ').take(width + PADDING - cell.chars().count()));
            }
            line.push_str(&row[4]);
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }
}

fn cells(tx: &Transaction) -> [String; 5] {
    [
        tx.request_date.format(DATE_FORMAT).to_string(),
        tx.settlement_date.format(DATE_FORMAT).to_string(),
        tx.subject.clone(),
        tx.details.clone(),
        tx.amount.to_string(),
    ]
}
