//! Fixed-layout tabular statement reader.
//!
//! A [`LayoutSchema`] names where each field lives: which header row, which
//! fragment or fragment range, where the transaction block starts and how
//! many rows of footer follow it. [`TabularReader`] walks the rows of every
//! page according to a schema, so supporting another institution with a
//! similar tabular layout is a matter of describing its offsets.

use crate::document::{DocumentDecoder, TextFragment, TextRow};
use crate::error::{Error, Result};
use crate::registry::TransactionReader;
use crate::source::{sized, Source};
use crate::types::{Metadata, Statement, Transaction};
use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use std::ops::Range;
use std::str::FromStr;

/// Position of a single fragment within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    /// Zero-based index from the start of the row.
    At(usize),
    /// One-based index from the end of the row: `FromEnd(1)` is the last fragment.
    FromEnd(usize),
}

impl Cell {
    fn index(self, len: usize) -> Option<usize> {
        match self {
            Cell::At(i) if i < len => Some(i),
            Cell::FromEnd(n) if n >= 1 => len.checked_sub(n),
            _ => None,
        }
    }

    /// Offset used as a range bound; may equal `len`.
    fn bound(self, len: usize) -> Option<usize> {
        match self {
            Cell::At(i) if i <= len => Some(i),
            Cell::FromEnd(n) => len.checked_sub(n),
            _ => None,
        }
    }

    /// Text of the fragment at this position.
    pub fn get(self, fragments: &[TextFragment]) -> Result<&str> {
        self.index(fragments.len())
            .map(|i| fragments[i].text.as_str())
            .ok_or_else(|| Error::MissingField(format!("fragment {:?} of a {}-fragment row", self, fragments.len())))
    }
}

/// Half-open range of fragments within a row. `end: None` runs to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Cell,
    pub end: Option<Cell>,
}

impl Span {
    pub const fn new(start: Cell, end: Cell) -> Self {
        Self { start, end: Some(end) }
    }

    pub const fn starting_at(start: Cell) -> Self {
        Self { start, end: None }
    }

    pub const fn all() -> Self {
        Self::starting_at(Cell::At(0))
    }

    fn range(self, len: usize) -> Option<Range<usize>> {
        let start = self.start.bound(len)?;
        let end = match self.end {
            Some(end) => end.bound(len)?,
            None => len,
        };
        (start <= end).then_some(start..end)
    }

    /// Join the fragments in this span with single spaces.
    pub fn join(self, fragments: &[TextFragment]) -> Result<String> {
        self.range(fragments.len())
            .map(|r| join_fragments(&fragments[r]))
            .ok_or_else(|| Error::MissingField(format!("fragments {:?} of a {}-fragment row", self, fragments.len())))
    }
}

/// A single fragment on a fixed header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellField {
    pub row: usize,
    pub cell: Cell,
}

/// A fragment range on a fixed header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanField {
    pub row: usize,
    pub span: Span,
}

/// Declarative description of a tabular statement layout.
///
/// Header fields are read from the first page only. Transaction rows are
/// read on every page, starting at `first_transaction_row`, stepping
/// `rows_per_transaction` rows at a time and stopping before the last
/// `trailing_rows` rows of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSchema {
    pub report_date: CellField,
    pub iban: SpanField,
    pub holder_name: SpanField,

    pub first_transaction_row: usize,
    pub rows_per_transaction: usize,
    pub trailing_rows: usize,

    /// Fields of the primary row of a transaction.
    pub request_date: Cell,
    pub settlement_date: Cell,
    pub amount: Cell,
    pub subject: Span,

    /// Offset of the details row from the primary row.
    pub details_row: usize,
    pub details: Span,
}

impl LayoutSchema {
    /// BBVA monthly account extract.
    pub fn bbva() -> Self {
        Self {
            report_date: CellField {
                row: 2,
                cell: Cell::FromEnd(1),
            },
            iban: SpanField {
                row: 3,
                span: Span::new(Cell::At(1), Cell::At(7)),
            },
            holder_name: SpanField {
                row: 4,
                span: Span::starting_at(Cell::At(1)),
            },
            first_transaction_row: 7,
            rows_per_transaction: 2,
            trailing_rows: 5,
            request_date: Cell::At(0),
            settlement_date: Cell::At(1),
            amount: Cell::FromEnd(2),
            subject: Span::new(Cell::At(2), Cell::FromEnd(2)),
            details_row: 1,
            details: Span::all(),
        }
    }

    /// Read report date, IBAN and holder from the header rows.
    pub fn read_metadata(&self, rows: &[TextRow]) -> Result<Metadata> {
        let report_date = row_at(rows, self.report_date.row)
            .and_then(|row| self.report_date.cell.get(&row.fragments))
            .and_then(parse_report_date)
            .map_err(|e| Error::ReportDate(Box::new(e)))?;

        let iban = read_span(rows, self.iban).map_err(|e| Error::Header {
            field: "IBAN",
            source: Box::new(e),
        })?;
        let holder_name = read_span(rows, self.holder_name).map_err(|e| Error::Header {
            field: "holder name",
            source: Box::new(e),
        })?;

        Ok(Metadata {
            report_date: Some(report_date),
            iban: Some(iban),
            holder_name: Some(holder_name),
        })
    }

    /// Append the transactions found on one page to `out`.
    ///
    /// Errors name the page and the row offset within the transaction block.
    pub fn read_transactions(
        &self,
        page: usize,
        rows: &[TextRow],
        report_date: Option<NaiveDate>,
        out: &mut Vec<Transaction>,
    ) -> Result<()> {
        let first = self.first_transaction_row;
        let end = rows.len().saturating_sub(self.trailing_rows);

        for j in (first..end).step_by(self.rows_per_transaction.max(1)) {
            let at = move |field: &'static str| {
                move |e: Error| Error::Row {
                    field,
                    page,
                    row: j - first,
                    source: Box::new(e),
                }
            };

            let report_date = report_date
                .ok_or_else(|| Error::MissingField("report date".to_string()))
                .map_err(at("date"))?;
            let primary = &rows[j].fragments;
            let details = row_at(rows, j + self.details_row).map_err(at("details"))?;

            let request_date = self
                .request_date
                .get(primary)
                .and_then(|v| parse_partial_date(report_date, v))
                .map_err(at("request date"))?;
            let settlement_date = self
                .settlement_date
                .get(primary)
                .and_then(|v| parse_partial_date(report_date, v))
                .map_err(at("settlement date"))?;
            let amount = self.amount.get(primary).and_then(parse_amount).map_err(at("amount"))?;
            let subject = self.subject.join(primary).map_err(at("subject"))?;
            let details = self.details.join(&details.fragments).map_err(at("details"))?;

            out.push(Transaction {
                request_date,
                settlement_date,
                subject,
                details,
                amount,
            });
        }
        Ok(())
    }
}

impl Default for LayoutSchema {
    fn default() -> Self {
        Self::bbva()
    }
}

fn row_at(rows: &[TextRow], index: usize) -> Result<&TextRow> {
    rows.get(index)
        .ok_or_else(|| Error::MissingField(format!("row {} of a {}-row page", index, rows.len())))
}

fn read_span(rows: &[TextRow], field: SpanField) -> Result<String> {
    row_at(rows, field.row).and_then(|row| field.span.join(&row.fragments))
}

/// Join fragment texts with single spaces.
pub fn join_fragments(fragments: &[TextFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `v` matches `shape`, where `9` stands for any ASCII digit.
fn has_shape(v: &str, shape: &str) -> bool {
    v.len() == shape.len()
        && v.bytes().zip(shape.bytes()).all(|(c, s)| match s {
            b'9' => c.is_ascii_digit(),
            _ => c == s,
        })
}

/// Parse a full DD/MM/YYYY date. Day and month are zero padded.
pub fn parse_report_date(v: &str) -> Result<NaiveDate> {
    if !has_shape(v, "99/99/9999") {
        return Err(Error::InvalidDate(v.to_string()));
    }
    NaiveDate::parse_from_str(v, "%d/%m/%Y").map_err(|_| Error::InvalidDate(v.to_string()))
}

/// Parse a partial DD/MM date relative to the report it appears in.
///
/// Reports are generated on the first day of a month and cover the previous
/// month: a 2018-02 report holds transactions from 2018-01, so every partial
/// date takes the year of the report date minus one month.
pub fn parse_partial_date(report_date: NaiveDate, v: &str) -> Result<NaiveDate> {
    if !has_shape(v, "99/99") {
        return Err(Error::InvalidDate(v.to_string()));
    }
    let covered = report_date
        .checked_sub_months(Months::new(1))
        .ok_or_else(|| Error::InvalidDate(report_date.to_string()))?;
    NaiveDate::parse_from_str(&format!("{}/{}", v, covered.year()), "%d/%m/%Y")
        .map_err(|_| Error::InvalidDate(v.to_string()))
}

/// Parse an EU-format amount, with dots for thousands and a decimal comma.
pub fn parse_amount(v: &str) -> Result<Decimal> {
    let cleaned = v.replace('.', "").replace(',', ".");
    Decimal::from_str(&cleaned).map_err(|_| Error::InvalidAmount(v.to_string()))
}

/// Reads tabular statements through a document decoder and a layout schema.
pub struct TabularReader {
    decoder: Box<dyn DocumentDecoder>,
    schema: LayoutSchema,
}

impl TabularReader {
    pub fn new(decoder: Box<dyn DocumentDecoder>, schema: LayoutSchema) -> Self {
        Self { decoder, schema }
    }

    pub fn schema(&self) -> &LayoutSchema {
        &self.schema
    }
}

impl TransactionReader for TabularReader {
    /// Sources that cannot report their size are fully buffered in memory
    /// before the document is decoded.
    fn read(&self, source: &mut dyn Source) -> Result<Statement> {
        let mut source = sized(source)?;
        let document = self.decoder.open(&mut source)?;

        let mut statement = Statement::new();
        let pages = document.page_count();
        for page in 0..pages {
            let Some(rows) = document.page_rows(page)? else {
                tracing::warn!(page, "skipping empty page");
                continue;
            };
            tracing::debug!(page, rows = rows.len(), "reading page");

            if page == 0 {
                statement.metadata = self.schema.read_metadata(&rows)?;
            }
            self.schema.read_transactions(
                page,
                &rows,
                statement.metadata.report_date,
                &mut statement.transactions,
            )?;
        }

        tracing::info!(pages, transactions = statement.transactions.len(), "read statement");
        Ok(statement)
    }
}
