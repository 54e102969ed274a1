//! Error types for the bankstatement library.

use std::io;
use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while decoding, selecting and reading statements.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred while buffering or reading a source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error writing CSV output.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// No multipart boundary start line was found in the source.
    #[error("boundary not found")]
    BoundaryNotFound,

    /// The container envelope is malformed or has no enclosed part.
    #[error("container error: {0}")]
    Container(String),

    /// Unknown container decoder name.
    #[error("unsupported decoder: {0}")]
    UnsupportedDecoder(String),

    /// No layout parser registered for the pair.
    #[error("unsupported bank/format combination: {bank}/{format}")]
    UnsupportedCombination { bank: String, format: String },

    /// A layout parser is already registered for the pair.
    #[error("bank/format combination already registered: {bank}/{format}")]
    AlreadyRegistered { bank: String, format: String },

    /// The underlying document decoder failed.
    #[error("document error: {0}")]
    Document(String),

    /// Invalid date format.
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid amount format.
    #[error("Invalid amount format: {0}")]
    InvalidAmount(String),

    /// A row or fragment the layout expects is not there.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// The report date on the first page could not be parsed.
    #[error("error parsing report date: {0}")]
    ReportDate(#[source] Box<Error>),

    /// A header field other than the report date could not be read.
    #[error("error parsing {field}: {source}")]
    Header {
        field: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// A transaction row pair could not be parsed.
    #[error("error parsing transaction {field} at page {page} row {row}: {source}")]
    Row {
        field: &'static str,
        page: usize,
        row: usize,
        #[source]
        source: Box<Error>,
    },
}

#[cfg(feature = "pdf")]
impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::Document(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_combination_names_both_tokens() {
        let err = Error::UnsupportedCombination {
            bank: "acme".into(),
            format: "xls".into(),
        };
        assert_eq!(err.to_string(), "unsupported bank/format combination: acme/xls");
    }

    #[test]
    fn test_row_error_carries_coordinates() {
        let err = Error::Row {
            field: "amount",
            page: 1,
            row: 4,
            source: Box::new(Error::InvalidAmount("abc".into())),
        };
        assert_eq!(
            err.to_string(),
            "error parsing transaction amount at page 1 row 4: Invalid amount format: abc"
        );
    }
}
