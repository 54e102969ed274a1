//! Bank Statement Library
//!
//! Extracts account metadata and transactions from monthly bank account
//! statements.
//!
//! # Pipeline
//!
//! - A [`Source`] is any readable, seekable byte stream; sources that cannot
//!   report their length are buffered in memory when a length is needed.
//! - A [`DecoderChain`] optionally unwraps container envelopes such as a
//!   single-part MIME multipart file.
//! - The [`Registry`] selects a [`TransactionReader`] for a bank/format pair.
//! - The reader interprets the positioned text rows of each page into
//!   [`Metadata`] and an ordered list of [`Transaction`]s.
//!
//! # Examples
//!
//! ```no_run
//! use std::fs::File;
//! use bankstatement::{read_statement, DecoderChain, Registry};
//!
//! let registry = Registry::with_builtin();
//! let reader = registry.reader("bbva", "pdf")?;
//! let decoders = DecoderChain::from_names(["multipart"])?;
//!
//! let mut file = File::open("statement.eml")?;
//! let statement = read_statement(&mut file, &decoders, reader.as_ref())?;
//! println!("{} transactions", statement.transactions.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod types;
pub mod source;
pub mod decoder;
pub mod multipart;
pub mod document;
pub mod layout;
pub mod registry;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod csv_format;
pub mod print_format;

// Re-export commonly used types
pub use decoder::{Decoder, DecoderChain};
pub use error::{Error, Result};
pub use registry::{Registry, TransactionReader};
pub use source::Source;
pub use types::{Metadata, Statement, Transaction, BANK_BBVA, FORMAT_PDF};

/// Decode `source` through `decoders` and read it with `reader`.
///
/// An empty decoder chain reads `source` directly.
pub fn read_statement(
    source: &mut dyn Source,
    decoders: &DecoderChain,
    reader: &dyn TransactionReader,
) -> Result<Statement> {
    match decoders.apply(source)? {
        Some(mut decoded) => reader.read(&mut decoded),
        None => reader.read(source),
    }
}
