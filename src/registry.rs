//! Bank/format to layout reader registry.

use crate::error::{Error, Result};
use crate::source::Source;
use crate::types::Statement;
use std::collections::HashMap;

/// The interface for bank-specific file format readers.
pub trait TransactionReader {
    /// Extract metadata and transactions, in document order, from `source`.
    fn read(&self, source: &mut dyn Source) -> Result<Statement>;
}

/// Builds a fresh reader for one bank/format pair.
pub type ReaderConstructor = Box<dyn Fn() -> Box<dyn TransactionReader> + Send + Sync>;

/// Maps (bank, format) pairs to reader constructors.
///
/// Entries can only be added: registering a pair twice is an error, so an
/// existing reader is never silently replaced.
///
/// # Examples
///
/// ```
/// use bankstatement::registry::Registry;
///
/// let registry = Registry::new();
/// let err = registry.reader("acme", "xls").err().unwrap();
/// assert_eq!(err.to_string(), "unsupported bank/format combination: acme/xls");
/// ```
#[derive(Default)]
pub struct Registry {
    readers: HashMap<(String, String), ReaderConstructor>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every reader this crate ships.
    pub fn with_builtin() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "pdf")]
        registry.readers.insert(
            (crate::types::BANK_BBVA.to_string(), crate::types::FORMAT_PDF.to_string()),
            Box::new(|| -> Box<dyn TransactionReader> {
                Box::new(crate::layout::TabularReader::new(
                    Box::new(crate::pdf::LopdfDecoder::new()),
                    crate::layout::LayoutSchema::bbva(),
                ))
            }),
        );
        registry
    }

    /// Register a reader constructor for `bank`/`format`.
    pub fn register<F>(&mut self, bank: &str, format: &str, constructor: F) -> Result<()>
    where
        F: Fn() -> Box<dyn TransactionReader> + Send + Sync + 'static,
    {
        let key = (bank.to_string(), format.to_string());
        if self.readers.contains_key(&key) {
            return Err(Error::AlreadyRegistered {
                bank: key.0,
                format: key.1,
            });
        }
        self.readers.insert(key, Box::new(constructor));
        Ok(())
    }

    pub fn contains(&self, bank: &str, format: &str) -> bool {
        self.readers.contains_key(&(bank.to_string(), format.to_string()))
    }

    /// Registered pairs, sorted.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<_> = self
            .readers
            .keys()
            .map(|(bank, format)| (bank.as_str(), format.as_str()))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// Return the reader for `bank`/`format`.
    pub fn reader(&self, bank: &str, format: &str) -> Result<Box<dyn TransactionReader>> {
        self.readers
            .get(&(bank.to_string(), format.to_string()))
            .map(|constructor| constructor())
            .ok_or_else(|| Error::UnsupportedCombination {
                bank: bank.to_string(),
                format: format.to_string(),
            })
    }
}
