//! Shape of the positioned text consumed by layout readers.
//!
//! A [`DocumentDecoder`] turns a sized source into a [`Document`]: a page
//! count plus, per page, rows of text fragments grouped by vertical
//! position in reading order.

use crate::error::Result;
use crate::source::SizedSource;

/// A piece of text and where it sits on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            text: text.into(),
            x,
            y,
        }
    }
}

/// Fragments sharing a vertical position, left to right.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextRow {
    pub position: f64,
    pub fragments: Vec<TextFragment>,
}

impl TextRow {
    pub fn new(position: f64, fragments: Vec<TextFragment>) -> Self {
        Self { position, fragments }
    }

    /// Row from bare strings, positioned left to right at `position`.
    pub fn from_texts<I, S>(position: f64, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| TextFragment::new(text, i as f64, position))
            .collect();
        Self { position, fragments }
    }
}

/// A decoded document.
pub trait Document {
    /// Total number of pages.
    fn page_count(&self) -> usize;

    /// Rows of the zero-based page `index`, top to bottom.
    ///
    /// `None` means the page has no content and must be skipped.
    fn page_rows(&self, index: usize) -> Result<Option<Vec<TextRow>>>;
}

/// Binary document decoder producing positioned text.
pub trait DocumentDecoder {
    fn open(&self, source: &mut SizedSource<'_>) -> Result<Box<dyn Document>>;
}
