//! Container decoders.
//!
//! A decoder unwraps an outer envelope (compression, multipart wrapping, ...)
//! and yields a new sized source holding only the enclosed content. Decoders
//! chain: the output of one is the input of the next.

use crate::error::{Error, Result};
use crate::multipart::MimeMultipartDecoder;
use crate::source::{MemorySource, Source};

/// Name of the single-part MIME multipart decoder.
pub const DECODER_MULTIPART: &str = "multipart";

/// An intermediate or container file format reader.
pub trait Decoder {
    /// Name used to select this decoder.
    fn name(&self) -> &'static str;

    /// Unwrap `source`, yielding the enclosed content as a new source.
    fn wrap(&self, source: &mut dyn Source) -> Result<MemorySource>;
}

/// Look up a decoder by name. The empty string means no decoding.
pub fn decoder_by_name(name: &str) -> Result<Option<Box<dyn Decoder>>> {
    match name {
        "" => Ok(None),
        DECODER_MULTIPART => Ok(Some(Box::new(MimeMultipartDecoder::new()))),
        other => Err(Error::UnsupportedDecoder(other.to_string())),
    }
}

/// Decoders applied in order, outermost envelope first.
#[derive(Default)]
pub struct DecoderChain {
    decoders: Vec<Box<dyn Decoder>>,
}

impl DecoderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from decoder names, skipping empty names.
    ///
    /// # Examples
    ///
    /// ```
    /// use bankstatement::decoder::DecoderChain;
    ///
    /// let chain = DecoderChain::from_names(["multipart", ""])?;
    /// assert_eq!(chain.names(), vec!["multipart"]);
    /// assert!(DecoderChain::from_names(["zip"]).is_err());
    /// # Ok::<(), bankstatement::Error>(())
    /// ```
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut chain = Self::new();
        for name in names {
            if let Some(decoder) = decoder_by_name(name.as_ref())? {
                chain.decoders.push(decoder);
            }
        }
        Ok(chain)
    }

    /// Append a decoder to the end of the chain.
    pub fn push(&mut self, decoder: Box<dyn Decoder>) {
        self.decoders.push(decoder);
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    /// Run every decoder over `source` in sequence.
    ///
    /// Returns `None` for an empty chain so the caller keeps reading its
    /// own source.
    pub fn apply(&self, source: &mut dyn Source) -> Result<Option<MemorySource>> {
        let mut decoders = self.decoders.iter();
        let Some(first) = decoders.next() else {
            return Ok(None);
        };
        let mut current = first.wrap(source)?;
        for decoder in decoders {
            current = decoder.wrap(&mut current)?;
        }
        Ok(Some(current))
    }
}
