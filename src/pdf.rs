//! PDF document decoder built on `lopdf`.
//!
//! Text is taken from the page content streams: every string shown by a
//! `Tj`, `TJ`, `'` or `"` operator becomes one fragment positioned at the
//! current text matrix origin. Fragments are grouped into rows by vertical
//! position, rows run top to bottom and fragments left to right.
//!
//! Strings are decoded with the encoding of the font selected by `Tf`,
//! including `ToUnicode` maps of composite (`Identity-H`) fonts. Strings
//! shown without a usable font encoding are read as PDF text strings.

use crate::document::{Document, DocumentDecoder, TextFragment, TextRow};
use crate::error::{Error, Result};
use crate::source::SizedSource;
use lopdf::content::{Content, Operation};
use lopdf::{Encoding, Object, ObjectId};
use std::collections::BTreeMap;

/// Fragments whose baselines differ by less than this share a row.
const DEFAULT_ROW_TOLERANCE: f64 = 1.0;

/// Decodes generated (not scanned) PDF documents.
#[derive(Debug, Clone)]
pub struct LopdfDecoder {
    row_tolerance: f64,
}

impl Default for LopdfDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LopdfDecoder {
    pub fn new() -> Self {
        Self {
            row_tolerance: DEFAULT_ROW_TOLERANCE,
        }
    }

    pub fn with_row_tolerance(row_tolerance: f64) -> Self {
        Self { row_tolerance }
    }
}

impl DocumentDecoder for LopdfDecoder {
    fn open(&self, source: &mut SizedSource<'_>) -> Result<Box<dyn Document>> {
        let data = source.to_bytes()?;
        let file = lopdf::Document::load_mem(&data)?;
        let pages: Vec<ObjectId> = file.get_pages().into_values().collect();
        tracing::debug!(bytes = data.len(), pages = pages.len(), "loaded pdf");
        Ok(Box::new(PdfDocument {
            file,
            pages,
            row_tolerance: self.row_tolerance,
        }))
    }
}

struct PdfDocument {
    file: lopdf::Document,
    pages: Vec<ObjectId>,
    row_tolerance: f64,
}

impl Document for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_rows(&self, index: usize) -> Result<Option<Vec<TextRow>>> {
        let id = *self
            .pages
            .get(index)
            .ok_or_else(|| Error::Document(format!("page {} out of range", index)))?;
        let data = self.file.get_page_content(id)?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let content = Content::decode(&data)?;
        let fonts = self.page_fonts(id)?;
        let fragments = show_text(&content.operations, &fonts);
        if fragments.is_empty() {
            return Ok(None);
        }
        Ok(Some(group_rows(fragments, self.row_tolerance)))
    }
}

impl PdfDocument {
    fn page_fonts(&self, id: ObjectId) -> Result<Fonts<'_>> {
        let mut fonts = Fonts::new();
        for (name, font) in self.file.get_page_fonts(id)? {
            if !font.type_is(b"Font") {
                continue;
            }
            match font.get_font_encoding(&self.file) {
                Ok(encoding) => {
                    fonts.insert(name, encoding);
                }
                Err(e) => tracing::warn!(
                    font = %String::from_utf8_lossy(&name),
                    error = %e,
                    "font encoding not supported, reading its strings as text strings"
                ),
            }
        }
        Ok(fonts)
    }
}

/// Page font resource names to their text encodings.
type Fonts<'a> = BTreeMap<Vec<u8>, Encoding<'a>>;

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn translate(m: Matrix, tx: f64, ty: f64) -> Matrix {
    [m[0], m[1], m[2], m[3], tx * m[0] + ty * m[2] + m[4], tx * m[1] + ty * m[3] + m[5]]
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn numbers<const N: usize>(operands: &[Object]) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    for (slot, obj) in out.iter_mut().zip(operands) {
        *slot = number(obj)?;
    }
    (operands.len() >= N).then_some(out)
}

/// PDF text strings are either UTF-16BE with a byte order mark or a
/// single-byte encoding, read here as Latin-1.
fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn decode_string(bytes: &[u8], encoding: Option<&Encoding<'_>>) -> String {
    encoding
        .and_then(|encoding| lopdf::Document::decode_text(encoding, bytes).ok())
        .unwrap_or_else(|| decode_text(bytes))
}

fn string_operand(obj: &Object, encoding: Option<&Encoding<'_>>) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_string(bytes, encoding)),
        Object::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| string_operand(item, encoding))
                .collect(),
        ),
        _ => None,
    }
}

fn emit(out: &mut Vec<TextFragment>, tm: &Matrix, encoding: Option<&Encoding<'_>>, obj: Option<&Object>) {
    if let Some(text) = obj.and_then(|obj| string_operand(obj, encoding)) {
        let text = text.trim();
        if !text.is_empty() {
            out.push(TextFragment::new(text, tm[4], tm[5]));
        }
    }
}

/// Run the text state operators and collect every shown string.
fn show_text(operations: &[Operation], fonts: &Fonts<'_>) -> Vec<TextFragment> {
    let mut tm = IDENTITY;
    let mut tlm = IDENTITY;
    let mut leading = 0.0;
    let mut font: Option<&Encoding<'_>> = None;
    let mut out = Vec::new();

    for op in operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "Tf" => {
                font = operands
                    .first()
                    .and_then(|name| name.as_name().ok())
                    .and_then(|name| fonts.get(name));
            }
            "BT" => {
                tm = IDENTITY;
                tlm = IDENTITY;
            }
            "Tm" => {
                if let Some(m) = numbers::<6>(operands) {
                    tm = m;
                    tlm = m;
                }
            }
            "Td" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    tlm = translate(tlm, tx, ty);
                    tm = tlm;
                }
            }
            "TD" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    leading = -ty;
                    tlm = translate(tlm, tx, ty);
                    tm = tlm;
                }
            }
            "TL" => {
                if let Some([tl]) = numbers::<1>(operands) {
                    leading = tl;
                }
            }
            "T*" => {
                tlm = translate(tlm, 0.0, -leading);
                tm = tlm;
            }
            "Tj" | "TJ" => emit(&mut out, &tm, font, operands.first()),
            "'" => {
                tlm = translate(tlm, 0.0, -leading);
                tm = tlm;
                emit(&mut out, &tm, font, operands.first());
            }
            "\"" => {
                tlm = translate(tlm, 0.0, -leading);
                tm = tlm;
                emit(&mut out, &tm, font, operands.get(2));
            }
            _ => {}
        }
    }
    out
}

/// Group fragments by baseline, top of the page first.
fn group_rows(mut fragments: Vec<TextFragment>, tolerance: f64) -> Vec<TextRow> {
    fragments.sort_by(|a, b| b.y.total_cmp(&a.y));

    let mut rows: Vec<TextRow> = Vec::new();
    for fragment in fragments {
        match rows.last_mut() {
            Some(row) if (row.position - fragment.y).abs() < tolerance => row.fragments.push(fragment),
            _ => rows.push(TextRow::new(fragment.y, vec![fragment])),
        }
    }
    for row in &mut rows {
        row.fragments.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    rows
}
