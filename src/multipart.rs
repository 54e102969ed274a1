//! Single-part MIME multipart decoder.
//!
//! Statements delivered as SOAP/MTOM attachments are wrapped in a multipart
//! envelope whose `uuid:` boundary is only known by scanning the data. The
//! decoder discovers the boundary, extracts the first enclosed part and
//! returns its body. Additional parts are ignored.

use crate::decoder::{Decoder, DECODER_MULTIPART};
use crate::error::{Error, Result};
use crate::source::{MemorySource, Source};
use std::io::{BufRead, BufReader, SeekFrom};

/// Prefix of a boundary start line: `--` followed by a `uuid:` token.
pub const UUID_BOUNDARY_PREFIX: &str = "--uuid:";

/// Scans and reads files wrapped with a single MIME multipart boundary.
#[derive(Debug, Clone)]
pub struct MimeMultipartDecoder {
    marker_prefix: String,
}

impl Default for MimeMultipartDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// One enclosed part: its headers and raw body.
#[derive(Debug, PartialEq, Eq)]
struct Part<'a> {
    headers: Vec<(String, String)>,
    body: &'a [u8],
}

impl Part<'_> {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl MimeMultipartDecoder {
    /// Decoder looking for `--uuid:` boundary lines.
    pub fn new() -> Self {
        Self::with_marker_prefix(UUID_BOUNDARY_PREFIX)
    }

    /// Decoder looking for boundary lines starting with `prefix`, which must
    /// include the leading `--`.
    pub fn with_marker_prefix(prefix: impl Into<String>) -> Self {
        Self {
            marker_prefix: prefix.into(),
        }
    }

    /// Scan `source` from the start for the first boundary start line and
    /// return the boundary token (the line without its leading `--`).
    ///
    /// The cursor is reset to the start afterwards, whether or not a
    /// boundary was found.
    pub fn find_boundary(&self, source: &mut dyn Source) -> Result<String> {
        source.seek(SeekFrom::Start(0))?;
        let found = self.scan_boundary(&mut BufReader::new(&mut *source));
        source.seek(SeekFrom::Start(0))?;
        found
    }

    fn scan_boundary<R: BufRead>(&self, reader: &mut R) -> Result<String> {
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                return Err(Error::BoundaryNotFound);
            }
            let token = trim_ascii(&line);
            if line.starts_with(self.marker_prefix.as_bytes()) && token.len() > self.marker_prefix.len() {
                return Ok(String::from_utf8_lossy(&token[2..]).into_owned());
            }
        }
    }
}

impl Decoder for MimeMultipartDecoder {
    fn name(&self) -> &'static str {
        DECODER_MULTIPART
    }

    /// The enclosed part is read and buffered in memory.
    fn wrap(&self, source: &mut dyn Source) -> Result<MemorySource> {
        let boundary = self.find_boundary(source)?;

        let mut data = Vec::new();
        source.read_to_end(&mut data)?;

        let part = first_part(&data, &boundary)?;
        tracing::debug!(
            boundary = %boundary,
            content_type = part.header("Content-Type").unwrap_or(""),
            bytes = part.body.len(),
            "extracted multipart part"
        );

        let body = match part.header("Content-Transfer-Encoding") {
            Some(enc) if enc.eq_ignore_ascii_case("quoted-printable") => decode_quoted_printable(part.body)?,
            _ => part.body.to_vec(),
        };
        Ok(MemorySource::new(body))
    }
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if !first.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    while let [rest @ .., last] = bytes {
        if !last.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    bytes
}

/// Split `data` into lines, each keeping its trailing newline.
fn lines_with_offsets(data: &[u8]) -> impl Iterator<Item = (usize, &[u8])> {
    let mut offset = 0;
    data.split_inclusive(|&b| b == b'\n').map(move |line| {
        let start = offset;
        offset += line.len();
        (start, line)
    })
}

/// Whether `rest`, the bytes after `--boundary`, completes a delimiter line.
fn ends_delimiter(rest: &[u8]) -> bool {
    let rest = rest.strip_prefix(b"--").unwrap_or(rest);
    rest.iter()
        .take_while(|&&b| b != b'\n')
        .all(|b| b.is_ascii_whitespace())
}

fn first_part<'a>(data: &'a [u8], boundary: &str) -> Result<Part<'a>> {
    let dash_boundary = format!("--{boundary}");
    let dash_boundary = dash_boundary.as_bytes();
    let mut lines = lines_with_offsets(data);

    // preamble
    let opening = lines
        .by_ref()
        .find(|(_, line)| line.starts_with(dash_boundary) && ends_delimiter(&line[dash_boundary.len()..]))
        .ok_or_else(|| Error::Container("missing enclosed part".to_string()))?;
    if trim_ascii(opening.1).ends_with(b"--") && trim_ascii(opening.1).len() == dash_boundary.len() + 2 {
        return Err(Error::Container("missing enclosed part".to_string()));
    }

    let mut headers: Vec<(String, String)> = Vec::new();
    let mut body_start = None;
    for (start, line) in lines {
        let content = trim_ascii(line);
        if content.is_empty() {
            body_start = Some(start + line.len());
            break;
        }
        let text = String::from_utf8_lossy(line);
        if line[0] == b' ' || line[0] == b'\t' {
            let (_, value) = headers
                .last_mut()
                .ok_or_else(|| Error::Container("malformed part headers".to_string()))?;
            value.push(' ');
            value.push_str(text.trim());
            continue;
        }
        let (name, value) = text
            .split_once(':')
            .ok_or_else(|| Error::Container(format!("malformed part header: {}", text.trim())))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }
    let body_start = body_start.ok_or_else(|| Error::Container("unterminated part headers".to_string()))?;

    let body = &data[body_start..];
    if body.starts_with(dash_boundary) && ends_delimiter(&body[dash_boundary.len()..]) {
        return Ok(Part { headers, body: &[] });
    }

    let mut delimiter = Vec::with_capacity(dash_boundary.len() + 1);
    delimiter.push(b'\n');
    delimiter.extend_from_slice(dash_boundary);

    let mut from = 0;
    while let Some(found) = find(&body[from..], &delimiter) {
        let at = from + found;
        if ends_delimiter(&body[at + delimiter.len()..]) {
            let end = if at > 0 && body[at - 1] == b'\r' { at - 1 } else { at };
            return Ok(Part {
                headers,
                body: &body[..end],
            });
        }
        from = at + 1;
    }
    Err(Error::Container("unexpected end of enclosed part".to_string()))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn decode_quoted_printable(input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    for line in input.split_inclusive(|&b| b == b'\n') {
        let (content, newline) = match line {
            [rest @ .., b'\r', b'\n'] => (rest, &b"\r\n"[..]),
            [rest @ .., b'\n'] => (rest, &b"\n"[..]),
            _ => (line, &b""[..]),
        };
        let content: &[u8] = match content.iter().rposition(|b| *b != b' ' && *b != b'\t') {
            Some(last) => &content[..=last],
            None => &[],
        };

        let mut soft_break = false;
        let mut i = 0;
        while i < content.len() {
            if content[i] != b'=' {
                out.push(content[i]);
                i += 1;
                continue;
            }
            if i + 1 == content.len() {
                soft_break = true;
                break;
            }
            let pair = content
                .get(i + 1..i + 3)
                .ok_or_else(|| Error::Container("truncated quoted-printable escape".to_string()))?;
            let byte = hex::decode(pair)
                .map_err(|e| Error::Container(format!("invalid quoted-printable escape: {e}")))?;
            out.extend_from_slice(&byte);
            i += 3;
        }
        if !soft_break {
            out.extend_from_slice(newline);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Seek};

    const BOUNDARY: &str = "uuid:2f3b8c1e-9c2d-4a55-8d0e-3f2a1b4c5d6e";

    fn envelope(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = b"MIME-Version: 1.0\r\nContent-Type: multipart/related\r\n\r\n".to_vec();
        for (headers, body) in parts {
            out.extend_from_slice(format!("--{BOUNDARY}\r\n{headers}\r\n\r\n").as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        out
    }

    #[test]
    fn test_find_boundary_resets_cursor() {
        let data = envelope(&[("Content-Type: application/pdf", b"%PDF-1.4")]);
        let mut source = Cursor::new(data);
        source.seek(SeekFrom::Start(7)).unwrap();

        let boundary = MimeMultipartDecoder::new().find_boundary(&mut source).unwrap();
        assert_eq!(boundary, BOUNDARY);
        assert_eq!(source.position(), 0);
    }

    #[test]
    fn test_boundary_not_found() {
        let mut source = Cursor::new(b"%PDF-1.4\nno envelope here\n".to_vec());
        let decoder = MimeMultipartDecoder::new();
        assert!(matches!(decoder.wrap(&mut source), Err(Error::BoundaryNotFound)));
        assert_eq!(source.position(), 0);
    }

    #[test]
    fn test_boundary_must_start_the_line() {
        let mut data = b"preamble\r\n  --uuid:indented\r\n".to_vec();
        data.extend(envelope(&[("Content-Type: application/pdf", b"%PDF-1.4")]));
        let mut source = Cursor::new(data);
        let decoder = MimeMultipartDecoder::new();
        assert_eq!(decoder.find_boundary(&mut source).unwrap(), BOUNDARY);
        assert_eq!(decoder.wrap(&mut source).unwrap().as_bytes(), b"%PDF-1.4");

        let mut source = Cursor::new(b"\t--uuid:indented\r\nbody\r\n".to_vec());
        assert!(matches!(decoder.wrap(&mut source), Err(Error::BoundaryNotFound)));
    }

    #[test]
    fn test_single_part_payload_is_exact() {
        let payload: &[u8] = b"%PDF-1.4\r\n\x00\x01binary\nbody\r\n%%EOF";
        let data = envelope(&[("Content-Type: application/pdf\r\nContent-ID: <statement>", payload)]);
        let mut source = Cursor::new(data);

        let decoded = MimeMultipartDecoder::new().wrap(&mut source).unwrap();
        assert_eq!(decoded.as_bytes(), payload);
    }

    #[test]
    fn test_only_first_part_is_extracted() {
        let data = envelope(&[("Content-Type: text/xml", b"<soap/>"), ("Content-Type: application/pdf", b"%PDF")]);
        let decoded = MimeMultipartDecoder::new().wrap(&mut Cursor::new(data)).unwrap();
        assert_eq!(decoded.as_bytes(), b"<soap/>");
    }

    #[test]
    fn test_lf_only_envelope() {
        let data = format!("--{BOUNDARY}\nContent-Type: text/plain\n\nhello\n--{BOUNDARY}--\n");
        let decoded = MimeMultipartDecoder::new().wrap(&mut Cursor::new(data.into_bytes())).unwrap();
        assert_eq!(decoded.as_bytes(), b"hello");
    }

    #[test]
    fn test_missing_part() {
        let data = format!("preamble\r\n--{BOUNDARY}--\r\n");
        let err = MimeMultipartDecoder::new().wrap(&mut Cursor::new(data.into_bytes())).unwrap_err();
        assert!(matches!(err, Error::Container(_)));
    }

    #[test]
    fn test_unterminated_part() {
        let data = format!("--{BOUNDARY}\r\nContent-Type: text/plain\r\n\r\nno closing delimiter");
        let err = MimeMultipartDecoder::new().wrap(&mut Cursor::new(data.into_bytes())).unwrap_err();
        assert!(matches!(err, Error::Container(_)));
    }

    #[test]
    fn test_quoted_printable_part_is_decoded() {
        let data = envelope(&[(
            "Content-Type: text/plain\r\nContent-Transfer-Encoding: quoted-printable",
            b"caf=C3=A9 =\r\ncon leche\r\nfin",
        )]);
        let decoded = MimeMultipartDecoder::new().wrap(&mut Cursor::new(data)).unwrap();
        assert_eq!(String::from_utf8(decoded.into_inner()).unwrap(), "café con leche\r\nfin");
    }

    #[test]
    fn test_header_continuation_lines() {
        let data = format!("--{BOUNDARY}\r\nContent-Type: application/pdf;\r\n\tname=x.pdf\r\n\r\nbody\r\n--{BOUNDARY}--\r\n");
        let part = first_part(data.as_bytes(), BOUNDARY).unwrap();
        assert_eq!(part.header("content-type"), Some("application/pdf; name=x.pdf"));
        assert_eq!(part.body, b"body");
    }
}
