//! End-to-end reads through decoders, registry and the tabular layout
//! reader, using a plain-text page dump in place of a PDF.
//!
//! Dump format: pages separated by form feeds, rows by newlines and
//! fragments by `|`. A page holding only whitespace has no content.

use bankstatement::document::{Document, DocumentDecoder, TextRow};
use bankstatement::layout::{LayoutSchema, TabularReader};
use bankstatement::source::SizedSource;
use bankstatement::{read_statement, DecoderChain, Error, Registry, Result, Statement};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use std::io::{BufReader, Cursor};

struct TextDump;

struct TextPages(Vec<Option<Vec<TextRow>>>);

impl Document for TextPages {
    fn page_count(&self) -> usize {
        self.0.len()
    }

    fn page_rows(&self, index: usize) -> Result<Option<Vec<TextRow>>> {
        Ok(self.0[index].clone())
    }
}

impl DocumentDecoder for TextDump {
    fn open(&self, source: &mut SizedSource<'_>) -> Result<Box<dyn Document>> {
        let data = String::from_utf8(source.to_bytes()?).map_err(|e| Error::Document(e.to_string()))?;
        let pages = data
            .split('\x0c')
            .map(|page| {
                if page.trim().is_empty() {
                    return None;
                }
                let rows = page
                    .lines()
                    .filter(|line| !line.is_empty())
                    .enumerate()
                    .map(|(y, line)| TextRow::from_texts(-(y as f64), line.split('|')))
                    .collect();
                Some(rows)
            })
            .collect();
        Ok(Box::new(TextPages(pages)))
    }
}

const HEADER: &str = "BBVA
Extracto|mensual
Fecha|de|emisión|01/03/2022
IBAN|ES91|2100|0418|4502|0005|1332|EUR
Titular|JUAN|PÉREZ
Movimientos
F.Oper|F.Valor|Concepto|Importe|Saldo
";

const SECOND_HEADER: &str = "BBVA
Extracto|mensual
Fecha|de|emisión|01/07/1999
IBAN|XX00|0000|0000|0000|0000|0000|EUR
Titular|OTRO
Movimientos
F.Oper|F.Valor|Concepto|Importe|Saldo
";

const FOOTER: &str = "Saldo|final
Total|cargos
Total|abonos
Página|1
BBVA|S.A.
";

fn dump() -> String {
    format!(
        "{HEADER}\
         03/02|04/02|COMPRA|MERCADONA|-45,10|1.200,00\n\
         TARJETA|1234\n\
         10/02|10/02|TRANSFERENCIA|-1.010,99|189,01\n\
         A|FAVOR|DE|ANA\n\
         {FOOTER}\x0c   \n\x0c{SECOND_HEADER}\
         28/02|01/03|NOMINA|2.100,00|2.289,01\n\
         EMPRESA|SA\n\
         {FOOTER}"
    )
}

fn reader() -> TabularReader {
    TabularReader::new(Box::new(TextDump), LayoutSchema::bbva())
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register("bbva", "text", || Box::new(reader())).unwrap();
    registry
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn wrap_multipart(payload: &[u8]) -> Vec<u8> {
    let boundary = "uuid:0b1c6a2e-5d4f-4e3a-9c8b-7a6f5e4d3c2b";
    let mut out = format!(
        "Content-Type: multipart/related; boundary=\"{boundary}\"\r\n\r\n\
         --{boundary}\r\n\
         Content-Type: text/plain\r\n\r\n"
    )
    .into_bytes();
    out.extend_from_slice(payload);
    out.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    out
}

#[test]
fn reads_all_pages_in_order() {
    let statement = read_statement(
        &mut Cursor::new(dump().into_bytes()),
        &DecoderChain::new(),
        registry().reader("bbva", "text").unwrap().as_ref(),
    )
    .unwrap();

    assert_eq!(statement.metadata.report_date, Some(date(2022, 3, 1)));
    assert_eq!(statement.metadata.iban.as_deref(), Some("ES91 2100 0418 4502 0005 1332"));
    assert_eq!(statement.metadata.holder_name.as_deref(), Some("JUAN PÉREZ"));

    let summary: Vec<(NaiveDate, NaiveDate, &str, &str, Decimal)> = statement
        .transactions
        .iter()
        .map(|t| (t.request_date, t.settlement_date, t.subject.as_str(), t.details.as_str(), t.amount))
        .collect();
    assert_eq!(
        summary,
        vec![
            (date(2022, 2, 3), date(2022, 2, 4), "COMPRA MERCADONA", "TARJETA 1234", Decimal::new(-4510, 2)),
            (date(2022, 2, 10), date(2022, 2, 10), "TRANSFERENCIA", "A FAVOR DE ANA", Decimal::new(-101099, 2)),
            (date(2022, 2, 28), date(2022, 3, 1), "NOMINA", "EMPRESA SA", Decimal::new(210000, 2)),
        ]
    );
}

#[test]
fn multipart_wrapped_input_reads_the_same() {
    let plain = reader().read_plain();
    let wrapped = read_statement(
        &mut Cursor::new(wrap_multipart(dump().as_bytes())),
        &DecoderChain::from_names(["multipart"]).unwrap(),
        &reader(),
    )
    .unwrap();
    assert_eq!(wrapped, plain);
}

#[test]
fn unsized_source_reads_the_same() {
    let plain = reader().read_plain();
    let buffered = read_statement(
        &mut BufReader::new(Cursor::new(dump().into_bytes())),
        &DecoderChain::new(),
        &reader(),
    )
    .unwrap();
    assert_eq!(buffered, plain);
}

#[test]
fn repeated_reads_are_identical() {
    let first = reader().read_plain();
    let second = reader().read_plain();
    assert_eq!(first, second);

    let csv = |statement: Statement| {
        let mut out = Vec::new();
        bankstatement::csv_format::CsvStatement::new(statement, true)
            .write_to(&mut out)
            .unwrap();
        out
    };
    assert_eq!(csv(first), csv(second));
}

#[test]
fn bad_amount_aborts_with_coordinates() {
    let broken = dump().replace("2.100,00|2.289,01", "dos mil|2.289,01");
    let err = read_statement(
        &mut Cursor::new(broken.into_bytes()),
        &DecoderChain::new(),
        &reader(),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "error parsing transaction amount at page 2 row 0: Invalid amount format: dos mil"
    );
}

#[test]
fn missing_boundary_fails_before_reading() {
    let err = read_statement(
        &mut Cursor::new(dump().into_bytes()),
        &DecoderChain::from_names(["multipart"]).unwrap(),
        &reader(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::BoundaryNotFound));
}

#[test]
fn unknown_pair_is_rejected() {
    let err = registry().reader("bbva", "pdf").err().unwrap();
    assert_eq!(err.to_string(), "unsupported bank/format combination: bbva/pdf");
}

trait ReadPlain {
    fn read_plain(&self) -> Statement;
}

impl ReadPlain for TabularReader {
    fn read_plain(&self) -> Statement {
        read_statement(&mut Cursor::new(dump().into_bytes()), &DecoderChain::new(), self).unwrap()
    }
}
