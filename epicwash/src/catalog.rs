//! Delimited catalog files and their in-memory representation.
//!
//! A catalog file holds one source per line with fields separated by a
//! single character and no quoting. The native EPIC representation is the
//! pipe-delimited DMC format with right ascension and declination in
//! columns 10 and 11; reference catalogs are comma-delimited with the
//! position in columns 1 and 2. Column numbers are 1-based throughout, the
//! way catalog documentation refers to them.
//!
//! Records keep their original line bytes and terminator, so rows that
//! survive washing are written back byte for byte. Only the position fields
//! have to be valid UTF-8; every other field is opaque.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RowIssue, RowProblem, WashError};
use crate::sky::SkyPosition;

/// Field separator of a catalog file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    /// `|`, the DMC format
    Pipe,
    /// `,`
    Comma,
}

impl Delimiter {
    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Pipe => '|',
            Delimiter::Comma => ',',
        }
    }

    pub fn as_byte(&self) -> u8 {
        self.as_char() as u8
    }
}

impl std::fmt::Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delimiter::Pipe => write!(f, "pipe"),
            Delimiter::Comma => write!(f, "comma"),
        }
    }
}

/// Where to find things in a catalog file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSchema {
    pub delimiter: Delimiter,
    /// 1-based column holding right ascension in degrees
    pub ra_column: usize,
    /// 1-based column holding declination in degrees
    pub dec_column: usize,
    /// Whether the first line of the file is a header rather than a record
    #[serde(default)]
    pub header: bool,
}

impl CatalogSchema {
    /// The EPIC DMC convention: pipe-delimited, ra/dec in columns 10 and 11.
    pub fn dmc() -> Self {
        Self {
            delimiter: Delimiter::Pipe,
            ra_column: 10,
            dec_column: 11,
            header: false,
        }
    }

    /// Reference catalog convention: comma-delimited, ra/dec in columns 1 and 2.
    pub fn reference() -> Self {
        Self {
            delimiter: Delimiter::Comma,
            ra_column: 1,
            dec_column: 2,
            header: false,
        }
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.ra_column == 0 || self.dec_column == 0 {
            return Err(WashError::InvalidConfig(
                "column numbers are 1-based".to_string(),
            ));
        }
        if self.ra_column == self.dec_column {
            return Err(WashError::InvalidConfig(format!(
                "ra and dec cannot share column {}",
                self.ra_column
            )));
        }
        Ok(())
    }

    /// Parse the position out of one record line, given without its terminator.
    pub fn parse_position(&self, line: &[u8]) -> std::result::Result<(SkyPosition, usize), RowProblem> {
        let delimiter = self.delimiter.as_byte();
        let mut ra_text = None;
        let mut dec_text = None;
        let mut fields = 0;
        for (i, field) in line.split(|&b| b == delimiter).enumerate() {
            if i + 1 == self.ra_column {
                ra_text = Some(field);
            }
            if i + 1 == self.dec_column {
                dec_text = Some(field);
            }
            fields += 1;
        }

        let ra = parse_coordinate(ra_text, self.ra_column, fields)?;
        let dec = parse_coordinate(dec_text, self.dec_column, fields)?;
        let position =
            SkyPosition::new(ra, dec).map_err(|_| RowProblem::OutOfRange { ra, dec })?;
        Ok((position, fields))
    }
}

impl Default for CatalogSchema {
    fn default() -> Self {
        Self::dmc()
    }
}

fn parse_coordinate(
    text: Option<&[u8]>,
    column: usize,
    fields: usize,
) -> std::result::Result<f64, RowProblem> {
    let text = text.ok_or(RowProblem::MissingColumn { column, fields })?;
    std::str::from_utf8(text)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .ok_or_else(|| RowProblem::NotNumeric {
            column,
            value: String::from_utf8_lossy(text).into_owned(),
        })
}

/// How a line was terminated in its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`, also used for a final line with no terminator
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n",
            LineEnding::CrLf => b"\r\n",
        }
    }
}

/// Split a raw line into its content and terminator.
fn split_line_ending(raw: &[u8]) -> (&[u8], LineEnding) {
    let content = raw.strip_suffix(b"\n").unwrap_or(raw);
    match content.strip_suffix(b"\r") {
        Some(content) => (content, LineEnding::CrLf),
        None => (content, LineEnding::Lf),
    }
}

/// One row of a catalog.
///
/// The identifier is the leading field, up to the first delimiter. All other
/// fields are opaque bytes kept verbatim inside `line`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    line: Vec<u8>,
    ending: LineEnding,
    id_end: usize,
    position: SkyPosition,
}

impl SourceRecord {
    pub fn new(line: impl Into<Vec<u8>>, delimiter: Delimiter, position: SkyPosition) -> Self {
        let line = line.into();
        let delimiter = delimiter.as_byte();
        let id_end = line.iter().position(|&b| b == delimiter).unwrap_or(line.len());
        Self {
            line,
            ending: LineEnding::Lf,
            id_end,
            position,
        }
    }

    pub fn with_line_ending(mut self, ending: LineEnding) -> Self {
        self.ending = ending;
        self
    }

    pub fn line_ending(&self) -> LineEnding {
        self.ending
    }

    /// The identifier field, with invalid UTF-8 replaced.
    pub fn id(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.line[..self.id_end])
    }

    /// Overwrite the identifier field, leaving every other field untouched.
    pub fn set_id(&mut self, id: &str) {
        self.line.splice(..self.id_end, id.bytes());
        self.id_end = id.len();
    }

    pub fn position(&self) -> SkyPosition {
        self.position
    }

    /// The record bytes without line terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.line
    }

    /// The record text without line terminator, with invalid UTF-8 replaced.
    pub fn line(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.line)
    }

    /// Fields in column order, including the identifier.
    pub fn fields(&self, delimiter: Delimiter) -> impl Iterator<Item = &[u8]> {
        let delimiter = delimiter.as_byte();
        self.line.split(move |&b| b == delimiter)
    }
}

/// An ordered sequence of records read from one file.
///
/// Order is significant: duplicate resolution keeps the first-seen record
/// and renumbering follows row order.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    schema: CatalogSchema,
    /// Header line as read, terminator included
    header: Option<Vec<u8>>,
    records: Vec<SourceRecord>,
}

impl Catalog {
    pub fn new(schema: CatalogSchema) -> Self {
        Self {
            schema,
            header: None,
            records: Vec::new(),
        }
    }

    pub fn from_records(schema: CatalogSchema, records: Vec<SourceRecord>) -> Self {
        Self {
            schema,
            header: None,
            records,
        }
    }

    pub fn schema(&self) -> &CatalogSchema {
        &self.schema
    }

    /// The header text without terminator, with invalid UTF-8 replaced.
    pub fn header(&self) -> Option<Cow<'_, str>> {
        self.header
            .as_deref()
            .map(|raw| String::from_utf8_lossy(split_line_ending(raw).0))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [SourceRecord] {
        &mut self.records
    }

    pub fn push(&mut self, record: SourceRecord) {
        self.records.push(record);
    }

    pub fn positions(&self) -> Vec<SkyPosition> {
        self.records.iter().map(SourceRecord::position).collect()
    }

    /// Keep only the records whose flag is set, preserving relative order.
    pub fn retain_flagged(self, keep: &[bool]) -> Catalog {
        debug_assert_eq!(keep.len(), self.records.len());
        let records = self
            .records
            .into_iter()
            .zip(keep)
            .filter_map(|(record, &keep)| keep.then_some(record))
            .collect();
        Catalog {
            schema: self.schema,
            header: self.header,
            records,
        }
    }
}

/// Open a catalog file for line reading, decompressing `.gz` files.
pub fn open_catalog_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|e| WashError::io(path, e))?;
    let is_gzipped = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gzipped {
        debug!("Detected gzipped catalog {}", path.display());
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read a whole catalog file.
///
/// Any malformed row fails the whole read; all offending rows are reported
/// together in one [`WashError::MalformedRecords`].
pub fn read_catalog(path: &Path, schema: &CatalogSchema) -> Result<Catalog> {
    schema.validate()?;
    let reader = open_catalog_reader(path)?;
    parse_catalog(reader, schema, path)
}

/// Parse a catalog from any line source. `path` is used for error reporting only.
pub fn parse_catalog<R: BufRead>(mut reader: R, schema: &CatalogSchema, path: &Path) -> Result<Catalog> {
    let mut catalog = Catalog::new(*schema);
    let mut issues = Vec::new();
    let mut expected_fields = None;
    let mut blank_lines = 0usize;
    let mut buf = Vec::new();
    let mut line_number = 0usize;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| WashError::io(path, e))?;
        if read == 0 {
            break;
        }
        line_number += 1;

        if line_number == 1 && schema.header {
            catalog.header = Some(buf.clone());
            continue;
        }
        let (content, ending) = split_line_ending(&buf);
        if content.iter().all(u8::is_ascii_whitespace) {
            blank_lines += 1;
            continue;
        }

        match schema.parse_position(content) {
            Ok((position, fields)) => {
                let expected = *expected_fields.get_or_insert(fields);
                if fields != expected {
                    issues.push(RowIssue {
                        line: line_number,
                        problem: RowProblem::ArityMismatch {
                            expected,
                            found: fields,
                        },
                    });
                    continue;
                }
                if issues.is_empty() {
                    catalog.push(
                        SourceRecord::new(content, schema.delimiter, position).with_line_ending(ending),
                    );
                }
            }
            Err(problem) => issues.push(RowIssue {
                line: line_number,
                problem,
            }),
        }
    }

    if blank_lines > 0 {
        warn!("Skipped {} blank line(s) in {}", blank_lines, path.display());
    }
    if !issues.is_empty() {
        return Err(WashError::MalformedRecords {
            path: path.to_path_buf(),
            issues,
        });
    }

    debug!("Read {} records from {}", catalog.len(), path.display());
    Ok(catalog)
}

/// Write catalog rows with their original terminators, optionally preceded by the header.
pub fn write_catalog<W: Write + ?Sized>(writer: &mut W, catalog: &Catalog, write_header: bool) -> io::Result<()> {
    if write_header {
        if let Some(header) = &catalog.header {
            writer.write_all(header)?;
            if !header.ends_with(b"\n") {
                writer.write_all(b"\n")?;
            }
        }
    }
    for record in catalog.records() {
        writer.write_all(record.as_bytes())?;
        writer.write_all(record.line_ending().as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn dmc_row(id: &str, ra: &str, dec: &str) -> String {
        format!("{id}|a|b|c|d|e|f|g|h|{ra}|{dec}|12.5")
    }

    fn parse(text: &str, schema: &CatalogSchema) -> Result<Catalog> {
        parse_catalog(Cursor::new(text.to_string()), schema, &PathBuf::from("test.dmc"))
    }

    #[test]
    fn test_parse_dmc_rows() {
        let text = format!(
            "{}\n{}\n",
            dmc_row("201000001", "10.5", "-5.25"),
            dmc_row("201000002", "359.99", "89.9")
        );
        let catalog = parse(&text, &CatalogSchema::dmc()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.records()[0].id(), "201000001");
        assert_eq!(catalog.records()[0].position().ra, 10.5);
        assert_eq!(catalog.records()[1].position().dec, 89.9);
        assert_eq!(catalog.records()[1].line(), dmc_row("201000002", "359.99", "89.9"));
    }

    #[test]
    fn test_parse_reference_rows_with_header() {
        let text = "col1,col2\n10.0,20.0\n30.0,-40.0\n";
        let schema = CatalogSchema::reference().with_header(true);
        let catalog = parse(text, &schema).unwrap();
        assert_eq!(catalog.header().as_deref(), Some("col1,col2"));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.records()[1].position().dec, -40.0);
    }

    #[test]
    fn test_empty_input_is_empty_catalog() {
        let catalog = parse("", &CatalogSchema::dmc()).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_blank_and_crlf_lines() {
        let text = format!("{}\r\n\n   \n{}\r\n", dmc_row("1", "1", "1"), dmc_row("2", "2", "2"));
        let catalog = parse(&text, &CatalogSchema::dmc()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(!catalog.records()[0].line().ends_with('\r'));
        assert_eq!(catalog.records()[0].line_ending(), LineEnding::CrLf);
    }

    #[test]
    fn test_write_catalog_keeps_crlf_and_header() {
        let text = format!(
            "HEADER\r\n{}\r\n{}\n{}",
            dmc_row("1", "1", "1"),
            dmc_row("2", "2", "2"),
            dmc_row("3", "3", "3")
        );
        let catalog = parse(&text, &CatalogSchema::dmc().with_header(true)).unwrap();
        assert_eq!(catalog.header().as_deref(), Some("HEADER"));

        let mut out = Vec::new();
        write_catalog(&mut out, &catalog, true).unwrap();
        // The final row had no terminator and gains a newline
        assert_eq!(String::from_utf8(out).unwrap(), format!("{text}\n"));
    }

    #[test]
    fn test_non_utf8_opaque_fields_kept_verbatim() {
        let mut text = b"1|K2|Caf\xe9|d|e|f|g|h|i|10.0|20.0|12.5\n".to_vec();
        text.extend_from_slice(dmc_row("2", "30.0", "40.0").as_bytes());
        text.push(b'\n');

        let catalog = parse_catalog(Cursor::new(text.clone()), &CatalogSchema::dmc(), &PathBuf::from("latin1.dmc"))
            .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.records()[0].position().dec, 20.0);
        assert_eq!(catalog.records()[0].fields(Delimiter::Pipe).nth(2), Some(&b"Caf\xe9"[..]));

        let mut out = Vec::new();
        write_catalog(&mut out, &catalog, false).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn test_non_utf8_position_is_a_row_issue() {
        let mut text = dmc_row("1", "10.0", "10.0").into_bytes();
        text.extend_from_slice(b"\n2|a|b|c|d|e|f|g|h|1\xff|10.0|12.5\n");

        match parse_catalog(Cursor::new(text), &CatalogSchema::dmc(), &PathBuf::from("bad.dmc")) {
            Err(WashError::MalformedRecords { issues, .. }) => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].line, 2);
                assert!(matches!(issues[0].problem, RowProblem::NotNumeric { column: 10, .. }));
            }
            other => panic!("expected malformed records, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_rows_are_aggregated() {
        let text = [
            dmc_row("1", "10.0", "10.0"),
            dmc_row("2", "ten", "10.0"),
            "3|short|row".to_string(),
            dmc_row("4", "10.0", "95.0"),
            format!("{}|extra", dmc_row("5", "10.0", "10.0")),
        ]
        .join("\n");

        match parse(&text, &CatalogSchema::dmc()) {
            Err(WashError::MalformedRecords { issues, .. }) => {
                let lines: Vec<usize> = issues.iter().map(|i| i.line).collect();
                assert_eq!(lines, vec![2, 3, 4, 5]);
                assert!(matches!(issues[0].problem, RowProblem::NotNumeric { column: 10, .. }));
                assert!(matches!(issues[1].problem, RowProblem::MissingColumn { column: 10, fields: 3 }));
                assert!(matches!(issues[2].problem, RowProblem::OutOfRange { .. }));
                assert!(matches!(
                    issues[3].problem,
                    RowProblem::ArityMismatch { expected: 12, found: 13 }
                ));
            }
            other => panic!("expected malformed records, got {other:?}"),
        }
    }

    #[test]
    fn test_set_id_preserves_other_fields() {
        let line = dmc_row("201000001", "10.5", "-5.25");
        let position = SkyPosition::new(10.5, -5.25).unwrap();
        let mut record = SourceRecord::new(line, Delimiter::Pipe, position);
        record.set_id("7");
        assert_eq!(record.id(), "7");
        assert_eq!(record.line(), dmc_row("7", "10.5", "-5.25"));
        record.set_id("211000000");
        assert_eq!(record.line(), dmc_row("211000000", "10.5", "-5.25"));
        assert_eq!(record.fields(Delimiter::Pipe).count(), 12);
    }

    #[test]
    fn test_retain_flagged_keeps_order() {
        let schema = CatalogSchema::reference();
        let records = (0..4)
            .map(|i| {
                let position = SkyPosition::new(i as f64, 0.0).unwrap();
                SourceRecord::new(format!("{i},0"), schema.delimiter, position)
            })
            .collect();
        let catalog = Catalog::from_records(schema, records);
        let kept = catalog.retain_flagged(&[true, false, true, true]);
        let ids: Vec<String> = kept.records().iter().map(|r| r.id().into_owned()).collect();
        assert_eq!(ids, vec!["0", "2", "3"]);
    }

    #[test]
    fn test_schema_validation() {
        let mut schema = CatalogSchema::dmc();
        assert!(schema.validate().is_ok());
        schema.dec_column = schema.ra_column;
        assert!(schema.validate().is_err());
        schema.ra_column = 0;
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_write_catalog_round_trips_lines() {
        let text = format!("HEADER\n{}\n{}\n", dmc_row("1", "1", "1"), dmc_row("2", "2", "2"));
        let catalog = parse(&text, &CatalogSchema::dmc().with_header(true)).unwrap();

        let mut with_header = Vec::new();
        write_catalog(&mut with_header, &catalog, true).unwrap();
        assert_eq!(String::from_utf8(with_header).unwrap(), text);

        let mut without_header = Vec::new();
        write_catalog(&mut without_header, &catalog, false).unwrap();
        assert!(!String::from_utf8(without_header).unwrap().contains("HEADER"));
    }
}
