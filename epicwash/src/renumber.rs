//! Sequential identifier assignment.
//!
//! The identifier is the leading field of a row, up to but not including the
//! first delimiter (the whole row when it has no delimiter). Renumbering
//! overwrites that field and leaves every other byte of the row alone.
//!
//! File renumbering streams one line at a time, so memory use is bounded by
//! the longest line rather than the catalog size.

use std::io::{BufRead, Write};
use std::path::Path;

use log::info;

use crate::catalog::{open_catalog_reader, Catalog, Delimiter};
use crate::error::{Result, WashError};
use crate::output::write_atomically;

/// Hands out consecutive identifiers starting from a chosen value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renumberer {
    start: u64,
    /// `None` once `u64::MAX` has been handed out
    next: Option<u64>,
    last: Option<u64>,
}

impl Renumberer {
    pub fn new(start: u64) -> Self {
        Self {
            start,
            next: Some(start),
            last: None,
        }
    }

    /// Take the next identifier.
    pub fn next_id(&mut self) -> Result<u64> {
        let id = self.next.ok_or_else(|| {
            WashError::InvalidConfig(format!("identifier overflow after {}", u64::MAX))
        })?;
        self.next = id.checked_add(1);
        self.last = Some(id);
        Ok(id)
    }

    /// Number of identifiers handed out so far.
    pub fn assigned(&self) -> u64 {
        self.last.map_or(0, |last| last - self.start + 1)
    }

    /// First and last identifiers handed out, if any.
    pub fn range(&self) -> Option<(u64, u64)> {
        self.last.map(|last| (self.start, last))
    }
}

/// Overwrite the identifiers of a catalog in row order, starting at `start_id`.
pub fn renumber_catalog(catalog: &mut Catalog, start_id: u64) -> Result<Option<(u64, u64)>> {
    let mut ids = Renumberer::new(start_id);
    for record in catalog.records_mut() {
        let id = ids.next_id()?;
        record.set_id(&id.to_string());
    }
    Ok(ids.range())
}

/// Summary of a streaming renumbering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenumberSummary {
    pub records: u64,
    pub first_id: Option<u64>,
    pub last_id: Option<u64>,
}

/// Renumber rows streamed from `reader` into `writer`.
///
/// Blank lines and, when `header` is set, the first line pass through
/// unchanged without consuming an identifier. Line terminators are kept.
pub fn renumber_stream<R: BufRead, W: Write + ?Sized>(
    mut reader: R,
    writer: &mut W,
    delimiter: Delimiter,
    header: bool,
    ids: &mut Renumberer,
    path: &Path,
) -> Result<RenumberSummary> {
    let delimiter = delimiter.as_char() as u8;
    let mut buf = Vec::new();
    let mut first_line = true;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| WashError::io(path, e))?;
        if read == 0 {
            break;
        }

        let terminator_len = if buf.ends_with(b"\r\n") {
            2
        } else if buf.ends_with(b"\n") {
            1
        } else {
            0
        };
        let (content, terminator) = buf.split_at(buf.len() - terminator_len);

        let passthrough =
            (first_line && header) || content.iter().all(|b| b.is_ascii_whitespace());
        first_line = false;
        if passthrough {
            writer.write_all(&buf).map_err(|e| WashError::io(path, e))?;
            continue;
        }

        let id_end = content
            .iter()
            .position(|&b| b == delimiter)
            .unwrap_or(content.len());
        let id = ids.next_id()?;
        write!(writer, "{id}")
            .and_then(|_| writer.write_all(&content[id_end..]))
            .and_then(|_| writer.write_all(terminator))
            .map_err(|e| WashError::io(path, e))?;
    }

    let range = ids.range();
    Ok(RenumberSummary {
        records: ids.assigned(),
        first_id: range.map(|(first, _)| first),
        last_id: range.map(|(_, last)| last),
    })
}

/// Renumber a catalog file into `output`, atomically.
pub fn renumber_file(
    input: &Path,
    output: &Path,
    start_id: u64,
    delimiter: Delimiter,
    header: bool,
) -> Result<RenumberSummary> {
    if input == output {
        return Err(WashError::InvalidConfig(format!(
            "refusing to renumber {} in place",
            input.display()
        )));
    }
    info!("Opening {}", input.display());
    let reader = open_catalog_reader(input)?;
    info!("Writing {}", output.display());
    info!("The first identifier assigned is {start_id}");

    let mut ids = Renumberer::new(start_id);
    let mut summary = None;
    write_atomically(output, |writer| {
        summary = Some(renumber_stream(reader, writer, delimiter, header, &mut ids, input)?);
        Ok(())
    })?;

    let summary = summary.unwrap_or(RenumberSummary {
        records: 0,
        first_id: None,
        last_id: None,
    });
    match summary.last_id {
        Some(last) => info!("The final identifier assigned is {last}"),
        None => info!("No records to renumber"),
    }
    Ok(summary)
}
