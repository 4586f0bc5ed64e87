// src/process/reader.rs
use super::raw_table::{self, RawTable};
use crate::catalog::{Dso, JobUnit, ParseOptions};
use crate::error::PipelineError;
use csv::{ByteRecord, ErrorKind, ReaderBuilder};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// Anything that can hand a job its raw table.
pub trait TableSource: Send + Sync {
    fn read(&self, job: &JobUnit) -> Result<RawTable, PipelineError>;
}

/// Yearly extracts laid out as `<root>/<source>/<source>-<year>.csv`.
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    root: PathBuf,
}

impl CsvDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, source: Dso, year: i32) -> PathBuf {
        let name = source.as_str();
        self.root.join(name).join(format!("{}-{}.csv", name, year))
    }
}

impl TableSource for CsvDirectory {
    #[tracing::instrument(level = "debug", skip(self, job), fields(source = %job.source, year = job.year))]
    fn read(&self, job: &JobUnit) -> Result<RawTable, PipelineError> {
        let path = self.path_for(job.source, job.year);
        let read_err = |reason: String| PipelineError::Read {
            dso: job.source,
            year: job.year,
            path: path.clone(),
            reason,
        };
        let file = File::open(&path).map_err(|e| read_err(e.to_string()))?;
        let (table, stats) =
            parse_csv(BufReader::new(file), &job.options).map_err(|e| read_err(e.to_string()))?;
        stats.report(&path);
        Ok(table)
    }
}

/// In-memory tables keyed by `(source, year)`.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<(Dso, i32), RawTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, source: Dso, year: i32, table: RawTable) -> Self {
        self.tables.insert((source, year), table);
        self
    }
}

impl TableSource for MemorySource {
    fn read(&self, job: &JobUnit) -> Result<RawTable, PipelineError> {
        self.tables
            .get(&(job.source, job.year))
            .cloned()
            .ok_or_else(|| PipelineError::Read {
                dso: job.source,
                year: job.year,
                path: PathBuf::from(format!("memory://{}/{}", job.source, job.year)),
                reason: "no table registered".to_string(),
            })
    }
}

/// What the reader tolerated instead of failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub rows: usize,
    /// Rows with more fields than the header, or broken quoting.
    pub skipped_rows: usize,
    /// Rows with fewer fields than the header, filled out with nulls.
    pub padded_rows: usize,
    pub lossy_fields: usize,
}

impl ReadStats {
    fn report(&self, path: &Path) {
        if self.skipped_rows > 0 {
            warn!(path = %path.display(), skipped = self.skipped_rows, "skipped malformed rows");
        }
        if self.padded_rows > 0 {
            warn!(path = %path.display(), padded = self.padded_rows, "padded short rows with nulls");
        }
        if self.lossy_fields > 0 {
            warn!(path = %path.display(), fields = self.lossy_fields, "dropped undecodable bytes");
        }
        debug!(path = %path.display(), rows = self.rows, "read table");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("separator {0:?} is not a single-byte ASCII character")]
    Separator(char),
    #[error("reading header: {0}")]
    Header(csv::Error),
    #[error("reading rows: {0}")]
    Io(csv::Error),
    #[error("building table: {0}")]
    Frame(#[from] polars::error::PolarsError),
}

/// Parse delimited text into a frame of text columns. Short rows are padded
/// with nulls, while rows with extra fields or broken quoting are skipped with a
/// warning. Undecodable bytes are dropped from their field, and blank fields
/// become null.
pub fn parse_csv<R: Read>(
    reader: R,
    options: &ParseOptions,
) -> Result<(RawTable, ReadStats), ParseError> {
    let delimiter = u8::try_from(options.separator)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(ParseError::Separator(options.separator))?;

    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut stats = ReadStats::default();
    let headers: Vec<String> = rdr
        .byte_headers()
        .map_err(ParseError::Header)?
        .iter()
        .map(|f| decode_field(f, &mut stats))
        .collect();

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    let mut record = ByteRecord::new();
    let mut line = 0usize;
    loop {
        line += 1;
        match rdr.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                if record.len() > headers.len() {
                    warn!(
                        record = line,
                        expected = headers.len(),
                        found = record.len(),
                        "skipping row with extra fields"
                    );
                    stats.skipped_rows += 1;
                    continue;
                }
                if record.len() < headers.len() {
                    debug!(
                        record = line,
                        expected = headers.len(),
                        found = record.len(),
                        "padding short row"
                    );
                    stats.padded_rows += 1;
                }
                for (idx, column) in columns.iter_mut().enumerate() {
                    let value = record
                        .get(idx)
                        .map(|f| decode_field(f, &mut stats))
                        .filter(|v| !v.trim().is_empty());
                    column.push(value);
                }
                stats.rows += 1;
            }
            Err(e) if matches!(e.kind(), ErrorKind::Io(_)) => return Err(ParseError::Io(e)),
            Err(e) => {
                warn!(record = line, error = %e, "skipping malformed row");
                stats.skipped_rows += 1;
            }
        }
    }

    let table = raw_table::from_columns(headers, columns)?;
    Ok((table, stats))
}

fn decode_field(bytes: &[u8], stats: &mut ReadStats) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            stats.lossy_fields += 1;
            String::from_utf8_lossy(bytes)
                .chars()
                .filter(|c| *c != char::REPLACEMENT_CHARACTER)
                .collect()
        }
    }
}
