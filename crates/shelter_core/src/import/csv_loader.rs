//! CSV bulk loader.
//!
//! # Responsibility
//! - Read a header row plus data rows and infer one scalar type per column.
//! - Insert each row through the repository and report success/error counts.
//!
//! # Invariants
//! - Column types are inferred over the whole file before any insert.
//! - Only I/O failures abort the import; row failures are counted.
//! - At most `MAX_REPORTED_ERRORS` messages are kept and logged.

use crate::model::record::{FieldValue, Record};
use crate::repo::shelter_repo::AnimalRepository;
use csv::StringRecord;
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Cap on individually surfaced row errors.
pub const MAX_REPORTED_ERRORS: usize = 5;
/// Rows between progress log lines.
pub const PROGRESS_INTERVAL: usize = 100;

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub success_count: usize,
    pub error_count: usize,
    /// First `MAX_REPORTED_ERRORS` error messages.
    pub errors: Vec<String>,
}

impl ImportReport {
    fn record_error(&mut self, message: String) {
        self.error_count += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            warn!("event=import_row module=import status=error detail={message}");
            self.errors.push(message);
        }
    }
}

/// The input could not be read at all.
#[derive(Debug)]
pub enum ImportError {
    Open { path: PathBuf, source: std::io::Error },
    Csv(csv::Error),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { path, source } => {
                write!(f, "cannot open `{}`: {source}", path.display())
            }
            Self::Csv(err) => write!(f, "cannot read CSV input: {err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Csv(err) => Some(err),
        }
    }
}

impl From<csv::Error> for ImportError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

/// One data row failed to convert into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Zero-based data row index (header excluded).
    pub row: usize,
    pub message: String,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

impl Error for ParseError {}

/// Imports a CSV file into `repo`.
pub fn import_csv<S>(path: impl AsRef<Path>, repo: &S) -> Result<ImportReport, ImportError>
where
    S: AnimalRepository + ?Sized,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ImportError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "event=import_start module=import status=start path={}",
        path.display()
    );
    import_reader(file, repo)
}

/// Imports CSV data from any reader into `repo`.
pub fn import_reader<R, S>(reader: R, repo: &S) -> Result<ImportReport, ImportError>
where
    R: Read,
    S: AnimalRepository + ?Sized,
{
    let started_at = Instant::now();
    let table = parse_table(reader)?;
    info!(
        "event=import_parse module=import status=ok rows={} columns={}",
        table.rows.len(),
        table.headers.len()
    );

    let mut report = ImportReport {
        total_rows: table.rows.len(),
        ..ImportReport::default()
    };
    for (index, row) in table.rows.into_iter().enumerate() {
        match row {
            Ok(record) => match repo.create(Some(&record)) {
                Ok(true) => report.success_count += 1,
                Ok(false) => report.record_error(format!("row {index}: store rejected record")),
                Err(err) => report.record_error(format!("row {index}: {err}")),
            },
            Err(err) => report.record_error(err.to_string()),
        }

        if (index + 1) % PROGRESS_INTERVAL == 0 {
            info!(
                "event=import_progress module=import status=running processed={}/{}",
                index + 1,
                report.total_rows
            );
        }
    }

    info!(
        "event=import_finish module=import status=ok duration_ms={} imported={} errors={}",
        started_at.elapsed().as_millis(),
        report.success_count,
        report.error_count
    );
    Ok(report)
}

struct ParsedTable {
    headers: Vec<String>,
    rows: Vec<Result<Record, ParseError>>,
}

fn parse_table(reader: impl Read) -> Result<ParsedTable, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);
    let headers = normalize_headers(csv_reader.headers()?);

    let mut raw_rows = Vec::new();
    for (index, result) in csv_reader.records().enumerate() {
        match result {
            Ok(row) => raw_rows.push(Ok(row)),
            Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => return Err(err.into()),
            Err(err) => raw_rows.push(Err(ParseError {
                row: index,
                message: err.to_string(),
            })),
        }
    }

    let kinds = infer_column_kinds(
        headers.len(),
        raw_rows.iter().filter_map(|row| row.as_ref().ok()),
    );
    let rows = raw_rows
        .into_iter()
        .map(|row| row.map(|raw| to_record(&headers, &kinds, &raw)))
        .collect();

    Ok(ParsedTable { headers, rows })
}

/// Keeps header text verbatim, names empty headers `Unnamed: <position>`
/// and suffixes duplicates `.N`.
fn normalize_headers(raw: &StringRecord) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.iter()
        .enumerate()
        .map(|(position, header)| {
            let base = match header {
                "" => format!("Unnamed: {position}"),
                verbatim => verbatim.to_string(),
            };
            let occurrences = seen.entry(base.clone()).or_insert(0);
            *occurrences += 1;
            if *occurrences == 1 {
                base
            } else {
                format!("{base}.{}", *occurrences - 1)
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    fn widen(self, cell: &str) -> Self {
        let cell = cell.trim();
        if cell.is_empty() {
            return self;
        }
        match self {
            Self::Integer if cell.parse::<i64>().is_ok() => Self::Integer,
            Self::Integer | Self::Float if parse_finite(cell).is_some() => Self::Float,
            _ => Self::Text,
        }
    }
}

fn infer_column_kinds<'a>(
    width: usize,
    rows: impl Iterator<Item = &'a StringRecord>,
) -> Vec<ColumnKind> {
    let mut kinds = vec![ColumnKind::Integer; width];
    for row in rows {
        for (kind, cell) in kinds.iter_mut().zip(row.iter()) {
            *kind = kind.widen(cell);
        }
    }
    kinds
}

fn to_record(headers: &[String], kinds: &[ColumnKind], row: &StringRecord) -> Record {
    headers
        .iter()
        .zip(kinds)
        .zip(row.iter())
        .map(|((header, kind), cell)| (header.clone(), convert_cell(*kind, cell)))
        .collect()
}

fn convert_cell(kind: ColumnKind, cell: &str) -> FieldValue {
    if cell.trim().is_empty() {
        return FieldValue::Null;
    }
    match kind {
        ColumnKind::Integer => cell
            .trim()
            .parse::<i64>()
            .map(FieldValue::Integer)
            .unwrap_or_else(|_| FieldValue::Text(cell.to_string())),
        ColumnKind::Float => parse_finite(cell.trim())
            .map(FieldValue::Float)
            .unwrap_or_else(|| FieldValue::Text(cell.to_string())),
        ColumnKind::Text => FieldValue::Text(cell.to_string()),
    }
}

fn parse_finite(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|value| value.is_finite())
}
