use crate::catalog::Dso;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

/// Failures inside a single (source, year) pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{dso} {year}: missing required columns for active connection calculation: {}", .fields.join(", "))]
    MissingField {
        dso: Dso,
        year: i32,
        /// Canonical names, sorted.
        fields: Vec<String>,
    },

    #[error("{dso} {year}: non-numeric value {value:?} in column {column} at row {row}")]
    NonNumeric {
        dso: Dso,
        year: i32,
        column: String,
        row: usize,
        value: String,
    },

    #[error("{dso} {year}: failed to read {}: {reason}", .path.display())]
    Read {
        dso: Dso,
        year: i32,
        path: PathBuf,
        reason: String,
    },

    /// A frame operation was rejected, e.g. two columns normalized to one label.
    #[error("{dso} {year}: table operation failed: {reason}")]
    Frame { dso: Dso, year: i32, reason: String },
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MissingField { .. } => "MissingField",
            PipelineError::NonNumeric { .. } => "NonNumeric",
            PipelineError::Read { .. } => "Read",
            PipelineError::Frame { .. } => "Frame",
        }
    }
}

/// Outcome of a job that did not produce a result.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("{dso} {year}: job exceeded timeout of {after:?}")]
    JobTimeout { dso: Dso, year: i32, after: Duration },

    #[error("{dso} {year}: job cancelled before completion")]
    Cancelled { dso: Dso, year: i32 },

    #[error("{dso} {year}: job panicked: {message}")]
    Panicked {
        dso: Dso,
        year: i32,
        message: String,
    },
}

impl JobError {
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Pipeline(e) => e.kind(),
            JobError::JobTimeout { .. } => "JobTimeout",
            JobError::Cancelled { .. } => "Cancelled",
            JobError::Panicked { .. } => "Panicked",
        }
    }
}

/// Failures of one chart; never abort other charts.
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("invalid year range: start_year ({start}) > end_year ({end})")]
    InvalidRange { start: i32, end: i32 },

    #[error("no data available for graph '{0}'")]
    EmptySeries(String),

    #[error("graph configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConsolidateError {
    #[error("table for {year} has no postal code key columns")]
    NotIndexed { year: i32 },

    #[error("table for {year} has no column labelled {year}")]
    MissingYearColumn { year: i32 },

    #[error("column labelled {year} holds {dtype} values, expected integers")]
    NotInteger { year: i32, dtype: String },

    #[error("consolidating frames: {0}")]
    Frame(String),
}
