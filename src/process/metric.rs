use super::config::{AANT, FSP};
use crate::catalog::JobUnit;
use crate::error::PipelineError;
use polars::prelude::*;

/// Round to the nearest integer, ties to even (2.5 → 2, 3.5 → 4).
///
/// Historical totals were produced with this rule; do not swap it for
/// `f64::round`, which rounds ties away from zero.
pub fn round_half_even(value: f64) -> f64 {
    value.round_ties_even()
}

/// `round(count * pct / 100)` for one row.
pub fn active_connections(count: f64, pct: f64) -> i64 {
    round_half_even(count * pct / 100.0) as i64
}

/// Parse a text cell with the given decimal mark. With a `,` mark a cell
/// containing `.` is not a number.
pub fn parse_number(raw: &str, decimal: char) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if decimal == '.' {
        return trimmed.parse().ok();
    }
    if trimmed.contains('.') {
        return None;
    }
    trimmed.replacen(decimal, ".", 1).parse().ok()
}

/// One finite number per row of `name`, or the first offending cell.
fn numeric_column(table: &DataFrame, name: &str, job: &JobUnit) -> Result<Vec<f64>, PipelineError> {
    let frame_err = |e: PolarsError| PipelineError::Frame {
        dso: job.source,
        year: job.year,
        reason: e.to_string(),
    };
    let non_numeric = |row: usize, value: String| PipelineError::NonNumeric {
        dso: job.source,
        year: job.year,
        column: name.to_string(),
        row,
        value,
    };

    let column = table.column(name).map_err(frame_err)?;
    if column.dtype() == &DataType::String {
        column
            .str()
            .map_err(frame_err)?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| {
                cell.and_then(|s| parse_number(s, job.options.decimal))
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| non_numeric(row, cell.unwrap_or_default().to_string()))
            })
            .collect()
    } else {
        let cast = column.cast(&DataType::Float64).map_err(frame_err)?;
        cast.f64()
            .map_err(frame_err)?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| {
                cell.filter(|v| v.is_finite())
                    .ok_or_else(|| non_numeric(row, cell.map(|v| v.to_string()).unwrap_or_default()))
            })
            .collect()
    }
}

/// Active connections per row. Both the count and the physical status
/// percentage must be present, and every cell numeric.
pub fn get_active_connections(table: &DataFrame, job: &JobUnit) -> Result<Vec<i64>, PipelineError> {
    let schema = table.schema();
    let mut missing: Vec<String> = [AANT, FSP]
        .into_iter()
        .filter(|name| !schema.contains(name))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(PipelineError::MissingField {
            dso: job.source,
            year: job.year,
            fields: missing,
        });
    }

    let counts = numeric_column(table, AANT, job)?;
    let pcts = numeric_column(table, FSP, job)?;
    Ok(counts
        .into_iter()
        .zip(pcts)
        .map(|(count, pct)| active_connections(count, pct))
        .collect())
}
