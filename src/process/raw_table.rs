use polars::prelude::*;
use std::collections::HashSet;

/// A table exactly as the reader found it: header labels verbatim (padding
/// and quotes included), every column text, blank fields null.
pub type RawTable = DataFrame;

/// Build a text frame from column-major values. Repeated header labels get a
/// `_duplicated_{n}` suffix, the way polars' own CSV reader names them.
pub fn from_columns(
    headers: Vec<String>,
    values: Vec<Vec<Option<String>>>,
) -> PolarsResult<RawTable> {
    let mut seen = HashSet::new();
    let mut columns: Vec<Column> = Vec::with_capacity(headers.len());
    for (header, column) in headers.into_iter().zip(values) {
        let mut name = header.clone();
        let mut n = 0;
        while !seen.insert(name.clone()) {
            name = format!("{}_duplicated_{}", header, n);
            n += 1;
        }
        columns.push(Series::new(name.as_str().into(), column).into());
    }
    DataFrame::new(columns)
}
