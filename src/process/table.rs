use polars::prelude::*;

/// A shaped per-job table: the two postal key columns first, then the
/// remaining value columns. Keys may repeat across rows.
pub type Table = DataFrame;

/// Column label under which a job's metric ends up.
pub fn year_label(year: i32) -> String {
    year.to_string()
}

/// Owned column names, left to right.
pub fn column_names(table: &DataFrame) -> Vec<String> {
    table
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Compound row key `(postal code from, postal code to)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostalKey {
    pub from: String,
    pub to: String,
}

impl PostalKey {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}
