// src/consolidate/mod.rs
//! Aligns the per-year tables of one source on their postal key.
use crate::error::ConsolidateError;
use crate::process::config::{PCT, PCV};
use crate::process::{column_names, year_label, PostalKey, Table};
use polars::prelude::*;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WideColumn {
    Year(i32),
    /// `later - year`, where `later` is the next year present.
    Diff(i32),
}

impl WideColumn {
    fn parse(label: &str) -> Option<Self> {
        match label.strip_suffix("_DIFF") {
            Some(year) => year.parse().ok().map(WideColumn::Diff),
            None => label.parse().ok().map(WideColumn::Year),
        }
    }
}

impl fmt::Display for WideColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WideColumn::Year(y) => write!(f, "{}", y),
            WideColumn::Diff(y) => write!(f, "{}_DIFF", y),
        }
    }
}

/// One row per postal key, sorted by key, one integer column per year (and diff).
#[derive(Debug, Clone)]
pub struct WideTable {
    frame: DataFrame,
}

impl WideTable {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Value columns, left to right; the key columns are not listed.
    pub fn columns(&self) -> Vec<WideColumn> {
        column_names(&self.frame)
            .iter()
            .filter_map(|name| WideColumn::parse(name))
            .collect()
    }

    pub fn value(&self, key: &PostalKey, column: WideColumn) -> Option<i64> {
        let from = self.frame.column(PCV).ok()?.str().ok()?;
        let to = self.frame.column(PCT).ok()?.str().ok()?;
        let row = from
            .into_iter()
            .zip(to)
            .position(|(f, t)| f == Some(key.from.as_str()) && t == Some(key.to.as_str()))?;
        self.frame
            .column(&column.to_string())
            .ok()?
            .i64()
            .ok()?
            .get(row)
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Column totals, aligned with [`WideTable::columns`].
    pub fn column_sums(&self) -> Vec<i64> {
        self.columns()
            .iter()
            .map(|c| {
                self.frame
                    .column(&c.to_string())
                    .ok()
                    .and_then(|col| col.i64().ok().and_then(|ca| ca.sum()))
                    .unwrap_or(0)
            })
            .collect()
    }
}

fn frame_error(e: PolarsError) -> ConsolidateError {
    ConsolidateError::Frame(e.to_string())
}

/// Check one year's table and bring it to the common long layout: both key
/// columns, then every year's column, with the other years null.
fn year_frame(year: i32, table: &Table, years: &[String]) -> Result<LazyFrame, ConsolidateError> {
    let schema = table.schema();
    if !schema.contains(PCV) || !schema.contains(PCT) {
        return Err(ConsolidateError::NotIndexed { year });
    }
    let label = year_label(year);
    let dtype = schema
        .get(&label)
        .ok_or(ConsolidateError::MissingYearColumn { year })?;
    if !dtype.is_integer() {
        return Err(ConsolidateError::NotInteger {
            year,
            dtype: dtype.to_string(),
        });
    }

    let mut exprs = vec![col(PCV), col(PCT)];
    exprs.extend(years.iter().map(|y| {
        if *y == label {
            col(y.as_str()).cast(DataType::Int64)
        } else {
            lit(NULL).cast(DataType::Int64).alias(y.as_str())
        }
    }));
    Ok(table.clone().lazy().select(exprs))
}

/// Join per-year tables column-wise on postal key. A key absent in a year is
/// zero for that year; rows sharing a key within one year are summed.
pub fn consolidate_years(tables: &[(i32, Table)]) -> Result<WideTable, ConsolidateError> {
    let years: Vec<String> = tables.iter().map(|(y, _)| year_label(*y)).collect();
    let frames = tables
        .iter()
        .map(|(year, table)| year_frame(*year, table, &years))
        .collect::<Result<Vec<_>, _>>()?;
    if frames.is_empty() {
        return Ok(WideTable {
            frame: DataFrame::empty(),
        });
    }

    let frame = concat(&frames, UnionArgs::default())
        .map_err(frame_error)?
        .group_by([col(PCV), col(PCT)])
        .agg(years.iter().map(|y| col(y.as_str()).sum()).collect::<Vec<_>>())
        .with_columns(
            years
                .iter()
                .map(|y| col(y.as_str()).fill_null(lit(0)))
                .collect::<Vec<_>>(),
        )
        .sort([PCV, PCT], SortMultipleOptions::default())
        .collect()
        .map_err(frame_error)?;
    Ok(WideTable { frame })
}

/// Append `{year}_DIFF` columns for each pair of adjacent years, ascending.
pub fn calculate_yearly_diff(wide: WideTable) -> Result<WideTable, ConsolidateError> {
    let mut years: Vec<i32> = wide
        .columns()
        .into_iter()
        .filter_map(|c| match c {
            WideColumn::Year(y) => Some(y),
            WideColumn::Diff(_) => None,
        })
        .collect();
    years.sort();
    if years.len() < 2 {
        return Ok(wide);
    }

    let diffs: Vec<Expr> = years
        .windows(2)
        .map(|pair| {
            let (cur, next) = (year_label(pair[0]), year_label(pair[1]));
            let label = WideColumn::Diff(pair[0]).to_string();
            (col(next.as_str()) - col(cur.as_str())).alias(label)
        })
        .collect();
    let frame = wide
        .frame
        .lazy()
        .with_columns(diffs)
        .collect()
        .map_err(frame_error)?;
    Ok(WideTable { frame })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn year_table(year: i32, rows: &[(&str, &str, i64)]) -> (i32, Table) {
        let from: Vec<&str> = rows.iter().map(|(f, _, _)| *f).collect();
        let to: Vec<&str> = rows.iter().map(|(_, t, _)| *t).collect();
        let values: Vec<i64> = rows.iter().map(|(_, _, v)| *v).collect();
        let table = df!(PCV => from, PCT => to, year_label(year) => values).unwrap();
        (year, table)
    }

    #[test]
    fn absent_key_is_zero_not_missing() {
        let tables = vec![
            year_table(2020, &[("1000", "1099", 40), ("2000", "2099", 5)]),
            year_table(2021, &[("2000", "2099", 7)]),
        ];
        let wide = consolidate_years(&tables).unwrap();
        let key = PostalKey::new("1000", "1099");
        assert_eq!(wide.value(&key, WideColumn::Year(2020)), Some(40));
        assert_eq!(wide.value(&key, WideColumn::Year(2021)), Some(0));
        assert_eq!(wide.len(), 2);
        assert_eq!(wide.frame().column(PCV).unwrap().null_count(), 0);
    }

    #[test]
    fn duplicate_keys_are_summed() {
        let tables = vec![year_table(
            2020,
            &[("1000", "1099", 3), ("1000", "1099", 4), ("2000", "2099", 1)],
        )];
        let wide = consolidate_years(&tables).unwrap();
        assert_eq!(
            wide.value(&PostalKey::new("1000", "1099"), WideColumn::Year(2020)),
            Some(7)
        );
        assert_eq!(wide.len(), 2);
        assert_eq!(wide.column_sums(), vec![8]);
    }

    #[test]
    fn rows_are_sorted_by_key() {
        let tables = vec![
            year_table(2020, &[("3000", "3099", 1), ("1000", "1099", 2)]),
            year_table(2021, &[("2000", "2099", 3)]),
        ];
        let wide = consolidate_years(&tables).unwrap();
        let from: Vec<Option<&str>> = wide
            .frame()
            .column(PCV)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(from, vec![Some("1000"), Some("2000"), Some("3000")]);
    }

    #[test]
    fn diffs_follow_ascending_years() {
        let tables = vec![
            year_table(2022, &[("1000", "1099", 9)]),
            year_table(2020, &[("1000", "1099", 4)]),
            year_table(2021, &[("1000", "1099", 6)]),
        ];
        let wide = calculate_yearly_diff(consolidate_years(&tables).unwrap()).unwrap();
        let key = PostalKey::new("1000", "1099");
        assert_eq!(
            wide.columns()[3..],
            [WideColumn::Diff(2020), WideColumn::Diff(2021)]
        );
        assert_eq!(wide.value(&key, WideColumn::Diff(2020)), Some(2));
        assert_eq!(wide.value(&key, WideColumn::Diff(2021)), Some(3));
        assert_eq!(WideColumn::Diff(2020).to_string(), "2020_DIFF");
    }

    #[test]
    fn single_year_has_no_diff() {
        let tables = vec![year_table(2020, &[("1000", "1099", 9)])];
        let wide = calculate_yearly_diff(consolidate_years(&tables).unwrap()).unwrap();
        assert_eq!(wide.columns(), vec![WideColumn::Year(2020)]);
    }

    #[test]
    fn table_without_key_columns_is_rejected() {
        let t = df!("2020" => [1i64]).unwrap();
        assert_eq!(
            consolidate_years(&[(2020, t)]).unwrap_err(),
            ConsolidateError::NotIndexed { year: 2020 }
        );
    }

    #[test]
    fn non_integer_year_column_is_rejected() {
        let t = df!(PCV => ["1000"], PCT => ["1099"], "2020" => [1.5]).unwrap();
        assert!(matches!(
            consolidate_years(&[(2020, t)]),
            Err(ConsolidateError::NotInteger { year: 2020, .. })
        ));
    }
}
