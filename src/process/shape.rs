use super::config::{PCT, PCV, PS};
use super::table::column_names;
use crate::catalog::JobUnit;
use crate::error::PipelineError;
use polars::prelude::*;

const WHITESPACE: &str = " \t\r\n";

fn frame_error(job: &JobUnit) -> impl Fn(PolarsError) -> PipelineError + '_ {
    move |e| PipelineError::Frame {
        dso: job.source,
        year: job.year,
        reason: e.to_string(),
    }
}

fn missing_fields(
    table: &DataFrame,
    required: &[&str],
    job: &JobUnit,
) -> Result<(), PipelineError> {
    let schema = table.schema();
    let mut fields: Vec<String> = required
        .iter()
        .filter(|name| !schema.contains(name))
        .map(|name| name.to_string())
        .collect();
    if fields.is_empty() {
        return Ok(());
    }
    fields.sort();
    Err(PipelineError::MissingField {
        dso: job.source,
        year: job.year,
        fields,
    })
}

/// Keep rows whose product type equals `product`, ignoring case and padding.
/// Rows with no product type are dropped.
pub fn filter_product_type(
    table: DataFrame,
    product: &str,
    job: &JobUnit,
) -> Result<DataFrame, PipelineError> {
    missing_fields(&table, &[PS], job)?;
    let target = product.trim().to_uppercase();
    table
        .lazy()
        .filter(
            col(PS)
                .cast(DataType::String)
                .str()
                .strip_chars(lit(WHITESPACE))
                .str()
                .to_uppercase()
                .eq(lit(target)),
        )
        .collect()
        .map_err(frame_error(job))
}

/// Drop every listed column that is present; absent names are ignored.
pub fn filter_columns(table: DataFrame, drop: &[String]) -> DataFrame {
    table.drop_many(drop.iter().map(String::as_str))
}

/// Move `(POSTCODE_VAN, POSTCODE_TOT)` to the front as trimmed text key
/// columns; a missing code becomes the empty string. Duplicate keys are kept.
pub fn set_postal_code_index(
    table: DataFrame,
    job: &JobUnit,
) -> Result<DataFrame, PipelineError> {
    missing_fields(&table, &[PCV, PCT], job)?;
    let key = |name: &str| {
        col(name)
            .cast(DataType::String)
            .str()
            .strip_chars(lit(WHITESPACE))
            .fill_null(lit(""))
    };
    let keyed = table
        .lazy()
        .with_columns([key(PCV), key(PCT)])
        .collect()
        .map_err(frame_error(job))?;

    let order: Vec<String> = [PCV.to_string(), PCT.to_string()]
        .into_iter()
        .chain(
            column_names(&keyed)
                .into_iter()
                .filter(|name| name != PCV && name != PCT),
        )
        .collect();
    keyed.select(order).map_err(frame_error(job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Dso, ParseOptions};
    use crate::process::config::PipelineConfig;
    use polars::df;

    fn job() -> JobUnit {
        JobUnit {
            source: Dso::Liander,
            year: 2015,
            options: ParseOptions::default(),
        }
    }

    fn i64s(table: &DataFrame, name: &str) -> Vec<Option<i64>> {
        table.column(name).unwrap().i64().unwrap().into_iter().collect()
    }

    fn strs(table: &DataFrame, name: &str) -> Vec<Option<String>> {
        table
            .column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn product_filter_ignores_case_and_padding() {
        let t = df!(
            PS => [Some(" gas "), Some("GAS"), Some("Gas"), Some("ELK"), Some("gasx"), None],
            "N" => [1i64, 2, 3, 4, 5, 6]
        )
        .unwrap();
        let t = filter_product_type(t, "GAS", &job()).unwrap();
        assert_eq!(i64s(&t, "N"), vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn product_filter_target_is_normalized() {
        let t = df!(PS => ["ELK"]).unwrap();
        assert_eq!(filter_product_type(t, " elk", &job()).unwrap().height(), 1);
    }

    #[test]
    fn product_filter_requires_product_column() {
        let t = df!("X" => ["GAS"]).unwrap();
        match filter_product_type(t, "GAS", &job()) {
            Err(PipelineError::MissingField { fields, .. }) => assert_eq!(fields, vec![PS]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pruning_ignores_absent_columns() {
        let t = df!("WOONPLAATS" => ["Delft"], "KEEP" => [1i64]).unwrap();
        let t = filter_columns(t, &PipelineConfig::default().primary_drop);
        assert_eq!(column_names(&t), vec!["KEEP"]);
        assert_eq!(i64s(&t, "KEEP"), vec![Some(1)]);
    }

    #[test]
    fn pruning_matches_normalized_noise_labels() {
        let t = df!(
            "GEMIDDELD AANTAL TELWIELEN" => ["4"],
            "%DEFINTIEVE AANSL (NRM)" => ["100"]
        )
        .unwrap();
        let t = filter_columns(t, &PipelineConfig::default().primary_drop);
        assert_eq!(t.width(), 0);
    }

    #[test]
    fn postal_index_keeps_duplicate_keys() {
        let t = df!(
            "N" => [1i64, 2, 3],
            PCT => [" 1099ZZ", "1099ZZ", "2099ZZ"],
            PCV => [Some("1000AA"), Some("1000AA"), None]
        )
        .unwrap();
        let t = set_postal_code_index(t, &job()).unwrap();
        assert_eq!(t.height(), 3);
        assert_eq!(column_names(&t), vec![PCV, PCT, "N"]);
        assert_eq!(
            strs(&t, PCV),
            vec![Some("1000AA".into()), Some("1000AA".into()), Some(String::new())]
        );
        assert_eq!(strs(&t, PCT)[0], strs(&t, PCT)[1]);
        assert_eq!(i64s(&t, "N"), vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn postal_index_requires_both_columns() {
        let t = df!(PCV => ["1000AA"]).unwrap();
        match set_postal_code_index(t, &job()) {
            Err(PipelineError::MissingField { fields, .. }) => assert_eq!(fields, vec![PCT]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
