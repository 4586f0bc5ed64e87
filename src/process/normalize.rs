use super::table::column_names;
use polars::prelude::*;
use std::collections::HashMap;

/// Trim whitespace, then surrounding quotes, then upper-case.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().trim_matches('"').to_uppercase()
}

/// Normalize every column label, then rename those matching a (normalized)
/// key of `aliases`. Unmatched columns are left alone. Fails when two
/// columns end up with the same label.
pub fn map_columns(
    mut table: DataFrame,
    aliases: &[(String, String)],
) -> PolarsResult<DataFrame> {
    let lookup: HashMap<String, &str> = aliases
        .iter()
        .map(|(from, to)| (normalize_name(from), to.as_str()))
        .collect();

    let names: Vec<String> = column_names(&table)
        .iter()
        .map(|label| {
            let normalized = normalize_name(label);
            match lookup.get(&normalized) {
                Some(target) => target.to_string(),
                None => normalized,
            }
        })
        .collect();
    table.set_column_names(names)?;
    Ok(table)
}
