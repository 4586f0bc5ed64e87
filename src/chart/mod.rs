// src/chart/mod.rs
//! Line charts of yearly totals: one per source plus one summed over all sources.
mod config;
mod svg;

pub use config::{AxesConfig, GraphConfig, RangeConfig, ALL_DSOS};
pub use svg::{axis_bounds, render_line_chart, Series};

use crate::catalog::Dso;
use crate::error::ChartError;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// matplotlib's tab10 palette.
const TAB10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

pub type Totals = BTreeMap<Dso, BTreeMap<i32, i64>>;

#[derive(Debug, Default)]
pub struct ChartReport {
    /// graph id → written file
    pub generated: BTreeMap<String, PathBuf>,
    pub failures: Vec<(String, ChartError)>,
}

/// Years (and their totals) inside `[start, end]`; bounds default to the
/// first and last year present.
pub fn year_window(
    values: &BTreeMap<i32, i64>,
    start: Option<i32>,
    end: Option<i32>,
) -> Result<(Vec<i32>, Vec<i64>), ChartError> {
    let (Some(first), Some(last)) = (values.keys().next(), values.keys().next_back()) else {
        return Ok((Vec::new(), Vec::new()));
    };
    let start = start.unwrap_or(*first);
    let end = end.unwrap_or(*last);
    if start > end {
        return Err(ChartError::InvalidRange { start, end });
    }
    Ok(values.range(start..=end).map(|(y, v)| (*y, *v)).unzip())
}

/// Per-year sum over all sources.
pub fn aggregate_totals(results: &Totals) -> BTreeMap<i32, i64> {
    let mut aggregate = BTreeMap::new();
    for years in results.values() {
        for (year, value) in years {
            *aggregate.entry(*year).or_insert(0) += value;
        }
    }
    aggregate
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut boundary = true;
    for c in s.chars() {
        if boundary {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        boundary = !c.is_alphabetic();
    }
    out
}

fn write_series(graph_id: &str, series: &Series, output_dir: &Path) -> Result<PathBuf, ChartError> {
    if series.years.is_empty() {
        return Err(ChartError::EmptySeries(graph_id.to_string()));
    }
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{}_active_connections.svg", graph_id));
    fs::write(&path, render_line_chart(series))?;
    Ok(path)
}

struct Graph {
    graph_id: String,
    range: RangeConfig,
    title: String,
    palette_index: usize,
}

fn plot_one(
    config: &GraphConfig,
    graph: Graph,
    values: &BTreeMap<i32, i64>,
    report: &mut ChartReport,
) {
    let result = year_window(values, graph.range.start_year, graph.range.end_year).and_then(
        |(years, totals)| {
            let series = Series {
                years,
                totals,
                title: graph.title.clone(),
                color: graph
                    .range
                    .color
                    .clone()
                    .unwrap_or_else(|| TAB10[graph.palette_index % TAB10.len()].to_string()),
                x_label: config.x_label(&graph.range),
                y_label: config.y_label(&graph.range),
            };
            write_series(&graph.graph_id, &series, &config.output_dir)
        },
    );
    match result {
        Ok(path) => {
            info!(graph = %graph.graph_id, path = %path.display(), "wrote graph");
            report.generated.insert(graph.graph_id, path);
        }
        Err(e) => {
            warn!(graph = %graph.graph_id, error = %e, "graph failed");
            report.failures.push((graph.graph_id, e));
        }
    }
}

/// One graph per source with data, plus the summed graph. Failures are
/// collected per graph and never stop the others.
pub fn plot_connection_graphs(results: &Totals, config: &GraphConfig) -> ChartReport {
    let mut report = ChartReport::default();

    for dso in Dso::ALL {
        let Some(values) = results.get(&dso).filter(|v| !v.is_empty()) else {
            continue;
        };
        let key = dso.as_str();
        let range = config.range(key);
        let graph = Graph {
            graph_id: range
                .graph_id
                .clone()
                .unwrap_or_else(|| key.replace(' ', "_")),
            title: range
                .title
                .clone()
                .unwrap_or_else(|| format!("{} active gas connections", title_case(key))),
            range,
            palette_index: dso.index(),
        };
        plot_one(config, graph, values, &mut report);
    }

    let aggregate = aggregate_totals(results);
    if !aggregate.is_empty() {
        let range = config.range(ALL_DSOS);
        let graph = Graph {
            graph_id: range
                .graph_id
                .clone()
                .unwrap_or_else(|| ALL_DSOS.to_string()),
            title: range
                .title
                .clone()
                .unwrap_or_else(|| "All DSOs - active gas connections".to_string()),
            range,
            palette_index: Dso::ALL.len(),
        };
        plot_one(config, graph, &aggregate, &mut report);
    }

    report
}

/// Load the chart configuration at `config_path` and plot. A missing
/// configuration produces an empty report.
pub fn plot_from_config_file(results: &Totals, config_path: &Path) -> Result<ChartReport, ChartError> {
    match GraphConfig::load(config_path)? {
        Some(config) => Ok(plot_connection_graphs(results, &config)),
        None => Ok(ChartReport::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn totals() -> Totals {
        BTreeMap::from([
            (Dso::Liander, BTreeMap::from([(2019, 10), (2020, 12), (2021, 11)])),
            (Dso::Stedin, BTreeMap::from([(2020, 5), (2021, 6)])),
            (Dso::Enexis, BTreeMap::new()),
        ])
    }

    #[test]
    fn window_defaults_to_available_years() {
        let values = BTreeMap::from([(2019, 1), (2020, 2), (2021, 3)]);
        assert_eq!(
            year_window(&values, None, None).unwrap(),
            (vec![2019, 2020, 2021], vec![1, 2, 3])
        );
        assert_eq!(
            year_window(&values, Some(2020), None).unwrap(),
            (vec![2020, 2021], vec![2, 3])
        );
    }

    #[test]
    fn inverted_window_is_an_error() {
        let values = BTreeMap::from([(2019, 1)]);
        assert!(matches!(
            year_window(&values, Some(2021), Some(2019)),
            Err(ChartError::InvalidRange {
                start: 2021,
                end: 2019
            })
        ));
    }

    #[test]
    fn aggregate_sums_per_year() {
        let agg = aggregate_totals(&totals());
        assert_eq!(agg, BTreeMap::from([(2019, 10), (2020, 17), (2021, 17)]));
    }

    #[test]
    fn title_case_matches_source_names() {
        assert_eq!(title_case("westland-infra"), "Westland-Infra");
        assert_eq!(title_case("liander"), "Liander");
    }

    #[test]
    fn writes_one_graph_per_source_and_total() {
        let dir = tempdir().unwrap();
        let config = GraphConfig::from_yaml(&format!(
            "output_dir: {}\nyear_ranges:\n  stedin:\n    graph_id: st\n",
            dir.path().display()
        ))
        .unwrap()
        .unwrap();
        let report = plot_connection_graphs(&totals(), &config);
        assert!(report.failures.is_empty());
        let ids: Vec<&str> = report.generated.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["all_dsos", "liander", "st"]);
        assert!(dir.path().join("st_active_connections.svg").exists());
        assert!(dir.path().join("all_dsos_active_connections.svg").exists());
    }

    #[test]
    fn graph_failures_are_isolated() {
        let dir = tempdir().unwrap();
        let yaml = format!(
            "output_dir: {}\nyear_ranges:\n  liander:\n    start_year: 2022\n    end_year: 2020\n  stedin:\n    start_year: 2030\n",
            dir.path().display()
        );
        let config = GraphConfig::from_yaml(&yaml).unwrap().unwrap();
        let report = plot_connection_graphs(&totals(), &config);

        let failed: BTreeMap<&str, &ChartError> =
            report.failures.iter().map(|(id, e)| (id.as_str(), e)).collect();
        assert!(matches!(failed["liander"], ChartError::InvalidRange { .. }));
        // 2030..=2021 is inverted too, since end defaults to the last year
        assert!(matches!(failed["stedin"], ChartError::InvalidRange { .. }));
        assert!(report.generated.contains_key("all_dsos"));
    }

    #[test]
    fn empty_window_fails_that_graph_only() {
        let dir = tempdir().unwrap();
        let yaml = format!(
            "output_dir: {}\nyear_ranges:\n  stedin:\n    start_year: 2010\n    end_year: 2015\n",
            dir.path().display()
        );
        let config = GraphConfig::from_yaml(&yaml).unwrap().unwrap();
        let report = plot_connection_graphs(&totals(), &config);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].1, ChartError::EmptySeries(ref id) if id == "stedin"));
        assert!(report.generated.contains_key("liander"));
    }

    #[test]
    fn missing_config_file_plots_nothing() {
        let dir = tempdir().unwrap();
        let report =
            plot_from_config_file(&totals(), &dir.path().join("graph_config.yaml")).unwrap();
        assert!(report.generated.is_empty());
        assert!(report.failures.is_empty());
    }
}
