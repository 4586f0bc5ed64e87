// src/process/mod.rs
//! Per-job pipeline: read → normalize → filter → compute → index → relabel.
pub mod config;
pub mod metric;
pub mod normalize;
pub mod raw_table;
pub mod reader;
pub mod shape;
pub mod table;

pub use config::PipelineConfig;
pub use raw_table::RawTable;
pub use reader::{CsvDirectory, MemorySource, TableSource};
pub use table::{column_names, year_label, PostalKey, Table};

use crate::catalog::{Dso, JobUnit};
use crate::error::PipelineError;
use crate::profile::{ProfileRecord, TOTAL_JOB_TIME};
use polars::prelude::*;
use std::time::Instant;
use tracing::info;

/// Everything one successful job hands back to the coordinator.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub source: Dso,
    pub year: i32,
    pub total: i64,
    /// Postal key columns followed by the metric, labelled with `year`.
    pub table: Table,
    pub profile: ProfileRecord,
}

/// Run the full pipeline for one job.
#[tracing::instrument(level = "info", skip_all, fields(source = %job.source, year = job.year))]
pub fn calculate_active_connections(
    job: &JobUnit,
    source: &dyn TableSource,
    config: &PipelineConfig,
) -> Result<JobOutput, PipelineError> {
    let start = Instant::now();
    let mut profile = ProfileRecord::new();
    let frame_err = |e: PolarsError| PipelineError::Frame {
        dso: job.source,
        year: job.year,
        reason: e.to_string(),
    };

    let raw = profile.time("read_csv", || source.read(job))?;
    let table = profile
        .time("map_columns_initial", || {
            normalize::map_columns(raw, &config.column_aliases)
        })
        .map_err(frame_err)?;
    let table = profile.time("filter_product_type", || {
        shape::filter_product_type(table, &config.product_type, job)
    })?;
    let mut table = profile.time("filter_columns_primary", || {
        shape::filter_columns(table, &config.primary_drop)
    });

    let metric = profile.time("calculate_active_connections", || {
        metric::get_active_connections(&table, job)
    })?;
    let total = profile.time("sum_active_connections", || metric.iter().sum::<i64>());
    table
        .with_column(Series::new(config::AA.into(), metric))
        .map_err(frame_err)?;

    let table = profile.time("set_postal_code_index", || {
        shape::set_postal_code_index(table, job)
    })?;
    let table = profile.time("filter_columns_post", || {
        shape::filter_columns(table, &config.post_drop)
    });
    let year_alias = [(config::AA.to_string(), year_label(job.year))];
    let table = profile
        .time("map_columns_year_label", || {
            normalize::map_columns(table, &year_alias)
        })
        .map_err(frame_err)?;

    let elapsed = start.elapsed().as_secs_f64();
    profile.add(TOTAL_JOB_TIME, elapsed);
    info!(
        "{} had in {} {} active connections in {:.4} seconds",
        job.source, job.year, total, elapsed
    );

    Ok(JobOutput {
        source: job.source,
        year: job.year,
        total,
        table,
        profile,
    })
}
