use anyhow::{Context, Result};
use clap::Parser;
use dsoconnections::{
    catalog::SourceCatalog,
    chart,
    engine::{Engine, EngineConfig},
    process::{CsvDirectory, PipelineConfig},
};
use std::{path::PathBuf, sync::Arc, time::Duration, time::Instant};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "dsoconnections")]
#[command(about = "Active gas connections per grid operator per year", long_about = None)]
struct Cli {
    /// Root holding `<source>/<source>-<year>.csv`.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// YAML source catalog; defaults to the built-in one.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Chart configuration; no charts are drawn when it is absent.
    #[arg(long, default_value = "graph_config.yaml")]
    graph_config: PathBuf,

    /// Upper bound on worker threads.
    #[arg(long)]
    workers: Option<usize>,

    /// Per-job timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Skip the profiling summary.
    #[arg(long)]
    no_profile: bool,

    /// Product type to count.
    #[arg(long, default_value = "GAS")]
    product: String,
}

fn main() -> Result<()> {
    let tic = Instant::now();

    // ─── 1) init logging (stderr; stdout carries the JSON) ───────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    // ─── 2) catalog + pipeline configuration ─────────────────────────
    let catalog = match &cli.catalog {
        Some(path) => SourceCatalog::from_yaml_file(path)?,
        None => SourceCatalog::builtin(),
    };
    info!(jobs = catalog.len(), data_dir = %cli.data_dir.display(), "startup");

    let engine = Engine::new(
        Arc::new(CsvDirectory::new(&cli.data_dir)),
        PipelineConfig::default().with_product_type(cli.product.clone()),
        EngineConfig {
            workers: cli.workers,
            timeout: cli.timeout_secs.map(Duration::from_secs),
            profiling: !cli.no_profile,
        },
    );

    // ─── 3) run every (source, year) job ─────────────────────────────
    let outcome = engine.run_catalog(&catalog)?;

    if !cli.no_profile && !outcome.profiles.is_empty() {
        eprintln!("{}", outcome.profile_summary());
    }

    println!(
        "{}",
        outcome.totals_json().context("serializing totals")?
    );

    if !outcome.failures.is_empty() {
        eprintln!("\nFailed jobs:");
        for f in &outcome.failures {
            eprintln!(
                "{:>16} {} [{}] {}",
                f.source.as_str(),
                f.year,
                f.error.kind(),
                f.error
            );
        }
    }

    // ─── 4) charts ───────────────────────────────────────────────────
    match chart::plot_from_config_file(&outcome.totals, &cli.graph_config) {
        Ok(report) => {
            for (id, path) in &report.generated {
                info!(graph = %id, path = %path.display(), "graph written");
            }
            for (id, e) in &report.failures {
                error!(graph = %id, "graph failed: {}", e);
            }
        }
        Err(e) => error!("visualization skipped: {}", e),
    }

    eprintln!("Finished processing in {:.4} seconds", tic.elapsed().as_secs_f64());
    Ok(())
}
