//! erclust - cluster instruments by their efficiency-ratio profile
//!
//! # Usage
//! ```sh
//! erclust analyze --universe universe.toml --json report.json
//! erclust analyze --symbols US500,GER40,XAUUSD --data-dir data --family gmm
//! erclust demo --bars 750 --family agglomerative
//! ```
//!
//! Unset flags fall back to the environment (`ER_INIT_PERIOD`, `ER_END_PERIOD`,
//! `CLUSTER_FAMILY`, `CLUSTER_COUNT`, `CLUSTER_MAX_COUNT`, `CLUSTER_SEED`,
//! `GMM_CRITERION`, `DEGENERATE_COLUMN_POLICY`, `ALIGN_TIMESTAMPS`), then to
//! the built-in defaults.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use erclust::application::analysis::{
    AnalysisConfig, AnalysisReport, EfficiencyRatioAnalysis, load_universe,
};
use erclust::config::{AnalysisEnvConfig, UniverseConfig};
use erclust::domain::ports::PriceHistoryProvider;
use erclust::infrastructure::{CsvPriceSource, SyntheticPriceSource};
use erclust::interfaces::AnalysisReporter;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Efficiency-ratio clustering of financial instruments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster instruments loaded from CSV files
    Analyze {
        /// Comma-separated symbols, each read from <data-dir>/<SYMBOL>.csv
        #[arg(short, long)]
        symbols: Option<String>,

        /// TOML universe file (symbols, data_dir, start, end)
        #[arg(short, long)]
        universe: Option<PathBuf>,

        /// Directory holding the CSV files (overrides the universe file)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Run the analysis on generated random-walk data
    Demo {
        /// Bars per instrument
        #[arg(short, long, default_value = "500")]
        bars: usize,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },
}

#[derive(Args)]
struct AnalysisArgs {
    /// First lookback length (inclusive)
    #[arg(long)]
    init_period: Option<usize>,

    /// Last lookback length (exclusive)
    #[arg(long)]
    end_period: Option<usize>,

    /// kmeans, gmm or agglomerative
    #[arg(short, long)]
    family: Option<String>,

    /// Fixed cluster count (skips the sweep)
    #[arg(short = 'k', long)]
    count: Option<usize>,

    /// Largest cluster count tried by the sweep
    #[arg(long)]
    max_count: Option<usize>,

    /// aic or bic (mixture family)
    #[arg(long)]
    criterion: Option<String>,

    /// zero-fill, drop or reject
    #[arg(long)]
    degenerate_policy: Option<String>,

    #[arg(long)]
    seed: Option<u64>,

    /// Keep only timestamps shared by every instrument
    #[arg(long)]
    align: bool,

    /// Write the full report as JSON
    #[arg(long)]
    json: Option<String>,

    /// Write the instrument/ratio/cluster table as CSV
    #[arg(long)]
    csv: Option<String>,

    #[arg(short, long, default_value = ".")]
    output_dir: String,
}

impl AnalysisArgs {
    /// Environment first, flags on top.
    fn resolve(&self) -> Result<AnalysisConfig> {
        let mut env = AnalysisEnvConfig::from_env().context("Failed to load analysis config")?;

        if let Some(init) = self.init_period {
            env.init_period = init;
        }
        if let Some(end) = self.end_period {
            env.end_period = end;
        }
        if let Some(family) = &self.family {
            env.family = family.parse()?;
        }
        if let Some(count) = self.count {
            env.fixed_count = Some(count);
        }
        if let Some(max_count) = self.max_count {
            env.max_count = max_count;
        }
        if let Some(criterion) = &self.criterion {
            env.criterion = criterion.parse()?;
        }
        if let Some(policy) = &self.degenerate_policy {
            env.degenerate_policy = policy.parse()?;
        }
        if let Some(seed) = self.seed {
            env.seed = seed;
        }
        if self.align {
            env.align_timestamps = true;
        }

        Ok(env.to_analysis_config())
    }
}

async fn run(
    provider: &dyn PriceHistoryProvider,
    symbols: &[String],
    window: (Option<chrono::DateTime<chrono::Utc>>, Option<chrono::DateTime<chrono::Utc>>),
    args: &AnalysisArgs,
) -> Result<AnalysisReport> {
    let config = args.resolve()?;
    let reporter = AnalysisReporter::new(&args.output_dir);
    reporter.print_header(
        provider.name(),
        symbols.len(),
        (config.init_period, config.end_period),
        &config.clustering.family.to_string(),
    );

    let analysis = EfficiencyRatioAnalysis::new(config)?;
    let universe = load_universe(provider, symbols, window.0, window.1).await?;
    let report = analysis.run(&universe)?;

    reporter.print_report(&report);
    if let Some(json) = &args.json {
        reporter.export_json(&report, json)?;
    }
    if let Some(csv) = &args.csv {
        reporter.export_csv(&report, csv)?;
    }
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();
    info!("erclust {} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Analyze {
            symbols,
            universe,
            data_dir,
            analysis,
        } => {
            let file = universe
                .as_deref()
                .map(UniverseConfig::load)
                .transpose()?;

            let symbols: Vec<String> = match (&symbols, &file) {
                (Some(list), _) => list
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                (None, Some(file)) => file.symbols.clone(),
                (None, None) => bail!("Provide --symbols or --universe"),
            };

            let data_dir = data_dir
                .or_else(|| file.as_ref().map(|f| f.data_dir.clone()))
                .unwrap_or_else(|| PathBuf::from("data"));
            let window = match &file {
                Some(f) => (f.start_datetime()?, f.end_datetime()?),
                None => (None, None),
            };

            let provider = CsvPriceSource::new(data_dir);
            run(&provider, &symbols, window, &analysis).await?;
        }
        Commands::Demo { bars, analysis } => {
            let seed = analysis.resolve()?.clustering.seed;
            let (provider, symbols) = SyntheticPriceSource::demo(seed, bars);
            run(&provider, &symbols, (None, None), &analysis).await?;
        }
    }

    Ok(())
}
