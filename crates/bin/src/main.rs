//! ff5 CLI binary.
//!
//! Runs the Fama-French five-factor regression for a ticker fetched from
//! Yahoo Finance, or for returns entered by hand, and manages the data cache.

mod integration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use ff5::{Analysis, AnalysisOptions, FetchRequest, analyze_manual};
use ff5_data::manual::{DEFAULT_MANUAL_PERIODS, load_manual_csv};
use ff5_data::{DateRange, Frequency, RetryPolicy};
use ff5_model::{AlignOptions, FitOptions, MismatchPolicy};
use ff5_output::{ExportFormat, Exporter, Report, beta_chart};
use indicatif::{ProgressBar, ProgressStyle};
use integration::cache_manager;
use integration::data_pipeline::{FetchConfig, fetch_and_analyze};
use integration::manual_prompt::prompt_periods;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ff5")]
#[command(
    about = "Fama-French five-factor regression of a stock's excess returns",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Location of the SQLite cache
    #[arg(long, global = true)]
    cache_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch prices and factors, then run the regression
    Fetch {
        /// Stock symbol
        symbol: String,

        /// First day of the price history (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the price history (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Return frequency
        #[arg(long, value_enum, default_value_t = FrequencyArg::Monthly)]
        frequency: FrequencyArg,

        /// Local five-factor CSV or zip in the French library layout
        #[arg(long)]
        factors_file: Option<PathBuf>,

        /// Disable caching (always fetch fresh data)
        #[arg(long)]
        no_cache: bool,

        /// Force refresh cached data
        #[arg(long)]
        refresh: bool,

        /// Age in hours after which cached data is refetched
        #[arg(long, default_value_t = 24)]
        ttl_hours: u64,

        /// Timeout per remote request, in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,

        /// Retries for transient network failures
        #[arg(long, default_value_t = 2)]
        retries: u32,

        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Enter per-period returns by hand, then run the regression
    Manual {
        /// Number of periods to prompt for
        #[arg(
            long,
            default_value_t = DEFAULT_MANUAL_PERIODS as u32,
            value_parser = clap::value_parser!(u32).range(2..)
        )]
        periods: u32,

        /// Read periods from a CSV with header Stock,RF,Mkt-RF,SMB,HML,RMW,CMA
        #[arg(long)]
        file: Option<PathBuf>,

        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Inspect and invalidate the data cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache statistics
    Stats,

    /// Remove cached entries
    Clear {
        /// Only entries whose source starts with this id (e.g. `yahoo:AAPL`)
        #[arg(long)]
        source: Option<String>,
    },

    /// Remove entries older than the TTL
    Purge {
        /// Age in hours beyond which entries are removed
        #[arg(long, default_value_t = 24)]
        ttl_hours: u64,
    },
}

#[derive(clap::Args)]
struct ModelArgs {
    /// Handling of periods present in only one series
    #[arg(long, value_enum, default_value_t = PolicyArg::Warn)]
    policy: PolicyArg,

    /// Confidence level for coefficient intervals
    #[arg(long, default_value_t = 0.95)]
    confidence: f64,
}

impl ModelArgs {
    fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            align: AlignOptions::with_policy(self.policy.into()),
            fit: FitOptions {
                confidence_level: self.confidence,
                ..FitOptions::default()
            },
        }
    }
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,

    /// Also write the report to this file (.csv, .json or .md)
    #[arg(long)]
    export: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FrequencyArg {
    Daily,
    Monthly,
}

impl From<FrequencyArg> for Frequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Daily => Self::Daily,
            FrequencyArg::Monthly => Self::Monthly,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Silent,
    Warn,
    Strict,
}

impl From<PolicyArg> for MismatchPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Silent => Self::Silent,
            PolicyArg::Warn => Self::Warn,
            PolicyArg::Strict => Self::Strict,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Markdown,
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let cache_path = cache_manager::resolve_cache_path(cli.cache_path.as_deref());

    match cli.command {
        Commands::Fetch {
            symbol,
            start,
            end,
            frequency,
            factors_file,
            no_cache,
            refresh,
            ttl_hours,
            timeout_secs,
            retries,
            model,
            output,
        } => {
            let config = FetchConfig {
                use_cache: !no_cache,
                force_refresh: refresh,
                ttl: Duration::from_secs(ttl_hours * 3600),
                timeout: Duration::from_secs(timeout_secs),
                retry: RetryPolicy {
                    max_retries: retries,
                    ..RetryPolicy::default()
                },
                cache_path,
            };
            let request = FetchRequest {
                symbol: symbol.trim().to_uppercase(),
                range: DateRange::new(start, end)?,
                frequency: frequency.into(),
            };
            fetch_symbol(&request, factors_file.as_deref(), &config, &model, &output).await?;
        }
        Commands::Manual { periods, file, model, output } => {
            let series = match file {
                Some(path) => load_manual_csv(&path)?.build()?,
                None => {
                    let stdin = std::io::stdin();
                    prompt_periods(&mut stdin.lock(), &mut std::io::stdout(), periods as usize)?
                }
            };
            let analysis = analyze_manual(&series, &model.options())?;
            present(&analysis, "Manual entry", None, &output)?;
        }
        Commands::Cache { action } => manage_cache(&cache_path, action)?,
    }

    Ok(())
}

async fn fetch_symbol(
    request: &FetchRequest,
    factors_file: Option<&Path>,
    config: &FetchConfig,
    model: &ModelArgs,
    output: &OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!(
        "Fetching {} ({}, {})...",
        request.symbol, request.frequency, request.range
    ));

    let analysis = match fetch_and_analyze(request, factors_file, config, &model.options()).await {
        Ok(analysis) => {
            pb.finish_with_message(format!(
                "Fitted {} periods ({} to {})",
                analysis.result.n_observations, analysis.first_period, analysis.last_period
            ));
            analysis
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };

    present(&analysis, &request.symbol, Some(request.frequency), output)
}

fn present<K: Display>(
    analysis: &Analysis<K>,
    name: &str,
    frequency: Option<Frequency>,
    output: &OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let report: Report = analysis.report(name, frequency)?;

    match output.format {
        FormatArg::Text => {
            println!("{}", report.summary().to_ascii_table());
            println!("Factor Loadings");
            println!("{}", beta_chart(&analysis.result));
            println!("{}", report.summary().headline());
        }
        FormatArg::Markdown => println!("{}", report.export_to_string(ExportFormat::Markdown)?),
        FormatArg::Json => println!("{}", report.export_to_string(ExportFormat::PrettyJson)?),
    }

    if let Some(path) = &output.export {
        report.export_to_file(path, ExportFormat::from_path(path)?)?;
        eprintln!("Report written to {}", path.display());
    }

    Ok(())
}

fn manage_cache(path: &Path, action: CacheAction) -> Result<(), Box<dyn std::error::Error>> {
    let cache = cache_manager::open_cache(path)?;

    match action {
        CacheAction::Stats => print!("{}", cache_manager::format_stats(path, &cache.get_stats()?)),
        CacheAction::Clear { source: Some(source) } => {
            let removed = cache.clear_source(&source)?;
            println!("Removed {removed} cached entries for {source}");
        }
        CacheAction::Clear { source: None } => {
            let removed = cache.clear_all()?;
            println!("Removed {removed} cached entries");
        }
        CacheAction::Purge { ttl_hours } => {
            let removed = cache.purge_expired(Duration::from_secs(ttl_hours * 3600))?;
            println!("Purged {removed} entries older than {ttl_hours}h");
        }
    }

    Ok(())
}
