use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ltp_outcome_indicators::config::Config;
use ltp_outcome_indicators::db::{self, PgResponseSource};
use ltp_outcome_indicators::http::HttpResponseSource;
use ltp_outcome_indicators::indicators::DEFAULT_THRESHOLD;
use ltp_outcome_indicators::models::Itinerary;
use ltp_outcome_indicators::{
    load_and_aggregate, report, AggregateOptions, Instrument, OutcomeIndicators, QuestionMappings,
    ResponseSet, ResponseSource, Thresholds,
};

#[derive(Parser)]
#[command(name = "ltp-indicators")]
#[command(about = "Learning through Play outcome indicators for monitoring itineraries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo itinerary with responses for every instrument
    Seed,
    /// Create or rename an itinerary
    AddItinerary {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
    /// Import responses from a CSV file with one answer per row
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        itinerary: i64,
        #[arg(long)]
        instrument: Instrument,
    },
    /// Compute every outcome indicator and print it as JSON
    Compute {
        #[command(flatten)]
        inputs: IndicatorArgs,
        #[arg(long)]
        pretty: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        inputs: IndicatorArgs,
        #[arg(long, default_value = "indicators.md")]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Local Postgres store
    Db,
    /// Monitoring REST API
    Api,
    /// JSON file holding all three response collections
    File,
}

#[derive(Args)]
struct IndicatorArgs {
    #[arg(long)]
    itinerary: i64,
    /// JSON file binding question names to question IDs
    #[arg(long)]
    mappings: PathBuf,
    #[arg(long, value_enum, default_value_t = SourceKind::Db)]
    source: SourceKind,
    /// Response set for `--source file`
    #[arg(long, required_if_eq("source", "file"))]
    responses: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    environment_threshold: f64,
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    skills_threshold: f64,
    /// Per-fetch timeout, defaults to LTP_FETCH_TIMEOUT_SECS
    #[arg(long)]
    timeout_secs: Option<u64>,
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let database_url = config.require_database_url()?;
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn compute(
    inputs: &IndicatorArgs,
    config: &Config,
) -> anyhow::Result<(OutcomeIndicators, Option<Itinerary>)> {
    anyhow::ensure!(
        inputs.environment_threshold.is_finite() && inputs.skills_threshold.is_finite(),
        "thresholds must be finite numbers"
    );

    let mappings = QuestionMappings::from_path(&inputs.mappings)
        .with_context(|| format!("failed to load mappings from {}", inputs.mappings.display()))?;

    let options = AggregateOptions {
        thresholds: Thresholds {
            learning_environment: inputs.environment_threshold,
            teacher_skills: inputs.skills_threshold,
        },
        fetch_timeout: inputs
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(config.fetch_timeout),
    };

    let mut itinerary = None;
    let source: Box<dyn ResponseSource> = match inputs.source {
        SourceKind::Db => {
            let pool = connect(config).await?;
            itinerary = db::fetch_itinerary(&pool, inputs.itinerary).await?;
            if itinerary.is_none() {
                anyhow::bail!("itinerary {} does not exist", inputs.itinerary);
            }
            Box::new(PgResponseSource::new(pool))
        }
        SourceKind::Api => Box::new(HttpResponseSource::new(
            config.require_api_url()?,
            config.api_token.clone(),
        )),
        SourceKind::File => {
            let path = inputs
                .responses
                .as_ref()
                .context("--responses is required with --source file")?;
            let responses = ResponseSet::from_path(path)
                .with_context(|| format!("failed to read responses from {}", path.display()))?;
            Box::new(responses)
        }
    };

    let indicators = load_and_aggregate(source.as_ref(), inputs.itinerary, &mappings, options)
        .await
        .context("failed to load indicators")?;

    Ok((indicators, itinerary))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.rust_log))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            info!("schema ready");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            db::seed(&pool).await?;
            info!("seed data inserted");
        }
        Commands::AddItinerary {
            id,
            name,
            start,
            end,
        } => {
            let pool = connect(&config).await?;
            db::upsert_itinerary(
                &pool,
                &Itinerary {
                    id,
                    name,
                    start_date: start,
                    end_date: end,
                },
            )
            .await?;
            info!(itinerary_id = id, "itinerary saved");
        }
        Commands::Import {
            csv,
            itinerary,
            instrument,
        } => {
            let pool = connect(&config).await?;
            if db::fetch_itinerary(&pool, itinerary).await?.is_none() {
                anyhow::bail!("itinerary {itinerary} does not exist, create it with add-itinerary");
            }
            let inserted = db::import_csv(&pool, &csv, itinerary, instrument)
                .await
                .with_context(|| format!("failed to import {}", csv.display()))?;
            info!(%instrument, inserted, path = %csv.display(), "imported responses");
        }
        Commands::Compute { inputs, pretty } => {
            let (indicators, _) = compute(&inputs, &config).await?;
            let body = if pretty {
                serde_json::to_string_pretty(&indicators)?
            } else {
                serde_json::to_string(&indicators)?
            };
            println!("{body}");
        }
        Commands::Report { inputs, out } => {
            let (indicators, itinerary) = compute(&inputs, &config).await?;
            let report = report::build_report(&indicators, itinerary.as_ref());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(path = %out.display(), "report written");
        }
    }

    Ok(())
}
