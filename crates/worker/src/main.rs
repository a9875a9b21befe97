use anyhow::Context;
use clap::Parser;
use stockcheck_core::domain::run_config::{RunConfig, RunInput};
use stockcheck_core::error::ModelError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "stockcheck_worker")]
struct Args {
    /// MOCK or LIVE (case-insensitive). Defaults to LIVE.
    #[arg(long)]
    data_mode: Option<String>,

    /// MOCK generator seed.
    #[arg(long)]
    seed: Option<i64>,

    /// MOCK universe size (at least 1000).
    #[arg(long)]
    universe_size: Option<u64>,

    /// Comma-separated LIVE tickers. Overrides LIVE_TICKERS.
    #[arg(long)]
    live_tickers: Option<String>,

    /// YYYY-MM-DD. Defaults to today (UTC).
    #[arg(long)]
    current_date: Option<String>,

    /// YYYY-MM-DD. Defaults to the day after the current date.
    #[arg(long)]
    prediction_date: Option<String>,

    /// Do everything except writing to the database.
    #[arg(long)]
    dry_run: bool,

    /// Run the validation suite over the result and fail if any check fails.
    #[arg(long)]
    validate: bool,
}

impl Args {
    fn run_config(&self) -> RunConfig {
        let defaults = RunConfig::default();
        RunConfig {
            data_mode: self.data_mode.clone().or(defaults.data_mode),
            mock_seed: self.seed.map(|s| s as f64).or(defaults.mock_seed),
            mock_universe_size: self
                .universe_size
                .map(|n| n as f64)
                .or(defaults.mock_universe_size),
            live_tickers: self
                .live_tickers
                .as_deref()
                .map(stockcheck_core::config::parse_ticker_list),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockcheck_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let dates = stockcheck_core::time::run_dates::resolve_run_dates(
        args.current_date.as_deref(),
        args.prediction_date.as_deref(),
        chrono::Utc::now(),
    )?;

    let config = args.run_config();
    let issues = config.issues();
    if !issues.is_empty() {
        for issue in &issues {
            tracing::error!(%issue, "invalid run config");
        }
        anyhow::bail!("invalid run config: {}", issues.join(" "));
    }

    let input = RunInput {
        config,
        current_date: dates.current_date,
        prediction_date: dates.prediction_date,
    };

    let result = match stockcheck_core::run::run_model(&input, &settings).await {
        Ok(result) => result,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            let code = ModelError::code_of(&err).map(|c| c.as_str()).unwrap_or("UNCODED");
            tracing::error!(code, error = %format!("{err:#}"), "model run failed");
            return Err(err);
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("serialize run result failed")?
    );

    if args.validate {
        let checks = stockcheck_core::diagnostics::validation_suite(Some(&result));
        for c in &checks {
            if c.ok {
                tracing::info!(check = c.name, details = %c.details, "validation passed");
            } else {
                tracing::error!(check = c.name, details = %c.details, "validation failed");
            }
        }
        let failed = checks.iter().filter(|c| !c.ok).count();
        anyhow::ensure!(failed == 0, "{failed} validation check(s) failed");
    }

    if args.dry_run {
        tracing::info!(
            current_date = %input.current_date,
            dry_run = true,
            "skipping persistence"
        );
        return Ok(());
    }

    let Some(db_url) = settings.database_url.as_deref() else {
        tracing::info!("DATABASE_URL not set; run not persisted");
        return Ok(());
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    stockcheck_core::storage::migrate(&pool).await?;

    let run_id = stockcheck_core::storage::runs::persist_run(&pool, &input.config, &result).await?;
    tracing::info!(%run_id, "persisted model run");

    Ok(())
}

fn init_sentry(settings: &stockcheck_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
