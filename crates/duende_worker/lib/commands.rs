use crate::{
    cli::{Cli, Command, GlobalArgs, SearchArgs},
    config::{Config, ConfigError},
    db::{build_db_pool, DEFAULT_POOL_MAX_SIZE},
    jobs::{
        AnalyticsService, JobError, MetricPipeline, RankingRecomputation, SearchSynchronizer,
        TaskWait,
    },
    logging::{format_error_report, init_logging},
    search::{meili::DEFAULT_REQUEST_TIMEOUT, MeiliSearchIndex},
    server::monitoring::{JobLabels, JOB_METRICS},
    server::{register_job_metrics, setup_server_with_addr},
    state::AppState,
    store::{PgAnalyticsStore, PgCatalogStore},
};
use diesel::{pg::PgConnection, Connection};
use diesel_async::{pooled_connection::deadpool::Pool, AsyncPgConnection};
use dotenv::dotenv;
use duende_core::db::migrations::run_pending_migrations;
use serde::Serialize;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_INDEX_TIMEOUT: i32 = 3;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build db pool: {0}")]
    Pool(#[from] diesel_async::pooled_connection::deadpool::BuildError),

    #[error("failed to start metrics endpoint: {0}")]
    MetricsServer(#[source] std::io::Error),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("could not encode job output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CommandError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::Config(_) => EXIT_USAGE,
            Self::Job(JobError::IndexTimeout { .. }) => EXIT_INDEX_TIMEOUT,
            _ => EXIT_FAILURE,
        }
    }
}

/// Environment variable each CLI override stands in for.
fn cli_overrides(
    global: &GlobalArgs,
    search: &SearchArgs,
) -> Vec<(&'static str, Option<String>)> {
    vec![
        ("DATABASE_URL", global.database_url.clone()),
        (
            "ANALYTICS_DATABASE_URL",
            global.analytics_database_url.clone(),
        ),
        ("MEILISEARCH_HOST", search.search_host.clone()),
        ("MEILISEARCH_API_KEY", search.search_api_key.clone()),
        ("MEILISEARCH_INDEX", search.search_index.clone()),
        (
            "SEARCH_TASK_TIMEOUT_MS",
            search.task_timeout_ms.map(|value| value.to_string()),
        ),
        (
            "SEARCH_TASK_POLL_MS",
            search.task_poll_ms.map(|value| value.to_string()),
        ),
    ]
}

/// Resolves config with CLI flags taking precedence over `env_lookup`.
pub fn resolve_config<F>(
    global: &GlobalArgs,
    search: &SearchArgs,
    env_lookup: F,
) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let overrides = cli_overrides(global, search);
    Config::from_lookup(|name| {
        overrides
            .iter()
            .find(|(key, _)| *key == name)
            .and_then(|(_, value)| value.clone())
            .or_else(|| env_lookup(name))
    })
}

fn parse_metrics_bind(raw: Option<&str>) -> Result<Option<SocketAddr>, CommandError> {
    raw.map(|value| {
        value.parse::<SocketAddr>().map_err(|err| {
            CommandError::Usage(format!("invalid --metrics-bind address `{value}`: {err}"))
        })
    })
    .transpose()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CommandError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

struct Pools {
    catalog: Pool<AsyncPgConnection>,
    analytics: Pool<AsyncPgConnection>,
}

async fn build_pools(config: &Config) -> Result<Pools, CommandError> {
    let catalog = build_db_pool(&config.database_url, DEFAULT_POOL_MAX_SIZE).await?;
    let analytics = if config.analytics_database_url == config.database_url {
        catalog.clone()
    } else {
        build_db_pool(&config.analytics_database_url, DEFAULT_POOL_MAX_SIZE).await?
    };
    Ok(Pools { catalog, analytics })
}

async fn run_metrics(config: &Config, pipeline: MetricPipeline) -> Result<(), CommandError> {
    let pools = build_pools(config).await?;
    let service = AnalyticsService::new(
        PgAnalyticsStore::new(pools.analytics),
        PgCatalogStore::new(pools.catalog),
    );
    print_json(&service.run(pipeline).await?)
}

async fn run_rank_artists(config: &Config) -> Result<(), CommandError> {
    let store = PgCatalogStore::new(build_db_pool(&config.database_url, 1).await?);
    let job = RankingRecomputation::new(store.clone(), store);
    print_json(&job.run().await?)
}

async fn run_ranking_report(config: &Config, limit: usize) -> Result<(), CommandError> {
    if limit == 0 {
        return Err(CommandError::Usage("--limit must be > 0".to_string()));
    }
    let store = PgCatalogStore::new(build_db_pool(&config.database_url, 1).await?);
    let job = RankingRecomputation::new(store.clone(), store);
    print_json(&job.report(limit).await?)
}

async fn run_sync_search(config: &Config) -> Result<(), CommandError> {
    let catalog = PgCatalogStore::new(build_db_pool(&config.database_url, 1).await?);
    let index = MeiliSearchIndex::new(
        &config.search.host,
        config.search.api_key.clone(),
        config.search.index_uid.clone(),
        config.search.task_timeout.min(DEFAULT_REQUEST_TIMEOUT),
    )
    .map_err(JobError::from)?;
    let synchronizer = SearchSynchronizer::new(
        catalog,
        index,
        TaskWait {
            timeout: config.search.task_timeout,
            poll_interval: config.search.poll_interval,
        },
    );
    print_json(&synchronizer.sync().await?)
}

async fn run_migrate(config: &Config) -> Result<(), CommandError> {
    let mut urls = vec![config.database_url.clone()];
    if config.analytics_database_url != config.database_url {
        urls.push(config.analytics_database_url.clone());
    }

    for url in urls {
        let applied = tokio::task::spawn_blocking(move || {
            let mut conn = PgConnection::establish(&url).map_err(|err| err.to_string())?;
            run_pending_migrations(&mut conn).map_err(|err| err.to_string())
        })
        .await
        .map_err(|err| CommandError::Migration(err.to_string()))?
        .map_err(CommandError::Migration)?;

        info!(
            event = "migrations_applied",
            applied = applied.len(),
            versions = ?applied,
            "schema migrations applied"
        );
    }
    Ok(())
}

async fn execute(cli: Cli, state: Arc<AppState>) -> Result<(), CommandError> {
    let metrics_addr = parse_metrics_bind(cli.global.metrics_bind.as_deref())?;
    let no_search_args = SearchArgs::default();
    let search_args = match &cli.command {
        Command::SyncSearch { search } => search,
        _ => &no_search_args,
    };
    let config = resolve_config(&cli.global, search_args, |name| env::var(name).ok())?;

    register_job_metrics(&state).await;
    let metrics_server = match metrics_addr {
        Some(addr) => Some(
            setup_server_with_addr(state.clone(), addr)
                .await
                .map_err(CommandError::MetricsServer)?,
        ),
        None => None,
    };

    let result = match cli.command {
        Command::Metrics { pipeline } => run_metrics(&config, pipeline).await,
        Command::RankArtists => run_rank_artists(&config).await,
        Command::RankingReport { limit } => run_ranking_report(&config, limit).await,
        Command::SyncSearch { .. } => run_sync_search(&config).await,
        Command::Migrate => run_migrate(&config).await,
    };

    state.shutdown_token.cancel();
    if let Some(handle) = metrics_server {
        let _ = handle.await;
    }
    result
}

/// Runs one job invocation and returns the process exit code.
pub async fn run(cli: Cli) -> i32 {
    dotenv().ok();

    let job = cli.command.job_name();
    let logging_context = init_logging("duende_worker", job, &cli.global.log_level);
    let state = Arc::new(AppState::new(CancellationToken::new()));

    async move {
        info!(event = "job_starting", job, "starting job");
        match execute(cli, state).await {
            Ok(()) => {
                info!(event = "job_complete", job, "job completed");
                EXIT_OK
            }
            Err(err) => report_failure(job, &err),
        }
    }
    .instrument(logging_context.run_span())
    .await
}

fn report_failure(job: &'static str, err: &CommandError) -> i32 {
    let exit_code = err.exit_code();
    if exit_code == EXIT_USAGE {
        eprintln!("{err}");
        return exit_code;
    }

    let kind = match err {
        CommandError::Job(job_err) => job_err.kind(),
        _ => "setup",
    };
    if let Some(metrics) = JOB_METRICS.get() {
        metrics.job_failures.get_or_create(&JobLabels { job, kind }).inc();
    }

    let error_report = format_error_report(err);
    let transient = matches!(err, CommandError::Job(job_err) if job_err.is_transient());
    error!(
        event = "job_failed",
        job,
        kind,
        transient,
        exit_code,
        error = %err,
        error_debug = ?err,
        error_report = %error_report,
        "job failed"
    );
    eprintln!("{job} failed: {err}");
    exit_code
}

#[cfg(test)]
mod tests {
    use super::{parse_metrics_bind, resolve_config, CommandError, EXIT_INDEX_TIMEOUT, EXIT_USAGE};
    use crate::cli::{GlobalArgs, SearchArgs};
    use crate::config::ConfigError;
    use crate::jobs::JobError;
    use std::time::Duration;

    fn global(database_url: Option<&str>) -> GlobalArgs {
        GlobalArgs {
            database_url: database_url.map(str::to_string),
            analytics_database_url: None,
            log_level: "info".to_string(),
            metrics_bind: None,
        }
    }

    #[test]
    fn cli_flags_take_precedence_over_environment() {
        let search = SearchArgs {
            search_index: Some("events_staging".to_string()),
            task_poll_ms: Some(50),
            ..SearchArgs::default()
        };
        let config = resolve_config(&global(Some("postgres://flag")), &search, |name| {
            match name {
                "DATABASE_URL" => Some("postgres://env".to_string()),
                "MEILISEARCH_INDEX" => Some("events".to_string()),
                "MEILISEARCH_HOST" => Some("http://search:7700".to_string()),
                _ => None,
            }
        })
        .unwrap();

        assert_eq!(config.database_url, "postgres://flag");
        assert_eq!(config.analytics_database_url, "postgres://flag");
        assert_eq!(config.search.index_uid, "events_staging");
        assert_eq!(config.search.host, "http://search:7700");
        assert_eq!(config.search.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn usage_and_timeout_errors_map_to_distinct_exit_codes() {
        let missing = resolve_config(&global(None), &SearchArgs::default(), |_| None)
            .expect_err("database url is required");
        assert!(matches!(missing, ConfigError::Missing { .. }));
        assert_eq!(CommandError::from(missing).exit_code(), EXIT_USAGE);

        let timeout = CommandError::Job(JobError::IndexTimeout {
            task_uid: 7,
            waited: Duration::from_secs(30),
        });
        assert_eq!(timeout.exit_code(), EXIT_INDEX_TIMEOUT);
    }

    #[test]
    fn metrics_bind_is_optional_but_must_parse() {
        assert_eq!(parse_metrics_bind(None).unwrap(), None);
        assert!(parse_metrics_bind(Some("127.0.0.1:9100")).unwrap().is_some());
        assert!(matches!(
            parse_metrics_bind(Some("not-an-address")),
            Err(CommandError::Usage(_))
        ));
    }
}
