use crate::build_info;
use crate::jobs::analytics::MetricPipeline;
use crate::jobs::ranking::DEFAULT_REPORT_LIMIT;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "duende_worker",
    about = "Batch jobs for duende analytics, artist ranking and search sync",
    version = build_info::VERSION_WITH_COMMIT,
    long_version = build_info::VERSION_WITH_COMMIT
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Main catalog database (overrides DATABASE_URL)
    #[arg(long = "database-url", global = true)]
    pub database_url: Option<String>,

    /// Analytics database (overrides ANALYTICS_DATABASE_URL)
    #[arg(long = "analytics-database-url", global = true)]
    pub analytics_database_url: Option<String>,

    #[arg(long = "log-level", default_value = "info", global = true)]
    pub log_level: String,

    /// Serve /health and /metrics on this address while the job runs
    #[arg(long = "metrics-bind", global = true)]
    pub metrics_bind: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SearchArgs {
    #[arg(long = "search-host")]
    pub search_host: Option<String>,
    #[arg(long = "search-api-key")]
    pub search_api_key: Option<String>,
    #[arg(long = "search-index")]
    pub search_index: Option<String>,
    #[arg(long = "task-timeout-ms")]
    pub task_timeout_ms: Option<u64>,
    #[arg(long = "task-poll-ms")]
    pub task_poll_ms: Option<u64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compute one metric pipeline (or `all`) and print it as JSON
    Metrics {
        #[arg(value_enum)]
        pipeline: MetricPipeline,
    },
    /// Reset and rebuild every artist's event count
    RankArtists,
    /// Print the top artists by event count
    RankingReport {
        #[arg(long, default_value_t = DEFAULT_REPORT_LIMIT)]
        limit: usize,
    },
    /// Push eligible events into the search index
    SyncSearch {
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Apply pending schema migrations
    Migrate,
}

impl Command {
    /// Job name used in logs and the run span.
    pub fn job_name(&self) -> &'static str {
        match self {
            Self::Metrics { .. } => "metrics",
            Self::RankArtists => "rank-artists",
            Self::RankingReport { .. } => "ranking-report",
            Self::SyncSearch { .. } => "sync-search",
            Self::Migrate => "migrate",
        }
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use crate::build_info;
    use crate::jobs::analytics::MetricPipeline;
    use clap::{error::ErrorKind, Parser};

    #[test]
    fn version_short_circuits_other_flags() {
        let err = Cli::try_parse_from([
            "duende_worker",
            "--version",
            "--this-flag-does-not-exist",
        ])
        .expect_err("expected clap to stop parsing after --version");

        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
        assert!(err.to_string().contains(build_info::VERSION_WITH_COMMIT));
    }

    #[test]
    fn metrics_accepts_kebab_case_pipelines_and_all() {
        let cli = Cli::try_parse_from(["duende_worker", "metrics", "city-heatmap"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Metrics {
                pipeline: MetricPipeline::CityHeatmap
            }
        ));

        let cli = Cli::try_parse_from(["duende_worker", "metrics", "all"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Metrics {
                pipeline: MetricPipeline::All
            }
        ));

        assert!(Cli::try_parse_from(["duende_worker", "metrics", "bounce-rate"]).is_err());
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "duende_worker",
            "sync-search",
            "--search-index",
            "events_staging",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.global.log_level, "debug");
        match cli.command {
            Command::SyncSearch { search } => {
                assert_eq!(search.search_index.as_deref(), Some("events_staging"))
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ranking_report_limit_defaults_to_one_hundred() {
        let cli = Cli::try_parse_from(["duende_worker", "ranking-report"]).unwrap();
        assert!(matches!(cli.command, Command::RankingReport { limit: 100 }));
    }
}
