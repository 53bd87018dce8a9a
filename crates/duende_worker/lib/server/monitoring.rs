use crate::build_info;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::{counter::Counter, gauge::Gauge};
use prometheus_client::registry::Registry;
use tokio::sync::OnceCell;

/// Registers immutable build metadata for `/metrics` scraping.
///
/// Encoded as a labeled gauge fixed at `1` so the labels survive the text exposition format.
pub fn register_build_info_metric(registry: &mut Registry, prefix: &str) {
    let build_info_metric = Family::<BuildInfoLabels, Gauge>::default();
    build_info_metric
        .get_or_create(&BuildInfoLabels {
            service: "duende_worker",
            version: build_info::VERSION,
            commit: build_info::short_commit_hash(),
        })
        .set(1);
    let sub_registry = registry.sub_registry_with_prefix(prefix);
    sub_registry.register(
        "build_info",
        "Build identity labels for this process",
        build_info_metric,
    );
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct BuildInfoLabels {
    service: &'static str,
    version: &'static str,
    commit: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PipelineLabels {
    pub pipeline: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SourceLabels {
    pub source: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct JobLabels {
    pub job: &'static str,
    pub kind: &'static str,
}

#[derive(Clone)]
pub struct JobMetrics {
    /// Completed metric pipeline runs, by pipeline.
    pub pipeline_runs: Family<PipelineLabels, Counter>,
    /// Stored rows excluded from snapshots because they failed to decode.
    pub malformed_records: Family<SourceLabels, Counter>,
    pub documents_indexed: Counter,
    pub artists_updated: Counter,
    /// Failed job invocations, by job and error kind.
    pub job_failures: Family<JobLabels, Counter>,
}

impl JobMetrics {
    fn init() -> Self {
        Self {
            pipeline_runs: Family::default(),
            malformed_records: Family::default(),
            documents_indexed: Counter::default(),
            artists_updated: Counter::default(),
            job_failures: Family::default(),
        }
    }

    pub fn register(registry: &mut Registry, prefix: &str) -> Self {
        let metrics = Self::init();
        let sub_registry = registry.sub_registry_with_prefix(prefix);
        sub_registry.register(
            "pipeline_runs",
            "Total number of completed metric pipeline runs",
            metrics.pipeline_runs.clone(),
        );
        sub_registry.register(
            "malformed_records",
            "Total number of stored records excluded because they failed to decode",
            metrics.malformed_records.clone(),
        );
        sub_registry.register(
            "documents_indexed",
            "Total number of documents applied to the search index",
            metrics.documents_indexed.clone(),
        );
        sub_registry.register(
            "artists_updated",
            "Total number of artist event counts written by ranking rebuilds",
            metrics.artists_updated.clone(),
        );
        sub_registry.register(
            "job_failures",
            "Total number of failed job invocations",
            metrics.job_failures.clone(),
        );
        metrics
    }
}

pub static JOB_METRICS: OnceCell<JobMetrics> = OnceCell::const_new();

#[cfg(test)]
mod tests {
    use super::{register_build_info_metric, JobMetrics, PipelineLabels};
    use crate::build_info;
    use prometheus_client::{encoding::text::encode, registry::Registry};

    #[test]
    fn build_info_metric_contains_version_and_commit_labels() {
        let mut registry = Registry::default();
        register_build_info_metric(&mut registry, "worker");

        let mut encoded = String::new();
        encode(&mut encoded, &registry).expect("failed to encode metrics");

        assert!(encoded.contains("worker_build_info"));
        assert!(encoded.contains(&format!("version=\"{}\"", build_info::VERSION)));
        assert!(encoded.contains(&format!("commit=\"{}\"", build_info::short_commit_hash())));
    }

    #[test]
    fn pipeline_runs_are_labeled_by_pipeline() {
        let mut registry = Registry::default();
        let metrics = JobMetrics::register(&mut registry, "jobs");
        metrics
            .pipeline_runs
            .get_or_create(&PipelineLabels {
                pipeline: "top-events",
            })
            .inc();

        let mut encoded = String::new();
        encode(&mut encoded, &registry).expect("failed to encode metrics");
        assert!(encoded.contains("jobs_pipeline_runs_total{pipeline=\"top-events\"} 1"));
    }
}
