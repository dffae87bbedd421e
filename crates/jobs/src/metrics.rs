use manta_utils::metrics::{register_counter_metric_instrument, Metrics};
use manta_utils::register_metric;
use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use opentelemetry::KeyValue;

register_metric!(JOB_METRICS, JobMetrics);

pub struct JobMetrics {
    /// Status queries made while waiting for jobs to finish
    pub poll_attempts_total: Counter<f64>,
    /// Completed end-to-end runs, by outcome
    pub job_runs_total: Counter<f64>,
    /// Jobs cancelled because a step of their run failed
    pub cleanup_cancellations_total: Counter<f64>,
}

impl Metrics for JobMetrics {
    fn register() -> Self {
        let meter = global::meter("manta_jobs");

        let poll_attempts_total = register_counter_metric_instrument(
            &meter,
            "manta_job_poll_attempts_total".to_string(),
            "Total number of job status queries made while waiting".to_string(),
            "attempts".to_string(),
        );

        let job_runs_total = register_counter_metric_instrument(
            &meter,
            "manta_job_runs_total".to_string(),
            "Total number of end-to-end job runs".to_string(),
            "runs".to_string(),
        );

        let cleanup_cancellations_total = register_counter_metric_instrument(
            &meter,
            "manta_job_cleanup_cancellations_total".to_string(),
            "Total number of jobs cancelled after a failed run step".to_string(),
            "jobs".to_string(),
        );

        Self { poll_attempts_total, job_runs_total, cleanup_cancellations_total }
    }
}

impl JobMetrics {
    pub fn record_run(&self, outcome: &str) {
        self.job_runs_total.add(1.0, &[KeyValue::new("outcome", outcome.to_string())]);
    }
}
