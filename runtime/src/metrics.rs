//! Prometheus metrics for reconciliation, submissions and notifications.
//!
//! Recording is always on; the values go nowhere until a recorder is
//! installed, e.g. by [`MetricsServer::start`].
//!
//! # Example
//!
//! ```rust,no_run
//! use fleet_allocation_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build the exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
}

/// Prometheus exporter serving `/metrics` on `addr`.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Exporter for `addr`; nothing happens until [`start`](Self::start).
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the global recorder and start the HTTP listener.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built. A recorder
    /// that is already installed is not an error.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let (recorder, exporter) = builder
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;
        let handle = recorder.handle();

        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Metrics recorder already installed, skipping");
            return Ok(());
        }

        tokio::spawn(async move {
            // The exporter error type has no formatting impls
            if exporter.await.is_err() {
                tracing::error!("Metrics listener stopped");
            }
        });
        self.handle = Some(handle);
        tracing::info!(addr = %self.addr, "Metrics available at http://{}/metrics", self.addr);
        Ok(())
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    describe_counter!(
        "reconcile_runs_total",
        "Reconciliation passes applied, labelled by trigger"
    );
    describe_counter!(
        "reconcile_drafts_created_total",
        "Draft assignments created by reconciliation"
    );
    describe_counter!(
        "reconcile_drafts_deleted_total",
        "Draft assignments deleted by reconciliation"
    );
    describe_counter!(
        "reconcile_deletes_skipped_total",
        "Planned deletions skipped because the record was submitted meanwhile"
    );
    describe_histogram!(
        "reconcile_duration_seconds",
        "Time to read, plan and apply one reconciliation"
    );
    describe_counter!(
        "vehicle_submissions_total",
        "Vehicle detail submissions, labelled by outcome"
    );
    describe_counter!(
        "notifications_sent_total",
        "Notifications delivered"
    );
    describe_counter!(
        "notifications_failed_total",
        "Notifications dropped after exhausting retries"
    );
    describe_counter!("retry_attempts_total", "Retries performed");
    describe_counter!("retry_successes_total", "Operations that succeeded on a retry");
    describe_counter!("retry_exhausted_total", "Operations that ran out of retries");
}

/// Reconciliation metrics.
pub struct ReconcileMetrics;

impl ReconcileMetrics {
    /// Record one applied reconciliation.
    pub fn record_run(
        trigger: &'static str,
        created: usize,
        deleted: usize,
        skipped: usize,
        duration: Duration,
    ) {
        counter!("reconcile_runs_total", "trigger" => trigger).increment(1);
        counter!("reconcile_drafts_created_total").increment(created as u64);
        counter!("reconcile_drafts_deleted_total").increment(deleted as u64);
        counter!("reconcile_deletes_skipped_total").increment(skipped as u64);
        histogram!("reconcile_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Submission metrics.
pub struct SubmissionMetrics;

impl SubmissionMetrics {
    /// Record a submission attempt and its outcome (`submitted`, `conflict`, `invalid`).
    pub fn record(outcome: &'static str) {
        counter!("vehicle_submissions_total", "outcome" => outcome).increment(1);
    }
}

/// Notification metrics.
pub struct NotificationMetrics;

impl NotificationMetrics {
    /// Record a delivered notification.
    pub fn record_sent() {
        counter!("notifications_sent_total").increment(1);
    }

    /// Record a notification given up on.
    pub fn record_failed() {
        counter!("notifications_failed_total").increment(1);
    }
}

/// Retry metrics.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry.
    pub fn record_attempt() {
        counter!("retry_attempts_total").increment(1);
    }

    /// Record success after at least one retry.
    pub fn record_success() {
        counter!("retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("retry_exhausted_total").increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unstarted_server_renders_nothing() {
        let server = MetricsServer::new(SocketAddr::from(([127, 0, 0, 1], 0)));
        assert!(server.render().is_none());
    }

    #[test]
    fn recording_without_recorder_is_harmless() {
        ReconcileMetrics::record_run("update", 2, 1, 0, Duration::from_millis(3));
        SubmissionMetrics::record("submitted");
        NotificationMetrics::record_failed();
    }
}
