//! Observability utilities for the extended support audit.
//!
//! This crate provides:
//! - A process-wide Prometheus metrics recorder
//! - Audit-specific counters, gauges and histograms
//! - A text snapshot writer for one-shot runs (node_exporter textfile format)
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, AuditMetrics};
//!
//! init_metrics();
//! AuditMetrics::record_region_skipped("us-east-1");
//! observability::write_snapshot("metrics.prom")?;
//! ```

pub mod audit;

pub use audit::AuditMetrics;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::path::Path;
use tracing::{info, warn};

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// Only the first call installs the recorder. If another global recorder is
/// already installed the failure is logged and metrics become no-ops.
pub fn init_metrics() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE
        .get_or_try_init(|| -> Result<PrometheusHandle, BuildError> {
            let handle = PrometheusBuilder::new().install_recorder()?;
            info!("Prometheus metrics recorder initialized");
            register_metric_descriptions();
            Ok(handle)
        })
        .map_err(|e| warn!(error = %e, "Metrics recorder not installed"))
        .ok()
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Render the current metrics in Prometheus exposition format
pub fn render() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

/// Write the rendered metrics to `path`, replacing any previous snapshot
pub fn write_snapshot(path: impl AsRef<Path>) -> std::io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render())?;
    info!(path = %path.display(), "Wrote metrics snapshot");
    Ok(())
}

/// Register metric descriptions for documentation
fn register_metric_descriptions() {
    use metrics::describe_counter;
    use metrics::describe_gauge;
    use metrics::describe_histogram;

    describe_counter!(
        "audit_accounts_total",
        "Accounts processed by outcome (committed, failed, skipped)"
    );
    describe_counter!(
        "audit_regions_total",
        "Regions visited by outcome (scanned, not_enabled)"
    );
    describe_counter!(
        "audit_domains_described_total",
        "OpenSearch domains returned by DescribeDomains"
    );
    describe_counter!(
        "audit_eligible_domains_total",
        "Domains running an extended support eligible engine version"
    );
    describe_counter!(
        "audit_normalization_refreshes_total",
        "Normalization factor table refreshes triggered by unknown instance sizes"
    );
    describe_counter!(
        "audit_report_rows_total",
        "Rows appended to the CSV report"
    );
    describe_gauge!(
        "audit_yearly_extended_support_cost_usd",
        "Projected yearly extended support cost of all reported domains"
    );
    describe_histogram!(
        "audit_account_duration_seconds",
        "Wall-clock time to collect one account"
    );
    describe_histogram!(
        "audit_run_duration_seconds",
        "Wall-clock time of the whole run"
    );
}
