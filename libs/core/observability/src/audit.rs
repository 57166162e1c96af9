//! Extended support audit metrics.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Audit metrics recorder
pub struct AuditMetrics;

impl AuditMetrics {
    // =========================================================================
    // Account Metrics
    // =========================================================================

    /// Record an account whose rows and checkpoint entry were committed
    pub fn record_account_committed(rows: usize, duration: Duration) {
        counter!("audit_accounts_total", "outcome" => "committed").increment(1);
        counter!("audit_report_rows_total").increment(rows as u64);
        histogram!("audit_account_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an account that failed and aborted the run
    pub fn record_account_failed() {
        counter!("audit_accounts_total", "outcome" => "failed").increment(1);
    }

    /// Record accounts skipped because a previous run already checkpointed them
    pub fn record_accounts_skipped(count: usize) {
        counter!("audit_accounts_total", "outcome" => "skipped").increment(count as u64);
    }

    // =========================================================================
    // Region / Domain Metrics
    // =========================================================================

    /// Record a region that was listed successfully
    pub fn record_region_scanned(region: &str) {
        counter!("audit_regions_total", "outcome" => "scanned", "region" => region.to_string())
            .increment(1);
    }

    /// Record a region skipped because it is not enabled for the account
    pub fn record_region_skipped(region: &str) {
        counter!("audit_regions_total", "outcome" => "not_enabled", "region" => region.to_string())
            .increment(1);
    }

    /// Record domains returned by one DescribeDomains call
    pub fn record_domains_described(region: &str, count: usize) {
        counter!("audit_domains_described_total", "region" => region.to_string())
            .increment(count as u64);
    }

    /// Record an eligible domain and its projected yearly cost
    pub fn record_eligible_domain(engine_version: &str, yearly_cost: f64) {
        counter!(
            "audit_eligible_domains_total",
            "engine_version" => engine_version.to_string()
        )
        .increment(1);
        gauge!("audit_yearly_extended_support_cost_usd").increment(yearly_cost);

        tracing::trace!(
            engine_version = engine_version,
            yearly_cost = yearly_cost,
            "Recorded eligible domain"
        );
    }

    /// Record a refresh of the normalization factor table
    pub fn record_normalization_refresh(instance_size: &str) {
        counter!(
            "audit_normalization_refreshes_total",
            "instance_size" => instance_size.to_string()
        )
        .increment(1);
    }

    // =========================================================================
    // Run Metrics
    // =========================================================================

    /// Record the end of a run
    pub fn record_run_finished(duration: Duration) {
        histogram!("audit_run_duration_seconds").record(duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_does_not_panic() {
        AuditMetrics::record_account_committed(3, Duration::from_millis(250));
        AuditMetrics::record_account_failed();
        AuditMetrics::record_accounts_skipped(2);
        AuditMetrics::record_region_scanned("us-east-1");
        AuditMetrics::record_region_skipped("ap-east-1");
        AuditMetrics::record_domains_described("us-east-1", 5);
        AuditMetrics::record_eligible_domain("OpenSearch_1.2", 15_768.0);
        AuditMetrics::record_normalization_refresh("48xlarge");
        AuditMetrics::record_run_finished(Duration::from_secs(1));
    }
}
