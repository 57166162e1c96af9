//! Run ledger: the single critical section shared by all account tasks.
//!
//! For each account the rows are appended to the report and only then the
//! account is added to the checkpoint, both under one lock, so the report
//! and the checkpoint never disagree about which accounts are done.

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::checkpoint::CheckpointStore;
use crate::error::AuditResult;
use crate::models::{AccountId, EligibleDomainReport};
use crate::report::ReportSink;

struct LedgerState {
    sink: Box<dyn ReportSink>,
    checkpoint: Box<dyn CheckpointStore>,
    rows_written: usize,
}

/// Report sink and checkpoint behind one mutex
pub struct RunLedger {
    state: Mutex<LedgerState>,
}

impl RunLedger {
    /// Load the checkpoint and wrap both stores.
    ///
    /// Returns the ledger and the accounts a previous run already completed.
    pub fn open(
        sink: Box<dyn ReportSink>,
        mut checkpoint: Box<dyn CheckpointStore>,
    ) -> AuditResult<(Self, Vec<AccountId>)> {
        let processed = checkpoint.load()?;
        let ledger = Self {
            state: Mutex::new(LedgerState {
                sink,
                checkpoint,
                rows_written: 0,
            }),
        };
        Ok((ledger, processed))
    }

    /// Accounts from `pool` not yet checkpointed, in pool order
    pub async fn pending(&self, pool: &[AccountId]) -> Vec<AccountId> {
        let state = self.state.lock().await;
        pool.iter()
            .filter(|account| !state.checkpoint.contains(account))
            .cloned()
            .collect()
    }

    /// Append `rows` for `account` and checkpoint it, as one unit.
    ///
    /// If the rows cannot be written the account is not checkpointed.
    pub async fn commit(&self, account: &str, rows: &[EligibleDomainReport]) -> AuditResult<usize> {
        let mut state = self.state.lock().await;

        if state.checkpoint.contains(account) {
            warn!(account = account, "Account already checkpointed, not writing its rows again");
            return Ok(0);
        }

        let written = state.sink.append(rows)?;
        state.checkpoint.mark_done(account)?;
        state.rows_written += written;

        if written == 0 {
            info!(account = account, "No eligible domains; account checkpointed");
        } else {
            info!(
                account = account,
                rows = written,
                "Saved eligible domains to report and checkpointed account"
            );
        }
        Ok(written)
    }

    /// Rows written by this run so far
    pub async fn rows_written(&self) -> usize {
        self.state.lock().await.rows_written
    }

    /// The whole pool completed: drop resumable state
    pub async fn finish(&self) -> AuditResult<()> {
        self.state.lock().await.checkpoint.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{JsonFileCheckpointStore, MockCheckpointStore};
    use crate::error::AuditError;
    use crate::models::RoleCapacity;
    use crate::report::{CsvReportSink, MockReportSink};
    use std::sync::Arc;

    fn row(account: &str) -> EligibleDomainReport {
        EligibleDomainReport {
            account_id: account.to_string(),
            region: "eu-west-1".to_string(),
            region_name: "Europe (Ireland)".to_string(),
            domain_name: "orders".to_string(),
            arn: format!("arn:aws:es:eu-west-1:{account}:domain/orders"),
            engine_version: "Elasticsearch_7.4".to_string(),
            dedicated_master: RoleCapacity::absent(),
            data: RoleCapacity::new("r6g.large.search", 2, 4.0),
            ultrawarm: RoleCapacity::absent(),
            coordinator: RoleCapacity::absent(),
            price_per_nih: 0.0071,
            end_of_standard_support: None,
            end_of_extended_support: None,
            yearly_cost: 497.5,
        }
    }

    fn file_ledger(dir: &std::path::Path) -> (RunLedger, Vec<AccountId>) {
        let sink = CsvReportSink::create(dir.join("report.csv")).unwrap();
        let checkpoint = JsonFileCheckpointStore::new(dir.join("cache.json"));
        RunLedger::open(Box::new(sink), Box::new(checkpoint)).unwrap()
    }

    #[tokio::test]
    async fn test_commit_writes_rows_then_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, processed) = file_ledger(dir.path());
        assert!(processed.is_empty());

        assert_eq!(ledger.commit("111111111111", &[row("111111111111")]).await.unwrap(), 1);
        assert!(ledger.pending(&["111111111111".to_string()]).await.is_empty());
        assert_eq!(ledger.rows_written().await, 1);

        let report = std::fs::read_to_string(dir.path().join("report.csv")).unwrap();
        assert_eq!(report.lines().count(), 2);
        let cache = std::fs::read_to_string(dir.path().join("cache.json")).unwrap();
        assert!(cache.contains("111111111111"));
    }

    #[tokio::test]
    async fn test_commit_twice_does_not_duplicate_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, _) = file_ledger(dir.path());

        ledger.commit("111111111111", &[row("111111111111")]).await.unwrap();
        assert_eq!(ledger.commit("111111111111", &[row("111111111111")]).await.unwrap(), 0);

        let report = std::fs::read_to_string(dir.path().join("report.csv")).unwrap();
        assert_eq!(report.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_pending_filters_checkpointed_accounts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cache.json"), r#"["222222222222"]"#).unwrap();
        let (ledger, processed) = file_ledger(dir.path());
        assert_eq!(processed, vec!["222222222222".to_string()]);

        let pool: Vec<AccountId> = ["111111111111", "222222222222", "333333333333"]
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(
            ledger.pending(&pool).await,
            vec!["111111111111".to_string(), "333333333333".to_string()]
        );
    }

    #[tokio::test]
    async fn test_sink_failure_leaves_account_unchecked() {
        let mut sink = MockReportSink::new();
        sink.expect_append()
            .times(1)
            .returning(|_| Err(AuditError::Io(std::io::Error::other("disk full"))));

        let mut checkpoint = MockCheckpointStore::new();
        checkpoint.expect_load().returning(|| Ok(Vec::new()));
        checkpoint.expect_contains().returning(|_| false);
        checkpoint.expect_mark_done().never();

        let (ledger, _) = RunLedger::open(Box::new(sink), Box::new(checkpoint)).unwrap();
        assert!(ledger.commit("111111111111", &[row("111111111111")]).await.is_err());
    }

    #[tokio::test]
    async fn test_finish_clears_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, _) = file_ledger(dir.path());
        ledger.commit("111111111111", &[]).await.unwrap();
        assert!(dir.path().join("cache.json").exists());

        ledger.finish().await.unwrap();
        assert!(!dir.path().join("cache.json").exists());
    }

    #[tokio::test]
    async fn test_concurrent_commits_keep_report_and_checkpoint_in_step() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, _) = file_ledger(dir.path());
        let ledger = Arc::new(ledger);

        let mut handles = Vec::new();
        for i in 0..20 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                let account = format!("{:012}", i);
                ledger.commit(&account, &[row(&account), row(&account)]).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let cache: Vec<String> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("cache.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(cache.len(), 20);

        let report = std::fs::read_to_string(dir.path().join("report.csv")).unwrap();
        assert_eq!(report.lines().count(), 1 + 40);
        assert_eq!(ledger.rows_written().await, 40);
    }
}
