//! Concurrency & checkpoint coordinator
//!
//! Runs the collector for every pending account on a bounded pool of tokio
//! tasks. Each successful account is committed through the run ledger (rows,
//! then checkpoint). The first failure sets an abort flag: accounts not yet
//! started are left for the next run, in-flight accounts finish, and the run
//! fails with the checkpoint left on disk.

use domain_extended_support::{AccountId, AuditError, RunLedger};
use futures::stream::{FuturesUnordered, StreamExt};
use observability::AuditMetrics;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::collector::{CollectError, DomainCollector};
use crate::providers::AccessResolver;

/// Accounts processed at the same time
pub const DEFAULT_MAX_CONCURRENT_ACCOUNTS: usize = 100;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Account {account} failed: {source}")]
    AccountFailed {
        account: AccountId,
        #[source]
        source: CollectError,
    },

    #[error("Failed to commit results of account {account}: {source}")]
    Commit {
        account: AccountId,
        #[source]
        source: AuditError,
    },

    #[error("Account task panicked: {0}")]
    TaskPanicked(String),

    #[error("Failed to clear checkpoint: {0}")]
    Finish(#[source] AuditError),
}

/// Outcome of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub accounts_in_pool: usize,
    pub skipped_from_checkpoint: usize,
    pub dispatched: usize,
    pub committed: usize,
    pub rows_written: usize,
    pub total_yearly_cost: f64,
    pub duration_ms: u64,
}

struct AccountOutcome {
    yearly_cost: f64,
}

pub struct Coordinator {
    collector: Arc<DomainCollector>,
    resolver: Arc<dyn AccessResolver>,
    ledger: Arc<RunLedger>,
    max_concurrency: usize,
}

impl Coordinator {
    pub fn new(
        collector: Arc<DomainCollector>,
        resolver: Arc<dyn AccessResolver>,
        ledger: Arc<RunLedger>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            collector,
            resolver,
            ledger,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Audit every account of `pool` not already checkpointed
    pub async fn run(&self, pool: &[AccountId]) -> Result<RunSummary, CoordinatorError> {
        let start = Instant::now();
        let pending = self.ledger.pending(pool).await;

        let mut summary = RunSummary {
            accounts_in_pool: pool.len(),
            skipped_from_checkpoint: pool.len() - pending.len(),
            ..RunSummary::default()
        };
        if summary.skipped_from_checkpoint > 0 {
            info!(
                skipped = summary.skipped_from_checkpoint,
                "Skipping accounts completed by a previous run"
            );
            AuditMetrics::record_accounts_skipped(summary.skipped_from_checkpoint);
        }
        info!(
            pending = pending.len(),
            max_concurrency = self.max_concurrency,
            "Dispatching accounts"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let abort = Arc::new(AtomicBool::new(false));
        let mut tasks = FuturesUnordered::new();

        for account in pending {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            if abort.load(Ordering::SeqCst) {
                break;
            }

            let collector = Arc::clone(&self.collector);
            let resolver = Arc::clone(&self.resolver);
            let ledger = Arc::clone(&self.ledger);
            let abort = Arc::clone(&abort);

            summary.dispatched += 1;
            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                let result = process_account(&collector, resolver.as_ref(), &ledger, &account).await;
                if result.is_err() {
                    abort.store(true, Ordering::SeqCst);
                }
                result
            }));
        }

        let mut first_error = None;
        while let Some(joined) = tasks.next().await {
            let result = joined.map_err(|e| CoordinatorError::TaskPanicked(e.to_string()));
            match result.and_then(|r| r) {
                Ok(outcome) => {
                    summary.committed += 1;
                    summary.total_yearly_cost += outcome.yearly_cost;
                }
                Err(e) => {
                    error!(error = %e, "Account processing failed");
                    abort.store(true, Ordering::SeqCst);
                    first_error.get_or_insert(e);
                }
            }
        }

        summary.rows_written = self.ledger.rows_written().await;
        let elapsed = start.elapsed();
        summary.duration_ms = elapsed.as_millis() as u64;
        AuditMetrics::record_run_finished(elapsed);

        if let Some(e) = first_error {
            warn!(
                committed = summary.committed,
                dispatched = summary.dispatched,
                "Run aborted; checkpoint kept for resume"
            );
            return Err(e);
        }

        self.ledger.finish().await.map_err(CoordinatorError::Finish)?;
        info!(
            committed = summary.committed,
            rows = summary.rows_written,
            duration = ?Duration::from_millis(summary.duration_ms),
            "All accounts completed; checkpoint cleared"
        );
        Ok(summary)
    }
}

async fn process_account(
    collector: &DomainCollector,
    resolver: &dyn AccessResolver,
    ledger: &RunLedger,
    account: &str,
) -> Result<AccountOutcome, CoordinatorError> {
    let start = Instant::now();
    let access = resolver.access_for(account);

    let rows = match collector.collect(account, access.as_ref()).await {
        Ok(rows) => rows,
        Err(source) => {
            error!(account = account, error = %source, "Account collection failed");
            AuditMetrics::record_account_failed();
            return Err(CoordinatorError::AccountFailed {
                account: account.to_string(),
                source,
            });
        }
    };

    let yearly_cost = rows.iter().map(|r| r.yearly_cost).sum();
    let written = ledger
        .commit(account, &rows)
        .await
        .map_err(|source| CoordinatorError::Commit {
            account: account.to_string(),
            source,
        })?;

    AuditMetrics::record_account_committed(written, start.elapsed());
    Ok(AccountOutcome { yearly_cost })
}
