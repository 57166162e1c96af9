//! Durable set of accounts that completed successfully.
//!
//! An account is only ever added after its report rows were written, so on
//! resume every checkpointed account can be skipped.

use std::collections::HashSet;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AuditError, AuditResult};
use crate::models::AccountId;

/// Storage for processed account ids
#[cfg_attr(test, mockall::automock)]
pub trait CheckpointStore: Send {
    /// Read persisted state, returning the processed accounts in completion order
    fn load(&mut self) -> AuditResult<Vec<AccountId>>;

    /// Whether `account` already completed
    fn contains(&self, account: &str) -> bool;

    /// Record `account` as completed and persist
    fn mark_done(&mut self, account: &str) -> AuditResult<()>;

    /// Forget all progress and remove persisted state
    fn clear(&mut self) -> AuditResult<()>;
}

/// Checkpoint kept as a JSON array of account ids in a single file
#[derive(Debug)]
pub struct JsonFileCheckpointStore {
    path: PathBuf,
    processed: Vec<AccountId>,
    index: HashSet<AccountId>,
}

impl JsonFileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            processed: Vec::new(),
            index: HashSet::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn processed(&self) -> &[AccountId] {
        &self.processed
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Write the whole list to a sibling temp file, flush it to disk, then
    /// rename over the target
    fn persist(&self) -> AuditResult<()> {
        let tmp = self.temp_path();

        let mut file = File::create(&tmp)?;
        file.write_all(&serde_json::to_vec(&self.processed)?)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CheckpointStore for JsonFileCheckpointStore {
    fn load(&mut self) -> AuditResult<Vec<AccountId>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No checkpoint file, starting fresh");
                self.processed.clear();
                self.index.clear();
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let accounts: Vec<AccountId> = serde_json::from_str(&contents).map_err(|e| {
            AuditError::Checkpoint(format!(
                "{} is not a JSON list of account ids: {}",
                self.path.display(),
                e
            ))
        })?;

        self.processed.clear();
        self.index.clear();
        for account in accounts {
            if self.index.insert(account.clone()) {
                self.processed.push(account);
            }
        }

        info!(
            path = %self.path.display(),
            accounts = self.processed.len(),
            "Found checkpoint of already processed accounts"
        );
        Ok(self.processed.clone())
    }

    fn contains(&self, account: &str) -> bool {
        self.index.contains(account)
    }

    fn mark_done(&mut self, account: &str) -> AuditResult<()> {
        if self.index.contains(account) {
            return Ok(());
        }

        self.processed.push(account.to_string());
        if let Err(e) = self.persist() {
            self.processed.pop();
            return Err(e);
        }
        self.index.insert(account.to_string());
        Ok(())
    }

    fn clear(&mut self) -> AuditResult<()> {
        self.processed.clear();
        self.index.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Deleted checkpoint file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileCheckpointStore::new(dir.path().join("cache.json"));
        assert!(store.load().unwrap().is_empty());
        assert!(!store.contains("111122223333"));
    }

    #[test]
    fn test_mark_done_persists_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut store = JsonFileCheckpointStore::new(&path);
        store.load().unwrap();
        store.mark_done("222222222222").unwrap();
        store.mark_done("111111111111").unwrap();
        store.mark_done("222222222222").unwrap();

        let on_disk: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["222222222222", "111111111111"]);

        let mut reopened = JsonFileCheckpointStore::new(&path);
        assert_eq!(
            reopened.load().unwrap(),
            vec!["222222222222".to_string(), "111111111111".to_string()]
        );
        assert!(reopened.contains("111111111111"));
    }

    #[test]
    fn test_persist_replaces_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"["999999999999"]"#).unwrap();

        let mut store = JsonFileCheckpointStore::new(&path);
        store.load().unwrap();
        store.mark_done("111111111111").unwrap();

        assert!(!store.temp_path().exists());
        let on_disk: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["999999999999", "111111111111"]);
    }

    #[test]
    fn test_load_reads_legacy_cache_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".tmp_accounts_cache.json");
        std::fs::write(&path, r#"["111111111111", "222222222222", "111111111111"]"#).unwrap();

        let mut store = JsonFileCheckpointStore::new(&path);
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn test_load_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut store = JsonFileCheckpointStore::new(&path);
        assert!(matches!(store.load(), Err(AuditError::Checkpoint(_))));
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut store = JsonFileCheckpointStore::new(&path);
        store.mark_done("111111111111").unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert!(!store.contains("111111111111"));

        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_failed_persist_does_not_mark_account() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("cache.json");

        let mut store = JsonFileCheckpointStore::new(&path);
        assert!(store.mark_done("111111111111").is_err());
        assert!(!store.contains("111111111111"));
        assert!(store.processed().is_empty());
    }
}
