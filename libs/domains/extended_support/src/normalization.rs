//! Instance size → normalization factor table.
//!
//! Extended support is billed per normalized instance hour. The factor is
//! keyed by the size token of the instance type (`m7g.medium.search` →
//! `medium`). The table is read-mostly: readers clone an `Arc` snapshot and a
//! refresh swaps in a whole new map.

use async_trait::async_trait;
use observability::AuditMetrics;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{AuditError, AuditResult};

/// Size token → normalization factor
pub type FactorMap = HashMap<String, f64>;

/// Built-in normalization factors
const BUILTIN_FACTORS: &[(&str, f64)] = &[
    ("nano", 0.25),
    ("micro", 0.5),
    ("small", 1.0),
    ("medium", 2.0),
    ("large", 4.0),
    ("xlarge", 8.0),
    ("2xlarge", 16.0),
    ("4xlarge", 32.0),
    ("8xlarge", 64.0),
    ("9xlarge", 72.0),
    ("10xlarge", 80.0),
    ("12xlarge", 96.0),
    ("16xlarge", 128.0),
    ("18xlarge", 144.0),
    ("24xlarge", 192.0),
    ("32xlarge", 256.0),
];

/// The built-in factor table as a map
pub fn builtin_factors() -> FactorMap {
    BUILTIN_FACTORS
        .iter()
        .map(|(size, factor)| (size.to_string(), *factor))
        .collect()
}

/// Size token of an instance type: its second dot-separated segment
pub fn instance_size(instance_type: &str) -> AuditResult<&str> {
    instance_type
        .split('.')
        .nth(1)
        .filter(|size| !size.is_empty())
        .ok_or_else(|| AuditError::MalformedInstanceType(instance_type.to_string()))
}

/// Authoritative origin of normalization factors, re-read on refresh
#[async_trait]
pub trait NormalizationSource: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Load the complete factor table
    async fn load(&self) -> AuditResult<FactorMap>;
}

/// Factors compiled into the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinNormalizationSource;

#[async_trait]
impl NormalizationSource for BuiltinNormalizationSource {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn load(&self) -> AuditResult<FactorMap> {
        Ok(builtin_factors())
    }
}

/// Factors read from a JSON object file, e.g. `{"medium": 2, "large": 4}`
#[derive(Debug, Clone)]
pub struct JsonFileNormalizationSource {
    path: PathBuf,
    name: String,
}

impl JsonFileNormalizationSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl NormalizationSource for JsonFileNormalizationSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> AuditResult<FactorMap> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AuditError::NormalizationSource {
                source_name: self.name.clone(),
                details: e.to_string(),
            }
        })?;
        serde_json::from_str(&contents).map_err(|e| AuditError::NormalizationSource {
            source_name: self.name.clone(),
            details: e.to_string(),
        })
    }
}

/// Concurrency-safe normalization table with refresh-on-miss
pub struct NormalizationTable {
    source: Arc<dyn NormalizationSource>,
    snapshot: RwLock<Arc<FactorMap>>,
    refreshes: AtomicU64,
}

impl NormalizationTable {
    /// Build the table from its source
    pub async fn load(source: Arc<dyn NormalizationSource>) -> AuditResult<Self> {
        let factors = source.load().await?;
        info!(
            source = source.name(),
            sizes = factors.len(),
            "Loaded normalization factors"
        );
        Ok(Self::with_factors(source, factors))
    }

    /// Build the table from an initial snapshot; `source` is used for refreshes
    pub fn with_factors(source: Arc<dyn NormalizationSource>, factors: FactorMap) -> Self {
        Self {
            source,
            snapshot: RwLock::new(Arc::new(factors)),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> Arc<FactorMap> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Number of refreshes performed so far
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Re-derive the whole table from its source and swap it in
    pub async fn refresh(&self) -> AuditResult<Arc<FactorMap>> {
        let factors = Arc::new(self.source.load().await?);
        *self.snapshot.write().await = Arc::clone(&factors);
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        info!(
            source = self.source.name(),
            sizes = factors.len(),
            "Refreshed normalization factors"
        );
        Ok(factors)
    }

    /// Normalization factor for an instance type.
    ///
    /// An unknown size triggers exactly one refresh and one retry; a second
    /// miss is `UnknownInstanceSize`.
    pub async fn factor_for(&self, instance_type: &str) -> AuditResult<f64> {
        let size = instance_size(instance_type)?;

        if let Some(factor) = self.snapshot().await.get(size) {
            return Ok(*factor);
        }

        warn!(
            instance_type = instance_type,
            size = size,
            "Instance size not in normalization table, refreshing"
        );
        AuditMetrics::record_normalization_refresh(size);
        let refreshed = self.refresh().await?;

        match refreshed.get(size) {
            Some(factor) => {
                debug!(size = size, factor = factor, "Resolved instance size after refresh");
                Ok(*factor)
            }
            None => Err(AuditError::UnknownInstanceSize {
                instance_type: instance_type.to_string(),
                size: size.to_string(),
            }),
        }
    }
}
