//! Extended Support Domain
//!
//! Everything needed to decide whether an OpenSearch/Elasticsearch domain is
//! billed for extended support, what that costs per year, and how results are
//! recorded durably across resumable runs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │      RunLedger       │  ← report rows + checkpoint, committed as one unit
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │ ReportSink │ Checkpoint │  ← durable storage (CSV file, JSON file)
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │ Eligibility │ Normalization │ Pricing │ Regions │ Cost │  ← static tables, pure logic
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │        Models        │  ← DomainRecord, EligibleDomainReport
//! └──────────────────────┘
//! ```

pub mod checkpoint;
pub mod cost;
pub mod eligibility;
pub mod error;
pub mod ledger;
pub mod models;
pub mod normalization;
pub mod pricing;
pub mod regions;
pub mod report;

// Re-export commonly used types
pub use checkpoint::{CheckpointStore, JsonFileCheckpointStore};
pub use cost::{HOURS_PER_YEAR, format_usd, yearly_extended_support_cost};
pub use eligibility::{Engine, EngineVersion, SupportWindow, is_extended_support_eligible, support_window};
pub use error::{AuditError, AuditResult};
pub use ledger::RunLedger;
pub use models::{
    AccountId, ClusterShape, DomainRecord, EligibleDomainReport, NOT_APPLICABLE, NodeGroup,
    NodeOption, NodeRole, RoleCapacity,
};
pub use normalization::{
    BuiltinNormalizationSource, FactorMap, JsonFileNormalizationSource, NormalizationSource,
    NormalizationTable, instance_size,
};
pub use pricing::PricingTable;
pub use regions::{Region, RegionCatalog};
pub use report::{CsvReportSink, REPORT_COLUMNS, ReportSink};
