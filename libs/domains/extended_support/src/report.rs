//! CSV report of eligible domains.
//!
//! The file is created with its header at run start; every later write is a
//! header-less append of one batch of rows.

use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::cost::format_usd;
use crate::error::AuditResult;
use crate::models::{EligibleDomainReport, NOT_APPLICABLE};

/// Report columns, in output order
pub const REPORT_COLUMNS: [&str; 22] = [
    "AccountId",
    "Region",
    "RegionName",
    "DomainName",
    "ARN",
    "EngineVersion",
    "DedicatedMasterType",
    "DedicatedMasterCount",
    "Normalization Factor (Master Nodes)",
    "InstanceType",
    "InstanceCount",
    "Normalization Factor (Data Nodes)",
    "WarmType",
    "WarmCount",
    "Normalization Factor (Ultrawarm Nodes)",
    "CoordinatorNodeType",
    "CoordinatorNodeCount",
    "Normalization Factor (Coordinator Nodes)",
    "Regional Price Per NIH",
    "End of Standard Support",
    "End of Extended Support",
    "Yearly Extended Support Cost",
];

/// Destination for report rows
#[cfg_attr(test, mockall::automock)]
pub trait ReportSink: Send {
    /// Append a batch of rows; an empty batch writes nothing.
    /// Returns the number of rows written.
    fn append(&mut self, rows: &[EligibleDomainReport]) -> AuditResult<usize>;
}

/// Flat CSV record for one report row
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    account_id: &'a str,
    region: &'a str,
    region_name: &'a str,
    domain_name: &'a str,
    arn: &'a str,
    engine_version: &'a str,
    master_type: &'a str,
    master_count: u32,
    master_factor: f64,
    data_type: &'a str,
    data_count: u32,
    data_factor: f64,
    warm_type: &'a str,
    warm_count: u32,
    warm_factor: f64,
    coordinator_type: &'a str,
    coordinator_count: u32,
    coordinator_factor: f64,
    price_per_nih: f64,
    end_of_standard_support: String,
    end_of_extended_support: String,
    yearly_cost: String,
}

impl<'a> From<&'a EligibleDomainReport> for CsvRow<'a> {
    fn from(row: &'a EligibleDomainReport) -> Self {
        let date = |d: Option<chrono::NaiveDate>| {
            d.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| NOT_APPLICABLE.to_string())
        };

        Self {
            account_id: &row.account_id,
            region: &row.region,
            region_name: &row.region_name,
            domain_name: &row.domain_name,
            arn: &row.arn,
            engine_version: &row.engine_version,
            master_type: &row.dedicated_master.instance_type,
            master_count: row.dedicated_master.count,
            master_factor: row.dedicated_master.normalization_factor,
            data_type: &row.data.instance_type,
            data_count: row.data.count,
            data_factor: row.data.normalization_factor,
            warm_type: &row.ultrawarm.instance_type,
            warm_count: row.ultrawarm.count,
            warm_factor: row.ultrawarm.normalization_factor,
            coordinator_type: &row.coordinator.instance_type,
            coordinator_count: row.coordinator.count,
            coordinator_factor: row.coordinator.normalization_factor,
            price_per_nih: row.price_per_nih,
            end_of_standard_support: date(row.end_of_standard_support),
            end_of_extended_support: date(row.end_of_extended_support),
            yearly_cost: format_usd(row.yearly_cost),
        }
    }
}

/// Append-only CSV file sink
#[derive(Debug)]
pub struct CsvReportSink {
    path: PathBuf,
}

impl CsvReportSink {
    /// Create (or truncate) the report file and write the header row
    pub fn create(path: impl Into<PathBuf>) -> AuditResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                debug!(dir = %parent.display(), "Creating report directory");
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = WriterBuilder::new().from_path(&path)?;
        writer.write_record(REPORT_COLUMNS)?;
        writer.flush()?;

        info!(path = %path.display(), "Created report file");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for CsvReportSink {
    fn append(&mut self, rows: &[EligibleDomainReport]) -> AuditResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        for row in rows {
            writer.serialize(CsvRow::from(row))?;
        }
        writer.flush()?;

        debug!(path = %self.path.display(), rows = rows.len(), "Appended report rows");
        Ok(rows.len())
    }
}
