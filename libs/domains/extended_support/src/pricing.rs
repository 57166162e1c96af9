//! Extended support price per normalized instance hour (NIH), by region
//! display name, in USD.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{AuditError, AuditResult};
use crate::regions::RegionCatalog;

/// Built-in regional prices (USD per NIH)
const BUILTIN_PRICES: &[(&str, f64)] = &[
    ("US East (Ohio)", 0.0065),
    ("US East (N. Virginia)", 0.0065),
    ("US West (N. California)", 0.0073),
    ("US West (Oregon)", 0.0065),
    ("Africa (Cape Town)", 0.0087),
    ("Asia Pacific (Hong Kong)", 0.0091),
    ("Asia Pacific (Hyderabad)", 0.0074),
    ("Asia Pacific (Jakarta)", 0.0083),
    ("Asia Pacific (Malaysia)", 0.0079),
    ("Asia Pacific (Melbourne)", 0.0083),
    ("Asia Pacific (Mumbai)", 0.0074),
    ("Asia Pacific (Osaka)", 0.0084),
    ("Asia Pacific (Seoul)", 0.0080),
    ("Asia Pacific (Singapore)", 0.0083),
    ("Asia Pacific (Sydney)", 0.0083),
    ("Asia Pacific (Tokyo)", 0.0084),
    ("Canada (Central)", 0.0071),
    ("Canada West (Calgary)", 0.0071),
    ("Europe (Frankfurt)", 0.0077),
    ("Europe (Ireland)", 0.0071),
    ("Europe (London)", 0.0075),
    ("Europe (Milan)", 0.0079),
    ("Europe (Paris)", 0.0075),
    ("Europe (Spain)", 0.0071),
    ("Europe (Stockholm)", 0.0069),
    ("Europe (Zurich)", 0.0085),
    ("Israel (Tel Aviv)", 0.0079),
    ("Middle East (Bahrain)", 0.0079),
    ("Middle East (UAE)", 0.0079),
    ("South America (São Paulo)", 0.0103),
    ("AWS GovCloud (US-East)", 0.0078),
    ("AWS GovCloud (US-West)", 0.0078),
];

/// Accepted shapes of a price entry in a pricing file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceFileEntry {
    Flat(f64),
    Detailed { price_per_nih: f64 },
}

impl PriceFileEntry {
    fn price_per_nih(&self) -> f64 {
        match self {
            PriceFileEntry::Flat(price) => *price,
            PriceFileEntry::Detailed { price_per_nih } => *price_per_nih,
        }
    }
}

/// Region display name → price per NIH
#[derive(Debug, Clone, PartialEq)]
pub struct PricingTable {
    prices: HashMap<String, f64>,
}

impl PricingTable {
    pub fn new(prices: HashMap<String, f64>) -> Self {
        Self { prices }
    }

    /// Table compiled into the binary
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_PRICES
                .iter()
                .map(|(region, price)| (region.to_string(), *price))
                .collect(),
        )
    }

    /// Parse a JSON object keyed by region display name. Values are either a
    /// number or `{"price_per_nih": number}`.
    pub fn from_json_str(json: &str) -> AuditResult<Self> {
        let entries: HashMap<String, PriceFileEntry> = serde_json::from_str(json)?;
        Ok(Self::new(
            entries
                .into_iter()
                .map(|(region, entry)| (region, entry.price_per_nih()))
                .collect(),
        ))
    }

    /// Load a pricing file (see [`PricingTable::from_json_str`])
    pub fn from_json_file(path: impl AsRef<Path>) -> AuditResult<Self> {
        let path = path.as_ref();
        let table = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        info!(path = %path.display(), regions = table.len(), "Loaded extended support pricing");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Price per NIH for a region display name
    pub fn price_per_nih(&self, region_name: &str) -> AuditResult<f64> {
        self.prices
            .get(region_name)
            .copied()
            .ok_or_else(|| AuditError::MissingRegionPrice(region_name.to_string()))
    }

    /// Fail if any region of the catalog cannot be priced
    pub fn ensure_covers(&self, catalog: &RegionCatalog) -> AuditResult<()> {
        for region in catalog.iter() {
            self.price_per_nih(&region.name)?;
        }
        debug!(regions = catalog.len(), "Pricing covers every catalog region");
        Ok(())
    }
}
