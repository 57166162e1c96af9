use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{AuditError, AuditResult};

/// Regions where OpenSearch Service is offered: (code, display name)
const OPENSEARCH_REGIONS: &[(&str, &str)] = &[
    ("us-east-2", "US East (Ohio)"),
    ("us-east-1", "US East (N. Virginia)"),
    ("us-west-1", "US West (N. California)"),
    ("us-west-2", "US West (Oregon)"),
    ("af-south-1", "Africa (Cape Town)"),
    ("ap-east-1", "Asia Pacific (Hong Kong)"),
    ("ap-south-2", "Asia Pacific (Hyderabad)"),
    ("ap-southeast-3", "Asia Pacific (Jakarta)"),
    ("ap-southeast-5", "Asia Pacific (Malaysia)"),
    ("ap-southeast-4", "Asia Pacific (Melbourne)"),
    ("ap-south-1", "Asia Pacific (Mumbai)"),
    ("ap-northeast-3", "Asia Pacific (Osaka)"),
    ("ap-northeast-2", "Asia Pacific (Seoul)"),
    ("ap-southeast-1", "Asia Pacific (Singapore)"),
    ("ap-southeast-2", "Asia Pacific (Sydney)"),
    ("ap-northeast-1", "Asia Pacific (Tokyo)"),
    ("ca-central-1", "Canada (Central)"),
    ("ca-west-1", "Canada West (Calgary)"),
    ("eu-central-1", "Europe (Frankfurt)"),
    ("eu-west-1", "Europe (Ireland)"),
    ("eu-west-2", "Europe (London)"),
    ("eu-south-1", "Europe (Milan)"),
    ("eu-west-3", "Europe (Paris)"),
    ("eu-south-2", "Europe (Spain)"),
    ("eu-north-1", "Europe (Stockholm)"),
    ("eu-central-2", "Europe (Zurich)"),
    ("il-central-1", "Israel (Tel Aviv)"),
    ("me-south-1", "Middle East (Bahrain)"),
    ("me-central-1", "Middle East (UAE)"),
    ("sa-east-1", "South America (São Paulo)"),
    ("us-gov-east-1", "AWS GovCloud (US-East)"),
    ("us-gov-west-1", "AWS GovCloud (US-West)"),
];

/// A region code and its human-readable name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
}

/// Ordered, read-only region code → display name mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCatalog {
    regions: Vec<Region>,
}

impl RegionCatalog {
    /// Every region OpenSearch is offered in
    pub fn builtin() -> Self {
        Self {
            regions: OPENSEARCH_REGIONS
                .iter()
                .map(|(code, name)| Region {
                    code: code.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    /// Keep only the listed region codes, in catalog order.
    ///
    /// Any code that is not in this catalog is an error.
    pub fn restrict_to(&self, codes: &[String]) -> AuditResult<Self> {
        if let Some(unknown) = codes.iter().find(|code| self.get(code).is_none()) {
            error!(region = %unknown, "Region list contains a region OpenSearch is not offered in");
            return Err(AuditError::UnknownRegion(unknown.clone()));
        }

        let regions: Vec<Region> = self
            .regions
            .iter()
            .filter(|region| codes.contains(&region.code))
            .cloned()
            .collect();
        debug!(regions = regions.len(), "Filtered region catalog");

        Ok(Self { regions })
    }

    pub fn get(&self, code: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.code == code)
    }

    pub fn display_name(&self, code: &str) -> Option<&str> {
        self.get(code).map(|region| region.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.regions.iter().map(|region| region.code.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
