//! Extended support eligibility of engine versions.
//!
//! Version strings have the form `<Engine>_<Major>.<Minor>`, for example
//! `OpenSearch_2.5` or `Elasticsearch_7.8`. Anything else is not eligible.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Search engine family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum Engine {
    OpenSearch,
    Elasticsearch,
}

/// A parsed `<Engine>_<Major>.<Minor>` version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineVersion {
    pub engine: Engine,
    pub major: u32,
    pub minor: u32,
    /// The `<Major>.<Minor>` part exactly as written
    pub version: String,
}

impl EngineVersion {
    /// Parse a version string, `None` for unknown engines or malformed input
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split('_');
        let (engine, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(engine), Some(version), None) => (engine, version),
            _ => return None,
        };

        let mut numbers = version.split('.');
        let (major, minor) = match (numbers.next(), numbers.next(), numbers.next()) {
            (Some(major), Some(minor), None) => (major.parse().ok()?, minor.parse().ok()?),
            _ => return None,
        };

        Some(Self {
            engine: engine.parse().ok()?,
            major,
            minor,
            version: version.to_string(),
        })
    }

    /// Whether this version is billed for extended support (ranges inclusive)
    pub fn is_eligible(&self) -> bool {
        let (major, minor) = (self.major, self.minor);
        match self.engine {
            Engine::OpenSearch => {
                (major == 1 && minor <= 2) || (major == 2 && (3..=9).contains(&minor))
            }
            Engine::Elasticsearch => {
                matches!(self.version.as_str(), "1.5" | "2.3")
                    || (major == 5 && (1..=6).contains(&minor))
                    || (major == 6 && minor <= 7)
                    || (major == 7 && (1..=8).contains(&minor))
            }
        }
    }
}

/// Whether `version` (`<Engine>_<Major>.<Minor>`) is eligible for extended
/// support. Total: malformed input is simply not eligible.
pub fn is_extended_support_eligible(version: &str) -> bool {
    EngineVersion::parse(version).is_some_and(|v| v.is_eligible())
}

/// End dates of standard and extended support for one engine version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportWindow {
    pub end_of_standard_support: NaiveDate,
    pub end_of_extended_support: NaiveDate,
}

const STANDARD_END: &str = "2025-11-07";
const EXTENDED_END: &str = "2026-11-07";

/// (version, end of standard support, end of extended support)
const SUPPORT_WINDOWS: &[(&str, &str, &str)] = &[
    ("OpenSearch_1.0", STANDARD_END, EXTENDED_END),
    ("OpenSearch_1.1", STANDARD_END, EXTENDED_END),
    ("OpenSearch_1.2", STANDARD_END, EXTENDED_END),
    ("OpenSearch_2.3", STANDARD_END, EXTENDED_END),
    ("OpenSearch_2.4", STANDARD_END, EXTENDED_END),
    ("OpenSearch_2.5", STANDARD_END, EXTENDED_END),
    ("OpenSearch_2.6", STANDARD_END, EXTENDED_END),
    ("OpenSearch_2.7", STANDARD_END, EXTENDED_END),
    ("OpenSearch_2.8", STANDARD_END, EXTENDED_END),
    ("OpenSearch_2.9", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_1.5", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_2.3", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_5.1", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_5.2", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_5.3", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_5.4", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_5.5", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_5.6", STANDARD_END, "2028-11-07"),
    ("Elasticsearch_6.0", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_6.1", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_6.2", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_6.3", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_6.4", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_6.5", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_6.6", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_6.7", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_7.1", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_7.2", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_7.3", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_7.4", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_7.5", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_7.6", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_7.7", STANDARD_END, EXTENDED_END),
    ("Elasticsearch_7.8", STANDARD_END, EXTENDED_END),
];

/// Support window for an exact version string, if known
pub fn support_window(version: &str) -> Option<SupportWindow> {
    let (_, standard, extended) = SUPPORT_WINDOWS.iter().find(|(v, _, _)| *v == version)?;
    Some(SupportWindow {
        end_of_standard_support: NaiveDate::parse_from_str(standard, "%Y-%m-%d").ok()?,
        end_of_extended_support: NaiveDate::parse_from_str(extended, "%Y-%m-%d").ok()?,
    })
}
