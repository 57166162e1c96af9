use thiserror::Error;

/// Result type for extended support operations
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors that can occur in the extended support domain
#[derive(Debug, Error)]
pub enum AuditError {
    /// Instance type does not have a `<family>.<size>` shape
    #[error("Invalid instance type '{0}': expected <family>.<size>[.search]")]
    MalformedInstanceType(String),

    /// Instance size still unknown after refreshing the normalization table
    #[error("Unknown instance size '{size}' (instance type '{instance_type}') after refreshing normalization factors")]
    UnknownInstanceSize { instance_type: String, size: String },

    /// The normalization factor source could not be read
    #[error("Normalization source '{source_name}' failed: {details}")]
    NormalizationSource { source_name: String, details: String },

    /// No extended support price for a region display name
    #[error("No extended support price for region '{0}'")]
    MissingRegionPrice(String),

    /// Region code not present in the master catalog
    #[error("Invalid region '{0}': not an OpenSearch region")]
    UnknownRegion(String),

    /// Checkpoint file could not be read or is corrupt
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// CSV report error
    #[error("Report error: {0}")]
    Report(#[from] csv::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
