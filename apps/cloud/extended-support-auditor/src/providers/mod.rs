//! AWS access for the auditor
//!
//! The collector only sees the traits in this module. `aws` implements them
//! on top of the AWS SDK; tests use the in-memory `mock` provider.

pub mod aws;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use domain_extended_support::{AccountId, DomainRecord};
use std::sync::Arc;
use thiserror::Error;

pub use aws::AwsProviders;

/// Error type for AWS provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The account has not opted in to the region; the endpoint rejects its credentials
    #[error("Region {region} is not enabled for this account: {message}")]
    RegionNotEnabled { region: String, message: String },

    #[error("Failed to assume role {role_arn}: {message}")]
    AssumeRole { role_arn: String, message: String },

    #[error("AWS API error in {operation}: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },

    #[error("Unexpected response from {operation}: {details}")]
    InvalidResponse {
        operation: &'static str,
        details: String,
    },
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// OpenSearch domain API scoped to one account and one region
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainApi: Send + Sync {
    /// Names of every domain in the region
    async fn list_domain_names(&self) -> ProviderResult<Vec<String>>;

    /// Details of up to five domains
    async fn describe_domains(&self, names: &[String]) -> ProviderResult<Vec<DomainRecord>>;
}

/// How one account is reached: with the caller's identity or an assumed role
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainAccess: Send + Sync {
    /// Short label for logs ("caller" or "assume-role")
    fn strategy(&self) -> &'static str;

    /// A domain API client for `region`, with fresh credentials
    async fn domain_api(&self, region: &str) -> ProviderResult<Box<dyn DomainApi>>;
}

/// Picks the access strategy for an account
pub trait AccessResolver: Send + Sync {
    fn access_for(&self, account: &str) -> Arc<dyn DomainAccess>;
}

/// Identity the tool is running as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account_id: AccountId,
    pub arn: String,
}

impl CallerIdentity {
    /// ARN partition of the caller (`aws`, `aws-cn`, `aws-us-gov`)
    pub fn partition(&self) -> &str {
        self.arn
            .split(':')
            .nth(1)
            .filter(|p| !p.is_empty())
            .unwrap_or("aws")
    }
}

/// STS and Organizations calls made once per run
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrganizationApi: Send + Sync {
    async fn caller_identity(&self) -> ProviderResult<CallerIdentity>;

    /// Management (payer) account of the caller's organization
    async fn management_account_id(&self) -> ProviderResult<AccountId>;

    /// Every ACTIVE account in the organization, in listing order
    async fn list_active_accounts(&self) -> ProviderResult<Vec<AccountId>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(arn: &str) -> CallerIdentity {
        CallerIdentity {
            account_id: "111111111111".to_string(),
            arn: arn.to_string(),
        }
    }

    #[test]
    fn test_partition_from_caller_arn() {
        assert_eq!(caller("arn:aws:iam::111111111111:user/ops").partition(), "aws");
        assert_eq!(
            caller("arn:aws-cn:sts::111111111111:assumed-role/Audit/s").partition(),
            "aws-cn"
        );
        assert_eq!(
            caller("arn:aws-us-gov:iam::111111111111:root").partition(),
            "aws-us-gov"
        );
    }

    #[test]
    fn test_partition_defaults_for_unexpected_arn() {
        assert_eq!(caller("").partition(), "aws");
        assert_eq!(caller("not-an-arn").partition(), "aws");
    }
}
