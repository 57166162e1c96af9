//! AWS SDK implementations of the provider traits
//!
//! Credential resolution follows the SDK default chain, optionally pinned to
//! a named profile and home region:
//! - Environment variables (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`)
//! - Shared config/credentials files (`AWS_PROFILE`)
//! - Web identity token, IAM instance profile

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_opensearch::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_opensearch::types::{ClusterConfig, DomainStatus, NodeOption as SdkNodeOption};
use core_config::aws::AwsConfig;
use domain_extended_support::{
    AccountId, ClusterShape, DomainRecord, NOT_APPLICABLE, NodeGroup, NodeOption,
};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    AccessResolver, CallerIdentity, DomainAccess, DomainApi, OrganizationApi, ProviderError,
    ProviderResult,
};

/// Error codes returned by a regional endpoint when the account has not enabled the region
const REGION_NOT_ENABLED_CODES: &[&str] = &["InvalidClientTokenId", "UnrecognizedClientException"];

/// Classify an SDK error, separating "region not enabled" from everything else
fn classify_error<E, R>(operation: &'static str, region: &str, err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err.code() {
        Some(code) if REGION_NOT_ENABLED_CODES.contains(&code) => ProviderError::RegionNotEnabled {
            region: region.to_string(),
            message,
        },
        _ => ProviderError::Api { operation, message },
    }
}

fn api_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    ProviderError::Api {
        operation,
        message: DisplayErrorContext(&err).to_string(),
    }
}

/// Shared SDK configuration plus the STS and Organizations clients
#[derive(Clone)]
pub struct AwsProviders {
    sdk_config: SdkConfig,
    sts: aws_sdk_sts::Client,
    organizations: aws_sdk_organizations::Client,
}

impl AwsProviders {
    /// Load the SDK configuration from the environment
    pub async fn load(config: &AwsConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }

        let sdk_config = loader.load().await;
        info!(
            profile = config.profile.as_deref().unwrap_or("default"),
            region = sdk_config.region().map(|r| r.as_ref()).unwrap_or("unset"),
            "Loaded AWS configuration"
        );

        Self {
            sts: aws_sdk_sts::Client::new(&sdk_config),
            organizations: aws_sdk_organizations::Client::new(&sdk_config),
            sdk_config,
        }
    }

    /// Resolver that reaches member accounts through `config.member_role_name`
    pub fn access_resolver(&self, config: &AwsConfig, caller: &CallerIdentity) -> AwsAccessResolver {
        AwsAccessResolver {
            sdk_config: self.sdk_config.clone(),
            sts: self.sts.clone(),
            aws: config.clone(),
            caller_account: caller.account_id.clone(),
            partition: caller.partition().to_string(),
        }
    }
}

#[async_trait]
impl OrganizationApi for AwsProviders {
    async fn caller_identity(&self) -> ProviderResult<CallerIdentity> {
        let output = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| api_error("GetCallerIdentity", e))?;

        let account_id = output
            .account()
            .ok_or_else(|| ProviderError::InvalidResponse {
                operation: "GetCallerIdentity",
                details: "missing account".to_string(),
            })?
            .to_string();

        Ok(CallerIdentity {
            account_id,
            arn: output.arn().unwrap_or_default().to_string(),
        })
    }

    async fn management_account_id(&self) -> ProviderResult<AccountId> {
        let output = self
            .organizations
            .describe_organization()
            .send()
            .await
            .map_err(|e| api_error("DescribeOrganization", e))?;

        output
            .organization()
            .and_then(|org| org.master_account_id())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::InvalidResponse {
                operation: "DescribeOrganization",
                details: "missing management account id".to_string(),
            })
    }

    async fn list_active_accounts(&self) -> ProviderResult<Vec<AccountId>> {
        let mut pages = self.organizations.list_accounts().into_paginator().send();
        let mut accounts = Vec::new();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| api_error("ListAccounts", e))?;
            for account in page.accounts() {
                let active = account
                    .status()
                    .is_some_and(|s| *s == aws_sdk_organizations::types::AccountStatus::Active);
                match account.id() {
                    Some(id) if active => accounts.push(id.to_string()),
                    Some(id) => debug!(account = id, "Skipping inactive organization account"),
                    None => {}
                }
            }
        }

        info!(count = accounts.len(), "Listed active organization accounts");
        Ok(accounts)
    }
}

/// OpenSearch client bound to one region
pub struct OpenSearchDomainApi {
    client: aws_sdk_opensearch::Client,
    region: String,
}

impl OpenSearchDomainApi {
    fn new(config: aws_sdk_opensearch::Config, region: &str) -> Self {
        Self {
            client: aws_sdk_opensearch::Client::from_conf(config),
            region: region.to_string(),
        }
    }
}

#[async_trait]
impl DomainApi for OpenSearchDomainApi {
    async fn list_domain_names(&self) -> ProviderResult<Vec<String>> {
        let output = self
            .client
            .list_domain_names()
            .send()
            .await
            .map_err(|e| classify_error("ListDomainNames", &self.region, e))?;

        Ok(output
            .domain_names()
            .iter()
            .filter_map(|info| info.domain_name().map(str::to_string))
            .collect())
    }

    async fn describe_domains(&self, names: &[String]) -> ProviderResult<Vec<DomainRecord>> {
        let output = self
            .client
            .describe_domains()
            .set_domain_names(Some(names.to_vec()))
            .send()
            .await
            .map_err(|e| classify_error("DescribeDomains", &self.region, e))?;

        Ok(output.domain_status_list().iter().map(domain_record).collect())
    }
}

fn count(value: Option<i32>) -> u32 {
    value.and_then(|c| u32::try_from(c).ok()).unwrap_or(0)
}

fn cluster_shape(config: &ClusterConfig) -> ClusterShape {
    let data = NodeGroup::new(
        config.instance_type().map(|t| t.as_str()).unwrap_or(NOT_APPLICABLE),
        count(config.instance_count()),
    );

    let dedicated_master = match (config.dedicated_master_enabled(), config.dedicated_master_type()) {
        (Some(true), Some(kind)) => Some(NodeGroup::new(
            kind.as_str(),
            count(config.dedicated_master_count()),
        )),
        _ => None,
    };

    let warm = match (config.warm_enabled(), config.warm_type()) {
        (Some(true), Some(kind)) => Some(NodeGroup::new(kind.as_str(), count(config.warm_count()))),
        _ => None,
    };

    ClusterShape {
        data,
        dedicated_master,
        warm,
        node_options: config.node_options().iter().map(node_option).collect(),
    }
}

fn node_option(option: &SdkNodeOption) -> NodeOption {
    let node = option.node_config().and_then(|node| {
        match (node.enabled(), node.r#type()) {
            (Some(false), _) | (_, None) => None,
            (_, Some(kind)) => Some(NodeGroup::new(kind.as_str(), count(node.count()))),
        }
    });

    NodeOption {
        node_type: option
            .node_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        node,
    }
}

fn domain_record(status: &DomainStatus) -> DomainRecord {
    DomainRecord {
        domain_name: status.domain_name().to_string(),
        arn: status.arn().to_string(),
        engine_version: status.engine_version().map(str::to_string),
        cluster: status
            .cluster_config()
            .map(cluster_shape)
            .unwrap_or_else(|| ClusterShape::data_only(NOT_APPLICABLE, 0)),
    }
}

/// Reach the caller's own account with the ambient credentials
pub struct SameIdentityAccess {
    sdk_config: SdkConfig,
}

#[async_trait]
impl DomainAccess for SameIdentityAccess {
    fn strategy(&self) -> &'static str {
        "caller"
    }

    async fn domain_api(&self, region: &str) -> ProviderResult<Box<dyn DomainApi>> {
        let config = aws_sdk_opensearch::config::Builder::from(&self.sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        Ok(Box::new(OpenSearchDomainApi::new(config, region)))
    }
}

/// Reach a member account by assuming a role in it
pub struct AssumeRoleAccess {
    sdk_config: SdkConfig,
    sts: aws_sdk_sts::Client,
    role_arn: String,
}

impl AssumeRoleAccess {
    /// Session names must be unique per call; concurrent tasks assume roles at the same time
    fn session_name() -> String {
        format!("AssumeRoleSession{}", Uuid::new_v4())
    }
}

#[async_trait]
impl DomainAccess for AssumeRoleAccess {
    fn strategy(&self) -> &'static str {
        "assume-role"
    }

    async fn domain_api(&self, region: &str) -> ProviderResult<Box<dyn DomainApi>> {
        let session_name = Self::session_name();
        debug!(role_arn = %self.role_arn, session = %session_name, region = region, "Assuming role");

        let output = self
            .sts
            .assume_role()
            .role_arn(&self.role_arn)
            .role_session_name(&session_name)
            .send()
            .await
            .map_err(|e| ProviderError::AssumeRole {
                role_arn: self.role_arn.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let credentials = output
            .credentials()
            .ok_or_else(|| ProviderError::InvalidResponse {
                operation: "AssumeRole",
                details: "missing credentials".to_string(),
            })?;

        let scoped = aws_sdk_opensearch::config::Credentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            Some(credentials.session_token().to_string()),
            SystemTime::try_from(*credentials.expiration()).ok(),
            "AssumeRole",
        );

        let config = aws_sdk_opensearch::config::Builder::from(&self.sdk_config)
            .region(Region::new(region.to_string()))
            .credentials_provider(scoped)
            .build();
        Ok(Box::new(OpenSearchDomainApi::new(config, region)))
    }
}

/// Same identity for the caller's account, assumed role for every other one
pub struct AwsAccessResolver {
    sdk_config: SdkConfig,
    sts: aws_sdk_sts::Client,
    aws: AwsConfig,
    caller_account: AccountId,
    partition: String,
}

impl AccessResolver for AwsAccessResolver {
    fn access_for(&self, account: &str) -> Arc<dyn DomainAccess> {
        if account == self.caller_account {
            return Arc::new(SameIdentityAccess {
                sdk_config: self.sdk_config.clone(),
            });
        }

        Arc::new(AssumeRoleAccess {
            sdk_config: self.sdk_config.clone(),
            sts: self.sts.clone(),
            role_arn: self.aws.member_role_arn(&self.partition, account),
        })
    }
}
