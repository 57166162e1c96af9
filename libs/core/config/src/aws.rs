use crate::{env_optional, env_or_default, ConfigError, FromEnv};

/// Role assumed in member accounts when none is configured
pub const DEFAULT_MEMBER_ROLE_NAME: &str = "OrganizationAccountAccessRole";

/// AWS access configuration shared by every SDK client the tool creates
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AwsConfig {
    /// Named profile from the shared config files
    pub profile: Option<String>,
    /// Home region for global calls (STS, Organizations)
    pub region: Option<String>,
    /// IAM role name assumed in every member account
    pub member_role_name: String,
}

impl AwsConfig {
    /// ARN of the member role in `account_id` within `partition`
    pub fn member_role_arn(&self, partition: &str, account_id: &str) -> String {
        format!(
            "arn:{}:iam::{}:role/{}",
            partition, account_id, self.member_role_name
        )
    }
}

impl FromEnv for AwsConfig {
    /// Reads from environment variables:
    /// - AWS_PROFILE: optional
    /// - AWS_REGION: optional, the SDK default chain applies when unset
    /// - MEMBER_ACCOUNT_ROLE_NAME: defaults to OrganizationAccountAccessRole
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            profile: env_optional("AWS_PROFILE"),
            region: env_optional("AWS_REGION"),
            member_role_name: env_or_default("MEMBER_ACCOUNT_ROLE_NAME", DEFAULT_MEMBER_ROLE_NAME),
        })
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            profile: None,
            region: None,
            member_role_name: DEFAULT_MEMBER_ROLE_NAME.to_string(),
        }
    }
}
