//! Caller identity and payer-account checks

use thiserror::Error;
use tracing::{error, info};

use crate::providers::{CallerIdentity, OrganizationApi, ProviderError};

#[derive(Error, Debug)]
pub enum OrganizationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(
        "Caller account {caller} is not the management account {management} of its organization; run the audit from the payer account"
    )]
    NotManagementAccount { caller: String, management: String },
}

/// Who is running the audit, and in which partition
pub async fn identify_caller(api: &dyn OrganizationApi) -> Result<CallerIdentity, OrganizationError> {
    let caller = api.caller_identity().await?;
    info!(
        account = %caller.account_id,
        arn = %caller.arn,
        partition = caller.partition(),
        "Resolved caller identity"
    );
    Ok(caller)
}

/// The caller must be the organization's management account
pub async fn ensure_management_account(
    api: &dyn OrganizationApi,
    caller: &CallerIdentity,
) -> Result<(), OrganizationError> {
    let management = api.management_account_id().await?;

    if management != caller.account_id {
        error!(
            caller = %caller.account_id,
            management = %management,
            "Caller is not the organization management account"
        );
        return Err(OrganizationError::NotManagementAccount {
            caller: caller.account_id.clone(),
            management,
        });
    }

    info!(account = %management, "Caller is the organization management account");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockOrganizationApi;

    fn caller() -> CallerIdentity {
        CallerIdentity {
            account_id: "111111111111".to_string(),
            arn: "arn:aws:iam::111111111111:user/auditor".to_string(),
        }
    }

    #[tokio::test]
    async fn test_identify_caller() {
        let mut api = MockOrganizationApi::new();
        api.expect_caller_identity().times(1).returning(|| Ok(caller()));

        let identity = identify_caller(&api).await.unwrap();
        assert_eq!(identity.account_id, "111111111111");
        assert_eq!(identity.partition(), "aws");
    }

    #[tokio::test]
    async fn test_management_account_accepted() {
        let mut api = MockOrganizationApi::new();
        api.expect_management_account_id()
            .times(1)
            .returning(|| Ok("111111111111".to_string()));

        assert!(ensure_management_account(&api, &caller()).await.is_ok());
    }

    #[tokio::test]
    async fn test_member_account_rejected() {
        let mut api = MockOrganizationApi::new();
        api.expect_management_account_id()
            .returning(|| Ok("999999999999".to_string()));

        let err = ensure_management_account(&api, &caller()).await.unwrap_err();
        assert!(matches!(
            err,
            OrganizationError::NotManagementAccount { ref management, .. } if management == "999999999999"
        ));
    }

    #[tokio::test]
    async fn test_describe_organization_failure_propagates() {
        let mut api = MockOrganizationApi::new();
        api.expect_management_account_id().returning(|| {
            Err(ProviderError::Api {
                operation: "DescribeOrganization",
                message: "AWSOrganizationsNotInUseException".to_string(),
            })
        });

        let err = ensure_management_account(&api, &caller()).await.unwrap_err();
        assert!(matches!(err, OrganizationError::Provider(_)));
    }
}
