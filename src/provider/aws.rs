use aws_config::{
    meta::region::RegionProviderChain, retry::RetryConfig, BehaviorVersion, SdkConfig,
};
use aws_sdk_identitystore::Client as IdentityStoreClient;
use aws_sdk_organizations::{error::SdkError, Client as OrganizationsClient};
use aws_sdk_ssoadmin::{error::DisplayErrorContext, Client as SsoAdminClient};
use aws_types::region::Region;
use tracing::{debug, warn};

use super::{IdentityProvider, Page};
use crate::{
    error::ProviderError,
    model::{
        AccountAssignment, AccountStatus, InstanceDescription, OrganizationAccount,
        PrincipalType, SsoInstance,
    },
};

const FALLBACK_REGION: &str = "us-east-1";

/// How the shared AWS configuration is resolved.
#[derive(Debug, Clone, Default)]
pub struct AwsSettings {
    /// Named profile from the shared config/credentials files.
    pub profile: Option<String>,
    /// Region override; otherwise the default region chain, then `us-east-1`.
    pub region: Option<String>,
    /// Maximum attempts per API call, including the first one.
    pub max_attempts: Option<u32>,
}

/// [`IdentityProvider`] backed by the AWS SDK. Holds one client per service, all built
/// from the same [`SdkConfig`].
#[derive(Clone, Debug)]
pub struct AwsProvider {
    organizations: OrganizationsClient,
    sso_admin: SsoAdminClient,
    identity_store: IdentityStoreClient,
}

impl AwsProvider {
    pub async fn connect(settings: &AwsSettings) -> Self {
        let config = load_config(settings).await;
        Self::from_config(&config)
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        Self {
            organizations: OrganizationsClient::new(config),
            sso_admin: SsoAdminClient::new(config),
            identity_store: IdentityStoreClient::new(config),
        }
    }
}

async fn load_config(settings: &AwsSettings) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(profile) = settings.profile.as_deref() {
        loader = loader.profile_name(profile);
    }

    let region_provider = RegionProviderChain::first_try(settings.region.clone().map(Region::new))
        .or_default_provider()
        .or_else(FALLBACK_REGION);
    loader = loader.region(region_provider);

    if let Some(max_attempts) = settings.max_attempts {
        loader = loader.retry_config(RetryConfig::standard().with_max_attempts(max_attempts));
    }

    let config = loader.load().await;
    debug!(
        "AWS config resolved: region={}",
        config.region().map(|r| r.as_ref().to_string()).unwrap_or_else(|| "unknown".into())
    );
    config
}

/// Convert an SDK failure into a [`ProviderError`], classifying service errors for
/// which `is_not_found` holds as [`ProviderError::NotFound`].
fn map_sdk_error<E, R>(
    operation: &'static str,
    err: SdkError<E, R>,
    is_not_found: impl Fn(&E) -> bool,
) -> ProviderError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let not_found = err.as_service_error().is_some_and(&is_not_found);
    let message = DisplayErrorContext(&err).to_string();
    if not_found {
        ProviderError::not_found(operation, message)
    } else {
        if is_access_denied(&message) {
            warn!("AWS {operation}: access denied; check the caller's permissions");
        }
        ProviderError::api(operation, message)
    }
}

fn never<E>(_: &E) -> bool {
    false
}

fn is_access_denied(message: &str) -> bool {
    message.contains("AccessDenied") || message.contains("AccessDeniedException")
}

fn missing(operation: &'static str, field: &str) -> ProviderError {
    ProviderError::api(operation, format!("response is missing {field}"))
}

fn account_status(status: Option<&aws_sdk_organizations::types::AccountStatus>) -> AccountStatus {
    use aws_sdk_organizations::types::AccountStatus as Sdk;
    match status {
        Some(Sdk::Active) => AccountStatus::Active,
        Some(Sdk::Suspended) => AccountStatus::Suspended,
        Some(Sdk::PendingClosure) => AccountStatus::PendingClosure,
        _ => AccountStatus::Unknown,
    }
}

fn principal_type(
    operation: &'static str,
    value: Option<&aws_sdk_ssoadmin::types::PrincipalType>,
) -> Result<PrincipalType, ProviderError> {
    use aws_sdk_ssoadmin::types::PrincipalType as Sdk;
    match value {
        Some(Sdk::User) => Ok(PrincipalType::User),
        Some(Sdk::Group) => Ok(PrincipalType::Group),
        Some(other) => {
            Err(ProviderError::api(operation, format!("unsupported principal type {}", other.as_str())))
        }
        None => Err(missing(operation, "PrincipalType")),
    }
}

impl IdentityProvider for AwsProvider {
    async fn list_accounts(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<OrganizationAccount>, ProviderError> {
        const OP: &str = "organizations:ListAccounts";
        let resp = self
            .organizations
            .list_accounts()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| map_sdk_error(OP, err, never))?;

        let mut items = Vec::with_capacity(resp.accounts().len());
        for account in resp.accounts() {
            #[allow(deprecated)]
            let status = account_status(account.status());
            items.push(OrganizationAccount {
                id: account.id().ok_or_else(|| missing(OP, "Account.Id"))?.to_string(),
                name: account.name().unwrap_or_default().to_string(),
                status,
            });
        }

        Ok(Page { items, next_token: resp.next_token().map(str::to_string) })
    }

    async fn list_instances(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<SsoInstance>, ProviderError> {
        const OP: &str = "sso:ListInstances";
        let resp = self
            .sso_admin
            .list_instances()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| map_sdk_error(OP, err, never))?;

        let items = resp
            .instances()
            .iter()
            .map(|instance| {
                Ok(SsoInstance {
                    instance_arn: instance
                        .instance_arn()
                        .ok_or_else(|| missing(OP, "InstanceArn"))?
                        .to_string(),
                    identity_store_id: instance
                        .identity_store_id()
                        .ok_or_else(|| missing(OP, "IdentityStoreId"))?
                        .to_string(),
                })
            })
            .collect::<Result<Vec<_>, ProviderError>>()?;

        Ok(Page { items, next_token: resp.next_token().map(str::to_string) })
    }

    async fn describe_instance(
        &self,
        instance_arn: &str,
    ) -> Result<InstanceDescription, ProviderError> {
        let resp = self
            .sso_admin
            .describe_instance()
            .instance_arn(instance_arn)
            .send()
            .await
            .map_err(|err| map_sdk_error("sso:DescribeInstance", err, never))?;

        Ok(InstanceDescription {
            name: resp.name().map(str::to_string),
            identity_store_id: resp.identity_store_id().map(str::to_string),
            owner_account_id: resp.owner_account_id().map(str::to_string),
        })
    }

    async fn list_permission_sets(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<String>, ProviderError> {
        let resp = self
            .sso_admin
            .list_permission_sets()
            .instance_arn(instance_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| {
                map_sdk_error("sso:ListPermissionSets", err, |e| {
                    e.is_resource_not_found_exception()
                })
            })?;

        Ok(Page {
            items: resp.permission_sets().to_vec(),
            next_token: resp.next_token().map(str::to_string),
        })
    }

    async fn describe_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> Result<String, ProviderError> {
        const OP: &str = "sso:DescribePermissionSet";
        let resp = self
            .sso_admin
            .describe_permission_set()
            .instance_arn(instance_arn)
            .permission_set_arn(permission_set_arn)
            .send()
            .await
            .map_err(|err| map_sdk_error(OP, err, |e| e.is_resource_not_found_exception()))?;

        resp.permission_set()
            .and_then(|ps| ps.name())
            .map(str::to_string)
            .ok_or_else(|| missing(OP, "PermissionSet.Name"))
    }

    async fn list_account_assignments(
        &self,
        instance_arn: &str,
        account_id: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<AccountAssignment>, ProviderError> {
        const OP: &str = "sso:ListAccountAssignments";
        let resp = self
            .sso_admin
            .list_account_assignments()
            .instance_arn(instance_arn)
            .account_id(account_id)
            .permission_set_arn(permission_set_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| map_sdk_error(OP, err, |e| e.is_resource_not_found_exception()))?;

        let items = resp
            .account_assignments()
            .iter()
            .map(|assignment| {
                Ok(AccountAssignment {
                    principal_type: principal_type(OP, assignment.principal_type())?,
                    principal_id: assignment
                        .principal_id()
                        .ok_or_else(|| missing(OP, "PrincipalId"))?
                        .to_string(),
                })
            })
            .collect::<Result<Vec<_>, ProviderError>>()?;

        Ok(Page { items, next_token: resp.next_token().map(str::to_string) })
    }

    async fn describe_user(
        &self,
        identity_store_id: &str,
        user_id: &str,
    ) -> Result<String, ProviderError> {
        let resp = self
            .identity_store
            .describe_user()
            .identity_store_id(identity_store_id)
            .user_id(user_id)
            .send()
            .await
            .map_err(|err| {
                map_sdk_error("identitystore:DescribeUser", err, |e| {
                    e.is_resource_not_found_exception()
                })
            })?;

        Ok(resp.user_name().unwrap_or_default().to_string())
    }

    async fn describe_group(
        &self,
        identity_store_id: &str,
        group_id: &str,
    ) -> Result<String, ProviderError> {
        let resp = self
            .identity_store
            .describe_group()
            .identity_store_id(identity_store_id)
            .group_id(group_id)
            .send()
            .await
            .map_err(|err| {
                map_sdk_error("identitystore:DescribeGroup", err, |e| {
                    e.is_resource_not_found_exception()
                })
            })?;

        Ok(resp.display_name().unwrap_or_default().to_string())
    }
}
