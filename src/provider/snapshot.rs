//! Offline identity data served through the same paging contract as the live APIs.
//!
//! A snapshot is a JSON document:
//!
//! ```json
//! {
//!   "accounts": [{ "id": "111111111111", "name": "Alpha", "status": "ACTIVE" }],
//!   "instances": [{ "instance_arn": "arn:aws:sso:::instance/ssoins-1", "identity_store_id": "d-1", "name": "corp" }],
//!   "permission_sets": [{ "arn": "arn:aws:sso:::permissionSet/ssoins-1/ps-1", "name": "Admin" }],
//!   "assignments": [{ "account_id": "111111111111", "permission_set_arn": "arn:aws:sso:::permissionSet/ssoins-1/ps-1",
//!                     "principal_type": "USER", "principal_id": "u-1" }],
//!   "users": { "u-1": "alice" },
//!   "groups": { "g-1": "Platform" }
//! }
//! ```
//!
//! Principals absent from `users`/`groups` answer `NotFound`, like a deleted identity.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{IdentityProvider, Page};
use crate::{
    error::{ProviderError, ReportError},
    model::{
        AccountAssignment, InstanceDescription, OrganizationAccount, PrincipalType, SsoInstance,
    },
};

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub accounts: Vec<OrganizationAccount>,
    #[serde(default)]
    pub instances: Vec<SnapshotInstance>,
    #[serde(default)]
    pub permission_sets: Vec<SnapshotPermissionSet>,
    #[serde(default)]
    pub assignments: Vec<SnapshotAssignment>,
    #[serde(default)]
    pub users: BTreeMap<String, String>,
    #[serde(default)]
    pub groups: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInstance {
    pub instance_arn: String,
    pub identity_store_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner_account_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPermissionSet {
    pub arn: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotAssignment {
    pub account_id: String,
    pub permission_set_arn: String,
    pub principal_type: PrincipalType,
    pub principal_id: String,
}

/// [`IdentityProvider`] answering from an in-memory [`Snapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotProvider {
    snapshot: Snapshot,
    page_size: usize,
}

impl SnapshotProvider {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot, page_size: DEFAULT_PAGE_SIZE }
    }

    /// Serve listings in pages of at most `page_size` items (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn from_path(path: &Path) -> Result<Self, ReportError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ReportError::Io { path: path.to_path_buf(), source })?;
        let snapshot: Snapshot = serde_json::from_str(&raw).map_err(|err| {
            ReportError::Snapshot { path: path.to_path_buf(), message: err.to_string() }
        })?;
        debug!(
            "Loaded snapshot {}: {} accounts, {} permission sets, {} assignments",
            path.display(),
            snapshot.accounts.len(),
            snapshot.permission_sets.len(),
            snapshot.assignments.len()
        );
        Ok(Self::new(snapshot))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn page<T: Clone>(
        &self,
        operation: &'static str,
        items: &[T],
        next_token: Option<String>,
    ) -> Result<Page<T>, ProviderError> {
        let start = match next_token {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| {
                ProviderError::api(operation, format!("invalid pagination token {token:?}"))
            })?,
        };
        let end = (start + self.page_size).min(items.len());
        let page = items.get(start..end).unwrap_or_default().to_vec();
        let next_token = (end < items.len()).then(|| end.to_string());
        Ok(Page { items: page, next_token })
    }

    fn instance(&self, operation: &'static str, arn: &str) -> Result<&SnapshotInstance, ProviderError> {
        self.snapshot
            .instances
            .iter()
            .find(|i| i.instance_arn == arn)
            .ok_or_else(|| ProviderError::not_found(operation, format!("instance {arn}")))
    }
}

impl IdentityProvider for SnapshotProvider {
    async fn list_accounts(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<OrganizationAccount>, ProviderError> {
        self.page("organizations:ListAccounts", &self.snapshot.accounts, next_token)
    }

    async fn list_instances(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<SsoInstance>, ProviderError> {
        let instances: Vec<SsoInstance> = self
            .snapshot
            .instances
            .iter()
            .map(|i| SsoInstance {
                instance_arn: i.instance_arn.clone(),
                identity_store_id: i.identity_store_id.clone(),
            })
            .collect();
        self.page("sso:ListInstances", &instances, next_token)
    }

    async fn describe_instance(
        &self,
        instance_arn: &str,
    ) -> Result<InstanceDescription, ProviderError> {
        let instance = self.instance("sso:DescribeInstance", instance_arn)?;
        Ok(InstanceDescription {
            name: instance.name.clone(),
            identity_store_id: Some(instance.identity_store_id.clone()),
            owner_account_id: instance.owner_account_id.clone(),
        })
    }

    async fn list_permission_sets(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<String>, ProviderError> {
        const OP: &str = "sso:ListPermissionSets";
        self.instance(OP, instance_arn)?;
        let arns: Vec<String> =
            self.snapshot.permission_sets.iter().map(|ps| ps.arn.clone()).collect();
        self.page(OP, &arns, next_token)
    }

    async fn describe_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> Result<String, ProviderError> {
        const OP: &str = "sso:DescribePermissionSet";
        self.instance(OP, instance_arn)?;
        self.snapshot
            .permission_sets
            .iter()
            .find(|ps| ps.arn == permission_set_arn)
            .map(|ps| ps.name.clone())
            .ok_or_else(|| {
                ProviderError::not_found(OP, format!("permission set {permission_set_arn}"))
            })
    }

    async fn list_account_assignments(
        &self,
        instance_arn: &str,
        account_id: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<AccountAssignment>, ProviderError> {
        const OP: &str = "sso:ListAccountAssignments";
        self.instance(OP, instance_arn)?;
        let matching: Vec<AccountAssignment> = self
            .snapshot
            .assignments
            .iter()
            .filter(|a| a.account_id == account_id && a.permission_set_arn == permission_set_arn)
            .map(|a| AccountAssignment {
                principal_type: a.principal_type,
                principal_id: a.principal_id.clone(),
            })
            .collect();
        self.page(OP, &matching, next_token)
    }

    async fn describe_user(
        &self,
        _identity_store_id: &str,
        user_id: &str,
    ) -> Result<String, ProviderError> {
        self.snapshot.users.get(user_id).cloned().ok_or_else(|| {
            ProviderError::not_found("identitystore:DescribeUser", format!("user {user_id}"))
        })
    }

    async fn describe_group(
        &self,
        _identity_store_id: &str,
        group_id: &str,
    ) -> Result<String, ProviderError> {
        self.snapshot.groups.get(group_id).cloned().ok_or_else(|| {
            ProviderError::not_found("identitystore:DescribeGroup", format!("group {group_id}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::AccountStatus, provider::paginate};

    fn accounts(n: usize) -> Snapshot {
        Snapshot {
            accounts: (0..n)
                .map(|i| OrganizationAccount {
                    id: format!("{i:012}"),
                    name: format!("acct-{i}"),
                    status: AccountStatus::Active,
                })
                .collect(),
            ..Snapshot::default()
        }
    }

    #[tokio::test]
    async fn pages_are_bounded_and_chained() {
        let provider = SnapshotProvider::new(accounts(5)).with_page_size(2);

        let first = provider.list_accounts(None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_token.as_deref(), Some("2"));

        let all = paginate("list", |t| provider.list_accounts(t)).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[4].name, "acct-4");
    }

    #[tokio::test]
    async fn empty_listing_is_a_single_last_page() {
        let provider = SnapshotProvider::new(Snapshot::default());
        let page = provider.list_accounts(None).await.unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let provider = SnapshotProvider::new(accounts(1));
        let err = provider.list_accounts(Some("nope".into())).await.unwrap_err();
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn unknown_principals_are_not_found() {
        let provider = SnapshotProvider::new(Snapshot::default());
        assert!(provider.describe_group("d-1", "g-x").await.unwrap_err().is_not_found());
        assert!(provider.describe_user("d-1", "u-x").await.unwrap_err().is_not_found());
    }

    #[test]
    fn parses_documented_format() {
        let raw = r#"{
            "accounts": [{ "id": "1", "name": "Alpha", "status": "ACTIVE" },
                         { "id": "2", "name": "Gone", "status": "PENDING_CLOSURE" }],
            "instances": [{ "instance_arn": "arn:i", "identity_store_id": "d-1" }],
            "permission_sets": [{ "arn": "arn:ps", "name": "Admin" }],
            "assignments": [{ "account_id": "1", "permission_set_arn": "arn:ps",
                              "principal_type": "GROUP", "principal_id": "g-1" }],
            "groups": { "g-1": "Platform" }
        }"#;
        let snapshot: Snapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.accounts[1].status, AccountStatus::PendingClosure);
        assert_eq!(snapshot.assignments[0].principal_type, PrincipalType::Group);
        assert!(snapshot.users.is_empty());
    }
}
