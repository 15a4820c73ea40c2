use std::future::Future;

use tracing::trace;

use crate::{
    error::ProviderError,
    model::{AccountAssignment, InstanceDescription, OrganizationAccount, SsoInstance},
};

pub mod aws;
pub mod snapshot;

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next_token: None }
    }
}

/// The read-only slice of the Organizations, IAM Identity Center and Identity Store
/// APIs the report is built from.
///
/// Listing operations return a single page; callers drive pagination by passing back
/// `next_token` until it is `None` (see [`paginate`]). A single provider value is
/// shared by every stage of a run.
#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    async fn list_accounts(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<OrganizationAccount>, ProviderError>;

    async fn list_instances(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<SsoInstance>, ProviderError>;

    async fn describe_instance(
        &self,
        instance_arn: &str,
    ) -> Result<InstanceDescription, ProviderError>;

    async fn list_permission_sets(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<String>, ProviderError>;

    /// Returns the display name of a permission set.
    async fn describe_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> Result<String, ProviderError>;

    async fn list_account_assignments(
        &self,
        instance_arn: &str,
        account_id: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<AccountAssignment>, ProviderError>;

    /// Returns the user name of an identity store user.
    async fn describe_user(
        &self,
        identity_store_id: &str,
        user_id: &str,
    ) -> Result<String, ProviderError>;

    /// Returns the display name of an identity store group.
    async fn describe_group(
        &self,
        identity_store_id: &str,
        group_id: &str,
    ) -> Result<String, ProviderError>;
}

/// Drive a paginated listing to exhaustion, concatenating pages in order.
pub async fn paginate<T, F, Fut>(operation: &'static str, mut fetch: F) -> Result<Vec<T>, ProviderError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
{
    let mut items = Vec::new();
    let mut next_token = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(next_token.take()).await?;
        pages += 1;
        trace!("{operation}: page {pages} returned {} items", page.items.len());
        items.extend(page.items);

        match page.next_token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => break,
        }
    }

    Ok(items)
}
