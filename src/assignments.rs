use tracing::{debug, error, info};

use crate::{
    error::ProviderError,
    model::{Account, AccountAssignment, AssignmentRow, PrincipalType, SsoInstance},
    permission_sets::PermissionSetCatalog,
    provider::{paginate, IdentityProvider},
};

/// Name substituted for a group that no longer exists in the identity store.
pub const DELETED_GROUP: &str = "DELETED-GROUP";
/// Name substituted for a user that no longer exists, under [`ResolutionPolicy::Degrade`].
pub const DELETED_USER: &str = "DELETED-USER";
/// Name substituted when a degradable lookup fails for any other reason.
pub const RESOLUTION_ERROR: &str = "ERROR";

/// What to do when a principal cannot be described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Abort the run with the provider error.
    FailFast,
    /// Substitute a sentinel name and continue.
    Degrade,
}

/// Per principal type failure handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrincipalPolicy {
    pub user: ResolutionPolicy,
    pub group: ResolutionPolicy,
}

impl PrincipalPolicy {
    /// Users fail hard, groups degrade to sentinels.
    pub const DEFAULT: Self =
        Self { user: ResolutionPolicy::FailFast, group: ResolutionPolicy::Degrade };

    pub fn for_type(&self, principal_type: PrincipalType) -> ResolutionPolicy {
        match principal_type {
            PrincipalType::User => self.user,
            PrincipalType::Group => self.group,
        }
    }
}

impl Default for PrincipalPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn deleted_sentinel(principal_type: PrincipalType) -> &'static str {
    match principal_type {
        PrincipalType::User => DELETED_USER,
        PrincipalType::Group => DELETED_GROUP,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CollectOptions {
    /// Stop once this many accounts have been processed.
    pub break_after: Option<usize>,
    pub policy: PrincipalPolicy,
}

/// Resolve the display name of an assigned principal according to `policy`.
pub async fn resolve_principal<P: IdentityProvider>(
    provider: &P,
    identity_store_id: &str,
    assignment: &AccountAssignment,
    policy: &PrincipalPolicy,
) -> Result<String, ProviderError> {
    let principal_type = assignment.principal_type;
    let id = assignment.principal_id.as_str();

    let lookup = match principal_type {
        PrincipalType::User => provider.describe_user(identity_store_id, id).await,
        PrincipalType::Group => provider.describe_group(identity_store_id, id).await,
    };

    match (lookup, policy.for_type(principal_type)) {
        (Ok(name), _) => Ok(name),
        (Err(err), ResolutionPolicy::FailFast) => Err(err),
        (Err(err), ResolutionPolicy::Degrade) if err.is_not_found() => {
            debug!("{principal_type} {id} no longer exists: {err}");
            Ok(deleted_sentinel(principal_type).to_string())
        }
        (Err(err), ResolutionPolicy::Degrade) => {
            error!("An error occurred while describing {principal_type} {id}: {err}");
            Ok(RESOLUTION_ERROR.to_string())
        }
    }
}

/// Walk every (account, permission set) pair and flatten the assignments into report rows.
///
/// Accounts are visited in input order and permission sets in catalog order.
/// `on_account_done(completed, total)` is called after each account. With
/// `options.break_after` set, processing stops right after the account that reaches
/// the limit and later accounts are never queried.
pub async fn collect_assignments<P, F>(
    provider: &P,
    accounts: &[Account],
    instance: &SsoInstance,
    catalog: &PermissionSetCatalog,
    options: &CollectOptions,
    mut on_account_done: F,
) -> Result<Vec<AssignmentRow>, ProviderError>
where
    P: IdentityProvider,
    F: FnMut(usize, usize),
{
    let total = accounts.len();
    let mut rows = Vec::new();

    for (index, account) in accounts.iter().enumerate() {
        let completed = index + 1;

        for (permission_set_name, permission_set_arn) in catalog.iter() {
            let assignments = paginate("sso:ListAccountAssignments", |token| {
                provider.list_account_assignments(
                    &instance.instance_arn,
                    &account.id,
                    permission_set_arn,
                    token,
                )
            })
            .await?;

            if !assignments.is_empty() {
                debug!(
                    "{} ({}): {} assignments for {permission_set_name}",
                    account.name,
                    account.id,
                    assignments.len()
                );
            }

            for assignment in &assignments {
                let principal_name = resolve_principal(
                    provider,
                    &instance.identity_store_id,
                    assignment,
                    &options.policy,
                )
                .await?;

                rows.push(AssignmentRow {
                    account_id: account.id.clone(),
                    account_name: account.name.clone(),
                    permission_set_name: permission_set_name.to_string(),
                    principal_type: assignment.principal_type,
                    principal_name,
                });
            }
        }

        on_account_done(completed, total);

        if options.break_after.is_some_and(|limit| completed >= limit) {
            info!("Stopping after {completed} of {total} accounts");
            break;
        }
    }

    Ok(rows)
}
