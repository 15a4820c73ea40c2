use tracing::{debug, info};

use crate::{
    error::ProviderError,
    model::{Account, AccountStatus},
    provider::{paginate, IdentityProvider},
};

/// List every ACTIVE account in the organization, in the order the pages return them.
pub async fn list_active_accounts<P: IdentityProvider>(
    provider: &P,
) -> Result<Vec<Account>, ProviderError> {
    let listed = paginate("organizations:ListAccounts", |token| provider.list_accounts(token)).await?;
    let total = listed.len();

    let active: Vec<Account> = listed
        .into_iter()
        .filter(|account| {
            let keep = account.status == AccountStatus::Active;
            if !keep {
                debug!("Skipping account {} ({}): status {}", account.id, account.name, account.status);
            }
            keep
        })
        .map(|account| Account { id: account.id, name: account.name })
        .collect();

    info!("Found {} active accounts out of {total}", active.len());
    Ok(active)
}
