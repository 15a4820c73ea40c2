use tracing::{debug, info, warn};

use crate::{
    error::ProviderError,
    provider::{paginate, IdentityProvider},
};

/// Permission sets of one instance, keyed by display name.
///
/// Iterates in first-insertion order. Inserting a name that is already present replaces
/// its ARN and keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSetCatalog {
    entries: Vec<(String, String)>,
}

impl PermissionSetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `name -> arn`, returning the ARN it replaced.
    pub fn insert(&mut self, name: String, arn: String) -> Option<String> {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, arn)),
            None => {
                self.entries.push((name, arn));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, arn)| arn.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// `(name, arn)` pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, arn)| (name.as_str(), arn.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for PermissionSetCatalog {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (name, arn) in iter {
            catalog.insert(name, arn);
        }
        catalog
    }
}

/// Fetch every permission set of an instance and resolve its name, one describe call
/// per ARN.
pub async fn list_permission_sets<P: IdentityProvider>(
    provider: &P,
    instance_arn: &str,
) -> Result<PermissionSetCatalog, ProviderError> {
    let arns = paginate("sso:ListPermissionSets", |token| {
        provider.list_permission_sets(instance_arn, token)
    })
    .await?;
    debug!("Listed {} permission set ARNs", arns.len());

    let mut catalog = PermissionSetCatalog::new();
    for arn in arns {
        let name = provider.describe_permission_set(instance_arn, &arn).await?;
        if let Some(previous) = catalog.insert(name.clone(), arn) {
            warn!("Permission set name {name:?} is not unique; {previous} is superseded");
        }
    }

    info!("Resolved {} permission sets", catalog.len());
    Ok(catalog)
}
