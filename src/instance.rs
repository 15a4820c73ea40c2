use tracing::{info, warn};

use crate::{
    error::{ProviderError, ReportError},
    model::SsoInstance,
    provider::{paginate, IdentityProvider},
};

/// The instance a run reports on, with its resolved display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedInstance {
    pub instance: SsoInstance,
    pub display_name: String,
}

pub async fn list_instances<P: IdentityProvider>(
    provider: &P,
) -> Result<Vec<SsoInstance>, ProviderError> {
    paginate("sso:ListInstances", |token| provider.list_instances(token)).await
}

/// Pick the instance to report on.
///
/// With `requested_arn` the matching instance is returned. Without it the caller must
/// see exactly one instance; several instances are rejected rather than picking one
/// arbitrarily.
pub fn select_instance(
    instances: Vec<SsoInstance>,
    requested_arn: Option<&str>,
) -> Result<SsoInstance, ReportError> {
    if instances.is_empty() {
        return Err(ReportError::NoInstances);
    }

    if let Some(arn) = requested_arn {
        return instances
            .into_iter()
            .find(|instance| instance.instance_arn == arn)
            .ok_or_else(|| ReportError::UnknownInstance(arn.to_string()));
    }

    if instances.len() > 1 {
        return Err(ReportError::AmbiguousInstance {
            arns: instances.into_iter().map(|i| i.instance_arn).collect(),
        });
    }

    instances.into_iter().next().ok_or(ReportError::NoInstances)
}

/// Human readable name of an instance: its `Name` if set, else its identity store id.
///
/// A failing describe call does not abort the run; the identity store id from the
/// listing is used instead.
pub async fn instance_display_name<P: IdentityProvider>(
    provider: &P,
    instance: &SsoInstance,
) -> String {
    match provider.describe_instance(&instance.instance_arn).await {
        Ok(description) => description
            .name
            .filter(|name| !name.is_empty())
            .or(description.identity_store_id)
            .unwrap_or_else(|| instance.identity_store_id.clone()),
        Err(err) => {
            warn!(
                "Could not describe instance {}: {err}; using identity store id as its name",
                instance.instance_arn
            );
            instance.identity_store_id.clone()
        }
    }
}

pub async fn locate_instance<P: IdentityProvider>(
    provider: &P,
    requested_arn: Option<&str>,
) -> Result<LocatedInstance, ReportError> {
    let instances = list_instances(provider).await?;
    let instance = select_instance(instances, requested_arn)?;
    let display_name = instance_display_name(provider, &instance).await;
    info!("Using IAM Identity Center instance {} ({display_name})", instance.instance_arn);
    Ok(LocatedInstance { instance, display_name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::snapshot::{Snapshot, SnapshotInstance, SnapshotProvider};

    fn instance(arn: &str, store: &str) -> SsoInstance {
        SsoInstance { instance_arn: arn.into(), identity_store_id: store.into() }
    }

    fn snapshot_instance(arn: &str, store: &str, name: Option<&str>) -> SnapshotInstance {
        SnapshotInstance {
            instance_arn: arn.into(),
            identity_store_id: store.into(),
            name: name.map(str::to_string),
            owner_account_id: None,
        }
    }

    #[test]
    fn single_instance_is_selected() {
        let selected = select_instance(vec![instance("arn:a", "d-a")], None).unwrap();
        assert_eq!(selected.identity_store_id, "d-a");
    }

    #[test]
    fn no_instances_is_an_error() {
        assert!(matches!(select_instance(Vec::new(), None), Err(ReportError::NoInstances)));
    }

    #[test]
    fn multiple_instances_require_a_choice() {
        let instances = vec![instance("arn:a", "d-a"), instance("arn:b", "d-b")];

        match select_instance(instances.clone(), None) {
            Err(ReportError::AmbiguousInstance { arns }) => assert_eq!(arns, ["arn:a", "arn:b"]),
            other => panic!("unexpected {other:?}"),
        }

        let chosen = select_instance(instances.clone(), Some("arn:b")).unwrap();
        assert_eq!(chosen.identity_store_id, "d-b");

        assert!(matches!(
            select_instance(instances, Some("arn:c")),
            Err(ReportError::UnknownInstance(arn)) if arn == "arn:c"
        ));
    }

    #[tokio::test]
    async fn display_name_prefers_name_then_store_id() {
        let provider = SnapshotProvider::new(Snapshot {
            instances: vec![
                snapshot_instance("arn:named", "d-1", Some("corp-sso")),
                snapshot_instance("arn:unnamed", "d-2", None),
            ],
            ..Snapshot::default()
        });

        let named = instance_display_name(&provider, &instance("arn:named", "d-1")).await;
        assert_eq!(named, "corp-sso");

        let unnamed = instance_display_name(&provider, &instance("arn:unnamed", "d-2")).await;
        assert_eq!(unnamed, "d-2");
    }

    #[tokio::test]
    async fn describe_failure_falls_back_to_store_id() {
        let provider = SnapshotProvider::new(Snapshot::default());
        let name = instance_display_name(&provider, &instance("arn:missing", "d-9")).await;
        assert_eq!(name, "d-9");
    }

    #[tokio::test]
    async fn locate_resolves_instance_and_name() {
        let provider = SnapshotProvider::new(Snapshot {
            instances: vec![snapshot_instance("arn:only", "d-1", Some("corp"))],
            ..Snapshot::default()
        });
        let located = locate_instance(&provider, None).await.unwrap();
        assert_eq!(located.instance.instance_arn, "arn:only");
        assert_eq!(located.display_name, "corp");
    }
}
