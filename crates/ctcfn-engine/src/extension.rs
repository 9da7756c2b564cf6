//! Create, update and delete of one declared API extension.

use ctcfn_commercetools::{
    ApiResult, AwsLambdaDestination, Destination, Extension, ExtensionDraft, ExtensionUpdate,
    ExtensionUpdateAction,
};

use crate::dispatcher::ReconcileContext;
use crate::types::{ExtensionSpec, ResourceSlot};

fn destination(spec: &ExtensionSpec) -> Destination {
    Destination::AwsLambda(AwsLambdaDestination {
        arn: spec.lambda_arn.clone(),
        access_key: spec.access_key.clone(),
        access_secret: spec.secret_key.expose().to_string(),
    })
}

pub fn draft(spec: &ExtensionSpec, key: &str) -> ExtensionDraft {
    ExtensionDraft {
        key: key.to_string(),
        destination: destination(spec),
        triggers: spec.triggers.clone(),
        timeout_in_ms: spec.timeout_in_ms,
    }
}

/// Actions that converge `remote` onto `spec`.
///
/// Triggers and destination are always replaced. The key and the timeout
/// only when they differ from what is declared; an undeclared timeout clears
/// the remote one.
pub fn update_actions(
    remote: &Extension,
    spec: &ExtensionSpec,
    key: &str,
) -> Vec<ExtensionUpdateAction> {
    let mut actions = vec![
        ExtensionUpdateAction::ChangeTriggers {
            triggers: spec.triggers.clone(),
        },
        ExtensionUpdateAction::ChangeDestination {
            destination: destination(spec),
        },
    ];
    if remote.key.as_deref() != Some(key) {
        actions.push(ExtensionUpdateAction::SetKey {
            key: key.to_string(),
        });
    }
    if remote.timeout_in_ms != spec.timeout_in_ms {
        actions.push(ExtensionUpdateAction::SetTimeoutInMs {
            timeout_in_ms: spec.timeout_in_ms,
        });
    }
    actions
}

pub async fn create(ctx: ReconcileContext<'_>, spec: &ExtensionSpec) -> ApiResult<ResourceSlot> {
    tracing::info!(key = ctx.key, arn = %spec.lambda_arn, "Creating extension");

    let draft = draft(spec, ctx.key);
    let created = ctx
        .retry
        .run("create the extension", || ctx.api.create_extension(&draft))
        .await?;

    tracing::info!(
        id = %created.id,
        version = created.version,
        "Extension created"
    );
    Ok(ResourceSlot {
        id: created.id,
        version: created.version,
    })
}

pub async fn update(
    ctx: ReconcileContext<'_>,
    prior: &ResourceSlot,
    spec: &ExtensionSpec,
) -> ApiResult<ResourceSlot> {
    tracing::info!(key = ctx.key, id = %prior.id, "Updating extension");

    let remote = ctx.api.get_extension(&prior.id).await?;
    let update = ExtensionUpdate {
        version: remote.version,
        actions: update_actions(&remote, spec, ctx.key),
    };
    let updated = ctx.api.update_extension(&prior.id, &update).await?;

    tracing::info!(
        id = %updated.id,
        version = updated.version,
        "Extension updated"
    );
    Ok(ResourceSlot {
        id: updated.id,
        version: updated.version,
    })
}

/// Best effort, like subscriptions.
pub async fn delete(ctx: ReconcileContext<'_>, slot: &ResourceSlot) {
    tracing::info!(key = ctx.key, id = %slot.id, version = slot.version, "Deleting extension");

    match ctx.api.delete_extension(&slot.id, slot.version).await {
        Ok(deleted) => tracing::info!(
            id = %deleted.id,
            version = deleted.version,
            "Extension deleted"
        ),
        Err(e) => tracing::error!(
            id = %slot.id,
            version = slot.version,
            not_found = e.is_not_found(),
            error = %e,
            "Unable to delete the extension"
        ),
    }
}
