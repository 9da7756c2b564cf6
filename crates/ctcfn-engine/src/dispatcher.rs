//! Fans a lifecycle request out to the per-resource reconcilers and folds
//! their results into the next physical resource id.

use std::collections::BTreeMap;

use ctcfn_commercetools::{ApiResult, CommercetoolsApi};
use futures_util::future::join_all;

use crate::error::{EngineError, EngineResult};
use crate::retry::RetryPolicy;
use crate::types::{
    DeclaredResource, DesiredProperties, LifecycleOperation, LifecycleRequest,
    PhysicalResourceId, ReconcileOperation, ResourceKind, ResourceSlot, resource_key,
};
use crate::{extension, subscription};

/// Everything a reconciler needs, passed by value.
#[derive(Clone, Copy)]
pub struct ReconcileContext<'a> {
    pub api: &'a dyn CommercetoolsApi,
    pub key: &'a str,
    pub retry: RetryPolicy,
}

/// Result of a successful run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    /// `None` when the caller's prior id should be echoed back (Delete).
    pub physical_resource_id: Option<PhysicalResourceId>,
    /// Named outputs exposed through `Fn::GetAtt`.
    pub data: BTreeMap<String, String>,
}

/// Reconcile every declared resource of `request` against commercetools.
///
/// Per-resource reconciliations run concurrently. All of them are awaited
/// before the outcome is decided; the first failure in declaration order
/// fails the run. Remote changes made by the others are kept.
pub async fn dispatch(
    api: &dyn CommercetoolsApi,
    request: &LifecycleRequest,
    retry: RetryPolicy,
) -> EngineResult<ReconcileOutcome> {
    let key = resource_key(&request.properties.fn_name);
    let ctx = ReconcileContext {
        api,
        key: &key,
        retry,
    };

    tracing::info!(
        request_type = ?request.operation.request_type(),
        key = %key,
        subscriptions = request.properties.subscriptions.len(),
        extensions = request.properties.extensions.len(),
        "Reconciling commercetools resources"
    );

    match &request.operation {
        LifecycleOperation::Create => converge(ctx, &request.properties, None).await,
        LifecycleOperation::Update { prior } => {
            converge(ctx, &request.properties, Some(prior)).await
        }
        LifecycleOperation::Delete { prior } => {
            teardown(ctx, prior).await;
            Ok(ReconcileOutcome::default())
        }
    }
}

async fn converge(
    ctx: ReconcileContext<'_>,
    properties: &DesiredProperties,
    prior: Option<&PhysicalResourceId>,
) -> EngineResult<ReconcileOutcome> {
    let declared: Vec<_> = properties.declared().collect();

    let results = join_all(declared.iter().map(|&(index, resource)| {
        let prior_slot = prior.and_then(|p| p.slot(resource.kind(), index));
        reconcile_one(ctx, index, resource, prior_slot)
    }))
    .await;

    let mut next = PhysicalResourceId::default();
    for ((_, resource), result) in declared.iter().zip(results) {
        let slot = result?;
        match resource.kind() {
            ResourceKind::Subscription => next.subscriptions.push(slot),
            ResourceKind::Extension => next.extensions.push(slot),
        }
    }

    Ok(ReconcileOutcome {
        physical_resource_id: Some(next),
        data: queue_arn_outputs(properties),
    })
}

async fn reconcile_one(
    ctx: ReconcileContext<'_>,
    index: usize,
    resource: DeclaredResource<'_>,
    prior: Option<&ResourceSlot>,
) -> EngineResult<ResourceSlot> {
    let operation = match prior {
        Some(_) => ReconcileOperation::Update,
        None => ReconcileOperation::Create,
    };

    let result: ApiResult<ResourceSlot> = match (resource, prior) {
        (DeclaredResource::Subscription(spec), None) => subscription::create(ctx, spec).await,
        (DeclaredResource::Subscription(spec), Some(slot)) => {
            subscription::update(ctx, slot, spec).await
        }
        (DeclaredResource::Extension(spec), None) => extension::create(ctx, spec).await,
        (DeclaredResource::Extension(spec), Some(slot)) => {
            extension::update(ctx, slot, spec).await
        }
    };

    result.map_err(|source| EngineError::Reconcile {
        kind: resource.kind(),
        operation,
        index,
        source,
    })
}

/// Delete every resource recorded in `prior`. Never fails.
async fn teardown(ctx: ReconcileContext<'_>, prior: &PhysicalResourceId) {
    let subs = prior
        .subscriptions
        .iter()
        .map(|slot| (ResourceKind::Subscription, slot));
    let exts = prior
        .extensions
        .iter()
        .map(|slot| (ResourceKind::Extension, slot));

    join_all(subs.chain(exts).map(|(kind, slot)| async move {
        match kind {
            ResourceKind::Subscription => subscription::delete(ctx, slot).await,
            ResourceKind::Extension => extension::delete(ctx, slot).await,
        }
    }))
    .await;
}

fn queue_arn_outputs(properties: &DesiredProperties) -> BTreeMap<String, String> {
    properties
        .subscriptions
        .iter()
        .enumerate()
        .map(|(i, spec)| (format!("SubscriptionQueueArn{}", i + 1), spec.queue_arn.clone()))
        .collect()
}
