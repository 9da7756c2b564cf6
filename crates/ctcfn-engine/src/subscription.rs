//! Create, update and delete of one declared subscription.

use ctcfn_commercetools::{
    ApiResult, Destination, SqsDestination, Subscription, SubscriptionDraft, SubscriptionUpdate,
    SubscriptionUpdateAction,
};

use crate::dispatcher::ReconcileContext;
use crate::types::{ResourceSlot, SubscriptionSpec};

fn destination(spec: &SubscriptionSpec) -> Destination {
    Destination::Sqs(SqsDestination {
        queue_url: spec.queue_url.clone(),
        access_key: spec.access_key.clone(),
        access_secret: spec.secret_key.expose().to_string(),
        region: spec.region.clone(),
    })
}

pub fn draft(spec: &SubscriptionSpec, key: &str) -> SubscriptionDraft {
    SubscriptionDraft {
        key: key.to_string(),
        destination: destination(spec),
        changes: spec.changes.clone(),
        messages: spec.messages.clone(),
    }
}

/// Actions that converge `remote` onto `spec`.
///
/// Filters and destination are always replaced; the key only when it drifted.
pub fn update_actions(
    remote: &Subscription,
    spec: &SubscriptionSpec,
    key: &str,
) -> Vec<SubscriptionUpdateAction> {
    let mut actions = vec![
        SubscriptionUpdateAction::SetChanges {
            changes: spec.changes.clone(),
        },
        SubscriptionUpdateAction::SetMessages {
            messages: spec.messages.clone(),
        },
        SubscriptionUpdateAction::ChangeDestination {
            destination: destination(spec),
        },
    ];
    if remote.key.as_deref() != Some(key) {
        actions.push(SubscriptionUpdateAction::SetKey {
            key: key.to_string(),
        });
    }
    actions
}

pub async fn create(ctx: ReconcileContext<'_>, spec: &SubscriptionSpec) -> ApiResult<ResourceSlot> {
    tracing::info!(key = ctx.key, queue_url = %spec.queue_url, "Creating subscription");

    let draft = draft(spec, ctx.key);
    let created = ctx
        .retry
        .run("create the subscription", || ctx.api.create_subscription(&draft))
        .await?;

    tracing::info!(
        id = %created.id,
        version = created.version,
        "Subscription created"
    );
    Ok(ResourceSlot {
        id: created.id,
        version: created.version,
    })
}

pub async fn update(
    ctx: ReconcileContext<'_>,
    prior: &ResourceSlot,
    spec: &SubscriptionSpec,
) -> ApiResult<ResourceSlot> {
    tracing::info!(key = ctx.key, id = %prior.id, "Updating subscription");

    let remote = ctx.api.get_subscription(&prior.id).await?;
    let update = SubscriptionUpdate {
        version: remote.version,
        actions: update_actions(&remote, spec, ctx.key),
    };
    let updated = ctx.api.update_subscription(&prior.id, &update).await?;

    tracing::info!(
        id = %updated.id,
        version = updated.version,
        "Subscription updated"
    );
    Ok(ResourceSlot {
        id: updated.id,
        version: updated.version,
    })
}

/// Best effort: a subscription that cannot be deleted must not block the stack.
pub async fn delete(ctx: ReconcileContext<'_>, slot: &ResourceSlot) {
    tracing::info!(key = ctx.key, id = %slot.id, version = slot.version, "Deleting subscription");

    match ctx.api.delete_subscription(&slot.id, slot.version).await {
        Ok(deleted) => tracing::info!(
            id = %deleted.id,
            version = deleted.version,
            "Subscription deleted"
        ),
        Err(e) => tracing::error!(
            id = %slot.id,
            version = slot.version,
            not_found = e.is_not_found(),
            error = %e,
            "Unable to delete the subscription"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::testing::{Call, FakeApi, subscription_spec};
    use ctcfn_commercetools::MessageSubscription;
    use reqwest::StatusCode;
    use std::time::Duration;

    const KEY: &str = "ServerlessLambda_myFn";

    fn ctx(api: &FakeApi) -> ReconcileContext<'_> {
        ReconcileContext {
            api,
            key: KEY,
            retry: RetryPolicy::new(5, Duration::from_secs(5)),
        }
    }

    fn remote(key: Option<&str>, version: u64) -> Subscription {
        Subscription {
            id: "sub-1".into(),
            version,
            key: key.map(str::to_string),
            changes: vec![],
            messages: vec![],
        }
    }

    #[test]
    fn test_update_actions_without_key_drift() {
        let actions = update_actions(&remote(Some(KEY), 2), &subscription_spec("q"), KEY);

        assert_eq!(actions.len(), 3);
        assert!(matches!(actions[0], SubscriptionUpdateAction::SetChanges { .. }));
        assert!(matches!(actions[1], SubscriptionUpdateAction::SetMessages { .. }));
        assert!(matches!(
            actions[2],
            SubscriptionUpdateAction::ChangeDestination { .. }
        ));
    }

    #[test]
    fn test_update_actions_rename_drifted_or_missing_key() {
        for key in [Some("legacy"), None] {
            let actions = update_actions(&remote(key, 2), &subscription_spec("q"), KEY);
            assert_eq!(
                actions.last(),
                Some(&SubscriptionUpdateAction::SetKey { key: KEY.into() })
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_retries_transient_failures() {
        let api = FakeApi::new().fail_creates(4);

        let slot = create(ctx(&api), &subscription_spec("q")).await.unwrap();

        assert_eq!(slot.version, 1);
        let creates = api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::CreateSubscription(_)))
            .count();
        assert_eq!(creates, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_gives_up_after_five_attempts() {
        let api = FakeApi::new().fail_creates(5);

        let err = create(ctx(&api), &subscription_spec("q")).await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(api.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_update_uses_fetched_version() {
        let api = FakeApi::new().with_subscription(remote(Some("legacy"), 7));
        let prior = ResourceSlot {
            id: "sub-1".into(),
            version: 3,
        };
        let mut spec = subscription_spec("q");
        spec.messages = vec![MessageSubscription {
            resource_type_id: "order".into(),
            types: Some(vec!["OrderCreated".into()]),
        }];

        let slot = update(ctx(&api), &prior, &spec).await.unwrap();

        assert_eq!(slot, ResourceSlot { id: "sub-1".into(), version: 8 });
        let stored = api.subscription("sub-1").unwrap();
        assert_eq!(stored.key.as_deref(), Some(KEY));
        assert_eq!(stored.messages, spec.messages);
        let Call::UpdateSubscription(_, sent) = &api.calls()[1] else {
            panic!("expected update call");
        };
        assert_eq!(sent.version, 7);
        assert_eq!(sent.actions.len(), 4);
    }

    #[tokio::test]
    async fn test_update_fails_when_remote_is_gone() {
        let api = FakeApi::new();
        let prior = ResourceSlot {
            id: "sub-1".into(),
            version: 1,
        };

        let err = update(ctx(&api), &prior, &subscription_spec("q")).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(api.calls(), vec![Call::GetSubscription("sub-1".into())]);
    }

    #[tokio::test]
    async fn test_update_is_not_retried() {
        let api = FakeApi::new()
            .with_subscription(remote(Some(KEY), 1))
            .fail_updates();
        let prior = ResourceSlot {
            id: "sub-1".into(),
            version: 1,
        };

        assert!(update(ctx(&api), &prior, &subscription_spec("q")).await.is_err());
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_swallows_errors() {
        let api = FakeApi::new().fail_deletes(StatusCode::INTERNAL_SERVER_ERROR);
        let slot = ResourceSlot {
            id: "sub-1".into(),
            version: 3,
        };

        delete(ctx(&api), &slot).await;

        assert_eq!(api.calls(), vec![Call::DeleteSubscription("sub-1".into(), 3)]);
    }

    #[tokio::test]
    async fn test_delete_removes_matching_version() {
        let api = FakeApi::new().with_subscription(remote(Some(KEY), 3));
        let slot = ResourceSlot {
            id: "sub-1".into(),
            version: 3,
        };

        delete(ctx(&api), &slot).await;

        assert!(api.subscription("sub-1").is_none());
    }
}
