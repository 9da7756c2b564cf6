//! In-memory commercetools double for reconciler and dispatcher tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ctcfn_commercetools::{
    ApiError, ApiResult, CommercetoolsApi, Extension, ExtensionDraft, ExtensionUpdate,
    ExtensionUpdateAction, Subscription, SubscriptionDraft, SubscriptionUpdate,
    SubscriptionUpdateAction,
};
use reqwest::StatusCode;

use crate::types::{ExtensionSpec, Sensitive, SubscriptionSpec};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateSubscription(SubscriptionDraft),
    GetSubscription(String),
    UpdateSubscription(String, SubscriptionUpdate),
    DeleteSubscription(String, u64),
    CreateExtension(ExtensionDraft),
    GetExtension(String),
    UpdateExtension(String, ExtensionUpdate),
    DeleteExtension(String, u64),
}

#[derive(Default)]
struct State {
    subscriptions: HashMap<String, Subscription>,
    extensions: HashMap<String, Extension>,
    next_id: u32,
    create_failures: u32,
    fail_updates: bool,
    fail_deletes: Option<StatusCode>,
    calls: Vec<Call>,
}

/// Behaves like the platform for the calls the engine makes: ids are
/// assigned on create, versions are checked and bumped on update and delete.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

fn status(code: StatusCode, message: impl Into<String>) -> ApiError {
    ApiError::Status {
        status: code,
        code: None,
        message: message.into(),
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` create calls (of either kind) fail with 503.
    pub fn fail_creates(self, n: u32) -> Self {
        self.state.lock().unwrap().create_failures = n;
        self
    }

    pub fn fail_updates(self) -> Self {
        self.state.lock().unwrap().fail_updates = true;
        self
    }

    pub fn fail_deletes(self, code: StatusCode) -> Self {
        self.state.lock().unwrap().fail_deletes = Some(code);
        self
    }

    pub fn with_subscription(self, sub: Subscription) -> Self {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .insert(sub.id.clone(), sub);
        self
    }

    pub fn with_extension(self, ext: Extension) -> Self {
        self.state
            .lock()
            .unwrap()
            .extensions
            .insert(ext.id.clone(), ext);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn subscription(&self, id: &str) -> Option<Subscription> {
        self.state.lock().unwrap().subscriptions.get(id).cloned()
    }

    pub fn extension(&self, id: &str) -> Option<Extension> {
        self.state.lock().unwrap().extensions.get(id).cloned()
    }

    fn record(&self, call: Call) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

fn take_create_failure(state: &mut State) -> ApiResult<()> {
    if state.create_failures > 0 {
        state.create_failures -= 1;
        return Err(status(StatusCode::SERVICE_UNAVAILABLE, "still propagating"));
    }
    Ok(())
}

#[async_trait]
impl CommercetoolsApi for FakeApi {
    async fn create_subscription(&self, draft: &SubscriptionDraft) -> ApiResult<Subscription> {
        let mut state = self.record(Call::CreateSubscription(draft.clone()));
        take_create_failure(&mut state)?;
        state.next_id += 1;
        let sub = Subscription {
            id: format!("sub-{}", state.next_id),
            version: 1,
            key: Some(draft.key.clone()),
            changes: draft.changes.clone(),
            messages: draft.messages.clone(),
        };
        state.subscriptions.insert(sub.id.clone(), sub.clone());
        Ok(sub)
    }

    async fn get_subscription(&self, id: &str) -> ApiResult<Subscription> {
        let state = self.record(Call::GetSubscription(id.to_string()));
        state
            .subscriptions
            .get(id)
            .cloned()
            .ok_or_else(|| status(StatusCode::NOT_FOUND, format!("{id} not found")))
    }

    async fn update_subscription(
        &self,
        id: &str,
        update: &SubscriptionUpdate,
    ) -> ApiResult<Subscription> {
        let mut state = self.record(Call::UpdateSubscription(id.to_string(), update.clone()));
        if state.fail_updates {
            return Err(status(StatusCode::BAD_REQUEST, "update rejected"));
        }
        let sub = state
            .subscriptions
            .get_mut(id)
            .ok_or_else(|| status(StatusCode::NOT_FOUND, format!("{id} not found")))?;
        if sub.version != update.version {
            return Err(status(StatusCode::CONFLICT, "version mismatch"));
        }
        for action in &update.actions {
            match action {
                SubscriptionUpdateAction::SetChanges { changes } => sub.changes = changes.clone(),
                SubscriptionUpdateAction::SetMessages { messages } => {
                    sub.messages = messages.clone()
                }
                SubscriptionUpdateAction::ChangeDestination { .. } => {}
                SubscriptionUpdateAction::SetKey { key } => sub.key = Some(key.clone()),
            }
        }
        sub.version += 1;
        Ok(sub.clone())
    }

    async fn delete_subscription(&self, id: &str, version: u64) -> ApiResult<Subscription> {
        let mut state = self.record(Call::DeleteSubscription(id.to_string(), version));
        if let Some(code) = state.fail_deletes {
            return Err(status(code, "delete failed"));
        }
        match state.subscriptions.get(id) {
            None => Err(status(StatusCode::NOT_FOUND, format!("{id} not found"))),
            Some(sub) if sub.version != version => {
                Err(status(StatusCode::CONFLICT, "version mismatch"))
            }
            Some(_) => Ok(state.subscriptions.remove(id).unwrap()),
        }
    }

    async fn create_extension(&self, draft: &ExtensionDraft) -> ApiResult<Extension> {
        let mut state = self.record(Call::CreateExtension(draft.clone()));
        take_create_failure(&mut state)?;
        state.next_id += 1;
        let ext = Extension {
            id: format!("ext-{}", state.next_id),
            version: 1,
            key: Some(draft.key.clone()),
            triggers: draft.triggers.clone(),
            timeout_in_ms: draft.timeout_in_ms,
        };
        state.extensions.insert(ext.id.clone(), ext.clone());
        Ok(ext)
    }

    async fn get_extension(&self, id: &str) -> ApiResult<Extension> {
        let state = self.record(Call::GetExtension(id.to_string()));
        state
            .extensions
            .get(id)
            .cloned()
            .ok_or_else(|| status(StatusCode::NOT_FOUND, format!("{id} not found")))
    }

    async fn update_extension(&self, id: &str, update: &ExtensionUpdate) -> ApiResult<Extension> {
        let mut state = self.record(Call::UpdateExtension(id.to_string(), update.clone()));
        if state.fail_updates {
            return Err(status(StatusCode::BAD_REQUEST, "update rejected"));
        }
        let ext = state
            .extensions
            .get_mut(id)
            .ok_or_else(|| status(StatusCode::NOT_FOUND, format!("{id} not found")))?;
        if ext.version != update.version {
            return Err(status(StatusCode::CONFLICT, "version mismatch"));
        }
        for action in &update.actions {
            match action {
                ExtensionUpdateAction::ChangeTriggers { triggers } => {
                    ext.triggers = triggers.clone()
                }
                ExtensionUpdateAction::ChangeDestination { .. } => {}
                ExtensionUpdateAction::SetKey { key } => ext.key = Some(key.clone()),
                ExtensionUpdateAction::SetTimeoutInMs { timeout_in_ms } => {
                    ext.timeout_in_ms = *timeout_in_ms
                }
            }
        }
        ext.version += 1;
        Ok(ext.clone())
    }

    async fn delete_extension(&self, id: &str, version: u64) -> ApiResult<Extension> {
        let mut state = self.record(Call::DeleteExtension(id.to_string(), version));
        if let Some(code) = state.fail_deletes {
            return Err(status(code, "delete failed"));
        }
        match state.extensions.get(id) {
            None => Err(status(StatusCode::NOT_FOUND, format!("{id} not found"))),
            Some(ext) if ext.version != version => {
                Err(status(StatusCode::CONFLICT, "version mismatch"))
            }
            Some(_) => Ok(state.extensions.remove(id).unwrap()),
        }
    }
}

pub fn subscription_spec(queue: &str) -> SubscriptionSpec {
    SubscriptionSpec {
        queue_url: format!("https://sqs.eu-west-1.amazonaws.com/123/{queue}"),
        queue_arn: format!("arn:aws:sqs:eu-west-1:123:{queue}"),
        access_key: "AK".into(),
        secret_key: Sensitive::new("SK"),
        region: "eu-west-1".into(),
        changes: vec![ctcfn_commercetools::ChangeSubscription {
            resource_type_id: "product".into(),
        }],
        messages: vec![],
    }
}

pub fn extension_spec(timeout_in_ms: Option<u32>) -> ExtensionSpec {
    ExtensionSpec {
        lambda_arn: "arn:aws:lambda:eu-west-1:123:function:myFn".into(),
        access_key: "AK".into(),
        secret_key: Sensitive::new("SK"),
        timeout_in_ms,
        triggers: vec![ctcfn_commercetools::ExtensionTrigger {
            resource_type_id: "cart".into(),
            actions: vec![ctcfn_commercetools::ExtensionAction::Create],
            condition: None,
        }],
    }
}
