use async_trait::async_trait;

use crate::error::ApiResult;
use crate::types::{
    Extension, ExtensionDraft, ExtensionUpdate, Subscription, SubscriptionDraft,
    SubscriptionUpdate,
};

/// Resource-scoped CRUD for subscriptions and API extensions.
///
/// Updates and deletes carry the version last observed; the platform rejects
/// them when the resource moved on in the meantime.
#[async_trait]
pub trait CommercetoolsApi: Send + Sync {
    async fn create_subscription(&self, draft: &SubscriptionDraft) -> ApiResult<Subscription>;

    async fn get_subscription(&self, id: &str) -> ApiResult<Subscription>;

    async fn update_subscription(
        &self,
        id: &str,
        update: &SubscriptionUpdate,
    ) -> ApiResult<Subscription>;

    async fn delete_subscription(&self, id: &str, version: u64) -> ApiResult<Subscription>;

    async fn create_extension(&self, draft: &ExtensionDraft) -> ApiResult<Extension>;

    async fn get_extension(&self, id: &str) -> ApiResult<Extension>;

    async fn update_extension(&self, id: &str, update: &ExtensionUpdate) -> ApiResult<Extension>;

    async fn delete_extension(&self, id: &str, version: u64) -> ApiResult<Extension>;
}
