use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::api::CommercetoolsApi;
use crate::auth::{ClientCredentials, TokenProvider};
use crate::error::{ApiError, ApiResult};
use crate::types::{
    Extension, ExtensionDraft, ExtensionUpdate, Subscription, SubscriptionDraft,
    SubscriptionUpdate,
};

const SUBSCRIPTIONS: &str = "subscriptions";
const EXTENSIONS: &str = "extensions";

/// Connection settings for one commercetools project.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_host: String,
    pub credentials: ClientCredentials,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

/// reqwest-backed [`CommercetoolsApi`].
pub struct CommercetoolsClient {
    http: Client,
    base_url: String,
    auth: TokenProvider,
}

impl CommercetoolsClient {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ApiError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(http, config)
    }

    /// Create with a custom client.
    pub fn with_client(http: Client, config: ClientConfig) -> ApiResult<Self> {
        for (name, value) in [
            ("apiHost", &config.api_host),
            ("authHost", &config.credentials.auth_host),
        ] {
            url::Url::parse(value)
                .map_err(|e| ApiError::InvalidConfig(format!("{name} '{value}': {e}")))?;
        }
        if config.credentials.project_key.is_empty() {
            return Err(ApiError::InvalidConfig("projectKey must not be empty".into()));
        }

        let base_url = format!(
            "{}/{}",
            config.api_host.trim_end_matches('/'),
            config.credentials.project_key
        );
        let auth = TokenProvider::new(http.clone(), config.credentials);
        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let token = self.auth.access_token().await?;
        let url = self.url(path);

        let mut req = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(token)
            .header("Accept", "application/json");
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            tracing::debug!(
                %method,
                %url,
                status = status.as_u16(),
                body = %text,
                "commercetools request failed"
            );
            return Err(ApiError::from_response_body(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(format!("{method} {url}: {e}")))
    }

    async fn create<D, T>(&self, resource: &str, draft: &D) -> ApiResult<T>
    where
        D: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.send(Method::POST, resource, &[], Some(draft)).await
    }

    async fn get<T: DeserializeOwned>(&self, resource: &str, id: &str) -> ApiResult<T> {
        self.send::<(), T>(Method::GET, &format!("{resource}/{id}"), &[], None)
            .await
    }

    async fn update<U, T>(&self, resource: &str, id: &str, update: &U) -> ApiResult<T>
    where
        U: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.send(Method::POST, &format!("{resource}/{id}"), &[], Some(update))
            .await
    }

    async fn delete<T: DeserializeOwned>(
        &self,
        resource: &str,
        id: &str,
        version: u64,
    ) -> ApiResult<T> {
        self.send::<(), T>(
            Method::DELETE,
            &format!("{resource}/{id}"),
            &[("version", version.to_string())],
            None,
        )
        .await
    }
}

#[async_trait]
impl CommercetoolsApi for CommercetoolsClient {
    async fn create_subscription(&self, draft: &SubscriptionDraft) -> ApiResult<Subscription> {
        self.create(SUBSCRIPTIONS, draft).await
    }

    async fn get_subscription(&self, id: &str) -> ApiResult<Subscription> {
        self.get(SUBSCRIPTIONS, id).await
    }

    async fn update_subscription(
        &self,
        id: &str,
        update: &SubscriptionUpdate,
    ) -> ApiResult<Subscription> {
        self.update(SUBSCRIPTIONS, id, update).await
    }

    async fn delete_subscription(&self, id: &str, version: u64) -> ApiResult<Subscription> {
        self.delete(SUBSCRIPTIONS, id, version).await
    }

    async fn create_extension(&self, draft: &ExtensionDraft) -> ApiResult<Extension> {
        self.create(EXTENSIONS, draft).await
    }

    async fn get_extension(&self, id: &str) -> ApiResult<Extension> {
        self.get(EXTENSIONS, id).await
    }

    async fn update_extension(&self, id: &str, update: &ExtensionUpdate) -> ApiResult<Extension> {
        self.update(EXTENSIONS, id, update).await
    }

    async fn delete_extension(&self, id: &str, version: u64) -> ApiResult<Extension> {
        self.delete(EXTENSIONS, id, version).await
    }
}
