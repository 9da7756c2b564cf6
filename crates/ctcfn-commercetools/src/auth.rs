//! OAuth2 client-credentials flow against the commercetools auth host.

use std::fmt;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::error::{ApiError, ApiResult};

/// API client credentials scoped to one project.
#[derive(Clone)]
pub struct ClientCredentials {
    pub auth_host: String,
    pub project_key: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("auth_host", &self.auth_host)
            .field("project_key", &self.project_key)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Fetches a project-scoped access token on first use and keeps it.
///
/// A failed fetch is not cached, the next caller tries again. Tokens live for
/// hours, far longer than a single custom resource invocation.
pub struct TokenProvider {
    http: Client,
    credentials: ClientCredentials,
    token: OnceCell<String>,
}

impl TokenProvider {
    pub fn new(http: Client, credentials: ClientCredentials) -> Self {
        Self {
            http,
            credentials,
            token: OnceCell::new(),
        }
    }

    pub async fn access_token(&self) -> ApiResult<&str> {
        let token = self
            .token
            .get_or_try_init(|| self.fetch_token())
            .await?;
        Ok(token.as_str())
    }

    async fn fetch_token(&self) -> ApiResult<String> {
        let creds = &self.credentials;
        let url = format!("{}/oauth/token", creds.auth_host.trim_end_matches('/'));
        let body: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .append_pair("scope", &format!("manage_project:{}", creds.project_key))
            .finish();

        tracing::debug!(auth_host = %creds.auth_host, project_key = %creds.project_key, "Requesting access token");

        let resp = self
            .http
            .post(&url)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| ApiError::Auth(format!("token request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!("HTTP {status}: {text}")));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Auth(format!("invalid token response: {e}")))?;
        Ok(token.access_token)
    }
}
