//! HTTP implementation of `CredentialGateway`.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Response};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::models::user::local_part;

use super::types::{LoginRequest, RegisterRequest};
use super::{AuthGrant, CredentialGateway, GatewayError};

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    /// Create a gateway rooted at `base_url` (e.g. `http://localhost:8000/auth`).
    /// Requests that take longer than `timeout` fail as unreachable.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.auth_base_url(), config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Check if response is successful, returning a classified error with body if not.
    async fn check_response(response: Response) -> Result<Response, GatewayError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::from_status(status, &body))
        }
    }

    async fn post_credentials<B: Serialize>(&self, path: &str, body: &B) -> Result<AuthGrant, GatewayError> {
        let url = self.url(path);
        debug!(url = %url, "Sending credential request");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(&e))?;

        let response = Self::check_response(response).await?;

        response
            .json::<AuthGrant>()
            .await
            .map_err(|e| GatewayError::from_transport(&e))
    }
}

impl CredentialGateway for HttpGateway {
    async fn register(&self, email: &str, password: &str) -> Result<AuthGrant, GatewayError> {
        let body = RegisterRequest {
            email,
            password,
            username: local_part(email),
        };
        self.post_credentials("register", &body).await
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<AuthGrant, GatewayError> {
        self.post_credentials("login", &LoginRequest { email, password })
            .await
    }

    async fn invalidate(&self, token: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.url("logout"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(&e))?;

        Self::check_response(response).await?;
        Ok(())
    }
}
