//! Session state: credentials plus the current bearer token.

use crate::config::Credentials;
use crate::error::{DslError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Body returned by `POST /api/auth.json`.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: Option<String>,
}

/// An authenticated (or not yet authenticated) session with one endpoint.
///
/// Clones share the same token, so a re-login through any clone is seen by all.
#[derive(Debug, Clone)]
pub struct Session {
    credentials: Credentials,
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Base URL of the instance.
    pub fn endpoint(&self) -> &str {
        &self.credentials.endpoint
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Whether a token is currently held.
    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Current token, if logged in.
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Value for the `Authorization` header, if logged in.
    pub(crate) async fn authorization(&self) -> Option<String> {
        self.token
            .read()
            .await
            .as_ref()
            .map(|token| format!("JWT {}", token))
    }

    /// Exchange the credentials for a fresh token, replacing any previous one.
    pub(crate) async fn login(&self, http: &Client, user_agent: &str) -> Result<()> {
        let url = format!("{}/api/auth.json", self.credentials.endpoint);
        let body = serde_json::json!({
            "username": self.credentials.username,
            "password": self.credentials.password,
        });

        let response = http
            .post(&url)
            .header("User-Agent", user_agent)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status, endpoint = %self.endpoint(), "login rejected");
            return Err(DslError::Authentication { status, message });
        }

        let text = response.text().await?;
        let parsed: AuthResponse =
            serde_json::from_str(&text).map_err(|e| DslError::Authentication {
                status,
                message: format!("invalid auth response: {}", e),
            })?;
        let token = parsed.token.ok_or_else(|| DslError::Authentication {
            status,
            message: "auth response did not contain a token".to_string(),
        })?;

        *self.token.write().await = Some(token);
        tracing::info!(user = %self.username(), endpoint = %self.endpoint(), "logged in");
        Ok(())
    }

    /// Forget the current token.
    pub async fn logout(&self) {
        *self.token.write().await = None;
    }
}
