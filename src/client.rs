//! The Dimensions DSL API client.

use crate::config::Credentials;
use crate::error::{DslError, Result};
use crate::result::DslResult;
use crate::retry::{Action, Disposition, RetryPolicy};
use crate::session::Session;
use reqwest::Client;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = concat!("dimensions-client/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Async client for the Dimensions DSL API.
///
/// Queries are sent one at a time; clones share the same session token.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> dimensions_client::error::Result<()> {
/// let dsl = dimensions_client::DslClient::from_profile("live").await?;
/// let res = dsl.query(r#"search grants for "malaria" return researchers"#).await?;
/// for (key, count) in res.keys_and_count() {
///     println!("{}: {}", key, count);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DslClient {
    pub(crate) http: Client,
    pub(crate) session: Session,
    pub(crate) retry: RetryPolicy,
    pub(crate) user_agent: String,
}

impl DslClient {
    /// Create a client for the given credentials. No request is sent until
    /// [`login`](Self::login) or the first query.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Ok(Self {
            http: build_http(DEFAULT_TIMEOUT)?,
            session: Session::new(credentials),
            retry: RetryPolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// Create a client and log in right away.
    pub async fn connect(credentials: Credentials) -> Result<Self> {
        let client = Self::new(credentials)?;
        client.login().await?;
        Ok(client)
    }

    /// Connect using a named instance from `~/.dimensions/dsl.ini`.
    pub async fn from_profile(instance: &str) -> Result<Self> {
        Self::connect(Credentials::from_profile(instance)?).await
    }

    /// Connect using `DIMENSIONS_*` environment variables.
    pub async fn from_env() -> Result<Self> {
        Self::connect(Credentials::from_env()?).await
    }

    /// Override the wait between retries (default 30 seconds).
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.retry.backoff = backoff;
        self
    }

    /// Retries allowed for unexpected HTTP statuses (default 0).
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retry.retries = retries;
        self
    }

    /// Override the per-request HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = build_http(timeout)?;
        Ok(self)
    }

    /// Override the User-Agent header.
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn endpoint(&self) -> &str {
        self.session.endpoint()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Log in (or log in again), replacing the current token.
    pub async fn login(&self) -> Result<()> {
        self.session.login(&self.http, &self.user_agent).await
    }

    /// Run a DSL query using the client's retry policy.
    ///
    /// Responses with status 200, 400 or 500 are returned as a [`DslResult`];
    /// check [`DslResult::is_error`] for DSL errors. Rate limiting is waited
    /// out and an expired token triggers one re-login.
    pub async fn query(&self, query: &str) -> Result<DslResult> {
        self.execute(query, self.retry).await
    }

    /// Run a DSL query, retrying unexpected statuses up to `retries` times.
    pub async fn query_with_retry(&self, query: &str, retries: u32) -> Result<DslResult> {
        let policy = RetryPolicy {
            retries,
            ..self.retry
        };
        self.execute(query, policy).await
    }

    async fn execute(&self, query: &str, policy: RetryPolicy) -> Result<DslResult> {
        let mut state = policy.start();
        loop {
            let Some(authorization) = self.session.authorization().await else {
                self.login().await?;
                continue;
            };
            let response = self.send_query(query, &authorization).await?;
            let status = response.status().as_u16();

            match state.next(status) {
                Action::Deliver => {
                    let body = response.text().await?;
                    tracing::debug!(status, bytes = body.len(), "query answered");
                    return DslResult::from_body(status, &body);
                }
                Action::Wait(backoff) => {
                    if Disposition::of(status) == Disposition::RateLimited {
                        tracing::warn!(?backoff, "too many requests, waiting before retrying");
                    } else {
                        tracing::warn!(
                            status,
                            ?backoff,
                            remaining = state.remaining(),
                            "unexpected status, retrying"
                        );
                    }
                    drop(response);
                    tokio::time::sleep(backoff).await;
                }
                Action::Relogin => {
                    tracing::warn!("login token expired, logging in again");
                    drop(response);
                    self.login()
                        .await
                        .map_err(|e| DslError::Reauthentication(Box::new(e)))?;
                }
                Action::Fail => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(DslError::Status { status, body });
                }
            }
        }
    }

    async fn send_query(&self, query: &str, authorization: &str) -> Result<reqwest::Response> {
        let url = format!("{}/api/dsl.json", self.session.endpoint());
        tracing::debug!(%url, query, "sending DSL query");
        let response = self
            .http
            .post(&url)
            .header("Authorization", authorization)
            .header("User-Agent", &self.user_agent)
            .body(query.to_string())
            .send()
            .await?;
        Ok(response)
    }
}

fn build_http(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}
