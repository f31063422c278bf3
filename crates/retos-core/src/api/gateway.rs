//! Outbound HTTP configuration shared by every backend call.
//!
//! The gateway reads the token store on each request and attaches the token
//! as a bearer credential when one is present. Nothing is cached between
//! requests, so a logout takes effect on the very next call.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::ApiError;
use crate::auth::TokenStore;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay for rate limiting.
const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

/// Whether a request carries the stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Bearer,
    Anonymous,
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct Gateway {
    client: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    initial_backoff: Duration,
}

impl Gateway {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
            initial_backoff: INITIAL_BACKOFF,
        })
    }

    /// Override the first rate-limit backoff delay; later retries double it.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request, attaching the stored token if there is one.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.anonymous(method, path);
        match self.store.read() {
            Ok(Some(token)) => {
                builder.header(header::AUTHORIZATION, format!("Bearer {}", token.trim()))
            }
            Ok(None) => builder,
            Err(e) => {
                warn!(error = %e, "Failed to read token, sending request without credential");
                builder
            }
        }
    }

    /// Start a request that never carries a credential.
    pub fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json")
    }

    fn build(&self, credential: Credential, method: Method, path: &str) -> RequestBuilder {
        match credential {
            Credential::Bearer => self.request(method, path),
            Credential::Anonymous => self.anonymous(method, path),
        }
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request built fresh on every attempt and decode its JSON body.
    async fn execute<T, F>(&self, path: &str, make_request: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = make_request().send().await?;
            debug!(path, status = %response.status(), "Response received");

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    let text = response.text().await?;
                    return serde_json::from_str(&text).map_err(|e| {
                        ApiError::InvalidResponse(format!("Failed to parse {}: {}", path, e))
                    });
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(path, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        credential: Credential,
    ) -> Result<T, ApiError> {
        self.execute(path, || self.build(credential, Method::GET, path).query(query))
            .await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        credential: Credential,
    ) -> Result<T, ApiError> {
        self.execute(path, || self.build(credential, Method::POST, path).json(body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        credential: Credential,
    ) -> Result<T, ApiError> {
        self.execute(path, || self.build(credential, Method::DELETE, path))
            .await
    }
}
