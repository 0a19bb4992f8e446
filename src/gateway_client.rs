use crate::credentials::{ApiService, Credentials};
use crate::errors::ApiError;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Shared transport for the BDN services.
///
/// Holds one reqwest client, the service base URL and its credentials, and
/// attaches the `x-bdn-*` headers to every request. Responses are returned
/// as raw body text; status codes are mapped onto `ApiError`.
#[derive(Clone)]
pub struct BdnGatewayClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    service: ApiService,
}

impl BdnGatewayClient {
    /// Creates a new `BdnGatewayClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the service, without trailing slash.
    /// * `credentials` - Static API credentials for the service.
    /// * `service` - Which service this transport talks to.
    /// * `timeout` - Per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        service: ApiService,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ApiError::RemoteFailure(format!(
                    "Failed to create {} client: {}",
                    service.name(),
                    e
                ))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            service,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fails with `Unauthorized` if a credential the service needs is blank.
    ///
    /// Every operation calls this before building its request.
    pub fn authorize(&self) -> Result<(), ApiError> {
        self.credentials.authorize(self.service)
    }

    /// Sends a GET request and returns the body text.
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, ApiError> {
        self.request::<()>(Method::GET, path, query, None).await
    }

    /// Sends a GET request and parses the body as JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let body = self.get(path, query).await?;
        parse_json(&body)
    }

    /// Sends a request with an optional JSON body and returns the body text.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method.
    /// * `path` - Path appended to the base URL, starting with `/`.
    /// * `query` - Query parameters, URL-encoded by reqwest.
    /// * `body` - Optional payload serialized as JSON.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<String, ApiError> {
        self.authorize()?;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {} {}", self.service.name(), method, url);

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header("cache-control", "no-cache")
            .header("x-bdn-key", self.credentials.key())
            .header("x-bdn-account", self.credentials.account());

        if let Some(domain) = self.credentials.domain() {
            builder = builder.header("x-bdn-domain", domain);
        }
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(payload) = body {
            builder = builder.json(payload);
        }

        let response = builder.send().await.map_err(|e| {
            ApiError::RemoteFailure(format!("{} request failed: {}", self.service.name(), e))
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            ApiError::RemoteFailure(format!(
                "Failed to read {} response: {}",
                self.service.name(),
                e
            ))
        })?;

        check_status(self.service, status, text)
    }
}

/// Maps a response status onto the crate's error kinds.
fn check_status(service: ApiService, status: StatusCode, text: String) -> Result<String, ApiError> {
    if status == StatusCode::UNAUTHORIZED {
        tracing::warn!("{} rejected the API credentials", service.name());
        return Err(ApiError::Unauthorized(format!(
            "Wrong API credentials for {}",
            service.name()
        )));
    }

    if !status.is_success() {
        tracing::error!("{} returned error {}: {}", service.name(), status, text);
        return Err(ApiError::RemoteFailure(format!(
            "{} returned {}: {}",
            service.name(),
            status,
            text
        )));
    }

    Ok(text)
}

/// Parses a response body, reporting unparseable payloads as remote failures.
pub fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body)
        .map_err(|e| ApiError::RemoteFailure(format!("Failed to parse response: {}: {}", e, body)))
}
