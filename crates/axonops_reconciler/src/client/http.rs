use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use super::Api;
use crate::util::errors::{Error, Result, StdError};

pub const SAAS_DASH_URL: &str = "https://dash.axonops.cloud";
pub const LOGIN_PATH: &str = "/api/login";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Static API token, sent as is.
    ApiToken(String),
    /// Exchanged for a session token on first use.
    Login { username: String, password: String },
    Anonymous,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ApiToken(_) => f.write_str("ApiToken(***)"),
            Credential::Login { username, .. } => write!(f, "Login({username})"),
            Credential::Anonymous => f.write_str("Anonymous"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub org: String,
    pub base_url: Option<String>,
    pub credential: Credential,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(org: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            base_url: None,
            credential: Credential::Anonymous,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Self-hosted URL without its trailing slash, or the SaaS URL for the org.
    pub fn dash_url(&self) -> String {
        match &self.base_url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => format!("{}/{}", SAAS_DASH_URL, self.org),
        }
    }
}

pub struct AxonOpsClient {
    dash_url: String,
    credential: Credential,
    client: reqwest::Client,
    // Resolved once per process, never refreshed.
    session: OnceCell<Option<String>>,
}

impl AxonOpsClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                Error::StdError(StdError::HttpError(format!("Failed to build HTTP client: {}", e)))
            })?;

        Ok(Self {
            dash_url: config.dash_url(),
            credential: config.credential,
            client,
            session: OnceCell::new(),
        })
    }

    pub fn dash_url(&self) -> &str {
        &self.dash_url
    }

    /// Issues a request that succeeds only for the given status codes.
    pub async fn request_with_status(
        &self,
        path: &str,
        method: Method,
        body: Option<&Value>,
        allowed: &[StatusCode],
    ) -> Result<Value> {
        let token = self.session_token().await?;
        self.send(path, method, body, token.as_deref(), allowed).await
    }

    async fn session_token(&self) -> Result<Option<String>> {
        let token = self
            .session
            .get_or_try_init(|| async {
                match &self.credential {
                    Credential::ApiToken(token) => Ok(Some(token.clone())),
                    Credential::Login { username, password } => {
                        self.login(username, password).await.map(Some)
                    }
                    Credential::Anonymous => Ok(None),
                }
            })
            .await?;
        Ok(token.clone())
    }

    async fn login(&self, username: &str, password: &str) -> Result<String> {
        info!("Logging in to {} as {}", self.dash_url, username);
        let body = json!({ "username": username, "password": password });
        let response = self
            .send(LOGIN_PATH, Method::POST, Some(&body), None, &[StatusCode::OK])
            .await?;

        response
            .get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                error!("Login response did not contain a token");
                Error::StdError(StdError::RemoteStateError(
                    "login response did not contain a token".to_string(),
                ))
            })
    }

    async fn send(
        &self,
        path: &str,
        method: Method,
        body: Option<&Value>,
        token: Option<&str>,
        allowed: &[StatusCode],
    ) -> Result<Value> {
        let url = format!("{}{}", self.dash_url, path);
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, &url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            error!("Failed to connect to {}: {}", url, e);
            Error::StdError(StdError::HttpError(format!("Request to {} failed: {}", url, e)))
        })?;

        let status = response.status();
        if !allowed.contains(&status) {
            error!("{} returned error status: {}", url, status);
            return Err(Error::StdError(StdError::TransportError {
                url,
                status: status.as_u16(),
            }));
        }

        let bytes = response.bytes().await.map_err(|e| {
            Error::StdError(StdError::HttpError(format!("Failed to read response from {}: {}", url, e)))
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            error!("Failed to parse JSON response from {}: {}", url, e);
            Error::StdError(StdError::JsonSerializationError(e))
        })
    }
}

#[async_trait]
impl Api for AxonOpsClient {
    async fn request(&self, path: &str, method: Method, body: Option<&Value>) -> Result<Value> {
        self.request_with_status(path, method, body, &[StatusCode::OK])
            .await
    }
}
