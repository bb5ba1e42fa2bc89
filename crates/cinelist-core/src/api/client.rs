//! API client for communicating with the movie catalogue REST API.
//!
//! Every request reads the current access token from the credential store
//! and sends it as a bearer header. A 401 triggers at most one token refresh
//! followed by one replay of the original request; the replay's outcome is
//! final.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{header, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::auth::{AuthFailure, CredentialStore, MemoryCredentialStore, SessionEvent};
use crate::config::{Config, DEFAULT_REQUEST_TIMEOUT_SECS};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Login endpoint; a 401 here means bad credentials, never an expired token
pub(crate) const LOGIN_PATH: &str = "/users/login/";

/// Endpoint exchanging a refresh token for a new access token
pub(crate) const REFRESH_PATH: &str = "/users/token/refresh/";

/// Buffered session events per subscriber before the oldest are dropped
const EVENT_CHANNEL_CAPACITY: usize = 16;

const USER_AGENT: &str = concat!("cinelist/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    /// Present when the server rotates refresh tokens
    #[serde(default)]
    refresh: Option<String>,
}

/// How concurrent 401s share token refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// One in-flight refresh is shared by every request that needs it
    #[default]
    Coalesced,
    /// Each rejected request runs its own refresh
    Independent,
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: header::HeaderMap,
    /// Send without a bearer header and never refresh on 401
    pub anonymous: bool,
}

impl RequestOptions {
    pub fn anonymous() -> Self {
        Self {
            anonymous: true,
            ..Self::default()
        }
    }

    pub fn with_query(query: Vec<(String, String)>) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }
}

/// Successful response: status and decoded JSON body (`Null` when empty).
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Unexpected response shape: {}", e)))
    }
}

/// An outbound call captured so it can be sent again unchanged.
#[derive(Debug, Clone)]
struct PendingRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    options: RequestOptions,
}

impl PendingRequest {
    fn refresh_exempt(&self) -> bool {
        self.options.anonymous || self.path == LOGIN_PATH
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Replay,
}

/// A request together with how many times it has been sent.
#[derive(Debug, Clone, Copy)]
struct Tracked<'a> {
    request: &'a PendingRequest,
    attempt: Attempt,
}

impl<'a> Tracked<'a> {
    fn initial(request: &'a PendingRequest) -> Self {
        Self {
            request,
            attempt: Attempt::Initial,
        }
    }

    fn replay(self) -> Self {
        Self {
            request: self.request,
            attempt: Attempt::Replay,
        }
    }
}

type RefreshFuture = Shared<BoxFuture<'static, Result<String, AuthFailure>>>;

/// API client for the movie catalogue.
/// Clone is cheap - the HTTP client, store and refresh slot are shared.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Arc<str>,
    store: Arc<dyn CredentialStore>,
    policy: RefreshPolicy,
    inflight: Arc<Mutex<Option<RefreshFuture>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    /// Create a client for the backend named in `config`.
    pub fn new(config: &Config, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        Self::builder()
            .base_url(config.api_base_url())
            .timeout(config.request_timeout())
            .credential_store(store)
            .build()
    }

    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Receive session lifecycle events (login, refresh, logout, expiry).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ===== Request lifecycle =====

    /// Send a request to `path` (relative to the API base).
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        let request = PendingRequest {
            method,
            path: normalize_path(path),
            body,
            options,
        };
        self.execute(&request).await
    }

    async fn execute(&self, request: &PendingRequest) -> Result<ApiResponse, ApiError> {
        let mut tracked = Tracked::initial(request);
        let mut bearer = if request.options.anonymous {
            None
        } else {
            self.store.access_token().map_err(ApiError::storage)?
        };

        loop {
            let response = self.transmit(tracked, bearer.as_deref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Self::into_api_response(response).await;
            }

            match tracked.attempt {
                Attempt::Initial if request.refresh_exempt() => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ApiError::from_status(StatusCode::UNAUTHORIZED, &body));
                }
                Attempt::Initial => {
                    if let Some(current) = self.newer_access_token(bearer.as_deref())? {
                        debug!(method = %request.method, path = %request.path, "Access token already replaced, replaying");
                        bearer = Some(current);
                    } else {
                        debug!(method = %request.method, path = %request.path, "Access token rejected, refreshing");
                        bearer = Some(self.refresh().await?);
                    }
                    tracked = tracked.replay();
                }
                Attempt::Replay => {
                    warn!(method = %request.method, path = %request.path, "Request rejected after token refresh");
                    let reason = AuthFailure::ReplayRejected;
                    self.end_session(reason.clone());
                    return Err(reason.into());
                }
            }
        }
    }

    async fn transmit(
        &self,
        tracked: Tracked<'_>,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let request = tracked.request;

        let mut headers = request.options.headers.clone();
        headers.remove(header::AUTHORIZATION);

        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path))
            .headers(headers);
        if !request.options.query.is_empty() {
            builder = builder.query(&request.options.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, path = %request.path, attempt = ?tracked.attempt, "Sending request");
        let response = builder.send().await?;
        debug!(path = %request.path, status = response.status().as_u16(), "Response received");
        Ok(response)
    }

    /// Turn a non-401 response into the caller's outcome.
    async fn into_api_response(response: reqwest::Response) -> Result<ApiResponse, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)
                .map_err(|e| ApiError::InvalidResponse(format!("Body is not valid JSON: {}", e)))?
        };
        Ok(ApiResponse { status, body })
    }

    // ===== Token refresh =====

    /// Access token stored by a refresh that finished after `sent` went out.
    /// Only coalesced clients reuse it; independent ones always refresh.
    fn newer_access_token(&self, sent: Option<&str>) -> Result<Option<String>, ApiError> {
        if self.policy != RefreshPolicy::Coalesced {
            return Ok(None);
        }
        let current = self.store.access_token().map_err(ApiError::storage)?;
        Ok(current.filter(|token| Some(token.as_str()) != sent))
    }

    async fn refresh(&self) -> Result<String, AuthFailure> {
        match self.policy {
            RefreshPolicy::Independent => self.refresh_access_token().await,
            RefreshPolicy::Coalesced => self.refresh_coalesced().await,
        }
    }

    /// Join the refresh already in flight, or start one that later callers can join.
    async fn refresh_coalesced(&self) -> Result<String, AuthFailure> {
        let shared = {
            let mut slot = self.inflight.lock().await;
            match slot.as_ref() {
                Some(running) => {
                    debug!("Joining in-flight token refresh");
                    running.clone()
                }
                None => {
                    let client = self.clone();
                    let fut = async move { client.refresh_access_token().await }
                        .boxed()
                        .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        let outcome = shared.clone().await;

        let mut slot = self.inflight.lock().await;
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&shared)) {
            *slot = None;
        }
        outcome
    }

    /// Run one refresh cycle; on failure the session is ended.
    async fn refresh_access_token(&self) -> Result<String, AuthFailure> {
        match self.request_new_access_token().await {
            Ok(access) => {
                info!("Access token refreshed");
                self.emit(SessionEvent::TokenRefreshed);
                Ok(access)
            }
            Err(reason) => {
                self.end_session(reason.clone());
                Err(reason)
            }
        }
    }

    /// POST the refresh token directly, outside the 401 handling in `execute`.
    async fn request_new_access_token(&self) -> Result<String, AuthFailure> {
        let refresh = self
            .store
            .refresh_token()
            .map_err(|e| AuthFailure::RefreshUnavailable(format!("{:#}", e)))?
            .ok_or(AuthFailure::MissingRefreshToken)?;

        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh: &refresh })
            .send()
            .await
            .map_err(|e| AuthFailure::RefreshUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Token refresh rejected");
            return Err(AuthFailure::RefreshRejected {
                status: status.as_u16(),
            });
        }

        let tokens: RefreshResponse = response
            .json()
            .await
            .map_err(|e| AuthFailure::RefreshUnavailable(format!("Invalid refresh response: {}", e)))?;

        self.store
            .update_access_token(&tokens.access, tokens.refresh.as_deref())
            .map_err(|e| AuthFailure::RefreshUnavailable(format!("{:#}", e)))?;

        Ok(tokens.access)
    }

    /// Clear both tokens and tell subscribers the user must log in again.
    fn end_session(&self, reason: AuthFailure) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        warn!(reason = %reason, "Session expired");
        self.emit(SessionEvent::Expired { reason });
    }

    // ===== Typed helpers =====

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, RequestOptions::default())
            .await?
            .json()
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, RequestOptions::with_query(query))
            .await?
            .json()
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, path, Some(body), RequestOptions::default())
            .await?
            .json()
    }

    /// POST without a body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::POST, path, None, RequestOptions::default())
            .await?
            .json()
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PUT, path, Some(body), RequestOptions::default())
            .await?
            .json()
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request(Method::DELETE, path, None, RequestOptions::default())
            .await?;
        Ok(())
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Builder for `ApiClient`
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    store: Option<Arc<dyn CredentialStore>>,
    policy: RefreshPolicy,
}

impl ApiClientBuilder {
    /// API base every request path is appended to (e.g. `http://localhost:8000/api`)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ApiError::Configuration("base_url is required".into()))?;
        let base_url = base_url.trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ApiError::Configuration("base_url is empty".into()));
        }

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = build_http(
            Client::builder()
                .timeout(
                    self.timeout
                        .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
                )
                .user_agent(USER_AGENT)
                .default_headers(default_headers),
        )?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(ApiClient {
            http,
            base_url: Arc::from(base_url),
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new())),
            policy: self.policy,
            inflight: Arc::new(Mutex::new(None)),
            events,
        })
    }
}

/// A client that cannot be built (TLS backend, resolver) is a setup problem, not a network one.
fn build_http(builder: reqwest::ClientBuilder) -> Result<Client, ApiError> {
    builder
        .build()
        .map_err(|e| ApiError::Configuration(format!("Failed to build HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_setup_failure_is_configuration_error() {
        // rustls supports nothing below TLS 1.2
        let builder = Client::builder().max_tls_version(reqwest::tls::Version::TLS_1_0);
        let err = build_http(builder).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
        assert!(!err.is_network());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("movies/"), "/movies/");
        assert_eq!(normalize_path("/movies/"), "/movies/");
    }

    #[test]
    fn test_builder_requires_base_url() {
        let result = ApiClient::builder().build();
        assert!(matches!(result, Err(ApiError::Configuration(_))));

        let result = ApiClient::builder().base_url("///").build();
        assert!(matches!(result, Err(ApiError::Configuration(_))));
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let client = ApiClient::builder()
            .base_url("http://localhost:8000/api/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(client.url("/movies/"), "http://localhost:8000/api/movies/");
        assert_eq!(client.refresh_policy(), RefreshPolicy::Coalesced);
    }

    #[test]
    fn test_login_and_anonymous_requests_are_refresh_exempt() {
        let login = PendingRequest {
            method: Method::POST,
            path: LOGIN_PATH.to_string(),
            body: None,
            options: RequestOptions::default(),
        };
        assert!(login.refresh_exempt());

        let anonymous = PendingRequest {
            path: "/users/register/".to_string(),
            options: RequestOptions::anonymous(),
            ..login.clone()
        };
        assert!(anonymous.refresh_exempt());

        let movies = PendingRequest {
            path: "/movies/".to_string(),
            ..login
        };
        assert!(!movies.refresh_exempt());
    }

    #[test]
    fn test_replay_marks_attempt() {
        let request = PendingRequest {
            method: Method::GET,
            path: "/movies/".to_string(),
            body: None,
            options: RequestOptions::default(),
        };
        let tracked = Tracked::initial(&request);
        assert_eq!(tracked.attempt, Attempt::Initial);
        assert_eq!(tracked.replay().attempt, Attempt::Replay);
    }
}
