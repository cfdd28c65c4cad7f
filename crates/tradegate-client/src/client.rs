//! The authenticated request client.
//!
//! One dispatch path for every call: outbound stages attach the bearer and
//! context headers, the transport runs the HTTP exchange, and the inbound
//! side validates the `{code, data, message}` envelope. A 401-class
//! response hands the call to the refresh gate and retries it exactly once
//! with the new credential; terminal failures are normalized and forwarded
//! to the notification sink once per top-level call.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tradegate_models::{Envelope, RefreshResult};

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::interceptor::{self, OutboundStage, bearer_stage, format_bearer, locale_stage};
use crate::notify::{Notifier, TracingNotifier};
use crate::refresh::{RefreshFailure, RefreshGate};
use crate::session::{NoopHooks, ReauthTrigger, SessionHooks};
use crate::store::AccessStore;

/// Per-call options: query parameters, timeout override, cancellation.
#[derive(Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation token; a cancelled call settles as
    /// [`ApiError::Cancelled`] and never reaches the notification sink.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Builder for [`RequestClient`].
pub struct ClientBuilder {
    config: ClientConfig,
    store: Option<Arc<AccessStore>>,
    hooks: Option<Arc<dyn SessionHooks>>,
    notifier: Option<Arc<dyn Notifier>>,
    extra_stages: Vec<OutboundStage>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            store: None,
            hooks: None,
            notifier: None,
            extra_stages: Vec::new(),
        }
    }

    /// Use an existing store (shared with login/logout flows).
    pub fn with_store(mut self, store: Arc<AccessStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn SessionHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Append a custom outbound stage after the built-in ones.
    pub fn with_stage(mut self, stage: OutboundStage) -> Self {
        self.extra_stages.push(stage);
        self
    }

    pub fn build(self) -> RequestClient {
        let store = self.store.unwrap_or_else(|| AccessStore::new().shared());
        let hooks = self.hooks.unwrap_or_else(|| Arc::new(NoopHooks));
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(TracingNotifier));

        let mut stages: Vec<OutboundStage> = vec![
            bearer_stage(store.clone()),
            locale_stage(self.config.locale.clone()),
        ];
        stages.extend(self.extra_stages);

        let reauth = Arc::new(ReauthTrigger::new(
            store.clone(),
            hooks,
            self.config.expiry_mode,
        ));

        RequestClient {
            http: reqwest::Client::new(),
            config: self.config,
            store,
            stages: Arc::new(stages),
            gate: Arc::new(RefreshGate::new()),
            reauth,
            notifier,
        }
    }
}

/// Shared HTTP client carrying the authenticated request pipeline.
pub struct RequestClient {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<AccessStore>,
    stages: Arc<Vec<OutboundStage>>,
    gate: Arc<RefreshGate>,
    reauth: Arc<ReauthTrigger>,
    notifier: Arc<dyn Notifier>,
}

impl RequestClient {
    /// Create a client with default collaborators.
    pub fn new(config: ClientConfig) -> Self {
        ClientBuilder::new(config).build()
    }

    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    pub fn store(&self) -> &Arc<AccessStore> {
        &self.store
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The re-authentication trigger (location tracking, manual logout).
    pub fn session(&self) -> &ReauthTrigger {
        &self.reauth
    }

    /// Re-arm the session after a successful login.
    pub fn reset_session(&self) {
        self.reauth.reset();
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None, RequestOptions::new())
            .await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T> {
        self.request(Method::GET, path, None, options).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.request(
            Method::POST,
            path,
            Some(serde_json::to_value(body)?),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn post_with<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T> {
        self.request(Method::POST, path, Some(serde_json::to_value(body)?), options)
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.request(
            Method::PUT,
            path,
            Some(serde_json::to_value(body)?),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::DELETE, path, None, RequestOptions::new())
            .await
    }

    /// Dispatch a call through the full pipeline.
    ///
    /// This is the single place terminal failures are normalized: whatever
    /// went wrong underneath, the notification sink hears about it exactly
    /// once, and never for a cancelled call.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<T> {
        let result = self.dispatch::<T>(method, path, body, options).await;
        if let Err(error) = &result
            && let Some(message) = error.user_message(&self.config.generic_error_message)
        {
            self.notifier.notify(&message);
        }
        result
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<T> {
        let cancel = options.cancel.clone();
        let call = self.execute(method, path, body.as_ref(), &options, true);

        let data = match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => return Err(ApiError::Cancelled),
                    outcome = call => outcome?,
                }
            }
            None => call.await?,
        };

        Ok(serde_json::from_value(data)?)
    }

    /// One pass through transport and envelope validation. `allow_retry`
    /// is consumed by the refresh cycle: a request is never retried more
    /// than once, even if the retry itself comes back 401.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
        allow_retry: bool,
    ) -> Result<Value> {
        let url = self.config.endpoint(path);
        debug!(%method, %url, "dispatching request");

        let timeout = options
            .timeout
            .unwrap_or(Duration::from_secs(self.config.request_timeout_secs));
        let mut builder = self.http.request(method.clone(), &url).timeout(timeout);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let builder = interceptor::apply(&self.stages, builder);

        let response = builder.send().await.map_err(ApiError::Transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ApiError::Transport)?;

        let parsed: std::result::Result<Envelope<Value>, serde_json::Error> =
            serde_json::from_slice(&bytes);

        let unauthorized = status == StatusCode::UNAUTHORIZED
            || matches!(&parsed, Ok(env) if env.code == self.config.unauthorized_code);
        if unauthorized {
            return self
                .recover_unauthorized(method, path, body, options, allow_retry)
                .await;
        }

        let envelope = match parsed {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Domain {
                    code: i64::from(status.as_u16()),
                    message: extract_error_message(&bytes, status),
                });
            }
            Err(error) => return Err(ApiError::Decode(error)),
        };

        if !envelope.is_success(self.config.success_code) {
            return Err(ApiError::Domain {
                code: envelope.code,
                message: envelope.message.unwrap_or_default(),
            });
        }

        // A token the backend just accepted counts as checked; this is what
        // lets soft expiry offer a re-login prompt later.
        if self.store.get().has_access_token() {
            self.store.mark_checked();
        }

        Ok(envelope.data.unwrap_or(Value::Null))
    }

    /// 401-class handling: refresh once through the gate, then replay the
    /// original invocation once with the new credential.
    ///
    /// Returns a boxed future: the plain async form would make the type of
    /// `execute`'s future depend on itself through the replay.
    fn recover_unauthorized<'a>(
        &'a self,
        method: Method,
        path: &'a str,
        body: Option<&'a Value>,
        options: &'a RequestOptions,
        allow_retry: bool,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            if !allow_retry {
                // The post-refresh retry was rejected too; terminal.
                self.reauth.trigger().await;
                return Err(ApiError::AuthExpired);
            }

            // While the session is soft-expired the UI owns recovery;
            // surface the expiry instead of refreshing silently.
            if self.store.is_expired() {
                return Err(ApiError::AuthExpired);
            }

            let credential = self.store.get();
            if !self.config.enable_refresh || !credential.can_refresh() {
                self.reauth.trigger().await;
                return Err(ApiError::AuthExpired);
            }

            match self.gate.wait(|| self.refresh_op()).await {
                Ok(_) => {
                    debug!(%method, path, "replaying request with refreshed credential");
                    self.execute(method, path, body, options, false).await
                }
                // The refresh operation already escalated; every queued
                // caller settles with the same terminal error.
                Err(_) => Err(ApiError::AuthExpired),
            }
        }
        .boxed()
    }

    /// Force a refresh cycle outside of 401 handling. Deduplicated through
    /// the same gate, so a manual call during an automatic cycle joins it.
    pub async fn refresh_access_token(&self) -> Result<String> {
        if !self.store.get().can_refresh() {
            self.reauth.trigger().await;
            return Err(ApiError::AuthExpired);
        }
        self.gate
            .wait(|| self.refresh_op())
            .await
            .map_err(|_| ApiError::AuthExpired)
    }

    /// Build the single-flight refresh operation. Owns clones of everything
    /// it touches so the gate can run it on a detached task.
    fn refresh_op(
        &self,
    ) -> impl std::future::Future<Output = std::result::Result<String, RefreshFailure>>
    + Send
    + 'static {
        let http = self.http.clone();
        let config = self.config.clone();
        let store = self.store.clone();
        let stages = self.stages.clone();
        let reauth = self.reauth.clone();

        async move {
            match call_refresh(&http, &config, &store, &stages).await {
                Ok(token) => {
                    debug!(token = %store.get().masked(), "access credential refreshed");
                    Ok(token)
                }
                Err(failure) => {
                    warn!(%failure, "credential refresh failed, escalating");
                    reauth.trigger().await;
                    Err(failure)
                }
            }
        }
    }
}

/// Call the refresh endpoint with the stored refresh token.
///
/// Runs the regular outbound stages, then swaps the bearer for the refresh
/// token. Stores the rotated credential pair before any waiter is released,
/// so every replayed request sees the new token.
async fn call_refresh(
    http: &reqwest::Client,
    config: &ClientConfig,
    store: &AccessStore,
    stages: &[OutboundStage],
) -> std::result::Result<String, RefreshFailure> {
    let credential = store.get();
    let Some(refresh_token) = credential.refresh_token.clone() else {
        return Err(RefreshFailure::new("no refresh token in store"));
    };

    let url = config.endpoint(&config.refresh_path);
    let builder = http
        .post(&url)
        .timeout(Duration::from_secs(config.refresh_timeout_secs));
    let builder = interceptor::apply(stages, builder);

    let mut request = builder
        .build()
        .map_err(|error| RefreshFailure::new(error.to_string()))?;
    let bearer = HeaderValue::from_str(&format_bearer(&refresh_token))
        .map_err(|_| RefreshFailure::new("refresh token is not header-safe"))?;
    request.headers_mut().insert(AUTHORIZATION, bearer);

    let response = http
        .execute(request)
        .await
        .map_err(|error| RefreshFailure::new(format!("refresh transport error: {error}")))?;
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|error| RefreshFailure::new(format!("refresh transport error: {error}")))?;

    if !status.is_success() {
        return Err(RefreshFailure::new(format!(
            "refresh rejected with status {status}"
        )));
    }

    let envelope: Envelope<RefreshResult> = serde_json::from_slice(&bytes)
        .map_err(|error| RefreshFailure::new(format!("refresh decode error: {error}")))?;
    if !envelope.is_success(config.success_code) {
        return Err(RefreshFailure::new(
            envelope.message_or("refresh rejected"),
        ));
    }
    let Some(result) = envelope.data else {
        return Err(RefreshFailure::new("refresh response missing data"));
    };

    // Whole-pair replacement; the backend may rotate the refresh token.
    store.set(tradegate_models::Credential::new(
        result.access_token.clone(),
        result.refresh_token.or(Some(refresh_token)),
    ));
    store.mark_checked();

    Ok(result.access_token)
}

/// Pull a display message out of a non-envelope error body.
///
/// The backend's framework-level errors carry `message` (and sometimes
/// `error`) instead of the business envelope.
fn extract_error_message(bytes: &[u8], status: StatusCode) -> String {
    serde_json::from_slice::<Value>(bytes)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .or_else(|| value.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}
