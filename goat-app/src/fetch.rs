//! HTTP requests for views.
//!
//! Requests are keyed by `METHOD url`. Starting a request whose key is still
//! in flight cancels the earlier one, which resolves to
//! [`FetchOutcome::Aborted`] without touching any error handler. Timeouts,
//! transport failures and non-2xx responses become an error value handed to
//! the per-call handler (or the fetcher's default one) and returned as
//! [`FetchOutcome::Failed`].
//!
//! A fetcher may carry a `before` hook that rewrites the options of every
//! call and an `after` hook that maps every settled value, failures included.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::{AppError, FetchError};

/// Called with the normalized error value of a failed request
pub type ErrorHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Rewrites the options of a call before its key is computed
pub type BeforeHook = Arc<dyn Fn(&str, FetchOptions) -> FetchOptions + Send + Sync>;

/// Maps the value of a settled call
pub type AfterHook = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Raw body text
    pub text: String,
}

impl Response {
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            text: text.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body decoded as `format` asks
    pub fn decode(&self, format: ResponseFormat) -> Value {
        match format {
            ResponseFormat::Json => parse_body(&self.text),
            ResponseFormat::Text => Value::String(self.text.clone()),
            ResponseFormat::Raw => {
                let headers: Map<String, Value> = self
                    .headers
                    .iter()
                    .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                    .collect();
                serde_json::json!({
                    "status": self.status,
                    "headers": headers,
                    "body": self.text,
                })
            }
        }
    }
}

/// How a successful body is handed back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Parsed JSON; text that is not JSON comes back as a string, an empty body as null
    #[default]
    Json,
    /// The body text untouched
    Text,
    /// `{status, headers, body}` with the body as text
    Raw,
}

/// Sends one request
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, FetchError>;
}

/// Production transport over `reqwest`
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> crate::error::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("goat-app/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Client(e.to_string()))?;
        Ok(Self { http })
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<Response, FetchError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| FetchError::Network(format!("invalid method {}", request.method)))?;

        let mut builder = self.http.request(method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| FetchError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let text = response.text().await.map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Response { status, headers, text })
    }
}

/// Per-call options. Unset durations fall back to the fetcher's defaults;
/// a zero timeout disables the timeout.
#[derive(Clone, Default)]
pub struct FetchOptions {
    pub method: Option<String>,
    /// Nested maps flatten to dotted keys; arrays repeat the key
    pub query: Map<String, Value>,
    pub body: Option<Value>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
    pub min_latency: Option<Duration>,
    pub format: ResponseFormat,
    pub on_error: Option<ErrorHandler>,
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("method", &self.method)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("min_latency", &self.min_latency)
            .field("format", &self.format)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn min_latency(mut self, min_latency: Duration) -> Self {
        self.min_latency = Some(min_latency);
        self
    }

    pub fn format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Ok(Value),
    /// Replaced by a newer request with the same key
    Aborted,
    /// Error value, already passed to the error handler
    Failed(Value),
}

impl FetchOutcome {
    pub fn value(&self) -> Option<&Value> {
        match self {
            FetchOutcome::Ok(value) | FetchOutcome::Failed(value) => Some(value),
            FetchOutcome::Aborted => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, FetchOutcome::Aborted)
    }
}

fn append_query(pairs: &mut url::form_urlencoded::Serializer<'_, url::UrlQuery<'_>>, key: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (name, nested) in map {
                append_query(pairs, &format!("{key}.{name}"), nested);
            }
        }
        Value::Array(items) => {
            for item in items.iter().filter(|item| !item.is_array() && !item.is_object()) {
                append_query(pairs, key, item);
            }
        }
        Value::String(text) => {
            pairs.append_pair(key, text);
        }
        Value::Number(n) => {
            pairs.append_pair(key, &n.to_string());
        }
        Value::Bool(b) => {
            pairs.append_pair(key, if *b { "true" } else { "false" });
        }
        Value::Null => {}
    }
}

pub struct Fetcher {
    transport: Arc<dyn Transport>,
    base: Option<Url>,
    headers: Mutex<BTreeMap<String, String>>,
    timeout: Duration,
    min_latency: Duration,
    on_error: Option<ErrorHandler>,
    before: Option<BeforeHook>,
    after: Option<AfterHook>,
    in_flight: Mutex<HashMap<String, (u64, CancellationToken)>>,
    next_id: AtomicU64,
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("base", &self.base.as_ref().map(Url::as_str))
            .field("timeout", &self.timeout)
            .field("min_latency", &self.min_latency)
            .field("hooks", &(self.before.is_some(), self.after.is_some()))
            .field("in_flight", &lock(&self.in_flight).len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Fetcher {
    /// A fetcher with no timeout and no latency floor
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base: None,
            headers: Mutex::new(BTreeMap::new()),
            timeout: Duration::ZERO,
            min_latency: Duration::ZERO,
            on_error: None,
            before: None,
            after: None,
            in_flight: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Base URL for relative request paths. A missing trailing slash is added
    /// so `https://api/v1` + `users` gives `https://api/v1/users`.
    pub fn with_base(mut self, base: &str) -> crate::error::Result<Self> {
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let url = Url::parse(&normalized).map_err(|source| AppError::ApiUrl {
            url: base.to_string(),
            source,
        })?;
        self.base = Some(url);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_min_latency(mut self, min_latency: Duration) -> Self {
        self.min_latency = min_latency;
        self
    }

    pub fn with_headers(self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        lock(&self.headers).extend(headers);
        self
    }

    /// Default handler for requests that don't bring their own
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    pub fn with_before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, FetchOptions) -> FetchOptions + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(hook));
        self
    }

    pub fn with_after<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(hook));
        self
    }

    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        lock(&self.headers).insert(name.into(), value.into());
    }

    pub fn remove_header(&self, name: &str) -> Option<String> {
        lock(&self.headers).remove(name)
    }

    pub fn headers(&self) -> BTreeMap<String, String> {
        lock(&self.headers).clone()
    }

    /// Number of requests currently in flight
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Absolute URL for `url` with the query appended
    pub fn resolve_url(&self, url: &str, query: &Map<String, Value>) -> Result<Url, FetchError> {
        let mut resolved = match Url::parse(url) {
            Ok(absolute) => absolute,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self
                    .base
                    .as_ref()
                    .ok_or_else(|| FetchError::InvalidUrl(format!("{url} (no api base configured)")))?;
                base.join(url.trim_start_matches('/'))
                    .map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?
            }
            Err(e) => return Err(FetchError::InvalidUrl(format!("{url}: {e}"))),
        };
        if !query.is_empty() {
            let mut pairs = resolved.query_pairs_mut();
            for (key, value) in query {
                append_query(&mut pairs, key, value);
            }
        }
        Ok(resolved)
    }

    fn request_headers(&self, extra: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::from([
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]);
        headers.extend(self.headers());
        headers.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        headers
    }

    /// Drop the in-flight entry unless a newer request took over the key
    fn finish(&self, key: &str, id: u64) {
        let mut in_flight = lock(&self.in_flight);
        if in_flight.get(key).is_some_and(|(current, _)| *current == id) {
            in_flight.remove(key);
        }
    }

    fn fail(&self, error: FetchError, url: &str, options: &FetchOptions) -> FetchOutcome {
        warn!(url, error = %error, "request failed");
        let value = error.to_value(url);
        if let Some(handler) = options.on_error.as_ref().or(self.on_error.as_ref()) {
            handler(&value);
        }
        FetchOutcome::Failed(self.after(value))
    }

    fn after(&self, value: Value) -> Value {
        match &self.after {
            Some(hook) => hook(value),
            None => value,
        }
    }

    pub async fn fetch(&self, url: &str, options: FetchOptions) -> FetchOutcome {
        let options = match &self.before {
            Some(hook) => hook(url, options),
            None => options,
        };
        let method = options.method.clone().unwrap_or_else(|| "GET".to_string()).to_uppercase();
        let key = format!("{method} {url}");
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let previous = lock(&self.in_flight).insert(key.clone(), (id, token.clone()));
        if let Some((_, previous)) = previous {
            debug!(%key, "cancelling earlier request");
            previous.cancel();
        }

        let request = match self.resolve_url(url, &options.query) {
            Ok(resolved) => Request {
                method,
                url: resolved,
                headers: self.request_headers(&options.headers),
                body: options.body.clone(),
            },
            Err(e) => {
                self.finish(&key, id);
                return self.fail(e, url, &options);
            }
        };

        let timeout = options.timeout.unwrap_or(self.timeout);
        let min_latency = options.min_latency.unwrap_or(self.min_latency);

        let call = async {
            let send = self.transport.send(request);
            tokio::select! {
                _ = token.cancelled() => None,
                result = async {
                    if timeout.is_zero() {
                        send.await
                    } else {
                        tokio::time::timeout(timeout, send)
                            .await
                            .unwrap_or(Err(FetchError::Timeout(timeout)))
                    }
                } => Some(result),
            }
        };

        let result = if min_latency.is_zero() {
            call.await
        } else {
            let (result, ()) = futures::join!(call, tokio::time::sleep(min_latency));
            result
        };
        self.finish(&key, id);

        match result {
            None => {
                debug!(%key, "request aborted");
                FetchOutcome::Aborted
            }
            Some(Ok(response)) if response.is_success() => {
                FetchOutcome::Ok(self.after(response.decode(options.format)))
            }
            Some(Ok(response)) => self.fail(
                FetchError::Status {
                    status: response.status,
                    body: parse_body(&response.text),
                },
                url,
                &options,
            ),
            Some(Err(e)) => self.fail(e, url, &options),
        }
    }
}
