use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("could not determine a state directory (set GOAT_STATE_DIR or stateDir)")]
    NoStateDir,

    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt storage file {path}: {source}")]
    StorageFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid api base url {url}: {source}")]
    ApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Why a request failed. De-duplication aborts are not errors and never show up here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("HTTP {status}")]
    Status { status: u16, body: Value },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// HTTP-like status: the response status, 408 for timeouts, 0 otherwise
    pub fn status(&self) -> u16 {
        match self {
            FetchError::Timeout(_) => 408,
            FetchError::Status { status, .. } => *status,
            FetchError::Network(_) | FetchError::InvalidUrl(_) => 0,
        }
    }

    /// Error-shaped value handed to error handlers
    pub fn to_value(&self, url: &str) -> Value {
        let mut value = json!({
            "error": true,
            "status": self.status(),
            "message": self.to_string(),
            "url": url,
        });
        if let FetchError::Timeout(_) = self {
            value["timeout"] = Value::Bool(true);
        }
        if let FetchError::Status { body, .. } = self {
            if !body.is_null() {
                value["body"] = body.clone();
            }
        }
        value
    }
}
