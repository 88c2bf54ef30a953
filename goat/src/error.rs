use std::path::PathBuf;

/// Errors from loading schemas and tables. Compiling never fails.
#[derive(Debug, thiserror::Error)]
pub enum GoatError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported schema format for {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(PathBuf),

    #[error("breakpoint table must be an object of name -> min width, got {0}")]
    InvalidBreakpoints(String),
}

pub type Result<T> = std::result::Result<T, GoatError>;
