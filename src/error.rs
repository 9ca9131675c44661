use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Upstream layer {layer} answered with HTTP {status}")]
    UpstreamStatus { layer: u32, status: u16 },

    #[error("Upstream layer {layer} reported error {code}: {message}")]
    UpstreamService { layer: u32, code: i64, message: String },

    #[error("Upstream layer {layer} timed out after {after_ms} ms")]
    UpstreamTimeout { layer: u32, after_ms: u64 },
}

impl CalendarError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CalendarError::InvalidInput(message.into())
    }

    /// True for failures caused by the feature service or the network path to it.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            CalendarError::Http(_)
                | CalendarError::UpstreamStatus { .. }
                | CalendarError::UpstreamService { .. }
                | CalendarError::UpstreamTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CalendarError>;
