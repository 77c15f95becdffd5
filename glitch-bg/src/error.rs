pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Failures of the embed script flow. These surface as status text and logs,
/// never as errors returned to the page.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbedError {
    #[error("could not inject embed script: {0}")]
    Inject(String),

    #[error("embed script failed to load: {0}")]
    Load(String),

    #[error("embed processing failed: {0}")]
    Process(String),
}
