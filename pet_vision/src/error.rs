use thiserror::Error;

/// Errors surfaced by the detection session and its collaborators.
#[derive(Debug, Error)]
pub enum VisionError {
    /// The camera or video surface could not be acquired or read.
    #[error("capture error: {0}")]
    Capture(String),
    /// A single inference pass failed. The detection loop treats this as an empty frame.
    #[error("inference error: {0}")]
    Inference(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
