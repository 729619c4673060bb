#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Metadata unavailable: {0}")]
    Metadata(String),

    #[error("Invalid link reference: {0}")]
    InvalidReference(String),
}

pub type Result<T> = std::result::Result<T, Error>;
