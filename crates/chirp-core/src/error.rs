use std::path::PathBuf;

use thiserror::Error;
use x_client::XError;

#[derive(Debug, Error)]
pub enum ChirpError {
    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("missing environment variables: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),

    #[error("authentication failed: {0}")]
    Authentication(#[source] XError),

    #[error("scheduler is not connected: call connect() first")]
    NotConnected,

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ChirpError>;
