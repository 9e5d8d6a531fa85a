pub mod config;
pub mod run;
pub mod schedule;
pub mod tick;
pub mod whoami;

use anyhow::Context;
use chirp_core::config::{Config, DEFAULT_CONFIG_FILE};
use chirp_core::credentials::load_credentials;
use chirp_core::ChirpError;
use std::path::Path;
use x_client::XClient;

/// Load the config file. A missing *default* file means built-in defaults;
/// a missing file the user named explicitly is an error.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    match Config::load(path) {
        Ok(config) => Ok(config),
        Err(ChirpError::ConfigNotFound(_)) if path == Path::new(DEFAULT_CONFIG_FILE) => {
            Ok(Config::default())
        }
        Err(e) => Err(e).with_context(|| format!("failed to load config {}", path.display())),
    }
}

/// Log validation warnings and refuse to start on errors.
pub fn ensure_valid(config: &Config) -> anyhow::Result<()> {
    for w in config.ensure_valid()? {
        tracing::warn!("config: {}", w.message);
    }
    Ok(())
}

/// Build an API client from the environment credentials.
pub fn client(api_base_url: Option<&str>) -> anyhow::Result<XClient> {
    let credentials = load_credentials()?;
    let client = XClient::new(credentials).context("failed to build HTTP client")?;
    Ok(match api_base_url {
        Some(url) => client.with_base_url(url),
        None => client,
    })
}

pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start tokio runtime")
}
