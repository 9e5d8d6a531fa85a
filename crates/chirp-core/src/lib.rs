pub mod actions;
pub mod backoff;
pub mod cadence;
pub mod classifier;
pub mod config;
pub mod credentials;
pub mod error;
pub mod platform;
pub mod scheduler;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ChirpError, Result};
