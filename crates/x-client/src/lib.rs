//! `x-client`: async Rust binding for the subset of the X API v2 the bot uses.
//!
//! # Architecture
//!
//! ```text
//! Credentials
//!     │
//!     ▼
//! oauth::sign      ← OAuth 1.0a HMAC-SHA1 (user context) or bearer (app-only)
//!     │
//!     ▼
//! XClient          ← one method per endpoint, one HTTP round trip each
//!     │
//!     ▼
//! types / XError   ← typed payloads; failures keep status, problem body,
//!                    and rate-limit reset so callers can classify them
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use x_client::{Credentials, XClient};
//!
//! let client = XClient::new(credentials)?;
//! let me = client.me().await?;
//! let post = client.create_post("hello", None).await?;
//! println!("@{} posted {}", me.username, post.id);
//! ```

pub mod client;
pub mod error;
pub mod oauth;
pub mod types;


pub use client::{XClient, DEFAULT_BASE_URL};
pub use error::{ApiErrorEntry, ApiProblem, XError};
pub use oauth::Credentials;
pub use types::{CreatedPost, FollowStatus, MentionPage, Post, PostId, User};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, XError>;
