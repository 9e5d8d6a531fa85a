//! OAuth 1.0a request signing (RFC 5849, HMAC-SHA1).
//!
//! Only what the client needs: build the signature base string from the
//! method, the base URL and the query/form parameters, sign it with the
//! consumer and token secrets, and render the `Authorization` header.
//! JSON request bodies are not part of the signature.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// The five secrets issued for an X developer app.
///
/// The first four drive OAuth 1.0a user-context requests; the bearer token
/// drives app-only requests (search).
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_secret: String,
    pub bearer_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &"<redacted>")
            .field("access_token", &redact(&self.access_token))
            .field("access_secret", &"<redacted>")
            .field("bearer_token", &"<redacted>")
            .finish()
    }
}

/// Keep the last four characters so operators can tell keys apart.
fn redact(secret: &str) -> String {
    let n = secret.chars().count();
    if n <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(n - 4).collect();
    format!("****{tail}")
}

/// Per-request values that must be fresh for every signature.
#[derive(Debug, Clone)]
pub struct Nonce {
    pub nonce: String,
    pub timestamp: i64,
}

impl Nonce {
    pub fn generate() -> Self {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        Self {
            nonce,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Compute the `oauth_signature` value for a request.
///
/// `url` must not contain a query string; pass query and form parameters in
/// `params` instead.
pub fn signature(
    method: &str,
    url: &str,
    params: &[(String, String)],
    creds: &Credentials,
    nonce: &Nonce,
) -> String {
    let mut pairs: Vec<(String, String)> = oauth_params(creds, nonce)
        .into_iter()
        .chain(params.iter().cloned())
        .map(|(k, v)| (encode(&k), encode(&v)))
        .collect();
    pairs.sort();

    let param_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&param_string)
    );
    let key = format!(
        "{}&{}",
        encode(&creds.api_secret),
        encode(&creds.access_secret)
    );

    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Render the full `Authorization: OAuth ...` header value.
pub fn authorization_header(
    method: &str,
    url: &str,
    params: &[(String, String)],
    creds: &Credentials,
    nonce: &Nonce,
) -> String {
    let sig = signature(method, url, params, creds, nonce);
    let mut fields = oauth_params(creds, nonce);
    fields.push(("oauth_signature".to_string(), sig));
    fields.sort();
    let rendered = fields
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {rendered}")
}

fn oauth_params(creds: &Credentials, nonce: &Nonce) -> Vec<(String, String)> {
    vec![
        ("oauth_consumer_key".to_string(), creds.api_key.clone()),
        ("oauth_nonce".to_string(), nonce.nonce.clone()),
        (
            "oauth_signature_method".to_string(),
            "HMAC-SHA1".to_string(),
        ),
        ("oauth_timestamp".to_string(), nonce.timestamp.to_string()),
        ("oauth_token".to_string(), creds.access_token.clone()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ]
}

// ─── Tests ────────────────────────────────────────────────────────────────
