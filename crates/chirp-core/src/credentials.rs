use crate::error::{ChirpError, Result};
use x_client::Credentials;

pub const API_KEY_VAR: &str = "TWITTER_API_KEY";
pub const API_SECRET_VAR: &str = "TWITTER_API_SECRET";
pub const ACCESS_TOKEN_VAR: &str = "TWITTER_ACCESS_TOKEN";
pub const ACCESS_SECRET_VAR: &str = "TWITTER_ACCESS_SECRET";
pub const BEARER_TOKEN_VAR: &str = "TWITTER_BEARER_TOKEN";

pub const CREDENTIAL_VARS: [&str; 5] = [
    API_KEY_VAR,
    API_SECRET_VAR,
    ACCESS_TOKEN_VAR,
    ACCESS_SECRET_VAR,
    BEARER_TOKEN_VAR,
];

/// Read credentials from the process environment.
pub fn load_credentials() -> Result<Credentials> {
    from_lookup(|name| std::env::var(name).ok())
}

/// Build credentials from any name → value lookup. Every missing or blank
/// variable is reported at once.
pub fn from_lookup<F>(lookup: F) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let mut values = Vec::with_capacity(CREDENTIAL_VARS.len());
    let mut missing = Vec::new();
    for name in CREDENTIAL_VARS {
        match lookup(name).filter(|v| !v.trim().is_empty()) {
            Some(v) => values.push(v),
            None => missing.push(name.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(ChirpError::MissingCredentials(missing));
    }

    let mut values = values.into_iter();
    let mut next = || values.next().unwrap_or_default();
    Ok(Credentials {
        api_key: next(),
        api_secret: next(),
        access_token: next(),
        access_secret: next(),
        bearer_token: next(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn all_present() {
        let vars = env(&[
            (API_KEY_VAR, "key"),
            (API_SECRET_VAR, "secret"),
            (ACCESS_TOKEN_VAR, "token"),
            (ACCESS_SECRET_VAR, "token-secret"),
            (BEARER_TOKEN_VAR, "bearer"),
        ]);
        let creds = from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.api_key, "key");
        assert_eq!(creds.access_secret, "token-secret");
        assert_eq!(creds.bearer_token, "bearer");
    }

    #[test]
    fn missing_and_blank_reported_by_name() {
        let vars = env(&[
            (API_KEY_VAR, "key"),
            (API_SECRET_VAR, "  "),
            (ACCESS_TOKEN_VAR, "token"),
        ]);
        let err = from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        match err {
            ChirpError::MissingCredentials(names) => assert_eq!(
                names,
                vec![
                    API_SECRET_VAR.to_string(),
                    ACCESS_SECRET_VAR.to_string(),
                    BEARER_TOKEN_VAR.to_string()
                ]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn error_message_lists_every_variable() {
        let err = from_lookup(|_| None).unwrap_err();
        let msg = err.to_string();
        for name in CREDENTIAL_VARS {
            assert!(msg.contains(name), "{msg}");
        }
    }
}
