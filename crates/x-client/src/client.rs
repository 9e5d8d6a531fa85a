use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{ApiErrorEntry, ApiProblem, XError};
use crate::oauth::{self, Credentials, Nonce};
use crate::types::{
    CreatedPost, FollowStatus, Includes, LikeStatus, MentionPage, Post, PostId, User,
};
use crate::Result;

pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Recent search accepts 10..=100 results per page.
const SEARCH_PAGE: (u32, u32) = (10, 100);
/// Follower/following listings accept 1..=1000 results per page.
const USERS_PAGE: (u32, u32) = (1, 1000);

#[derive(Debug, Clone, Copy)]
enum Auth {
    /// OAuth 1.0a on behalf of the account that owns the access token.
    User,
    /// Bearer token, app-only.
    App,
}

/// Wire shape shared by every v2 response.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    includes: Option<Includes>,
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
}

// ─── XClient ──────────────────────────────────────────────────────────────

/// Async client for the X API v2.
///
/// Every public method performs exactly one HTTP round trip. Errors keep the
/// HTTP status and the parsed problem body so callers can tell a rate limit
/// from a permission problem from a duplicate.
#[derive(Debug, Clone)]
pub struct XClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl XClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("chirp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials,
        })
    }

    /// Point the client at another host (a proxy, or a mock server in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────────

    /// `GET /2/users/me`: the account behind the access token.
    pub async fn me(&self) -> Result<User> {
        let env: Envelope<User> = self
            .send(Method::GET, "/2/users/me", &[], None, Auth::User)
            .await?;
        require(env, "user")
    }

    /// `POST /2/tweets`
    pub async fn create_post(
        &self,
        text: &str,
        in_reply_to: Option<&PostId>,
    ) -> Result<CreatedPost> {
        let mut body = json!({ "text": text });
        if let Some(parent) = in_reply_to {
            body["reply"] = json!({ "in_reply_to_tweet_id": parent.as_str() });
        }
        let env: Envelope<CreatedPost> = self
            .send(Method::POST, "/2/tweets", &[], Some(body), Auth::User)
            .await?;
        require(env, "created post")
    }

    /// `GET /2/tweets/search/recent`: app-only. No matches is an empty list.
    pub async fn search_recent(&self, query: &str, max_results: u32) -> Result<Vec<Post>> {
        let params = [
            ("query".to_string(), query.to_string()),
            (
                "max_results".to_string(),
                clamp(max_results, SEARCH_PAGE).to_string(),
            ),
            ("tweet.fields".to_string(), "created_at,author_id".to_string()),
        ];
        let env: Envelope<Vec<Post>> = self
            .send(Method::GET, "/2/tweets/search/recent", &params, None, Auth::App)
            .await?;
        Ok(env.data.unwrap_or_default())
    }

    /// `POST /2/users/:id/likes`: returns whether the post is now liked.
    pub async fn like(&self, user_id: &str, post_id: &PostId) -> Result<bool> {
        let path = format!("/2/users/{}/likes", urlencoding::encode(user_id));
        let body = json!({ "tweet_id": post_id.as_str() });
        let env: Envelope<LikeStatus> = self
            .send(Method::POST, &path, &[], Some(body), Auth::User)
            .await?;
        Ok(require(env, "like status")?.liked)
    }

    /// `GET /2/users/:id/mentions` with authors expanded.
    pub async fn mentions(
        &self,
        user_id: &str,
        since_id: Option<&PostId>,
    ) -> Result<MentionPage> {
        let path = format!("/2/users/{}/mentions", urlencoding::encode(user_id));
        let mut params = vec![
            ("expansions".to_string(), "author_id".to_string()),
            ("tweet.fields".to_string(), "created_at,author_id".to_string()),
        ];
        if let Some(since) = since_id {
            params.push(("since_id".to_string(), since.to_string()));
        }
        let env: Envelope<Vec<Post>> = self
            .send(Method::GET, &path, &params, None, Auth::User)
            .await?;
        Ok(MentionPage {
            posts: env.data.unwrap_or_default(),
            users: env.includes.map(|i| i.users).unwrap_or_default(),
        })
    }

    /// `GET /2/users/:id`
    pub async fn user(&self, user_id: &str) -> Result<User> {
        let path = format!("/2/users/{}", urlencoding::encode(user_id));
        let env: Envelope<User> = self
            .send(Method::GET, &path, &[], None, Auth::User)
            .await?;
        require(env, "user")
    }

    /// `GET /2/users/:id/followers`: first page only.
    pub async fn followers(&self, user_id: &str, max_results: u32) -> Result<Vec<User>> {
        self.user_list("followers", user_id, max_results).await
    }

    /// `GET /2/users/:id/following`: first page only.
    pub async fn following(&self, user_id: &str, max_results: u32) -> Result<Vec<User>> {
        self.user_list("following", user_id, max_results).await
    }

    /// `POST /2/users/:id/following`
    pub async fn follow(&self, user_id: &str, target_user_id: &str) -> Result<FollowStatus> {
        let path = format!("/2/users/{}/following", urlencoding::encode(user_id));
        let body = json!({ "target_user_id": target_user_id });
        let env: Envelope<FollowStatus> = self
            .send(Method::POST, &path, &[], Some(body), Auth::User)
            .await?;
        require(env, "follow status")
    }

    // ── Internal ─────────────────────────────────────────────────────────

    async fn user_list(
        &self,
        relation: &str,
        user_id: &str,
        max_results: u32,
    ) -> Result<Vec<User>> {
        let path = format!("/2/users/{}/{relation}", urlencoding::encode(user_id));
        let params = [(
            "max_results".to_string(),
            clamp(max_results, USERS_PAGE).to_string(),
        )];
        let env: Envelope<Vec<User>> = self
            .send(Method::GET, &path, &params, None, Auth::User)
            .await?;
        Ok(env.data.unwrap_or_default())
    }

    fn authorize(
        &self,
        req: RequestBuilder,
        method: &Method,
        url: &str,
        query: &[(String, String)],
        auth: Auth,
    ) -> RequestBuilder {
        match auth {
            Auth::App => req.bearer_auth(&self.credentials.bearer_token),
            Auth::User => {
                let header = oauth::authorization_header(
                    method.as_str(),
                    url,
                    query,
                    &self.credentials,
                    &Nonce::generate(),
                );
                req.header(reqwest::header::AUTHORIZATION, header)
            }
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<serde_json::Value>,
        auth: Auth,
    ) -> Result<Envelope<T>> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, path, "X API request");

        let mut req = self.http.request(method.clone(), &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let req = self.authorize(req, &method, &url, query, auth);

        let resp = req.send().await?;
        let status = resp.status();
        let rate_limit_reset = resp
            .headers()
            .get("x-rate-limit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_reset);
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(XError::Api {
                status: status.as_u16(),
                problem: ApiProblem::parse(&text),
                rate_limit_reset,
            });
        }

        let env: Envelope<T> = serde_json::from_str(&text).map_err(|source| XError::Decode {
            context: format!("{method} {path}"),
            source,
        })?;

        // A 200 without `data` but with `errors` is a failed operation.
        if env.data.is_none() && !env.errors.is_empty() {
            return Err(XError::Api {
                status: status.as_u16(),
                problem: ApiProblem {
                    errors: env.errors,
                    ..Default::default()
                },
                rate_limit_reset,
            });
        }
        Ok(env)
    }
}

fn require<T>(env: Envelope<T>, what: &'static str) -> Result<T> {
    env.data.ok_or(XError::MissingData(what))
}

fn clamp(value: u32, (min, max): (u32, u32)) -> u32 {
    value.clamp(min, max)
}

fn parse_reset(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_header_parses_epoch_seconds() {
        let reset = parse_reset("1700000000").unwrap();
        assert_eq!(reset.timestamp(), 1_700_000_000);
        assert!(parse_reset("soon").is_none());
    }

    #[test]
    fn page_sizes_are_clamped_to_api_limits() {
        assert_eq!(clamp(3, SEARCH_PAGE), 10);
        assert_eq!(clamp(500, SEARCH_PAGE), 100);
        assert_eq!(clamp(0, USERS_PAGE), 1);
        assert_eq!(clamp(20, USERS_PAGE), 20);
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let creds = Credentials {
            api_key: "k".into(),
            api_secret: "s".into(),
            access_token: "t".into(),
            access_secret: "ts".into(),
            bearer_token: "b".into(),
        };
        let client = XClient::new(creds)
            .unwrap()
            .with_base_url("http://localhost:9/");
        assert_eq!(client.base_url(), "http://localhost:9");
    }
}
