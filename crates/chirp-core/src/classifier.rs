use serde::{Deserialize, Serialize};
use std::fmt;
use x_client::XError;

// ---------------------------------------------------------------------------
// FailureKind
// ---------------------------------------------------------------------------

/// What a failed remote call means for the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The service asked us to slow down.
    RateLimited,
    /// Credentials or access level do not allow the call.
    Forbidden,
    /// The effect already exists (liked, followed, duplicate post).
    AlreadyDone,
    /// Network trouble or a server-side error.
    Transient,
    Unknown,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::RateLimited => "rate_limited",
            FailureKind::Forbidden => "forbidden",
            FailureKind::AlreadyDone => "already_done",
            FailureKind::Transient => "transient",
            FailureKind::Unknown => "unknown",
        }
    }

    /// `AlreadyDone` counts as success everywhere.
    pub fn is_failure(self) -> bool {
        !matches!(self, FailureKind::AlreadyDone)
    }

    /// Ordering used to pick the headline kind of a failed cycle.
    pub fn severity(self) -> u8 {
        match self {
            FailureKind::AlreadyDone => 0,
            FailureKind::Transient => 1,
            FailureKind::Unknown => 2,
            FailureKind::RateLimited => 3,
            FailureKind::Forbidden => 4,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

/// Legacy code for "rate limit exceeded".
const RATE_LIMIT_CODE: i64 = 88;

/// Legacy codes meaning the requested effect is already in place:
/// 139 already favorited, 160 follow already requested, 187 duplicate status,
/// 327 already retweeted.
const ALREADY_DONE_CODES: &[i64] = &[139, 160, 187, 327];

/// Best-effort text match for bodies that carry no code.
const ALREADY_DONE_PHRASES: &[&str] = &[
    "already favorited",
    "already liked",
    "already following",
    "already requested",
    "already retweeted",
    "duplicate content",
];

pub fn classify(err: &XError) -> FailureKind {
    match err {
        XError::Api {
            status, problem, ..
        } => {
            let codes: Vec<i64> = problem.codes().collect();
            if *status == 429 || codes.contains(&RATE_LIMIT_CODE) {
                return FailureKind::RateLimited;
            }
            if codes.iter().any(|c| ALREADY_DONE_CODES.contains(c)) {
                return FailureKind::AlreadyDone;
            }
            let already = problem.messages().iter().any(|m| {
                let m = m.to_ascii_lowercase();
                ALREADY_DONE_PHRASES.iter().any(|p| m.contains(p))
            });
            if already {
                return FailureKind::AlreadyDone;
            }
            match *status {
                401 | 403 => FailureKind::Forbidden,
                408 | 500..=599 => FailureKind::Transient,
                _ => FailureKind::Unknown,
            }
        }
        e if e.is_network() => FailureKind::Transient,
        _ => FailureKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x_client::ApiProblem;

    fn api(status: u16, problem: ApiProblem) -> XError {
        XError::api(status, problem)
    }

    #[test]
    fn too_many_requests_is_rate_limited() {
        assert_eq!(
            classify(&api(429, ApiProblem::with_detail("Too Many Requests"))),
            FailureKind::RateLimited
        );
        assert_eq!(
            classify(&api(400, ApiProblem::with_code(88, "Rate limit exceeded"))),
            FailureKind::RateLimited
        );
    }

    #[test]
    fn legacy_codes_mean_already_done() {
        for code in [139, 160, 187, 327] {
            let err = api(403, ApiProblem::with_code(code, "whatever"));
            assert_eq!(classify(&err), FailureKind::AlreadyDone, "code {code}");
        }
    }

    #[test]
    fn already_done_text_is_case_insensitive() {
        let err = api(
            403,
            ApiProblem::with_detail("You are not allowed to create a Tweet with duplicate content."),
        );
        assert_eq!(classify(&err), FailureKind::AlreadyDone);

        let err = api(400, ApiProblem::with_detail("Already Liked"));
        assert_eq!(classify(&err), FailureKind::AlreadyDone);
    }

    #[test]
    fn auth_statuses_are_forbidden() {
        assert_eq!(
            classify(&api(401, ApiProblem::with_detail("Unauthorized"))),
            FailureKind::Forbidden
        );
        assert_eq!(
            classify(&api(403, ApiProblem::with_detail("client-not-enrolled"))),
            FailureKind::Forbidden
        );
    }

    #[test]
    fn server_errors_are_transient() {
        for status in [500, 502, 503, 504, 408] {
            assert_eq!(
                classify(&api(status, ApiProblem::default())),
                FailureKind::Transient,
                "status {status}"
            );
        }
    }

    #[test]
    fn everything_else_is_unknown() {
        assert_eq!(
            classify(&api(400, ApiProblem::with_detail("Invalid Request"))),
            FailureKind::Unknown
        );
        assert_eq!(
            classify(&XError::MissingData("user")),
            FailureKind::Unknown
        );
        let decode = serde_json::from_str::<u32>("nope").unwrap_err();
        assert_eq!(
            classify(&XError::Decode {
                context: "GET /2/users/me".into(),
                source: decode,
            }),
            FailureKind::Unknown
        );
    }

    #[test]
    fn only_already_done_is_not_a_failure() {
        assert!(!FailureKind::AlreadyDone.is_failure());
        assert!(FailureKind::Forbidden.is_failure());
        assert!(FailureKind::Forbidden.severity() > FailureKind::RateLimited.severity());
    }
}
