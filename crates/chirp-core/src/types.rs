use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// The periodic actions the bot knows how to perform.
///
/// Declaration order is the priority order a cycle runs them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ReplyMentions,
    Post,
    Like,
    FollowBack,
}

impl ActionKind {
    pub fn all() -> &'static [ActionKind] {
        &[
            ActionKind::ReplyMentions,
            ActionKind::Post,
            ActionKind::Like,
            ActionKind::FollowBack,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::ReplyMentions => "reply_mentions",
            ActionKind::Post => "post",
            ActionKind::Like => "like",
            ActionKind::FollowBack => "follow_back",
        }
    }

    /// Cadence used when the config does not set `interval_secs`.
    pub fn default_interval(self) -> Duration {
        match self {
            ActionKind::ReplyMentions => Duration::from_secs(5 * 60),
            ActionKind::Post => Duration::from_secs(60 * 60),
            // Every cycle.
            ActionKind::Like => Duration::ZERO,
            ActionKind::FollowBack => Duration::from_secs(6 * 60 * 60),
        }
    }

    /// Only posting is on out of the box; the rest are opt-in.
    pub fn enabled_by_default(self) -> bool {
        matches!(self, ActionKind::Post)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = crate::error::ChirpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reply_mentions" => Ok(ActionKind::ReplyMentions),
            "post" => Ok(ActionKind::Post),
            "like" => Ok(ActionKind::Like),
            "follow_back" => Ok(ActionKind::FollowBack),
            _ => Err(crate::error::ChirpError::UnknownAction(s.to_string())),
        }
    }
}
