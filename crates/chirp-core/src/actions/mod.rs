//! The periodic actions the scheduler drives.
//!
//! Each action is a thin sequence of platform calls. Failures are classified
//! here, at the call site, so the scheduler only ever sees an
//! [`ActionFailure`] carrying a [`FailureKind`].

mod follow_back;
mod like;
mod mentions;
mod post;

use crate::classifier::{classify, FailureKind};
use crate::config::Config;
use crate::platform::Platform;
use crate::types::ActionKind;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, warn};
use x_client::{PostId, User, XError};

// ---------------------------------------------------------------------------
// ActionContext
// ---------------------------------------------------------------------------

/// Everything an action needs for one run.
pub struct ActionContext<'a, P: Platform + ?Sized> {
    pub platform: &'a P,
    /// The authenticated account.
    pub me: &'a User,
    pub config: &'a Config,
}

impl<P: Platform + ?Sized> ActionContext<'_, P> {
    /// Pause between consecutive remote calls.
    pub async fn courtesy_pause(&self) {
        let delay = self.config.schedule.courtesy_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

// ---------------------------------------------------------------------------
// ActionReport / ActionFailure
// ---------------------------------------------------------------------------

/// Summary of a completed action.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionReport {
    /// Remote side effects attempted (posts, likes, replies, follows).
    pub attempted: usize,
    pub succeeded: usize,
    /// Effects the platform reported as already in place.
    pub already_done: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ActionReport {
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for ActionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} succeeded", self.succeeded, self.attempted)?;
        if self.already_done > 0 {
            write!(f, ", {} already done", self.already_done)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ActionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a client error and log it at a level matching its kind.
    pub fn from_error(action: ActionKind, context: &str, err: &XError) -> Self {
        let kind = classify(err);
        log_failure(action, context, kind, err);
        Self::new(kind, format!("{context}: {err}"))
    }
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

pub type ActionResult = std::result::Result<ActionReport, ActionFailure>;

fn log_failure(action: ActionKind, context: &str, kind: FailureKind, err: &XError) {
    match kind {
        FailureKind::AlreadyDone => {
            debug!(action = %action, context, "already done: {err}");
        }
        FailureKind::RateLimited => match err.rate_limit_reset() {
            Some(reset) => warn!(action = %action, context, %reset, "rate limited: {err}"),
            None => warn!(action = %action, context, "rate limited: {err}"),
        },
        FailureKind::Forbidden => error!(
            action = %action,
            context,
            "forbidden: {err}. Check that the app has read and write permissions \
             and that your API access level includes this endpoint"
        ),
        FailureKind::Transient | FailureKind::Unknown => {
            warn!(action = %action, context, kind = %kind, "{err}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

/// Aggregates per-item results of a multi-call action.
///
/// `AlreadyDone` counts as success; any other failure marks the whole action
/// failed with the most severe kind seen, while the remaining items are
/// still attempted.
#[derive(Debug, Default)]
struct Tally {
    report: ActionReport,
    failure: Option<ActionFailure>,
}

impl Tally {
    fn success(&mut self) {
        self.report.attempted += 1;
        self.report.succeeded += 1;
    }

    /// The call went through but the platform did not apply the effect.
    fn no_effect(&mut self) {
        self.report.attempted += 1;
    }

    fn failed(&mut self, failure: ActionFailure) {
        self.report.attempted += 1;
        if !failure.kind.is_failure() {
            self.report.already_done += 1;
            return;
        }
        let replace = match &self.failure {
            None => true,
            Some(current) => failure.kind.severity() > current.kind.severity(),
        };
        if replace {
            self.failure = Some(failure);
        }
    }

    fn finish(self) -> ActionResult {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.report),
        }
    }
}

// ---------------------------------------------------------------------------
// MentionCursor
// ---------------------------------------------------------------------------

/// Newest mention already handled. Only ever moves forward.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MentionCursor {
    last_seen: Option<PostId>,
}

impl MentionCursor {
    pub fn last_seen(&self) -> Option<&PostId> {
        self.last_seen.as_ref()
    }

    /// Returns true if `id` is newer than the current position.
    pub fn is_new(&self, id: &PostId) -> bool {
        self.last_seen.as_ref().map_or(true, |last| id > last)
    }

    /// Move to `id` if it is strictly newer; older ids are ignored.
    pub fn advance(&mut self, id: &PostId) {
        if self.is_new(id) {
            self.last_seen = Some(id.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// ActionRunner
// ---------------------------------------------------------------------------

/// Dispatches an [`ActionKind`] to its implementation and owns the state
/// actions keep between runs.
#[derive(Debug, Default)]
pub struct ActionRunner {
    cursor: MentionCursor,
}

impl ActionRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> &MentionCursor {
        &self.cursor
    }

    pub async fn run<P: Platform + ?Sized>(
        &mut self,
        kind: ActionKind,
        ctx: &ActionContext<'_, P>,
    ) -> ActionResult {
        match kind {
            ActionKind::Post => post::run(ctx).await,
            ActionKind::Like => like::run(ctx).await,
            ActionKind::ReplyMentions => mentions::run(ctx, &mut self.cursor).await,
            ActionKind::FollowBack => follow_back::run(ctx).await,
        }
    }
}

/// Wait between the items of one action, but not before the first.
async fn pause_between<P: Platform + ?Sized>(ctx: &ActionContext<'_, P>, index: usize) {
    if index > 0 {
        ctx.courtesy_pause().await;
    }
}
