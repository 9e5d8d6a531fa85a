//! The top-level loop.
//!
//! ```text
//!   Connecting ──ok──▶ Running ◀──success── Backoff
//!       │                 │  └──failure──────▶ │
//!       │ auth error      │ stop / cancel      │ stop / cancel
//!       ▼                 ▼                    ▼
//!                       Stopped
//! ```
//!
//! Each tick asks the cadence tracker which actions are due, runs them one
//! after another, and feeds the combined outcome to the backoff controller,
//! which decides how long to sleep or whether to stop.

use crate::actions::{ActionContext, ActionFailure, ActionReport, ActionRunner};
use crate::backoff::{BackoffController, BackoffDecision, CycleOutcome, StopReason};
use crate::cadence::CadenceTracker;
use crate::classifier::FailureKind;
use crate::config::Config;
use crate::error::{ChirpError, Result};
use crate::platform::Platform;
use crate::types::ActionKind;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use x_client::User;

// ---------------------------------------------------------------------------
// SchedulerState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Connecting,
    Running,
    Backoff,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchedulerState::Connecting => "connecting",
            SchedulerState::Running => "running",
            SchedulerState::Backoff => "backoff",
            SchedulerState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall-clock time derived from a monotonic instant.
///
/// Cadence timestamps never go backwards even if the system clock does, and
/// they follow tokio's paused clock in tests.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    anchor_wall: DateTime<Utc>,
    anchor: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(wall: DateTime<Utc>) -> Self {
        Self {
            anchor_wall: wall,
            anchor: Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.anchor.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.anchor_wall + elapsed
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// TickReport
// ---------------------------------------------------------------------------

/// What happened to one action during a tick.
#[derive(Debug, Clone, Serialize)]
pub struct ActionRun {
    pub kind: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ActionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ActionFailure>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub started_at: Option<DateTime<Utc>>,
    pub runs: Vec<ActionRun>,
    pub outcome: CycleOutcome,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct Scheduler<'a, P: Platform + ?Sized> {
    platform: &'a P,
    config: &'a Config,
    cancel: CancellationToken,
    clock: Clock,
    cadence: CadenceTracker,
    backoff: BackoffController,
    runner: ActionRunner,
    me: Option<User>,
    state: SchedulerState,
}

impl<'a, P: Platform + ?Sized> Scheduler<'a, P> {
    pub fn new(platform: &'a P, config: &'a Config, cancel: CancellationToken) -> Self {
        Self {
            platform,
            config,
            cancel,
            clock: Clock::new(),
            cadence: CadenceTracker::from_config(config),
            backoff: BackoffController::from_config(config),
            runner: ActionRunner::new(),
            me: None,
            state: SchedulerState::Connecting,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cadence(&self) -> &CadenceTracker {
        &self.cadence
    }

    pub fn me(&self) -> Option<&User> {
        self.me.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.backoff.consecutive_failures()
    }

    fn transition(&mut self, next: SchedulerState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "scheduler state");
            self.state = next;
        }
    }

    fn stop(&mut self, reason: StopReason) -> StopReason {
        self.transition(SchedulerState::Stopped);
        if reason.is_fatal() {
            error!(
                reason = %reason,
                failures = self.backoff.consecutive_failures(),
                "bot stopped"
            );
        } else {
            info!(reason = %reason, "bot stopped");
        }
        reason
    }

    // -----------------------------------------------------------------------
    // Connecting
    // -----------------------------------------------------------------------

    /// Verify credentials and remember the authenticated account.
    pub async fn connect(&mut self) -> Result<&User> {
        self.transition(SchedulerState::Connecting);
        match self.platform.verify_credentials().await {
            Ok(user) => {
                info!(id = %user.id, "authenticated as @{}", user.username);
                self.transition(SchedulerState::Running);
                Ok(self.me.insert(user))
            }
            Err(e) => {
                error!("authentication failed: {e}");
                self.transition(SchedulerState::Stopped);
                Err(ChirpError::Authentication(e))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run every due action once, in priority order.
    pub async fn tick(&mut self) -> Result<TickReport> {
        let Some(me) = self.me.as_ref() else {
            return Err(ChirpError::NotConnected);
        };
        let ctx = ActionContext {
            platform: self.platform,
            me,
            config: self.config,
        };

        let started = self.clock.now();
        let mut report = TickReport {
            started_at: Some(started),
            ..Default::default()
        };
        if self.cancel.is_cancelled() {
            return Ok(report);
        }

        let due = self.cadence.due(started);
        if due.is_empty() {
            debug!(
                next_due_in = ?self.cadence.next_due_in(started),
                "no actions due"
            );
        }

        for (i, kind) in due.into_iter().enumerate() {
            if i > 0 {
                ctx.courtesy_pause().await;
            }
            if self.cancel.is_cancelled() {
                debug!(action = %kind, "cancelled before action");
                break;
            }

            let attempted_at = self.clock.now();
            info!(action = %kind, "running action");
            let result = AssertUnwindSafe(self.runner.run(kind, &ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let message = panic_message(&*panic);
                    error!(action = %kind, "action panicked: {message}");
                    Err(ActionFailure::new(
                        FailureKind::Unknown,
                        format!("panicked: {message}"),
                    ))
                });

            match result {
                Ok(action_report) => {
                    info!(action = %kind, "action done: {action_report}");
                    self.cadence.mark_ran(kind, attempted_at);
                    report.outcome.record_success(kind);
                    report.runs.push(ActionRun {
                        kind,
                        report: Some(action_report),
                        failure: None,
                    });
                }
                Err(failure) => {
                    warn!(
                        action = %kind,
                        kind = %failure.kind,
                        "action failed: {}",
                        failure.message
                    );
                    report.outcome.record_failure(kind, failure.kind);
                    report.runs.push(ActionRun {
                        kind,
                        report: None,
                        failure: Some(failure),
                    });
                }
            }
        }

        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Loop
    // -----------------------------------------------------------------------

    /// Connect (if needed) and run until cancelled or a fatal stop.
    pub async fn run(&mut self) -> Result<StopReason> {
        if self.me.is_none() {
            self.connect().await?;
        }

        loop {
            if self.cancel.is_cancelled() {
                return Ok(self.stop(StopReason::Cancelled));
            }

            let tick = self.tick().await?;
            if self.cancel.is_cancelled() {
                return Ok(self.stop(StopReason::Cancelled));
            }
            let decision = self.backoff.on_cycle_complete(&tick.outcome);
            match decision {
                BackoffDecision::Stop(reason) => return Ok(self.stop(reason)),
                BackoffDecision::Sleep { delay, backing_off } => {
                    if backing_off {
                        self.transition(SchedulerState::Backoff);
                        warn!(
                            failures = self.backoff.consecutive_failures(),
                            kind = ?tick.outcome.failure_kind(),
                            delay_secs = delay.as_secs(),
                            "cycle failed, backing off"
                        );
                    } else {
                        self.transition(SchedulerState::Running);
                        debug!(
                            actions = tick.outcome.attempted.len(),
                            delay_secs = delay.as_secs(),
                            "cycle complete"
                        );
                    }

                    let cancel = self.cancel.clone();
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return Ok(self.stop(StopReason::Cancelled));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Connect (if needed) and run exactly one tick.
    pub async fn run_once(&mut self) -> Result<TickReport> {
        if self.me.is_none() {
            self.connect().await?;
        }
        let report = self.tick().await?;
        let failures = report.outcome.failures.len();
        if failures > 0 {
            warn!(failures, "tick finished with failures");
        } else {
            info!(actions = report.outcome.attempted.len(), "tick finished");
        }
        Ok(report)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
