//! Cycle-level failure accounting and inter-cycle delays.

use crate::classifier::FailureKind;
use crate::config::{BackoffConfig, Config};
use crate::types::ActionKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ForbiddenPolicy
// ---------------------------------------------------------------------------

/// How a `Forbidden` failure affects the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForbiddenPolicy {
    /// Count it like any other failed cycle.
    #[default]
    Absorb,
    /// Stop the bot on the first cycle that hits it.
    Fatal,
}

// ---------------------------------------------------------------------------
// CycleOutcome
// ---------------------------------------------------------------------------

/// Failures collected over one scheduler tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleOutcome {
    pub attempted: Vec<ActionKind>,
    pub failures: Vec<(ActionKind, FailureKind)>,
}

impl CycleOutcome {
    pub fn record_success(&mut self, kind: ActionKind) {
        self.attempted.push(kind);
    }

    /// `AlreadyDone` is recorded as a success.
    pub fn record_failure(&mut self, kind: ActionKind, failure: FailureKind) {
        self.attempted.push(kind);
        if failure.is_failure() {
            self.failures.push((kind, failure));
        }
    }

    pub fn any_failure(&self) -> bool {
        !self.failures.is_empty()
    }

    /// The most severe failure kind in the cycle.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failures
            .iter()
            .map(|(_, k)| *k)
            .max_by_key(|k| k.severity())
    }

    pub fn contains(&self, kind: FailureKind) -> bool {
        self.failures.iter().any(|(_, k)| *k == kind)
    }
}

// ---------------------------------------------------------------------------
// StopReason / BackoffDecision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// Shutdown was requested.
    Cancelled,
    /// `failures` consecutive cycles failed.
    FailureThreshold { failures: u32 },
    /// A cycle hit `Forbidden` under [`ForbiddenPolicy::Fatal`].
    Forbidden,
}

impl StopReason {
    /// True for the stops that should end the process with a failure code.
    pub fn is_fatal(self) -> bool {
        !matches!(self, StopReason::Cancelled)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::FailureThreshold { failures } => {
                write!(f, "{failures} consecutive failed cycles")
            }
            StopReason::Forbidden => write!(f, "forbidden by the API (fatal policy)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffDecision {
    Sleep { delay: Duration, backing_off: bool },
    Stop(StopReason),
}

// ---------------------------------------------------------------------------
// BackoffController
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BackoffController {
    steady: Duration,
    base: Duration,
    cap: Duration,
    fatal_threshold: u32,
    forbidden_policy: ForbiddenPolicy,
    consecutive_failures: u32,
}

impl BackoffController {
    pub fn new(steady: Duration, config: &BackoffConfig) -> Self {
        Self {
            steady,
            base: Duration::from_secs(config.base_secs),
            cap: Duration::from_secs(config.cap_secs),
            fatal_threshold: config.fatal_threshold.max(1),
            forbidden_policy: config.forbidden_policy,
            consecutive_failures: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.schedule.steady_interval(), &config.backoff)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn on_cycle_complete(&mut self, outcome: &CycleOutcome) -> BackoffDecision {
        if !outcome.any_failure() {
            self.consecutive_failures = 0;
            return BackoffDecision::Sleep {
                delay: self.steady,
                backing_off: false,
            };
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if self.forbidden_policy == ForbiddenPolicy::Fatal
            && outcome.contains(FailureKind::Forbidden)
        {
            return BackoffDecision::Stop(StopReason::Forbidden);
        }
        if self.consecutive_failures >= self.fatal_threshold {
            return BackoffDecision::Stop(StopReason::FailureThreshold {
                failures: self.consecutive_failures,
            });
        }
        BackoffDecision::Sleep {
            delay: self.delay_for(self.consecutive_failures),
            backing_off: true,
        }
    }

    /// `min(base * 2^(n-1), cap)`, saturating at `cap`.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return self.steady;
        }
        let factor = 1u32.checked_shl(failures - 1);
        factor
            .and_then(|f| self.base.checked_mul(f))
            .map_or(self.cap, |d| d.min(self.cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(policy: ForbiddenPolicy) -> BackoffController {
        let mut cfg = Config::default();
        cfg.backoff.forbidden_policy = policy;
        BackoffController::from_config(&cfg)
    }

    fn failed(kind: FailureKind) -> CycleOutcome {
        let mut out = CycleOutcome::default();
        out.record_failure(ActionKind::Post, kind);
        out
    }

    fn sleep_secs(decision: BackoffDecision) -> u64 {
        match decision {
            BackoffDecision::Sleep { delay, .. } => delay.as_secs(),
            other => panic!("expected sleep, got {other:?}"),
        }
    }

    #[test]
    fn doubling_sequence_then_stop() {
        let mut b = controller(ForbiddenPolicy::Absorb);
        let outcome = failed(FailureKind::Transient);
        let delays: Vec<u64> = (0..4)
            .map(|_| sleep_secs(b.on_cycle_complete(&outcome)))
            .collect();
        assert_eq!(delays, vec![300, 600, 1200, 2400]);
        assert_eq!(b.delay_for(5), Duration::from_secs(3600));
        assert_eq!(
            b.on_cycle_complete(&outcome),
            BackoffDecision::Stop(StopReason::FailureThreshold { failures: 5 })
        );
    }

    #[test]
    fn success_resets_and_sleeps_steady() {
        let mut b = controller(ForbiddenPolicy::Absorb);
        b.on_cycle_complete(&failed(FailureKind::RateLimited));
        b.on_cycle_complete(&failed(FailureKind::RateLimited));
        assert_eq!(b.consecutive_failures(), 2);

        let decision = b.on_cycle_complete(&CycleOutcome::default());
        assert_eq!(
            decision,
            BackoffDecision::Sleep {
                delay: Duration::from_secs(100),
                backing_off: false
            }
        );
        assert_eq!(b.consecutive_failures(), 0);
        assert_eq!(sleep_secs(b.on_cycle_complete(&failed(FailureKind::Unknown))), 300);
    }

    #[test]
    fn already_done_is_not_counted() {
        let mut b = controller(ForbiddenPolicy::Absorb);
        let outcome = failed(FailureKind::AlreadyDone);
        assert!(!outcome.any_failure());
        assert_eq!(outcome.attempted, vec![ActionKind::Post]);
        b.on_cycle_complete(&outcome);
        assert_eq!(b.consecutive_failures(), 0);
    }

    #[test]
    fn delay_is_capped_and_saturates() {
        let b = controller(ForbiddenPolicy::Absorb);
        assert_eq!(b.delay_for(6), Duration::from_secs(3600));
        assert_eq!(b.delay_for(40), Duration::from_secs(3600));
        assert_eq!(b.delay_for(u32::MAX), Duration::from_secs(3600));
        let mut prev = Duration::ZERO;
        for n in 1..20 {
            let d = b.delay_for(n);
            assert!(d >= prev);
            prev = d;
        }
    }

    #[test]
    fn forbidden_is_fatal_only_under_fatal_policy() {
        let outcome = failed(FailureKind::Forbidden);

        let mut absorb = controller(ForbiddenPolicy::Absorb);
        assert_eq!(sleep_secs(absorb.on_cycle_complete(&outcome)), 300);

        let mut fatal = controller(ForbiddenPolicy::Fatal);
        assert_eq!(
            fatal.on_cycle_complete(&outcome),
            BackoffDecision::Stop(StopReason::Forbidden)
        );
    }

    #[test]
    fn failure_kind_is_most_severe() {
        let mut out = CycleOutcome::default();
        out.record_failure(ActionKind::Like, FailureKind::Transient);
        out.record_failure(ActionKind::Post, FailureKind::RateLimited);
        out.record_success(ActionKind::FollowBack);
        assert_eq!(out.failure_kind(), Some(FailureKind::RateLimited));
        assert_eq!(out.attempted.len(), 3);
        assert_eq!(CycleOutcome::default().failure_kind(), None);
    }

    #[test]
    fn threshold_of_one_stops_on_first_failure() {
        let mut cfg = Config::default();
        cfg.backoff.fatal_threshold = 1;
        let mut b = BackoffController::from_config(&cfg);
        assert!(matches!(
            b.on_cycle_complete(&failed(FailureKind::Transient)),
            BackoffDecision::Stop(StopReason::FailureThreshold { failures: 1 })
        ));
    }
}
