//! Per-action cadence bookkeeping.
//!
//! Each action has a minimum interval and the time it last ran. Due-ness is
//! level-triggered: an action that was not run for many intervals fires once
//! on the next tick, there is no catch-up.

use crate::config::Config;
use crate::types::ActionKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ActionSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSpec {
    pub kind: ActionKind,
    #[serde(with = "secs")]
    pub min_interval: Duration,
    pub last_run_at: Option<DateTime<Utc>>,
    pub enabled: bool,
}

impl ActionSpec {
    pub fn new(kind: ActionKind, min_interval: Duration, enabled: bool) -> Self {
        Self {
            kind,
            min_interval,
            last_run_at: None,
            enabled,
        }
    }

    /// True when the action never ran or `min_interval` has elapsed since.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_run_at {
            None => true,
            // A negative elapsed time (clock went backwards) is never due.
            Some(last) => match (now - last).to_std() {
                Ok(elapsed) => elapsed >= self.min_interval,
                Err(_) => false,
            },
        }
    }

    /// Record a run. Timestamps never move backwards.
    pub fn mark_ran(&mut self, now: DateTime<Utc>) {
        match self.last_run_at {
            Some(last) if now < last => {}
            _ => self.last_run_at = Some(now),
        }
    }

    /// Time left until the action becomes due; zero when it already is.
    pub fn due_in(&self, now: DateTime<Utc>) -> Duration {
        let Some(last) = self.last_run_at else {
            return Duration::ZERO;
        };
        let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
        self.min_interval.saturating_sub(elapsed)
    }
}

mod secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}

// ---------------------------------------------------------------------------
// CadenceTracker
// ---------------------------------------------------------------------------

/// Specs for every known action, held in priority order.
#[derive(Debug, Clone)]
pub struct CadenceTracker {
    specs: Vec<ActionSpec>,
}

impl CadenceTracker {
    pub fn new(mut specs: Vec<ActionSpec>) -> Self {
        specs.sort_by_key(|s| s.kind);
        specs.dedup_by_key(|s| s.kind);
        Self { specs }
    }

    pub fn from_config(config: &Config) -> Self {
        let specs = ActionKind::all()
            .iter()
            .map(|&kind| {
                let settings = config.actions.settings(kind);
                ActionSpec::new(kind, settings.interval(kind), settings.enabled)
            })
            .collect();
        Self::new(specs)
    }

    /// Enabled actions that are due at `now`, in priority order.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<ActionKind> {
        self.specs
            .iter()
            .filter(|s| s.enabled && s.is_due(now))
            .map(|s| s.kind)
            .collect()
    }

    pub fn mark_ran(&mut self, kind: ActionKind, now: DateTime<Utc>) {
        if let Some(spec) = self.specs.iter_mut().find(|s| s.kind == kind) {
            spec.mark_ran(now);
        }
    }

    pub fn spec(&self, kind: ActionKind) -> Option<&ActionSpec> {
        self.specs.iter().find(|s| s.kind == kind)
    }

    pub fn specs(&self) -> &[ActionSpec] {
        &self.specs
    }

    /// Shortest wait until any enabled action is due. `None` when nothing is
    /// enabled.
    pub fn next_due_in(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.specs
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.due_in(now))
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + chrono::Duration::seconds(secs)
    }

    #[test]
    fn unset_spec_is_due() {
        let spec = ActionSpec::new(ActionKind::Post, Duration::from_secs(3600), true);
        assert!(spec.is_due(t0()));
        assert_eq!(spec.due_in(t0()), Duration::ZERO);
    }

    #[test]
    fn not_due_right_after_mark_ran() {
        let mut spec = ActionSpec::new(ActionKind::Post, Duration::from_secs(3600), true);
        spec.mark_ran(t0());
        assert!(!spec.is_due(t0()));
        assert!(!spec.is_due(at(3599)));
        assert!(spec.is_due(at(3600)));
        assert_eq!(spec.due_in(at(600)), Duration::from_secs(3000));
    }

    #[test]
    fn zero_interval_is_always_due() {
        let mut spec = ActionSpec::new(ActionKind::Like, Duration::ZERO, true);
        spec.mark_ran(t0());
        assert!(spec.is_due(t0()));
    }

    #[test]
    fn mark_ran_never_moves_backwards() {
        let mut spec = ActionSpec::new(ActionKind::Post, Duration::from_secs(60), true);
        spec.mark_ran(at(100));
        spec.mark_ran(at(50));
        assert_eq!(spec.last_run_at, Some(at(100)));
        // Earlier clock reading than the last run is not due.
        assert!(!spec.is_due(at(10)));
    }

    #[test]
    fn specs_are_independent() {
        let mut tracker = CadenceTracker::new(vec![
            ActionSpec::new(ActionKind::Post, Duration::from_secs(3600), true),
            ActionSpec::new(ActionKind::FollowBack, Duration::from_secs(21600), true),
        ]);
        assert_eq!(
            tracker.due(t0()),
            vec![ActionKind::Post, ActionKind::FollowBack]
        );

        tracker.mark_ran(ActionKind::Post, t0());
        tracker.mark_ran(ActionKind::FollowBack, t0());
        assert!(tracker.due(at(1)).is_empty());

        assert_eq!(tracker.due(at(3600)), vec![ActionKind::Post]);
        tracker.mark_ran(ActionKind::Post, at(3600));
        assert!(tracker.due(at(7199)).is_empty());
        assert_eq!(tracker.due(at(21600)), vec![ActionKind::Post, ActionKind::FollowBack]);
    }

    #[test]
    fn long_gap_fires_once() {
        let mut tracker = CadenceTracker::new(vec![ActionSpec::new(
            ActionKind::Post,
            Duration::from_secs(3600),
            true,
        )]);
        tracker.mark_ran(ActionKind::Post, t0());
        // Ten intervals later the action is due exactly once.
        assert_eq!(tracker.due(at(36_000)), vec![ActionKind::Post]);
        tracker.mark_ran(ActionKind::Post, at(36_000));
        assert!(tracker.due(at(36_001)).is_empty());
    }

    #[test]
    fn disabled_specs_are_never_due() {
        let tracker = CadenceTracker::from_config(&Config::default());
        assert_eq!(tracker.due(t0()), vec![ActionKind::Post]);
        assert_eq!(tracker.specs().len(), 4);
        assert!(!tracker.spec(ActionKind::Like).unwrap().enabled);
    }

    #[test]
    fn specs_sorted_by_priority() {
        let tracker = CadenceTracker::new(vec![
            ActionSpec::new(ActionKind::FollowBack, Duration::ZERO, true),
            ActionSpec::new(ActionKind::ReplyMentions, Duration::ZERO, true),
            ActionSpec::new(ActionKind::Post, Duration::ZERO, true),
        ]);
        let kinds: Vec<_> = tracker.specs().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![ActionKind::ReplyMentions, ActionKind::Post, ActionKind::FollowBack]
        );
    }

    #[test]
    fn next_due_in_picks_soonest_enabled() {
        let mut tracker = CadenceTracker::new(vec![
            ActionSpec::new(ActionKind::Post, Duration::from_secs(3600), true),
            ActionSpec::new(ActionKind::FollowBack, Duration::from_secs(600), false),
        ]);
        tracker.mark_ran(ActionKind::Post, t0());
        assert_eq!(tracker.next_due_in(at(100)), Some(Duration::from_secs(3500)));

        let idle = CadenceTracker::new(vec![]);
        assert_eq!(idle.next_due_in(t0()), None);
    }
}
