// Screening Domain Model

use crate::domain::check::{CheckKind, CheckOutcome, CheckState};
use crate::domain::error::{DomainError, Result};
use crate::domain::imo::Imo;
use crate::domain::severity::{ScreeningStatus, Severity, SeverityChange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Screening ID (UUID v4)
pub type ScreeningId = String;

/// Result recorded against incomplete checks by the killer
pub const TIMED_OUT_REASON: &str = "screening timed out";

/// Compliance evaluation of one ship for one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screening {
    pub id: ScreeningId,
    pub account_id: String,
    pub imo: Imo,

    pub status: ScreeningStatus,
    pub severity: Option<Severity>,
    /// Severity of the last completed run, kept across re-scheduling
    pub previous_severity: Option<Severity>,
    pub severity_change: Option<SeverityChange>,

    pub checks: BTreeMap<CheckKind, CheckState>,

    pub created_at: i64, // epoch ms
    pub scheduled_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub updated_at: i64,
}

/// Transition applied to a single check by a worker
#[derive(Debug, Clone, PartialEq)]
pub enum CheckTransition {
    Start,
    Complete(CheckOutcome),
}

/// Snapshot of a completed screening, taken before it is re-scheduled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub screening_id: ScreeningId,
    pub severity: Option<Severity>,
    pub severity_change: Option<SeverityChange>,
    pub checks: BTreeMap<CheckKind, CheckState>,
    pub completed_at: Option<i64>,
    pub recorded_at: i64,
}

impl Screening {
    /// Create a screening with every check in CREATED state
    ///
    /// # Arguments
    ///
    /// * `id` - Unique screening ID (injected, not generated)
    /// * `account_id` - Owning account
    /// * `imo` - Screened ship
    /// * `now_millis` - Creation timestamp in epoch ms (injected)
    pub fn new(
        id: impl Into<String>,
        account_id: impl Into<String>,
        imo: Imo,
        now_millis: i64,
    ) -> Self {
        let checks = CheckKind::ALL
            .into_iter()
            .map(|kind| (kind, CheckState::created(now_millis)))
            .collect();

        Self {
            id: id.into(),
            account_id: account_id.into(),
            imo,
            status: ScreeningStatus::Created,
            severity: None,
            previous_severity: None,
            severity_change: None,
            checks,
            created_at: now_millis,
            scheduled_at: None,
            completed_at: None,
            updated_at: now_millis,
        }
    }

    pub fn check(&self, kind: CheckKind) -> Option<&CheckState> {
        self.checks.get(&kind)
    }

    pub fn incomplete_checks(&self) -> usize {
        self.checks.values().filter(|c| !c.is_done()).count()
    }

    /// Reset every check to SCHEDULED.
    ///
    /// Returns the history snapshot to persist when the screening had
    /// completed before.
    pub fn schedule(&mut self, now_millis: i64) -> Option<HistoryEntry> {
        let snapshot = (self.status == ScreeningStatus::Done).then(|| HistoryEntry {
            screening_id: self.id.clone(),
            severity: self.severity,
            severity_change: self.severity_change,
            checks: self.checks.clone(),
            completed_at: self.completed_at,
            recorded_at: now_millis,
        });

        if self.status == ScreeningStatus::Done {
            self.previous_severity = self.severity;
        }

        for state in self.checks.values_mut() {
            *state = CheckState {
                status: ScreeningStatus::Scheduled,
                severity: None,
                result: None,
                updated_at: now_millis,
            };
        }

        self.status = ScreeningStatus::Scheduled;
        self.severity = None;
        self.severity_change = None;
        self.scheduled_at = Some(now_millis);
        self.updated_at = now_millis;

        snapshot
    }

    /// `StaleRun` unless the current run was scheduled at `scheduled_at`
    pub fn ensure_run(&self, scheduled_at: i64) -> Result<()> {
        if self.scheduled_at == Some(scheduled_at) {
            return Ok(());
        }
        Err(DomainError::StaleRun {
            screening: self.id.clone(),
            expected: scheduled_at,
        })
    }

    /// Apply a worker transition to one check and refresh the aggregate
    pub fn apply_check(
        &mut self,
        kind: CheckKind,
        transition: CheckTransition,
        now_millis: i64,
    ) -> Result<()> {
        let subject = format!("{}/{}", self.id, kind);
        let state = self
            .checks
            .get_mut(&kind)
            .ok_or_else(|| DomainError::ValidationError(format!("{} has no check {}", self.id, kind)))?;

        match transition {
            CheckTransition::Start => match state.status {
                ScreeningStatus::Scheduled | ScreeningStatus::InProgress => {
                    state.status = ScreeningStatus::InProgress;
                    state.updated_at = now_millis;
                }
                other => {
                    return Err(DomainError::InvalidStateTransition {
                        subject,
                        from: other.to_string(),
                        to: ScreeningStatus::InProgress.to_string(),
                    })
                }
            },
            CheckTransition::Complete(outcome) => match state.status {
                ScreeningStatus::Scheduled | ScreeningStatus::InProgress => {
                    state.status = ScreeningStatus::Done;
                    state.severity = Some(outcome.severity);
                    state.result = Some(outcome.result);
                    state.updated_at = now_millis;
                }
                other => {
                    return Err(DomainError::InvalidStateTransition {
                        subject,
                        from: other.to_string(),
                        to: ScreeningStatus::Done.to_string(),
                    })
                }
            },
        }

        self.refresh(now_millis);
        Ok(())
    }

    /// Force every incomplete check to DONE/UNKNOWN. Returns how many changed.
    pub fn force_complete(&mut self, now_millis: i64) -> usize {
        let mut forced = 0;
        for state in self.checks.values_mut().filter(|c| !c.is_done()) {
            let outcome = CheckOutcome::unknown(TIMED_OUT_REASON);
            state.status = ScreeningStatus::Done;
            state.severity = Some(outcome.severity);
            state.result = Some(outcome.result);
            state.updated_at = now_millis;
            forced += 1;
        }
        self.refresh(now_millis);
        forced
    }

    /// Recompute overall status and severity from the checks
    pub fn refresh(&mut self, now_millis: i64) {
        let status = ScreeningStatus::aggregate(self.checks.values().map(|c| c.status));
        self.severity = Severity::aggregate(
            self.checks
                .values()
                .filter(|c| c.is_done())
                .filter_map(|c| c.severity),
        );

        if status == ScreeningStatus::Done && self.status != ScreeningStatus::Done {
            self.completed_at = Some(now_millis);
            self.severity_change = SeverityChange::between(self.previous_severity, self.severity);
        }

        self.status = status;
        self.updated_at = now_millis;
    }

    /// Never screened, or completed longer ago than the re-screen interval
    pub fn is_stale(&self, now_millis: i64, rescreen_interval_ms: i64) -> bool {
        match self.status {
            ScreeningStatus::Created => true,
            ScreeningStatus::Done => self
                .completed_at
                .map_or(true, |completed| now_millis - completed >= rescreen_interval_ms),
            ScreeningStatus::Scheduled | ScreeningStatus::InProgress => false,
        }
    }

    /// Scheduled or running for longer than the timeout
    pub fn is_stuck(&self, now_millis: i64, timeout_ms: i64) -> bool {
        matches!(
            self.status,
            ScreeningStatus::Scheduled | ScreeningStatus::InProgress
        ) && self
            .scheduled_at
            .is_some_and(|scheduled| now_millis - scheduled > timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn screening() -> Screening {
        Screening::new("scr-1", "acct-1", Imo::parse("9074729").unwrap(), 1000)
    }

    fn complete_all(s: &mut Screening, severity: Severity, now: i64) {
        for kind in CheckKind::ALL {
            s.apply_check(kind, CheckTransition::Start, now).unwrap();
            s.apply_check(
                kind,
                CheckTransition::Complete(CheckOutcome::new(severity, json!({}))),
                now,
            )
            .unwrap();
        }
    }

    #[test]
    fn test_new_screening_is_created() {
        let s = screening();
        assert_eq!(s.status, ScreeningStatus::Created);
        assert_eq!(s.checks.len(), 18);
        assert!(s.is_stale(1000, 10));
    }

    #[test]
    fn test_schedule_resets_checks() {
        let mut s = screening();
        assert!(s.schedule(2000).is_none(), "no snapshot before first run");
        assert_eq!(s.status, ScreeningStatus::Scheduled);
        assert_eq!(s.scheduled_at, Some(2000));
        assert!(s
            .checks
            .values()
            .all(|c| c.status == ScreeningStatus::Scheduled));
    }

    #[test]
    fn test_partial_progress_is_in_progress() {
        let mut s = screening();
        s.schedule(2000);
        s.apply_check(CheckKind::ShipFlag, CheckTransition::Start, 2100)
            .unwrap();
        assert_eq!(s.status, ScreeningStatus::InProgress);

        s.apply_check(
            CheckKind::ShipFlag,
            CheckTransition::Complete(CheckOutcome::new(Severity::Warning, json!({}))),
            2200,
        )
        .unwrap();
        assert_eq!(s.status, ScreeningStatus::InProgress);
        assert_eq!(s.severity, Some(Severity::Warning));
        assert!(s.completed_at.is_none());
    }

    #[test]
    fn test_all_done_aggregates_max_severity() {
        let mut s = screening();
        s.schedule(2000);
        complete_all(&mut s, Severity::Ok, 3000);
        s.checks.get_mut(&CheckKind::PortVisits).unwrap().severity = Some(Severity::Critical);
        s.refresh(3000);

        assert_eq!(s.status, ScreeningStatus::Done);
        assert_eq!(s.severity, Some(Severity::Critical));
        assert_eq!(s.completed_at, Some(3000));
        assert_eq!(s.severity_change, None, "first run has nothing to compare to");
    }

    #[test]
    fn test_reschedule_snapshots_and_tracks_change() {
        let mut s = screening();
        s.schedule(2000);
        complete_all(&mut s, Severity::Ok, 3000);

        let snapshot = s.schedule(4000).expect("completed screening is snapshotted");
        assert_eq!(snapshot.severity, Some(Severity::Ok));
        assert_eq!(snapshot.completed_at, Some(3000));
        assert_eq!(s.previous_severity, Some(Severity::Ok));
        assert_eq!(s.severity, None);

        complete_all(&mut s, Severity::Warning, 5000);
        assert_eq!(s.severity_change, Some(SeverityChange::Increased));
    }

    #[test]
    fn test_cannot_complete_unscheduled_check() {
        let mut s = screening();
        let err = s.apply_check(
            CheckKind::ShipSanction,
            CheckTransition::Complete(CheckOutcome::new(Severity::Ok, json!({}))),
            2000,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_cannot_restart_done_check() {
        let mut s = screening();
        s.schedule(2000);
        s.apply_check(
            CheckKind::ShipSanction,
            CheckTransition::Complete(CheckOutcome::new(Severity::Ok, json!({}))),
            2100,
        )
        .unwrap();
        assert!(s
            .apply_check(CheckKind::ShipSanction, CheckTransition::Start, 2200)
            .is_err());
    }

    #[test]
    fn test_force_complete_marks_unknown() {
        let mut s = screening();
        s.schedule(2000);
        s.apply_check(
            CheckKind::ShipSanction,
            CheckTransition::Complete(CheckOutcome::new(Severity::Ok, json!({}))),
            2100,
        )
        .unwrap();

        let forced = s.force_complete(9000);
        assert_eq!(forced, 17);
        assert_eq!(s.status, ScreeningStatus::Done);
        assert_eq!(s.severity, Some(Severity::Unknown));
        assert_eq!(
            s.check(CheckKind::ShipSanction).unwrap().severity,
            Some(Severity::Ok)
        );
    }

    #[test]
    fn test_stale_and_stuck() {
        let mut s = screening();
        s.schedule(0);
        assert!(!s.is_stale(100, 10));
        assert!(s.is_stuck(100, 10));
        assert!(!s.is_stuck(5, 10));

        complete_all(&mut s, Severity::Ok, 50);
        assert!(!s.is_stuck(10_000, 10));
        assert!(!s.is_stale(55, 10));
        assert!(s.is_stale(60, 10));
    }
}
