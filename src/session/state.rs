//! Session state machine — tracks one user's traversal through the funnel.
//!
//! A session moves linearly: Active(step 1) → ... → Active(step N) →
//! Completed, or Active(step s) → Abandoned at any point. Both terminal
//! transitions emit a [`SessionRecord`]. `current_step` only ever increases;
//! step outcomes are completed contiguously from step 1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::funnel::{self, STEP_COUNT};
use crate::session::model::{SessionRecord, StepOutcome};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// The user is on some step 1..=N.
    Active,
    /// All steps finished. Terminal.
    Completed,
    /// Dropped off before finishing. Terminal.
    Abandoned,
}

impl SessionPhase {
    /// Whether the session can no longer accept step events.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        };
        write!(f, "{s}")
    }
}

/// One in-flight simulated session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique per session, derived from creation time.
    pub user_id: String,
    /// 1-based step the user is on. Reaches `N + 1` as a terminal
    /// display sentinel once all steps are completed.
    pub current_step: u32,
    /// One outcome per funnel step, index-aligned to the funnel.
    pub steps: Vec<StepOutcome>,
    /// When the session started.
    pub start_time: DateTime<Utc>,
    /// When the session terminated, if it has.
    pub end_time: Option<DateTime<Utc>>,
    phase: SessionPhase,
}

impl Session {
    /// Start a fresh session on step 1 with all outcomes pending.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            user_id: format!("user_{}", now.timestamp_nanos_opt().unwrap_or_default()),
            current_step: 1,
            steps: StepOutcome::seed_all(),
            start_time: now,
            end_time: None,
            phase: SessionPhase::Active,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Fraction of the funnel completed, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        (self.current_step - 1) as f64 / STEP_COUNT as f64
    }

    /// Mark the current step completed.
    ///
    /// On steps 1..N the session stays active and moves to the next step.
    /// On the final step the session terminates: `end_time` is set, the
    /// finalized [`SessionRecord`] is returned (with `drop_off_step = None`)
    /// and `current_step` advances to the `N + 1` sentinel.
    pub fn complete_current_step(&mut self) -> Result<Option<SessionRecord>, SessionError> {
        self.ensure_active("complete a step")?;

        let now = Utc::now();
        let index = (self.current_step - 1) as usize;
        self.steps[index].completed = true;
        self.steps[index].timestamp = Some(now);

        if (self.current_step as usize) < STEP_COUNT {
            self.current_step += 1;
            return Ok(None);
        }

        // Final step: terminate and emit the record.
        self.end_time = Some(now);
        self.phase = SessionPhase::Completed;
        self.current_step += 1;
        Ok(Some(self.to_record(None, now)))
    }

    /// Abandon the session on the step the user has not yet completed.
    ///
    /// Terminates the session and returns the finalized record with
    /// `drop_off_step` set to the current step.
    pub fn abandon(&mut self) -> Result<SessionRecord, SessionError> {
        self.ensure_active("abandon")?;

        let now = Utc::now();
        self.end_time = Some(now);
        self.phase = SessionPhase::Abandoned;
        Ok(self.to_record(Some(self.current_step), now))
    }

    /// Display projection for the presentation layer.
    pub fn view(&self) -> SessionView {
        let steps = self
            .steps
            .iter()
            .map(|outcome| {
                let status = if outcome.completed {
                    StepStatus::Completed
                } else if outcome.step_number == self.current_step {
                    StepStatus::Current
                } else {
                    StepStatus::Pending
                };
                StepView {
                    step_number: outcome.step_number,
                    name: outcome.step_name.clone(),
                    description: funnel::step(outcome.step_number)
                        .map(|s| s.description)
                        .unwrap_or_default(),
                    status,
                }
            })
            .collect();

        SessionView {
            user_id: self.user_id.clone(),
            phase: self.phase,
            current_step: self.current_step,
            progress: self.progress(),
            steps,
            processing: false,
        }
    }

    fn ensure_active(&self, operation: &str) -> Result<(), SessionError> {
        if self.phase.is_terminal() {
            return Err(SessionError::AlreadyTerminal {
                phase: self.phase.to_string(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn to_record(&self, drop_off_step: Option<u32>, completed_at: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: self.user_id.clone(),
            steps: self.steps.clone(),
            completed_at,
            drop_off_step,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-step display status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Current,
    Pending,
}

/// One step in the display projection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub step_number: u32,
    pub name: String,
    pub description: &'static str,
    pub status: StepStatus,
}

/// Snapshot of the active session for the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user_id: String,
    pub phase: SessionPhase,
    pub current_step: u32,
    /// `(current_step - 1) / N`.
    pub progress: f64,
    pub steps: Vec<StepView>,
    /// Whether a step completion is mid-flight (UI should be busy).
    pub processing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_at_step_one() {
        let session = Session::new();
        assert_eq!(session.current_step, 1);
        assert_eq!(session.phase(), SessionPhase::Active);
        assert!(session.end_time.is_none());
        assert!(session.steps.iter().all(|s| !s.completed));
        assert!(session.user_id.starts_with("user_"));
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn current_step_is_monotonic_and_completion_contiguous() {
        let mut session = Session::new();
        let mut previous = session.current_step;
        for _ in 0..STEP_COUNT {
            session.complete_current_step().unwrap();
            assert!(session.current_step > previous);
            previous = session.current_step;
            // Every completed outcome lies strictly before current_step
            for outcome in &session.steps {
                if outcome.completed {
                    assert!(outcome.step_number < session.current_step);
                    assert!(outcome.timestamp.is_some());
                } else {
                    assert!(outcome.step_number >= session.current_step);
                }
            }
        }
    }

    #[test]
    fn completing_all_steps_emits_one_complete_record() {
        let mut session = Session::new();
        for _ in 0..STEP_COUNT - 1 {
            assert!(session.complete_current_step().unwrap().is_none());
        }
        let record = session
            .complete_current_step()
            .unwrap()
            .expect("final step should emit a record");

        assert!(record.drop_off_step.is_none());
        assert!(record.is_complete());
        assert_eq!(session.phase(), SessionPhase::Completed);
        assert_eq!(session.current_step, STEP_COUNT as u32 + 1);
        assert_eq!(session.progress(), 1.0);
        assert!(session.end_time.is_some());
    }

    #[test]
    fn abandon_on_first_step_records_drop_off_one() {
        let mut session = Session::new();
        let record = session.abandon().unwrap();
        assert_eq!(record.drop_off_step, Some(1));
        assert!(record.steps.iter().all(|s| !s.completed));
        assert_eq!(session.phase(), SessionPhase::Abandoned);
    }

    #[test]
    fn abandon_mid_funnel_records_the_uncompleted_step() {
        let mut session = Session::new();
        session.complete_current_step().unwrap();
        session.complete_current_step().unwrap();
        // Now on step 3, which is not completed yet
        let record = session.abandon().unwrap();
        assert_eq!(record.drop_off_step, Some(3));
        assert_eq!(record.steps_completed(), 2);
    }

    #[test]
    fn drop_off_is_none_iff_all_steps_completed() {
        for abandon_at in 1..=STEP_COUNT as u32 {
            let mut session = Session::new();
            for _ in 1..abandon_at {
                session.complete_current_step().unwrap();
            }
            let record = session.abandon().unwrap();
            assert_eq!(record.drop_off_step, Some(abandon_at));
            assert!(!record.is_complete());
        }
    }

    #[test]
    fn terminal_sessions_reject_further_events() {
        let mut completed = Session::new();
        for _ in 0..STEP_COUNT {
            completed.complete_current_step().unwrap();
        }
        assert!(matches!(
            completed.complete_current_step(),
            Err(SessionError::AlreadyTerminal { .. })
        ));
        assert!(matches!(
            completed.abandon(),
            Err(SessionError::AlreadyTerminal { .. })
        ));

        let mut abandoned = Session::new();
        abandoned.abandon().unwrap();
        assert!(matches!(
            abandoned.complete_current_step(),
            Err(SessionError::AlreadyTerminal { .. })
        ));
    }

    #[test]
    fn view_tracks_step_statuses() {
        let mut session = Session::new();
        session.complete_current_step().unwrap();

        let view = session.view();
        assert_eq!(view.current_step, 2);
        assert_eq!(view.steps[0].status, StepStatus::Completed);
        assert_eq!(view.steps[1].status, StepStatus::Current);
        assert_eq!(view.steps[2].status, StepStatus::Pending);
        assert!((view.progress - 0.2).abs() < f64::EPSILON);
        assert!(!view.processing);
    }

    #[test]
    fn terminal_view_has_no_current_step() {
        let mut session = Session::new();
        for _ in 0..STEP_COUNT {
            session.complete_current_step().unwrap();
        }
        let view = session.view();
        assert!(view.steps.iter().all(|s| s.status == StepStatus::Completed));
        assert_eq!(view.progress, 1.0);
    }
}
