//! Session data model — per-step outcomes and finalized session records.
//!
//! Serialized field names are camelCase (`stepNumber`, `dropOffStep`, ...)
//! so the storage format matches the wire format consumed by the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::funnel::{FUNNEL_STEPS, STEP_COUNT};

/// Outcome of one funnel step within one session.
///
/// Created `completed = false` when the session starts and mutated exactly
/// once, when that step is completed in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    /// 1-based step number.
    pub step_number: u32,
    /// Step display name, denormalized for the storage format.
    pub step_name: String,
    /// Whether the user completed this step.
    pub completed: bool,
    /// When the step was completed, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl StepOutcome {
    /// Seed one pending outcome per funnel step, in order.
    pub fn seed_all() -> Vec<StepOutcome> {
        FUNNEL_STEPS
            .iter()
            .map(|step| StepOutcome {
                step_number: step.id,
                step_name: step.name.to_string(),
                completed: false,
                timestamp: None,
            })
            .collect()
    }
}

/// A finalized session, immutable once created.
///
/// `drop_off_step` is `None` iff all steps were completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Unique record id.
    pub id: String,
    /// Id of the simulated user, unique per session.
    pub user_id: String,
    /// One outcome per funnel step, index-aligned to the funnel.
    pub steps: Vec<StepOutcome>,
    /// When the session terminated (completion or drop-off).
    pub completed_at: DateTime<Utc>,
    /// The step the user was on when they left, or `None` on full completion.
    pub drop_off_step: Option<u32>,
}

impl SessionRecord {
    /// Whether every funnel step was completed.
    pub fn is_complete(&self) -> bool {
        self.steps.iter().filter(|s| s.completed).count() == STEP_COUNT
    }

    /// How many steps were completed.
    pub fn steps_completed(&self) -> usize {
        self.steps.iter().filter(|s| s.completed).count()
    }
}
