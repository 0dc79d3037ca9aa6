//! Session system — the simulated traversal of one user through the funnel.
//!
//! A session is owned exclusively by the [`Simulator`] while active. It
//! advances step by step until the user either finishes all steps or drops
//! off; either way a [`SessionRecord`] is emitted and appended to the store.

pub mod model;
pub mod simulator;
pub mod state;

pub use model::{SessionRecord, StepOutcome};
pub use simulator::{AdvanceOutcome, Simulator};
pub use state::{Session, SessionPhase, SessionView, StepStatus, StepView};
