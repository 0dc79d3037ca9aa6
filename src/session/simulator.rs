//! Simulator — owns the single active session and drives it through the
//! funnel, appending finalized records to the store.
//!
//! Step completion is modeled as an asynchronous operation with an artificial
//! processing delay (a pretend backend round-trip). While it is in flight the
//! simulator is busy: competing start/complete/abandon calls are rejected
//! with [`SessionError::Busy`] rather than interleaved.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{Result, SessionError};
use crate::session::model::SessionRecord;
use crate::session::state::{Session, SessionPhase, SessionView};
use crate::store::FunnelStore;

/// Result of one `complete_current_step` call.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceOutcome {
    /// Phase after the advance.
    pub phase: SessionPhase,
    /// Step the session is now on (`N + 1` once completed).
    pub current_step: u32,
    /// Id of the appended record, when the advance terminated the session.
    pub record_id: Option<String>,
}

/// Drives one simulated session at a time.
pub struct Simulator {
    store: Arc<dyn FunnelStore>,
    session: RwLock<Session>,
    /// Held for the duration of any mutating operation. `try_lock` failure
    /// means a step is mid-flight and the event must be rejected.
    gate: Mutex<()>,
    /// Mirror of the gate for the display projection.
    processing: AtomicBool,
    processing_delay: Duration,
}

impl Simulator {
    /// Create a simulator with a fresh active session.
    pub fn new(store: Arc<dyn FunnelStore>, processing_delay: Duration) -> Self {
        Self {
            store,
            session: RwLock::new(Session::new()),
            gate: Mutex::new(()),
            processing: AtomicBool::new(false),
            processing_delay,
        }
    }

    /// Start a new session, discarding the current one.
    ///
    /// An unterminated session is dropped without being recorded.
    pub async fn start(&self) -> Result<SessionView> {
        let _gate = self.gate.try_lock().map_err(|_| SessionError::Busy)?;
        let mut session = self.session.write().await;
        let discarded = session.phase();
        *session = Session::new();
        info!(user_id = %session.user_id, ?discarded, "Started new session");
        Ok(session.view())
    }

    /// Complete the current step after the artificial processing delay.
    ///
    /// If this was the final step the session is finalized and the emitted
    /// record is appended to the store.
    pub async fn complete_current_step(&self) -> Result<AdvanceOutcome> {
        let _gate = self.gate.try_lock().map_err(|_| SessionError::Busy)?;

        // Fail fast on terminal sessions before pretending to do work.
        {
            let session = self.session.read().await;
            if session.phase().is_terminal() {
                return Err(SessionError::AlreadyTerminal {
                    phase: session.phase().to_string(),
                    operation: "complete a step".to_string(),
                }
                .into());
            }
        }

        self.processing.store(true, Ordering::SeqCst);
        let result = self.complete_inner().await;
        self.processing.store(false, Ordering::SeqCst);
        result
    }

    async fn complete_inner(&self) -> Result<AdvanceOutcome> {
        tokio::time::sleep(self.processing_delay).await;

        let (record, phase, current_step) = {
            let mut session = self.session.write().await;
            let record = session.complete_current_step()?;
            (record, session.phase(), session.current_step)
        };

        let record_id = match record {
            Some(record) => {
                self.append(&record).await?;
                info!(record_id = %record.id, user_id = %record.user_id, "Session completed");
                Some(record.id)
            }
            None => {
                debug!(current_step, "Advanced to next step");
                None
            }
        };

        Ok(AdvanceOutcome {
            phase,
            current_step,
            record_id,
        })
    }

    /// Abandon the current session, record the drop-off, and immediately
    /// start a fresh session.
    pub async fn abandon(&self) -> Result<AdvanceOutcome> {
        let _gate = self.gate.try_lock().map_err(|_| SessionError::Busy)?;

        let record = {
            let mut session = self.session.write().await;
            session.abandon()?
        };
        self.append(&record).await?;
        info!(
            record_id = %record.id,
            drop_off_step = record.drop_off_step,
            "Session abandoned"
        );

        // Abandon auto-resets: a fresh session is immediately available.
        let mut session = self.session.write().await;
        *session = Session::new();

        Ok(AdvanceOutcome {
            phase: session.phase(),
            current_step: session.current_step,
            record_id: Some(record.id),
        })
    }

    /// Snapshot of the active session for the presentation layer.
    pub async fn display(&self) -> SessionView {
        let mut view = self.session.read().await.view();
        view.processing = self.processing.load(Ordering::SeqCst);
        view
    }

    async fn append(&self, record: &SessionRecord) -> Result<()> {
        self.store.append_record(record).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::funnel::STEP_COUNT;
    use crate::store::LibSqlStore;

    async fn test_simulator(delay: Duration) -> Simulator {
        let store = Arc::new(LibSqlStore::new_memory().await.unwrap());
        Simulator::new(store, delay)
    }

    #[tokio::test]
    async fn completing_all_steps_appends_exactly_one_record() {
        let sim = test_simulator(Duration::ZERO).await;
        for expected in 2..=STEP_COUNT as u32 {
            let outcome = sim.complete_current_step().await.unwrap();
            assert_eq!(outcome.current_step, expected);
            assert_eq!(outcome.phase, SessionPhase::Active);
            assert!(outcome.record_id.is_none());
        }

        let outcome = sim.complete_current_step().await.unwrap();
        assert_eq!(outcome.phase, SessionPhase::Completed);
        assert_eq!(outcome.current_step, STEP_COUNT as u32 + 1);
        let record_id = outcome.record_id.expect("final step should record");

        let records = sim.store.load_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, record_id);
        assert!(records[0].drop_off_step.is_none());
    }

    #[tokio::test]
    async fn completing_after_terminal_fails_without_new_record() {
        let sim = test_simulator(Duration::ZERO).await;
        for _ in 0..STEP_COUNT {
            sim.complete_current_step().await.unwrap();
        }
        assert!(matches!(
            sim.complete_current_step().await,
            Err(Error::Session(SessionError::AlreadyTerminal { .. }))
        ));
        assert_eq!(sim.store.load_records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn abandon_records_and_auto_resets() {
        let sim = test_simulator(Duration::ZERO).await;
        let before = sim.display().await.user_id;

        let outcome = sim.abandon().await.unwrap();
        assert_eq!(outcome.phase, SessionPhase::Active);
        assert_eq!(outcome.current_step, 1);
        assert!(outcome.record_id.is_some());

        let records = sim.store.load_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].drop_off_step, Some(1));
        assert!(records[0].steps.iter().all(|s| !s.completed));
        assert_eq!(records[0].user_id, before);

        // Fresh session immediately available
        let view = sim.display().await;
        assert_eq!(view.current_step, 1);
        assert_eq!(view.phase, SessionPhase::Active);
    }

    #[tokio::test]
    async fn start_discards_unrecorded_session() {
        let sim = test_simulator(Duration::ZERO).await;
        sim.complete_current_step().await.unwrap();
        sim.complete_current_step().await.unwrap();

        sim.start().await.unwrap();
        let view = sim.display().await;
        assert_eq!(view.current_step, 1);
        // Nothing reached the store
        assert!(sim.store.load_records().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn competing_events_rejected_while_processing() {
        let sim = Arc::new(test_simulator(Duration::from_secs(1)).await);

        let worker = Arc::clone(&sim);
        let handle = tokio::spawn(async move { worker.complete_current_step().await });
        // Let the spawned task reach the processing sleep
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert!(sim.display().await.processing);
        assert!(matches!(
            sim.abandon().await,
            Err(Error::Session(SessionError::Busy))
        ));
        assert!(matches!(
            sim.complete_current_step().await,
            Err(Error::Session(SessionError::Busy))
        ));
        assert!(matches!(
            sim.start().await,
            Err(Error::Session(SessionError::Busy))
        ));

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.current_step, 2);
        assert!(!sim.display().await.processing);
    }
}
