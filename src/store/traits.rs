//! `FunnelStore` trait — async persistence interface for the simulator.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::session::SessionRecord;

/// Backend-agnostic store for session records and the insight list.
///
/// Records form an append-only ordered collection; the insight list is
/// replaced wholesale on every save. Absent data loads as empty, never as
/// an error.
#[async_trait]
pub trait FunnelStore: Send + Sync {
    /// Append one finalized session record.
    async fn append_record(&self, record: &SessionRecord) -> Result<(), DatabaseError>;

    /// Load all records in append order.
    async fn load_records(&self) -> Result<Vec<SessionRecord>, DatabaseError>;

    /// Replace the stored insight list.
    async fn save_insights(&self, insights: &[String]) -> Result<(), DatabaseError>;

    /// Load the current insight list, in order.
    async fn load_insights(&self) -> Result<Vec<String>, DatabaseError>;

    /// Clear both the record collection and the insight list.
    async fn reset(&self) -> Result<(), DatabaseError>;
}
