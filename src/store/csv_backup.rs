//! CSV backup — a flat append-only summary file alongside the database.
//!
//! One line per finalized session: id, user id, termination time, drop-off
//! step (empty on full completion), steps completed, total steps. Kept for
//! out-of-band inspection with spreadsheet tools; never read back.

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use crate::error::DatabaseError;
use crate::session::SessionRecord;

const HEADER: &str = "id,userId,completedAt,dropOffStep,steps_completed,total_steps\n";

/// Appends session summaries to a CSV file.
#[derive(Debug, Clone)]
pub struct CsvBackup {
    path: PathBuf,
}

impl CsvBackup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one record, writing the header first if the file is new.
    pub async fn append(&self, record: &SessionRecord) -> Result<(), DatabaseError> {
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| DatabaseError::CsvBackup(e.to_string()))?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DatabaseError::CsvBackup(e.to_string()))?;

        let mut line = String::new();
        if !exists {
            line.push_str(HEADER);
        }
        line.push_str(&format!(
            "{},{},{},{},{},{}\n",
            record.id,
            record.user_id,
            record.completed_at.to_rfc3339(),
            record
                .drop_off_step
                .map(|s| s.to_string())
                .unwrap_or_default(),
            record.steps_completed(),
            record.steps.len(),
        ));

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| DatabaseError::CsvBackup(e.to_string()))?;
        Ok(())
    }

    /// Delete the backup file, if present.
    pub async fn reset(&self) -> Result<(), DatabaseError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DatabaseError::CsvBackup(e.to_string())),
        }
    }
}
