//! libSQL backend — async `FunnelStore` implementation.
//!
//! Supports local file and in-memory databases. Step outcomes are stored as
//! a JSON column in the same camelCase shape the API serves, so records
//! round-trip between storage and the wire without remapping.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, Value, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::session::{SessionRecord, StepOutcome};
use crate::store::csv_backup::CsvBackup;
use crate::store::migrations;
use crate::store::traits::FunnelStore;

/// libSQL store backend.
///
/// Holds a single connection reused for all operations;
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
    csv_backup: Option<CsvBackup>,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        info!(path = %path.display(), "Database opened");

        Ok(Self {
            db: Arc::new(db),
            conn,
            csv_backup: None,
        })
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
            csv_backup: None,
        })
    }

    /// Also append every record to a CSV backup file.
    pub fn with_csv_backup(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.csv_backup = Some(CsvBackup::new(path));
        self
    }
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a libsql row to a SessionRecord.
///
/// Column order: 0:id, 1:user_id, 2:steps (JSON), 3:completed_at, 4:drop_off_step.
fn row_to_record(row: &libsql::Row) -> Result<SessionRecord, DatabaseError> {
    let id: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("Bad id column: {e}")))?;
    let user_id: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("Bad user_id column: {e}")))?;
    let steps_json: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("Bad steps column: {e}")))?;
    let completed_str: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("Bad completed_at column: {e}")))?;
    let drop_off_step = row.get::<i64>(4).ok().map(|v| v as u32);

    let steps: Vec<StepOutcome> = serde_json::from_str(&steps_json)
        .map_err(|e| DatabaseError::Serialization(format!("Bad steps JSON for {id}: {e}")))?;

    Ok(SessionRecord {
        id,
        user_id,
        steps,
        completed_at: parse_datetime(&completed_str),
        drop_off_step,
    })
}

#[async_trait]
impl FunnelStore for LibSqlStore {
    async fn append_record(&self, record: &SessionRecord) -> Result<(), DatabaseError> {
        let steps_json = serde_json::to_string(&record.steps)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let drop_off = match record.drop_off_step {
            Some(step) => Value::Integer(step as i64),
            None => Value::Null,
        };

        self.conn
            .execute(
                "INSERT INTO sessions (id, user_id, steps, completed_at, drop_off_step)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id.as_str(),
                    record.user_id.as_str(),
                    steps_json,
                    record.completed_at.to_rfc3339(),
                    drop_off,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to insert session: {e}")))?;

        if let Some(backup) = &self.csv_backup {
            backup.append(record).await?;
        }

        debug!(record_id = %record.id, "Session record appended");
        Ok(())
    }

    async fn load_records(&self) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, steps, completed_at, drop_off_step
                 FROM sessions ORDER BY rowid",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to load sessions: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read session row: {e}")))?
        {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    async fn save_insights(&self, insights: &[String]) -> Result<(), DatabaseError> {
        // Replace wholesale inside a transaction: a failed save must leave
        // the previously stored list intact.
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to start transaction: {e}")))?;

        tx.execute("DELETE FROM insights", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to clear insights: {e}")))?;

        for (position, message) in insights.iter().enumerate() {
            tx.execute(
                "INSERT INTO insights (position, message) VALUES (?1, ?2)",
                params![position as i64, message.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to insert insight: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to commit insights: {e}")))?;
        Ok(())
    }

    async fn load_insights(&self) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT message FROM insights ORDER BY position", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to load insights: {e}")))?;

        let mut insights = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read insight row: {e}")))?
        {
            let message: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("Bad message column: {e}")))?;
            insights.push(message);
        }
        Ok(insights)
    }

    async fn reset(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM sessions", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to clear sessions: {e}")))?;
        self.conn
            .execute("DELETE FROM insights", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to clear insights: {e}")))?;

        if let Some(backup) = &self.csv_backup {
            backup.reset().await?;
        }

        info!("All data reset");
        Ok(())
    }
}
