//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Simulator configuration.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Path to the libSQL database file.
    pub db_path: String,
    /// Port for the REST/presentation server.
    pub port: u16,
    /// Artificial processing delay applied when completing a step
    /// (simulates a backend round-trip; the UI shows a busy state).
    pub processing_delay: Duration,
    /// Maximum number of insights kept per generation run.
    pub insight_limit: usize,
    /// Optional CSV backup file appended to on every finalized session.
    pub csv_backup: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            db_path: "./data/funnel-sim.db".to_string(),
            port: 5000,
            processing_delay: Duration::from_secs(1),
            insight_limit: 5,
            csv_backup: None,
        }
    }
}

impl SimConfig {
    /// Build a config from environment variables, falling back to defaults.
    ///
    /// Recognized: `FUNNEL_SIM_DB_PATH`, `FUNNEL_SIM_PORT`,
    /// `FUNNEL_SIM_DELAY_MS`, `FUNNEL_SIM_CSV_BACKUP`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let db_path = std::env::var("FUNNEL_SIM_DB_PATH").unwrap_or(defaults.db_path);
        let port = match std::env::var("FUNNEL_SIM_PORT") {
            Ok(value) => value.parse().map_err(|e| ConfigError::InvalidValue {
                key: "FUNNEL_SIM_PORT".into(),
                message: format!("{e}"),
            })?,
            Err(_) => defaults.port,
        };
        let processing_delay = match std::env::var("FUNNEL_SIM_DELAY_MS") {
            Ok(value) => {
                let millis: u64 = value.parse().map_err(|e| ConfigError::InvalidValue {
                    key: "FUNNEL_SIM_DELAY_MS".into(),
                    message: format!("{e}"),
                })?;
                Duration::from_millis(millis)
            }
            Err(_) => defaults.processing_delay,
        };
        let csv_backup = std::env::var("FUNNEL_SIM_CSV_BACKUP")
            .ok()
            .map(PathBuf::from);

        Ok(Self {
            db_path,
            port,
            processing_delay,
            insight_limit: defaults.insight_limit,
            csv_backup,
        })
    }
}
