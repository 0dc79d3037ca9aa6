//! Persistence — session records and the current insight list.

pub mod csv_backup;
pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use csv_backup::CsvBackup;
pub use libsql_backend::LibSqlStore;
pub use traits::FunnelStore;
