//! Presentation surface — thin REST shell over the simulator core.

pub mod routes;

pub use routes::{AppState, api_routes};
