//! Funnel Sim — onboarding funnel simulation and analytics core.

pub mod analytics;
pub mod config;
pub mod error;
pub mod funnel;
pub mod insights;
pub mod server;
pub mod session;
pub mod store;
