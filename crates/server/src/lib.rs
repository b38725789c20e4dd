//! Host for the report relay: one-shot CLI modes and a background mode that
//! runs the daily scheduler behind a small control API.

pub mod api;
pub mod cli;
pub mod metrics;
pub mod state;
