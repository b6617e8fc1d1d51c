//! Desk engine daemon library - exposes modules for testing.

pub mod config;
pub mod dedupe;
pub mod engine;
pub mod escalate;
pub mod ingest;
pub mod queue;
pub mod snapshot;
pub mod store;
