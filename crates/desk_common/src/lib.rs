//! Shared types and file-state helpers for the desk engine.
//!
//! Consumed by the `deskd` daemon and by external viewers that read the
//! published snapshot files. Nothing in here holds engine state; it is
//! record shapes, validation, paths, and filesystem primitives.

pub mod fsutil;
pub mod paths;
pub mod record;
pub mod ticket;

pub use fsutil::{append_event, atomic_write, truncate_file};
pub use paths::EnginePaths;
pub use ticket::{FieldLimits, Priority, Ticket};
