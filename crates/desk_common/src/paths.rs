//! Every file the engine touches, under one data directory.
//!
//! Default root is /var/lib/deskd; tests point `with_root` at a temp dir.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default data directory.
pub const DATA_DIR: &str = "/var/lib/deskd";

/// Resolved file locations for one engine instance.
#[derive(Debug, Clone)]
pub struct EnginePaths {
    root: PathBuf,
}

impl EnginePaths {
    pub fn new() -> Self {
        Self::with_root(Path::new(DATA_DIR))
    }

    /// Root everything under `root` (used by tests and `--data-dir`).
    pub fn with_root(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Durable live-queue store (header + 8-field records).
    pub fn live_queue(&self) -> PathBuf {
        self.root.join("live_queue.csv")
    }

    /// Append-only resolved archive.
    pub fn resolved_archive(&self) -> PathBuf {
        self.root.join("resolved_tickets.csv")
    }

    /// Externally-submitted candidate tickets, truncated after each pass.
    pub fn pending_tickets(&self) -> PathBuf {
        self.root.join("pending_tickets.csv")
    }

    /// Admin command channel, truncated after each read.
    pub fn admin_commands(&self) -> PathBuf {
        self.root.join("admin_commands.txt")
    }

    /// Published human-readable snapshot. Readers must use only this name.
    pub fn snapshot(&self) -> PathBuf {
        self.root.join("queue_board.txt")
    }

    /// Published machine-readable status.
    pub fn status_json(&self) -> PathBuf {
        self.root.join("status.json")
    }

    pub fn error_log(&self) -> PathBuf {
        self.root.join("error_log.txt")
    }

    pub fn overflow_log(&self) -> PathBuf {
        self.root.join("overflow_log.txt")
    }

    pub fn escalation_log(&self) -> PathBuf {
        self.root.join("escalation_log.txt")
    }

    pub fn duplicate_log(&self) -> PathBuf {
        self.root.join("duplicate_tickets.log")
    }

    /// Create the data directory if missing.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }
}

impl Default for EnginePaths {
    fn default() -> Self {
        Self::new()
    }
}
