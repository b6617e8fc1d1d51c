//! Atomic file publication and append-only event logs.
//!
//! The engine is the only writer of its files, but independent readers
//! poll the published names. Every published artifact therefore goes
//! through temp-file + rename so a reader sees the old file or the new
//! file, never a partial write.

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Write `data` to `path` atomically using temp file + rename.
/// The file is never observable in a partial state.
pub fn atomic_write(path: &Path, data: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Temp file lives in the same directory so the rename stays atomic.
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Append one timestamped event line to a diagnostic log.
/// Format: `[YYYY-MM-DD HH:MM:SS] <message>`, one event per line.
pub fn append_event(path: &Path, message: &str) -> io::Result<()> {
    let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    append_line(path, &format!("[{}] {}", stamp, message))
}

/// Append one raw line, creating the file (and parent dir) if needed.
pub fn append_line(path: &Path, line: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// Truncate a file to zero length. Missing file is fine.
pub fn truncate_file(path: &Path) -> io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let file = OpenOptions::new().write(true).truncate(true).open(path)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_and_replaces() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out/published.txt");

        atomic_write(&path, "first").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");

        atomic_write(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");

        // No temp artifact left behind
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn append_event_is_one_line_with_stamp() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("error_log.txt");

        append_event(&path, "ERROR: something").unwrap();
        append_event(&path, "ERROR: something else").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("ERROR: something"));
    }

    #[test]
    fn truncate_empties_existing_and_tolerates_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pending.csv");

        fs::write(&path, "a\nb\n").unwrap();
        truncate_file(&path).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);

        truncate_file(&temp.path().join("missing.csv")).unwrap();
    }
}
