//! Durable live-queue store and resolved archive.
//!
//! The live store is a header-first CSV rewritten wholesale on save and
//! appended to on ingestion. Resolution copies every other record to a
//! scratch file, appends the resolved record (plus resolution metadata)
//! to the archive, then atomically renames the scratch file over the
//! live store - a reader never sees a half-moved ticket. The archive is
//! append-only; the engine never mutates or removes its entries.

use crate::queue::TicketQueue;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use desk_common::fsutil::{append_event, append_line, atomic_write};
use desk_common::record::{
    encode_live, parse_archive, parse_live, split_fields, ArchiveRecord, ARCHIVE_HEADER,
    LIVE_HEADER,
};
use desk_common::ticket::{FieldLimits, Ticket};
use desk_common::EnginePaths;
use std::fs;
use tracing::{info, warn};

/// Outcome of a full live-store load.
#[derive(Debug, Default, PartialEq)]
pub struct LoadSummary {
    pub valid: usize,
    pub invalid: usize,
}

/// File-backed persistence for the engine.
pub struct Store {
    paths: EnginePaths,
    limits: FieldLimits,
}

impl Store {
    pub fn new(paths: EnginePaths, limits: FieldLimits) -> Self {
        Self { paths, limits }
    }

    pub fn paths(&self) -> &EnginePaths {
        &self.paths
    }

    fn diagnostic(&self, message: &str) {
        if let Err(e) = append_event(&self.paths.error_log(), &format!("ERROR: {}", message)) {
            warn!("Cannot write error log: {}", e);
        }
    }

    /// Load the live store into a fresh queue of `capacity`. A missing
    /// store file is created with its header and yields an empty queue;
    /// this is a resource condition, never a fatal error. Invalid records
    /// are skipped with line-numbered diagnostics.
    pub fn load_live(&self, capacity: usize, now: DateTime<Utc>) -> Result<(TicketQueue, LoadSummary)> {
        let mut queue = TicketQueue::new(capacity);
        let mut summary = LoadSummary::default();
        let path = self.paths.live_queue();

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => {
                atomic_write(&path, &format!("{}\n", LIVE_HEADER))
                    .with_context(|| format!("cannot create {}", path.display()))?;
                info!("Created empty live store at {}", path.display());
                return Ok((queue, summary));
            }
        };

        for (idx, line) in content.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let line_number = idx + 1;
            match parse_live(line, &self.limits, now) {
                Ok(parsed) => {
                    if let Some(raw) = &parsed.corrected_priority {
                        self.diagnostic(&format!(
                            "Line {}: Invalid priority '{}' for ticket #{} - defaulting to Low",
                            line_number, raw, parsed.ticket.ticket_id
                        ));
                    }
                    match queue.admit(parsed.ticket) {
                        Ok(()) => summary.valid += 1,
                        Err(full) => {
                            self.log_overflow(&full.0);
                            summary.invalid += 1;
                        }
                    }
                }
                Err(e) => {
                    self.diagnostic(&format!("Line {}: {} - skipping", line_number, e));
                    summary.invalid += 1;
                }
            }
        }

        if summary.invalid > 0 {
            self.diagnostic(&format!(
                "Load summary: {} valid tickets loaded, {} invalid tickets skipped",
                summary.valid, summary.invalid
            ));
            warn!(
                "{} invalid tickets skipped while loading the live store",
                summary.invalid
            );
        }

        Ok((queue, summary))
    }

    /// Append one admitted ticket to the live store, creating the file
    /// with its header first if needed.
    pub fn append_live(&self, ticket: &Ticket) -> Result<()> {
        let path = self.paths.live_queue();
        if !path.exists() {
            atomic_write(&path, &format!("{}\n", LIVE_HEADER))
                .with_context(|| format!("cannot create {}", path.display()))?;
        }
        append_line(&path, &encode_live(ticket))
            .with_context(|| format!("cannot append to {}", path.display()))?;
        Ok(())
    }

    /// Rewrite the live store wholesale from the queue (shutdown path).
    pub fn save_live(&self, queue: &TicketQueue) -> Result<()> {
        let mut content = format!("{}\n", LIVE_HEADER);
        for ticket in queue.iter() {
            content.push_str(&encode_live(ticket));
            content.push('\n');
        }
        atomic_write(&self.paths.live_queue(), &content)
            .with_context(|| "cannot save live store")?;
        Ok(())
    }

    /// Record a capacity rejection in the overflow log.
    pub fn log_overflow(&self, ticket: &Ticket) {
        if let Err(e) = append_event(
            &self.paths.overflow_log(),
            &format!("QUEUE FULL - Ticket #{} rejected", ticket.ticket_id),
        ) {
            warn!("Cannot write overflow log: {}", e);
        }
    }

    /// Move a resolved ticket out of the live store into the archive:
    /// copy all other records to a scratch file, append the resolved
    /// record with resolution metadata to the archive, then atomically
    /// replace the live store with the scratch file. When the id is not
    /// found the store is left untouched and `false` is returned.
    pub fn resolve_move(
        &self,
        ticket_id: u32,
        operator: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool> {
        let live = self.paths.live_queue();
        let content = fs::read_to_string(&live)
            .with_context(|| format!("cannot open {} for archiving", live.display()))?;

        let mut kept = String::new();
        let mut resolved_line: Option<String> = None;

        for (idx, line) in content.lines().enumerate() {
            if idx == 0 {
                kept.push_str(line);
                kept.push('\n');
                continue;
            }
            if resolved_line.is_none() {
                let fields = split_fields(line);
                if let Some(first) = fields.first() {
                    if first.trim().parse::<u32>() == Ok(ticket_id) {
                        resolved_line = Some(line.to_string());
                        continue;
                    }
                }
            }
            kept.push_str(line);
            kept.push('\n');
        }

        let resolved_line = match resolved_line {
            Some(l) => l,
            None => return Ok(false),
        };

        self.ensure_archive()?;
        // Archive first, then swap: a crash in between duplicates the
        // ticket (live + archive) instead of losing it.
        append_line(
            &self.paths.resolved_archive(),
            &format!("{},{},{}", resolved_line, resolved_at.timestamp(), operator),
        )
        .with_context(|| "cannot append to resolved archive")?;

        atomic_write(&live, &kept).with_context(|| "cannot replace live store")?;
        Ok(true)
    }

    fn ensure_archive(&self) -> Result<()> {
        let path = self.paths.resolved_archive();
        if !path.exists() {
            atomic_write(&path, &format!("{}\n", ARCHIVE_HEADER))
                .with_context(|| format!("cannot create {}", path.display()))?;
        }
        Ok(())
    }

    /// Up to `max` prior resolved tickets for a customer, matched by
    /// case-insensitive email. Missing archive means no history.
    pub fn customer_history(&self, email: &str, max: usize) -> Vec<ArchiveRecord> {
        let content = match fs::read_to_string(self.paths.resolved_archive()) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        content
            .lines()
            .skip(1)
            .filter_map(|line| parse_archive(line).ok())
            .filter(|rec| rec.email.eq_ignore_ascii_case(email))
            .take(max)
            .collect()
    }
}
