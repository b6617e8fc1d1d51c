//! Ingestion of externally-submitted tickets and admin commands.
//!
//! Both channels are plain files written by the submission front end.
//! Ingestion is at-most-once per candidate per cycle: the pending file
//! is truncated after each pass whatever the per-record outcomes were.
//! The command channel honors at most one command per cycle; extra lines
//! are dropped by contract, with a diagnostic so drops are observable.

use crate::config::Config;
use crate::dedupe::{self, DuplicateHit};
use crate::queue::TicketQueue;
use crate::store::Store;
use anyhow::Result;
use chrono::{DateTime, Utc};
use desk_common::fsutil::{append_event, truncate_file};
use desk_common::record::parse_pending;
use desk_common::ticket::{Priority, Ticket};
use std::fs;
use tracing::{info, warn};

// Keyword tiers for automatic priority classification. Deliberately not
// surfaced to submitters so the tiers cannot be gamed.
const CRITICAL_KEYWORDS: &[&str] = &["hack", "security", "money", "payment", "fraud", "stolen"];
const HIGH_KEYWORDS: &[&str] = &["urgent", "fail", "error", "crash", "broke", "not working"];
const MEDIUM_KEYWORDS: &[&str] = &["bug", "slow", "delay", "glitch", "issue"];

/// Classify an issue description into an initial priority.
pub fn auto_priority(description: &str) -> Priority {
    let d = description.to_lowercase();
    if CRITICAL_KEYWORDS.iter().any(|k| d.contains(k)) {
        Priority::Critical
    } else if HIGH_KEYWORDS.iter().any(|k| d.contains(k)) {
        Priority::High
    } else if MEDIUM_KEYWORDS.iter().any(|k| d.contains(k)) {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Per-pass ingestion counters.
#[derive(Debug, Default, PartialEq)]
pub struct IngestSummary {
    pub admitted: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub overflow: usize,
}

/// Run one ingestion pass over the pending file. Every admitted ticket
/// is appended to the durable live store; the pending file is truncated
/// afterwards regardless of outcome.
pub fn process_pending(
    queue: &mut TicketQueue,
    store: &Store,
    cfg: &Config,
    now: DateTime<Utc>,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    let pending_path = store.paths().pending_tickets();

    let content = match fs::read_to_string(&pending_path) {
        Ok(c) => c,
        Err(_) => return Ok(summary),
    };

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_number = idx + 1;

        let submission = match parse_pending(line, &cfg.limits) {
            Ok(s) => s,
            Err(e) => {
                diagnostic(store, &format!("Pending line {}: {} - skipping", line_number, e));
                summary.rejected += 1;
                continue;
            }
        };

        match dedupe::check(
            queue,
            &store.paths().resolved_archive(),
            &submission.email,
            &submission.issue_description,
            &cfg.dedupe,
            now,
        ) {
            Some(DuplicateHit::InQueue { ticket_id }) => {
                log_duplicate(
                    store,
                    &format!(
                        "Duplicate rejected: Ticket #{} (similar to #{}) - {} - {}",
                        submission.ticket_id,
                        ticket_id,
                        submission.email,
                        submission.issue_description
                    ),
                );
                summary.duplicates += 1;
                continue;
            }
            Some(DuplicateHit::RecentlyResolved) => {
                log_duplicate(
                    store,
                    &format!(
                        "Duplicate rejected: Ticket #{} (recently resolved) - {} - {}",
                        submission.ticket_id, submission.email, submission.issue_description
                    ),
                );
                summary.duplicates += 1;
                continue;
            }
            None => {}
        }

        let ticket = Ticket {
            ticket_id: submission.ticket_id,
            customer_name: submission.customer_name,
            email: submission.email,
            product: submission.product,
            purchase_date: submission.purchase_date,
            priority: auto_priority(&submission.issue_description),
            issue_description: submission.issue_description,
            queue_entry_time: now,
        };

        let persisted = ticket.clone();
        match queue.admit(ticket) {
            Ok(()) => {
                // The queue accepted it; failing to persist is a resource
                // error, logged but not fatal to the pass.
                if let Err(e) = store.append_live(&persisted) {
                    diagnostic(store, &format!("Cannot persist ticket: {}", e));
                }
                summary.admitted += 1;
            }
            Err(full) => {
                store.log_overflow(&full.0);
                summary.overflow += 1;
            }
        }
    }

    // Processed candidates are cleared whatever happened to them.
    if let Err(e) = truncate_file(&pending_path) {
        diagnostic(store, &format!("Cannot clear pending file: {}", e));
    }

    if summary.admitted > 0 {
        info!(
            "Ingested {} tickets ({} duplicates, {} rejected, {} overflow)",
            summary.admitted, summary.duplicates, summary.rejected, summary.overflow
        );
    }

    Ok(summary)
}

/// Outcome of one command-channel check.
#[derive(Debug, PartialEq)]
pub enum CommandOutcome {
    /// No command pending.
    None,
    /// Front ticket served and archived.
    Resolved { ticket_id: u32, operator: String },
    /// A RESOLVE arrived while the queue was empty.
    EmptyQueue,
    /// First line did not parse as a command.
    Malformed,
}

/// Read the admin command channel and execute at most one command.
/// The channel is truncated after reading regardless of content.
pub fn process_command(
    queue: &mut TicketQueue,
    store: &Store,
    now: DateTime<Utc>,
) -> Result<CommandOutcome> {
    let path = store.paths().admin_commands();
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => return Ok(CommandOutcome::None),
    };

    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let first = lines.next().map(|l| l.to_string());
    let dropped = lines.count();

    if let Err(e) = truncate_file(&path) {
        diagnostic(store, &format!("Cannot clear command channel: {}", e));
    }

    let line = match first {
        Some(l) => l,
        None => return Ok(CommandOutcome::None),
    };

    if dropped > 0 {
        diagnostic(
            store,
            &format!("{} additional command lines dropped (one command per cycle)", dropped),
        );
    }

    let mut parts = line.split_whitespace();
    let (verb, requested_id) = (parts.next(), parts.next().and_then(|s| s.parse::<u32>().ok()));
    if verb != Some("RESOLVE") || requested_id.is_none() {
        diagnostic(store, &format!("Unrecognized admin command: {}", line.trim()));
        return Ok(CommandOutcome::Malformed);
    }
    let operator = parts.next().unwrap_or("admin").to_string();

    // Resolution is strictly FIFO: the requested id is accepted for the
    // audit trail, but the front ticket is the one served.
    let ticket = match queue.serve() {
        Some(t) => t,
        None => return Ok(CommandOutcome::EmptyQueue),
    };

    if Some(ticket.ticket_id) != requested_id {
        info!(
            "RESOLVE requested #{:?} but front of queue is #{}",
            requested_id, ticket.ticket_id
        );
    }

    match store.resolve_move(ticket.ticket_id, &operator, now) {
        Ok(true) => {}
        Ok(false) => {
            diagnostic(
                store,
                &format!("Ticket #{} served but not found in live store", ticket.ticket_id),
            );
        }
        Err(e) => {
            warn!("Resolution move failed for #{}: {}", ticket.ticket_id, e);
            diagnostic(store, &format!("Resolution move failed: {}", e));
        }
    }

    info!("Resolved ticket #{} (operator: {})", ticket.ticket_id, operator);
    Ok(CommandOutcome::Resolved {
        ticket_id: ticket.ticket_id,
        operator,
    })
}

fn diagnostic(store: &Store, message: &str) {
    if let Err(e) = append_event(&store.paths().error_log(), &format!("ERROR: {}", message)) {
        warn!("Cannot write error log: {}", e);
    }
}

fn log_duplicate(store: &Store, message: &str) {
    if let Err(e) = append_event(&store.paths().duplicate_log(), message) {
        warn!("Cannot write duplicate log: {}", e);
    }
}
