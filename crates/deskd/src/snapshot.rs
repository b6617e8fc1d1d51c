//! Published queue snapshots for external readers.
//!
//! Two artifacts, both written via temp + atomic rename so a polling
//! reader (the web viewer) sees the fully-old or fully-new file, never a
//! partial write:
//! - a human-readable text board of queue contents and statistics
//! - status.json, the same statistics in machine-readable form
//!
//! The published names are the only stable read targets; the `.tmp`
//! names are an implementation detail readers must never touch.

use crate::queue::{QueueStats, TicketQueue};
use crate::store::Store;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use desk_common::fsutil::atomic_write;
use serde::Serialize;

/// Issue text column width on the board.
const ISSUE_COL: usize = 60;

/// Machine-readable snapshot published as status.json.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub snapshot_at: DateTime<Utc>,
    pub version: String,
    pub pid: u32,
    #[serde(flatten)]
    pub stats: QueueStats,
    /// Id of the ticket that will be served next, if any.
    pub next_ticket_id: Option<u32>,
}

/// Render and publish both snapshot artifacts.
pub fn publish(
    queue: &TicketQueue,
    store: &Store,
    history_max: usize,
    now: DateTime<Utc>,
) -> Result<()> {
    let stats = queue.stats(now);

    let board = render_board(queue, &stats, now, |email| {
        store.customer_history(email, history_max).len()
    });
    atomic_write(&store.paths().snapshot(), &board).context("cannot publish snapshot")?;

    let report = StatusReport {
        snapshot_at: now,
        version: env!("CARGO_PKG_VERSION").to_string(),
        pid: std::process::id(),
        next_ticket_id: queue.peek().map(|t| t.ticket_id),
        stats,
    };
    let json = serde_json::to_string_pretty(&report).context("cannot serialize status")?;
    atomic_write(&store.paths().status_json(), &json).context("cannot publish status.json")?;

    Ok(())
}

/// Render the text board. `history` maps a customer email to the number
/// of previously resolved tickets.
pub fn render_board(
    queue: &TicketQueue,
    stats: &QueueStats,
    now: DateTime<Utc>,
    history: impl Fn(&str) -> usize,
) -> String {
    let mut out = String::new();
    out.push_str("DESK ENGINE - LIVE QUEUE BOARD\n");
    out.push_str(&format!(
        "Generated: {} UTC\n\n",
        now.format("%Y-%m-%d %H:%M:%S")
    ));

    out.push_str(&format!(
        "Tickets in queue : {} / {} ({:.1}%)\n",
        stats.total,
        stats.capacity,
        (stats.total as f64 * 100.0) / stats.capacity as f64
    ));
    out.push_str(&format!("Average wait     : {:.1}h\n", stats.avg_wait_hours));
    out.push_str(&format!("Oldest ticket    : {}h\n", stats.oldest_hours));
    out.push_str(&format!(
        "Priority mix     : Critical={} High={} Medium={} Low={}\n",
        stats.critical, stats.high, stats.medium, stats.low
    ));

    match queue.peek() {
        Some(front) => out.push_str(&format!("\nNEXT (FIFO): #{}\n\n", front.ticket_id)),
        None => out.push_str("\nNo pending tickets.\n"),
    }

    if !queue.is_empty() {
        out.push_str(&format!(
            "{:<9} {:<9} {:>7} {:>5}  {:<32} ISSUE\n",
            "ID", "PRIORITY", "WAIT", "HIST", "CUSTOMER"
        ));
        for ticket in queue.iter() {
            let hours = ticket.hours_waited(now);
            let hist = history(&ticket.email);
            let hist_col = if hist > 0 {
                hist.to_string()
            } else {
                "-".to_string()
            };
            let who = format!("{} <{}>", ticket.customer_name, ticket.email);
            let mut issue: String = ticket.issue_description.chars().take(ISSUE_COL).collect();
            if ticket.issue_description.chars().count() > ISSUE_COL {
                issue.push_str("...");
            }
            out.push_str(&format!(
                "#{:<8} {:<9} {:>6.1}h {:>5}  {:<32} {}\n",
                ticket.ticket_id, ticket.priority, hours, hist_col, who, issue
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_common::ticket::{FieldLimits, Priority, Ticket};
    use desk_common::EnginePaths;
    use tempfile::TempDir;

    fn ticket(id: u32, priority: Priority, hours_ago: i64) -> Ticket {
        Ticket {
            ticket_id: id,
            customer_name: format!("Customer {}", id),
            email: format!("c{}@example.com", id),
            product: "Widget".into(),
            purchase_date: "2026-01-01".into(),
            issue_description: "the widget will not start".into(),
            priority,
            queue_entry_time: Utc::now() - chrono::Duration::hours(hours_ago),
        }
    }

    #[test]
    fn board_shows_stats_and_fifo_head() {
        let mut q = TicketQueue::new(100);
        q.admit(ticket(7, Priority::Critical, 80)).unwrap();
        q.admit(ticket(8, Priority::Low, 1)).unwrap();

        let now = Utc::now();
        let board = render_board(&q, &q.stats(now), now, |_| 0);

        assert!(board.contains("NEXT (FIFO): #7"));
        assert!(board.contains("Tickets in queue : 2 / 100"));
        assert!(board.contains("Critical=1"));
        assert!(board.contains("#7"));
        assert!(board.contains("#8"));
    }

    #[test]
    fn empty_board_says_so() {
        let q = TicketQueue::new(10);
        let now = Utc::now();
        let board = render_board(&q, &q.stats(now), now, |_| 0);
        assert!(board.contains("No pending tickets."));
    }

    #[test]
    fn publish_writes_both_artifacts_with_no_temp_leftovers() {
        let temp = TempDir::new().unwrap();
        let paths = EnginePaths::with_root(temp.path());
        paths.ensure_dirs().unwrap();
        let store = Store::new(paths.clone(), FieldLimits::default());

        let mut q = TicketQueue::new(10);
        q.admit(ticket(1, Priority::Medium, 2)).unwrap();

        publish(&q, &store, 10, Utc::now()).unwrap();

        let board = std::fs::read_to_string(paths.snapshot()).unwrap();
        assert!(board.starts_with("DESK ENGINE - LIVE QUEUE BOARD"));

        let status: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(paths.status_json()).unwrap()).unwrap();
        assert_eq!(status["total"], 1);
        assert_eq!(status["next_ticket_id"], 1);

        assert!(!paths.snapshot().with_extension("tmp").exists());
        assert!(!paths.status_json().with_extension("tmp").exists());
    }

    #[test]
    fn republish_replaces_cleanly() {
        let temp = TempDir::new().unwrap();
        let paths = EnginePaths::with_root(temp.path());
        paths.ensure_dirs().unwrap();
        let store = Store::new(paths.clone(), FieldLimits::default());

        let mut q = TicketQueue::new(10);
        publish(&q, &store, 10, Utc::now()).unwrap();
        q.admit(ticket(3, Priority::Low, 0)).unwrap();
        publish(&q, &store, 10, Utc::now()).unwrap();

        let board = std::fs::read_to_string(paths.snapshot()).unwrap();
        assert!(board.contains("NEXT (FIFO): #3"));
    }
}
