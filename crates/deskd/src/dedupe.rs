//! Duplicate submission suppression.
//!
//! A candidate is a duplicate of an existing ticket when the email
//! matches case-insensitively and the first N characters of the issue
//! description (lowercased, default 30) match exactly. The live queue is
//! checked first; failing that, the resolved archive is checked within a
//! lookback window so impatient resubmissions are suppressed while
//! genuinely recurring issues are admitted.
//!
//! Both scans are linear. At the stated scale (queue capacity <= 10,000,
//! windowed archive) that is the documented boundary, not an oversight.

use crate::config::DedupeConfig;
use crate::queue::TicketQueue;
use chrono::{DateTime, Duration, Utc};
use desk_common::record::parse_archive;
use std::fs;
use std::path::Path;

/// Where a duplicate was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateHit {
    /// Matches a ticket still in the queue; carries the original's id.
    InQueue { ticket_id: u32 },
    /// Matches an archive entry resolved within the lookback window.
    /// The source predates the submission, so there is no live id.
    RecentlyResolved,
}

/// Normalized comparison key: lowercased email + lowercased issue prefix.
fn issue_prefix(issue: &str, prefix_len: usize) -> String {
    issue.chars().take(prefix_len).collect::<String>().to_lowercase()
}

/// Check a candidate against the live queue, then the windowed archive.
pub fn check(
    queue: &TicketQueue,
    archive: &Path,
    email: &str,
    issue: &str,
    cfg: &DedupeConfig,
    now: DateTime<Utc>,
) -> Option<DuplicateHit> {
    if let Some(ticket_id) = find_in_queue(queue, email, issue, cfg.prefix_len) {
        return Some(DuplicateHit::InQueue { ticket_id });
    }
    if recently_resolved(archive, email, issue, cfg, now) {
        return Some(DuplicateHit::RecentlyResolved);
    }
    None
}

/// Linear scan of the live queue; any match short-circuits with the
/// matching ticket's id.
pub fn find_in_queue(
    queue: &TicketQueue,
    email: &str,
    issue: &str,
    prefix_len: usize,
) -> Option<u32> {
    let candidate_prefix = issue_prefix(issue, prefix_len);
    queue
        .iter()
        .find(|t| {
            t.email.eq_ignore_ascii_case(email)
                && issue_prefix(&t.issue_description, prefix_len) == candidate_prefix
        })
        .map(|t| t.ticket_id)
}

/// Scan the resolved archive for a matching entry resolved inside the
/// lookback window. Missing or unreadable archive means no duplicate;
/// unparseable lines are skipped.
pub fn recently_resolved(
    archive: &Path,
    email: &str,
    issue: &str,
    cfg: &DedupeConfig,
    now: DateTime<Utc>,
) -> bool {
    let content = match fs::read_to_string(archive) {
        Ok(c) => c,
        Err(_) => return false,
    };

    let candidate_prefix = issue_prefix(issue, cfg.prefix_len);
    let cutoff = (now - Duration::days(cfg.lookback_days as i64)).timestamp();

    for line in content.lines().skip(1) {
        let rec = match parse_archive(line) {
            Ok(r) => r,
            Err(_) => continue,
        };
        if !rec.email.eq_ignore_ascii_case(email) {
            continue;
        }
        if issue_prefix(&rec.issue_description, cfg.prefix_len) != candidate_prefix {
            continue;
        }
        if rec.resolved_at > cutoff {
            return true;
        }
    }
    false
}
