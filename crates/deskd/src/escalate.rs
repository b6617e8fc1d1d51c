//! Time-driven priority escalation.
//!
//! A ticket's organic priority is a pure function of wait time since
//! queue entry (not time-in-current-state): Medium after one cycle, High
//! after two, Critical at the safety net. A pass assigns each ticket the
//! higher of its current priority and that ladder, so a ticket admitted
//! above the ladder simply keeps its priority until the ladder passes
//! it. Transitions only ever advance, and because the ladder depends on
//! nothing the pass itself mutates, an immediate second pass changes
//! nothing.
//!
//! Timeline with the default 24h cycle and 72h safety net:
//!   0-24h Low, 24-48h Medium, 48-72h High, 72h+ Critical.

use crate::config::EscalationConfig;
use crate::queue::TicketQueue;
use chrono::{DateTime, Utc};
use desk_common::fsutil::append_event;
use desk_common::ticket::Priority;
use std::path::Path;
use tracing::warn;

/// The priority a ticket should hold after waiting `hours` since entry:
/// the wait-time ladder, floored at `current` so priority never drops.
/// Pure, monotonic, and stable under re-evaluation.
pub fn target_priority(current: Priority, hours: f64, policy: &EscalationConfig) -> Priority {
    let cycle = policy.cycle_hours as f64;

    // Safety net first: nothing waits past this, whatever its history.
    let ladder = if hours >= policy.safety_net_hours as f64 {
        Priority::Critical
    } else if hours >= 2.0 * cycle {
        Priority::High
    } else if hours >= cycle {
        Priority::Medium
    } else {
        Priority::Low
    };

    current.max(ladder)
}

/// Run one escalation pass over the whole queue. Returns the number of
/// tickets whose priority advanced; when any did, one summary line is
/// appended to the escalation log.
pub fn escalate_queue(
    queue: &mut TicketQueue,
    now: DateTime<Utc>,
    policy: &EscalationConfig,
    escalation_log: &Path,
) -> usize {
    let mut escalated = 0;

    queue.for_each_mut(|ticket| {
        let target = target_priority(ticket.priority, ticket.hours_waited(now), policy);
        if target > ticket.priority {
            ticket.priority = target;
            escalated += 1;
        }
    });

    if escalated > 0 {
        if let Err(e) = append_event(
            escalation_log,
            &format!("Auto-escalated {} tickets", escalated),
        ) {
            warn!("Cannot write escalation log: {}", e);
        }
    }

    escalated
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use desk_common::ticket::Ticket;
    use tempfile::TempDir;

    fn policy() -> EscalationConfig {
        EscalationConfig::default()
    }

    fn queued_ticket(id: u32, priority: Priority, hours_ago: i64, now: DateTime<Utc>) -> Ticket {
        Ticket {
            ticket_id: id,
            customer_name: "Test Customer".into(),
            email: format!("c{}@example.com", id),
            product: "Widget".into(),
            purchase_date: "2026-01-01".into(),
            issue_description: "it stopped".into(),
            priority,
            queue_entry_time: now - Duration::hours(hours_ago),
        }
    }

    #[test]
    fn low_ladder_follows_wait_time() {
        let p = policy();
        assert_eq!(target_priority(Priority::Low, 10.0, &p), Priority::Low);
        assert_eq!(target_priority(Priority::Low, 24.0, &p), Priority::Medium);
        assert_eq!(target_priority(Priority::Low, 47.9, &p), Priority::Medium);
        // 50h Low goes to High, not Critical: thresholds are from entry.
        assert_eq!(target_priority(Priority::Low, 50.0, &p), Priority::High);
    }

    #[test]
    fn safety_net_forces_critical_from_any_state() {
        let p = policy();
        assert_eq!(target_priority(Priority::Low, 73.0, &p), Priority::Critical);
        assert_eq!(target_priority(Priority::Medium, 72.0, &p), Priority::Critical);
        assert_eq!(target_priority(Priority::High, 100.0, &p), Priority::Critical);
    }

    #[test]
    fn admitted_priority_holds_until_ladder_passes_it() {
        // A ticket admitted at Medium by keyword is not bumped after one
        // cycle; the ladder catches up at two cycles, the safety net at
        // three.
        let p = policy();
        assert_eq!(target_priority(Priority::Medium, 25.0, &p), Priority::Medium);
        assert_eq!(target_priority(Priority::Medium, 48.0, &p), Priority::High);
        assert_eq!(target_priority(Priority::High, 50.0, &p), Priority::High);
        assert_eq!(target_priority(Priority::High, 72.0, &p), Priority::Critical);
    }

    #[test]
    fn critical_is_terminal() {
        let p = policy();
        assert_eq!(
            target_priority(Priority::Critical, 1000.0, &p),
            Priority::Critical
        );
    }

    #[test]
    fn never_downgrades() {
        // A ticket manually raised to High at 1h stays High.
        let p = policy();
        assert_eq!(target_priority(Priority::High, 1.0, &p), Priority::High);
    }

    #[test]
    fn pass_escalates_and_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("escalation_log.txt");
        let now = Utc::now();

        let mut q = TicketQueue::new(10);
        q.admit(queued_ticket(1, Priority::Low, 50, now)).unwrap();
        q.admit(queued_ticket(2, Priority::Low, 1, now)).unwrap();
        q.admit(queued_ticket(3, Priority::High, 73, now)).unwrap();

        let first = escalate_queue(&mut q, now, &policy(), &log);
        assert_eq!(first, 2);
        let priorities: Vec<Priority> = q.iter().map(|t| t.priority).collect();
        assert_eq!(
            priorities,
            vec![Priority::High, Priority::Low, Priority::Critical]
        );

        // Immediate second pass: no further transitions, no new log line.
        let second = escalate_queue(&mut q, now, &policy(), &log);
        assert_eq!(second, 0);
        let content = std::fs::read_to_string(&log).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("Auto-escalated 2 tickets"));
    }

    #[test]
    fn repeated_passes_never_cascade_past_the_ladder() {
        // Cycles run twice a second: a 50h Low ticket promoted to High
        // must stay High on the following passes, not walk on to
        // Critical one state per cycle.
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("escalation_log.txt");
        let now = Utc::now();

        let mut q = TicketQueue::new(10);
        q.admit(queued_ticket(1, Priority::Low, 50, now)).unwrap();

        assert_eq!(escalate_queue(&mut q, now, &policy(), &log), 1);
        for secs in 1..=3 {
            let later = now + Duration::seconds(secs);
            assert_eq!(escalate_queue(&mut q, later, &policy(), &log), 0);
        }
        assert_eq!(q.peek().unwrap().priority, Priority::High);
    }
}
