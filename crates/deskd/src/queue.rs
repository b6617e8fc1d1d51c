//! Bounded circular FIFO queue of tickets.
//!
//! FIFO over a priority queue is deliberate: auto-escalation handles
//! urgency while arrival order prevents starvation. Wraparound is
//! mod-capacity cursor arithmetic; empty is an explicit sentinel
//! (`front == None`) so full and empty are never ambiguous.

use chrono::{DateTime, Utc};
use desk_common::ticket::{Priority, Ticket};
use serde::Serialize;
use thiserror::Error;

/// Admission failed because the queue is at capacity. Carries the
/// rejected ticket back to the caller for overflow logging.
#[derive(Debug, Error)]
#[error("queue full - ticket #{} rejected", .0.ticket_id)]
pub struct QueueFull(pub Ticket);

/// Fixed-capacity ring of tickets. Created empty; never resized.
#[derive(Debug)]
pub struct TicketQueue {
    slots: Vec<Option<Ticket>>,
    capacity: usize,
    /// Oldest occupied slot; `None` is the empty sentinel.
    front: Option<usize>,
    /// Newest occupied slot; only meaningful while `front` is `Some`.
    rear: usize,
}

impl TicketQueue {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            capacity,
            front: None,
            rear: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.front.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.front == Some((self.rear + 1) % self.capacity)
    }

    pub fn len(&self) -> usize {
        match self.front {
            None => 0,
            Some(f) if self.rear >= f => self.rear - f + 1,
            Some(f) => self.capacity - f + self.rear + 1,
        }
    }

    /// Occupancy as a percentage of capacity.
    pub fn occupancy_pct(&self) -> f64 {
        (self.len() as f64 * 100.0) / self.capacity as f64
    }

    /// Insert at the tail. O(1). Fails closed when full.
    pub fn admit(&mut self, ticket: Ticket) -> Result<(), QueueFull> {
        if self.is_full() {
            return Err(QueueFull(ticket));
        }
        match self.front {
            None => {
                self.front = Some(0);
                self.rear = 0;
            }
            Some(_) => {
                self.rear = (self.rear + 1) % self.capacity;
            }
        }
        self.slots[self.rear] = Some(ticket);
        Ok(())
    }

    /// Remove and return the head. O(1). `None` when empty.
    pub fn serve(&mut self) -> Option<Ticket> {
        let front = self.front?;
        let ticket = self.slots[front].take()?;
        if front == self.rear {
            self.front = None;
            self.rear = 0;
        } else {
            self.front = Some((front + 1) % self.capacity);
        }
        Some(ticket)
    }

    /// Peek at the head without removing it.
    pub fn peek(&self) -> Option<&Ticket> {
        self.slots[self.front?].as_ref()
    }

    /// Walk front to rear in FIFO order, across wraparound.
    pub fn iter(&self) -> impl Iterator<Item = &Ticket> {
        let start = self.front.unwrap_or(0);
        let len = self.len();
        (0..len).filter_map(move |i| self.slots[(start + i) % self.capacity].as_ref())
    }

    /// Visit every queued ticket mutably in FIFO order.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Ticket)) {
        let start = self.front.unwrap_or(0);
        let len = self.len();
        for i in 0..len {
            let idx = (start + i) % self.capacity;
            if let Some(ticket) = self.slots[idx].as_mut() {
                f(ticket);
            }
        }
    }

    /// Aggregate wait and priority statistics at `now`.
    pub fn stats(&self, now: DateTime<Utc>) -> QueueStats {
        let mut stats = QueueStats {
            total: 0,
            capacity: self.capacity,
            avg_wait_hours: 0.0,
            oldest_hours: 0,
            critical: 0,
            high: 0,
            medium: 0,
            low: 0,
        };

        let mut total_wait = 0.0;
        for ticket in self.iter() {
            stats.total += 1;
            let hours = ticket.hours_waited(now);
            total_wait += hours;
            if hours as u64 > stats.oldest_hours {
                stats.oldest_hours = hours as u64;
            }
            match ticket.priority {
                Priority::Critical => stats.critical += 1,
                Priority::High => stats.high += 1,
                Priority::Medium => stats.medium += 1,
                Priority::Low => stats.low += 1,
            }
        }

        if stats.total > 0 {
            stats.avg_wait_hours = total_wait / stats.total as f64;
        }
        stats
    }
}

/// Point-in-time queue statistics, also serialized into status.json.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub capacity: usize,
    pub avg_wait_hours: f64,
    pub oldest_hours: u64,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}
