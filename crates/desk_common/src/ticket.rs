//! Ticket record, priority ordering, and field validation.
//!
//! A ticket's identity and submission fields are fixed once admitted;
//! only `priority` changes afterwards (escalation never downgrades).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest accepted ticket id.
pub const MIN_TICKET_ID: u32 = 1;

/// Largest accepted ticket id.
pub const MAX_TICKET_ID: u32 = 999_999;

/// Shortest string that can plausibly be an email (`a@b` is 3).
pub const MIN_EMAIL_LEN: usize = 3;

/// Shortest accepted customer name.
pub const MIN_NAME_LEN: usize = 2;

/// Ticket priority. The derived order (Low < Medium < High < Critical)
/// is what makes escalation monotonicity checkable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// All priorities, highest first (snapshot rendering order).
    pub const ALL_DESC: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Priority::Low),
            "Medium" => Ok(Priority::Medium),
            "High" => Ok(Priority::High),
            "Critical" => Ok(Priority::Critical),
            _ => Err(()),
        }
    }
}

/// Maximum lengths for the free-text submission fields, in characters.
/// Overlong input is truncated at parse time, not rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldLimits {
    pub customer_name: usize,
    pub email: usize,
    pub product: usize,
    pub purchase_date: usize,
    pub issue_description: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            customer_name: 100,
            email: 100,
            product: 100,
            purchase_date: 50,
            issue_description: 200,
        }
    }
}

/// One customer support request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: u32,
    pub customer_name: String,
    pub email: String,
    pub product: String,
    pub purchase_date: String,
    pub issue_description: String,
    pub priority: Priority,
    /// Stamped once at admission, never changed afterwards.
    pub queue_entry_time: DateTime<Utc>,
}

impl Ticket {
    /// Hours this ticket has been waiting at `now`. Clamped at zero so a
    /// skewed clock can never produce a negative wait.
    pub fn hours_waited(&self, now: DateTime<Utc>) -> f64 {
        let secs = (now - self.queue_entry_time).num_seconds();
        (secs.max(0) as f64) / 3600.0
    }
}

/// Ticket ids live in a fixed range; zero and negative parse results are
/// rejected upstream by `u32` parsing.
pub fn valid_ticket_id(id: u32) -> bool {
    (MIN_TICKET_ID..=MAX_TICKET_ID).contains(&id)
}

/// Shape check only: an `@` with a `.` somewhere after it and at least
/// one character after the final dot. Deliverability is not our problem.
pub fn valid_email(email: &str, max_len: usize) -> bool {
    let len = email.chars().count();
    if len < MIN_EMAIL_LEN || len > max_len {
        return false;
    }
    let at = match email.find('@') {
        Some(i) => i,
        None => return false,
    };
    match email.rfind('.') {
        Some(dot) if dot > at => email.len() - dot >= 2,
        _ => false,
    }
}

/// Names must fit the limit and contain at least one non-whitespace char.
pub fn valid_name(name: &str, max_len: usize) -> bool {
    let len = name.chars().count();
    if len < MIN_NAME_LEN || len > max_len {
        return false;
    }
    name.chars().any(|c| !c.is_whitespace())
}

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn clamp_field(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
