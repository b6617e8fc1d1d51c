//! CSV record shapes for the three durable files.
//!
//! - pending submissions: 6 headerless fields from the submission front end
//! - live queue store: 8 fields, header row required
//! - resolved archive: live fields plus resolution timestamp and operator
//!
//! Parsing is quote-aware in the same minimal sense the files are written:
//! a quoted field may contain commas, nothing else is escaped. Every parse
//! failure is scoped to one record; callers attach line numbers.

use crate::ticket::{
    clamp_field, valid_email, valid_name, valid_ticket_id, FieldLimits, Priority, Ticket,
};
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

/// Header row of the live queue store.
pub const LIVE_HEADER: &str =
    "Ticket ID,Customer Name,Customer Email,Product,Purchase Date,Issue Description,Priority,Queue Entry Time";

/// Header row of the resolved archive.
pub const ARCHIVE_HEADER: &str =
    "Ticket ID,Customer Name,Customer Email,Product,Purchase Date,Issue Description,Priority,Queue Entry Time,Resolved At,Resolved By";

const PENDING_FIELDS: usize = 6;
const LIVE_FIELDS: usize = 8;
const ARCHIVE_FIELDS: usize = 10;

/// Why a single record was rejected.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("malformed record: {found} fields (expected {expected})")]
    FieldCount { found: usize, expected: usize },
    #[error("invalid ticket id '{0}'")]
    InvalidId(String),
    #[error("invalid email '{0}'")]
    InvalidEmail(String),
    #[error("invalid customer name")]
    InvalidName,
}

/// Split one CSV line into fields. Quotes toggle comma-significance and
/// are stripped from the output; they have no escape syntax.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut buf)),
            _ => buf.push(c),
        }
    }
    fields.push(buf);
    fields
}

/// Quote a free-text field. Embedded double quotes are dropped because
/// the format has no escape for them.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', ""))
}

fn parse_id(raw: &str) -> Result<u32, RecordError> {
    let id: u32 = raw
        .trim()
        .parse()
        .map_err(|_| RecordError::InvalidId(raw.trim().to_string()))?;
    if !valid_ticket_id(id) {
        return Err(RecordError::InvalidId(raw.trim().to_string()));
    }
    Ok(id)
}

/// A candidate ticket as submitted, before priority assignment and
/// admission stamping.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmission {
    pub ticket_id: u32,
    pub customer_name: String,
    pub email: String,
    pub product: String,
    pub purchase_date: String,
    pub issue_description: String,
}

/// Parse a headerless pending record. Field values are clamped to the
/// configured limits; id, email, and name must validate.
pub fn parse_pending(line: &str, limits: &FieldLimits) -> Result<PendingSubmission, RecordError> {
    let fields = split_fields(line);
    if fields.len() < PENDING_FIELDS {
        return Err(RecordError::FieldCount {
            found: fields.len(),
            expected: PENDING_FIELDS,
        });
    }

    let ticket_id = parse_id(&fields[0])?;
    let customer_name = clamp_field(&fields[1], limits.customer_name);
    let email = clamp_field(&fields[2], limits.email);
    if !valid_email(&email, limits.email) {
        return Err(RecordError::InvalidEmail(email));
    }
    if !valid_name(&customer_name, limits.customer_name) {
        return Err(RecordError::InvalidName);
    }

    Ok(PendingSubmission {
        ticket_id,
        customer_name,
        email,
        product: clamp_field(&fields[3], limits.product),
        purchase_date: clamp_field(&fields[4], limits.purchase_date),
        issue_description: clamp_field(&fields[5], limits.issue_description),
    })
}

/// Result of parsing a live-store record. When the stored priority string
/// was not one of the four known values, the ticket is admitted at Low and
/// the raw string is carried here for the caller's diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveParse {
    pub ticket: Ticket,
    pub corrected_priority: Option<String>,
}

/// Parse one live-store record. Same validation as pending, plus priority
/// (lenient, documented) and entry time (missing or garbage becomes `now`).
pub fn parse_live(
    line: &str,
    limits: &FieldLimits,
    now: DateTime<Utc>,
) -> Result<LiveParse, RecordError> {
    let fields = split_fields(line);
    if fields.len() < LIVE_FIELDS {
        return Err(RecordError::FieldCount {
            found: fields.len(),
            expected: LIVE_FIELDS,
        });
    }

    let ticket_id = parse_id(&fields[0])?;
    let customer_name = clamp_field(&fields[1], limits.customer_name);
    let email = clamp_field(&fields[2], limits.email);
    if !valid_email(&email, limits.email) {
        return Err(RecordError::InvalidEmail(email));
    }
    if !valid_name(&customer_name, limits.customer_name) {
        return Err(RecordError::InvalidName);
    }

    let raw_priority = fields[6].trim();
    let (priority, corrected_priority) = match raw_priority.parse::<Priority>() {
        Ok(p) => (p, None),
        Err(()) => (Priority::Low, Some(raw_priority.to_string())),
    };

    let queue_entry_time = parse_epoch(&fields[7]).unwrap_or(now);

    Ok(LiveParse {
        ticket: Ticket {
            ticket_id,
            customer_name,
            email,
            product: clamp_field(&fields[3], limits.product),
            purchase_date: clamp_field(&fields[4], limits.purchase_date),
            issue_description: clamp_field(&fields[5], limits.issue_description),
            priority,
            queue_entry_time,
        },
        corrected_priority,
    })
}

/// Encode a ticket as one live-store record.
pub fn encode_live(t: &Ticket) -> String {
    format!(
        "{},{},{},{},{},{},{},{}",
        t.ticket_id,
        quote(&t.customer_name),
        quote(&t.email),
        quote(&t.product),
        quote(&t.purchase_date),
        quote(&t.issue_description),
        t.priority,
        t.queue_entry_time.timestamp()
    )
}

/// One resolved-archive record.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveRecord {
    pub ticket_id: u32,
    pub customer_name: String,
    pub email: String,
    pub product: String,
    pub purchase_date: String,
    pub issue_description: String,
    pub priority: String,
    pub entry_epoch: i64,
    pub resolved_at: i64,
    pub resolved_by: String,
}

/// Encode the archive record appended when a ticket is resolved.
pub fn encode_archive(t: &Ticket, resolved_at: DateTime<Utc>, resolved_by: &str) -> String {
    format!(
        "{},{},{}",
        encode_live(t),
        resolved_at.timestamp(),
        resolved_by
    )
}

/// Parse one archive record. Archive scans skip bad lines, so only the
/// field count and id are hard requirements.
pub fn parse_archive(line: &str) -> Result<ArchiveRecord, RecordError> {
    let fields = split_fields(line);
    if fields.len() < ARCHIVE_FIELDS {
        return Err(RecordError::FieldCount {
            found: fields.len(),
            expected: ARCHIVE_FIELDS,
        });
    }
    let ticket_id = parse_id(&fields[0])?;
    Ok(ArchiveRecord {
        ticket_id,
        customer_name: fields[1].clone(),
        email: fields[2].clone(),
        product: fields[3].clone(),
        purchase_date: fields[4].clone(),
        issue_description: fields[5].clone(),
        priority: fields[6].trim().to_string(),
        entry_epoch: parse_epoch(&fields[7]).map(|t| t.timestamp()).unwrap_or(0),
        resolved_at: parse_epoch(&fields[8]).map(|t| t.timestamp()).unwrap_or(0),
        resolved_by: fields[9].trim().to_string(),
    })
}

fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = raw.trim().parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}
