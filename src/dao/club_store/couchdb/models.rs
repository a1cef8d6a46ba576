use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const USER_PREFIX: &str = "user::";
pub const EVENT_PREFIX: &str = "event::";
pub const ENROLLMENT_PREFIX: &str = "enrollment::";
pub const ATTENDANCE_PREFIX: &str = "attendance::";
pub const STATISTIC_PREFIX: &str = "statistic::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

/// Row of `_all_docs`; rows for unknown keys carry no `doc`.
#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Any entity wrapped with the CouchDB bookkeeping fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDocument<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> CouchDocument<T> {
    /// Wrap a body for a first write (no revision).
    pub fn new(id: String, body: T) -> Self {
        Self {
            id,
            rev: None,
            body,
        }
    }
}

pub fn user_doc_id(id: Uuid) -> String {
    format!("{USER_PREFIX}{id}")
}

pub fn event_doc_id(id: Uuid) -> String {
    format!("{EVENT_PREFIX}{id}")
}

/// Enrollments sort under their event so one range read lists an event's roster.
pub fn enrollment_doc_id(event_id: Uuid, player_id: Uuid) -> String {
    format!("{ENROLLMENT_PREFIX}{event_id}::{player_id}")
}

pub fn event_enrollment_prefix(event_id: Uuid) -> String {
    format!("{ENROLLMENT_PREFIX}{event_id}::")
}

pub fn attendance_doc_id(event_id: Uuid) -> String {
    format!("{ATTENDANCE_PREFIX}{event_id}")
}

pub fn statistic_doc_id(event_id: Uuid, player_id: Uuid) -> String {
    format!("{STATISTIC_PREFIX}{event_id}::{player_id}")
}

pub fn event_statistic_prefix(event_id: Uuid) -> String {
    format!("{STATISTIC_PREFIX}{event_id}::")
}
