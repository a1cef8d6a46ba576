use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod attendance;
pub mod enrollments;
pub mod events;
pub mod health;
pub mod phase;
pub mod recorder;
pub mod statistics;
pub mod users;
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
