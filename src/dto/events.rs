use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{EventEntity, EventKind},
    dto::{
        format_system_time,
        validation::{validate_date, validate_non_blank, validate_time},
    },
};

/// Payload used by a coach to schedule a training or a match.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateEventRequest {
    /// `training` or `match`, case-insensitive.
    #[serde(default)]
    #[validate(custom(function = "validate_non_blank"))]
    pub kind: String,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    #[validate(custom(function = "validate_date"))]
    pub date: String,
    /// `HH:MM`; trailing seconds are dropped.
    #[serde(default)]
    #[validate(custom(function = "validate_time"))]
    pub time: String,
    #[serde(default)]
    #[validate(custom(function = "validate_non_blank"))]
    pub place: String,
    #[serde(default)]
    #[validate(custom(function = "validate_non_blank"))]
    pub description: String,
    #[validate(required)]
    pub coach_id: Option<Uuid>,
}

/// `?id=` query; parsed by hand so a bad id yields a JSON 400.
#[derive(Debug, Deserialize, IntoParams)]
pub struct EventIdQuery {
    /// Event identifier.
    pub id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct EventSummary {
    pub id: Uuid,
    pub kind: EventKind,
    pub date: String,
    pub time: String,
    pub place: String,
    pub description: String,
    pub coach_id: Uuid,
    pub created_at: String,
}

impl From<EventEntity> for EventSummary {
    fn from(event: EventEntity) -> Self {
        Self {
            id: event.id,
            kind: event.kind,
            date: event.date,
            time: event.time,
            place: event.place,
            description: event.description,
            coach_id: event.coach_id,
            created_at: format_system_time(event.created_at),
        }
    }
}
