use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{dao::models::EnrollmentEntity, dto::format_system_time};

/// Body of `POST /enrollments`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateEnrollmentRequest {
    #[validate(required)]
    pub player_id: Option<Uuid>,
    #[validate(required)]
    pub event_id: Option<Uuid>,
}

/// `?event_id=` query shared by enrollment and attendance routes.
#[derive(Debug, Deserialize, IntoParams)]
pub struct EventQuery {
    /// Event identifier.
    pub event_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct EnrollmentSummary {
    pub player_id: Uuid,
    pub event_id: Uuid,
    pub enrolled: bool,
    pub created_at: String,
}

impl From<EnrollmentEntity> for EnrollmentSummary {
    fn from(enrollment: EnrollmentEntity) -> Self {
        Self {
            player_id: enrollment.player_id,
            event_id: enrollment.event_id,
            enrolled: enrollment.enrolled,
            created_at: format_system_time(enrollment.created_at),
        }
    }
}
