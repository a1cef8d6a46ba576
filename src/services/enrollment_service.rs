//! Enrollment ledger: one registration per (player, event).

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{EnrollmentEntity, Role},
    dto::enrollments::{CreateEnrollmentRequest, EnrollmentSummary},
    error::ServiceError,
    services::{event_service::load_event, user_service::load_user_with_role},
    state::SharedState,
};

/// Enroll a player in an event. A second enrollment of the same pair is a conflict,
/// enforced by the store's unique key.
pub async fn enroll(
    state: &SharedState,
    request: CreateEnrollmentRequest,
) -> Result<EnrollmentSummary, ServiceError> {
    let (player_id, event_id) = match (request.player_id, request.event_id) {
        (Some(player_id), Some(event_id)) => (player_id, event_id),
        _ => {
            return Err(ServiceError::InvalidInput(
                "`player_id` and `event_id` are required".into(),
            ));
        }
    };

    let store = state.require_store().await?;
    load_user_with_role(&store, player_id, Role::Player).await?;
    load_event(&store, event_id).await?;

    let enrollment = EnrollmentEntity {
        player_id,
        event_id,
        enrolled: true,
        created_at: SystemTime::now(),
    };
    store.insert_enrollment(enrollment.clone()).await?;
    info!(%player_id, %event_id, "player enrolled");
    Ok(enrollment.into())
}

/// Active enrollments of an event, in enrollment order.
pub async fn list_event_enrollments(
    state: &SharedState,
    event_id: Uuid,
) -> Result<Vec<EnrollmentSummary>, ServiceError> {
    let store = state.require_store().await?;
    load_event(&store, event_id).await?;
    Ok(store
        .list_event_enrollments(event_id)
        .await?
        .into_iter()
        .filter(|enrollment| enrollment.enrolled)
        .map(EnrollmentSummary::from)
        .collect())
}
