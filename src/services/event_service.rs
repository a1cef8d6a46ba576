//! Event registry: creation, lookup and listing.

use std::{sync::Arc, time::SystemTime};

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{
        club_store::ClubStore,
        models::{EventEntity, EventKind, Role},
    },
    dto::{
        events::{CreateEventRequest, EventSummary},
        validation::normalize_time,
    },
    error::ServiceError,
    services::user_service::load_user_with_role,
    state::SharedState,
};

/// Fetch an event or fail with [`ServiceError::NotFound`].
pub(crate) async fn load_event(
    store: &Arc<dyn ClubStore>,
    id: Uuid,
) -> Result<EventEntity, ServiceError> {
    store
        .find_event(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("event `{id}` not found")))
}

/// Schedule a training or a match on behalf of a coach.
pub async fn create_event(
    state: &SharedState,
    request: CreateEventRequest,
) -> Result<EventSummary, ServiceError> {
    let kind = EventKind::parse(&request.kind).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "unknown event kind `{}`; expected training or match",
            request.kind
        ))
    })?;
    let time = normalize_time(&request.time)
        .ok_or_else(|| ServiceError::InvalidInput(format!("invalid time `{}`", request.time)))?;
    let coach_id = request
        .coach_id
        .ok_or_else(|| ServiceError::InvalidInput("missing `coach_id`".into()))?;

    let store = state.require_store().await?;
    load_user_with_role(&store, coach_id, Role::Coach).await?;

    let event = EventEntity {
        id: Uuid::new_v4(),
        kind,
        date: request.date.trim().to_owned(),
        time,
        place: request.place.trim().to_owned(),
        description: request.description.trim().to_owned(),
        coach_id,
        created_at: SystemTime::now(),
    };
    store.insert_event(event.clone()).await?;
    info!(event_id = %event.id, %coach_id, kind = ?event.kind, date = %event.date, "created event");
    Ok(event.into())
}

pub async fn verify_event(state: &SharedState, id: Uuid) -> Result<EventSummary, ServiceError> {
    let store = state.require_store().await?;
    Ok(load_event(&store, id).await?.into())
}

/// Every event, by date then start time.
pub async fn list_events(state: &SharedState) -> Result<Vec<EventSummary>, ServiceError> {
    let store = state.require_store().await?;
    let mut events = store.list_events().await?;
    events.sort_by(|a, b| (&a.date, &a.time).cmp(&(&b.date, &b.time)));
    Ok(events.into_iter().map(EventSummary::from).collect())
}
