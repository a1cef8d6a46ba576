use axum::Router;

use crate::state::SharedState;

pub mod attendance;
pub mod auth;
pub mod docs;
pub mod enrollments;
pub mod events;
pub mod health;
pub mod recorder;
pub mod statistics;
pub mod users;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(users::router())
        .merge(events::router())
        .merge(enrollments::router())
        .merge(attendance::router(state.clone()))
        .merge(statistics::router(state.clone()))
        .merge(recorder::router(state.clone()))
        .merge(docs::router())
        .with_state(state)
}
