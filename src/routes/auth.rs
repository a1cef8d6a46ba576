use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    dao::models::Role, error::AppError, services::user_service, state::SharedState,
};

/// Header carrying the caller's user id on gated routes.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolve the `x-user-id` header to a coach and expose the resulting
/// [`SessionContext`](crate::state::context::SessionContext) to handlers.
pub async fn require_coach(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let raw = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized(format!("missing `{USER_ID_HEADER}` header")))?;
    let user_id = Uuid::parse_str(raw)
        .map_err(|_| AppError::Unauthorized(format!("`{raw}` is not a valid user id")))?;

    let ctx = user_service::resolve_context(&state, user_id, Role::Coach).await?;
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}
