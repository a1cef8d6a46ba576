use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the club statistics backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::users::register_user,
        crate::routes::users::resolve_role,
        crate::routes::users::batch_users,
        crate::routes::users::enrollment_status,
        crate::routes::users::player_statistics,
        crate::routes::events::create_event,
        crate::routes::events::list_events,
        crate::routes::events::verify_event,
        crate::routes::enrollments::enroll,
        crate::routes::enrollments::list_event_enrollments,
        crate::routes::attendance::verify_attendance,
        crate::routes::attendance::record_attendance,
        crate::routes::attendance::view_attendance,
        crate::routes::attendance::attendance_events,
        crate::routes::statistics::correct_statistic,
        crate::routes::recorder::open_session,
        crate::routes::recorder::session_view,
        crate::routes::recorder::toggle_presence,
        crate::routes::recorder::start_match,
        crate::routes::recorder::adjust_stat,
        crate::routes::recorder::finish_match,
        crate::routes::recorder::discard_session,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::phase::VisibleRecorderPhase,
            crate::dao::models::Role,
            crate::dao::models::EventKind,
            crate::dao::models::StatField,
            crate::dao::models::ShotKind,
            crate::dao::models::BoxScore,
            crate::dao::models::ShotBreakdownEntity,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Member profiles and roles"),
        (name = "events", description = "Trainings and matches"),
        (name = "enrollments", description = "Player registrations to events"),
        (name = "attendance", description = "Recorded attendance and aggregated views"),
        (name = "statistics", description = "Per-player statistic corrections"),
        (name = "recorder", description = "Live attendance recorder sessions"),
    )
)]
pub struct ApiDoc;
