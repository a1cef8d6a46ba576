use serde::Serialize;
use utoipa::ToSchema;

/// Body of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when a storage backend answers, `degraded` otherwise.
    pub status: &'static str,
    /// Recorder sessions currently held in memory.
    pub active_sessions: usize,
}

impl HealthResponse {
    pub fn new(degraded: bool, active_sessions: usize) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" },
            active_sessions,
        }
    }
}
