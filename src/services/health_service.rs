use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report storage reachability and the number of open recorder sessions.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    HealthResponse::new(state.is_degraded(), state.session_count())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::club_store::memory::MemoryClubStore, state::AppState};

    #[tokio::test]
    async fn reports_degraded_until_storage_installed() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await.status, "degraded");

        state
            .install_club_store(Arc::new(MemoryClubStore::new()))
            .await;
        let health = health_status(&state).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.active_sessions, 0);
    }
}
