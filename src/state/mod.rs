pub mod clock;
pub mod context;
pub mod recorder;
pub mod session;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use uuid::Uuid;

use crate::{config::AppConfig, dao::club_store::ClubStore, error::ServiceError};

pub use self::recorder::{AbortError, ApplyError, PlanError};
use self::session::RecorderSession;

pub type SharedState = Arc<AppState>;
/// Handle to one recorder session; the mutex serialises operations on it.
pub type SessionHandle = Arc<Mutex<RecorderSession>>;

/// Central application state: storage handle, degraded flag and live recorder sessions.
pub struct AppState {
    club_store: RwLock<Option<Arc<dyn ClubStore>>>,
    degraded: watch::Sender<bool>,
    sessions: DashMap<Uuid, SessionHandle>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            club_store: RwLock::new(None),
            degraded: degraded_tx,
            sessions: DashMap::new(),
            config,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn club_store(&self) -> Option<Arc<dyn ClubStore>> {
        let guard = self.club_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] while storage is unavailable.
    pub async fn require_store(&self) -> Result<Arc<dyn ClubStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.club_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_club_store(&self, store: Arc<dyn ClubStore>) {
        {
            let mut guard = self.club_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, notifying watchers only when it changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Register a session and return its handle.
    pub fn insert_session(&self, session: RecorderSession) -> SessionHandle {
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.insert(id, Arc::clone(&handle));
        handle
    }

    /// Look a session up by id.
    pub fn session(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop a session; its clock stops with it.
    pub fn remove_session(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.remove(&id).map(|(_, handle)| handle)
    }

    /// Number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Remove sessions idle past the configured TTL. Sessions currently in use are kept.
    pub fn sweep_sessions(&self) -> usize {
        let ttl = self.config.session_ttl();
        let before = self.sessions.len();
        self.sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => !session.is_expired(ttl),
            Err(_) => true,
        });
        before.saturating_sub(self.sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::dao::{
        club_store::memory::MemoryClubStore,
        models::{EventEntity, EventKind},
    };

    fn session() -> RecorderSession {
        let event = EventEntity {
            id: Uuid::new_v4(),
            kind: EventKind::Training,
            date: "2026-10-18".into(),
            time: "10:00".into(),
            place: "Gym".into(),
            description: String::new(),
            coach_id: Uuid::new_v4(),
            created_at: SystemTime::now(),
        };
        let coach = event.coach_id;
        RecorderSession::open(event, coach, Vec::new())
    }

    #[tokio::test]
    async fn degraded_until_store_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_store().await,
            Err(ServiceError::Degraded)
        ));

        let mut watcher = state.degraded_watcher();
        state
            .install_club_store(Arc::new(MemoryClubStore::new()))
            .await;
        assert!(!state.is_degraded());
        assert!(watcher.has_changed().unwrap());
        assert!(state.require_store().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_drops_idle_sessions_only() {
        let state = AppState::new(AppConfig::default().with_session_ttl(Duration::from_secs(60)));
        let idle = state.insert_session(session());
        let idle_id = idle.lock().await.id();

        tokio::time::advance(Duration::from_secs(45)).await;
        let fresh = state.insert_session(session());
        let fresh_id = fresh.lock().await.id();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(state.sweep_sessions(), 1);
        assert!(state.session(idle_id).is_none());
        assert!(state.session(fresh_id).is_some());
    }
}
