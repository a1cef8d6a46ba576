//! Attendance recorder sessions: open a roster, mark presence, run the match and persist
//! the result exactly once.
//!
//! Sessions live only in memory. Each one is guarded by its own mutex, so operations on a
//! session are serialised while different sessions proceed independently.

use std::{collections::HashMap, time::Duration};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::Role,
    dto::{
        recorder::{AdjustStatRequest, FinishMatchResponse, OpenSessionRequest, SessionView},
        validation::coerce_stat_value,
    },
    error::ServiceError,
    services::{
        attendance_service::{mirror_statistics, write_record},
        event_service::load_event,
    },
    state::{
        SessionHandle, SharedState,
        context::SessionContext,
        recorder::{RecorderEvent, RecorderPhase},
        session::{RecorderSession, RosterEntry},
    },
};

const ALREADY_RECORDED: &str = "attendance for this event is already recorded; read-only";
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn ensure_coach(ctx: &SessionContext) -> Result<(), ServiceError> {
    if ctx.role == Role::Coach {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "user `{}` is not a coach",
            ctx.user_id
        )))
    }
}

fn session_handle(state: &SharedState, id: Uuid) -> Result<SessionHandle, ServiceError> {
    state
        .session(id)
        .ok_or_else(|| ServiceError::NotFound(format!("recorder session `{id}` not found")))
}

fn view(state: &SharedState, session: &RecorderSession) -> SessionView {
    SessionView::new(session, state.config().min_present_players())
}

/// Run `op` on a session owned by the caller, refreshing its idle timer.
async fn with_session<T>(
    state: &SharedState,
    ctx: &SessionContext,
    id: Uuid,
    op: impl FnOnce(&mut RecorderSession) -> Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    let handle = session_handle(state, id)?;
    let mut session = handle.lock().await;
    session.ensure_owner(ctx.user_id)?;
    session.touch();
    op(&mut *session)
}

/// Open a recorder session for an event.
///
/// The roster is every active enrollment in enrollment order. An event that already has
/// recorded attendance yields a locked, read-only session.
pub async fn open_session(
    state: &SharedState,
    ctx: &SessionContext,
    request: OpenSessionRequest,
) -> Result<SessionView, ServiceError> {
    ensure_coach(ctx)?;
    let event_id = request
        .event_id
        .ok_or_else(|| ServiceError::InvalidInput("missing `event_id`".into()))?;

    let store = state.require_store().await?;
    let event = load_event(&store, event_id).await?;

    if store.find_attendance(event_id).await?.is_some() {
        let session = RecorderSession::locked(event, ctx.user_id, ALREADY_RECORDED);
        info!(%event_id, session_id = %session.id(), "opened locked recorder session");
        let handle = state.insert_session(session);
        let session = handle.lock().await;
        return Ok(view(state, &session));
    }

    let player_ids: Vec<Uuid> = store
        .list_event_enrollments(event_id)
        .await?
        .into_iter()
        .filter(|enrollment| enrollment.enrolled)
        .map(|enrollment| enrollment.player_id)
        .collect();
    let users: HashMap<Uuid, _> = store
        .find_users(player_ids.clone())
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();
    let roster = player_ids
        .iter()
        .map(|player_id| RosterEntry::new(*player_id, users.get(player_id)))
        .collect::<Vec<_>>();

    let session = RecorderSession::open(event, ctx.user_id, roster);
    info!(
        %event_id,
        session_id = %session.id(),
        coach_id = %ctx.user_id,
        roster = player_ids.len(),
        "opened recorder session"
    );
    let handle = state.insert_session(session);
    let session = handle.lock().await;
    Ok(view(state, &session))
}

pub async fn session_view(
    state: &SharedState,
    ctx: &SessionContext,
    id: Uuid,
) -> Result<SessionView, ServiceError> {
    with_session(state, ctx, id, |session| Ok(view(state, session))).await
}

/// Flip the presence of the roster entry at `index` (roster phase only).
pub async fn toggle_presence(
    state: &SharedState,
    ctx: &SessionContext,
    id: Uuid,
    index: usize,
) -> Result<SessionView, ServiceError> {
    with_session(state, ctx, id, |session| {
        let present = session.toggle_presence(index)?.present;
        debug!(session_id = %id, index, present, "toggled presence");
        Ok(view(state, session))
    })
    .await
}

/// Start the match once enough players are present.
pub async fn start_match(
    state: &SharedState,
    ctx: &SessionContext,
    id: Uuid,
) -> Result<SessionView, ServiceError> {
    let min_present = state.config().min_present_players();
    with_session(state, ctx, id, |session| {
        session.start_match(min_present)?;
        info!(session_id = %id, present = session.present_count(), "match started");
        Ok(view(state, session))
    })
    .await
}

/// Overwrite one counter of the on-court player at `index` (live phase only).
pub async fn adjust_stat(
    state: &SharedState,
    ctx: &SessionContext,
    id: Uuid,
    index: usize,
    request: AdjustStatRequest,
) -> Result<SessionView, ServiceError> {
    let value = coerce_stat_value(&request.value);
    with_session(state, ctx, id, |session| {
        session.adjust_stat(index, request.field, value)?;
        debug!(session_id = %id, index, field = ?request.field, value, "adjusted statistic");
        Ok(view(state, session))
    })
    .await
}

/// Persist the match and move to done.
///
/// A failed write leaves the session live with its clock running. When another writer
/// recorded the event first, the session locks and the caller gets a conflict.
pub async fn finish_match(
    state: &SharedState,
    ctx: &SessionContext,
    id: Uuid,
) -> Result<FinishMatchResponse, ServiceError> {
    let handle = session_handle(state, id)?;
    let mut session = handle.lock().await;
    session.ensure_owner(ctx.user_id)?;
    session.touch();

    let store = state.require_store().await?;
    let finished = session.finished_match()?;
    let record = finished.record.clone();
    let event_id = record.event_id;

    let outcome = session
        .machine_mut()
        .run_transition(RecorderEvent::FinishMatch, None, || {
            write_record(state, &store, record)
        })
        .await;

    match outcome {
        Ok(((), phase)) => {
            session.complete();
            debug_assert_eq!(phase, RecorderPhase::Done);
            let present = finished.record.present_count();
            let absent = finished.record.absent_count();
            info!(
                %event_id,
                session_id = %id,
                present,
                absent,
                duration = %finished.record.duration,
                "match finished and attendance recorded"
            );
            let statistics_saved = mirror_statistics(&store, finished.statistics).await;
            Ok(FinishMatchResponse {
                session_id: id,
                event_id,
                duration: finished.record.duration,
                present,
                absent,
                team_totals: finished.record.team_totals,
                statistics_saved,
            })
        }
        Err(ServiceError::Conflict(message)) => {
            warn!(%event_id, session_id = %id, %message, "attendance recorded elsewhere; locking session");
            session.lock_out(ALREADY_RECORDED)?;
            Err(ServiceError::Conflict(message))
        }
        Err(err) => {
            warn!(%event_id, session_id = %id, error = %err, "failed to record attendance; session stays live");
            Err(err)
        }
    }
}

/// Drop a session in any phase. Nothing is persisted.
pub async fn discard_session(
    state: &SharedState,
    ctx: &SessionContext,
    id: Uuid,
) -> Result<(), ServiceError> {
    let handle = session_handle(state, id)?;
    {
        let session = handle.lock().await;
        session.ensure_owner(ctx.user_id)?;
    }
    state.remove_session(id);
    info!(session_id = %id, "discarded recorder session");
    Ok(())
}

/// Periodically drop sessions left idle past the configured TTL.
pub async fn run_sweeper(state: SharedState) {
    let mut ticks = interval(SWEEP_INTERVAL);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        let swept = state.sweep_sessions();
        if swept > 0 {
            info!(swept, remaining = state.session_count(), "swept idle recorder sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::SystemTime};

    use serde_json::json;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            club_store::{ClubStore, memory::MemoryClubStore},
            models::{BoxScore, EnrollmentEntity, EventEntity, EventKind, StatField, UserEntity},
        },
        dto::phase::VisibleRecorderPhase,
        state::AppState,
    };

    struct Fixture {
        state: SharedState,
        store: MemoryClubStore,
        ctx: SessionContext,
        players: Vec<UserEntity>,
        event: EventEntity,
    }

    fn member(first: &str, role: Role) -> UserEntity {
        UserEntity {
            id: Uuid::new_v4(),
            first_name: first.into(),
            last_name: "Test".into(),
            position: Some("Base".into()),
            role,
        }
    }

    async fn fixture() -> Fixture {
        let store = MemoryClubStore::new();
        let coach = member("Coach", Role::Coach);
        let players = vec![
            member("A", Role::Player),
            member("B", Role::Player),
            member("C", Role::Player),
        ];
        let event = EventEntity {
            id: Uuid::new_v4(),
            kind: EventKind::Match,
            date: "2026-11-01".into(),
            time: "18:00".into(),
            place: "Main court".into(),
            description: "League".into(),
            coach_id: coach.id,
            created_at: SystemTime::now(),
        };
        store.save_user(coach.clone()).await.unwrap();
        store.insert_event(event.clone()).await.unwrap();
        for (offset, player) in players.iter().enumerate() {
            store.save_user(player.clone()).await.unwrap();
            store
                .insert_enrollment(EnrollmentEntity {
                    player_id: player.id,
                    event_id: event.id,
                    enrolled: true,
                    created_at: SystemTime::UNIX_EPOCH + Duration::from_secs(offset as u64),
                })
                .await
                .unwrap();
        }

        let state = AppState::new(AppConfig::default());
        state.install_club_store(Arc::new(store.clone())).await;
        Fixture {
            state,
            store,
            ctx: SessionContext::from(&coach),
            players,
            event,
        }
    }

    async fn open(fx: &Fixture) -> SessionView {
        open_session(
            &fx.state,
            &fx.ctx,
            OpenSessionRequest {
                event_id: Some(fx.event.id),
            },
        )
        .await
        .unwrap()
    }

    fn set(field: StatField, value: serde_json::Value) -> AdjustStatRequest {
        AdjustStatRequest { field, value }
    }

    /// A and B present, C absent; A scores 10 with 5 rebounds, B scores 4 with 2 assists.
    async fn play_scenario(fx: &Fixture) -> Uuid {
        let id = open(fx).await.id;
        toggle_presence(&fx.state, &fx.ctx, id, 0).await.unwrap();
        toggle_presence(&fx.state, &fx.ctx, id, 1).await.unwrap();
        let live = start_match(&fx.state, &fx.ctx, id).await.unwrap();
        assert_eq!(live.phase, VisibleRecorderPhase::Live);
        assert_eq!(live.on_court.len(), 2);
        assert_eq!(live.bench.len(), 1);

        adjust_stat(&fx.state, &fx.ctx, id, 0, set(StatField::Points, json!(10)))
            .await
            .unwrap();
        adjust_stat(&fx.state, &fx.ctx, id, 0, set(StatField::Rebounds, json!("5")))
            .await
            .unwrap();
        adjust_stat(&fx.state, &fx.ctx, id, 1, set(StatField::Points, json!(4)))
            .await
            .unwrap();
        let view = adjust_stat(&fx.state, &fx.ctx, id, 1, set(StatField::Assists, json!(2.0)))
            .await
            .unwrap();
        assert_eq!(view.team_totals.points, 14);
        id
    }

    #[tokio::test(start_paused = true)]
    async fn finished_match_records_every_enrolled_player() {
        let fx = fixture().await;
        let id = play_scenario(&fx).await;
        tokio::time::advance(Duration::from_secs(300)).await;

        let done = finish_match(&fx.state, &fx.ctx, id).await.unwrap();
        assert_eq!(done.duration, "05:00");
        assert_eq!((done.present, done.absent), (2, 1));
        assert_eq!(
            done.team_totals,
            BoxScore {
                points: 14,
                rebounds: 5,
                assists: 2,
                steals: 0,
                blocks: 0,
            }
        );
        assert_eq!(done.statistics_saved, 2);

        let record = fx.store.find_attendance(fx.event.id).await.unwrap().unwrap();
        assert_eq!(record.results.len(), 3);
        let c_absent = record
            .results
            .iter()
            .find(|row| row.player_id == fx.players[2].id)
            .unwrap();
        assert!(!c_absent.present);
        assert_eq!(c_absent.score, BoxScore::default());

        let view = session_view(&fx.state, &fx.ctx, id).await.unwrap();
        assert_eq!(view.phase, VisibleRecorderPhase::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn reopening_recorded_event_is_locked() {
        let fx = fixture().await;
        let id = play_scenario(&fx).await;
        finish_match(&fx.state, &fx.ctx, id).await.unwrap();

        let locked = open(&fx).await;
        assert_eq!(locked.phase, VisibleRecorderPhase::Locked);
        assert!(locked.roster.is_empty());
        assert!(locked.notice.is_some());
        assert!(matches!(
            toggle_presence(&fx.state, &fx.ctx, locked.id, 0).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn start_requires_minimum_presence() {
        let fx = fixture().await;
        let id = open(&fx).await.id;
        toggle_presence(&fx.state, &fx.ctx, id, 1).await.unwrap();

        assert!(matches!(
            start_match(&fx.state, &fx.ctx, id).await,
            Err(ServiceError::InvalidInput(_))
        ));
        let view = session_view(&fx.state, &fx.ctx, id).await.unwrap();
        assert_eq!(view.phase, VisibleRecorderPhase::Roster);
        assert_eq!(view.present_count, 1);
        assert!(view.roster[1].present);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_keeps_session_live() {
        let fx = fixture().await;
        let id = play_scenario(&fx).await;
        fx.store.reject_attendance_writes(true);

        assert!(matches!(
            finish_match(&fx.state, &fx.ctx, id).await,
            Err(ServiceError::Unavailable(_))
        ));
        let view = session_view(&fx.state, &fx.ctx, id).await.unwrap();
        assert_eq!(view.phase, VisibleRecorderPhase::Live);
        assert_eq!(view.team_totals.points, 14);
        assert!(fx.store.find_attendance(fx.event.id).await.unwrap().is_none());

        fx.store.reject_attendance_writes(false);
        finish_match(&fx.state, &fx.ctx, id).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn racing_finisher_gets_conflict_and_locks() {
        let fx = fixture().await;
        let first = play_scenario(&fx).await;
        let second = play_scenario(&fx).await;

        finish_match(&fx.state, &fx.ctx, first).await.unwrap();
        assert!(matches!(
            finish_match(&fx.state, &fx.ctx, second).await,
            Err(ServiceError::Conflict(_))
        ));
        let view = session_view(&fx.state, &fx.ctx, second).await.unwrap();
        assert_eq!(view.phase, VisibleRecorderPhase::Locked);

        let record = fx.store.find_attendance(fx.event.id).await.unwrap().unwrap();
        assert_eq!(record.results.len(), 3);
    }

    #[tokio::test]
    async fn sessions_belong_to_their_coach() {
        let fx = fixture().await;
        let id = open(&fx).await.id;
        let other = SessionContext::from(&member("Other", Role::Coach));

        assert!(matches!(
            session_view(&fx.state, &other, id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            discard_session(&fx.state, &other, id).await,
            Err(ServiceError::Forbidden(_))
        ));

        discard_session(&fx.state, &fx.ctx, id).await.unwrap();
        assert!(matches!(
            session_view(&fx.state, &fx.ctx, id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(fx.store.find_attendance(fx.event.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn players_cannot_open_sessions() {
        let fx = fixture().await;
        let player = SessionContext::from(&fx.players[0]);
        assert!(matches!(
            open_session(
                &fx.state,
                &player,
                OpenSessionRequest {
                    event_id: Some(fx.event.id)
                }
            )
            .await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}
