//! Attendance records: existence checks, the one-call record contract, the aggregated view
//! and the per-user event listing.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::SystemTime,
};

use time::{OffsetDateTime, macros::format_description};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        club_store::ClubStore,
        models::{
            AttendanceRecordEntity, AttendanceResultEntity, BoxScore, PlayerStatisticEntity, Role,
        },
    },
    dto::attendance::{
        AttendanceCheckResponse, AttendanceEventItem, AttendanceView, RecordAttendanceRequest,
        RecordAttendanceResponse,
    },
    error::ServiceError,
    services::{
        aggregator::{AggregationInput, aggregate},
        event_service::load_event,
        user_service::load_user_with_role,
    },
    state::{SharedState, context::SessionContext},
};

const DEFAULT_DURATION: &str = "00:00";

/// Whether attendance was already recorded for an event.
pub async fn verify_attendance(
    state: &SharedState,
    event_id: Uuid,
) -> Result<AttendanceCheckResponse, ServiceError> {
    let store = state.require_store().await?;
    let record = store.find_attendance(event_id).await?;
    Ok(AttendanceCheckResponse {
        event_id,
        exists: record.is_some(),
        count: record.map_or(0, |record| record.results.len()),
    })
}

/// Insert a complete attendance record, bounded by the configured storage timeout.
pub(crate) async fn write_record(
    state: &SharedState,
    store: &Arc<dyn ClubStore>,
    record: AttendanceRecordEntity,
) -> Result<(), ServiceError> {
    match timeout(state.config().storage_timeout(), store.insert_attendance(record)).await {
        Ok(result) => result.map_err(ServiceError::from),
        Err(_) => Err(ServiceError::Timeout),
    }
}

/// Mirror statistics for present players. Failures are logged and skipped.
pub(crate) async fn mirror_statistics(
    store: &Arc<dyn ClubStore>,
    statistics: Vec<PlayerStatisticEntity>,
) -> usize {
    let mut saved = 0;
    for statistic in statistics {
        let (player_id, event_id) = (statistic.player_id, statistic.event_id);
        match store.upsert_statistic(statistic).await {
            Ok(()) => saved += 1,
            Err(err) => {
                warn!(%player_id, %event_id, error = %err, "failed to mirror player statistic")
            }
        }
    }
    saved
}

/// Record a finished event in one call.
///
/// Every enrolled player gets one row; those missing from the request are absent with zero
/// counters. Players who are not enrolled are ignored.
pub async fn record_attendance(
    state: &SharedState,
    ctx: &SessionContext,
    request: RecordAttendanceRequest,
) -> Result<RecordAttendanceResponse, ServiceError> {
    let event_id = request
        .event_id
        .ok_or_else(|| ServiceError::InvalidInput("missing `event_id`".into()))?;
    if request.players.is_empty() {
        return Err(ServiceError::InvalidInput("no players to record".into()));
    }

    let store = state.require_store().await?;
    let event = load_event(&store, event_id).await?;

    let mut scores: HashMap<Uuid, BoxScore> = HashMap::with_capacity(request.players.len());
    for player in &request.players {
        if scores.insert(player.player_id, player.score()).is_some() {
            return Err(ServiceError::InvalidInput(format!(
                "player `{}` listed twice",
                player.player_id
            )));
        }
    }

    let enrolled: Vec<Uuid> = store
        .list_event_enrollments(event_id)
        .await?
        .into_iter()
        .filter(|enrollment| enrollment.enrolled)
        .map(|enrollment| enrollment.player_id)
        .collect();
    let enrolled_set: HashSet<Uuid> = enrolled.iter().copied().collect();
    for stray in scores.keys().filter(|id| !enrolled_set.contains(id)) {
        warn!(%event_id, player_id = %stray, "ignoring counters of a player not enrolled");
    }

    let results: Vec<AttendanceResultEntity> = enrolled
        .iter()
        .map(|player_id| match scores.get(player_id) {
            Some(score) => AttendanceResultEntity {
                player_id: *player_id,
                present: true,
                score: *score,
            },
            None => AttendanceResultEntity {
                player_id: *player_id,
                present: false,
                score: BoxScore::default(),
            },
        })
        .collect();
    if !results.iter().any(|result| result.present) {
        return Err(ServiceError::InvalidInput(format!(
            "none of the listed players is enrolled in event `{event_id}`"
        )));
    }

    if request.team_totals.is_some() {
        warn!(%event_id, "ignoring client team totals; recomputing from present players");
    }
    let team_totals = BoxScore::total(
        results
            .iter()
            .filter(|result| result.present)
            .map(|result| &result.score),
    );
    let record = AttendanceRecordEntity {
        event_id: event.id,
        coach_id: event.coach_id,
        duration: request
            .duration
            .unwrap_or_else(|| DEFAULT_DURATION.to_owned()),
        team_totals,
        results,
        recorded_at: SystemTime::now(),
    };
    let (present, absent) = (record.present_count(), record.absent_count());
    let duration = record.duration.clone();
    let statistics: Vec<PlayerStatisticEntity> = record
        .results
        .iter()
        .filter(|result| result.present)
        .map(|result| PlayerStatisticEntity::from_score(result.player_id, event_id, &result.score))
        .collect();

    write_record(state, &store, record).await?;
    info!(%event_id, recorded_by = %ctx.user_id, present, absent, "attendance recorded");
    mirror_statistics(&store, statistics).await;

    Ok(RecordAttendanceResponse {
        message: format!("attendance recorded for {present} present and {absent} absent players"),
        event_id,
        present,
        absent,
        duration,
        team_totals,
    })
}

/// Aggregated attendance of an event, with the viewer's own line when they took part.
pub async fn view_attendance(
    state: &SharedState,
    event_id: Uuid,
    viewer_id: Option<Uuid>,
) -> Result<AttendanceView, ServiceError> {
    let store = state.require_store().await?;
    let event = load_event(&store, event_id).await?;

    let coach = match store.find_user(event.coach_id).await {
        Ok(coach) => coach,
        Err(err) => {
            warn!(%event_id, coach_id = %event.coach_id, error = %err, "coach lookup failed");
            None
        }
    };
    let record = store.find_attendance(event_id).await?;

    let (statistics, users) = match &record {
        Some(record) => {
            let statistics = match store.list_event_statistics(event_id).await {
                Ok(statistics) => statistics,
                Err(err) => {
                    warn!(%event_id, error = %err, "statistics lookup failed; using recorded counters");
                    Vec::new()
                }
            };
            let player_ids: Vec<Uuid> = record
                .results
                .iter()
                .map(|result| result.player_id)
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            (statistics, store.find_users(player_ids).await?)
        }
        None => (Vec::new(), Vec::new()),
    };

    Ok(aggregate(AggregationInput {
        event: &event,
        coach: coach.as_ref(),
        record: record.as_ref(),
        statistics: &statistics,
        users: &users,
        viewer_id,
        leaderboard_size: state.config().leaderboard_size(),
    }))
}

fn parse_role(raw: Option<&str>) -> Result<Role, ServiceError> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| ServiceError::InvalidInput("missing `rol`".into()))?;
    match raw.to_ascii_lowercase().as_str() {
        "player" => Ok(Role::Player),
        "coach" => Ok(Role::Coach),
        _ => Err(ServiceError::InvalidInput(format!("unknown role `{raw}`"))),
    }
}

fn today() -> String {
    OffsetDateTime::now_utc()
        .date()
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// Upcoming events relevant to a user: for a coach, events with at least one enrollment;
/// for a player, the events they are enrolled in.
pub async fn attendance_events(
    state: &SharedState,
    user_id: Uuid,
    role: Option<&str>,
) -> Result<Vec<AttendanceEventItem>, ServiceError> {
    let role = parse_role(role)?;
    attendance_events_from(state, user_id, role, &today()).await
}

async fn attendance_events_from(
    state: &SharedState,
    user_id: Uuid,
    role: Role,
    today: &str,
) -> Result<Vec<AttendanceEventItem>, ServiceError> {
    let store = state.require_store().await?;
    load_user_with_role(&store, user_id, role).await?;

    let mut events = store.list_events().await?;
    events.retain(|event| event.date.as_str() >= today);
    events.sort_by(|a, b| (&a.date, &a.time).cmp(&(&b.date, &b.time)));

    let mut items = Vec::new();
    for event in events {
        let enrollments = store.list_event_enrollments(event.id).await?;
        let active: Vec<_> = enrollments
            .iter()
            .filter(|enrollment| enrollment.enrolled)
            .collect();
        let relevant = match role {
            Role::Coach => !active.is_empty(),
            Role::Player => active.iter().any(|enrollment| enrollment.player_id == user_id),
        };
        if relevant {
            items.push(AttendanceEventItem {
                enrolled_count: active.len(),
                event: event.into(),
                role,
            });
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            club_store::memory::MemoryClubStore,
            models::{EnrollmentEntity, EventEntity, EventKind, UserEntity},
        },
        dto::attendance::RecordedPlayerInput,
        state::AppState,
    };

    struct Fixture {
        state: SharedState,
        store: MemoryClubStore,
        coach: UserEntity,
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

    async fn fixture(date: &str) -> Fixture {
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
            date: date.into(),
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
                    created_at: SystemTime::UNIX_EPOCH
                        + std::time::Duration::from_secs(offset as u64),
                })
                .await
                .unwrap();
        }

        let state = AppState::new(AppConfig::default());
        state.install_club_store(Arc::new(store.clone())).await;
        Fixture {
            state,
            store,
            coach,
            players,
            event,
        }
    }

    fn input(player: &UserEntity, points: serde_json::Value) -> RecordedPlayerInput {
        RecordedPlayerInput {
            player_id: player.id,
            points,
            rebounds: json!(1),
            assists: json!(null),
            steals: json!("2"),
            blocks: json!(-3),
        }
    }

    fn request(fixture: &Fixture, players: Vec<RecordedPlayerInput>) -> RecordAttendanceRequest {
        RecordAttendanceRequest {
            event_id: Some(fixture.event.id),
            players,
            duration: Some("40:00".into()),
            team_totals: Some(BoxScore {
                points: 999,
                ..BoxScore::default()
            }),
        }
    }

    #[tokio::test]
    async fn record_zero_fills_absentees_and_recomputes_totals() {
        let fx = fixture("2026-11-01").await;
        let ctx = SessionContext::from(&fx.coach);
        let stranger = member("Z", Role::Player);

        let response = record_attendance(
            &fx.state,
            &ctx,
            request(
                &fx,
                vec![
                    input(&fx.players[0], json!(10)),
                    input(&fx.players[2], json!("4.7")),
                    input(&stranger, json!(30)),
                ],
            ),
        )
        .await
        .unwrap();

        assert_eq!((response.present, response.absent), (2, 1));
        assert_eq!(response.team_totals.points, 14);
        assert_eq!(response.team_totals.steals, 4);
        assert_eq!(response.team_totals.blocks, 0);

        let record = fx.store.find_attendance(fx.event.id).await.unwrap().unwrap();
        assert_eq!(record.results.len(), 3);
        assert_eq!(record.results[1].player_id, fx.players[1].id);
        assert!(!record.results[1].present);
        assert_eq!(record.results[1].score, BoxScore::default());
        assert_eq!(
            fx.store.list_event_statistics(fx.event.id).await.unwrap().len(),
            2
        );

        let check = verify_attendance(&fx.state, fx.event.id).await.unwrap();
        assert!(check.exists);
        assert_eq!(check.count, 3);
    }

    #[tokio::test]
    async fn record_keeps_owning_coach_when_another_coach_records() {
        let fx = fixture("2026-11-01").await;
        let other = member("Other", Role::Coach);
        fx.store.save_user(other.clone()).await.unwrap();
        let ctx = SessionContext::from(&other);

        record_attendance(&fx.state, &ctx, request(&fx, vec![input(&fx.players[0], json!(6))]))
            .await
            .unwrap();

        let record = fx.store.find_attendance(fx.event.id).await.unwrap().unwrap();
        assert_eq!(record.coach_id, fx.event.coach_id);
        assert_ne!(record.coach_id, other.id);
    }

    #[tokio::test]
    async fn second_record_conflicts_and_keeps_first() {
        let fx = fixture("2026-11-01").await;
        let ctx = SessionContext::from(&fx.coach);
        record_attendance(&fx.state, &ctx, request(&fx, vec![input(&fx.players[0], json!(8))]))
            .await
            .unwrap();

        let err = record_attendance(
            &fx.state,
            &ctx,
            request(&fx, vec![input(&fx.players[1], json!(20))]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let record = fx.store.find_attendance(fx.event.id).await.unwrap().unwrap();
        assert_eq!(record.team_totals.points, 8);
    }

    #[tokio::test]
    async fn view_reports_unrecorded_event() {
        let fx = fixture("2026-11-01").await;
        let view = view_attendance(&fx.state, fx.event.id, None).await.unwrap();
        assert!(!view.recorded);
        assert_eq!(view.event.duration, "00:00");
        assert_eq!(view.event.coach_name.as_deref(), Some("Coach Test"));
        assert!(matches!(
            view_attendance(&fx.state, Uuid::new_v4(), None).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn view_merges_recorded_rows_for_viewer() {
        let fx = fixture("2026-11-01").await;
        let ctx = SessionContext::from(&fx.coach);
        record_attendance(
            &fx.state,
            &ctx,
            request(
                &fx,
                vec![
                    input(&fx.players[0], json!(10)),
                    input(&fx.players[1], json!(4)),
                ],
            ),
        )
        .await
        .unwrap();

        let view = view_attendance(&fx.state, fx.event.id, Some(fx.players[1].id))
            .await
            .unwrap();
        assert!(view.recorded);
        assert_eq!(view.event.duration, "40:00");
        assert_eq!(view.present.len(), 2);
        assert_eq!(view.absent.len(), 1);
        assert_eq!(view.viewer.map(|line| line.points), Some(4));
    }

    #[tokio::test]
    async fn listing_depends_on_role() {
        let fx = fixture("2026-11-01").await;
        let coach_items = attendance_events_from(&fx.state, fx.coach.id, Role::Coach, "2026-10-18")
            .await
            .unwrap();
        assert_eq!(coach_items.len(), 1);
        assert_eq!(coach_items[0].enrolled_count, 3);

        let player_items =
            attendance_events_from(&fx.state, fx.players[0].id, Role::Player, "2026-10-18")
                .await
                .unwrap();
        assert_eq!(player_items.len(), 1);

        let past = attendance_events_from(&fx.state, fx.coach.id, Role::Coach, "2026-12-01")
            .await
            .unwrap();
        assert!(past.is_empty());

        assert!(matches!(
            attendance_events(&fx.state, fx.coach.id, None).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            attendance_events(&fx.state, fx.coach.id, Some("player")).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}
