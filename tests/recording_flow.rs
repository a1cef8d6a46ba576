use std::{sync::Arc, time::Duration};

use club_stats_back::{
    config::AppConfig,
    dao::{
        club_store::memory::MemoryClubStore,
        models::{Role, StatField},
    },
    dto::{
        enrollments::CreateEnrollmentRequest,
        events::CreateEventRequest,
        phase::VisibleRecorderPhase,
        recorder::{AdjustStatRequest, OpenSessionRequest},
        users::{RegisterUserRequest, UserSummary},
    },
    error::ServiceError,
    services::{
        attendance_service, enrollment_service, event_service, recorder_service, user_service,
    },
    state::{AppState, SharedState, context::SessionContext},
};
use serde_json::json;
use uuid::Uuid;

async fn state() -> SharedState {
    let state = AppState::new(AppConfig::default());
    state
        .install_club_store(Arc::new(MemoryClubStore::new()))
        .await;
    state
}

async fn register(state: &SharedState, first: &str, role: Role) -> UserSummary {
    user_service::register_user(
        state,
        RegisterUserRequest {
            id: None,
            first_name: first.into(),
            last_name: "Club".into(),
            position: Some("Base".into()),
            role: Some(role),
        },
    )
    .await
    .unwrap()
}

async fn event_with_roster(state: &SharedState) -> (SessionContext, Uuid, Vec<UserSummary>) {
    let coach = register(state, "Coach", Role::Coach).await;
    let ctx = user_service::resolve_context(state, coach.id, Role::Coach)
        .await
        .unwrap();
    let event = event_service::create_event(
        state,
        CreateEventRequest {
            kind: "match".into(),
            date: "2026-11-07".into(),
            time: "17:30".into(),
            place: "Main court".into(),
            description: "League round 3".into(),
            coach_id: Some(coach.id),
        },
    )
    .await
    .unwrap();

    let mut players = Vec::new();
    for name in ["A", "B", "C"] {
        let player = register(state, name, Role::Player).await;
        enrollment_service::enroll(
            state,
            CreateEnrollmentRequest {
                player_id: Some(player.id),
                event_id: Some(event.id),
            },
        )
        .await
        .unwrap();
        players.push(player);
        // Distinct creation instants keep the roster order deterministic.
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    (ctx, event.id, players)
}

fn set(field: StatField, value: serde_json::Value) -> AdjustStatRequest {
    AdjustStatRequest { field, value }
}

#[tokio::test]
async fn duplicate_enrollment_is_rejected() {
    let state = state().await;
    let (_, event_id, players) = event_with_roster(&state).await;

    let again = enrollment_service::enroll(
        &state,
        CreateEnrollmentRequest {
            player_id: Some(players[0].id),
            event_id: Some(event_id),
        },
    )
    .await;
    assert!(matches!(again, Err(ServiceError::Conflict(_))));
    assert_eq!(
        enrollment_service::list_event_enrollments(&state, event_id)
            .await
            .unwrap()
            .len(),
        3
    );
}

#[tokio::test]
async fn match_is_recorded_once_and_aggregated() {
    let state = state().await;
    let (ctx, event_id, players) = event_with_roster(&state).await;

    let session = recorder_service::open_session(
        &state,
        &ctx,
        OpenSessionRequest {
            event_id: Some(event_id),
        },
    )
    .await
    .unwrap();
    assert_eq!(session.phase, VisibleRecorderPhase::Roster);
    let names: Vec<&str> = session
        .roster
        .iter()
        .map(|line| line.first_name.as_str())
        .collect();
    assert_eq!(names, ["A", "B", "C"]);
    let id = session.id;

    recorder_service::toggle_presence(&state, &ctx, id, 0)
        .await
        .unwrap();
    assert!(matches!(
        recorder_service::start_match(&state, &ctx, id).await,
        Err(ServiceError::InvalidInput(_))
    ));
    recorder_service::toggle_presence(&state, &ctx, id, 1)
        .await
        .unwrap();
    recorder_service::start_match(&state, &ctx, id)
        .await
        .unwrap();

    tokio::time::pause();
    recorder_service::adjust_stat(&state, &ctx, id, 0, set(StatField::Points, json!(10)))
        .await
        .unwrap();
    recorder_service::adjust_stat(&state, &ctx, id, 0, set(StatField::Rebounds, json!(5)))
        .await
        .unwrap();
    recorder_service::adjust_stat(&state, &ctx, id, 1, set(StatField::Points, json!(4)))
        .await
        .unwrap();
    recorder_service::adjust_stat(&state, &ctx, id, 1, set(StatField::Assists, json!(2)))
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(300)).await;

    let done = recorder_service::finish_match(&state, &ctx, id)
        .await
        .unwrap();
    assert_eq!(done.duration, "05:00");
    assert_eq!((done.present, done.absent), (2, 1));
    assert_eq!(
        (
            done.team_totals.points,
            done.team_totals.rebounds,
            done.team_totals.assists
        ),
        (14, 5, 2)
    );

    let check = attendance_service::verify_attendance(&state, event_id)
        .await
        .unwrap();
    assert!(check.exists);
    assert_eq!(check.count, 3);

    let view = attendance_service::view_attendance(&state, event_id, Some(players[2].id))
        .await
        .unwrap();
    assert!(view.recorded);
    assert_eq!(view.event.duration, "05:00");
    assert_eq!(view.team_totals.points, 14);
    assert_eq!(view.team_totals.attendance_percentage, 67);
    assert_eq!(view.present[0].first_name, "A");
    let absent = view.viewer.expect("absent viewer still has a row");
    assert!(!absent.present);
    assert_eq!((absent.points, absent.rebounds, absent.assists), (0, 0, 0));

    let reopened = recorder_service::open_session(
        &state,
        &ctx,
        OpenSessionRequest {
            event_id: Some(event_id),
        },
    )
    .await
    .unwrap();
    assert_eq!(reopened.phase, VisibleRecorderPhase::Locked);
    assert!(reopened.roster.is_empty());
}
