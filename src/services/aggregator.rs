//! Read-side merge of recorded results, per-player statistics and member profiles into the
//! attendance view of one event. Everything here is pure: the same inputs always produce the
//! same view.

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::{
    dao::models::{
        AttendanceRecordEntity, AttendanceResultEntity, EventEntity, PlayerStatisticEntity,
        ShotKind, UserEntity,
    },
    dto::attendance::{
        AttendanceEventHeader, AttendanceView, LeaderboardEntry, Leaderboards, PlayerLine,
        PointBreakdown, PositionCount, ShotTally, TeamTotals,
    },
    state::session::RosterEntry,
};

const NO_DURATION: &str = "00:00";

/// Everything the aggregation reads, already fetched from storage.
#[derive(Debug, Clone, Copy)]
pub struct AggregationInput<'a> {
    pub event: &'a EventEntity,
    pub coach: Option<&'a UserEntity>,
    pub record: Option<&'a AttendanceRecordEntity>,
    pub statistics: &'a [PlayerStatisticEntity],
    pub users: &'a [UserEntity],
    pub viewer_id: Option<Uuid>,
    pub leaderboard_size: usize,
}

/// Build the attendance view of an event.
pub fn aggregate(input: AggregationInput<'_>) -> AttendanceView {
    let header = AttendanceEventHeader {
        id: input.event.id,
        kind: input.event.kind,
        date: input.event.date.clone(),
        time: input.event.time.clone(),
        place: input.event.place.clone(),
        description: input.event.description.clone(),
        coach_id: input.event.coach_id,
        coach_name: input.coach.map(UserEntity::display_name),
        duration: input
            .record
            .map_or_else(|| NO_DURATION.to_owned(), |record| record.duration.clone()),
    };

    let Some(record) = input.record else {
        return AttendanceView {
            recorded: false,
            event: header,
            present: Vec::new(),
            absent: Vec::new(),
            team_totals: TeamTotals::default(),
            leaderboards: Leaderboards::default(),
            point_breakdown: PointBreakdown::default(),
            positions: Vec::new(),
            total_impact: 0,
            most_impactful: None,
            viewer: None,
        };
    };

    let statistics: HashMap<Uuid, &PlayerStatisticEntity> = input
        .statistics
        .iter()
        .map(|stat| (stat.player_id, stat))
        .collect();
    let users: HashMap<Uuid, &UserEntity> =
        input.users.iter().map(|user| (user.id, user)).collect();

    let mut results: Vec<&AttendanceResultEntity> = record.results.iter().collect();
    results.sort_by(|a, b| {
        b.score
            .points
            .cmp(&a.score.points)
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    let (present, absent): (Vec<PlayerLine>, Vec<PlayerLine>) = results
        .into_iter()
        .map(|result| {
            merge_line(
                result,
                statistics.get(&result.player_id).copied(),
                users.get(&result.player_id).copied(),
            )
        })
        .partition(|line| line.present);

    let team_totals = team_totals(&present, absent.len());
    let most_impactful = present
        .iter()
        .fold(None::<&PlayerLine>, |best, line| match best {
            Some(current) if current.impact >= line.impact => Some(current),
            _ => Some(line),
        })
        .cloned();
    let viewer = input.viewer_id.and_then(|viewer_id| {
        present
            .iter()
            .chain(absent.iter())
            .find(|line| line.player_id == viewer_id)
            .cloned()
    });

    AttendanceView {
        recorded: true,
        event: header,
        leaderboards: leaderboards(&present, input.leaderboard_size),
        point_breakdown: point_breakdown(&team_totals),
        positions: positions(&present),
        total_impact: present.iter().map(|line| line.impact).sum(),
        team_totals,
        most_impactful,
        viewer,
        present,
        absent,
    }
}

/// Merge one stored result with the player's statistic row and profile.
///
/// Statistic counters win over the result's counters. Points come from the explicit
/// statistic total, else from the shot breakdown, else from the result. Absentees never
/// take a statistic row.
fn merge_line(
    result: &AttendanceResultEntity,
    stat: Option<&PlayerStatisticEntity>,
    user: Option<&UserEntity>,
) -> PlayerLine {
    let stat = stat.filter(|_| result.present);
    let score = &result.score;
    let points = match stat {
        Some(stat) => match stat.points {
            Some(points) => points,
            None if !stat.shots.is_empty() => stat.points_from_shots(),
            None => score.points,
        },
        None => score.points,
    };
    let rebounds = stat.map_or(score.rebounds, |stat| stat.rebounds);
    let assists = stat.map_or(score.assists, |stat| stat.assists);
    let steals = stat.map_or(score.steals, |stat| stat.steals);
    let blocks = stat.map_or(score.blocks, |stat| stat.blocks);
    let shots = |kind: ShotKind| stat.map_or(0, |stat| stat.shot_count(kind));

    let RosterEntry {
        first_name,
        last_name,
        position,
        ..
    } = RosterEntry::new(result.player_id, user);

    PlayerLine {
        player_id: result.player_id,
        first_name,
        last_name,
        position,
        present: result.present,
        points,
        rebounds,
        assists,
        steals,
        blocks,
        threes: shots(ShotKind::Three),
        twos: shots(ShotKind::Two),
        free_throws: shots(ShotKind::FreeThrow),
        impact: 2 * u64::from(points)
            + u64::from(rebounds)
            + u64::from(assists)
            + u64::from(steals)
            + u64::from(blocks),
    }
}

fn team_totals(present: &[PlayerLine], absent: usize) -> TeamTotals {
    let sum = |value: fn(&PlayerLine) -> u32| {
        present
            .iter()
            .fold(0u32, |acc, line| acc.saturating_add(value(line)))
    };
    let total_players = present.len() + absent;
    let percentage = (present.len() as f64 * 100.0 / total_players.max(1) as f64).round() as u32;

    TeamTotals {
        points: sum(|line| line.points),
        rebounds: sum(|line| line.rebounds),
        assists: sum(|line| line.assists),
        steals: sum(|line| line.steals),
        blocks: sum(|line| line.blocks),
        threes: sum(|line| line.threes),
        twos: sum(|line| line.twos),
        free_throws: sum(|line| line.free_throws),
        total_players,
        present_players: present.len(),
        absent_players: absent,
        attendance_percentage: percentage.min(100),
    }
}

fn leaderboard(
    present: &[PlayerLine],
    size: usize,
    value: fn(&PlayerLine) -> u32,
) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&PlayerLine> = present.iter().collect();
    // Stable sort keeps the result order among equal values.
    ranked.sort_by(|a, b| value(b).cmp(&value(a)));
    ranked
        .into_iter()
        .take(size)
        .map(|line| LeaderboardEntry {
            player_id: line.player_id,
            name: format!("{} {}", line.first_name, line.last_name)
                .trim()
                .to_owned(),
            value: value(line),
        })
        .collect()
}

fn leaderboards(present: &[PlayerLine], size: usize) -> Leaderboards {
    Leaderboards {
        points: leaderboard(present, size, |line| line.points),
        rebounds: leaderboard(present, size, |line| line.rebounds),
        assists: leaderboard(present, size, |line| line.assists),
        steals: leaderboard(present, size, |line| line.steals),
        blocks: leaderboard(present, size, |line| line.blocks),
    }
}

fn point_breakdown(totals: &TeamTotals) -> PointBreakdown {
    let tally = |count: u32, kind: ShotKind| ShotTally {
        count,
        points: count.saturating_mul(kind.value()),
    };
    PointBreakdown {
        three: tally(totals.threes, ShotKind::Three),
        two: tally(totals.twos, ShotKind::Two),
        free_throw: tally(totals.free_throws, ShotKind::FreeThrow),
        total_points: totals.points,
    }
}

fn positions(present: &[PlayerLine]) -> Vec<PositionCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for line in present {
        *counts.entry(line.position.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(position, count)| PositionCount {
            position: position.to_owned(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::{BoxScore, EventKind, Role, ShotBreakdownEntity};

    fn event() -> EventEntity {
        EventEntity {
            id: Uuid::new_v4(),
            kind: EventKind::Match,
            date: "2026-10-18".into(),
            time: "18:00".into(),
            place: "Main court".into(),
            description: "League".into(),
            coach_id: Uuid::new_v4(),
            created_at: SystemTime::UNIX_EPOCH,
        }
    }

    fn user(first: &str, position: &str) -> UserEntity {
        UserEntity {
            id: Uuid::new_v4(),
            first_name: first.into(),
            last_name: "Doe".into(),
            position: Some(position.into()),
            role: Role::Player,
        }
    }

    fn result(player_id: Uuid, present: bool, points: u32, rebounds: u32) -> AttendanceResultEntity {
        AttendanceResultEntity {
            player_id,
            present,
            score: BoxScore {
                points,
                rebounds,
                ..BoxScore::default()
            },
        }
    }

    fn record(event: &EventEntity, results: Vec<AttendanceResultEntity>) -> AttendanceRecordEntity {
        AttendanceRecordEntity {
            event_id: event.id,
            coach_id: event.coach_id,
            duration: "05:00".into(),
            team_totals: BoxScore::total(results.iter().map(|row| &row.score)),
            results,
            recorded_at: SystemTime::UNIX_EPOCH,
        }
    }

    fn input<'a>(
        event: &'a EventEntity,
        record: Option<&'a AttendanceRecordEntity>,
        statistics: &'a [PlayerStatisticEntity],
        users: &'a [UserEntity],
    ) -> AggregationInput<'a> {
        AggregationInput {
            event,
            coach: None,
            record,
            statistics,
            users,
            viewer_id: None,
            leaderboard_size: 3,
        }
    }

    #[test]
    fn unrecorded_event_has_empty_view() {
        let event = event();
        let view = aggregate(input(&event, None, &[], &[]));
        assert!(!view.recorded);
        assert_eq!(view.event.duration, "00:00");
        assert!(view.present.is_empty());
        assert!(view.most_impactful.is_none());
        assert_eq!(view.team_totals.attendance_percentage, 0);
    }

    #[test]
    fn points_fall_back_to_shot_breakdown() {
        let event = event();
        let player = user("Ana", "Base");
        let record = record(&event, vec![result(player.id, true, 4, 1)]);
        let mut stat = PlayerStatisticEntity::from_score(player.id, event.id, &BoxScore::default());
        stat.points = None;
        stat.rebounds = 6;
        stat.shots = vec![
            ShotBreakdownEntity {
                kind: ShotKind::Three,
                count: 2,
            },
            ShotBreakdownEntity {
                kind: ShotKind::Two,
                count: 1,
            },
            ShotBreakdownEntity {
                kind: ShotKind::FreeThrow,
                count: 3,
            },
        ];
        let statistics = [stat];
        let users = [player.clone()];

        let view = aggregate(input(&event, Some(&record), &statistics, &users));
        let line = &view.present[0];
        assert_eq!(line.points, 11);
        assert_eq!(line.rebounds, 6);
        assert_eq!((line.threes, line.twos, line.free_throws), (2, 1, 3));
        assert_eq!(view.point_breakdown.three.points, 6);
        assert_eq!(view.point_breakdown.free_throw.count, 3);
        assert_eq!(view.team_totals.points, 11);
    }

    #[test]
    fn explicit_statistic_points_win_and_missing_rows_keep_result() {
        let event = event();
        let (a, b) = (user("Ana", "Base"), user("Bea", "Pivot"));
        let record = record(
            &event,
            vec![result(a.id, true, 10, 0), result(b.id, true, 4, 2)],
        );
        let mut stat = PlayerStatisticEntity::from_score(a.id, event.id, &BoxScore::default());
        stat.points = Some(7);
        let statistics = [stat];
        let users = [a.clone(), b.clone()];

        let view = aggregate(input(&event, Some(&record), &statistics, &users));
        let ana = view.present.iter().find(|line| line.player_id == a.id).unwrap();
        let bea = view.present.iter().find(|line| line.player_id == b.id).unwrap();
        assert_eq!(ana.points, 7);
        assert_eq!(bea.points, 4);
        assert_eq!(bea.rebounds, 2);
    }

    #[test]
    fn absent_lines_ignore_statistic_rows() {
        let event = event();
        let (a, b) = (user("Ana", "Base"), user("Bea", "Pivot"));
        let record = record(
            &event,
            vec![result(a.id, true, 6, 1), result(b.id, false, 0, 0)],
        );
        let mut stat = PlayerStatisticEntity::from_score(b.id, event.id, &BoxScore::default());
        stat.points = Some(20);
        stat.rebounds = 7;
        let statistics = [stat];
        let users = [a.clone(), b.clone()];

        let view = aggregate(input(&event, Some(&record), &statistics, &users));
        let bea = &view.absent[0];
        assert_eq!(bea.player_id, b.id);
        assert_eq!((bea.points, bea.rebounds, bea.impact), (0, 0, 0));
        assert_eq!(view.team_totals.points, 6);
    }

    #[test]
    fn totals_percentage_and_most_impactful() {
        let event = event();
        let players = [
            user("Ana", "Base"),
            user("Bea", "Pivot"),
            user("Cris", "Base"),
        ];
        let record = record(
            &event,
            vec![
                result(players[0].id, true, 10, 0),
                result(players[1].id, true, 4, 5),
                result(players[2].id, false, 0, 0),
            ],
        );

        let view = aggregate(AggregationInput {
            viewer_id: Some(players[2].id),
            ..input(&event, Some(&record), &[], &players)
        });

        assert_eq!(view.present.len(), 2);
        assert_eq!(view.absent.len(), 1);
        assert_eq!(view.present[0].player_id, players[0].id);
        assert_eq!(view.team_totals.points, 14);
        assert_eq!(view.team_totals.rebounds, 5);
        assert_eq!(view.team_totals.attendance_percentage, 67);
        assert_eq!(view.total_impact, 20 + 13);
        assert_eq!(
            view.most_impactful.as_ref().map(|line| line.player_id),
            Some(players[0].id)
        );
        assert_eq!(
            view.viewer.as_ref().map(|line| line.present),
            Some(false)
        );
        assert_eq!(
            view.positions,
            vec![
                PositionCount {
                    position: "Base".into(),
                    count: 1
                },
                PositionCount {
                    position: "Pivot".into(),
                    count: 1
                },
            ]
        );
        assert_eq!(view.leaderboards.rebounds[0].name, "Bea Doe");
    }

    #[test]
    fn unknown_profiles_use_placeholders() {
        let event = event();
        let ghost = Uuid::new_v4();
        let record = record(&event, vec![result(ghost, true, 2, 0)]);
        let view = aggregate(input(&event, Some(&record), &[], &[]));
        let line = &view.present[0];
        assert_eq!(line.first_name, "Player");
        assert_eq!(line.last_name, "");
        assert_eq!(line.position, "Unassigned");
    }

    #[test]
    fn identical_inputs_render_identical_json() {
        let event = event();
        let players: Vec<UserEntity> = (0..6)
            .map(|n| user(&format!("P{n}"), if n % 2 == 0 { "Base" } else { "Alero" }))
            .collect();
        let results: Vec<AttendanceResultEntity> = players
            .iter()
            .enumerate()
            .map(|(n, player)| result(player.id, n != 3, 5, n as u32))
            .collect();
        let record = record(&event, results);
        let mut reversed = players.clone();
        reversed.reverse();

        let first = aggregate(input(&event, Some(&record), &[], &players));
        let second = aggregate(input(&event, Some(&record), &[], &reversed));
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
