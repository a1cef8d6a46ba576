use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    dao::models::{
        AttendanceRecordEntity, AttendanceResultEntity, BoxScore, EventEntity,
        PlayerStatisticEntity, StatField, UserEntity,
    },
    error::ServiceError,
    state::{
        clock::{MatchClock, format_duration},
        recorder::{RecorderEvent, RecorderPhase, RecorderStateMachine},
    },
};

/// Fallbacks used when an enrolled player has no profile.
pub const UNKNOWN_FIRST_NAME: &str = "Player";
pub const UNKNOWN_POSITION: &str = "Unassigned";

/// One enrolled player in a recorder session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub player_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub present: bool,
    pub score: BoxScore,
}

impl RosterEntry {
    /// Build an entry from the player's profile, or from placeholders when the profile is gone.
    pub fn new(player_id: Uuid, user: Option<&UserEntity>) -> Self {
        let (first_name, last_name, position) = match user {
            Some(user) => (
                user.first_name.clone(),
                user.last_name.clone(),
                user.position
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_POSITION.to_owned()),
            ),
            None => (
                UNKNOWN_FIRST_NAME.to_owned(),
                String::new(),
                UNKNOWN_POSITION.to_owned(),
            ),
        };

        Self {
            player_id,
            first_name,
            last_name,
            position,
            present: false,
            score: BoxScore::default(),
        }
    }
}

/// Everything a finished match writes: the attendance record and the statistics mirror.
#[derive(Debug, Clone)]
pub struct FinishedMatch {
    pub record: AttendanceRecordEntity,
    pub statistics: Vec<PlayerStatisticEntity>,
}

/// In-memory recording session of one coach for one event. Nothing here is persisted until
/// the match finishes.
#[derive(Debug)]
pub struct RecorderSession {
    id: Uuid,
    event: EventEntity,
    coach_id: Uuid,
    machine: RecorderStateMachine,
    /// Enrolled players in enrollment order.
    roster: IndexMap<Uuid, RosterEntry>,
    /// Present players once the match started, in roster order.
    on_court: Vec<Uuid>,
    clock: Option<MatchClock>,
    notice: Option<String>,
    last_touched: Instant,
}

impl RecorderSession {
    /// Session for an event without recorded attendance.
    pub fn open(event: EventEntity, coach_id: Uuid, roster: Vec<RosterEntry>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            coach_id,
            machine: RecorderStateMachine::new(),
            roster: roster
                .into_iter()
                .map(|entry| (entry.player_id, entry))
                .collect(),
            on_court: Vec::new(),
            clock: None,
            notice: None,
            last_touched: Instant::now(),
        }
    }

    /// Read-only session for an event that was already recorded.
    pub fn locked(event: EventEntity, coach_id: Uuid, notice: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            coach_id,
            machine: RecorderStateMachine::locked(),
            roster: IndexMap::new(),
            on_court: Vec::new(),
            clock: None,
            notice: Some(notice.into()),
            last_touched: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn event(&self) -> &EventEntity {
        &self.event
    }

    pub fn coach_id(&self) -> Uuid {
        self.coach_id
    }

    pub fn phase(&self) -> RecorderPhase {
        self.machine.phase()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Every enrolled player, in enrollment order.
    pub fn roster(&self) -> impl Iterator<Item = &RosterEntry> {
        self.roster.values()
    }

    /// Present players during and after the match, addressed by index in this order.
    pub fn on_court(&self) -> impl Iterator<Item = &RosterEntry> {
        self.on_court.iter().filter_map(|id| self.roster.get(id))
    }

    /// Enrolled players set aside when the match started.
    pub fn bench(&self) -> impl Iterator<Item = &RosterEntry> {
        self.roster.values().filter(|entry| !entry.present)
    }

    pub fn present_count(&self) -> usize {
        self.roster.values().filter(|entry| entry.present).count()
    }

    /// Seconds shown on the match clock, if it ever started.
    pub fn clock_secs(&self) -> Option<u64> {
        self.clock.as_ref().map(MatchClock::displayed_secs)
    }

    /// Team totals over the players on court.
    pub fn team_totals(&self) -> BoxScore {
        BoxScore::total(self.on_court().map(|entry| &entry.score))
    }

    /// Mark the session as used now.
    pub fn touch(&mut self) {
        self.last_touched = Instant::now();
    }

    /// Whether the session sat idle for longer than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.last_touched.elapsed() > ttl
    }

    /// Reject callers other than the coach who opened the session.
    pub fn ensure_owner(&self, user_id: Uuid) -> Result<(), ServiceError> {
        if self.coach_id == user_id {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "recorder session `{}` belongs to another coach",
                self.id
            )))
        }
    }

    fn ensure_phase(&self, expected: RecorderPhase, action: &str) -> Result<(), ServiceError> {
        match self.phase() {
            phase if phase == expected => Ok(()),
            RecorderPhase::Locked => Err(ServiceError::InvalidState(format!(
                "attendance for event `{}` is already recorded; cannot {action}",
                self.event.id
            ))),
            phase => Err(ServiceError::InvalidState(format!(
                "cannot {action} while the recorder is {phase:?}"
            ))),
        }
    }

    /// Flip the presence of the roster entry at `index`.
    pub fn toggle_presence(&mut self, index: usize) -> Result<&RosterEntry, ServiceError> {
        self.ensure_phase(RecorderPhase::Roster, "change presence")?;
        let (_, entry) = self
            .roster
            .get_index_mut(index)
            .ok_or_else(|| ServiceError::InvalidInput(format!("no roster entry at {index}")))?;
        entry.present = !entry.present;
        Ok(entry)
    }

    /// Move to the live phase once at least `min_present` players are present.
    ///
    /// On rejection the roster is left exactly as it was.
    pub fn start_match(&mut self, min_present: usize) -> Result<(), ServiceError> {
        self.ensure_phase(RecorderPhase::Roster, "start the match")?;
        let present = self.present_count();
        if present < min_present {
            return Err(ServiceError::InvalidInput(format!(
                "at least {min_present} players must be present to start (got {present})"
            )));
        }

        self.machine.transition(RecorderEvent::StartMatch)?;
        self.on_court = self
            .roster
            .values()
            .filter(|entry| entry.present)
            .map(|entry| entry.player_id)
            .collect();
        self.clock = Some(MatchClock::start());
        Ok(())
    }

    /// Overwrite one counter of the on-court player at `index`.
    pub fn adjust_stat(
        &mut self,
        index: usize,
        field: StatField,
        value: u32,
    ) -> Result<&RosterEntry, ServiceError> {
        self.ensure_phase(RecorderPhase::Live, "edit statistics")?;
        let player_id = *self
            .on_court
            .get(index)
            .ok_or_else(|| ServiceError::InvalidInput(format!("no player on court at {index}")))?;
        let entry = self.roster.get_mut(&player_id).ok_or_else(|| {
            ServiceError::InvalidState(format!("player `{player_id}` left the roster"))
        })?;
        entry.score.set(field, value);
        Ok(entry)
    }

    /// Build the rows a finished match writes, without changing the session.
    ///
    /// Every enrolled player gets exactly one result: present players with their counters,
    /// absentees zero-filled. Statistics are mirrored for present players only.
    pub fn finished_match(&self) -> Result<FinishedMatch, ServiceError> {
        self.ensure_phase(RecorderPhase::Live, "finish the match")?;
        let elapsed = self
            .clock
            .as_ref()
            .map(MatchClock::elapsed)
            .unwrap_or_default();

        let results: Vec<AttendanceResultEntity> = self
            .roster
            .values()
            .map(|entry| AttendanceResultEntity {
                player_id: entry.player_id,
                present: entry.present,
                score: if entry.present {
                    entry.score
                } else {
                    BoxScore::default()
                },
            })
            .collect();

        let statistics = self
            .on_court()
            .map(|entry| {
                PlayerStatisticEntity::from_score(entry.player_id, self.event.id, &entry.score)
            })
            .collect();

        Ok(FinishedMatch {
            record: AttendanceRecordEntity {
                event_id: self.event.id,
                coach_id: self.event.coach_id,
                duration: format_duration(elapsed),
                team_totals: self.team_totals(),
                results,
                recorded_at: SystemTime::now(),
            },
            statistics,
        })
    }

    /// Mutable access to the state machine for transitions that wrap storage work.
    pub fn machine_mut(&mut self) -> &mut RecorderStateMachine {
        &mut self.machine
    }

    /// Stop the clock after the results were persisted.
    pub fn complete(&mut self) {
        if let Some(clock) = self.clock.as_mut() {
            clock.stop();
        }
    }

    /// Enter the locked guard because another writer recorded the event first.
    pub fn lock_out(&mut self, notice: impl Into<String>) -> Result<(), ServiceError> {
        self.machine.transition(RecorderEvent::Lock)?;
        if let Some(clock) = self.clock.as_mut() {
            clock.stop();
        }
        self.notice = Some(notice.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{EventKind, Role};

    fn event() -> EventEntity {
        EventEntity {
            id: Uuid::new_v4(),
            kind: EventKind::Match,
            date: "2026-10-18".into(),
            time: "18:00".into(),
            place: "Main court".into(),
            description: "League".into(),
            coach_id: Uuid::new_v4(),
            created_at: SystemTime::now(),
        }
    }

    fn player(first: &str) -> UserEntity {
        UserEntity {
            id: Uuid::new_v4(),
            first_name: first.into(),
            last_name: "Test".into(),
            position: Some("Base".into()),
            role: Role::Player,
        }
    }

    fn session_with(players: &[UserEntity]) -> RecorderSession {
        let event = event();
        let coach = event.coach_id;
        let roster = players
            .iter()
            .map(|user| RosterEntry::new(user.id, Some(user)))
            .collect();
        RecorderSession::open(event, coach, roster)
    }

    #[test]
    fn missing_profile_uses_placeholders() {
        let entry = RosterEntry::new(Uuid::new_v4(), None);
        assert_eq!(entry.first_name, "Player");
        assert_eq!(entry.last_name, "");
        assert_eq!(entry.position, "Unassigned");
        assert!(!entry.present);
    }

    #[test]
    fn start_below_minimum_leaves_roster_untouched() {
        let players = [player("A"), player("B"), player("C")];
        let mut session = session_with(&players);
        session.toggle_presence(0).unwrap();
        let before: Vec<_> = session.roster().cloned().collect();

        let err = session.start_match(2).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(session.phase(), RecorderPhase::Roster);
        assert_eq!(session.roster().cloned().collect::<Vec<_>>(), before);
        assert!(session.clock_secs().is_none());
    }

    #[test]
    fn toggles_only_during_roster() {
        let mut session = session_with(&[player("A")]);
        assert!(session.toggle_presence(0).unwrap().present);
        assert!(!session.toggle_presence(0).unwrap().present);
        assert!(matches!(
            session.toggle_presence(4),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            session.adjust_stat(0, StatField::Points, 2),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn finished_match_zero_fills_absentees() {
        let players = [player("A"), player("B"), player("C")];
        let mut session = session_with(&players);
        session.toggle_presence(0).unwrap();
        session.toggle_presence(2).unwrap();
        session.start_match(2).unwrap();

        // On-court indices skip the absent player.
        session.adjust_stat(1, StatField::Assists, 3).unwrap();
        session.adjust_stat(0, StatField::Points, 8).unwrap();
        assert!(matches!(
            session.adjust_stat(2, StatField::Points, 1),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            session.toggle_presence(1),
            Err(ServiceError::InvalidState(_))
        ));

        tokio::time::advance(Duration::from_secs(61)).await;
        let finished = session.finished_match().unwrap();

        assert_eq!(finished.record.duration, "01:01");
        assert_eq!(finished.record.results.len(), 3);
        let absent = &finished.record.results[1];
        assert_eq!(absent.player_id, players[1].id);
        assert!(!absent.present);
        assert_eq!(absent.score, BoxScore::default());
        assert_eq!(finished.record.team_totals.points, 8);
        assert_eq!(finished.record.team_totals.assists, 3);
        assert_eq!(finished.statistics.len(), 2);
        assert_eq!(session.phase(), RecorderPhase::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_match_keeps_event_owner() {
        let players = [player("A"), player("B")];
        let event = event();
        let owner = event.coach_id;
        let recorder = Uuid::new_v4();
        let roster = players
            .iter()
            .map(|user| RosterEntry::new(user.id, Some(user)))
            .collect();
        let mut session = RecorderSession::open(event, recorder, roster);
        session.toggle_presence(0).unwrap();
        session.toggle_presence(1).unwrap();
        session.start_match(2).unwrap();

        let finished = session.finished_match().unwrap();
        assert_eq!(finished.record.coach_id, owner);
        assert_eq!(session.coach_id(), recorder);
    }

    #[test]
    fn locked_session_rejects_everything() {
        let event = event();
        let mut session = RecorderSession::locked(event.clone(), event.coach_id, "done already");
        assert_eq!(session.phase(), RecorderPhase::Locked);
        assert_eq!(session.roster().count(), 0);
        assert!(matches!(
            session.start_match(0),
            Err(ServiceError::InvalidState(_))
        ));
        assert!(session.finished_match().is_err());
    }

    #[test]
    fn foreign_coach_is_forbidden() {
        let session = session_with(&[player("A")]);
        assert!(session.ensure_owner(session.coach_id()).is_ok());
        assert!(matches!(
            session.ensure_owner(Uuid::new_v4()),
            Err(ServiceError::Forbidden(_))
        ));
    }
}
