//! In-process [`ClubStore`] backed by concurrent maps. Used by the test suite and for
//! running the server without a database (`STORAGE_BACKEND=memory`).

use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    club_store::ClubStore,
    models::{
        AttendanceRecordEntity, EnrollmentEntity, EventEntity, PlayerStatisticEntity, UserEntity,
    },
    storage::{StorageError, StorageResult},
};

#[derive(Clone, Default)]
pub struct MemoryClubStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    users: DashMap<Uuid, UserEntity>,
    events: DashMap<Uuid, EventEntity>,
    /// Keyed by (event id, player id).
    enrollments: DashMap<(Uuid, Uuid), EnrollmentEntity>,
    attendance: DashMap<Uuid, AttendanceRecordEntity>,
    /// Keyed by (event id, player id).
    statistics: DashMap<(Uuid, Uuid), PlayerStatisticEntity>,
    #[cfg(test)]
    reject_attendance: AtomicBool,
}

impl MemoryClubStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent attendance insert fail as if the backend went away.
    #[cfg(test)]
    pub fn reject_attendance_writes(&self, reject: bool) {
        self.inner.reject_attendance.store(reject, Ordering::SeqCst);
    }

    fn insert_attendance_record(&self, record: AttendanceRecordEntity) -> StorageResult<()> {
        #[cfg(test)]
        if self.inner.reject_attendance.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                "memory store rejected attendance write".into(),
                std::io::Error::other("injected failure"),
            ));
        }

        match self.inner.attendance.entry(record.event_id) {
            Entry::Occupied(_) => Err(StorageError::conflict(format!(
                "attendance already recorded for event `{}`",
                record.event_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }
}

impl ClubStore for MemoryClubStore {
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.users.insert(user.id, user);
        Box::pin(async { Ok(()) })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let user = self.inner.users.get(&id).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(user) })
    }

    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let users = ids
            .iter()
            .filter_map(|id| self.inner.users.get(id).map(|entry| entry.value().clone()))
            .collect();
        Box::pin(async move { Ok(users) })
    }

    fn insert_event(&self, event: EventEntity) -> BoxFuture<'static, StorageResult<()>> {
        let outcome = match self.inner.events.entry(event.id) {
            Entry::Occupied(_) => Err(StorageError::conflict(format!(
                "event `{}` already exists",
                event.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(event);
                Ok(())
            }
        };
        Box::pin(async move { outcome })
    }

    fn find_event(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<EventEntity>>> {
        let event = self.inner.events.get(&id).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(event) })
    }

    fn list_events(&self) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>> {
        let mut events: Vec<EventEntity> = self
            .inner
            .events
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        events.sort_by_key(|event| (event.created_at, event.id));
        Box::pin(async move { Ok(events) })
    }

    fn insert_enrollment(
        &self,
        enrollment: EnrollmentEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let key = (enrollment.event_id, enrollment.player_id);
        let outcome = match self.inner.enrollments.entry(key) {
            Entry::Occupied(_) => Err(StorageError::conflict(format!(
                "player `{}` already enrolled in event `{}`",
                enrollment.player_id, enrollment.event_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(enrollment);
                Ok(())
            }
        };
        Box::pin(async move { outcome })
    }

    fn list_event_enrollments(
        &self,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<EnrollmentEntity>>> {
        let mut enrollments: Vec<EnrollmentEntity> = self
            .inner
            .enrollments
            .iter()
            .filter(|entry| entry.key().0 == event_id)
            .map(|entry| entry.value().clone())
            .collect();
        enrollments.sort_by_key(|enrollment| (enrollment.created_at, enrollment.player_id));
        Box::pin(async move { Ok(enrollments) })
    }

    fn list_player_enrollments(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<EnrollmentEntity>>> {
        let enrollments = self
            .inner
            .enrollments
            .iter()
            .filter(|entry| entry.key().1 == player_id)
            .map(|entry| entry.value().clone())
            .collect();
        Box::pin(async move { Ok(enrollments) })
    }

    fn insert_attendance(
        &self,
        record: AttendanceRecordEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let outcome = self.insert_attendance_record(record);
        Box::pin(async move { outcome })
    }

    fn find_attendance(
        &self,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AttendanceRecordEntity>>> {
        let record = self
            .inner
            .attendance
            .get(&event_id)
            .map(|entry| entry.value().clone());
        Box::pin(async move { Ok(record) })
    }

    fn upsert_statistic(
        &self,
        statistic: PlayerStatisticEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner
            .statistics
            .insert((statistic.event_id, statistic.player_id), statistic);
        Box::pin(async { Ok(()) })
    }

    fn list_event_statistics(
        &self,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerStatisticEntity>>> {
        let statistics = self
            .inner
            .statistics
            .iter()
            .filter(|entry| entry.key().0 == event_id)
            .map(|entry| entry.value().clone())
            .collect();
        Box::pin(async move { Ok(statistics) })
    }

    fn list_player_statistics(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerStatisticEntity>>> {
        let statistics = self
            .inner
            .statistics
            .iter()
            .filter(|entry| entry.key().1 == player_id)
            .map(|entry| entry.value().clone())
            .collect();
        Box::pin(async move { Ok(statistics) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
