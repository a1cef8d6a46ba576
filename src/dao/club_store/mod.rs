#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    AttendanceRecordEntity, EnrollmentEntity, EventEntity, PlayerStatisticEntity, UserEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer of the club.
///
/// `insert_enrollment` and `insert_attendance` are insert-only: a second write for the same
/// key must fail with [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict)
/// and leave the stored value untouched.
pub trait ClubStore: Send + Sync {
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;
    fn insert_event(&self, event: EventEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_event(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<EventEntity>>>;
    fn list_events(&self) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>>;
    fn insert_enrollment(
        &self,
        enrollment: EnrollmentEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn list_event_enrollments(
        &self,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<EnrollmentEntity>>>;
    fn list_player_enrollments(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<EnrollmentEntity>>>;
    fn insert_attendance(
        &self,
        record: AttendanceRecordEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn find_attendance(
        &self,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AttendanceRecordEntity>>>;
    fn upsert_statistic(
        &self,
        statistic: PlayerStatisticEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn list_event_statistics(
        &self,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerStatisticEntity>>>;
    fn list_player_statistics(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerStatisticEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
