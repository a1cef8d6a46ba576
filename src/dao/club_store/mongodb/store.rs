use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        ATTENDANCE_COLLECTION, ENROLLMENT_COLLECTION, EVENT_COLLECTION, MongoAttendanceDocument,
        MongoEnrollmentDocument, MongoEventDocument, MongoStatisticDocument, MongoUserDocument,
        STATISTIC_COLLECTION, USER_COLLECTION, doc_id, pair_key,
    },
};
use crate::dao::{
    club_store::ClubStore,
    models::{
        AttendanceRecordEntity, EnrollmentEntity, EventEntity, PlayerStatisticEntity, UserEntity,
    },
    storage::StorageResult,
};

#[derive(Clone)]
pub struct MongoClubStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.state.read().await.database.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = establish_connection(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoClubStore {
    /// Connect to MongoDB and make sure the lookup indexes exist.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = establish_connection(&config).await?;
        let store = Self {
            inner: Arc::new(MongoInner {
                state: RwLock::new(MongoState { client, database }),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        // Uniqueness of enrollments, statistics and attendance comes from their `_id`;
        // these indexes only serve the per-event and per-player listings.
        let indexes: [(&'static str, &'static str, Document); 5] = [
            (ENROLLMENT_COLLECTION, "enrollment_event_idx", doc! {"event_id": 1, "created_at": 1}),
            (ENROLLMENT_COLLECTION, "enrollment_player_idx", doc! {"player_id": 1}),
            (STATISTIC_COLLECTION, "statistic_event_idx", doc! {"event_id": 1}),
            (STATISTIC_COLLECTION, "statistic_player_idx", doc! {"player_id": 1}),
            (EVENT_COLLECTION, "event_created_idx", doc! {"created_at": 1}),
        ];

        let database = self.database().await;
        for (collection, name, keys) in indexes {
            let model = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(Some(name.to_owned())).build())
                .build();
            database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index: name,
                    source,
                })?;
        }
        Ok(())
    }

    async fn database(&self) -> Database {
        self.inner.state.read().await.database.clone()
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.inner.state.read().await.database.collection::<T>(name)
    }

    async fn insert<T>(&self, collection: &'static str, what: String, document: T) -> MongoResult<()>
    where
        T: Serialize + Send + Sync,
    {
        self.collection::<T>(collection)
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::from_insert(collection, what, source))?;
        Ok(())
    }

    async fn upsert<T>(&self, collection: &'static str, id: String, document: T) -> MongoResult<()>
    where
        T: Serialize + Send + Sync,
    {
        self.collection::<T>(collection)
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Write { collection, source })?;
        Ok(())
    }

    async fn find_one<T>(&self, collection: &'static str, filter: Document) -> MongoResult<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.collection::<T>(collection)
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::Read { collection, source })
    }

    async fn find_many<T>(
        &self,
        collection: &'static str,
        filter: Document,
        sort: Document,
    ) -> MongoResult<Vec<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.collection::<T>(collection)
            .await
            .find(filter)
            .sort(sort)
            .await
            .map_err(|source| MongoDaoError::Read { collection, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Read { collection, source })
    }

    async fn save_user(&self, user: UserEntity) -> MongoResult<()> {
        let id = user.id.to_string();
        self.upsert(USER_COLLECTION, id, MongoUserDocument::from(user))
            .await
    }

    async fn find_user(&self, id: Uuid) -> MongoResult<Option<UserEntity>> {
        self.find_one::<MongoUserDocument>(USER_COLLECTION, doc_id(id))
            .await?
            .map(UserEntity::try_from)
            .transpose()
    }

    async fn find_users(&self, ids: Vec<Uuid>) -> MongoResult<Vec<UserEntity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        self.find_many::<MongoUserDocument>(USER_COLLECTION, doc! {"_id": {"$in": ids}}, doc! {})
            .await?
            .into_iter()
            .map(UserEntity::try_from)
            .collect()
    }

    async fn insert_event(&self, event: EventEntity) -> MongoResult<()> {
        let what = format!("event `{}` already exists", event.id);
        self.insert(EVENT_COLLECTION, what, MongoEventDocument::from(event))
            .await
    }

    async fn find_event(&self, id: Uuid) -> MongoResult<Option<EventEntity>> {
        self.find_one::<MongoEventDocument>(EVENT_COLLECTION, doc_id(id))
            .await?
            .map(EventEntity::try_from)
            .transpose()
    }

    async fn list_events(&self) -> MongoResult<Vec<EventEntity>> {
        self.find_many::<MongoEventDocument>(EVENT_COLLECTION, doc! {}, doc! {"created_at": 1})
            .await?
            .into_iter()
            .map(EventEntity::try_from)
            .collect()
    }

    async fn insert_enrollment(&self, enrollment: EnrollmentEntity) -> MongoResult<()> {
        let what = format!(
            "player `{}` already enrolled in event `{}`",
            enrollment.player_id, enrollment.event_id
        );
        self.insert(
            ENROLLMENT_COLLECTION,
            what,
            MongoEnrollmentDocument::from(enrollment),
        )
        .await
    }

    async fn list_enrollments(&self, filter: Document) -> MongoResult<Vec<EnrollmentEntity>> {
        self.find_many::<MongoEnrollmentDocument>(
            ENROLLMENT_COLLECTION,
            filter,
            doc! {"created_at": 1},
        )
        .await?
        .into_iter()
        .map(EnrollmentEntity::try_from)
        .collect()
    }

    async fn insert_attendance(&self, record: AttendanceRecordEntity) -> MongoResult<()> {
        let what = format!("attendance already recorded for event `{}`", record.event_id);
        self.insert(
            ATTENDANCE_COLLECTION,
            what,
            MongoAttendanceDocument::from(record),
        )
        .await
    }

    async fn find_attendance(&self, event_id: Uuid) -> MongoResult<Option<AttendanceRecordEntity>> {
        self.find_one::<MongoAttendanceDocument>(ATTENDANCE_COLLECTION, doc_id(event_id))
            .await?
            .map(AttendanceRecordEntity::try_from)
            .transpose()
    }

    async fn upsert_statistic(&self, statistic: PlayerStatisticEntity) -> MongoResult<()> {
        let id = pair_key(statistic.event_id, statistic.player_id);
        self.upsert(
            STATISTIC_COLLECTION,
            id,
            MongoStatisticDocument::from(statistic),
        )
        .await
    }

    async fn list_statistics(&self, filter: Document) -> MongoResult<Vec<PlayerStatisticEntity>> {
        self.find_many::<MongoStatisticDocument>(STATISTIC_COLLECTION, filter, doc! {})
            .await?
            .into_iter()
            .map(PlayerStatisticEntity::try_from)
            .collect()
    }
}

impl ClubStore for MongoClubStore {
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_user(user).await.map_err(Into::into) })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user(id).await.map_err(Into::into) })
    }

    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_users(ids).await.map_err(Into::into) })
    }

    fn insert_event(&self, event: EventEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_event(event).await.map_err(Into::into) })
    }

    fn find_event(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_event(id).await.map_err(Into::into) })
    }

    fn list_events(&self) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_events().await.map_err(Into::into) })
    }

    fn insert_enrollment(
        &self,
        enrollment: EnrollmentEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_enrollment(enrollment).await.map_err(Into::into) })
    }

    fn list_event_enrollments(
        &self,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<EnrollmentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_enrollments(doc! {"event_id": event_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn list_player_enrollments(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<EnrollmentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_enrollments(doc! {"player_id": player_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn insert_attendance(
        &self,
        record: AttendanceRecordEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_attendance(record).await.map_err(Into::into) })
    }

    fn find_attendance(
        &self,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AttendanceRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_attendance(event_id).await.map_err(Into::into) })
    }

    fn upsert_statistic(
        &self,
        statistic: PlayerStatisticEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_statistic(statistic).await.map_err(Into::into) })
    }

    fn list_event_statistics(
        &self,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerStatisticEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_statistics(doc! {"event_id": event_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn list_player_statistics(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerStatisticEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_statistics(doc! {"player_id": player_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
