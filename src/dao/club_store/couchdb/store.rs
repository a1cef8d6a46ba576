use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{from_value, json};
use uuid::Uuid;

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchDocument, ENROLLMENT_PREFIX, END_SUFFIX, EVENT_PREFIX,
        STATISTIC_PREFIX, attendance_doc_id, enrollment_doc_id, event_doc_id,
        event_enrollment_prefix, event_statistic_prefix, statistic_doc_id, user_doc_id,
    },
};
use crate::dao::{
    club_store::ClubStore,
    models::{
        AttendanceRecordEntity, EnrollmentEntity, EventEntity, PlayerStatisticEntity, UserEntity,
    },
    storage::StorageResult,
};

const ALL_DOCS: &str = "_all_docs";

#[derive(Clone)]
pub struct CouchClubStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchClubStore {
    /// Build the HTTP client and create the database when missing.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            database: Arc::from(config.database),
            auth: config
                .credentials
                .map(|(user, pass)| (Arc::from(user), Arc::from(pass))),
        };
        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some((user, pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.authorize(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let url = self.database_url();
        let database = self.database.to_string();

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let created = self
                    .authorize(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                // 412 means another instance created it first.
                match created.status() {
                    status if status.is_success() => Ok(()),
                    StatusCode::PRECONDITION_FAILED => Ok(()),
                    status => Err(CouchDaoError::DatabaseStatus { database, status }),
                }
            }
            status => Err(CouchDaoError::DatabaseStatus { database, status }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<CouchDocument<T>>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_owned(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchDocument<T>>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: doc_id.to_owned(),
                    source,
                }),
            status => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_owned(),
                status,
            }),
        }
    }

    /// PUT a document. Without a `_rev` CouchDB refuses to overwrite and answers 409,
    /// which surfaces as [`CouchDaoError::Conflict`] carrying `what`.
    async fn put_document<T>(&self, document: &CouchDocument<T>, what: &str) -> CouchResult<()>
    where
        T: Serialize,
    {
        let response = self
            .request(Method::PUT, &document.id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: document.id.clone(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                what: what.to_owned(),
            }),
            status => Err(CouchDaoError::RequestStatus {
                path: document.id.clone(),
                status,
            }),
        }
    }

    /// Overwrite a document, carrying over the current revision when it exists.
    async fn upsert_document<T>(&self, mut document: CouchDocument<T>) -> CouchResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        if let Some(existing) = self.get_document::<T>(&document.id).await? {
            document.rev = existing.rev;
        }
        let what = format!("document `{}` changed concurrently", document.id);
        self.put_document(&document, &what).await
    }

    async fn decode_rows<T>(&self, response: reqwest::Response) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_owned(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_owned(),
                source,
            }
        })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(|doc| {
                from_value::<CouchDocument<T>>(doc)
                    .map(|doc| doc.body)
                    .map_err(|source| CouchDaoError::DeserializeValue {
                        path: ALL_DOCS.to_owned(),
                        source,
                    })
            })
            .collect()
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let query = [
            ("include_docs", "true".to_owned()),
            ("startkey", format!("\"{prefix}\"")),
            ("endkey", format!("\"{prefix}{END_SUFFIX}\"")),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_owned(),
                source,
            })?;

        self.decode_rows(response).await
    }

    async fn fetch_documents<T>(&self, keys: Vec<String>) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, ALL_DOCS)
            .query(&[("include_docs", "true")])
            .json(&json!({ "keys": keys }))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_owned(),
                source,
            })?;

        self.decode_rows(response).await
    }

    async fn list_enrollments(&self, prefix: &str) -> CouchResult<Vec<EnrollmentEntity>> {
        let mut enrollments = self.list_documents::<EnrollmentEntity>(prefix).await?;
        enrollments.sort_by_key(|enrollment| enrollment.created_at);
        Ok(enrollments)
    }

    async fn health(&self) -> CouchResult<()> {
        let url = self.database_url();
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: url,
                status: response.status(),
            })
        }
    }
}

impl ClubStore for CouchClubStore {
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = CouchDocument::new(user_doc_id(user.id), user);
            store.upsert_document(doc).await.map_err(Into::into)
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store.get_document::<UserEntity>(&user_doc_id(id)).await?;
            Ok(doc.map(|doc| doc.body))
        })
    }

    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let keys = ids.into_iter().map(user_doc_id).collect();
            store.fetch_documents(keys).await.map_err(Into::into)
        })
    }

    fn insert_event(&self, event: EventEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let what = format!("event `{}` already exists", event.id);
            let doc = CouchDocument::new(event_doc_id(event.id), event);
            store.put_document(&doc, &what).await.map_err(Into::into)
        })
    }

    fn find_event(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store.get_document::<EventEntity>(&event_doc_id(id)).await?;
            Ok(doc.map(|doc| doc.body))
        })
    }

    fn list_events(&self) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut events = store.list_documents::<EventEntity>(EVENT_PREFIX).await?;
            events.sort_by_key(|event| event.created_at);
            Ok(events)
        })
    }

    fn insert_enrollment(
        &self,
        enrollment: EnrollmentEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let what = format!(
                "player `{}` already enrolled in event `{}`",
                enrollment.player_id, enrollment.event_id
            );
            let id = enrollment_doc_id(enrollment.event_id, enrollment.player_id);
            let doc = CouchDocument::new(id, enrollment);
            store.put_document(&doc, &what).await.map_err(Into::into)
        })
    }

    fn list_event_enrollments(
        &self,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<EnrollmentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_enrollments(&event_enrollment_prefix(event_id))
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
            let mut enrollments = store.list_enrollments(ENROLLMENT_PREFIX).await?;
            enrollments.retain(|enrollment| enrollment.player_id == player_id);
            Ok(enrollments)
        })
    }

    fn insert_attendance(
        &self,
        record: AttendanceRecordEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let what = format!("attendance already recorded for event `{}`", record.event_id);
            let doc = CouchDocument::new(attendance_doc_id(record.event_id), record);
            store.put_document(&doc, &what).await.map_err(Into::into)
        })
    }

    fn find_attendance(
        &self,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AttendanceRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<AttendanceRecordEntity>(&attendance_doc_id(event_id))
                .await?;
            Ok(doc.map(|doc| doc.body))
        })
    }

    fn upsert_statistic(
        &self,
        statistic: PlayerStatisticEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = statistic_doc_id(statistic.event_id, statistic.player_id);
            store
                .upsert_document(CouchDocument::new(id, statistic))
                .await
                .map_err(Into::into)
        })
    }

    fn list_event_statistics(
        &self,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerStatisticEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_documents(&event_statistic_prefix(event_id))
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
            let mut statistics = store
                .list_documents::<PlayerStatisticEntity>(STATISTIC_PREFIX)
                .await?;
            statistics.retain(|statistic| statistic.player_id == player_id);
            Ok(statistics)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.health().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
