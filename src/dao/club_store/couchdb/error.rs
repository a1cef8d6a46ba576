//! Error types shared by the CouchDB storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`CouchDaoError`] failures.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures that can occur while interacting with CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// Required environment variable is missing.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB rejected a database creation request.
    #[error("failed to create CouchDB database `{database}`")]
    DatabaseCreate {
        database: String,
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB answered an unexpected status while probing or creating the database.
    #[error("unexpected CouchDB status {status} for database `{database}`")]
    DatabaseStatus {
        database: String,
        status: StatusCode,
    },
    /// The HTTP request never reached CouchDB.
    #[error("failed to send CouchDB request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB answered a document request with an unexpected status.
    #[error("unexpected CouchDB status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// The response body could not be read as JSON.
    #[error("failed to decode CouchDB response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// A stored document does not match the expected shape.
    #[error("failed to deserialize CouchDB document from `{path}`")]
    DeserializeValue {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// CouchDB answered 409: the document already exists.
    #[error("{what}")]
    Conflict { what: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::storage::StorageError;

    #[test]
    fn conflicts_stay_distinct_from_outages() {
        let conflict: StorageError = CouchDaoError::Conflict {
            what: "attendance already recorded".into(),
        }
        .into();
        assert!(matches!(conflict, StorageError::Conflict { .. }));

        let outage: StorageError = CouchDaoError::RequestStatus {
            path: "/club/event:1".into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
        .into();
        assert!(matches!(outage, StorageError::Unavailable { .. }));
        assert!(outage.to_string().contains("/club/event:1"));
    }
}
