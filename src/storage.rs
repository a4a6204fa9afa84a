//! Loading the three datasets into a read-only record store.

use crate::types::{Collection, Record};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Expected a JSON array of records in {0}")]
    NotAnArray(PathBuf),
    #[error("Record {index} in {path} is not a JSON object")]
    NotAnObject { path: PathBuf, index: usize },
}

/// Parse a dataset: a JSON array of flat objects.
pub fn parse_collection(path: &Path, bytes: &[u8]) -> Result<Vec<Record>, StoreError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let Value::Array(items) = value else {
        return Err(StoreError::NotAnArray(path.to_path_buf()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(StoreError::NotAnObject {
                path: path.to_path_buf(),
                index,
            }),
        })
        .collect()
}

/// Read and parse one dataset file.
pub async fn load_collection(path: &Path) -> Result<Vec<Record>, StoreError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_collection(path, &bytes)
}

/// The three collections, loaded once and never mutated.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    users: Vec<Record>,
    tickets: Vec<Record>,
    organizations: Vec<Record>,
}

impl RecordStore {
    pub fn from_records(
        users: Vec<Record>,
        tickets: Vec<Record>,
        organizations: Vec<Record>,
    ) -> Self {
        RecordStore {
            users,
            tickets,
            organizations,
        }
    }

    /// Load `users.json`, `tickets.json` and `organizations.json` from
    /// `data_dir`. The reads run concurrently; any failure fails the load.
    pub async fn load(data_dir: &Path) -> Result<Self, StoreError> {
        let users_path = data_dir.join(Collection::Users.file_name());
        let tickets_path = data_dir.join(Collection::Tickets.file_name());
        let orgs_path = data_dir.join(Collection::Organizations.file_name());

        let (users, tickets, organizations) = tokio::try_join!(
            load_collection(&users_path),
            load_collection(&tickets_path),
            load_collection(&orgs_path),
        )?;

        info!(
            data_dir = %data_dir.display(),
            users = users.len(),
            tickets = tickets.len(),
            organizations = organizations.len(),
            "loaded datasets"
        );

        Ok(RecordStore::from_records(users, tickets, organizations))
    }

    pub fn records(&self, collection: Collection) -> &[Record] {
        match collection {
            Collection::Users => &self.users,
            Collection::Tickets => &self.tickets,
            Collection::Organizations => &self.organizations,
        }
    }
}
