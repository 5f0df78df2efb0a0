//! Catalog of completed models, persisted as a single JSON array.
//!
//! All operations go through one `RwLock`. Mutations serialize the full
//! candidate list to disk while holding the write lock and only commit it in
//! memory after the write succeeded, so `models.json` always matches a
//! committed in-memory state.

use std::path::{Path, PathBuf};

use assetter_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;

use crate::atomic::write_atomic;
use crate::error::CatalogError;

/// File name of the catalog inside the data directory.
pub const CATALOG_FILE_NAME: &str = "models.json";

/// Durable metadata for one completed generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Id of the job that produced the artifact.
    pub id: String,
    pub created_at: Timestamp,
    /// Provenance reference for the source image, if one was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,
}

#[derive(Debug)]
pub struct ModelCatalog {
    records: RwLock<Vec<ModelRecord>>,
    data_file: PathBuf,
}

impl ModelCatalog {
    /// Open the catalog stored in `data_dir`, creating the directory if needed.
    ///
    /// A missing catalog file yields an empty catalog. Entries that cannot be
    /// decoded are logged and skipped; a file that is not a JSON array at all
    /// is rejected.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).await?;
        let data_file = data_dir.join(CATALOG_FILE_NAME);

        let records = match fs::read(&data_file).await {
            Ok(raw) => decode_records(&data_file, &raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            path = %data_file.display(),
            count = records.len(),
            "Model catalog loaded"
        );

        Ok(Self {
            records: RwLock::new(records),
            data_file,
        })
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// Record a completed model.
    ///
    /// An empty `original_image` is stored as absent.
    pub async fn append(
        &self,
        id: &str,
        original_image: &str,
    ) -> Result<ModelRecord, CatalogError> {
        let mut records = self.records.write().await;

        if records.iter().any(|r| r.id == id) {
            return Err(CatalogError::Duplicate(id.to_string()));
        }

        let record = ModelRecord {
            id: id.to_string(),
            created_at: chrono::Utc::now(),
            original_image: (!original_image.is_empty()).then(|| original_image.to_string()),
        };

        let mut next = records.clone();
        next.push(record.clone());
        self.persist(&next).await?;
        *records = next;

        tracing::debug!(model_id = %id, "Model catalogued");
        Ok(record)
    }

    /// All records, newest first.
    ///
    /// Records created at the same instant keep their insertion order.
    pub async fn list_all(&self) -> Vec<ModelRecord> {
        let mut models = self.records.read().await.clone();
        models.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        models
    }

    pub async fn get_by_id(&self, id: &str) -> Result<ModelRecord, CatalogError> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// Remove a record, returning it.
    pub async fn remove(&self, id: &str) -> Result<ModelRecord, CatalogError> {
        let mut records = self.records.write().await;

        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;

        let mut next = records.clone();
        let removed = next.remove(index);
        self.persist(&next).await?;
        *records = next;

        tracing::debug!(model_id = %id, "Model removed from catalog");
        Ok(removed)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn persist(&self, records: &[ModelRecord]) -> Result<(), CatalogError> {
        let data = serde_json::to_vec_pretty(records)?;
        write_atomic(&self.data_file, &data).await?;
        Ok(())
    }
}

/// Decode the catalog file, skipping entries that do not parse.
fn decode_records(path: &Path, raw: &[u8]) -> Result<Vec<ModelRecord>, CatalogError> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_slice(raw).map_err(|e| CatalogError::Corrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<ModelRecord>(entry) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    index,
                    error = %e,
                    "Skipping malformed catalog entry"
                );
            }
        }
    }
    Ok(records)
}
