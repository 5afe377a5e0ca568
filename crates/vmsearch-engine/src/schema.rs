//! Collection provisioning.
//!
//! Provisioning is destructive: an existing collection with the same name is
//! dropped, with all its documents, before the new schema is created. Callers
//! must not run it while ingestion or queries target the same collection.

use std::sync::Arc;

use tracing::info;

use vmsearch_core::error::SchemaError;
use vmsearch_core::traits::SearchBackend;
use vmsearch_core::types::{CollectionInfo, CollectionSchema};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created(CollectionInfo),
    Replaced { previous_documents: u64, info: CollectionInfo },
}

impl ProvisionOutcome {
    pub fn info(&self) -> &CollectionInfo {
        match self {
            Self::Created(info) | Self::Replaced { info, .. } => info,
        }
    }
}

pub struct SchemaManager {
    backend: Arc<dyn SearchBackend>,
}

impl SchemaManager {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Create `schema`'s collection, replacing any collection of that name.
    pub async fn provision(&self, schema: &CollectionSchema) -> Result<ProvisionOutcome, SchemaError> {
        let collection = schema.name.clone();
        schema
            .validate()
            .map_err(|reason| SchemaError::InvalidSchema { collection: collection.clone(), reason })?;

        let existing = self
            .backend
            .retrieve_collection(&collection)
            .await
            .map_err(|source| SchemaError::Lookup { collection: collection.clone(), source })?;

        let previous_documents = match existing {
            Some(current) => {
                info!(collection = %collection, documents = current.num_documents, "Collection exists, deleting");
                match self.backend.delete_collection(&collection).await {
                    Ok(()) => {}
                    // already gone; nothing left to reset
                    Err(e) if e.is_not_found() => {}
                    Err(source) => return Err(SchemaError::Delete { collection, source }),
                }
                Some(current.num_documents)
            }
            None => {
                info!(collection = %collection, "Collection does not exist");
                None
            }
        };

        let info = self
            .backend
            .create_collection(schema)
            .await
            .map_err(|source| SchemaError::Create { collection: collection.clone(), source })?;
        info!(collection = %collection, fields = info.fields.len(), "Created collection");

        Ok(match previous_documents {
            Some(previous_documents) => ProvisionOutcome::Replaced { previous_documents, info },
            None => ProvisionOutcome::Created(info),
        })
    }

    /// Delete a collection. Returns `false` when there was nothing to delete.
    pub async fn drop_collection(&self, name: &str) -> Result<bool, SchemaError> {
        match self.backend.delete_collection(name).await {
            Ok(()) => {
                info!(collection = %name, "Deleted collection");
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(source) => Err(SchemaError::Delete { collection: name.to_string(), source }),
        }
    }
}
