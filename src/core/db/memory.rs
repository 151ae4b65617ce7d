use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocPath, Document, DocumentStore, Fields};

/// Process-local document store.
///
/// Collections keep insertion order, ids are random v4 UUIDs in simple form.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<DocPath, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents stored directly under `collection`.
    pub async fn len(&self, collection: &DocPath) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn list(&self, collection: &DocPath) -> anyhow::Result<Vec<Document>> {
        collection.ensure_collection()?;
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn create(&self, collection: &DocPath, fields: Fields) -> anyhow::Result<String> {
        collection.ensure_collection()?;
        let id = Uuid::new_v4().simple().to_string();
        self.collections
            .write()
            .await
            .entry(collection.clone())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        Ok(id)
    }

    async fn delete(&self, document: &DocPath) -> anyhow::Result<()> {
        let (collection, id) = document.split_document()?;
        if let Some(documents) = self.collections.write().await.get_mut(&collection) {
            documents.retain(|doc| doc.id != id);
        }
        Ok(())
    }
}
