use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{DocumentIndex, IndexDocument};
use crate::error::IndexError;

/// Process-local index, mostly useful for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    documents: RwLock<HashMap<String, IndexDocument>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<IndexDocument> {
        self.documents.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub async fn documents(&self) -> Vec<(String, IndexDocument)> {
        self.documents
            .read()
            .await
            .iter()
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect()
    }
}

#[async_trait]
impl DocumentIndex for MemoryIndex {
    fn location(&self) -> String {
        "memory:".to_string()
    }

    async fn ping(&self) -> Result<(), IndexError> {
        Ok(())
    }

    async fn upsert_document(&self, id: &str, document: &IndexDocument) -> Result<(), IndexError> {
        self.documents
            .write()
            .await
            .insert(id.to_string(), document.clone());
        Ok(())
    }
}
