use crate::error::StoreError;
use async_trait::async_trait;
use confab_core::{Document, TeamId};
use dashmap::DashMap;

/// Durable home of each team's note.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_by_team(&self, team: &TeamId) -> Result<Option<Document>, StoreError>;

    /// Insert or replace the team's document.
    async fn save(&self, doc: &Document) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: DashMap<TeamId, Document>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_by_team(&self, team: &TeamId) -> Result<Option<Document>, StoreError> {
        Ok(self.docs.get(team).map(|doc| doc.clone()))
    }

    async fn save(&self, doc: &Document) -> Result<(), StoreError> {
        self.docs.insert(doc.team_id.clone(), doc.clone());
        Ok(())
    }
}
