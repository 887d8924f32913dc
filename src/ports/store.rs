//! Document store port.

use async_trait::async_trait;

use crate::domain::{
    CollectionRef, DocumentRef, DocumentSnapshot, Fields, QuerySnapshot,
};

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by document stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no document at {path}")]
    NotFound { path: String },

    #[error("document does not match the expected shape: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document store failure")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn not_found(reference: &DocumentRef) -> Self {
        Self::NotFound {
            path: reference.path(),
        }
    }
}

pub trait ToBackend<T> {
    fn catch(self) -> Result<T>;
}

impl<T, E> ToBackend<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn catch(self) -> Result<T> {
        self.map_err(|e| StoreError::Backend(Box::new(e)))
    }
}

/// Port for collection/document persistence.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Add a new document with a generated id.
    async fn add(
        &self,
        collection: &CollectionRef,
        fields: Fields,
    ) -> Result<DocumentRef>;

    /// Merge `fields` into the top level of an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] when the document does not
    /// exist.
    async fn update(
        &self,
        reference: &DocumentRef,
        fields: Fields,
    ) -> Result<()>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete(&self, reference: &DocumentRef) -> Result<()>;

    /// Read a single document.
    async fn get(&self, reference: &DocumentRef) -> Result<DocumentSnapshot>;

    /// Read every document of a collection.
    async fn get_all(
        &self,
        collection: &CollectionRef,
    ) -> Result<QuerySnapshot>;
}
