//! In-memory document store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CallLog, lock, random_id};
use crate::domain::{
    CollectionRef, DocumentRef, DocumentSnapshot, Fields, QuerySnapshot,
};
use crate::ports::store::{DocumentStore, Result, StoreError};

const DOCUMENT_ID_LENGTH: usize = 20;

/// Call received by [`MemoryDocumentStore`], with its arguments.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    Add {
        collection: CollectionRef,
        fields: Fields,
    },
    Update {
        reference: DocumentRef,
        fields: Fields,
    },
    Delete {
        reference: DocumentRef,
    },
    Get {
        reference: DocumentRef,
    },
    GetAll {
        collection: CollectionRef,
    },
}

impl StoreCall {
    fn op(&self) -> StoreOp {
        match self {
            StoreCall::Add { .. } => StoreOp::Add,
            StoreCall::Update { .. } => StoreOp::Update,
            StoreCall::Delete { .. } => StoreOp::Delete,
            StoreCall::Get { .. } => StoreOp::Get,
            StoreCall::GetAll { .. } => StoreOp::GetAll,
        }
    }
}

/// Kind of store call, used to inject failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Add,
    Update,
    Delete,
    Get,
    GetAll,
}

#[derive(Debug, thiserror::Error)]
#[error("injected {0:?} failure")]
struct InjectedFailure(StoreOp);

#[derive(Default)]
struct State {
    // Documents kept in insertion order per collection.
    collections: HashMap<String, Vec<(String, Fields)>>,
    calls: CallLog<StoreCall>,
    failures: HashSet<StoreOp>,
}

impl State {
    fn find_mut(&mut self, reference: &DocumentRef) -> Option<&mut Fields> {
        self.collections
            .get_mut(&reference.collection)?
            .iter_mut()
            .find(|(id, _)| *id == reference.id)
            .map(|(_, fields)| fields)
    }
}

/// Document store keeping collections in memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    state: Mutex<State>,
}

impl MemoryDocumentStore {
    /// Create a new, empty [`MemoryDocumentStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new, empty [`MemoryDocumentStore`] that logs its calls.
    pub fn recording() -> Self {
        Self {
            state: Mutex::new(State {
                calls: CallLog::recording(),
                ..Default::default()
            }),
        }
    }

    /// Write a document directly, without logging a call.
    pub fn insert(&self, reference: &DocumentRef, fields: Fields) {
        let mut state = lock(&self.state);
        match state.find_mut(reference) {
            Some(existing) => *existing = fields,
            None => state
                .collections
                .entry(reference.collection.clone())
                .or_default()
                .push((reference.id.clone(), fields)),
        }
    }

    /// Fail the next call of kind `op` with [`StoreError::Backend`].
    pub fn fail_next(&self, op: StoreOp) {
        lock(&self.state).failures.insert(op);
    }

    /// Logged calls, oldest first. Empty unless built with `recording()`.
    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.state).calls.to_vec()
    }

    /// Number of logged calls of kind `op`.
    pub fn count(&self, op: StoreOp) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    fn record(
        &self,
        op: StoreOp,
        call: impl FnOnce() -> StoreCall,
    ) -> Result<()> {
        let mut state = lock(&self.state);
        if state.calls.enabled {
            state.calls.push(call());
        }

        if state.failures.remove(&op) {
            return Err(StoreError::Backend(Box::new(InjectedFailure(op))));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add(
        &self,
        collection: &CollectionRef,
        fields: Fields,
    ) -> Result<DocumentRef> {
        self.record(StoreOp::Add, || StoreCall::Add {
            collection: collection.clone(),
            fields: fields.clone(),
        })?;

        let reference = collection.doc(random_id(DOCUMENT_ID_LENGTH));
        lock(&self.state)
            .collections
            .entry(reference.collection.clone())
            .or_default()
            .push((reference.id.clone(), fields));

        tracing::debug!(%reference, "document added");
        Ok(reference)
    }

    async fn update(
        &self,
        reference: &DocumentRef,
        fields: Fields,
    ) -> Result<()> {
        self.record(StoreOp::Update, || StoreCall::Update {
            reference: reference.clone(),
            fields: fields.clone(),
        })?;

        let mut state = lock(&self.state);
        let existing = state
            .find_mut(reference)
            .ok_or_else(|| StoreError::not_found(reference))?;
        existing.extend(fields);
        Ok(())
    }

    async fn delete(&self, reference: &DocumentRef) -> Result<()> {
        self.record(StoreOp::Delete, || StoreCall::Delete {
            reference: reference.clone(),
        })?;

        let mut state = lock(&self.state);
        if let Some(docs) = state.collections.get_mut(&reference.collection) {
            docs.retain(|(id, _)| *id != reference.id);
        }
        Ok(())
    }

    async fn get(&self, reference: &DocumentRef) -> Result<DocumentSnapshot> {
        self.record(StoreOp::Get, || StoreCall::Get {
            reference: reference.clone(),
        })?;

        let fields = lock(&self.state).find_mut(reference).cloned();
        Ok(DocumentSnapshot::new(reference.clone(), fields))
    }

    async fn get_all(
        &self,
        collection: &CollectionRef,
    ) -> Result<QuerySnapshot> {
        self.record(StoreOp::GetAll, || StoreCall::GetAll {
            collection: collection.clone(),
        })?;

        let docs = lock(&self.state)
            .collections
            .get(collection.as_str())
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| {
                        let reference = collection.doc(id.clone());
                        DocumentSnapshot::new(reference, Some(fields.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(QuerySnapshot::new(docs))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let store = MemoryDocumentStore::new();
        let posts = CollectionRef::new("posts");

        let reference =
            store.add(&posts, fields(json!({ "text": "eai" }))).await.unwrap();
        assert_eq!(reference.collection, "posts");
        assert_eq!(reference.id.len(), DOCUMENT_ID_LENGTH);

        let snapshot = store.get(&reference).await.unwrap();
        assert_eq!(
            snapshot.field::<String>("text").unwrap().as_deref(),
            Some("eai")
        );
    }

    #[tokio::test]
    async fn test_update_merges_top_level() {
        let store = MemoryDocumentStore::new();
        let reference = DocumentRef::new("posts", "455455");
        store.insert(
            &reference,
            fields(json!({ "text": "eai", "tag": "musica" })),
        );

        store
            .update(&reference, fields(json!({ "text": "novo texto" })))
            .await
            .unwrap();

        let snapshot = store.get(&reference).await.unwrap();
        assert_eq!(
            snapshot.fields.map(Value::Object),
            Some(json!({ "text": "novo texto", "tag": "musica" }))
        );
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update(&DocumentRef::new("posts", "nope"), Fields::new())
            .await
            .unwrap_err();
        assert!(
            matches!(err, StoreError::NotFound { path } if path == "posts/nope")
        );
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryDocumentStore::recording();
        let reference = DocumentRef::new("posts", "abcdefghi");
        store.insert(&reference, Fields::new());

        store.delete(&reference).await.unwrap();
        store.delete(&reference).await.unwrap();
        assert!(!store.get(&reference).await.unwrap().exists());
        assert_eq!(store.count(StoreOp::Delete), 2);
    }

    #[tokio::test]
    async fn test_get_all_keeps_insertion_order() {
        let store = MemoryDocumentStore::new();
        let posts = CollectionRef::new("posts");
        for id in ["b", "a", "c"] {
            store.insert(&posts.doc(id), Fields::new());
        }
        store.insert(&DocumentRef::new("other", "z"), Fields::new());

        let query = store.get_all(&posts).await.unwrap();
        let ids: Vec<&str> = query.iter().map(|doc| doc.id()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryDocumentStore::new();
        store.fail_next(StoreOp::GetAll);

        let posts = CollectionRef::new("posts");
        assert!(matches!(
            store.get_all(&posts).await,
            Err(StoreError::Backend(_))
        ));
        assert!(store.get_all(&posts).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_default_store_keeps_no_calls() {
        let store = MemoryDocumentStore::new();
        let posts = CollectionRef::new("posts");
        store.add(&posts, fields(json!({ "text": "eai" }))).await.unwrap();
        store.get_all(&posts).await.unwrap();

        assert!(store.calls().is_empty());
        assert_eq!(store.count(StoreOp::Add), 0);
    }
}
