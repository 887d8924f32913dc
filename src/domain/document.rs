//! Document references and snapshots.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Top-level fields of a document.
pub type Fields = serde_json::Map<String, Value>;

/// Reference to a collection. Building it never touches the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CollectionRef(String);

impl CollectionRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Reference to document `id` inside this collection.
    pub fn doc(&self, id: impl Into<String>) -> DocumentRef {
        DocumentRef {
            collection: self.0.clone(),
            id: id.into(),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a single document.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// `collection/id`.
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Result of reading a single document.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    pub reference: DocumentRef,
    /// `None` when the document does not exist.
    pub fields: Option<Fields>,
}

impl DocumentSnapshot {
    pub fn new(reference: DocumentRef, fields: Option<Fields>) -> Self {
        Self { reference, fields }
    }

    /// Snapshot of a document that does not exist.
    pub fn missing(reference: DocumentRef) -> Self {
        Self {
            reference,
            fields: None,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.reference.id
    }

    #[inline]
    pub fn exists(&self) -> bool {
        self.fields.is_some()
    }

    /// Materialize the document into `T`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if fields do not match `T`.
    pub fn data<T: DeserializeOwned>(
        &self,
    ) -> Result<Option<T>, serde_json::Error> {
        self.fields
            .as_ref()
            .map(|fields| serde_json::from_value(Value::Object(fields.clone())))
            .transpose()
    }

    /// Read one top-level field. A missing field or document gives `None`.
    pub fn field<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, serde_json::Error> {
        self.fields
            .as_ref()
            .and_then(|fields| fields.get(name))
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }
}

/// Raw result of reading a whole collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuerySnapshot {
    pub docs: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    pub fn new(docs: Vec<DocumentSnapshot>) -> Self {
        Self { docs }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentSnapshot> {
        self.docs.iter()
    }

    /// Pair every existing document id with its typed data, keeping order.
    pub fn decode<T: DeserializeOwned>(
        &self,
    ) -> Result<Vec<(String, T)>, serde_json::Error> {
        let mut out = Vec::with_capacity(self.docs.len());
        for doc in &self.docs {
            if let Some(data) = doc.data::<T>()? {
                out.push((doc.id().to_owned(), data));
            }
        }
        Ok(out)
    }
}

impl IntoIterator for QuerySnapshot {
    type Item = DocumentSnapshot;
    type IntoIter = std::vec::IntoIter<DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_collection_doc() {
        let reference = CollectionRef::new("posts").doc("abc");
        assert_eq!(reference, DocumentRef::new("posts", "abc"));
        assert_eq!(reference.path(), "posts/abc");
    }

    #[test]
    fn test_snapshot_field() {
        let snapshot = DocumentSnapshot::new(
            DocumentRef::new("posts", "1"),
            Some(fields(json!({ "like": ["a", "b"] }))),
        );

        let like: Option<Vec<String>> = snapshot.field("like").unwrap();
        assert_eq!(like, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(snapshot.field::<String>("text").unwrap(), None);

        let missing = DocumentSnapshot::missing(DocumentRef::new("posts", "2"));
        assert!(!missing.exists());
        assert_eq!(missing.field::<Vec<String>>("like").unwrap(), None);
    }

    #[test]
    fn test_query_decode_skips_missing() {
        let query = QuerySnapshot::new(vec![
            DocumentSnapshot::new(
                DocumentRef::new("c", "1"),
                Some(fields(json!({ "n": 1 }))),
            ),
            DocumentSnapshot::missing(DocumentRef::new("c", "2")),
        ]);

        let decoded: Vec<(String, serde_json::Map<String, Value>)> =
            query.decode().unwrap();
        assert_eq!(query.len(), 2);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].0, "1");
    }
}
