use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::application::ports::document_store::{
    BackendError, Collection, DocumentList, DocumentStore, Query,
};

/// Process-local document store. Evaluates `Query` predicates directly over the
/// stored JSON, optionally refusing full-text search the way an unindexed
/// backend does.
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<Collection, Vec<Value>>>,
    fulltext_indexed: bool,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            fulltext_indexed: true,
        }
    }

    pub fn without_fulltext_index() -> Self {
        Self {
            fulltext_indexed: false,
            ..Self::new()
        }
    }

    pub async fn count(&self, collection: Collection) -> usize {
        self.collections
            .lock()
            .await
            .get(&collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub async fn get(&self, collection: Collection, id: &str) -> Option<Value> {
        self.collections
            .lock()
            .await
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| doc_id(d) == Some(id)).cloned())
    }

    fn check_searchable(&self, queries: &[Query]) -> Result<(), BackendError> {
        if self.fulltext_indexed {
            return Ok(());
        }
        match find_search_attribute(queries) {
            Some(attribute) => Err(BackendError {
                code: 400,
                kind: "general_query_invalid".into(),
                message: format!("Searching by attribute \"{attribute}\" requires a fulltext index."),
            }),
            None => Ok(()),
        }
    }
}

fn find_search_attribute(queries: &[Query]) -> Option<&str> {
    queries.iter().find_map(|q| match q {
        Query::Search { attribute, .. } => Some(attribute.as_str()),
        Query::Or(inner) => find_search_attribute(inner),
        _ => None,
    })
}

fn doc_id(doc: &Value) -> Option<&str> {
    doc.get("$id").and_then(Value::as_str)
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("$id").and_then(Value::as_str).map(str::to_owned),
        other => Some(other.to_string()),
    }
}

/// Whole-token match: a member of a list (stored as JSON text or as an array)
/// or the entire value.
fn search_matches(value: &Value, term: &str) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|i| i.as_str() == Some(term)),
        Value::String(s) if s.trim_start().starts_with('[') => {
            match serde_json::from_str::<Vec<Value>>(s) {
                Ok(items) => items.iter().any(|i| i.as_str() == Some(term)),
                Err(_) => s == term,
            }
        }
        other => text_of(other).is_some_and(|v| v == term),
    }
}

fn matches(doc: &Value, query: &Query) -> bool {
    match query {
        Query::Equal { attribute, values } => doc
            .get(attribute)
            .and_then(text_of)
            .is_some_and(|v| values.iter().any(|x| *x == v)),
        Query::Search { attribute, term } => doc
            .get(attribute)
            .is_some_and(|v| search_matches(v, term)),
        Query::Contains { attribute, value } => doc
            .get(attribute)
            .and_then(text_of)
            .is_some_and(|v| v.contains(value.as_str())),
        Query::Or(inner) => inner.iter().any(|q| matches(doc, q)),
        Query::Limit(_) | Query::OrderAsc(_) | Query::OrderDesc(_) => true,
    }
}

fn compare_attr(a: &Value, b: &Value, attribute: &str) -> Ordering {
    match (a.get(attribute), b.get(attribute)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => text_of(x).cmp(&text_of(y)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn not_found(id: &str) -> BackendError {
    BackendError::not_found(format!("Document with the requested ID '{id}' could not be found."))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_document(
        &self,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> anyhow::Result<Value> {
        let Value::Object(mut body) = data else {
            anyhow::bail!("document data must be a JSON object");
        };
        let mut guard = self.collections.lock().await;
        let docs = guard.entry(collection).or_default();
        if docs.iter().any(|d| doc_id(d) == Some(id)) {
            return Err(BackendError {
                code: 409,
                kind: "document_already_exists".into(),
                message: format!("Document with the requested ID '{id}' already exists."),
            }
            .into());
        }
        let now = Utc::now().to_rfc3339();
        body.insert("$id".into(), Value::String(id.to_string()));
        body.insert("$createdAt".into(), Value::String(now.clone()));
        body.insert("$updatedAt".into(), Value::String(now));
        let doc = Value::Object(body);
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn list_documents(
        &self,
        collection: Collection,
        queries: &[Query],
    ) -> anyhow::Result<DocumentList> {
        self.check_searchable(queries)?;
        let guard = self.collections.lock().await;
        let mut docs: Vec<Value> = guard
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| queries.iter().all(|q| matches(d, q)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(guard);

        // Later order predicates are tie-breakers, so apply them first.
        for q in queries.iter().rev() {
            match q {
                Query::OrderAsc(attr) => docs.sort_by(|a, b| compare_attr(a, b, attr)),
                Query::OrderDesc(attr) => docs.sort_by(|a, b| compare_attr(b, a, attr)),
                _ => {}
            }
        }
        let total = docs.len() as u64;
        if let Some(limit) = queries.iter().find_map(|q| match q {
            Query::Limit(n) => Some(*n as usize),
            _ => None,
        }) {
            docs.truncate(limit);
        }
        Ok(DocumentList {
            total,
            documents: docs,
        })
    }

    async fn update_document(
        &self,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> anyhow::Result<Value> {
        let Value::Object(patch) = data else {
            anyhow::bail!("document data must be a JSON object");
        };
        let mut guard = self.collections.lock().await;
        let doc = guard
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| doc_id(d) == Some(id)))
            .ok_or_else(|| not_found(id))?;
        let body: &mut Map<String, Value> = doc
            .as_object_mut()
            .ok_or_else(|| anyhow::anyhow!("stored document {id} is not an object"))?;
        for (k, v) in patch {
            if !k.starts_with('$') {
                body.insert(k, v);
            }
        }
        body.insert("$updatedAt".into(), Value::String(Utc::now().to_rfc3339()));
        Ok(doc.clone())
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> anyhow::Result<()> {
        let mut guard = self.collections.lock().await;
        let docs = guard.get_mut(&collection).ok_or_else(|| not_found(id))?;
        let pos = docs
            .iter()
            .position(|d| doc_id(d) == Some(id))
            .ok_or_else(|| not_found(id))?;
        docs.remove(pos);
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::document_store::is_missing_fulltext_index;
    use serde_json::json;

    #[tokio::test]
    async fn filters_orders_and_limits() {
        let store = MemoryDocumentStore::new();
        for (id, size, kind) in [("a", 30, "image"), ("b", 10, "video"), ("c", 20, "image")] {
            store
                .create_document(Collection::Files, id, json!({ "size": size, "type": kind }))
                .await
                .unwrap();
        }
        let list = store
            .list_documents(
                Collection::Files,
                &[
                    Query::equal("type", ["image"]),
                    Query::OrderAsc("size".into()),
                    Query::Limit(1),
                ],
            )
            .await
            .unwrap();
        assert_eq!(list.total, 2);
        assert_eq!(list.documents.len(), 1);
        assert_eq!(list.documents[0]["$id"], "c");
    }

    #[tokio::test]
    async fn unindexed_search_is_refused() {
        let store = MemoryDocumentStore::without_fulltext_index();
        let err = store
            .list_documents(
                Collection::Files,
                &[Query::Or(vec![
                    Query::equal("owner", ["u"]),
                    Query::search("users", "a@x.io"),
                ])],
            )
            .await
            .unwrap_err();
        assert!(is_missing_fulltext_index(&err));
    }

    #[tokio::test]
    async fn search_matches_whole_list_members_only() {
        let store = MemoryDocumentStore::new();
        let shared = [
            ("exact", r#"["a@example.com"]"#),
            ("prefixed", r#"["ba@example.com"]"#),
            ("suffixed", r#"["a@example.com.evil"]"#),
            ("quoted", r#"["\",\"a@example.com"]"#),
        ];
        for (id, users) in shared {
            store
                .create_document(Collection::Files, id, json!({ "users": users }))
                .await
                .unwrap();
        }
        store
            .create_document(Collection::Files, "array", json!({ "users": ["a@example.com"] }))
            .await
            .unwrap();

        let list = store
            .list_documents(
                Collection::Files,
                &[
                    Query::search("users", "a@example.com"),
                    Query::OrderAsc("$id".into()),
                ],
            )
            .await
            .unwrap();
        let ids: Vec<&str> = list.documents.iter().filter_map(doc_id).collect();
        assert_eq!(ids, vec!["array", "exact"]);
    }

    #[tokio::test]
    async fn update_and_delete_unknown_id_is_not_found() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update_document(Collection::Files, "nope", json!({ "name": "x" }))
            .await
            .unwrap_err();
        assert!(crate::application::ports::document_store::is_not_found(&err));
        assert!(
            store
                .delete_document(Collection::Files, "nope")
                .await
                .is_err()
        );
    }
}
