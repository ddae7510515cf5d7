use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};

use crate::application::ports::document_store::{
    BackendError, Collection, DocumentList, DocumentStore, Query,
};
use crate::infrastructure::db::PgPool;

/// Document collections stored as JSONB rows in a single `documents` table.
pub struct SqlxDocumentStore {
    pub pool: PgPool,
}

impl SqlxDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, data, created_at, updated_at FROM documents";

fn row_to_document(row: &PgRow) -> Value {
    let id: String = row.get("id");
    let data: Value = row.get("data");
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    let mut doc = match data {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    doc.insert("$id".into(), Value::String(id));
    doc.insert(
        "$createdAt".into(),
        Value::String(created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    doc.insert(
        "$updatedAt".into(),
        Value::String(updated_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    Value::Object(doc)
}

// System attributes live in columns; everything else is user data.
fn strip_system_keys(data: Value) -> Value {
    match data {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| !k.starts_with('$'))
                .collect(),
        ),
        other => other,
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn push_text_attribute(qb: &mut QueryBuilder<'_, Postgres>, attribute: &str) {
    match attribute {
        "$id" => {
            qb.push("id");
        }
        "$createdAt" => {
            qb.push("created_at::text");
        }
        "$updatedAt" => {
            qb.push("updated_at::text");
        }
        other => {
            qb.push("data->>");
            qb.push_bind(other.to_string());
        }
    }
}

fn push_sort_attribute(qb: &mut QueryBuilder<'_, Postgres>, attribute: &str) {
    match attribute {
        "$id" => {
            qb.push("id");
        }
        "$createdAt" => {
            qb.push("created_at");
        }
        "$updatedAt" => {
            qb.push("updated_at");
        }
        other => {
            // jsonb ordering keeps numbers numeric
            qb.push("data->");
            qb.push_bind(other.to_string());
        }
    }
}

fn push_json_path(qb: &mut QueryBuilder<'_, Postgres>, op: &str, attribute: &str) {
    qb.push("data");
    qb.push(op);
    qb.push_bind(attribute.to_string());
}

// Whole-token match: membership in a list stored as a JSON array or as
// serialized JSON text, otherwise equality with the entire value.
fn push_search(qb: &mut QueryBuilder<'_, Postgres>, attribute: &str, term: &str) {
    if attribute.starts_with('$') {
        push_text_attribute(qb, attribute);
        qb.push(" = ");
        qb.push_bind(term.to_string());
        return;
    }
    qb.push("CASE jsonb_typeof(");
    push_json_path(qb, "->", attribute);
    qb.push(") WHEN 'array' THEN (");
    push_json_path(qb, "->", attribute);
    qb.push(") ? ");
    qb.push_bind(term.to_string());
    qb.push(" WHEN 'string' THEN CASE WHEN ");
    push_json_path(qb, "->>", attribute);
    qb.push(" LIKE '[%' THEN (");
    push_json_path(qb, "->>", attribute);
    qb.push(")::jsonb ? ");
    qb.push_bind(term.to_string());
    qb.push(" ELSE ");
    push_json_path(qb, "->>", attribute);
    qb.push(" = ");
    qb.push_bind(term.to_string());
    qb.push(" END ELSE FALSE END");
}

fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, query: &Query) {
    match query {
        Query::Equal { attribute, values } => {
            push_text_attribute(qb, attribute);
            qb.push(" = ANY(");
            qb.push_bind(values.clone());
            qb.push(")");
        }
        Query::Search { attribute, term } => push_search(qb, attribute, term),
        Query::Contains { attribute, value } => {
            push_text_attribute(qb, attribute);
            qb.push(" LIKE ");
            qb.push_bind(escape_like(value));
        }
        Query::Or(inner) => {
            let predicates: Vec<&Query> = inner.iter().filter(|q| is_predicate(q)).collect();
            if predicates.is_empty() {
                qb.push("FALSE");
                return;
            }
            qb.push("(");
            for (i, q) in predicates.into_iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_predicate(qb, q);
            }
            qb.push(")");
        }
        Query::Limit(_) | Query::OrderAsc(_) | Query::OrderDesc(_) => {}
    }
}

fn is_predicate(query: &Query) -> bool {
    !matches!(
        query,
        Query::Limit(_) | Query::OrderAsc(_) | Query::OrderDesc(_)
    )
}

fn push_where<'a>(qb: &mut QueryBuilder<'a, Postgres>, collection: Collection, queries: &[Query]) {
    qb.push(" WHERE collection = ");
    qb.push_bind(collection.as_str());
    for q in queries.iter().filter(|q| is_predicate(q)) {
        qb.push(" AND ");
        push_predicate(qb, q);
    }
}

pub(crate) fn build_select(collection: Collection, queries: &[Query]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(SELECT_COLUMNS);
    push_where(&mut qb, collection, queries);

    let mut first = true;
    for q in queries {
        let (attribute, dir) = match q {
            Query::OrderAsc(a) => (a, "ASC"),
            Query::OrderDesc(a) => (a, "DESC"),
            _ => continue,
        };
        qb.push(if first { " ORDER BY " } else { ", " });
        push_sort_attribute(&mut qb, attribute);
        qb.push(" ");
        qb.push(dir);
        first = false;
    }
    if first {
        qb.push(" ORDER BY created_at DESC");
    }

    // Last limit wins
    if let Some(limit) = queries.iter().rev().find_map(|q| match q {
        Query::Limit(n) => Some(*n),
        _ => None,
    }) {
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(limit));
    }
    qb
}

pub(crate) fn build_count(collection: Collection, queries: &[Query]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(1) FROM documents");
    push_where(&mut qb, collection, queries);
    qb
}

#[async_trait]
impl DocumentStore for SqlxDocumentStore {
    async fn create_document(
        &self,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> anyhow::Result<Value> {
        let row = sqlx::query(
            r#"INSERT INTO documents (collection, id, data)
               VALUES ($1, $2, $3)
               ON CONFLICT (collection, id) DO NOTHING
               RETURNING id, data, created_at, updated_at"#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(strip_system_keys(data))
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(row_to_document(&row)),
            None => Err(BackendError {
                code: 409,
                kind: "document_already_exists".into(),
                message: format!("Document with the requested ID '{id}' already exists."),
            }
            .into()),
        }
    }

    async fn list_documents(
        &self,
        collection: Collection,
        queries: &[Query],
    ) -> anyhow::Result<DocumentList> {
        let rows = build_select(collection, queries)
            .build()
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = build_count(collection, queries)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(DocumentList {
            total: total.max(0) as u64,
            documents: rows.iter().map(row_to_document).collect(),
        })
    }

    async fn update_document(
        &self,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> anyhow::Result<Value> {
        let row = sqlx::query(
            r#"UPDATE documents SET data = data || $3, updated_at = now()
               WHERE collection = $1 AND id = $2
               RETURNING id, data, created_at, updated_at"#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(strip_system_keys(data))
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_document(&r)).ok_or_else(|| {
            BackendError::not_found(format!(
                "Document with the requested ID '{id}' could not be found."
            ))
            .into()
        })
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> anyhow::Result<()> {
        let res = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(BackendError::not_found(format!(
                "Document with the requested ID '{id}' could not be found."
            ))
            .into());
        }
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_owned_or_shared_listing() {
        let queries = vec![
            Query::Or(vec![
                Query::equal("owner", ["user-a"]),
                Query::search("users", "a@example.com"),
            ]),
            Query::equal("type", ["image", "video"]),
            Query::contains("name", "report"),
            Query::Limit(10),
            Query::OrderDesc("$createdAt".into()),
        ];
        let qb = build_select(Collection::Files, &queries);
        assert_eq!(
            qb.sql(),
            "SELECT id, data, created_at, updated_at FROM documents \
             WHERE collection = $1 \
             AND (data->>$2 = ANY($3) OR CASE jsonb_typeof(data->$4) \
             WHEN 'array' THEN (data->$5) ? $6 \
             WHEN 'string' THEN CASE WHEN data->>$7 LIKE '[%' THEN (data->>$8)::jsonb ? $9 \
             ELSE data->>$10 = $11 END ELSE FALSE END) \
             AND data->>$12 = ANY($13) \
             AND data->>$14 LIKE $15 \
             ORDER BY created_at DESC LIMIT $16"
        );
    }

    #[test]
    fn search_compiles_to_membership_not_substring() {
        let qb = build_select(
            Collection::Files,
            &[Query::search("users", "a@example.com")],
        );
        let sql = qb.sql();
        assert!(!sql.contains("ILIKE"));
        assert!(sql.contains("(data->>$6)::jsonb ? $7"));

        let qb = build_count(Collection::Users, &[Query::search("$id", "user-a")]);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(1) FROM documents WHERE collection = $1 AND id = $2"
        );
    }

    #[test]
    fn count_ignores_order_and_limit() {
        let queries = vec![
            Query::equal("$id", ["a", "b"]),
            Query::Limit(1),
            Query::OrderAsc("size".into()),
        ];
        let qb = build_count(Collection::Users, &queries);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(1) FROM documents WHERE collection = $1 AND id = ANY($2)"
        );
    }

    #[test]
    fn orders_by_json_attribute_with_default() {
        let qb = build_select(Collection::Files, &[Query::OrderAsc("size".into())]);
        assert!(qb.sql().ends_with("ORDER BY data->$2 ASC"));

        let qb = build_select(Collection::Files, &[]);
        assert!(qb.sql().ends_with("WHERE collection = $1 ORDER BY created_at DESC"));
    }

    #[test]
    fn empty_or_matches_nothing() {
        let qb = build_select(Collection::Files, &[Query::Or(vec![])]);
        assert!(qb.sql().contains("AND FALSE"));
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off"), "%50\\%\\_off%");
        assert_eq!(escape_like("a@x.io"), "%a@x.io%");
    }

    #[test]
    fn strips_system_attributes_before_writing() {
        let data = serde_json::json!({ "$id": "x", "$createdAt": "t", "name": "a.txt" });
        assert_eq!(
            strip_system_keys(data),
            serde_json::json!({ "name": "a.txt" })
        );
    }
}
