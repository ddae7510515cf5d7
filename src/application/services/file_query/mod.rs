//! Query construction for file listings and the shared-file fallback used when
//! the backend cannot run a full-text match on the `users` attribute.

use std::collections::HashMap;

use serde_json::Value;

use crate::application::ports::document_store::Query;
use crate::domain::files::file::parse_shared_with;
use crate::domain::files::file_type::FileType;
use crate::domain::users::user::UserRecord;

pub const DEFAULT_SORT: &str = "$createdAt-desc";
pub const DEFAULT_CANDIDATE_LIMIT: u32 = 1000;

/// Predicates for the files visible to `user`: owned, or shared with their email.
pub fn build_file_queries(
    user: &UserRecord,
    types: &[FileType],
    search_text: &str,
    sort: &str,
    limit: Option<u32>,
) -> Vec<Query> {
    let mut queries = vec![Query::Or(vec![
        Query::equal("owner", [user.id.as_str()]),
        Query::search("users", &user.email),
    ])];

    if !types.is_empty() {
        queries.push(Query::equal("type", types.iter().map(FileType::as_str)));
    }
    if !search_text.is_empty() {
        queries.push(Query::contains("name", search_text));
    }
    if let Some(limit) = limit.filter(|l| *l > 0) {
        queries.push(Query::Limit(limit));
    }
    if let Some(order) = sort_query(sort) {
        queries.push(order);
    }
    queries
}

/// `"field-direction"`; anything but `asc` sorts descending.
pub fn sort_query(sort: &str) -> Option<Query> {
    if sort.is_empty() {
        return None;
    }
    let mut parts = sort.split('-');
    let field = parts.next().unwrap_or_default().to_string();
    match parts.next() {
        Some("asc") => Some(Query::OrderAsc(field)),
        _ => Some(Query::OrderDesc(field)),
    }
}

pub fn owned_query(user: &UserRecord) -> Vec<Query> {
    vec![Query::equal("owner", [user.id.as_str()])]
}

pub fn candidate_query(limit: Option<u32>, default_limit: u32) -> Vec<Query> {
    let limit = limit.filter(|l| *l > 0).unwrap_or(default_limit);
    vec![Query::Limit(limit)]
}

/// Union of owned documents and candidates shared with `email`, keyed by `$id`.
/// A later document with the same id replaces the earlier one in place.
pub fn merge_shared_fallback(owned: Vec<Value>, candidates: Vec<Value>, email: &str) -> Vec<Value> {
    let shared = candidates.into_iter().filter(|doc| {
        doc.get("users")
            .map(parse_shared_with)
            .is_some_and(|users| users.iter().any(|u| u == email))
    });

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Value> = Vec::new();
    for doc in owned.into_iter().chain(shared) {
        let Some(id) = doc.get("$id").and_then(Value::as_str).map(str::to_owned) else {
            continue;
        };
        match index.get(&id) {
            Some(&pos) => merged[pos] = doc,
            None => {
                index.insert(id, merged.len());
                merged.push(doc);
            }
        }
    }
    merged
}

/// Type filter for a navigation section. `None` for an unknown section;
/// `dashboard` and an empty section mean no filter.
pub fn section_types(section: &str) -> Option<Vec<FileType>> {
    match section.trim().to_ascii_lowercase().as_str() {
        "" | "dashboard" => Some(Vec::new()),
        "documents" => Some(vec![FileType::Document]),
        "images" => Some(vec![FileType::Image]),
        "media" => Some(vec![FileType::Video, FileType::Audio]),
        "others" => Some(vec![FileType::Other]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> UserRecord {
        UserRecord {
            id: "user-a".into(),
            email: "a@example.com".into(),
            full_name: "A".into(),
            avatar: String::new(),
            account_id: Some("acc-a".into()),
        }
    }

    #[test]
    fn always_scopes_to_owner_or_shared() {
        let q = build_file_queries(&user(), &[], "", "", None);
        assert_eq!(
            q,
            vec![Query::Or(vec![
                Query::equal("owner", ["user-a"]),
                Query::search("users", "a@example.com"),
            ])]
        );
    }

    #[test]
    fn empty_types_adds_no_type_predicate() {
        let q = build_file_queries(&user(), &[], "", DEFAULT_SORT, None);
        assert!(
            !q.iter()
                .any(|p| matches!(p, Query::Equal { attribute, .. } if attribute == "type"))
        );
    }

    #[test]
    fn type_search_limit_and_sort_in_order() {
        let q = build_file_queries(
            &user(),
            &[FileType::Video, FileType::Audio],
            "holiday",
            "size-asc",
            Some(10),
        );
        assert_eq!(q.len(), 5);
        assert_eq!(q[1], Query::equal("type", ["video", "audio"]));
        assert_eq!(q[2], Query::contains("name", "holiday"));
        assert_eq!(q[3], Query::Limit(10));
        assert_eq!(q[4], Query::OrderAsc("size".into()));
    }

    #[test]
    fn sort_direction_defaults_to_descending() {
        assert_eq!(
            sort_query("$createdAt-desc"),
            Some(Query::OrderDesc("$createdAt".into()))
        );
        assert_eq!(sort_query("name"), Some(Query::OrderDesc("name".into())));
        assert_eq!(sort_query("name-up"), Some(Query::OrderDesc("name".into())));
        assert_eq!(sort_query(""), None);
    }

    #[test]
    fn candidate_pool_uses_default_cap() {
        assert_eq!(candidate_query(None, 1000), vec![Query::Limit(1000)]);
        assert_eq!(candidate_query(Some(25), 1000), vec![Query::Limit(25)]);
    }

    #[test]
    fn fallback_keeps_owned_and_shared_only() {
        let owned = vec![json!({ "$id": "1", "users": "[]" })];
        let candidates = vec![
            json!({ "$id": "1", "users": "[]" }),
            json!({ "$id": "2", "users": "[\"a@example.com\"]" }),
            json!({ "$id": "3", "users": "[\"b@example.com\"]" }),
            json!({ "$id": "4", "users": ["a@example.com"] }),
            json!({ "$id": "5", "users": "{broken" }),
        ];
        let merged = merge_shared_fallback(owned, candidates, "a@example.com");
        let ids: Vec<&str> = merged.iter().filter_map(|d| d["$id"].as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "4"]);
    }

    #[test]
    fn fallback_last_write_wins_and_is_idempotent() {
        let owned = vec![json!({ "$id": "1", "name": "old", "users": "[\"a@example.com\"]" })];
        let candidates = vec![json!({ "$id": "1", "name": "new", "users": "[\"a@example.com\"]" })];
        let first = merge_shared_fallback(owned.clone(), candidates.clone(), "a@example.com");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0]["name"], "new");
        let second = merge_shared_fallback(owned, candidates, "a@example.com");
        assert_eq!(first, second);
    }

    #[test]
    fn maps_sections_to_types() {
        assert_eq!(
            section_types("media"),
            Some(vec![FileType::Video, FileType::Audio])
        );
        assert_eq!(section_types("Documents"), Some(vec![FileType::Document]));
        assert_eq!(section_types("dashboard"), Some(vec![]));
        assert_eq!(section_types("trash"), None);
    }
}
