use serde_json::{Value, json};

use crate::application::ports::document_store::Query;

/// JSON form understood by Appwrite 1.5+ `queries[]` parameters.
pub fn query_json(query: &Query) -> Value {
    match query {
        Query::Equal { attribute, values } => json!({
            "method": "equal",
            "attribute": attribute,
            "values": values,
        }),
        Query::Search { attribute, term } => json!({
            "method": "search",
            "attribute": attribute,
            "values": [term],
        }),
        Query::Contains { attribute, value } => json!({
            "method": "contains",
            "attribute": attribute,
            "values": [value],
        }),
        Query::Or(inner) => json!({
            "method": "or",
            "values": inner.iter().map(query_json).collect::<Vec<_>>(),
        }),
        Query::Limit(n) => json!({ "method": "limit", "values": [n] }),
        Query::OrderAsc(attribute) => json!({ "method": "orderAsc", "attribute": attribute }),
        Query::OrderDesc(attribute) => json!({ "method": "orderDesc", "attribute": attribute }),
    }
}

pub fn encode_queries(queries: &[Query]) -> Vec<(&'static str, String)> {
    queries
        .iter()
        .map(|q| ("queries[]", query_json(q).to_string()))
        .collect()
}

/// Page size used when a listing carries no explicit limit.
pub const PAGE_SIZE: u32 = 100;

pub fn has_limit(queries: &[Query]) -> bool {
    queries.iter().any(|q| matches!(q, Query::Limit(_)))
}

/// Queries for one page of an uncapped listing, resuming after `cursor`.
pub fn page_queries(queries: &[Query], cursor: Option<&str>) -> Vec<(&'static str, String)> {
    let mut params = encode_queries(queries);
    params.push(("queries[]", query_json(&Query::Limit(PAGE_SIZE)).to_string()));
    if let Some(id) = cursor {
        params.push((
            "queries[]",
            json!({ "method": "cursorAfter", "values": [id] }).to_string(),
        ));
    }
    params
}

/// Cursor for the next page, or `None` once the listing is exhausted.
pub fn next_cursor(page: &[Value], fetched: u64, total: u64) -> Option<String> {
    if page.len() < PAGE_SIZE as usize || fetched >= total {
        return None;
    }
    page.last()
        .and_then(|doc| doc.get("$id"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(params: &[(&str, String)]) -> Vec<Value> {
        params
            .iter()
            .map(|(_, v)| serde_json::from_str(v).unwrap())
            .collect()
    }

    #[test]
    fn uncapped_listing_pages_with_limit_and_cursor() {
        let owned = [Query::equal("owner", ["u"])];
        assert!(!has_limit(&owned));

        let first = decoded(&page_queries(&owned, None));
        assert_eq!(
            first,
            vec![
                json!({ "method": "equal", "attribute": "owner", "values": ["u"] }),
                json!({ "method": "limit", "values": [PAGE_SIZE] }),
            ]
        );

        let second = decoded(&page_queries(&owned, Some("doc-100")));
        assert_eq!(
            second[2],
            json!({ "method": "cursorAfter", "values": ["doc-100"] })
        );
    }

    #[test]
    fn stops_paging_on_short_page_or_total() {
        let full: Vec<Value> = (0..PAGE_SIZE)
            .map(|i| json!({ "$id": format!("d{i}") }))
            .collect();
        assert_eq!(next_cursor(&full, 100, 250), Some("d99".to_string()));
        assert_eq!(next_cursor(&full, 200, 200), None);
        assert_eq!(next_cursor(&full[..40], 140, 250), None);
        assert!(has_limit(&[Query::Limit(5)]));
    }

    #[test]
    fn nests_or_queries_as_objects() {
        let q = Query::Or(vec![
            Query::equal("owner", ["u1"]),
            Query::search("users", "a@x.io"),
        ]);
        assert_eq!(
            query_json(&q),
            json!({
                "method": "or",
                "values": [
                    { "method": "equal", "attribute": "owner", "values": ["u1"] },
                    { "method": "search", "attribute": "users", "values": ["a@x.io"] },
                ]
            })
        );
    }

    #[test]
    fn encodes_limit_and_order() {
        let params = encode_queries(&[Query::Limit(5), Query::OrderDesc("$createdAt".into())]);
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].0, "queries[]");
        let limit: Value = serde_json::from_str(&params[0].1).unwrap();
        assert_eq!(limit, json!({ "method": "limit", "values": [5] }));
        let order: Value = serde_json::from_str(&params[1].1).unwrap();
        assert_eq!(
            order,
            json!({ "method": "orderDesc", "attribute": "$createdAt" })
        );
    }
}
