//! Saved queries board: listing, filtering and the featured flag

use crate::api::{ApiClient, Origin, Query};
use crate::error::AppError;
use crate::text::{format_timestamp, truncate_chars};

const TEXT_PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryBadge {
    pub id: i64,
    pub name: String,
    pub assigned_by: Origin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRow {
    pub id: i64,
    pub uuid: String,
    pub featured: bool,
    pub text: String,
    /// Saved answer page
    pub link: String,
    pub date: String,
    pub likes: i64,
    pub categories: Vec<CategoryBadge>,
}

impl QueryRow {
    fn build(query: &Query, base_path: &str) -> Self {
        Self {
            id: query.id,
            uuid: query.uuid.to_string(),
            featured: query.featured,
            text: truncate_chars(&query.query_text, TEXT_PREVIEW_CHARS),
            link: format!("{}/savedquery/{}", base_path, query.uuid),
            date: query
                .created_at
                .as_deref()
                .and_then(format_timestamp)
                .unwrap_or_default(),
            likes: query.like_count,
            categories: query
                .categories
                .iter()
                .map(|c| CategoryBadge {
                    id: c.id,
                    name: c.name.clone(),
                    assigned_by: c.assigned_by,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct QueryBoard {
    queries: Vec<Query>,
}

impl QueryBoard {
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn replace(&mut self, queries: Vec<Query>) {
        self.queries = queries;
    }

    pub async fn load(&mut self, api: &ApiClient) -> Result<(), AppError> {
        let queries = api.admin_queries().await?;
        log::info!("Loaded {} saved queries", queries.len());
        self.queries = queries;
        Ok(())
    }

    /// Rows whose text contains `search` (case-insensitive), optionally
    /// featured only
    pub fn filter(&self, search: &str, only_featured: bool, base_path: &str) -> Vec<QueryRow> {
        let needle = search.trim().to_lowercase();
        self.queries
            .iter()
            .filter(|q| !only_featured || q.featured)
            .filter(|q| needle.is_empty() || q.query_text.to_lowercase().contains(&needle))
            .map(|q| QueryRow::build(q, base_path))
            .collect()
    }

    pub fn count_line(&self, shown: usize) -> String {
        format!("Showing {} of {} queries", shown, self.queries.len())
    }

    /// Flip the featured flag; the value returned by the backend is applied
    /// to the local copy
    pub async fn toggle_featured(&mut self, api: &ApiClient, uuid: &str) -> Result<bool, AppError> {
        let featured = api.toggle_featured(uuid).await?;
        if let Some(query) = self.queries.iter_mut().find(|q| q.uuid.to_string() == uuid) {
            query.featured = featured;
        }
        log::info!("Query {} featured: {}", uuid, featured);
        Ok(featured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn board() -> QueryBoard {
        let queries: Vec<Query> = serde_json::from_value(json!([
            {
                "id": 1,
                "uuid": "6f1c2a58-3a53-4a4f-9d6e-0d3c2f9d8a11",
                "query_text": "¿Qué es la ENTROPÍA?",
                "created_at": "2024-05-01T10:30:00",
                "likes": 3,
                "featured": true,
                "categories": [{"id": 7, "name": "Física", "assigned_by": "llm"}]
            },
            {
                "id": 2,
                "uuid": "7f1c2a58-3a53-4a4f-9d6e-0d3c2f9d8a11",
                "query_text": "a".repeat(130)
            }
        ]))
        .unwrap();
        let mut board = QueryBoard::default();
        board.replace(queries);
        board
    }

    #[test]
    fn test_filter_by_text_and_featured() {
        let board = board();
        assert_eq!(board.filter("", false, "").len(), 2);
        assert_eq!(board.filter("", true, "").len(), 1);

        let rows = board.filter("entropía", false, "/sttcast");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, "01/05/2024 10:30");
        assert_eq!(rows[0].likes, 3);
        assert_eq!(rows[0].categories[0].assigned_by, Origin::Llm);
        assert_eq!(
            rows[0].link,
            "/sttcast/savedquery/6f1c2a58-3a53-4a4f-9d6e-0d3c2f9d8a11"
        );
        assert!(board.filter("entropía", true, "").len() == 1);
        assert!(board.filter("nada", false, "").is_empty());
    }

    #[test]
    fn test_long_text_is_truncated() {
        let rows = board().filter("", false, "");
        assert_eq!(rows[1].text.chars().count(), 123);
        assert!(rows[1].text.ends_with("..."));
        assert_eq!(rows[1].date, "");
    }

    #[test]
    fn test_count_line() {
        assert_eq!(board().count_line(1), "Showing 1 of 2 queries");
    }
}
