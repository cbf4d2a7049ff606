use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::QueryResult;

#[derive(Debug, Deserialize, Clone)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub question: String,
    pub generated_sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
}

impl QueryResponse {
    /// Assembles the response; `row_count` is always derived from `rows`.
    pub fn new(question: String, generated_sql: String, result: QueryResult) -> Self {
        Self {
            question,
            generated_sql,
            row_count: result.rows.len(),
            columns: result.columns,
            rows: result.rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_count_follows_rows() {
        let mut row = Map::new();
        row.insert("department".to_string(), json!("Sales"));

        let response = QueryResponse::new(
            "who is in sales?".to_string(),
            "SELECT department FROM employees".to_string(),
            QueryResult {
                columns: vec!["department".to_string()],
                rows: vec![row.clone(), row],
            },
        );

        assert_eq!(response.row_count, 2);
        assert_eq!(response.row_count, response.rows.len());
    }

    #[test]
    fn serializes_with_the_public_field_names() {
        let response = QueryResponse::new(
            "q".to_string(),
            "SELECT 1".to_string(),
            QueryResult::default(),
        );

        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(
            body,
            json!({
                "question": "q",
                "generated_sql": "SELECT 1",
                "columns": [],
                "rows": [],
                "row_count": 0
            })
        );
    }
}
