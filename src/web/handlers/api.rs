use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::sql::validate_sql;
use crate::web::error::QueryError;
use crate::web::models::{QueryRequest, QueryResponse};
use crate::web::state::AppState;

// Natural language query: translate, validate, execute
pub async fn query_employees(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, QueryError> {
    answer_question(&state, payload.question).await.map(Json)
}

/// Runs one question through the pipeline. Each stage either hands its output to
/// the next or ends the request with a categorized [`QueryError`].
pub async fn answer_question(state: &AppState, question: String) -> Result<QueryResponse, QueryError> {
    if question.trim().is_empty() {
        return Err(QueryError::EmptyQuestion);
    }

    let start_time = Instant::now();
    info!("NL query: {}", question);

    let sql = state.llm_manager.translate(&question).await?;

    validate_sql(&sql)?;
    debug!("Validated SQL: {}", sql);

    let result = state.executor.execute(&sql).await?;

    info!(
        "Answered with {} rows in {}ms",
        result.rows.len(),
        start_time.elapsed().as_millis()
    );

    Ok(QueryResponse::new(question, sql, result))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
