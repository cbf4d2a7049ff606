//! Pipeline failures and their HTTP mapping.
//!
//! Every stage reports through [`QueryError`]; the category alone decides the
//! status code and the message becomes the `detail` field of the JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::db::GatewayError;
use crate::llm::LlmError;
use crate::sql::SqlPolicyError;

#[derive(Debug, Error)]
pub enum QueryError {
    /// Blank question; raised before any external call.
    #[error("Question cannot be empty.")]
    EmptyQuestion,

    /// The language model could not produce a reply.
    #[error("LLM error: {0}")]
    Translation(#[from] LlmError),

    /// The generated SQL failed the read-only gate.
    #[error("{0}")]
    Rejected(#[from] SqlPolicyError),

    /// The database refused or failed to run the SQL.
    #[error("SQL execution error: {0}")]
    Execution(#[from] GatewayError),
}

impl QueryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            QueryError::Translation(_) => StatusCode::BAD_GATEWAY,
            QueryError::EmptyQuestion | QueryError::Rejected(_) | QueryError::Execution(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        match &self {
            QueryError::Rejected(SqlPolicyError::ForbiddenKeyword(keyword)) => {
                warn!(status = status.as_u16(), keyword = %keyword, "{}", detail)
            }
            _ if status.is_server_error() => error!(status = status.as_u16(), "{}", detail),
            _ => warn!(status = status.as_u16(), "{}", detail),
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_status_codes() {
        assert_eq!(QueryError::EmptyQuestion.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            QueryError::Translation(LlmError::ConnectionError("down".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            QueryError::Rejected(SqlPolicyError::NotAQuery).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            QueryError::Execution(GatewayError::ConnectTimeout(10)).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn detail_messages_carry_upstream_text() {
        assert_eq!(
            QueryError::Translation(LlmError::ResponseError("rate limited".into())).to_string(),
            "LLM error: response error: rate limited"
        );
        assert_eq!(
            QueryError::Execution(GatewayError::ConnectTimeout(10)).to_string(),
            "SQL execution error: timed out after 10s connecting to database"
        );
        assert_eq!(
            QueryError::Rejected(SqlPolicyError::ForbiddenKeyword("DROP".into())).to_string(),
            "Query contains forbidden SQL keywords."
        );
    }
}
