//! Read-only gate for generated SQL.
//!
//! This is a keyword blacklist, not a parser. A statement passes when, after
//! trimming and uppercasing, it starts with `SELECT` and none of its maximal
//! runs of letters (Unicode-aware) is a data- or schema-modifying keyword.
//!
//! Known gaps: comment tricks or keyword splitting can slip past the scan, and
//! a string literal holding a forbidden word as a standalone token is rejected.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Keywords whose presence as a standalone token rejects a query.
pub const FORBIDDEN_KEYWORDS: [&str; 9] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE", "CREATE", "GRANT", "REVOKE",
];

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{L}+").unwrap());

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqlPolicyError {
    #[error("Only SELECT queries are allowed.")]
    NotAQuery,
    #[error("Query contains forbidden SQL keywords.")]
    ForbiddenKeyword(String),
}

/// Checks that `sql` looks like a read-only SELECT.
///
/// The caller keeps executing the original string; normalization only feeds the check.
pub fn validate_sql(sql: &str) -> Result<(), SqlPolicyError> {
    let normalized = sql.trim().to_uppercase();

    if !normalized.starts_with("SELECT") {
        return Err(SqlPolicyError::NotAQuery);
    }

    if let Some(keyword) = WORD
        .find_iter(&normalized)
        .map(|m| m.as_str())
        .find(|token| FORBIDDEN_KEYWORDS.contains(token))
    {
        return Err(SqlPolicyError::ForbiddenKeyword(keyword.to_string()));
    }

    Ok(())
}
