use regex::Regex;
use std::sync::LazyLock;

// Opening fence with an optional SQL language tag. Only known tags are
// stripped so a fence followed directly by `select` keeps the keyword.
static LEADING_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^```(?:(?i:sql|postgresql|postgres|psql|pgsql)\b)?\s*").unwrap()
});

static TRAILING_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*```$").unwrap());

/// Removes markdown code-fence markers from the start and end of a model reply.
///
/// Only the outer markers and the whitespace around them go; interior text is
/// kept verbatim. Clean input comes back trimmed and otherwise unchanged.
pub fn strip_code_fences(reply: &str) -> String {
    let trimmed = reply.trim();
    let without_leading = LEADING_FENCE.replace(trimmed, "");
    let without_trailing = TRAILING_FENCE.replace(&without_leading, "");
    without_trailing.trim().to_string()
}
