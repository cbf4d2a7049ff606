use minijinja::{context, Environment};

use crate::llm::LlmError;
use crate::sql::policy::FORBIDDEN_KEYWORDS;

/// DDL of the externally owned table the model writes queries against.
pub const TABLE_SCHEMA: &str = include_str!("../../templates/employees.sql");

const SYSTEM_PROMPT_TEMPLATE: &str = include_str!("../../templates/system_prompt.j2");

/// Renders the fixed system instruction: schema plus generation rules.
///
/// Done once at startup; the result is shared by every request.
pub fn render_system_prompt() -> Result<String, LlmError> {
    let mut env = Environment::new();
    env.add_template("system_prompt", SYSTEM_PROMPT_TEMPLATE)
        .map_err(|e| LlmError::ConfigError(format!("invalid prompt template: {}", e)))?;

    let template = env
        .get_template("system_prompt")
        .map_err(|e| LlmError::ConfigError(format!("prompt template missing: {}", e)))?;

    template
        .render(context! {
            dialect => "PostgreSQL",
            schema => TABLE_SCHEMA.trim(),
            forbidden => FORBIDDEN_KEYWORDS,
        })
        .map_err(|e| LlmError::ConfigError(format!("failed to render prompt: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_schema_and_rules() {
        let prompt = render_system_prompt().unwrap();

        assert!(prompt.starts_with("You are a SQL expert."));
        assert!(prompt.contains("PostgreSQL table schema"));
        assert!(prompt.contains("CREATE TABLE employees ("));
        assert!(prompt.contains("'Active', 'Terminated', 'On Leave'"));
        assert!(prompt.contains("salary_usd"));
        assert!(prompt.contains("Use ILIKE"));
        assert!(prompt.contains("Never generate INSERT, UPDATE, DELETE, DROP"));
    }

    #[test]
    fn schema_lists_every_employee_column() {
        for column in [
            "employee_id",
            "first_name",
            "last_name",
            "department",
            "role",
            "employment_status",
            "hire_date",
            "leave_type",
            "salary_local",
            "salary_usd",
            "manager_name",
        ] {
            assert!(TABLE_SCHEMA.contains(column), "missing {column}");
        }
    }
}
