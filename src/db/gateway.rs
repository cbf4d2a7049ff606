use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Column, ConnectOptions, Connection, Executor, Statement};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::values::row_to_json;
use super::{GatewayError, QueryExecutor, QueryResult};
use crate::config::DatabaseConfig;

/// PostgreSQL gateway opening one connection per call.
///
/// Every call acquires a fresh session and closes it before returning,
/// whether the query succeeded or not. No pooling, no retries.
pub struct PgGateway {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgGateway {
    pub fn new(config: &DatabaseConfig) -> Self {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .application_name(env!("CARGO_PKG_NAME"));

        if !config.password.is_empty() {
            options = options.password(&config.password);
        }

        Self {
            options,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }

    async fn connect(&self) -> Result<PgConnection, GatewayError> {
        match tokio::time::timeout(self.connect_timeout, self.options.connect()).await {
            Ok(result) => result.map_err(GatewayError::Connect),
            Err(_) => Err(GatewayError::ConnectTimeout(self.connect_timeout.as_secs())),
        }
    }

    async fn release(conn: PgConnection) {
        if let Err(e) = conn.close().await {
            warn!("Failed to close database connection cleanly: {}", e);
        }
    }
}

async fn run_query(conn: &mut PgConnection, sql: &str) -> Result<QueryResult, GatewayError> {
    // Preparing first yields the column names even when no row comes back.
    let statement = (&mut *conn).prepare(sql).await.map_err(GatewayError::Query)?;
    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();

    let pg_rows = statement
        .query()
        .fetch_all(&mut *conn)
        .await
        .map_err(GatewayError::Query)?;

    let rows = pg_rows
        .iter()
        .map(row_to_json)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(QueryResult { columns, rows })
}

#[async_trait]
impl QueryExecutor for PgGateway {
    async fn execute(&self, sql: &str) -> Result<QueryResult, GatewayError> {
        let start_time = Instant::now();
        let mut conn = self.connect().await?;

        let result = run_query(&mut conn, sql).await;
        Self::release(conn).await;

        if let Ok(query_result) = &result {
            info!(
                "Query returned {} rows in {}ms",
                query_result.rows.len(),
                start_time.elapsed().as_millis()
            );
        }
        result
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        let mut conn = self.connect().await?;
        let result = conn.ping().await.map_err(GatewayError::Query);
        Self::release(conn).await;
        debug!("Database ping completed");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config() -> DatabaseConfig {
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.into());
        DatabaseConfig {
            host: var("DB_HOST", "localhost"),
            port: var("DB_PORT", "5432").parse().unwrap(),
            name: var("DB_NAME", "postgres"),
            user: var("DB_USER", "postgres"),
            password: var("DB_PASSWORD", ""),
            connect_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn unreachable_database_is_a_connect_error() {
        let gateway = PgGateway::new(&DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            name: "postgres".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            connect_timeout_secs: 2,
        });

        let err = gateway.execute("SELECT 1").await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Connect(_) | GatewayError::ConnectTimeout(_)
        ));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL (DB_HOST/DB_PORT/DB_NAME/DB_USER/DB_PASSWORD)"]
    async fn live_query_returns_columns_and_rows_in_order() {
        let gateway = PgGateway::new(&test_config());
        gateway.ping().await.unwrap();

        let result = gateway
            .execute(
                "SELECT * FROM (VALUES \
                   (1, 'Ada', 'Engineering', 'Active', DATE '2020-01-15', NULL::varchar, 125000.50::numeric(15,2)), \
                   (2, 'Bob', 'Sales', 'On Leave', DATE '2019-06-01', 'Parental', 90000.00::numeric(15,2)) \
                 ) AS e(employee_id, first_name, department, employment_status, hire_date, leave_type, salary_usd) \
                 ORDER BY employee_id",
            )
            .await
            .unwrap();

        assert_eq!(
            result.columns,
            vec![
                "employee_id",
                "first_name",
                "department",
                "employment_status",
                "hire_date",
                "leave_type",
                "salary_usd"
            ]
        );
        assert_eq!(result.rows.len(), 2);

        let first = &result.rows[0];
        assert_eq!(first["employee_id"], json!(1));
        assert_eq!(first["department"], json!("Engineering"));
        assert_eq!(first["hire_date"], json!("2020-01-15"));
        assert_eq!(first["leave_type"], json!(null));
        assert_eq!(first["salary_usd"], json!(125000.5));
        assert_eq!(
            first.keys().cloned().collect::<Vec<_>>(),
            result.columns
        );
        assert_eq!(result.rows[1]["leave_type"], json!("Parental"));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL (DB_HOST/DB_PORT/DB_NAME/DB_USER/DB_PASSWORD)"]
    async fn live_empty_result_still_reports_columns() {
        let gateway = PgGateway::new(&test_config());

        let result = gateway
            .execute("SELECT 1 AS employee_id, 'x' AS department WHERE false")
            .await
            .unwrap();

        assert_eq!(result.columns, vec!["employee_id", "department"]);
        assert!(result.rows.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL (DB_HOST/DB_PORT/DB_NAME/DB_USER/DB_PASSWORD)"]
    async fn live_bad_sql_is_a_query_error() {
        let gateway = PgGateway::new(&test_config());

        let err = gateway
            .execute("SELECT * FROM no_such_table_here")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Query(_)));
        assert!(err.to_string().contains("no_such_table_here"));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL (DB_HOST/DB_PORT/DB_NAME/DB_USER/DB_PASSWORD)"]
    async fn live_arrays_and_intervals_are_rendered() {
        let gateway = PgGateway::new(&test_config());

        let result = gateway
            .execute(
                "SELECT array_agg(first_name ORDER BY employee_id) AS names, \
                        array_agg(employee_id ORDER BY employee_id) AS ids, \
                        array_agg(salary_usd ORDER BY employee_id) AS salaries, \
                        AGE(DATE '2021-03-18', DATE '2020-01-15') AS tenure, \
                        INTERVAL '90 minutes' AS shift \
                 FROM (VALUES (1, 'Ada'::varchar, 125000.50::numeric(15,2)), (2, 'Bob', NULL)) \
                   AS e(employee_id, first_name, salary_usd)",
            )
            .await
            .unwrap();

        let row = &result.rows[0];
        assert_eq!(row["names"], json!(["Ada", "Bob"]));
        assert_eq!(row["ids"], json!([1, 2]));
        assert_eq!(row["salaries"], json!([125000.5, null]));
        assert_eq!(row["tenure"], json!("P1Y2M3D"));
        assert_eq!(row["shift"], json!("PT1H30M"));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL (DB_HOST/DB_PORT/DB_NAME/DB_USER/DB_PASSWORD)"]
    async fn live_unsupported_type_is_a_decode_error() {
        let gateway = PgGateway::new(&test_config());

        let err = gateway
            .execute("SELECT 1 AS employee_id, '\\xdeadbeef'::bytea AS badge")
            .await
            .unwrap_err();

        match err {
            GatewayError::Decode { column, .. } => assert_eq!(column, "badge"),
            other => panic!("expected a decode error, got {other:?}"),
        }
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL (DB_HOST/DB_PORT/DB_NAME/DB_USER/DB_PASSWORD)"]
    async fn live_multiple_statements_are_a_query_error() {
        let gateway = PgGateway::new(&test_config());

        // prepared statements accept exactly one command
        let err = gateway.execute("SELECT 1; SELECT 2").await.unwrap_err();

        assert!(matches!(err, GatewayError::Query(_)));
    }
}
