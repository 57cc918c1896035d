//! Postgres access for the benefits table.

use crate::config::DatabaseConfig;
use crate::models::{Benefit, BenefitFilter};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde_json::Value;
use service_core::error::AppError;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// The database side of the catalog. Kept behind a trait so the listing
/// logic can run against a substitute in tests.
#[async_trait]
pub trait BenefitStore: Send + Sync {
    /// Acquire and release one connection. Never errors; unreachable is
    /// reported as `false`.
    async fn check_connection(&self) -> bool;

    /// `SELECT * FROM benefits` with the filter applied in SQL.
    async fn fetch_benefits(&self, filter: &BenefitFilter) -> Result<Vec<Benefit>, AppError>;
}

/// Positional statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    Text(String),
    Int(i64),
}

/// Builds the listing statement. Filter values are always bound, never
/// spliced into the SQL text.
pub fn benefits_query(filter: &BenefitFilter) -> (String, Vec<QueryParam>) {
    let mut sql = String::from("SELECT * FROM benefits");
    let mut params = Vec::new();
    let mut conditions = Vec::new();

    if let Some(category) = &filter.category {
        params.push(QueryParam::Text(category.clone()));
        conditions.push(format!("category = ${}", params.len()));
    }
    if let Some(bank) = &filter.bank {
        params.push(QueryParam::Text(bank.clone()));
        conditions.push(format!("bank = ${}", params.len()));
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    sql.push_str(" ORDER BY id");

    if let Some(limit) = filter.limit {
        params.push(QueryParam::Int(i64::from(limit)));
        sql.push_str(&format!(" LIMIT ${}", params.len()));
    }

    (sql, params)
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Build the pool without connecting. The first connection is opened
    /// by the first query or probe.
    pub fn new(config: &DatabaseConfig) -> Result<Self, AppError> {
        let ssl_mode: PgSslMode = config.ssl_mode.parse().map_err(|e| {
            AppError::ConfigurationError(anyhow::anyhow!(
                "Invalid DB_SSL_MODE '{}': {}",
                config.ssl_mode,
                e
            ))
        })?;

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .password(config.password.expose_secret())
            .ssl_mode(ssl_mode);

        info!(
            host = %config.host,
            database = %config.name,
            max_connections = config.max_connections,
            "Configuring PostgreSQL pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .idle_timeout(Duration::from_millis(config.idle_timeout_ms))
            .acquire_timeout(Duration::from_millis(config.connection_timeout_ms))
            .connect_lazy_with(options);

        Ok(Self { pool })
    }

    /// Execute a parameterized statement and decode every row.
    #[instrument(skip(self, params), fields(param_count = params.len()))]
    pub async fn run_query(
        &self,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<Vec<Benefit>, AppError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                QueryParam::Text(value) => query.bind(value.as_str()),
                QueryParam::Int(value) => query.bind(*value),
            };
        }

        let rows = query.fetch_all(&self.pool).await.map_err(|e| {
            error!(error = %e, "Database query error");
            AppError::SourceUnavailable(anyhow::anyhow!("Database query failed: {}", e))
        })?;

        Ok(rows.iter().map(row_to_benefit).collect())
    }
}

#[async_trait]
impl BenefitStore for Database {
    async fn check_connection(&self) -> bool {
        match self.pool.acquire().await {
            Ok(conn) => {
                drop(conn);
                true
            }
            Err(e) => {
                error!(error = %e, "Database connection error");
                false
            }
        }
    }

    async fn fetch_benefits(&self, filter: &BenefitFilter) -> Result<Vec<Benefit>, AppError> {
        let (sql, params) = benefits_query(filter);
        self.run_query(&sql, &params).await
    }
}

fn row_to_benefit(row: &PgRow) -> Benefit {
    row.columns()
        .iter()
        .map(|column| {
            let value = column_value(row, column.ordinal(), column.type_info().name())
                .unwrap_or_else(|e| {
                    warn!(column = column.name(), error = %e, "Undecodable column, returning null");
                    Value::Null
                });
            (column.name().to_string(), value)
        })
        .collect()
}

/// How a Postgres column is rendered into the JSON record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    /// Exact decimals are sent as strings so no precision is lost.
    Numeric,
    Json,
    Uuid,
    TimestampTz,
    Timestamp,
    Date,
    TextArray,
    Text,
}

impl ColumnKind {
    fn from_type_name(name: &str) -> Self {
        match name {
            "BOOL" => Self::Bool,
            "INT2" => Self::Int2,
            "INT4" => Self::Int4,
            "INT8" => Self::Int8,
            "FLOAT4" => Self::Float4,
            "FLOAT8" => Self::Float8,
            "NUMERIC" => Self::Numeric,
            "JSON" | "JSONB" => Self::Json,
            "UUID" => Self::Uuid,
            "TIMESTAMPTZ" => Self::TimestampTz,
            "TIMESTAMP" => Self::Timestamp,
            "DATE" => Self::Date,
            "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => Self::TextArray,
            _ => Self::Text,
        }
    }
}

fn numeric_value(value: Decimal) -> Value {
    Value::String(value.to_string())
}

fn column_value(row: &PgRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match ColumnKind::from_type_name(type_name) {
        ColumnKind::Bool => Value::from(row.try_get::<bool, _>(index)?),
        ColumnKind::Int2 => Value::from(row.try_get::<i16, _>(index)?),
        ColumnKind::Int4 => Value::from(row.try_get::<i32, _>(index)?),
        ColumnKind::Int8 => Value::from(row.try_get::<i64, _>(index)?),
        ColumnKind::Float4 => Value::from(row.try_get::<f32, _>(index)?),
        ColumnKind::Float8 => Value::from(row.try_get::<f64, _>(index)?),
        ColumnKind::Numeric => numeric_value(row.try_get::<Decimal, _>(index)?),
        ColumnKind::Json => row.try_get::<Value, _>(index)?,
        ColumnKind::Uuid => Value::from(row.try_get::<Uuid, _>(index)?.to_string()),
        ColumnKind::TimestampTz => {
            Value::from(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339())
        }
        ColumnKind::Timestamp => Value::from(
            row.try_get::<NaiveDateTime, _>(index)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        ColumnKind::Date => Value::from(row.try_get::<NaiveDate, _>(index)?.to_string()),
        ColumnKind::TextArray => Value::from(row.try_get::<Vec<String>, _>(index)?),
        ColumnKind::Text => Value::from(row.try_get::<String, _>(index)?),
    };

    Ok(value)
}
