//! Postgres-backed store.
//!
//! ## Atomicity
//!
//! | Operation | Mechanism |
//! |-----------|-----------|
//! | reserve / release / add | single conditional `UPDATE ... WHERE <guard> RETURNING` |
//! | set_counts | single `UPDATE ... RETURNING` |
//! | initialize | `INSERT ... ON CONFLICT DO NOTHING RETURNING` |
//! | schedule / complete / cancel | transaction with `SELECT ... FOR UPDATE` |
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError |
//! |-----------------------|------------|
//! | `23505` (unique violation) | mapped per call site (e.g. duplicate email) |
//! | `23503` (foreign key violation) | `Domain(NotFound)` |
//! | `23514` (check constraint violation) | `Domain(Validation)` |
//! | other | `Database` |

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;

use bloodbank_core::DomainError;

use super::{StoreError, StoreResult};
use crate::config::DatabaseConfig;

mod directory;
mod donations;
mod inventory;
mod schema;


#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Open a connection pool sized from configuration.
    #[instrument(skip(config), fields(max_connections = config.max_connections), err)]
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(config.url.expose_secret())
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes that do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn apply_schema(&self) -> StoreResult<()> {
        for statement in schema::STATEMENTS {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("apply_schema", e))?;
        }
        tracing::info!(statements = schema::STATEMENTS.len(), "database schema applied");
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    let code = match &err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    };
    match code.as_deref() {
        Some(FOREIGN_KEY_VIOLATION) => {
            DomainError::not_found(format!("{operation}: referenced record does not exist")).into()
        }
        Some(CHECK_VIOLATION) => DomainError::validation(format!("{operation}: {err}")).into(),
        _ => {
            tracing::error!(operation, error = %err, "database error");
            StoreError::Database(err)
        }
    }
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

fn has_sqlstate(err: &sqlx::Error, code: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(actual) = db_err.code() {
            return actual.as_ref() == code;
        }
    }
    false
}

/// Parse a text column into a domain enum.
fn parse_column<T>(value: &str, column: &str) -> StoreResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse::<T>()
        .map_err(|e| StoreError::Corrupt(format!("{column} = '{value}': {e}")))
}

fn units_from_db(value: i32, column: &str) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} is negative: {value}")))
}

fn units_to_db(units: u32) -> StoreResult<i32> {
    i32::try_from(units).map_err(|_| DomainError::validation(format!("{units} units exceeds the storable range")).into())
}
