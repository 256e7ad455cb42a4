//! Single-statement execution outside a transaction.
//!
//! `query` fetches rows, `exec` runs a statement for its side effects.
//! Both send the SQL text unprepared (simple query protocol), so an `exec`
//! payload may itself contain several statements - the store executes them
//! as one batch with no atomicity guarantee; callers who need atomicity use
//! the transaction path.
//!
//! The backend submodules are intentionally parallel; every blocking store
//! call is bounded by the caller's deadline.

use crate::db::pool::StorePool;
use crate::db::rows::{RowSet, rows_to_row_set};
use crate::error::{EngineError, EngineResult};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Executes a single non-transactional statement against the pool.
pub struct StatementExecutor {
    pool: StorePool,
}

impl StatementExecutor {
    pub fn new(pool: StorePool) -> Self {
        Self { pool }
    }

    /// Run a row-returning statement. Zero rows is a success outcome: the
    /// result is an empty row-set, not an error.
    pub async fn query(&self, sql: &str, deadline: Duration) -> EngineResult<RowSet> {
        let sql = require_sql(sql)?;
        debug!(store = %self.pool.kind(), "Executing query");

        match &self.pool {
            StorePool::Postgres(pool) => pg::fetch_rows(pool, sql, deadline).await,
            StorePool::MySql(pool) => mysql::fetch_rows(pool, sql, deadline).await,
            StorePool::Sqlite(pool) => sqlite::fetch_rows(pool, sql, deadline).await,
        }
    }

    /// Run a statement for its side effects. Returns the affected row count
    /// reported by the store.
    pub async fn exec(&self, sql: &str, deadline: Duration) -> EngineResult<u64> {
        let sql = require_sql(sql)?;
        debug!(store = %self.pool.kind(), "Executing exec statement");

        match &self.pool {
            StorePool::Postgres(pool) => pg::execute(pool, sql, deadline).await,
            StorePool::MySql(pool) => mysql::execute(pool, sql, deadline).await,
            StorePool::Sqlite(pool) => sqlite::execute(pool, sql, deadline).await,
        }
    }
}

/// Reject empty SQL before any store round-trip.
pub(crate) fn require_sql(sql: &str) -> EngineResult<&str> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(EngineError::validation("empty SQL payload"));
    }
    Ok(trimmed)
}

mod pg {
    use super::*;
    use sqlx::{Executor, PgPool};

    pub async fn fetch_rows(pool: &PgPool, sql: &str, deadline: Duration) -> EngineResult<RowSet> {
        match timeout(deadline, pool.fetch_all(sql)).await {
            Ok(Ok(rows)) => Ok(rows_to_row_set(&rows)),
            Ok(Err(e)) => Err(EngineError::from(e)),
            Err(_) => Err(EngineError::deadline("query execution")),
        }
    }

    pub async fn execute(pool: &PgPool, sql: &str, deadline: Duration) -> EngineResult<u64> {
        match timeout(deadline, pool.execute(sql)).await {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(EngineError::from(e)),
            Err(_) => Err(EngineError::deadline("statement execution")),
        }
    }
}

mod mysql {
    use super::*;
    use sqlx::{Executor, MySqlPool};

    pub async fn fetch_rows(
        pool: &MySqlPool,
        sql: &str,
        deadline: Duration,
    ) -> EngineResult<RowSet> {
        match timeout(deadline, pool.fetch_all(sql)).await {
            Ok(Ok(rows)) => Ok(rows_to_row_set(&rows)),
            Ok(Err(e)) => Err(EngineError::from(e)),
            Err(_) => Err(EngineError::deadline("query execution")),
        }
    }

    pub async fn execute(pool: &MySqlPool, sql: &str, deadline: Duration) -> EngineResult<u64> {
        match timeout(deadline, pool.execute(sql)).await {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(EngineError::from(e)),
            Err(_) => Err(EngineError::deadline("statement execution")),
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Executor, SqlitePool};

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        deadline: Duration,
    ) -> EngineResult<RowSet> {
        match timeout(deadline, pool.fetch_all(sql)).await {
            Ok(Ok(rows)) => Ok(rows_to_row_set(&rows)),
            Ok(Err(e)) => Err(EngineError::from(e)),
            Err(_) => Err(EngineError::deadline("query execution")),
        }
    }

    pub async fn execute(pool: &SqlitePool, sql: &str, deadline: Duration) -> EngineResult<u64> {
        match timeout(deadline, pool.execute(sql)).await {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(EngineError::from(e)),
            Err(_) => Err(EngineError::deadline("statement execution")),
        }
    }
}
