//! Transactional multi-statement execution.
//!
//! One or more statements run under a single store transaction at a
//! caller-chosen isolation level, all-or-nothing: the first failing
//! statement rolls everything back, and a failed commit is reported the
//! same way. A transaction never outlives the call that started it.
//!
//! Isolation is resolved before any statement executes. PostgreSQL takes
//! `SET TRANSACTION ISOLATION LEVEL` as the first statement inside the
//! transaction; MySQL requires it on the connection before `BEGIN` (it
//! scopes to the next transaction); SQLite has no server-side isolation
//! selection, so an explicit level there is a configuration error rather
//! than a silently ignored request.

use crate::db::executor::require_sql;
use crate::db::pool::{StoreKind, StorePool};
use crate::db::rows::{RowSet, rows_to_row_set};
use crate::db::split::split_statements;
use crate::error::{EngineError, EngineResult};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Transaction isolation level, matched case-insensitively against the
/// closed enumeration. An unrecognized value is a configuration error,
/// never silently defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// Parse a metadata value. Unrecognized input fails before any
    /// statement executes.
    pub fn parse(value: &str) -> EngineResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "read_uncommitted" => Ok(Self::ReadUncommitted),
            "read_committed" => Ok(Self::ReadCommitted),
            "repeatable_read" => Ok(Self::RepeatableRead),
            "serializable" => Ok(Self::Serializable),
            other => Err(EngineError::configuration(format!(
                "unrecognized isolation level '{other}' (expected read_uncommitted, \
                 read_committed, repeatable_read, or serializable)"
            ))),
        }
    }

    /// The store-native level name.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

/// Runs semicolon-delimited statements atomically at a caller-chosen
/// isolation level.
pub struct TransactionManager {
    pool: StorePool,
}

impl TransactionManager {
    pub fn new(pool: StorePool) -> Self {
        Self { pool }
    }

    /// Execute the payload's statements in order inside one transaction.
    ///
    /// Returns the final statement's rows when it produced any
    /// (transaction-as-query); a pure side-effect transaction returns
    /// `None`. Every blocking store call is bounded by `deadline`; on
    /// expiry the transaction is rolled back rather than left pending.
    pub async fn run(
        &self,
        sql: &str,
        isolation: Option<IsolationLevel>,
        deadline: Duration,
    ) -> EngineResult<Option<RowSet>> {
        let sql = require_sql(sql)?;

        if self.pool.kind() == StoreKind::Sqlite
            && let Some(level) = isolation
        {
            return Err(EngineError::configuration(format!(
                "isolation level {} is not selectable on sqlite",
                level.as_sql()
            )));
        }

        // Backslash string escapes are a MySQL dialect feature; postgres
        // (standard_conforming_strings) and sqlite treat `\` literally.
        let statements = split_statements(sql, self.pool.kind() == StoreKind::MySql);
        if statements.is_empty() {
            return Err(EngineError::validation(
                "payload contains no executable statements",
            ));
        }

        debug!(
            store = %self.pool.kind(),
            statements = statements.len(),
            isolation = ?isolation,
            "Running transaction"
        );

        match &self.pool {
            StorePool::Postgres(pool) => pg::run(pool, &statements, isolation, deadline).await,
            StorePool::MySql(pool) => mysql::run(pool, &statements, isolation, deadline).await,
            StorePool::Sqlite(pool) => sqlite::run(pool, &statements, deadline).await,
        }
    }
}

/// Collapse a fetch result into the optional row-set carried forward for
/// the final statement.
fn statement_rows<R: crate::db::rows::RowToJson>(rows: Vec<R>) -> Option<RowSet> {
    if rows.is_empty() {
        None
    } else {
        Some(rows_to_row_set(&rows))
    }
}

mod pg {
    use super::*;
    use sqlx::{Executor, PgPool};

    pub async fn run(
        pool: &PgPool,
        statements: &[String],
        isolation: Option<IsolationLevel>,
        deadline: Duration,
    ) -> EngineResult<Option<RowSet>> {
        let mut tx = match timeout(deadline, pool.begin()).await {
            Ok(Ok(tx)) => tx,
            Ok(Err(e)) => return Err(EngineError::from(e)),
            Err(_) => return Err(EngineError::deadline("transaction begin")),
        };

        if let Some(level) = isolation {
            let set = format!("SET TRANSACTION ISOLATION LEVEL {}", level.as_sql());
            match timeout(deadline, (&mut *tx).execute(set.as_str())).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    rollback(tx, deadline).await;
                    return Err(EngineError::from(e));
                }
                Err(_) => {
                    rollback(tx, deadline).await;
                    return Err(EngineError::deadline("isolation level selection"));
                }
            }
        }

        let mut last_rows = None;
        for stmt in statements {
            match timeout(deadline, (&mut *tx).fetch_all(stmt.as_str())).await {
                Ok(Ok(rows)) => last_rows = statement_rows(rows),
                Ok(Err(e)) => {
                    rollback(tx, deadline).await;
                    return Err(EngineError::from(e));
                }
                Err(_) => {
                    rollback(tx, deadline).await;
                    return Err(EngineError::deadline("statement execution"));
                }
            }
        }

        match timeout(deadline, tx.commit()).await {
            Ok(Ok(())) => Ok(last_rows),
            Ok(Err(e)) => Err(EngineError::from(e)),
            Err(_) => Err(EngineError::deadline("transaction commit")),
        }
    }

    async fn rollback(tx: sqlx::Transaction<'_, sqlx::Postgres>, deadline: Duration) {
        match timeout(deadline, tx.rollback()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Rollback failed"),
            Err(_) => warn!("Rollback timed out"),
        }
    }
}

mod mysql {
    use super::*;
    use sqlx::{Connection, Executor, MySqlPool};

    pub async fn run(
        pool: &MySqlPool,
        statements: &[String],
        isolation: Option<IsolationLevel>,
        deadline: Duration,
    ) -> EngineResult<Option<RowSet>> {
        let mut conn = match timeout(deadline, pool.acquire()).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(EngineError::from(e)),
            Err(_) => return Err(EngineError::deadline("connection acquisition")),
        };

        // Scopes to the next transaction only, so it precedes BEGIN. Once
        // the SET may have reached the server, the connection must not go
        // back to the pool unless BEGIN consumes the level - a pooled
        // connection carrying a pending one-shot level would apply it to
        // an unrelated request's next transaction.
        if let Some(level) = isolation {
            let set = format!("SET TRANSACTION ISOLATION LEVEL {}", level.as_sql());
            match timeout(deadline, (&mut *conn).execute(set.as_str())).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(EngineError::from(e)),
                Err(_) => {
                    drop(conn.detach());
                    return Err(EngineError::deadline("isolation level selection"));
                }
            }
        }

        // The begin result borrows `conn`, so `conn.detach()` can only
        // happen once that value is fully dead; the success path must
        // therefore run to completion inside the match arm.
        let begin_err = match timeout(deadline, conn.begin()).await {
            Ok(Ok(mut tx)) => {
                let mut last_rows = None;
                for stmt in statements {
                    match timeout(deadline, (&mut *tx).fetch_all(stmt.as_str())).await {
                        Ok(Ok(rows)) => last_rows = statement_rows(rows),
                        Ok(Err(e)) => {
                            rollback(tx, deadline).await;
                            return Err(EngineError::from(e));
                        }
                        Err(_) => {
                            rollback(tx, deadline).await;
                            return Err(EngineError::deadline("statement execution"));
                        }
                    }
                }

                return match timeout(deadline, tx.commit()).await {
                    Ok(Ok(())) => Ok(last_rows),
                    Ok(Err(e)) => Err(EngineError::from(e)),
                    Err(_) => Err(EngineError::deadline("transaction commit")),
                };
            }
            Ok(Err(e)) => EngineError::from(e),
            Err(_) => EngineError::deadline("transaction begin"),
        };

        if isolation.is_some() {
            drop(conn.detach());
        }
        Err(begin_err)
    }

    async fn rollback(tx: sqlx::Transaction<'_, sqlx::MySql>, deadline: Duration) {
        match timeout(deadline, tx.rollback()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Rollback failed"),
            Err(_) => warn!("Rollback timed out"),
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Executor, SqlitePool};

    pub async fn run(
        pool: &SqlitePool,
        statements: &[String],
        deadline: Duration,
    ) -> EngineResult<Option<RowSet>> {
        let mut tx = match timeout(deadline, pool.begin()).await {
            Ok(Ok(tx)) => tx,
            Ok(Err(e)) => return Err(EngineError::from(e)),
            Err(_) => return Err(EngineError::deadline("transaction begin")),
        };

        let mut last_rows = None;
        for stmt in statements {
            match timeout(deadline, (&mut *tx).fetch_all(stmt.as_str())).await {
                Ok(Ok(rows)) => last_rows = statement_rows(rows),
                Ok(Err(e)) => {
                    rollback(tx, deadline).await;
                    return Err(EngineError::from(e));
                }
                Err(_) => {
                    rollback(tx, deadline).await;
                    return Err(EngineError::deadline("statement execution"));
                }
            }
        }

        match timeout(deadline, tx.commit()).await {
            Ok(Ok(())) => Ok(last_rows),
            Ok(Err(e)) => Err(EngineError::from(e)),
            Err(_) => Err(EngineError::deadline("transaction commit")),
        }
    }

    async fn rollback(tx: sqlx::Transaction<'_, sqlx::Sqlite>, deadline: Duration) {
        match timeout(deadline, tx.rollback()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Rollback failed"),
            Err(_) => warn!("Rollback timed out"),
        }
    }
}
