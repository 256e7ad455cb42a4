//! Request dispatch.
//!
//! The single entry point into the engine: reads the request's method
//! selector and routes it to the statement executor or the transaction
//! manager. The dispatcher is stateless per call - the only thing it
//! holds across calls is the shared connection pool established at
//! initialization.

use crate::config::StoreConfig;
use crate::db::{
    IsolationLevel, StatementExecutor, StorePool, TransactionManager, encode_row_set,
};
use crate::error::{EngineError, EngineResult};
use crate::types::{METADATA_ISOLATION_LEVEL, Request, Response};
use std::time::Duration;
use tracing::{debug, warn};

/// The recognized method selectors, in routing order.
pub const METHODS: &[&str] = &["query", "exec", "transaction"];

/// Routes requests to the executor or the transaction manager over one
/// shared connection pool.
pub struct RequestDispatcher {
    pool: StorePool,
    executor: StatementExecutor,
    transactions: TransactionManager,
    request_timeout: Duration,
}

impl RequestDispatcher {
    /// Connect the pool and build the dispatcher. No request is accepted
    /// before this completes - a failed initialization never yields a
    /// dispatcher.
    pub async fn connect(
        config: &StoreConfig,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> EngineResult<Self> {
        let pool = StorePool::connect(config, connect_timeout).await?;
        Ok(Self::new(pool, request_timeout))
    }

    /// Build a dispatcher over an already-connected pool.
    pub fn new(pool: StorePool, request_timeout: Duration) -> Self {
        Self {
            executor: StatementExecutor::new(pool.clone()),
            transactions: TransactionManager::new(pool.clone()),
            pool,
            request_timeout,
        }
    }

    /// Dispatch a request, returning the typed error on failure.
    pub async fn dispatch(&self, request: &Request) -> EngineResult<Response> {
        let method = request
            .method()
            .ok_or_else(|| EngineError::validation("missing 'method' metadata key"))?;

        debug!(method, "Dispatching request");

        match method {
            "query" => {
                let rows = self
                    .executor
                    .query(&request.sql_text(), self.request_timeout)
                    .await?;
                Ok(Response::ok().with_data(encode_row_set(&rows)))
            }
            "exec" => {
                self.executor
                    .exec(&request.sql_text(), self.request_timeout)
                    .await?;
                Ok(Response::ok())
            }
            "transaction" => {
                // Resolved before any statement executes; unrecognized
                // values fail here, absent means store default.
                let isolation = match request.metadata(METADATA_ISOLATION_LEVEL) {
                    Some(value) => Some(IsolationLevel::parse(value)?),
                    None => None,
                };
                let rows = self
                    .transactions
                    .run(&request.sql_text(), isolation, self.request_timeout)
                    .await?;
                Ok(match rows {
                    Some(rows) => Response::ok().with_data(encode_row_set(&rows)),
                    None => Response::ok(),
                })
            }
            other => Err(EngineError::validation(format!(
                "unsupported method '{other}' (expected one of {METHODS:?})"
            ))),
        }
    }

    /// Dispatch a request, folding errors into a failure response for
    /// transports: `result` carries the error description, `data` is
    /// absent.
    pub async fn handle(&self, request: &Request) -> Response {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "Request failed");
                Response::from_error(&err)
            }
        }
    }

    /// Release the shared pool. The dispatcher is unusable afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_table_contents() {
        assert_eq!(METHODS, &["query", "exec", "transaction"]);
    }
}
