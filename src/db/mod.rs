//! Store access layer.
//!
//! - Connection pool ownership and sizing
//! - Single-statement execution
//! - Transactional multi-statement execution
//! - Lexical statement splitting
//! - Row-set serialization

pub mod executor;
pub mod pool;
pub mod rows;
pub mod split;
pub mod transaction;

pub use executor::StatementExecutor;
pub use pool::{StoreKind, StorePool};
pub use rows::{RowSet, RowToJson, encode_row_set};
pub use split::split_statements;
pub use transaction::{IsolationLevel, TransactionManager};
