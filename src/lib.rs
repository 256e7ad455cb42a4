//! SQL Bridge Library
//!
//! A message-driven execution engine over a pooled relational store
//! (SQLite, PostgreSQL, MySQL). Requests carry a method selector and a
//! raw SQL payload; responses carry JSON-serialized row sets or a typed
//! failure.

pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod transport;
pub mod types;

pub use config::{Config, StoreConfig};
pub use dispatch::RequestDispatcher;
pub use error::{EngineError, EngineResult};
pub use types::{Request, Response};
