//! Transport harness.
//!
//! Delivery of requests is an external concern; the engine only needs a
//! thin harness that feeds `Request` values in and writes `Response`
//! values out. The stdio transport is that harness for the binary.

pub mod stdio;

pub use stdio::StdioTransport;
