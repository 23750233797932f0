//! gridrun - partitioned distributed execution coordinator
//!
//! Splits a unit of work into independent partitions, dispatches each
//! partition to a remote worker over HTTP with a single fire-and-forget
//! start request, and discovers completion by polling a shared execution
//! store until every partition is terminal or a deadline elapses. The
//! store is the only channel of cross-process signaling; no response
//! carries final status and no cancellation is ever sent to workers.

pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod partition;
pub mod poller;
pub mod store;
pub mod units;
pub mod worker;

pub use error::{Error, Result};
