//! # taxsync-engine
//!
//! Hash-gated taxonomy synchronization engine.
//!
//! Construct a [`SyncSession`] for a connection, then drive either
//! [`SyncSession::export`] (push the local tree to the remote scheme) or
//! [`SyncSession::update`] (reconcile the remote hierarchy into the local
//! store). Both return batched iterators yielding one [`BatchProgress`]
//! per processed batch; stop iterating to cancel between batches.

pub mod error;
pub mod export;
pub mod flatten;
pub mod hash;
pub mod import;
pub mod scheduler;
pub mod session;
pub mod state;

pub use error::SyncError;
pub use export::ExportRun;
pub use import::UpdateRun;
pub use scheduler::{BatchProgress, BatchSize, Phase, RunSummary};
pub use session::SyncSession;
