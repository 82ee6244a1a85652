//! In-memory rendezvous structures for the Opalgen generation engine.
//!
//! This crate provides:
//! - [`TokenPool`]: the mailbox connecting the token harvester to the
//!   generation workers, with FIFO entries and FIFO blocked waiters
//! - [`JobQueue`]: an ordered job list with front-of-queue retry insertion
//! - [`CheckpointStore`]: persistence for the harvester's rotation index

pub mod checkpoint;
pub mod error;
pub mod pool;
pub mod queue;

pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use error::{PoolError, PoolResult};
pub use pool::TokenPool;
pub use queue::JobQueue;
