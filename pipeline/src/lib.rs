//! Parallel transaction validation.
//!
//! A pool of worker threads validates transactions concurrently. Routing
//! is by asset lineage: every transaction of one asset goes to the same
//! worker, so in-block double spends and dependencies within an asset are
//! seen by exactly one worker, in block order. Workers remember what they
//! accepted since the last reset, and a shared results channel feeds an
//! order-restoring buffer.

pub mod pool;

pub use pool::{ParallelValidator, WorkerMessage};
