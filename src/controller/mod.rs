//! # Controller
//!
//! The reconciliation loop: a namespace event source feeding a work queue
//! drained by a single reconciler worker.

pub mod events;
pub mod queue;
pub mod reconciler;

pub use events::NamespaceEventSource;
pub use queue::WorkQueue;
pub use reconciler::{Reconciler, ReconcileError, ReconcilerConfig};
