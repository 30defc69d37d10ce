//! # Namespace Event Source
//!
//! Wraps a raw `kube_runtime::watcher` stream over `Namespace`, translated
//! into Added/Updated pushes onto the shared [`WorkQueue`], plus a
//! `has_synced` predicate flipped once the watcher's initial list replay
//! completes.

pub mod fakes;
mod live;

pub use fakes::FakeNamespaceEventSource;
pub use live::LiveNamespaceEventSource;

/// Capability that watches namespaces and feeds the work queue. The trait
/// itself only exposes the synced predicate; the live and fake
/// implementations each own how keys reach the queue (a spawned watch task
/// for the former, direct calls for the latter).
pub trait NamespaceEventSource: Send + Sync {
    fn has_synced(&self) -> bool;
}
