use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;
use tokio::sync::Mutex;

use super::NamespaceEventSource;
use crate::controller::queue::WorkQueue;

/// Deterministic stand-in for [`LiveNamespaceEventSource`](super::LiveNamespaceEventSource)
/// that applies the identical Added/Updated enqueue logic directly, without a
/// watch stream, so tests can drive namespace events synchronously.
#[derive(Debug)]
pub struct FakeNamespaceEventSource {
    queue: Arc<WorkQueue>,
    seen: Mutex<HashMap<String, String>>,
    synced: AtomicBool,
}

impl FakeNamespaceEventSource {
    pub fn new(queue: Arc<WorkQueue>) -> Self {
        Self {
            queue,
            seen: Mutex::new(HashMap::new()),
            synced: AtomicBool::new(true),
        }
    }

    /// Simulates an Added event: always enqueues, regardless of whether the
    /// name was seen before.
    pub async fn simulate_add_namespace(&self, namespace: &Namespace) {
        let name = namespace.name_any();
        self.seen.lock().await.insert(
            name.clone(),
            namespace.resource_version().unwrap_or_default(),
        );
        self.queue.add(name).await;
    }

    /// Simulates an Updated event: enqueues only if `new`'s `resourceVersion`
    /// differs from what was last recorded for this name (falling back to
    /// `old`'s if the name hasn't been seen yet).
    pub async fn simulate_update_namespace(&self, old: &Namespace, new: &Namespace) {
        let name = new.name_any();
        let new_version = new.resource_version().unwrap_or_default();
        let mut seen = self.seen.lock().await;
        let previous = seen
            .get(&name)
            .cloned()
            .or_else(|| old.resource_version());
        if previous.as_deref() != Some(new_version.as_str()) {
            seen.insert(name.clone(), new_version);
            drop(seen);
            self.queue.add(name).await;
        }
    }

    pub fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::Relaxed);
    }
}

impl NamespaceEventSource for FakeNamespaceEventSource {
    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;

    fn namespace(name: &str, resource_version: &str) -> Namespace {
        Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                resource_version: Some(resource_version.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn add_always_enqueues() {
        let queue = Arc::new(WorkQueue::new());
        let source = FakeNamespaceEventSource::new(Arc::clone(&queue));
        source.simulate_add_namespace(&namespace("ns-a", "1")).await;
        assert_eq!(queue.get().await, Some("ns-a".to_string()));
    }

    #[tokio::test]
    async fn update_with_same_resource_version_is_not_enqueued() {
        let queue = Arc::new(WorkQueue::new());
        let source = FakeNamespaceEventSource::new(Arc::clone(&queue));
        let ns = namespace("ns-a", "1");
        source.simulate_add_namespace(&ns).await;
        queue.get().await;

        source.simulate_update_namespace(&ns, &ns).await;
        tokio::time::timeout(std::time::Duration::from_millis(50), queue.get())
            .await
            .expect_err("resync with unchanged resourceVersion must not enqueue");
    }

    #[tokio::test]
    async fn update_with_new_resource_version_is_enqueued() {
        let queue = Arc::new(WorkQueue::new());
        let source = FakeNamespaceEventSource::new(Arc::clone(&queue));
        let old = namespace("ns-a", "1");
        let new = namespace("ns-a", "2");
        source.simulate_add_namespace(&old).await;
        queue.get().await;

        source.simulate_update_namespace(&old, &new).await;
        assert_eq!(queue.get().await, Some("ns-a".to_string()));
    }
}
