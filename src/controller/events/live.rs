use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{pin_mut, StreamExt};
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, ResourceExt};
use kube_runtime::watcher;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::NamespaceEventSource;
use crate::controller::queue::WorkQueue;

/// Live [`NamespaceEventSource`] backed by a raw `kube_runtime::watcher`
/// stream, rather than the higher-level `Controller` abstraction, so Added
/// and Updated can be told apart from `resourceVersion` directly.
#[derive(Debug)]
pub struct LiveNamespaceEventSource {
    synced: Arc<AtomicBool>,
}

impl LiveNamespaceEventSource {
    /// Spawns the watch task and returns immediately; `has_synced` flips once
    /// the watcher's initial list replay completes.
    ///
    /// `resync_interval` mirrors client-go's `SharedInformer` periodic
    /// resync: every tick, every namespace name currently known to this
    /// event source is re-enqueued, independent of whether its
    /// `resourceVersion` changed. This is what redrives reconciliation for
    /// namespaces the watch stream never told us changed (a missed event, a
    /// restarted watch that resumed from a bookmark, etc.), distinct from the
    /// reconciler's own `auth-token-renewal-interval` sentinel sweep.
    pub fn spawn(
        client: kube::Client,
        queue: Arc<WorkQueue>,
        resync_interval: Duration,
        stop: CancellationToken,
    ) -> Self {
        let synced = Arc::new(AtomicBool::new(false));
        let task_synced = Arc::clone(&synced);

        tokio::spawn(async move {
            let namespaces: Api<Namespace> = Api::all(client);
            let seen: Mutex<HashMap<String, String>> = Mutex::new(HashMap::new());
            let stream = watcher(namespaces, watcher::Config::default().any_semantic());
            pin_mut!(stream);

            let mut resync = tokio::time::interval(resync_interval);
            resync.tick().await; // first tick fires immediately; the initial list replay covers it

            loop {
                tokio::select! {
                    _ = stop.cancelled() => {
                        debug!("namespace watch stopping");
                        return;
                    }
                    _ = resync.tick() => {
                        resync_known_namespaces(&seen, &queue).await;
                    }
                    event = stream.next() => {
                        let Some(event) = event else {
                            warn!("namespace watch stream ended");
                            return;
                        };
                        match event {
                            Ok(watcher::Event::InitApply(ns)) => {
                                remember_and_enqueue_added(&seen, &queue, &ns).await;
                            }
                            Ok(watcher::Event::Apply(ns)) => {
                                handle_apply(&seen, &queue, &ns).await;
                            }
                            Ok(watcher::Event::Delete(ns)) => {
                                seen.lock().await.remove(&ns.name_any());
                            }
                            Ok(watcher::Event::Init) => {}
                            Ok(watcher::Event::InitDone) => {
                                task_synced.store(true, Ordering::Relaxed);
                            }
                            Err(err) => {
                                warn!(error = %err, "namespace watch error, continuing");
                            }
                        }
                    }
                }
            }
        });

        Self { synced }
    }
}

async fn resync_known_namespaces(seen: &Mutex<HashMap<String, String>>, queue: &WorkQueue) {
    let names: Vec<String> = seen.lock().await.keys().cloned().collect();
    debug!(count = names.len(), "informer resync, re-enqueuing known namespaces");
    for name in names {
        queue.add(name).await;
    }
}

async fn remember_and_enqueue_added(
    seen: &Mutex<HashMap<String, String>>,
    queue: &WorkQueue,
    ns: &Namespace,
) {
    let name = ns.name_any();
    seen.lock()
        .await
        .insert(name.clone(), ns.resource_version().unwrap_or_default());
    queue.add(name).await;
}

async fn handle_apply(seen: &Mutex<HashMap<String, String>>, queue: &WorkQueue, ns: &Namespace) {
    let name = ns.name_any();
    let resource_version = ns.resource_version().unwrap_or_default();
    let mut seen = seen.lock().await;
    match seen.get(&name) {
        None => {
            seen.insert(name.clone(), resource_version);
            drop(seen);
            queue.add(name).await;
        }
        Some(previous) if previous != &resource_version => {
            seen.insert(name.clone(), resource_version);
            drop(seen);
            queue.add(name).await;
        }
        Some(_) => {}
    }
}

impl NamespaceEventSource for LiveNamespaceEventSource {
    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Relaxed)
    }
}
