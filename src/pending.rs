//! Deferred dispatch correlation
//!
//! Deferred routing outcomes resolve on their own time; this table keys each
//! in-flight future by its request id so the reply lands on the right caller
//! and so unloading a session can cancel everything still pending. The entry
//! is inserted before the resolving task is spawned, and the task removes its
//! own entry before replying: a future that finds its entry already gone was
//! cancelled and stays silent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::protocol::{IpcMessage, QualifiedResponse, Response};
use crate::router::RouteFuture;

/// One in-flight dispatch. The generation distinguishes entries that reuse a
/// request id, so a superseded task can never act on its replacement's entry.
struct PendingEntry {
    generation: u64,
    token: CancellationToken,
}

/// In-flight deferred dispatches for one session
pub struct PendingDispatches {
    session_id: String,
    entries: Arc<Mutex<HashMap<String, PendingEntry>>>,
    generations: AtomicU64,
    outbound: mpsc::UnboundedSender<IpcMessage>,
}

impl PendingDispatches {
    pub fn new(session_id: String, outbound: mpsc::UnboundedSender<IpcMessage>) -> Self {
        Self {
            session_id,
            entries: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(0),
            outbound,
        }
    }

    /// Number of dispatches still in flight
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Track a deferred dispatch and spawn the task that resolves it.
    ///
    /// The reply carries `request_id` and is emitted only if the entry is
    /// still present when the future settles.
    pub fn register(&self, request_id: String, fut: RouteFuture) {
        let token = CancellationToken::new();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        if let Some(replaced) = self.entries.lock().unwrap().insert(
            request_id.clone(),
            PendingEntry {
                generation,
                token: token.clone(),
            },
        ) {
            // A reused request id orphans the earlier dispatch
            replaced.token.cancel();
        }

        let entries = self.entries.clone();
        let outbound = self.outbound.clone();
        let session_id = self.session_id.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => None,
                result = fut => Some(result),
            };
            let Some(result) = result else {
                // Whoever cancelled the token already removed or replaced
                // the entry
                debug!(request_id = %request_id, "deferred dispatch cancelled");
                return;
            };
            // The entry may belong to a newer dispatch reusing this id; only
            // the task that owns it may remove it and reply
            {
                let mut entries = entries.lock().unwrap();
                match entries.get(&request_id) {
                    Some(entry) if entry.generation == generation => {
                        entries.remove(&request_id);
                    }
                    _ => return,
                }
            }
            let response = match result {
                Ok(payload) => Response::ok(Some(request_id), payload),
                Err(err) => Response::error(Some(request_id), err.kind, err.message),
            };
            let _ = outbound.send(IpcMessage::ExtensionResponse(QualifiedResponse {
                session_id,
                response,
            }));
        });
    }

    /// Cancel every in-flight dispatch. None of them will reply.
    pub fn cancel_all(&self) {
        let drained: Vec<(String, PendingEntry)> =
            self.entries.lock().unwrap().drain().collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "cancelling pending dispatches");
        }
        for (_, entry) in drained {
            entry.token.cancel();
        }
    }
}

impl Drop for PendingDispatches {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
