//! Origin-keyed concurrency guards.

use parking_lot::Mutex;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

/// Tracks origins with an in-flight `eth_requestAccounts`.
///
/// Acquisition never blocks: a second request for a held origin fails
/// immediately instead of queueing, so a dapp cannot stack duplicate
/// permission prompts. The guard releases the origin on drop, which covers
/// early returns and error paths.
#[derive(Clone, Debug, Default)]
pub struct OriginLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

impl OriginLocks {
    /// Marks `origin` as having an in-flight request, or returns `None` if
    /// one is already pending.
    pub fn try_acquire(&self, origin: &str) -> Option<OriginGuard> {
        let mut held = self.held.lock();
        held.insert(origin.to_string())
            .then(|| OriginGuard { origin: origin.to_string(), held: Arc::clone(&self.held) })
    }
}

/// Releases the held origin when dropped.
#[derive(Debug)]
pub struct OriginGuard {
    origin: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl Drop for OriginGuard {
    fn drop(&mut self) {
        self.held.lock().remove(&self.origin);
    }
}

/// Per-origin async mutexes.
///
/// Caveat updates are read-modify-write against the host's permission store,
/// so all grant and update sequences for one origin take this mutex to keep
/// concurrent requests from interleaving between the read and the write.
#[derive(Clone, Debug, Default)]
pub struct OriginMutexes {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl OriginMutexes {
    /// Returns the mutex for `origin`, creating it on first use.
    pub fn for_origin(&self, origin: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock();
        Arc::clone(map.entry(origin.to_string()).or_default())
    }
}
