// Copyright (c) 2025 Pocketledger.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type Callback = Arc<dyn Fn(bool) + Send + Sync>;

struct Inner {
    online: AtomicBool,
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, Callback)>>,
}

/// Observes reachability transitions and notifies subscribers. The platform
/// layer pushes status changes in via `set_online`; no polling loop here.
/// Cheap to clone; clones share the subscriber list.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

/// Dropping the subscription unsubscribes.
pub struct Subscription {
    id: u64,
    inner: Arc<Inner>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Ok(mut subs) = self.inner.subscribers.lock() {
            subs.retain(|(id, _)| *id != self.id);
        }
    }
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        ConnectivityMonitor {
            inner: Arc::new(Inner {
                online: AtomicBool::new(online),
                next_id: AtomicU64::new(0),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Registers a callback and invokes it once immediately with the current
    /// status, so subscribers need no separate initial fetch.
    pub fn subscribe(&self, callback: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
        let callback: Callback = Arc::new(callback);
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut subs = self
                .inner
                .subscribers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            subs.push((id, callback.clone()));
        }
        callback(self.is_online());
        Subscription {
            id,
            inner: self.inner.clone(),
        }
    }

    /// Notifies subscribers only on an actual transition.
    pub fn set_online(&self, online: bool) {
        let previous = self.inner.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return;
        }
        // Snapshot under the lock, invoke outside it, so a callback may
        // subscribe or unsubscribe without deadlocking.
        let snapshot: Vec<Callback> = {
            let subs = self
                .inner
                .subscribers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            subs.iter().map(|(_, cb)| cb.clone()).collect()
        };
        for cb in snapshot {
            cb(online);
        }
    }
}
