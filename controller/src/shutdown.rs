// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! # Shutdown Coordinator
//!
//! Process-wide drain state plus an ordered list of idempotent teardown
//! actions. The flag transition is monotonic: `running -> draining`, never
//! reversed. The multiplexer reads the flag lock-free on every request, so
//! new work stops being admitted the instant the flag flips, before any of
//! the registered actions have run.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::info;

type Action = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

#[derive(Default)]
pub struct ShutdownCoordinator {
    draining: AtomicBool,
    actions: Mutex<Vec<(String, Action)>>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock-free drain check; consulted at the top of every dispatch path.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Register a teardown action. Actions run in registration order during
    /// [`begin`](Self::begin); actions registered after drain began are
    /// dropped (the sequence has already run).
    pub fn on_shutdown<F, Fut>(&self, name: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.is_draining() {
            return;
        }
        self.actions
            .lock()
            .push((name.into(), Box::new(move || Box::pin(action()))));
    }

    /// Flip to draining and run the teardown sequence. Exactly-once: a second
    /// call observes the flag already set and returns without running
    /// anything.
    pub async fn begin(&self) {
        if self.draining.swap(true, Ordering::AcqRel) {
            return;
        }
        let actions = std::mem::take(&mut *self.actions.lock());
        info!(steps = actions.len(), "draining: running shutdown sequence");
        for (name, action) in actions {
            info!(step = %name, "shutdown step");
            action().await;
        }
    }
}
