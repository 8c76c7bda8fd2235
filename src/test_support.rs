//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::action::{Dispatch, Dispatcher};
use crate::core::content::{Content, Node};
use crate::core::navigation::{Presentation, Renderer};
use crate::core::screen::{Lifecycle, ScreenIds, ScreenKind, ScreenView};
use crate::core::token::ActivationToken;
use crate::screens::ScreenContext;
use crate::store::JsonStore;

/// Minimal screen whose view is a counter. Counts its activations.
pub struct CountingScreen {
    lifecycle: Lifecycle<u64>,
    activations: AtomicUsize,
}

impl CountingScreen {
    /// A screen with an allocator of its own. Use `with_ids` when a test
    /// compares ids.
    pub fn new(name: &str) -> Self {
        Self::with_ids(&ScreenIds::default(), name)
    }

    pub fn with_ids(ids: &ScreenIds, name: &str) -> Self {
        Self {
            lifecycle: Lifecycle::new(ids, name, ScreenKind::Custom, 0),
            activations: AtomicUsize::new(0),
        }
    }

    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }
}

impl ScreenView for CountingScreen {
    type View = u64;

    fn lifecycle(&self) -> &Lifecycle<u64> {
        &self.lifecycle
    }

    fn compose(&self, view: &u64) -> Content {
        Content::new(self.lifecycle.name()).with(Node::text(format!("count: {view}")))
    }

    fn activated(&self, _token: &ActivationToken) {
        self.activations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Renderer that keeps every presentation it receives.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    presented: Arc<Mutex<Vec<Presentation>>>,
}

impl RecordingRenderer {
    pub fn presentations(&self) -> Vec<Presentation> {
        self.presented.lock().unwrap().clone()
    }

    pub fn screens(&self) -> Vec<String> {
        self.presentations().into_iter().map(|p| p.screen).collect()
    }

    pub fn last(&self) -> Option<Presentation> {
        self.presented.lock().unwrap().last().cloned()
    }
}

impl Renderer for RecordingRenderer {
    fn present(&mut self, presentation: Presentation) {
        self.presented.lock().unwrap().push(presentation);
    }
}

/// In-memory store plus a dispatcher whose receiver the test keeps.
pub fn test_context() -> (ScreenContext, Receiver<Dispatch>) {
    let (dispatcher, rx) = Dispatcher::channel();
    (ScreenContext::new(Arc::new(JsonStore::in_memory()), dispatcher), rx)
}

/// Waits (up to a second) for the next dispatch from a background task.
pub async fn next_dispatch(rx: &Receiver<Dispatch>) -> Dispatch {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if let Ok(dispatch) = rx.try_recv() {
                return dispatch;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("no dispatch within a second")
}
