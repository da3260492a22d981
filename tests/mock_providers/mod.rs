//! Mock infrastructure for live session integration tests.
//!
//! Provides a scripted WebSocket stand-in for the Gemini Live service plus
//! small callback recorders shared across test binaries.

// Allow dead code in test infrastructure - not every test binary uses every helper
#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

pub mod live_mock;

/// Poll a condition every 10ms until it holds or the timeout elapses.
///
/// Returns whether the condition became true.
pub async fn wait_for(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Callback recorder for `String` payload callbacks.
///
/// `callback()` yields an `Arc` closure suitable for `on_message` and
/// friends; everything the callback observes lands in `values()`.
#[derive(Clone, Default)]
pub struct StringRecorder {
    values: Arc<Mutex<Vec<String>>>,
}

impl StringRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(
        &self,
    ) -> Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync> {
        let values = self.values.clone();
        Arc::new(move |value| {
            let values = values.clone();
            Box::pin(async move {
                values.lock().push(value);
            })
        })
    }

    pub fn values(&self) -> Vec<String> {
        self.values.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }
}
