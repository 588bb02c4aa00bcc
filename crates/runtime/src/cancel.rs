//! Cooperative cancellation.
//!
//! A plain `Arc<AtomicBool>` rather than a `tokio-util::CancellationToken` —
//! no example in the corpus actually depends on `tokio-util`, and the loop
//! only ever needs a flag it can poll between steps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
