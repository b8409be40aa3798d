use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// Cooperative cancellation flag, cloned into whoever needs to check it.
// Workers look at it between items, never in the middle of one.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
