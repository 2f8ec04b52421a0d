//! Shared abort tokens.
//!
//! A strategy hands clones of one token to every pump and transfer it starts.
//! Setting it tells each of them to stop pulling data and release what it holds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Error-free, cloneable abort flag.
#[derive(Debug, Clone, Default)]
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

/// Cancels every token in the group when dropped, so early returns still release work.
#[derive(Debug, Default)]
pub struct CancelGuard {
    tokens: Vec<CancelToken>,
}

impl CancelGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(&mut self, token: CancelToken) {
        self.tokens.push(token);
    }

    pub fn cancel_all(&self) {
        for t in &self.tokens {
            t.cancel();
        }
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
