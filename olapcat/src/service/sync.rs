use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Per-name write locks spread over a fixed set of mutexes. Writes to the same
/// name always land on the same stripe.
#[derive(Debug)]
pub(crate) struct StripedLock {
    stripes: Vec<Mutex<()>>,
}

impl StripedLock {
    pub(crate) fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    pub(crate) async fn lock(&self, name: &str) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe(name)].lock().await
    }

    fn stripe(&self, name: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }
}

/// Cooperative cancellation, observed between entries of bulk operations.
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
