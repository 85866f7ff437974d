//! Cooperative cancellation for page rasterization
//!
//! Page renders run off the interaction path and can be superseded at any
//! time by a zoom change or a page re-request. Each render gets a
//! [`CancellationToken`]; starting a new render for a page cancels the
//! token of the one already in flight for that page and only that page.
//! Workers poll the token at safe points and bail out early.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

/// Shared cancellation flag for one render
///
/// Clones share the same flag. Cancelling is idempotent and one-way: a
/// cancelled token never becomes live again, the render is simply
/// restarted with a fresh token.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag the render as cancelled; all clones observe it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn same_generation(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// Registry of in-flight renders, one slot per page number
#[derive(Debug, Default)]
pub struct PageRenderTasks {
    active: Mutex<HashMap<u32, CancellationToken>>,
}

impl PageRenderTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a render for a page
    ///
    /// Cancels whatever was in flight for this page and returns the fresh
    /// token to hand to the worker.
    pub fn begin(&self, page: u32) -> CancellationToken {
        let token = CancellationToken::new();
        let mut active = self.active.lock().unwrap();
        if let Some(previous) = active.insert(page, token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Mark a render as finished
    ///
    /// Only unregisters when `token` is still the page's current
    /// generation; a late finish from a superseded render must not evict
    /// its replacement. Returns whether the slot was cleared.
    pub fn finish(&self, page: u32, token: &CancellationToken) -> bool {
        let mut active = self.active.lock().unwrap();
        match active.get(&page) {
            Some(current) if current.same_generation(token) => {
                active.remove(&page);
                true
            }
            _ => false,
        }
    }

    /// Cancel every in-flight render (used on zoom changes)
    pub fn cancel_all(&self) {
        let mut active = self.active.lock().unwrap();
        for token in active.values() {
            token.cancel();
        }
        active.clear();
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_cancel_is_shared_and_idempotent() {
        let token = CancellationToken::new();
        let worker = token.clone();
        assert!(!worker.is_cancelled());

        token.cancel();
        token.cancel();
        assert!(worker.is_cancelled());
    }

    #[test]
    fn test_begin_cancels_only_same_page() {
        let tasks = PageRenderTasks::new();
        let first = tasks.begin(1);
        let other_page = tasks.begin(2);

        let second = tasks.begin(1);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!other_page.is_cancelled());
    }

    #[test]
    fn test_stale_finish_does_not_evict_replacement() {
        let tasks = PageRenderTasks::new();
        let stale = tasks.begin(1);
        let current = tasks.begin(1);

        assert!(!tasks.finish(1, &stale));
        assert_eq!(tasks.active_count(), 1);

        assert!(tasks.finish(1, &current));
        assert_eq!(tasks.active_count(), 0);
    }

    #[test]
    fn test_cancel_all_flags_every_page() {
        let tasks = PageRenderTasks::new();
        let a = tasks.begin(1);
        let b = tasks.begin(2);

        tasks.cancel_all();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert_eq!(tasks.active_count(), 0);
    }

    #[test]
    fn test_worker_thread_observes_cancellation() {
        let tasks = PageRenderTasks::new();
        let token = tasks.begin(1);
        let worker = token.clone();

        let handle = std::thread::spawn(move || {
            while !worker.is_cancelled() {
                std::thread::yield_now();
            }
            true
        });

        tasks.begin(1);
        assert!(handle.join().unwrap());
    }
}
