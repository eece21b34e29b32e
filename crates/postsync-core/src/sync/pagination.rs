//! Scroll threshold check and the single-flight paging guard.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether a scroll position is close enough to the end to request another page.
///
/// `threshold = content_height - viewport_height - lookahead`; the offset must
/// be strictly past it and strictly positive.
pub fn should_load_more(
    scroll_offset: f64,
    content_height: f64,
    viewport_height: f64,
    lookahead: f64,
) -> bool {
    let threshold = content_height - viewport_height - lookahead;
    scroll_offset > threshold && scroll_offset > 0.0
}

/// Holds the paging flag for as long as a page fetch is alive.
///
/// Dropping the guard clears the flag, so completion, failure, timeout and
/// cancellation of the owning future all release it.
pub(crate) struct PagingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PagingGuard<'a> {
    /// Set the flag, or return `None` if it is already set.
    pub(crate) fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PagingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
