//! Reclaim-and-retry wrapper for any raw allocator.
//!
//! When the wrapped allocator refuses a request, `RecoveringAllocator` runs a
//! caller-installed reclaim hook (expected to free memory elsewhere in the
//! process) and retries, looping under an [`OomPolicy`]. With no hook
//! installed, or once the hook reports it has nothing left to release, the
//! failure becomes the terminal [`AllocError::ExhaustedMemory`].
//!
//! The hook lives on the allocator instance behind a mutex; there is no
//! process-wide handler state.

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

use parking_lot::Mutex;

use super::{RawAllocator, SystemAllocator};
use crate::error::{AllocError, AllocResult};

/// Recovery callback. Returns `true` if it managed to release memory and a
/// retry is worthwhile, `false` if there is nothing left to free.
pub type ReclaimHook = Box<dyn FnMut() -> bool + Send>;

/// Retry budget for the reclaim loop.
///
/// The default bounds the loop at eight reclaim rounds per request, so a hook
/// that keeps claiming progress without delivering any cannot wedge the
/// caller. [`OomPolicy::unbounded`] restores loop-until-success for hooks
/// that are guaranteed to make progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OomPolicy {
    max_retries: Option<usize>,
}

impl Default for OomPolicy {
    fn default() -> Self {
        Self::bounded(8)
    }
}

impl OomPolicy {
    /// At most `max_retries` reclaim rounds per failing request.
    #[must_use]
    pub const fn bounded(max_retries: usize) -> Self {
        Self {
            max_retries: Some(max_retries),
        }
    }

    /// Retry for as long as the hook keeps reporting progress.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { max_retries: None }
    }

    fn keeps_trying(self, attempts: usize) -> bool {
        self.max_retries.is_none_or(|max| attempts < max)
    }
}

/// Raw allocator with a reclaim-and-retry recovery path.
///
/// This is the front door for every allocation that must not fail quietly:
/// the pool allocator routes its chunk requests here once its own fallbacks
/// are spent, and byte-level containers use it directly for oversized
/// buffers.
pub struct RecoveringAllocator<A: RawAllocator = SystemAllocator> {
    inner: A,
    hook: Mutex<Option<ReclaimHook>>,
    policy: OomPolicy,
}

impl Default for RecoveringAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecoveringAllocator {
    /// Recovering allocator over the system allocator, default policy, no
    /// hook installed.
    pub fn new() -> Self {
        Self::with_policy(SystemAllocator::new(), OomPolicy::default())
    }
}

impl<A: RawAllocator> RecoveringAllocator<A> {
    /// Wraps `inner` with the default retry policy and no hook.
    pub fn wrap(inner: A) -> Self {
        Self::with_policy(inner, OomPolicy::default())
    }

    /// Wraps `inner` with an explicit retry policy.
    pub fn with_policy(inner: A, policy: OomPolicy) -> Self {
        Self {
            inner,
            hook: Mutex::new(None),
            policy,
        }
    }

    /// Wraps `inner` with a reclaim hook already installed.
    pub fn with_reclaim_hook(inner: A, hook: impl FnMut() -> bool + Send + 'static) -> Self {
        let this = Self::wrap(inner);
        this.set_reclaim_hook(Some(Box::new(hook)));
        this
    }

    /// Installs a new reclaim hook, returning the previous one so callers can
    /// restore it afterwards.
    pub fn set_reclaim_hook(&self, hook: Option<ReclaimHook>) -> Option<ReclaimHook> {
        core::mem::replace(&mut *self.hook.lock(), hook)
    }

    /// The wrapped allocator.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Runs the hook once. `false` when absent or out of options.
    fn reclaim(&self) -> bool {
        match self.hook.lock().as_mut() {
            Some(hook) => hook(),
            None => false,
        }
    }

    /// Reclaim-and-retry loop shared by allocate and reallocate.
    fn recover(
        &self,
        layout: Layout,
        mut attempt: impl FnMut(&A) -> Option<NonNull<u8>>,
    ) -> AllocResult<NonNull<u8>> {
        let mut attempts = 0;
        while self.policy.keeps_trying(attempts) && self.reclaim() {
            attempts += 1;
            tracing::debug!(
                size = layout.size(),
                attempts,
                "retrying allocation after reclaim"
            );
            if let Some(ptr) = attempt(&self.inner) {
                return Ok(ptr);
            }
        }
        tracing::debug!(size = layout.size(), attempts, "allocation exhausted");
        Err(AllocError::exhausted(layout))
    }
}

impl<A: RawAllocator> fmt::Debug for RecoveringAllocator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveringAllocator")
            .field("policy", &self.policy)
            .field("hook_installed", &self.hook.lock().is_some())
            .finish_non_exhaustive()
    }
}

unsafe impl<A: RawAllocator> RawAllocator for RecoveringAllocator<A> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        if let Some(ptr) = unsafe { self.inner.try_allocate(layout) } {
            return Ok(ptr);
        }
        self.recover(layout, |inner| unsafe { inner.try_allocate(layout) })
    }

    unsafe fn try_allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        // Single attempt by definition: recovery stays out of this path.
        unsafe { self.inner.try_allocate(layout) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.inner.deallocate(ptr, layout) };
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> AllocResult<NonNull<u8>> {
        match unsafe { self.inner.reallocate(ptr, old_layout, new_layout) } {
            Ok(grown) => Ok(grown),
            // A failed resize leaves the old allocation live, so retrying
            // with the same arguments is sound.
            Err(err) if err.is_exhausted() => self.recover(new_layout, |inner| unsafe {
                inner.reallocate(ptr, old_layout, new_layout).ok()
            }),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backing allocator that refuses the first `failures` requests.
    struct Flaky {
        remaining_failures: Cell<usize>,
        delegate: SystemAllocator,
    }

    impl Flaky {
        fn failing(times: usize) -> Self {
            Self {
                remaining_failures: Cell::new(times),
                delegate: SystemAllocator::new(),
            }
        }
    }

    unsafe impl RawAllocator for Flaky {
        unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
            unsafe { self.try_allocate(layout) }.ok_or_else(|| AllocError::exhausted(layout))
        }

        unsafe fn try_allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
            let left = self.remaining_failures.get();
            if left > 0 {
                self.remaining_failures.set(left - 1);
                return None;
            }
            unsafe { self.delegate.try_allocate(layout) }
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            unsafe { self.delegate.deallocate(ptr, layout) };
        }
    }

    #[test]
    fn no_hook_fails_immediately() {
        let alloc = RecoveringAllocator::wrap(Flaky::failing(1));
        let layout = Layout::new::<u64>();

        let err = unsafe { alloc.allocate(layout) }.unwrap_err();
        assert!(err.is_exhausted());
    }

    #[test]
    fn hook_retries_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let alloc = RecoveringAllocator::with_reclaim_hook(Flaky::failing(3), move || {
            seen.fetch_add(1, Ordering::Relaxed);
            true
        });
        let layout = Layout::new::<u64>();

        let ptr = unsafe { alloc.allocate(layout) }.unwrap();
        unsafe { alloc.deallocate(ptr, layout) };
        // The initial attempt and two retries failed; the third reclaim
        // round let the fourth attempt through.
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn hook_reporting_no_progress_stops_the_loop() {
        let alloc = RecoveringAllocator::with_reclaim_hook(Flaky::failing(usize::MAX), || false);
        let err = unsafe { alloc.allocate(Layout::new::<u64>()) }.unwrap_err();
        assert!(err.is_exhausted());
    }

    #[test]
    fn bounded_policy_caps_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let alloc = RecoveringAllocator::with_policy(
            Flaky::failing(usize::MAX),
            OomPolicy::bounded(4),
        );
        alloc.set_reclaim_hook(Some(Box::new(move || {
            seen.fetch_add(1, Ordering::Relaxed);
            true
        })));

        let err = unsafe { alloc.allocate(Layout::new::<u64>()) }.unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(calls.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn set_hook_returns_previous() {
        let alloc = RecoveringAllocator::new();
        assert!(alloc.set_reclaim_hook(Some(Box::new(|| true))).is_none());
        let previous = alloc.set_reclaim_hook(None);
        assert!(previous.is_some());
    }

    #[test]
    fn try_allocate_skips_recovery() {
        let alloc = RecoveringAllocator::with_reclaim_hook(Flaky::failing(1), || {
            panic!("single-attempt path must not reclaim")
        });
        assert!(unsafe { alloc.try_allocate(Layout::new::<u64>()) }.is_none());
    }
}
