//! The raw allocation contract shared by every allocator in this crate.
//!
//! `RawAllocator` is deliberately byte-oriented: it deals in `Layout` and
//! `NonNull<u8>`, and success never hands back null. Failure travels through
//! [`AllocResult`], not through sentinel pointers. The extra `try_allocate`
//! entry point exists so composite allocators can distinguish a plain
//! refusal from a refusal that survived the recovery path; the pool
//! allocator scavenges its own free lists between the two.
//!
//! # Safety
//!
//! Implementors must guarantee:
//! - returned pointers are valid, properly aligned for the layout, and
//!   exclusive until deallocated;
//! - `deallocate` is only sound for pointers this allocator handed out, with
//!   the layout they were allocated under;
//! - zero-sized requests succeed with a dangling pointer and a zero-sized
//!   `deallocate` is a no-op.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::AllocResult;

/// Byte-level allocator interface.
pub unsafe trait RawAllocator {
    /// Allocates memory for `layout`, engaging any recovery path the
    /// implementation has before reporting failure.
    ///
    /// # Safety
    /// The returned memory is uninitialized; the caller must initialize it
    /// before reading and must deallocate it with the same layout.
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>>;

    /// Makes a single allocation attempt without engaging recovery.
    ///
    /// Allocators without a recovery path behave exactly like [`allocate`]
    /// here; the default implementation forwards accordingly.
    ///
    /// # Safety
    /// Same contract as [`allocate`].
    ///
    /// [`allocate`]: RawAllocator::allocate
    unsafe fn try_allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        unsafe { self.allocate(layout) }.ok()
    }

    /// Returns memory to the allocator.
    ///
    /// # Safety
    /// `ptr` must come from this allocator and `layout` must match the
    /// allocation exactly. The pointer is invalid afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Resizes an existing allocation, preserving the leading
    /// `min(old, new)` bytes.
    ///
    /// The default implementation allocates, copies, and releases the old
    /// block; on failure the old allocation is left untouched.
    ///
    /// # Safety
    /// `ptr` must come from this allocator under `old_layout`. On success the
    /// old pointer is invalid; on failure it remains live.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> AllocResult<NonNull<u8>> {
        let new_ptr = unsafe { self.allocate(new_layout)? };
        let copy = old_layout.size().min(new_layout.size());
        if copy > 0 {
            // Both regions are distinct and at least `copy` bytes long.
            unsafe { core::ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), copy) };
        }
        unsafe { self.deallocate(ptr, old_layout) };
        Ok(new_ptr)
    }
}

unsafe impl<A: RawAllocator + ?Sized> RawAllocator for &A {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        unsafe { (**self).allocate(layout) }
    }

    unsafe fn try_allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        unsafe { (**self).try_allocate(layout) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { (**self).deallocate(ptr, layout) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> AllocResult<NonNull<u8>> {
        unsafe { (**self).reallocate(ptr, old_layout, new_layout) }
    }
}
