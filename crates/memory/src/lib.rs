//! Two-level memory allocation for the sylva container library.
//!
//! The crate provides the allocation stack the containers are built on:
//!
//! - [`SystemAllocator`]: thin wrapper over the operating system allocator.
//! - [`RecoveringAllocator`]: adds a reclaim-and-retry path on top of any
//!   allocator. A caller-installed hook is asked to free memory elsewhere
//!   before a failure becomes terminal.
//! - [`PoolAllocator`]: segregated free lists over a chunked arena, serving
//!   small fixed-class blocks in O(1) and amortizing system calls.
//! - [`TypedAlloc`]: count-of-`T` front-end over any of the above.
//!
//! # Example
//!
//! ```
//! use std::alloc::Layout;
//! use sylva_memory::{PoolAllocator, RawAllocator};
//!
//! let pool = PoolAllocator::new();
//! let layout = Layout::new::<[u8; 24]>();
//!
//! unsafe {
//!     let block = pool.allocate(layout)?;
//!     block.as_ptr().write_bytes(0, 24);
//!     pool.deallocate(block, layout);
//! }
//! # Ok::<(), sylva_memory::AllocError>(())
//! ```
//!
//! The pool is single-threaded by design; see the module docs of
//! [`allocator`] for the sharing and deallocation contracts.

#![warn(missing_docs)]
#![allow(unsafe_code)]

pub mod allocator;
pub mod error;
pub mod utils;

pub use allocator::{
    MAX_POOLED, OomPolicy, PoolAllocator, PoolConfig, PoolStats, QUANTUM, RawAllocator,
    ReclaimHook, RecoveringAllocator, SystemAllocator, TypedAlloc,
};
pub use error::{AllocError, AllocResult};
