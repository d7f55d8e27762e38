//! The two-level allocation stack.
//!
//! Level one is [`SystemAllocator`] wrapped in [`RecoveringAllocator`]: the
//! operating system allocator plus a reclaim-and-retry path for failures.
//! Level two is [`PoolAllocator`]: a segregated free list that amortizes
//! level-one calls across many small allocations. [`TypedAlloc`] sits in
//! front of either level and deals in element counts instead of bytes.

mod pool;
mod recover;
mod system;
mod traits;
mod typed;

pub use pool::{MAX_POOLED, PoolAllocator, PoolConfig, PoolStats, QUANTUM};
pub use recover::{OomPolicy, ReclaimHook, RecoveringAllocator};
pub use system::SystemAllocator;
pub use traits::RawAllocator;
pub use typed::TypedAlloc;
