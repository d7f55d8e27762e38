//! Segregated free-list pool allocator with chunked arena growth.
//!
//! Small requests are rounded up to an 8-byte size class and served from one
//! of sixteen intrusive free lists. Empty lists are refilled in batches
//! carved off a private arena; the arena grows by chunks sized at twice the
//! immediate need plus a slack term proportional to everything granted so
//! far, which keeps the number of upstream calls sub-linear in the number of
//! allocations. Requests above [`MAX_POOLED`] bytes (or with alignment above
//! [`QUANTUM`]) pass straight through to the backing allocator.
//!
//! When the backing allocator refuses to grow the arena, the pool first
//! scavenges a block from the free list of a larger size class and carves
//! that, and only then falls back to the backing allocator's recovery path.
//!
//! # Contract
//!
//! A block must be deallocated with the same layout it was allocated under;
//! releasing with a different size files the block in the wrong size class
//! and corrupts the pool. The pool is single-threaded (`!Sync`); share it
//! within one thread by reference or `Rc`. Dropping the pool releases every
//! arena chunk at once, invalidating any block still outstanding.

use core::alloc::Layout;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::ptr::{self, NonNull};

use super::{RawAllocator, RecoveringAllocator};
use crate::error::{AllocError, AllocResult};
use crate::utils::align_up;

/// Alignment quantum; every size class is a multiple of this.
pub const QUANTUM: usize = 8;

/// Largest request served from the pool. Bigger requests pass through.
pub const MAX_POOLED: usize = 128;

const FREE_LISTS: usize = MAX_POOLED / QUANTUM;

/// Link threaded through a free block. The first word of a free block holds
/// the pointer to the next one; client data overwrites it on allocation.
#[repr(C)]
struct FreeBlock {
    next: *mut FreeBlock,
}

/// Tuning knobs for the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Blocks requested from the arena per refill batch.
    pub batch_objects: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { batch_objects: 20 }
    }
}

/// Counter snapshot, taken with [`PoolAllocator::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Requests served from the pool (hit or refill).
    pub pooled_allocations: u64,
    /// Requests satisfied by popping a free list directly.
    pub free_list_hits: u64,
    /// Batch refills of an empty free list.
    pub refills: u64,
    /// Arena chunks obtained from the backing allocator.
    pub chunk_requests: u64,
    /// Arena tails donated to a matching free list before growing.
    pub donated_fragments: u64,
    /// Free blocks of a larger class consumed as emergency arena.
    pub scavenges: u64,
    /// Requests delegated to the backing allocator (size or alignment).
    pub pass_through: u64,
    /// Cumulative bytes granted to the arena so far.
    pub heap_bytes: usize,
}

#[derive(Default)]
struct Counters {
    pooled_allocations: Cell<u64>,
    free_list_hits: Cell<u64>,
    refills: Cell<u64>,
    chunk_requests: Cell<u64>,
    donated_fragments: Cell<u64>,
    scavenges: Cell<u64>,
    pass_through: Cell<u64>,
}

impl Counters {
    fn bump(cell: &Cell<u64>) {
        cell.set(cell.get() + 1);
    }
}

/// Segregated-storage allocator for small fixed-class blocks.
pub struct PoolAllocator<A: RawAllocator = RecoveringAllocator> {
    free_lists: [Cell<*mut FreeBlock>; FREE_LISTS],
    arena_start: Cell<*mut u8>,
    arena_end: Cell<*mut u8>,
    heap_size: Cell<usize>,
    /// Chunks owned by the arena, released on drop.
    chunks: RefCell<Vec<(NonNull<u8>, usize)>>,
    config: PoolConfig,
    counters: Counters,
    backing: A,
}

impl Default for PoolAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolAllocator {
    /// Pool over a recovering system allocator with default configuration.
    pub fn new() -> Self {
        Self::with_backing(RecoveringAllocator::new())
    }
}

impl<A: RawAllocator> PoolAllocator<A> {
    /// Pool over `backing` with default configuration.
    pub fn with_backing(backing: A) -> Self {
        Self::with_config(backing, PoolConfig::default())
    }

    /// Pool over `backing` with an explicit configuration.
    pub fn with_config(backing: A, config: PoolConfig) -> Self {
        assert!(config.batch_objects >= 1, "refill batch must not be empty");
        Self {
            free_lists: [const { Cell::new(ptr::null_mut()) }; FREE_LISTS],
            arena_start: Cell::new(ptr::null_mut()),
            arena_end: Cell::new(ptr::null_mut()),
            heap_size: Cell::new(0),
            chunks: RefCell::new(Vec::new()),
            config,
            counters: Counters::default(),
            backing,
        }
    }

    /// The backing allocator.
    pub fn backing(&self) -> &A {
        &self.backing
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pooled_allocations: self.counters.pooled_allocations.get(),
            free_list_hits: self.counters.free_list_hits.get(),
            refills: self.counters.refills.get(),
            chunk_requests: self.counters.chunk_requests.get(),
            donated_fragments: self.counters.donated_fragments.get(),
            scavenges: self.counters.scavenges.get(),
            pass_through: self.counters.pass_through.get(),
            heap_bytes: self.heap_size.get(),
        }
    }

    /// Whether a request is served from the pool rather than passed through.
    #[must_use]
    pub const fn is_pooled(layout: Layout) -> bool {
        layout.size() != 0 && layout.size() <= MAX_POOLED && layout.align() <= QUANTUM
    }

    /// Free-list index for a request of `bytes` (1..=[`MAX_POOLED`]).
    const fn list_index(bytes: usize) -> usize {
        (bytes + QUANTUM - 1) / QUANTUM - 1
    }

    fn pop_block(&self, index: usize) -> Option<NonNull<u8>> {
        let head = self.free_lists[index].get();
        NonNull::new(head).map(|block| {
            self.free_lists[index].set(unsafe { (*head).next });
            block.cast()
        })
    }

    fn push_block(&self, index: usize, ptr: NonNull<u8>) {
        let block = ptr.as_ptr().cast::<FreeBlock>();
        unsafe { (*block).next = self.free_lists[index].get() };
        self.free_lists[index].set(block);
    }

    fn arena_len(&self) -> usize {
        self.arena_end.get() as usize - self.arena_start.get() as usize
    }

    /// Advances the arena cursor by `bytes` and returns the carved region.
    fn carve(&self, bytes: usize) -> NonNull<u8> {
        let start = self.arena_start.get();
        debug_assert!(bytes <= self.arena_len());
        self.arena_start.set(unsafe { start.add(bytes) });
        // The arena never starts at null while it has bytes to carve.
        unsafe { NonNull::new_unchecked(start) }
    }

    fn adopt_chunk(&self, chunk: NonNull<u8>, bytes: usize) {
        self.chunks.borrow_mut().push((chunk, bytes));
        self.heap_size.set(self.heap_size.get() + bytes);
        self.arena_start.set(chunk.as_ptr());
        self.arena_end.set(unsafe { chunk.as_ptr().add(bytes) });
        Counters::bump(&self.counters.chunk_requests);
        tracing::debug!(bytes, heap = self.heap_size.get(), "grew pool arena");
    }

    /// Carves up to `nobjs` blocks of `size` bytes (`size` a multiple of the
    /// quantum) out of the arena, growing it when needed. Returns the start
    /// of the carved region and the number of blocks actually obtained.
    fn chunk_alloc(&self, size: usize, mut nobjs: usize) -> AllocResult<(NonNull<u8>, usize)> {
        loop {
            let total = size * nobjs;
            let left = self.arena_len();

            if left >= total {
                return Ok((self.carve(total), nobjs));
            }
            if left >= size {
                // Not a full batch, but at least one block fits.
                nobjs = left / size;
                return Ok((self.carve(size * nobjs), nobjs));
            }

            // Arena exhausted for this class. Donate the tail; it is always
            // a multiple of the quantum, so it fits a smaller class exactly.
            if left > 0 {
                debug_assert_eq!(left % QUANTUM, 0);
                let tail = self.carve(left);
                self.push_block(Self::list_index(left), tail);
                Counters::bump(&self.counters.donated_fragments);
                tracing::trace!(bytes = left, "donated arena tail to free list");
            }

            let want = 2 * total + align_up(self.heap_size.get() >> 4, QUANTUM);
            let layout = Layout::from_size_align(want, QUANTUM)
                .map_err(|_| AllocError::size_overflow(want, 1))?;

            if let Some(chunk) = unsafe { self.backing.try_allocate(layout) } {
                self.adopt_chunk(chunk, want);
                continue;
            }

            // The system refused. Scavenge a free block from the requested
            // class upwards and use it as emergency arena.
            let mut class = size;
            let mut scavenged = false;
            while class <= MAX_POOLED {
                if let Some(block) = self.pop_block(Self::list_index(class)) {
                    Counters::bump(&self.counters.scavenges);
                    tracing::debug!(bytes = class, "scavenged free block as arena");
                    self.arena_start.set(block.as_ptr());
                    self.arena_end.set(unsafe { block.as_ptr().add(class) });
                    scavenged = true;
                    break;
                }
                class += QUANTUM;
            }
            if scavenged {
                continue;
            }

            // Nothing pooled to cannibalize: the backing allocator's own
            // recovery path is the last resort.
            let chunk = unsafe { self.backing.allocate(layout)? };
            self.adopt_chunk(chunk, want);
        }
    }

    /// Refills the free list for `size` (already rounded to the quantum) and
    /// returns one block to the caller directly.
    fn refill(&self, size: usize) -> AllocResult<NonNull<u8>> {
        let (chunk, got) = self.chunk_alloc(size, self.config.batch_objects)?;
        Counters::bump(&self.counters.refills);

        if got > 1 {
            let index = Self::list_index(size);
            // Block 0 goes to the caller; chain the rest, keeping them in
            // address order so the next pops walk the batch front to back.
            for i in (1..got).rev() {
                let block = unsafe { NonNull::new_unchecked(chunk.as_ptr().add(i * size)) };
                self.push_block(index, block);
            }
        }
        Ok(chunk)
    }
}

impl<A: RawAllocator> fmt::Debug for PoolAllocator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

unsafe impl<A: RawAllocator> RawAllocator for PoolAllocator<A> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }
        if !Self::is_pooled(layout) {
            Counters::bump(&self.counters.pass_through);
            return unsafe { self.backing.allocate(layout) };
        }

        Counters::bump(&self.counters.pooled_allocations);
        let index = Self::list_index(layout.size());
        if let Some(block) = self.pop_block(index) {
            Counters::bump(&self.counters.free_list_hits);
            return Ok(block);
        }
        self.refill(align_up(layout.size(), QUANTUM))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        if !Self::is_pooled(layout) {
            return unsafe { self.backing.deallocate(ptr, layout) };
        }
        self.push_block(Self::list_index(layout.size()), ptr);
    }
}

impl<A: RawAllocator> Drop for PoolAllocator<A> {
    fn drop(&mut self) {
        for (chunk, bytes) in self.chunks.borrow_mut().drain(..) {
            if let Ok(layout) = Layout::from_size_align(bytes, QUANTUM) {
                unsafe { self.backing.deallocate(chunk, layout) };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(bytes: usize) -> Layout {
        Layout::from_size_align(bytes, 1).unwrap()
    }

    #[test]
    fn size_class_index() {
        assert_eq!(PoolAllocator::<RecoveringAllocator>::list_index(1), 0);
        assert_eq!(PoolAllocator::<RecoveringAllocator>::list_index(8), 0);
        assert_eq!(PoolAllocator::<RecoveringAllocator>::list_index(9), 1);
        assert_eq!(PoolAllocator::<RecoveringAllocator>::list_index(128), 15);
    }

    #[test]
    fn pooled_request_rounds_up_to_class() {
        let pool = PoolAllocator::new();

        // A fresh refill carves adjacent blocks; their spacing is the carved
        // block size.
        unsafe {
            let a = pool.allocate(layout(13)).unwrap();
            let b = pool.allocate(layout(13)).unwrap();
            assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 16);
            pool.deallocate(a, layout(13));
            pool.deallocate(b, layout(13));
        }
    }

    #[test]
    fn free_list_reuse_is_lifo() {
        let pool = PoolAllocator::new();
        let l = layout(64);

        unsafe {
            let first = pool.allocate(l).unwrap();
            pool.deallocate(first, l);
            let second = pool.allocate(l).unwrap();
            assert_eq!(first, second);
            pool.deallocate(second, l);
        }

        let stats = pool.stats();
        assert_eq!(stats.free_list_hits, 1);
        assert_eq!(stats.refills, 1);
    }

    #[test]
    fn oversized_requests_pass_through() {
        let pool = PoolAllocator::new();
        let big = layout(MAX_POOLED + 1);

        unsafe {
            let ptr = pool.allocate(big).unwrap();
            pool.deallocate(ptr, big);
        }

        let stats = pool.stats();
        assert_eq!(stats.pass_through, 1);
        assert_eq!(stats.pooled_allocations, 0);
        assert_eq!(stats.chunk_requests, 0);
    }

    #[test]
    fn over_aligned_requests_pass_through() {
        let pool = PoolAllocator::new();
        let aligned = Layout::from_size_align(64, 64).unwrap();

        unsafe {
            let ptr = pool.allocate(aligned).unwrap();
            assert_eq!(ptr.as_ptr() as usize % 64, 0);
            pool.deallocate(ptr, aligned);
        }
        assert_eq!(pool.stats().pass_through, 1);
    }

    #[test]
    fn refill_batches_amortize_chunk_requests() {
        let pool = PoolAllocator::new();
        let l = layout(8);

        unsafe {
            for _ in 0..20 {
                pool.allocate(l).unwrap();
            }
        }

        let stats = pool.stats();
        assert_eq!(stats.pooled_allocations, 20);
        // One refill covered the whole batch; 19 of 20 came off the list.
        assert_eq!(stats.refills, 1);
        assert_eq!(stats.free_list_hits, 19);
    }

    #[test]
    fn blocks_are_writable_and_distinct() {
        let pool = PoolAllocator::new();
        let l = layout(24);

        unsafe {
            let mut blocks = Vec::new();
            for i in 0..50u8 {
                let ptr = pool.allocate(l).unwrap();
                ptr::write_bytes(ptr.as_ptr(), i, 24);
                blocks.push(ptr);
            }
            for (i, ptr) in blocks.iter().enumerate() {
                assert_eq!(ptr.as_ptr().read(), i as u8);
            }
            for ptr in blocks {
                pool.deallocate(ptr, l);
            }
        }
    }

    #[test]
    fn zero_sized_requests_never_touch_the_pool() {
        let pool = PoolAllocator::new();
        unsafe {
            let ptr = pool.allocate(Layout::new::<()>()).unwrap();
            pool.deallocate(ptr, Layout::new::<()>());
        }
        assert_eq!(pool.stats(), PoolStats::default());
    }

    #[test]
    fn small_batch_config_is_honored() {
        let pool =
            PoolAllocator::with_config(RecoveringAllocator::new(), PoolConfig { batch_objects: 1 });
        let l = layout(32);

        unsafe {
            let a = pool.allocate(l).unwrap();
            let b = pool.allocate(l).unwrap();
            pool.deallocate(a, l);
            pool.deallocate(b, l);
        }
        // Every allocation forced its own refill; nothing was chained.
        assert_eq!(pool.stats().refills, 2);
        assert_eq!(pool.stats().free_list_hits, 0);
    }
}
