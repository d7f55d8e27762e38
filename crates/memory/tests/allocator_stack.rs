//! End-to-end test of the full stack: typed adapter over the pool over the
//! recovering system allocator.

use sylva_memory::{PoolAllocator, PoolStats, TypedAlloc};

#[test]
fn typed_counts_flow_through_both_levels() {
    let pool = PoolAllocator::new();

    {
        let nodes = TypedAlloc::<[u64; 2], _>::new(&pool);
        let payloads = TypedAlloc::<u8, _>::new(&pool);

        // 16-byte node records stay pooled; a 4 KiB payload passes through.
        let a = nodes.allocate_one().unwrap();
        let b = nodes.allocate_one().unwrap();
        let buf = payloads.allocate(4096).unwrap();

        unsafe {
            a.as_ptr().write([1, 2]);
            b.as_ptr().write([3, 4]);
            assert_eq!(a.as_ptr().read(), [1, 2]);
            assert_eq!(b.as_ptr().read(), [3, 4]);

            nodes.deallocate_one(a);
            nodes.deallocate_one(b);
            payloads.deallocate(buf, 4096);
        }
    }

    let PoolStats {
        pooled_allocations,
        pass_through,
        chunk_requests,
        ..
    } = pool.stats();
    assert_eq!(pooled_allocations, 2);
    assert_eq!(pass_through, 1);
    assert_eq!(chunk_requests, 1);
}

#[test]
fn freed_typed_slots_are_recycled() {
    let pool = PoolAllocator::new();
    let nodes = TypedAlloc::<[u64; 2], _>::new(&pool);

    let first = nodes.allocate_one().unwrap();
    unsafe { nodes.deallocate_one(first) };
    let second = nodes.allocate_one().unwrap();

    assert_eq!(first, second);
    unsafe { nodes.deallocate_one(second) };
}
