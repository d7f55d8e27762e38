//! Black-box tests of the set surface.

use sylva_collections::TreeSet;

#[test]
fn insertion_scenario_traverses_sorted() {
    let mut set = TreeSet::new();
    for key in [5, 3, 8, 1, 4, 7, 9] {
        assert!(set.insert(key));
    }
    assert_eq!(
        set.iter().copied().collect::<Vec<_>>(),
        vec![1, 3, 4, 5, 7, 8, 9]
    );
}

#[test]
fn n_distinct_keys_roundtrip() {
    let n = 1000;
    let set: TreeSet<u32> = (0..n).rev().collect();
    assert_eq!(set.len(), n as usize);
    assert!(set.iter().copied().eq(0..n));
}

#[test]
fn bound_queries() {
    let set: TreeSet<i32> = [10, 20, 30].into_iter().collect();
    assert_eq!(set.lower_bound(&20), Some(&20));
    assert_eq!(set.upper_bound(&20), Some(&30));
    assert_eq!(set.lower_bound(&25), Some(&30));
    assert_eq!(set.upper_bound(&30), None);
}

#[test]
fn removal_keeps_order() {
    let mut set: TreeSet<i32> = (0..100).collect();
    for k in (0..100).filter(|k| k % 3 == 0) {
        assert!(set.remove(&k));
    }
    let expected: Vec<i32> = (0..100).filter(|k| k % 3 != 0).collect();
    assert_eq!(set.iter().copied().collect::<Vec<_>>(), expected);
}

#[test]
fn clear_then_reuse() {
    let mut set: TreeSet<u16> = (0..64).collect();
    set.clear();
    assert!(set.is_empty());
    assert_eq!(set.first(), None);

    set.insert(42);
    assert_eq!(set.first(), Some(&42));
    assert_eq!(set.last(), Some(&42));
}
