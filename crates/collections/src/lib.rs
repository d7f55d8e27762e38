//! Ordered containers backed by a red-black tree.
//!
//! The crate is layered the way the classic template libraries are:
//!
//! - [`tree::RbTree`]: the balanced search tree itself, parameterized by a
//!   key-extraction policy ([`tree::KeyOf`]) and a comparison policy
//!   ([`tree::Comparator`]);
//! - [`TreeMap`]: pair storage keyed by the first element;
//! - [`TreeSet`]: elements keyed by themselves.
//!
//! Nodes live in an index-addressed slab, so positions ([`tree::NodeId`])
//! stay valid across unrelated insertions and erasures, and traversal steps
//! through parent links in O(1) amortized with no auxiliary stack.
//!
//! # Example
//!
//! ```
//! use sylva_collections::{TreeMap, TreeSet};
//!
//! let mut seen = TreeSet::new();
//! assert!(seen.insert("wren"));
//! assert!(!seen.insert("wren"));
//!
//! let counts: TreeMap<&str, u32> = [("wren", 2), ("crow", 1)].into_iter().collect();
//! assert_eq!(counts.first(), Some((&"crow", &1)));
//! ```

#![warn(missing_docs)]

pub mod map;
pub mod set;
pub mod tree;

pub use map::TreeMap;
pub use set::TreeSet;
pub use tree::{Comparator, FirstOfPair, Identity, KeyOf, Natural, NodeId, RbTree};
