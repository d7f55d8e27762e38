//! Red-black tree over an index-addressed node slab.
//!
//! The tree keeps values ordered by a key projected out of them, so one
//! implementation backs both sets (the value is its own key) and maps (the
//! key is the first element of a pair). Balancing follows the classic
//! red-black rules; every mutation rebalances with at most a constant number
//! of rotations plus a recoloring walk toward the root.
//!
//! Positions are [`NodeId`]s into the slab. An id stays valid until its
//! element is erased; inserting and erasing other elements never moves it.
//! Root, minimum, and maximum are cached, making `first`/`last` and both
//! iteration endpoints O(1).

mod iter;
mod node;

pub use iter::Iter;
pub use node::NodeId;

use core::fmt;
use core::marker::PhantomData;

use node::{Color, Node};

/// Strict-weak-ordering comparison policy.
///
/// Two keys are *equivalent* iff neither is less than the other; the tree
/// never calls `==` on keys.
pub trait Comparator<K: ?Sized> {
    /// Whether `a` orders strictly before `b`.
    fn less(&self, a: &K, b: &K) -> bool;
}

/// Orders keys by their `Ord` implementation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Natural;

impl<K: Ord + ?Sized> Comparator<K> for Natural {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        a < b
    }
}

/// Key-extraction policy: how to project the ordering key out of a stored
/// value.
pub trait KeyOf<V> {
    /// The projected key type.
    type Key: ?Sized;

    /// Borrows the key from a stored value.
    fn key(value: &V) -> &Self::Key;
}

/// The stored value is its own key (sets).
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl<V> KeyOf<V> for Identity {
    type Key = V;

    #[inline]
    fn key(value: &V) -> &V {
        value
    }
}

/// The first element of a pair is the key (maps).
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstOfPair;

impl<K, V> KeyOf<(K, V)> for FirstOfPair {
    type Key = K;

    #[inline]
    fn key(pair: &(K, V)) -> &K {
        &pair.0
    }
}

/// Ordered collection of values keyed by a projection, balanced as a
/// red-black tree.
pub struct RbTree<V, P = Identity, C = Natural>
where
    P: KeyOf<V>,
    C: Comparator<P::Key>,
{
    nodes: Vec<Node<V>>,
    /// Vacant slot indices, reused before the slab grows.
    free: Vec<NodeId>,
    root: Option<NodeId>,
    leftmost: Option<NodeId>,
    rightmost: Option<NodeId>,
    len: usize,
    cmp: C,
    _policy: PhantomData<P>,
}

impl<V, P, C> RbTree<V, P, C>
where
    P: KeyOf<V>,
    C: Comparator<P::Key> + Default,
{
    /// Empty tree with the default comparator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<V, P, C> Default for RbTree<V, P, C>
where
    P: KeyOf<V>,
    C: Comparator<P::Key> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, P, C> RbTree<V, P, C>
where
    P: KeyOf<V>,
    C: Comparator<P::Key>,
{
    /// Empty tree ordering keys with `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            leftmost: None,
            rightmost: None,
            len: 0,
            cmp,
            _policy: PhantomData,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position of the minimum element.
    #[must_use]
    pub fn first(&self) -> Option<NodeId> {
        self.leftmost
    }

    /// Position of the maximum element.
    #[must_use]
    pub fn last(&self) -> Option<NodeId> {
        self.rightmost
    }

    /// The value at `id`, if that slot currently holds an element.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&V> {
        self.nodes.get(id.index()).and_then(|n| n.value.as_ref())
    }

    /// Mutable value at `id`.
    ///
    /// The returned reference must not be used to change how the value's
    /// projected key orders; doing so leaves the tree unsorted. Map
    /// surfaces expose only the non-key part mutably for exactly this
    /// reason.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut V> {
        self.nodes.get_mut(id.index()).and_then(|n| n.value.as_mut())
    }

    /// The value at `id`.
    ///
    /// # Panics
    /// Panics if `id` does not name a live element.
    #[must_use]
    pub fn value(&self, id: NodeId) -> &V {
        self.get(id).expect("node id does not name a live element")
    }

    /// Mutable value at `id`; same key restriction as [`get_mut`].
    ///
    /// # Panics
    /// Panics if `id` does not name a live element.
    ///
    /// [`get_mut`]: RbTree::get_mut
    pub fn value_mut(&mut self, id: NodeId) -> &mut V {
        self.get_mut(id).expect("node id does not name a live element")
    }

    // ── link plumbing ──────────────────────────────────────────────────────

    fn node(&self, id: NodeId) -> &Node<V> {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<V> {
        &mut self.nodes[id.index()]
    }

    fn left(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).left
    }

    fn right(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).right
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    fn set_left(&mut self, id: NodeId, to: Option<NodeId>) {
        self.node_mut(id).left = to;
    }

    fn set_right(&mut self, id: NodeId, to: Option<NodeId>) {
        self.node_mut(id).right = to;
    }

    fn set_parent(&mut self, id: NodeId, to: Option<NodeId>) {
        self.node_mut(id).parent = to;
    }

    fn color(&self, id: NodeId) -> Color {
        self.node(id).color
    }

    fn set_color(&mut self, id: NodeId, color: Color) {
        self.node_mut(id).color = color;
    }

    /// Absent nodes count as black.
    fn is_red(&self, id: Option<NodeId>) -> bool {
        id.is_some_and(|n| self.color(n) == Color::Red)
    }

    fn key_of(&self, id: NodeId) -> &P::Key {
        P::key(self.value(id))
    }

    fn min_from(&self, mut id: NodeId) -> NodeId {
        while let Some(l) = self.left(id) {
            id = l;
        }
        id
    }

    fn max_from(&self, mut id: NodeId) -> NodeId {
        while let Some(r) = self.right(id) {
            id = r;
        }
        id
    }

    /// In-order successor; `None` past the maximum.
    #[must_use]
    pub fn next_id(&self, id: NodeId) -> Option<NodeId> {
        if let Some(r) = self.right(id) {
            return Some(self.min_from(r));
        }
        let mut cur = id;
        let mut up = self.parent(cur);
        while let Some(p) = up {
            if self.right(p) == Some(cur) {
                cur = p;
                up = self.parent(p);
            } else {
                return Some(p);
            }
        }
        None
    }

    /// In-order predecessor; `None` before the minimum. Stepping back from
    /// the end position is [`last`](RbTree::last).
    #[must_use]
    pub fn prev_id(&self, id: NodeId) -> Option<NodeId> {
        if let Some(l) = self.left(id) {
            return Some(self.max_from(l));
        }
        let mut cur = id;
        let mut up = self.parent(cur);
        while let Some(p) = up {
            if self.left(p) == Some(cur) {
                cur = p;
                up = self.parent(p);
            } else {
                return Some(p);
            }
        }
        None
    }

    // ── slab management ────────────────────────────────────────────────────

    fn alloc_node(&mut self, value: V) -> NodeId {
        if let Some(id) = self.free.pop() {
            let node = &mut self.nodes[id.index()];
            debug_assert!(node.value.is_none());
            node.value = Some(value);
            node.color = Color::Red;
            node.parent = None;
            node.left = None;
            node.right = None;
            id
        } else {
            let id = NodeId::new(self.nodes.len());
            self.nodes.push(Node::occupied(value));
            id
        }
    }

    fn free_node(&mut self, id: NodeId) -> V {
        let node = &mut self.nodes[id.index()];
        let value = node.value.take().expect("erasing a vacant slot");
        node.parent = None;
        node.left = None;
        node.right = None;
        self.free.push(id);
        value
    }

    // ── search ─────────────────────────────────────────────────────────────

    /// First element whose key is not less than `key`.
    pub fn lower_bound(&self, key: &P::Key) -> Option<NodeId> {
        let mut best = None;
        let mut cur = self.root;
        while let Some(c) = cur {
            if self.cmp.less(self.key_of(c), key) {
                cur = self.right(c);
            } else {
                best = Some(c);
                cur = self.left(c);
            }
        }
        best
    }

    /// First element whose key is strictly greater than `key`.
    pub fn upper_bound(&self, key: &P::Key) -> Option<NodeId> {
        let mut best = None;
        let mut cur = self.root;
        while let Some(c) = cur {
            if self.cmp.less(key, self.key_of(c)) {
                best = Some(c);
                cur = self.left(c);
            } else {
                cur = self.right(c);
            }
        }
        best
    }

    /// Position of an element equivalent to `key`.
    pub fn find(&self, key: &P::Key) -> Option<NodeId> {
        self.lower_bound(key)
            .filter(|&id| !self.cmp.less(key, self.key_of(id)))
    }

    /// `(lower_bound, upper_bound)` of the run of elements equivalent to
    /// `key`.
    pub fn equal_range(&self, key: &P::Key) -> (Option<NodeId>, Option<NodeId>) {
        (self.lower_bound(key), self.upper_bound(key))
    }

    /// Number of elements equivalent to `key`.
    pub fn count(&self, key: &P::Key) -> usize {
        let (mut cur, end) = self.equal_range(key);
        let mut n = 0;
        while cur != end {
            let Some(id) = cur else { break };
            n += 1;
            cur = self.next_id(id);
        }
        n
    }

    // ── insertion ──────────────────────────────────────────────────────────

    /// Inserts `value`, keeping keys unique.
    ///
    /// If an element with an equivalent key exists, returns its position and
    /// gives the rejected value back; the tree is unchanged. Otherwise
    /// returns the new element's position.
    pub fn insert_unique(&mut self, value: V) -> Result<NodeId, (NodeId, V)> {
        let mut parent = None;
        let mut cur = self.root;
        let mut went_left = true;
        while let Some(c) = cur {
            parent = Some(c);
            went_left = self.cmp.less(P::key(&value), self.key_of(c));
            cur = if went_left { self.left(c) } else { self.right(c) };
        }

        // The descent alone cannot tell "equivalent" from "goes right of";
        // compare against the would-be in-order predecessor to decide.
        let neighbor = if went_left {
            match parent {
                // Empty tree, or the value becomes the new minimum: nothing
                // to its left to collide with.
                None => None,
                Some(p) if self.leftmost == Some(p) => None,
                Some(p) => self.prev_id(p),
            }
        } else {
            parent
        };

        if let Some(j) = neighbor {
            if !self.cmp.less(self.key_of(j), P::key(&value)) {
                return Err((j, value));
            }
        }
        Ok(self.attach(parent, went_left, value))
    }

    /// Inserts `value`, allowing equivalent keys. Equal keys end up adjacent
    /// in traversal order.
    pub fn insert_equal(&mut self, value: V) -> NodeId {
        let mut parent = None;
        let mut cur = self.root;
        let mut went_left = true;
        while let Some(c) = cur {
            parent = Some(c);
            went_left = self.cmp.less(P::key(&value), self.key_of(c));
            cur = if went_left { self.left(c) } else { self.right(c) };
        }
        self.attach(parent, went_left, value)
    }

    /// Links a fresh red node under `parent` and restores the balance.
    fn attach(&mut self, parent: Option<NodeId>, as_left: bool, value: V) -> NodeId {
        let id = self.alloc_node(value);
        self.set_parent(id, parent);
        match parent {
            None => {
                self.root = Some(id);
                self.leftmost = Some(id);
                self.rightmost = Some(id);
            }
            Some(p) => {
                if as_left {
                    self.set_left(p, Some(id));
                    if self.leftmost == Some(p) {
                        self.leftmost = Some(id);
                    }
                } else {
                    self.set_right(p, Some(id));
                    if self.rightmost == Some(p) {
                        self.rightmost = Some(id);
                    }
                }
            }
        }
        self.len += 1;
        self.rebalance_after_insert(id);
        id
    }

    fn rebalance_after_insert(&mut self, mut x: NodeId) {
        while Some(x) != self.root && self.is_red(self.parent(x)) {
            // A red parent is never the root, so the grandparent exists.
            let p = self.parent(x).expect("red node has a parent");
            let g = self.parent(p).expect("red parent is below the root");

            if self.left(g) == Some(p) {
                let uncle = self.right(g);
                if self.is_red(uncle) {
                    // Red uncle: recolor and push the violation upward.
                    self.set_color(p, Color::Black);
                    if let Some(u) = uncle {
                        self.set_color(u, Color::Black);
                    }
                    self.set_color(g, Color::Red);
                    x = g;
                } else {
                    if self.right(p) == Some(x) {
                        // Inner grandchild: make it outer first.
                        x = p;
                        self.rotate_left(x);
                    }
                    let p = self.parent(x).expect("rotated node has a parent");
                    let g = self.parent(p).expect("fix-up below the root");
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.left(g);
                if self.is_red(uncle) {
                    self.set_color(p, Color::Black);
                    if let Some(u) = uncle {
                        self.set_color(u, Color::Black);
                    }
                    self.set_color(g, Color::Red);
                    x = g;
                } else {
                    if self.left(p) == Some(x) {
                        x = p;
                        self.rotate_right(x);
                    }
                    let p = self.parent(x).expect("rotated node has a parent");
                    let g = self.parent(p).expect("fix-up below the root");
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.rotate_left(g);
                }
            }
        }
        let root = self.root.expect("tree is non-empty after insertion");
        self.set_color(root, Color::Black);
    }

    // ── rotations ──────────────────────────────────────────────────────────

    fn rotate_left(&mut self, x: NodeId) {
        let y = self.right(x).expect("rotate_left needs a right child");
        let inner = self.left(y);
        self.set_right(x, inner);
        if let Some(c) = inner {
            self.set_parent(c, Some(x));
        }
        let up = self.parent(x);
        self.set_parent(y, up);
        match up {
            None => self.root = Some(y),
            Some(p) if self.left(p) == Some(x) => self.set_left(p, Some(y)),
            Some(p) => self.set_right(p, Some(y)),
        }
        self.set_left(y, Some(x));
        self.set_parent(x, Some(y));
    }

    fn rotate_right(&mut self, x: NodeId) {
        let y = self.left(x).expect("rotate_right needs a left child");
        let inner = self.right(y);
        self.set_left(x, inner);
        if let Some(c) = inner {
            self.set_parent(c, Some(x));
        }
        let up = self.parent(x);
        self.set_parent(y, up);
        match up {
            None => self.root = Some(y),
            Some(p) if self.left(p) == Some(x) => self.set_left(p, Some(y)),
            Some(p) => self.set_right(p, Some(y)),
        }
        self.set_right(y, Some(x));
        self.set_parent(x, Some(y));
    }

    // ── erasure ────────────────────────────────────────────────────────────

    /// Removes the element at `z` and returns its value.
    ///
    /// Other positions remain valid: erasure relinks nodes, it never moves
    /// them.
    ///
    /// # Panics
    /// Panics if `z` does not name a live element.
    pub fn erase(&mut self, z: NodeId) -> V {
        debug_assert!(self.get(z).is_some());
        let z_left = self.left(z);
        let z_right = self.right(z);

        let removed_color;
        let x;
        let x_parent;

        if let (Some(zl), Some(zr)) = (z_left, z_right) {
            // Two children: the in-order successor y takes z's place, with
            // z's color, and the balance debt moves to y's old position.
            let y = self.min_from(zr);
            x = self.right(y);
            self.set_parent(zl, Some(y));
            self.set_left(y, Some(zl));
            if y == zr {
                x_parent = Some(y);
            } else {
                x_parent = self.parent(y);
                if let Some(xi) = x {
                    self.set_parent(xi, x_parent);
                }
                let yp = x_parent.expect("successor below zr has a parent");
                self.set_left(yp, x);
                self.set_right(y, Some(zr));
                self.set_parent(zr, Some(y));
            }
            self.replace_child(z, Some(y));
            removed_color = self.color(y);
            let zc = self.color(z);
            self.set_color(y, zc);
        } else {
            // At most one child: splice z out directly.
            x = z_left.or(z_right);
            x_parent = self.parent(z);
            if let Some(xi) = x {
                self.set_parent(xi, x_parent);
            }
            self.replace_child(z, x);
            if self.leftmost == Some(z) {
                self.leftmost = match x {
                    Some(xi) => Some(self.min_from(xi)),
                    None => x_parent,
                };
            }
            if self.rightmost == Some(z) {
                self.rightmost = match x {
                    Some(xi) => Some(self.max_from(xi)),
                    None => x_parent,
                };
            }
            removed_color = self.color(z);
        }

        if removed_color == Color::Black {
            self.erase_fixup(x, x_parent);
        }
        self.len -= 1;
        self.free_node(z)
    }

    /// Erases every element equivalent to `key`; returns how many went.
    pub fn erase_key(&mut self, key: &P::Key) -> usize {
        let mut erased = 0;
        let mut cur = self.lower_bound(key);
        while let Some(id) = cur {
            if self.cmp.less(key, self.key_of(id)) {
                break;
            }
            // The successor survives the erase: relinking keeps ids stable.
            let next = self.next_id(id);
            self.erase(id);
            erased += 1;
            cur = next;
        }
        erased
    }

    /// Rewires `old`'s parent (or the root) to point at `new`.
    fn replace_child(&mut self, old: NodeId, new: Option<NodeId>) {
        let up = self.parent(old);
        match up {
            None => self.root = new,
            Some(p) if self.left(p) == Some(old) => self.set_left(p, new),
            Some(p) => self.set_right(p, new),
        }
        if let Some(n) = new {
            self.set_parent(n, up);
        }
    }

    /// Restores the black-height invariant after a black node left the tree
    /// above position `x` (tracked via `x_parent`, since `x` may be absent).
    fn erase_fixup(&mut self, mut x: Option<NodeId>, mut x_parent: Option<NodeId>) {
        while x != self.root && !self.is_red(x) {
            let Some(parent) = x_parent else { break };
            if self.left(parent) == x {
                let mut w = self
                    .right(parent)
                    .expect("black deficit implies a sibling");
                if self.is_red(Some(w)) {
                    self.set_color(w, Color::Black);
                    self.set_color(parent, Color::Red);
                    self.rotate_left(parent);
                    w = self.right(parent).expect("rotation preserves the sibling");
                }
                if !self.is_red(self.left(w)) && !self.is_red(self.right(w)) {
                    self.set_color(w, Color::Red);
                    x = Some(parent);
                    x_parent = self.parent(parent);
                } else {
                    if !self.is_red(self.right(w)) {
                        if let Some(wl) = self.left(w) {
                            self.set_color(wl, Color::Black);
                        }
                        self.set_color(w, Color::Red);
                        self.rotate_right(w);
                        w = self.right(parent).expect("rotation installs a sibling");
                    }
                    let pc = self.color(parent);
                    self.set_color(w, pc);
                    self.set_color(parent, Color::Black);
                    if let Some(wr) = self.right(w) {
                        self.set_color(wr, Color::Black);
                    }
                    self.rotate_left(parent);
                    break;
                }
            } else {
                let mut w = self
                    .left(parent)
                    .expect("black deficit implies a sibling");
                if self.is_red(Some(w)) {
                    self.set_color(w, Color::Black);
                    self.set_color(parent, Color::Red);
                    self.rotate_right(parent);
                    w = self.left(parent).expect("rotation preserves the sibling");
                }
                if !self.is_red(self.left(w)) && !self.is_red(self.right(w)) {
                    self.set_color(w, Color::Red);
                    x = Some(parent);
                    x_parent = self.parent(parent);
                } else {
                    if !self.is_red(self.left(w)) {
                        if let Some(wr) = self.right(w) {
                            self.set_color(wr, Color::Black);
                        }
                        self.set_color(w, Color::Red);
                        self.rotate_left(w);
                        w = self.left(parent).expect("rotation installs a sibling");
                    }
                    let pc = self.color(parent);
                    self.set_color(w, pc);
                    self.set_color(parent, Color::Black);
                    if let Some(wl) = self.left(w) {
                        self.set_color(wl, Color::Black);
                    }
                    self.rotate_right(parent);
                    break;
                }
            }
        }
        if let Some(xi) = x {
            self.set_color(xi, Color::Black);
        }
    }

    // ── whole-tree operations ──────────────────────────────────────────────

    /// Removes every element.
    ///
    /// Teardown is post-order with an explicit stack: children drop before
    /// their parents, and deep trees cannot overflow the call stack.
    pub fn clear(&mut self) {
        let mut stack = Vec::new();
        if let Some(r) = self.root {
            stack.push((r, false));
        }
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                self.nodes[id.index()].value = None;
            } else {
                stack.push((id, true));
                if let Some(r) = self.right(id) {
                    stack.push((r, false));
                }
                if let Some(l) = self.left(id) {
                    stack.push((l, false));
                }
            }
        }
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.leftmost = None;
        self.rightmost = None;
        self.len = 0;
    }

    /// Swaps the contents of two trees in O(1).
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }
}

impl<V, P, C> Clone for RbTree<V, P, C>
where
    V: Clone,
    P: KeyOf<V>,
    C: Comparator<P::Key> + Clone,
{
    /// Deep copy: the clone owns an independent slab with the same shape and
    /// the same colors.
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            free: self.free.clone(),
            root: self.root,
            leftmost: self.leftmost,
            rightmost: self.rightmost,
            len: self.len,
            cmp: self.cmp.clone(),
            _policy: PhantomData,
        }
    }
}

impl<V, P, C> PartialEq for RbTree<V, P, C>
where
    V: PartialEq,
    P: KeyOf<V>,
    C: Comparator<P::Key>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<V, P, C> fmt::Debug for RbTree<V, P, C>
where
    V: fmt::Debug,
    P: KeyOf<V>,
    C: Comparator<P::Key>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
