use std::collections::{BTreeMap, BTreeSet};

/// Handle to one fork-table layer inside a [`ForkTableArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(pub(crate) u32);

/// One layer of a fork table: local bindings plus whiteouts hiding
/// inherited keys.
#[derive(Debug)]
struct Layer<K, V> {
    parent: Option<TableId>,
    back: BTreeMap<K, V>,
    whiteouts: BTreeSet<K>,
}

/// Arena of fork-table layers.
///
/// A fork table is a layered mapping: a layer sees its own bindings
/// (`back`), plus those of its parent chain except where a whiteout hides
/// an inherited key. Forking a layer gives an empty child; reparenting
/// re-roots a layer under a different parent (used to splice class
/// inheritance into name lookup).
///
/// Layers are stored in a flat `Vec` and linked by parent ids, so parent
/// back-references are plain indices. Ordered maps keep local iteration
/// deterministic. Chain walks carry a hop budget bounded by the arena size
/// so that a cyclic reparent cannot loop forever.
#[derive(Debug, Default)]
pub struct ForkTableArena<K, V> {
    layers: Vec<Layer<K, V>>,
}

impl<K: Ord + Clone, V> ForkTableArena<K, V> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Create a new root layer with no parent.
    pub fn root(&mut self) -> TableId {
        self.push_layer(None)
    }

    /// Create a child layer of `parent` with empty bindings and whiteouts.
    pub fn fork(&mut self, parent: TableId) -> TableId {
        self.push_layer(Some(parent))
    }

    fn push_layer(&mut self, parent: Option<TableId>) -> TableId {
        let id = TableId(self.layers.len() as u32);
        self.layers.push(Layer {
            parent,
            back: BTreeMap::new(),
            whiteouts: BTreeSet::new(),
        });
        id
    }

    /// Re-root `table` under `new_parent`. The caller is responsible for
    /// rejecting self-reparent attempts before the table level.
    pub fn reparent(&mut self, table: TableId, new_parent: TableId) {
        self.layer_mut(table).parent = Some(new_parent);
    }

    pub fn parent(&self, table: TableId) -> Option<TableId> {
        self.layer(table).parent
    }

    /// Insert a local binding, clearing any whiteout for the key.
    /// Returns the prior *local* value, if any.
    pub fn put(&mut self, table: TableId, key: K, value: V) -> Option<V> {
        let layer = self.layer_mut(table);
        layer.whiteouts.remove(&key);
        layer.back.insert(key, value)
    }

    /// Remove a key from this layer's view.
    ///
    /// A local binding is removed and returned. A binding visible only
    /// through the parent chain is hidden with a whiteout instead; the
    /// parent is never mutated.
    pub fn remove(&mut self, table: TableId, key: &K) -> Option<V> {
        if let Some(prior) = self.layer_mut(table).back.remove(key) {
            return Some(prior);
        }
        let parent = self.layer(table).parent;
        let inherited = match parent {
            Some(parent) => self.chain_contains(parent, key),
            None => false,
        };
        if inherited {
            self.layer_mut(table).whiteouts.insert(key.clone());
        }
        None
    }

    /// Look up a key through the chain, respecting whiteouts.
    pub fn get(&self, table: TableId, key: &K) -> Option<&V> {
        let mut current = table;
        // Hop budget: an honest chain never exceeds the layer count.
        for _ in 0..=self.layers.len() {
            let layer = self.layer(current);
            if let Some(value) = layer.back.get(key) {
                return Some(value);
            }
            if layer.whiteouts.contains(key) {
                return None;
            }
            current = layer.parent?;
        }
        None
    }

    /// True iff the key is bound locally in this layer.
    pub fn contains(&self, table: TableId, key: &K) -> bool {
        self.layer(table).back.contains_key(key)
    }

    /// True iff the key is visible through the chain, respecting whiteouts.
    pub fn chain_contains(&self, table: TableId, key: &K) -> bool {
        self.get(table, key).is_some()
    }

    /// Iterate this layer's local bindings only, in key order.
    pub fn iter_local(&self, table: TableId) -> impl Iterator<Item = (&K, &V)> {
        self.layer(table).back.iter()
    }

    pub fn local_len(&self, table: TableId) -> usize {
        self.layer(table).back.len()
    }

    fn layer(&self, table: TableId) -> &Layer<K, V> {
        &self.layers[table.0 as usize]
    }

    fn layer_mut(&mut self, table: TableId) -> &mut Layer<K, V> {
        &mut self.layers[table.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> ForkTableArena<String, i32> {
        ForkTableArena::new()
    }

    fn key(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn put_and_get() {
        let mut t = arena();
        let root = t.root();
        assert_eq!(t.put(root, key("x"), 1), None);
        assert_eq!(t.get(root, &key("x")), Some(&1));
        assert_eq!(t.get(root, &key("y")), None);
    }

    #[test]
    fn put_returns_prior_local_value() {
        let mut t = arena();
        let root = t.root();
        t.put(root, key("x"), 1);
        assert_eq!(t.put(root, key("x"), 2), Some(1));
        assert_eq!(t.get(root, &key("x")), Some(&2));
    }

    #[test]
    fn fork_sees_parent_bindings() {
        let mut t = arena();
        let root = t.root();
        t.put(root, key("x"), 1);
        let child = t.fork(root);
        assert_eq!(t.get(child, &key("x")), Some(&1));
        assert!(t.chain_contains(child, &key("x")));
        assert!(!t.contains(child, &key("x")));
    }

    #[test]
    fn local_binding_shadows_parent() {
        let mut t = arena();
        let root = t.root();
        t.put(root, key("x"), 1);
        let child = t.fork(root);
        t.put(child, key("x"), 2);
        assert_eq!(t.get(child, &key("x")), Some(&2));
        assert_eq!(t.get(root, &key("x")), Some(&1));
    }

    #[test]
    fn remove_local_returns_value() {
        let mut t = arena();
        let root = t.root();
        t.put(root, key("x"), 1);
        assert_eq!(t.remove(root, &key("x")), Some(1));
        assert_eq!(t.get(root, &key("x")), None);
    }

    #[test]
    fn remove_inherited_whiteouts_without_touching_parent() {
        let mut t = arena();
        let root = t.root();
        t.put(root, key("x"), 1);
        let child = t.fork(root);
        assert_eq!(t.remove(child, &key("x")), None);
        assert_eq!(t.get(child, &key("x")), None);
        assert!(!t.chain_contains(child, &key("x")));
        // Parent unaffected.
        assert_eq!(t.get(root, &key("x")), Some(&1));
    }

    #[test]
    fn put_clears_whiteout() {
        let mut t = arena();
        let root = t.root();
        t.put(root, key("x"), 1);
        let child = t.fork(root);
        t.remove(child, &key("x"));
        assert_eq!(t.get(child, &key("x")), None);
        t.put(child, key("x"), 3);
        assert_eq!(t.get(child, &key("x")), Some(&3));
    }

    #[test]
    fn remove_absent_key_adds_no_whiteout() {
        let mut t = arena();
        let root = t.root();
        let child = t.fork(root);
        assert_eq!(t.remove(child, &key("ghost")), None);
        // A later parent insert is still visible; nothing was hidden.
        t.put(root, key("ghost"), 9);
        assert_eq!(t.get(child, &key("ghost")), Some(&9));
    }

    #[test]
    fn fork_then_remove_all_matches_parent() {
        let mut t = arena();
        let root = t.root();
        t.put(root, key("a"), 1);
        t.put(root, key("b"), 2);
        let child = t.fork(root);
        t.put(child, key("c"), 3);
        t.remove(child, &key("c"));
        assert_eq!(t.get(child, &key("a")), t.get(root, &key("a")));
        assert_eq!(t.get(child, &key("b")), t.get(root, &key("b")));
        assert_eq!(t.get(child, &key("c")), None);
    }

    #[test]
    fn iter_local_skips_inherited() {
        let mut t = arena();
        let root = t.root();
        t.put(root, key("a"), 1);
        let child = t.fork(root);
        t.put(child, key("b"), 2);
        let local: Vec<_> = t.iter_local(child).map(|(k, v)| (k.clone(), *v)).collect();
        assert_eq!(local, vec![(key("b"), 2)]);
    }

    #[test]
    fn reparent_redirects_lookup() {
        let mut t = arena();
        let old_parent = t.root();
        t.put(old_parent, key("x"), 1);
        let new_parent = t.root();
        t.put(new_parent, key("x"), 2);
        let child = t.fork(old_parent);
        t.reparent(child, new_parent);
        assert_eq!(t.get(child, &key("x")), Some(&2));
    }

    #[test]
    fn cyclic_chain_terminates() {
        let mut t = arena();
        let a = t.root();
        let b = t.fork(a);
        t.reparent(a, b);
        assert_eq!(t.get(a, &key("missing")), None);
        assert!(!t.chain_contains(b, &key("missing")));
    }
}
