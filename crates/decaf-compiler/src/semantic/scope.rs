use decaf_common::Diagnostic;

use super::fork_table::{ForkTableArena, TableId};
use super::symbols::Symbol;

/// Bound name given to loop-body scopes; `inside_loop` keys off it.
pub const LOOP_BODY: &str = "Loop body";

/// Handle to one scope node inside a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

#[derive(Debug)]
struct ScopeNode {
    bound_name: String,
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    table: TableId,
}

/// The scope tree: one node per lexical scope, each wrapping one fork-table
/// layer. Nodes are arena-allocated with stable indices; parent links are
/// plain ids, so the parent back-references of the tree cost nothing to
/// maintain.
///
/// Nodes are created during scope decoration, populated during declaration
/// collection, re-linked during inheritance linking, and read-only after
/// that.
#[derive(Debug)]
pub struct ScopeTree {
    nodes: Vec<ScopeNode>,
    tables: ForkTableArena<String, Symbol>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// Create a tree holding only the global scope.
    pub fn new() -> Self {
        let mut tables = ForkTableArena::new();
        let root_table = tables.root();
        Self {
            nodes: vec![ScopeNode {
                bound_name: "Global".to_string(),
                parent: None,
                children: Vec::new(),
                table: root_table,
            }],
            tables,
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Append a new child scope whose table forks the parent's.
    pub fn child(&mut self, parent: ScopeId, bound_name: impl Into<String>) -> ScopeId {
        let table = self.tables.fork(self.node(parent).table);
        let id = ScopeId(self.nodes.len() as u32);
        self.nodes.push(ScopeNode {
            bound_name: bound_name.into(),
            parent: Some(parent),
            children: Vec::new(),
            table,
        });
        self.node_mut(parent).children.push(id);
        id
    }

    pub fn bound_name(&self, scope: ScopeId) -> &str {
        &self.node(scope).bound_name
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.node(scope).parent
    }

    pub fn children(&self, scope: ScopeId) -> &[ScopeId] {
        &self.node(scope).children
    }

    /// Detach `scope` from its current parent and attach it under
    /// `new_parent`, re-rooting its table as well.
    ///
    /// A self-reparent attempt is rejected with an error diagnostic and
    /// changes nothing; the caller decides whether to surface it.
    pub fn reparent(&mut self, scope: ScopeId, new_parent: ScopeId) -> Result<(), Diagnostic> {
        if scope == new_parent {
            return Err(Diagnostic::error(format!(
                "scope '{}' cannot become its own parent",
                self.bound_name(scope)
            )));
        }

        if let Some(old_parent) = self.node(scope).parent {
            self.node_mut(old_parent).children.retain(|&c| c != scope);
        }
        self.node_mut(new_parent).children.push(scope);
        self.node_mut(scope).parent = Some(new_parent);

        let new_parent_table = self.node(new_parent).table;
        let table = self.node(scope).table;
        self.tables.reparent(table, new_parent_table);
        Ok(())
    }

    /// True when this scope is a loop body or is nested inside one.
    ///
    /// The climb carries a hop budget bounded by the node count, since a
    /// cyclic inheritance reparent can make an ancestor chain circular.
    pub fn inside_loop(&self, scope: ScopeId) -> bool {
        let mut current = Some(scope);
        for _ in 0..=self.nodes.len() {
            let Some(id) = current else {
                return false;
            };
            if self.bound_name(id) == LOOP_BODY {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    // ------------------------------------------------------------------
    // Symbol table access
    // ------------------------------------------------------------------

    /// Bind `name` locally in this scope, returning any prior local binding.
    pub fn define(&mut self, scope: ScopeId, name: impl Into<String>, symbol: Symbol) -> Option<Symbol> {
        let table = self.node(scope).table;
        self.tables.put(table, name.into(), symbol)
    }

    /// Look up a name through the scope's table chain.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.tables.get(self.node(scope).table, &name.to_string())
    }

    /// Look up a name in this scope's local table only.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let table = self.node(scope).table;
        if self.tables.contains(table, &name.to_string()) {
            self.tables.get(table, &name.to_string())
        } else {
            None
        }
    }

    pub fn contains_local(&self, scope: ScopeId, name: &str) -> bool {
        self.tables.contains(self.node(scope).table, &name.to_string())
    }

    /// Look up a name starting at the *parent* of this scope's table,
    /// i.e. what an unshadowed lookup would see. Used for override checks.
    pub fn lookup_inherited(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let parent = self.tables.parent(self.node(scope).table)?;
        self.tables.get(parent, &name.to_string())
    }

    /// This scope's local bindings, in key order.
    pub fn local_entries(&self, scope: ScopeId) -> impl Iterator<Item = (&String, &Symbol)> {
        self.tables.iter_local(self.node(scope).table)
    }

    // ------------------------------------------------------------------
    // Pretty-printing
    // ------------------------------------------------------------------

    /// Render the whole tree: 2-space indentation per nesting level, each
    /// node as `<boundName>:` with its `<key> ==> <value>` entries, and
    /// child nodes wrapped in `\\` ... `//` delimiter lines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(self.root(), 0, &mut out);
        out
    }

    fn render_node(&self, scope: ScopeId, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        out.push_str(&format!("{}{}:\n", indent, self.bound_name(scope)));
        for (key, symbol) in self.local_entries(scope) {
            out.push_str(&format!("{}  {} ==> {}\n", indent, key, symbol));
        }
        for &child in self.children(scope) {
            out.push_str(&format!("{}\\\\\n", indent));
            self.render_node(child, depth + 1, out);
            out.push_str(&format!("{}//\n", indent));
        }
    }

    fn node(&self, scope: ScopeId) -> &ScopeNode {
        &self.nodes[scope.0 as usize]
    }

    fn node_mut(&mut self, scope: ScopeId) -> &mut ScopeNode {
        &mut self.nodes[scope.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::symbols::VariableSymbol;
    use crate::semantic::types::Type;
    use decaf_common::Span;

    fn var(name: &str, ty: Type) -> Symbol {
        Symbol::Variable(VariableSymbol {
            name: name.to_string(),
            ty,
            defined_at: Span::dummy(),
        })
    }

    #[test]
    fn child_sees_parent_symbols() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.define(root, "x", var("x", Type::Int));
        let child = tree.child(root, "Subblock");
        assert!(tree.lookup(child, "x").is_some());
        assert!(tree.lookup_local(child, "x").is_none());
    }

    #[test]
    fn define_returns_prior_local() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        assert!(tree.define(root, "x", var("x", Type::Int)).is_none());
        assert!(tree.define(root, "x", var("x", Type::Bool)).is_some());
    }

    #[test]
    fn inside_loop_detection() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let fn_body = tree.child(root, "FnDecl (body) main");
        assert!(!tree.inside_loop(fn_body));
        let loop_body = tree.child(fn_body, LOOP_BODY);
        assert!(tree.inside_loop(loop_body));
        let nested = tree.child(loop_body, "Subblock");
        assert!(tree.inside_loop(nested));
    }

    #[test]
    fn reparent_moves_child_lists_and_table() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let a = tree.child(root, "Class Declaration of A");
        let b = tree.child(root, "Class Declaration of B");
        tree.define(a, "field", var("field", Type::Int));

        tree.reparent(b, a).unwrap();
        assert_eq!(tree.parent(b), Some(a));
        assert!(tree.children(a).contains(&b));
        assert!(!tree.children(root).contains(&b));
        // Inherited member now resolves through the chain.
        assert!(tree.lookup(b, "field").is_some());
    }

    #[test]
    fn self_reparent_is_rejected() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let a = tree.child(root, "Class Declaration of A");
        assert!(tree.reparent(a, a).is_err());
        assert_eq!(tree.parent(a), Some(root));
    }

    #[test]
    fn repeated_reparent_equals_last() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let a = tree.child(root, "Class Declaration of A");
        let b = tree.child(root, "Class Declaration of B");
        let c = tree.child(root, "Class Declaration of C");
        tree.reparent(c, a).unwrap();
        tree.reparent(c, b).unwrap();
        assert_eq!(tree.parent(c), Some(b));
        assert!(!tree.children(a).contains(&c));
        assert!(tree.children(b).contains(&c));
    }

    #[test]
    fn render_shows_entries_and_delimiters() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.define(root, "x", var("x", Type::Int));
        let child = tree.child(root, "Subblock");
        tree.define(child, "y", var("y", Type::Bool));

        let dump = tree.render();
        assert!(dump.starts_with("Global:\n  x ==> Variable of type int\n"));
        assert!(dump.contains("\\\\\n  Subblock:\n    y ==> Variable of type bool\n//\n"));
    }
}
