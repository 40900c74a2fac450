//! Arena storage for syntax trees.
//!
//! Nodes are never freed. Removing or replacing a node unlinks it from its
//! parent and leaves it in the arena as a detached subtree, so handles held by
//! a script stay valid; they just stop being reachable from the root.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    ast::{AstNode, Category, Field, NodeId, NodeKind},
    ast::node::SlotMut,
    Error, Result,
};

#[derive(Debug, Clone)]
struct Entry {
    node: AstNode,
    parent: Option<NodeId>,
}

/// A syntax tree: an arena of nodes plus an optional root.
#[derive(Debug, Clone, Default)]
pub struct AstTree {
    entries: Vec<Entry>,
    root: Option<NodeId>,
}

/// A tree shared between the dispatcher and the handles given to scripts.
pub type SharedTree = Rc<RefCell<AstTree>>;

fn copy_into(source: &AstTree, id: NodeId, dest: &mut Vec<Entry>) -> Option<NodeId> {
    let mut node = source.node(id)?.clone();
    let mut missing = false;
    node.remap_children(&mut |child| {
        copy_into(source, child, dest).unwrap_or_else(|| {
            missing = true;
            child
        })
    });
    if missing {
        return None;
    }
    let new_id = NodeId::from_index(dest.len());
    for child in node.children() {
        if let Some(entry) = dest.get_mut(child.index()) {
            entry.parent = Some(new_id);
        }
    }
    dest.push(Entry { node, parent: None });
    Some(new_id)
}

impl AstTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the tree for sharing.
    #[must_use]
    pub fn into_shared(self) -> SharedTree {
        Rc::new(RefCell::new(self))
    }

    /// Adds a node whose children were added before it.
    ///
    /// The new node starts detached; children become attached to it.
    pub fn add(&mut self, node: impl Into<AstNode>) -> NodeId {
        let node = node.into();
        let id = NodeId::from_index(self.entries.len());
        for child in node.children() {
            if let Some(entry) = self.entries.get_mut(child.index()) {
                entry.parent = Some(id);
            }
        }
        self.entries.push(Entry { node, parent: None });
        id
    }

    /// Makes `id` the root.
    pub fn set_root(&mut self, id: NodeId) {
        if let Some(entry) = self.entries.get_mut(id.index()) {
            entry.parent = None;
            self.root = Some(id);
        }
    }

    /// The root node, if one was set.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes ever allocated, detached ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no node was ever added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Borrows a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&AstNode> {
        self.entries.get(id.index()).map(|e| &e.node)
    }

    /// Kind of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(AstNode::kind)
    }

    /// Parent of a node; `None` for the root and detached nodes.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entries.get(id.index()).and_then(|e| e.parent)
    }

    /// Children in source order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).map(AstNode::children).unwrap_or_default()
    }

    /// Returns true if `id` is reachable from the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current == root
    }

    /// `id` followed by all its descendants, in pre-order.
    #[must_use]
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.node(id).is_none() {
            return out;
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let children = self.children(next);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Strict descendants of `id`, in pre-order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut all = self.preorder(id);
        if !all.is_empty() {
            all.remove(0);
        }
        all
    }

    /// Nearest proper ancestor of the given kind.
    #[must_use]
    pub fn find_ancestor(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(candidate) = current {
            if self.kind(candidate) == Some(kind) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// Copies the subtree at `id` from `source` into this tree.
    ///
    /// The copy is detached and every node in it has a fresh id.
    pub fn import(&mut self, source: &AstTree, id: NodeId) -> Option<NodeId> {
        copy_into(source, id, &mut self.entries)
    }

    /// Structural copy of the subtree at `id` with fresh ids, detached.
    pub fn deep_clone(&mut self, id: NodeId) -> Option<NodeId> {
        let mut scratch = Vec::new();
        let scratch_root = copy_into(self, id, &mut scratch)?;
        let scratch = AstTree {
            entries: scratch,
            root: Some(scratch_root),
        };
        self.import(&scratch, scratch_root)
    }

    fn category(&self, id: NodeId) -> Result<Category> {
        self.node(id).map(AstNode::category).ok_or(Error::Detached)
    }

    /// Points whichever slot of `parent` holds `old` at `new` instead.
    fn relink(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        let Some(entry) = self.entries.get_mut(parent.index()) else {
            return false;
        };
        for slot in entry.node.slots_mut() {
            match slot {
                SlotMut::Required(id) if *id == old => {
                    *id = new;
                    return true;
                }
                SlotMut::Optional(Some(id)) if *id == old => {
                    *id = new;
                    return true;
                }
                SlotMut::List(ids) => {
                    if let Some(pos) = ids.iter().position(|id| *id == old) {
                        ids[pos] = new;
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    /// Puts `replacement` where `target` is.
    ///
    /// A replacement that is already part of a tree structure (attached, or
    /// the child of some other node) is deep-cloned first, so a subtree never
    /// has two parents and replacing a node with its own ancestor cannot form
    /// a cycle. Replacing a node with itself does nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::CategoryMismatch`] if the two nodes differ in base category
    /// - [`Error::Detached`] if `target` is not reachable from the root
    pub fn replace(&mut self, target: NodeId, replacement: NodeId) -> Result<()> {
        let expected = self.category(target)?;
        let found = self.category(replacement)?;
        if expected != found {
            return Err(Error::CategoryMismatch {
                expected: expected.into(),
                found: found.into(),
            });
        }
        if !self.is_attached(target) {
            return Err(Error::Detached);
        }
        if target == replacement {
            return Ok(());
        }

        let in_use = self.parent(replacement).is_some() || self.root == Some(replacement);
        let replacement = if in_use {
            self.deep_clone(replacement).ok_or(Error::Detached)?
        } else {
            replacement
        };

        match self.parent(target) {
            None => self.root = Some(replacement),
            Some(parent) => {
                if !self.relink(parent, target, replacement) {
                    return Err(Error::Detached);
                }
                self.entries[replacement.index()].parent = Some(parent);
            }
        }
        self.entries[target.index()].parent = None;
        Ok(())
    }

    /// Unlinks `target` from its parent.
    ///
    /// Entries of a child list are dropped from the list and optional slots
    /// are cleared. The root and nodes in required slots cannot be removed.
    ///
    /// # Errors
    ///
    /// - [`Error::Detached`] if `target` is not reachable from the root
    /// - [`Error::Shape`] if `target` is the root or fills a required slot
    pub fn remove(&mut self, target: NodeId) -> Result<()> {
        if !self.is_attached(target) {
            return Err(Error::Detached);
        }
        let Some(parent) = self.parent(target) else {
            return Err(Error::Shape("Cannot remove the root node".to_string()));
        };

        let mut removed = false;
        let mut required = false;
        for slot in self.entries[parent.index()].node.slots_mut() {
            match slot {
                SlotMut::Required(id) if *id == target => {
                    required = true;
                    break;
                }
                SlotMut::Optional(opt) if *opt == Some(target) => {
                    *opt = None;
                    removed = true;
                    break;
                }
                SlotMut::List(ids) => {
                    if let Some(pos) = ids.iter().position(|id| *id == target) {
                        ids.remove(pos);
                        removed = true;
                        break;
                    }
                }
                _ => {}
            }
        }

        if required {
            let kind = self.kind(parent).map(|k| k.to_string()).unwrap_or_default();
            return Err(Error::Shape(format!(
                "Cannot remove a required child of {kind}"
            )));
        }
        if !removed {
            return Err(Error::Detached);
        }
        self.entries[target.index()].parent = None;
        Ok(())
    }

    /// Builds a copy of `id` whose `field` slot holds `value`.
    ///
    /// The copy and its untouched children are fresh and detached; the
    /// original is not modified. `value` is spliced in directly when it is a
    /// free-standing node and deep-cloned otherwise. Passing `None` clears an
    /// optional slot.
    ///
    /// # Errors
    ///
    /// - [`Error::Shape`] if the node has no such slot, or `None` targets a required one
    /// - [`Error::CategoryMismatch`] if `value` has the wrong base category
    pub fn with_field(&mut self, id: NodeId, field: Field, value: Option<NodeId>) -> Result<NodeId> {
        let kind = self.kind(id).ok_or(Error::Detached)?;
        let mut probe = self.node(id).cloned().ok_or(Error::Detached)?;
        if probe.field_slot_mut(field).is_none() {
            return Err(Error::Shape(format!("{kind} has no '{field}' slot")));
        }
        if let Some(value) = value {
            let found = self.category(value)?;
            let expected = field.category();
            if found != expected {
                return Err(Error::CategoryMismatch {
                    expected: expected.into(),
                    found: found.into(),
                });
            }
        }

        let copy = self.deep_clone(id).ok_or(Error::Detached)?;
        let value = match value {
            Some(v) if self.parent(v).is_some() || self.root == Some(v) => {
                Some(self.deep_clone(v).ok_or(Error::Detached)?)
            }
            other => other,
        };

        let old = match self.entries[copy.index()].node.field_slot_mut(field) {
            Some(SlotMut::Required(slot)) => match value {
                Some(v) => Some(std::mem::replace(slot, v)),
                None => {
                    return Err(Error::Shape(format!("'{field}' of {kind} is required")));
                }
            },
            Some(SlotMut::Optional(slot)) => std::mem::replace(slot, value),
            _ => return Err(Error::Shape(format!("{kind} has no '{field}' slot"))),
        };

        if let Some(old) = old {
            self.entries[old.index()].parent = None;
        }
        if let Some(v) = value {
            self.entries[v.index()].parent = Some(copy);
        }
        Ok(copy)
    }
}

/// Handle to one node of a shared tree.
///
/// Two handles are equal when they name the same node of the same tree.
#[derive(Clone)]
pub struct AstRef {
    tree: SharedTree,
    id: NodeId,
}

impl AstRef {
    /// Creates a handle.
    #[must_use]
    pub fn new(tree: SharedTree, id: NodeId) -> Self {
        Self { tree, id }
    }

    /// The node's id.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The tree the node lives in.
    #[must_use]
    pub fn tree(&self) -> &SharedTree {
        &self.tree
    }

    /// Returns true if both handles point into the same tree.
    #[must_use]
    pub fn same_tree(&self, other: &AstRef) -> bool {
        Rc::ptr_eq(&self.tree, &other.tree)
    }

    fn at(&self, id: NodeId) -> AstRef {
        AstRef::new(self.tree.clone(), id)
    }

    /// Kind of the node; `None` only for a dangling id.
    #[must_use]
    pub fn node_kind(&self) -> Option<NodeKind> {
        self.tree.borrow().kind(self.id)
    }

    /// Kind tag, `"Unknown"` for a dangling id.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.node_kind().map_or("Unknown", Into::into)
    }

    /// Copy of the node's payload.
    #[must_use]
    pub fn node(&self) -> Option<AstNode> {
        self.tree.borrow().node(self.id).cloned()
    }

    /// Parent handle.
    #[must_use]
    pub fn parent(&self) -> Option<AstRef> {
        let parent = self.tree.borrow().parent(self.id);
        parent.map(|p| self.at(p))
    }

    /// Child handles in source order.
    #[must_use]
    pub fn children(&self) -> Vec<AstRef> {
        let ids = self.tree.borrow().children(self.id);
        ids.into_iter().map(|id| self.at(id)).collect()
    }

    /// Strict descendants in pre-order.
    #[must_use]
    pub fn descendants(&self) -> Vec<AstRef> {
        let ids = self.tree.borrow().descendants(self.id);
        ids.into_iter().map(|id| self.at(id)).collect()
    }

    /// Nearest ancestor of the given kind.
    #[must_use]
    pub fn find_ancestor(&self, kind: NodeKind) -> Option<AstRef> {
        let found = self.tree.borrow().find_ancestor(self.id, kind);
        found.map(|id| self.at(id))
    }

    /// Returns true if the node is reachable from its tree's root.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.tree.borrow().is_attached(self.id)
    }

    /// Detached structural copy in the same tree.
    pub fn deep_clone(&self) -> Option<AstRef> {
        let copy = self.tree.borrow_mut().deep_clone(self.id);
        copy.map(|id| self.at(id))
    }

    /// Brings `other` into this handle's tree, copying it if it lives elsewhere.
    fn local(&self, other: &AstRef) -> Result<NodeId> {
        if self.same_tree(other) {
            return Ok(other.id);
        }
        let source = other.tree.borrow();
        self.tree
            .borrow_mut()
            .import(&source, other.id)
            .ok_or(Error::Detached)
    }

    /// Replaces this node with `replacement`, which may live in another tree.
    ///
    /// # Errors
    ///
    /// See [`AstTree::replace`].
    pub fn replace_with(&self, replacement: &AstRef) -> Result<()> {
        let found = replacement.node().map(|n| n.category()).ok_or(Error::Detached)?;
        let expected = self.node().map(|n| n.category()).ok_or(Error::Detached)?;
        if found != expected {
            return Err(Error::CategoryMismatch {
                expected: expected.into(),
                found: found.into(),
            });
        }
        let local = self.local(replacement)?;
        self.tree.borrow_mut().replace(self.id, local)
    }

    /// Unlinks this node from its parent.
    ///
    /// # Errors
    ///
    /// See [`AstTree::remove`].
    pub fn remove(&self) -> Result<()> {
        self.tree.borrow_mut().remove(self.id)
    }

    /// Builds a copy of this node with `field` set to `value`.
    ///
    /// # Errors
    ///
    /// See [`AstTree::with_field`].
    pub fn with_field(&self, field: Field, value: Option<&AstRef>) -> Result<AstRef> {
        let value = value.map(|v| self.local(v)).transpose()?;
        let copy = self.tree.borrow_mut().with_field(self.id, field, value)?;
        Ok(self.at(copy))
    }
}

impl PartialEq for AstRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_tree(other) && self.id == other.id
    }
}

impl fmt::Debug for AstRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AstRef({} {})", self.kind(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, Expression, Literal, Statement};

    // if (x > 0) { return 1; } else { return 2; }
    fn sample() -> (AstTree, Vec<NodeId>) {
        let mut t = AstTree::new();
        let x = t.add(Expression::VarRef {
            name: "x".into(),
            ty: "int".into(),
        });
        let zero = t.add(Literal::Int(0));
        let cond = t.add(Expression::Binary {
            op: BinaryOperator::Gt,
            left: x,
            right: zero,
        });
        let one = t.add(Literal::Int(1));
        let ret1 = t.add(Statement::Return { value: Some(one) });
        let then_block = t.add(Statement::Block {
            statements: vec![ret1],
        });
        let two = t.add(Literal::Int(2));
        let ret2 = t.add(Statement::Return { value: Some(two) });
        let if_stmt = t.add(Statement::If {
            condition: cond,
            then_branch: then_block,
            else_branch: Some(ret2),
        });
        let body = t.add(Statement::Block {
            statements: vec![if_stmt],
        });
        t.set_root(body);
        (t, vec![x, zero, cond, one, ret1, then_block, two, ret2, if_stmt, body])
    }

    #[test]
    fn test_preorder_and_ancestors() {
        let (t, ids) = sample();
        let root = t.root().unwrap();
        let order: Vec<NodeKind> = t.preorder(root).iter().map(|id| t.kind(*id).unwrap()).collect();
        assert_eq!(order[0], NodeKind::Block);
        assert_eq!(order[1], NodeKind::If);
        assert_eq!(order[2], NodeKind::Binary);
        assert_eq!(order.len(), 10);
        assert_eq!(t.descendants(root).len(), 9);

        assert_eq!(t.find_ancestor(ids[3], NodeKind::If), Some(ids[8]));
        assert_eq!(t.find_ancestor(ids[3], NodeKind::Switch), None);
        assert!(t.is_attached(ids[0]));
    }

    #[test]
    fn test_replace_rewires_parent() {
        let (mut t, ids) = sample();
        let lit = t.add(Literal::Int(42));
        t.replace(ids[3], lit).unwrap();

        assert_eq!(t.parent(lit), Some(ids[4]));
        assert!(!t.is_attached(ids[3]));
        assert_eq!(
            t.node(ids[4]),
            Some(&AstNode::Stmt(Statement::Return { value: Some(lit) }))
        );
    }

    #[test]
    fn test_replace_rejects_category_and_detached() {
        let (mut t, ids) = sample();
        let err = t.replace(ids[3], ids[4]).unwrap_err();
        assert!(matches!(err, Error::CategoryMismatch { .. }));

        let lit = t.add(Literal::Int(1));
        let orphan = t.add(Literal::Int(2));
        assert_eq!(t.replace(orphan, lit), Err(Error::Detached));
    }

    #[test]
    fn test_replace_with_attached_node_clones() {
        let (mut t, ids) = sample();
        let before = t.len();
        // Put `x` where `0` is.
        t.replace(ids[1], ids[0]).unwrap();
        assert!(t.is_attached(ids[0]));
        assert_eq!(t.len(), before + 1);
        assert_eq!(t.children(ids[2]).len(), 2);
        assert_ne!(t.children(ids[2])[1], ids[0]);
    }

    #[test]
    fn test_replace_root() {
        let (mut t, _) = sample();
        let empty = t.add(Statement::Block { statements: vec![] });
        let old_root = t.root().unwrap();
        t.replace(old_root, empty).unwrap();
        assert_eq!(t.root(), Some(empty));
        assert!(!t.is_attached(old_root));
    }

    #[test]
    fn test_remove_rules() {
        let (mut t, ids) = sample();
        // Optional else branch.
        t.remove(ids[7]).unwrap();
        assert!(!t.is_attached(ids[7]));
        // List entry.
        t.remove(ids[4]).unwrap();
        assert!(t.children(ids[5]).is_empty());
        // Required slot, root, detached.
        assert!(matches!(t.remove(ids[2]), Err(Error::Shape(_))));
        assert!(matches!(t.remove(ids[9]), Err(Error::Shape(_))));
        assert_eq!(t.remove(ids[4]), Err(Error::Detached));
    }

    #[test]
    fn test_deep_clone_is_fresh_and_detached() {
        let (mut t, ids) = sample();
        let copy = t.deep_clone(ids[8]).unwrap();
        assert_ne!(copy, ids[8]);
        assert_eq!(t.parent(copy), None);
        assert_eq!(t.preorder(copy).len(), t.preorder(ids[8]).len());
        for (a, b) in t.preorder(copy).into_iter().zip(t.preorder(ids[8])) {
            assert_ne!(a, b);
            assert_eq!(t.kind(a), t.kind(b));
        }
    }

    #[test]
    fn test_with_field_builds_new_node() {
        let (mut t, ids) = sample();
        let five = t.add(Literal::Int(5));
        let copy = t.with_field(ids[2], Field::Right, Some(five)).unwrap();

        assert_ne!(copy, ids[2]);
        assert_eq!(t.children(copy)[1], five);
        assert_eq!(t.children(ids[2])[1], ids[1]);
        assert!(t.with_field(ids[2], Field::Body, None).is_err());

        let no_else = t.with_field(ids[8], Field::ElseBranch, None).unwrap();
        assert_eq!(t.children(no_else).len(), 2);
    }

    #[test]
    fn test_cross_tree_replace() {
        let (t, ids) = sample();
        let shared = t.into_shared();
        let mut other = AstTree::new();
        let lit = other.add(Literal::String("x".into()));
        let other = other.into_shared();

        let target = AstRef::new(shared.clone(), ids[6]);
        target.replace_with(&AstRef::new(other, lit)).unwrap();
        assert!(!target.is_attached());
        let ret = AstRef::new(shared, ids[7]);
        let new_child = ret.children().remove(0);
        assert_eq!(
            new_child.node(),
            Some(AstNode::Expr(Expression::Literal(Literal::String("x".into()))))
        );
    }
}
