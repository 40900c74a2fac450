//! Kind-keyed rewriting over a shared syntax tree.
//!
//! An [`AstEditor`] collects handlers, then [`AstEditor::apply`] runs them.
//! Each handler walks the tree once, in registration order, over a snapshot
//! of the node ids taken when that handler starts. Nodes that an earlier edit
//! detached are skipped. Edits take effect immediately, so a later handler
//! sees what an earlier one did.
//!
//! No borrow of the tree is held while a handler runs; handlers are free to
//! inspect the tree, build new nodes in it or edit it themselves.

use crate::{
    ast::{AstRef, NodeId, NodeKind, SharedTree},
    Error,
};

/// What a handler wants done with the node it was given.
#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    /// Leave the node alone.
    Keep,
    /// Unlink the node from its parent.
    Remove,
    /// Put another node in its place.
    With(AstRef),
}

/// Outcome of one accepted or rejected edit.
#[derive(Debug, Clone, PartialEq)]
pub enum EditAction {
    /// The node was unlinked.
    Removed,
    /// The node was replaced.
    Replaced,
    /// The edit was rejected by the tree.
    Failed(Error),
}

/// One edit attempted during [`AstEditor::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedEdit {
    /// Node the handler was called with.
    pub node: NodeId,
    /// Its kind at the time.
    pub kind: NodeKind,
    /// What happened.
    pub action: EditAction,
}

/// Result of [`AstEditor::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditSummary {
    /// Handler invocations.
    pub visited: usize,
    /// Every attempted edit in order.
    pub edits: Vec<AppliedEdit>,
}

impl EditSummary {
    /// Number of edits the tree accepted.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.edits
            .iter()
            .filter(|e| !matches!(e.action, EditAction::Failed(_)))
            .count()
    }

    /// Number of rejected edits.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.edits.len() - self.applied()
    }
}

type EditHandler<'h> = Box<dyn FnMut(&AstRef) -> Replacement + 'h>;

/// Collects per-kind handlers for one tree and applies them.
pub struct AstEditor<'h> {
    tree: SharedTree,
    handlers: Vec<(NodeKind, EditHandler<'h>)>,
}

impl<'h> AstEditor<'h> {
    /// Creates an editor over `tree`.
    #[must_use]
    pub fn new(tree: SharedTree) -> Self {
        Self {
            tree,
            handlers: Vec::new(),
        }
    }

    /// Registers a handler for nodes of `kind`.
    pub fn on(&mut self, kind: NodeKind, handler: impl FnMut(&AstRef) -> Replacement + 'h) -> &mut Self {
        self.handlers.push((kind, Box::new(handler)));
        self
    }

    /// Registers a handler for method calls.
    pub fn on_method_call(&mut self, handler: impl FnMut(&AstRef) -> Replacement + 'h) -> &mut Self {
        self.on(NodeKind::MethodCall, handler)
    }

    /// Registers a handler for field accesses.
    pub fn on_field_access(&mut self, handler: impl FnMut(&AstRef) -> Replacement + 'h) -> &mut Self {
        self.on(NodeKind::FieldAccess, handler)
    }

    /// Registers a handler for binary expressions.
    pub fn on_binary_expr(&mut self, handler: impl FnMut(&AstRef) -> Replacement + 'h) -> &mut Self {
        self.on(NodeKind::Binary, handler)
    }

    /// Registers a handler for unary expressions.
    pub fn on_unary_expr(&mut self, handler: impl FnMut(&AstRef) -> Replacement + 'h) -> &mut Self {
        self.on(NodeKind::Unary, handler)
    }

    /// Registers a handler for `if` statements.
    pub fn on_if(&mut self, handler: impl FnMut(&AstRef) -> Replacement + 'h) -> &mut Self {
        self.on(NodeKind::If, handler)
    }

    /// Registers a handler for `return` statements.
    pub fn on_return(&mut self, handler: impl FnMut(&AstRef) -> Replacement + 'h) -> &mut Self {
        self.on(NodeKind::Return, handler)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Runs every handler over the tree and consumes the editor.
    pub fn apply(mut self) -> EditSummary {
        let mut summary = EditSummary::default();
        for (kind, handler) in &mut self.handlers {
            let snapshot = {
                let tree = self.tree.borrow();
                match tree.root() {
                    Some(root) => tree.preorder(root),
                    None => Vec::new(),
                }
            };

            for id in snapshot {
                let matches = {
                    let tree = self.tree.borrow();
                    tree.kind(id) == Some(*kind) && tree.is_attached(id)
                };
                if !matches {
                    continue;
                }

                let target = AstRef::new(self.tree.clone(), id);
                summary.visited += 1;
                let result = match handler(&target) {
                    Replacement::Keep => continue,
                    Replacement::With(node) if node == target => continue,
                    Replacement::Remove => target.remove().map(|()| EditAction::Removed),
                    Replacement::With(node) => target.replace_with(&node).map(|()| EditAction::Replaced),
                };
                summary.edits.push(AppliedEdit {
                    node: id,
                    kind: *kind,
                    action: result.unwrap_or_else(EditAction::Failed),
                });
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstNode, AstTree, BinaryOperator, Expression, Literal, Statement};

    // { a + 1; b + 2; return; }
    fn tree() -> SharedTree {
        let mut t = AstTree::new();
        let mut stmts = Vec::new();
        for (name, n) in [("a", 1), ("b", 2)] {
            let var = t.add(Expression::VarRef {
                name: name.into(),
                ty: "int".into(),
            });
            let lit = t.add(Literal::Int(n));
            let sum = t.add(Expression::Binary {
                op: BinaryOperator::Add,
                left: var,
                right: lit,
            });
            stmts.push(t.add(Statement::ExprStmt { expression: sum }));
        }
        stmts.push(t.add(Statement::Return { value: None }));
        let root = t.add(Statement::Block { statements: stmts });
        t.set_root(root);
        t.into_shared()
    }

    #[test]
    fn test_keep_changes_nothing() {
        let tree = tree();
        let before = tree.borrow().len();
        let mut editor = AstEditor::new(tree.clone());
        editor.on_binary_expr(|_| Replacement::Keep);
        let summary = editor.apply();
        assert_eq!(summary.visited, 2);
        assert_eq!(summary.applied(), 0);
        assert_eq!(tree.borrow().len(), before);
    }

    #[test]
    fn test_replace_then_second_handler_sees_result() {
        let tree = tree();
        let mut editor = AstEditor::new(tree.clone());
        let factory = tree.clone();
        editor.on_binary_expr(move |_| {
            let id = factory.borrow_mut().add(Literal::Int(0));
            Replacement::With(AstRef::new(factory.clone(), id))
        });
        let mut literals = 0;
        editor.on(NodeKind::Literal, |_| {
            literals += 1;
            Replacement::Keep
        });
        let summary = editor.apply();
        assert_eq!(summary.applied(), 2);
        assert_eq!(literals, 2);

        let t = tree.borrow();
        let root = t.root().unwrap();
        assert!(!t
            .preorder(root)
            .iter()
            .any(|id| t.kind(*id) == Some(NodeKind::Binary)));
    }

    #[test]
    fn test_remove_from_list_and_failed_edits() {
        let tree = tree();
        let mut editor = AstEditor::new(tree.clone());
        editor.on(NodeKind::ExprStmt, |_| Replacement::Remove);
        // Required slot of the (already detached) statement: never visited.
        editor.on_binary_expr(|_| Replacement::Remove);
        editor.on_return(|_| Replacement::Remove);
        let summary = editor.apply();

        assert_eq!(summary.visited, 3);
        assert_eq!(summary.applied(), 3);
        let t = tree.borrow();
        let root = t.root().unwrap();
        assert_eq!(t.node(root), Some(&AstNode::Stmt(Statement::Block { statements: vec![] })));
    }

    #[test]
    fn test_required_slot_removal_is_reported() {
        let tree = tree();
        let mut editor = AstEditor::new(tree);
        editor.on(NodeKind::Literal, |_| Replacement::Remove);
        let summary = editor.apply();
        assert_eq!(summary.failed(), 2);
        assert!(matches!(
            summary.edits[0].action,
            EditAction::Failed(Error::Shape(_))
        ));
    }
}
