//! Structural checks over a subtree.

use strum::{Display, IntoStaticStr};

use crate::{
    ast::{AstNode, AstTree, Category, Expression, Literal, NodeId, NodeKind, Statement},
    value::{DynamicValue, Properties},
};

/// What part of well-formedness a finding concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum ValidationCategory {
    Structure,
    Type,
    Semantic,
}

/// How bad a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum Severity {
    Warning,
    Error,
}

/// One finding.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Category
    pub category: ValidationCategory,
    /// Severity
    pub severity: Severity,
    /// Offending node
    pub node: NodeId,
    /// Human-readable description
    pub message: String,
}

/// All findings for one subtree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    /// Findings in pre-order of the offending nodes.
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// True when nothing of [`Severity::Error`] was found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.iter().all(|e| e.severity < Severity::Error)
    }

    /// `{valid, errors: [{category, severity, message}]}`
    #[must_use]
    pub fn to_dynamic(&self) -> DynamicValue {
        let errors = self.errors.iter().map(|e| {
            DynamicValue::Object(
                Properties::new()
                    .with("category", <&'static str>::from(e.category))
                    .with("severity", <&'static str>::from(e.severity))
                    .with("message", e.message.as_str()),
            )
        });
        DynamicValue::Object(
            Properties::new()
                .with("valid", self.is_valid())
                .with("errors", DynamicValue::array(errors)),
        )
    }

    fn push(&mut self, category: ValidationCategory, severity: Severity, node: NodeId, message: String) {
        self.errors.push(ValidationError {
            category,
            severity,
            node,
            message,
        });
    }
}

/// Child ids paired with the category their slot requires.
fn expected_children(node: &AstNode) -> Vec<(NodeId, Category)> {
    use Category::{Expression as E, Statement as S};

    let mut out = Vec::new();
    match node {
        AstNode::Expr(_) => {
            // Every expression slot holds an expression.
            out.extend(node.children().into_iter().map(|id| (id, E)));
        }
        AstNode::Stmt(stmt) => match stmt {
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push((*condition, E));
                out.push((*then_branch, S));
                out.extend(else_branch.map(|id| (id, S)));
            }
            Statement::While { condition, body } | Statement::DoWhile { body, condition } => {
                out.push((*condition, E));
                out.push((*body, S));
            }
            Statement::For {
                init,
                condition,
                update,
                body,
            } => {
                out.extend(init.iter().map(|id| (*id, S)));
                out.extend(condition.map(|id| (id, E)));
                out.extend(update.iter().map(|id| (*id, E)));
                out.push((*body, S));
            }
            Statement::ForEach {
                variable,
                iterable,
                body,
            } => {
                out.push((*variable, S));
                out.push((*iterable, E));
                out.push((*body, S));
            }
            Statement::Return { value } => out.extend(value.map(|id| (id, E))),
            Statement::Block { statements } => out.extend(statements.iter().map(|id| (*id, S))),
            Statement::ExprStmt { expression } => out.push((*expression, E)),
            Statement::VarDecl { initializer, .. } => out.extend(initializer.map(|id| (id, E))),
            Statement::Throw { exception } => out.push((*exception, E)),
            Statement::TryCatch {
                body,
                catches,
                finally,
            } => {
                out.push((*body, S));
                out.extend(catches.iter().map(|c| (c.body, S)));
                out.extend(finally.map(|id| (id, S)));
            }
            Statement::Switch { selector, cases } => {
                out.push((*selector, E));
                for case in cases {
                    out.extend(case.body.iter().map(|id| (*id, S)));
                }
            }
            Statement::Break { .. } | Statement::Continue { .. } => {}
        },
    }
    out
}

fn has_ancestor(tree: &AstTree, id: NodeId, kinds: &[NodeKind]) -> bool {
    let mut current = tree.parent(id);
    while let Some(parent) = current {
        if tree.kind(parent).is_some_and(|k| kinds.contains(&k)) {
            return true;
        }
        current = tree.parent(parent);
    }
    false
}

const LOOPS: [NodeKind; 4] = [NodeKind::While, NodeKind::DoWhile, NodeKind::For, NodeKind::ForEach];

/// Checks the subtree rooted at `id`.
///
/// Reports children whose parent link does not point back, children of the
/// wrong category, unlabeled `break`/`continue` outside a loop (or switch),
/// empty variable and member names, and literal conditions that are not
/// booleans.
#[must_use]
pub fn validate(tree: &AstTree, id: NodeId) -> ValidationResult {
    use Severity::{Error as E, Warning as W};
    use ValidationCategory::{Semantic, Structure, Type};

    let mut result = ValidationResult::default();
    let Some(_) = tree.node(id) else {
        result.push(Structure, E, id, format!("Node {id} does not exist"));
        return result;
    };

    for node_id in tree.preorder(id) {
        let Some(node) = tree.node(node_id) else {
            continue;
        };
        let kind = node.kind();

        for (child, expected) in expected_children(node) {
            match tree.node(child) {
                None => result.push(Structure, E, node_id, format!("{kind} refers to missing node {child}")),
                Some(child_node) => {
                    if tree.parent(child) != Some(node_id) {
                        result.push(
                            Structure,
                            E,
                            child,
                            format!("{} under {kind} is detached from its parent", child_node.kind()),
                        );
                    }
                    if child_node.category() != expected {
                        result.push(
                            Structure,
                            E,
                            child,
                            format!("{kind} expects {expected}, found {}", child_node.kind()),
                        );
                    }
                }
            }
        }

        match node {
            AstNode::Stmt(Statement::Break { label: None }) => {
                let mut scopes = LOOPS.to_vec();
                scopes.push(NodeKind::Switch);
                if !has_ancestor(tree, node_id, &scopes) {
                    result.push(Semantic, E, node_id, "break outside of loop or switch".to_string());
                }
            }
            AstNode::Stmt(Statement::Continue { label: None }) => {
                if !has_ancestor(tree, node_id, &LOOPS) {
                    result.push(Semantic, E, node_id, "continue outside of loop".to_string());
                }
            }
            AstNode::Stmt(Statement::VarDecl { name, .. }) | AstNode::Expr(Expression::VarRef { name, .. })
                if name.trim().is_empty() =>
            {
                result.push(Semantic, E, node_id, format!("{kind} has an empty variable name"));
            }
            AstNode::Expr(Expression::MethodCall { name, .. } | Expression::FieldAccess { name, .. })
                if name.trim().is_empty() =>
            {
                result.push(Structure, E, node_id, format!("{kind} has an empty member name"));
            }
            AstNode::Stmt(
                Statement::If { condition, .. }
                | Statement::While { condition, .. }
                | Statement::DoWhile { condition, .. },
            ) => {
                if let Some(AstNode::Expr(Expression::Literal(lit))) = tree.node(*condition) {
                    if !matches!(lit, Literal::Bool(_)) {
                        result.push(
                            Type,
                            W,
                            *condition,
                            format!("{kind} condition is a {} literal", lit.type_name()),
                        );
                    }
                }
            }
            _ => {}
        }
    }
    result
}
