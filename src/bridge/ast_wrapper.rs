//! Script view of syntax-tree nodes.
//!
//! Besides `kind`, `category`, `_native`, the per-kind fields and the shared
//! traversal methods, syntax-tree wrappers expose mutation:
//!
//! - `clone()` - wrapper over a detached deep copy
//! - `replaceWith(node)` - `true` if the tree accepted the replacement
//! - `remove()` - `true` if the node was unlinked
//! - `withX(node)` - a new detached node equal to this one with slot `X`
//!   replaced; available on binary, unary, ternary, `if`, `while` and
//!   `return` nodes
//!
//! Refusals (a detached node, a category mismatch) are reported to the sink
//! and surface as `false` or `null`.

use std::rc::Rc;

use crate::{
    ast::{AstNode, AstRef, Category, Expression, Field, Literal, NodeKind, Statement},
    bridge::traverse::{self, Cursor},
    events::{EventKind, LogSink},
    value::{arg, DynamicValue, NativeHandle, Properties},
    Result,
};

/// A syntax-tree node with the sink its wrapper reports to.
#[derive(Clone)]
pub struct AstCursor {
    node: AstRef,
    sink: Rc<dyn LogSink>,
}

impl AstCursor {
    /// Creates a cursor.
    #[must_use]
    pub fn new(node: AstRef, sink: Rc<dyn LogSink>) -> Self {
        Self { node, sink }
    }

    fn at(&self, node: AstRef) -> Self {
        Self::new(node, self.sink.clone())
    }

    fn wrap_id(&self, id: crate::ast::NodeId) -> DynamicValue {
        self.at(AstRef::new(self.node.tree().clone(), id)).wrap()
    }

    fn wrap_opt(&self, id: Option<crate::ast::NodeId>) -> DynamicValue {
        id.map_or(DynamicValue::Null, |id| self.wrap_id(id))
    }

    fn wrap_ids(&self, ids: &[crate::ast::NodeId]) -> DynamicValue {
        DynamicValue::array(ids.iter().map(|id| self.wrap_id(*id)))
    }

    fn warn(&self, action: &str, error: &crate::Error) {
        self.sink
            .record(EventKind::Warning)
            .message(format!("{action} on {} failed: {error}", self.node.kind()));
    }

    /// Resolves a setter argument: a wrapped node, `null`, or a primitive
    /// that becomes a literal in this node's tree.
    fn operand(&self, value: &DynamicValue) -> Result<Option<AstRef>> {
        match value {
            DynamicValue::Null => Ok(None),
            other => match other.native() {
                Some(handle) => handle.as_ast_node().map(|n| Some(n.clone())),
                None => {
                    let id = self.node.tree().borrow_mut().add(Literal::from_dynamic(other));
                    Ok(Some(AstRef::new(self.node.tree().clone(), id)))
                }
            },
        }
    }

    fn expression_fields(&self, props: &mut Properties, expr: &Expression) {
        match expr {
            Expression::MethodCall {
                receiver,
                owner,
                name,
                descriptor,
                args,
                is_static,
            } => {
                props.insert("name", name.as_str());
                props.insert("owner", owner.as_str());
                props.insert("descriptor", descriptor.as_str());
                props.insert("receiver", self.wrap_opt(*receiver));
                props.insert("args", self.wrap_ids(args));
                props.insert("isStatic", *is_static);
            }
            Expression::FieldAccess {
                receiver,
                owner,
                name,
                descriptor,
                is_static,
            } => {
                props.insert("name", name.as_str());
                props.insert("owner", owner.as_str());
                props.insert("descriptor", descriptor.as_str());
                props.insert("receiver", self.wrap_opt(*receiver));
                props.insert("isStatic", *is_static);
            }
            Expression::Binary { op, left, right } => {
                props.insert("op", op.symbol());
                props.insert("left", self.wrap_id(*left));
                props.insert("right", self.wrap_id(*right));
                props.insert("isComparison", op.is_comparison());
                props.insert("isLogical", op.is_logical());
                props.insert("isAssignment", op.is_assignment());
            }
            Expression::Unary { op, operand } => {
                props.insert("op", op.symbol());
                props.insert("operand", self.wrap_id(*operand));
                props.insert("isPrefix", op.is_prefix());
            }
            Expression::Literal(lit) => {
                props.insert("value", lit.to_dynamic());
                props.insert("literalType", lit.type_name());
                props.insert("isNull", matches!(lit, Literal::Null));
                props.insert("isString", matches!(lit, Literal::String(_)));
                props.insert(
                    "isNumeric",
                    matches!(lit, Literal::Int(_) | Literal::Long(_) | Literal::Float(_) | Literal::Double(_)),
                );
                props.insert("isConstant", true);
            }
            Expression::VarRef { name, ty } => {
                props.insert("name", name.as_str());
                props.insert("type", ty.as_str());
            }
            Expression::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                props.insert("condition", self.wrap_id(*condition));
                props.insert("thenExpr", self.wrap_id(*then_expr));
                props.insert("elseExpr", self.wrap_id(*else_expr));
            }
            Expression::Cast { target_type, operand } | Expression::InstanceOf { operand, target_type } => {
                props.insert("targetType", target_type.as_str());
                props.insert("operand", self.wrap_id(*operand));
            }
            Expression::ArrayAccess { array, index } => {
                props.insert("array", self.wrap_id(*array));
                props.insert("index", self.wrap_id(*index));
            }
            Expression::New { class_name, args } => {
                props.insert("className", class_name.as_str());
                props.insert("args", self.wrap_ids(args));
            }
            Expression::This { class_name } => {
                props.insert("className", class_name.as_str());
            }
        }
    }

    fn statement_fields(&self, props: &mut Properties, stmt: &Statement) {
        match stmt {
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                props.insert("condition", self.wrap_id(*condition));
                props.insert("thenBranch", self.wrap_id(*then_branch));
                props.insert("elseBranch", self.wrap_opt(*else_branch));
            }
            Statement::While { condition, body } | Statement::DoWhile { body, condition } => {
                props.insert("condition", self.wrap_id(*condition));
                props.insert("body", self.wrap_id(*body));
            }
            Statement::For {
                init,
                condition,
                update,
                body,
            } => {
                props.insert("init", self.wrap_ids(init));
                props.insert("condition", self.wrap_opt(*condition));
                props.insert("update", self.wrap_ids(update));
                props.insert("body", self.wrap_id(*body));
            }
            Statement::ForEach {
                variable,
                iterable,
                body,
            } => {
                props.insert("variable", self.wrap_id(*variable));
                props.insert("iterable", self.wrap_id(*iterable));
                props.insert("body", self.wrap_id(*body));
            }
            Statement::Return { value } => {
                props.insert("value", self.wrap_opt(*value));
            }
            Statement::Block { statements } => {
                props.insert("statements", self.wrap_ids(statements));
            }
            Statement::ExprStmt { expression } => {
                props.insert("expression", self.wrap_id(*expression));
            }
            Statement::VarDecl { name, ty, initializer } => {
                props.insert("name", name.as_str());
                props.insert("type", ty.as_str());
                props.insert("initializer", self.wrap_opt(*initializer));
            }
            Statement::Throw { exception } => {
                props.insert("exception", self.wrap_id(*exception));
            }
            Statement::TryCatch { body, catches, finally } => {
                props.insert("body", self.wrap_id(*body));
                let catches = catches.iter().map(|c| {
                    DynamicValue::Object(
                        Properties::new()
                            .with(
                                "types",
                                DynamicValue::array(c.exception_types.iter().map(|t| DynamicValue::from(t.as_str()))),
                            )
                            .with("variable", c.variable.as_str())
                            .with("body", self.wrap_id(c.body)),
                    )
                });
                props.insert("catches", DynamicValue::array(catches));
                props.insert("finally", self.wrap_opt(*finally));
            }
            Statement::Switch { selector, cases } => {
                props.insert("selector", self.wrap_id(*selector));
                let cases = cases.iter().map(|c| {
                    DynamicValue::Object(
                        Properties::new()
                            .with("labels", DynamicValue::array(c.labels.iter().map(Literal::to_dynamic)))
                            .with("isDefault", c.labels.is_empty())
                            .with("body", self.wrap_ids(&c.body)),
                    )
                });
                props.insert("cases", DynamicValue::array(cases));
            }
            Statement::Break { label } | Statement::Continue { label } => {
                props.insert("label", label.clone());
            }
        }
    }

    fn install_mutations(&self, props: &mut Properties) {
        let this = self.clone();
        props.insert(
            "clone",
            DynamicValue::function("clone", move |_| {
                Ok(Some(this.node.deep_clone().map_or(DynamicValue::Null, |c| this.at(c).wrap())))
            }),
        );

        let this = self.clone();
        props.insert(
            "replaceWith",
            DynamicValue::function("replaceWith", move |args| {
                let replacement = arg(args, 0);
                let Some(NativeHandle::AstNode(other)) = replacement.native() else {
                    return Ok(Some(DynamicValue::Bool(false)));
                };
                let done = match this.node.replace_with(other) {
                    Ok(()) => true,
                    Err(e) => {
                        this.warn("replaceWith", &e);
                        false
                    }
                };
                Ok(Some(DynamicValue::Bool(done)))
            }),
        );

        let this = self.clone();
        props.insert(
            "remove",
            DynamicValue::function("remove", move |_| {
                let done = match this.node.remove() {
                    Ok(()) => true,
                    Err(e) => {
                        this.warn("remove", &e);
                        false
                    }
                };
                Ok(Some(DynamicValue::Bool(done)))
            }),
        );
    }

    fn install_setters(&self, props: &mut Properties, kind: NodeKind) {
        let fields: &[Field] = match kind {
            NodeKind::Binary => &[Field::Left, Field::Right],
            NodeKind::Unary => &[Field::Operand],
            NodeKind::Ternary => &[Field::Condition, Field::ThenExpr, Field::ElseExpr],
            NodeKind::If => &[Field::Condition, Field::ThenBranch, Field::ElseBranch],
            NodeKind::While => &[Field::Condition, Field::Body],
            NodeKind::Return => &[Field::Value],
            _ => &[],
        };
        for &field in fields {
            let name = setter_name(field);
            let this = self.clone();
            props.insert(
                name.clone(),
                DynamicValue::function(name.clone(), move |args| {
                    let built = this
                        .operand(&arg(args, 0))
                        .and_then(|value| this.node.with_field(field, value.as_ref()));
                    match built {
                        Ok(node) => Ok(Some(this.at(node).wrap())),
                        Err(e) => {
                            this.warn(&name, &e);
                            Ok(Some(DynamicValue::Null))
                        }
                    }
                }),
            );
        }
    }
}

fn setter_name(field: Field) -> String {
    let name = field.to_string();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("with{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "with".to_string(),
    }
}

impl Cursor for AstCursor {
    fn knows_kind(tag: &str) -> bool {
        matches!(tag, "Expression" | "Statement") || NodeKind::from_tag(tag).is_some()
    }

    fn has_kind(&self, tag: &str) -> bool {
        let Some(kind) = self.node.node_kind() else {
            return false;
        };
        match tag {
            "Expression" => kind.category() == Category::Expression,
            "Statement" => kind.category() == Category::Statement,
            _ => NodeKind::from_tag(tag) == Some(kind),
        }
    }

    fn children(&self) -> Vec<Self> {
        self.node.children().into_iter().map(|c| self.at(c)).collect()
    }

    fn ancestors(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut current = self.node.parent();
        while let Some(parent) = current {
            current = parent.parent();
            out.push(self.at(parent));
        }
        out
    }

    fn wrap(&self) -> DynamicValue {
        let mut props = Properties::with_capacity(20);
        props.insert("kind", self.node.kind());
        props.insert("_native", NativeHandle::AstNode(self.node.clone()));

        if let Some(node) = self.node.node() {
            props.insert("category", <&'static str>::from(node.category()));
            match &node {
                AstNode::Expr(expr) => self.expression_fields(&mut props, expr),
                AstNode::Stmt(stmt) => self.statement_fields(&mut props, stmt),
            }
            traverse::install(&mut props, self);
            self.install_mutations(&mut props);
            self.install_setters(&mut props, node.kind());
        }
        DynamicValue::Object(props)
    }

    fn sink(&self) -> &Rc<dyn LogSink> {
        &self.sink
    }
}

/// Wraps a syntax-tree node.
#[must_use]
pub fn wrap_ast(node: AstRef, sink: Rc<dyn LogSink>) -> DynamicValue {
    AstCursor::new(node, sink).wrap()
}
