//! Script-side construction of syntax-tree fragments.
//!
//! Nodes are built detached inside a scratch tree owned by the factory. When
//! a built node is handed to `replaceWith` on a node of a decompiled method,
//! the tree of the target copies it in.
//!
//! Wherever an expression is expected, a primitive argument becomes a
//! literal. Wherever a statement is expected, an expression is wrapped into
//! an expression statement.

use std::rc::Rc;

use crate::{
    ast::{
        AstNode, AstRef, AstTree, BinaryOperator, Category, Expression, Literal, NodeId, SharedTree,
        SourceType, Statement, UnaryOperator,
    },
    bridge::ast_wrapper::wrap_ast,
    events::{EventKind, LogSink},
    value::{arg, DynamicValue, Properties},
    Error, Result,
};

/// Builds detached syntax-tree nodes for scripts.
pub struct AstFactory {
    tree: SharedTree,
    sink: Rc<dyn LogSink>,
}

type Builder = fn(&AstFactory, &[DynamicValue]) -> Result<NodeId>;

impl AstFactory {
    /// Creates a factory with an empty scratch tree.
    #[must_use]
    pub fn new(sink: Rc<dyn LogSink>) -> Self {
        Self {
            tree: AstTree::new().into_shared(),
            sink,
        }
    }

    /// The scratch tree new nodes are built in.
    #[must_use]
    pub fn tree(&self) -> &SharedTree {
        &self.tree
    }

    /// Handle to a node of the scratch tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> AstRef {
        AstRef::new(self.tree.clone(), id)
    }

    fn add(&self, node: impl Into<AstNode>) -> NodeId {
        self.tree.borrow_mut().add(node)
    }

    /// Makes `node` usable as a fresh child in the scratch tree.
    ///
    /// Nodes from other trees, and scratch nodes that already have a parent,
    /// are copied.
    fn adopt(&self, node: &AstRef) -> Result<NodeId> {
        if Rc::ptr_eq(node.tree(), &self.tree) {
            let in_use = self.tree.borrow().parent(node.id()).is_some();
            if !in_use {
                return Ok(node.id());
            }
            return self.tree.borrow_mut().deep_clone(node.id()).ok_or(Error::Detached);
        }
        let source = node.tree().borrow();
        self.tree
            .borrow_mut()
            .import(&source, node.id())
            .ok_or(Error::Detached)
    }

    fn category(&self, id: NodeId) -> Option<Category> {
        self.tree.borrow().node(id).map(AstNode::category)
    }

    /// An expression operand: a wrapped expression or a primitive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CategoryMismatch`] for a wrapped statement.
    pub fn expr(&self, value: &DynamicValue) -> Result<NodeId> {
        let Some(handle) = value.native() else {
            return Ok(self.add(Literal::from_dynamic(value)));
        };
        let id = self.adopt(handle.as_ast_node()?)?;
        match self.category(id) {
            Some(Category::Expression) => Ok(id),
            _ => Err(Error::CategoryMismatch {
                expected: Category::Expression.into(),
                found: Category::Statement.into(),
            }),
        }
    }

    /// Like [`AstFactory::expr`], but `null` leaves the slot empty.
    ///
    /// # Errors
    ///
    /// See [`AstFactory::expr`].
    pub fn opt_expr(&self, value: &DynamicValue) -> Result<Option<NodeId>> {
        if value.is_null() {
            return Ok(None);
        }
        self.expr(value).map(Some)
    }

    /// A statement operand; expressions become expression statements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shape`] for anything that is not a wrapped node.
    pub fn stmt(&self, value: &DynamicValue) -> Result<NodeId> {
        let Some(handle) = value.native() else {
            return Err(Error::Shape(format!("Expected a statement, got {}", value.type_name())));
        };
        let id = self.adopt(handle.as_ast_node()?)?;
        match self.category(id) {
            Some(Category::Statement) => Ok(id),
            Some(Category::Expression) => Ok(self.add(Statement::ExprStmt { expression: id })),
            None => Err(Error::Detached),
        }
    }

    fn opt_stmt(&self, value: &DynamicValue) -> Result<Option<NodeId>> {
        if value.is_null() {
            return Ok(None);
        }
        self.stmt(value).map(Some)
    }

    fn literal(&self, literal: Literal) -> NodeId {
        self.add(literal)
    }

    fn binary(&self, op: BinaryOperator, args: &[DynamicValue]) -> Result<NodeId> {
        let left = self.expr(&arg(args, 0))?;
        let right = self.expr(&arg(args, 1))?;
        Ok(self.add(Expression::Binary { op, left, right }))
    }

    fn unary(&self, op: UnaryOperator, args: &[DynamicValue]) -> Result<NodeId> {
        let operand = self.expr(&arg(args, 0))?;
        Ok(self.add(Expression::Unary { op, operand }))
    }

    fn call_args(&self, args: &[DynamicValue]) -> Result<Vec<NodeId>> {
        args.iter().skip(2).map(|a| self.expr(a)).collect()
    }

    fn var(&self, name: &DynamicValue, ty: &str) -> Result<NodeId> {
        let name = name
            .as_str()
            .ok_or_else(|| Error::Shape("Variable name must be a string".to_string()))?;
        Ok(self.add(Expression::VarRef {
            name: name.to_string(),
            ty: ty.to_string(),
        }))
    }

    fn emit(&self, name: &str, built: Result<NodeId>) -> DynamicValue {
        match built {
            Ok(id) => wrap_ast(self.node(id), self.sink.clone()),
            Err(e) => {
                self.sink
                    .record(EventKind::Warning)
                    .message(format!("factory.{name}: {e}"));
                DynamicValue::Null
            }
        }
    }

    /// The script `factory` object.
    pub fn to_dynamic(self: &Rc<Self>) -> DynamicValue {
        let mut props = Properties::with_capacity(64);
        for (name, build) in builders() {
            let this = self.clone();
            props.insert(
                name,
                DynamicValue::function(name, move |args| Ok(Some(this.emit(name, build(&this, args))))),
            );
        }
        for (alias, target) in [
            ("intLiteral", "intLit"),
            ("stringLiteral", "stringLit"),
            ("boolLiteral", "boolLit"),
            ("nullLiteral", "nullLit"),
        ] {
            if let Some(f) = props.get(target).cloned() {
                props.insert(alias, f);
            }
        }
        DynamicValue::Object(props)
    }
}

fn text(value: &DynamicValue) -> String {
    match value {
        DynamicValue::Str(s) => s.clone(),
        DynamicValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn entry(name: &'static str, build: Builder) -> (&'static str, Builder) {
    (name, build)
}

#[allow(clippy::cast_possible_truncation)]
fn builders() -> Vec<(&'static str, Builder)> {
    vec![
        entry("intLit", |f, a| Ok(f.literal(Literal::Int(arg(a, 0).as_number() as i32)))),
        entry("longLit", |f, a| Ok(f.literal(Literal::Long(arg(a, 0).as_number() as i64)))),
        entry("floatLit", |f, a| Ok(f.literal(Literal::Float(arg(a, 0).as_number() as f32)))),
        entry("doubleLit", |f, a| Ok(f.literal(Literal::Double(arg(a, 0).as_number())))),
        entry("boolLit", |f, a| Ok(f.literal(Literal::Bool(arg(a, 0).is_truthy())))),
        entry("stringLit", |f, a| Ok(f.literal(Literal::String(text(&arg(a, 0)))))),
        entry("nullLit", |f, _| Ok(f.literal(Literal::Null))),
        entry("varRef", |f, a| {
            let ty = SourceType::from_dynamic(&arg(a, 1)).to_string();
            f.var(&arg(a, 0), &ty)
        }),
        entry("intVar", |f, a| f.var(&arg(a, 0), "int")),
        entry("boolVar", |f, a| f.var(&arg(a, 0), "boolean")),
        entry("add", |f, a| f.binary(BinaryOperator::Add, a)),
        entry("sub", |f, a| f.binary(BinaryOperator::Sub, a)),
        entry("mul", |f, a| f.binary(BinaryOperator::Mul, a)),
        entry("div", |f, a| f.binary(BinaryOperator::Div, a)),
        entry("mod", |f, a| f.binary(BinaryOperator::Rem, a)),
        entry("eq", |f, a| f.binary(BinaryOperator::Eq, a)),
        entry("ne", |f, a| f.binary(BinaryOperator::Ne, a)),
        entry("lt", |f, a| f.binary(BinaryOperator::Lt, a)),
        entry("le", |f, a| f.binary(BinaryOperator::Le, a)),
        entry("gt", |f, a| f.binary(BinaryOperator::Gt, a)),
        entry("ge", |f, a| f.binary(BinaryOperator::Ge, a)),
        entry("and", |f, a| f.binary(BinaryOperator::And, a)),
        entry("or", |f, a| f.binary(BinaryOperator::Or, a)),
        entry("assign", |f, a| f.binary(BinaryOperator::Assign, a)),
        entry("binary", |f, a| {
            let symbol = arg(a, 1);
            let op = symbol
                .as_str()
                .and_then(BinaryOperator::from_symbol)
                .ok_or_else(|| Error::Shape(format!("Unknown binary operator '{symbol}'")))?;
            f.binary(op, &[arg(a, 0), arg(a, 2)])
        }),
        entry("not", |f, a| f.unary(UnaryOperator::Not, a)),
        entry("neg", |f, a| f.unary(UnaryOperator::Neg, a)),
        entry("preIncr", |f, a| f.unary(UnaryOperator::PreIncr, a)),
        entry("postIncr", |f, a| f.unary(UnaryOperator::PostIncr, a)),
        entry("preDecr", |f, a| f.unary(UnaryOperator::PreDecr, a)),
        entry("postDecr", |f, a| f.unary(UnaryOperator::PostDecr, a)),
        entry("ternary", |f, a| {
            let condition = f.expr(&arg(a, 0))?;
            let then_expr = f.expr(&arg(a, 1))?;
            let else_expr = f.expr(&arg(a, 2))?;
            Ok(f.add(Expression::Ternary {
                condition,
                then_expr,
                else_expr,
            }))
        }),
        entry("methodCall", |f, a| {
            if a.len() < 2 {
                return Err(Error::Shape("methodCall requires a receiver and a name".to_string()));
            }
            let receiver = f.opt_expr(&a[0])?;
            let args = f.call_args(a)?;
            Ok(f.add(Expression::MethodCall {
                receiver,
                owner: "unknown".to_string(),
                name: text(&a[1]),
                descriptor: String::new(),
                args,
                is_static: false,
            }))
        }),
        entry("staticCall", |f, a| {
            if a.len() < 2 {
                return Err(Error::Shape("staticCall requires an owner and a name".to_string()));
            }
            let args = f.call_args(a)?;
            Ok(f.add(Expression::MethodCall {
                receiver: None,
                owner: text(&a[0]),
                name: text(&a[1]),
                descriptor: String::new(),
                args,
                is_static: true,
            }))
        }),
        entry("fieldAccess", |f, a| {
            let receiver = f.opt_expr(&arg(a, 0))?;
            Ok(f.add(Expression::FieldAccess {
                receiver,
                owner: "unknown".to_string(),
                name: text(&arg(a, 1)),
                descriptor: String::new(),
                is_static: false,
            }))
        }),
        entry("staticField", |f, a| {
            Ok(f.add(Expression::FieldAccess {
                receiver: None,
                owner: text(&arg(a, 0)),
                name: text(&arg(a, 1)),
                descriptor: String::new(),
                is_static: true,
            }))
        }),
        entry("block", |f, a| {
            let statements = a
                .iter()
                .filter(|s| !s.is_null())
                .map(|s| f.stmt(s))
                .collect::<Result<Vec<_>>>()?;
            Ok(f.add(Statement::Block { statements }))
        }),
        entry("ifStmt", |f, a| {
            let condition = f.expr(&arg(a, 0))?;
            let then_branch = f.stmt(&arg(a, 1))?;
            Ok(f.add(Statement::If {
                condition,
                then_branch,
                else_branch: None,
            }))
        }),
        entry("ifElse", |f, a| {
            let condition = f.expr(&arg(a, 0))?;
            let then_branch = f.stmt(&arg(a, 1))?;
            let else_branch = f.opt_stmt(&arg(a, 2))?;
            Ok(f.add(Statement::If {
                condition,
                then_branch,
                else_branch,
            }))
        }),
        entry("whileLoop", |f, a| {
            let condition = f.expr(&arg(a, 0))?;
            let body = f.stmt(&arg(a, 1))?;
            Ok(f.add(Statement::While { condition, body }))
        }),
        entry("returnStmt", |f, a| {
            let value = f.opt_expr(&arg(a, 0))?;
            Ok(f.add(Statement::Return { value }))
        }),
        entry("returnVoid", |f, _| Ok(f.add(Statement::Return { value: None }))),
        entry("throwStmt", |f, a| {
            let exception = f.expr(&arg(a, 0))?;
            Ok(f.add(Statement::Throw { exception }))
        }),
        entry("breakStmt", |f, a| {
            Ok(f.add(Statement::Break {
                label: arg(a, 0).as_str().map(str::to_string),
            }))
        }),
        entry("continueStmt", |f, a| {
            Ok(f.add(Statement::Continue {
                label: arg(a, 0).as_str().map(str::to_string),
            }))
        }),
        entry("exprStmt", |f, a| {
            let expression = f.expr(&arg(a, 0))?;
            Ok(f.add(Statement::ExprStmt { expression }))
        }),
    ]
}

impl std::fmt::Debug for AstFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AstFactory({} scratch nodes)", self.tree.borrow().len())
    }
}

/// Extracts the node behind a factory result, for Rust callers.
///
/// # Errors
///
/// Returns [`Error::NativeMismatch`] if `value` does not wrap a syntax-tree node.
pub fn node_of(value: &DynamicValue) -> Result<AstRef> {
    value
        .native()
        .ok_or_else(|| Error::Shape(format!("Expected a syntax-tree node, got {}", value.type_name())))?
        .as_ast_node()
        .cloned()
}
