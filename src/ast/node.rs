//! Syntax-tree node variants.
//!
//! Nodes never own their children; they name them by [`NodeId`] inside the
//! arena of an [`crate::ast::AstTree`]. Every child reference lives in a
//! slot, and the slot kind decides what `remove()` may do with it: list
//! entries can be dropped, optional slots cleared, required slots not at all.

use std::fmt;

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr, IntoEnumIterator};

use crate::value::DynamicValue;

/// Index of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Position of the node in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The two base categories a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum Category {
    /// Produces a value.
    Expression,
    /// Executes for effect.
    Statement,
}

/// Concrete node variant; the string form is the `kind` tag scripts see.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
pub enum NodeKind {
    #[strum(serialize = "MethodCallExpr")]
    /// Method invocation
    MethodCall,
    #[strum(serialize = "FieldAccessExpr")]
    /// Field read
    FieldAccess,
    #[strum(serialize = "BinaryExpr")]
    /// Binary operation, assignments included
    Binary,
    #[strum(serialize = "UnaryExpr")]
    /// Unary operation
    Unary,
    #[strum(serialize = "LiteralExpr")]
    /// Literal constant
    Literal,
    #[strum(serialize = "VarRefExpr")]
    /// Local variable reference
    VarRef,
    #[strum(serialize = "TernaryExpr")]
    /// Conditional expression
    Ternary,
    #[strum(serialize = "CastExpr")]
    /// Type cast
    Cast,
    #[strum(serialize = "InstanceOfExpr")]
    /// Type test
    InstanceOf,
    #[strum(serialize = "ArrayAccessExpr")]
    /// Array element access
    ArrayAccess,
    #[strum(serialize = "NewExpr")]
    /// Object construction
    New,
    #[strum(serialize = "ThisExpr")]
    /// `this`
    This,
    #[strum(serialize = "IfStmt")]
    /// `if` / `if-else`
    If,
    #[strum(serialize = "WhileStmt")]
    /// `while` loop
    While,
    #[strum(serialize = "DoWhileStmt")]
    /// `do-while` loop
    DoWhile,
    #[strum(serialize = "ForStmt")]
    /// Classic `for` loop
    For,
    #[strum(serialize = "ForEachStmt")]
    /// Enhanced `for` loop
    ForEach,
    #[strum(serialize = "ReturnStmt")]
    /// `return`
    Return,
    #[strum(serialize = "BlockStmt")]
    /// Braced statement list
    Block,
    #[strum(serialize = "ExprStmt")]
    /// Expression evaluated for effect
    ExprStmt,
    #[strum(serialize = "VarDeclStmt")]
    /// Local variable declaration
    VarDecl,
    #[strum(serialize = "ThrowStmt")]
    /// `throw`
    Throw,
    #[strum(serialize = "TryCatchStmt")]
    /// `try` with catch clauses and optional `finally`
    TryCatch,
    #[strum(serialize = "SwitchStmt")]
    /// `switch`
    Switch,
    #[strum(serialize = "BreakStmt")]
    /// `break`
    Break,
    #[strum(serialize = "ContinueStmt")]
    /// `continue`
    Continue,
}

impl NodeKind {
    /// Base category of nodes of this kind.
    #[must_use]
    pub fn category(self) -> Category {
        match self {
            NodeKind::MethodCall
            | NodeKind::FieldAccess
            | NodeKind::Binary
            | NodeKind::Unary
            | NodeKind::Literal
            | NodeKind::VarRef
            | NodeKind::Ternary
            | NodeKind::Cast
            | NodeKind::InstanceOf
            | NodeKind::ArrayAccess
            | NodeKind::New
            | NodeKind::This => Category::Expression,
            _ => Category::Statement,
        }
    }

    /// Parses a script kind tag; unknown tags yield `None`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.parse().ok()
    }
}

/// Binary operators; the string form is the source symbol.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[allow(missing_docs)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Rem,
    #[strum(serialize = "<<")]
    Shl,
    #[strum(serialize = ">>")]
    Shr,
    #[strum(serialize = ">>>")]
    Ushr,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "^")]
    BitXor,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "+=")]
    AddAssign,
    #[strum(serialize = "-=")]
    SubAssign,
    #[strum(serialize = "*=")]
    MulAssign,
    #[strum(serialize = "/=")]
    DivAssign,
}

impl BinaryOperator {
    /// Source symbol, e.g. `"+"` or `">>>"`.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        self.into()
    }

    /// Looks an operator up by symbol.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        BinaryOperator::iter().find(|op| op.symbol() == symbol)
    }

    /// `== != < <= > >=`
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Ne
                | BinaryOperator::Lt
                | BinaryOperator::Le
                | BinaryOperator::Gt
                | BinaryOperator::Ge
        )
    }

    /// `&& ||`
    #[must_use]
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    /// Plain and compound assignment.
    #[must_use]
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOperator::Assign
                | BinaryOperator::AddAssign
                | BinaryOperator::SubAssign
                | BinaryOperator::MulAssign
                | BinaryOperator::DivAssign
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum UnaryOperator {
    Neg,
    Pos,
    Not,
    BitNot,
    PreIncr,
    PostIncr,
    PreDecr,
    PostDecr,
}

impl UnaryOperator {
    /// Source symbol; increments and decrements share theirs.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Neg => "-",
            UnaryOperator::Pos => "+",
            UnaryOperator::Not => "!",
            UnaryOperator::BitNot => "~",
            UnaryOperator::PreIncr | UnaryOperator::PostIncr => "++",
            UnaryOperator::PreDecr | UnaryOperator::PostDecr => "--",
        }
    }

    /// False only for the postfix increment and decrement.
    #[must_use]
    pub fn is_prefix(self) -> bool {
        !matches!(self, UnaryOperator::PostIncr | UnaryOperator::PostDecr)
    }
}

/// Literal payloads.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Char(char),
    String(String),
    Null,
}

impl Literal {
    /// Source type name of the literal.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "int",
            Literal::Long(_) => "long",
            Literal::Float(_) => "float",
            Literal::Double(_) => "double",
            Literal::Bool(_) => "boolean",
            Literal::Char(_) => "char",
            Literal::String(_) => "String",
            Literal::Null => "null",
        }
    }

    /// Converts to a script value.
    #[must_use]
    pub fn to_dynamic(&self) -> DynamicValue {
        match self {
            Literal::Int(v) => DynamicValue::from(*v),
            Literal::Long(v) => DynamicValue::from(*v),
            Literal::Float(v) => DynamicValue::from(*v),
            Literal::Double(v) => DynamicValue::from(*v),
            Literal::Bool(v) => DynamicValue::Bool(*v),
            Literal::Char(c) => DynamicValue::Str(c.to_string()),
            Literal::String(s) => DynamicValue::Str(s.clone()),
            Literal::Null => DynamicValue::Null,
        }
    }

    /// Builds a literal from a script primitive.
    ///
    /// Integral numbers in `i32` range become `int`, other numbers `double`,
    /// and anything that is not a boolean or null becomes a string.
    #[must_use]
    pub fn from_dynamic(value: &DynamicValue) -> Literal {
        match value {
            DynamicValue::Null => Literal::Null,
            DynamicValue::Bool(b) => Literal::Bool(*b),
            DynamicValue::Number(n) => {
                if n.fract() == 0.0 && *n >= f64::from(i32::MIN) && *n <= f64::from(i32::MAX) {
                    Literal::Int(*n as i32)
                } else {
                    Literal::Double(*n)
                }
            }
            other => Literal::String(other.to_string()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Long(v) => write!(f, "{v}L"),
            Literal::Float(v) => write!(f, "{v}f"),
            Literal::Double(v) => write!(f, "{v}"),
            Literal::Bool(v) => write!(f, "{v}"),
            Literal::Char(c) => write!(f, "'{c}'"),
            Literal::String(s) => write!(f, "{s:?}"),
            Literal::Null => write!(f, "null"),
        }
    }
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `receiver.name(args)`; `receiver` is `None` for static calls.
    MethodCall {
        /// Receiver expression
        receiver: Option<NodeId>,
        /// Declaring class (internal name)
        owner: String,
        /// Method name
        name: String,
        /// Method descriptor
        descriptor: String,
        /// Argument expressions
        args: Vec<NodeId>,
        /// True for static calls
        is_static: bool,
    },
    /// `receiver.name`
    FieldAccess {
        /// Receiver expression, absent for static fields
        receiver: Option<NodeId>,
        /// Declaring class (internal name)
        owner: String,
        /// Field name
        name: String,
        /// Field descriptor
        descriptor: String,
        /// True for static fields
        is_static: bool,
    },
    /// `left op right`
    Binary {
        /// Operator
        op: BinaryOperator,
        /// Left operand
        left: NodeId,
        /// Right operand
        right: NodeId,
    },
    /// `op operand` or `operand op`
    Unary {
        /// Operator
        op: UnaryOperator,
        /// Operand
        operand: NodeId,
    },
    /// A literal constant.
    Literal(Literal),
    /// A local variable.
    VarRef {
        /// Variable name
        name: String,
        /// Source type name
        ty: String,
    },
    /// `condition ? then_expr : else_expr`
    Ternary {
        /// Condition
        condition: NodeId,
        /// Value when true
        then_expr: NodeId,
        /// Value when false
        else_expr: NodeId,
    },
    /// `(target_type) operand`
    Cast {
        /// Target type
        target_type: String,
        /// Operand
        operand: NodeId,
    },
    /// `operand instanceof target_type`
    InstanceOf {
        /// Operand
        operand: NodeId,
        /// Tested type
        target_type: String,
    },
    /// `array[index]`
    ArrayAccess {
        /// Array expression
        array: NodeId,
        /// Index expression
        index: NodeId,
    },
    /// `new class_name(args)`
    New {
        /// Instantiated class (internal name)
        class_name: String,
        /// Constructor arguments
        args: Vec<NodeId>,
    },
    /// `this`
    This {
        /// Enclosing class (internal name)
        class_name: String,
    },
}

/// One `catch` clause of a [`Statement::TryCatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// Caught exception types; more than one for multi-catch.
    pub exception_types: Vec<String>,
    /// Name of the bound variable.
    pub variable: String,
    /// Handler body.
    pub body: NodeId,
}

/// One arm of a [`Statement::Switch`].
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// Case labels; empty for `default`.
    pub labels: Vec<Literal>,
    /// Statements of the arm.
    pub body: Vec<NodeId>,
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `if (condition) then_branch else else_branch`
    If {
        /// Condition
        condition: NodeId,
        /// Taken branch
        then_branch: NodeId,
        /// Optional `else` branch
        else_branch: Option<NodeId>,
    },
    /// `while (condition) body`
    While {
        /// Loop condition
        condition: NodeId,
        /// Loop body
        body: NodeId,
    },
    /// `do body while (condition)`
    DoWhile {
        /// Loop body
        body: NodeId,
        /// Loop condition
        condition: NodeId,
    },
    /// `for (init; condition; update) body`
    For {
        /// Initializer statements
        init: Vec<NodeId>,
        /// Optional condition
        condition: Option<NodeId>,
        /// Update expressions
        update: Vec<NodeId>,
        /// Loop body
        body: NodeId,
    },
    /// `for (variable : iterable) body`
    ForEach {
        /// Loop variable declaration
        variable: NodeId,
        /// Iterated expression
        iterable: NodeId,
        /// Loop body
        body: NodeId,
    },
    /// `return value`
    Return {
        /// Returned expression; `None` for `return;`
        value: Option<NodeId>,
    },
    /// `{ statements }`
    Block {
        /// Contained statements
        statements: Vec<NodeId>,
    },
    /// `expression;`
    ExprStmt {
        /// The expression
        expression: NodeId,
    },
    /// `ty name = initializer`
    VarDecl {
        /// Variable name
        name: String,
        /// Source type name
        ty: String,
        /// Optional initializer
        initializer: Option<NodeId>,
    },
    /// `throw exception`
    Throw {
        /// Thrown expression
        exception: NodeId,
    },
    /// `try body catch ... finally ...`
    TryCatch {
        /// Protected body
        body: NodeId,
        /// Catch clauses
        catches: Vec<CatchClause>,
        /// Optional `finally` block
        finally: Option<NodeId>,
    },
    /// `switch (selector) { cases }`
    Switch {
        /// Selector expression
        selector: NodeId,
        /// Arms in source order
        cases: Vec<SwitchCase>,
    },
    /// `break label`
    Break {
        /// Optional label
        label: Option<String>,
    },
    /// `continue label`
    Continue {
        /// Optional label
        label: Option<String>,
    },
}

/// A syntax-tree node: an expression or a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    /// Expression node
    Expr(Expression),
    /// Statement node
    Stmt(Statement),
}

/// Mutable view of one child slot.
pub(crate) enum SlotMut<'a> {
    Required(&'a mut NodeId),
    Optional(&'a mut Option<NodeId>),
    List(&'a mut Vec<NodeId>),
}

/// Named child slots addressable by the fluent `with*` setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "camelCase")]
pub enum Field {
    /// Binary left operand
    Left,
    /// Binary right operand
    Right,
    /// Unary, cast or instanceof operand
    Operand,
    /// Ternary, if or loop condition
    Condition,
    /// Ternary true value
    ThenExpr,
    /// Ternary false value
    ElseExpr,
    /// If taken branch
    ThenBranch,
    /// If else branch
    ElseBranch,
    /// Loop body
    Body,
    /// Return value
    Value,
}

impl Field {
    /// Category a node must have to fill this slot.
    #[must_use]
    pub fn category(self) -> Category {
        match self {
            Field::ThenBranch | Field::ElseBranch | Field::Body => Category::Statement,
            _ => Category::Expression,
        }
    }
}

impl AstNode {
    /// Concrete kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            AstNode::Expr(expr) => match expr {
                Expression::MethodCall { .. } => NodeKind::MethodCall,
                Expression::FieldAccess { .. } => NodeKind::FieldAccess,
                Expression::Binary { .. } => NodeKind::Binary,
                Expression::Unary { .. } => NodeKind::Unary,
                Expression::Literal(_) => NodeKind::Literal,
                Expression::VarRef { .. } => NodeKind::VarRef,
                Expression::Ternary { .. } => NodeKind::Ternary,
                Expression::Cast { .. } => NodeKind::Cast,
                Expression::InstanceOf { .. } => NodeKind::InstanceOf,
                Expression::ArrayAccess { .. } => NodeKind::ArrayAccess,
                Expression::New { .. } => NodeKind::New,
                Expression::This { .. } => NodeKind::This,
            },
            AstNode::Stmt(stmt) => match stmt {
                Statement::If { .. } => NodeKind::If,
                Statement::While { .. } => NodeKind::While,
                Statement::DoWhile { .. } => NodeKind::DoWhile,
                Statement::For { .. } => NodeKind::For,
                Statement::ForEach { .. } => NodeKind::ForEach,
                Statement::Return { .. } => NodeKind::Return,
                Statement::Block { .. } => NodeKind::Block,
                Statement::ExprStmt { .. } => NodeKind::ExprStmt,
                Statement::VarDecl { .. } => NodeKind::VarDecl,
                Statement::Throw { .. } => NodeKind::Throw,
                Statement::TryCatch { .. } => NodeKind::TryCatch,
                Statement::Switch { .. } => NodeKind::Switch,
                Statement::Break { .. } => NodeKind::Break,
                Statement::Continue { .. } => NodeKind::Continue,
            },
        }
    }

    /// Base category.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            AstNode::Expr(_) => Category::Expression,
            AstNode::Stmt(_) => Category::Statement,
        }
    }

    /// Child ids in source order.
    #[must_use]
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        match self {
            AstNode::Expr(expr) => match expr {
                Expression::MethodCall { receiver, args, .. } => {
                    out.extend(receiver);
                    out.extend(args);
                }
                Expression::FieldAccess { receiver, .. } => out.extend(receiver),
                Expression::Binary { left, right, .. } => out.extend([*left, *right]),
                Expression::Unary { operand, .. }
                | Expression::Cast { operand, .. }
                | Expression::InstanceOf { operand, .. } => out.push(*operand),
                Expression::Ternary {
                    condition,
                    then_expr,
                    else_expr,
                } => out.extend([*condition, *then_expr, *else_expr]),
                Expression::ArrayAccess { array, index } => out.extend([*array, *index]),
                Expression::New { args, .. } => out.extend(args),
                Expression::Literal(_) | Expression::VarRef { .. } | Expression::This { .. } => {}
            },
            AstNode::Stmt(stmt) => match stmt {
                Statement::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    out.extend([*condition, *then_branch]);
                    out.extend(else_branch);
                }
                Statement::While { condition, body } => out.extend([*condition, *body]),
                Statement::DoWhile { body, condition } => out.extend([*body, *condition]),
                Statement::For {
                    init,
                    condition,
                    update,
                    body,
                } => {
                    out.extend(init);
                    out.extend(condition);
                    out.extend(update);
                    out.push(*body);
                }
                Statement::ForEach {
                    variable,
                    iterable,
                    body,
                } => out.extend([*variable, *iterable, *body]),
                Statement::Return { value } => out.extend(value),
                Statement::Block { statements } => out.extend(statements),
                Statement::ExprStmt { expression } => out.push(*expression),
                Statement::VarDecl { initializer, .. } => out.extend(initializer),
                Statement::Throw { exception } => out.push(*exception),
                Statement::TryCatch {
                    body,
                    catches,
                    finally,
                } => {
                    out.push(*body);
                    out.extend(catches.iter().map(|c| c.body));
                    out.extend(finally);
                }
                Statement::Switch { selector, cases } => {
                    out.push(*selector);
                    for case in cases {
                        out.extend(&case.body);
                    }
                }
                Statement::Break { .. } | Statement::Continue { .. } => {}
            },
        }
        out
    }

    /// Every child slot, in the same order as [`AstNode::children`].
    pub(crate) fn slots_mut(&mut self) -> Vec<SlotMut<'_>> {
        let mut out = Vec::new();
        match self {
            AstNode::Expr(expr) => match expr {
                Expression::MethodCall { receiver, args, .. } => {
                    out.push(SlotMut::Optional(receiver));
                    out.push(SlotMut::List(args));
                }
                Expression::FieldAccess { receiver, .. } => out.push(SlotMut::Optional(receiver)),
                Expression::Binary { left, right, .. } => {
                    out.push(SlotMut::Required(left));
                    out.push(SlotMut::Required(right));
                }
                Expression::Unary { operand, .. }
                | Expression::Cast { operand, .. }
                | Expression::InstanceOf { operand, .. } => out.push(SlotMut::Required(operand)),
                Expression::Ternary {
                    condition,
                    then_expr,
                    else_expr,
                } => {
                    out.push(SlotMut::Required(condition));
                    out.push(SlotMut::Required(then_expr));
                    out.push(SlotMut::Required(else_expr));
                }
                Expression::ArrayAccess { array, index } => {
                    out.push(SlotMut::Required(array));
                    out.push(SlotMut::Required(index));
                }
                Expression::New { args, .. } => out.push(SlotMut::List(args)),
                Expression::Literal(_) | Expression::VarRef { .. } | Expression::This { .. } => {}
            },
            AstNode::Stmt(stmt) => match stmt {
                Statement::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    out.push(SlotMut::Required(condition));
                    out.push(SlotMut::Required(then_branch));
                    out.push(SlotMut::Optional(else_branch));
                }
                Statement::While { condition, body } => {
                    out.push(SlotMut::Required(condition));
                    out.push(SlotMut::Required(body));
                }
                Statement::DoWhile { body, condition } => {
                    out.push(SlotMut::Required(body));
                    out.push(SlotMut::Required(condition));
                }
                Statement::For {
                    init,
                    condition,
                    update,
                    body,
                } => {
                    out.push(SlotMut::List(init));
                    out.push(SlotMut::Optional(condition));
                    out.push(SlotMut::List(update));
                    out.push(SlotMut::Required(body));
                }
                Statement::ForEach {
                    variable,
                    iterable,
                    body,
                } => {
                    out.push(SlotMut::Required(variable));
                    out.push(SlotMut::Required(iterable));
                    out.push(SlotMut::Required(body));
                }
                Statement::Return { value } => out.push(SlotMut::Optional(value)),
                Statement::Block { statements } => out.push(SlotMut::List(statements)),
                Statement::ExprStmt { expression } => out.push(SlotMut::Required(expression)),
                Statement::VarDecl { initializer, .. } => out.push(SlotMut::Optional(initializer)),
                Statement::Throw { exception } => out.push(SlotMut::Required(exception)),
                Statement::TryCatch {
                    body,
                    catches,
                    finally,
                } => {
                    out.push(SlotMut::Required(body));
                    for clause in catches.iter_mut() {
                        out.push(SlotMut::Required(&mut clause.body));
                    }
                    out.push(SlotMut::Optional(finally));
                }
                Statement::Switch { selector, cases } => {
                    out.push(SlotMut::Required(selector));
                    for case in cases.iter_mut() {
                        out.push(SlotMut::List(&mut case.body));
                    }
                }
                Statement::Break { .. } | Statement::Continue { .. } => {}
            },
        }
        out
    }

    /// Rewrites every child id through `f`.
    pub(crate) fn remap_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        for slot in self.slots_mut() {
            match slot {
                SlotMut::Required(id) => *id = f(*id),
                SlotMut::Optional(Some(id)) => *id = f(*id),
                SlotMut::Optional(None) => {}
                SlotMut::List(ids) => {
                    for id in ids.iter_mut() {
                        *id = f(*id);
                    }
                }
            }
        }
    }

    /// The slot a fluent setter addresses, if this variant has it.
    pub(crate) fn field_slot_mut(&mut self, field: Field) -> Option<SlotMut<'_>> {
        let slot = match (self, field) {
            (AstNode::Expr(Expression::Binary { left, .. }), Field::Left) => SlotMut::Required(left),
            (AstNode::Expr(Expression::Binary { right, .. }), Field::Right) => {
                SlotMut::Required(right)
            }
            (
                AstNode::Expr(
                    Expression::Unary { operand, .. }
                    | Expression::Cast { operand, .. }
                    | Expression::InstanceOf { operand, .. },
                ),
                Field::Operand,
            ) => SlotMut::Required(operand),
            (
                AstNode::Expr(Expression::Ternary { condition, .. })
                | AstNode::Stmt(
                    Statement::If { condition, .. }
                    | Statement::While { condition, .. }
                    | Statement::DoWhile { condition, .. },
                ),
                Field::Condition,
            ) => SlotMut::Required(condition),
            (AstNode::Stmt(Statement::For { condition, .. }), Field::Condition) => {
                SlotMut::Optional(condition)
            }
            (AstNode::Expr(Expression::Ternary { then_expr, .. }), Field::ThenExpr) => {
                SlotMut::Required(then_expr)
            }
            (AstNode::Expr(Expression::Ternary { else_expr, .. }), Field::ElseExpr) => {
                SlotMut::Required(else_expr)
            }
            (AstNode::Stmt(Statement::If { then_branch, .. }), Field::ThenBranch) => {
                SlotMut::Required(then_branch)
            }
            (AstNode::Stmt(Statement::If { else_branch, .. }), Field::ElseBranch) => {
                SlotMut::Optional(else_branch)
            }
            (
                AstNode::Stmt(
                    Statement::While { body, .. }
                    | Statement::DoWhile { body, .. }
                    | Statement::For { body, .. }
                    | Statement::ForEach { body, .. },
                ),
                Field::Body,
            ) => SlotMut::Required(body),
            (AstNode::Stmt(Statement::Return { value }), Field::Value) => SlotMut::Optional(value),
            _ => return None,
        };
        Some(slot)
    }
}

impl From<Expression> for AstNode {
    fn from(expr: Expression) -> Self {
        AstNode::Expr(expr)
    }
}

impl From<Statement> for AstNode {
    fn from(stmt: Statement) -> Self {
        AstNode::Stmt(stmt)
    }
}

impl From<Literal> for AstNode {
    fn from(lit: Literal) -> Self {
        AstNode::Expr(Expression::Literal(lit))
    }
}
