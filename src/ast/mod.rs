//! Decompiled syntax trees.
//!
//! Trees are arenas of [`AstNode`]s with parent links, shared behind
//! `Rc<RefCell<..>>` so that handles given to scripts ([`AstRef`]) stay valid
//! while the tree is edited. Producing a tree from bytecode is the job of a
//! [`crate::lift::Lifter`].
//!
//! # Key Components
//!
//! - [`AstTree`] - Arena with `replace`, `remove`, `deep_clone` and `import`
//! - [`AstRef`] - Identity-preserving handle to one node of a [`SharedTree`]
//! - [`AstEditor`] - Applies kind-keyed keep/remove/replace handlers
//! - [`validate`] - Structural checks over a subtree
//! - [`SourceType`] - Type names as scripts spell them

mod editor;
mod node;
mod tree;
mod types;
mod validate;

pub use editor::{AppliedEdit, AstEditor, EditAction, EditSummary, Replacement};
pub use node::{
    AstNode, BinaryOperator, CatchClause, Category, Expression, Field, Literal, NodeId, NodeKind,
    Statement, SwitchCase, UnaryOperator,
};
pub use tree::{AstRef, AstTree, SharedTree};
pub use types::{PrimitiveType, SourceType};
pub use validate::{validate, Severity, ValidationCategory, ValidationError, ValidationResult};
