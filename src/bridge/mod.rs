//! Script-facing instrumentation layer.
//!
//! Everything a script sees goes through this module: wrapper objects over IR
//! and syntax-tree nodes, the kind-keyed dispatch engines behind `ir` and
//! `ast`, the declarative rules behind `instrument`, and the annotation
//! rewriter behind `annotations`.
//!
//! # Architecture
//!
//! ```text
//!              ScriptSession::globals()
//!   ┌──────────┬──────────┬──────────────┬──────────────┐
//!   │    ir    │   ast    │  instrument  │ annotations  │
//!   │ IrBridge │AstBridge │  RuleEngine  │ Annotation-  │
//!   │          │+ factory │              │   Rewriter   │
//!   └────┬─────┴────┬─────┴──────┬───────┴──────┬───────┘
//!        │          │            │              │
//!        ▼          ▼            ▼              │
//!   dispatch_ir dispatch_ast  per-rule scans    │
//!        │          │            │              │
//!        └──────────┴─────┬──────┘              │
//!                         ▼                     ▼
//!                 BridgeContext: ClassPool, Lifter, LiftCache,
//!                 LogSink, BridgeConfig
//! ```
//!
//! # Handler results
//!
//! Dispatch handlers and the rewriting rules share one protocol, implemented
//! in [`Mutation`] and [`replacement_for`]: no result keeps the node, `null`
//! removes it and a different wrapped node replaces it.
//!
//! # Re-entrancy
//!
//! No `RefCell` borrow is held while a script callback runs. Handler lists
//! are snapshotted before dispatch, so handlers registered during an apply
//! take effect on the next one. IR is checked out of the lift cache for the
//! duration of an apply; a nested apply on the same method works on a fresh
//! lift and its result is overwritten when the outer apply checks in.

mod annotations;
mod ast_bridge;
mod ast_wrapper;
mod context;
mod dispatch;
mod factory;
mod ir_bridge;
mod ir_wrapper;
mod pattern;
mod protocol;
mod registry;
mod rules;
mod session;
mod transform;
pub(crate) mod traverse;

pub use annotations::{AnnotationRewriter, AnnotationTarget};
pub use ast_bridge::AstBridge;
pub use ast_wrapper::{wrap_ast, AstCursor};
pub use context::{BridgeContext, MethodRef, ResolvedMethod};
pub use dispatch::{dispatch_ast, dispatch_ir, IrHandlerKind};
pub use factory::{node_of, AstFactory};
pub use ir_bridge::IrBridge;
pub use ir_wrapper::{wrap_ir, IrCursor, IrNode};
pub use pattern::{matches_target, TargetPattern};
pub use protocol::{replacement_for, Mutation};
pub use registry::{HandlerRegistry, Registration};
pub use rules::{Rule, RuleEngine, RuleKind};
pub use session::ScriptSession;
pub use transform::ScriptedTransform;
