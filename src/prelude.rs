//! # irhook Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the irhook library. Import this module to get quick access to the essential
//! types for hosting instrumentation scripts.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all irhook operations
pub use crate::Error;

/// The result type used throughout irhook
pub use crate::Result;

/// Bridge configuration
pub use crate::BridgeConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// One scripting session with its four script objects
pub use crate::bridge::ScriptSession;

/// The individual bridges, for hosts wiring them up by hand
pub use crate::bridge::{
    AnnotationRewriter, AnnotationTarget, AstBridge, AstFactory, BridgeContext, IrBridge,
    IrHandlerKind, Rule, RuleEngine, RuleKind, ScriptedTransform,
};

/// Producer boundary and cache
pub use crate::lift::{LiftCache, Lifter};

// ================================================================================================
// Script Values
// ================================================================================================

/// Values exchanged with the script interpreter
pub use crate::value::{arg, DynamicValue, NativeHandle, NativeKind, Properties, ScriptFunction};

// ================================================================================================
// Events
// ================================================================================================

/// Logging
pub use crate::events::{Event, EventKind, EventLog, FnSink, LogSink, NullSink};

// ================================================================================================
// IR and Syntax Trees
// ================================================================================================

/// SSA view
pub use crate::ir::{
    run_passes, BinaryOpcode, BranchCondition, Constant, InstructionKind, InvokeKind, IrBlock,
    IrInstruction, IrMethod, IrPass, TypeCheckKind, UnaryOpcode, Value, VirtualRegister,
};

/// Syntax trees
pub use crate::ast::{
    AstEditor, AstNode, AstRef, AstTree, BinaryOperator, Expression, Literal, NodeId, NodeKind,
    Replacement, SharedTree, SourceType, Statement, UnaryOperator,
};

// ================================================================================================
// Class Files
// ================================================================================================

/// Class-file model
pub use crate::model::{
    Annotation, Attribute, ClassFile, ClassPool, ConstantPool, ConstantPoolEntry, FieldAccessFlags,
    FieldEntry, MethodAccessFlags, MethodEntry,
};
