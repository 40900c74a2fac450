//! Typed handles back to host nodes.
//!
//! A [`NativeHandle`] is the `_native` slot of every wrapper object. It names
//! exactly one host node together with its kind, so unwrapping is a single
//! match; asking for the wrong kind yields [`crate::Error::NativeMismatch`].

use std::{fmt, rc::Rc};

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    ast::AstRef,
    ir::{Constant, IrBlock, IrInstruction, Value},
    Error, Result,
};

/// Discriminant of a [`NativeHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum NativeKind {
    /// An IR instruction.
    Instruction,
    /// A read-only snapshot of an IR block.
    Block,
    /// An IR operand or result value.
    Value,
    /// A standalone constant produced by a factory.
    Constant,
    /// A syntax-tree node.
    AstNode,
}

/// Opaque reference to one host node.
///
/// Cloning a handle never copies the node; identity is preserved so a wrapper
/// handed back by a script can be compared with the node it was built from.
#[derive(Clone)]
pub enum NativeHandle {
    /// An instruction as stored in its block.
    Instruction(Rc<IrInstruction>),
    /// A snapshot of a block taken when it was wrapped.
    Block(Rc<IrBlock>),
    /// An operand or result of an instruction.
    Value(Rc<Value>),
    /// A constant payload, as produced by `ir.constant(...)` and friends.
    Constant(Rc<Constant>),
    /// A node of a shared syntax tree.
    AstNode(AstRef),
}

impl NativeHandle {
    /// Returns the discriminant of this handle.
    #[must_use]
    pub fn kind(&self) -> NativeKind {
        match self {
            NativeHandle::Instruction(_) => NativeKind::Instruction,
            NativeHandle::Block(_) => NativeKind::Block,
            NativeHandle::Value(_) => NativeKind::Value,
            NativeHandle::Constant(_) => NativeKind::Constant,
            NativeHandle::AstNode(_) => NativeKind::AstNode,
        }
    }

    /// Returns true if both handles name the same host node.
    #[must_use]
    pub fn same_node(&self, other: &NativeHandle) -> bool {
        match (self, other) {
            (NativeHandle::Instruction(a), NativeHandle::Instruction(b)) => Rc::ptr_eq(a, b),
            (NativeHandle::Block(a), NativeHandle::Block(b)) => Rc::ptr_eq(a, b),
            (NativeHandle::Value(a), NativeHandle::Value(b)) => Rc::ptr_eq(a, b),
            (NativeHandle::Constant(a), NativeHandle::Constant(b)) => Rc::ptr_eq(a, b),
            (NativeHandle::AstNode(a), NativeHandle::AstNode(b)) => a == b,
            _ => false,
        }
    }

    fn mismatch(&self, expected: NativeKind) -> Error {
        Error::NativeMismatch {
            expected,
            found: self.kind().to_string(),
        }
    }

    /// Downcasts to an instruction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NativeMismatch`] if the handle holds another kind.
    pub fn as_instruction(&self) -> Result<&Rc<IrInstruction>> {
        match self {
            NativeHandle::Instruction(instr) => Ok(instr),
            other => Err(other.mismatch(NativeKind::Instruction)),
        }
    }

    /// Downcasts to a block snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NativeMismatch`] if the handle holds another kind.
    pub fn as_block(&self) -> Result<&Rc<IrBlock>> {
        match self {
            NativeHandle::Block(block) => Ok(block),
            other => Err(other.mismatch(NativeKind::Block)),
        }
    }

    /// Downcasts to an IR value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NativeMismatch`] if the handle holds another kind.
    pub fn as_value(&self) -> Result<&Rc<Value>> {
        match self {
            NativeHandle::Value(value) => Ok(value),
            other => Err(other.mismatch(NativeKind::Value)),
        }
    }

    /// Extracts a constant payload.
    ///
    /// Both factory constants and constant operands qualify.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NativeMismatch`] if the handle holds no constant.
    pub fn as_constant(&self) -> Result<Constant> {
        match self {
            NativeHandle::Constant(c) => Ok(c.as_ref().clone()),
            NativeHandle::Value(v) => match v.as_ref() {
                Value::Constant(c) => Ok(c.clone()),
                Value::Register(_) => Err(self.mismatch(NativeKind::Constant)),
            },
            other => Err(other.mismatch(NativeKind::Constant)),
        }
    }

    /// Downcasts to a syntax-tree node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NativeMismatch`] if the handle holds another kind.
    pub fn as_ast_node(&self) -> Result<&AstRef> {
        match self {
            NativeHandle::AstNode(node) => Ok(node),
            other => Err(other.mismatch(NativeKind::AstNode)),
        }
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeHandle::Instruction(instr) => write!(f, "Native(Instruction {instr})"),
            NativeHandle::Block(block) => write!(f, "Native(Block {})", block.id()),
            NativeHandle::Value(value) => write!(f, "Native(Value {value})"),
            NativeHandle::Constant(c) => write!(f, "Native(Constant {c})"),
            NativeHandle::AstNode(node) => write!(f, "Native(AstNode #{})", node.id().index()),
        }
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeHandle::Instruction(instr) => write!(f, "{instr}"),
            NativeHandle::Block(block) => write!(f, "block_{}", block.id()),
            NativeHandle::Value(value) => write!(f, "{value}"),
            NativeHandle::Constant(c) => write!(f, "{c}"),
            NativeHandle::AstNode(node) => write!(f, "{}", node.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Constant, IrInstruction, VirtualRegister};

    #[test]
    fn test_identity_and_downcast() {
        let instr = Rc::new(IrInstruction::ConstantLoad {
            dest: VirtualRegister::new(1, "v1"),
            value: Constant::Int(7),
        });
        let a = NativeHandle::Instruction(instr.clone());
        let b = NativeHandle::Instruction(instr.clone());
        let copy = NativeHandle::Instruction(Rc::new(instr.as_ref().clone()));

        assert!(a.same_node(&b));
        assert!(!a.same_node(&copy));
        assert!(Rc::ptr_eq(a.as_instruction().unwrap(), &instr));

        let err = a.as_block().unwrap_err();
        assert!(matches!(
            err,
            Error::NativeMismatch {
                expected: NativeKind::Block,
                ..
            }
        ));
    }

    #[test]
    fn test_constant_extraction() {
        let c = NativeHandle::Constant(Rc::new(Constant::String("x".into())));
        assert_eq!(c.as_constant().unwrap(), Constant::String("x".into()));

        let operand = NativeHandle::Value(Rc::new(Value::Constant(Constant::Long(5))));
        assert_eq!(operand.as_constant().unwrap(), Constant::Long(5));

        let reg = NativeHandle::Value(Rc::new(Value::Register(VirtualRegister::new(2, "v2"))));
        assert!(reg.as_constant().is_err());
    }
}
