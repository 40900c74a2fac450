//! Interpretation of handler return values.
//!
//! Every dispatch handler answers with one of three things:
//!
//! - nothing (the callback had no return value): keep the node;
//! - an explicit `null`: remove the node;
//! - a wrapped node of a different identity: replace the node with it.
//!
//! A returned node that *is* the original, or a value of any other shape,
//! keeps the node. For IR, a returned constant is turned into a
//! `ConstantLoad` defining the original's result register.

use std::rc::Rc;

use crate::{
    ast::{AstRef, Replacement},
    events::{EventKind, LogSink},
    ir::{Constant, IrBlock, IrInstruction, Value},
    value::{DynamicValue, NativeHandle},
};

/// Decision for one IR instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Leave the instruction where it is.
    Keep,
    /// Remove it from its block.
    Remove,
    /// Put this instruction at its index.
    Replace(Rc<IrInstruction>),
}

impl Mutation {
    /// Interprets a handler result for `original`.
    ///
    /// Constants can only stand in for instructions that define a register;
    /// anything else is kept and a warning goes to `sink`.
    #[must_use]
    pub fn from_result(result: Option<DynamicValue>, original: &Rc<IrInstruction>, sink: &dyn LogSink) -> Self {
        let Some(result) = result else {
            return Mutation::Keep;
        };
        if result.is_null() {
            return Mutation::Remove;
        }
        let Some(handle) = result.native() else {
            return Mutation::Keep;
        };

        let constant = match handle {
            NativeHandle::Instruction(instr) if Rc::ptr_eq(instr, original) => return Mutation::Keep,
            NativeHandle::Instruction(instr) => return Mutation::Replace(instr.clone()),
            NativeHandle::Constant(c) => c.as_ref().clone(),
            NativeHandle::Value(v) => match v.as_ref() {
                Value::Constant(c) => c.clone(),
                Value::Register(_) => return Mutation::Keep,
            },
            NativeHandle::Block(_) | NativeHandle::AstNode(_) => return Mutation::Keep,
        };
        Self::load(constant, original, sink)
    }

    /// A `ConstantLoad` of `constant` into `original`'s result register.
    #[must_use]
    pub fn load(constant: Constant, original: &IrInstruction, sink: &dyn LogSink) -> Self {
        match original.result() {
            Some(dest) => Mutation::Replace(Rc::new(IrInstruction::ConstantLoad {
                dest: dest.clone(),
                value: constant,
            })),
            None => {
                sink.warn(format!(
                    "Cannot replace {} with a constant: it defines no register",
                    original.kind()
                ));
                Mutation::Keep
            }
        }
    }

    /// Applies the decision to `block` at `original`'s current index.
    ///
    /// Returns the event kind describing the change and the index it happened
    /// at, or `None` if nothing changed (including when `original` is no
    /// longer in the block).
    pub fn apply(self, block: &mut IrBlock, original: &Rc<IrInstruction>) -> Option<(EventKind, usize)> {
        match self {
            Mutation::Keep => None,
            Mutation::Remove => block
                .remove_instruction(original)
                .map(|index| (EventKind::InstructionRemoved, index)),
            Mutation::Replace(replacement) => {
                let kind = if replacement.constant().is_some() && original.constant().is_some() {
                    EventKind::ConstantReplaced
                } else {
                    EventKind::InstructionReplaced
                };
                block
                    .replace_instruction(original, replacement)
                    .map(|index| (kind, index))
            }
        }
    }
}

/// Interprets a handler result for a syntax-tree node.
///
/// Anything that is not `null` or another syntax-tree node keeps `original`.
#[must_use]
pub fn replacement_for(result: Option<DynamicValue>, original: &AstRef) -> Replacement {
    let Some(result) = result else {
        return Replacement::Keep;
    };
    if result.is_null() {
        return Replacement::Remove;
    }
    match result.native() {
        Some(NativeHandle::AstNode(node)) if node != original => Replacement::With(node.clone()),
        _ => Replacement::Keep,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{AstTree, Literal},
        events::EventLog,
        ir::{InvokeKind, VirtualRegister},
    };

    fn load(value: i32) -> Rc<IrInstruction> {
        Rc::new(IrInstruction::ConstantLoad {
            dest: VirtualRegister::new(1, "v1"),
            value: Constant::Int(value),
        })
    }

    #[test]
    fn test_three_states() {
        let log = EventLog::new();
        let original = load(1);

        assert_eq!(Mutation::from_result(None, &original, &log), Mutation::Keep);
        assert_eq!(
            Mutation::from_result(Some(DynamicValue::Null), &original, &log),
            Mutation::Remove
        );

        let same = DynamicValue::Native(NativeHandle::Instruction(original.clone()));
        assert_eq!(Mutation::from_result(Some(same), &original, &log), Mutation::Keep);

        let constant = DynamicValue::Native(NativeHandle::Constant(Rc::new(Constant::Int(9))));
        let Mutation::Replace(replacement) = Mutation::from_result(Some(constant), &original, &log) else {
            panic!("expected a replacement");
        };
        assert_eq!(replacement.constant(), Some(&Constant::Int(9)));
        assert_eq!(replacement.result(), original.result());

        assert_eq!(
            Mutation::from_result(Some(DynamicValue::from("text")), &original, &log),
            Mutation::Keep
        );
    }

    #[test]
    fn test_constant_for_void_instruction_is_kept() {
        let log = EventLog::new();
        let call = Rc::new(IrInstruction::Invoke {
            dest: None,
            kind: InvokeKind::Static,
            owner: "a/B".into(),
            name: "run".into(),
            descriptor: "()V".into(),
            args: vec![],
        });
        let constant = DynamicValue::Native(NativeHandle::Constant(Rc::new(Constant::Null)));
        assert_eq!(Mutation::from_result(Some(constant), &call, &log), Mutation::Keep);
        assert_eq!(log.count_kind(EventKind::Warning), 1);
    }

    #[test]
    fn test_apply_to_block() {
        let mut block = IrBlock::new(0);
        let first = block.push(IrInstruction::ConstantLoad {
            dest: VirtualRegister::new(1, "v1"),
            value: Constant::Int(1),
        });
        let second = block.push(IrInstruction::Return { value: None });

        let replaced = Mutation::Replace(load(5)).apply(&mut block, &first);
        assert_eq!(replaced, Some((EventKind::ConstantReplaced, 0)));
        assert_eq!(block.len(), 2);

        assert_eq!(
            Mutation::Remove.apply(&mut block, &second),
            Some((EventKind::InstructionRemoved, 1))
        );
        assert_eq!(Mutation::Remove.apply(&mut block, &second), None);
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn test_syntax_tree_results() {
        let mut tree = AstTree::new();
        let a = tree.add(Literal::Int(1));
        let b = tree.add(Literal::Int(2));
        let shared = tree.into_shared();
        let original = AstRef::new(shared.clone(), a);
        let other = AstRef::new(shared, b);

        assert_eq!(replacement_for(None, &original), Replacement::Keep);
        assert_eq!(replacement_for(Some(DynamicValue::Null), &original), Replacement::Remove);
        assert_eq!(
            replacement_for(Some(NativeHandle::AstNode(original.clone()).into()), &original),
            Replacement::Keep
        );
        assert_eq!(
            replacement_for(Some(NativeHandle::AstNode(other.clone()).into()), &original),
            Replacement::With(other)
        );
    }
}
