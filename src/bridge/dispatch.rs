//! Runs registered handlers over one method.
//!
//! # IR
//!
//! [`dispatch_ir`] first shows every block to the `Block` handlers (results
//! are ignored), then runs the instruction handlers kind by kind, in order of
//! each kind's first registration. Within a kind, handlers run in
//! registration order and each one covers the whole method, so a later
//! handler sees what an earlier one changed.
//!
//! Each handler iterates an owned snapshot of a block's instructions; an
//! instruction that an earlier callback already removed is still offered, and
//! any mutation for it is a no-op. Results follow [`Mutation`].
//!
//! # Syntax trees
//!
//! [`dispatch_ast`] feeds the registrations to an [`AstEditor`] and applies
//! it once.

use std::{collections::HashMap, rc::Rc};

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    ast::{AstEditor, AstRef, EditAction, NodeKind, Replacement, SharedTree},
    bridge::{
        ast_wrapper::wrap_ast,
        ir_wrapper::{IrCursor, IrNode},
        protocol::{replacement_for, Mutation},
        registry::Registration,
        traverse::{accepts, Cursor},
    },
    config::BridgeConfig,
    events::{EventKind, LogSink},
    ir::{IrInstruction, IrMethod},
    value::{DynamicValue, ScriptFunction},
};

/// What an IR handler is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum IrHandlerKind {
    /// Binary operations.
    BinaryOp,
    /// Unary operations.
    UnaryOp,
    /// Invocations.
    Invoke,
    /// Field reads.
    GetField,
    /// Field writes.
    PutField,
    /// Constant loads.
    Constant,
    /// Branches.
    Branch,
    /// Returns.
    Return,
    /// Object allocations.
    New,
    /// Array allocations.
    NewArray,
    /// Casts and `instanceof`.
    TypeCheck,
    /// Whole blocks; observational.
    Block,
    /// Every instruction.
    Instruction,
}

impl IrHandlerKind {
    /// Name of the script registration function.
    #[must_use]
    pub fn registration_name(self) -> &'static str {
        match self {
            IrHandlerKind::BinaryOp => "onBinaryOp",
            IrHandlerKind::UnaryOp => "onUnaryOp",
            IrHandlerKind::Invoke => "onInvoke",
            IrHandlerKind::GetField => "onGetField",
            IrHandlerKind::PutField => "onPutField",
            IrHandlerKind::Constant => "onConstant",
            IrHandlerKind::Branch => "onBranch",
            IrHandlerKind::Return => "onReturn",
            IrHandlerKind::New => "onNew",
            IrHandlerKind::NewArray => "onNewArray",
            IrHandlerKind::TypeCheck => "onTypeCheck",
            IrHandlerKind::Block => "forEachBlock",
            IrHandlerKind::Instruction => "forEachInstruction",
        }
    }

    /// Returns true if handlers of this kind are offered `instr`.
    #[must_use]
    pub fn accepts(self, instr: &IrInstruction) -> bool {
        match self {
            IrHandlerKind::BinaryOp => matches!(instr, IrInstruction::BinaryOp { .. }),
            IrHandlerKind::UnaryOp => matches!(instr, IrInstruction::UnaryOp { .. }),
            IrHandlerKind::Invoke => matches!(instr, IrInstruction::Invoke { .. }),
            IrHandlerKind::GetField => matches!(instr, IrInstruction::FieldRead { .. }),
            IrHandlerKind::PutField => matches!(instr, IrInstruction::FieldWrite { .. }),
            IrHandlerKind::Constant => matches!(instr, IrInstruction::ConstantLoad { .. }),
            IrHandlerKind::Branch => matches!(instr, IrInstruction::Branch { .. }),
            IrHandlerKind::Return => matches!(instr, IrInstruction::Return { .. }),
            IrHandlerKind::New => matches!(instr, IrInstruction::New { .. }),
            IrHandlerKind::NewArray => matches!(instr, IrInstruction::NewArray { .. }),
            IrHandlerKind::TypeCheck => matches!(instr, IrInstruction::TypeCheck { .. }),
            IrHandlerKind::Block => false,
            IrHandlerKind::Instruction => true,
        }
    }
}

/// Calls a handler, reporting failures. A failing handler has no result.
pub(crate) fn invoke_handler(
    action: &ScriptFunction,
    wrapped: DynamicValue,
    sink: &dyn LogSink,
    label: &str,
) -> Option<DynamicValue> {
    match action.call(&[wrapped]) {
        Ok(result) => result,
        Err(e) => {
            sink.record(EventKind::CallbackFailed)
                .method(label)
                .message(format!("Handler error: {e}"));
            None
        }
    }
}

fn handler_order(handlers: &[Registration<IrHandlerKind>]) -> Vec<&Registration<IrHandlerKind>> {
    let mut first_seen: HashMap<IrHandlerKind, usize> = HashMap::new();
    for (i, h) in handlers.iter().enumerate() {
        first_seen.entry(h.kind).or_insert(i);
    }
    let mut ordered: Vec<(usize, usize, &Registration<IrHandlerKind>)> = handlers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let group = if h.kind == IrHandlerKind::Block { 0 } else { first_seen[&h.kind] + 1 };
            (group, i, h)
        })
        .collect();
    ordered.sort_by_key(|(group, i, _)| (*group, *i));
    ordered.into_iter().map(|(_, _, h)| h).collect()
}

/// Runs IR handlers over `method` and returns the number of accepted
/// mutations.
///
/// `label` names the method in events.
pub fn dispatch_ir(
    method: &mut IrMethod,
    handlers: &[Registration<IrHandlerKind>],
    sink: &Rc<dyn LogSink>,
    config: &BridgeConfig,
    label: &str,
) -> usize {
    let mut mutations = 0;

    for handler in handler_order(handlers) {
        for block_index in 0..method.blocks().len() {
            let block = Rc::new(method.blocks()[block_index].clone());

            if handler.kind == IrHandlerKind::Block {
                let wrapped = IrCursor::root(IrNode::Block(block), sink.clone()).wrap();
                if accepts(handler.predicate.as_ref(), &wrapped, &**sink) {
                    invoke_handler(&handler.action, wrapped, &**sink, label);
                }
                continue;
            }

            for instr in block.instructions() {
                if !handler.kind.accepts(instr) {
                    continue;
                }
                let wrapped = IrCursor::within(
                    IrNode::Instruction(instr.clone()),
                    vec![IrNode::Block(block.clone())],
                    sink.clone(),
                )
                .wrap();
                if !accepts(handler.predicate.as_ref(), &wrapped, &**sink) {
                    continue;
                }

                let result = invoke_handler(&handler.action, wrapped, &**sink, label);
                let mutation = Mutation::from_result(result, instr, &**sink);
                let description = match &mutation {
                    Mutation::Keep => continue,
                    Mutation::Remove => format!("Removed {instr}"),
                    Mutation::Replace(new) => format!("Replaced {instr} with {new}"),
                };
                if let Some((kind, index)) = mutation.apply(&mut method.blocks_mut()[block_index], instr) {
                    mutations += 1;
                    if config.record_mutations {
                        sink.record(kind).at(label, index).message(description);
                    }
                }
            }
        }
    }
    mutations
}

/// Runs syntax-tree handlers over `tree` and returns the number of accepted
/// edits.
///
/// Rejected edits (a category mismatch, removing a required child) are
/// reported and not counted.
pub fn dispatch_ast(
    tree: &SharedTree,
    handlers: &[Registration<NodeKind>],
    sink: &Rc<dyn LogSink>,
    config: &BridgeConfig,
    label: &str,
) -> usize {
    let mut editor = AstEditor::new(tree.clone());
    for handler in handlers {
        let sink = sink.clone();
        editor.on(handler.kind, move |node: &AstRef| {
            let wrapped = wrap_ast(node.clone(), sink.clone());
            if !accepts(handler.predicate.as_ref(), &wrapped, &*sink) {
                return Replacement::Keep;
            }
            let result = invoke_handler(&handler.action, wrapped, &*sink, label);
            replacement_for(result, node)
        });
    }

    let summary = editor.apply();
    for edit in &summary.edits {
        match &edit.action {
            EditAction::Failed(e) => {
                sink.record(EventKind::Warning)
                    .method(label)
                    .message(format!("Rejected edit of {}: {e}", edit.kind));
            }
            EditAction::Removed if config.record_mutations => {
                sink.record(EventKind::NodeRemoved)
                    .at(label, edit.node.index())
                    .message(format!("Removed {}", edit.kind));
            }
            EditAction::Replaced if config.record_mutations => {
                sink.record(EventKind::NodeReplaced)
                    .at(label, edit.node.index())
                    .message(format!("Replaced {}", edit.kind));
            }
            _ => {}
        }
    }
    summary.applied()
}
