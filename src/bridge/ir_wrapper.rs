//! Script view of IR blocks, instructions and values.
//!
//! A wrapper is a plain [`DynamicValue::Object`] holding a `kind` tag, an
//! `_native` handle back to the wrapped node, variant-specific fields and the
//! traversal methods from [`crate::bridge::traverse`]. Kind tags are `Block`,
//! the [`InstructionKind`] names, `Register` and `Constant`; searches also
//! accept `Instruction` and `Value` as catch-alls.
//!
//! IR nodes have no parent links of their own, so every wrapper remembers the
//! chain of nodes it was reached through; `findAncestor` walks that chain.

use std::{rc::Rc, str::FromStr};

use crate::{
    bridge::traverse::{self, Cursor},
    events::LogSink,
    ir::{Constant, InstructionKind, IrBlock, IrInstruction, TypeCheckKind, Value, VirtualRegister},
    value::{DynamicValue, NativeHandle, Properties},
};

/// A node of the IR hierarchy.
#[derive(Debug, Clone)]
pub enum IrNode {
    /// A block snapshot.
    Block(Rc<IrBlock>),
    /// An instruction.
    Instruction(Rc<IrInstruction>),
    /// An operand or result.
    Value(Rc<Value>),
    /// A free-standing constant.
    Constant(Rc<Constant>),
}

impl IrNode {
    /// Wraps a register as a value node.
    #[must_use]
    pub fn register(reg: &VirtualRegister) -> Self {
        IrNode::Value(Rc::new(Value::Register(reg.clone())))
    }

    /// The script-visible kind tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            IrNode::Block(_) => "Block",
            IrNode::Instruction(instr) => instr.kind().into(),
            IrNode::Value(value) => match value.as_ref() {
                Value::Register(_) => "Register",
                Value::Constant(_) => "Constant",
            },
            IrNode::Constant(_) => "Constant",
        }
    }

    /// Returns true if this node answers to `tag`.
    #[must_use]
    pub fn has_kind(&self, tag: &str) -> bool {
        match tag {
            "Instruction" => matches!(self, IrNode::Instruction(_)),
            "Value" => matches!(self, IrNode::Value(_)),
            _ => self.kind() == tag,
        }
    }

    /// Returns true if `tag` is a kind tag or catch-all.
    #[must_use]
    pub fn knows_kind(tag: &str) -> bool {
        matches!(tag, "Block" | "Register" | "Constant" | "Instruction" | "Value")
            || InstructionKind::from_str(tag).is_ok()
    }

    /// Direct children: a block's instructions, a constant load's constant,
    /// or an instruction's operands.
    #[must_use]
    pub fn children(&self) -> Vec<IrNode> {
        match self {
            IrNode::Block(block) => block
                .instructions()
                .iter()
                .cloned()
                .map(IrNode::Instruction)
                .collect(),
            IrNode::Instruction(instr) => match instr.as_ref() {
                IrInstruction::ConstantLoad { value, .. } => vec![IrNode::Constant(Rc::new(value.clone()))],
                other => other
                    .operands()
                    .into_iter()
                    .map(|v| IrNode::Value(Rc::new(v.clone())))
                    .collect(),
            },
            IrNode::Value(_) | IrNode::Constant(_) => Vec::new(),
        }
    }

    /// Handle stored in the wrapper's `_native` field.
    #[must_use]
    pub fn handle(&self) -> NativeHandle {
        match self {
            IrNode::Block(b) => NativeHandle::Block(b.clone()),
            IrNode::Instruction(i) => NativeHandle::Instruction(i.clone()),
            IrNode::Value(v) => NativeHandle::Value(v.clone()),
            IrNode::Constant(c) => NativeHandle::Constant(c.clone()),
        }
    }

    /// Recovers an IR node from a handle; syntax-tree handles yield `None`.
    #[must_use]
    pub fn from_handle(handle: &NativeHandle) -> Option<Self> {
        match handle {
            NativeHandle::Block(b) => Some(IrNode::Block(b.clone())),
            NativeHandle::Instruction(i) => Some(IrNode::Instruction(i.clone())),
            NativeHandle::Value(v) => Some(IrNode::Value(v.clone())),
            NativeHandle::Constant(c) => Some(IrNode::Constant(c.clone())),
            NativeHandle::AstNode(_) => None,
        }
    }
}

/// An [`IrNode`] with the chain of nodes it was reached through.
#[derive(Clone)]
pub struct IrCursor {
    node: IrNode,
    /// Outermost first.
    path: Rc<Vec<IrNode>>,
    sink: Rc<dyn LogSink>,
}

impl IrCursor {
    /// A cursor with no enclosing nodes.
    #[must_use]
    pub fn root(node: IrNode, sink: Rc<dyn LogSink>) -> Self {
        Self {
            node,
            path: Rc::new(Vec::new()),
            sink,
        }
    }

    /// A cursor for `node` enclosed by `parents` (outermost first).
    #[must_use]
    pub fn within(node: IrNode, parents: Vec<IrNode>, sink: Rc<dyn LogSink>) -> Self {
        Self {
            node,
            path: Rc::new(parents),
            sink,
        }
    }

    /// The node under the cursor.
    #[must_use]
    pub fn node(&self) -> &IrNode {
        &self.node
    }

    fn child(&self, node: IrNode) -> Self {
        let mut path = self.path.as_ref().clone();
        path.push(self.node.clone());
        Self {
            node,
            path: Rc::new(path),
            sink: self.sink.clone(),
        }
    }

    fn wrap_child(&self, node: IrNode) -> DynamicValue {
        self.child(node).wrap()
    }

    fn wrap_value(&self, value: &Value) -> DynamicValue {
        self.wrap_child(IrNode::Value(Rc::new(value.clone())))
    }

    fn wrap_opt(&self, value: Option<&Value>) -> DynamicValue {
        value.map_or(DynamicValue::Null, |v| self.wrap_value(v))
    }

    fn wrap_values<'a>(&self, values: impl IntoIterator<Item = &'a Value>) -> DynamicValue {
        DynamicValue::array(values.into_iter().map(|v| self.wrap_value(v)))
    }

    fn wrap_result(&self, reg: Option<&VirtualRegister>) -> DynamicValue {
        reg.map_or(DynamicValue::Null, |r| self.wrap_child(IrNode::register(r)))
    }

    fn constant_fields(props: &mut Properties, constant: &Constant) {
        props.insert("isConstant", true);
        props.insert("value", constant.to_dynamic());
        props.insert("constantType", constant.type_name());
    }

    fn instruction_fields(&self, props: &mut Properties, instr: &IrInstruction) {
        match instr {
            IrInstruction::ConstantLoad { dest, value } => {
                Self::constant_fields(props, value);
                props.remove("isConstant");
                props.insert("constant", self.wrap_child(IrNode::Constant(Rc::new(value.clone()))));
                props.insert("result", self.wrap_result(Some(dest)));
            }
            IrInstruction::BinaryOp {
                dest,
                op,
                left,
                right,
            } => {
                props.insert("op", op.to_string());
                props.insert("left", self.wrap_value(left));
                props.insert("right", self.wrap_value(right));
                props.insert("result", self.wrap_result(Some(dest)));
            }
            IrInstruction::UnaryOp { dest, op, operand } => {
                props.insert("op", op.to_string());
                props.insert("operand", self.wrap_value(operand));
                props.insert("result", self.wrap_result(Some(dest)));
            }
            IrInstruction::Invoke {
                dest,
                kind,
                owner,
                name,
                descriptor,
                args,
            } => {
                props.insert("methodName", name.as_str());
                props.insert("name", name.as_str());
                props.insert("owner", owner.as_str());
                props.insert("descriptor", descriptor.as_str());
                props.insert("invokeType", kind.to_string());
                props.insert("args", self.wrap_values(args));
                props.insert("result", self.wrap_result(dest.as_ref()));
            }
            IrInstruction::FieldRead {
                dest,
                owner,
                name,
                descriptor,
                object,
            } => {
                Self::field_fields(props, owner, name, descriptor, object.is_none(), true);
                props.insert("objectRef", self.wrap_opt(object.as_ref()));
                props.insert("result", self.wrap_result(Some(dest)));
            }
            IrInstruction::FieldWrite {
                owner,
                name,
                descriptor,
                object,
                value,
            } => {
                Self::field_fields(props, owner, name, descriptor, object.is_none(), false);
                props.insert("objectRef", self.wrap_opt(object.as_ref()));
                props.insert("value", self.wrap_value(value));
            }
            IrInstruction::New { dest, class_name } => {
                props.insert("className", class_name.as_str());
                props.insert("result", self.wrap_result(Some(dest)));
            }
            IrInstruction::NewArray {
                dest,
                element_type,
                dimensions,
            } => {
                props.insert("elementType", element_type.as_str());
                props.insert("dimensions", self.wrap_values(dimensions));
                props.insert("result", self.wrap_result(Some(dest)));
            }
            IrInstruction::TypeCheck {
                dest,
                kind,
                operand,
                target_type,
            } => {
                props.insert("operand", self.wrap_value(operand));
                props.insert("targetType", target_type.as_str());
                props.insert("result", self.wrap_result(Some(dest)));
                props.insert("isCast", *kind == TypeCheckKind::Cast);
                props.insert("isInstanceOf", *kind == TypeCheckKind::InstanceOf);
            }
            IrInstruction::Branch {
                condition,
                left,
                right,
                true_target,
                false_target,
            } => {
                props.insert("condition", condition.map(|c| c.to_string()).unwrap_or_default());
                props.insert("left", self.wrap_opt(left.as_ref()));
                props.insert("right", self.wrap_opt(right.as_ref()));
                props.insert("trueTarget", format!("block_{true_target}"));
                props.insert("falseTarget", false_target.map(|t| format!("block_{t}")));
            }
            IrInstruction::Return { value } => {
                props.insert("value", self.wrap_opt(value.as_ref()));
                props.insert("isVoidReturn", value.is_none());
            }
        }
    }

    fn field_fields(props: &mut Properties, owner: &str, name: &str, descriptor: &str, is_static: bool, load: bool) {
        props.insert("fieldName", name);
        props.insert("name", name);
        props.insert("owner", owner);
        props.insert("descriptor", descriptor);
        props.insert("isStatic", is_static);
        props.insert("isLoad", load);
        props.insert("isStore", !load);
    }
}

impl Cursor for IrCursor {
    fn knows_kind(tag: &str) -> bool {
        IrNode::knows_kind(tag)
    }

    fn has_kind(&self, tag: &str) -> bool {
        self.node.has_kind(tag)
    }

    fn children(&self) -> Vec<Self> {
        self.node
            .children()
            .into_iter()
            .map(|c| self.child(c))
            .collect()
    }

    fn ancestors(&self) -> Vec<Self> {
        (0..self.path.len())
            .rev()
            .map(|i| IrCursor::within(self.path[i].clone(), self.path[..i].to_vec(), self.sink.clone()))
            .collect()
    }

    fn wrap(&self) -> DynamicValue {
        let mut props = Properties::with_capacity(16);
        props.insert("kind", self.node.kind());
        props.insert("_native", self.node.handle());

        match &self.node {
            IrNode::Block(block) => {
                props.insert("id", block.id());
                props.insert("instructionCount", block.len());
                props.insert(
                    "instructions",
                    DynamicValue::array(
                        block
                            .instructions()
                            .iter()
                            .map(|i| self.wrap_child(IrNode::Instruction(i.clone()))),
                    ),
                );
            }
            IrNode::Instruction(instr) => self.instruction_fields(&mut props, instr),
            IrNode::Value(value) => match value.as_ref() {
                Value::Register(reg) => {
                    props.insert("id", reg.id);
                    props.insert("name", reg.name.as_str());
                    props.insert("irType", reg.ty.clone());
                }
                Value::Constant(c) => Self::constant_fields(&mut props, c),
            },
            IrNode::Constant(c) => Self::constant_fields(&mut props, c),
        }

        traverse::install(&mut props, self);
        DynamicValue::Object(props)
    }

    fn sink(&self) -> &Rc<dyn LogSink> {
        &self.sink
    }
}

/// Wraps `node` with no enclosing context.
#[must_use]
pub fn wrap_ir(node: IrNode, sink: Rc<dyn LogSink>) -> DynamicValue {
    IrCursor::root(node, sink).wrap()
}
