//! IR instructions.
//!
//! The instruction set is the minimal contract the rewriting engines depend on.
//! Each variant optionally defines one [`VirtualRegister`] (its result) and
//! reads any number of [`Value`] operands.

use std::fmt;

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use crate::ir::{Constant, Value, VirtualRegister};

/// Discriminant of an [`IrInstruction`].
///
/// The string forms are the `kind` tags scripts see on wrapped instructions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
pub enum InstructionKind {
    /// Load of a constant into a register.
    ConstantLoad,
    /// Two-operand arithmetic or bitwise operation.
    BinaryOp,
    /// One-operand operation (negation, primitive conversion).
    UnaryOp,
    /// Method invocation.
    Invoke,
    /// Static or instance field load.
    FieldRead,
    /// Static or instance field store.
    FieldWrite,
    /// Object allocation.
    New,
    /// Array allocation.
    NewArray,
    /// `checkcast` or `instanceof`.
    TypeCheck,
    /// Conditional or unconditional branch.
    Branch,
    /// Method return.
    Return,
}

/// Binary arithmetic and bitwise opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BinaryOpcode {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Remainder.
    Rem,
    /// Shift left.
    Shl,
    /// Arithmetic shift right.
    Shr,
    /// Logical shift right.
    Ushr,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise exclusive or.
    Xor,
    /// Three-way comparison (`lcmp`, `fcmpl`, ...).
    Cmp,
}

/// Unary opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UnaryOpcode {
    /// Arithmetic negation.
    Neg,
    /// `int` to `long`.
    #[strum(serialize = "I2L")]
    I2L,
    /// `int` to `float`.
    #[strum(serialize = "I2F")]
    I2F,
    /// `int` to `double`.
    #[strum(serialize = "I2D")]
    I2D,
    /// `long` to `int`.
    #[strum(serialize = "L2I")]
    L2I,
    /// `float` to `int`.
    #[strum(serialize = "F2I")]
    F2I,
    /// `double` to `int`.
    #[strum(serialize = "D2I")]
    D2I,
    /// `int` to `byte`.
    #[strum(serialize = "I2B")]
    I2B,
    /// `int` to `char`.
    #[strum(serialize = "I2C")]
    I2C,
    /// `int` to `short`.
    #[strum(serialize = "I2S")]
    I2S,
}

/// Dispatch flavour of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InvokeKind {
    /// `invokevirtual`.
    Virtual,
    /// `invokestatic`.
    Static,
    /// `invokespecial`.
    Special,
    /// `invokeinterface`.
    Interface,
    /// `invokedynamic`.
    Dynamic,
}

/// Comparison performed by a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BranchCondition {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Greater or equal.
    Ge,
    /// Greater than.
    Gt,
    /// Less or equal.
    Le,
    /// Reference is null.
    IfNull,
    /// Reference is not null.
    IfNonNull,
}

/// Flavour of a [`IrInstruction::TypeCheck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum TypeCheckKind {
    /// `checkcast`.
    Cast,
    /// `instanceof`.
    InstanceOf,
}

/// One IR instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum IrInstruction {
    /// `dest = value`
    ConstantLoad {
        /// Defined register.
        dest: VirtualRegister,
        /// Loaded constant.
        value: Constant,
    },
    /// `dest = left <op> right`
    BinaryOp {
        /// Defined register.
        dest: VirtualRegister,
        /// Operation.
        op: BinaryOpcode,
        /// Left operand.
        left: Value,
        /// Right operand.
        right: Value,
    },
    /// `dest = <op> operand`
    UnaryOp {
        /// Defined register.
        dest: VirtualRegister,
        /// Operation.
        op: UnaryOpcode,
        /// Operand.
        operand: Value,
    },
    /// `[dest =] owner.name(args)`; instance calls carry the receiver as `args[0]`.
    Invoke {
        /// Defined register, absent for `void` methods.
        dest: Option<VirtualRegister>,
        /// Dispatch flavour.
        kind: InvokeKind,
        /// Internal name of the declaring class.
        owner: String,
        /// Method name.
        name: String,
        /// Method descriptor.
        descriptor: String,
        /// Arguments, receiver first for instance calls.
        args: Vec<Value>,
    },
    /// `dest = [object.]owner.name`
    FieldRead {
        /// Defined register.
        dest: VirtualRegister,
        /// Internal name of the declaring class.
        owner: String,
        /// Field name.
        name: String,
        /// Field descriptor.
        descriptor: String,
        /// Receiver, absent for static fields.
        object: Option<Value>,
    },
    /// `[object.]owner.name = value`
    FieldWrite {
        /// Internal name of the declaring class.
        owner: String,
        /// Field name.
        name: String,
        /// Field descriptor.
        descriptor: String,
        /// Receiver, absent for static fields.
        object: Option<Value>,
        /// Stored value.
        value: Value,
    },
    /// `dest = new class_name`
    New {
        /// Defined register.
        dest: VirtualRegister,
        /// Internal name of the allocated class.
        class_name: String,
    },
    /// `dest = new element_type[dimensions...]`
    NewArray {
        /// Defined register.
        dest: VirtualRegister,
        /// Element type descriptor.
        element_type: String,
        /// One length operand per dimension.
        dimensions: Vec<Value>,
    },
    /// `dest = (target_type) operand` or `dest = operand instanceof target_type`
    TypeCheck {
        /// Defined register.
        dest: VirtualRegister,
        /// Cast or instanceof.
        kind: TypeCheckKind,
        /// Checked value.
        operand: Value,
        /// Target type descriptor.
        target_type: String,
    },
    /// Conditional (`condition` set) or unconditional branch.
    Branch {
        /// Comparison, absent for `goto`.
        condition: Option<BranchCondition>,
        /// Left comparand.
        left: Option<Value>,
        /// Right comparand, absent for comparisons against zero or null.
        right: Option<Value>,
        /// Block taken when the condition holds (or always, for `goto`).
        true_target: u32,
        /// Fall-through block of a conditional branch.
        false_target: Option<u32>,
    },
    /// `return [value]`
    Return {
        /// Returned value, absent for `void` returns.
        value: Option<Value>,
    },
}

impl IrInstruction {
    /// Returns the discriminant.
    #[must_use]
    pub fn kind(&self) -> InstructionKind {
        match self {
            Self::ConstantLoad { .. } => InstructionKind::ConstantLoad,
            Self::BinaryOp { .. } => InstructionKind::BinaryOp,
            Self::UnaryOp { .. } => InstructionKind::UnaryOp,
            Self::Invoke { .. } => InstructionKind::Invoke,
            Self::FieldRead { .. } => InstructionKind::FieldRead,
            Self::FieldWrite { .. } => InstructionKind::FieldWrite,
            Self::New { .. } => InstructionKind::New,
            Self::NewArray { .. } => InstructionKind::NewArray,
            Self::TypeCheck { .. } => InstructionKind::TypeCheck,
            Self::Branch { .. } => InstructionKind::Branch,
            Self::Return { .. } => InstructionKind::Return,
        }
    }

    /// Returns the register this instruction defines, if any.
    #[must_use]
    pub fn result(&self) -> Option<&VirtualRegister> {
        match self {
            Self::ConstantLoad { dest, .. }
            | Self::BinaryOp { dest, .. }
            | Self::UnaryOp { dest, .. }
            | Self::FieldRead { dest, .. }
            | Self::New { dest, .. }
            | Self::NewArray { dest, .. }
            | Self::TypeCheck { dest, .. } => Some(dest),
            Self::Invoke { dest, .. } => dest.as_ref(),
            Self::FieldWrite { .. } | Self::Branch { .. } | Self::Return { .. } => None,
        }
    }

    /// Returns every operand read by this instruction, in operand order.
    #[must_use]
    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Self::ConstantLoad { .. } | Self::New { .. } => Vec::new(),
            Self::BinaryOp { left, right, .. } => vec![left, right],
            Self::UnaryOp { operand, .. } | Self::TypeCheck { operand, .. } => vec![operand],
            Self::Invoke { args, .. } => args.iter().collect(),
            Self::FieldRead { object, .. } => object.iter().collect(),
            Self::FieldWrite { object, value, .. } => object.iter().chain(Some(value)).collect(),
            Self::NewArray { dimensions, .. } => dimensions.iter().collect(),
            Self::Branch { left, right, .. } => left.iter().chain(right.iter()).collect(),
            Self::Return { value } => value.iter().collect(),
        }
    }

    /// Returns the `owner.name` target of invocations and field accesses.
    #[must_use]
    pub fn member_target(&self) -> Option<String> {
        match self {
            Self::Invoke { owner, name, .. }
            | Self::FieldRead { owner, name, .. }
            | Self::FieldWrite { owner, name, .. } => Some(format!("{owner}.{name}")),
            _ => None,
        }
    }

    /// Returns the loaded constant of a [`IrInstruction::ConstantLoad`].
    #[must_use]
    pub fn constant(&self) -> Option<&Constant> {
        match self {
            Self::ConstantLoad { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Returns true if this instruction ends its block.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        matches!(self, Self::Branch { .. } | Self::Return { .. })
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{v}")?;
    }
    Ok(())
}

impl fmt::Display for IrInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConstantLoad { dest, value } => write!(f, "{dest} = {value}"),
            Self::BinaryOp {
                dest,
                op,
                left,
                right,
            } => write!(f, "{dest} = {op} {left}, {right}"),
            Self::UnaryOp { dest, op, operand } => write!(f, "{dest} = {op} {operand}"),
            Self::Invoke {
                dest,
                kind,
                owner,
                name,
                descriptor,
                args,
            } => {
                if let Some(dest) = dest {
                    write!(f, "{dest} = ")?;
                }
                write!(f, "INVOKE_{kind} {owner}.{name}{descriptor}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Self::FieldRead {
                dest,
                owner,
                name,
                object,
                ..
            } => match object {
                Some(obj) => write!(f, "{dest} = {obj}.{owner}.{name}"),
                None => write!(f, "{dest} = {owner}.{name}"),
            },
            Self::FieldWrite {
                owner,
                name,
                object,
                value,
                ..
            } => match object {
                Some(obj) => write!(f, "{obj}.{owner}.{name} = {value}"),
                None => write!(f, "{owner}.{name} = {value}"),
            },
            Self::New { dest, class_name } => write!(f, "{dest} = new {class_name}"),
            Self::NewArray {
                dest,
                element_type,
                dimensions,
            } => {
                write!(f, "{dest} = newarray {element_type}[")?;
                write_args(f, dimensions)?;
                write!(f, "]")
            }
            Self::TypeCheck {
                dest,
                kind,
                operand,
                target_type,
            } => match kind {
                TypeCheckKind::Cast => write!(f, "{dest} = ({target_type}) {operand}"),
                TypeCheckKind::InstanceOf => {
                    write!(f, "{dest} = {operand} instanceof {target_type}")
                }
            },
            Self::Branch {
                condition,
                left,
                right,
                true_target,
                false_target,
            } => match condition {
                None => write!(f, "goto block_{true_target}"),
                Some(cond) => {
                    write!(f, "if {cond}")?;
                    if let Some(left) = left {
                        write!(f, " {left}")?;
                    }
                    if let Some(right) = right {
                        write!(f, ", {right}")?;
                    }
                    write!(f, " then block_{true_target}")?;
                    if let Some(other) = false_target {
                        write!(f, " else block_{other}")?;
                    }
                    Ok(())
                }
            },
            Self::Return { value } => match value {
                Some(v) => write!(f, "return {v}"),
                None => write!(f, "return"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    fn reg(id: u32) -> VirtualRegister {
        VirtualRegister::new(id, format!("v{id}"))
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in InstructionKind::iter() {
            assert_eq!(InstructionKind::from_str(kind.as_ref()).unwrap(), kind);
        }
        assert!(InstructionKind::from_str("Bogus").is_err());
        assert_eq!(BinaryOpcode::Ushr.to_string(), "USHR");
        assert_eq!(UnaryOpcode::from_str("I2L").unwrap(), UnaryOpcode::I2L);
    }

    #[test]
    fn test_result_and_operands() {
        let add = IrInstruction::BinaryOp {
            dest: reg(3),
            op: BinaryOpcode::Add,
            left: reg(1).into(),
            right: Constant::Int(2).into(),
        };
        assert_eq!(add.result().map(|r| r.id), Some(3));
        assert_eq!(add.operands().len(), 2);
        assert_eq!(add.to_string(), "v3 = ADD v1, 2");

        let store = IrInstruction::FieldWrite {
            owner: "a/B".into(),
            name: "count".into(),
            descriptor: "I".into(),
            object: Some(reg(0).into()),
            value: reg(4).into(),
        };
        assert!(store.result().is_none());
        assert_eq!(store.operands().len(), 2);
        assert_eq!(store.member_target().as_deref(), Some("a/B.count"));

        let ret = IrInstruction::Return { value: None };
        assert!(ret.is_terminator());
        assert_eq!(ret.to_string(), "return");
    }

    #[test]
    fn test_invoke_display() {
        let call = IrInstruction::Invoke {
            dest: None,
            kind: InvokeKind::Virtual,
            owner: "java/io/PrintStream".into(),
            name: "println".into(),
            descriptor: "(Ljava/lang/String;)V".into(),
            args: vec![reg(0).into(), reg(1).into()],
        };
        assert_eq!(
            call.to_string(),
            "INVOKE_VIRTUAL java/io/PrintStream.println(Ljava/lang/String;)V(v0, v1)"
        );
        assert_eq!(call.member_target().as_deref(), Some("java/io/PrintStream.println"));
    }
}
