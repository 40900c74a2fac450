//! Operands and results of IR instructions.

use std::fmt;

use crate::value::DynamicValue;

/// An SSA virtual register.
///
/// Every register is defined by exactly one instruction of its method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualRegister {
    /// Method-unique register number.
    pub id: u32,
    /// Display name, usually `v<id>` or a recovered local name.
    pub name: String,
    /// Inferred type descriptor, when the lifter knows it.
    pub ty: Option<String>,
}

impl VirtualRegister {
    /// Creates an untyped register.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ty: None,
        }
    }

    /// Creates a register with an inferred type descriptor.
    pub fn typed(id: u32, name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ty: Some(ty.into()),
        }
    }
}

impl fmt::Display for VirtualRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Compile-time constants that can be loaded or used as operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// 32-bit signed integer (also booleans, chars, bytes and shorts).
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit floating point.
    Float(f32),
    /// 64-bit floating point.
    Double(f64),
    /// String literal.
    String(String),
    /// The null reference.
    Null,
}

impl Constant {
    /// Script-visible name of the constant's type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Constant::Int(_) => "int",
            Constant::Long(_) => "long",
            Constant::Float(_) => "float",
            Constant::Double(_) => "double",
            Constant::String(_) => "string",
            Constant::Null => "null",
        }
    }

    /// Converts the payload to a script value.
    #[must_use]
    pub fn to_dynamic(&self) -> DynamicValue {
        match self {
            Constant::Int(v) => DynamicValue::from(*v),
            Constant::Long(v) => DynamicValue::from(*v),
            Constant::Float(v) => DynamicValue::from(*v),
            Constant::Double(v) => DynamicValue::from(*v),
            Constant::String(s) => DynamicValue::from(s.as_str()),
            Constant::Null => DynamicValue::Null,
        }
    }

    /// Builds a constant from a script value and an optional type name.
    ///
    /// `null` always yields [`Constant::Null`]. Without a type name, strings
    /// become string constants and everything else an `int`. Unknown type
    /// names fall back to `int`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_dynamic(value: &DynamicValue, ty: Option<&str>) -> Constant {
        if value.is_null() {
            return Constant::Null;
        }
        let ty = ty.map(str::to_ascii_lowercase).unwrap_or_else(|| {
            if value.as_str().is_some() {
                "string".to_string()
            } else {
                "int".to_string()
            }
        });
        match ty.as_str() {
            "long" => Constant::Long(value.as_number() as i64),
            "float" => Constant::Float(value.as_number() as f32),
            "double" => Constant::Double(value.as_number()),
            "string" => Constant::String(value.to_string()),
            _ => Constant::Int(value.as_number() as i32),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::Float(v) => write!(f, "{v}f"),
            Self::Double(v) => write!(f, "{v}d"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// An instruction operand or result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A virtual register.
    Register(VirtualRegister),
    /// An inline constant.
    Constant(Constant),
}

impl Value {
    /// Returns the register, if this is one.
    #[must_use]
    pub fn as_register(&self) -> Option<&VirtualRegister> {
        match self {
            Value::Register(reg) => Some(reg),
            Value::Constant(_) => None,
        }
    }
}

impl From<VirtualRegister> for Value {
    fn from(reg: VirtualRegister) -> Self {
        Value::Register(reg)
    }
}

impl From<Constant> for Value {
    fn from(c: Constant) -> Self {
        Value::Constant(c)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Register(reg) => write!(f, "{reg}"),
            Value::Constant(c) => write!(f, "{c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dynamic() {
        assert_eq!(Constant::from_dynamic(&DynamicValue::Null, Some("int")), Constant::Null);
        assert_eq!(Constant::from_dynamic(&DynamicValue::from(3.9), None), Constant::Int(3));
        assert_eq!(
            Constant::from_dynamic(&DynamicValue::from(5), Some("LONG")),
            Constant::Long(5)
        );
        assert_eq!(
            Constant::from_dynamic(&DynamicValue::from(12), Some("string")),
            Constant::String("12".into())
        );
        assert_eq!(
            Constant::from_dynamic(&DynamicValue::from("hi"), None),
            Constant::String("hi".into())
        );
        assert_eq!(
            Constant::from_dynamic(&DynamicValue::from(2.5), Some("double")),
            Constant::Double(2.5)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Constant::Long(4).to_string(), "4L");
        assert_eq!(Constant::String("a\"b".into()).to_string(), "\"a\\\"b\"");
        assert_eq!(
            Value::Register(VirtualRegister::typed(3, "v3", "I")).to_string(),
            "v3"
        );
        assert_eq!(Constant::Long(1 << 40).to_dynamic(), DynamicValue::from(1i64 << 40));
    }
}
