//! Source-level type names as scripts spell them.
//!
//! Scripts pass types as plain strings: `"int"`, `"void"`, `"java.lang.String"`,
//! `"java/lang/String"` or `"int[]"`. [`SourceType::parse`] normalizes those;
//! anything that is not a string is treated as `java/lang/Object`.

use std::fmt;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::value::DynamicValue;

/// The eight primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[allow(missing_docs)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    fn wrapper(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "java/lang/Boolean",
            PrimitiveType::Byte => "java/lang/Byte",
            PrimitiveType::Char => "java/lang/Character",
            PrimitiveType::Short => "java/lang/Short",
            PrimitiveType::Int => "java/lang/Integer",
            PrimitiveType::Long => "java/lang/Long",
            PrimitiveType::Float => "java/lang/Float",
            PrimitiveType::Double => "java/lang/Double",
        }
    }

    fn from_wrapper(internal: &str) -> Option<Self> {
        use strum::IntoEnumIterator;
        PrimitiveType::iter().find(|p| p.wrapper() == internal)
    }
}

/// A parsed source type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// A primitive.
    Primitive(PrimitiveType),
    /// `void`
    Void,
    /// A class or interface, by internal name.
    Reference(String),
    /// An array of the element type.
    Array(Box<SourceType>),
}

impl SourceType {
    /// `java/lang/Object`
    #[must_use]
    pub fn object() -> Self {
        SourceType::Reference("java/lang/Object".to_string())
    }

    /// Parses a type name.
    ///
    /// Bare simple names of boxed types (`Integer`) are taken to mean the
    /// `java/lang` class.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if let Some(element) = name.strip_suffix("[]") {
            return SourceType::Array(Box::new(SourceType::parse(element)));
        }
        if name.is_empty() {
            return SourceType::object();
        }
        if name == "void" {
            return SourceType::Void;
        }
        if let Ok(primitive) = name.parse::<PrimitiveType>() {
            return SourceType::Primitive(primitive);
        }
        let internal = name.replace('.', "/");
        if !internal.contains('/') {
            let qualified = format!("java/lang/{internal}");
            if PrimitiveType::from_wrapper(&qualified).is_some() || internal == "String" || internal == "Object" {
                return SourceType::Reference(qualified);
            }
        }
        SourceType::Reference(internal)
    }

    /// Reads a type from a script argument.
    #[must_use]
    pub fn from_dynamic(value: &DynamicValue) -> Self {
        value.as_str().map_or_else(SourceType::object, SourceType::parse)
    }

    /// Numeric primitives: everything but `boolean`.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, SourceType::Primitive(p) if *p != PrimitiveType::Boolean)
    }

    /// `byte`, `char`, `short`, `int` and `long`.
    #[must_use]
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            SourceType::Primitive(
                PrimitiveType::Byte
                    | PrimitiveType::Char
                    | PrimitiveType::Short
                    | PrimitiveType::Int
                    | PrimitiveType::Long
            )
        )
    }

    /// Any primitive.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self, SourceType::Primitive(_))
    }

    /// Classes, interfaces and arrays.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, SourceType::Reference(_) | SourceType::Array(_))
    }

    /// `void`
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, SourceType::Void)
    }

    /// One of the eight wrapper classes.
    #[must_use]
    pub fn is_boxed(&self) -> bool {
        self.unboxed().is_some()
    }

    /// Wrapper class of a primitive.
    #[must_use]
    pub fn boxed(&self) -> Option<SourceType> {
        match self {
            SourceType::Primitive(p) => Some(SourceType::Reference(p.wrapper().to_string())),
            _ => None,
        }
    }

    /// Primitive of a wrapper class.
    #[must_use]
    pub fn unboxed(&self) -> Option<SourceType> {
        match self {
            SourceType::Reference(name) => PrimitiveType::from_wrapper(name).map(SourceType::Primitive),
            _ => None,
        }
    }

    /// Unqualified name, e.g. `String` or `int[]`.
    #[must_use]
    pub fn simple_name(&self) -> String {
        match self {
            SourceType::Primitive(p) => p.to_string(),
            SourceType::Void => "void".to_string(),
            SourceType::Reference(name) => name.rsplit('/').next().unwrap_or(name).to_string(),
            SourceType::Array(element) => format!("{}[]", element.simple_name()),
        }
    }
}

impl fmt::Display for SourceType {
    /// Source spelling: `java.lang` types by simple name, others qualified.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Primitive(p) => write!(f, "{p}"),
            SourceType::Void => write!(f, "void"),
            SourceType::Reference(name) => match name.strip_prefix("java/lang/") {
                Some(simple) if !simple.contains('/') => write!(f, "{simple}"),
                _ => write!(f, "{}", name.replace('/', ".")),
            },
            SourceType::Array(element) => write!(f, "{element}[]"),
        }
    }
}
