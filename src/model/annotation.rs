//! Declared annotations (`RuntimeVisibleAnnotations` and friends).

use crate::{
    model::{ConstantPool, ConstantPoolEntry},
    value::{DynamicValue, Properties},
};

/// Element-value tag bytes as defined by the class-file format (JVMS 4.7.16.1).
#[allow(non_snake_case, missing_docs)]
pub mod ELEMENT_TAG {
    pub const BYTE: u8 = b'B';
    pub const CHAR: u8 = b'C';
    pub const DOUBLE: u8 = b'D';
    pub const FLOAT: u8 = b'F';
    pub const INT: u8 = b'I';
    pub const LONG: u8 = b'J';
    pub const SHORT: u8 = b'S';
    pub const BOOLEAN: u8 = b'Z';
    pub const STRING: u8 = b's';
    pub const ENUM: u8 = b'e';
    pub const CLASS: u8 = b'c';
    pub const ANNOTATION: u8 = b'@';
    pub const ARRAY: u8 = b'[';
}

/// Payload of an element value; which variant applies depends on the tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementPayload {
    /// Constant-pool index of a primitive or string constant.
    Const(u16),
    /// Enum constant.
    Enum {
        /// Index of the enum type descriptor.
        type_name_index: u16,
        /// Index of the constant's simple name.
        const_name_index: u16,
    },
    /// Index of a class descriptor (`Ljava/lang/String;`, `V`, ...).
    Class(u16),
    /// Nested annotation.
    Annotation(Box<Annotation>),
    /// Array of element values.
    Array(Vec<ElementValue>),
}

/// One element value.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementValue {
    /// Tag byte, one of [`ELEMENT_TAG`].
    pub tag: u8,
    /// Tag-specific payload.
    pub payload: ElementPayload,
}

impl ElementValue {
    /// Creates a constant element value.
    #[must_use]
    pub fn constant(tag: u8, const_index: u16) -> Self {
        Self {
            tag,
            payload: ElementPayload::Const(const_index),
        }
    }

    /// Decodes the value against `pool` into a script value.
    ///
    /// `s` yields the string, `B D F I J S` numbers, `Z` a boolean and `C` a
    /// one-character string. Enums become `{type, name}`, class literals their
    /// descriptor, nested annotations `{type, values}` and arrays arrays.
    /// Anything unresolvable yields `null`.
    #[must_use]
    pub fn decode(&self, pool: &ConstantPool) -> DynamicValue {
        match (&self.payload, self.tag) {
            (ElementPayload::Const(index), ELEMENT_TAG::STRING) => pool
                .utf8(*index)
                .map_or(DynamicValue::Null, DynamicValue::from),
            (ElementPayload::Const(index), ELEMENT_TAG::BOOLEAN) => match pool.get(*index) {
                Some(ConstantPoolEntry::Integer(v)) => DynamicValue::Bool(*v != 0),
                _ => DynamicValue::Bool(false),
            },
            (ElementPayload::Const(index), ELEMENT_TAG::CHAR) => match pool.get(*index) {
                Some(ConstantPoolEntry::Integer(v)) => u32::try_from(*v)
                    .ok()
                    .and_then(char::from_u32)
                    .map_or(DynamicValue::Null, |c| DynamicValue::Str(c.to_string())),
                _ => DynamicValue::Null,
            },
            (ElementPayload::Const(index), _) => match pool.get(*index) {
                Some(ConstantPoolEntry::Integer(v)) => DynamicValue::from(*v),
                Some(ConstantPoolEntry::Long(v)) => DynamicValue::from(*v),
                Some(ConstantPoolEntry::Float(v)) => DynamicValue::from(*v),
                Some(ConstantPoolEntry::Double(v)) => DynamicValue::from(*v),
                Some(ConstantPoolEntry::Utf8(s)) => DynamicValue::from(s.as_str()),
                _ => DynamicValue::Null,
            },
            (
                ElementPayload::Enum {
                    type_name_index,
                    const_name_index,
                },
                _,
            ) => DynamicValue::Object(
                Properties::new()
                    .with("type", pool.utf8(*type_name_index).unwrap_or_default())
                    .with("name", pool.utf8(*const_name_index).unwrap_or_default()),
            ),
            (ElementPayload::Class(index), _) => pool
                .utf8(*index)
                .map_or(DynamicValue::Null, DynamicValue::from),
            (ElementPayload::Annotation(nested), _) => DynamicValue::Object(
                Properties::new()
                    .with("type", nested.type_descriptor(pool).unwrap_or_default())
                    .with("values", nested.decode_values(pool)),
            ),
            (ElementPayload::Array(items), _) => {
                DynamicValue::array(items.iter().map(|item| item.decode(pool)))
            }
        }
    }
}

/// A named element of an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementValuePair {
    /// Index of the element name.
    pub name_index: u16,
    /// The value.
    pub value: ElementValue,
}

/// One declared annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Index of the annotation type descriptor (`Lcom/example/Marker;`).
    pub type_index: u16,
    /// Element-value pairs in declaration order.
    pub elements: Vec<ElementValuePair>,
}

impl Annotation {
    /// Creates an annotation without elements.
    #[must_use]
    pub fn new(type_index: u16) -> Self {
        Self {
            type_index,
            elements: Vec::new(),
        }
    }

    /// Resolves the type descriptor.
    #[must_use]
    pub fn type_descriptor<'a>(&self, pool: &'a ConstantPool) -> Option<&'a str> {
        pool.utf8(self.type_index)
    }

    /// Resolves the simple name: `Ljavax/inject/Named;` becomes `Named`.
    ///
    /// Unresolvable types are reported as `Unknown`.
    #[must_use]
    pub fn simple_name(&self, pool: &ConstantPool) -> String {
        self.type_descriptor(pool)
            .map_or_else(|| "Unknown".to_string(), simple_name_of)
    }

    /// Decodes every element into an ordered object.
    #[must_use]
    pub fn decode_values(&self, pool: &ConstantPool) -> DynamicValue {
        let mut values = Properties::with_capacity(self.elements.len());
        for pair in &self.elements {
            let name = pool.utf8(pair.name_index).unwrap_or_default();
            values.insert(name, pair.value.decode(pool));
        }
        DynamicValue::Object(values)
    }
}

/// Strips the `L...;` wrapper and the package from a type descriptor.
#[must_use]
pub fn simple_name_of(descriptor: &str) -> String {
    let inner = descriptor
        .strip_prefix('L')
        .and_then(|s| s.strip_suffix(';'))
        .unwrap_or(descriptor);
    inner.rsplit('/').next().unwrap_or(inner).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_name() {
        assert_eq!(simple_name_of("Ljavax/inject/Named;"), "Named");
        assert_eq!(simple_name_of("Marker"), "Marker");
        assert_eq!(simple_name_of("La/b/C$D;"), "C$D");
    }

    #[test]
    fn test_decode_by_tag() {
        let mut pool = ConstantPool::new();
        let s = pool.add_utf8("hello");
        let i = pool.add(ConstantPoolEntry::Integer(65));
        let one = pool.add(ConstantPoolEntry::Integer(1));
        let j = pool.add(ConstantPoolEntry::Long(1 << 40));
        let d = pool.add(ConstantPoolEntry::Double(2.5));

        assert_eq!(
            ElementValue::constant(ELEMENT_TAG::STRING, s).decode(&pool),
            DynamicValue::from("hello")
        );
        assert_eq!(
            ElementValue::constant(ELEMENT_TAG::INT, i).decode(&pool),
            DynamicValue::from(65)
        );
        assert_eq!(
            ElementValue::constant(ELEMENT_TAG::CHAR, i).decode(&pool),
            DynamicValue::from("A")
        );
        assert_eq!(
            ElementValue::constant(ELEMENT_TAG::BOOLEAN, one).decode(&pool),
            DynamicValue::Bool(true)
        );
        assert_eq!(
            ElementValue::constant(ELEMENT_TAG::LONG, j).decode(&pool),
            DynamicValue::from(1i64 << 40)
        );
        assert_eq!(
            ElementValue::constant(ELEMENT_TAG::DOUBLE, d).decode(&pool),
            DynamicValue::from(2.5)
        );
        assert_eq!(
            ElementValue::constant(ELEMENT_TAG::STRING, 99).decode(&pool),
            DynamicValue::Null
        );
    }

    #[test]
    fn test_decode_composites() {
        let mut pool = ConstantPool::new();
        let policy = pool.add_utf8("Ljava/lang/annotation/RetentionPolicy;");
        let runtime = pool.add_utf8("RUNTIME");
        let value = pool.add_utf8("value");
        let marker = pool.add_utf8("Lcom/example/Inner;");
        let s = pool.add_utf8("x");

        let nested = Annotation {
            type_index: marker,
            elements: vec![ElementValuePair {
                name_index: value,
                value: ElementValue::constant(ELEMENT_TAG::STRING, s),
            }],
        };
        let array = ElementValue {
            tag: ELEMENT_TAG::ARRAY,
            payload: ElementPayload::Array(vec![
                ElementValue {
                    tag: ELEMENT_TAG::ENUM,
                    payload: ElementPayload::Enum {
                        type_name_index: policy,
                        const_name_index: runtime,
                    },
                },
                ElementValue {
                    tag: ELEMENT_TAG::ANNOTATION,
                    payload: ElementPayload::Annotation(Box::new(nested)),
                },
            ]),
        };

        let decoded = array.decode(&pool);
        let items = decoded.as_array().unwrap();
        assert_eq!(items[0].get_string("name").as_deref(), Some("RUNTIME"));
        assert_eq!(items[1].get_string("type").as_deref(), Some("Lcom/example/Inner;"));
        assert_eq!(
            items[1].get("values").and_then(|v| v.get_string("value")).as_deref(),
            Some("x")
        );
    }
}
