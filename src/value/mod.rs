//! The dynamic value model shared with script code.
//!
//! Every native-to-script transition produces a [`DynamicValue`] and every
//! script-to-native transition consumes one. The model is a closed sum type:
//!
//! - [`DynamicValue::Null`], [`DynamicValue::Bool`], [`DynamicValue::Number`]
//!   and [`DynamicValue::Str`] are plain primitives. Numbers live in a single
//!   `f64` lane; 32- and 64-bit integer constants up to 2^53 round-trip exactly.
//! - [`DynamicValue::Array`] and [`DynamicValue::Object`] are owned copies.
//!   Marshaling never aliases a host collection, so scripts cannot disturb host
//!   iteration state.
//! - [`DynamicValue::Function`] is a [`ScriptFunction`].
//! - [`DynamicValue::Native`] is a typed [`NativeHandle`] back to one host node.
//!
//! Conversions follow the usual scripting rules: `null`, `0`, `NaN`, `false` and
//! the empty string are falsy, everything else is truthy; integral numbers
//! print without a fractional part.

mod function;
mod native;
mod properties;

pub use function::{arg, NativeFn, ScriptFunction};
pub use native::{NativeHandle, NativeKind};
pub use properties::Properties;

use std::fmt;

use crate::{Error, Result};

/// Tagged value crossing the native/script boundary.
#[derive(Clone, Default)]
pub enum DynamicValue {
    /// The `null` value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A number; integers and floating point share this lane.
    Number(f64),
    /// A string.
    Str(String),
    /// An index-ordered array.
    Array(Vec<DynamicValue>),
    /// An insertion-ordered object.
    Object(Properties),
    /// A callable.
    Function(ScriptFunction),
    /// An opaque handle to a host node.
    Native(NativeHandle),
}

impl DynamicValue {
    /// Returns the script-visible type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            DynamicValue::Null => "null",
            DynamicValue::Bool(_) => "boolean",
            DynamicValue::Number(_) => "number",
            DynamicValue::Str(_) => "string",
            DynamicValue::Array(_) => "array",
            DynamicValue::Object(_) => "object",
            DynamicValue::Function(_) => "function",
            DynamicValue::Native(_) => "native",
        }
    }

    /// Returns true for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    /// Returns true for callables.
    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self, DynamicValue::Function(_))
    }

    /// Returns true only for the boolean `true`.
    ///
    /// Search predicates use this strict test; a predicate returning `1` or a
    /// non-empty string does not count as a match.
    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self, DynamicValue::Bool(true))
    }

    /// Scripting truthiness.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            DynamicValue::Null => false,
            DynamicValue::Bool(b) => *b,
            DynamicValue::Number(n) => *n != 0.0 && !n.is_nan(),
            DynamicValue::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Numeric view: booleans become 0/1, numeric strings are parsed and
    /// everything else is `NaN`.
    #[must_use]
    pub fn as_number(&self) -> f64 {
        match self {
            DynamicValue::Number(n) => *n,
            DynamicValue::Bool(b) => f64::from(u8::from(*b)),
            DynamicValue::Str(s) => s.trim().parse().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    /// Returns the number if this is a `Number`.
    #[must_use]
    pub fn number(&self) -> Option<f64> {
        match self {
            DynamicValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string slice if this is a `Str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynamicValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean if this is a `Bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynamicValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the elements if this is an `Array`.
    #[must_use]
    pub fn as_array(&self) -> Option<&[DynamicValue]> {
        match self {
            DynamicValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the properties if this is an `Object`.
    #[must_use]
    pub fn as_object(&self) -> Option<&Properties> {
        match self {
            DynamicValue::Object(props) => Some(props),
            _ => None,
        }
    }

    /// Returns the callable if this is a `Function`.
    #[must_use]
    pub fn as_function(&self) -> Option<&ScriptFunction> {
        match self {
            DynamicValue::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the native handle carried by this value.
    ///
    /// Wrapper objects are looked through: an `Object` with a `_native` key
    /// yields the handle stored there.
    #[must_use]
    pub fn native(&self) -> Option<&NativeHandle> {
        match self {
            DynamicValue::Native(handle) => Some(handle),
            DynamicValue::Object(props) => match props.get("_native") {
                Some(DynamicValue::Native(handle)) => Some(handle),
                _ => None,
            },
            _ => None,
        }
    }

    /// Looks up a property on an object; anything else yields `None`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.as_object().and_then(|props| props.get(key))
    }

    /// Returns the string form of an optional object property.
    ///
    /// Missing keys and `null` values both yield `None`.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            None | Some(DynamicValue::Null) => None,
            Some(value) => Some(value.to_string()),
        }
    }

    /// Invokes a property of an object as a method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCallable`] if the property is missing or not a
    /// function, or the callee's own error.
    pub fn invoke(&self, method: &str, args: &[DynamicValue]) -> Result<Option<DynamicValue>> {
        match self.get(method) {
            Some(DynamicValue::Function(f)) => f.call(args),
            _ => Err(Error::NotCallable {
                function: self.type_name().to_string(),
                argument: method.to_string(),
            }),
        }
    }

    /// Wraps a list of values into an `Array`.
    pub fn array(items: impl IntoIterator<Item = DynamicValue>) -> Self {
        DynamicValue::Array(items.into_iter().collect())
    }

    /// Wraps a closure into a `Function`.
    pub fn function(
        name: impl Into<String>,
        body: impl Fn(&[DynamicValue]) -> Result<Option<DynamicValue>> + 'static,
    ) -> Self {
        DynamicValue::Function(ScriptFunction::new(name, body))
    }
}

fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        write!(f, "{}", n as i64)
    } else if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicValue::Null => f.write_str("null"),
            DynamicValue::Bool(b) => write!(f, "{b}"),
            DynamicValue::Number(n) => format_number(*n, f),
            DynamicValue::Str(s) => f.write_str(s),
            DynamicValue::Array(_) => f.write_str("[Array]"),
            DynamicValue::Object(_) => f.write_str("[Object]"),
            DynamicValue::Function(_) => f.write_str("[Function]"),
            DynamicValue::Native(handle) => write!(f, "{handle}"),
        }
    }
}

impl fmt::Debug for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicValue::Null => f.write_str("Null"),
            DynamicValue::Bool(b) => write!(f, "Bool({b})"),
            DynamicValue::Number(n) => write!(f, "Number({n})"),
            DynamicValue::Str(s) => write!(f, "Str({s:?})"),
            DynamicValue::Array(items) => f.debug_list().entries(items).finish(),
            DynamicValue::Object(props) => write!(f, "{props:?}"),
            DynamicValue::Function(func) => write!(f, "{func:?}"),
            DynamicValue::Native(handle) => write!(f, "{handle:?}"),
        }
    }
}

impl PartialEq for DynamicValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DynamicValue::Null, DynamicValue::Null) => true,
            (DynamicValue::Bool(a), DynamicValue::Bool(b)) => a == b,
            (DynamicValue::Number(a), DynamicValue::Number(b)) => a == b,
            (DynamicValue::Str(a), DynamicValue::Str(b)) => a == b,
            (DynamicValue::Array(a), DynamicValue::Array(b)) => a == b,
            (DynamicValue::Object(a), DynamicValue::Object(b)) => a == b,
            (DynamicValue::Function(a), DynamicValue::Function(b)) => a.same(b),
            (DynamicValue::Native(a), DynamicValue::Native(b)) => a.same_node(b),
            _ => false,
        }
    }
}

impl From<bool> for DynamicValue {
    fn from(value: bool) -> Self {
        DynamicValue::Bool(value)
    }
}

impl From<f64> for DynamicValue {
    fn from(value: f64) -> Self {
        DynamicValue::Number(value)
    }
}

impl From<f32> for DynamicValue {
    fn from(value: f32) -> Self {
        DynamicValue::Number(f64::from(value))
    }
}

impl From<i32> for DynamicValue {
    fn from(value: i32) -> Self {
        DynamicValue::Number(f64::from(value))
    }
}

impl From<u32> for DynamicValue {
    fn from(value: u32) -> Self {
        DynamicValue::Number(f64::from(value))
    }
}

impl From<i64> for DynamicValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        DynamicValue::Number(value as f64)
    }
}

impl From<usize> for DynamicValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: usize) -> Self {
        DynamicValue::Number(value as f64)
    }
}

impl From<&str> for DynamicValue {
    fn from(value: &str) -> Self {
        DynamicValue::Str(value.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(value: String) -> Self {
        DynamicValue::Str(value)
    }
}

impl From<Vec<DynamicValue>> for DynamicValue {
    fn from(value: Vec<DynamicValue>) -> Self {
        DynamicValue::Array(value)
    }
}

impl From<Properties> for DynamicValue {
    fn from(value: Properties) -> Self {
        DynamicValue::Object(value)
    }
}

impl From<ScriptFunction> for DynamicValue {
    fn from(value: ScriptFunction) -> Self {
        DynamicValue::Function(value)
    }
}

impl From<NativeHandle> for DynamicValue {
    fn from(value: NativeHandle) -> Self {
        DynamicValue::Native(value)
    }
}

impl<T: Into<DynamicValue>> From<Option<T>> for DynamicValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DynamicValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!DynamicValue::Null.is_truthy());
        assert!(!DynamicValue::from(0).is_truthy());
        assert!(!DynamicValue::Number(f64::NAN).is_truthy());
        assert!(!DynamicValue::from("").is_truthy());
        assert!(DynamicValue::from("x").is_truthy());
        assert!(DynamicValue::from(-1).is_truthy());
        assert!(DynamicValue::Array(vec![]).is_truthy());
        assert!(DynamicValue::Object(Properties::new()).is_truthy());

        assert!(DynamicValue::from(true).is_true());
        assert!(!DynamicValue::from(1).is_true());
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(DynamicValue::from(42).to_string(), "42");
        assert_eq!(DynamicValue::from(-7i64).to_string(), "-7");
        assert_eq!(DynamicValue::from(1.5).to_string(), "1.5");
        assert_eq!(DynamicValue::Null.to_string(), "null");
        assert_eq!(DynamicValue::from(true).to_string(), "true");
        assert_eq!(DynamicValue::Array(vec![]).to_string(), "[Array]");
        assert_eq!(DynamicValue::Number(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn test_integers_round_trip() {
        let big = 9_007_199_254_740_991i64;
        assert_eq!(DynamicValue::from(big).as_number() as i64, big);
        assert_eq!(DynamicValue::from(i32::MIN).as_number() as i32, i32::MIN);
        assert_eq!(DynamicValue::from(i64::from(i32::MAX)).to_string(), "2147483647");
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(DynamicValue::from("12").as_number(), 12.0);
        assert!(DynamicValue::from("abc").as_number().is_nan());
        assert_eq!(DynamicValue::from(true).as_number(), 1.0);
        assert!(DynamicValue::Null.as_number().is_nan());
    }

    #[test]
    fn test_object_helpers() {
        let obj = DynamicValue::Object(
            Properties::new()
                .with("name", "run")
                .with("desc", DynamicValue::Null)
                .with("twice", ScriptFunction::returning("twice", |args| {
                    Ok(DynamicValue::from(arg(args, 0).as_number() * 2.0))
                })),
        );

        assert_eq!(obj.get_string("name").as_deref(), Some("run"));
        assert_eq!(obj.get_string("desc"), None);
        assert_eq!(obj.get_string("missing"), None);
        assert_eq!(
            obj.invoke("twice", &[DynamicValue::from(4)]).unwrap(),
            Some(DynamicValue::from(8))
        );
        assert!(matches!(
            obj.invoke("name", &[]),
            Err(Error::NotCallable { .. })
        ));
    }
}
