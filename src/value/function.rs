//! Callable values crossing the script boundary.
//!
//! Both host-provided natives (registration functions, wrapper methods) and the
//! script interpreter's own closures are represented as a [`ScriptFunction`].
//! The host adapts its closures by wrapping its evaluator in one.

use std::{fmt, rc::Rc};

use crate::{value::DynamicValue, Result};

/// Signature of every callable crossing the boundary.
///
/// `Ok(None)` means the callee produced no return value, which is distinct from
/// returning an explicit `Null`.
pub type NativeFn = dyn Fn(&[DynamicValue]) -> Result<Option<DynamicValue>>;

/// A named, cheaply clonable callable.
#[derive(Clone)]
pub struct ScriptFunction {
    name: Rc<str>,
    body: Rc<NativeFn>,
}

impl ScriptFunction {
    /// Creates a function from a closure.
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&[DynamicValue]) -> Result<Option<DynamicValue>> + 'static,
    ) -> Self {
        let name: String = name.into();
        Self {
            name: Rc::from(name),
            body: Rc::new(body),
        }
    }

    /// Creates a function that always produces a value.
    pub fn returning(
        name: impl Into<String>,
        body: impl Fn(&[DynamicValue]) -> Result<DynamicValue> + 'static,
    ) -> Self {
        Self::new(name, move |args| body(args).map(Some))
    }

    /// The function name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the function.
    ///
    /// # Errors
    ///
    /// Returns whatever error the callee raises, typically [`crate::Error::Callback`].
    pub fn call(&self, args: &[DynamicValue]) -> Result<Option<DynamicValue>> {
        (self.body)(args)
    }

    /// Returns true if both handles point at the same closure.
    #[must_use]
    pub fn same(&self, other: &ScriptFunction) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function {}]", self.name)
    }
}

/// Returns argument `index`, or `Null` when the script passed fewer arguments.
#[must_use]
pub fn arg(args: &[DynamicValue], index: usize) -> DynamicValue {
    args.get(index).cloned().unwrap_or_default()
}
