//! Kind-keyed handler storage shared by the IR and syntax-tree bridges.
//!
//! Registrations are appended in call order and read back as an owned
//! snapshot, so a handler may register further handlers while a dispatch is
//! running without invalidating the dispatch loop. Newly registered handlers
//! take effect on the next apply.

use std::{cell::RefCell, fmt};

use crate::{
    value::{DynamicValue, ScriptFunction},
    Error, Result,
};

/// One registered handler.
#[derive(Debug, Clone)]
pub struct Registration<K> {
    /// What the handler is registered for.
    pub kind: K,
    /// Optional filter; the action only runs where this returns exactly `true`.
    pub predicate: Option<ScriptFunction>,
    /// The handler itself.
    pub action: ScriptFunction,
}

impl<K> Registration<K> {
    /// Parses the `(action)` and `(predicate, action)` call shapes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCallable`] naming `function` when an argument in
    /// callback position is not a function.
    pub fn from_args(kind: K, function: &str, args: &[DynamicValue]) -> Result<Self> {
        let not_callable = |argument: &str| Error::NotCallable {
            function: function.to_string(),
            argument: argument.to_string(),
        };
        match args {
            [DynamicValue::Function(action)] => Ok(Self {
                kind,
                predicate: None,
                action: action.clone(),
            }),
            [predicate, action, ..] => {
                let predicate = match predicate {
                    DynamicValue::Function(f) => Some(f.clone()),
                    DynamicValue::Null => None,
                    _ => return Err(not_callable("predicate")),
                };
                let action = action.as_function().ok_or_else(|| not_callable("action"))?;
                Ok(Self {
                    kind,
                    predicate,
                    action: action.clone(),
                })
            }
            _ => Err(not_callable("action")),
        }
    }
}

/// Ordered list of registrations.
pub struct HandlerRegistry<K> {
    entries: RefCell<Vec<Registration<K>>>,
}

impl<K> Default for HandlerRegistry<K> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }
}

impl<K: Clone> HandlerRegistry<K> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a registration.
    pub fn register(&self, registration: Registration<K>) {
        self.entries.borrow_mut().push(registration);
    }

    /// Owned copy of the registrations in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Registration<K>> {
        self.entries.borrow().clone()
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drops every registration.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl<K: fmt::Debug> fmt::Debug for HandlerRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.borrow().iter().map(|r| &r.kind))
            .finish()
    }
}
