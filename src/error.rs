use thiserror::Error;

use crate::value::NativeKind;

#[allow(unused_macros)]
macro_rules! callback_error {
    // Single string version
    ($name:expr, $msg:expr) => {
        crate::Error::Callback {
            name: $name.to_string(),
            message: $msg.to_string(),
        }
    };

    // Format string with arguments version
    ($name:expr, $fmt:expr, $($arg:tt)*) => {
        crate::Error::Callback {
            name: $name.to_string(),
            message: format!($fmt, $($arg)*),
        }
    };
}

/// The generic Error type, which covers every failure this library can report.
///
/// Most of these never reach a script directly. The bridges catch them at the
/// call site, forward a line to the session's log sink and degrade to a
/// `false`/`0`/`null` result. The one exception is [`Error::NotCallable`], which
/// registration functions return to the host so a script fails fast when it
/// passes something that cannot be invoked.
///
/// # Error Categories
///
/// ## Script boundary
/// - [`Error::NotCallable`] - A registration function received a non-callable argument
/// - [`Error::NativeMismatch`] - A native handle was downcast to the wrong host kind
/// - [`Error::Callback`] - A script callback raised an error
///
/// ## Resolution
/// - [`Error::Shape`] - A configuration object is missing a required key
/// - [`Error::Resolution`] - A class or method reference could not be resolved
/// - [`Error::LiftFailed`] - The IR or syntax-tree producer rejected a method
///
/// ## Tree editing
/// - [`Error::Detached`] - A syntax-tree node is no longer reachable from its root
/// - [`Error::CategoryMismatch`] - An expression was used where a statement is required (or vice versa)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A registration function received an argument that cannot be called.
    ///
    /// # Fields
    ///
    /// * `function` - The registration function that was called
    /// * `argument` - The argument or configuration key that had to be callable
    #[error("{function} requires '{argument}' function")]
    NotCallable {
        /// The registration function that rejected its argument
        function: String,
        /// The argument name or configuration key that was not callable
        argument: String,
    },

    /// A native handle carried a different host kind than the caller expected.
    #[error("Expected native {expected}, found {found}")]
    NativeMismatch {
        /// The kind the caller asked for
        expected: NativeKind,
        /// What the value actually held
        found: String,
    },

    /// A script callback raised an error while being invoked.
    #[error("{name}: {message}")]
    Callback {
        /// Name of the failing callback
        name: String,
        /// Message reported by the script host
        message: String,
    },

    /// A configuration object had the wrong shape.
    #[error("{0}")]
    Shape(String),

    /// A class or method reference could not be resolved against the project.
    #[error("{0}")]
    Resolution(String),

    /// The IR or syntax-tree producer failed for the named method.
    #[error("Failed to lift {0}")]
    LiftFailed(String),

    /// A syntax-tree node is not attached to its tree anymore.
    #[error("Node is detached from its tree")]
    Detached,

    /// A replacement node belongs to a different base category than its target.
    #[error("Cannot replace {expected} with {found}")]
    CategoryMismatch {
        /// Category of the node being replaced
        expected: &'static str,
        /// Category of the offered replacement
        found: &'static str,
    },
}
