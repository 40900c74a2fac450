//! Pass trait for IR transformations.
//!
//! Host pipelines run a sequence of [`IrPass`] implementations over each lifted
//! method. Script handlers join such a pipeline through
//! [`crate::bridge::ScriptedTransform`].

use crate::{ir::IrMethod, Result};

/// A transformation over one lifted method.
pub trait IrPass {
    /// Unique name for logging and debugging.
    fn name(&self) -> &str;

    /// Should this pass run on a specific method?
    ///
    /// Called before `run_on_method`. Override to skip methods that don't
    /// need this pass.
    fn should_run(&self, _method: &IrMethod) -> bool {
        true
    }

    /// Run the pass on a single method.
    ///
    /// Returns `true` if any changes were made, `false` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass fails to process the method.
    fn run_on_method(&self, method: &mut IrMethod) -> Result<bool>;

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }
}

/// Runs `passes` in order over `method`, skipping those that opt out.
///
/// Returns `true` if any pass reported a change.
///
/// # Errors
///
/// Stops at and returns the first pass error.
pub fn run_passes(passes: &[&dyn IrPass], method: &mut IrMethod) -> Result<bool> {
    let mut changed = false;
    for pass in passes {
        if pass.should_run(method) {
            changed |= pass.run_on_method(method)?;
        }
    }
    Ok(changed)
}
