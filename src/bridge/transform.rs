//! Scripted IR handlers as a pipeline pass.
//!
//! [`ScriptedTransform`] lets a host run the handlers of an [`IrBridge`] as
//! one step of an [`IrPass`] pipeline, next to its own passes:
//!
//! ```text
//! run_passes(&[&const_fold, &scripted, &dead_code], &mut method)
//! ```
//!
//! The pass works on the method it is handed; it does not resolve, lift or
//! touch the lift cache.

use std::rc::Rc;

use crate::{
    bridge::ir_bridge::IrBridge,
    ir::{IrMethod, IrPass},
    Result,
};

/// Runs an [`IrBridge`]'s handlers as an [`IrPass`].
#[derive(Debug, Clone)]
pub struct ScriptedTransform {
    name: String,
    bridge: Rc<IrBridge>,
}

impl ScriptedTransform {
    /// Creates a pass named `name` over `bridge`'s handlers.
    #[must_use]
    pub fn new(name: impl Into<String>, bridge: Rc<IrBridge>) -> Self {
        Self {
            name: name.into(),
            bridge,
        }
    }
}

impl IrPass for ScriptedTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &'static str {
        "Run script-registered IR handlers"
    }

    fn should_run(&self, _method: &IrMethod) -> bool {
        self.bridge.handler_count() > 0
    }

    fn run_on_method(&self, method: &mut IrMethod) -> Result<bool> {
        let label = format!("{}{}", method.name(), method.descriptor());
        Ok(self.bridge.run(method, &label) > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bridge::dispatch::IrHandlerKind,
        ir::{run_passes, Constant},
        test::{context_with, secrets_ir, secrets_method},
        value::{arg, DynamicValue, ScriptFunction},
    };

    #[test]
    fn test_scripted_pass_in_pipeline() {
        let (ctx, log) = context_with(secrets_method());
        let bridge = Rc::new(IrBridge::new(ctx));
        let pass = ScriptedTransform::new("strip-secrets", bridge.clone());

        let mut method = secrets_ir();
        assert!(!pass.should_run(&method));

        bridge.on(
            IrHandlerKind::Constant,
            Some(ScriptFunction::new("isSecret", |args| {
                Ok(Some((arg(args, 0).get_string("value").as_deref() == Some("secret")).into()))
            })),
            ScriptFunction::new("drop", |_| Ok(Some(DynamicValue::Null))),
        );
        assert!(pass.should_run(&method));
        assert_eq!(pass.name(), "strip-secrets");

        assert!(run_passes(&[&pass], &mut method).unwrap());
        assert_eq!(method.instruction_count(), 2);
        assert!(method.instructions().all(|i| i.constant() != Some(&Constant::String("secret".into()))));
        assert!(!run_passes(&[&pass], &mut method).unwrap());
        assert_eq!(log.count_kind(crate::events::EventKind::MethodLifted), 0);
    }
}
