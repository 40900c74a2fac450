//! The `ir` script object.
//!
//! Scripts register per-kind handlers (`onInvoke`, `onConstant`,
//! `forEachInstruction`, ...) and then call `apply(methodRef)` to run them
//! over a method's SSA IR. Constants built with the factory functions can be
//! returned from a handler to replace the visited instruction with a load of
//! that constant.

use std::rc::Rc;

use strum::IntoEnumIterator;

use crate::{
    bridge::{
        context::BridgeContext,
        dispatch::{dispatch_ir, IrHandlerKind},
        ir_wrapper::{wrap_ir, IrNode},
        registry::{HandlerRegistry, Registration},
    },
    events::EventKind,
    ir::{Constant, IrMethod},
    value::{arg, DynamicValue, Properties, ScriptFunction},
    Result,
};

/// Handler registry and apply entry point for IR instrumentation.
#[derive(Debug)]
pub struct IrBridge {
    ctx: Rc<BridgeContext>,
    handlers: HandlerRegistry<IrHandlerKind>,
}

impl IrBridge {
    /// Creates a bridge with no handlers.
    #[must_use]
    pub fn new(ctx: Rc<BridgeContext>) -> Self {
        Self {
            ctx,
            handlers: HandlerRegistry::new(),
        }
    }

    /// Registers a handler from script arguments, `(action)` or
    /// `(predicate, action)`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotCallable`] if the callbacks are not functions.
    pub fn register(&self, kind: IrHandlerKind, args: &[DynamicValue]) -> Result<()> {
        let registration = Registration::from_args(kind, kind.registration_name(), args)?;
        self.add(registration);
        Ok(())
    }

    /// Registers a handler from Rust.
    pub fn on(&self, kind: IrHandlerKind, predicate: Option<ScriptFunction>, action: ScriptFunction) {
        self.add(Registration {
            kind,
            predicate,
            action,
        });
    }

    fn add(&self, registration: Registration<IrHandlerKind>) {
        if self.ctx.config().log_registrations {
            self.ctx
                .sink()
                .record(EventKind::HandlerRegistered)
                .message(format!("Registered {} handler", registration.kind.registration_name()));
        }
        self.handlers.register(registration);
    }

    /// Runs every registered handler over `method` and returns the number of
    /// accepted mutations.
    pub fn run(&self, method: &mut IrMethod, label: &str) -> usize {
        let handlers = self.handlers.snapshot();
        dispatch_ir(method, &handlers, &self.ctx.sink_handle(), self.ctx.config(), label)
    }

    /// Resolves and lifts `reference`, runs the handlers over it and returns
    /// the number of accepted mutations. Failures are reported and yield `0`.
    pub fn apply(&self, reference: &DynamicValue) -> usize {
        let (resolved, mut method) = match self.ctx.checkout_method(reference) {
            Ok(checked_out) => checked_out,
            Err(e) => {
                self.ctx.report(&e);
                return 0;
            }
        };

        let label = resolved.qualified();
        let count = self.run(&mut method, &label);
        self.ctx.checkin_method(&resolved, method);

        self.ctx
            .sink()
            .record(EventKind::PassCompleted)
            .method(label)
            .message(format!("Applied {count} modifications to {}", resolved.name));
        count
    }

    /// Drops every handler.
    pub fn clear_handlers(&self) {
        self.handlers.clear();
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Wraps a constant so a handler can return it.
    #[must_use]
    pub fn constant(&self, constant: Constant) -> DynamicValue {
        wrap_ir(IrNode::Constant(Rc::new(constant)), self.ctx.sink_handle())
    }

    /// The script `ir` object.
    pub fn to_dynamic(self: &Rc<Self>) -> DynamicValue {
        let mut props = Properties::with_capacity(24);

        for kind in IrHandlerKind::iter() {
            let this = self.clone();
            let name = kind.registration_name();
            props.insert(
                name,
                DynamicValue::function(name, move |args| {
                    this.register(kind, args)?;
                    Ok(None)
                }),
            );
        }

        let this = self.clone();
        props.insert(
            "constant",
            DynamicValue::function("constant", move |args| {
                let ty = arg(args, 1);
                let constant = Constant::from_dynamic(&arg(args, 0), ty.as_str());
                Ok(Some(this.constant(constant)))
            }),
        );
        for (name, ty) in [
            ("intConstant", "int"),
            ("longConstant", "long"),
            ("floatConstant", "float"),
            ("doubleConstant", "double"),
            ("stringConstant", "string"),
        ] {
            let this = self.clone();
            props.insert(
                name,
                DynamicValue::function(name, move |args| {
                    Ok(Some(this.constant(Constant::from_dynamic(&arg(args, 0), Some(ty)))))
                }),
            );
        }
        let this = self.clone();
        props.insert(
            "nullConstant",
            DynamicValue::function("nullConstant", move |_| Ok(Some(this.constant(Constant::Null)))),
        );

        let this = self.clone();
        props.insert(
            "apply",
            DynamicValue::function("apply", move |args| Ok(Some(this.apply(&arg(args, 0)).into()))),
        );
        let this = self.clone();
        props.insert(
            "clearHandlers",
            DynamicValue::function("clearHandlers", move |_| {
                this.clear_handlers();
                Ok(None)
            }),
        );
        let this = self.clone();
        props.insert(
            "getHandlerCount",
            DynamicValue::function("getHandlerCount", move |_| Ok(Some(this.handler_count().into()))),
        );

        DynamicValue::Object(props)
    }
}
