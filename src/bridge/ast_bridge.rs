//! The `ast` script object.
//!
//! Syntax-tree counterpart of [`crate::bridge::IrBridge`]: per-kind handlers
//! run over a method's decompiled tree through the [`crate::ast::AstEditor`],
//! with the same keep/remove/replace reading of handler results. Also carries
//! the node `factory`, `validate` and a handful of type predicates.

use std::rc::Rc;

use crate::{
    ast::{validate, NodeKind, SharedTree, SourceType},
    bridge::{
        context::BridgeContext,
        dispatch::dispatch_ast,
        factory::AstFactory,
        registry::{HandlerRegistry, Registration},
    },
    events::EventKind,
    value::{arg, DynamicValue, Properties, ScriptFunction},
    Result,
};

/// Shorthand registration functions and the kinds they register for.
const SHORTHANDS: [(&str, NodeKind); 6] = [
    ("onMethodCall", NodeKind::MethodCall),
    ("onFieldAccess", NodeKind::FieldAccess),
    ("onBinaryExpr", NodeKind::Binary),
    ("onUnaryExpr", NodeKind::Unary),
    ("onIf", NodeKind::If),
    ("onReturn", NodeKind::Return),
];

/// Handler registry and apply entry point for syntax-tree rewriting.
#[derive(Debug)]
pub struct AstBridge {
    ctx: Rc<BridgeContext>,
    handlers: HandlerRegistry<NodeKind>,
    factory: Rc<AstFactory>,
}

impl AstBridge {
    /// Creates a bridge with no handlers.
    #[must_use]
    pub fn new(ctx: Rc<BridgeContext>) -> Self {
        let factory = Rc::new(AstFactory::new(ctx.sink_handle()));
        Self {
            ctx,
            handlers: HandlerRegistry::new(),
            factory,
        }
    }

    /// Registers a handler from script arguments.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotCallable`] if the callbacks are not functions.
    pub fn register(&self, kind: NodeKind, function: &str, args: &[DynamicValue]) -> Result<()> {
        self.add(Registration::from_args(kind, function, args)?);
        Ok(())
    }

    /// Registers a handler from Rust.
    pub fn on(&self, kind: NodeKind, predicate: Option<ScriptFunction>, action: ScriptFunction) {
        self.add(Registration {
            kind,
            predicate,
            action,
        });
    }

    fn add(&self, registration: Registration<NodeKind>) {
        if self.ctx.config().log_registrations {
            self.ctx
                .sink()
                .record(EventKind::HandlerRegistered)
                .message(format!("Registered {} handler", registration.kind));
        }
        self.handlers.register(registration);
    }

    /// Runs every registered handler over `tree` and returns the number of
    /// accepted edits.
    pub fn run(&self, tree: &SharedTree, label: &str) -> usize {
        let handlers = self.handlers.snapshot();
        dispatch_ast(tree, &handlers, &self.ctx.sink_handle(), self.ctx.config(), label)
    }

    /// Resolves and decompiles `reference`, runs the handlers over its tree
    /// and returns the number of accepted edits. Failures are reported and
    /// yield `0`.
    pub fn apply(&self, reference: &DynamicValue) -> usize {
        let (resolved, tree) = match self.ctx.tree_for(reference) {
            Ok(found) => found,
            Err(e) => {
                self.ctx.report(&e);
                return 0;
            }
        };
        let label = resolved.qualified();
        let count = self.run(&tree, &label);
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

    /// The node factory.
    #[must_use]
    pub fn factory(&self) -> &Rc<AstFactory> {
        &self.factory
    }

    /// Handles `on(kind, action)` and `on(kind, predicate, action)`.
    fn register_generic(&self, args: &[DynamicValue]) -> Result<bool> {
        let tag = arg(args, 0);
        let Some(kind) = tag.as_str().and_then(NodeKind::from_tag) else {
            self.ctx
                .sink()
                .warn(format!("on: unknown node kind '{tag}'"));
            return Ok(false);
        };
        self.register(kind, "on", args.get(1..).unwrap_or_default())?;
        Ok(true)
    }

    /// The script `ast` object.
    pub fn to_dynamic(self: &Rc<Self>) -> DynamicValue {
        let mut props = Properties::with_capacity(24);

        for (name, kind) in SHORTHANDS {
            let this = self.clone();
            props.insert(
                name,
                DynamicValue::function(name, move |args| {
                    this.register(kind, name, args)?;
                    Ok(None)
                }),
            );
        }
        let this = self.clone();
        props.insert(
            "on",
            DynamicValue::function("on", move |args| Ok(Some(this.register_generic(args)?.into()))),
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

        props.insert("factory", self.factory.to_dynamic());
        props.insert(
            "validate",
            DynamicValue::function("validate", |args| {
                let target = arg(args, 0);
                let Some(node) = target.native().and_then(|h| h.as_ast_node().ok()) else {
                    return Ok(Some(DynamicValue::Null));
                };
                let report = validate(&node.tree().borrow(), node.id());
                Ok(Some(report.to_dynamic()))
            }),
        );
        install_type_helpers(&mut props);

        DynamicValue::Object(props)
    }
}

fn install_type_helpers(props: &mut Properties) {
    let predicates: [(&str, fn(&SourceType) -> bool); 6] = [
        ("isNumeric", SourceType::is_numeric),
        ("isIntegral", SourceType::is_integral),
        ("isPrimitive", SourceType::is_primitive),
        ("isReference", SourceType::is_reference),
        ("isVoid", SourceType::is_void),
        ("isBoxedType", SourceType::is_boxed),
    ];
    for (name, predicate) in predicates {
        props.insert(
            name,
            DynamicValue::function(name, move |args| {
                let ty = arg(args, 0);
                let known = ty.as_str().is_some_and(|t| predicate(&SourceType::parse(t)));
                Ok(Some(known.into()))
            }),
        );
    }

    let conversions: [(&str, fn(&SourceType) -> Option<SourceType>); 2] =
        [("box", SourceType::boxed), ("unbox", SourceType::unboxed)];
    for (name, convert) in conversions {
        props.insert(
            name,
            DynamicValue::function(name, move |args| {
                let ty = arg(args, 0);
                let converted = ty
                    .as_str()
                    .and_then(|t| convert(&SourceType::parse(t)))
                    .map(|t| t.to_string());
                Ok(Some(converted.into()))
            }),
        );
    }

    props.insert(
        "getSimpleName",
        DynamicValue::function("getSimpleName", |args| {
            let ty = arg(args, 0);
            Ok(Some(ty.as_str().map(|t| SourceType::parse(t).simple_name()).into()))
        }),
    );
}
