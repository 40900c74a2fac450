//! One scripting session over a project.
//!
//! A [`ScriptSession`] owns the shared [`BridgeContext`] and the four script
//! objects built on it. Hosts bind [`ScriptSession::globals`] into their
//! interpreter and read results back from [`ScriptSession::events`].

use std::rc::Rc;

use crate::{
    bridge::{
        annotations::AnnotationRewriter, ast_bridge::AstBridge, context::BridgeContext, ir_bridge::IrBridge,
        rules::RuleEngine,
    },
    config::BridgeConfig,
    events::{EventLog, LogSink},
    lift::Lifter,
    model::ClassPool,
    value::DynamicValue,
};

/// Project, lifter, event log and the `ir`, `ast`, `instrument` and
/// `annotations` bridges of one script run.
#[derive(Debug)]
pub struct ScriptSession {
    ctx: Rc<BridgeContext>,
    log: Rc<EventLog>,
    ir: Rc<IrBridge>,
    ast: Rc<AstBridge>,
    instrument: Rc<RuleEngine>,
    annotations: Rc<AnnotationRewriter>,
}

impl ScriptSession {
    /// Creates a session with the default configuration.
    pub fn new(project: ClassPool, lifter: impl Lifter + 'static) -> Self {
        Self::with_config(project, lifter, BridgeConfig::default())
    }

    /// Creates a session with `config`.
    pub fn with_config(project: ClassPool, lifter: impl Lifter + 'static, config: BridgeConfig) -> Self {
        Self::with_log(project, lifter, config, EventLog::new())
    }

    /// Creates a session logging into `log`, typically one built with
    /// [`EventLog::with_listener`].
    pub fn with_log(project: ClassPool, lifter: impl Lifter + 'static, config: BridgeConfig, log: EventLog) -> Self {
        let log = Rc::new(log);
        let sink: Rc<dyn LogSink> = log.clone();
        let ctx = Rc::new(BridgeContext::new(project, Box::new(lifter), sink, config));
        Self {
            ir: Rc::new(IrBridge::new(ctx.clone())),
            ast: Rc::new(AstBridge::new(ctx.clone())),
            instrument: Rc::new(RuleEngine::new(ctx.clone())),
            annotations: Rc::new(AnnotationRewriter::new(ctx.clone())),
            ctx,
            log,
        }
    }

    /// The shared context.
    #[must_use]
    pub fn context(&self) -> &Rc<BridgeContext> {
        &self.ctx
    }

    /// The IR bridge.
    #[must_use]
    pub fn ir(&self) -> &Rc<IrBridge> {
        &self.ir
    }

    /// The syntax-tree bridge.
    #[must_use]
    pub fn ast(&self) -> &Rc<AstBridge> {
        &self.ast
    }

    /// The rule engine.
    #[must_use]
    pub fn instrument(&self) -> &Rc<RuleEngine> {
        &self.instrument
    }

    /// The annotation rewriter.
    #[must_use]
    pub fn annotations(&self) -> &Rc<AnnotationRewriter> {
        &self.annotations
    }

    /// Everything logged so far.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.log
    }

    /// Script globals as `(name, value)` pairs.
    #[must_use]
    pub fn globals(&self) -> Vec<(&'static str, DynamicValue)> {
        vec![
            ("ir", self.ir.to_dynamic()),
            ("ast", self.ast.to_dynamic()),
            ("instrument", self.instrument.to_dynamic()),
            ("annotations", self.annotations.to_dynamic()),
        ]
    }

    /// Drops every handler and rule and empties the lift cache.
    pub fn clear(&self) {
        self.ir.clear_handlers();
        self.ast.clear_handlers();
        self.instrument.clear_rules();
        self.annotations.clear_handlers();
        self.ctx.cache().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::EventKind,
        test::{secrets_method, Fixture},
        value::ScriptFunction,
    };

    fn session() -> ScriptSession {
        let Fixture { classes, lifter } = secrets_method();
        ScriptSession::new(classes, lifter)
    }

    #[test]
    fn test_globals() {
        let session = session();
        let names: Vec<_> = session.globals().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["ir", "ast", "instrument", "annotations"]);
        for (_, value) in session.globals() {
            assert!(value.get("apply").is_some_and(DynamicValue::is_function));
        }
    }

    #[test]
    fn test_clear_resets_registries_and_cache() {
        let session = session();
        let noop = ScriptFunction::new("noop", |_| Ok(None));
        session.ir().on(crate::bridge::IrHandlerKind::Return, None, noop.clone());
        session.ast().on(crate::ast::NodeKind::Return, None, noop.clone());
        session.instrument().replace_constant(None, noop.clone());
        session.annotations().on(crate::bridge::AnnotationTarget::Class, noop);

        assert_eq!(session.ir().apply(&DynamicValue::from("com/example/Secrets.load")), 0);
        assert!(!session.context().cache().is_empty());

        session.clear();
        assert_eq!(session.ir().handler_count(), 0);
        assert_eq!(session.ast().handler_count(), 0);
        assert_eq!(session.instrument().rule_count(), 0);
        assert!(!session.annotations().has_handlers());
        assert!(session.context().cache().is_empty());
        assert!(session.events().has(EventKind::RulesCleared));
    }

    #[test]
    fn test_listener_sees_events() {
        let Fixture { classes, lifter } = secrets_method();
        let seen = Rc::new(std::cell::Cell::new(0));
        let counter = seen.clone();
        let session = ScriptSession::with_log(
            classes,
            lifter,
            BridgeConfig::quiet(),
            EventLog::with_listener(move |_| counter.set(counter.get() + 1)),
        );
        session.ir().apply(&DynamicValue::from("com/example/Secrets.load"));
        assert_eq!(seen.get(), session.events().len());
        assert!(seen.get() >= 2);
    }
}
