//! Declarative instrumentation rules: the `instrument` script object.
//!
//! Rules are registered with a config object and accumulate until
//! `clearRules()`. `apply(methodRef)` runs every rule over the method in
//! registration order. Unlike handler dispatch, every rule does its own scan
//! of the method, so N rules cost N scans and a rule sees the rewrites of the
//! rules before it.
//!
//! | function | config | matches |
//! |---|---|---|
//! | `beforeMethod`, `afterMethod` | `{filter?, inject}` | the method itself |
//! | `beforeCall`, `afterCall` | `{target?, filter?, inject}` | invokes on `owner.name` |
//! | `replaceCall` | `{target?, filter?, with}` | invokes on `owner.name` |
//! | `beforeFieldRead` | `{target?, filter?, inject}` | field reads on `owner.name` |
//! | `afterFieldWrite` | `{target?, filter?, inject}` | field writes on `owner.name` |
//! | `removeInstruction` | `{filter}` | every instruction |
//! | `replaceConstant` | `{filter?, with}` | constant loads |
//! | `modifyInstruction` | `{filter?, modify}` | every instruction |
//!
//! A rule *activates* for every instruction (or method) that matches its
//! kind and target and passes its filter; `apply` returns the number of
//! activations. Filters pass on any truthy result.
//!
//! `replaceCall` reads the `with` result like a dispatch handler
//! (nothing keeps, `null` removes, another instruction or a constant
//! replaces). `replaceConstant` swaps the loaded constant and keeps the
//! destination register: a constant handle is used as is, a primitive is
//! converted to the original constant's type, `null` loads `null`, and no
//! result leaves the load unchanged.

use std::{cell::RefCell, fmt, rc::Rc};

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    bridge::{
        context::{BridgeContext, ResolvedMethod},
        ir_wrapper::{IrCursor, IrNode},
        pattern::TargetPattern,
        protocol::Mutation,
        traverse::Cursor,
    },
    events::EventKind,
    ir::{Constant, IrInstruction, IrMethod},
    value::{arg, DynamicValue, Properties, ScriptFunction},
    Error, Result,
};

/// What a rule hooks into; the string form is the registration function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum RuleKind {
    /// Runs on method entry.
    #[strum(serialize = "beforeMethod")]
    BeforeMethod,
    /// Runs on method exit.
    #[strum(serialize = "afterMethod")]
    AfterMethod,
    /// Observes matching invokes.
    #[strum(serialize = "beforeCall")]
    BeforeCall,
    /// Observes matching invokes.
    #[strum(serialize = "afterCall")]
    AfterCall,
    /// Rewrites matching invokes.
    #[strum(serialize = "replaceCall")]
    ReplaceCall,
    /// Observes matching field reads.
    #[strum(serialize = "beforeFieldRead")]
    BeforeFieldRead,
    /// Observes matching field writes.
    #[strum(serialize = "afterFieldWrite")]
    AfterFieldWrite,
    /// Removes instructions the filter accepts.
    #[strum(serialize = "removeInstruction")]
    Remove,
    /// Replaces loaded constants.
    #[strum(serialize = "replaceConstant")]
    ReplaceConstant,
    /// Observes every instruction.
    #[strum(serialize = "modifyInstruction")]
    Modify,
}

impl RuleKind {
    /// Config key holding the rule's callback.
    #[must_use]
    pub fn callback_key(self) -> &'static str {
        match self {
            RuleKind::ReplaceCall | RuleKind::ReplaceConstant => "with",
            RuleKind::Remove => "filter",
            RuleKind::Modify => "modify",
            _ => "inject",
        }
    }

    /// Returns true for rules matched against `owner.name` targets.
    #[must_use]
    pub fn takes_target(self) -> bool {
        matches!(
            self,
            RuleKind::BeforeCall
                | RuleKind::AfterCall
                | RuleKind::ReplaceCall
                | RuleKind::BeforeFieldRead
                | RuleKind::AfterFieldWrite
        )
    }

    /// Returns true for rules that run once per method rather than per
    /// instruction.
    #[must_use]
    pub fn is_method_level(self) -> bool {
        matches!(self, RuleKind::BeforeMethod | RuleKind::AfterMethod)
    }
}

/// One registered rule.
#[derive(Debug, Clone)]
pub struct Rule {
    kind: RuleKind,
    target: Option<(String, TargetPattern)>,
    filter: Option<ScriptFunction>,
    action: Option<ScriptFunction>,
}

impl Rule {
    /// Creates a rule with its main callback. For
    /// [`RuleKind::Remove`] the callback is the filter.
    #[must_use]
    pub fn new(kind: RuleKind, callback: ScriptFunction) -> Self {
        let (filter, action) = if kind == RuleKind::Remove {
            (Some(callback), None)
        } else {
            (None, Some(callback))
        };
        Self {
            kind,
            target: None,
            filter,
            action,
        }
    }

    /// Restricts the rule to `owner.name` targets matching `pattern`.
    #[must_use]
    pub fn target(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let compiled = TargetPattern::compile(&pattern);
        self.target = Some((pattern, compiled));
        self
    }

    /// Adds a filter callback.
    #[must_use]
    pub fn filter(mut self, filter: ScriptFunction) -> Self {
        self.filter = Some(filter);
        self
    }

    /// The rule kind.
    #[must_use]
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// The target pattern as written.
    #[must_use]
    pub fn target_text(&self) -> Option<&str> {
        self.target.as_ref().map(|(text, _)| text.as_str())
    }

    fn targets(&self, owner: &str, name: &str) -> bool {
        self.target
            .as_ref()
            .map_or(true, |(_, pattern)| pattern.matches(&format!("{owner}.{name}")))
    }

    /// Returns true if the instruction is in the rule's scope, before the
    /// filter runs.
    #[must_use]
    pub fn selects(&self, instr: &IrInstruction) -> bool {
        match (self.kind, instr) {
            (
                RuleKind::BeforeCall | RuleKind::AfterCall | RuleKind::ReplaceCall,
                IrInstruction::Invoke { owner, name, .. },
            )
            | (RuleKind::BeforeFieldRead, IrInstruction::FieldRead { owner, name, .. })
            | (RuleKind::AfterFieldWrite, IrInstruction::FieldWrite { owner, name, .. }) => self.targets(owner, name),
            (RuleKind::ReplaceConstant, IrInstruction::ConstantLoad { .. }) => true,
            (RuleKind::Remove | RuleKind::Modify, _) => true,
            _ => false,
        }
    }
}

/// The rule catalog and its apply entry point.
pub struct RuleEngine {
    ctx: Rc<BridgeContext>,
    rules: RefCell<Vec<Rule>>,
}

impl RuleEngine {
    /// Creates an engine with no rules.
    #[must_use]
    pub fn new(ctx: Rc<BridgeContext>) -> Self {
        Self {
            ctx,
            rules: RefCell::new(Vec::new()),
        }
    }

    /// Registers a rule from a script config object.
    ///
    /// Returns `false` (and logs) if `config` is not an object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCallable`] if the rule's callback is missing or not a
    /// function.
    pub fn add_rule(&self, kind: RuleKind, config: &DynamicValue) -> Result<bool> {
        if config.as_object().is_none() {
            self.ctx.sink().warn(format!("{kind} requires a config object"));
            return Ok(false);
        }
        let key = kind.callback_key();
        let callback = config
            .get(key)
            .and_then(DynamicValue::as_function)
            .cloned()
            .ok_or_else(|| Error::NotCallable {
                function: kind.to_string(),
                argument: key.to_string(),
            })?;

        let mut rule = Rule::new(kind, callback);
        if kind != RuleKind::Remove {
            if let Some(filter) = config.get("filter").and_then(DynamicValue::as_function) {
                rule = rule.filter(filter.clone());
            }
        }
        if kind.takes_target() {
            if let Some(target) = config.get_string("target") {
                rule = rule.target(target);
            }
        }
        self.add(rule);
        Ok(true)
    }

    /// Registers a rule built in Rust.
    pub fn add(&self, rule: Rule) {
        if self.ctx.config().log_registrations {
            let suffix = rule.target_text().map(|t| format!(" for {t}")).unwrap_or_default();
            self.ctx
                .sink()
                .record(EventKind::RuleAdded)
                .message(format!("Added {} rule{suffix}", rule.kind));
        }
        self.rules.borrow_mut().push(rule);
    }

    /// Registers a `replaceConstant` rule.
    pub fn replace_constant(&self, filter: Option<ScriptFunction>, with: ScriptFunction) {
        let mut rule = Rule::new(RuleKind::ReplaceConstant, with);
        rule.filter = filter;
        self.add(rule);
    }

    /// Number of registered rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.borrow().len()
    }

    /// Drops every rule.
    pub fn clear_rules(&self) {
        self.rules.borrow_mut().clear();
        self.ctx
            .sink()
            .record(EventKind::RulesCleared)
            .message("Cleared all instrumentation rules");
    }

    /// Resolves and lifts `reference`, runs every rule over it and returns
    /// the number of activations. Failures are reported and yield `0`.
    pub fn apply(&self, reference: &DynamicValue) -> usize {
        let (resolved, mut method) = match self.ctx.checkout_method(reference) {
            Ok(checked_out) => checked_out,
            Err(e) => {
                self.ctx.report(&e);
                return 0;
            }
        };
        let count = self.run(&resolved, &mut method);
        self.ctx.checkin_method(&resolved, method);

        self.ctx
            .sink()
            .record(EventKind::PassCompleted)
            .method(resolved.qualified())
            .message(format!("Applied {count} modifications to {}", resolved.name));
        count
    }

    /// Runs every rule over `method`.
    pub fn run(&self, resolved: &ResolvedMethod, method: &mut IrMethod) -> usize {
        let rules = self.rules.borrow().clone();
        let label = resolved.qualified();
        let mut total = 0;
        for rule in &rules {
            let activations = if rule.kind.is_method_level() {
                self.run_method_rule(rule, resolved, method, &label)
            } else {
                self.run_instruction_rule(rule, method, &label)
            };
            if activations > 0 && self.ctx.config().record_mutations {
                self.ctx
                    .sink()
                    .record(EventKind::RuleActivated)
                    .method(label.as_str())
                    .message(format!("{} rule activated {activations} times", rule.kind));
            }
            total += activations;
        }
        total
    }

    fn passes(&self, filter: Option<&ScriptFunction>, wrapped: &DynamicValue, label: &str) -> bool {
        let Some(filter) = filter else {
            return true;
        };
        match filter.call(std::slice::from_ref(wrapped)) {
            Ok(result) => result.is_some_and(|r| r.is_truthy()),
            Err(e) => {
                self.callback_failed(label, &e);
                false
            }
        }
    }

    fn invoke(&self, action: Option<&ScriptFunction>, wrapped: DynamicValue, label: &str) -> Option<DynamicValue> {
        match action?.call(&[wrapped]) {
            Ok(result) => result,
            Err(e) => {
                self.callback_failed(label, &e);
                None
            }
        }
    }

    fn callback_failed(&self, label: &str, error: &Error) {
        self.ctx
            .sink()
            .record(EventKind::CallbackFailed)
            .method(label)
            .message(format!("Callback error: {error}"));
    }

    fn run_method_rule(&self, rule: &Rule, resolved: &ResolvedMethod, method: &IrMethod, label: &str) -> usize {
        let descriptor = DynamicValue::Object(
            Properties::new()
                .with("className", resolved.class_name.as_str())
                .with("name", resolved.name.as_str())
                .with("desc", resolved.descriptor.as_str())
                .with("blockCount", method.blocks().len())
                .with("instructionCount", method.instruction_count()),
        );
        if !self.passes(rule.filter.as_ref(), &descriptor, label) {
            return 0;
        }
        self.invoke(rule.action.as_ref(), descriptor, label);
        1
    }

    fn run_instruction_rule(&self, rule: &Rule, method: &mut IrMethod, label: &str) -> usize {
        let sink = self.ctx.sink_handle();
        let mut activations = 0;

        for block_index in 0..method.blocks().len() {
            let block = Rc::new(method.blocks()[block_index].clone());
            for instr in block.instructions() {
                if !rule.selects(instr) {
                    continue;
                }
                let wrapped = IrCursor::within(
                    IrNode::Instruction(instr.clone()),
                    vec![IrNode::Block(block.clone())],
                    sink.clone(),
                )
                .wrap();
                if !self.passes(rule.filter.as_ref(), &wrapped, label) {
                    continue;
                }
                activations += 1;

                let mutation = match rule.kind {
                    RuleKind::Remove => Mutation::Remove,
                    RuleKind::ReplaceCall => {
                        let result = self.invoke(rule.action.as_ref(), wrapped, label);
                        Mutation::from_result(result, instr, &*sink)
                    }
                    RuleKind::ReplaceConstant => {
                        let result = self.invoke(rule.action.as_ref(), wrapped, label);
                        match (replacement_constant(result, instr.constant()), instr.result()) {
                            (Some(value), Some(dest)) => Mutation::Replace(Rc::new(IrInstruction::ConstantLoad {
                                dest: dest.clone(),
                                value,
                            })),
                            _ => Mutation::Keep,
                        }
                    }
                    _ => {
                        self.invoke(rule.action.as_ref(), wrapped, label);
                        Mutation::Keep
                    }
                };
                if mutation == Mutation::Keep {
                    continue;
                }
                let description = format!("{} rule rewrote {instr}", rule.kind);
                if let Some((kind, index)) = mutation.apply(&mut method.blocks_mut()[block_index], instr) {
                    if self.ctx.config().record_mutations {
                        sink.record(kind).at(label, index).message(description);
                    }
                }
            }
        }
        activations
    }

    /// The script `instrument` object.
    pub fn to_dynamic(self: &Rc<Self>) -> DynamicValue {
        use strum::IntoEnumIterator;

        let mut props = Properties::with_capacity(16);
        for kind in RuleKind::iter() {
            let this = self.clone();
            let name: &'static str = kind.into();
            props.insert(
                name,
                DynamicValue::function(name, move |args| Ok(Some(this.add_rule(kind, &arg(args, 0))?.into()))),
            );
        }

        let this = self.clone();
        props.insert(
            "apply",
            DynamicValue::function("apply", move |args| Ok(Some(this.apply(&arg(args, 0)).into()))),
        );
        let this = self.clone();
        props.insert(
            "clearRules",
            DynamicValue::function("clearRules", move |_| {
                this.clear_rules();
                Ok(None)
            }),
        );
        let this = self.clone();
        props.insert(
            "getRuleCount",
            DynamicValue::function("getRuleCount", move |_| Ok(Some(this.rule_count().into()))),
        );
        DynamicValue::Object(props)
    }
}

impl fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rules.borrow().len())
            .finish_non_exhaustive()
    }
}

/// The constant a `replaceConstant` callback result stands for.
fn replacement_constant(result: Option<DynamicValue>, original: Option<&Constant>) -> Option<Constant> {
    let result = result?;
    if let Some(handle) = result.native() {
        return handle.as_constant().ok();
    }
    match result {
        DynamicValue::Null => Some(Constant::Null),
        DynamicValue::Bool(_) | DynamicValue::Number(_) | DynamicValue::Str(_) => {
            let ty = original.filter(|c| **c != Constant::Null).map(Constant::type_name);
            Some(Constant::from_dynamic(&result, ty))
        }
        _ => None,
    }
}
