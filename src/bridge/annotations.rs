//! The `annotations` script object: deletion of declared annotations.
//!
//! Handlers are registered per target (class, method, field) and see every
//! annotation declared on a matching target, in both the runtime-visible and
//! runtime-invisible attributes. An annotation wrapper looks like:
//!
//! ```text
//! { type: "Ljavax/inject/Named;", simpleName: "Named", name: "Named",
//!   target: "last", values: { value: "last" } }
//! ```
//!
//! Handlers for a target run in registration order until one returns
//! `null`; that handler removes the annotation and the remaining handlers do
//! not see it. Any other result passes the annotation on to the next
//! handler. This differs from IR and syntax-tree dispatch, where every
//! matching handler runs.

use std::rc::Rc;

use strum::{Display, EnumIter, IntoStaticStr};

use crate::{
    bridge::{
        context::BridgeContext,
        registry::{HandlerRegistry, Registration},
    },
    events::EventKind,
    model::{Annotation, Attribute, ClassFile},
    value::{arg, DynamicValue, Properties, ScriptFunction},
    Error, Result,
};

/// Declaration an annotation is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum AnnotationTarget {
    /// The class itself.
    #[strum(serialize = "onClassAnnotation")]
    Class,
    /// A method.
    #[strum(serialize = "onMethodAnnotation")]
    Method,
    /// A field.
    #[strum(serialize = "onFieldAnnotation")]
    Field,
}

/// One declaration of a class, by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Declaration {
    Class,
    Method(usize),
    Field(usize),
}

impl Declaration {
    fn target(self) -> AnnotationTarget {
        match self {
            Declaration::Class => AnnotationTarget::Class,
            Declaration::Method(_) => AnnotationTarget::Method,
            Declaration::Field(_) => AnnotationTarget::Field,
        }
    }

    fn name(self, class: &ClassFile) -> Option<&str> {
        match self {
            Declaration::Class => Some(class.name.as_str()),
            Declaration::Method(i) => class.methods.get(i).map(|m| m.name.as_str()),
            Declaration::Field(i) => class.fields.get(i).map(|f| f.name.as_str()),
        }
    }

    fn attributes(self, class: &ClassFile) -> Option<&[Attribute]> {
        match self {
            Declaration::Class => Some(&class.attributes),
            Declaration::Method(i) => class.methods.get(i).map(|m| m.attributes.as_slice()),
            Declaration::Field(i) => class.fields.get(i).map(|f| f.attributes.as_slice()),
        }
    }

    fn attributes_mut(self, class: &mut ClassFile) -> Option<&mut Vec<Attribute>> {
        match self {
            Declaration::Class => Some(&mut class.attributes),
            Declaration::Method(i) => class.methods.get_mut(i).map(|m| &mut m.attributes),
            Declaration::Field(i) => class.fields.get_mut(i).map(|f| &mut f.attributes),
        }
    }
}

/// Position of one annotation inside a class file.
#[derive(Debug, Clone, Copy)]
struct Slot {
    declaration: Declaration,
    attribute: usize,
    index: usize,
}

/// Handler registry and apply entry point for annotation deletion.
#[derive(Debug)]
pub struct AnnotationRewriter {
    ctx: Rc<BridgeContext>,
    handlers: HandlerRegistry<AnnotationTarget>,
}

impl AnnotationRewriter {
    /// Creates a rewriter with no handlers.
    #[must_use]
    pub fn new(ctx: Rc<BridgeContext>) -> Self {
        Self {
            ctx,
            handlers: HandlerRegistry::new(),
        }
    }

    /// Registers a handler from script arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCallable`] if the callbacks are not functions.
    pub fn register(&self, target: AnnotationTarget, args: &[DynamicValue]) -> Result<()> {
        self.add(Registration::from_args(target, target.into(), args)?);
        Ok(())
    }

    /// Registers a handler from Rust.
    pub fn on(&self, target: AnnotationTarget, action: ScriptFunction) {
        self.add(Registration {
            kind: target,
            predicate: None,
            action,
        });
    }

    fn add(&self, registration: Registration<AnnotationTarget>) {
        if self.ctx.config().log_registrations {
            self.ctx
                .sink()
                .record(EventKind::HandlerRegistered)
                .message(format!("Registered {} handler", registration.kind));
        }
        self.handlers.register(registration);
    }

    /// Drops every handler.
    pub fn clear_handlers(&self) {
        self.handlers.clear();
    }

    /// Returns true if any handler is registered.
    #[must_use]
    pub fn has_handlers(&self) -> bool {
        !self.handlers.is_empty()
    }

    /// Runs the handlers over every annotation of `class_name` and returns
    /// the number of removed annotations. Unknown classes are reported and
    /// yield `0`.
    pub fn apply(&self, class_name: &DynamicValue) -> usize {
        let name = match class_name.as_str() {
            Some(name) => name.replace('.', "/"),
            None => {
                self.ctx
                    .report(&Error::Resolution("Invalid class reference type".to_string()));
                return 0;
            }
        };
        if self.ctx.project().get(&name).is_none() {
            self.ctx.report(&Error::Resolution(format!("Class not found: {name}")));
            return 0;
        }

        let handlers = self.handlers.snapshot();
        let mut removed = 0;
        for declaration in self.declarations(&name) {
            let target = declaration.target();
            let for_target: Vec<_> = handlers.iter().filter(|h| h.kind == target).collect();
            if for_target.is_empty() {
                continue;
            }
            removed += self.process(&name, declaration, &for_target);
        }

        self.ctx
            .sink()
            .record(EventKind::PassCompleted)
            .method(name.as_str())
            .message(format!("Removed {removed} annotations from {name}"));
        removed
    }

    fn declarations(&self, class_name: &str) -> Vec<Declaration> {
        let project = self.ctx.project();
        let Some(class) = project.get(class_name) else {
            return Vec::new();
        };
        std::iter::once(Declaration::Class)
            .chain((0..class.methods.len()).map(Declaration::Method))
            .chain((0..class.fields.len()).map(Declaration::Field))
            .collect()
    }

    /// Processes every annotation attribute of one declaration.
    fn process(
        &self,
        class_name: &str,
        declaration: Declaration,
        handlers: &[&Registration<AnnotationTarget>],
    ) -> usize {
        let attribute_count = {
            let project = self.ctx.project();
            project
                .get(class_name)
                .and_then(|c| declaration.attributes(c))
                .map_or(0, <[Attribute]>::len)
        };

        let mut removed = 0;
        for attribute in 0..attribute_count {
            let mut index = 0;
            loop {
                let slot = Slot {
                    declaration,
                    attribute,
                    index,
                };
                // The project borrow ends before any handler runs.
                let Some((annotation, wrapped, simple_name, target)) = self.wrap_slot(class_name, slot) else {
                    break;
                };
                if self.run_handlers(handlers, &wrapped) && self.remove(class_name, slot, &annotation) {
                    removed += 1;
                    self.ctx
                        .sink()
                        .record(EventKind::AnnotationRemoved)
                        .method(class_name)
                        .message(format!("Removed annotation @{simple_name} from {target}"));
                } else {
                    index += 1;
                }
            }
        }
        removed
    }

    fn wrap_slot(&self, class_name: &str, slot: Slot) -> Option<(Annotation, DynamicValue, String, String)> {
        let project = self.ctx.project();
        let class = project.get(class_name)?;
        let annotation = slot
            .declaration
            .attributes(class)?
            .get(slot.attribute)?
            .annotations()?
            .get(slot.index)?
            .clone();
        let target = slot.declaration.name(class)?.to_string();
        let pool = &class.constant_pool;
        let simple_name = annotation.simple_name(pool);
        let wrapped = DynamicValue::Object(
            Properties::new()
                .with("type", annotation.type_descriptor(pool).unwrap_or_default())
                .with("simpleName", simple_name.as_str())
                .with("name", simple_name.as_str())
                .with("target", target.as_str())
                .with("values", annotation.decode_values(pool)),
        );
        Some((annotation, wrapped, simple_name, target))
    }

    /// Returns true if a handler asked for removal.
    fn run_handlers(&self, handlers: &[&Registration<AnnotationTarget>], wrapped: &DynamicValue) -> bool {
        for handler in handlers {
            if let Some(predicate) = &handler.predicate {
                match predicate.call(std::slice::from_ref(wrapped)) {
                    Ok(Some(result)) if result.is_true() => {}
                    Ok(_) => continue,
                    Err(e) => {
                        self.handler_failed(&e);
                        continue;
                    }
                }
            }
            match handler.action.call(std::slice::from_ref(wrapped)) {
                Ok(Some(DynamicValue::Null)) => return true,
                Ok(_) => {}
                Err(e) => self.handler_failed(&e),
            }
        }
        false
    }

    fn handler_failed(&self, error: &Error) {
        self.ctx
            .sink()
            .record(EventKind::CallbackFailed)
            .message(format!("Annotation handler error: {error}"));
    }

    /// Removes `annotation` from its attribute, preferring the slot it was
    /// read from.
    fn remove(&self, class_name: &str, slot: Slot, annotation: &Annotation) -> bool {
        let mut project = self.ctx.project_mut();
        let Some(list) = project
            .get_mut(class_name)
            .and_then(|c| slot.declaration.attributes_mut(c))
            .and_then(|attrs| attrs.get_mut(slot.attribute))
            .and_then(Attribute::annotations_mut)
        else {
            return false;
        };
        let position = if list.get(slot.index) == Some(annotation) {
            Some(slot.index)
        } else {
            list.iter().position(|a| a == annotation)
        };
        match position {
            Some(position) => {
                list.remove(position);
                true
            }
            None => false,
        }
    }

    /// The script `annotations` object.
    pub fn to_dynamic(self: &Rc<Self>) -> DynamicValue {
        use strum::IntoEnumIterator;

        let mut props = Properties::with_capacity(8);
        for target in AnnotationTarget::iter() {
            let this = self.clone();
            let name: &'static str = target.into();
            props.insert(
                name,
                DynamicValue::function(name, move |args| {
                    this.register(target, args)?;
                    Ok(None)
                }),
            );
        }
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
            "hasHandlers",
            DynamicValue::function("hasHandlers", move |_| Ok(Some(this.has_handlers().into()))),
        );
        DynamicValue::Object(props)
    }
}
