//! State shared by every bridge of a session.

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::Rc,
};

use crate::{
    ast::SharedTree,
    config::BridgeConfig,
    events::{EventKind, LogSink},
    ir::IrMethod,
    lift::{LiftCache, Lifter},
    model::ClassPool,
    value::DynamicValue,
    Error, Result,
};

/// A method reference as scripts write it.
///
/// Either `"pkg/Class.name(desc)"` (dots in the class part are accepted, the
/// descriptor is optional) or an object `{className, name, desc?}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    /// Internal class name.
    pub class_name: String,
    /// Method name.
    pub name: String,
    /// Descriptor; without one the first method of that name is used.
    pub descriptor: Option<String>,
}

impl MethodRef {
    /// Parses the string form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] if there is no `.` separating class and
    /// method name.
    pub fn parse(reference: &str) -> Result<Self> {
        let (head, descriptor) = match reference.find('(') {
            Some(pos) => (&reference[..pos], Some(reference[pos..].to_string())),
            None => (reference, None),
        };
        match head.rsplit_once('.') {
            Some((class, name)) if !class.is_empty() && !name.is_empty() => Ok(Self {
                class_name: class.replace('.', "/"),
                name: name.to_string(),
                descriptor,
            }),
            _ => Err(Error::Resolution(format!("Invalid method reference: {reference}"))),
        }
    }

    /// Reads either accepted form from a script value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] for malformed strings, objects without
    /// `className` or `name`, and values of any other type.
    pub fn from_dynamic(value: &DynamicValue) -> Result<Self> {
        if let Some(reference) = value.as_str() {
            return Self::parse(reference);
        }
        if value.as_object().is_none() {
            return Err(Error::Resolution("Invalid method reference type".to_string()));
        }
        let (Some(class_name), Some(name)) = (value.get_string("className"), value.get_string("name"))
        else {
            return Err(Error::Resolution("Missing class or method name".to_string()));
        };
        Ok(Self {
            class_name: class_name.replace('.', "/"),
            name,
            descriptor: value.get_string("desc").or_else(|| value.get_string("descriptor")),
        })
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.class_name, self.name, self.descriptor.as_deref().unwrap_or(""))
    }
}

/// A reference resolved against the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMethod {
    /// Internal class name.
    pub class_name: String,
    /// Method name.
    pub name: String,
    /// Full descriptor.
    pub descriptor: String,
}

impl ResolvedMethod {
    /// Lift-cache key.
    #[must_use]
    pub fn key(&self) -> String {
        LiftCache::key(&self.class_name, &self.name, &self.descriptor)
    }

    /// `class.name(desc)`, as used in event locations.
    #[must_use]
    pub fn qualified(&self) -> String {
        format!("{}.{}{}", self.class_name, self.name, self.descriptor)
    }
}

/// Project, lifter, cache, sink and configuration shared by the bridges.
pub struct BridgeContext {
    project: RefCell<ClassPool>,
    lifter: Box<dyn Lifter>,
    cache: LiftCache,
    sink: Rc<dyn LogSink>,
    config: BridgeConfig,
}

impl BridgeContext {
    /// Creates a context.
    pub fn new(
        project: ClassPool,
        lifter: Box<dyn Lifter>,
        sink: Rc<dyn LogSink>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            project: RefCell::new(project),
            lifter,
            cache: LiftCache::new(),
            sink,
            config,
        }
    }

    /// The shared sink.
    #[must_use]
    pub fn sink(&self) -> &dyn LogSink {
        &*self.sink
    }

    /// A new handle to the shared sink.
    #[must_use]
    pub fn sink_handle(&self) -> Rc<dyn LogSink> {
        self.sink.clone()
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The lift cache.
    #[must_use]
    pub fn cache(&self) -> &LiftCache {
        &self.cache
    }

    /// Borrows the project.
    ///
    /// # Panics
    ///
    /// Panics if the project is currently borrowed mutably.
    #[must_use]
    pub fn project(&self) -> Ref<'_, ClassPool> {
        self.project.borrow()
    }

    /// Borrows the project mutably.
    ///
    /// # Panics
    ///
    /// Panics if the project is currently borrowed.
    #[must_use]
    pub fn project_mut(&self) -> RefMut<'_, ClassPool> {
        self.project.borrow_mut()
    }

    /// Reports a recoverable failure to the sink with the matching event kind.
    pub fn report(&self, error: &Error) {
        let kind = match error {
            Error::Resolution(_) | Error::Shape(_) => EventKind::ResolutionFailed,
            Error::LiftFailed(_) => EventKind::LiftFailed,
            Error::Callback { .. } | Error::NotCallable { .. } => EventKind::CallbackFailed,
            _ => EventKind::Warning,
        };
        self.sink().record(kind).message(error.to_string());
    }

    /// Resolves `reference` to a concrete method with a code body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] if the class does not exist, or no method
    /// matches, or the match has no code.
    pub fn resolve(&self, reference: &MethodRef) -> Result<ResolvedMethod> {
        let project = self.project();
        let class = project
            .get(&reference.class_name)
            .ok_or_else(|| Error::Resolution(format!("Class not found: {}", reference.class_name)))?;
        let method = class
            .find_method(&reference.name, reference.descriptor.as_deref())
            .filter(|m| m.has_code())
            .ok_or_else(|| {
                Error::Resolution(format!("Method not found or has no code: {}", reference.name))
            })?;
        Ok(ResolvedMethod {
            class_name: class.name.clone(),
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
        })
    }

    fn lift_ir(&self, resolved: &ResolvedMethod) -> Result<IrMethod> {
        let project = self.project();
        let class = project
            .get(&resolved.class_name)
            .ok_or_else(|| Error::Resolution(format!("Class not found: {}", resolved.class_name)))?;
        let method = class
            .find_method(&resolved.name, Some(&resolved.descriptor))
            .ok_or_else(|| Error::Resolution(format!("Method not found or has no code: {}", resolved.name)))?;
        let lifted = self
            .lifter
            .lift_method(&class.constant_pool, method)
            .filter(|m| m.entry_block().is_some())
            .ok_or_else(|| Error::LiftFailed(resolved.qualified()))?;
        self.sink()
            .record(EventKind::MethodLifted)
            .method(resolved.qualified())
            .message(format!("Lifted {} to IR ({} instructions)", resolved.name, lifted.instruction_count()));
        Ok(lifted)
    }

    /// Resolves a script reference and checks its IR out of the cache,
    /// lifting it on a miss.
    ///
    /// The method must be handed back with [`BridgeContext::checkin_method`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] or [`Error::LiftFailed`].
    pub fn checkout_method(&self, reference: &DynamicValue) -> Result<(ResolvedMethod, IrMethod)> {
        let reference = MethodRef::from_dynamic(reference)?;
        let resolved = self.resolve(&reference)?;
        let cached = if self.config.cache_lifted_methods {
            self.cache.take_method(&resolved.key())
        } else {
            None
        };
        let method = match cached {
            Some(method) => method,
            None => self.lift_ir(&resolved)?,
        };
        Ok((resolved, method))
    }

    /// Returns a checked-out method to the cache.
    pub fn checkin_method(&self, resolved: &ResolvedMethod, method: IrMethod) {
        if self.config.cache_lifted_methods {
            self.cache.store_method(resolved.key(), method);
        }
    }

    /// Resolves a script reference and returns its syntax tree, decompiling
    /// it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] or [`Error::LiftFailed`].
    pub fn tree_for(&self, reference: &DynamicValue) -> Result<(ResolvedMethod, SharedTree)> {
        let reference = MethodRef::from_dynamic(reference)?;
        let resolved = self.resolve(&reference)?;
        let key = resolved.key();
        if self.config.cache_lifted_methods {
            if let Some(tree) = self.cache.tree(&key) {
                return Ok((resolved, tree));
            }
        }

        let tree = {
            let project = self.project();
            let class = project
                .get(&resolved.class_name)
                .ok_or_else(|| Error::Resolution(format!("Class not found: {}", resolved.class_name)))?;
            let method = class
                .find_method(&resolved.name, Some(&resolved.descriptor))
                .ok_or_else(|| Error::Resolution(format!("Method not found or has no code: {}", resolved.name)))?;
            self.lifter
                .lift_ast(class, method)
                .filter(|t| t.root().is_some())
                .ok_or_else(|| Error::LiftFailed(resolved.qualified()))?
                .into_shared()
        };
        self.sink()
            .record(EventKind::MethodLifted)
            .method(resolved.qualified())
            .message(format!("Decompiled {} to a syntax tree", resolved.name));
        if self.config.cache_lifted_methods {
            self.cache.store_tree(key, tree.clone());
        }
        Ok((resolved, tree))
    }
}

impl fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeContext")
            .field("classes", &self.project.borrow().len())
            .field("cached", &self.cache.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
