//! Boundary to the SSA and syntax-tree producers.
//!
//! Building IR or a syntax tree from bytecode is not done here. Hosts plug in
//! a [`Lifter`]; the bridges call it on demand and keep results in a
//! [`LiftCache`] keyed by `class.method.desc`, so repeated `apply` calls on the
//! same method see one instance, including earlier rewrites.

use std::{cell::RefCell, collections::HashMap};

use crate::{
    ast::{AstTree, SharedTree},
    ir::IrMethod,
    model::{ClassFile, ConstantPool, MethodEntry},
};

/// Produces IR and syntax trees for methods.
///
/// Both operations may fail (unsupported bytecode, no `Code` attribute);
/// failure is `None` and is reported to scripts as a zero result.
pub trait Lifter {
    /// Lifts a method body to SSA form.
    fn lift_method(&self, pool: &ConstantPool, method: &MethodEntry) -> Option<IrMethod>;

    /// Decompiles a method body to a syntax tree.
    fn lift_ast(&self, class: &ClassFile, method: &MethodEntry) -> Option<AstTree>;
}

impl<F, G> Lifter for (F, G)
where
    F: Fn(&ConstantPool, &MethodEntry) -> Option<IrMethod>,
    G: Fn(&ClassFile, &MethodEntry) -> Option<AstTree>,
{
    fn lift_method(&self, pool: &ConstantPool, method: &MethodEntry) -> Option<IrMethod> {
        (self.0)(pool, method)
    }

    fn lift_ast(&self, class: &ClassFile, method: &MethodEntry) -> Option<AstTree> {
        (self.1)(class, method)
    }
}

/// Per-session cache of lifted methods.
///
/// IR is stored by value and checked out for the duration of a rewrite
/// ([`LiftCache::take_method`] / [`LiftCache::store_method`]); syntax trees are
/// shared handles.
#[derive(Debug, Default)]
pub struct LiftCache {
    methods: RefCell<HashMap<String, IrMethod>>,
    trees: RefCell<HashMap<String, SharedTree>>,
}

impl LiftCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a method: `class.name.desc`.
    #[must_use]
    pub fn key(class_name: &str, method_name: &str, descriptor: &str) -> String {
        format!("{class_name}.{method_name}.{descriptor}")
    }

    /// Removes and returns the cached IR for `key`.
    pub fn take_method(&self, key: &str) -> Option<IrMethod> {
        self.methods.borrow_mut().remove(key)
    }

    /// Stores IR under `key`, replacing any previous entry.
    pub fn store_method(&self, key: impl Into<String>, method: IrMethod) {
        self.methods.borrow_mut().insert(key.into(), method);
    }

    /// Copy of the cached IR for `key`.
    #[must_use]
    pub fn method(&self, key: &str) -> Option<IrMethod> {
        self.methods.borrow().get(key).cloned()
    }

    /// Shared handle to the cached tree for `key`.
    #[must_use]
    pub fn tree(&self, key: &str) -> Option<SharedTree> {
        self.trees.borrow().get(key).cloned()
    }

    /// Stores a tree under `key`.
    pub fn store_tree(&self, key: impl Into<String>, tree: SharedTree) {
        self.trees.borrow_mut().insert(key.into(), tree);
    }

    /// Number of cached IR methods and trees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.borrow().len() + self.trees.borrow().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.methods.borrow_mut().clear();
        self.trees.borrow_mut().clear();
    }
}
