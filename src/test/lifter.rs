use std::{cell::Cell, collections::HashMap};

use crate::{
    ast::AstTree,
    ir::IrMethod,
    lift::Lifter,
    model::{ClassFile, ConstantPool, MethodEntry},
};

/// Lifter serving canned IR and syntax trees keyed by `name + descriptor`.
#[derive(Default)]
pub struct FixtureLifter {
    methods: HashMap<String, IrMethod>,
    trees: HashMap<String, AstTree>,
    lifts: Cell<usize>,
}

impl FixtureLifter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: IrMethod) -> Self {
        let key = format!("{}{}", method.name(), method.descriptor());
        self.methods.insert(key, method);
        self
    }

    pub fn with_tree(mut self, name: &str, descriptor: &str, tree: AstTree) -> Self {
        self.trees.insert(format!("{name}{descriptor}"), tree);
        self
    }

    /// Number of successful lifts so far.
    pub fn lifts(&self) -> usize {
        self.lifts.get()
    }
}

impl Lifter for FixtureLifter {
    fn lift_method(&self, _pool: &ConstantPool, method: &MethodEntry) -> Option<IrMethod> {
        let found = self
            .methods
            .get(&format!("{}{}", method.name, method.descriptor))
            .cloned();
        if found.is_some() {
            self.lifts.set(self.lifts.get() + 1);
        }
        found
    }

    fn lift_ast(&self, _class: &ClassFile, method: &MethodEntry) -> Option<AstTree> {
        let found = self
            .trees
            .get(&format!("{}{}", method.name, method.descriptor))
            .cloned();
        if found.is_some() {
            self.lifts.set(self.lifts.get() + 1);
        }
        found
    }
}
