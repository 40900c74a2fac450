//! Classes, methods, fields and their attributes.

use bitflags::bitflags;

use crate::model::{Annotation, ConstantPool};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Class access flags (JVMS table 4.1-B)
    pub struct ClassAccessFlags: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared final
        const FINAL = 0x0010;
        /// Treat superclass methods specially for invokespecial
        const SUPER = 0x0020;
        /// Is an interface
        const INTERFACE = 0x0200;
        /// Declared abstract
        const ABSTRACT = 0x0400;
        /// Not present in source
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation interface
        const ANNOTATION = 0x2000;
        /// Declared as an enum class
        const ENUM = 0x4000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Method access flags (JVMS table 4.6-A)
    pub struct MethodAccessFlags: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Declared synchronized
        const SYNCHRONIZED = 0x0020;
        /// Compiler-generated bridge method
        const BRIDGE = 0x0040;
        /// Declared with variable arity
        const VARARGS = 0x0080;
        /// Declared native
        const NATIVE = 0x0100;
        /// Declared abstract
        const ABSTRACT = 0x0400;
        /// Declared strictfp
        const STRICT = 0x0800;
        /// Not present in source
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Field access flags (JVMS table 4.5-A)
    pub struct FieldAccessFlags: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Declared volatile
        const VOLATILE = 0x0040;
        /// Declared transient
        const TRANSIENT = 0x0080;
        /// Not present in source
        const SYNTHETIC = 0x1000;
        /// Element of an enum class
        const ENUM = 0x4000;
    }
}

/// Attributes attached to a class, method or field.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// `RuntimeVisibleAnnotations`
    RuntimeVisibleAnnotations(Vec<Annotation>),
    /// `RuntimeInvisibleAnnotations`
    RuntimeInvisibleAnnotations(Vec<Annotation>),
    /// `Code`, kept as raw bytecode for the lifter.
    Code {
        /// Operand stack depth.
        max_stack: u16,
        /// Local variable slots.
        max_locals: u16,
        /// Raw bytecode.
        code: Vec<u8>,
    },
    /// Any other attribute, kept opaque.
    Other {
        /// Attribute name.
        name: String,
        /// Raw attribute payload.
        data: Vec<u8>,
    },
}

impl Attribute {
    /// Returns the annotation list of an annotation attribute.
    pub fn annotations_mut(&mut self) -> Option<&mut Vec<Annotation>> {
        match self {
            Attribute::RuntimeVisibleAnnotations(list)
            | Attribute::RuntimeInvisibleAnnotations(list) => Some(list),
            _ => None,
        }
    }

    /// Returns the annotation list of an annotation attribute.
    #[must_use]
    pub fn annotations(&self) -> Option<&[Annotation]> {
        match self {
            Attribute::RuntimeVisibleAnnotations(list)
            | Attribute::RuntimeInvisibleAnnotations(list) => Some(list),
            _ => None,
        }
    }
}

fn count_annotations(attributes: &[Attribute]) -> usize {
    attributes
        .iter()
        .filter_map(Attribute::annotations)
        .map(<[Annotation]>::len)
        .sum()
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodEntry {
    /// Access flags.
    pub access: MethodAccessFlags,
    /// Method name.
    pub name: String,
    /// Method descriptor.
    pub descriptor: String,
    /// Attributes, including `Code` for concrete methods.
    pub attributes: Vec<Attribute>,
}

impl MethodEntry {
    /// Creates a method without attributes.
    pub fn new(access: MethodAccessFlags, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            attributes: Vec::new(),
        }
    }

    /// Returns true if the method carries a `Code` attribute.
    #[must_use]
    pub fn has_code(&self) -> bool {
        self.attributes
            .iter()
            .any(|a| matches!(a, Attribute::Code { .. }))
    }

    /// Returns true for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.contains(MethodAccessFlags::STATIC)
    }

    /// Number of declared annotations, visible and invisible.
    #[must_use]
    pub fn annotation_count(&self) -> usize {
        count_annotations(&self.attributes)
    }
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    /// Access flags.
    pub access: FieldAccessFlags,
    /// Field name.
    pub name: String,
    /// Field descriptor.
    pub descriptor: String,
    /// Attributes.
    pub attributes: Vec<Attribute>,
}

impl FieldEntry {
    /// Creates a field without attributes.
    pub fn new(access: FieldAccessFlags, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            attributes: Vec::new(),
        }
    }

    /// Number of declared annotations, visible and invisible.
    #[must_use]
    pub fn annotation_count(&self) -> usize {
        count_annotations(&self.attributes)
    }
}

/// A parsed class file.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    /// Internal name (`com/example/Foo`).
    pub name: String,
    /// Internal name of the superclass.
    pub super_name: Option<String>,
    /// Access flags.
    pub access: ClassAccessFlags,
    /// The class's constant pool.
    pub constant_pool: ConstantPool,
    /// Declared methods.
    pub methods: Vec<MethodEntry>,
    /// Declared fields.
    pub fields: Vec<FieldEntry>,
    /// Class-level attributes.
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Creates an empty public class extending `java/lang/Object`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_name: Some("java/lang/Object".to_string()),
            access: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            constant_pool: ConstantPool::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Finds a method by name and, optionally, descriptor.
    ///
    /// Without a descriptor the first method with that name wins.
    #[must_use]
    pub fn find_method(&self, name: &str, descriptor: Option<&str>) -> Option<&MethodEntry> {
        self.methods
            .iter()
            .find(|m| m.name == name && descriptor.map_or(true, |d| m.descriptor == d))
    }

    /// Finds a field by name.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of class-level annotations, visible and invisible.
    #[must_use]
    pub fn annotation_count(&self) -> usize {
        count_annotations(&self.attributes)
    }
}

/// The set of classes a script operates on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassPool {
    classes: Vec<ClassFile>,
}

impl ClassPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class, replacing any class with the same name.
    pub fn add(&mut self, class: ClassFile) {
        if let Some(existing) = self.classes.iter_mut().find(|c| c.name == class.name) {
            *existing = class;
        } else {
            self.classes.push(class);
        }
    }

    /// Looks up a class by internal name; dotted names are accepted too.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ClassFile> {
        let name = name.replace('.', "/");
        self.classes.iter().find(|c| c.name == name)
    }

    /// Mutable lookup by internal or dotted name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ClassFile> {
        let name = name.replace('.', "/");
        self.classes.iter_mut().find(|c| c.name == name)
    }

    /// Iterates all classes.
    pub fn iter(&self) -> impl Iterator<Item = &ClassFile> {
        self.classes.iter()
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if the pool holds no classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FromIterator<ClassFile> for ClassPool {
    fn from_iter<T: IntoIterator<Item = ClassFile>>(iter: T) -> Self {
        let mut pool = ClassPool::new();
        for class in iter {
            pool.add(class);
        }
        pool
    }
}
