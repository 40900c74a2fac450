//! Class-file model consumed by method resolution and annotation rewriting.
//!
//! Parsing class files is out of scope; hosts build these structures from
//! their own parser. Only what the bridges need is modelled: names,
//! descriptors, access flags, the constant pool entries that annotation
//! element values resolve through, and the attribute lists annotations live in.

mod annotation;
mod class;
mod constant_pool;

pub use annotation::{
    simple_name_of, Annotation, ElementPayload, ElementValue, ElementValuePair, ELEMENT_TAG,
};
pub use class::{
    Attribute, ClassAccessFlags, ClassFile, ClassPool, FieldAccessFlags, FieldEntry,
    MethodAccessFlags, MethodEntry,
};
pub use constant_pool::{ConstantPool, ConstantPoolEntry};
