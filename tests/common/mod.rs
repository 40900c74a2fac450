//! Fixture project shared by the integration tests.
//!
//! `com/example/Vault` has two methods with code:
//!
//! - `open()V`: `"secret"`, `Crypto.hash(v0)`, `"secret"`, `"secret"`, `return`
//! - `audit(I)V`: `System.out`, `v0 + 1`, `println`, `return`
//!
//! and a syntax tree for `open()V`:
//!
//! ```text
//! String s = Crypto.hash("secret");
//! if (s.length() > 0) { System.out.println(s); }
//! return;
//! ```

#![allow(dead_code)]

use irhook::{
    ast::{AstTree, BinaryOperator, Expression, Literal, Statement},
    model::{ElementValue, ElementValuePair, ELEMENT_TAG},
    prelude::*,
};

pub const VAULT: &str = "com/example/Vault";

fn reg(id: u32) -> VirtualRegister {
    VirtualRegister::new(id, format!("v{id}"))
}

fn secret(id: u32) -> IrInstruction {
    IrInstruction::ConstantLoad {
        dest: reg(id),
        value: Constant::String("secret".into()),
    }
}

pub fn open_ir() -> IrMethod {
    IrMethod::new(
        "open",
        "()V",
        vec![IrBlock::with_instructions(
            0,
            vec![
                secret(0),
                IrInstruction::Invoke {
                    dest: Some(reg(1)),
                    kind: InvokeKind::Static,
                    owner: "com/example/Crypto".into(),
                    name: "hash".into(),
                    descriptor: "(Ljava/lang/String;)Ljava/lang/String;".into(),
                    args: vec![Value::Register(reg(0))],
                },
                secret(2),
                secret(3),
                IrInstruction::Return { value: None },
            ],
        )],
    )
}

pub fn audit_ir() -> IrMethod {
    let entry = IrBlock::with_instructions(
        0,
        vec![
            IrInstruction::FieldRead {
                dest: reg(1),
                owner: "java/lang/System".into(),
                name: "out".into(),
                descriptor: "Ljava/io/PrintStream;".into(),
                object: None,
            },
            IrInstruction::BinaryOp {
                dest: reg(2),
                op: BinaryOpcode::Add,
                left: Value::Register(reg(0)),
                right: Value::Constant(Constant::Int(1)),
            },
            IrInstruction::Invoke {
                dest: None,
                kind: InvokeKind::Virtual,
                owner: "java/io/PrintStream".into(),
                name: "println".into(),
                descriptor: "(I)V".into(),
                args: vec![Value::Register(reg(1)), Value::Register(reg(2))],
            },
        ],
    );
    let exit = IrBlock::with_instructions(1, vec![IrInstruction::Return { value: None }]);
    IrMethod::new("audit", "(I)V", vec![entry, exit])
}

pub fn open_tree() -> AstTree {
    let mut t = AstTree::new();
    let secret = t.add(Literal::String("secret".into()));
    let hash = t.add(Expression::MethodCall {
        receiver: None,
        owner: "com/example/Crypto".into(),
        name: "hash".into(),
        descriptor: "(Ljava/lang/String;)Ljava/lang/String;".into(),
        args: vec![secret],
        is_static: true,
    });
    let decl = t.add(Statement::VarDecl {
        name: "s".into(),
        ty: "String".into(),
        initializer: Some(hash),
    });
    let s1 = t.add(Expression::VarRef {
        name: "s".into(),
        ty: "String".into(),
    });
    let length = t.add(Expression::MethodCall {
        receiver: Some(s1),
        owner: "java/lang/String".into(),
        name: "length".into(),
        descriptor: "()I".into(),
        args: vec![],
        is_static: false,
    });
    let zero = t.add(Literal::Int(0));
    let cond = t.add(Expression::Binary {
        op: BinaryOperator::Gt,
        left: length,
        right: zero,
    });
    let out = t.add(Expression::FieldAccess {
        receiver: None,
        owner: "java/lang/System".into(),
        name: "out".into(),
        descriptor: "Ljava/io/PrintStream;".into(),
        is_static: true,
    });
    let s2 = t.add(Expression::VarRef {
        name: "s".into(),
        ty: "String".into(),
    });
    let println = t.add(Expression::MethodCall {
        receiver: Some(out),
        owner: "java/io/PrintStream".into(),
        name: "println".into(),
        descriptor: "(Ljava/lang/String;)V".into(),
        args: vec![s2],
        is_static: false,
    });
    let print = t.add(Statement::ExprStmt { expression: println });
    let then = t.add(Statement::Block { statements: vec![print] });
    let iff = t.add(Statement::If {
        condition: cond,
        then_branch: then,
        else_branch: None,
    });
    let ret = t.add(Statement::Return { value: None });
    let body = t.add(Statement::Block {
        statements: vec![decl, iff, ret],
    });
    t.set_root(body);
    t
}

fn with_code(name: &str, descriptor: &str) -> MethodEntry {
    let mut method = MethodEntry::new(MethodAccessFlags::PUBLIC, name, descriptor);
    method.attributes.push(Attribute::Code {
        max_stack: 2,
        max_locals: 2,
        code: vec![0xb1],
    });
    method
}

fn marker(class: &mut ClassFile, descriptor: &str, value: Option<&str>) -> Annotation {
    let pool = &mut class.constant_pool;
    let mut annotation = Annotation::new(pool.add_utf8(descriptor));
    if let Some(value) = value {
        let index = pool.add_utf8(value);
        annotation.elements.push(ElementValuePair {
            name_index: pool.add_utf8("value"),
            value: ElementValue::constant(ELEMENT_TAG::STRING, index),
        });
    }
    annotation
}

/// `Vault` with `@Deprecated` and `@Generated("tool")` on the class, and
/// `@Obfuscated` plus `@Deprecated` on `open`.
pub fn vault_class() -> ClassFile {
    let mut class = ClassFile::new(VAULT);
    class.methods.push(with_code("open", "()V"));
    class.methods.push(with_code("audit", "(I)V"));
    class
        .methods
        .push(MethodEntry::new(MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT, "hook", "()V"));

    let deprecated = marker(&mut class, "Ljava/lang/Deprecated;", None);
    let generated = marker(&mut class, "Ljavax/annotation/Generated;", Some("tool"));
    let obfuscated = marker(&mut class, "Lcom/example/Obfuscated;", None);
    class
        .attributes
        .push(Attribute::RuntimeVisibleAnnotations(vec![deprecated.clone(), generated]));
    class.methods[0]
        .attributes
        .push(Attribute::RuntimeVisibleAnnotations(vec![obfuscated, deprecated]));
    class
}

/// Lifter serving [`open_ir`], [`audit_ir`] and [`open_tree`].
pub fn vault_lifter() -> impl Lifter + 'static {
    (
        |_: &ConstantPool, m: &MethodEntry| match (m.name.as_str(), m.descriptor.as_str()) {
            ("open", "()V") => Some(open_ir()),
            ("audit", "(I)V") => Some(audit_ir()),
            _ => None,
        },
        |_: &ClassFile, m: &MethodEntry| -> Option<AstTree> { (m.name == "open").then(open_tree) },
    )
}

pub fn vault_session() -> ScriptSession {
    ScriptSession::new(std::iter::once(vault_class()).collect(), vault_lifter())
}

pub fn vault_session_with(config: BridgeConfig) -> ScriptSession {
    ScriptSession::with_config(std::iter::once(vault_class()).collect(), vault_lifter(), config)
}

/// The script global called `name`.
pub fn global(session: &ScriptSession, name: &str) -> DynamicValue {
    session
        .globals()
        .into_iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v)
        .unwrap_or_default()
}

/// A script function returning `value` for every call.
pub fn returning(name: &str, value: DynamicValue) -> DynamicValue {
    DynamicValue::function(name, move |_| Ok(Some(value.clone())))
}

/// An object built from `(key, value)` pairs.
pub fn object(entries: Vec<(&str, DynamicValue)>) -> DynamicValue {
    DynamicValue::Object(entries.into_iter().collect())
}

/// The cached IR of `name + descriptor` in `Vault`.
pub fn cached(session: &ScriptSession, name: &str, descriptor: &str) -> IrMethod {
    session
        .context()
        .cache()
        .method(&LiftCache::key(VAULT, name, descriptor))
        .expect("method was lifted")
}
