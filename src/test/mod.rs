mod lifter;

use std::rc::Rc;

pub use lifter::FixtureLifter;

use crate::{
    ast::{AstTree, BinaryOperator, Expression, Literal, Statement},
    bridge::BridgeContext,
    config::BridgeConfig,
    events::{EventLog, LogSink},
    ir::{BranchCondition, Constant, InvokeKind, IrBlock, IrInstruction, IrMethod, Value, VirtualRegister},
    model::{
        Annotation, Attribute, ClassFile, ClassPool, ConstantPoolEntry, ElementValue, ElementValuePair,
        FieldAccessFlags, FieldEntry, MethodAccessFlags, MethodEntry, ELEMENT_TAG,
    },
};

/// Classes plus the lifter that knows their bodies.
pub struct Fixture {
    pub classes: ClassPool,
    pub lifter: FixtureLifter,
}

// Helper function to create a method with a (dummy) Code attribute
pub fn create_method(name: &str, descriptor: &str) -> MethodEntry {
    let mut method = MethodEntry::new(MethodAccessFlags::PUBLIC, name, descriptor);
    method.attributes.push(Attribute::Code {
        max_stack: 2,
        max_locals: 2,
        code: vec![0xb1],
    });
    method
}

// Helper function to create a class with the given (name, descriptor) methods
pub fn create_class(name: &str, methods: &[(&str, &str)]) -> ClassFile {
    let mut class = ClassFile::new(name);
    for (method, descriptor) in methods {
        class.methods.push(create_method(method, descriptor));
    }
    class
        .methods
        .push(MethodEntry::new(MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT, "hook", "()V"));
    class
}

fn reg(id: u32) -> VirtualRegister {
    VirtualRegister::new(id, format!("v{id}"))
}

fn secret(id: u32) -> IrInstruction {
    IrInstruction::ConstantLoad {
        dest: reg(id),
        value: Constant::String("secret".into()),
    }
}

/// `load()V`: three `"secret"` loads among five instructions.
pub fn secrets_ir() -> IrMethod {
    IrMethod::new(
        "load",
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

/// `store(Ljava/lang/String;)V`: field traffic, a virtual call and a branch.
pub fn store_ir() -> IrMethod {
    let block0 = IrBlock::with_instructions(
        0,
        vec![
            IrInstruction::FieldRead {
                dest: VirtualRegister::typed(1, "out", "Ljava/io/PrintStream;"),
                owner: "java/lang/System".into(),
                name: "out".into(),
                descriptor: "Ljava/io/PrintStream;".into(),
                object: None,
            },
            IrInstruction::Invoke {
                dest: None,
                kind: InvokeKind::Virtual,
                owner: "java/io/PrintStream".into(),
                name: "println".into(),
                descriptor: "(Ljava/lang/String;)V".into(),
                args: vec![Value::Register(reg(1)), Value::Register(reg(0))],
            },
            IrInstruction::FieldWrite {
                owner: "com/example/Secrets".into(),
                name: "last".into(),
                descriptor: "Ljava/lang/String;".into(),
                object: None,
                value: Value::Register(reg(0)),
            },
            IrInstruction::Branch {
                condition: Some(BranchCondition::Eq),
                left: Some(Value::Register(reg(0))),
                right: Some(Value::Constant(Constant::Null)),
                true_target: 1,
                false_target: Some(1),
            },
        ],
    );
    let block1 = IrBlock::with_instructions(1, vec![IrInstruction::Return { value: None }]);
    IrMethod::new("store", "(Ljava/lang/String;)V", vec![block0, block1])
}

/// Syntax tree of `load()V`:
///
/// ```text
/// String s = Crypto.hash("secret");
/// if (s.length() > 0) {
///     System.out.println(s);
/// }
/// return;
/// ```
pub fn secrets_tree() -> AstTree {
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

fn annotation(class: &mut ClassFile, descriptor: &str, elements: &[(&str, ElementValue)]) -> Annotation {
    let pool = &mut class.constant_pool;
    let mut annotation = Annotation::new(pool.add_utf8(descriptor));
    for (name, value) in elements {
        annotation.elements.push(ElementValuePair {
            name_index: pool.add_utf8(*name),
            value: value.clone(),
        });
    }
    annotation
}

/// `com/example/Secrets` with annotations on the class, `load` and the
/// `last` field.
///
/// - class: `@Deprecated` (visible), `@Generated("tool")` (invisible)
/// - `load`: `@Obfuscated(level = 3)`, `@Deprecated`
/// - `last`: `@Named("last")`
pub fn secrets_class() -> ClassFile {
    let mut class = create_class(
        "com/example/Secrets",
        &[("load", "()V"), ("store", "(Ljava/lang/String;)V")],
    );
    class
        .fields
        .push(FieldEntry::new(FieldAccessFlags::PRIVATE | FieldAccessFlags::STATIC, "last", "Ljava/lang/String;"));

    let tool = class.constant_pool.add_utf8("tool");
    let level = class.constant_pool.add(ConstantPoolEntry::Integer(3));
    let last = class.constant_pool.add_utf8("last");

    let deprecated = annotation(&mut class, "Ljava/lang/Deprecated;", &[]);
    let generated = annotation(
        &mut class,
        "Ljavax/annotation/Generated;",
        &[("value", ElementValue::constant(ELEMENT_TAG::STRING, tool))],
    );
    class.attributes.push(Attribute::RuntimeVisibleAnnotations(vec![deprecated.clone()]));
    class.attributes.push(Attribute::RuntimeInvisibleAnnotations(vec![generated]));

    let obfuscated = annotation(
        &mut class,
        "Lcom/example/Obfuscated;",
        &[("level", ElementValue::constant(ELEMENT_TAG::INT, level))],
    );
    class.methods[0]
        .attributes
        .push(Attribute::RuntimeVisibleAnnotations(vec![obfuscated, deprecated]));

    let named = annotation(
        &mut class,
        "Ljavax/inject/Named;",
        &[("value", ElementValue::constant(ELEMENT_TAG::STRING, last))],
    );
    class.fields[0]
        .attributes
        .push(Attribute::RuntimeVisibleAnnotations(vec![named]));
    class
}

/// The `Secrets` class with IR and syntax trees for its methods.
pub fn secrets_method() -> Fixture {
    let lifter = FixtureLifter::new()
        .with_method(secrets_ir())
        .with_method(store_ir())
        .with_tree("load", "()V", secrets_tree());
    Fixture {
        classes: std::iter::once(secrets_class()).collect(),
        lifter,
    }
}

// Helper function to create a context over a fixture, logging into the returned log
pub fn context_with(fixture: Fixture) -> (Rc<BridgeContext>, Rc<EventLog>) {
    context_with_config(fixture, BridgeConfig::default())
}

// Helper function to create a context with a specific configuration
pub fn context_with_config(fixture: Fixture, config: BridgeConfig) -> (Rc<BridgeContext>, Rc<EventLog>) {
    let log = Rc::new(EventLog::new());
    let sink: Rc<dyn LogSink> = log.clone();
    let ctx = BridgeContext::new(fixture.classes, Box::new(fixture.lifter), sink, config);
    (Rc::new(ctx), log)
}
