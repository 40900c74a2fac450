//! Benchmarks for handler dispatch.
//!
//! Measures the per-instruction cost of:
//! - Walking a method with handlers that never match
//! - Wrapping every instruction for an observing handler
//! - Replacing constant loads
//! - Glob target matching

extern crate irhook;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use irhook::{bridge::matches_target, prelude::*};
use std::hint::black_box;

const BLOCKS: u32 = 64;
const PER_BLOCK: u32 = 32;

/// A method of `BLOCKS` blocks, each alternating constant loads and calls.
fn synthetic_method() -> IrMethod {
    let blocks = (0..BLOCKS)
        .map(|b| {
            let instructions = (0..PER_BLOCK)
                .map(|i| {
                    let id = b * PER_BLOCK + i;
                    let dest = VirtualRegister::new(id, format!("v{id}"));
                    if i % 2 == 0 {
                        IrInstruction::ConstantLoad {
                            dest,
                            value: Constant::String(format!("s{id}")),
                        }
                    } else {
                        IrInstruction::Invoke {
                            dest: Some(dest),
                            kind: InvokeKind::Static,
                            owner: "com/example/Crypto".into(),
                            name: "hash".into(),
                            descriptor: "(Ljava/lang/String;)Ljava/lang/String;".into(),
                            args: vec![Value::Register(VirtualRegister::new(id - 1, format!("v{}", id - 1)))],
                        }
                    }
                })
                .collect();
            IrBlock::with_instructions(b, instructions)
        })
        .collect();
    IrMethod::new("bench", "()V", blocks)
}

fn session() -> ScriptSession {
    let lifter = (
        |_: &ConstantPool, _: &MethodEntry| -> Option<IrMethod> { None },
        |_: &ClassFile, _: &MethodEntry| -> Option<AstTree> { None },
    );
    ScriptSession::with_config(ClassPool::new(), lifter, BridgeConfig::quiet())
}

fn bench_unmatched_handlers(c: &mut Criterion) {
    let session = session();
    session.ir().on(IrHandlerKind::Branch, None, ScriptFunction::new("noop", |_| Ok(None)));
    let method = synthetic_method();

    let mut group = c.benchmark_group("dispatch_unmatched");
    group.throughput(Throughput::Elements(u64::from(BLOCKS * PER_BLOCK)));
    group.bench_function("branch_handler", |b| {
        b.iter_batched_ref(
            || method.clone(),
            |m| black_box(session.ir().run(m, "bench")),
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_observing_handler(c: &mut Criterion) {
    let session = session();
    session.ir().on(
        IrHandlerKind::Instruction,
        None,
        ScriptFunction::new("observe", |args| {
            black_box(arg(args, 0).get_string("kind"));
            Ok(None)
        }),
    );
    let method = synthetic_method();

    let mut group = c.benchmark_group("dispatch_observe");
    group.throughput(Throughput::Elements(u64::from(BLOCKS * PER_BLOCK)));
    group.bench_function("for_each_instruction", |b| {
        b.iter_batched_ref(
            || method.clone(),
            |m| black_box(session.ir().run(m, "bench")),
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_replace_constants(c: &mut Criterion) {
    let session = session();
    let replacement = session.ir().constant(Constant::String("REDACTED".into()));
    session.ir().on(
        IrHandlerKind::Constant,
        None,
        ScriptFunction::new("redact", move |_| Ok(Some(replacement.clone()))),
    );
    let method = synthetic_method();

    c.bench_function("dispatch_replace_constants", |b| {
        b.iter_batched_ref(
            || method.clone(),
            |m| black_box(session.ir().run(m, "bench")),
            BatchSize::SmallInput,
        );
    });
}

fn bench_target_patterns(c: &mut Criterion) {
    let targets = [
        "com/example/Crypto.hash",
        "java/io/PrintStream.println",
        "java/lang/System.out",
        "org/acme/deep/nested/package/Type.method",
    ];

    for (name, pattern) in [("prefix", "java/*"), ("suffix", "*hash"), ("interior", "*example/Cr*")] {
        c.bench_function(&format!("pattern_{name}"), |b| {
            b.iter(|| {
                targets
                    .iter()
                    .filter(|t| matches_target(black_box(t), Some(pattern)))
                    .count()
            });
        });
    }
}

criterion_group!(
    benches,
    bench_unmatched_handlers,
    bench_observing_handler,
    bench_replace_constants,
    bench_target_patterns,
);
criterion_main!(benches);
