//! Integration tests for sessions: lift caching, clearing and pipelines.

mod common;

use std::{cell::Cell, rc::Rc};

use common::{cached, global, open_ir, open_tree, returning, vault_class, VAULT};
use irhook::{prelude::*, Result};

/// A session whose lifter counts IR lifts.
fn counting_session(config: BridgeConfig) -> (ScriptSession, Rc<Cell<usize>>) {
    let lifts = Rc::new(Cell::new(0));
    let counter = lifts.clone();
    let lifter = (
        move |_: &ConstantPool, m: &MethodEntry| {
            counter.set(counter.get() + 1);
            (m.name == "open").then(open_ir)
        },
        |_: &ClassFile, _: &MethodEntry| Some(open_tree()),
    );
    let session = ScriptSession::with_config(std::iter::once(vault_class()).collect(), lifter, config);
    (session, lifts)
}

fn drop_secrets(ir: &DynamicValue) -> Result<()> {
    ir.invoke(
        "onConstant",
        &[
            DynamicValue::function("isSecret", |args| {
                Ok(Some((arg(args, 0).get_string("value").as_deref() == Some("secret")).into()))
            }),
            returning("drop", DynamicValue::Null),
        ],
    )?;
    Ok(())
}

#[test]
fn test_cached_mutations_persist_across_applies() -> Result<()> {
    let (session, lifts) = counting_session(BridgeConfig::default());
    let ir = global(&session, "ir");
    drop_secrets(&ir)?;

    let reference = DynamicValue::from(format!("{VAULT}.open"));
    assert_eq!(ir.invoke("apply", &[reference.clone()])?, Some(DynamicValue::from(3)));
    assert_eq!(ir.invoke("apply", &[reference])?, Some(DynamicValue::from(0)));
    assert_eq!(lifts.get(), 1);
    assert_eq!(cached(&session, "open", "()V").instruction_count(), 2);
    Ok(())
}

#[test]
fn test_bridges_share_the_cache() -> Result<()> {
    let (session, lifts) = counting_session(BridgeConfig::default());
    drop_secrets(&global(&session, "ir"))?;
    let reference = DynamicValue::from(format!("{VAULT}.open()V"));
    assert_eq!(session.ir().apply(&reference), 3);

    // The rule engine sees the two surviving instructions.
    let config = DynamicValue::Object(Properties::new().with("modify", returning("noop", DynamicValue::Null)));
    session.instrument().add_rule(RuleKind::Modify, &config)?;
    assert_eq!(session.instrument().apply(&reference), 2);
    assert_eq!(lifts.get(), 1);
    Ok(())
}

#[test]
fn test_uncached_sessions_lift_every_time() -> Result<()> {
    let (session, lifts) = counting_session(BridgeConfig::uncached());
    let ir = global(&session, "ir");
    drop_secrets(&ir)?;

    let reference = DynamicValue::from(format!("{VAULT}.open"));
    assert_eq!(ir.invoke("apply", &[reference.clone()])?, Some(DynamicValue::from(3)));
    assert_eq!(ir.invoke("apply", &[reference])?, Some(DynamicValue::from(3)));
    assert_eq!(lifts.get(), 2);
    assert!(session.context().cache().is_empty());
    Ok(())
}

#[test]
fn test_clear_forgets_handlers_and_lifts() -> Result<()> {
    let (session, lifts) = counting_session(BridgeConfig::default());
    let ir = global(&session, "ir");
    drop_secrets(&ir)?;
    let reference = DynamicValue::from(format!("{VAULT}.open"));
    assert_eq!(session.ir().apply(&reference), 3);

    session.clear();
    assert_eq!(ir.invoke("getHandlerCount", &[])?, Some(DynamicValue::from(0)));
    assert!(session.context().cache().is_empty());

    // A fresh lift brings the secrets back.
    drop_secrets(&ir)?;
    assert_eq!(session.ir().apply(&reference), 3);
    assert_eq!(lifts.get(), 2);
    Ok(())
}

#[test]
fn test_scripted_transform_in_host_pipeline() -> Result<()> {
    let (session, lifts) = counting_session(BridgeConfig::default());
    let pass = ScriptedTransform::new("scripted", session.ir().clone());
    let mut method = open_ir();

    assert!(!run_passes(&[&pass], &mut method)?);
    drop_secrets(&global(&session, "ir"))?;
    assert!(run_passes(&[&pass], &mut method)?);
    assert_eq!(method.instruction_count(), 2);

    // The pass works on the method it is given and never lifts.
    assert_eq!(lifts.get(), 0);
    assert!(session
        .events()
        .filter_kind(EventKind::InstructionRemoved)
        .all(|e| e.method.as_deref() == Some("open()V")));
    Ok(())
}

#[test]
fn test_event_summary_lists_counts() -> Result<()> {
    let (session, _) = counting_session(BridgeConfig::default());
    drop_secrets(&global(&session, "ir"))?;
    session.ir().apply(&DynamicValue::from(format!("{VAULT}.open")));

    let summary = session.events().summary();
    assert!(summary.contains("instruction removed"), "{summary}");
    assert_eq!(session.events().count_kind(EventKind::InstructionRemoved), 3);
    assert!(session.events().failures().next().is_none());
    Ok(())
}
