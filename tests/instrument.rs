//! Integration tests for the `instrument` rule engine.
//!
//! These drive the engine only through the script objects a host binds, the
//! way a user script would.

mod common;

use std::{cell::RefCell, rc::Rc};

use common::{cached, global, object, returning, vault_session, vault_session_with};
use irhook::{prelude::*, Result};

/// The redaction scenario: three `"secret"` loads among five instructions.
#[test]
fn test_replace_constant_redacts_secrets() -> Result<()> {
    let session = vault_session();
    let instrument = global(&session, "instrument");

    let is_secret = DynamicValue::function("isSecret", |args| {
        Ok(Some((arg(args, 0).get_string("value").as_deref() == Some("secret")).into()))
    });
    instrument.invoke(
        "replaceConstant",
        &[object(vec![
            ("filter", is_secret),
            ("with", returning("redact", DynamicValue::from("REDACTED"))),
        ])],
    )?;

    let count = instrument.invoke("apply", &[DynamicValue::from("com/example/Vault.open()V")])?;
    assert_eq!(count, Some(DynamicValue::from(3)));

    let method = cached(&session, "open", "()V");
    assert_eq!(method.instruction_count(), 5);
    let redacted: Vec<usize> = method
        .instructions()
        .enumerate()
        .filter(|(_, i)| i.constant() == Some(&Constant::String("REDACTED".into())))
        .map(|(index, _)| index)
        .collect();
    assert_eq!(redacted, [0, 2, 3]);

    // Registers are untouched, so the call still reads v0.
    let first = method.instructions().next().unwrap();
    assert_eq!(first.result().map(|r| r.id), Some(0));

    // Rules persist; the second apply finds nothing left to redact.
    assert_eq!(
        instrument.invoke("apply", &[DynamicValue::from("com/example/Vault.open()V")])?,
        Some(DynamicValue::from(0))
    );
    assert_eq!(session.events().count_kind(EventKind::ConstantReplaced), 3);
    Ok(())
}

#[test]
fn test_replace_call_with_constant() -> Result<()> {
    let session = vault_session();
    let instrument = global(&session, "instrument");
    let ir = global(&session, "ir");
    let constant = ir.invoke("stringConstant", &[DynamicValue::from("0000")])?.unwrap_or_default();

    instrument.invoke(
        "replaceCall",
        &[object(vec![
            ("target", DynamicValue::from("*Crypto.hash")),
            ("with", returning("fixed", constant)),
        ])],
    )?;
    let reference = object(vec![
        ("className", DynamicValue::from("com.example.Vault")),
        ("name", DynamicValue::from("open")),
    ]);
    assert_eq!(instrument.invoke("apply", &[reference])?, Some(DynamicValue::from(1)));

    let method = cached(&session, "open", "()V");
    let replaced = method.instructions().nth(1).unwrap();
    assert_eq!(replaced.constant(), Some(&Constant::String("0000".into())));
    assert_eq!(replaced.result().map(|r| r.id), Some(1));
    Ok(())
}

#[test]
fn test_hook_rules_observe_without_mutating() -> Result<()> {
    let session = vault_session();
    let instrument = global(&session, "instrument");
    let seen = Rc::new(RefCell::new(Vec::new()));

    let record = |label: &'static str| {
        let seen = seen.clone();
        DynamicValue::function(label, move |args| {
            let node = arg(args, 0);
            let name = node.get_string("name").unwrap_or_default();
            seen.borrow_mut().push(format!("{label}:{name}"));
            Ok(Some(DynamicValue::Null))
        })
    };

    instrument.invoke("beforeMethod", &[object(vec![("inject", record("enter"))])])?;
    instrument.invoke(
        "beforeCall",
        &[object(vec![("target", DynamicValue::from("java/io/*")), ("inject", record("call"))])],
    )?;
    instrument.invoke(
        "beforeFieldRead",
        &[object(vec![("target", DynamicValue::from("*System.out")), ("inject", record("read"))])],
    )?;
    instrument.invoke("afterMethod", &[object(vec![("inject", record("exit"))])])?;
    assert_eq!(instrument.invoke("getRuleCount", &[])?, Some(DynamicValue::from(4)));

    let count = instrument.invoke("apply", &[DynamicValue::from("com/example/Vault.audit")])?;
    assert_eq!(count, Some(DynamicValue::from(4)));
    assert_eq!(*seen.borrow(), ["enter:audit", "call:println", "read:out", "exit:audit"]);

    // Hooks returning null do not remove anything.
    assert_eq!(cached(&session, "audit", "(I)V").instruction_count(), 4);
    Ok(())
}

#[test]
fn test_remove_instruction_and_failures() -> Result<()> {
    let session = vault_session_with(BridgeConfig::quiet());
    let instrument = global(&session, "instrument");

    instrument.invoke(
        "removeInstruction",
        &[object(vec![(
            "filter",
            DynamicValue::function("binary", |args| {
                Ok(Some((arg(args, 0).get_string("kind").as_deref() == Some("BinaryOp")).into()))
            }),
        )])],
    )?;
    instrument.invoke(
        "modifyInstruction",
        &[object(vec![(
            "modify",
            DynamicValue::function("boom", |_| Err(Error::Shape("script threw".into()))),
        )])],
    )?;

    // One removal, then three instructions seen by the failing modify rule.
    let count = instrument.invoke("apply", &[DynamicValue::from("com/example/Vault.audit(I)V")])?;
    assert_eq!(count, Some(DynamicValue::from(4)));
    assert_eq!(cached(&session, "audit", "(I)V").instruction_count(), 3);
    assert_eq!(session.events().count_kind(EventKind::CallbackFailed), 3);
    // Quiet sessions keep failures and summaries only.
    assert_eq!(session.events().count_kind(EventKind::RuleAdded), 0);
    assert_eq!(session.events().count_kind(EventKind::InstructionRemoved), 0);
    assert_eq!(session.events().count_kind(EventKind::PassCompleted), 1);
    Ok(())
}

#[test]
fn test_shape_and_resolution_errors() -> Result<()> {
    let session = vault_session();
    let instrument = global(&session, "instrument");

    assert_eq!(
        instrument.invoke("beforeCall", &[DynamicValue::Null])?,
        Some(DynamicValue::Bool(false))
    );
    assert!(matches!(
        instrument.invoke("replaceConstant", &[object(vec![("with", DynamicValue::from(1))])]),
        Err(Error::NotCallable { .. })
    ));
    instrument.invoke("modifyInstruction", &[object(vec![("modify", returning("noop", DynamicValue::Null))])])?;

    for reference in [
        DynamicValue::from("com/example/Vault.missing"),
        DynamicValue::from("com/example/Nope.open"),
        DynamicValue::from("com/example/Vault.hook"),
        DynamicValue::from("noseparator"),
    ] {
        assert_eq!(instrument.invoke("apply", &[reference])?, Some(DynamicValue::from(0)));
    }
    assert_eq!(session.events().count_kind(EventKind::ResolutionFailed), 4);

    instrument.invoke("clearRules", &[])?;
    assert_eq!(instrument.invoke("getRuleCount", &[])?, Some(DynamicValue::from(0)));
    Ok(())
}

#[test]
fn test_pattern_matching() {
    use irhook::bridge::matches_target;

    assert!(matches_target("foo/Bar.baz", Some("*baz")));
    assert!(matches_target("foo/Bar.baz", Some("foo/*")));
    assert!(matches_target("foo/Bar.baz", Some("*oo/Ba*")));
    assert!(!matches_target("foo/Bar.baz", Some("qux")));
    assert!(matches_target("foo/Bar.baz", Some("foo/Bar.baz")));
    assert!(matches_target("foo/Bar.baz", Some("foo/Bar\\.ba.")));
    assert!(matches_target("foo/Bar.baz", None));
}
