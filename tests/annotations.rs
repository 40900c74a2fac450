//! Integration tests for the `annotations` script object.

mod common;

use std::{cell::RefCell, rc::Rc};

use common::{global, returning, vault_class, vault_lifter, vault_session, VAULT};
use irhook::{prelude::*, Result};

fn named(name: &'static str) -> DynamicValue {
    DynamicValue::function(format!("is{name}"), move |args| {
        Ok(Some((arg(args, 0).get_string("simpleName").as_deref() == Some(name)).into()))
    })
}

fn counts(session: &ScriptSession) -> (usize, usize) {
    let project = session.context().project();
    let class = project.get(VAULT).expect("fixture class");
    (class.annotation_count(), class.methods[0].annotation_count())
}

#[test]
fn test_remove_deprecated_everywhere() -> Result<()> {
    let session = vault_session();
    let annotations = global(&session, "annotations");
    for target in ["onClassAnnotation", "onMethodAnnotation"] {
        annotations.invoke(target, &[named("Deprecated"), returning("drop", DynamicValue::Null)])?;
    }
    assert_eq!(annotations.invoke("hasHandlers", &[])?, Some(DynamicValue::Bool(true)));

    assert_eq!(annotations.invoke("apply", &[DynamicValue::from(VAULT)])?, Some(DynamicValue::from(2)));
    assert_eq!(counts(&session), (1, 1));

    let messages = session.events().messages();
    assert!(messages.contains(&format!("Removed annotation @Deprecated from {VAULT}")));
    assert!(messages.contains(&"Removed annotation @Deprecated from open".to_string()));
    assert!(messages.contains(&format!("Removed 2 annotations from {VAULT}")));

    // Nothing left to remove; dotted names resolve too.
    assert_eq!(
        annotations.invoke("apply", &[DynamicValue::from("com.example.Vault")])?,
        Some(DynamicValue::from(0))
    );
    Ok(())
}

#[test]
fn test_first_removal_wins() -> Result<()> {
    let session = vault_session();
    let annotations = global(&session, "annotations");
    let calls = Rc::new(RefCell::new(Vec::new()));

    let first = {
        let calls = calls.clone();
        DynamicValue::function("first", move |args| {
            calls.borrow_mut().push(format!("first:{}", arg(args, 0).get_string("name").unwrap_or_default()));
            Ok(Some(DynamicValue::Null))
        })
    };
    let second = {
        let calls = calls.clone();
        DynamicValue::function("second", move |_| {
            calls.borrow_mut().push("second".to_string());
            Ok(Some(DynamicValue::Null))
        })
    };
    annotations.invoke("onMethodAnnotation", &[first])?;
    annotations.invoke("onMethodAnnotation", &[second])?;

    assert_eq!(annotations.invoke("apply", &[DynamicValue::from(VAULT)])?, Some(DynamicValue::from(2)));
    assert_eq!(*calls.borrow(), ["first:Obfuscated", "first:Deprecated"]);
    assert_eq!(counts(&session), (2, 0));
    Ok(())
}

#[test]
fn test_non_null_results_pass_the_annotation_on() -> Result<()> {
    let session = vault_session();
    let annotations = global(&session, "annotations");
    let seen = Rc::new(RefCell::new(Vec::new()));

    let observer = {
        let seen = seen.clone();
        DynamicValue::function("observe", move |args| {
            let annotation = arg(args, 0);
            seen.borrow_mut().push((
                annotation.get_string("type").unwrap_or_default(),
                annotation.get_string("target").unwrap_or_default(),
                annotation.get("values").and_then(|v| v.get_string("value")),
            ));
            Ok(Some(DynamicValue::Bool(true)))
        })
    };
    annotations.invoke("onClassAnnotation", &[observer])?;
    annotations.invoke("onClassAnnotation", &[named("Generated"), returning("drop", DynamicValue::Null)])?;

    assert_eq!(annotations.invoke("apply", &[DynamicValue::from(VAULT)])?, Some(DynamicValue::from(1)));
    assert_eq!(
        *seen.borrow(),
        [
            ("Ljava/lang/Deprecated;".to_string(), VAULT.to_string(), None),
            ("Ljavax/annotation/Generated;".to_string(), VAULT.to_string(), Some("tool".to_string())),
        ]
    );
    assert_eq!(counts(&session), (1, 2));
    Ok(())
}

#[test]
fn test_invisible_field_annotations() -> Result<()> {
    let mut class = vault_class();
    let descriptor = class.constant_pool.add_utf8("Lcom/example/Secret;");
    let mut key = FieldEntry::new(FieldAccessFlags::PRIVATE, "key", "Ljava/lang/String;");
    key.attributes
        .push(Attribute::RuntimeInvisibleAnnotations(vec![Annotation::new(descriptor)]));
    class.fields.push(key);
    let session = ScriptSession::new(std::iter::once(class).collect(), vault_lifter());

    let annotations = global(&session, "annotations");
    annotations.invoke("onFieldAnnotation", &[returning("drop", DynamicValue::Null)])?;
    assert_eq!(annotations.invoke("apply", &[DynamicValue::from(VAULT)])?, Some(DynamicValue::from(1)));

    let project = session.context().project();
    let class = project.get(VAULT).expect("fixture class");
    assert_eq!(class.fields[0].annotation_count(), 0);
    // Other targets have no handlers and keep their annotations.
    assert_eq!(class.annotation_count(), 2);
    Ok(())
}

#[test]
fn test_failing_handler_and_bad_references() -> Result<()> {
    let session = vault_session();
    let annotations = global(&session, "annotations");
    annotations.invoke(
        "onClassAnnotation",
        &[DynamicValue::function("boom", |_| Err(Error::Shape("thrown".into())))],
    )?;

    assert_eq!(annotations.invoke("apply", &[DynamicValue::from(VAULT)])?, Some(DynamicValue::from(0)));
    assert_eq!(session.events().count_kind(EventKind::CallbackFailed), 2);
    assert_eq!(counts(&session), (2, 2));

    assert_eq!(
        annotations.invoke("apply", &[DynamicValue::from("com/example/Missing")])?,
        Some(DynamicValue::from(0))
    );
    assert_eq!(annotations.invoke("apply", &[DynamicValue::from(7)])?, Some(DynamicValue::from(0)));
    assert_eq!(session.events().count_kind(EventKind::ResolutionFailed), 2);

    assert!(annotations.invoke("onMethodAnnotation", &[DynamicValue::from("nope")]).is_err());
    annotations.invoke("clearHandlers", &[])?;
    assert_eq!(annotations.invoke("hasHandlers", &[])?, Some(DynamicValue::Bool(false)));
    Ok(())
}
