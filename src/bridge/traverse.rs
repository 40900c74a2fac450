//! Search and traversal methods shared by IR and syntax-tree wrappers.

use std::rc::Rc;

use crate::{
    events::{EventKind, LogSink},
    value::{arg, DynamicValue, Properties, ScriptFunction},
};

/// A node positioned in its hierarchy, as seen by wrapper traversal.
pub(crate) trait Cursor: Clone + 'static {
    /// Returns true if `tag` names a kind this hierarchy can contain.
    fn knows_kind(tag: &str) -> bool;

    /// Returns true if this node is of kind `tag`.
    fn has_kind(&self, tag: &str) -> bool;

    /// Direct children in source order.
    fn children(&self) -> Vec<Self>;

    /// Enclosing nodes, nearest first.
    fn ancestors(&self) -> Vec<Self>;

    /// Wrapper object for this node.
    fn wrap(&self) -> DynamicValue;

    /// Where callback failures are reported.
    fn sink(&self) -> &Rc<dyn LogSink>;

    /// This node followed by every descendant, pre-order.
    fn preorder(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            let mut children = node.children();
            children.reverse();
            stack.extend(children);
            out.push(node);
        }
        out
    }
}

/// Runs a search predicate. Only a strict `true` matches; a failing
/// predicate is reported and counts as no match.
pub(crate) fn accepts(predicate: Option<&ScriptFunction>, wrapped: &DynamicValue, sink: &dyn LogSink) -> bool {
    let Some(predicate) = predicate else {
        return true;
    };
    match predicate.call(std::slice::from_ref(wrapped)) {
        Ok(result) => result.is_some_and(|r| r.is_true()),
        Err(e) => {
            sink.record(EventKind::CallbackFailed)
                .message(format!("Predicate error: {e}"));
            false
        }
    }
}

fn search<C: Cursor>(node: &C, args: &[DynamicValue], first_only: bool) -> Vec<DynamicValue> {
    let tag = arg(args, 0);
    let Some(tag) = tag.as_str().filter(|t| C::knows_kind(t)) else {
        return Vec::new();
    };
    let predicate = args.get(1).and_then(DynamicValue::as_function);

    let mut found = Vec::new();
    for candidate in node.preorder() {
        if !candidate.has_kind(tag) {
            continue;
        }
        let wrapped = candidate.wrap();
        if accepts(predicate, &wrapped, &**node.sink()) {
            found.push(wrapped);
            if first_only {
                break;
            }
        }
    }
    found
}

/// Adds `walk`, `findFirst`, `findAll`, `findAncestor` and `getChildren`.
pub(crate) fn install<C: Cursor>(props: &mut Properties, node: &C) {
    let this = node.clone();
    props.insert(
        "walk",
        DynamicValue::function("walk", move |args| {
            let Some(callback) = args.first().and_then(DynamicValue::as_function) else {
                return Ok(None);
            };
            for visited in this.preorder() {
                if let Err(e) = callback.call(&[visited.wrap()]) {
                    this.sink()
                        .record(EventKind::CallbackFailed)
                        .message(format!("Walk callback error: {e}"));
                }
            }
            Ok(None)
        }),
    );

    let this = node.clone();
    props.insert(
        "findFirst",
        DynamicValue::function("findFirst", move |args| {
            Ok(Some(search(&this, args, true).pop().unwrap_or_default()))
        }),
    );

    let this = node.clone();
    props.insert(
        "findAll",
        DynamicValue::function("findAll", move |args| {
            Ok(Some(DynamicValue::Array(search(&this, args, false))))
        }),
    );

    let this = node.clone();
    props.insert(
        "findAncestor",
        DynamicValue::function("findAncestor", move |args| {
            let tag = arg(args, 0);
            let found = tag
                .as_str()
                .filter(|t| C::knows_kind(t))
                .and_then(|t| this.ancestors().into_iter().find(|a| a.has_kind(t)));
            Ok(Some(found.map_or(DynamicValue::Null, |a| a.wrap())))
        }),
    );

    let this = node.clone();
    props.insert(
        "getChildren",
        DynamicValue::function("getChildren", move |_| {
            Ok(Some(DynamicValue::array(this.children().iter().map(|c| c.wrap()))))
        }),
    );
}
