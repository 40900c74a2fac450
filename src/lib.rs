// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # irhook
//!
//! Script-facing instrumentation for a JVM bytecode workbench. User scripts
//! register callbacks that inspect and rewrite the SSA IR and the decompiled
//! syntax trees of methods, declare instrumentation rules, and delete
//! annotations from class files.
//!
//! ## Features
//!
//! - **🧩 Uniform wrappers** - IR and syntax-tree nodes appear to scripts as plain objects with a `kind` tag, variant fields and traversal methods
//! - **🔁 Kind-keyed dispatch** - handlers per instruction or node kind, with an optional predicate
//! - **✂️ Keep / remove / replace** - one protocol for every handler result
//! - **🎯 Declarative rules** - `replaceCall`, `replaceConstant`, `removeInstruction` and friends, with glob targets
//! - **🏷️ Annotation deletion** - first-`null`-wins handlers over declared annotations
//! - **📜 Event log** - every registration, mutation and failure is recorded and forwarded to [`log`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use irhook::prelude::*;
//!
//! let mut class = ClassFile::new("com/example/Secrets");
//! let mut load = MethodEntry::new(MethodAccessFlags::PUBLIC, "load", "()V");
//! load.attributes.push(Attribute::Code { max_stack: 1, max_locals: 1, code: vec![0xb1] });
//! class.methods.push(load);
//!
//! // A real host plugs in its SSA lifter and decompiler here.
//! let lifter = (
//!     |_: &ConstantPool, m: &MethodEntry| {
//!         let block = IrBlock::with_instructions(0, vec![
//!             IrInstruction::ConstantLoad {
//!                 dest: VirtualRegister::new(0, "v0"),
//!                 value: Constant::String("secret".into()),
//!             },
//!             IrInstruction::Return { value: None },
//!         ]);
//!         Some(IrMethod::new(m.name.clone(), m.descriptor.clone(), vec![block]))
//!     },
//!     |_: &ClassFile, _: &MethodEntry| -> Option<AstTree> { None },
//! );
//!
//! let session = ScriptSession::new(std::iter::once(class).collect(), lifter);
//! session.instrument().replace_constant(
//!     None,
//!     ScriptFunction::new("redact", |_| Ok(Some(DynamicValue::from("REDACTED")))),
//! );
//! let count = session.instrument().apply(&DynamicValue::from("com/example/Secrets.load()V"));
//! assert_eq!(count, 1);
//! println!("{}", session.events().summary());
//! ```
//!
//! Script hosts bind [`bridge::ScriptSession::globals`] (`ir`, `ast`,
//! `instrument`, `annotations`) into their interpreter and convert between
//! their own values and [`DynamicValue`].
//!
//! ## Architecture
//!
//! - [`value`] - The dynamic value model shared with the script interpreter
//! - [`ir`] - The SSA view the IR engines rewrite
//! - [`ast`] - Arena syntax trees with parent links and an editor
//! - [`model`] - The class-file subset needed for resolution and annotations
//! - [`lift`] - The [`lift::Lifter`] boundary and the per-session cache
//! - [`bridge`] - Wrappers, dispatch engines, rules, annotations and the session
//! - [`events`] - Event log and sinks
//! - [`config`] - [`BridgeConfig`]
//!
//! ## Error Handling
//!
//! Script-facing entry points never fail the script for recoverable
//! problems: an unknown method, a failed lift or a throwing callback becomes a
//! zero count (or `false`, or `null`) plus an event in the log. The
//! exception is registration with something that is not a function, which
//! returns [`Error::NotCallable`] so the host can raise it as a script error.
//!
//! ```rust,no_run
//! use irhook::{prelude::*, Error};
//!
//! # fn check(instrument: &DynamicValue) {
//! match instrument.invoke("replaceCall", &[DynamicValue::from(42)]) {
//!     Ok(_) => {}
//!     Err(Error::NotCallable { function, argument }) => println!("{function}: {argument} is not a function"),
//!     Err(e) => println!("script error: {e}"),
//! }
//! # }
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use irhook::prelude::*;
///
/// let log = EventLog::new();
/// let value = DynamicValue::from("text");
/// assert_eq!(value.type_name(), "string");
/// assert!(log.is_empty());
/// ```
pub mod prelude;

pub mod ast;
pub mod bridge;
pub mod config;
pub mod events;
pub mod ir;
pub mod lift;
pub mod model;
pub mod value;

/// `irhook` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `irhook` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

pub use bridge::ScriptSession;
pub use config::BridgeConfig;
pub use value::DynamicValue;
