// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! # Quill
//!
//! A Ruby-inspired embedded expression language for server-side HTML
//! templates: a lexer, a precedence-climbing parser, an AST, and a
//! tree-walking evaluator with dynamic, method-table-based dispatch over a
//! small set of built-in types (`Nil`, `Boolean`, `Number`, `String`,
//! `HtmlSafeString`, `Symbol`, `Array`, `Hash`, `Range`, `Regexp`, `Proc`).
//!
//! Quill does not own a template's surrounding markup or its tokenizer —
//! hosts feed it one expression fragment at a time (an attribute value, an
//! interpolation body, a control-flow condition) alongside a
//! [`object::ViewModel`] implementation supplying `self`, `@attribute`
//! lookups, and constants. The crate's job ends at producing an [`object::Object`]
//! result; escaping that result for HTML output is the host's call via
//! [`html::html_escape`].
//!
//! ## Quick start
//!
//! ```
//! use std::rc::Rc;
//! use quill::object::{MethodTable, Object, ViewModel};
//! use quill::parser::{parse_expression, GlobalFunctions, LocalVarNames};
//! use quill::scope::Scope;
//!
//! #[derive(Debug)]
//! struct Greeter;
//!
//! impl ViewModel for Greeter {
//!     fn self_object(&self) -> Object {
//!         Object::ViewModel(Rc::new(Greeter))
//!     }
//!     fn get_attr(&self, _name: quill::symbol::Symbol) -> quill::error::Result<Object> {
//!         Ok(Object::string("World"))
//!     }
//!     fn get_constant(&self, _name: quill::symbol::Symbol) -> quill::error::Result<Object> {
//!         Ok(Object::Nil)
//!     }
//!     fn method_table(&self) -> &MethodTable {
//!         use lazy_static::lazy_static;
//!         lazy_static! {
//!             static ref TABLE: MethodTable = MethodTable::empty("Greeter");
//!         }
//!         &TABLE
//!     }
//! }
//!
//! let expr = parse_expression("\"Hello, #{@name}!\"", &LocalVarNames::new(), &GlobalFunctions::new()).unwrap();
//! let scope = Scope::root(Rc::new(Greeter));
//! let result = quill::evaluator::eval(&expr, &scope).unwrap();
//! assert_eq!(result.to_display_string(), "Hello, World!");
//! ```

/// Abstract syntax tree for the expression language.
pub mod ast;
/// Error types shared by the lexer, parser, and evaluator.
pub mod error;
/// The tree-walking evaluator.
pub mod evaluator;
/// The HTML-safety contract (`HtmlSafeString`, escaping).
pub mod html;
/// Token scanner.
pub mod lexer;
/// The polymorphic value type and dynamic dispatch machinery.
pub mod object;
/// Precedence-climbing expression parser.
pub mod parser;
/// The chained variable environment threaded through evaluation.
pub mod scope;
/// Interned identifier handles.
pub mod symbol;

pub use error::{ErrorKind, Result, ScriptError};
pub use evaluator::eval;
pub use object::{Invoker, Object, ViewModel};
pub use parser::{parse_expression, GlobalFunctions, LocalVarNames};
pub use scope::Scope;
