// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The polymorphic value type and its method-table dispatch machinery.
//!
//! [`Object`] is a tagged variant over the concrete types the language
//! supports (nil, booleans, numbers, strings, arrays, hashes, ranges,
//! regexes, procs, symbols, and host-supplied view models). Containers are
//! `Rc`-shared so values may have any number of live references; the object
//! graph is a DAG (spec'd design note), so no cycle collector is needed.
//!
//! Named method calls (`.foo(args)`) never match on `Object` directly.
//! Instead every concrete type exposes a [`MethodTable`]: a name → native
//! handler map, optionally chained to a parent table. This mirrors the
//! source language's virtual dispatch without needing trait objects or
//! inheritance — see the module-level docs in each `object::*` submodule for
//! the concrete tables.

mod array;
mod boolean;
mod hash_obj;
mod html_safe;
mod nil;
mod number;
mod proc_obj;
mod range;
mod regexp;
mod string_obj;
mod symbol_obj;
mod view_model;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{Result, ScriptError};
use crate::symbol::Symbol;

pub use array::ArrayData;
pub use hash_obj::HashData;
pub use proc_obj::ProcData;
pub use range::RangeData;
pub use regexp::RegexpData;
pub use view_model::ViewModel;

/// A native method handler: receiver, positional arguments (the last of
/// which may be a `Proc` if the call site supplied a trailing block), and a
/// callback for invoking that block without the object model depending on
/// the evaluator.
pub type NativeMethod = fn(&Object, &[Object], &dyn Invoker) -> Result<Object>;

/// Breaks the dependency cycle between the object model (which needs to
/// invoke blocks from methods like `Array#each`) and the evaluator (which
/// owns the only code that knows how to run a `Proc`'s body).
pub trait Invoker {
    /// Invokes `block` (expected to be an `Object::Proc`) with `args`,
    /// binding parameters positionally per spec (extras ignored, missing
    /// bound to nil).
    fn call_block(&self, block: &Object, args: &[Object]) -> Result<Object>;
}

/// Identifies a [`MethodTable`] for the per-call-site dispatch cache. Two
/// tables compare equal iff they are the same table (by address), which
/// holds for the lifetime of the process for the built-in `'static` tables
/// and for the lifetime of a view-model instance for host-supplied tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodTableId(pub usize);

/// A per-type name → native-handler map, optionally chained to a parent
/// table so that, e.g., every type's table could in principle share common
/// entries (`to_s`, `inspect`) with a root table. None of the built-in
/// types currently need a parent; the field exists because the spec calls
/// out "method-table chaining" as part of the dispatch model.
pub struct MethodTable {
    name: &'static str,
    methods: HashMap<Symbol, NativeMethod>,
    parent: Option<&'static MethodTable>,
}

impl MethodTable {
    fn new(name: &'static str, entries: &[(&str, NativeMethod)]) -> Self {
        let mut methods = HashMap::with_capacity(entries.len());
        for (name, f) in entries {
            methods.insert(Symbol::intern(name), *f);
        }
        MethodTable { name, methods, parent: None }
    }

    /// Type name this table was built for, used in `no-method` messages.
    pub fn type_name(&self) -> &'static str {
        self.name
    }

    /// Looks up `name`, walking the parent chain on miss.
    pub fn lookup(&self, name: Symbol) -> Option<NativeMethod> {
        if let Some(m) = self.methods.get(&name) {
            return Some(*m);
        }
        self.parent.and_then(|p| p.lookup(name))
    }

    /// Returns whether this table (or a parent) defines `name`, without
    /// returning the handler — used by `respond_to?`-style checks.
    pub fn has(&self, name: Symbol) -> bool {
        self.lookup(name).is_some()
    }

    /// Stable identity for the dispatch cache.
    pub fn id(&self) -> MethodTableId {
        MethodTableId(self as *const MethodTable as usize)
    }

    /// Builds a table with no entries and no parent — used by host
    /// applications implementing [`ViewModel`] for a trivial view model, and
    /// by tests.
    pub fn empty(name: &'static str) -> MethodTable {
        MethodTable::new(name, &[])
    }
}

/// The single dynamically-typed value. Cloning an `Object` is cheap: scalar
/// variants are `Copy`-like, containers share their backing store via `Rc`.
#[derive(Clone)]
pub enum Object {
    /// The one-and-only nil value.
    Nil,
    /// `true` or `false`; both are process-wide singletons by construction.
    Boolean(bool),
    /// A 64-bit float. Integer-flavored methods truncate toward zero.
    Number(f64),
    /// A UTF-8 byte string, not safe to emit unescaped.
    Str(Rc<String>),
    /// A UTF-8 byte string explicitly marked as pre-escaped / safe to emit
    /// verbatim at a template output site.
    HtmlSafe(Rc<String>),
    /// An interned identifier used as a value (`:name`).
    Sym(Symbol),
    /// An ordered, mutable sequence of values.
    Array(Rc<RefCell<ArrayData>>),
    /// An insertion-ordered mapping with an optional default value.
    Hash(Rc<RefCell<HashData>>),
    /// A `begin..end` or `begin...end` range.
    Range(Rc<RangeData>),
    /// A compiled-lazily regular expression with option flags.
    Regexp(Rc<RegexpData>),
    /// A closure over a scope, its parameter names, and its body.
    Proc(Rc<ProcData>),
    /// A host-supplied object providing `self`, `@attr`, and constants.
    ViewModel(Rc<dyn ViewModel>),
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.inspect())
    }
}

impl Object {
    /// Convenience constructor for a [`Object::Number`].
    pub fn from_f64(n: f64) -> Object {
        Object::Number(n)
    }

    /// Convenience constructor for a [`Object::Str`].
    pub fn string(s: impl Into<String>) -> Object {
        Object::Str(Rc::new(s.into()))
    }

    /// Convenience constructor for a [`Object::HtmlSafe`].
    pub fn html_safe(s: impl Into<String>) -> Object {
        Object::HtmlSafe(Rc::new(s.into()))
    }

    /// Convenience constructor for a [`Object::Sym`].
    pub fn symbol(name: impl Into<String>) -> Object {
        Object::Sym(Symbol::intern(&name.into()))
    }

    /// Convenience constructor for a [`Object::Array`].
    pub fn array(items: Vec<Object>) -> Object {
        Object::Array(Rc::new(RefCell::new(ArrayData::from(items))))
    }

    /// Convenience constructor for an empty [`Object::Hash`].
    pub fn hash(entries: Vec<(Object, Object)>) -> Result<Object> {
        let mut data = HashData::new();
        for (k, v) in entries {
            data.insert(k, v)?;
        }
        Ok(Object::Hash(Rc::new(RefCell::new(data))))
    }

    /// The singleton `true`.
    pub fn true_() -> Object {
        Object::Boolean(true)
    }

    /// The singleton `false`.
    pub fn false_() -> Object {
        Object::Boolean(false)
    }

    /// Type name used in error messages and `no-method`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Nil => "Nil",
            Object::Boolean(_) => "Boolean",
            Object::Number(_) => "Number",
            Object::Str(_) => "String",
            Object::HtmlSafe(_) => "HtmlSafeString",
            Object::Sym(_) => "Symbol",
            Object::Array(_) => "Array",
            Object::Hash(_) => "Hash",
            Object::Range(_) => "Range",
            Object::Regexp(_) => "Regexp",
            Object::Proc(_) => "Proc",
            Object::ViewModel(vm) => vm.type_name(),
        }
    }

    /// Display form: no quotes for strings, empty for nil, decimal for numbers.
    pub fn to_display_string(&self) -> String {
        match self {
            Object::Nil => String::new(),
            Object::Boolean(b) => b.to_string(),
            Object::Number(n) => number::format_number(*n),
            Object::Str(s) => s.as_ref().clone(),
            Object::HtmlSafe(s) => s.as_ref().clone(),
            Object::Sym(sym) => sym.as_str(),
            Object::Array(a) => {
                let items = a.borrow();
                format!(
                    "[{}]",
                    items.iter().map(Object::inspect).collect::<Vec<_>>().join(", ")
                )
            }
            Object::Hash(h) => h.borrow().inspect(),
            Object::Range(r) => r.to_display_string(),
            Object::Regexp(r) => r.to_display_string(),
            Object::Proc(_) => "#<Proc>".to_string(),
            Object::ViewModel(vm) => vm.to_display_string(),
        }
    }

    /// Debug form: quoted/escaped for strings, `nil` for nil, a re-parseable
    /// literal whenever possible.
    pub fn inspect(&self) -> String {
        match self {
            Object::Nil => "nil".to_string(),
            Object::Boolean(b) => b.to_string(),
            Object::Number(n) => number::format_number(*n),
            Object::Str(s) => string_obj::inspect_str(s),
            Object::HtmlSafe(s) => string_obj::inspect_str(s),
            Object::Sym(sym) => format!(":{}", sym.as_str()),
            Object::Array(a) => {
                let items = a.borrow();
                format!(
                    "[{}]",
                    items.iter().map(Object::inspect).collect::<Vec<_>>().join(", ")
                )
            }
            Object::Hash(h) => h.borrow().inspect(),
            Object::Range(r) => r.inspect(),
            Object::Regexp(r) => r.inspect(),
            Object::Proc(_) => "#<Proc>".to_string(),
            Object::ViewModel(vm) => vm.inspect(),
        }
    }

    /// Only `nil` and `false` are falsy; everything else, including `0` and
    /// `""`, is truthy.
    pub fn is_true(&self) -> bool {
        !matches!(self, Object::Nil | Object::Boolean(false))
    }

    /// Value equality within a type; cross-type comparisons are false
    /// unless a specific pair is called out (none are, currently).
    pub fn eq_value(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Nil, Object::Nil) => true,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Number(a), Object::Number(b)) => a == b,
            (Object::Str(a), Object::Str(b)) => a == b,
            (Object::HtmlSafe(a), Object::HtmlSafe(b)) => a == b,
            (Object::Str(a), Object::HtmlSafe(b)) | (Object::HtmlSafe(b), Object::Str(a)) => a.as_str() == b.as_str(),
            (Object::Sym(a), Object::Sym(b)) => a == b,
            (Object::Array(a), Object::Array(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.eq_value(y))
            }
            (Object::Hash(a), Object::Hash(b)) => a.borrow().eq_value(&b.borrow()),
            (Object::Range(a), Object::Range(b)) => a.eq_value(b),
            (Object::Regexp(a), Object::Regexp(b)) => a.eq_value(b),
            _ => false,
        }
    }

    /// Three-way comparison within compatible types.
    pub fn cmp_value(&self, other: &Object) -> Result<std::cmp::Ordering> {
        match (self, other) {
            (Object::Number(a), Object::Number(b)) => {
                a.partial_cmp(b).ok_or_else(|| unorderable(self, other))
            }
            (Object::Str(a), Object::Str(b))
            | (Object::Str(a), Object::HtmlSafe(b))
            | (Object::HtmlSafe(a), Object::Str(b))
            | (Object::HtmlSafe(a), Object::HtmlSafe(b)) => Ok(a.as_bytes().cmp(b.as_bytes())),
            (Object::Sym(a), Object::Sym(b)) => Ok(a.as_str().cmp(&b.as_str())),
            (Object::Array(a), Object::Array(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.cmp_value(y)? {
                        std::cmp::Ordering::Equal => continue,
                        ord => return Ok(ord),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            _ => Err(unorderable(self, other)),
        }
    }

    /// A `u64` hash consistent with [`Object::eq_value`].
    pub fn hash_value(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        match self {
            Object::Nil => 0u8.hash(&mut hasher),
            Object::Boolean(b) => {
                1u8.hash(&mut hasher);
                b.hash(&mut hasher);
            }
            Object::Number(n) => {
                2u8.hash(&mut hasher);
                n.to_bits().hash(&mut hasher);
            }
            Object::Str(s) | Object::HtmlSafe(s) => {
                3u8.hash(&mut hasher);
                s.as_bytes().hash(&mut hasher);
            }
            Object::Sym(sym) => {
                4u8.hash(&mut hasher);
                sym.hash(&mut hasher);
            }
            Object::Array(a) => {
                5u8.hash(&mut hasher);
                for item in a.borrow().iter() {
                    item.hash_value().hash(&mut hasher);
                }
            }
            Object::Hash(h) => {
                6u8.hash(&mut hasher);
                h.borrow().hash_value().hash(&mut hasher);
            }
            Object::Range(r) => {
                7u8.hash(&mut hasher);
                r.hash_value().hash(&mut hasher);
            }
            Object::Regexp(r) => {
                8u8.hash(&mut hasher);
                r.source.hash(&mut hasher);
                r.options.hash(&mut hasher);
            }
            Object::Proc(p) => {
                9u8.hash(&mut hasher);
                (Rc::as_ptr(p) as usize).hash(&mut hasher);
            }
            Object::ViewModel(vm) => {
                10u8.hash(&mut hasher);
                (Rc::as_ptr(vm) as *const () as usize).hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    /// Returns this value's method table.
    pub fn method_table(&self) -> &'static MethodTable {
        match self {
            Object::Nil => nil::table(),
            Object::Boolean(_) => boolean::table(),
            Object::Number(_) => number::table(),
            Object::Str(_) => string_obj::table(),
            Object::HtmlSafe(_) => html_safe::table(),
            Object::Sym(_) => symbol_obj::table(),
            Object::Array(_) => array::table(),
            Object::Hash(_) => hash_obj::table(),
            Object::Range(_) => range::table(),
            Object::Regexp(_) => regexp::table(),
            Object::Proc(_) => proc_obj::table(),
            // ViewModel instances supply their own table; callers needing a
            // stable id for the dispatch cache should go through
            // `dispatch_table_id`, not this method, for that variant.
            Object::ViewModel(_) => view_model::fallback_table(),
        }
    }

    /// The table identity to key the dispatch cache on: a view model's own
    /// table for `ViewModel` values, [`Object::method_table`] otherwise.
    pub fn dispatch_table_id(&self) -> MethodTableId {
        match self {
            Object::ViewModel(vm) => vm.method_table().id(),
            other => other.method_table().id(),
        }
    }

    /// Looks up and returns the native handler for `name`, using the
    /// view model's own table when the receiver is a `ViewModel`.
    pub fn lookup_method(&self, name: Symbol) -> Option<NativeMethod> {
        match self {
            Object::ViewModel(vm) => vm.method_table().lookup(name),
            other => other.method_table().lookup(name),
        }
    }

    /// `@name` lookup. Only view models override this; every other type
    /// fails with a type error.
    pub fn get_attr(&self, name: Symbol) -> Result<Object> {
        match self {
            Object::ViewModel(vm) => vm.get_attr(name),
            _ => Err(ScriptError::TypeError(format!(
                "@{} has no meaning on a {}",
                name,
                self.type_name()
            ))),
        }
    }

    /// Constant lookup (`Foo`, `lhs::Foo`). Only view models override this.
    pub fn get_constant(&self, name: Symbol) -> Result<Object> {
        match self {
            Object::ViewModel(vm) => vm.get_constant(name),
            _ => Err(ScriptError::TypeError(format!(
                "{} has no constant {}",
                self.type_name(),
                name
            ))),
        }
    }

    /// `self[args...]`.
    pub fn el_ref(&self, args: &[Object]) -> Result<Object> {
        match self {
            Object::Array(a) => array::el_ref(a, args),
            Object::Hash(h) => hash_obj::el_ref(h, args),
            Object::Str(s) => string_obj::el_ref(s, args),
            Object::HtmlSafe(s) => string_obj::el_ref(s, args),
            _ => Err(ScriptError::NoMethod {
                receiver_type: self.type_name().to_string(),
                name: Symbol::intern("[]"),
            }),
        }
    }

    /// Resolves and invokes `name` on `self` with `args`, consulting
    /// `cache` first and updating it on a cold lookup.
    pub fn call_method(
        &self,
        name: Symbol,
        args: &[Object],
        invoker: &dyn Invoker,
        cache: &crate::ast::DispatchCache,
    ) -> Result<Object> {
        let table_id = self.dispatch_table_id();
        let method = match cache.get(table_id) {
            Some(m) => m,
            None => {
                let m = self.lookup_method(name).ok_or_else(|| ScriptError::NoMethod {
                    receiver_type: self.type_name().to_string(),
                    name,
                })?;
                cache.store(table_id, m);
                m
            }
        };
        method(self, args, invoker)
    }
}

fn unorderable(a: &Object, b: &Object) -> ScriptError {
    ScriptError::UnorderableTypes {
        lhs: a.type_name().to_string(),
        rhs: b.type_name().to_string(),
    }
}

/// Builds a one-level `MethodTable` with no parent — used by every concrete
/// type's `table()` constructor.
fn build_table(name: &'static str, entries: &[(&str, NativeMethod)]) -> MethodTable {
    MethodTable::new(name, entries)
}

/// Argument-count validation shared by every native method: fails with
/// **argument-count** unless `args.len()` is within `[min, max]` (`max =
/// None` means unbounded).
pub fn check_arity(method: &str, args: &[Object], min: usize, max: Option<usize>) -> Result<()> {
    let given = args.len();
    let ok = given >= min && max.map_or(true, |max| given <= max);
    if ok {
        return Ok(());
    }
    let expected = match max {
        Some(max) if max == min => min.to_string(),
        Some(max) => format!("{min}..{max}"),
        None => format!("{min}+"),
    };
    Err(ScriptError::ArgumentCount {
        method: method.to_string(),
        given,
        expected,
    })
}

/// Extracts a `&str` from a `String`/`HtmlSafeString` argument, failing with
/// **argument-type** otherwise.
pub fn expect_str<'a>(method: &str, obj: &'a Object) -> Result<&'a str> {
    match obj {
        Object::Str(s) => Ok(s.as_str()),
        Object::HtmlSafe(s) => Ok(s.as_str()),
        other => Err(ScriptError::ArgumentType {
            method: method.to_string(),
            message: format!("expected a String, got {}", other.type_name()),
        }),
    }
}

/// Extracts an `f64` from a `Number` argument, failing with
/// **argument-type** otherwise.
pub fn expect_number(method: &str, obj: &Object) -> Result<f64> {
    match obj {
        Object::Number(n) => Ok(*n),
        other => Err(ScriptError::ArgumentType {
            method: method.to_string(),
            message: format!("expected a Number, got {}", other.type_name()),
        }),
    }
}

/// Tiny helpers shared by the `#[cfg(test)]` modules scattered across the
/// `object::*` submodules and `crate::scope`'s tests — building a throwaway
/// method table for a fake `ViewModel` is otherwise repeated boilerplate.
#[cfg(test)]
pub mod test_support {
    use super::{build_table, MethodTable};

    /// An empty method table labeled `name`, for a test-only `ViewModel` stub.
    pub fn empty_table(name: &'static str) -> MethodTable {
        build_table(name, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec() {
        assert!(!Object::Nil.is_true());
        assert!(!Object::Boolean(false).is_true());
        assert!(Object::Boolean(true).is_true());
        assert!(Object::Number(0.0).is_true());
        assert!(Object::string("").is_true());
    }

    #[test]
    fn eq_implies_equal_hash() {
        let a = Object::string("hello");
        let b = Object::string("hello");
        assert!(a.eq_value(&b));
        assert_eq!(a.hash_value(), b.hash_value());
    }

    #[test]
    fn cross_type_numbers_are_unorderable() {
        let err = Object::Number(5.0).cmp_value(&Object::string("x")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnorderableTypes);
    }

    #[test]
    fn safe_and_unsafe_strings_compare_equal_by_content() {
        let safe = Object::html_safe("hi");
        let unsafe_ = Object::string("hi");
        assert!(safe.eq_value(&unsafe_));
    }
}
