// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `ViewModel`: the host-supplied contract that gives a render its `self`,
//! `@attribute` lookups, and constant lookups.

use lazy_static::lazy_static;
use std::fmt;

use super::{build_table, MethodTable, Object};
use crate::error::Result;
use crate::symbol::Symbol;

/// Implemented by the host application's per-render context object. The
/// core never constructs one; it only calls through this trait.
pub trait ViewModel: fmt::Debug {
    /// The `Object` representing `self` for method dispatch — typically
    /// `Object::ViewModel(Rc::clone(...))` wrapping the same instance.
    fn self_object(&self) -> Object;

    /// Resolves `@name`. Fails with a type error (via the caller) if the
    /// view model has no such attribute.
    fn get_attr(&self, name: Symbol) -> Result<Object>;

    /// Resolves a bare capitalized identifier or `lhs::Name` navigation.
    fn get_constant(&self, name: Symbol) -> Result<Object>;

    /// The method table backing zero-arg implicit self-calls and any
    /// other named calls dispatched on this view model.
    fn method_table(&self) -> &MethodTable;

    /// Type name surfaced in `no-method`/`type-error` messages. Defaults to
    /// a generic label; hosts with multiple view-model shapes should
    /// override this.
    fn type_name(&self) -> &'static str {
        "ViewModel"
    }

    /// Display form used by `Object::to_display_string`. Defaults to the
    /// type name; hosts rarely need to render a view model directly.
    fn to_display_string(&self) -> String {
        self.type_name().to_string()
    }

    /// Debug form used by `Object::inspect`.
    fn inspect(&self) -> String {
        format!("#<{}>", self.type_name())
    }
}

lazy_static! {
    static ref EMPTY_TABLE: MethodTable = build_table("ViewModel", &[]);
}

/// Returned by `Object::method_table()` for the `ViewModel` variant when no
/// specific instance is at hand (the variant's actual dispatch always goes
/// through the trait's own `method_table()` instead — see
/// `Object::lookup_method`/`Object::dispatch_table_id`).
pub(super) fn fallback_table() -> &'static MethodTable {
    &EMPTY_TABLE
}
