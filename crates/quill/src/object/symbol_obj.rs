// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Methods on `Symbol` values themselves (as opposed to `Symbol` the
//! interning mechanism in [`crate::symbol`]).

use lazy_static::lazy_static;

use super::{build_table, check_arity, Invoker, MethodTable, Object};
use crate::error::Result;

fn m_to_s(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_s", args, 0, Some(0))?;
    Ok(Object::string(recv.to_display_string()))
}

fn m_to_sym(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_sym", args, 0, Some(0))?;
    Ok(recv.clone())
}

lazy_static! {
    static ref TABLE: MethodTable = build_table(
        "Symbol",
        &[("to_s", m_to_s as super::NativeMethod), ("to_sym", m_to_sym), ("id2name", m_to_s)],
    );
}

pub(super) fn table() -> &'static MethodTable {
    &TABLE
}
