// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `Nil`: the single process-wide nil value.

use lazy_static::lazy_static;

use super::{build_table, check_arity, Invoker, MethodTable, Object};
use crate::error::Result;

fn m_to_s(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_s", args, 0, Some(0))?;
    Ok(Object::string(recv.to_display_string()))
}

fn m_nil(_recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("nil?", args, 0, Some(0))?;
    Ok(Object::Boolean(true))
}

fn m_to_a(_recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_a", args, 0, Some(0))?;
    Ok(Object::array(vec![]))
}

lazy_static! {
    static ref TABLE: MethodTable = build_table(
        "Nil",
        &[
            ("to_s", m_to_s as super::NativeMethod),
            ("nil?", m_nil),
            ("to_a", m_to_a),
        ],
    );
}

pub(super) fn table() -> &'static MethodTable {
    &TABLE
}
