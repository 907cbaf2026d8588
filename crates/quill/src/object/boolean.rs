// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `Boolean`: the two process-wide `true`/`false` singletons.

use lazy_static::lazy_static;

use super::{build_table, check_arity, Invoker, MethodTable, Object};
use crate::error::Result;

fn m_to_s(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_s", args, 0, Some(0))?;
    Ok(Object::string(recv.to_display_string()))
}

fn m_not(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("!", args, 0, Some(0))?;
    Ok(Object::Boolean(!recv.is_true()))
}

lazy_static! {
    static ref TABLE: MethodTable = build_table(
        "Boolean",
        &[("to_s", m_to_s as super::NativeMethod), ("!", m_not)],
    );
}

pub(super) fn table() -> &'static MethodTable {
    &TABLE
}
