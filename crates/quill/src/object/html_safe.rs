// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `HtmlSafeString`: textually identical to `String` and sharing its
//! method table — the only place the two types diverge is the `+` binary
//! operator, handled directly in `crate::evaluator` per the propagation
//! rule (safe + safe = safe, anything else = unsafe).

use super::{string_obj, MethodTable};

pub(super) fn table() -> &'static MethodTable {
    string_obj::table()
}
