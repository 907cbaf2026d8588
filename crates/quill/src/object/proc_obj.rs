// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `Proc`/`Block`: a closure capturing a scope, parameter names, and a body
//! expression. Evaluating a `Block` AST node produces one of these; the
//! evaluator (not this module) knows how to run the body, reached here only
//! through the [`super::Invoker`] indirection.

use std::rc::Rc;

use lazy_static::lazy_static;

use super::{build_table, check_arity, Invoker, MethodTable, Object};
use crate::ast::Expr;
use crate::error::Result;
use crate::scope::Scope;
use crate::symbol::Symbol;

/// Backing store for [`Object::Proc`].
#[derive(Debug)]
pub struct ProcData {
    /// The scope active where the block literal was evaluated.
    pub captured_scope: Rc<Scope>,
    /// Parameter names, bound positionally on invocation.
    pub params: Vec<Symbol>,
    /// The block body, evaluated against a child of `captured_scope`.
    pub body: Rc<Expr>,
}

fn m_call(recv: &Object, args: &[Object], inv: &dyn Invoker) -> Result<Object> {
    inv.call_block(recv, args)
}

fn m_arity(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("arity", args, 0, Some(0))?;
    match recv {
        Object::Proc(p) => Ok(Object::Number(p.params.len() as f64)),
        _ => unreachable!(),
    }
}

lazy_static! {
    static ref TABLE: MethodTable = build_table(
        "Proc",
        &[
            ("call", m_call as super::NativeMethod),
            ("()", m_call),
            ("[]", m_call),
            ("arity", m_arity),
        ],
    );
}

pub(super) fn table() -> &'static MethodTable {
    &TABLE
}
