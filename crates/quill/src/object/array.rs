// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `Array`: an ordered, mutable sequence of [`Object`]s.

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use lazy_static::lazy_static;

use crate::error::{Result, ScriptError};
use crate::symbol::Symbol;

use super::{build_table, check_arity, expect_number, Invoker, MethodTable, Object};

/// Backing store for [`Object::Array`].
#[derive(Debug, Default)]
pub struct ArrayData(Vec<Object>);

impl From<Vec<Object>> for ArrayData {
    fn from(v: Vec<Object>) -> Self {
        ArrayData(v)
    }
}

impl Deref for ArrayData {
    type Target = Vec<Object>;
    fn deref(&self) -> &Vec<Object> {
        &self.0
    }
}

impl DerefMut for ArrayData {
    fn deref_mut(&mut self) -> &mut Vec<Object> {
        &mut self.0
    }
}

/// Resolves a 0-based-or-negative-from-end index against `len`, returning
/// `None` when out of range.
fn resolve_index(idx: f64, len: usize) -> Option<usize> {
    let idx = idx.trunc() as i64;
    let idx = if idx < 0 { idx + len as i64 } else { idx };
    if idx < 0 || idx as usize >= len {
        None
    } else {
        Some(idx as usize)
    }
}

pub(super) fn el_ref(data: &Rc<RefCell<ArrayData>>, args: &[Object]) -> Result<Object> {
    let items = data.borrow();
    match args {
        [Object::Number(n)] => Ok(resolve_index(*n, items.len())
            .map(|i| items[i].clone())
            .unwrap_or(Object::Nil)),
        [Object::Number(start), Object::Number(len)] => {
            let start_idx = resolve_index(*start, items.len().max(1)).unwrap_or(items.len());
            let take = (*len).max(0.0).trunc() as usize;
            Ok(Object::array(
                items.iter().skip(start_idx).take(take).cloned().collect(),
            ))
        }
        [Object::Range(range)] => {
            let (start, end) = range.resolve_span(items.len())?;
            Ok(Object::array(items[start..end].to_vec()))
        }
        _ => Err(ScriptError::ArgumentType {
            method: "[]".to_string(),
            message: "expected an index, (start, length), or Range".to_string(),
        }),
    }
}

fn flatten_into(items: &[Object], level: Option<i64>, out: &mut Vec<Object>) {
    for item in items {
        match item {
            Object::Array(inner) if level.map_or(true, |l| l > 0) => {
                flatten_into(&inner.borrow(), level.map(|l| l - 1), out);
            }
            other => out.push(other.clone()),
        }
    }
}

macro_rules! array_self {
    ($obj:expr) => {
        match $obj {
            Object::Array(a) => a,
            _ => unreachable!("array method invoked on non-array receiver"),
        }
    };
}

fn m_size(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("size", args, 0, Some(0))?;
    Ok(Object::Number(array_self!(recv).borrow().len() as f64))
}

fn m_empty(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("empty?", args, 0, Some(0))?;
    Ok(Object::Boolean(array_self!(recv).borrow().is_empty()))
}

fn m_push(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("push", args, 1, None)?;
    let data = array_self!(recv);
    data.borrow_mut().extend(args.iter().cloned());
    Ok(recv.clone())
}

fn m_element_ref(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("[]", args, 1, Some(2))?;
    el_ref(array_self!(recv), args)
}

fn m_element_set(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("[]=", args, 2, Some(2))?;
    let idx = expect_number("[]=", &args[0])?;
    let data = array_self!(recv);
    let mut items = data.borrow_mut();
    let len = items.len();
    let idx = idx.trunc() as i64;
    let idx = if idx < 0 { idx + len as i64 } else { idx };
    if idx < 0 {
        return Err(ScriptError::InvalidArgument("negative index out of range".to_string()));
    }
    let idx = idx as usize;
    if idx >= items.len() {
        items.resize(idx + 1, Object::Nil);
    }
    items[idx] = args[1].clone();
    Ok(args[1].clone())
}

fn m_each(recv: &Object, args: &[Object], inv: &dyn Invoker) -> Result<Object> {
    check_arity("each", args, 1, Some(1))?;
    let items = array_self!(recv).borrow().clone();
    for item in items.iter() {
        inv.call_block(&args[0], std::slice::from_ref(item))?;
    }
    Ok(recv.clone())
}

fn m_map(recv: &Object, args: &[Object], inv: &dyn Invoker) -> Result<Object> {
    check_arity("map", args, 1, Some(1))?;
    let items = array_self!(recv).borrow().clone();
    let mut out = Vec::with_capacity(items.len());
    for item in items.iter() {
        out.push(inv.call_block(&args[0], std::slice::from_ref(item))?);
    }
    Ok(Object::array(out))
}

fn m_select(recv: &Object, args: &[Object], inv: &dyn Invoker) -> Result<Object> {
    check_arity("select", args, 1, Some(1))?;
    let items = array_self!(recv).borrow().clone();
    let mut out = Vec::new();
    for item in items.iter() {
        if inv.call_block(&args[0], std::slice::from_ref(item))?.is_true() {
            out.push(item.clone());
        }
    }
    Ok(Object::array(out))
}

fn m_reject(recv: &Object, args: &[Object], inv: &dyn Invoker) -> Result<Object> {
    check_arity("reject", args, 1, Some(1))?;
    let items = array_self!(recv).borrow().clone();
    let mut out = Vec::new();
    for item in items.iter() {
        if !inv.call_block(&args[0], std::slice::from_ref(item))?.is_true() {
            out.push(item.clone());
        }
    }
    Ok(Object::array(out))
}

fn m_flatten(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("flatten", args, 0, Some(1))?;
    let level = match args.first() {
        Some(n) => Some(expect_number("flatten", n)?.trunc() as i64),
        None => None,
    };
    let items = array_self!(recv).borrow().clone();
    let mut out = Vec::new();
    flatten_into(&items, level, &mut out);
    Ok(Object::array(out))
}

fn m_sort(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("sort", args, 0, Some(0))?;
    let mut items = array_self!(recv).borrow().clone().0;
    let mut err = None;
    items.sort_by(|a, b| match a.cmp_value(b) {
        Ok(ord) => ord,
        Err(e) => {
            err = Some(e);
            std::cmp::Ordering::Equal
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    Ok(Object::array(items))
}

fn m_include(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("include?", args, 1, Some(1))?;
    let found = array_self!(recv).borrow().iter().any(|x| x.eq_value(&args[0]));
    Ok(Object::Boolean(found))
}

fn m_index(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("index", args, 1, Some(1))?;
    let pos = array_self!(recv).borrow().iter().position(|x| x.eq_value(&args[0]));
    Ok(pos.map(|i| Object::Number(i as f64)).unwrap_or(Object::Nil))
}

fn m_join(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("join", args, 0, Some(1))?;
    let sep = match args.first() {
        Some(s) => super::expect_str("join", s)?.to_string(),
        None => String::new(),
    };
    let items = array_self!(recv).borrow();
    let joined = items
        .iter()
        .map(Object::to_display_string)
        .collect::<Vec<_>>()
        .join(&sep);
    Ok(Object::string(joined))
}

fn m_first(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("first", args, 0, Some(0))?;
    Ok(array_self!(recv).borrow().first().cloned().unwrap_or(Object::Nil))
}

fn m_last(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("last", args, 0, Some(0))?;
    Ok(array_self!(recv).borrow().last().cloned().unwrap_or(Object::Nil))
}

fn m_reverse(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("reverse", args, 0, Some(0))?;
    let mut items = array_self!(recv).borrow().clone().0;
    items.reverse();
    Ok(Object::array(items))
}

fn m_uniq(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("uniq", args, 0, Some(0))?;
    let items = array_self!(recv).borrow().clone();
    let mut out: Vec<Object> = Vec::new();
    for item in items.iter() {
        if !out.iter().any(|x| x.eq_value(item)) {
            out.push(item.clone());
        }
    }
    Ok(Object::array(out))
}

fn m_to_a(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_a", args, 0, Some(0))?;
    Ok(Object::array(array_self!(recv).borrow().clone().0))
}

impl Clone for ArrayData {
    fn clone(&self) -> Self {
        ArrayData(self.0.clone())
    }
}

lazy_static! {
    static ref TABLE: MethodTable = build_table(
        "Array",
        &[
            ("size", m_size as super::NativeMethod),
            ("length", m_size),
            ("empty?", m_empty),
            ("push", m_push),
            ("<<", m_push),
            ("[]", m_element_ref),
            ("[]=", m_element_set),
            ("each", m_each),
            ("map", m_map),
            ("collect", m_map),
            ("select", m_select),
            ("filter", m_select),
            ("reject", m_reject),
            ("flatten", m_flatten),
            ("sort", m_sort),
            ("include?", m_include),
            ("index", m_index),
            ("join", m_join),
            ("first", m_first),
            ("last", m_last),
            ("reverse", m_reverse),
            ("uniq", m_uniq),
            ("to_a", m_to_a),
        ],
    );
}

pub(super) fn table() -> &'static MethodTable {
    &TABLE
}

#[allow(dead_code)]
fn unused_symbol_guard(_s: Symbol) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_each_sees_new_elements() {
        let arr = Object::array(vec![Object::Number(1.0)]);
        m_push(&arr, &[Object::Number(2.0)], &crate::evaluator::NullInvoker).unwrap();
        if let Object::Array(data) = &arr {
            assert_eq!(data.borrow().len(), 2);
        } else {
            panic!("expected array");
        }
    }

    #[test]
    fn reverse_is_involutive() {
        let arr = Object::array(vec![Object::Number(1.0), Object::Number(2.0), Object::Number(3.0)]);
        let once = m_reverse(&arr, &[], &crate::evaluator::NullInvoker).unwrap();
        let twice = m_reverse(&once, &[], &crate::evaluator::NullInvoker).unwrap();
        assert!(twice.eq_value(&arr));
    }
}
