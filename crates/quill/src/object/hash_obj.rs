// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `Hash`: an insertion-ordered mapping `Object → Object` with an optional
//! default value.
//!
//! Storage follows the bucketed-by-hash `IndexMap` pattern: the map key is
//! the `Object::hash_value()` of the entry key, and each bucket is a small
//! `Vec` of `(key, value)` pairs to resolve collisions by `eq_value`.
//! `IndexMap` preserves insertion order across the whole table, which the
//! spec requires for iteration (`keys`, `values`, `to_a`, `merge`).

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use lazy_static::lazy_static;

use crate::error::{Result, ScriptError};

use super::{build_table, check_arity, Invoker, MethodTable, Object};

/// Backing store for [`Object::Hash`].
#[derive(Debug, Default)]
pub struct HashData {
    buckets: IndexMap<u64, Vec<(Object, Object)>>,
    /// Returned by `fetch`/`[]` (not specified further by the core) when a
    /// key is missing and no default was passed to `fetch`. `None` means no
    /// default was configured, so `fetch` without one fails with
    /// **key-error** per spec.
    pub default: Option<Object>,
}

impl Clone for HashData {
    fn clone(&self) -> Self {
        HashData {
            buckets: self.buckets.clone(),
            default: self.default.clone(),
        }
    }
}

impl HashData {
    /// Creates a new, empty hash.
    pub fn new() -> Self {
        HashData::default()
    }

    /// Inserts or overwrites `key => value`, preserving `key`'s original
    /// insertion position if it already existed.
    pub fn insert(&mut self, key: Object, value: Object) -> Result<()> {
        let hash = key.hash_value();
        let bucket = self.buckets.entry(hash).or_default();
        for slot in bucket.iter_mut() {
            if slot.0.eq_value(&key) {
                slot.1 = value;
                return Ok(());
            }
        }
        bucket.push((key, value));
        Ok(())
    }

    /// Looks up `key`, returning `None` on a miss.
    pub fn get(&self, key: &Object) -> Option<&Object> {
        let hash = key.hash_value();
        self.buckets
            .get(&hash)?
            .iter()
            .find(|(k, _)| k.eq_value(key))
            .map(|(_, v)| v)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether the hash has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(Object, Object)> {
        self.buckets.values().flatten()
    }

    pub(super) fn eq_value(&self, other: &HashData) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|(k, v)| other.get(k).map_or(false, |ov| ov.eq_value(v)))
    }

    pub(super) fn hash_value(&self) -> u64 {
        // Order-independent so that two hashes built with the same entries
        // in different orders still hash equal (required since `eq_value`
        // also ignores order).
        self.iter().fold(0u64, |acc, (k, v)| acc ^ (k.hash_value().rotate_left(1) ^ v.hash_value()))
    }

    pub(super) fn inspect(&self) -> String {
        if self.is_empty() {
            return "{}".to_string();
        }
        let body = self
            .iter()
            .map(|(k, v)| format!("{} => {}", k.inspect(), v.inspect()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{body}}}")
    }
}

pub(super) fn el_ref(data: &Rc<RefCell<HashData>>, args: &[Object]) -> Result<Object> {
    if args.len() != 1 {
        return Err(ScriptError::ArgumentCount {
            method: "[]".to_string(),
            given: args.len(),
            expected: "1".to_string(),
        });
    }
    let data = data.borrow();
    Ok(data.get(&args[0]).cloned().or_else(|| data.default.clone()).unwrap_or(Object::Nil))
}

macro_rules! hash_self {
    ($obj:expr) => {
        match $obj {
            Object::Hash(h) => h,
            _ => unreachable!("hash method invoked on non-hash receiver"),
        }
    };
}

fn m_size(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("size", args, 0, Some(0))?;
    Ok(Object::Number(hash_self!(recv).borrow().len() as f64))
}

fn m_empty(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("empty?", args, 0, Some(0))?;
    Ok(Object::Boolean(hash_self!(recv).borrow().is_empty()))
}

fn m_element_ref(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    el_ref(hash_self!(recv), args)
}

fn m_element_set(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("[]=", args, 2, Some(2))?;
    hash_self!(recv).borrow_mut().insert(args[0].clone(), args[1].clone())?;
    Ok(args[1].clone())
}

/// `fetch(key)` or `fetch(key, default)`. Per the resolved open question,
/// this does not accept a block at all — callers passing a trailing block
/// as a third argument get **argument-count**.
fn m_fetch(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("fetch", args, 1, Some(2))?;
    let data = hash_self!(recv).borrow();
    if let Some(v) = data.get(&args[0]) {
        return Ok(v.clone());
    }
    if let Some(default) = args.get(1) {
        return Ok(default.clone());
    }
    Err(ScriptError::KeyError(args[0].inspect()))
}

fn m_flatten(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("flatten", args, 0, Some(1))?;
    let data = hash_self!(recv).borrow();
    let mut out = Vec::with_capacity(data.len() * 2);
    for (k, v) in data.iter() {
        out.push(k.clone());
        out.push(v.clone());
    }
    Ok(Object::array(out))
}

fn m_has_key(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("has_key?", args, 1, Some(1))?;
    Ok(Object::Boolean(hash_self!(recv).borrow().get(&args[0]).is_some()))
}

fn m_has_value(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("has_value?", args, 1, Some(1))?;
    let found = hash_self!(recv).borrow().iter().any(|(_, v)| v.eq_value(&args[0]));
    Ok(Object::Boolean(found))
}

fn m_invert(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("invert", args, 0, Some(0))?;
    let data = hash_self!(recv).borrow();
    let mut out = HashData::new();
    for (k, v) in data.iter() {
        out.insert(v.clone(), k.clone())?;
    }
    Ok(Object::Hash(Rc::new(RefCell::new(out))))
}

fn m_key(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("key", args, 1, Some(1))?;
    let data = hash_self!(recv).borrow();
    Ok(data
        .iter()
        .find(|(_, v)| v.eq_value(&args[0]))
        .map(|(k, _)| k.clone())
        .unwrap_or(Object::Nil))
}

fn m_keys(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("keys", args, 0, Some(0))?;
    Ok(Object::array(hash_self!(recv).borrow().iter().map(|(k, _)| k.clone()).collect()))
}

fn m_values(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("values", args, 0, Some(0))?;
    Ok(Object::array(hash_self!(recv).borrow().iter().map(|(_, v)| v.clone()).collect()))
}

fn m_merge(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("merge", args, 1, Some(1))?;
    let other = match &args[0] {
        Object::Hash(h) => h.borrow(),
        other => {
            return Err(ScriptError::ArgumentType {
                method: "merge".to_string(),
                message: format!("expected a Hash, got {}", other.type_name()),
            })
        }
    };
    let mut out = hash_self!(recv).borrow().clone();
    for (k, v) in other.iter() {
        out.insert(k.clone(), v.clone())?;
    }
    Ok(Object::Hash(Rc::new(RefCell::new(out))))
}

fn m_to_a(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_a", args, 0, Some(0))?;
    let data = hash_self!(recv).borrow();
    Ok(Object::array(
        data.iter().map(|(k, v)| Object::array(vec![k.clone(), v.clone()])).collect(),
    ))
}

fn m_to_h(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_h", args, 0, Some(0))?;
    Ok(recv.clone())
}

lazy_static! {
    static ref TABLE: MethodTable = build_table(
        "Hash",
        &[
            ("size", m_size as super::NativeMethod),
            ("length", m_size),
            ("empty?", m_empty),
            ("[]", m_element_ref),
            ("[]=", m_element_set),
            ("fetch", m_fetch),
            ("flatten", m_flatten),
            ("has_key?", m_has_key),
            ("include?", m_has_key),
            ("key?", m_has_key),
            ("member?", m_has_key),
            ("has_value?", m_has_value),
            ("value?", m_has_value),
            ("invert", m_invert),
            ("key", m_key),
            ("keys", m_keys),
            ("values", m_values),
            ("merge", m_merge),
            ("to_a", m_to_a),
            ("to_h", m_to_h),
        ],
    );
}

pub(super) fn table() -> &'static MethodTable {
    &TABLE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_missing_key_is_key_error() {
        let data = HashData::new();
        let recv = Object::Hash(Rc::new(RefCell::new(data)));
        let err = m_fetch(&recv, &[Object::symbol("missing")], &crate::evaluator::NullInvoker).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::KeyError);
    }

    #[test]
    fn invert_is_involutive_for_distinct_values() {
        let mut data = HashData::new();
        data.insert(Object::symbol("a"), Object::Number(1.0)).unwrap();
        data.insert(Object::symbol("b"), Object::Number(2.0)).unwrap();
        let recv = Object::Hash(Rc::new(RefCell::new(data)));
        let once = m_invert(&recv, &[], &crate::evaluator::NullInvoker).unwrap();
        let twice = m_invert(&once, &[], &crate::evaluator::NullInvoker).unwrap();
        assert!(twice.eq_value(&recv));
    }

    #[test]
    fn merge_preserves_insertion_order_per_scenario() {
        let mut a = HashData::new();
        a.insert(Object::symbol("a"), Object::Number(1.0)).unwrap();
        a.insert(Object::symbol("b"), Object::Number(2.0)).unwrap();
        let mut b = HashData::new();
        b.insert(Object::symbol("b"), Object::Number(3.0)).unwrap();
        b.insert(Object::symbol("c"), Object::Number(4.0)).unwrap();
        let recv_a = Object::Hash(Rc::new(RefCell::new(a)));
        let recv_b = Object::Hash(Rc::new(RefCell::new(b)));
        let merged = m_merge(&recv_a, &[recv_b], &crate::evaluator::NullInvoker).unwrap();
        let pairs = m_to_a(&merged, &[], &crate::evaluator::NullInvoker).unwrap();
        assert_eq!(pairs.inspect(), "[[:a, 1], [:b, 3], [:c, 4]]");
    }
}
