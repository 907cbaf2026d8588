// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `Range`: a `begin..end` or `begin...end` pair, iterable when both ends
//! are numbers or both are strings.

use lazy_static::lazy_static;

use crate::error::{Result, ScriptError};

use super::{build_table, check_arity, Invoker, MethodTable, Object};

/// Backing store for [`Object::Range`].
#[derive(Debug, Clone)]
pub struct RangeData {
    /// The lower bound.
    pub begin: Object,
    /// The upper bound.
    pub end: Object,
    /// Whether `end` is excluded from the range.
    pub exclusive: bool,
}

impl RangeData {
    /// Creates a new range.
    pub fn new(begin: Object, end: Object, exclusive: bool) -> Self {
        RangeData { begin, end, exclusive }
    }

    pub(super) fn eq_value(&self, other: &RangeData) -> bool {
        self.exclusive == other.exclusive && self.begin.eq_value(&other.begin) && self.end.eq_value(&other.end)
    }

    pub(super) fn hash_value(&self) -> u64 {
        self.begin.hash_value() ^ self.end.hash_value().rotate_left(1) ^ (self.exclusive as u64)
    }

    pub(super) fn to_display_string(&self) -> String {
        let sep = if self.exclusive { "..." } else { ".." };
        format!(
            "{}{}{}",
            self.begin.to_display_string(),
            sep,
            self.end.to_display_string()
        )
    }

    pub(super) fn inspect(&self) -> String {
        let sep = if self.exclusive { "..." } else { ".." };
        format!("{}{}{}", self.begin.inspect(), sep, self.end.inspect())
    }

    /// Resolves this range against a container of length `len`, returning a
    /// `[start, end)` byte/element span clamped to valid bounds. Only
    /// numeric ranges are supported for this use (string slicing by string
    /// range is not defined by the spec).
    pub fn resolve_span(&self, len: usize) -> Result<(usize, usize)> {
        let begin = match &self.begin {
            Object::Nil => 0i64,
            Object::Number(n) => n.trunc() as i64,
            other => {
                return Err(ScriptError::ArgumentType {
                    method: "[]".to_string(),
                    message: format!("expected a numeric Range, got {}", other.type_name()),
                })
            }
        };
        let end = match &self.end {
            Object::Nil => len as i64,
            Object::Number(n) => n.trunc() as i64,
            other => {
                return Err(ScriptError::ArgumentType {
                    method: "[]".to_string(),
                    message: format!("expected a numeric Range, got {}", other.type_name()),
                })
            }
        };
        let len_i = len as i64;
        let begin = if begin < 0 { (begin + len_i).max(0) } else { begin };
        let mut end = if end < 0 { end + len_i } else { end };
        if !self.exclusive {
            end += 1;
        }
        let begin = begin.clamp(0, len_i) as usize;
        let end = end.clamp(0, len_i) as usize;
        Ok((begin, begin.max(end)))
    }

    /// Materializes this range into a vector, when it is an iterable
    /// numeric or string range.
    pub fn to_vec(&self) -> Result<Vec<Object>> {
        match (&self.begin, &self.end) {
            (Object::Number(a), Object::Number(b)) => {
                let a = a.trunc() as i64;
                let b = b.trunc() as i64;
                let b = if self.exclusive { b - 1 } else { b };
                Ok((a..=b).map(|n| Object::Number(n as f64)).collect())
            }
            (Object::Str(a), Object::Str(b)) if a.len() == 1 && b.len() == 1 => {
                let a = a.chars().next().unwrap() as u32;
                let b = b.chars().next().unwrap() as u32;
                let b = if self.exclusive { b.saturating_sub(1) } else { b };
                Ok((a..=b)
                    .filter_map(char::from_u32)
                    .map(|c| Object::string(c.to_string()))
                    .collect())
            }
            _ => Err(ScriptError::TypeError(
                "Range is not iterable for these endpoint types".to_string(),
            )),
        }
    }
}

fn m_to_a(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_a", args, 0, Some(0))?;
    match recv {
        Object::Range(r) => Ok(Object::array(r.to_vec()?)),
        _ => unreachable!(),
    }
}

fn m_each(recv: &Object, args: &[Object], inv: &dyn Invoker) -> Result<Object> {
    check_arity("each", args, 1, Some(1))?;
    match recv {
        Object::Range(r) => {
            for item in r.to_vec()? {
                inv.call_block(&args[0], std::slice::from_ref(&item))?;
            }
            Ok(recv.clone())
        }
        _ => unreachable!(),
    }
}

fn m_include(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("include?", args, 1, Some(1))?;
    match recv {
        Object::Range(r) => {
            let ge_begin = r.begin.cmp_value(&args[0]).map(|o| o.is_le()).unwrap_or(false);
            let cmp_end = args[0].cmp_value(&r.end);
            let within_end = match cmp_end {
                Ok(ord) => {
                    if r.exclusive {
                        ord.is_lt()
                    } else {
                        ord.is_le()
                    }
                }
                Err(_) => false,
            };
            Ok(Object::Boolean(ge_begin && within_end))
        }
        _ => unreachable!(),
    }
}

fn m_begin(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("begin", args, 0, Some(0))?;
    match recv {
        Object::Range(r) => Ok(r.begin.clone()),
        _ => unreachable!(),
    }
}

fn m_end(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("end", args, 0, Some(0))?;
    match recv {
        Object::Range(r) => Ok(r.end.clone()),
        _ => unreachable!(),
    }
}

lazy_static! {
    static ref TABLE: MethodTable = build_table(
        "Range",
        &[
            ("to_a", m_to_a as super::NativeMethod),
            ("each", m_each),
            ("include?", m_include),
            ("cover?", m_include),
            ("===", m_include),
            ("begin", m_begin),
            ("first", m_begin),
            ("end", m_end),
            ("last", m_end),
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
    fn inclusive_range_includes_end() {
        let r = RangeData::new(Object::Number(1.0), Object::Number(3.0), false);
        assert_eq!(r.to_vec().unwrap().len(), 3);
    }

    #[test]
    fn exclusive_range_excludes_end() {
        let r = RangeData::new(Object::Number(1.0), Object::Number(3.0), true);
        assert_eq!(r.to_vec().unwrap().len(), 2);
    }
}
