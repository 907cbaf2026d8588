// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `Regexp`: a pattern plus `imx` option flags, compiled lazily and cached
//! for the lifetime of the value.

use std::cell::RefCell;

use lazy_static::lazy_static;
use regex::Regex;

use super::{build_table, check_arity, Invoker, MethodTable, Object};
use crate::error::{Result, ScriptError};

/// Backing store for [`Object::Regexp`].
#[derive(Debug)]
pub struct RegexpData {
    /// The raw pattern source (without delimiters or flags).
    pub source: String,
    /// Flags present in source order; any of `i`, `m`, `x`.
    pub options: String,
    compiled: RefCell<Option<Regex>>,
}

impl RegexpData {
    /// Creates a new, not-yet-compiled regex value.
    pub fn new(source: impl Into<String>, options: impl Into<String>) -> Self {
        RegexpData {
            source: source.into(),
            options: options.into(),
            compiled: RefCell::new(None),
        }
    }

    /// Lazily compiles (and caches) the `regex::Regex` for this pattern.
    pub fn compiled(&self) -> Result<Regex> {
        if let Some(re) = self.compiled.borrow().as_ref() {
            return Ok(re.clone());
        }
        let mut pattern = String::new();
        if !self.options.is_empty() {
            pattern.push_str("(?");
            for flag in ['i', 'm', 'x'] {
                if self.options.contains(flag) {
                    pattern.push(flag);
                }
            }
            pattern.push(')');
        }
        pattern.push_str(&self.source);
        let re = Regex::new(&pattern).map_err(|e| ScriptError::InvalidArgument(format!("bad regex: {e}")))?;
        *self.compiled.borrow_mut() = Some(re.clone());
        Ok(re)
    }

    pub(super) fn eq_value(&self, other: &RegexpData) -> bool {
        self.source == other.source && self.options == other.options
    }

    pub(super) fn to_display_string(&self) -> String {
        format!("(?{}-mix:{})", self.options, self.source)
    }

    pub(super) fn inspect(&self) -> String {
        format!("/{}/{}", self.source, self.options)
    }
}

fn m_match(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("match", args, 1, Some(1))?;
    let text = super::expect_str("match", &args[0])?;
    match recv {
        Object::Regexp(r) => {
            let re = r.compiled()?;
            Ok(match re.captures(text) {
                Some(caps) => Object::array(
                    caps.iter()
                        .map(|m| m.map(|m| Object::string(m.as_str())).unwrap_or(Object::Nil))
                        .collect(),
                ),
                None => Object::Nil,
            })
        }
        _ => unreachable!(),
    }
}

fn m_source(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("source", args, 0, Some(0))?;
    match recv {
        Object::Regexp(r) => Ok(Object::string(r.source.clone())),
        _ => unreachable!(),
    }
}

lazy_static! {
    static ref TABLE: MethodTable = build_table(
        "Regexp",
        &[("match", m_match as super::NativeMethod), ("source", m_source), ("=~", m_match)],
    );
}

pub(super) fn table() -> &'static MethodTable {
    &TABLE
}
