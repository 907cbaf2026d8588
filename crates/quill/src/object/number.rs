// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `Number`: every number in the language is a 64-bit float. Methods named
//! after integer operations truncate toward zero; bitwise operators (see
//! `crate::evaluator`) fail on operands with a non-zero fractional part.

use lazy_static::lazy_static;

use super::{build_table, check_arity, Invoker, MethodTable, Object};
use crate::error::{Result, ScriptError};

/// Formats a number the way the language's `to_s`/`inspect` do: integral
/// values print without a trailing `.0`, matching the behavior exercised by
/// the end-to-end scenarios (`merge(...).to_a` inspecting to `1`, not
/// `1.0`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() };
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn recv_f64(recv: &Object) -> f64 {
    match recv {
        Object::Number(n) => *n,
        _ => unreachable!("number method invoked on non-number receiver"),
    }
}

fn m_to_s(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_s", args, 0, Some(0))?;
    Ok(Object::string(format_number(recv_f64(recv))))
}

/// Truncates toward zero. Per the resolved open question, NaN/Inf fail
/// with **invalid-argument** rather than silently truncating to 0.
fn m_to_i(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_i", args, 0, Some(0))?;
    let n = recv_f64(recv);
    if !n.is_finite() {
        return Err(ScriptError::InvalidArgument(format!("can't convert {n} to an integer")));
    }
    Ok(Object::Number(n.trunc()))
}

fn m_to_f(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_f", args, 0, Some(0))?;
    Ok(Object::Number(recv_f64(recv)))
}

fn m_to_d(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("to_d", args, 0, Some(0))?;
    Ok(Object::Number(recv_f64(recv)))
}

fn m_abs(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("abs", args, 0, Some(0))?;
    Ok(Object::Number(recv_f64(recv).abs()))
}

fn m_floor(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("floor", args, 0, Some(0))?;
    Ok(Object::Number(recv_f64(recv).floor()))
}

fn m_ceil(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("ceil", args, 0, Some(0))?;
    Ok(Object::Number(recv_f64(recv).ceil()))
}

fn m_round(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("round", args, 0, Some(0))?;
    Ok(Object::Number(recv_f64(recv).round()))
}

fn m_zero(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("zero?", args, 0, Some(0))?;
    Ok(Object::Boolean(recv_f64(recv) == 0.0))
}

fn m_positive(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("positive?", args, 0, Some(0))?;
    Ok(Object::Boolean(recv_f64(recv) > 0.0))
}

fn m_negative(recv: &Object, args: &[Object], _inv: &dyn Invoker) -> Result<Object> {
    check_arity("negative?", args, 0, Some(0))?;
    Ok(Object::Boolean(recv_f64(recv) < 0.0))
}

lazy_static! {
    static ref TABLE: MethodTable = build_table(
        "Number",
        &[
            ("to_s", m_to_s as super::NativeMethod),
            ("to_i", m_to_i),
            ("to_int", m_to_i),
            ("to_f", m_to_f),
            ("to_d", m_to_d),
            ("abs", m_abs),
            ("floor", m_floor),
            ("ceil", m_ceil),
            ("round", m_round),
            ("zero?", m_zero),
            ("positive?", m_positive),
            ("negative?", m_negative),
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
    fn to_i_rejects_nan() {
        let err = m_to_i(&Object::Number(f64::NAN), &[], &crate::evaluator::NullInvoker).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn to_f_passes_nan_through() {
        let result = m_to_f(&Object::Number(f64::NAN), &[], &crate::evaluator::NullInvoker).unwrap();
        match result {
            Object::Number(n) => assert!(n.is_nan()),
            _ => panic!("expected number"),
        }
    }

    #[test]
    fn integral_values_format_without_decimal() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(3.5), "3.5");
    }
}
