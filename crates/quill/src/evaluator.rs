// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The tree-walking evaluator.
//!
//! [`eval`] walks an [`Expr`] against a [`Scope`], producing an [`Object`] or
//! a [`ScriptError`]. [`Evaluator`] is the [`Invoker`] implementation that
//! lets native methods on the object model (`Array#each`, `Proc#call`, ...)
//! run a block's body without the object model depending on this module —
//! every `Invoker::call_block` call re-enters `eval` through here.

use std::rc::Rc;

use crate::ast::{BinaryOp, DispatchCache, Expr, StringSegment, UnaryOp};
use crate::error::{Result, ScriptError};
use crate::object::{Invoker, Object, ProcData};
use crate::scope::Scope;
use crate::symbol::Symbol;

/// Evaluates `expr` against `scope`.
pub fn eval(expr: &Expr, scope: &Rc<Scope>) -> Result<Object> {
    let evaluator = Evaluator;
    evaluator.eval_expr(expr, scope)
}

/// The tree-walker. Holds no state of its own — every recursive call takes
/// the scope explicitly — so a value of this type is only ever needed as an
/// `&dyn Invoker` to pass into native methods that call blocks.
pub struct Evaluator;

impl Invoker for Evaluator {
    fn call_block(&self, block: &Object, args: &[Object]) -> Result<Object> {
        let proc = match block {
            Object::Proc(p) => p,
            other => {
                return Err(ScriptError::TypeError(format!(
                    "expected a block, got {}",
                    other.type_name()
                )))
            }
        };
        self.invoke_proc(proc, args)
    }
}

impl Evaluator {
    fn invoke_proc(&self, proc: &Rc<ProcData>, args: &[Object]) -> Result<Object> {
        let call_scope = Scope::child(&proc.captured_scope);
        for (i, param) in proc.params.iter().enumerate() {
            call_scope.bind_local(*param, args.get(i).cloned().unwrap_or(Object::Nil));
        }
        self.eval_expr(&proc.body, &call_scope)
    }

    fn eval_expr(&self, expr: &Expr, scope: &Rc<Scope>) -> Result<Object> {
        match expr {
            Expr::Literal(obj) => Ok(obj.clone()),

            Expr::Variable(sym) => scope.get(*sym, self),

            Expr::Attribute(sym) => scope.self_object().get_attr(*sym),

            Expr::GlobalConstant(sym) => scope.self_object().get_constant(*sym),

            Expr::ConstantNav(lhs, sym) => {
                let base = self.eval_expr(lhs, scope)?;
                base.get_constant(*sym)
            }

            Expr::Assignment(sym, value) => {
                let value = self.eval_expr(value, scope)?;
                scope.set(*sym, value.clone());
                Ok(value)
            }

            Expr::GlobalFuncCall { name, args, cache } => {
                let self_obj = scope.self_object();
                let args = self.eval_args(args, scope)?;
                self_obj.call_method(*name, &args, self, cache)
            }

            Expr::MemberFuncCall { lhs, name, args, cache } => {
                let receiver = self.eval_expr(lhs, scope)?;
                let args = self.eval_args(args, scope)?;
                receiver.call_method(*name, &args, self, cache)
            }

            Expr::SafeNavMemberFuncCall { lhs, name, args, cache } => {
                let receiver = self.eval_expr(lhs, scope)?;
                if matches!(receiver, Object::Nil) {
                    return Ok(Object::Nil);
                }
                let args = self.eval_args(args, scope)?;
                receiver.call_method(*name, &args, self, cache)
            }

            Expr::ElementRefOp { lhs, args } => {
                let receiver = self.eval_expr(lhs, scope)?;
                let args = self.eval_args(args, scope)?;
                receiver.el_ref(&args)
            }

            Expr::ArrayLiteral(items) => Ok(Object::array(self.eval_args(items, scope)?)),

            Expr::HashLiteral(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for entry in entries {
                    let key = self.eval_expr(&entry.key, scope)?;
                    let value = self.eval_expr(&entry.value, scope)?;
                    pairs.push((key, value));
                }
                Object::hash(pairs)
            }

            Expr::InclusiveRangeOp(begin, end) => {
                let begin = self.eval_expr(begin, scope)?;
                let end = self.eval_expr(end, scope)?;
                Ok(Object::Range(Rc::new(crate::object::RangeData::new(begin, end, false))))
            }

            Expr::ExclusiveRangeOp(begin, end) => {
                let begin = self.eval_expr(begin, scope)?;
                let end = self.eval_expr(end, scope)?;
                Ok(Object::Range(Rc::new(crate::object::RangeData::new(begin, end, true))))
            }

            Expr::InterpolatedString(segments) => Ok(Object::string(self.render_segments(segments, scope)?)),

            Expr::InterpolatedRegex { segments, options } => {
                let source = self.render_segments(segments, scope)?;
                Ok(Object::Regexp(Rc::new(crate::object::RegexpData::new(source, options.clone()))))
            }

            Expr::Block { params, body } => Ok(Object::Proc(Rc::new(ProcData {
                captured_scope: Rc::clone(scope),
                params: params.clone(),
                body: Rc::clone(body),
            }))),

            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(cond, scope)?.is_true() {
                    self.eval_expr(then_branch, scope)
                } else {
                    self.eval_expr(else_branch, scope)
                }
            }

            Expr::Unary(op, operand) => self.eval_unary(*op, operand, scope),

            Expr::Binary(op, lhs, rhs) => self.eval_binary(*op, lhs, rhs, scope),
        }
    }

    fn eval_args(&self, args: &[Rc<Expr>], scope: &Rc<Scope>) -> Result<Vec<Object>> {
        args.iter().map(|a| self.eval_expr(a, scope)).collect()
    }

    fn render_segments(&self, segments: &[StringSegment], scope: &Rc<Scope>) -> Result<String> {
        let mut out = String::new();
        for seg in segments {
            match seg {
                StringSegment::Literal(s) => out.push_str(s),
                StringSegment::Expr(e) => out.push_str(&self.eval_expr(e, scope)?.to_display_string()),
            }
        }
        Ok(out)
    }

    fn eval_unary(&self, op: UnaryOp, operand: &Expr, scope: &Rc<Scope>) -> Result<Object> {
        let value = self.eval_expr(operand, scope)?;
        match op {
            UnaryOp::Not => Ok(Object::Boolean(!value.is_true())),
            UnaryOp::Plus => match value {
                Object::Number(n) => Ok(Object::Number(n)),
                other => Err(type_error_unary("+", &other)),
            },
            UnaryOp::Neg => match value {
                Object::Number(n) => Ok(Object::Number(-n)),
                other => Err(type_error_unary("-", &other)),
            },
        }
    }

    fn eval_binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr, scope: &Rc<Scope>) -> Result<Object> {
        let lhs = self.eval_expr(lhs, scope)?;
        let rhs = self.eval_expr(rhs, scope)?;
        match op {
            BinaryOp::Add => eval_add(&lhs, &rhs),
            BinaryOp::Sub => numeric_op(op, &lhs, &rhs, |a, b| a - b),
            BinaryOp::Mul => numeric_op(op, &lhs, &rhs, |a, b| a * b),
            BinaryOp::Div => numeric_op(op, &lhs, &rhs, |a, b| a / b),
            BinaryOp::Mod => numeric_op(op, &lhs, &rhs, |a, b| a - b * (a / b).floor()),
            BinaryOp::Pow => numeric_op(op, &lhs, &rhs, f64::powf),
            BinaryOp::BitAnd => eval_bitwise(op, &lhs, &rhs, |a, b| a & b),
            BinaryOp::BitOr => eval_bitwise(op, &lhs, &rhs, |a, b| a | b),
            BinaryOp::BitXor => eval_bitwise(op, &lhs, &rhs, |a, b| a ^ b),
            BinaryOp::ShiftLeft => eval_shift(op, &lhs, &rhs, i64::checked_shl),
            BinaryOp::ShiftRight => eval_shift(op, &lhs, &rhs, i64::checked_shr),
            BinaryOp::Eq => Ok(Object::Boolean(lhs.eq_value(&rhs))),
            BinaryOp::NotEq => Ok(Object::Boolean(!lhs.eq_value(&rhs))),
            BinaryOp::Lt => Ok(Object::Boolean(lhs.cmp_value(&rhs)? == std::cmp::Ordering::Less)),
            BinaryOp::LtEq => Ok(Object::Boolean(lhs.cmp_value(&rhs)? != std::cmp::Ordering::Greater)),
            BinaryOp::Gt => Ok(Object::Boolean(lhs.cmp_value(&rhs)? == std::cmp::Ordering::Greater)),
            BinaryOp::GtEq => Ok(Object::Boolean(lhs.cmp_value(&rhs)? != std::cmp::Ordering::Less)),
            BinaryOp::Spaceship => Ok(Object::Number(match lhs.cmp_value(&rhs)? {
                std::cmp::Ordering::Less => -1.0,
                std::cmp::Ordering::Equal => 0.0,
                std::cmp::Ordering::Greater => 1.0,
            })),
            BinaryOp::Match => eval_match(&lhs, &rhs),
        }
    }
}

fn type_error_unary(op: &str, operand: &Object) -> ScriptError {
    ScriptError::TypeError(format!("undefined method `{op}@` for {}", operand.type_name()))
}

fn unsupported(op: BinaryOp, lhs: &Object, rhs: &Object) -> ScriptError {
    ScriptError::UnsupportedOperand {
        op: op.as_str(),
        lhs: lhs.type_name().to_string(),
        rhs: rhs.type_name().to_string(),
    }
}

/// `+` is the one binary operator whose meaning depends on operand type
/// beyond plain arithmetic: numeric addition, or string concatenation that
/// propagates HTML-safety only when *both* sides are already safe.
fn eval_add(lhs: &Object, rhs: &Object) -> Result<Object> {
    match (lhs, rhs) {
        (Object::Number(a), Object::Number(b)) => Ok(Object::Number(a + b)),
        (Object::HtmlSafe(a), Object::HtmlSafe(b)) => Ok(Object::html_safe(format!("{a}{b}"))),
        (Object::Str(a), Object::Str(b)) => Ok(Object::string(format!("{a}{b}"))),
        (Object::Str(a), Object::HtmlSafe(b)) => Ok(Object::string(format!("{a}{b}"))),
        (Object::HtmlSafe(a), Object::Str(b)) => Ok(Object::string(format!("{a}{b}"))),
        _ => Err(unsupported(BinaryOp::Add, lhs, rhs)),
    }
}

fn numeric_op(op: BinaryOp, lhs: &Object, rhs: &Object, f: impl Fn(f64, f64) -> f64) -> Result<Object> {
    match (lhs, rhs) {
        (Object::Number(a), Object::Number(b)) => Ok(Object::Number(f(*a, *b))),
        _ => Err(unsupported(op, lhs, rhs)),
    }
}

/// Bitwise ops require both operands to be integral `Number`s (a fractional
/// float has no bitwise meaning) — failing with **invalid-argument** rather
/// than **unsupported-operand** when the types are right but the values
/// aren't whole numbers, since the type itself was acceptable.
fn eval_bitwise(op: BinaryOp, lhs: &Object, rhs: &Object, f: impl Fn(i64, i64) -> i64) -> Result<Object> {
    match (lhs, rhs) {
        (Object::Number(a), Object::Number(b)) => {
            let a = require_integer(*a)?;
            let b = require_integer(*b)?;
            Ok(Object::Number(f(a, b) as f64))
        }
        _ => Err(unsupported(op, lhs, rhs)),
    }
}

fn eval_shift(op: BinaryOp, lhs: &Object, rhs: &Object, f: impl Fn(i64, u32) -> Option<i64>) -> Result<Object> {
    match (lhs, rhs) {
        (Object::Number(a), Object::Number(b)) => {
            let a = require_integer(*a)?;
            let b = require_integer(*b)?;
            if b < 0 || b > i64::from(u32::MAX) {
                return Err(ScriptError::InvalidArgument(format!("shift amount out of range: {b}")));
            }
            Ok(Object::Number(f(a, b as u32).unwrap_or(0) as f64))
        }
        _ => Err(unsupported(op, lhs, rhs)),
    }
}

fn require_integer(n: f64) -> Result<i64> {
    if !n.is_finite() || n.trunc() != n {
        return Err(ScriptError::InvalidArgument(format!(
            "expected an integral Number, got {n}"
        )));
    }
    Ok(n as i64)
}

/// `=~` — only `(String, Regexp)` or `(Regexp, String)` pairs are
/// supported; anything else is **unsupported-operand**, matching `+`'s
/// treatment of type-mismatched binary operators.
fn eval_match(lhs: &Object, rhs: &Object) -> Result<Object> {
    let (text, regexp) = match (lhs, rhs) {
        (Object::Str(s), Object::Regexp(r)) | (Object::HtmlSafe(s), Object::Regexp(r)) => (s.as_str(), r),
        (Object::Regexp(r), Object::Str(s)) | (Object::Regexp(r), Object::HtmlSafe(s)) => (s.as_str(), r),
        _ => return Err(unsupported(BinaryOp::Match, lhs, rhs)),
    };
    let re = regexp.compiled()?;
    Ok(match re.find(text) {
        Some(m) => Object::Number(text[..m.start()].chars().count() as f64),
        None => Object::Nil,
    })
}

/// An [`Invoker`] that fails any block invocation, for unit tests of object
/// methods that accept but do not need to call a block argument.
pub struct NullInvoker;

impl Invoker for NullInvoker {
    fn call_block(&self, _block: &Object, _args: &[Object]) -> Result<Object> {
        Err(ScriptError::TypeError("blocks cannot be invoked in this context".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::MethodTable;
    use crate::object::ViewModel;
    use crate::parser::{parse_expression, GlobalFunctions, LocalVarNames};
    use lazy_static::lazy_static;

    #[derive(Debug)]
    struct TestViewModel;

    lazy_static! {
        static ref TABLE: MethodTable = crate::object::test_support::empty_table("TestViewModel");
    }

    impl ViewModel for TestViewModel {
        fn self_object(&self) -> Object {
            Object::ViewModel(Rc::new(TestViewModel))
        }
        fn get_attr(&self, name: Symbol) -> Result<Object> {
            if name.as_str() == "name" {
                Ok(Object::string("Ada"))
            } else {
                Ok(Object::Nil)
            }
        }
        fn get_constant(&self, _name: Symbol) -> Result<Object> {
            Ok(Object::Nil)
        }
        fn method_table(&self) -> &MethodTable {
            &TABLE
        }
    }

    fn eval_src(src: &str) -> Result<Object> {
        let expr = parse_expression(src, &LocalVarNames::new(), &GlobalFunctions::new())?;
        let scope = Scope::root(Rc::new(TestViewModel));
        eval(&expr, &scope)
    }

    #[test]
    fn inspect_round_trip_scenarios() {
        let cases = [
            ("1 + 2", "3"),
            ("'a' + 'b'", "\"ab\""),
            ("[1, 2, 3].map{ |x| x * 2 }", "[2, 4, 6]"),
            ("{a: 1}.invert", "{1 => :a}"),
            ("1..3", "1..3"),
            ("(1..5).to_a", "[1, 2, 3, 4, 5]"),
            ("nil", "nil"),
            ("true && false", "false"),
        ];
        for (src, expected) in cases {
            let result = eval_src(src).unwrap_or_else(|e| panic!("{src} failed: {e}"));
            assert_eq!(result.inspect(), expected, "evaluating {src}");
        }
    }

    #[test]
    fn attribute_lookup_reads_view_model() {
        assert_eq!(eval_src("@name").unwrap().to_display_string(), "Ada");
    }

    #[test]
    fn assignment_persists_in_scope() {
        let expr = parse_expression("x = 5", &LocalVarNames::new(), &GlobalFunctions::new()).unwrap();
        let scope = Scope::root(Rc::new(TestViewModel));
        eval(&expr, &scope).unwrap();
        assert!(scope.get(Symbol::intern("x"), &Evaluator).unwrap().eq_value(&Object::Number(5.0)));
    }

    #[test]
    fn safe_navigation_short_circuits_without_evaluating_args() {
        // `1 + 'x'` would fail with unsupported-operand if evaluated; since
        // `lhs` is nil, the call -- and its argument -- never runs.
        let result = eval_src("nil&.foo(1 + 'x')");
        assert!(result.unwrap().eq_value(&Object::Nil));
    }

    #[test]
    fn logical_and_does_not_evaluate_rhs_when_lhs_falsy() {
        let result = eval_src("false && (1 + 'x')").unwrap();
        assert!(!result.is_true());
    }

    #[test]
    fn logical_or_does_not_evaluate_rhs_when_lhs_truthy() {
        let result = eval_src("true || (1 + 'x')").unwrap();
        assert!(result.is_true());
    }

    #[test]
    fn plain_plus_plain_string_is_unsafe() {
        assert!(matches!(eval_src("'a' + 'b'").unwrap(), Object::Str(_)));
    }

    #[test]
    fn html_safe_plus_html_safe_stays_safe() {
        let scope = Scope::root(Rc::new(TestViewModel));
        let expr = crate::ast::Expr::Binary(
            BinaryOp::Add,
            Rc::new(crate::ast::Expr::Literal(Object::html_safe("<b>"))),
            Rc::new(crate::ast::Expr::Literal(Object::html_safe("</b>"))),
        );
        assert!(matches!(eval(&expr, &scope).unwrap(), Object::HtmlSafe(_)));
    }

    #[test]
    fn html_safe_plus_plain_string_downgrades_to_unsafe() {
        let scope = Scope::root(Rc::new(TestViewModel));
        let expr = crate::ast::Expr::Binary(
            BinaryOp::Add,
            Rc::new(crate::ast::Expr::Literal(Object::html_safe("<b>"))),
            Rc::new(crate::ast::Expr::Literal(Object::string("x"))),
        );
        assert!(matches!(eval(&expr, &scope).unwrap(), Object::Str(_)));
    }

    #[test]
    fn unorderable_types_reported() {
        let err = eval_src("5 <=> 'x'").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnorderableTypes);
    }

    #[test]
    fn hash_fetch_missing_key_is_key_error() {
        let err = eval_src("{}.fetch(:missing)").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::KeyError);
    }

    #[test]
    fn string_bad_index_type_is_script_error() {
        assert!(eval_src("'test'[true]").is_err());
    }

    #[test]
    fn chomp_with_too_many_args_is_argument_count_error() {
        let err = eval_src("''.chomp 1, 2").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ArgumentCount);
    }

    #[test]
    fn bitwise_and_on_integral_numbers() {
        assert_eq!(eval_src("6 & 3").unwrap().inspect(), "2");
    }

    #[test]
    fn ternary_picks_branch() {
        assert_eq!(eval_src("1 < 2 ? 'yes' : 'no'").unwrap().inspect(), "\"yes\"");
    }

    #[test]
    fn each_line_without_block_then_each_with_block_accumulates() {
        // `each_line` with no block returns the same Array `lines` would;
        // `.each{}` then drives it like any other array, letting a
        // view-model attribute (here a plain mutable `Array`) accumulate
        // results the way `@data.push x` would in a real template.
        #[derive(Debug)]
        struct AccumulatingRoot {
            data: Object,
        }

        lazy_static! {
            static ref ROOT_TABLE: MethodTable = crate::object::test_support::empty_table("AccumulatingRoot");
        }

        impl ViewModel for AccumulatingRoot {
            fn self_object(&self) -> Object {
                Object::ViewModel(Rc::new(AccumulatingRoot { data: self.data.clone() }))
            }
            fn get_attr(&self, name: Symbol) -> Result<Object> {
                if name.as_str() == "data" {
                    Ok(self.data.clone())
                } else {
                    Ok(Object::Nil)
                }
            }
            fn get_constant(&self, _name: Symbol) -> Result<Object> {
                Ok(Object::Nil)
            }
            fn method_table(&self) -> &MethodTable {
                &ROOT_TABLE
            }
        }

        let data = Object::array(Vec::new());
        let root = Rc::new(AccumulatingRoot { data: data.clone() });
        let scope = Scope::root(root);
        let expr = parse_expression(
            "'test'.each_line.each{|x| @data.push x}",
            &LocalVarNames::new(),
            &GlobalFunctions::new(),
        )
        .unwrap();
        eval(&expr, &scope).unwrap();
        assert_eq!(data.inspect(), "[\"test\"]");
    }

    #[test]
    fn block_closes_over_defining_scope() {
        let locals: LocalVarNames = [Symbol::intern("arr")].into_iter().collect();
        let expr = parse_expression("arr.map { |n| n + 1 }", &locals, &GlobalFunctions::new()).unwrap();
        let scope = Scope::root(Rc::new(TestViewModel));
        scope.bind_local(Symbol::intern("arr"), Object::array(vec![Object::Number(1.0), Object::Number(2.0)]));
        let result = eval(&expr, &scope).unwrap();
        assert_eq!(result.inspect(), "[2, 3]");
    }
}
