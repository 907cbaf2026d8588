// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Abstract syntax tree for the embedded expression language.
//!
//! [`Expr`] is an immutable tree produced by [`crate::parser::parse_expression`]
//! and consumed by [`crate::evaluator::eval`]. Every variant also knows how to
//! stringify itself back to source form via [`std::fmt::Display`], used for
//! diagnostics and for the round-trip tests in the parser.
//!
//! Call-site nodes ([`Expr::GlobalFuncCall`], [`Expr::MemberFuncCall`],
//! [`Expr::SafeNavMemberFuncCall`]) carry an inline single-slot method
//! dispatch cache. It is purely an optimization: clearing or never
//! populating it cannot change the result of evaluating the node.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::object::{MethodTableId, NativeMethod, Object};
use crate::symbol::Symbol;

/// A call-site cache slot memoizing the last `(receiver method table,
/// resolved method)` pair for a given AST node.
#[derive(Debug, Default)]
pub struct DispatchCache(Cell<Option<(MethodTableId, NativeMethod)>>);

impl DispatchCache {
    /// Creates an empty cache slot.
    pub fn new() -> Self {
        DispatchCache(Cell::new(None))
    }

    /// Returns the cached method if it was last resolved against `table_id`.
    pub fn get(&self, table_id: MethodTableId) -> Option<NativeMethod> {
        match self.0.get() {
            Some((cached_id, method)) if cached_id == table_id => Some(method),
            _ => None,
        }
    }

    /// Records `method` as the resolution for `table_id`, replacing any
    /// previous entry.
    pub fn store(&self, table_id: MethodTableId, method: NativeMethod) {
        self.0.set(Some((table_id, method)));
    }
}

impl Clone for DispatchCache {
    fn clone(&self) -> Self {
        // A cloned node starts with a cold cache. The cache is invisible to
        // semantics so this is always sound.
        DispatchCache::new()
    }
}

impl PartialEq for DispatchCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// One key/value pair in a [`Expr::HashLiteral`].
#[derive(Debug, Clone, PartialEq)]
pub struct HashEntry {
    /// The key expression.
    pub key: Rc<Expr>,
    /// The value expression.
    pub value: Rc<Expr>,
}

/// One piece of an interpolated string or regex: either literal text or a
/// `#{...}` sub-expression to be evaluated and stringified in place.
#[derive(Debug, Clone, PartialEq)]
pub enum StringSegment {
    /// Literal text, escapes already resolved.
    Literal(String),
    /// A `#{...}` sub-expression.
    Expr(Rc<Expr>),
}

/// An immutable expression-tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value materialized at parse time (number, string, symbol,
    /// `true`/`false`/`nil`).
    Literal(Object),
    /// A bare lowercase identifier not recognized as a global function name.
    /// Resolved against the scope chain at eval time, falling back to a
    /// zero-argument method call on `self` when no variable is bound.
    Variable(Symbol),
    /// `@name` — looked up via the current scope's view-model attribute
    /// accessor.
    Attribute(Symbol),
    /// A bare capitalized identifier, e.g. `Foo`.
    GlobalConstant(Symbol),
    /// `lhs::name` — constant navigation off another constant-valued
    /// expression.
    ConstantNav(Rc<Expr>, Symbol),
    /// `name = expr` — assigns into the scope already holding `name`, or
    /// creates `name` in the innermost scope if none does.
    Assignment(Symbol, Rc<Expr>),
    /// An unqualified call recognized at parse time as a known global
    /// function name; dispatched on `self` at eval time.
    GlobalFuncCall {
        /// The function name, interned.
        name: Symbol,
        /// Argument expressions, evaluated left to right.
        args: Vec<Rc<Expr>>,
        /// Per-call-site dispatch cache.
        cache: DispatchCache,
    },
    /// `lhs.name(args...)`.
    MemberFuncCall {
        /// The receiver expression.
        lhs: Rc<Expr>,
        /// The method name.
        name: Symbol,
        /// Argument expressions, evaluated left to right.
        args: Vec<Rc<Expr>>,
        /// Per-call-site dispatch cache.
        cache: DispatchCache,
    },
    /// `lhs&.name(args...)` — short-circuits to `nil` without evaluating
    /// `lhs.name` or any argument when `lhs` evaluates to `nil`.
    SafeNavMemberFuncCall {
        /// The receiver expression.
        lhs: Rc<Expr>,
        /// The method name.
        name: Symbol,
        /// Argument expressions, evaluated left to right (only when `lhs`
        /// is not nil).
        args: Vec<Rc<Expr>>,
        /// Per-call-site dispatch cache.
        cache: DispatchCache,
    },
    /// `lhs[args...]`.
    ElementRefOp {
        /// The receiver expression.
        lhs: Rc<Expr>,
        /// Index/key argument expressions.
        args: Vec<Rc<Expr>>,
    },
    /// `[a, b, c]`.
    ArrayLiteral(Vec<Rc<Expr>>),
    /// `{k => v, ...}` or `{k: v, ...}`.
    HashLiteral(Vec<HashEntry>),
    /// `lhs..rhs` — inclusive range.
    InclusiveRangeOp(Rc<Expr>, Rc<Expr>),
    /// `lhs...rhs` — exclusive range.
    ExclusiveRangeOp(Rc<Expr>, Rc<Expr>),
    /// A double-quoted string, possibly containing `#{...}` interpolations.
    InterpolatedString(Vec<StringSegment>),
    /// A regex literal whose body may itself contain `#{...}` interpolations.
    InterpolatedRegex {
        /// The body segments.
        segments: Vec<StringSegment>,
        /// Option flags (any of `i`, `m`, `x`), in source order.
        options: String,
    },
    /// `{ |params| body }` or `do |params| body end` — a closure literal,
    /// evaluated to a `Proc` [`Object`] capturing the defining scope.
    Block {
        /// Parameter names, bound positionally when the block is invoked.
        params: Vec<Symbol>,
        /// The block body.
        body: Rc<Expr>,
    },
    /// `cond ? then_branch : else_branch`. Also the desugared form of
    /// `&&`/`||`, which the parser rewrites into this node at parse time so
    /// the evaluator has no separate short-circuit path to maintain.
    Conditional {
        /// The condition expression.
        cond: Rc<Expr>,
        /// Evaluated, and its value returned, when `cond` is truthy.
        then_branch: Rc<Expr>,
        /// Evaluated, and its value returned, when `cond` is falsy.
        else_branch: Rc<Expr>,
    },
    /// A unary operator applied to its operand.
    Unary(UnaryOp, Rc<Expr>),
    /// A binary operator applied to its two operands.
    Binary(BinaryOp, Rc<Expr>, Rc<Expr>),
}

/// A unary prefix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Plus,
    /// `!x`
    Not,
}

/// A binary infix operator.
///
/// Logical `&&`/`||` are not represented here: the parser desugars both
/// into [`Expr::Conditional`] at parse time (`a && b` becomes
/// `a ? b : a`, `a || b` becomes `a ? a : b`, each operand parsed once and
/// shared via `Rc`), so the evaluator only ever sees `Conditional`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `<=>`
    Spaceship,
    /// `=~`
    Match,
}

impl BinaryOp {
    /// The operator's source spelling, reused both by `Display` and by
    /// `unsupported-operand`/`unorderable-types` error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Spaceship => "<=>",
            BinaryOp::Match => "=~",
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(obj) => write!(f, "{}", obj.inspect()),
            Expr::Variable(sym) => write!(f, "{sym}"),
            Expr::Attribute(sym) => write!(f, "@{sym}"),
            Expr::GlobalConstant(sym) => write!(f, "{sym}"),
            Expr::ConstantNav(lhs, sym) => write!(f, "{lhs}::{sym}"),
            Expr::Assignment(sym, expr) => write!(f, "{sym} = {expr}"),
            Expr::GlobalFuncCall { name, args, .. } => write!(f, "{}({})", name, fmt_args(args)),
            Expr::MemberFuncCall { lhs, name, args, .. } => {
                write!(f, "{lhs}.{name}({})", fmt_args(args))
            }
            Expr::SafeNavMemberFuncCall { lhs, name, args, .. } => {
                write!(f, "{lhs}&.{name}({})", fmt_args(args))
            }
            Expr::ElementRefOp { lhs, args } => write!(f, "{lhs}[{}]", fmt_args(args)),
            Expr::ArrayLiteral(items) => write!(f, "[{}]", fmt_args(items)),
            Expr::HashLiteral(entries) => {
                write!(f, "{{")?;
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} => {}", entry.key, entry.value)?;
                }
                write!(f, "}}")
            }
            Expr::InclusiveRangeOp(lhs, rhs) => write!(f, "{lhs}..{rhs}"),
            Expr::ExclusiveRangeOp(lhs, rhs) => write!(f, "{lhs}...{rhs}"),
            Expr::InterpolatedString(segments) => {
                write!(f, "\"")?;
                for seg in segments {
                    match seg {
                        StringSegment::Literal(s) => write!(f, "{s}")?,
                        StringSegment::Expr(e) => write!(f, "#{{{e}}}")?,
                    }
                }
                write!(f, "\"")
            }
            Expr::InterpolatedRegex { segments, options } => {
                write!(f, "/")?;
                for seg in segments {
                    match seg {
                        StringSegment::Literal(s) => write!(f, "{s}")?,
                        StringSegment::Expr(e) => write!(f, "#{{{e}}}")?,
                    }
                }
                write!(f, "/{options}")
            }
            Expr::Block { params, body } => {
                if params.is_empty() {
                    write!(f, "{{ {body} }}")
                } else {
                    let names: Vec<String> = params.iter().map(|s| s.to_string()).collect();
                    write!(f, "{{ |{}| {body} }}", names.join(", "))
                }
            }
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => write!(f, "{cond} ? {then_branch} : {else_branch}"),
            Expr::Unary(op, operand) => {
                let sym = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Plus => "+",
                    UnaryOp::Not => "!",
                };
                write!(f, "{sym}{operand}")
            }
            Expr::Binary(op, lhs, rhs) => write!(f, "{lhs} {} {rhs}", op.as_str()),
        }
    }
}

fn fmt_args(args: &[Rc<Expr>]) -> String {
    args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    #[test]
    fn displays_member_call_with_args() {
        let expr = Expr::MemberFuncCall {
            lhs: Rc::new(Expr::Variable(Symbol::intern("x"))),
            name: Symbol::intern("foo"),
            args: vec![Rc::new(Expr::Literal(Object::from_f64(1.0)))],
            cache: DispatchCache::new(),
        };
        assert_eq!(expr.to_string(), "x.foo(1)");
    }

    #[test]
    fn displays_conditional_desugared_from_and() {
        let a = Rc::new(Expr::Variable(Symbol::intern("a")));
        let b = Rc::new(Expr::Variable(Symbol::intern("b")));
        let expr = Expr::Conditional {
            cond: a.clone(),
            then_branch: b,
            else_branch: a,
        };
        assert_eq!(expr.to_string(), "a ? b : a");
    }

    #[test]
    fn displays_safe_nav_call() {
        let expr = Expr::SafeNavMemberFuncCall {
            lhs: Rc::new(Expr::Variable(Symbol::intern("x"))),
            name: Symbol::intern("foo"),
            args: vec![],
            cache: DispatchCache::new(),
        };
        assert_eq!(expr.to_string(), "x&.foo()");
    }

    #[test]
    fn dispatch_cache_misses_on_different_table() {
        let cache = DispatchCache::new();
        assert!(cache.get(MethodTableId(1)).is_none());
    }
}
