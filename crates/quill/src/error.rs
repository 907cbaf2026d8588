// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for the embedded expression language.
//!
//! All failures during lexing, parsing, or evaluation are reported as
//! [`ScriptError`], a single `thiserror` enum with one variant per kind named
//! in the language specification. [`ScriptError::kind`] exposes a `Copy`
//! [`ErrorKind`] so callers can match on error category without parsing
//! `Display` output.

use thiserror::Error;

use crate::symbol::Symbol;

/// Coarse-grained category of a [`ScriptError`], for callers that want to
/// branch on error kind without matching the full enum or its message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed token during lexing.
    LexError,
    /// Syntactic error during parsing.
    ParseError,
    /// Method not present in the receiver's method table.
    NoMethod,
    /// Arity mismatch on a native method call.
    ArgumentCount,
    /// An argument failed the expected type predicate.
    ArgumentType,
    /// A value was out of range or malformed for the operation.
    InvalidArgument,
    /// Generic type misuse not covered by a more specific kind.
    TypeError,
    /// `<=>` attempted between incompatible types.
    UnorderableTypes,
    /// A binary operator received incompatible operand types.
    UnsupportedOperand,
    /// `Hash#fetch` missed its key with no default supplied.
    KeyError,
}

/// The error type produced by the lexer, parser, and evaluator.
#[derive(Error, Debug, Clone)]
pub enum ScriptError {
    /// Malformed token (unterminated string/regex/interpolation, bad numeric literal).
    #[error("lex error at line {line}, column {column}: {message}")]
    LexError {
        /// Description of what went wrong.
        message: String,
        /// 1-indexed line of the offending byte.
        line: usize,
        /// 1-indexed column of the offending byte.
        column: usize,
    },

    /// Unexpected token or malformed construct while parsing.
    #[error("parse error at line {line}, column {column}: {message}")]
    ParseError {
        /// Description of what went wrong.
        message: String,
        /// 1-indexed line of the offending token.
        line: usize,
        /// 1-indexed column of the offending token.
        column: usize,
    },

    /// `name` is not present in `receiver_type`'s method table.
    #[error("undefined method `{name}` for {receiver_type}")]
    NoMethod {
        /// Type name of the receiver.
        receiver_type: String,
        /// The method name that was looked up.
        name: Symbol,
    },

    /// A native method was called with the wrong number of arguments.
    #[error("wrong number of arguments for `{method}` (given {given}, expected {expected})")]
    ArgumentCount {
        /// The method name.
        method: String,
        /// Number of arguments actually supplied.
        given: usize,
        /// Human-readable description of the expected arity, e.g. "0..1".
        expected: String,
    },

    /// An argument did not satisfy the expected type predicate.
    #[error("wrong argument type for `{method}`: {message}")]
    ArgumentType {
        /// The method name.
        method: String,
        /// Description of the mismatch.
        message: String,
    },

    /// A value was out of range or otherwise malformed for the operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Generic type misuse.
    #[error("type error: {0}")]
    TypeError(String),

    /// `<=>` requested between values whose types cannot be ordered against each other.
    #[error("unorderable types: {lhs} <=> {rhs}")]
    UnorderableTypes {
        /// Type name of the left operand.
        lhs: String,
        /// Type name of the right operand.
        rhs: String,
    },

    /// A binary operator was applied to operand types it does not support.
    #[error("unsupported operand types: {lhs} {op} {rhs}")]
    UnsupportedOperand {
        /// The operator's source spelling, e.g. `"+"`.
        op: &'static str,
        /// Type name of the left operand.
        lhs: String,
        /// Type name of the right operand.
        rhs: String,
    },

    /// `Hash#fetch` was called with a missing key and no default.
    #[error("key not found: {0}")]
    KeyError(String),
}

impl ScriptError {
    /// Returns the coarse-grained [`ErrorKind`] for this error, for callers
    /// that want to branch on category rather than match the full enum.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScriptError::LexError { .. } => ErrorKind::LexError,
            ScriptError::ParseError { .. } => ErrorKind::ParseError,
            ScriptError::NoMethod { .. } => ErrorKind::NoMethod,
            ScriptError::ArgumentCount { .. } => ErrorKind::ArgumentCount,
            ScriptError::ArgumentType { .. } => ErrorKind::ArgumentType,
            ScriptError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ScriptError::TypeError(_) => ErrorKind::TypeError,
            ScriptError::UnorderableTypes { .. } => ErrorKind::UnorderableTypes,
            ScriptError::UnsupportedOperand { .. } => ErrorKind::UnsupportedOperand,
            ScriptError::KeyError(_) => ErrorKind::KeyError,
        }
    }
}

/// Convenience alias for `Result`s produced by the lexer, parser, and evaluator.
pub type Result<T> = std::result::Result<T, ScriptError>;
