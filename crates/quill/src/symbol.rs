// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Identifier interning.
//!
//! Every identifier, attribute name, and method name that passes through the
//! lexer or parser is interned into a [`Symbol`], a small `Copy` handle whose
//! equality is identity. Symbols are used as map keys throughout the object
//! model (method tables, scopes, hashes of `:symbol` literals) so that
//! comparing two identifiers never touches the underlying bytes.
//!
//! The table is process-wide and append-only: entries are created once and
//! live for the lifetime of the process, matching the "symbols live for
//! process lifetime" invariant.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use lazy_static::lazy_static;

/// An interned identifier. Two symbols are equal iff they were interned from
/// the same string; comparing symbols never re-compares bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

struct Interner {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl Interner {
    fn new() -> Self {
        Self {
            names: Vec::new(),
            ids: HashMap::new(),
        }
    }

    fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&id) = self.ids.get(s) {
            return Symbol(id);
        }
        let id = self.names.len() as u32;
        self.names.push(s.to_string());
        self.ids.insert(s.to_string(), id);
        Symbol(id)
    }

    fn resolve(&self, sym: Symbol) -> &str {
        &self.names[sym.0 as usize]
    }
}

lazy_static! {
    static ref INTERNER: Mutex<Interner> = Mutex::new(Interner::new());
}

impl Symbol {
    /// Interns `s`, returning the stable handle for it.
    pub fn intern(s: &str) -> Symbol {
        INTERNER.lock().unwrap().intern(s)
    }

    /// Returns the original string this symbol was interned from.
    ///
    /// Allocates a fresh `String` since the interner cannot hand out a
    /// reference tied to the lock guard's lifetime.
    pub fn as_str(self) -> String {
        INTERNER.lock().unwrap().resolve(self).to_string()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::intern(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol::intern(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_interns_to_same_symbol() {
        let a = Symbol::intern("foo");
        let b = Symbol::intern("foo");
        assert_eq!(a, b);
    }

    #[test]
    fn different_text_interns_to_different_symbols() {
        let a = Symbol::intern("foo");
        let b = Symbol::intern("bar");
        assert_ne!(a, b);
    }

    #[test]
    fn round_trips_through_as_str() {
        let sym = Symbol::intern("each_char");
        assert_eq!(sym.as_str(), "each_char");
    }
}
