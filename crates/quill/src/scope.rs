// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The chained variable environment the evaluator threads through a render.
//!
//! A [`Scope`] is stack-scoped to a single evaluation: it exclusively owns
//! its local-binding map and holds a non-owning (`Rc`, not a back-mutating
//! pointer) reference to its parent and to the view model. Blocks capture a
//! `Scope` by `Rc` so closures observe live mutations made by the code that
//! created them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Result;
use crate::object::{Invoker, Object, ViewModel};
use crate::symbol::Symbol;

/// A single frame of the variable environment.
#[derive(Debug)]
pub struct Scope {
    locals: RefCell<HashMap<Symbol, Object>>,
    parent: Option<Rc<Scope>>,
    view_model: Rc<dyn ViewModel>,
}

impl Scope {
    /// Creates the root scope of a render, with no parent.
    pub fn root(view_model: Rc<dyn ViewModel>) -> Rc<Scope> {
        Rc::new(Scope {
            locals: RefCell::new(HashMap::new()),
            parent: None,
            view_model,
        })
    }

    /// Creates a child scope (e.g. for a block invocation), sharing the
    /// same view model.
    pub fn child(parent: &Rc<Scope>) -> Rc<Scope> {
        Rc::new(Scope {
            locals: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
            view_model: Rc::clone(&parent.view_model),
        })
    }

    /// `self()` — the view model's own self object.
    pub fn self_object(&self) -> Object {
        self.view_model.self_object()
    }

    /// The view model backing this scope chain.
    pub fn view_model(&self) -> &Rc<dyn ViewModel> {
        &self.view_model
    }

    /// Searches locals, then the parent chain, then falls back to a
    /// zero-argument method call on `self`.
    pub fn get(&self, sym: Symbol, invoker: &dyn Invoker) -> Result<Object> {
        if let Some(v) = self.locals.borrow().get(&sym) {
            return Ok(v.clone());
        }
        if let Some(parent) = &self.parent {
            if parent.has_local(sym) {
                return parent.get(sym, invoker);
            }
        }
        let self_obj = self.view_model.self_object();
        self_obj.call_method(sym, &[], invoker, &crate::ast::DispatchCache::new())
    }

    fn has_local(&self, sym: Symbol) -> bool {
        self.locals.borrow().contains_key(&sym) || self.parent.as_ref().map_or(false, |p| p.has_local(sym))
    }

    /// Writes to the innermost scope that already has `sym` bound, or
    /// creates it in this scope.
    pub fn set(&self, sym: Symbol, value: Object) {
        if self.locals.borrow().contains_key(&sym) {
            self.locals.borrow_mut().insert(sym, value);
            return;
        }
        if let Some(parent) = &self.parent {
            if parent.has_local(sym) {
                parent.set(sym, value);
                return;
            }
        }
        self.locals.borrow_mut().insert(sym, value);
    }

    /// Directly binds `sym` in this scope, used to bind block parameters
    /// without walking the parent chain.
    pub fn bind_local(&self, sym: Symbol, value: Object) {
        self.locals.borrow_mut().insert(sym, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::NullInvoker;
    use crate::object::MethodTable;
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
        fn get_attr(&self, _name: Symbol) -> Result<Object> {
            Ok(Object::Nil)
        }
        fn get_constant(&self, _name: Symbol) -> Result<Object> {
            Ok(Object::Nil)
        }
        fn method_table(&self) -> &MethodTable {
            &TABLE
        }
    }

    #[test]
    fn set_writes_to_scope_already_holding_binding() {
        let root = Scope::root(Rc::new(TestViewModel));
        root.bind_local(Symbol::intern("x"), Object::Number(1.0));
        let child = Scope::child(&root);
        child.set(Symbol::intern("x"), Object::Number(2.0));
        assert!(root.get(Symbol::intern("x"), &NullInvoker).unwrap().eq_value(&Object::Number(2.0)));
    }

    #[test]
    fn set_creates_binding_in_current_scope_when_unbound_anywhere() {
        let root = Scope::root(Rc::new(TestViewModel));
        let child = Scope::child(&root);
        child.set(Symbol::intern("y"), Object::Number(3.0));
        assert!(!root.has_local(Symbol::intern("y")));
        assert!(child.get(Symbol::intern("y"), &NullInvoker).unwrap().eq_value(&Object::Number(3.0)));
    }
}
