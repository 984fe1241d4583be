//! Lexical scope frames shared by the analyzer and the interpreter.
//!
//! A [`Scope`] is a handle to one frame. Frames own their bindings and hold
//! only a weak link to their parent, so the owner of the active scope (or a
//! [`ScopeGuard`] that saved it) keeps the chain alive. Variables are keyed by
//! name, functions by `(name, arity)`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::types::Type;

/// A resolved variable binding, as recorded by the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub render_name: String,
    pub ty: Type,
}

impl Variable {
    /// A binding whose generated name equals its source name.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        let name = name.into();
        Variable {
            render_name: name.clone(),
            name,
            ty,
        }
    }
}

/// A resolved function binding, as recorded by the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub render_name: String,
    pub parameter_types: Vec<Type>,
    pub return_type: Type,
}

impl Function {
    pub fn new(name: impl Into<String>, parameter_types: Vec<Type>, return_type: Type) -> Self {
        let name = name.into();
        Function {
            render_name: name.clone(),
            name,
            parameter_types,
            return_type,
        }
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}

/// Scope of analysis-time bindings.
pub type TypeScope = Scope<Variable, Function>;

/// A name was already bound in the frame it was being defined in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redefined(pub String);

struct Frame<V, F> {
    parent: Option<Weak<RefCell<Frame<V, F>>>>,
    variables: HashMap<String, V>,
    functions: HashMap<(String, usize), F>,
}

pub struct Scope<V, F>(Rc<RefCell<Frame<V, F>>>);

/// Non-owning handle to a frame, held by function bindings that close over
/// their defining scope.
pub struct WeakScope<V, F>(Weak<RefCell<Frame<V, F>>>);

impl<V, F> Clone for Scope<V, F> {
    fn clone(&self) -> Self {
        Scope(Rc::clone(&self.0))
    }
}

impl<V, F> Clone for WeakScope<V, F> {
    fn clone(&self) -> Self {
        WeakScope(Weak::clone(&self.0))
    }
}

impl<V, F> WeakScope<V, F> {
    pub fn upgrade(&self) -> Option<Scope<V, F>> {
        self.0.upgrade().map(Scope)
    }
}

impl<V, F> fmt::Debug for Scope<V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.0.borrow();
        let mut variables: Vec<&String> = frame.variables.keys().collect();
        variables.sort();
        f.debug_struct("Scope")
            .field("variables", &variables)
            .field("functions", &frame.functions.len())
            .finish()
    }
}

impl<V, F> fmt::Debug for WeakScope<V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakScope")
    }
}

impl<V: Clone, F: Clone> Scope<V, F> {
    pub fn root() -> Self {
        Scope::with_parent(None)
    }

    pub fn child(&self) -> Self {
        Scope::with_parent(Some(Rc::downgrade(&self.0)))
    }

    fn with_parent(parent: Option<Weak<RefCell<Frame<V, F>>>>) -> Self {
        Scope(Rc::new(RefCell::new(Frame {
            parent,
            variables: HashMap::new(),
            functions: HashMap::new(),
        })))
    }

    /// The enclosing frame, if it is still alive.
    pub fn parent(&self) -> Option<Self> {
        self.0.borrow().parent.as_ref()?.upgrade().map(Scope)
    }

    /// This frame followed by every live enclosing frame.
    fn ancestors(&self) -> impl Iterator<Item = Self> {
        std::iter::successors(Some(self.clone()), Scope::parent)
    }

    pub fn define_variable(&self, name: impl Into<String>, value: V) -> Result<(), Redefined> {
        let name = name.into();
        let mut frame = self.0.borrow_mut();
        if frame.variables.contains_key(&name) {
            return Err(Redefined(name));
        }
        frame.variables.insert(name, value);
        Ok(())
    }

    pub fn define_function(
        &self,
        name: impl Into<String>,
        arity: usize,
        function: F,
    ) -> Result<(), Redefined> {
        let key = (name.into(), arity);
        let mut frame = self.0.borrow_mut();
        if frame.functions.contains_key(&key) {
            return Err(Redefined(key.0));
        }
        frame.functions.insert(key, function);
        Ok(())
    }

    /// True when `name` is bound in this frame itself.
    pub fn has_local_variable(&self, name: &str) -> bool {
        self.0.borrow().variables.contains_key(name)
    }

    pub fn lookup_variable(&self, name: &str) -> Option<V> {
        self.ancestors().find_map(|scope| {
            let frame = scope.0.borrow();
            frame.variables.get(name).cloned()
        })
    }

    pub fn lookup_function(&self, name: &str, arity: usize) -> Option<F> {
        let key = (name.to_string(), arity);
        self.ancestors().find_map(|scope| {
            let frame = scope.0.borrow();
            frame.functions.get(&key).cloned()
        })
    }

    /// Overwrite the nearest binding of `name`. Returns false when no frame
    /// in the chain binds it.
    pub fn assign_variable(&self, name: &str, value: V) -> bool {
        for scope in self.ancestors() {
            let mut frame = scope.0.borrow_mut();
            if let Some(slot) = frame.variables.get_mut(name) {
                *slot = value;
                return true;
            }
        }
        false
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakScope<V, F> {
        WeakScope(Rc::downgrade(&self.0))
    }
}

/// Something that tracks an active scope which can be temporarily replaced.
pub trait Scoped {
    type Variable: Clone;
    type Function: Clone;

    fn scope_slot(&mut self) -> &mut Scope<Self::Variable, Self::Function>;
}

/// Makes `scope` the owner's active scope until dropped, then restores the
/// previous one. Restoration happens on every exit path, including `?`.
pub struct ScopeGuard<'a, T: Scoped> {
    owner: &'a mut T,
    saved: Option<Scope<T::Variable, T::Function>>,
}

impl<'a, T: Scoped> ScopeGuard<'a, T> {
    pub fn enter(owner: &'a mut T, scope: Scope<T::Variable, T::Function>) -> Self {
        let saved = std::mem::replace(owner.scope_slot(), scope);
        trace!("entered scope");
        ScopeGuard {
            owner,
            saved: Some(saved),
        }
    }
}

impl<T: Scoped> Deref for ScopeGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.owner
    }
}

impl<T: Scoped> DerefMut for ScopeGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.owner
    }
}

impl<T: Scoped> Drop for ScopeGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            *self.owner.scope_slot() = saved;
            trace!("left scope");
        }
    }
}
