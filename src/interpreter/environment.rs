use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use thiserror::Error;
use crate::interpreter::ast::FunctionDecl;
use crate::interpreter::value::{Builtin, Function, Value};

/// Shared handle to a scope. Closures and child scopes keep their parents alive.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Undefined variable '{0}'")]
pub struct UnboundName(pub String);

#[derive(Debug)]
enum Binding {
    Value(Value),
    /// A function closing over the scope that binds it. Only the declaration
    /// is stored, so the scope does not keep itself alive.
    OwnFunction(Rc<FunctionDecl>),
}

#[derive(Debug)]
pub struct Environment {
    variables: HashMap<String, Binding>,
    parent: Option<EnvRef>,
    this: Weak<RefCell<Environment>>,
}

impl Environment {
    fn new(variables: HashMap<String, Binding>, parent: Option<EnvRef>) -> EnvRef {
        Rc::new_cyclic(|this| RefCell::new(Environment {
            variables,
            parent,
            this: Weak::clone(this),
        }))
    }

    /// A root scope with the built-in functions bound.
    pub fn new_global() -> EnvRef {
        let environment = Environment::new_empty();

        for builtin in Builtin::ALL {
            environment.borrow_mut().define(builtin.name(), Value::Builtin(builtin));
        }

        environment
    }

    /// A root scope with nothing bound.
    pub fn new_empty() -> EnvRef {
        Environment::new(HashMap::new(), None)
    }

    pub fn new_with_parent(parent: EnvRef) -> EnvRef {
        Environment::new(HashMap::new(), Some(parent))
    }

    /// Binds `name` in this scope only, replacing any binding it already has here.
    pub fn define(&mut self, name: &str, value: Value) {
        let binding = self.bind(value);
        self.variables.insert(name.to_owned(), binding);
    }

    /// Resolves `name` in the nearest scope that binds it.
    pub fn get(&self, name: &str) -> Result<Value, UnboundName> {
        if let Some(binding) = self.variables.get(name) {
            return self.resolve(binding).ok_or_else(|| UnboundName(name.to_owned()));
        }

        match &self.parent {
            Some(parent) => parent.borrow().get(name),
            None => Err(UnboundName(name.to_owned())),
        }
    }

    /// Overwrites the nearest existing binding of `name`. Never creates one.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), UnboundName> {
        if self.variables.contains_key(name) {
            let binding = self.bind(value);
            self.variables.insert(name.to_owned(), binding);
            return Ok(());
        }

        match &self.parent {
            Some(parent) => parent.borrow_mut().assign(name, value),
            None => Err(UnboundName(name.to_owned())),
        }
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn parent(&self) -> Option<EnvRef> {
        self.parent.as_ref().map(Rc::clone)
    }

    /// Unbinds everything in this scope. Hosts call this on their root scope
    /// when they are done with it, which frees closures stored there.
    pub fn clear(&mut self) {
        self.variables.clear();
    }

    /// Copies the whole chain of scopes. Functions defined in a copied scope
    /// close over the copy; other values are cloned shallowly.
    pub fn deep_copy(this: &EnvRef) -> EnvRef {
        let this_borrow = this.borrow();

        let variables = this_borrow.variables.iter()
            .map(|(name, binding)| (name.clone(), match binding {
                Binding::Value(value) => Binding::Value(value.clone()),
                Binding::OwnFunction(decl) => Binding::OwnFunction(Rc::clone(decl)),
            }))
            .collect();

        Environment::new(variables, this_borrow.parent.as_ref().map(Environment::deep_copy))
    }

    fn bind(&self, value: Value) -> Binding {
        match value {
            Value::Function(function) if std::ptr::eq(function.closure.as_ptr() as *const Environment, self) =>
                Binding::OwnFunction(Rc::clone(&function.decl)),
            value => Binding::Value(value),
        }
    }

    fn resolve(&self, binding: &Binding) -> Option<Value> {
        match binding {
            Binding::Value(value) => Some(value.clone()),
            Binding::OwnFunction(decl) => self.this.upgrade().map(|closure| Value::Function(Rc::new(Function {
                decl: Rc::clone(decl),
                closure,
            }))),
        }
    }
}
