use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;
use crate::interpreter::ast::FunctionDecl;
use crate::interpreter::environment::EnvRef;

#[derive(Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    Nil,
    Function(Rc<Function>),
    Builtin(Builtin),
}

/// A user-defined function together with the scope it was defined in.
pub struct Function {
    pub decl: Rc<FunctionDecl>,
    pub closure: EnvRef,
}

impl Function {
    pub fn name(&self) -> &str {
        self.decl.name.source()
    }

    pub fn arity(&self) -> usize {
        self.decl.params.len()
    }

    /// Same definition closing over the same scope. Reading a function out of
    /// its own defining scope yields a fresh handle, so pointer identity of the
    /// `Function` itself is not meaningful.
    pub fn is_same(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.decl, &other.decl) && Rc::ptr_eq(&self.closure, &other.closure)
    }
}

/// Functions provided by the host rather than written in the language.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    /// Writes its arguments, space separated, followed by a newline.
    Print,
}

impl Builtin {
    pub const ALL: [Builtin; 1] = [Builtin::Print];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Nil => "nil",
            Value::Function(_) | Value::Builtin(_) => "function",
        }
    }

    /// `nil` and `false` are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(left), Value::Number(right)) => left == right,
            (Value::String(left), Value::String(right)) => left == right,
            (Value::Boolean(left), Value::Boolean(right)) => left == right,
            (Value::Nil, Value::Nil) => true,
            (Value::Function(left), Value::Function(right)) => left.is_same(right),
            (Value::Builtin(left), Value::Builtin(right)) => left == right,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(value) => write!(f, "{}", value),
            Value::String(value) => f.write_str(value),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Nil => f.write_str("nil"),
            Value::Function(function) => write!(f, "<fn {}>", function.name()),
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name()),
        }
    }
}

// Never descends into a closure's environment, which may contain the function itself
impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(value) => write!(f, "'{}'", value.escape_default()),
            _ => write!(f, "{}", self),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}
