use std::fmt::{Debug, Formatter};
use std::rc::Rc;
use crate::interpreter::lexer::Token;

/// Root of a parsed source unit.
///
/// The statements run directly in the environment handed to the evaluator,
/// so top-level definitions outlive the program that made them.
#[derive(Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Debug for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.statements.iter()
            .map(|stmt| format!("{:?}", stmt))
            .collect::<Vec<String>>().join(" "))
    }
}

/// A named function definition. Shared with every function value created from it.
#[derive(Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

impl Debug for FunctionDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn {}({}) {{ {} }}", self.name.source(),
               self.params.iter()
                   .map(|param| param.source().to_owned())
                   .collect::<Vec<String>>().join(", "),
               self.body.iter()
                   .map(|stmt| format!("{:?}", stmt))
                   .collect::<Vec<String>>().join(" "))
    }
}

#[derive(Clone, PartialEq)]
pub enum Stmt {
    Expression(Expr),
    Let {
        name: Token,
        value: Option<Expr>,
    },
    Block {
        token: Token,
        statements: Vec<Stmt>,
    },
    If {
        token: Token,
        condition: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    While {
        token: Token,
        condition: Expr,
        body: Box<Stmt>,
    },
    Function(Rc<FunctionDecl>),
    Return {
        token: Token,
        value: Option<Expr>,
    },
}

impl Debug for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Stmt::Expression(expr) => write!(f, "{:?};", expr),
            Stmt::Let { name, value: Some(value) } => write!(f, "let {} = {:?};", name.source(), value),
            Stmt::Let { name, value: None } => write!(f, "let {};", name.source()),
            Stmt::Block { statements, .. } =>
                write!(f, "{{ {} }}", statements.iter()
                    .map(|stmt| format!("{:?}", stmt))
                    .collect::<Vec<String>>().join(" ")),
            Stmt::If { condition, then, otherwise: Some(otherwise), .. } =>
                write!(f, "if ({:?}) {:?} else {:?}", condition, then, otherwise),
            Stmt::If { condition, then, otherwise: None, .. } =>
                write!(f, "if ({:?}) {:?}", condition, then),
            Stmt::While { condition, body, .. } => write!(f, "while ({:?}) {:?}", condition, body),
            Stmt::Function(decl) => write!(f, "{:?}", decl),
            Stmt::Return { value: Some(value), .. } => write!(f, "return {:?};", value),
            Stmt::Return { value: None, .. } => write!(f, "return;"),
        }
    }
}

#[derive(Clone, PartialEq)]
pub enum Expr {
    ConstantNumber(f64),
    ConstantString(String),
    ConstantBoolean(bool),
    ConstantNil,
    Identifier(Token),

    UnaryOperator {
        operator: Token,
        expr: Box<Expr>,
    },
    BinaryOperator {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Assignment {
        target: Token,
        value: Box<Expr>,
    },
    FunctionCall {
        callee: Box<Expr>,
        token: Token,
        args: Vec<Expr>,
    },
}

// Fully parenthesized, so the printed form shows how precedence grouped the operands
impl Debug for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::ConstantNumber(value) => write!(f, "{}", value),
            Expr::ConstantString(value) => write!(f, "'{}'", value),
            Expr::ConstantBoolean(value) => write!(f, "{}", value),
            Expr::ConstantNil => write!(f, "nil"),
            Expr::Identifier(value) => write!(f, "{}", value.source()),
            Expr::UnaryOperator { operator, expr } => write!(f, "({}{:?})", operator.source(), expr),
            Expr::BinaryOperator { left, operator, right } => write!(f, "({:?} {} {:?})", left, operator.source(), right),
            Expr::Assignment { target, value } => write!(f, "({} = {:?})", target.source(), value),
            Expr::FunctionCall { callee, args, .. } => {
                write!(f, "({:?}({}))", callee, args.iter()
                    .map(|expr| format!("{:?}", expr))
                    .collect::<Vec<String>>().join(", "))
            },
        }
    }
}
