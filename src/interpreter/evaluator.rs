use std::io::Write;
use std::rc::Rc;
use tracing::{debug, trace};
use crate::interpreter::ast::{Expr, Program, Stmt};
use crate::interpreter::environment::{EnvRef, Environment};
use crate::interpreter::error::{RuntimeError, RuntimeErrorKind};
use crate::interpreter::lexer::{Token, TokenPos, TokenType};
use crate::interpreter::value::{Builtin, Function, Value};
use crate::util;

#[cfg(test)]
mod tests;

type EvalResult<T> = Result<T, RuntimeError>;

/// Evaluates `program` in `environment` with the default limits, sending `print` output to `out`.
pub fn evaluate<W: Write>(program: &Program, environment: &EnvRef, out: W) -> EvalResult<Value> {
    Evaluator::new(out).evaluate(program, environment)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// How many function calls may be active at once before evaluation fails
    /// with [`RuntimeErrorKind::StackOverflow`].
    pub max_call_depth: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig { max_call_depth: 1000 }
    }
}

/// Outcome of running a statement.
///
/// `Return` travels up through blocks, branches and loops, skipping the
/// remaining statements, until the enclosing call turns it back into a value.
#[derive(Debug, PartialEq)]
enum Flow {
    Normal(Value),
    Return(Value),
}

/// Tree-walking evaluator. `print` writes to `out`.
pub struct Evaluator<W: Write> {
    out: W,
    config: EvaluatorConfig,
    call_depth: usize,
}

impl<W: Write> Evaluator<W> {
    pub fn new(out: W) -> Evaluator<W> {
        Evaluator::with_config(out, EvaluatorConfig::default())
    }

    pub fn with_config(out: W, config: EvaluatorConfig) -> Evaluator<W> {
        Evaluator {
            out,
            config,
            call_depth: 0,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs `program` directly in `environment` and yields the value of the
    /// last top-level statement.
    pub fn evaluate(&mut self, program: &Program, environment: &EnvRef) -> EvalResult<Value> {
        self.call_depth = 0;
        let mut result = Value::Nil;

        for stmt in &program.statements {
            match self.execute(stmt, environment)? {
                Flow::Normal(value) => result = value,
                Flow::Return(value) => return Ok(value),
            }
        }

        debug!(result = ?result, "evaluated program");
        Ok(result)
    }

    // Statements

    fn execute(&mut self, stmt: &Stmt, environment: &EnvRef) -> EvalResult<Flow> {
        util::ensure_sufficient_stack(|| self.execute_impl(stmt, environment))
    }

    fn execute_impl(&mut self, stmt: &Stmt, environment: &EnvRef) -> EvalResult<Flow> {
        match stmt {
            Stmt::Expression(expr) => Ok(Flow::Normal(self.evaluate_expr(expr, environment)?)),
            Stmt::Let { name, value } => {
                let value = match value {
                    Some(expr) => self.evaluate_expr(expr, environment)?,
                    None => Value::Nil,
                };

                environment.borrow_mut().define(name.source(), value);
                Ok(Flow::Normal(Value::Nil))
            },
            Stmt::Block { statements, .. } => {
                let scope = Environment::new_with_parent(Rc::clone(environment));
                self.execute_block(statements, &scope)
            },
            Stmt::If { condition, then, otherwise, .. } => {
                if self.evaluate_expr(condition, environment)?.is_truthy() {
                    self.execute(then, environment)
                } else if let Some(otherwise) = otherwise {
                    self.execute(otherwise, environment)
                } else {
                    Ok(Flow::Normal(Value::Nil))
                }
            },
            Stmt::While { condition, body, .. } => {
                while self.evaluate_expr(condition, environment)?.is_truthy() {
                    let scope = Environment::new_with_parent(Rc::clone(environment));

                    let flow = match body.as_ref() {
                        Stmt::Block { statements, .. } => self.execute_block(statements, &scope)?,
                        other => self.execute(other, &scope)?,
                    };

                    if let Flow::Return(_) = flow {
                        return Ok(flow);
                    }
                }

                Ok(Flow::Normal(Value::Nil))
            },
            Stmt::Function(decl) => {
                let function = Value::Function(Rc::new(Function {
                    decl: Rc::clone(decl),
                    closure: Rc::clone(environment),
                }));

                environment.borrow_mut().define(decl.name.source(), function);
                Ok(Flow::Normal(Value::Nil))
            },
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate_expr(expr, environment)?,
                    None => Value::Nil,
                };

                Ok(Flow::Return(value))
            },
        }
    }

    fn execute_block(&mut self, statements: &[Stmt], environment: &EnvRef) -> EvalResult<Flow> {
        let mut last = Value::Nil;

        for stmt in statements {
            match self.execute(stmt, environment)? {
                Flow::Normal(value) => last = value,
                returning @ Flow::Return(_) => return Ok(returning),
            }
        }

        Ok(Flow::Normal(last))
    }

    // Expressions

    pub fn evaluate_expr(&mut self, expr: &Expr, environment: &EnvRef) -> EvalResult<Value> {
        util::ensure_sufficient_stack(|| self.evaluate_expr_impl(expr, environment))
    }

    fn evaluate_expr_impl(&mut self, expr: &Expr, environment: &EnvRef) -> EvalResult<Value> {
        match expr {
            Expr::ConstantNumber(value) => Ok(Value::Number(*value)),
            Expr::ConstantString(value) => Ok(Value::String(value.clone())),
            Expr::ConstantBoolean(value) => Ok(Value::Boolean(*value)),
            Expr::ConstantNil => Ok(Value::Nil),
            Expr::Identifier(name) => environment.borrow().get(name.source())
                .map_err(|_| RuntimeError::undefined(*name.start(), name.source())),
            Expr::UnaryOperator { operator, expr } => {
                let value = self.evaluate_expr(expr, environment)?;
                Self::unary_operation(operator, value)
            },
            Expr::BinaryOperator { left, operator, right } => {
                let left = self.evaluate_expr(left, environment)?;

                match operator.token_type() {
                    TokenType::And | TokenType::ShortcircuitAnd => {
                        if !left.is_truthy() {
                            return Ok(left);
                        }

                        self.evaluate_expr(right, environment)
                    },
                    TokenType::Or | TokenType::ShortcircuitOr => {
                        if left.is_truthy() {
                            return Ok(left);
                        }

                        self.evaluate_expr(right, environment)
                    },
                    _ => {
                        let right = self.evaluate_expr(right, environment)?;
                        Self::binary_operation(operator, left, right)
                    },
                }
            },
            Expr::Assignment { target, value } => {
                let value = self.evaluate_expr(value, environment)?;

                environment.borrow_mut().assign(target.source(), value.clone())
                    .map_err(|_| RuntimeError::new(RuntimeErrorKind::NameError, *target.start(),
                        format!("Cannot assign to undefined variable '{}'", target.source())))?;

                Ok(value)
            },
            Expr::FunctionCall { callee, token, args } => {
                let callee = self.evaluate_expr(callee, environment)?;

                let mut arguments = Vec::with_capacity(args.len());

                for arg in args {
                    arguments.push(self.evaluate_expr(arg, environment)?);
                }

                self.call(callee, arguments, token)
            },
        }
    }

    fn unary_operation(operator: &Token, value: Value) -> EvalResult<Value> {
        match (operator.token_type(), value) {
            (TokenType::Minus, Value::Number(value)) => Ok(Value::Number(-value)),
            (TokenType::Minus, value) => Err(RuntimeError::type_error(*operator.start(),
                format!("Operand of '-' must be a number, found {}", value.type_name()))),
            (_, value) => Ok(Value::Boolean(!value.is_truthy())),
        }
    }

    fn binary_operation(operator: &Token, left: Value, right: Value) -> EvalResult<Value> {
        let pos = *operator.start();
        let token_type = operator.token_type();

        match token_type {
            TokenType::Equal => Ok(Value::Boolean(left == right)),
            TokenType::NotEqual => Ok(Value::Boolean(left != right)),

            TokenType::Plus => match (left, right) {
                (Value::Number(left), Value::Number(right)) => Ok(Value::Number(left + right)),
                (Value::String(mut left), Value::String(right)) => {
                    left.push_str(&right);
                    Ok(Value::String(left))
                },
                (left, right) => Err(Self::operand_error(operator, "two numbers or two strings", &left, &right)),
            },

            TokenType::Minus | TokenType::Multiply | TokenType::Divide => match (left, right) {
                (Value::Number(left), Value::Number(right)) => match token_type {
                    TokenType::Minus => Ok(Value::Number(left - right)),
                    TokenType::Multiply => Ok(Value::Number(left * right)),
                    _ if right == 0.0 => Err(RuntimeError::new(RuntimeErrorKind::DivisionByZeroError, pos, "Division by zero")),
                    _ => Ok(Value::Number(left / right)),
                },
                (left, right) => Err(Self::operand_error(operator, "numbers", &left, &right)),
            },

            _ => match (&left, &right) {
                (Value::Number(left), Value::Number(right)) => Ok(Value::Boolean(compare(token_type, left, right))),
                (Value::String(left), Value::String(right)) => Ok(Value::Boolean(compare(token_type, left, right))),
                _ => Err(Self::operand_error(operator, "two numbers or two strings", &left, &right)),
            },
        }
    }

    fn operand_error(operator: &Token, expected: &str, left: &Value, right: &Value) -> RuntimeError {
        RuntimeError::type_error(*operator.start(), format!("Operands of '{}' must be {}, found {} and {}",
            operator.source(), expected, left.type_name(), right.type_name()))
    }

    // Calls

    fn call(&mut self, callee: Value, arguments: Vec<Value>, token: &Token) -> EvalResult<Value> {
        let pos = *token.start();

        let function = match callee {
            Value::Function(function) => function,
            Value::Builtin(builtin) => return self.call_builtin(builtin, arguments, pos),
            other => return Err(RuntimeError::type_error(pos,
                format!("Can only call functions, found {}", other.type_name()))),
        };

        if arguments.len() != function.arity() {
            return Err(RuntimeError::new(RuntimeErrorKind::ArityError, pos,
                format!("'{}' expects {} argument(s), got {}", function.name(), function.arity(), arguments.len())));
        }

        if self.call_depth >= self.config.max_call_depth {
            return Err(RuntimeError::new(RuntimeErrorKind::StackOverflow, pos,
                format!("Maximum call depth of {} exceeded calling '{}'", self.config.max_call_depth, function.name())));
        }

        let scope = Environment::new_with_parent(Rc::clone(&function.closure));

        {
            let mut scope_borrow = scope.borrow_mut();

            for (param, argument) in function.decl.params.iter().zip(arguments) {
                scope_borrow.define(param.source(), argument);
            }
        }

        trace!(function = function.name(), depth = self.call_depth, "calling function");

        self.call_depth += 1;
        let flow = self.execute_block(&function.decl.body, &scope);
        self.call_depth -= 1;

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal(_) => Ok(Value::Nil),
        }
    }

    fn call_builtin(&mut self, builtin: Builtin, arguments: Vec<Value>, pos: TokenPos) -> EvalResult<Value> {
        match builtin {
            Builtin::Print => {
                let line = arguments.iter()
                    .map(Value::to_string)
                    .collect::<Vec<String>>().join(" ");

                writeln!(self.out, "{}", line)
                    .map_err(|err| RuntimeError::new(RuntimeErrorKind::OutputError, pos, err.to_string()))?;

                Ok(Value::Nil)
            },
        }
    }
}

fn compare<T: PartialOrd + ?Sized>(token_type: TokenType, left: &T, right: &T) -> bool {
    match token_type {
        TokenType::Less => left < right,
        TokenType::LessEqual => left <= right,
        TokenType::Greater => left > right,
        _ => left >= right,
    }
}
