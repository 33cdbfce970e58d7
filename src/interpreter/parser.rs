use std::rc::Rc;
use thiserror::Error;
use tracing::debug;
use crate::interpreter::ast::{Expr, FunctionDecl, Program, Stmt};
use crate::interpreter::lexer::{Token, TokenPos, TokenType};
use crate::util;


/// Most parameters a function may declare, and most arguments a call may pass.
pub const MAX_ARGUMENTS: usize = 255;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{pos} Expected {expected}, found {found}")]
pub struct ParseError {
    pub pos: TokenPos,
    pub expected: String,
    pub found: String,
}

impl ParseError {
    /// The message without the position prefix.
    pub fn message(&self) -> String {
        format!("Expected {}, found {}", self.expected, self.found)
    }
}

type ParseResult<T> = Result<T, ParseError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParserConfig {
    /// How deeply statements and expressions may nest before parsing fails.
    pub max_nesting: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig { max_nesting: 256 }
    }
}

/// Parses a complete token stream, as produced by [`tokenize`](crate::interpreter::lexer::tokenize).
pub fn parse(tokens: Vec<Token>) -> ParseResult<Program> {
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: std::vec::IntoIter<Token>,
    previous: Token, current: Token,

    config: ParserConfig,
    depth: usize,
    function_depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Parser {
        Parser::with_config(tokens, ParserConfig::default())
    }

    pub fn with_config(tokens: Vec<Token>, config: ParserConfig) -> Parser {
        let mut tokens = tokens.into_iter();
        let current = tokens.next()
            .unwrap_or_else(|| Token::new(TokenType::Eof, String::new(), TokenPos::begin(), TokenPos::begin()));

        Parser {
            tokens,
            previous: current.clone(), current,
            config,
            depth: 0,
            function_depth: 0,
        }
    }

    // Statement parsing

    pub fn parse(mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();

        while !self.is_eof() {
            statements.push(self.parse_statement()?);
        }

        debug!(count = statements.len(), "parsed top-level statements");
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        self.nested(|parser| {
            if parser.matches(TokenType::Let) {
                return parser.parse_let_statement();
            } else if parser.matches(TokenType::Fn) {
                return parser.parse_function_declaration();
            } else if parser.matches(TokenType::If) {
                return parser.parse_if_statement();
            } else if parser.matches(TokenType::While) {
                return parser.parse_while_statement();
            } else if parser.matches(TokenType::Return) {
                return parser.parse_return_statement();
            } else if parser.matches(TokenType::BracketLeft) {
                let token = parser.previous.clone();
                let statements = parser.parse_block()?;

                return Ok(Stmt::Block { token, statements });
            }

            let expr = parser.parse_expression()?;
            parser.expect_statement_end()?;

            Ok(Stmt::Expression(expr))
        })
    }

    fn parse_let_statement(&mut self) -> ParseResult<Stmt> {
        let name = self.expect(TokenType::Identifier, "variable name after 'let'")?;

        let value = if self.matches(TokenType::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        self.expect_statement_end()?;
        Ok(Stmt::Let { name, value })
    }

    fn parse_function_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.expect(TokenType::Identifier, "function name after 'fn'")?;
        self.expect(TokenType::ParenthesisLeft, "'(' after function name")?;

        let mut params: Vec<Token> = vec![];

        if !self.check(TokenType::ParenthesisRight) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    return Err(self.error_at_current(&format!("at most {} parameters", MAX_ARGUMENTS)));
                }

                let param = self.expect(TokenType::Identifier, "parameter name")?;

                if params.iter().any(|existing| existing.source() == param.source()) {
                    return Err(self.error_at(&param, "unique parameter names"));
                }

                params.push(param);

                if !self.matches(TokenType::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenType::ParenthesisRight, "')' after function parameters")?;
        self.expect(TokenType::BracketLeft, "'{' before function body")?;

        self.function_depth += 1;
        let body = self.parse_block();
        self.function_depth -= 1;

        Ok(Stmt::Function(Rc::new(FunctionDecl { name, params, body: body? })))
    }

    fn parse_if_statement(&mut self) -> ParseResult<Stmt> {
        let token = self.previous.clone();

        self.expect(TokenType::ParenthesisLeft, "'(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect(TokenType::ParenthesisRight, "')' after 'if' condition")?;

        let then = Box::new(self.parse_statement()?);

        let otherwise = if self.matches(TokenType::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If { token, condition, then, otherwise })
    }

    fn parse_while_statement(&mut self) -> ParseResult<Stmt> {
        let token = self.previous.clone();

        self.expect(TokenType::ParenthesisLeft, "'(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect(TokenType::ParenthesisRight, "')' after 'while' condition")?;

        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::While { token, condition, body })
    }

    fn parse_return_statement(&mut self) -> ParseResult<Stmt> {
        let token = self.previous.clone();

        if self.function_depth == 0 {
            return Err(self.error_at(&token, "'return' only inside a function body"));
        }

        let value = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.expect_statement_end()?;
        Ok(Stmt::Return { token, value })
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(TokenType::BracketRight) && !self.is_eof() {
            statements.push(self.parse_statement()?);
        }

        self.expect(TokenType::BracketRight, "'}' after block")?;
        Ok(statements)
    }

    // Expression parsing

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.nested(Parser::parse_assignment)
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_or()?;

        if self.matches(TokenType::Assign) {
            let equals = self.previous.clone();
            let value = self.nested(Parser::parse_assignment)?;

            return match expr {
                Expr::Identifier(target) => Ok(Expr::Assignment { target, value: Box::new(value) }),
                _ => Err(ParseError {
                    pos: *equals.start(),
                    expected: String::from("variable name before '='"),
                    found: format!("`{:?}`", expr),
                }),
            };
        }

        Ok(expr)
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        self.parse_left_associative(&[TokenType::Or, TokenType::ShortcircuitOr], Parser::parse_and)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        self.parse_left_associative(&[TokenType::And, TokenType::ShortcircuitAnd], Parser::parse_equality)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        self.parse_left_associative(&[TokenType::Equal, TokenType::NotEqual], Parser::parse_comparison)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        self.parse_left_associative(&[TokenType::Less, TokenType::LessEqual, TokenType::Greater, TokenType::GreaterEqual],
            Parser::parse_term)
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        self.parse_left_associative(&[TokenType::Plus, TokenType::Minus], Parser::parse_factor)
    }

    fn parse_factor(&mut self) -> ParseResult<Expr> {
        self.parse_left_associative(&[TokenType::Multiply, TokenType::Divide], Parser::parse_unary)
    }

    // Every folded operator nests the tree one level deeper on the left,
    // so long chains count against the nesting limit too
    fn parse_left_associative(&mut self, operators: &[TokenType], operand: fn(&mut Parser) -> ParseResult<Expr>) -> ParseResult<Expr> {
        let mut expr = operand(self)?;
        let mut chained = 0;

        while self.matches_any(operators) {
            let operator = self.previous.clone();

            chained += 1;
            self.check_chain(chained)?;

            let right = operand(self)?;
            expr = Expr::BinaryOperator { left: Box::new(expr), operator, right: Box::new(right) };
        }

        Ok(expr)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.matches_any(&[TokenType::Minus, TokenType::Not]) {
            let operator = self.previous.clone();
            let right = self.nested(Parser::parse_unary)?;

            return Ok(Expr::UnaryOperator { operator, expr: Box::new(right) });
        }

        self.parse_call()
    }

    fn parse_call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        let mut chained = 0;

        while self.matches(TokenType::ParenthesisLeft) {
            chained += 1;
            self.check_chain(chained)?;

            expr = self.finish_call(expr)?;
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let paren_left = self.previous.clone();

        let mut arguments = vec![];

        if !self.check(TokenType::ParenthesisRight) {
            arguments.push(self.parse_expression()?);

            while self.matches(TokenType::Comma) {
                if arguments.len() >= MAX_ARGUMENTS {
                    return Err(self.error_at_current(&format!("at most {} call arguments", MAX_ARGUMENTS)));
                }

                arguments.push(self.parse_expression()?);
            }
        }

        self.expect(TokenType::ParenthesisRight, "')' after function call arguments")?;
        Ok(Expr::FunctionCall { callee: Box::new(callee), token: paren_left, args: arguments })
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        if self.matches(TokenType::Number) {
            let number = self.previous.clone();

            return match number.source().parse::<f64>() {
                Ok(value) => Ok(Expr::ConstantNumber(value)),
                Err(_) => Err(self.error_at(&number, "number literal")),
            };
        } else if self.matches(TokenType::String) {
            let string = self.previous.clone();

            return match string.string_value() {
                Some(value) => Ok(Expr::ConstantString(value)),
                None => Err(self.error_at(&string, "string literal")),
            };
        } else if self.matches(TokenType::True) {
            return Ok(Expr::ConstantBoolean(true));
        } else if self.matches(TokenType::False) {
            return Ok(Expr::ConstantBoolean(false));
        } else if self.matches(TokenType::Nil) {
            return Ok(Expr::ConstantNil);
        } else if self.matches(TokenType::Identifier) {
            return Ok(Expr::Identifier(self.previous.clone()));
        } else if self.matches(TokenType::ParenthesisLeft) {
            let expr = self.parse_expression()?;
            self.expect(TokenType::ParenthesisRight, "')' after expression")?;

            return Ok(expr);
        }

        Err(self.error_at_current("expression"))
    }

    // Token handling

    fn consume(&mut self) {
        let next = match self.tokens.next() {
            Some(token) => token,
            None => Token::new(TokenType::Eof, String::new(), *self.current.end(), *self.current.end()),
        };

        self.previous = std::mem::replace(&mut self.current, next);
    }

    fn expect(&mut self, token_type: TokenType, expected: &str) -> ParseResult<Token> {
        if self.current.token_type() == token_type {
            self.consume();
            return Ok(self.previous.clone());
        }

        Err(self.error_at_current(expected))
    }

    // A terminating ';' may be left out before '}' and at end of input
    fn expect_statement_end(&mut self) -> ParseResult<()> {
        if self.matches(TokenType::Semicolon) || self.check(TokenType::BracketRight) || self.is_eof() {
            Ok(())
        } else {
            Err(self.error_at_current("';' after statement"))
        }
    }

    fn at_statement_end(&self) -> bool {
        self.check(TokenType::Semicolon) || self.check(TokenType::BracketRight) || self.is_eof()
    }

    fn matches(&mut self, token_type: TokenType) -> bool { // Should be called "match", but that's a keyword
        if !self.check(token_type) {
            return false;
        }

        self.consume();
        true
    }

    fn matches_any(&mut self, token_types: &[TokenType]) -> bool {
        for token_type in token_types {
            if self.check(*token_type) {
                self.consume();
                return true;
            }
        }

        false
    }

    #[inline]
    fn check(&self, token_type: TokenType) -> bool {
        self.current.token_type() == token_type
    }

    fn is_eof(&self) -> bool {
        self.current.token_type() == TokenType::Eof
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Parser) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= self.config.max_nesting {
            return Err(self.nesting_error(&self.current));
        }

        self.depth += 1;
        let result = util::ensure_sufficient_stack(|| f(self));
        self.depth -= 1;

        result
    }

    // Checked after consuming the operator or '(' that extends a chain
    fn check_chain(&self, chained: usize) -> ParseResult<()> {
        if self.depth + chained > self.config.max_nesting {
            return Err(self.nesting_error(&self.previous));
        }

        Ok(())
    }

    // Error handling

    fn nesting_error(&self, token: &Token) -> ParseError {
        self.error_at(token, &format!("at most {} levels of nesting", self.config.max_nesting))
    }

    fn error_at_current(&self, expected: &str) -> ParseError {
        self.error_at(&self.current, expected)
    }

    fn error_at(&self, token: &Token, expected: &str) -> ParseError {
        ParseError {
            pos: *token.start(),
            expected: expected.to_owned(),
            found: token.to_string(),
        }
    }
}
