use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::Chars;
use lazy_static::lazy_static;
use thiserror::Error;
use tracing::debug;
use crate::util;


lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, TokenType> = HashMap::from([
        ("let", TokenType::Let),
        ("fn", TokenType::Fn),
        ("if", TokenType::If),
        ("else", TokenType::Else),
        ("while", TokenType::While),
        ("return", TokenType::Return),
        ("and", TokenType::And),
        ("or", TokenType::Or),
        ("true", TokenType::True),
        ("false", TokenType::False),
        ("nil", TokenType::Nil),
    ]);
}

/// Looks up `name` in the reserved-word set.
pub fn keyword(name: &str) -> Option<TokenType> {
    KEYWORDS.get(name).copied()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenPos {
    pub line: u32,
    pub column: u32,
}

impl TokenPos {
    pub fn new(line: u32, column: u32) -> TokenPos {
        TokenPos { line, column }
    }

    pub fn begin() -> TokenPos {
        TokenPos::new(1, 1)
    }
}

impl Display for TokenPos {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[line {} column {}]", self.line, self.column)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenType {
    ParenthesisLeft, ParenthesisRight,
    BracketLeft, BracketRight,
    Comma, Semicolon,

    Assign, Equal,
    Not, NotEqual,
    Greater, GreaterEqual,
    Less, LessEqual,

    Plus, Minus,
    Multiply, Divide,

    ShortcircuitAnd, ShortcircuitOr,

    Identifier,
    Number,
    String,

    // Keywords
    Let, Fn,
    If, Else,
    While, Return,
    And, Or,
    True, False, Nil,

    // EOF
    Eof,
}

/// Coarse classification of a [`TokenType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Keyword,
    Operator,
    Punctuation,
    Eof,
}

impl TokenType {
    pub fn kind(self) -> TokenKind {
        match self {
            TokenType::ParenthesisLeft | TokenType::ParenthesisRight
            | TokenType::BracketLeft | TokenType::BracketRight
            | TokenType::Comma | TokenType::Semicolon => TokenKind::Punctuation,

            TokenType::Assign | TokenType::Equal
            | TokenType::Not | TokenType::NotEqual
            | TokenType::Greater | TokenType::GreaterEqual
            | TokenType::Less | TokenType::LessEqual
            | TokenType::Plus | TokenType::Minus
            | TokenType::Multiply | TokenType::Divide
            | TokenType::ShortcircuitAnd | TokenType::ShortcircuitOr => TokenKind::Operator,

            TokenType::Identifier => TokenKind::Identifier,
            TokenType::Number => TokenKind::Number,
            TokenType::String => TokenKind::String,

            TokenType::Let | TokenType::Fn
            | TokenType::If | TokenType::Else
            | TokenType::While | TokenType::Return
            | TokenType::And | TokenType::Or
            | TokenType::True | TokenType::False | TokenType::Nil => TokenKind::Keyword,

            TokenType::Eof => TokenKind::Eof,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    token_type: TokenType,
    source: String,
    start: TokenPos, end: TokenPos,
}

impl Token {
    pub fn new(token_type: TokenType, source: String, start: TokenPos, end: TokenPos) -> Token {
        Token {
            token_type, source,
            start, end
        }
    }

    pub fn token_type(&self) -> TokenType { self.token_type }
    pub fn kind(&self) -> TokenKind { self.token_type.kind() }
    pub fn source(&self) -> &str { &self.source }
    pub fn start(&self) -> &TokenPos { &self.start }
    pub fn end(&self) -> &TokenPos { &self.end }

    /// Decoded contents of a string literal, without the quotes.
    ///
    /// Returns `None` for any other token type. The escapes were validated
    /// while scanning, so unknown escapes cannot occur here.
    pub fn string_value(&self) -> Option<String> {
        if self.token_type != TokenType::String {
            return None;
        }

        let inner = self.source.strip_prefix('\'')?.strip_suffix('\'')?;
        let mut value = String::with_capacity(inner.len());
        let mut chars = inner.chars();

        while let Some(c) = chars.next() {
            if c != '\\' {
                value.push(c);
                continue;
            }

            match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(other) => value.push(other),
                None => {},
            }
        }

        Some(value)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.token_type {
            TokenType::Eof => f.write_str("end of input"),
            _ => write!(f, "'{}'", self.source),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexerError {
    #[error("{0} Unexpected character '{1}'")]
    UnexpectedCharacter(TokenPos, char),
    #[error("{pos} Unterminated string")]
    UnterminatedString {
        pos: TokenPos,
    },
    #[error("{pos} Unterminated block comment")]
    UnterminatedComment {
        pos: TokenPos,
    },
    #[error("{pos} Invalid escape sequence '\\{escape}'")]
    InvalidEscape {
        pos: TokenPos,
        escape: char,
    },
}

impl LexerError {
    pub fn get_pos(&self) -> TokenPos {
        match self {
            LexerError::UnexpectedCharacter(pos, _) => *pos,
            LexerError::UnterminatedString { pos } => *pos,
            LexerError::UnterminatedComment { pos } => *pos,
            LexerError::InvalidEscape { pos, .. } => *pos,
        }
    }

    /// The message without the position prefix.
    pub fn message(&self) -> String {
        match self {
            LexerError::UnexpectedCharacter(_, c) => format!("Unexpected character '{}'", c),
            LexerError::UnterminatedString { .. } => String::from("Unterminated string"),
            LexerError::UnterminatedComment { .. } => String::from("Unterminated block comment"),
            LexerError::InvalidEscape { escape, .. } => format!("Invalid escape sequence '\\{}'", escape),
        }
    }
}

type LexerResult<T> = Result<T, LexerError>;

/// Scans the whole of `source`, ending with exactly one [`TokenType::Eof`] token.
pub fn tokenize(source: &str) -> LexerResult<Vec<Token>> {
    Lexer::new(source).tokenize()
}

pub struct Lexer<'source> {
    input: &'source str,

    chars: Chars<'source>,
    peek_1: Option<char>,
    peek_2: Option<char>,

    start_index: usize,
    current_index: usize,

    start_pos: TokenPos,
    current_pos: TokenPos,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Lexer<'source> {
        Lexer {
            input: source,

            chars: source.chars(),
            peek_1: None,
            peek_2: None,

            start_index: 0,
            current_index: 0,

            start_pos: TokenPos::begin(),
            current_pos: TokenPos::begin(),
        }
    }

    pub fn tokenize(mut self) -> LexerResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.scan_token()?;
            let eof = token.token_type() == TokenType::Eof;
            tokens.push(token);

            if eof {
                break;
            }
        }

        debug!(count = tokens.len(), "scanned tokens");
        Ok(tokens)
    }

    pub fn scan_token(&mut self) -> LexerResult<Token> {
        loop {
            self.skip_whitespace();
            self.start_index = self.current_index;
            self.start_pos = self.current_pos;

            let c = match self.consume() {
                Some(c) => c,
                None => return Ok(self.make_token(TokenType::Eof)),
            };

            return match c {
                '(' => Ok(self.make_token(TokenType::ParenthesisLeft)),
                ')' => Ok(self.make_token(TokenType::ParenthesisRight)),
                '{' => Ok(self.make_token(TokenType::BracketLeft)),
                '}' => Ok(self.make_token(TokenType::BracketRight)),
                ',' => Ok(self.make_token(TokenType::Comma)),
                ';' => Ok(self.make_token(TokenType::Semicolon)),

                '=' => Ok(if self.expect('=') { self.make_token(TokenType::Equal) } else {
                    self.make_token(TokenType::Assign)
                }),
                '!' => Ok(if self.expect('=') { self.make_token(TokenType::NotEqual) } else {
                    self.make_token(TokenType::Not)
                }),
                '>' => Ok(if self.expect('=') { self.make_token(TokenType::GreaterEqual) } else {
                    self.make_token(TokenType::Greater)
                }),
                '<' => Ok(if self.expect('=') { self.make_token(TokenType::LessEqual) } else {
                    self.make_token(TokenType::Less)
                }),
                '&' => if self.expect('&') { Ok(self.make_token(TokenType::ShortcircuitAnd)) } else {
                    Err(LexerError::UnexpectedCharacter(self.start_pos, c))
                },
                '|' => if self.expect('|') { Ok(self.make_token(TokenType::ShortcircuitOr)) } else {
                    Err(LexerError::UnexpectedCharacter(self.start_pos, c))
                },

                '+' => Ok(self.make_token(TokenType::Plus)),
                '-' => Ok(self.make_token(TokenType::Minus)),
                '*' => Ok(self.make_token(TokenType::Multiply)),
                '/' => if self.expect('/') {
                    self.skip_line();
                    continue;
                } else if self.expect('*') {
                    self.skip_block_comment()?;
                    continue;
                } else {
                    Ok(self.make_token(TokenType::Divide))
                },

                '\'' => self.scan_string(),
                c if util::is_numeric(c) => self.scan_number(),
                c if util::is_alphabetic(c) => self.scan_identifier(),

                _ => Err(LexerError::UnexpectedCharacter(self.start_pos, c)),
            };
        }
    }

    fn scan_string(&mut self) -> LexerResult<Token> {
        loop {
            match self.consume() {
                None => return Err(LexerError::UnterminatedString { pos: self.start_pos }),
                Some('\'') => break,
                Some('\\') => {
                    let escape_pos = self.current_pos;

                    match self.consume() {
                        None => return Err(LexerError::UnterminatedString { pos: self.start_pos }),
                        Some('n' | 't' | '\\' | '\'') => {},
                        Some(escape) => return Err(LexerError::InvalidEscape {
                            pos: TokenPos::new(escape_pos.line, escape_pos.column - 1),
                            escape,
                        }),
                    }
                },
                Some(_) => {},
            }
        }

        Ok(self.make_token(TokenType::String))
    }

    fn scan_number(&mut self) -> LexerResult<Token> {
        while let Some('0'..='9') = self.peek() {
            self.consume();
        }

        if let Some('.') = self.peek() {
            if let Some('0'..='9') = self.peek_next() {
                self.consume();

                while let Some('0'..='9') = self.peek() {
                    self.consume();
                }
            }
        }

        Ok(self.make_token(TokenType::Number))
    }

    fn scan_identifier(&mut self) -> LexerResult<Token> {
        while let Some(c) = self.peek() {
            if !util::is_alphanumeric(c) {
                break;
            }

            self.consume();
        }

        let name = &self.input[self.start_index..self.current_index];
        let token_type = keyword(name).unwrap_or(TokenType::Identifier);

        Ok(self.make_token(token_type))
    }

    fn make_token(&self, token_type: TokenType) -> Token {
        Token {
            token_type,
            source: self.input[self.start_index..self.current_index].to_owned(),

            start: self.start_pos, end: self.current_pos,
        }
    }

    fn consume(&mut self) -> Option<char> {
        let c = if let Some(c) = self.peek_1.take() {
            self.peek_1 = self.peek_2.take();
            c
        } else {
            self.chars.next()?
        };

        self.current_index += c.len_utf8();

        if c == '\n' {
            self.current_pos.line += 1;
            self.current_pos.column = 1;
        } else {
            self.current_pos.column += 1;
        }

        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        if self.peek_1.is_none() {
            self.peek_1 = self.chars.next();
        }

        self.peek_1
    }

    fn peek_next(&mut self) -> Option<char> {
        self.peek()?;

        if self.peek_2.is_none() {
            self.peek_2 = self.chars.next();
        }

        self.peek_2
    }

    fn expect(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.consume();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                return;
            }

            self.consume();
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.consume() {
            if c == '\n' {
                return;
            }
        }
    }

    // Block comments nest. Errors point at the outermost opening '/*'
    fn skip_block_comment(&mut self) -> LexerResult<()> {
        let mut comment_count = 1;

        while let Some(c) = self.consume() {
            if c == '/' && self.expect('*') {
                comment_count += 1;
            } else if c == '*' && self.expect('/') {
                comment_count -= 1;
            }

            if comment_count <= 0 {
                return Ok(());
            }
        }

        Err(LexerError::UnterminatedComment { pos: self.start_pos })
    }
}
