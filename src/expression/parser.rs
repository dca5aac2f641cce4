// SPDX-License-Identifier: MIT

//! Recursive-descent parser for residual expressions
//!
//! Accepts:
//! - `true`, `false`, numbers (`1`, `0.5`, `-3`, `NaN`, `-Infinity`)
//! - quoted strings (`'a'`, `"a"`)
//! - `!`, `&&`, `||` and parentheses
//! - `==`, `!=`, `===`, `!==`, `<`, `>`, `<=`, `>=`
//!
//! Precedence from loosest to tightest: `||`, `&&`, equality, relational,
//! unary `!`.

use super::ast::{number_source, CompareOp, Expression, Literal};
use thiserror::Error;

/// Nesting limit for parentheses and unary operators. Each comparison
/// chained onto another also counts as one level.
const MAX_DEPTH: usize = 128;

/// Errors produced while parsing a residual expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("unterminated string starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("invalid number '{text}' at position {position}")]
    InvalidNumber { text: String, position: usize },

    #[error("unknown identifier '{name}' at position {position}")]
    UnknownIdentifier { name: String, position: usize },

    #[error("unexpected token '{found}' at position {position}")]
    UnexpectedToken { found: String, position: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("expression nested deeper than {} levels", MAX_DEPTH)]
    TooDeep,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Bool(bool),
    And,
    Or,
    Not,
    Minus,
    Compare(CompareOp),
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", number_source(*n)),
            Token::Str(s) => write!(f, "{:?}", s),
            Token::Bool(b) => write!(f, "{}", b),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::Minus => write!(f, "-"),
            Token::Compare(op) => write!(f, "{}", op),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

/// Parse a residual expression string into an AST
pub fn parse(input: &str) -> Result<Expression, ExpressionError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;

    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some((token, position)) => Err(ExpressionError::UnexpectedToken {
            found: token.to_string(),
            position: *position,
        }),
    }
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, ExpressionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let start = i;

        match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '(' => {
                tokens.push((Token::LParen, start));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, start));
                i += 1;
            }
            '-' => {
                tokens.push((Token::Minus, start));
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push((Token::And, start));
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push((Token::Or, start));
                i += 2;
            }
            '=' if next == Some('=') => {
                // `===` is accepted as a synonym for `==`
                i += if chars.get(i + 2) == Some(&'=') { 3 } else { 2 };
                tokens.push((Token::Compare(CompareOp::Eq), start));
            }
            '!' if next == Some('=') => {
                i += if chars.get(i + 2) == Some(&'=') { 3 } else { 2 };
                tokens.push((Token::Compare(CompareOp::NotEq), start));
            }
            '!' => {
                tokens.push((Token::Not, start));
                i += 1;
            }
            '<' | '>' => {
                let (op, width) = match (c, next) {
                    ('<', Some('=')) => (CompareOp::Lte, 2),
                    ('>', Some('=')) => (CompareOp::Gte, 2),
                    ('<', _) => (CompareOp::Lt, 1),
                    _ => (CompareOp::Gt, 1),
                };
                tokens.push((Token::Compare(op), start));
                i += width;
            }
            '\'' | '"' => {
                let (value, end) = read_string(&chars, i)?;
                tokens.push((Token::Str(value), start));
                i = end;
            }
            c if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let mut end = i;
                while end < chars.len() && (chars[end].is_ascii_digit() || chars[end] == '.') {
                    end += 1;
                }
                let text: String = chars[i..end].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ExpressionError::InvalidNumber {
                        text: text.clone(),
                        position: start,
                    })?;
                tokens.push((Token::Number(value), start));
                i = end;
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = i;
                while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let word: String = chars[i..end].iter().collect();
                match word.as_str() {
                    "true" => tokens.push((Token::Bool(true), start)),
                    "false" => tokens.push((Token::Bool(false), start)),
                    "NaN" => tokens.push((Token::Number(f64::NAN), start)),
                    "Infinity" => tokens.push((Token::Number(f64::INFINITY), start)),
                    _ => {
                        return Err(ExpressionError::UnknownIdentifier {
                            name: word,
                            position: start,
                        })
                    }
                }
                i = end;
            }
            other => {
                return Err(ExpressionError::UnexpectedChar {
                    ch: other,
                    position: start,
                })
            }
        }
    }

    Ok(tokens)
}

/// Read a quoted string starting at `start`, returning it and the index past
/// the closing quote. A backslash escapes the following character.
fn read_string(chars: &[char], start: usize) -> Result<(String, usize), ExpressionError> {
    let quote = chars[start];
    let mut value = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .ok_or(ExpressionError::UnterminatedString { position: start })?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => *other,
                });
                i += 2;
            }
            c if c == quote => return Ok((value, i + 1)),
            c => {
                value.push(c);
                i += 1;
            }
        }
    }

    Err(ExpressionError::UnterminatedString { position: start })
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep);
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Expression, ExpressionError> {
        let first = self.parse_and()?;
        if self.peek() != Some(&Token::Or) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.peek() == Some(&Token::Or) {
            self.advance();
            operands.push(self.parse_and()?);
        }
        Ok(Expression::Or(operands))
    }

    fn parse_and(&mut self) -> Result<Expression, ExpressionError> {
        let first = self.parse_equality()?;
        if self.peek() != Some(&Token::And) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.peek() == Some(&Token::And) {
            self.advance();
            operands.push(self.parse_equality()?);
        }
        Ok(Expression::And(operands))
    }

    fn parse_equality(&mut self) -> Result<Expression, ExpressionError> {
        let mut left = self.parse_relational()?;
        let mut chained = 0;
        while let Some(Token::Compare(op @ (CompareOp::Eq | CompareOp::NotEq))) = self.peek() {
            let op = *op;
            self.advance();
            self.enter()?;
            chained += 1;
            let right = self.parse_relational()?;
            left = Expression::Compare {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expression, ExpressionError> {
        let mut left = self.parse_unary()?;
        let mut chained = 0;
        while let Some(Token::Compare(
            op @ (CompareOp::Lt | CompareOp::Lte | CompareOp::Gt | CompareOp::Gte),
        )) = self.peek()
        {
            let op = *op;
            self.advance();
            self.enter()?;
            chained += 1;
            let right = self.parse_unary()?;
            left = Expression::Compare {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ExpressionError> {
        match self.peek() {
            Some(Token::Not) => {
                self.advance();
                self.enter()?;
                let inner = self.parse_unary()?;
                self.depth -= 1;
                Ok(Expression::Not(Box::new(inner)))
            }
            Some(Token::Minus) => {
                self.advance();
                match self.advance() {
                    Some((Token::Number(n), _)) => Ok(Expression::number(-n)),
                    Some((token, position)) => Err(ExpressionError::UnexpectedToken {
                        found: token.to_string(),
                        position,
                    }),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, ExpressionError> {
        match self.advance() {
            Some((Token::Number(n), _)) => Ok(Expression::Literal(Literal::Number(n))),
            Some((Token::Str(s), _)) => Ok(Expression::Literal(Literal::String(s))),
            Some((Token::Bool(b), _)) => Ok(Expression::Literal(Literal::Boolean(b))),
            Some((Token::LParen, _)) => {
                self.enter()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.advance() {
                    Some((Token::RParen, _)) => Ok(inner),
                    Some((token, position)) => Err(ExpressionError::UnexpectedToken {
                        found: token.to_string(),
                        position,
                    }),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            Some((token, position)) => Err(ExpressionError::UnexpectedToken {
                found: token.to_string(),
                position,
            }),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}
