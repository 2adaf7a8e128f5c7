//! Filter expression language: tokenizer, AST and recursive-descent parser.
//!
//! ```text
//! expr       := or
//! or         := and (("or" | "|") and)*
//! and        := not (("and" | "&") not)*
//! not        := ("not" | "~") not | primary
//! primary    := "(" expr ")" | comparison
//! comparison := operand (cmp_op operand | ["not"] "in" list)?
//! list       := "[" literal ("," literal)* "]"  |  "(" literal ("," literal)* ")"
//! operand    := literal | column | "(" operand ")"
//! ```
//!
//! Columns are bare identifiers or `` `back-ticked names` ``. Keywords are
//! case-insensitive. Strings take single or double quotes.

use std::fmt;

use super::error::FilterSyntaxError;
use super::model::Value;

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// `<`, `<=`, `>`, `>=`: only meaningful between values of the same kind.
    pub fn is_ordering(self) -> bool {
        matches!(self, CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge)
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Column reference; `pos` is the byte offset of the name in the source.
    Column { name: String, pos: usize },
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare {
        left: Operand,
        op: CmpOp,
        right: Operand,
    },
    In {
        operand: Operand,
        list: Vec<Value>,
        negated: bool,
    },
    /// A lone operand used as a predicate, e.g. `Active` or `True`.
    Truthy(Operand),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(Value),
    Bool(bool),
    And,
    Or,
    Not,
    In,
    Op(CmpOp),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "column '{s}'"),
            Token::Str(s) => write!(f, "string '{s}'"),
            Token::Number(v) => write!(f, "number {v}"),
            Token::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Token::And => f.write_str("'and'"),
            Token::Or => f.write_str("'or'"),
            Token::Not => f.write_str("'not'"),
            Token::In => f.write_str("'in'"),
            Token::Op(op) => write!(f, "'{op}'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::Comma => f.write_str("','"),
        }
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    pos: usize,
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src,
            chars: src.char_indices().peekable(),
        }
    }

    fn error(&self, pos: usize, msg: impl Into<String>) -> FilterSyntaxError {
        FilterSyntaxError::new(self.src, pos, msg)
    }

    fn tokenize(mut self) -> Result<Vec<Spanned>, FilterSyntaxError> {
        let mut tokens = Vec::new();
        while let Some(&(pos, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
                continue;
            }
            let token = match c {
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '[' => self.single(Token::LBracket),
                ']' => self.single(Token::RBracket),
                ',' => self.single(Token::Comma),
                '&' => self.single(Token::And),
                '|' => self.single(Token::Or),
                '~' => self.single(Token::Not),
                '=' | '!' | '<' | '>' => self.operator(pos, c)?,
                '\'' | '"' => self.string(pos, c)?,
                '`' => self.backticked(pos)?,
                c if c.is_ascii_digit() || c == '.' || c == '-' => self.number(pos)?,
                c if c.is_alphabetic() || c == '_' => self.word(),
                other => return Err(self.error(pos, format!("unexpected character '{other}'"))),
            };
            tokens.push(Spanned { token, pos });
        }
        Ok(tokens)
    }

    fn single(&mut self, token: Token) -> Token {
        self.chars.next();
        token
    }

    fn operator(&mut self, pos: usize, first: char) -> Result<Token, FilterSyntaxError> {
        self.chars.next();
        let followed_by_eq = matches!(self.chars.peek(), Some(&(_, '=')));
        if followed_by_eq {
            self.chars.next();
        }
        let op = match (first, followed_by_eq) {
            ('=', true) => CmpOp::Eq,
            ('!', true) => CmpOp::Ne,
            ('<', true) => CmpOp::Le,
            ('>', true) => CmpOp::Ge,
            ('<', false) => CmpOp::Lt,
            ('>', false) => CmpOp::Gt,
            ('=', false) => return Err(self.error(pos, "unexpected '='; use '==' for equality")),
            _ => return Err(self.error(pos, "unexpected '!'; use 'not' or '!='")),
        };
        Ok(Token::Op(op))
    }

    fn string(&mut self, pos: usize, quote: char) -> Result<Token, FilterSyntaxError> {
        self.chars.next();
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, escaped)) => s.push(escaped),
                    None => break,
                },
                Some((_, ch)) if ch == quote => return Ok(Token::Str(s)),
                Some((_, ch)) => s.push(ch),
                None => break,
            }
        }
        Err(self.error(pos, "unterminated string literal"))
    }

    fn backticked(&mut self, pos: usize) -> Result<Token, FilterSyntaxError> {
        self.chars.next();
        let mut name = String::new();
        while let Some((_, ch)) = self.chars.next() {
            if ch == '`' {
                if name.is_empty() {
                    return Err(self.error(pos, "empty column name"));
                }
                return Ok(Token::Ident(name));
            }
            name.push(ch);
        }
        Err(self.error(pos, "unterminated `column` name"))
    }

    fn number(&mut self, pos: usize) -> Result<Token, FilterSyntaxError> {
        let mut end = pos;
        let mut prev = '\0';
        while let Some(&(i, ch)) = self.chars.peek() {
            let sign_ok = (ch == '-' || ch == '+') && (i == pos || prev == 'e' || prev == 'E');
            if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || sign_ok {
                prev = ch;
                end = i + ch.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        let text = &self.src[pos..end];
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Token::Number(Value::Integer(i)));
        }
        match text.parse::<f64>() {
            Ok(f) => Ok(Token::Number(Value::Float(f))),
            Err(_) => Err(self.error(pos, format!("invalid number '{text}'"))),
        }
    }

    fn word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                word.push(ch);
                self.chars.next();
            } else {
                break;
            }
        }
        match word.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "in" => Token::In,
            "true" => Token::Bool(true),
            "false" => Token::Bool(false),
            _ => Token::Ident(word),
        }
    }
}

// ---------------------------------------------------------------------------
// Recursive descent parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    /// Byte offset of the current token, or end of input.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.pos)
            .unwrap_or(self.src.len())
    }

    fn unexpected(&self, expected: &str) -> FilterSyntaxError {
        let msg = match self.peek() {
            Some(t) => format!("expected {expected}, found {t}"),
            None => format!("expected {expected}, found end of expression"),
        };
        FilterSyntaxError::new(self.src, self.offset(), msg)
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), FilterSyntaxError> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn parse(&mut self) -> Result<Expr, FilterSyntaxError> {
        let expr = self.parse_or()?;
        if self.peek().is_some() {
            return Err(self.unexpected("end of expression"));
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, FilterSyntaxError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, FilterSyntaxError> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, FilterSyntaxError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, FilterSyntaxError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            self.expect(Token::RParen, "')'")?;
            // `(Sales) > 5`: the group was a lone operand, keep comparing
            return match inner {
                Expr::Truthy(operand) => self.parse_comparison_rest(operand),
                other => Ok(other),
            };
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, FilterSyntaxError> {
        let left = self.parse_operand()?;
        self.parse_comparison_rest(left)
    }

    fn parse_comparison_rest(&mut self, left: Operand) -> Result<Expr, FilterSyntaxError> {
        match self.peek() {
            Some(Token::Op(op)) => {
                let op = *op;
                self.pos += 1;
                let right = self.parse_operand()?;
                Ok(Expr::Compare { left, op, right })
            }
            Some(Token::In) => {
                self.pos += 1;
                let list = self.parse_list()?;
                Ok(Expr::In {
                    operand: left,
                    list,
                    negated: false,
                })
            }
            Some(Token::Not) if self.peek_at(1) == Some(&Token::In) => {
                self.pos += 2;
                let list = self.parse_list()?;
                Ok(Expr::In {
                    operand: left,
                    list,
                    negated: true,
                })
            }
            _ => Ok(Expr::Truthy(left)),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, FilterSyntaxError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let operand = self.parse_operand()?;
            self.expect(Token::RParen, "')'")?;
            return Ok(operand);
        }
        let Some(spanned) = self.tokens.get(self.pos).cloned() else {
            return Err(self.unexpected("a column or value"));
        };
        let operand = match spanned.token {
            Token::Ident(name) => Operand::Column {
                name,
                pos: spanned.pos,
            },
            Token::Str(s) => Operand::Literal(Value::String(s)),
            Token::Number(v) => Operand::Literal(v),
            Token::Bool(b) => Operand::Literal(Value::Bool(b)),
            _ => return Err(self.unexpected("a column or value")),
        };
        self.pos += 1;
        Ok(operand)
    }

    fn parse_list(&mut self) -> Result<Vec<Value>, FilterSyntaxError> {
        let close = match self.peek() {
            Some(Token::LBracket) => Token::RBracket,
            Some(Token::LParen) => Token::RParen,
            _ => return Err(self.unexpected("'[' to start a list")),
        };
        self.pos += 1;
        let mut values = Vec::new();
        loop {
            let value = match self.peek() {
                Some(Token::Str(s)) => Value::String(s.clone()),
                Some(Token::Number(v)) => v.clone(),
                Some(Token::Bool(b)) => Value::Bool(*b),
                Some(t) if *t == close && values.is_empty() => {
                    self.pos += 1;
                    return Ok(values);
                }
                _ => return Err(self.unexpected("a literal value in list")),
            };
            self.pos += 1;
            values.push(value);

            match self.peek() {
                Some(Token::Comma) => self.pos += 1,
                Some(t) if *t == close => {
                    self.pos += 1;
                    return Ok(values);
                }
                _ => return Err(self.unexpected("',' or end of list")),
            }
        }
    }
}

/// Parse a non-empty filter expression into its AST.
pub fn parse(src: &str) -> Result<Expr, FilterSyntaxError> {
    let tokens = Lexer::new(src).tokenize()?;
    if tokens.is_empty() {
        return Err(FilterSyntaxError::new(src, 0, "empty expression"));
    }
    Parser {
        src,
        tokens,
        pos: 0,
    }
    .parse()
}
