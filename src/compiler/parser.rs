use super::lexer::{Token, TokenKind};
use crate::ast::{Builtin, Expression, InputPath, PathSegment, Value};
use crate::error::ParseError;

/// Identifiers that refer to the whole inputs map rather than a key inside it.
const INPUT_ROOTS: [&str; 3] = ["input", "inputs", "data"];

/// Recursive-descent parser, one method per precedence level.
pub(crate) struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>, max_depth: usize) -> Self {
        Self {
            tokens,
            cursor: 0,
            depth: 0,
            max_depth,
        }
    }

    /// Parses the whole token stream as a single expression.
    pub(crate) fn parse(mut self) -> Result<Expression, ParseError> {
        if matches!(self.peek(), TokenKind::Eof) {
            return Err(ParseError::Empty);
        }
        let expression = self.parse_or()?;
        self.expect(TokenKind::Eof, "end of input")?;
        Ok(expression)
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_and()?;
        let mut levels = 0;
        while self.eat(&TokenKind::OrOr) {
            self.enter()?;
            levels += 1;
            let right = self.parse_and()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        self.depth -= levels;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_equality()?;
        let mut levels = 0;
        while self.eat(&TokenKind::AndAnd) {
            self.enter()?;
            levels += 1;
            let right = self.parse_equality()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        self.depth -= levels;
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_comparison()?;
        let mut levels = 0;
        loop {
            let build: fn(Box<Expression>, Box<Expression>) -> Expression = match self.peek() {
                TokenKind::EqEq => Expression::Equal,
                TokenKind::NotEq => Expression::NotEqual,
                _ => {
                    self.depth -= levels;
                    return Ok(left);
                }
            };
            self.advance();
            self.enter()?;
            levels += 1;
            let right = self.parse_comparison()?;
            left = build(Box::new(left), Box::new(right));
        }
    }

    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;
        let mut levels = 0;
        loop {
            let build: fn(Box<Expression>, Box<Expression>) -> Expression = match self.peek() {
                TokenKind::Greater => Expression::GreaterThan,
                TokenKind::GreaterEq => Expression::GreaterThanOrEqual,
                TokenKind::Less => Expression::SmallerThan,
                TokenKind::LessEq => Expression::SmallerThanOrEqual,
                _ => {
                    self.depth -= levels;
                    return Ok(left);
                }
            };
            self.advance();
            self.enter()?;
            levels += 1;
            let right = self.parse_additive()?;
            left = build(Box::new(left), Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;
        let mut levels = 0;
        loop {
            let build: fn(Box<Expression>, Box<Expression>) -> Expression = match self.peek() {
                TokenKind::Plus => Expression::Sum,
                TokenKind::Minus => Expression::Subtract,
                _ => {
                    self.depth -= levels;
                    return Ok(left);
                }
            };
            self.advance();
            self.enter()?;
            levels += 1;
            let right = self.parse_multiplicative()?;
            left = build(Box::new(left), Box::new(right));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        let mut levels = 0;
        loop {
            let build: fn(Box<Expression>, Box<Expression>) -> Expression = match self.peek() {
                TokenKind::Star => Expression::Multiply,
                TokenKind::Slash => Expression::Divide,
                TokenKind::Percent => Expression::Modulo,
                _ => {
                    self.depth -= levels;
                    return Ok(left);
                }
            };
            self.advance();
            self.enter()?;
            levels += 1;
            let right = self.parse_unary()?;
            left = build(Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        self.enter()?;
        let result = match self.peek() {
            TokenKind::Bang => {
                self.advance();
                self.parse_unary().map(|v| Expression::Not(Box::new(v)))
            }
            TokenKind::Minus => {
                self.advance();
                self.parse_unary().map(|v| match v {
                    Expression::Literal(Value::Number(n)) => Expression::Literal(Value::Number(-n)),
                    other => Expression::Negate(Box::new(other)),
                })
            }
            _ => self.parse_postfix(),
        };
        self.depth -= 1;
        result
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expression = self.parse_primary()?;
        let mut levels = 0;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let position = self.position();
                    let name = match self.advance_kind() {
                        TokenKind::Ident(name) => name,
                        found => {
                            return Err(ParseError::UnexpectedToken {
                                expected: "property or method name".to_string(),
                                found: found.to_string(),
                                position,
                            });
                        }
                    };

                    if matches!(self.peek(), TokenKind::LParen) {
                        let builtin = Builtin::from_method(&name)
                            .ok_or(ParseError::UnknownFunction { name, position })?;
                        self.enter()?;
                        levels += 1;
                        let mut args = vec![expression];
                        args.extend(self.parse_arguments()?);
                        expression = Self::call(builtin, args)?;
                    } else if name == "length" {
                        self.enter()?;
                        levels += 1;
                        expression = Expression::Call(Builtin::Length, vec![expression]);
                    } else if let Expression::Input(path) = &mut expression {
                        path.segments.push(PathSegment::Key(name));
                    } else {
                        return Err(ParseError::UnexpectedToken {
                            expected: "method call or '.length'".to_string(),
                            found: format!("property '{}'", name),
                            position,
                        });
                    }
                }
                TokenKind::LBracket => {
                    let position = self.position();
                    self.advance();
                    let segment = match self.advance_kind() {
                        TokenKind::Str(key) => PathSegment::Key(key),
                        TokenKind::Number(n) if n >= 0.0 && n.fract() == 0.0 => {
                            PathSegment::Index(n as usize)
                        }
                        found => {
                            return Err(ParseError::UnexpectedToken {
                                expected: "string or integer index".to_string(),
                                found: found.to_string(),
                                position: position + 1,
                            });
                        }
                    };
                    self.expect(TokenKind::RBracket, "']'")?;
                    match &mut expression {
                        Expression::Input(path) => path.segments.push(segment),
                        _ => {
                            return Err(ParseError::UnexpectedToken {
                                expected: "an input path before '['".to_string(),
                                found: "'['".to_string(),
                                position,
                            });
                        }
                    }
                }
                _ => {
                    self.depth -= levels;
                    return Ok(expression);
                }
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let position = self.position();
        match self.advance_kind() {
            TokenKind::Number(n) => Ok(Expression::Literal(Value::Number(n))),
            TokenKind::Str(s) => Ok(Expression::Literal(Value::String(s))),
            TokenKind::True => Ok(Expression::Literal(Value::Bool(true))),
            TokenKind::False => Ok(Expression::Literal(Value::Bool(false))),
            TokenKind::Null => Ok(Expression::Literal(Value::Null)),
            TokenKind::Ident(name) => {
                if matches!(self.peek(), TokenKind::LParen) {
                    let builtin = Builtin::from_function(&name)
                        .ok_or(ParseError::UnknownFunction { name, position })?;
                    let args = self.parse_arguments()?;
                    Self::call(builtin, args)
                } else if INPUT_ROOTS.contains(&name.as_str()) {
                    Ok(Expression::Input(InputPath::root()))
                } else {
                    Ok(Expression::Input(InputPath::key(&name)))
                }
            }
            TokenKind::LParen => {
                self.enter()?;
                let inner = self.parse_or();
                self.depth -= 1;
                let inner = inner?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            found => Err(ParseError::UnexpectedToken {
                expected: "a value, input or '('".to_string(),
                found: found.to_string(),
                position,
            }),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_or()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "')' or ','")?;
            return Ok(args);
        }
    }

    fn call(builtin: Builtin, args: Vec<Expression>) -> Result<Expression, ParseError> {
        if args.len() != builtin.arity() {
            return Err(ParseError::ArgumentCount {
                name: builtin.name().to_string(),
                expected: builtin.arity(),
                found: args.len(),
            });
        }
        Ok(Expression::Call(builtin, args))
    }

    /// Counts one level of the tree being built. Binary chains and method chains
    /// nest leftwards, so each link counts as well as each unary and parenthesis.
    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.max_depth {
            return Err(ParseError::TooDeep(self.max_depth));
        }
        self.depth += 1;
        Ok(())
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.cursor.min(self.tokens.len() - 1)].kind
    }

    fn position(&self) -> usize {
        self.tokens[self.cursor.min(self.tokens.len() - 1)].position
    }

    fn advance(&mut self) {
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
    }

    fn advance_kind(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        self.advance();
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<(), ParseError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.peek().to_string(),
                position: self.position(),
            })
        }
    }
}
