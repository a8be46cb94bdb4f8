use crate::error::ParseError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Greater,
    GreaterEq,
    Less,
    LessEq,

    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Str(s) => write!(f, "string {:?}", s),
            TokenKind::Ident(name) => write!(f, "identifier '{}'", name),
            TokenKind::True => write!(f, "'true'"),
            TokenKind::False => write!(f, "'false'"),
            TokenKind::Null => write!(f, "'null'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::Bang => write!(f, "'!'"),
            TokenKind::AndAnd => write!(f, "'&&'"),
            TokenKind::OrOr => write!(f, "'||'"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::Greater => write!(f, "'>'"),
            TokenKind::GreaterEq => write!(f, "'>='"),
            TokenKind::Less => write!(f, "'<'"),
            TokenKind::LessEq => write!(f, "'<='"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub position: usize,
}

/// Splits condition text into tokens. Always ends with `TokenKind::Eof`.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = match c {
            '0'..='9' => {
                let mut end = position;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' || d == '_' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &source[position..end];
                let number = text
                    .replace('_', "")
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber {
                        text: text.to_string(),
                        position,
                    })?;
                tokens.push(Token {
                    kind: TokenKind::Number(number),
                    position,
                });
                continue;
            }
            '"' | '\'' => {
                chars.next();
                let quote = c;
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        '\\' => match chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        },
                        ch if ch == quote => {
                            closed = true;
                            break;
                        }
                        ch => value.push(ch),
                    }
                }
                if !closed {
                    return Err(ParseError::UnterminatedString(position));
                }
                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    position,
                });
                continue;
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let mut end = position;
                while let Some(&(i, ch)) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                        end = i + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let kind = match &source[position..end] {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "null" | "undefined" => TokenKind::Null,
                    word => TokenKind::Ident(word.to_string()),
                };
                tokens.push(Token { kind, position });
                continue;
            }
            _ => {
                chars.next();
                let next = chars.peek().map(|&(_, ch)| ch);
                match (c, next) {
                    ('&', Some('&')) => {
                        chars.next();
                        TokenKind::AndAnd
                    }
                    ('|', Some('|')) => {
                        chars.next();
                        TokenKind::OrOr
                    }
                    ('=', Some('=')) => {
                        chars.next();
                        // `===` is accepted as a synonym.
                        if let Some(&(_, '=')) = chars.peek() {
                            chars.next();
                        }
                        TokenKind::EqEq
                    }
                    ('!', Some('=')) => {
                        chars.next();
                        if let Some(&(_, '=')) = chars.peek() {
                            chars.next();
                        }
                        TokenKind::NotEq
                    }
                    ('>', Some('=')) => {
                        chars.next();
                        TokenKind::GreaterEq
                    }
                    ('<', Some('=')) => {
                        chars.next();
                        TokenKind::LessEq
                    }
                    ('!', _) => TokenKind::Bang,
                    ('>', _) => TokenKind::Greater,
                    ('<', _) => TokenKind::Less,
                    ('+', _) => TokenKind::Plus,
                    ('-', _) => TokenKind::Minus,
                    ('*', _) => TokenKind::Star,
                    ('/', _) => TokenKind::Slash,
                    ('%', _) => TokenKind::Percent,
                    ('(', _) => TokenKind::LParen,
                    (')', _) => TokenKind::RParen,
                    ('[', _) => TokenKind::LBracket,
                    (']', _) => TokenKind::RBracket,
                    ('.', _) => TokenKind::Dot,
                    (',', _) => TokenKind::Comma,
                    (found, _) => return Err(ParseError::UnexpectedChar { found, position }),
                }
            }
        };
        tokens.push(Token { kind, position });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: source.len(),
    });
    Ok(tokens)
}
