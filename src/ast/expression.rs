use super::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One step of an input path: `.name` / `["name"]` or `[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A path into a node's inputs map. The first segment is always a top-level key;
/// an empty path refers to the whole map (`input` on its own).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InputPath {
    pub segments: Vec<PathSegment>,
}

impl InputPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(name: &str) -> Self {
        Self {
            segments: vec![PathSegment::Key(name.to_string())],
        }
    }

    /// The top-level inputs key this path reads, if any.
    pub fn root_key(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Key(k)) => Some(k),
            _ => None,
        }
    }
}

impl fmt::Display for InputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input")?;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(k) if is_plain_identifier(k) => write!(f, ".{}", k)?,
                PathSegment::Key(k) => write!(f, "[{:?}]", k)?,
                PathSegment::Index(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Built-in functions and methods available to conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Builtin {
    Includes,
    StartsWith,
    EndsWith,
    Lower,
    Upper,
    Trim,
    Length,
    Abs,
    Exists,
}

impl Builtin {
    /// Resolves a method name as written after a `.` (e.g. `x.includes(y)`).
    pub fn from_method(name: &str) -> Option<Self> {
        match name {
            "includes" => Some(Builtin::Includes),
            "startsWith" => Some(Builtin::StartsWith),
            "endsWith" => Some(Builtin::EndsWith),
            "toLowerCase" => Some(Builtin::Lower),
            "toUpperCase" => Some(Builtin::Upper),
            "trim" => Some(Builtin::Trim),
            _ => None,
        }
    }

    /// Resolves a free function name (e.g. `len(x)`).
    pub fn from_function(name: &str) -> Option<Self> {
        match name {
            "len" => Some(Builtin::Length),
            "abs" => Some(Builtin::Abs),
            "exists" => Some(Builtin::Exists),
            _ => None,
        }
    }

    /// Number of arguments, counting the receiver of a method call.
    pub fn arity(&self) -> usize {
        match self {
            Builtin::Includes | Builtin::StartsWith | Builtin::EndsWith => 2,
            _ => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Includes => "includes",
            Builtin::StartsWith => "startsWith",
            Builtin::EndsWith => "endsWith",
            Builtin::Lower => "toLowerCase",
            Builtin::Upper => "toUpperCase",
            Builtin::Trim => "trim",
            Builtin::Length => "length",
            Builtin::Abs => "abs",
            Builtin::Exists => "exists",
        }
    }
}

/// The Abstract Syntax Tree of a parsed condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    // Arithmetic
    Sum(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
    Modulo(Box<Expression>, Box<Expression>),
    Negate(Box<Expression>),

    // Logical
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),

    // Comparison
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqual(Box<Expression>, Box<Expression>),
    SmallerThan(Box<Expression>, Box<Expression>),
    SmallerThanOrEqual(Box<Expression>, Box<Expression>),

    Call(Builtin, Vec<Expression>),

    // Leaf nodes
    Literal(Value),
    Input(InputPath),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_precedence(f, 0)
    }
}

impl Expression {
    /// Binding strength of the expression's operator. Higher numbers bind more tightly.
    pub fn precedence(&self) -> u8 {
        match self {
            Expression::Or(_, _) => 1,
            Expression::And(_, _) => 2,
            Expression::Equal(_, _) | Expression::NotEqual(_, _) => 3,
            Expression::GreaterThan(_, _)
            | Expression::GreaterThanOrEqual(_, _)
            | Expression::SmallerThan(_, _)
            | Expression::SmallerThanOrEqual(_, _) => 4,
            Expression::Sum(_, _) | Expression::Subtract(_, _) => 5,
            Expression::Multiply(_, _) | Expression::Divide(_, _) | Expression::Modulo(_, _) => 6,
            Expression::Not(_) | Expression::Negate(_) => 7,
            Expression::Call(_, _) | Expression::Literal(_) | Expression::Input(_) => 8,
        }
    }

    /// Collects the top-level inputs keys the expression reads.
    pub fn required_inputs(&self, keys: &mut BTreeSet<String>) {
        match self {
            Expression::Input(path) => {
                if let Some(key) = path.root_key() {
                    keys.insert(key.to_string());
                }
            }
            Expression::Sum(l, r)
            | Expression::Subtract(l, r)
            | Expression::Multiply(l, r)
            | Expression::Divide(l, r)
            | Expression::Modulo(l, r)
            | Expression::And(l, r)
            | Expression::Or(l, r)
            | Expression::Equal(l, r)
            | Expression::NotEqual(l, r)
            | Expression::GreaterThan(l, r)
            | Expression::GreaterThanOrEqual(l, r)
            | Expression::SmallerThan(l, r)
            | Expression::SmallerThanOrEqual(l, r) => {
                l.required_inputs(keys);
                r.required_inputs(keys);
            }
            Expression::Not(v) | Expression::Negate(v) => v.required_inputs(keys),
            Expression::Call(_, args) => {
                for arg in args {
                    arg.required_inputs(keys);
                }
            }
            Expression::Literal(_) => {}
        }
    }

    /// Recursively formats the expression, adding parentheses only when necessary.
    fn fmt_with_precedence(&self, f: &mut fmt::Formatter<'_>, parent_precedence: u8) -> fmt::Result {
        let current_precedence = self.precedence();
        let needs_parens = current_precedence < parent_precedence;

        if needs_parens {
            write!(f, "(")?;
        }

        match self {
            Expression::Or(l, r) => self.fmt_binary(f, "||", l, r, current_precedence)?,
            Expression::And(l, r) => self.fmt_binary(f, "&&", l, r, current_precedence)?,
            Expression::Equal(l, r) => self.fmt_binary(f, "==", l, r, current_precedence)?,
            Expression::NotEqual(l, r) => self.fmt_binary(f, "!=", l, r, current_precedence)?,
            Expression::GreaterThan(l, r) => self.fmt_binary(f, ">", l, r, current_precedence)?,
            Expression::GreaterThanOrEqual(l, r) => {
                self.fmt_binary(f, ">=", l, r, current_precedence)?
            }
            Expression::SmallerThan(l, r) => self.fmt_binary(f, "<", l, r, current_precedence)?,
            Expression::SmallerThanOrEqual(l, r) => {
                self.fmt_binary(f, "<=", l, r, current_precedence)?
            }
            Expression::Sum(l, r) => self.fmt_binary(f, "+", l, r, current_precedence)?,
            Expression::Subtract(l, r) => self.fmt_binary(f, "-", l, r, current_precedence)?,
            Expression::Multiply(l, r) => self.fmt_binary(f, "*", l, r, current_precedence)?,
            Expression::Divide(l, r) => self.fmt_binary(f, "/", l, r, current_precedence)?,
            Expression::Modulo(l, r) => self.fmt_binary(f, "%", l, r, current_precedence)?,

            Expression::Not(v) => {
                write!(f, "!")?;
                v.fmt_with_precedence(f, current_precedence)?;
            }
            Expression::Negate(v) => {
                write!(f, "-")?;
                v.fmt_with_precedence(f, current_precedence)?;
            }
            Expression::Call(builtin, args) => match (builtin, args.as_slice()) {
                (Builtin::Length | Builtin::Abs | Builtin::Exists, [arg]) => {
                    let name = match builtin {
                        Builtin::Length => "len",
                        other => other.name(),
                    };
                    write!(f, "{}(", name)?;
                    arg.fmt_with_precedence(f, 0)?;
                    write!(f, ")")?;
                }
                (_, [receiver, rest @ ..]) => {
                    receiver.fmt_with_precedence(f, current_precedence)?;
                    write!(f, ".{}(", builtin.name())?;
                    for (i, arg) in rest.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        arg.fmt_with_precedence(f, 0)?;
                    }
                    write!(f, ")")?;
                }
                (_, []) => write!(f, "{}()", builtin.name())?,
            },

            Expression::Literal(v) => write!(f, "{}", v)?,
            Expression::Input(path) => write!(f, "{}", path)?,
        }

        if needs_parens {
            write!(f, ")")?;
        }
        Ok(())
    }

    fn fmt_binary(
        &self,
        f: &mut fmt::Formatter<'_>,
        op: &str,
        l: &Expression,
        r: &Expression,
        current_precedence: u8,
    ) -> fmt::Result {
        l.fmt_with_precedence(f, current_precedence)?;
        write!(f, " {} ", op)?;
        // Left-associative: a right operand of equal precedence needs parentheses.
        r.fmt_with_precedence(f, current_precedence + 1)?;
        Ok(())
    }
}
