use crate::ast::{Builtin, EvaluationTrace, Expression, InputPath, PathSegment, Value};
use crate::error::EvaluationError;
use ahash::AHashMap;

// This macro generates a match arm for a numeric binary operation.
macro_rules! eval_op {
    ($self:ident, $l:ident, $r:ident, $op_str:expr, $op_fn:expr, number) => {
        $self.eval_arithmetic($l, $r, $op_str, $op_fn)
    };
    ($self:ident, $l:ident, $r:ident, $op_str:expr, $op_fn:expr, ordering) => {
        $self.eval_comparison($l, $r, $op_str, $op_fn)
    };
}

/// The core recursive engine for evaluating one AST against one inputs map.
pub(super) struct AstEngine<'a> {
    expression: &'a Expression,
    inputs: &'a AHashMap<String, Value>,
}

impl<'a> AstEngine<'a> {
    pub(super) fn new(expression: &'a Expression, inputs: &'a AHashMap<String, Value>) -> Self {
        Self { expression, inputs }
    }

    /// Evaluates the AST and returns a trace of the execution.
    pub(super) fn evaluate(&self) -> Result<EvaluationTrace, EvaluationError> {
        self.evaluate_recursive(self.expression)
    }

    fn evaluate_recursive(&self, expr: &Expression) -> Result<EvaluationTrace, EvaluationError> {
        match expr {
            // --- Arithmetic Operations ---
            Expression::Sum(l, r) => self.eval_sum(l, r),
            Expression::Subtract(l, r) => eval_op!(self, l, r, "-", |a, b| Ok(a - b), number),
            Expression::Multiply(l, r) => eval_op!(self, l, r, "*", |a, b| Ok(a * b), number),
            Expression::Divide(l, r) => eval_op!(
                self,
                l,
                r,
                "/",
                |a, b| if b == 0.0 { Err("/") } else { Ok(a / b) },
                number
            ),
            Expression::Modulo(l, r) => eval_op!(
                self,
                l,
                r,
                "%",
                |a, b| if b == 0.0 { Err("%") } else { Ok(a % b) },
                number
            ),
            Expression::Negate(v) => {
                let child_trace = self.evaluate_recursive(v)?;
                let outcome = match child_trace.get_outcome() {
                    Value::Number(n) => Value::Number(-n),
                    val => return Err(self.type_mismatch("-", "Number", val)),
                };
                Ok(EvaluationTrace::UnaryOp {
                    op_symbol: "-",
                    child: Box::new(child_trace),
                    outcome,
                })
            }

            // --- Comparison Operations ---
            Expression::GreaterThan(l, r) => {
                eval_op!(self, l, r, ">", |o| o == std::cmp::Ordering::Greater, ordering)
            }
            Expression::GreaterThanOrEqual(l, r) => {
                eval_op!(self, l, r, ">=", |o| o != std::cmp::Ordering::Less, ordering)
            }
            Expression::SmallerThan(l, r) => {
                eval_op!(self, l, r, "<", |o| o == std::cmp::Ordering::Less, ordering)
            }
            Expression::SmallerThanOrEqual(l, r) => {
                eval_op!(self, l, r, "<=", |o| o != std::cmp::Ordering::Greater, ordering)
            }

            // --- Equality ---
            Expression::Equal(l, r) => {
                let left_trace = self.evaluate_recursive(l)?;
                let right_trace = self.evaluate_recursive(r)?;
                let outcome = Value::Bool(left_trace.get_outcome() == right_trace.get_outcome());
                Ok(EvaluationTrace::BinaryOp {
                    op_symbol: "==",
                    left: Box::new(left_trace),
                    right: Box::new(right_trace),
                    outcome,
                })
            }
            Expression::NotEqual(l, r) => {
                let left_trace = self.evaluate_recursive(l)?;
                let right_trace = self.evaluate_recursive(r)?;
                let outcome = Value::Bool(left_trace.get_outcome() != right_trace.get_outcome());
                Ok(EvaluationTrace::BinaryOp {
                    op_symbol: "!=",
                    left: Box::new(left_trace),
                    right: Box::new(right_trace),
                    outcome,
                })
            }

            // --- Logical Operations ---
            Expression::And(l, r) => {
                let left_trace = self.evaluate_recursive(l)?;
                if !left_trace.get_outcome().is_truthy() {
                    return Ok(EvaluationTrace::BinaryOp {
                        op_symbol: "&&",
                        left: Box::new(left_trace),
                        right: Box::new(EvaluationTrace::NotEvaluated),
                        outcome: Value::Bool(false),
                    });
                }
                let right_trace = self.evaluate_recursive(r)?;
                let outcome = Value::Bool(right_trace.get_outcome().is_truthy());
                Ok(EvaluationTrace::BinaryOp {
                    op_symbol: "&&",
                    left: Box::new(left_trace),
                    right: Box::new(right_trace),
                    outcome,
                })
            }
            Expression::Or(l, r) => {
                let left_trace = self.evaluate_recursive(l)?;
                if left_trace.get_outcome().is_truthy() {
                    return Ok(EvaluationTrace::BinaryOp {
                        op_symbol: "||",
                        left: Box::new(left_trace),
                        right: Box::new(EvaluationTrace::NotEvaluated),
                        outcome: Value::Bool(true),
                    });
                }
                let right_trace = self.evaluate_recursive(r)?;
                let outcome = Value::Bool(right_trace.get_outcome().is_truthy());
                Ok(EvaluationTrace::BinaryOp {
                    op_symbol: "||",
                    left: Box::new(left_trace),
                    right: Box::new(right_trace),
                    outcome,
                })
            }
            Expression::Not(v) => {
                let child_trace = self.evaluate_recursive(v)?;
                let outcome = Value::Bool(!child_trace.get_outcome().is_truthy());
                Ok(EvaluationTrace::UnaryOp {
                    op_symbol: "!",
                    child: Box::new(child_trace),
                    outcome,
                })
            }

            Expression::Call(builtin, args) => self.eval_call(*builtin, args),

            // --- Leaves ---
            Expression::Literal(val) => Ok(EvaluationTrace::Leaf {
                source: val.to_string(),
                value: val.clone(),
                from_input: false,
            }),
            Expression::Input(path) => Ok(EvaluationTrace::Leaf {
                source: path.to_string(),
                value: self.resolve(path)?,
                from_input: true,
            }),
        }
    }

    /// Walks a path through the inputs map. Missing keys read as `Null`;
    /// stepping into `Null` is an error, as it is in JavaScript.
    fn resolve(&self, path: &InputPath) -> Result<Value, EvaluationError> {
        let mut segments = path.segments.iter();
        let mut current = match segments.next() {
            None => {
                return Ok(Value::Object(
                    self.inputs
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                ));
            }
            Some(PathSegment::Key(key)) => self.inputs.get(key).cloned().unwrap_or(Value::Null),
            Some(PathSegment::Index(_)) => Value::Null,
        };

        let mut walked = InputPath::default();
        walked.segments.push(path.segments[0].clone());
        for segment in segments {
            current = match (current, segment) {
                (Value::Null, _) => {
                    return Err(EvaluationError::InputNotFound(walked.to_string()));
                }
                (Value::Object(mut map), PathSegment::Key(key)) => {
                    map.remove(key).unwrap_or(Value::Null)
                }
                (Value::List(mut items), PathSegment::Index(i)) if *i < items.len() => {
                    items.swap_remove(*i)
                }
                _ => Value::Null,
            };
            walked.segments.push(segment.clone());
        }
        Ok(current)
    }

    fn eval_call(
        &self,
        builtin: Builtin,
        args: &[Expression],
    ) -> Result<EvaluationTrace, EvaluationError> {
        // `exists` is the one call that tolerates a failing argument.
        if builtin == Builtin::Exists {
            let arg_trace = match args.first().map(|a| self.evaluate_recursive(a)) {
                Some(Ok(trace)) => trace,
                Some(Err(EvaluationError::InputNotFound(path))) => EvaluationTrace::Leaf {
                    source: path,
                    value: Value::Null,
                    from_input: true,
                },
                Some(Err(e)) => return Err(e),
                None => EvaluationTrace::NotEvaluated,
            };
            let outcome = Value::Bool(!arg_trace.get_outcome().is_null());
            return Ok(EvaluationTrace::Call {
                name: builtin.name(),
                args: vec![arg_trace],
                outcome,
            });
        }

        let arg_traces = args
            .iter()
            .map(|a| self.evaluate_recursive(a))
            .collect::<Result<Vec<_>, _>>()?;
        let values: Vec<Value> = arg_traces.iter().map(|t| t.get_outcome()).collect();
        let name = builtin.name();

        let outcome = match (builtin, values.as_slice()) {
            (Builtin::Includes, [Value::String(hay), Value::String(needle)]) => {
                Value::Bool(hay.contains(needle.as_str()))
            }
            (Builtin::Includes, [Value::List(items), needle]) => {
                Value::Bool(items.contains(needle))
            }
            (Builtin::StartsWith, [Value::String(s), Value::String(prefix)]) => {
                Value::Bool(s.starts_with(prefix.as_str()))
            }
            (Builtin::EndsWith, [Value::String(s), Value::String(suffix)]) => {
                Value::Bool(s.ends_with(suffix.as_str()))
            }
            (Builtin::Lower, [Value::String(s)]) => Value::String(s.to_lowercase()),
            (Builtin::Upper, [Value::String(s)]) => Value::String(s.to_uppercase()),
            (Builtin::Trim, [Value::String(s)]) => Value::String(s.trim().to_string()),
            (Builtin::Length, [Value::String(s)]) => Value::Number(s.chars().count() as f64),
            (Builtin::Length, [Value::List(items)]) => Value::Number(items.len() as f64),
            (Builtin::Length, [Value::Object(map)]) => Value::Number(map.len() as f64),
            (Builtin::Abs, [Value::Number(n)]) => Value::Number(n.abs()),
            (Builtin::Abs, [found]) => return Err(self.type_mismatch(name, "Number", found.clone())),
            (Builtin::Includes, [found, _]) => {
                return Err(self.type_mismatch(name, "String or List", found.clone()));
            }
            (Builtin::Length, [found]) => {
                return Err(self.type_mismatch(name, "String, List or Object", found.clone()));
            }
            (_, [Value::String(_), found]) => {
                return Err(self.type_mismatch(name, "String", found.clone()));
            }
            (_, [found, ..]) => return Err(self.type_mismatch(name, "String", found.clone())),
            (_, []) => return Err(self.type_mismatch(name, "an argument", Value::Null)),
        };

        Ok(EvaluationTrace::Call {
            name,
            args: arg_traces,
            outcome,
        })
    }

    fn eval_sum(&self, l: &Expression, r: &Expression) -> Result<EvaluationTrace, EvaluationError> {
        let left_trace = self.evaluate_recursive(l)?;
        let right_trace = self.evaluate_recursive(r)?;
        let outcome = match (left_trace.get_outcome(), right_trace.get_outcome()) {
            (Value::Number(lv), Value::Number(rv)) => Value::Number(lv + rv),
            (lv @ Value::String(_), rv) | (lv, rv @ Value::String(_)) => {
                Value::String(format!("{}{}", lv.to_label(), rv.to_label()))
            }
            (l_val, Value::Number(_)) => return Err(self.type_mismatch("+", "Number", l_val)),
            (_, r_val) => return Err(self.type_mismatch("+", "Number", r_val)),
        };
        Ok(EvaluationTrace::BinaryOp {
            op_symbol: "+",
            left: Box::new(left_trace),
            right: Box::new(right_trace),
            outcome,
        })
    }

    fn eval_arithmetic<F>(
        &self,
        l: &Expression,
        r: &Expression,
        op: &'static str,
        f: F,
    ) -> Result<EvaluationTrace, EvaluationError>
    where
        F: Fn(f64, f64) -> Result<f64, &'static str>,
    {
        let left_trace = self.evaluate_recursive(l)?;
        let right_trace = self.evaluate_recursive(r)?;
        let outcome = match (left_trace.get_outcome(), right_trace.get_outcome()) {
            (Value::Number(lv), Value::Number(rv)) => Value::Number(
                f(lv, rv).map_err(|op| EvaluationError::DivisionByZero(op.to_string()))?,
            ),
            (Value::Number(_), r_val) => return Err(self.type_mismatch(op, "Number", r_val)),
            (l_val, _) => return Err(self.type_mismatch(op, "Number", l_val)),
        };
        Ok(EvaluationTrace::BinaryOp {
            op_symbol: op,
            left: Box::new(left_trace),
            right: Box::new(right_trace),
            outcome,
        })
    }

    fn eval_comparison<F>(
        &self,
        l: &Expression,
        r: &Expression,
        op: &'static str,
        f: F,
    ) -> Result<EvaluationTrace, EvaluationError>
    where
        F: Fn(std::cmp::Ordering) -> bool,
    {
        let left_trace = self.evaluate_recursive(l)?;
        let right_trace = self.evaluate_recursive(r)?;
        let ordering = match (left_trace.get_outcome(), right_trace.get_outcome()) {
            (Value::Number(lv), Value::Number(rv)) => lv.partial_cmp(&rv),
            (Value::String(lv), Value::String(rv)) => Some(lv.cmp(&rv)),
            (l_val @ (Value::Number(_) | Value::String(_)), r_val) => {
                let expected = l_val.type_name();
                return Err(self.type_mismatch(op, expected, r_val));
            }
            (l_val, _) => return Err(self.type_mismatch(op, "Number or String", l_val)),
        };
        // NaN compares false against everything.
        let outcome = Value::Bool(ordering.is_some_and(f));
        Ok(EvaluationTrace::BinaryOp {
            op_symbol: op,
            left: Box::new(left_trace),
            right: Box::new(right_trace),
            outcome,
        })
    }

    fn type_mismatch(&self, op: &str, expected: &str, found: Value) -> EvaluationError {
        EvaluationError::TypeMismatch {
            operation: op.to_string(),
            expected: expected.to_string(),
            found,
        }
    }
}
