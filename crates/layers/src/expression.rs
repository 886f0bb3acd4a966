//! Declarative style expressions.
//!
//! An [`Expression`] is a small typed tree that serializes to the map
//! engine's nested-array format (`["interpolate", ["linear"], ...]`). Keeping
//! it typed lets paint and filter rules be validated and evaluated per feature
//! without a running engine.

use foundation::{FeatureId, Rgba};
use serde::{Serialize, Serializer};
use serde_json::{Value as Json, json};
use thiserror::Error;

use crate::feature::Feature;

/// A literal operand, and the result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Color(Rgba),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Rgba> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Converts a feature property. Arrays and objects have no scalar form.
    pub fn from_json(json: &Json) -> Option<Value> {
        match json {
            Json::Null => Some(Value::Null),
            Json::Bool(b) => Some(Value::Bool(*b)),
            Json::Number(n) => n.as_f64().map(Value::Number),
            Json::String(s) => Some(Value::String(s.clone())),
            Json::Array(_) | Json::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_json(*n),
            Value::String(s) => Json::String(s.clone()),
            Value::Color(c) => Json::String(c.to_hex()),
        }
    }
}

fn number_json(n: f64) -> Json {
    // Integral values print without a fraction, as the engine's own examples do.
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        json!(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number)
    }
}

/// One `input → output` pair of an interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub input: f64,
    pub output: Expression,
}

impl Stop {
    pub fn new(input: f64, output: Expression) -> Self {
        Self { input, output }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    /// `["get", key]`: property value, null when absent.
    Get(String),
    /// `["has", key]`: whether the property exists at all.
    Has(String),
    /// `["id"]`: the feature id, null when the feature has none.
    Id,
    Coalesce(Vec<Expression>),
    ToNumber(Box<Expression>),
    Equals(Box<Expression>, Box<Expression>),
    All(Vec<Expression>),
    Case {
        branches: Vec<(Expression, Expression)>,
        fallback: Box<Expression>,
    },
    /// `["interpolate", ["linear"], input, stop0, out0, ...]`
    Interpolate {
        input: Box<Expression>,
        stops: Vec<Stop>,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("`{0}` needs at least one operand")]
    NoOperands(&'static str),
    #[error("interpolate needs at least one stop")]
    NoStops,
    #[error("interpolate stop {index} is not strictly above the previous stop")]
    UnorderedStops { index: usize },
    #[error("non-finite number literal")]
    NonFinite,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("expected a number, found {0:?}")]
    ExpectedNumber(Value),
    #[error("expected a boolean, found {0:?}")]
    ExpectedBoolean(Value),
    #[error("cannot convert {0:?} to a number")]
    NotANumber(String),
    #[error("property {0:?} is not a scalar")]
    NonScalarProperty(String),
    #[error("interpolate outputs {0:?} and {1:?} cannot be blended")]
    MismatchedOutputs(Value, Value),
    #[error(transparent)]
    Invalid(#[from] ExpressionError),
}

impl Expression {
    pub fn number(n: f64) -> Self {
        Expression::Literal(Value::Number(n))
    }

    pub fn color(c: Rgba) -> Self {
        Expression::Literal(Value::Color(c))
    }

    pub fn get(key: impl Into<String>) -> Self {
        Expression::Get(key.into())
    }

    pub fn has(key: impl Into<String>) -> Self {
        Expression::Has(key.into())
    }

    /// `["==", ["id"], id]`. Without an id the condition is the literal `false`,
    /// since `["id"]` is null for every id-less feature.
    pub fn is_feature(id: Option<FeatureId>) -> Self {
        match id {
            Some(id) => Expression::eq(Expression::Id, Expression::number(id.as_f64())),
            None => Expression::Literal(Value::Bool(false)),
        }
    }

    pub fn to_number(inner: Expression) -> Self {
        Expression::ToNumber(Box::new(inner))
    }

    pub fn eq(lhs: Expression, rhs: Expression) -> Self {
        Expression::Equals(Box::new(lhs), Box::new(rhs))
    }

    pub fn case(condition: Expression, then: Expression, otherwise: Expression) -> Self {
        Expression::Case {
            branches: vec![(condition, then)],
            fallback: Box::new(otherwise),
        }
    }

    pub fn interpolate_linear(input: Expression, stops: Vec<Stop>) -> Self {
        Expression::Interpolate {
            input: Box::new(input),
            stops,
        }
    }

    /// Engine wire form.
    pub fn to_json(&self) -> Json {
        match self {
            Expression::Literal(v) => v.to_json(),
            Expression::Get(key) => json!(["get", key]),
            Expression::Has(key) => json!(["has", key]),
            Expression::Id => json!(["id"]),
            Expression::Coalesce(items) => operator_json("coalesce", items),
            Expression::ToNumber(inner) => json!(["to-number", inner.to_json()]),
            Expression::Equals(lhs, rhs) => json!(["==", lhs.to_json(), rhs.to_json()]),
            Expression::All(items) => operator_json("all", items),
            Expression::Case { branches, fallback } => {
                let mut out = vec![json!("case")];
                for (condition, output) in branches {
                    out.push(condition.to_json());
                    out.push(output.to_json());
                }
                out.push(fallback.to_json());
                Json::Array(out)
            }
            Expression::Interpolate { input, stops } => {
                let mut out = vec![json!("interpolate"), json!(["linear"]), input.to_json()];
                for stop in stops {
                    out.push(number_json(stop.input));
                    out.push(stop.output.to_json());
                }
                Json::Array(out)
            }
        }
    }

    /// Structural checks the engine would otherwise reject at runtime.
    pub fn validate(&self) -> Result<(), ExpressionError> {
        match self {
            Expression::Literal(Value::Number(n)) if !n.is_finite() => {
                Err(ExpressionError::NonFinite)
            }
            Expression::Literal(_) | Expression::Get(_) | Expression::Has(_) | Expression::Id => {
                Ok(())
            }
            Expression::Coalesce(items) => validate_operands("coalesce", items),
            Expression::All(items) => validate_operands("all", items),
            Expression::ToNumber(inner) => inner.validate(),
            Expression::Equals(lhs, rhs) => {
                lhs.validate()?;
                rhs.validate()
            }
            Expression::Case { branches, fallback } => {
                if branches.is_empty() {
                    return Err(ExpressionError::NoOperands("case"));
                }
                for (condition, output) in branches {
                    condition.validate()?;
                    output.validate()?;
                }
                fallback.validate()
            }
            Expression::Interpolate { input, stops } => {
                input.validate()?;
                if stops.is_empty() {
                    return Err(ExpressionError::NoStops);
                }
                for (index, stop) in stops.iter().enumerate() {
                    if !stop.input.is_finite() {
                        return Err(ExpressionError::NonFinite);
                    }
                    if index > 0 && stop.input <= stops[index - 1].input {
                        return Err(ExpressionError::UnorderedStops { index });
                    }
                    stop.output.validate()?;
                }
                Ok(())
            }
        }
    }

    /// Evaluates the expression for one feature.
    pub fn evaluate(&self, feature: &Feature) -> Result<Value, EvalError> {
        match self {
            Expression::Literal(v) => Ok(v.clone()),
            Expression::Get(key) => match feature.property(key) {
                None => Ok(Value::Null),
                Some(json) => {
                    Value::from_json(json).ok_or_else(|| EvalError::NonScalarProperty(key.clone()))
                }
            },
            Expression::Has(key) => Ok(Value::Bool(feature.property(key).is_some())),
            Expression::Id => Ok(feature
                .id
                .map_or(Value::Null, |id| Value::Number(id.as_f64()))),
            Expression::Coalesce(items) => {
                for item in items {
                    let v = item.evaluate(feature)?;
                    if !v.is_null() {
                        return Ok(v);
                    }
                }
                Ok(Value::Null)
            }
            Expression::ToNumber(inner) => to_number(inner.evaluate(feature)?),
            Expression::Equals(lhs, rhs) => {
                Ok(Value::Bool(lhs.evaluate(feature)? == rhs.evaluate(feature)?))
            }
            Expression::All(items) => {
                for item in items {
                    if !expect_bool(item.evaluate(feature)?)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Expression::Case { branches, fallback } => {
                for (condition, output) in branches {
                    if expect_bool(condition.evaluate(feature)?)? {
                        return output.evaluate(feature);
                    }
                }
                fallback.evaluate(feature)
            }
            Expression::Interpolate { input, stops } => {
                let x = match input.evaluate(feature)? {
                    Value::Number(n) => n,
                    other => return Err(EvalError::ExpectedNumber(other)),
                };
                interpolate(x, stops, feature)
            }
        }
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<Value> for Expression {
    fn from(v: Value) -> Self {
        Expression::Literal(v)
    }
}

fn operator_json(op: &str, items: &[Expression]) -> Json {
    let mut out = Vec::with_capacity(items.len() + 1);
    out.push(json!(op));
    out.extend(items.iter().map(Expression::to_json));
    Json::Array(out)
}

fn validate_operands(op: &'static str, items: &[Expression]) -> Result<(), ExpressionError> {
    if items.is_empty() {
        return Err(ExpressionError::NoOperands(op));
    }
    items.iter().try_for_each(Expression::validate)
}

fn expect_bool(v: Value) -> Result<bool, EvalError> {
    match v {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::ExpectedBoolean(other)),
    }
}

fn to_number(v: Value) -> Result<Value, EvalError> {
    match v {
        Value::Null => Ok(Value::Number(0.0)),
        Value::Bool(b) => Ok(Value::Number(if b { 1.0 } else { 0.0 })),
        Value::Number(n) => Ok(Value::Number(n)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(Value::Number(0.0));
            }
            trimmed
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|_| EvalError::NotANumber(s))
        }
        Value::Color(c) => Err(EvalError::NotANumber(c.to_hex())),
    }
}

fn interpolate(x: f64, stops: &[Stop], feature: &Feature) -> Result<Value, EvalError> {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Err(ExpressionError::NoStops.into());
    };
    if x <= first.input {
        return first.output.evaluate(feature);
    }
    if x >= last.input {
        return last.output.evaluate(feature);
    }

    let upper = stops.partition_point(|s| s.input <= x);
    let lo = &stops[upper - 1];
    let hi = &stops[upper];
    let t = (x - lo.input) / (hi.input - lo.input);

    match (lo.output.evaluate(feature)?, hi.output.evaluate(feature)?) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + (b - a) * t)),
        (Value::Color(a), Value::Color(b)) => Ok(Value::Color(a.lerp(b, t))),
        (a, b) => Err(EvalError::MismatchedOutputs(a, b)),
    }
}
