use crate::ast::{ExprId, Expression};
use crate::error::ScriptError;
use crate::schema::ValueKind;
use serde::Serialize;

pub const DEFAULT_FLOAT_PRECISION: usize = 4;

/// A converted, typed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Enum(String),
    Object(String),
    Array(Vec<Scalar>),
}

impl Scalar {
    /// Whether this value already has the shape `kind` asks for.
    #[must_use]
    pub fn matches(&self, kind: &ValueKind) -> bool {
        match (self, kind) {
            (Scalar::Int(_), ValueKind::Int)
            | (Scalar::Float(_), ValueKind::Float)
            | (Scalar::Bool(_), ValueKind::Bool)
            | (Scalar::Str(_), ValueKind::Str)
            | (Scalar::Object(_), ValueKind::Object(_)) => true,
            (Scalar::Enum(v), ValueKind::Enum(def)) => def.variant(v).is_some(),
            (Scalar::Array(items), ValueKind::Array(element)) => {
                items.iter().all(|item| item.matches(element))
            }
            _ => false,
        }
    }

    /// Passes a value of the right type through untouched, otherwise
    /// converts its textual form.
    pub fn coerce(self, kind: &ValueKind) -> Result<Scalar, ScriptError> {
        if self.matches(kind) {
            return Ok(self);
        }
        let text = self.render(DEFAULT_FLOAT_PRECISION).join(" ");
        convert(&text, kind)
    }

    /// Script arguments for this value. Arrays yield one argument per item;
    /// anything containing whitespace is quoted.
    #[must_use]
    pub fn render(&self, precision: usize) -> Vec<String> {
        match self {
            Scalar::Array(items) => items.iter().flat_map(|item| item.render(precision)).collect(),
            other => vec![quote(&other.render_bare(precision))],
        }
    }

    fn render_bare(&self, precision: usize) -> String {
        match self {
            Scalar::Int(v) => v.to_string(),
            Scalar::Float(v) => format_float(*v, precision),
            Scalar::Bool(v) => (if *v { "1" } else { "0" }).to_string(),
            Scalar::Str(s) | Scalar::Enum(s) | Scalar::Object(s) => s.clone(),
            Scalar::Array(items) => items
                .iter()
                .map(|item| item.render_bare(precision))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Scalar::Float(v) => Some(*v),
            Scalar::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) | Scalar::Enum(s) | Scalar::Object(s) => Some(s),
            _ => None,
        }
    }
}

/// A stored value, optionally bound to the expression it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub data: Scalar,
    pub expression: Option<ExprId>,
    /// Per-item bindings of an array value, parallel to its items. Empty
    /// when no item was read from an expression.
    pub item_expressions: Vec<Option<ExprId>>,
}

impl Value {
    pub fn new(data: Scalar) -> Self {
        Value {
            data,
            expression: None,
            item_expressions: Vec::new(),
        }
    }

    pub fn bound(data: Scalar, expression: ExprId) -> Self {
        Value {
            data,
            expression: Some(expression),
            item_expressions: Vec::new(),
        }
    }

    /// Gathers converted items into one array value, keeping each item's
    /// binding.
    pub fn array(items: Vec<Value>) -> Self {
        let item_expressions: Vec<Option<ExprId>> = items.iter().map(|item| item.expression).collect();
        let item_expressions = if item_expressions.iter().any(Option::is_some) {
            item_expressions
        } else {
            Vec::new()
        };
        Value {
            data: Scalar::Array(items.into_iter().map(|item| item.data).collect()),
            expression: None,
            item_expressions,
        }
    }
}

impl From<Scalar> for Value {
    fn from(data: Scalar) -> Self {
        Value::new(data)
    }
}

/// Resolves `v_`/`c_` names while converting arguments.
pub trait ExpressionLookup {
    fn lookup(&self, name: &str) -> Option<&Expression>;
}

/// For conversions where no variables are in scope.
pub struct NoExpressions;

impl ExpressionLookup for NoExpressions {
    fn lookup(&self, _name: &str) -> Option<&Expression> {
        None
    }
}

pub fn is_expression_ref(text: &str) -> bool {
    let lower = text.get(..2).map(str::to_ascii_lowercase);
    matches!(lower.as_deref(), Some("v_" | "c_"))
}

/// Converts one textual argument.
pub fn convert(text: &str, kind: &ValueKind) -> Result<Scalar, ScriptError> {
    let unconvertible = || ScriptError::UnconvertibleValue {
        value: text.to_string(),
        target: kind.describe(),
    };
    match kind {
        ValueKind::Int => text.trim().parse().map(Scalar::Int).map_err(|_| unconvertible()),
        ValueKind::Float => text.trim().parse().map(Scalar::Float).map_err(|_| unconvertible()),
        ValueKind::Bool => parse_bool(text.trim()).map(Scalar::Bool).ok_or_else(unconvertible),
        ValueKind::Str => Ok(Scalar::Str(unquote(text))),
        ValueKind::Object(_) => Ok(Scalar::Object(unquote(text))),
        ValueKind::Enum(def) => def
            .variant(unquote(text).trim())
            .map(|v| Scalar::Enum(v.to_string()))
            .ok_or_else(unconvertible),
        ValueKind::Array(element) => unquote(text)
            .split_whitespace()
            .map(|item| convert(item, element))
            .collect::<Result<Vec<_>, _>>()
            .map(Scalar::Array),
    }
}

// Textual true/false first, then the 1/0 most scripts use.
fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        return Some(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Some(false);
    }
    match text.parse::<i64>() {
        Ok(1) => Some(true),
        Ok(0) => Some(false),
        _ => None,
    }
}

/// Converts one argument, following `v_`/`c_` references.
pub fn convert_argument(
    text: &str,
    kind: &ValueKind,
    lookup: &dyn ExpressionLookup,
) -> Result<Value, ScriptError> {
    if is_expression_ref(text) {
        let expression = lookup
            .lookup(text)
            .ok_or_else(|| ScriptError::UndefinedExpression {
                name: text.to_string(),
            })?;
        let data = convert(expression.raw_value(), kind)?;
        return Ok(Value::bound(data, expression.id));
    }
    convert(text, kind).map(Value::new)
}

/// Converts positional arguments against `kinds`. An array kind takes every
/// remaining argument; otherwise the counts must agree exactly.
pub fn convert_arguments(
    property: &str,
    kinds: &[ValueKind],
    args: &[String],
    lookup: &dyn ExpressionLookup,
) -> Result<Vec<Value>, ScriptError> {
    let count_error = || ScriptError::InvalidArgumentCount {
        property: property.to_string(),
        expected: expected_count(kinds),
        found: args.len(),
    };

    let mut values = Vec::with_capacity(kinds.len());
    let mut rest = args;
    for kind in kinds {
        if let ValueKind::Array(element) = kind {
            let items = rest
                .iter()
                .map(|arg| convert_argument(arg, element, lookup))
                .collect::<Result<Vec<_>, _>>()?;
            values.push(Value::array(items));
            rest = &[];
            continue;
        }
        let (first, tail) = rest.split_first().ok_or_else(count_error)?;
        values.push(convert_argument(first, kind, lookup)?);
        rest = tail;
    }
    if !rest.is_empty() {
        return Err(count_error());
    }
    Ok(values)
}

fn expected_count(kinds: &[ValueKind]) -> String {
    let fixed = kinds
        .iter()
        .filter(|k| !matches!(k, ValueKind::Array(_)))
        .count();
    if fixed < kinds.len() {
        format!("at least {fixed}")
    } else {
        fixed.to_string()
    }
}

/// Fixed precision with trailing zeros trimmed, keeping one decimal.
/// Always uses `.` as the separator.
#[must_use]
pub fn format_float(value: f64, precision: usize) -> String {
    let mut text = format!("{value:.precision$}");
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.push('0');
        }
    } else if value.is_finite() {
        text.push_str(".0");
    }
    if text == "-0.0" {
        text = "0.0".to_string();
    }
    text
}

/// Wraps text in double quotes when it contains whitespace or is empty.
#[must_use]
pub fn quote(text: &str) -> String {
    let already = text.len() >= 2 && text.starts_with('"') && text.ends_with('"');
    if !already && (text.is_empty() || text.contains(char::is_whitespace)) {
        format!("\"{text}\"")
    } else {
        text.to_string()
    }
}

#[must_use]
pub fn unquote(text: &str) -> String {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('"')
        .map(|inner| inner.strip_suffix('"').unwrap_or(inner))
        .unwrap_or(trimmed)
        .to_string()
}
