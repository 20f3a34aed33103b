//! Expression evaluation against a JSON scope.
//!
//! Only field access, literals and a fixed set of functions are available;
//! templates cannot reach anything outside the scope they are rendered with.

use serde_json::Value;

use super::TemplateError;
use super::parser::Expr;

/// Names callable from templates.
pub const FUNCTIONS: &[&str] = &[
    "upper", "lower", "trim", "json", "encode", "len", "join", "default",
];

/// Evaluates an expression.
///
/// # Errors
///
/// Returns `TemplateError::UndefinedField` when a path does not resolve,
/// `UnknownFunction` for names outside [`FUNCTIONS`], and `Type` for
/// arguments a function cannot accept.
pub fn evaluate(expr: &Expr, scope: &Value) -> Result<Value, TemplateError> {
    match expr {
        Expr::Var(name) if name == "this" => Ok(scope.clone()),
        Expr::Var(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::UndefinedField(name.clone())),
        Expr::Field(target, name) => {
            let value = evaluate(target, scope)?;
            value
                .get(name)
                .cloned()
                .ok_or_else(|| TemplateError::UndefinedField(expr.to_string()))
        }
        Expr::Index(target, index) => {
            let value = evaluate(target, scope)?;
            value
                .get(index)
                .cloned()
                .ok_or_else(|| TemplateError::UndefinedField(expr.to_string()))
        }
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Call(name, args) => call(name, args, scope),
    }
}

fn call(name: &str, args: &[Expr], scope: &Value) -> Result<Value, TemplateError> {
    if name == "default" {
        let [value, fallback] = args else {
            return Err(arity(name, 2, args.len()));
        };
        return match evaluate(value, scope) {
            Ok(Value::Null) | Err(TemplateError::UndefinedField(_)) => evaluate(fallback, scope),
            other => other,
        };
    }

    let values = args
        .iter()
        .map(|arg| evaluate(arg, scope))
        .collect::<Result<Vec<_>, _>>()?;

    match (name, values.as_slice()) {
        ("upper", [value]) => Ok(Value::String(to_text(value).to_uppercase())),
        ("lower", [value]) => Ok(Value::String(to_text(value).to_lowercase())),
        ("trim", [value]) => Ok(Value::String(to_text(value).trim().to_string())),
        ("json", [value]) => Ok(Value::String(value.to_string())),
        ("encode", [value]) => Ok(Value::String(encode_component(&to_text(value)))),
        ("len", [value]) => length(value).map(Value::from),
        ("join", [Value::Array(items), separator]) => Ok(Value::String(
            items
                .iter()
                .map(to_text)
                .collect::<Vec<_>>()
                .join(&to_text(separator)),
        )),
        ("join", [_, _]) => Err(TemplateError::Type {
            function: name.to_string(),
            message: "first argument must be a sequence".to_string(),
        }),
        ("upper" | "lower" | "trim" | "json" | "encode" | "len", _) => {
            Err(arity(name, 1, values.len()))
        }
        ("join", _) => Err(arity(name, 2, values.len())),
        _ => Err(TemplateError::UnknownFunction(name.to_string())),
    }
}

fn arity(function: &str, expected: usize, got: usize) -> TemplateError {
    TemplateError::Type {
        function: function.to_string(),
        message: format!("expected {expected} argument(s), got {got}"),
    }
}

fn length(value: &Value) -> Result<usize, TemplateError> {
    match value {
        Value::String(s) => Ok(s.chars().count()),
        Value::Array(items) => Ok(items.len()),
        Value::Object(map) => Ok(map.len()),
        other => Err(TemplateError::Type {
            function: "len".to_string(),
            message: format!("{other} has no length"),
        }),
    }
}

/// Text form of a value inside a rendered template.
///
/// Strings are verbatim, `null` renders as `null`, composites as compact JSON.
#[must_use]
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Percent-encodes everything outside the RFC 3986 unreserved set
/// (`A-Z a-z 0-9 - _ . ~`).
#[must_use]
pub fn encode_component(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}
