//! Runtime template rendering
//!
//! Renders `${expression}` templates (task URLs and similar configuration
//! strings) against a JSON scope built from the test context.
//!
//! # Usage
//!
//! ```
//! use serde_json::json;
//! use tapestry_application::template::render;
//!
//! let scope = json!({"config": {"host": "localhost", "stage": "Dev"}});
//! let url = render("http://${config.host}/${config.stage.lower()}/users", &scope).unwrap();
//! assert_eq!(url, "http://localhost/dev/users");
//! ```
//!
//! Templates are trusted configuration: they may read any field of the
//! scope, but expressions are limited to field access, literals and the
//! functions in [`eval::FUNCTIONS`].

pub mod eval;
pub mod parser;

use serde_json::Value;
use thiserror::Error;

pub use eval::{encode_component, evaluate, to_text};
pub use parser::{Expr, Segment, parse_expression, parse_template};

/// Errors raised while parsing or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// An expression references a field the scope does not define.
    #[error("undefined template field: {0}")]
    UndefinedField(String),

    /// An expression calls a function outside the whitelist.
    #[error("unknown template function: {0}")]
    UnknownFunction(String),

    /// A function received arguments it cannot accept.
    #[error("invalid arguments to {function}(): {message}")]
    Type {
        /// Function name.
        function: String,
        /// What was wrong.
        message: String,
    },

    /// An expression is malformed.
    #[error("template syntax error at offset {offset}: {message}")]
    Syntax {
        /// Byte offset in the template.
        offset: usize,
        /// What was wrong.
        message: String,
    },

    /// A `${` has no closing `}`.
    #[error("unterminated template expression at offset {offset}")]
    Unterminated {
        /// Byte offset of the `${`.
        offset: usize,
    },
}

/// A parsed template, reusable across scopes.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parses a template.
    ///
    /// # Errors
    ///
    /// Returns a syntax error if any expression is malformed.
    pub fn parse(input: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            segments: parse_template(input)?,
        })
    }

    /// Parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Renders the template in a single pass.
    ///
    /// # Errors
    ///
    /// Fails on the first expression that cannot be evaluated; undefined
    /// fields are never rendered as empty text.
    pub fn render(&self, scope: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Expr(expr) => out.push_str(&to_text(&evaluate(expr, scope)?)),
            }
        }
        Ok(out)
    }
}

/// Parses and renders a template.
///
/// # Errors
///
/// See [`Template::parse`] and [`Template::render`].
pub fn render(template: &str, scope: &Value) -> Result<String, TemplateError> {
    Template::parse(template)?.render(scope)
}
