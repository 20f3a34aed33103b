//! Template parser for `${expression}` syntax
//!
//! Splits a template into literal text and expression segments, and parses
//! each expression into a small AST.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use serde_json::Value;

use super::TemplateError;

/// A piece of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Text copied verbatim.
    Literal(String),
    /// An expression evaluated against the scope.
    Expr(Expr),
}

/// Expression AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Top-level name (`config`, `this`).
    Var(String),
    /// `target.name`
    Field(Box<Expr>, String),
    /// `target[3]`
    Index(Box<Expr>, usize),
    /// String, number, boolean or null literal.
    Literal(Value),
    /// `name(args)` or `target.name(args)` (target becomes the first argument).
    Call(String, Vec<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(name) => f.write_str(name),
            Self::Field(target, name) => write!(f, "{target}.{name}"),
            Self::Index(target, index) => write!(f, "{target}[{index}]"),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Call(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Parses a template into segments.
///
/// `\${` produces a literal `${`.
///
/// # Errors
///
/// Returns `TemplateError::Unterminated` for a `${` without a closing `}`,
/// and `TemplateError::Syntax` for a malformed expression.
pub fn parse_template(input: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = input.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        match ch {
            '\\' if input[i + 1..].starts_with("${") => {
                chars.next(); // consume $
                literal.push('$');
            }
            '$' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next(); // consume {
                let body_start = i + 2;
                let body_end = find_closing_brace(&mut chars)
                    .ok_or(TemplateError::Unterminated { offset: i })?;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let expr = parse_expression(&input[body_start..body_end], body_start)?;
                segments.push(Segment::Expr(expr));
            }
            _ => literal.push(ch),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Advances past the `}` closing an expression, skipping quoted strings.
/// Returns the byte index of that `}`.
fn find_closing_brace(chars: &mut Peekable<CharIndices<'_>>) -> Option<usize> {
    let mut quote: Option<char> = None;
    while let Some((i, ch)) = chars.next() {
        match (quote, ch) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '}') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

/// Parses one expression. `base` is its byte offset in the template.
///
/// # Errors
///
/// Returns `TemplateError::Syntax` if the expression is malformed.
pub fn parse_expression(source: &str, base: usize) -> Result<Expr, TemplateError> {
    let mut parser = ExprParser {
        source,
        base,
        pos: 0,
    };
    parser.skip_whitespace();
    if parser.at_end() {
        return Err(parser.error("empty expression"));
    }
    let expr = parser.expression()?;
    parser.skip_whitespace();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

struct ExprParser<'a> {
    source: &'a str,
    base: usize,
    pos: usize,
}

impl ExprParser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::Syntax {
            offset: self.base + self.pos,
            message: message.into(),
        }
    }

    fn expression(&mut self) -> Result<Expr, TemplateError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat('.') {
                self.skip_whitespace();
                let name = self.identifier()?;
                if self.eat('(') {
                    let mut args = vec![expr];
                    args.extend(self.arguments()?);
                    expr = Expr::Call(name, args);
                } else {
                    expr = Expr::Field(Box::new(expr), name);
                }
            } else if self.eat('[') {
                self.skip_whitespace();
                expr = match self.peek() {
                    Some('\'' | '"') => {
                        let Value::String(key) = self.string()? else {
                            return Err(self.error("expected string key"));
                        };
                        Expr::Field(Box::new(expr), key)
                    }
                    _ => {
                        let index = self.index()?;
                        Expr::Index(Box::new(expr), index)
                    }
                };
                if !self.eat(']') {
                    return Err(self.error("expected ']'"));
                }
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, TemplateError> {
        self.skip_whitespace();
        match self.peek() {
            Some('\'' | '"') => Ok(Expr::Literal(self.string()?)),
            Some(c) if c.is_ascii_digit() || c == '-' => Ok(Expr::Literal(self.number()?)),
            Some(c) if is_ident_start(c) => {
                let name = self.identifier()?;
                match name.as_str() {
                    "true" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" => Ok(Expr::Literal(Value::Bool(false))),
                    "null" => Ok(Expr::Literal(Value::Null)),
                    _ if self.eat('(') => Ok(Expr::Call(name, self.arguments()?)),
                    _ => Ok(Expr::Var(name)),
                }
            }
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    /// Parses arguments after an opening `(` up to and including `)`.
    fn arguments(&mut self) -> Result<Vec<Expr>, TemplateError> {
        let mut args = Vec::new();
        if self.eat(')') {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(')') {
                return Ok(args);
            }
            if !self.eat(',') {
                return Err(self.error("expected ',' or ')'"));
            }
        }
    }

    fn identifier(&mut self) -> Result<String, TemplateError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_ident_start(c) => {
                self.bump();
            }
            _ => return Err(self.error("expected identifier")),
        }
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            self.bump();
        }
        Ok(self.source[start..self.pos].to_string())
    }

    fn index(&mut self) -> Result<usize, TemplateError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        self.source[start..self.pos]
            .parse()
            .map_err(|_| self.error("expected array index"))
    }

    fn number(&mut self) -> Result<Value, TemplateError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.bump();
        }
        let text = &self.source[start..self.pos];
        serde_json::from_str::<serde_json::Number>(text)
            .map(Value::Number)
            .map_err(|_| self.error(format!("invalid number '{text}'")))
    }

    fn string(&mut self) -> Result<Value, TemplateError> {
        let Some(quote) = self.bump() else {
            return Err(self.error("expected string"));
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) if c == quote => return Ok(Value::String(out)),
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    fn field(target: Expr, name: &str) -> Expr {
        Expr::Field(Box::new(target), name.to_string())
    }

    #[test]
    fn test_parse_literal_only() {
        let segments = parse_template("https://example.com").unwrap();
        assert_eq!(segments, vec![Segment::Literal("https://example.com".into())]);
    }

    #[test]
    fn test_parse_field_path() {
        let segments = parse_template("https://${config.host}/api").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("https://".into()),
                Segment::Expr(field(var("config"), "host")),
                Segment::Literal("/api".into()),
            ]
        );
    }

    #[test]
    fn test_parse_this_prefix_and_index() {
        let expr = parse_expression("this.users[0]['first-name']", 0).unwrap();
        assert_eq!(
            expr,
            field(
                Expr::Index(Box::new(field(var("this"), "users")), 0),
                "first-name"
            )
        );
    }

    #[test]
    fn test_parse_function_and_method_calls() {
        let expr = parse_expression("config.name.upper()", 0).unwrap();
        assert_eq!(
            expr,
            Expr::Call("upper".into(), vec![field(var("config"), "name")])
        );

        let expr = parse_expression("join(ids, '-')", 0).unwrap();
        assert_eq!(
            expr,
            Expr::Call("join".into(), vec![var("ids"), Expr::Literal(json!("-"))])
        );
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_expression("42", 0).unwrap(), Expr::Literal(json!(42)));
        assert_eq!(parse_expression("-1.5", 0).unwrap(), Expr::Literal(json!(-1.5)));
        assert_eq!(parse_expression("true", 0).unwrap(), Expr::Literal(json!(true)));
        assert_eq!(parse_expression("\"a}b\"", 0).unwrap(), Expr::Literal(json!("a}b")));
    }

    #[test]
    fn test_brace_inside_string_does_not_close() {
        let segments = parse_template("${default(x, '}')}!").unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1], Segment::Literal("!".into()));
    }

    #[test]
    fn test_escaped_dollar_is_literal() {
        let segments = parse_template(r"cost: \${price}").unwrap();
        assert_eq!(segments, vec![Segment::Literal("cost: ${price}".into())]);
    }

    #[test]
    fn test_unterminated_expression() {
        assert_eq!(
            parse_template("a ${config.host"),
            Err(TemplateError::Unterminated { offset: 2 })
        );
    }

    #[test]
    fn test_syntax_errors_report_offset() {
        let err = parse_template("x${config..host}").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { offset: 10, .. }), "{err:?}");
        assert!(parse_template("${}").is_err());
        assert!(parse_template("${a b}").is_err());
    }

    #[test]
    fn test_display_round_trips_shape() {
        let expr = parse_expression("join(this.ids, ',')", 0).unwrap();
        assert_eq!(expr.to_string(), "join(this.ids, \",\")");
    }
}
