use crate::error::TemplateError;
use crate::template::lexer::Token;
use serde_json::Value;

/// Methods an expression may end with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Upper,
    Lower,
    Title,
    Capitalize,
    Length,
}

impl Method {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "upper" => Some(Method::Upper),
            "lower" => Some(Method::Lower),
            "title" => Some(Method::Title),
            "capitalize" => Some(Method::Capitalize),
            "length" => Some(Method::Length),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Method::Upper => "upper",
            Method::Lower => "lower",
            Method::Title => "title",
            Method::Capitalize => "capitalize",
            Method::Length => "length",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path {
        segments: Vec<String>,
        method: Option<Method>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub negated: bool,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Output { expr: Expr, escape: bool },
    If {
        branches: Vec<(Condition, Vec<Node>)>,
        otherwise: Option<Vec<Node>>,
    },
    For {
        binding: String,
        iterable: Expr,
        body: Vec<Node>,
    },
}

pub fn parse(tokens: Vec<Token>) -> Result<Vec<Node>, TemplateError> {
    let mut parser = Parser { tokens, pos: 0 };
    let (nodes, end) = parser.block(&[])?;
    match end {
        Some(tag) => Err(TemplateError::UnmatchedEnd { tag }),
        None => Ok(nodes),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Parse until one of `terminators` (returned) or the end of input (`None`)
    fn block(&mut self, terminators: &[&str]) -> Result<(Vec<Node>, Option<String>), TemplateError> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.get(self.pos).cloned() {
            self.pos += 1;
            match token {
                Token::Text(text) => nodes.push(Node::Text(text)),
                Token::Output { expr, escape } => nodes.push(Node::Output {
                    expr: parse_expr(&expr)?,
                    escape,
                }),
                Token::Statement(statement) => {
                    let keyword = statement.split_whitespace().next().unwrap_or_default();
                    match keyword {
                        "if" => nodes.push(self.if_block(&statement)?),
                        "for" => nodes.push(self.for_block(&statement)?),
                        "elif" | "else" | "endif" | "endfor" => {
                            if terminators.contains(&keyword) {
                                return Ok((nodes, Some(statement)));
                            }
                            return Ok((nodes, Some(keyword.to_string())));
                        }
                        _ => return Err(TemplateError::UnknownTag { tag: statement }),
                    }
                }
            }
        }
        Ok((nodes, None))
    }

    fn if_block(&mut self, statement: &str) -> Result<Node, TemplateError> {
        let mut branches = Vec::new();
        let mut otherwise = None;
        let mut condition = parse_condition(keyword_rest(statement, "if"))?;

        loop {
            let (body, end) = self.block(&["elif", "else", "endif"])?;
            let end = end.ok_or_else(|| TemplateError::UnclosedBlock { block: "if".into() })?;
            let keyword = end.split_whitespace().next().unwrap_or_default().to_string();
            match keyword.as_str() {
                "elif" => {
                    branches.push((condition, body));
                    condition = parse_condition(keyword_rest(&end, "elif"))?;
                }
                "else" => {
                    branches.push((condition, body));
                    let (else_body, end) = self.block(&["endif"])?;
                    match end.as_deref().map(|e| e.split_whitespace().next().unwrap_or_default()) {
                        Some("endif") => {
                            otherwise = Some(else_body);
                            break;
                        }
                        Some(other) => return Err(TemplateError::UnmatchedEnd { tag: other.to_string() }),
                        None => return Err(TemplateError::UnclosedBlock { block: "if".into() }),
                    }
                }
                "endif" => {
                    branches.push((condition, body));
                    break;
                }
                other => return Err(TemplateError::UnmatchedEnd { tag: other.to_string() }),
            }
        }

        Ok(Node::If { branches, otherwise })
    }

    fn for_block(&mut self, statement: &str) -> Result<Node, TemplateError> {
        let header = keyword_rest(statement, "for");
        let invalid = || TemplateError::InvalidExpression {
            expr: statement.to_string(),
        };
        let (binding, iterable) = header.split_once(" in ").ok_or_else(invalid)?;
        let binding = binding.trim();
        check_identifier(binding).map_err(|e| match e {
            TemplateError::InvalidExpression { .. } => invalid(),
            other => other,
        })?;
        let iterable = parse_expr(iterable)?;

        let (body, end) = self.block(&["endfor"])?;
        match end.as_deref().map(|e| e.split_whitespace().next().unwrap_or_default()) {
            Some("endfor") => Ok(Node::For {
                binding: binding.to_string(),
                iterable,
                body,
            }),
            Some(other) => Err(TemplateError::UnmatchedEnd { tag: other.to_string() }),
            None => Err(TemplateError::UnclosedBlock { block: "for".into() }),
        }
    }
}

/// Text after the leading keyword, without a trailing `:`
fn keyword_rest<'a>(statement: &'a str, keyword: &str) -> &'a str {
    statement
        .strip_prefix(keyword)
        .unwrap_or(statement)
        .trim()
        .trim_end_matches(':')
        .trim()
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn check_identifier(name: &str) -> Result<(), TemplateError> {
    if name.starts_with("__") {
        return Err(TemplateError::Forbidden { name: name.to_string() });
    }
    if !is_identifier(name) {
        return Err(TemplateError::InvalidExpression { expr: name.to_string() });
    }
    Ok(())
}

pub fn parse_condition(text: &str) -> Result<Condition, TemplateError> {
    match text.strip_prefix("not ") {
        Some(rest) => Ok(Condition {
            negated: true,
            expr: parse_expr(rest)?,
        }),
        None => Ok(Condition {
            negated: false,
            expr: parse_expr(text)?,
        }),
    }
}

/// Literal, or dotted path with an optional trailing safe method call
pub fn parse_expr(text: &str) -> Result<Expr, TemplateError> {
    let text = text.trim();
    let invalid = || TemplateError::InvalidExpression { expr: text.to_string() };

    if text.is_empty() {
        return Err(invalid());
    }
    if let Some(literal) = parse_literal(text) {
        return Ok(Expr::Literal(literal));
    }

    let mut segments: Vec<String> = text.split('.').map(str::to_string).collect();
    let mut method = None;
    if let Some(last) = segments.last() {
        if let Some(name) = last.strip_suffix("()") {
            if name.starts_with("__") {
                return Err(TemplateError::Forbidden { name: name.to_string() });
            }
            method = Some(Method::parse(name).ok_or_else(|| TemplateError::MethodNotAllowed {
                method: name.to_string(),
                kind: "template values".to_string(),
            })?);
            segments.pop();
        }
    }

    if segments.is_empty() {
        return Err(invalid());
    }
    for (i, segment) in segments.iter().enumerate() {
        if segment.starts_with("__") {
            return Err(TemplateError::Forbidden { name: segment.clone() });
        }
        let valid = is_identifier(segment) || (i > 0 && is_index(segment));
        if !valid {
            return Err(invalid());
        }
    }

    Ok(Expr::Path { segments, method })
}

fn parse_literal(text: &str) -> Option<Value> {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            let inner = &text[1..text.len() - 1];
            if !inner.contains(quote) {
                return Some(Value::String(inner.to_string()));
            }
        }
    }
    match text {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" | "none" | "None" => return Some(Value::Null),
        _ => {}
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::from(n));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && text.starts_with(|c: char| c.is_ascii_digit() || c == '-'))
        .map(Value::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::lexer::tokenize;
    use serde_json::json;

    fn parse_source(source: &str) -> Result<Vec<Node>, TemplateError> {
        parse(tokenize(source)?)
    }

    fn path(segments: &[&str]) -> Expr {
        Expr::Path {
            segments: segments.iter().map(|s| s.to_string()).collect(),
            method: None,
        }
    }

    #[test]
    fn test_parse_expressions() {
        assert_eq!(parse_expr("user.name").unwrap(), path(&["user", "name"]));
        assert_eq!(parse_expr("items.0").unwrap(), path(&["items", "0"]));
        assert_eq!(
            parse_expr("name.upper()").unwrap(),
            Expr::Path {
                segments: vec!["name".into()],
                method: Some(Method::Upper)
            }
        );
        assert_eq!(parse_expr("'hi'").unwrap(), Expr::Literal(json!("hi")));
        assert_eq!(parse_expr("42").unwrap(), Expr::Literal(json!(42)));
        assert_eq!(parse_expr("-1.5").unwrap(), Expr::Literal(json!(-1.5)));
        assert_eq!(parse_expr("true").unwrap(), Expr::Literal(json!(true)));
    }

    #[test]
    fn test_reject_unsafe_expressions() {
        assert!(matches!(parse_expr("user.__class__"), Err(TemplateError::Forbidden { .. })));
        assert!(matches!(parse_expr("__import__"), Err(TemplateError::Forbidden { .. })));
        assert!(matches!(parse_expr("os.system()"), Err(TemplateError::MethodNotAllowed { .. })));
        assert!(matches!(parse_expr("a + b"), Err(TemplateError::InvalidExpression { .. })));
        assert!(matches!(parse_expr("0.name"), Err(TemplateError::InvalidExpression { .. })));
        assert!(matches!(parse_expr(""), Err(TemplateError::InvalidExpression { .. })));
    }

    #[test]
    fn test_parse_if_elif_else() {
        let nodes = parse_source("<% if a %>A<% elif not b %>B<% else %>C<% endif %>").unwrap();
        let Node::If { branches, otherwise } = &nodes[0] else {
            panic!("expected an if node");
        };
        assert_eq!(branches.len(), 2);
        assert!(branches[1].0.negated);
        assert_eq!(otherwise.as_deref(), Some(&[Node::Text("C".into())][..]));
    }

    #[test]
    fn test_parse_for() {
        let nodes = parse_source("<% for item in order.items %><%= item %><% endfor %>").unwrap();
        assert!(matches!(&nodes[0], Node::For { binding, body, .. } if binding == "item" && body.len() == 1));
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(
            parse_source("<% if a %>x").unwrap_err(),
            TemplateError::UnclosedBlock { block: "if".into() }
        );
        assert_eq!(
            parse_source("x<% endif %>").unwrap_err(),
            TemplateError::UnmatchedEnd { tag: "endif".into() }
        );
        assert_eq!(
            parse_source("<% for x in xs %><% endif %>").unwrap_err(),
            TemplateError::UnmatchedEnd { tag: "endif".into() }
        );
        assert_eq!(
            parse_source("<% while a %>").unwrap_err(),
            TemplateError::UnknownTag { tag: "while a".into() }
        );
        assert!(matches!(
            parse_source("<% for x of xs %><% endfor %>"),
            Err(TemplateError::InvalidExpression { .. })
        ));
    }
}
