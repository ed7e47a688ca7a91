use crate::error::TemplateError;
use crate::template::MissingPolicy;
use crate::template::parser::{Condition, Expr, Method, Node};
use crate::utils::string;
use crate::utils::types::{is_truthy, kind_name, to_display_string};
use serde_json::{Map, Value};

/// Evaluation state for one render call
pub struct Renderer<'a> {
    context: &'a Map<String, Value>,
    scopes: Vec<(String, Value)>,
    escape: bool,
    missing: MissingPolicy,
}

impl<'a> Renderer<'a> {
    pub fn new(context: &'a Map<String, Value>, escape: bool, missing: MissingPolicy) -> Self {
        Self {
            context,
            scopes: Vec::new(),
            escape,
            missing,
        }
    }

    pub fn render(&mut self, nodes: &[Node], out: &mut String) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Output { expr, escape } => {
                    if let Some(value) = self.eval(expr)? {
                        let text = to_display_string(&value);
                        if *escape && self.escape {
                            out.push_str(&string::escape(&text));
                        } else {
                            out.push_str(&text);
                        }
                    }
                }
                Node::If { branches, otherwise } => {
                    let mut taken = false;
                    for (condition, body) in branches {
                        if self.test(condition)? {
                            self.render(body, out)?;
                            taken = true;
                            break;
                        }
                    }
                    if !taken {
                        if let Some(body) = otherwise {
                            self.render(body, out)?;
                        }
                    }
                }
                Node::For { binding, iterable, body } => {
                    let items = match self.eval(iterable)? {
                        None | Some(Value::Null) => Vec::new(),
                        Some(Value::Array(items)) => items,
                        Some(Value::Object(map)) => map.keys().cloned().map(Value::String).collect(),
                        Some(other) => {
                            return Err(TemplateError::InvalidExpression {
                                expr: format!("{} is not iterable", kind_name(&other)),
                            });
                        }
                    };
                    for item in items {
                        self.scopes.push((binding.clone(), item));
                        let result = self.render(body, out);
                        self.scopes.pop();
                        result?;
                    }
                }
            }
        }
        Ok(())
    }

    fn test(&self, condition: &Condition) -> Result<bool, TemplateError> {
        let truthy = self.eval(&condition.expr)?.is_some_and(|v| is_truthy(&v));
        Ok(truthy != condition.negated)
    }

    /// `None` when a lookup missed under `MissingPolicy::Empty`
    fn eval(&self, expr: &Expr) -> Result<Option<Value>, TemplateError> {
        match expr {
            Expr::Literal(value) => Ok(Some(value.clone())),
            Expr::Path { segments, method } => {
                let Some(value) = self.lookup(segments)? else {
                    return Ok(None);
                };
                match method {
                    Some(method) => apply_method(*method, &value).map(Some),
                    None => Ok(Some(value)),
                }
            }
        }
    }

    fn lookup(&self, segments: &[String]) -> Result<Option<Value>, TemplateError> {
        let Some((root, rest)) = segments.split_first() else {
            return Ok(None);
        };

        let scoped = self.scopes.iter().rev().find(|(name, _)| name == root).map(|(_, v)| v);
        let Some(mut current) = scoped.or_else(|| self.context.get(root)) else {
            return self.miss(TemplateError::UndefinedName { name: root.clone() });
        };

        for (i, segment) in rest.iter().enumerate() {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|idx| items.get(idx)),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => {
                    return self.miss(TemplateError::MissingKey {
                        path: segments[..=i].join("."),
                        key: segment.clone(),
                    });
                }
            }
        }
        Ok(Some(current.clone()))
    }

    fn miss(&self, error: TemplateError) -> Result<Option<Value>, TemplateError> {
        match self.missing {
            MissingPolicy::Error => Err(error),
            MissingPolicy::Empty => Ok(None),
        }
    }
}

fn apply_method(method: Method, value: &Value) -> Result<Value, TemplateError> {
    let not_allowed = || TemplateError::MethodNotAllowed {
        method: method.name().to_string(),
        kind: kind_name(value).to_string(),
    };

    match (method, value) {
        (Method::Upper, Value::String(s)) => Ok(Value::String(s.to_uppercase())),
        (Method::Lower, Value::String(s)) => Ok(Value::String(s.to_lowercase())),
        (Method::Title, Value::String(s)) => Ok(Value::String(string::title_case(s))),
        (Method::Capitalize, Value::String(s)) => Ok(Value::String(string::capitalize(s))),
        (Method::Length, Value::String(s)) => Ok(Value::from(s.chars().count())),
        (Method::Length, Value::Array(items)) => Ok(Value::from(items.len())),
        (Method::Length, Value::Object(map)) => Ok(Value::from(map.len())),
        _ => Err(not_allowed()),
    }
}
