//! Restricted template renderer.
//!
//! Syntax:
//! - `<%= expr %>` substitutes `expr`, HTML-escaped unless escaping is off
//! - `<%- expr %>` substitutes `expr` as-is
//! - `<% if cond %>`, `<% elif cond %>`, `<% else %>`, `<% endif %>`
//! - `<% for name in expr %>` ... `<% endfor %>`
//!
//! Expressions are literals or dotted lookups (`user.name`, `items.0`) with an
//! optional trailing `upper()`, `lower()`, `title()`, `capitalize()` or
//! `length()`. Nothing else is evaluated, and identifiers starting with `__`
//! are rejected, so untrusted template text cannot reach beyond the context.

pub mod lexer;
pub mod parser;
pub mod render;

use crate::error::TemplateError;
use crate::storage::config::TemplateConfig;
use crate::utils::types::kind_name;
use parser::Node;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// What a lookup of a missing name or key produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Fail with `UndefinedName` / `MissingKey`
    #[default]
    Error,
    /// Render nothing; conditions on the missing value are false
    Empty,
}

impl fmt::Display for MissingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingPolicy::Error => write!(f, "error"),
            MissingPolicy::Empty => write!(f, "empty"),
        }
    }
}

impl FromStr for MissingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(MissingPolicy::Error),
            "empty" => Ok(MissingPolicy::Empty),
            other => Err(format!("unknown missing-value policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub escape: bool,
    pub missing: MissingPolicy,
    /// Longest accepted template source, in characters
    pub max_length: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            escape: true,
            missing: MissingPolicy::Error,
            max_length: 10_000,
        }
    }
}

impl RenderOptions {
    pub fn from_config(config: &TemplateConfig) -> Self {
        Self {
            escape: config.escape_html,
            missing: config.missing,
            max_length: config.max_length,
        }
    }
}

/// A parsed template, reusable across contexts
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
    options: RenderOptions,
}

impl Template {
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        Self::with_options(source, RenderOptions::default())
    }

    pub fn with_options(source: &str, options: RenderOptions) -> Result<Self, TemplateError> {
        if source.chars().count() > options.max_length {
            return Err(TemplateError::TooLong {
                max_length: options.max_length,
            });
        }
        let nodes = parser::parse(lexer::tokenize(source)?)?;
        Ok(Self { nodes, options })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render against `context`, which must be a JSON object
    pub fn render(&self, context: &Value) -> Result<String, TemplateError> {
        let context = context.as_object().ok_or_else(|| TemplateError::InvalidContext {
            kind: kind_name(context).to_string(),
        })?;
        let mut out = String::new();
        render::Renderer::new(context, self.options.escape, self.options.missing)
            .render(&self.nodes, &mut out)?;
        Ok(out)
    }
}

/// Compile and render in one step
pub fn render(source: &str, context: &Value, options: &RenderOptions) -> crate::Result<String> {
    Ok(Template::with_options(source, options.clone())?.render(context)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;

    fn render_default(source: &str, context: Value) -> Result<String, TemplateError> {
        Template::compile(source)?.render(&context)
    }

    fn render_lenient(source: &str, context: Value) -> Result<String, TemplateError> {
        let options = RenderOptions {
            missing: MissingPolicy::Empty,
            ..RenderOptions::default()
        };
        Template::with_options(source, options)?.render(&context)
    }

    #[test]
    fn test_simple_substitution() {
        assert_eq!(
            render_default("Hello, <%= name %>!", json!({"name": "Alice"})).unwrap(),
            "Hello, Alice!"
        );
    }

    #[test]
    fn test_dotted_paths_and_methods() {
        let context = json!({"user": {"name": "bob smith", "tags": ["a", "b", "c"]}});
        assert_eq!(
            render_default("<%= user.name.title() %> has <%= user.tags.length() %> tags, first <%= user.tags.0.upper() %>", context)
                .unwrap(),
            "Bob Smith has 3 tags, first A"
        );
    }

    #[test]
    fn test_escaping() {
        let context = json!({"html": "<b>\"hi\" & bye</b>"});
        assert_eq!(
            render_default("<%= html %>", context.clone()).unwrap(),
            "&lt;b&gt;&quot;hi&quot; &amp; bye&lt;/b&gt;"
        );
        assert_eq!(render_default("<%- html %>", context.clone()).unwrap(), "<b>\"hi\" & bye</b>");

        let options = RenderOptions {
            escape: false,
            ..RenderOptions::default()
        };
        assert_eq!(
            Template::with_options("<%= html %>", options).unwrap().render(&context).unwrap(),
            "<b>\"hi\" & bye</b>"
        );
    }

    #[test]
    fn test_conditionals() {
        let source = "<% if admin %>admin<% elif member %>member<% else %>guest<% endif %>";
        assert_eq!(render_default(source, json!({"admin": true, "member": true})).unwrap(), "admin");
        assert_eq!(render_default(source, json!({"admin": false, "member": 1})).unwrap(), "member");
        assert_eq!(render_default(source, json!({"admin": 0, "member": ""})).unwrap(), "guest");
        assert_eq!(
            render_default("<% if not items %>empty<% endif %>", json!({"items": []})).unwrap(),
            "empty"
        );
    }

    #[test]
    fn test_skipped_branches_are_not_evaluated() {
        assert_eq!(
            render_default("<% if false %><%= missing.key %><% endif %>ok", json!({})).unwrap(),
            "ok"
        );
    }

    #[test]
    fn test_loops() {
        let context = json!({"items": [{"name": "a"}, {"name": "b"}], "sep": ","});
        assert_eq!(
            render_default("<% for item in items %><%= item.name %><%= sep %><% endfor %>", context).unwrap(),
            "a,b,"
        );
        assert_eq!(
            render_default("<% for k in obj %>[<%= k %>]<% endfor %>", json!({"obj": {"x": 1, "y": 2}})).unwrap(),
            "[x][y]"
        );
        assert!(matches!(
            render_default("<% for c in n %><% endfor %>", json!({"n": 5})),
            Err(TemplateError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn test_loop_variable_is_scoped() {
        let context = json!({"xs": [1, 2], "x": "outer"});
        assert_eq!(
            render_default("<% for x in xs %><%= x %><% endfor %><%= x %>", context).unwrap(),
            "12outer"
        );
    }

    #[test]
    fn test_missing_lookups_raise_by_default() {
        assert_eq!(
            render_default("<%= nobody %>", json!({})).unwrap_err(),
            TemplateError::UndefinedName { name: "nobody".into() }
        );
        assert_eq!(
            render_default("<%= user.email %>", json!({"user": {}})).unwrap_err(),
            TemplateError::MissingKey {
                path: "user".into(),
                key: "email".into()
            }
        );
    }

    #[test]
    fn test_missing_lookups_render_empty_when_lenient() {
        assert_eq!(render_lenient("[<%= nobody %>]", json!({})).unwrap(), "[]");
        assert_eq!(
            render_lenient("<% if user.email %>yes<% else %>no<% endif %>", json!({"user": {}})).unwrap(),
            "no"
        );
        assert_eq!(render_lenient("<% for x in nothing %>x<% endfor %>", json!({})).unwrap(), "");
    }

    #[test]
    fn test_method_restrictions() {
        assert_eq!(
            render_default("<%= n.upper() %>", json!({"n": 5})).unwrap_err(),
            TemplateError::MethodNotAllowed {
                method: "upper".into(),
                kind: "number".into()
            }
        );
        assert!(matches!(
            render_default("<%= name.__class__ %>", json!({"name": "x"})),
            Err(TemplateError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_limits_and_context_shape() {
        let options = RenderOptions {
            max_length: 5,
            ..RenderOptions::default()
        };
        assert_eq!(
            Template::with_options("123456", options).unwrap_err(),
            TemplateError::TooLong { max_length: 5 }
        );
        assert_eq!(
            render_default("x", json!([1])).unwrap_err(),
            TemplateError::InvalidContext { kind: "array".into() }
        );
    }

    #[test]
    fn test_literals_and_null_output() {
        assert_eq!(
            render_default("<%= 'lit' %> <%= 3 %> <%= nothing %>.", json!({"nothing": null})).unwrap(),
            "lit 3 ."
        );
    }

    #[test]
    fn test_compiled_template_is_reusable() {
        let template = Template::compile("<%= n %>").unwrap();
        assert_eq!(template.render(&json!({"n": 1})).unwrap(), "1");
        assert_eq!(template.render(&json!({"n": 2})).unwrap(), "2");
    }

    #[test]
    fn test_render_wraps_errors_in_app_error() {
        let err = render("<% if x %>", &json!({}), &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::Template(TemplateError::UnclosedBlock { .. })));
    }

    #[test]
    fn test_missing_policy_parsing() {
        assert_eq!("Empty".parse::<MissingPolicy>().unwrap(), MissingPolicy::Empty);
        assert!("skip".parse::<MissingPolicy>().is_err());
        assert_eq!(MissingPolicy::Error.to_string(), "error");
    }
}
