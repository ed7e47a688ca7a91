use crate::error::TemplateError;

const OPEN: &str = "<%";
const CLOSE: &str = "%>";

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text(String),
    /// `<%= expr %>` (escaped) or `<%- expr %>` (raw)
    Output { expr: String, escape: bool },
    /// `<% statement %>`
    Statement(String),
}

/// Split template source into text runs and tags
pub fn tokenize(source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut offset = 0;

    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            tokens.push(Token::Text(rest[..start].to_string()));
        }

        let tag_start = offset + start;
        let after_open = &rest[start + OPEN.len()..];
        let end = after_open
            .find(CLOSE)
            .ok_or(TemplateError::UnterminatedTag { offset: tag_start })?;
        let inner = &after_open[..end];

        tokens.push(match inner.chars().next() {
            Some('=') => Token::Output {
                expr: inner[1..].trim().to_string(),
                escape: true,
            },
            Some('-') => Token::Output {
                expr: inner[1..].trim().to_string(),
                escape: false,
            },
            _ => Token::Statement(inner.trim().to_string()),
        });

        let consumed = start + OPEN.len() + end + CLOSE.len();
        rest = &rest[consumed..];
        offset += consumed;
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest.to_string()));
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_mixed_tags() {
        let tokens = tokenize("Hi <%= name %>!<% if x %><%- raw %><% endif %>").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Text("Hi ".into()),
                Token::Output { expr: "name".into(), escape: true },
                Token::Text("!".into()),
                Token::Statement("if x".into()),
                Token::Output { expr: "raw".into(), escape: false },
                Token::Statement("endif".into()),
            ]
        );
    }

    #[test]
    fn test_plain_text_and_empty() {
        assert_eq!(tokenize("no tags").unwrap(), vec![Token::Text("no tags".into())]);
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_tag_reports_offset() {
        assert_eq!(
            tokenize("abc <%= name").unwrap_err(),
            TemplateError::UnterminatedTag { offset: 4 }
        );
        assert_eq!(
            tokenize("<% if a %>x<% endif").unwrap_err(),
            TemplateError::UnterminatedTag { offset: 11 }
        );
    }
}
