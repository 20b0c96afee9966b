//! CSS selector subset used to locate regions and triggers
//!
//! Supported syntax: `tag`, `#id`, `.class`, `[attr]`, `[attr=value]`,
//! compound simple selectors (`button.pg-btn`), and the descendant
//! combinator (whitespace). This covers every selector the page profiles
//! use; anything else is a syntax error at parse time.

use crate::error::{DomError, DomResult};

/// One compound step of a selector, e.g. `button.pg-btn[data-page=2]`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimpleSelector {
    /// Element tag name (lowercase), if constrained
    pub tag: Option<String>,
    /// Required id attribute value
    pub id: Option<String>,
    /// Required class names
    pub classes: Vec<String>,
    /// Required attributes; `None` value means presence-only
    pub attrs: Vec<(String, Option<String>)>,
}

impl SimpleSelector {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }
}

/// A parsed selector: a descendant chain of compound steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub parts: Vec<SimpleSelector>,
    source: String,
}

impl Selector {
    /// Parse a selector string
    pub fn parse(input: &str) -> DomResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DomError::SelectorSyntax {
                selector: input.to_string(),
                message: "empty selector".to_string(),
            });
        }

        let mut parts = Vec::new();
        for compound in trimmed.split_whitespace() {
            parts.push(Self::parse_compound(compound, input)?);
        }

        Ok(Selector {
            parts,
            source: trimmed.to_string(),
        })
    }

    /// The original selector text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The final compound step (the one the matched element must satisfy)
    pub fn target(&self) -> &SimpleSelector {
        // parts is never empty after a successful parse
        self.parts.last().unwrap()
    }

    fn parse_compound(compound: &str, original: &str) -> DomResult<SimpleSelector> {
        static TOKEN: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
        let token_regex = TOKEN.get_or_init(|| {
            regex::Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9-]*|#[a-zA-Z0-9_-]+|\.[a-zA-Z0-9_-]+|\[[a-zA-Z0-9_-]+(?:=[^\]]*)?\])").unwrap()
        });

        let mut simple = SimpleSelector::default();
        let mut rest = compound;

        while !rest.is_empty() {
            let m = token_regex.find(rest).ok_or_else(|| DomError::SelectorSyntax {
                selector: original.to_string(),
                message: format!("unexpected token at '{}'", rest),
            })?;
            let token = m.as_str();

            if let Some(id) = token.strip_prefix('#') {
                if simple.id.is_some() {
                    return Err(DomError::SelectorSyntax {
                        selector: original.to_string(),
                        message: "multiple id constraints".to_string(),
                    });
                }
                simple.id = Some(id.to_string());
            } else if let Some(class) = token.strip_prefix('.') {
                simple.classes.push(class.to_string());
            } else if token.starts_with('[') {
                let body = &token[1..token.len() - 1];
                match body.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim_matches(|c| c == '"' || c == '\'');
                        simple
                            .attrs
                            .push((name.to_string(), Some(value.to_string())));
                    }
                    None => simple.attrs.push((body.to_string(), None)),
                }
            } else {
                if simple.tag.is_some() || simple.id.is_some() || !simple.classes.is_empty() {
                    return Err(DomError::SelectorSyntax {
                        selector: original.to_string(),
                        message: format!("tag name '{}' must come first", token),
                    });
                }
                simple.tag = Some(token.to_ascii_lowercase());
            }

            rest = &rest[m.end()..];
        }

        if simple.is_empty() {
            return Err(DomError::SelectorSyntax {
                selector: original.to_string(),
                message: "empty compound selector".to_string(),
            });
        }

        Ok(simple)
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_selector() {
        let sel = Selector::parse("#transaction-table").unwrap();
        assert_eq!(sel.parts.len(), 1);
        assert_eq!(sel.parts[0].id.as_deref(), Some("transaction-table"));
    }

    #[test]
    fn test_parse_class_selector() {
        let sel = Selector::parse(".pg-btn").unwrap();
        assert_eq!(sel.parts[0].classes, vec!["pg-btn".to_string()]);
    }

    #[test]
    fn test_parse_compound() {
        let sel = Selector::parse("button.select-time[data-time=30]").unwrap();
        let part = &sel.parts[0];
        assert_eq!(part.tag.as_deref(), Some("button"));
        assert_eq!(part.classes, vec!["select-time".to_string()]);
        assert_eq!(
            part.attrs,
            vec![("data-time".to_string(), Some("30".to_string()))]
        );
    }

    #[test]
    fn test_parse_descendant_chain() {
        let sel = Selector::parse("#account-table-div .delete-button").unwrap();
        assert_eq!(sel.parts.len(), 2);
        assert_eq!(sel.parts[0].id.as_deref(), Some("account-table-div"));
        assert_eq!(sel.parts[1].classes, vec!["delete-button".to_string()]);
    }

    #[test]
    fn test_parse_presence_attr() {
        let sel = Selector::parse("[data-path]").unwrap();
        assert_eq!(sel.parts[0].attrs, vec![("data-path".to_string(), None)]);
    }

    #[test]
    fn test_reject_garbage() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("div > p").is_err());
        assert!(Selector::parse("..double").is_err());
    }
}
