//! Parsing and evaluation of the nesting patterns that rules are registered under.
use crate::error::RuleError;
use crate::path::{ancestor_paths, ends_on_boundary, parent_path, segment_starts};
use std::collections::HashMap;
use std::fmt;

/// Whether the fixed part of a pattern is anchored at the document root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// `/a/b`: the fixed part must equal the path from the root.
    Absolute,
    /// `a/b` or `*/a/b`: the fixed part must equal the trailing segments.
    Relative,
}

/// What a pattern requires beyond its fixed part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    /// The fixed part names the element itself.
    Exact,
    /// `X/?`: any direct child of an element matched by `X`.
    AnyChild,
    /// `X/*`: any element strictly below an element matched by `X`.
    AnyDescendant,
    /// `*`: every element.
    Everything,
}

impl Form {
    /// Precedence among wildcard forms, higher wins.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Form::Exact => 3,
            Form::AnyChild => 2,
            Form::AnyDescendant => 1,
            Form::Everything => 0,
        }
    }
}

/// A compiled pattern with namespace prefixes already expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    universal: bool,
    anchor: Anchor,
    form: Form,
    fixed: String,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl Pattern {
    /// Compiles `text`, expanding `prefix:local` segments through `namespaces`.
    pub fn parse(text: &str, namespaces: &HashMap<String, String>) -> Result<Pattern, RuleError> {
        let trimmed = text.trim();
        let (universal, rest) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        if rest.is_empty() {
            return Err(RuleError::malformed(text, "pattern is empty"));
        }
        if rest == "*" {
            return Ok(Pattern {
                source: text.to_string(),
                universal,
                anchor: Anchor::Relative,
                form: Form::Everything,
                fixed: String::new(),
            });
        }

        let (anchor, body) = if let Some(body) = rest.strip_prefix("*/") {
            (Anchor::Relative, body)
        } else if let Some(body) = rest.strip_prefix('/') {
            (Anchor::Absolute, body)
        } else {
            (Anchor::Relative, rest)
        };
        let body = body.trim_end_matches('/');
        if body.is_empty() {
            return Err(RuleError::malformed(text, "pattern has no element segments"));
        }

        let mut segments = split_segments(body);
        let form = match segments.last().copied() {
            Some("?") => {
                segments.pop();
                Form::AnyChild
            }
            Some("*") => {
                segments.pop();
                Form::AnyDescendant
            }
            _ => Form::Exact,
        };
        if segments.is_empty() {
            return Err(RuleError::malformed(text, "wildcard needs a fixed prefix"));
        }

        let mut expanded = Vec::with_capacity(segments.len());
        for segment in segments {
            expanded.push(expand_segment(text, segment, namespaces)?);
        }
        let joined = expanded.join("/");
        let fixed = match anchor {
            Anchor::Absolute => format!("/{}", joined),
            Anchor::Relative => joined,
        };

        Ok(Pattern {
            source: text.to_string(),
            universal,
            anchor,
            form,
            fixed,
        })
    }

    /// The pattern text as registered.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_universal(&self) -> bool {
        self.universal
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn form(&self) -> Form {
        self.form
    }

    /// The expanded non-wildcard part, e.g. `/a/{urn:x}b` or `c/d`.
    pub fn fixed(&self) -> &str {
        &self.fixed
    }

    /// Length of the fixed part; longer means more specific.
    pub fn specificity(&self) -> usize {
        self.fixed.len()
    }

    /// Normalized identity: two registrations with the same key share one handler list.
    pub fn key(&self) -> String {
        let mut key = String::with_capacity(self.fixed.len() + 4);
        if self.universal {
            key.push('!');
        }
        match self.form {
            Form::Everything => key.push('*'),
            _ => {
                if self.anchor == Anchor::Relative {
                    key.push_str("*/");
                }
                key.push_str(&self.fixed);
                match self.form {
                    Form::AnyChild => key.push_str("/?"),
                    Form::AnyDescendant => key.push_str("/*"),
                    _ => {}
                }
            }
        }
        key
    }

    /// The last fixed segment, used to index relative exact patterns.
    pub fn last_fixed_segment(&self) -> &str {
        crate::path::last_segment(&self.fixed)
    }

    pub fn matches(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        match self.form {
            Form::Everything => true,
            Form::Exact => self.fixed_matches(path),
            Form::AnyChild => parent_path(path).is_some_and(|parent| self.fixed_matches(parent)),
            Form::AnyDescendant => ancestor_paths(path).any(|ancestor| self.fixed_matches(ancestor)),
        }
    }

    fn fixed_matches(&self, candidate: &str) -> bool {
        match self.anchor {
            Anchor::Absolute => candidate == self.fixed,
            Anchor::Relative => ends_on_boundary(candidate, &self.fixed),
        }
    }
}

fn split_segments(body: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for cut in segment_starts(body) {
        segments.push(&body[start..cut]);
        start = cut + 1;
    }
    segments.push(&body[start..]);
    segments
}

fn expand_segment(
    pattern: &str,
    segment: &str,
    namespaces: &HashMap<String, String>,
) -> Result<String, RuleError> {
    if segment.is_empty() {
        return Err(RuleError::malformed(pattern, "empty path segment"));
    }
    if segment == "*" || segment == "?" {
        return Err(RuleError::malformed(
            pattern,
            "wildcards are only allowed as the final segment",
        ));
    }
    if let Some(rest) = segment.strip_prefix('{') {
        let Some(close) = rest.find('}') else {
            return Err(RuleError::malformed(pattern, "unterminated namespace URI"));
        };
        check_local_name(pattern, &rest[close + 1..])?;
        return Ok(segment.to_string());
    }
    if let Some((prefix, local)) = segment.split_once(':') {
        check_local_name(pattern, local)?;
        let uri = namespaces
            .get(prefix)
            .ok_or_else(|| RuleError::UndeclaredPrefix {
                pattern: pattern.to_string(),
                prefix: prefix.to_string(),
            })?;
        return Ok(crate::path::qualified_name(uri, local));
    }
    check_local_name(pattern, segment)?;
    Ok(segment.to_string())
}

fn check_local_name(pattern: &str, local: &str) -> Result<(), RuleError> {
    if local.is_empty() {
        return Err(RuleError::malformed(pattern, "empty local name"));
    }
    if local.contains(['{', '}', ':', '*', '?']) || local.chars().any(char::is_whitespace) {
        return Err(RuleError::malformed(
            pattern,
            format!("invalid character in element name '{}'", local),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Pattern {
        Pattern::parse(text, &HashMap::new()).unwrap()
    }

    #[test]
    fn test_pattern_forms() {
        let p = parse("/a/b/c");
        assert_eq!((p.anchor(), p.form(), p.fixed()), (Anchor::Absolute, Form::Exact, "/a/b/c"));

        let p = parse("*/c/d");
        assert_eq!((p.anchor(), p.form(), p.fixed()), (Anchor::Relative, Form::Exact, "c/d"));
        assert_eq!(p.key(), parse("c/d").key());

        let p = parse("a/?");
        assert_eq!((p.form(), p.fixed()), (Form::AnyChild, "a"));

        let p = parse("/a/*");
        assert_eq!((p.anchor(), p.form(), p.fixed()), (Anchor::Absolute, Form::AnyDescendant, "/a"));

        let p = parse("!*/d");
        assert!(p.is_universal());
        assert_eq!(p.fixed(), "d");
        assert_eq!(p.key(), "!*/d");

        assert_eq!(parse("*").form(), Form::Everything);
    }

    #[test]
    fn test_trailing_separator_is_normalized() {
        assert_eq!(parse("a/b/").key(), parse("a/b").key());
        assert_eq!(parse("/a/b//").fixed(), "/a/b");
    }

    #[test]
    fn test_namespace_prefixes_expand() {
        let mut ns = HashMap::new();
        ns.insert("x".to_string(), "http://example.com/x".to_string());
        let p = Pattern::parse("/x:root/x:item", &ns).unwrap();
        assert_eq!(p.fixed(), "/{http://example.com/x}root/{http://example.com/x}item");
        assert!(p.matches("/{http://example.com/x}root/{http://example.com/x}item"));

        let err = Pattern::parse("y:item", &ns).unwrap_err();
        assert_eq!(
            err,
            RuleError::UndeclaredPrefix {
                pattern: "y:item".to_string(),
                prefix: "y".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_patterns() {
        for bad in ["", "!", "/", "a//b", "a/*/b", "?", "*/*", "{urn:x", "x:", "a b"] {
            assert!(
                matches!(Pattern::parse(bad, &HashMap::new()), Err(RuleError::Malformed { .. })),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_tail_match_requires_segment_boundary() {
        let p = parse("a/b");
        assert!(p.matches("/x/a/b"));
        assert!(p.matches("/a/b"));
        assert!(!p.matches("/xab"));
        assert!(!p.matches("/x/ya/b"));
        assert!(!p.matches("/a/b/c"));
    }

    #[test]
    fn test_absolute_requires_full_path() {
        let p = parse("/a/b");
        assert!(p.matches("/a/b"));
        assert!(!p.matches("/x/a/b"));
    }

    #[test]
    fn test_wildcard_matching() {
        let child = parse("/root/?");
        assert!(child.matches("/root/x"));
        assert!(!child.matches("/root"));
        assert!(!child.matches("/root/x/y"));

        let descendant = parse("list/*");
        assert!(descendant.matches("/doc/list/item"));
        assert!(descendant.matches("/doc/list/item/name"));
        assert!(!descendant.matches("/doc/list"));
        assert!(!descendant.matches("/doc/mylist/item"));

        assert!(parse("*").matches("/anything/at/all"));
        assert!(!parse("*").matches(""));
    }

    #[test]
    fn test_expanded_uri_segments_are_accepted() {
        let p = parse("{urn:a/b}item");
        assert!(p.matches("/root/{urn:a/b}item"));
        assert!(!p.matches("/root/item"));
    }
}
