/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::collections::HashSet;
use std::fmt;

use regex::Regex;

use crate::common::InvalidSelectorError;
use crate::selector::Bindings;

/// A URI path template such as `/orders/{region}/{id}`.
///
/// Templates compile to an anchored regular expression:
///
/// - `{name}` captures one path segment and binds it to `name`;
/// - `*` matches anything within one segment;
/// - `**` matches any remainder, including `/`;
/// - everything else matches literally.
///
/// A trailing `/` on either side is ignored, as is any `?query` or `#fragment`
/// on the candidate.
#[derive(Clone)]
pub struct UriTemplate {
    template: String,
    pattern: Regex,
    placeholders: Vec<String>,
}

impl UriTemplate {
    /// Parses and compiles a template.
    pub fn parse(template: &str) -> Result<Self, InvalidSelectorError> {
        let invalid = |reason: &str| InvalidSelectorError::InvalidUriTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        if template.trim().is_empty() {
            return Err(invalid("template is empty"));
        }

        let body = match template.strip_suffix('/') {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => template,
        };

        let mut expression = String::from("^");
        let mut placeholders = Vec::new();
        let mut seen = HashSet::new();
        let mut literal = String::new();
        let mut chars = body.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    expression.push_str(&regex::escape(&literal));
                    literal.clear();
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => return Err(invalid("unbalanced `{`")),
                            Some(n) => name.push(n),
                        }
                    }
                    if name.is_empty() {
                        return Err(invalid("placeholder name is empty"));
                    }
                    if !is_group_name(&name) {
                        return Err(invalid(&format!("placeholder `{name}` is not a valid name")));
                    }
                    if !seen.insert(name.clone()) {
                        return Err(invalid(&format!("placeholder `{name}` appears twice")));
                    }
                    expression.push_str(&format!("(?P<{name}>[^/]+)"));
                    placeholders.push(name);
                }
                '}' => return Err(invalid("unbalanced `}`")),
                '*' => {
                    expression.push_str(&regex::escape(&literal));
                    literal.clear();
                    if chars.peek() == Some(&'*') {
                        chars.next();
                        expression.push_str(".*");
                    } else {
                        expression.push_str("[^/]*");
                    }
                }
                other => literal.push(other),
            }
        }
        expression.push_str(&regex::escape(&literal));
        expression.push_str("/?$");

        let pattern = Regex::new(&expression).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            template: template.to_string(),
            pattern,
            placeholders,
        })
    }

    /// The template as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Placeholder names in the order they appear.
    #[must_use]
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Whether the template contains any placeholder or wildcard.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.placeholders.is_empty() && !self.template.contains('*')
    }

    /// Matches `path`, returning the placeholder bindings in template order.
    #[must_use]
    pub fn bind(&self, path: &str) -> Option<Bindings> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let captures = self.pattern.captures(path)?;
        Some(
            self.placeholders
                .iter()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|value| (name.clone(), value.as_str().to_string()))
                })
                .collect(),
        )
    }
}

impl fmt::Debug for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UriTemplate").field(&self.template).finish()
    }
}

fn is_group_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(template: &str, path: &str) -> Option<Bindings> {
        UriTemplate::parse(template).unwrap().bind(path)
    }

    #[test]
    fn placeholders_bind_by_position() {
        let bindings = bind("/input/{destination}", "/input/test").unwrap();
        assert_eq!(bindings, vec![("destination".to_string(), "test".to_string())]);

        let bindings = bind("/orders/{region}/{id}", "/orders/eu/42").unwrap();
        assert_eq!(bindings[0], ("region".to_string(), "eu".to_string()));
        assert_eq!(bindings[1], ("id".to_string(), "42".to_string()));
    }

    #[test]
    fn placeholders_never_span_segments() {
        assert!(bind("/input/{destination}", "/input/a/b").is_none());
        assert!(bind("/input/{destination}", "/input/").is_none());
    }

    #[test]
    fn trailing_slash_query_and_fragment_are_ignored() {
        assert!(bind("/a/b/", "/a/b").is_some());
        assert!(bind("/a/b", "/a/b/").is_some());
        assert_eq!(
            bind("/a/{x}", "/a/5?verbose=true").unwrap(),
            vec![("x".to_string(), "5".to_string())]
        );
    }

    #[test]
    fn wildcards() {
        assert!(bind("/a/*/c", "/a/b/c").is_some());
        assert!(bind("/a/*/c", "/a/b/x/c").is_none());
        assert!(bind("/a/**", "/a/b/x/c").is_some());
        assert!(bind("/a/**", "/b").is_none());
    }

    #[test]
    fn literal_characters_are_escaped() {
        assert!(bind("/a.b", "/a.b").is_some());
        assert!(bind("/a.b", "/axb").is_none());
    }

    #[test]
    fn malformed_templates_are_rejected() {
        for template in ["", "/a/{x", "/a/x}", "/a/{}", "/a/{x}/{x}", "/a/{1x}", "/a/{x{y}}"] {
            assert!(
                matches!(
                    UriTemplate::parse(template),
                    Err(InvalidSelectorError::InvalidUriTemplate { .. })
                ),
                "template {template:?} should be rejected"
            );
        }
    }
}
