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

//! Address patterns that decide which registrations receive a published event.
//!
//! Every constructor validates its pattern up front and returns
//! [`InvalidSelectorError`] for anything malformed, so matching at dispatch
//! time never fails.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::common::InvalidSelectorError;
use crate::message::{Address, TypeTag};

mod uri;

pub use uri::UriTemplate;

/// Name/value pairs a selector extracted from the address it matched.
///
/// They are added to the delivered event as string headers.
pub type Bindings = Vec<(String, String)>;

type AddressPredicate = dyn Fn(&Address) -> bool + Send + Sync + 'static;

/// A typed address pattern.
#[derive(Clone)]
pub enum Selector {
    /// Matches every address.
    All,
    /// Matches one address by equality.
    Exact(Address),
    /// Matches textual addresses against a URI template, binding its placeholders.
    Uri(UriTemplate),
    /// Matches type addresses; see [`TypeTag::accepts`].
    Type(TypeTag),
    /// Full-match regular expression over the address text, binding its capture groups.
    Regex(RegexPattern),
    /// Delegates to a caller-supplied function.
    Predicate(Arc<AddressPredicate>),
    /// Matches any member of a fixed set.
    Set(Arc<HashSet<Address>>),
}

/// The kind of a [`Selector`], for logging and introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum SelectorKind {
    All,
    Exact,
    Uri,
    Type,
    Regex,
    Predicate,
    Set,
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::Exact => "exact",
            Self::Uri => "uri",
            Self::Type => "type",
            Self::Regex => "regex",
            Self::Predicate => "predicate",
            Self::Set => "set",
        };
        f.write_str(name)
    }
}

impl Selector {
    /// Matches `address` by equality.
    pub fn exact(address: impl Into<Address>) -> Result<Self, InvalidSelectorError> {
        let address = address.into();
        if address.as_text().is_empty() {
            return Err(InvalidSelectorError::EmptyAddress);
        }
        Ok(Self::Exact(address))
    }

    /// Matches textual addresses against a URI template like `/input/{destination}`.
    pub fn uri(template: &str) -> Result<Self, InvalidSelectorError> {
        UriTemplate::parse(template).map(Self::Uri)
    }

    /// Matches type addresses for `T`.
    #[must_use]
    pub fn type_of<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeTag::of::<T>())
    }

    /// Matches type addresses by name.
    ///
    /// An unqualified name (`OrderPlaced`) also matches qualified addresses
    /// ending in that name (`shop::events::OrderPlaced`).
    pub fn type_named(name: &str) -> Result<Self, InvalidSelectorError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.contains(['/', '{', '}']) || trimmed.contains(char::is_whitespace) {
            return Err(InvalidSelectorError::InvalidTypeName(name.to_string()));
        }
        Ok(Self::Type(TypeTag::named(trimmed.to_string())))
    }

    /// Full-match regular expression over the address text.
    pub fn regex(pattern: &str) -> Result<Self, InvalidSelectorError> {
        RegexPattern::compile(pattern).map(Self::Regex)
    }

    /// Delegates to `predicate`.
    ///
    /// A predicate that panics is treated as a failing handler for that
    /// publish; it does not take the bus down.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Address) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    /// Matches any of `addresses`.
    pub fn set<I, A>(addresses: I) -> Result<Self, InvalidSelectorError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        let members: HashSet<Address> = addresses.into_iter().map(Into::into).collect();
        if members.is_empty() {
            return Err(InvalidSelectorError::EmptySet);
        }
        if members.iter().any(|member| member.as_text().is_empty()) {
            return Err(InvalidSelectorError::EmptyAddress);
        }
        Ok(Self::Set(Arc::new(members)))
    }

    /// The kind of pattern.
    #[must_use]
    pub const fn kind(&self) -> SelectorKind {
        match self {
            Self::All => SelectorKind::All,
            Self::Exact(_) => SelectorKind::Exact,
            Self::Uri(_) => SelectorKind::Uri,
            Self::Type(_) => SelectorKind::Type,
            Self::Regex(_) => SelectorKind::Regex,
            Self::Predicate(_) => SelectorKind::Predicate,
            Self::Set(_) => SelectorKind::Set,
        }
    }

    /// Whether `address` matches.
    #[must_use]
    pub fn matches(&self, address: &Address) -> bool {
        match self {
            Self::Uri(_) | Self::Regex(_) => self.select(address).is_some(),
            Self::All => true,
            Self::Exact(expected) => expected == address,
            Self::Type(tag) => matches!(address, Address::Type(candidate) if tag.accepts(candidate)),
            Self::Predicate(predicate) => predicate(address),
            Self::Set(members) => members.contains(address),
        }
    }

    /// Matches `address`, returning the bindings it produced.
    ///
    /// Only URI and regex selectors produce bindings; the others return an
    /// empty list on a match.
    #[must_use]
    pub fn select(&self, address: &Address) -> Option<Bindings> {
        match self {
            Self::Uri(template) => address.as_name().and_then(|path| template.bind(path)),
            Self::Regex(pattern) => pattern.bind(address.as_text()),
            _ => self.matches(address).then(Vec::new),
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Exact(address) => f.debug_tuple("Exact").field(address).finish(),
            Self::Uri(template) => f.debug_tuple("Uri").field(&template.as_str()).finish(),
            Self::Type(tag) => f.debug_tuple("Type").field(tag).finish(),
            Self::Regex(pattern) => f.debug_tuple("Regex").field(&pattern.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
            Self::Set(members) => f.debug_tuple("Set").field(members).finish(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Exact(address) => write!(f, "object:{address}"),
            Self::Uri(template) => write!(f, "uri:{}", template.as_str()),
            Self::Type(tag) => write!(f, "type:{tag}"),
            Self::Regex(pattern) => write!(f, "regex:{}", pattern.as_str()),
            Self::Predicate(_) => f.write_str("predicate"),
            Self::Set(members) => write!(f, "set({} addresses)", members.len()),
        }
    }
}

/// A compiled, anchored regular expression.
#[derive(Clone)]
pub struct RegexPattern {
    source: String,
    regex: Regex,
    group_names: Vec<String>,
}

impl RegexPattern {
    fn compile(pattern: &str) -> Result<Self, InvalidSelectorError> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            InvalidSelectorError::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        // Group 0 is the whole match.
        let group_names = regex
            .capture_names()
            .enumerate()
            .skip(1)
            .map(|(index, name)| name.map_or_else(|| format!("group{index}"), str::to_string))
            .collect();
        Ok(Self {
            source: pattern.to_string(),
            regex,
            group_names,
        })
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn bind(&self, text: &str) -> Option<Bindings> {
        let captures = self.regex.captures(text)?;
        Some(
            self.group_names
                .iter()
                .enumerate()
                .filter_map(|(offset, name)| {
                    captures
                        .get(offset + 1)
                        .map(|value| (name.clone(), value.as_str().to_string()))
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod shop {
        pub struct OrderPlaced;
    }

    fn name(text: &str) -> Address {
        Address::name(text)
    }

    #[test]
    fn exact_uses_equality() {
        let selector = Selector::exact("orders").unwrap();
        assert!(selector.matches(&name("orders")));
        assert!(!selector.matches(&name("orders/eu")));
        assert!(matches!(Selector::exact(""), Err(InvalidSelectorError::EmptyAddress)));
    }

    #[test]
    fn regex_is_full_match() {
        let selector = Selector::regex("/a/.*").unwrap();
        assert!(selector.matches(&name("/a/5")));
        assert!(!selector.matches(&name("x/a/5")));

        let partial = Selector::regex("a").unwrap();
        assert!(!partial.matches(&name("abc")));
    }

    #[test]
    fn regex_alternation_stays_anchored() {
        let selector = Selector::regex("a|b").unwrap();
        assert!(selector.matches(&name("a")));
        assert!(!selector.matches(&name("ab")));
    }

    #[test]
    fn regex_groups_become_bindings() {
        let selector = Selector::regex(r"/(?P<kind>\w+)/(\d+)").unwrap();
        let bindings = selector.select(&name("/orders/42")).unwrap();
        assert_eq!(
            bindings,
            vec![
                ("kind".to_string(), "orders".to_string()),
                ("group2".to_string(), "42".to_string()),
            ]
        );
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(matches!(
            Selector::regex("(unclosed"),
            Err(InvalidSelectorError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn uri_only_matches_names() {
        let selector = Selector::uri("/input/{destination}").unwrap();
        assert!(selector.matches(&name("/input/test")));
        assert!(!selector.matches(&Address::of::<shop::OrderPlaced>()));
    }

    #[test]
    fn type_selectors() {
        let address = Address::of::<shop::OrderPlaced>();
        assert!(Selector::type_of::<shop::OrderPlaced>().matches(&address));
        assert!(Selector::type_named("OrderPlaced").unwrap().matches(&address));
        assert!(!Selector::type_named("Order").unwrap().matches(&address));
        assert!(!Selector::type_of::<String>().matches(&address));
        // Type selectors never match names, even equal text.
        assert!(!Selector::type_named("OrderPlaced").unwrap().matches(&name("OrderPlaced")));
        assert!(Selector::type_named(" ").is_err());
        assert!(Selector::type_named("a/b").is_err());
    }

    #[test]
    fn predicate_and_set() {
        let even = Selector::predicate(|address| address.as_text().len() % 2 == 0);
        assert!(even.matches(&name("ab")));
        assert!(!even.matches(&name("abc")));

        let set = Selector::set(["a", "b"]).unwrap();
        assert!(set.matches(&name("b")));
        assert!(!set.matches(&name("c")));
        assert!(matches!(
            Selector::set(Vec::<Address>::new()),
            Err(InvalidSelectorError::EmptySet)
        ));
    }

    #[test]
    fn all_matches_everything() {
        assert!(Selector::All.matches(&name("anything")));
        assert_eq!(Selector::All.select(&name("x")), Some(Vec::new()));
    }
}
