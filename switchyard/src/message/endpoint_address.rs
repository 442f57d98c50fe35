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

use std::fmt;
use std::str::FromStr;

use switchyard_core::{Address, Selector, TypeTag};

use crate::common::{InvalidAddressSyntaxError, SetupError};

/// A parsed `<prefix>:<payload>` endpoint address.
///
/// | prefix | selector | publishes to |
/// |---|---|---|
/// | `uri:` | URI template | the path, if it has no placeholders or wildcards |
/// | `type:` / `class:` | type name (a leading `class ` is ignored) | the type address |
/// | `regex:` | regular expression | nothing |
/// | `object:` | exact name | the name |
///
/// Consumers register with the selector; producers publish to the target.
#[derive(Debug, Clone)]
pub struct EndpointAddress {
    text: String,
    selector: Selector,
    target: Option<Address>,
}

impl EndpointAddress {
    /// Parses `text`.
    ///
    /// # Errors
    ///
    /// [`SetupError::Address`] for a missing or unknown prefix or an empty
    /// payload, [`SetupError::Selector`] for a malformed pattern.
    pub fn parse(text: &str) -> Result<Self, SetupError> {
        let (prefix, payload) = text
            .split_once(':')
            .ok_or_else(|| InvalidAddressSyntaxError::MissingPrefix(text.to_string()))?;
        if payload.trim().is_empty() {
            return Err(InvalidAddressSyntaxError::EmptyPayload(text.to_string()).into());
        }

        let (selector, target) = match prefix {
            "uri" => match Selector::uri(payload)? {
                Selector::Uri(template) if template.is_literal() => {
                    (Selector::Uri(template), Some(Address::name(payload)))
                }
                selector => (selector, None),
            },
            "type" | "class" => {
                let name = payload.trim();
                let name = name.strip_prefix("class ").unwrap_or(name).trim();
                let selector = Selector::type_named(name)?;
                (selector, Some(Address::Type(TypeTag::named(name))))
            }
            "regex" => (Selector::regex(payload)?, None),
            "object" => (
                Selector::exact(payload)?,
                Some(Address::name(payload)),
            ),
            other => {
                return Err(InvalidAddressSyntaxError::UnknownPrefix {
                    prefix: other.to_string(),
                    address: text.to_string(),
                }
                .into())
            }
        };

        Ok(Self {
            text: text.to_string(),
            selector,
            target,
        })
    }

    /// The address as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The selector consumers register with.
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// The concrete address producers publish to.
    #[must_use]
    pub const fn target(&self) -> Option<&Address> {
        self.target.as_ref()
    }
}

impl FromStr for EndpointAddress {
    type Err = SetupError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use switchyard_core::SelectorKind;

    use super::*;

    #[test]
    fn prefixes_pick_the_selector_kind() {
        let cases = [
            ("uri:/input/{destination}", SelectorKind::Uri),
            ("type:OrderPlaced", SelectorKind::Type),
            ("class:class shop.OrderPlaced", SelectorKind::Type),
            ("regex:/a/.*", SelectorKind::Regex),
            ("object:orders", SelectorKind::Exact),
        ];
        for (text, kind) in cases {
            assert_eq!(EndpointAddress::parse(text).unwrap().selector().kind(), kind, "{text}");
        }
    }

    #[test]
    fn targets() {
        let target = |text: &str| EndpointAddress::parse(text).unwrap().target().cloned();
        assert_eq!(target("uri:/input/test"), Some(Address::name("/input/test")));
        assert_eq!(target("uri:/input/{destination}"), None);
        assert_eq!(target("uri:/input/*"), None);
        assert_eq!(target("regex:.*"), None);
        assert_eq!(target("object:orders"), Some(Address::name("orders")));
        assert_eq!(
            target("class:class shop.OrderPlaced"),
            Some(Address::Type(TypeTag::named("shop.OrderPlaced")))
        );
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(
            EndpointAddress::parse("orders"),
            Err(SetupError::Address(InvalidAddressSyntaxError::MissingPrefix(_)))
        ));
        assert!(matches!(
            EndpointAddress::parse("jms:orders"),
            Err(SetupError::Address(InvalidAddressSyntaxError::UnknownPrefix { .. }))
        ));
        assert!(matches!(
            EndpointAddress::parse("object:"),
            Err(SetupError::Address(InvalidAddressSyntaxError::EmptyPayload(_)))
        ));
        assert!(matches!(
            EndpointAddress::parse("regex:(oops"),
            Err(SetupError::Selector(_))
        ));
    }
}
