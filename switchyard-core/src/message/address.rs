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

use std::borrow::Cow;
use std::fmt;

use mti::prelude::*;
use serde_json::Value;

/// The logical destination an event is published to.
///
/// Most addresses are plain names (`"orders"`, `"/input/test"`); an address can
/// also be a [`TypeTag`], which lets consumers register interest by type rather
/// than by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Address {
    /// A textual address: an object name, a URI path, or a generated reply address.
    Name(String),
    /// A type identifier used as an address.
    Type(TypeTag),
}

impl Address {
    /// Creates a textual address.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Creates a type address for `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeTag::of::<T>())
    }

    /// Generates a fresh, process-unique reply address.
    ///
    /// Reply addresses are time-ordered (`reply_<uuid v7>`) so they are never
    /// reused while a request is outstanding.
    #[must_use]
    pub fn reply() -> Self {
        Self::Name("reply".create_type_id::<V7>().to_string())
    }

    /// The text selectors match against: the name, or the type name for type addresses.
    #[must_use]
    pub fn as_text(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Type(tag) => tag.name(),
        }
    }

    /// Returns the name if this is a textual address.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Type(_) => None,
        }
    }

    /// Encodes the address as a header value.
    ///
    /// Names become strings; type addresses become `{"type": "<name>"}` so they
    /// survive a trip through a string-keyed header map without ambiguity.
    #[must_use]
    pub fn to_header_value(&self) -> Value {
        match self {
            Self::Name(name) => Value::String(name.clone()),
            Self::Type(tag) => serde_json::json!({ "type": tag.name() }),
        }
    }

    /// Decodes an address previously written by [`Address::to_header_value`].
    #[must_use]
    pub fn from_header_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) if !name.is_empty() => Some(Self::Name(name.clone())),
            Value::Object(map) => match map.get("type") {
                Some(Value::String(name)) if !name.is_empty() => {
                    Some(Self::Type(TypeTag::named(name.clone())))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Type(tag) => write!(f, "type:{tag}"),
        }
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<&String> for Address {
    fn from(value: &String) -> Self {
        Self::Name(value.clone())
    }
}

impl From<TypeTag> for Address {
    fn from(value: TypeTag) -> Self {
        Self::Type(value)
    }
}

/// A type identifier.
///
/// Tags built with [`TypeTag::of`] carry the fully qualified Rust type name;
/// tags parsed from configuration carry whatever name was written there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(Cow<'static, str>);

impl TypeTag {
    /// The tag for `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(std::any::type_name::<T>()))
    }

    /// A tag from a textual type name.
    pub fn named(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// The last path segment of the name, without generic arguments.
    #[must_use]
    pub fn short_name(&self) -> &str {
        let name: &str = &self.0;
        let base = name.split('<').next().unwrap_or(name);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// Whether `self`, used as a pattern, accepts `candidate`.
    ///
    /// Equal names always match. An unqualified pattern (no `::`) also matches
    /// any candidate whose short name is the same.
    #[must_use]
    pub fn accepts(&self, candidate: &Self) -> bool {
        if self.0 == candidate.0 {
            return true;
        }
        !self.0.contains("::") && self.short_name() == candidate.short_name()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
