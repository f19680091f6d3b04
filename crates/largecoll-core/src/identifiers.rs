//! Validated names for entities, fields and query aliases.
//!
//! Every name that ends up in rendered query text passes through one of the
//! types in this module. Construction fails for anything that is not a plain
//! identifier, so the query builder can emit names verbatim while values
//! travel exclusively as positional bindings.

use crate::error::{Error, MappingErrorKind, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static IDENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

static ENTITY_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\\?[A-Za-z_][A-Za-z0-9_]*(?:(?:::|\\)[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("entity name pattern is valid")
});

/// Check whether `name` is a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_valid_ident(name: &str) -> bool {
    IDENT_RE.is_match(name)
}

/// Check whether `name` is a fully-qualified entity name.
///
/// Segments are plain identifiers separated by `::` or `\`; a single
/// leading `\` is accepted.
pub fn is_valid_entity_name(name: &str) -> bool {
    ENTITY_NAME_RE.is_match(name)
}

/// A field name or query alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ident(String);

impl Ident {
    /// Validate and wrap a field name or alias.
    #[allow(clippy::result_large_err)]
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if is_valid_ident(&name) {
            Ok(Self(name))
        } else {
            Err(Error::mapping(
                MappingErrorKind::InvalidName,
                format!("'{name}' is not a valid field name or alias"),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A fully-qualified entity type name, e.g. `Shop::Order` or `App\Entity\Order`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityName(String);

impl EntityName {
    /// Validate and wrap an entity type name.
    #[allow(clippy::result_large_err)]
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if is_valid_entity_name(&name) {
            Ok(Self(name))
        } else {
            Err(Error::mapping(
                MappingErrorKind::InvalidName,
                format!("'{name}' is not a valid entity name"),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! name_impls {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $ty {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $ty {
            type Error = Error;

            fn try_from(value: &str) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl PartialEq<str> for $ty {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $ty {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

name_impls!(Ident);
name_impls!(EntityName);
