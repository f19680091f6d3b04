//! Window builder configuration.

use largecoll_core::{Error, Ident, Result};
use serde::{Deserialize, Serialize};

/// Configuration for [`AssociationWindow`](crate::AssociationWindow).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```ignore
/// let config: WindowConfig = serde_json::from_str(r#"{"max_limit": 500}"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Alias bound to the owning entity
    pub owner_alias: String,
    /// Alias bound to the related entity
    pub related_alias: String,
    /// Result alias of the count column
    pub count_alias: String,
    /// Largest slice a caller may request (None = unbounded)
    pub max_limit: Option<u64>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            owner_alias: "o".to_string(),
            related_alias: "r".to_string(),
            count_alias: "collectionCount".to_string(),
            max_limit: None,
        }
    }
}

/// Aliases checked and converted to identifiers.
#[derive(Debug, Clone)]
pub(crate) struct Aliases {
    pub(crate) owner: Ident,
    pub(crate) related: Ident,
    pub(crate) count: Ident,
}

impl WindowConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the owner alias.
    #[must_use]
    pub fn with_owner_alias(mut self, alias: impl Into<String>) -> Self {
        self.owner_alias = alias.into();
        self
    }

    /// Set the related-entity alias.
    #[must_use]
    pub fn with_related_alias(mut self, alias: impl Into<String>) -> Self {
        self.related_alias = alias.into();
        self
    }

    /// Set the count column alias.
    #[must_use]
    pub fn with_count_alias(mut self, alias: impl Into<String>) -> Self {
        self.count_alias = alias.into();
        self
    }

    /// Cap the `limit` accepted by slices.
    #[must_use]
    pub fn with_max_limit(mut self, max: u64) -> Self {
        self.max_limit = Some(max);
        self
    }

    /// Check that every alias is a plain identifier and that no two
    /// aliases collide.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        self.aliases().map(|_| ())
    }

    #[allow(clippy::result_large_err)]
    pub(crate) fn aliases(&self) -> Result<Aliases> {
        let alias = |role: &str, value: &str| {
            Ident::new(value).map_err(|_| {
                Error::InvalidArgument(format!("{role} alias {value:?} is not a plain identifier"))
            })
        };

        let aliases = Aliases {
            owner: alias("owner", &self.owner_alias)?,
            related: alias("related", &self.related_alias)?,
            count: alias("count", &self.count_alias)?,
        };
        if aliases.owner == aliases.related {
            return Err(Error::InvalidArgument(format!(
                "owner and related aliases must differ, both are {}",
                aliases.owner
            )));
        }
        if aliases.count == aliases.owner || aliases.count == aliases.related {
            return Err(Error::InvalidArgument(format!(
                "count alias {} reuses an entity alias",
                aliases.count
            )));
        }
        Ok(aliases)
    }
}
