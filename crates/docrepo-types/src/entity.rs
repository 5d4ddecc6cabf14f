//! The [`Entity`] contract shared by every repository-managed document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Document field holding the identifier.
pub const ID_FIELD: &str = "_id";

/// Document field holding the (indexed, non-unique) name.
pub const NAME_FIELD: &str = "name";

/// Marker field set on soft-deleted documents.
pub const DELETED_FIELD: &str = "deleted";

/// A persisted record with an opaque string identifier and a name.
///
/// Implementors must serialize their identifier under [`ID_FIELD`] and their
/// name under [`NAME_FIELD`] (typically with `#[serde(rename = "_id")]` on
/// the id field). An empty id means the entity has not been persisted yet;
/// repositories assign it exactly once, at creation.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Current identifier, empty before first persistence.
    fn id(&self) -> &str;

    /// Assign the identifier. Only repositories should call this.
    fn set_id(&mut self, id: String);

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Collection this entity type is stored in.
    ///
    /// Defaults to the short type name with a trailing `s`.
    fn collection_name() -> String {
        format!("{}s", short_type_name::<Self>())
    }
}

/// Identifier + name pair for entity types to embed with `#[serde(flatten)]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityBase {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl EntityBase {
    /// An unsaved base with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
        }
    }
}

impl Entity for EntityBase {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Last path segment of a type's name, without generic arguments.
///
/// `my_app::config::AppName` becomes `AppName`; `alloc::vec::Vec<u8>`
/// becomes `Vec`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
