use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use docrepo_repository::{IdStrategy, RepositoryOptions};

use crate::error::{DbError, DbResult};
use crate::procedure::Procedure;

/// Settings applied once, when a [`DocumentDb`](crate::DocumentDb) is configured.
///
/// Every field has a default, so a TOML document only needs the keys it
/// changes. Startup procedures carry code and are attached in code with
/// [`DbConfig::with_procedure`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub connection_string: String,
    pub database: String,
    /// Physically remove documents on delete instead of marking them.
    pub delete_forever: bool,
    pub id_generator: IdStrategy,
    /// Length of short string ids, `1..=36`.
    pub id_length: u16,
    /// Capacity of the capped log collection, in bytes.
    pub log_collection_size: u64,
    #[serde(with = "seconds")]
    pub configure_timeout: Duration,
    #[serde(skip)]
    pub init_procedures: Vec<Procedure>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            connection_string: "mongodb://localhost:27017".into(),
            database: "test".into(),
            delete_forever: false,
            id_generator: IdStrategy::ObjectId,
            id_length: 5,
            log_collection_size: 1_024_000,
            configure_timeout: Duration::from_secs(60),
            init_procedures: Vec::new(),
        }
    }
}

impl DbConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> DbResult<Self> {
        toml::from_str(s).map_err(|e| DbError::InvalidArgument(format!("config: {e}")))
    }

    pub fn with_connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = connection_string.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_id_generator(mut self, strategy: IdStrategy) -> Self {
        self.id_generator = strategy;
        self
    }

    pub fn with_id_length(mut self, id_length: u16) -> Self {
        self.id_length = id_length;
        self
    }

    pub fn with_delete_forever(mut self, delete_forever: bool) -> Self {
        self.delete_forever = delete_forever;
        self
    }

    pub fn with_log_collection_size(mut self, bytes: u64) -> Self {
        self.log_collection_size = bytes;
        self
    }

    pub fn with_configure_timeout(mut self, timeout: Duration) -> Self {
        self.configure_timeout = timeout;
        self
    }

    /// Append a startup procedure; procedures run in insertion order.
    pub fn with_procedure(mut self, procedure: Procedure) -> Self {
        self.init_procedures.push(procedure);
        self
    }

    /// The slice of settings every repository shares.
    pub fn repository_options(&self) -> RepositoryOptions {
        RepositoryOptions {
            delete_forever: self.delete_forever,
            id_strategy: self.id_generator,
            id_length: self.id_length,
        }
    }
}

mod seconds {
    use super::*;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
