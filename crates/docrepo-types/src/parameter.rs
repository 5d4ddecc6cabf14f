use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Entity;

/// Named singleton or list value, stored one document per name.
///
/// The payload is kept as raw JSON; typed access goes through serde at the
/// façade, so a shape mismatch reads as "absent" instead of failing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            value,
        }
    }
}

impl Entity for Parameter {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collection_is_parameters() {
        assert_eq!(Parameter::collection_name(), "Parameters");
    }

    #[test]
    fn value_keeps_arbitrary_shape() {
        let p = Parameter::new("AppName", json!({ "name": "svc", "version": "1.0.0" }));
        let doc = serde_json::to_value(&p).unwrap();
        assert_eq!(doc["value"]["version"], "1.0.0");
        assert_eq!(doc["_id"], "");
    }
}
