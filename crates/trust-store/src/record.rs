//! Loosely-typed records as the store returns them.
//!
//! Callers decode records into their own types with [`Record::decode`] as
//! soon as they come back, and encode writes with [`fields`].

use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field map of a record, excluding the system fields.
pub type Fields = serde_json::Map<String, Value>;

/// Fields managed by the store itself.
pub(crate) const SYSTEM_FIELDS: [&str; 4] = ["id", "collection", "created", "updated"];

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record ID, unique within its collection.
    pub id: String,
    /// Collection the record lives in.
    pub collection: String,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Last update time.
    pub updated: DateTime<Utc>,
    /// User fields.
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    /// Value of a field. `id`, `created` and `updated` resolve to the system
    /// fields; unknown fields are `None`.
    pub fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::String(self.id.clone())),
            "created" => Some(Value::String(self.created.to_rfc3339())),
            "updated" => Some(Value::String(self.updated.to_rfc3339())),
            _ => self.fields.get(field).cloned(),
        }
    }

    /// String field, if present and a string.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Boolean field; missing or non-boolean reads as `false`.
    pub fn bool_field(&self, field: &str) -> bool {
        self.fields.get(field).and_then(Value::as_bool).unwrap_or(false)
    }

    /// The record as one JSON object, system fields included.
    pub fn to_json(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("id".into(), Value::String(self.id.clone()));
        object.insert("collection".into(), Value::String(self.collection.clone()));
        object.insert("created".into(), Value::String(self.created.to_rfc3339()));
        object.insert("updated".into(), Value::String(self.updated.to_rfc3339()));
        Value::Object(object)
    }

    /// Decode into a typed entity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decode`] if the fields do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_json()).map_err(|e| StoreError::Decode {
            collection: self.collection.clone(),
            id: self.id.clone(),
            message: e.to_string(),
        })
    }
}

/// Encode a value as record fields, dropping system fields.
///
/// # Errors
///
/// Returns [`StoreError::Encode`] if the value is not a JSON object.
pub fn fields<T: Serialize>(value: T) -> Result<Fields> {
    match serde_json::to_value(value) {
        Ok(Value::Object(mut map)) => {
            for key in SYSTEM_FIELDS {
                map.remove(key);
            }
            Ok(map)
        }
        Ok(other) => Err(StoreError::Encode {
            message: format!("expected an object, got {other}"),
        }),
        Err(e) => Err(StoreError::Encode {
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Record {
        let now = Utc::now();
        Record {
            id: "r1".into(),
            collection: "reviews".into(),
            created: now,
            updated: now,
            fields: fields(json!({ "rating": 4, "status": "published", "world_id_verified": true }))
                .expect("object"),
        }
    }

    #[test]
    fn test_get_system_and_user_fields() {
        let record = sample();
        assert_eq!(record.get("id"), Some(json!("r1")));
        assert_eq!(record.get("rating"), Some(json!(4)));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.str_field("status"), Some("published"));
        assert!(record.bool_field("world_id_verified"));
        assert!(!record.bool_field("chain_verified"));
    }

    #[test]
    fn test_decode_includes_system_fields() {
        #[derive(Deserialize)]
        struct Review {
            id: String,
            rating: u8,
        }
        let review: Review = sample().decode().expect("should decode");
        assert_eq!(review.id, "r1");
        assert_eq!(review.rating, 4);
    }

    #[test]
    fn test_decode_error_names_record() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Strict {
            rating: String,
        }
        let err = sample().decode::<Strict>().expect_err("type mismatch");
        assert!(err.to_string().contains("reviews/r1"));
    }

    #[test]
    fn test_fields_strips_system_keys() {
        let map = fields(json!({ "id": "x", "created": "t", "name": "Urban Eats" })).expect("object");
        assert!(!map.contains_key("id"));
        assert!(!map.contains_key("created"));
        assert_eq!(map.get("name"), Some(&json!("Urban Eats")));
    }

    #[test]
    fn test_fields_rejects_non_objects() {
        assert!(fields(json!([1, 2])).is_err());
    }
}
