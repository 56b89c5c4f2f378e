//! # Asset Record Module
//!
//! Rappresentazione canonica di un asset caricato sul CMS e normalizzazione
//! delle tre forme di risposta documentate dall'endpoint di upload:
//!
//! - `{"assets": [record, ...]}` → primo record
//! - `[record, ...]` → primo elemento
//! - `{"_id": ..., ...}` → l'oggetto stesso
//!
//! La scelta avviene solo in base alla forma; `_id` è richiesto solo per
//! l'oggetto nudo. Il record è conservato così come il CMS lo ha restituito,
//! senza tipi imposti sui campi. Qualsiasi altra forma è un fallimento.

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// CMS-assigned identity of an uploaded binary, kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRecord(Value);

impl AssetRecord {
    /// Any top-level field of the record
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// `_id` with whatever JSON type the CMS used
    pub fn id(&self) -> Option<&Value> {
        self.field("_id")
    }

    /// `_id` rendered for logs and messages; empty when absent
    pub fn id_label(&self) -> String {
        match self.id() {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    pub fn path(&self) -> Option<&str> {
        self.field("path").and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.field("title").and_then(Value::as_str)
    }

    /// The five-field reference embedded in collection entries.
    ///
    /// Values are passed through untouched; missing fields are sent as `null`.
    pub fn reference(&self) -> Value {
        let get = |key: &str| self.field(key).cloned().unwrap_or(Value::Null);
        json!({
            "_id": get("_id"),
            "path": get("path"),
            "title": get("title"),
            "mime": get("mime"),
            "size": get("size"),
        })
    }
}

/// Pick the asset record out of an upload response body
pub fn normalize_upload_response(body: Value) -> Result<AssetRecord> {
    let candidate = match body {
        Value::Object(mut map) => {
            let wrapped = match map.get_mut("assets") {
                Some(Value::Array(assets)) if !assets.is_empty() => Some(assets.swap_remove(0)),
                _ => None,
            };
            match wrapped {
                Some(first) => Some(first),
                None if map.contains_key("_id") => Some(Value::Object(map)),
                None => None,
            }
        }
        Value::Array(items) => items.into_iter().next(),
        _ => None,
    };

    match candidate {
        Some(record) if !record.is_null() => Ok(AssetRecord(record)),
        _ => Err(IngestError::UnexpectedResponse(
            "no asset record in upload response".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assets_wrapper_returns_first() {
        let body = json!({"assets": [{"_id": "a1", "path": "/x.jpg"}, {"_id": "a2"}]});
        let record = normalize_upload_response(body).unwrap();
        assert_eq!(record.id_label(), "a1");
        assert_eq!(record.path(), Some("/x.jpg"));
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({"_id": "a1", "path": "/x.jpg"}));
    }

    #[test]
    fn test_bare_array_and_bare_object() {
        let from_array = normalize_upload_response(json!([{"_id": "b1", "mime": "audio/mpeg", "size": 2048}])).unwrap();
        assert_eq!(from_array.id(), Some(&json!("b1")));
        assert_eq!(from_array.field("size"), Some(&json!(2048)));

        let from_object = normalize_upload_response(json!({"_id": "c1", "title": "pic", "folder": "root"})).unwrap();
        assert_eq!(from_object.id_label(), "c1");
        assert_eq!(from_object.title(), Some("pic"));
        assert_eq!(from_object.field("folder"), Some(&json!("root")));
    }

    #[test]
    fn test_field_types_are_not_enforced() {
        let numeric_id = normalize_upload_response(json!({"_id": 42})).unwrap();
        assert_eq!(numeric_id.id(), Some(&json!(42)));
        assert_eq!(numeric_id.id_label(), "42");

        let string_size = normalize_upload_response(json!({"_id": "a1", "size": "2048"})).unwrap();
        assert_eq!(string_size.reference()["size"], json!("2048"));
    }

    #[test]
    fn test_wrapped_and_array_records_need_no_id() {
        let from_array = normalize_upload_response(json!([{"path": "/x.jpg"}])).unwrap();
        assert_eq!(from_array.path(), Some("/x.jpg"));
        assert_eq!(from_array.id(), None);
        assert_eq!(from_array.id_label(), "");

        let wrapped = normalize_upload_response(json!({"assets": [{"path": "/y.jpg"}]})).unwrap();
        assert_eq!(wrapped.path(), Some("/y.jpg"));
        assert_eq!(wrapped.reference()["_id"], Value::Null);
    }

    #[test]
    fn test_empty_assets_falls_back_to_bare_object() {
        let record = normalize_upload_response(json!({"assets": [], "_id": "d1"})).unwrap();
        assert_eq!(record.id_label(), "d1");
    }

    #[test]
    fn test_unrecognized_shapes_fail() {
        for body in [
            json!({}),
            json!([]),
            json!([null]),
            json!({"assets": []}),
            json!({"path": "/x.jpg"}),
            json!("ok"),
            json!(null),
        ] {
            let err = normalize_upload_response(body).unwrap_err();
            assert!(matches!(err, IngestError::UnexpectedResponse(_)));
        }
    }

    #[test]
    fn test_reference_has_all_five_fields() {
        let record = normalize_upload_response(json!({"_id": "a1", "path": "/x.jpg", "folder": "f"})).unwrap();
        assert_eq!(
            record.reference(),
            json!({"_id": "a1", "path": "/x.jpg", "title": null, "mime": null, "size": null})
        );
    }
}
