//! Payment models.
//!
//! DTOs come from `thrive-models`; [`IntentMetadata`] is the reconciliation
//! payload attached to every payment intent and read back from webhooks.

use std::collections::{BTreeMap, HashMap};

use thrive_models::ids::{BookingId, ProductMapId, SessionId, StudentId};
use uuid::Uuid;

pub use thrive_models::payments::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentMetadata {
    pub student_id: StudentId,
    pub service_key: String,
    pub product_map_id: ProductMapId,
    pub quantity: i32,
    pub kind: PaymentKind,
    pub session_id: Option<SessionId>,
    pub booking_id: Option<BookingId>,
}

impl IntentMetadata {
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("student_id".to_string(), self.student_id.to_string());
        map.insert("service_key".to_string(), self.service_key.clone());
        map.insert("product_map_id".to_string(), self.product_map_id.to_string());
        map.insert("quantity".to_string(), self.quantity.to_string());
        map.insert("kind".to_string(), self.kind.to_string());
        if let Some(session_id) = self.session_id {
            map.insert("session_id".to_string(), session_id.to_string());
        }
        if let Some(booking_id) = self.booking_id {
            map.insert("booking_id".to_string(), booking_id.to_string());
        }
        map
    }

    /// Read metadata back from a webhook payload. The error names the first
    /// missing or unparseable key.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, String> {
        fn required<'a>(map: &'a HashMap<String, String>, key: &str) -> Result<&'a str, String> {
            map.get(key)
                .map(String::as_str)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| format!("missing metadata key {key}"))
        }
        fn uuid(map: &HashMap<String, String>, key: &str) -> Result<Uuid, String> {
            Uuid::parse_str(required(map, key)?).map_err(|_| format!("invalid {key}"))
        }
        fn optional_uuid(map: &HashMap<String, String>, key: &str) -> Result<Option<Uuid>, String> {
            match map.get(key).filter(|v| !v.is_empty()) {
                Some(raw) => Uuid::parse_str(raw)
                    .map(Some)
                    .map_err(|_| format!("invalid {key}")),
                None => Ok(None),
            }
        }

        let quantity = match map.get("quantity") {
            Some(raw) => raw.parse().map_err(|_| "invalid quantity".to_string())?,
            None => 1,
        };

        Ok(Self {
            student_id: uuid(map, "student_id")?.into(),
            service_key: required(map, "service_key")?.to_string(),
            product_map_id: uuid(map, "product_map_id")?.into(),
            quantity,
            kind: required(map, "kind")?.parse()?,
            session_id: optional_uuid(map, "session_id")?.map(SessionId::from),
            booking_id: optional_uuid(map, "booking_id")?.map(BookingId::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> IntentMetadata {
        IntentMetadata {
            student_id: StudentId::new(),
            service_key: "pack-10".to_string(),
            product_map_id: ProductMapId::new(),
            quantity: 2,
            kind: PaymentKind::Package,
            session_id: Some(SessionId::new()),
            booking_id: None,
        }
    }

    #[test]
    fn metadata_survives_stripe() {
        let original = metadata();
        let map: HashMap<String, String> = original.to_map().into_iter().collect();
        assert!(!map.contains_key("booking_id"));
        assert_eq!(IntentMetadata::from_map(&map), Ok(original));
    }

    #[test]
    fn reports_missing_keys() {
        let mut map: HashMap<String, String> = metadata().to_map().into_iter().collect();
        map.remove("student_id");
        assert_eq!(
            IntentMetadata::from_map(&map),
            Err("missing metadata key student_id".to_string())
        );
    }

    #[test]
    fn rejects_unknown_kind_and_bad_ids() {
        let mut map: HashMap<String, String> = metadata().to_map().into_iter().collect();
        map.insert("kind".to_string(), "subscription".to_string());
        assert!(IntentMetadata::from_map(&map).is_err());

        let mut map: HashMap<String, String> = metadata().to_map().into_iter().collect();
        map.insert("session_id".to_string(), "not-a-uuid".to_string());
        assert_eq!(
            IntentMetadata::from_map(&map),
            Err("invalid session_id".to_string())
        );
    }

    #[test]
    fn quantity_defaults_to_one() {
        let mut map: HashMap<String, String> = metadata().to_map().into_iter().collect();
        map.remove("quantity");
        assert_eq!(IntentMetadata::from_map(&map).unwrap().quantity, 1);
    }
}
