//! Lenient deserializers for query-string filters.
//!
//! HTML forms and the WordPress client send empty strings for unset filters
//! (`?teacher_id=`). These helpers treat blank values as `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

fn non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

pub fn deserialize_optional_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    non_blank(deserializer)?
        .map(|s| Uuid::parse_str(s.trim()).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn deserialize_optional_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    non_blank(deserializer)?
        .map(|s| {
            DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(serde::de::Error::custom)
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Filter {
        #[serde(default, deserialize_with = "deserialize_optional_uuid")]
        id: Option<Uuid>,
        #[serde(default, deserialize_with = "deserialize_optional_datetime")]
        from: Option<DateTime<Utc>>,
    }

    #[test]
    fn blank_values_are_none() {
        let f: Filter = serde_json::from_str(r#"{"id": "", "from": " "}"#).unwrap();
        assert!(f.id.is_none());
        assert!(f.from.is_none());
    }

    #[test]
    fn values_are_parsed() {
        let f: Filter = serde_json::from_str(
            r#"{"id": "6f1c1c3e-9a3e-4a55-8d6f-0d3a3b1c2d4e", "from": "2025-03-01T10:00:00+01:00"}"#,
        )
        .unwrap();
        assert!(f.id.is_some());
        assert_eq!(f.from.unwrap().to_rfc3339(), "2025-03-01T09:00:00+00:00");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(serde_json::from_str::<Filter>(r#"{"id": "nope"}"#).is_err());
    }
}
