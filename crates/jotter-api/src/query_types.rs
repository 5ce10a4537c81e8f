//! Custom query and body field types with forgiving parsing.
//!
//! Browsers send booleans from checkboxes and query strings as "on", "1" or
//! "True"; JSON clients send real booleans. Both are accepted here so the
//! handlers only see `bool`.

use serde::{de, Deserialize, Deserializer};
use std::fmt;

use jotter_core::ListNotesRequest;

/// Parse the boolean spellings clients actually send.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Deserialize an optional boolean from either a JSON bool or a string.
pub fn deserialize_flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlexibleBool;

    impl<'de> de::Visitor<'de> for FlexibleBool {
        type Value = Option<bool>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a boolean (true/false, 1/0, yes/no, on/off)")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            match v {
                0 => Ok(Some(false)),
                1 => Ok(Some(true)),
                _ => Err(E::custom(format!("invalid boolean '{}'", v))),
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            parse_bool(v)
                .map(Some)
                .ok_or_else(|| E::custom(format!("invalid boolean '{}'", v)))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<Self::Value, D2::Error> {
            d.deserialize_any(FlexibleBool)
        }
    }

    deserializer.deserialize_any(FlexibleBool)
}

/// Distinguish an absent field from an explicit `null`.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: absent
/// gives `None`, `null` gives `Some(None)`, a value gives `Some(Some(v))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query string of `GET /notes`.
#[derive(Debug, Default, Deserialize)]
pub struct ListNotesQuery {
    /// Free-text search over title and content
    pub query: Option<String>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub include_archived: Option<bool>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl From<ListNotesQuery> for ListNotesRequest {
    fn from(q: ListNotesQuery) -> Self {
        ListNotesRequest {
            query: q.query,
            category: q.category,
            sort_by: q.sort_by,
            sort_order: q.sort_order,
            include_archived: q.include_archived.unwrap_or(false),
            skip: q.skip,
            limit: q.limit,
        }
    }
}

/// JSON body accepted by `POST /notes` and `PUT /notes/:id`.
///
/// Every field is optional here; the create handler enforces the required
/// ones.
#[derive(Debug, Default, Deserialize)]
pub struct NoteBody {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub is_important: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub clear_image: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        for t in ["true", "TRUE", "1", "yes", "on", " True "] {
            assert_eq!(parse_bool(t), Some(true), "{}", t);
        }
        for f in ["false", "0", "no", "off", ""] {
            assert_eq!(parse_bool(f), Some(false), "{}", f);
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_note_body_category_tri_state() {
        let absent: NoteBody = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(absent.category, None);

        let null: NoteBody = serde_json::from_str(r#"{"category":null}"#).unwrap();
        assert_eq!(null.category, Some(None));

        let set: NoteBody = serde_json::from_str(r#"{"category":"Work"}"#).unwrap();
        assert_eq!(set.category, Some(Some("Work".to_string())));
    }

    #[test]
    fn test_note_body_flexible_bools() {
        let body: NoteBody =
            serde_json::from_str(r#"{"is_important":"on","clear_image":true}"#).unwrap();
        assert_eq!(body.is_important, Some(true));
        assert_eq!(body.clear_image, Some(true));

        let body: NoteBody = serde_json::from_str(r#"{"is_important":0}"#).unwrap();
        assert_eq!(body.is_important, Some(false));

        let body: NoteBody = serde_json::from_str(r#"{"is_important":null}"#).unwrap();
        assert_eq!(body.is_important, None);

        assert!(serde_json::from_str::<NoteBody>(r#"{"is_important":"perhaps"}"#).is_err());
    }

    #[test]
    fn test_list_query_into_request() {
        let q = ListNotesQuery {
            query: Some("milk".into()),
            include_archived: Some(true),
            limit: Some(5),
            ..Default::default()
        };
        let req: ListNotesRequest = q.into();
        assert_eq!(req.query.as_deref(), Some("milk"));
        assert!(req.include_archived);
        assert_eq!(req.limit, Some(5));
        assert_eq!(req.skip, None);
    }
}
