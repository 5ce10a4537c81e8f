//! Note listing: filtering, sorting and pagination.
//!
//! Pure and side-effect free. The store hands over a snapshot of its
//! collection in creation order and gets back the page to return.
//!
//! Filters run in a fixed order, each one optional:
//! 1. archival visibility (archived notes hidden unless asked for)
//! 2. free-text search over title and content (case-insensitive substring)
//! 3. category equality (case-insensitive)
//!
//! Sorting is stable, so notes with equal keys keep creation order and
//! repeated queries against an unchanged collection return the same page.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::Note;
use crate::traits::ListNotesRequest;

/// Accepted `sort_by` values, in the order they are listed in error messages.
pub const VALID_SORT_FIELDS: &[&str] = &[
    "title",
    "category",
    "importance",
    "created_at",
    "updated_at",
];

/// Accepted `sort_order` values.
pub const VALID_SORT_ORDERS: &[&str] = &["asc", "desc"];

// =============================================================================
// SORT KEYS
// =============================================================================

/// Field a listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Category,
    Importance,
    CreatedAt,
    UpdatedAt,
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "category" => Ok(Self::Category),
            // the browser client sends the field name
            "importance" | "is_important" => Ok(Self::Importance),
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            _ => Err(Error::InvalidInput(format!(
                "Invalid sort_by '{}'. Valid values: {}",
                s,
                VALID_SORT_FIELDS.join(", ")
            ))),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(Error::InvalidInput(format!(
                "Invalid sort_order '{}'. Valid values: {}",
                s,
                VALID_SORT_ORDERS.join(", ")
            ))),
        }
    }
}

// =============================================================================
// QUERY
// =============================================================================

/// A validated listing request.
#[derive(Debug, Clone, Default)]
pub struct NoteQuery {
    include_archived: bool,
    search: Option<String>,
    category: Option<String>,
    sort: Option<(SortField, SortOrder)>,
    skip: usize,
    limit: Option<usize>,
}

impl NoteQuery {
    /// Validate a raw request. Blank search and category strings are ignored.
    pub fn from_request(req: &ListNotesRequest) -> Result<Self> {
        let sort_order = match req.sort_order.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.parse::<SortOrder>()?,
            _ => SortOrder::default(),
        };
        let sort = match req.sort_by.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some((s.parse::<SortField>()?, sort_order)),
            _ => None,
        };
        if req.limit == Some(0) {
            return Err(Error::InvalidInput("limit must be >= 1".into()));
        }

        Ok(Self {
            include_archived: req.include_archived,
            search: non_blank_lower(req.query.as_deref()),
            category: non_blank_lower(req.category.as_deref()),
            sort,
            skip: req.skip.unwrap_or(crate::defaults::PAGE_OFFSET),
            limit: req.limit,
        })
    }

    /// Whether a note passes every filter.
    pub fn matches(&self, note: &Note) -> bool {
        if note.is_archived && !self.include_archived {
            return false;
        }
        if let Some(needle) = &self.search {
            if !note.title.to_lowercase().contains(needle)
                && !note.content.to_lowercase().contains(needle)
            {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if note.category_key().as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        true
    }

    /// Filter, sort and paginate `notes`, which must be in creation order.
    pub fn apply(&self, notes: Vec<Note>) -> Vec<Note> {
        let mut selected: Vec<Note> = notes.into_iter().filter(|n| self.matches(n)).collect();

        if let Some((field, order)) = self.sort {
            // slice::sort_by is stable
            selected.sort_by(|a, b| compare(a, b, field, order));
        }

        let page = selected.into_iter().skip(self.skip);
        match self.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }
}

/// Validate `req` and run it over `notes`.
pub fn apply(notes: Vec<Note>, req: &ListNotesRequest) -> Result<Vec<Note>> {
    Ok(NoteQuery::from_request(req)?.apply(notes))
}

fn non_blank_lower(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn compare(a: &Note, b: &Note, field: SortField, order: SortOrder) -> Ordering {
    match field {
        SortField::Title => directed(a.title.to_lowercase().cmp(&b.title.to_lowercase()), order),
        // Uncategorised notes go last in both directions.
        SortField::Category => match (a.category_key(), b.category_key()) {
            (Some(x), Some(y)) => directed(x.cmp(&y), order),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        // Ascending means important first.
        SortField::Importance => directed(b.is_important.cmp(&a.is_important), order),
        SortField::CreatedAt => directed(a.created_at.cmp(&b.created_at), order),
        SortField::UpdatedAt => directed(a.updated_at.cmp(&b.updated_at), order),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(title: &str, category: Option<&str>, important: bool) -> Note {
        Note::new(
            title.to_string(),
            format!("{} body", title),
            category.map(str::to_string),
            important,
            None,
        )
    }

    fn titles(notes: &[Note]) -> Vec<&str> {
        notes.iter().map(|n| n.title.as_str()).collect()
    }

    fn sorted(notes: Vec<Note>, by: &str, order: &str) -> Vec<Note> {
        apply(
            notes,
            &ListNotesRequest {
                sort_by: Some(by.into()),
                sort_order: Some(order.into()),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_sort_field_parse() {
        assert_eq!("title".parse::<SortField>().unwrap(), SortField::Title);
        assert_eq!("CATEGORY".parse::<SortField>().unwrap(), SortField::Category);
        assert_eq!("is_important".parse::<SortField>().unwrap(), SortField::Importance);
        assert_eq!("importance".parse::<SortField>().unwrap(), SortField::Importance);
        assert_eq!("updated_at".parse::<SortField>().unwrap(), SortField::UpdatedAt);
    }

    #[test]
    fn test_invalid_sort_field_lists_valid_values() {
        let err = "color".parse::<SortField>().unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, Error::InvalidInput(_)));
        for field in VALID_SORT_FIELDS {
            assert!(msg.contains(field), "message should mention {}", field);
        }
    }

    #[test]
    fn test_invalid_sort_order_rejected() {
        let req = ListNotesRequest {
            sort_by: Some("title".into()),
            sort_order: Some("sideways".into()),
            ..Default::default()
        };
        assert!(matches!(
            NoteQuery::from_request(&req),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_blank_sort_by_keeps_creation_order() {
        let notes = vec![note("b", None, false), note("a", None, false)];
        let req = ListNotesRequest {
            sort_by: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(titles(&apply(notes, &req).unwrap()), vec!["b", "a"]);
    }

    #[test]
    fn test_title_sort_is_case_insensitive() {
        let notes = vec![note("beta", None, false), note("Alpha", None, false), note("gamma", None, false)];
        assert_eq!(titles(&sorted(notes.clone(), "title", "asc")), vec!["Alpha", "beta", "gamma"]);
        assert_eq!(titles(&sorted(notes, "title", "desc")), vec!["gamma", "beta", "Alpha"]);
    }

    #[test]
    fn test_category_none_last_both_directions() {
        let notes = vec![
            note("none1", None, false),
            note("work", Some("Work"), false),
            note("home", Some("home"), false),
            note("none2", None, false),
        ];
        assert_eq!(
            titles(&sorted(notes.clone(), "category", "asc")),
            vec!["home", "work", "none1", "none2"]
        );
        assert_eq!(
            titles(&sorted(notes, "category", "desc")),
            vec!["work", "home", "none1", "none2"]
        );
    }

    #[test]
    fn test_importance_sort() {
        let notes = vec![note("a", None, false), note("b", None, true), note("c", None, false)];
        assert_eq!(titles(&sorted(notes.clone(), "importance", "asc")), vec!["b", "a", "c"]);
        assert_eq!(titles(&sorted(notes, "importance", "desc")), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let notes = vec![
            note("first", Some("x"), false),
            note("second", Some("X"), false),
            note("third", Some("x"), false),
        ];
        assert_eq!(
            titles(&sorted(notes.clone(), "category", "asc")),
            vec!["first", "second", "third"]
        );
        assert_eq!(
            titles(&sorted(notes, "category", "desc")),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_chronological_sort() {
        let mut older = note("older", None, false);
        let newer = note("newer", None, false);
        older.created_at = newer.created_at - chrono::Duration::seconds(5);
        older.updated_at = newer.updated_at + chrono::Duration::seconds(5);

        let notes = vec![newer, older];
        assert_eq!(titles(&sorted(notes.clone(), "created_at", "asc")), vec!["older", "newer"]);
        assert_eq!(titles(&sorted(notes, "updated_at", "asc")), vec!["newer", "older"]);
    }

    #[test]
    fn test_archived_hidden_by_default() {
        let mut archived = note("archived", None, false);
        archived.is_archived = true;
        let notes = vec![archived, note("live", None, false)];

        let visible = apply(notes.clone(), &ListNotesRequest::default()).unwrap();
        assert_eq!(titles(&visible), vec!["live"]);

        let all = apply(
            notes,
            &ListNotesRequest {
                include_archived: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(titles(&all), vec!["archived", "live"]);
    }

    #[test]
    fn test_search_matches_title_or_content() {
        let mut by_content = note("plain", None, false);
        by_content.content = "Contains the NEEDLE here".into();
        let notes = vec![note("Needle in title", None, false), by_content, note("other", None, false)];

        let req = ListNotesRequest {
            query: Some("needle".into()),
            ..Default::default()
        };
        assert_eq!(titles(&apply(notes, &req).unwrap()), vec!["Needle in title", "plain"]);
    }

    #[test]
    fn test_category_filter_case_insensitive_exact() {
        let notes = vec![
            note("a", Some("Work"), false),
            note("b", Some("workshop"), false),
            note("c", None, false),
        ];
        let req = ListNotesRequest {
            category: Some("WORK".into()),
            ..Default::default()
        };
        assert_eq!(titles(&apply(notes, &req).unwrap()), vec!["a"]);
    }

    #[test]
    fn test_pagination_after_sort() {
        let notes = vec![
            note("d", None, false),
            note("a", None, false),
            note("c", None, false),
            note("b", None, false),
        ];
        let req = ListNotesRequest {
            sort_by: Some("title".into()),
            skip: Some(1),
            limit: Some(2),
            ..Default::default()
        };
        assert_eq!(titles(&apply(notes, &req).unwrap()), vec!["b", "c"]);
    }

    #[test]
    fn test_skip_past_end_is_empty() {
        let notes = vec![note("a", None, false)];
        let req = ListNotesRequest {
            skip: Some(5),
            ..Default::default()
        };
        assert!(apply(notes, &req).unwrap().is_empty());
    }

    #[test]
    fn test_limit_zero_rejected() {
        let req = ListNotesRequest {
            limit: Some(0),
            ..Default::default()
        };
        let err = NoteQuery::from_request(&req).unwrap_err();
        assert!(err.to_string().contains("limit must be >= 1"));
    }
}
