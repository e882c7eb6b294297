use serde::Serialize;

use super::domain::{CollegeId, CollegeRecord};

/// Search never returns more than this many hits.
pub const SEARCH_LIMIT: usize = 10;

/// Shown wherever a college has no uploaded campus image yet.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder.jpg";

/// One row of a public search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub college_id: CollegeId,
    pub name: String,
    pub image: String,
}

/// Case-insensitive substring search over the approved catalogue.
///
/// A record matches when the query appears in its name, id, heading, or
/// any about block. Input ordering is preserved, so callers pass the
/// catalogue newest-first and the cap keeps the freshest matches.
pub fn search_approved(approved: &[CollegeRecord], query: &str) -> Vec<SearchHit> {
    let needle = query.to_lowercase();
    approved
        .iter()
        .filter(|record| matches_query(record, &needle))
        .take(SEARCH_LIMIT)
        .map(hit_for)
        .collect()
}

fn matches_query(record: &CollegeRecord, needle: &str) -> bool {
    if record.name.to_lowercase().contains(needle)
        || record.college_id.0.to_lowercase().contains(needle)
    {
        return true;
    }
    if let Some(heading) = &record.heading {
        if heading.to_lowercase().contains(needle) {
            return true;
        }
    }
    record
        .about
        .iter()
        .any(|block| block.to_lowercase().contains(needle))
}

fn hit_for(record: &CollegeRecord) -> SearchHit {
    SearchHit {
        college_id: record.college_id.clone(),
        name: record.name.clone(),
        image: record
            .first_image()
            .unwrap_or(PLACEHOLDER_IMAGE)
            .to_string(),
    }
}
