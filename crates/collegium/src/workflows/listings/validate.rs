use chrono::{DateTime, Utc};

use super::domain::{Address, CollegeChanges, CollegeDraft, CollegeId, CollegeRecord, Course};
use crate::workflows::identity::email_shape_ok;

pub const MAX_ABOUT_BLOCKS: usize = 3;
pub const MIN_FOUNDED_YEAR: i32 = 1800;
pub const MIN_RATING: f32 = 0.0;
pub const MAX_RATING: f32 = 5.0;

/// Field-level rejection of a draft or partial update.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

pub(crate) fn invalid(field: &'static str, message: &'static str) -> ValidationError {
    ValidationError { field, message }
}

/// Build a record from a submission draft. Image paths are attached later by
/// the media pipeline.
pub(crate) fn record_from_draft(
    college_id: CollegeId,
    draft: CollegeDraft,
    at: DateTime<Utc>,
) -> Result<CollegeRecord, ValidationError> {
    Ok(CollegeRecord {
        college_id,
        name: validated_name(&draft.name)?,
        heading: normalized_optional(draft.heading),
        about: validated_about(draft.about)?,
        courses: validated_courses(draft.courses)?,
        departments: deduped_departments(draft.departments),
        rating: validated_rating(draft.rating.unwrap_or(0.0))?,
        accommodations: trimmed_list(draft.accommodations),
        accommodation_images: Vec::new(),
        images: Vec::new(),
        contact: normalized_optional(draft.contact),
        email: validated_optional_email(draft.email)?,
        address: draft.address.map(normalized_address),
        address_url: normalized_optional(draft.address_url),
        founded_year: validated_year(draft.founded_year)?,
        created_at: at,
        updated_at: at,
    })
}

/// Apply a partial update in place. Provided scalars replace their current
/// values, provided lists replace wholesale.
pub(crate) fn apply_changes(
    record: &mut CollegeRecord,
    changes: CollegeChanges,
) -> Result<(), ValidationError> {
    if let Some(name) = changes.name {
        record.name = validated_name(&name)?;
    }
    if let Some(heading) = changes.heading {
        record.heading = normalized_optional(Some(heading));
    }
    if let Some(about) = changes.about {
        record.about = validated_about(about)?;
    }
    if let Some(courses) = changes.courses {
        record.courses = validated_courses(courses)?;
    }
    if let Some(departments) = changes.departments {
        record.departments = deduped_departments(departments);
    }
    if let Some(rating) = changes.rating {
        record.rating = validated_rating(rating)?;
    }
    if let Some(accommodations) = changes.accommodations {
        record.accommodations = trimmed_list(accommodations);
    }
    if let Some(contact) = changes.contact {
        record.contact = normalized_optional(Some(contact));
    }
    if let Some(email) = changes.email {
        record.email = validated_optional_email(Some(email))?;
    }
    if let Some(address) = changes.address {
        record.address = Some(normalized_address(address));
    }
    if let Some(url) = changes.address_url {
        record.address_url = normalized_optional(Some(url));
    }
    if let Some(year) = changes.founded_year {
        record.founded_year = validated_year(Some(year))?;
    }
    Ok(())
}

fn validated_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.chars().count() < 2 {
        return Err(invalid("name", "college name must be at least 2 characters"));
    }
    Ok(name.to_string())
}

fn validated_about(blocks: Vec<String>) -> Result<Vec<String>, ValidationError> {
    let blocks = trimmed_list(blocks);
    if blocks.len() > MAX_ABOUT_BLOCKS {
        return Err(invalid("about", "at most three about blocks are allowed"));
    }
    Ok(blocks)
}

fn validated_courses(courses: Vec<Course>) -> Result<Vec<Course>, ValidationError> {
    courses
        .into_iter()
        .map(|course| {
            let title = course.title.trim().to_string();
            if title.is_empty() {
                return Err(invalid("courses", "every course needs a title"));
            }
            Ok(Course {
                title,
                syllabus: course.syllabus.trim().to_string(),
            })
        })
        .collect()
}

/// Departments behave as a set: order of first appearance, case-insensitive
/// duplicates dropped.
fn deduped_departments(departments: Vec<String>) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for department in trimmed_list(departments) {
        if !kept
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(&department))
        {
            kept.push(department);
        }
    }
    kept
}

fn validated_rating(rating: f32) -> Result<f32, ValidationError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(invalid("rating", "rating must be between 0 and 5"));
    }
    Ok(rating)
}

fn validated_optional_email(email: Option<String>) -> Result<Option<String>, ValidationError> {
    match normalized_optional(email) {
        None => Ok(None),
        Some(raw) => {
            let email = raw.to_lowercase();
            if email_shape_ok(&email) {
                Ok(Some(email))
            } else {
                Err(invalid("email", "not a valid email address"))
            }
        }
    }
}

fn validated_year(year: Option<i32>) -> Result<Option<i32>, ValidationError> {
    match year {
        Some(year) if year < MIN_FOUNDED_YEAR => Err(invalid(
            "founded_year",
            "founding year must be 1800 or later",
        )),
        other => Ok(other),
    }
}

fn normalized_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn trimmed_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn normalized_address(address: Address) -> Address {
    Address {
        street: normalized_optional(address.street),
        city: normalized_optional(address.city),
        state: normalized_optional(address.state),
        country: normalized_optional(address.country),
        postal_code: normalized_optional(address.postal_code),
    }
}
