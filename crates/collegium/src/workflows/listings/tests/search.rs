use chrono::Utc;

use crate::workflows::listings::domain::{CollegeId, CollegeRecord};
use crate::workflows::listings::search::{
    search_approved, PLACEHOLDER_IMAGE, SEARCH_LIMIT,
};

fn record(id: &str, name: &str) -> CollegeRecord {
    let now = Utc::now();
    CollegeRecord {
        college_id: CollegeId(id.to_string()),
        name: name.to_string(),
        heading: None,
        about: Vec::new(),
        courses: Vec::new(),
        departments: Vec::new(),
        rating: 0.0,
        accommodations: Vec::new(),
        accommodation_images: Vec::new(),
        images: Vec::new(),
        contact: None,
        email: None,
        address: None,
        address_url: None,
        founded_year: None,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn matches_are_case_insensitive_across_fields() {
    let mut by_heading = record("c-1", "Alpha College");
    by_heading.heading = Some("Maritime engineering campus".to_string());
    let mut by_about = record("c-2", "Beta College");
    by_about.about = vec!["A MARITIME tradition since 1900.".to_string()];
    let by_name = record("c-3", "Maritime Institute");
    let miss = record("c-4", "Inland Academy");

    let hits = search_approved(&[by_heading, by_about, by_name, miss], "maritime");
    let names: Vec<&str> = hits.iter().map(|hit| hit.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Alpha College", "Beta College", "Maritime Institute"]
    );
}

#[test]
fn id_substrings_match_too() {
    let records = vec![record("ca11ab1e", "Alpha College")];
    assert_eq!(search_approved(&records, "11AB").len(), 1);
    assert!(search_approved(&records, "zz").is_empty());
}

#[test]
fn results_are_capped_preserving_input_order() {
    let records: Vec<CollegeRecord> = (0..15)
        .map(|i| record(&format!("c-{i}"), &format!("College {i}")))
        .collect();
    let hits = search_approved(&records, "college");
    assert_eq!(hits.len(), SEARCH_LIMIT);
    assert_eq!(hits[0].name, "College 0");
    assert_eq!(hits[9].name, "College 9");
}

#[test]
fn missing_images_fall_back_to_the_placeholder() {
    let mut with_image = record("c-1", "Alpha College");
    with_image.images = vec!["/uploads/campus-1.jpg".to_string()];
    let without = record("c-2", "Beta College");

    let hits = search_approved(&[with_image, without], "college");
    assert_eq!(hits[0].image, "/uploads/campus-1.jpg");
    assert_eq!(hits[1].image, PLACEHOLDER_IMAGE);
}
