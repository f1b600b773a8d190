//! Field rules for video metadata, shared by the upload client and the store.

use crate::models::video::{CATEGORY_WILDCARD, DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS};
use serde::Serialize;
use std::fmt;

/// One rejected field and the message to show next to it.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every field that failed validation.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}", joined)
    }
}

impl std::error::Error for ValidationErrors {}

/// Check title, description and category.
///
/// When `allowed_categories` is `Some`, the category must be one of them.
pub fn validate_video_fields(
    title: &str,
    description: &str,
    category: &str,
    allowed_categories: Option<&[String]>,
) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    // Limits apply to what gets stored, which is the trimmed value.
    let title = title.trim();
    let description = description.trim();

    if title.is_empty() {
        errors.push("title", "Title is required.");
    } else if title.chars().count() > TITLE_MAX_CHARS {
        errors.push(
            "title",
            format!("Title should not exceed {} characters.", TITLE_MAX_CHARS),
        );
    }

    if description.is_empty() {
        errors.push("description", "Description is required.");
    } else if description.chars().count() > DESCRIPTION_MAX_CHARS {
        errors.push(
            "description",
            format!(
                "Description should not exceed {} characters.",
                DESCRIPTION_MAX_CHARS
            ),
        );
    }

    let category = category.trim();
    if category.is_empty() || category.eq_ignore_ascii_case(CATEGORY_WILDCARD) {
        errors.push("category", "Choose a category.");
    } else if let Some(allowed) = allowed_categories {
        if !allowed.iter().any(|c| c == category) {
            errors.push("category", format!("Unknown category `{}`.", category));
        }
    }

    errors
}
