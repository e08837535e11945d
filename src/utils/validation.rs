//! Input bounds and an issue collector for request validation.

use crate::error::{CatalogError, CatalogResult, FieldIssue};

pub const RATING_MIN: f64 = 0.0;
pub const RATING_MAX: f64 = 10.0;
pub const YEAR_MIN: i32 = 1450;
pub const YEAR_MAX: i32 = 2100;
pub const TITLE_MAX_CHARS: usize = 255;
pub const GENRE_NAME_MAX_CHARS: usize = 100;
pub const FULL_NAME_MAX_CHARS: usize = 255;

/// Collects every problem in a request so they are reported together.
#[derive(Debug, Default)]
pub struct Validator {
    issues: Vec<FieldIssue>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Trimmed text that must be non-empty and at most `max_chars` long.
    pub fn required_text(&mut self, field: &str, value: &str, max_chars: usize) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.issue(field, "must not be empty");
        } else if trimmed.chars().count() > max_chars {
            self.issue(field, format!("must be at most {} characters", max_chars));
        }
        trimmed.to_string()
    }

    pub fn rating(&mut self, field: &str, value: f64) {
        if !value.is_finite() || !(RATING_MIN..=RATING_MAX).contains(&value) {
            self.issue(
                field,
                format!("must be between {:.1} and {:.1}", RATING_MIN, RATING_MAX),
            );
        }
    }

    pub fn published_year(&mut self, field: &str, value: i32) {
        if !(YEAR_MIN..=YEAR_MAX).contains(&value) {
            self.issue(field, format!("must be between {} and {}", YEAR_MIN, YEAR_MAX));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn finish(self) -> CatalogResult<()> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Validation(self.issues))
        }
    }
}

/// Ratings are kept at one decimal place.
pub fn round_rating(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_all_issues() {
        let mut v = Validator::new();
        v.required_text("title", "   ", TITLE_MAX_CHARS);
        v.rating("rating", 10.5);
        v.published_year("published_year", 1200);

        match v.finish() {
            Err(CatalogError::Validation(issues)) => {
                let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
                assert_eq!(fields, ["title", "rating", "published_year"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn bounds_are_inclusive() {
        let mut v = Validator::new();
        v.rating("rating", 0.0);
        v.rating("rating", 10.0);
        v.published_year("published_year", 1450);
        v.published_year("published_year", 2100);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn rejects_nan_rating_and_long_names() {
        let mut v = Validator::new();
        v.rating("rating", f64::NAN);
        v.required_text("name", &"x".repeat(GENRE_NAME_MAX_CHARS + 1), GENRE_NAME_MAX_CHARS);
        assert!(!v.is_empty());
    }

    #[test]
    fn required_text_is_trimmed() {
        let mut v = Validator::new();
        assert_eq!(v.required_text("name", "  Horror ", GENRE_NAME_MAX_CHARS), "Horror");
        assert!(v.is_empty());
    }

    #[test]
    fn rating_rounds_to_one_decimal() {
        assert_eq!(round_rating(8.66), 8.7);
        assert_eq!(round_rating(7.0), 7.0);
    }
}
