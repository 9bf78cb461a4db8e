use std::collections::HashMap;
use std::fmt::Display;

use crate::error::ApiError;

/// Accumulates field problems so a request reports all of them at once
#[derive(Debug, Default)]
pub struct Validator {
    errors: HashMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Required text; length counted in characters after trimming
    pub fn text(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.trim().chars().count();
        if len < min {
            if min <= 1 {
                self.fail(field, "must not be empty");
            } else {
                self.fail(field, format!("must be at least {} characters", min));
            }
        } else if len > max {
            self.fail(field, format!("must be at most {} characters", max));
        }
        self
    }

    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.fail(field, format!("must be at most {} characters", max));
            }
        }
        self
    }

    pub fn range<T: PartialOrd + Display>(&mut self, field: &str, value: T, min: T, max: T) -> &mut Self {
        if value < min || value > max {
            self.fail(field, format!("must be between {} and {}", min, max));
        }
        self
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) -> &mut Self {
        if !allowed.contains(&value) {
            self.fail(field, format!("must be one of: {}", allowed.join(", ")));
        }
        self
    }

    pub fn http_url(&mut self, field: &str, value: &str) -> &mut Self {
        match url::Url::parse(value) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => self.fail(field, "must be an http or https URL"),
        }
        self
    }

    pub fn check(&mut self, field: &str, ok: bool, problem: impl Into<String>) -> &mut Self {
        if !ok {
            self.fail(field, problem);
        }
        self
    }

    fn fail(&mut self, field: &str, problem: impl Into<String>) {
        // First problem per field wins
        self.errors.entry(field.to_string()).or_insert_with(|| problem.into());
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error(
                "Invalid request fields",
                Some(std::mem::take(&mut self.errors)),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_failing_field() {
        let err = Validator::new()
            .text("title", "   ", 1, 10)
            .range("points", 0, 1, 1000)
            .one_of("status", "open", &["active", "archived"])
            .finish()
            .unwrap_err();

        match err {
            ApiError::ValidationError { field_errors: Some(fields), .. } => {
                assert_eq!(fields.len(), 3);
                assert_eq!(fields["title"], "must not be empty");
                assert_eq!(fields["points"], "must be between 1 and 1000");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert!(Validator::new().text("title", "ééééé", 1, 5).finish().is_ok());
        assert!(Validator::new().text("title", "éééééé", 1, 5).finish().is_err());
    }

    #[test]
    fn urls_must_be_http() {
        assert!(Validator::new().http_url("u", "https://example.com/x").finish().is_ok());
        assert!(Validator::new().http_url("u", "javascript:alert(1)").finish().is_err());
        assert!(Validator::new().http_url("u", "not a url").finish().is_err());
    }
}
