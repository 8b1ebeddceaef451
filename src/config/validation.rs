//! Settings validation.
//!
//! Serde handles syntax; this checks value ranges. Every problem is
//! reported, not just the first.

use std::fmt;

use url::Url;

use crate::config::schema::ClientSettings;

/// One rejected setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_settings(settings: &ClientSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut reject = |field: &'static str, message: String| {
        errors.push(ValidationError { field, message });
    };

    if settings.workers == 0 {
        reject("workers", "must be at least 1".to_string());
    }
    if settings.revs < -1 {
        reject("revs", format!("{} is below -1", settings.revs));
    }
    if settings.bucket.is_empty() {
        reject("bucket", "must not be empty".to_string());
    }
    if settings.vbuckets == 0 {
        reject("vbuckets", "must be at least 1".to_string());
    }
    if settings.timeouts.connect_secs == 0 {
        reject("timeouts.connect_secs", "must be greater than 0".to_string());
    }
    if settings.timeouts.request_secs == 0 {
        reject("timeouts.request_secs", "must be greater than 0".to_string());
    }
    if let Err(e) = Url::parse(&settings.url) {
        reject("url", format!("{:?}: {}", settings.url, e));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
