use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Field name to the messages describing why it was rejected.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    /// Records a message when `value` is longer than `max` characters.
    pub fn check_max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("Must be at most {max} characters"));
        }
    }
}

/// A field of a partial update: omitted, explicitly `null`, or set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Missing,
    Null,
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Missing
    }
}

// Only reached when the key is present; `#[serde(default)]` supplies `Missing`.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(|value| match value {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Body {
        #[serde(default)]
        description: Patch<String>,
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let absent: Body = serde_json::from_str("{}").unwrap();
        let null: Body = serde_json::from_str(r#"{"description":null}"#).unwrap();
        let set: Body = serde_json::from_str(r#"{"description":"x"}"#).unwrap();

        assert_eq!(absent.description, Patch::Missing);
        assert_eq!(null.description, Patch::Null);
        assert_eq!(set.description, Patch::Value("x".to_string()));
    }

    #[test]
    fn email_pattern() {
        assert!(is_email("a@x.com"));
        assert!(!is_email("a@x"));
        assert!(!is_email("a x@y.com"));
        assert!(!is_email("@x.com"));
    }

    #[test]
    fn errors_accumulate_per_field() {
        let mut errors = ValidationErrors::default();
        errors.add("title", "Required");
        errors.check_max_len("description", &"x".repeat(11), 10);

        assert!(errors.contains("title"));
        assert!(errors.contains("description"));
        assert!(errors.finish(()).is_err());
    }
}
