//! Semantic tag fields and their merge rules.

use std::collections::BTreeMap;

use crate::{Error, Result};

/// A set of tag fields keyed by native field code.
///
/// Codes are whatever the format uses natively (`"TIT2"`, `"©nam"`,
/// `"ARTIST"`). An empty value marks a field for deletion when merged.
///
/// # Example
///
/// ```rust
/// use tagsplice::edit::TagFields;
///
/// let mut current: TagFields = [("TIT2", "Old"), ("TALB", "Album")].into_iter().collect();
/// let update: TagFields = [("TIT2", "New"), ("TALB", "")].into_iter().collect();
///
/// current.integrate(&update);
/// current.cleanup();
///
/// assert_eq!(current.get("TIT2"), Some("New"));
/// assert_eq!(current.get("TALB"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFields {
    fields: BTreeMap<String, String>,
}

impl TagFields {
    /// Creates an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, code: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(code.into(), value.into())
    }

    /// Returns a field value.
    pub fn get(&self, code: &str) -> Option<&str> {
        self.fields.get(code).map(String::as_str)
    }

    /// Removes a field.
    pub fn remove(&mut self, code: &str) -> Option<String> {
        self.fields.remove(code)
    }

    /// Returns `true` if the field is present.
    pub fn contains(&self, code: &str) -> bool {
        self.fields.contains_key(code)
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(code, value)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlays `other` onto this set.
    ///
    /// Fields present in `other` replace the current value; fields absent
    /// from `other` are kept.
    pub fn integrate(&mut self, other: &TagFields) {
        for (code, value) in &other.fields {
            self.fields.insert(code.clone(), value.clone());
        }
    }

    /// Drops fields whose value is empty.
    pub fn cleanup(&mut self) {
        self.fields.retain(|_, v| !v.is_empty());
    }

    /// Checks that every code is exactly `width` characters long.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFieldCode`] for the first offending code.
    pub fn validate_codes(&self, width: usize) -> Result<()> {
        match self.fields.keys().find(|code| code.chars().count() != width) {
            Some(code) => Err(Error::InvalidFieldCode {
                code: code.clone(),
                expected: width,
            }),
            None => Ok(()),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
