//! People: the owners of subscriptions.

use serde::{Deserialize, Serialize};

/// A registered gym client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub id:        i64,
  pub full_name: String,
  /// Eleven digits, no separators.
  pub phone:     String,
}

/// Input to [`crate::store::PersonStore::add_person`] and
/// [`crate::store::PersonStore::update_person`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerson {
  pub full_name: String,
  pub phone:     String,
}

impl NewPerson {
  /// Check field constraints, returning a message per offending field.
  ///
  /// An empty map means the input is valid.
  pub fn validate(&self) -> std::collections::BTreeMap<&'static str, String> {
    let mut errors = std::collections::BTreeMap::new();

    let name_len = self.full_name.trim().chars().count();
    if name_len == 0 {
      errors.insert("full_name", "full name is required".to_owned());
    } else if name_len < 2 {
      errors.insert("full_name", "full name must be at least 2 characters".to_owned());
    } else if name_len > 50 {
      errors.insert("full_name", "full name must be at most 50 characters".to_owned());
    }

    if self.phone.is_empty() {
      errors.insert("phone", "phone is required".to_owned());
    } else if !self.phone.chars().all(|c| c.is_ascii_digit()) {
      errors.insert("phone", "phone must contain digits only".to_owned());
    } else if self.phone.len() != 11 {
      errors.insert("phone", "phone must contain exactly 11 digits".to_owned());
    }

    errors
  }
}
