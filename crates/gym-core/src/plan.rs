//! Subscription plans: the priced tariffs a subscription is bought against.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
  pub id:            i64,
  pub title:         String,
  pub price:         f64,
  /// Nominal validity period of a subscription on this plan.
  pub duration_days: u32,
  /// How many days a subscription on this plan may be frozen.
  pub freeze_days:   u32,
}

/// Input to [`crate::store::PlanStore::add_plan`] and
/// [`crate::store::PlanStore::update_plan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlan {
  pub title:         String,
  pub price:         f64,
  pub duration_days: u32,
  #[serde(default)]
  pub freeze_days:   u32,
}

impl NewPlan {
  /// Return a description of the first violated constraint, if any.
  pub fn validate(&self) -> Option<&'static str> {
    if self.title.trim().is_empty() {
      Some("title is required")
    } else if !self.price.is_finite() || self.price < 0.0 {
      Some("price must be a non-negative number")
    } else {
      None
    }
  }
}
