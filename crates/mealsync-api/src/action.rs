use mealsync_core::{MealError, MealResult};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::Nutrition;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumeData {
    pub consumption_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustData {
    pub portion_multiplier: f64,
    pub nutrition: Nutrition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipData {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceData {
    pub replacement_name: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
}

/// One client-initiated mutation of a tracking, with the payload the server
/// expects for it. The serialized tag doubles as the pending action type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TrackingAction {
    ConsumeMeal(ConsumeData),
    AdjustPortions(AdjustData),
    SkipMeal(SkipData),
    ReplaceMeal(ReplaceData),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ConsumeMeal,
    AdjustPortions,
    SkipMeal,
    ReplaceMeal,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConsumeMeal => "consume_meal",
            Self::AdjustPortions => "adjust_portions",
            Self::SkipMeal => "skip_meal",
            Self::ReplaceMeal => "replace_meal",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TrackingAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::ConsumeMeal(_) => ActionKind::ConsumeMeal,
            Self::AdjustPortions(_) => ActionKind::AdjustPortions,
            Self::SkipMeal(_) => ActionKind::SkipMeal,
            Self::ReplaceMeal(_) => ActionKind::ReplaceMeal,
        }
    }

    /// Rejects payloads the server would refuse anyway, before any state is
    /// touched.
    pub fn validate(&self) -> MealResult<()> {
        match self {
            Self::ConsumeMeal(data) => {
                if data.consumption_time.trim().is_empty() {
                    return Err(MealError::usage("consumption time is required"));
                }
                if let Some(rating) = data.satisfaction_rating
                    && !(1..=5).contains(&rating)
                {
                    return Err(MealError::usage(format!(
                        "satisfaction rating must be between 1 and 5, got {rating}"
                    )));
                }
            }
            Self::AdjustPortions(data) => {
                if !data.portion_multiplier.is_finite() || data.portion_multiplier <= 0.0 {
                    return Err(MealError::usage(format!(
                        "portion multiplier must be positive, got {}",
                        data.portion_multiplier
                    )));
                }
                if !data.nutrition.is_non_negative() {
                    return Err(MealError::usage("adjusted nutrition must be non-negative"));
                }
            }
            Self::SkipMeal(_) => {}
            Self::ReplaceMeal(data) => {
                if data.replacement_name.trim().is_empty() {
                    return Err(MealError::usage("replacement name is required"));
                }
                if let Some(nutrition) = &data.nutrition
                    && !nutrition.is_non_negative()
                {
                    return Err(MealError::usage(
                        "replacement nutrition must be non-negative",
                    ));
                }
            }
        }

        Ok(())
    }

    pub(crate) fn method_and_path(&self, tracking_id: i64) -> (reqwest::Method, String) {
        match self {
            Self::ConsumeMeal(_) => (
                reqwest::Method::POST,
                format!("/meal-tracking/{tracking_id}/consume"),
            ),
            Self::AdjustPortions(_) => (
                reqwest::Method::PUT,
                format!("/meal-tracking/{tracking_id}/adjust"),
            ),
            Self::SkipMeal(_) => (
                reqwest::Method::POST,
                format!("/meal-tracking/{tracking_id}/skip"),
            ),
            Self::ReplaceMeal(_) => (
                reqwest::Method::POST,
                format!("/meal-tracking/{tracking_id}/replace"),
            ),
        }
    }

    pub(crate) fn request_body(&self, user_id: i64) -> serde_json::Value {
        match self {
            Self::ConsumeMeal(data) => serde_json::json!({
                "user_id": user_id,
                "consumption_data": data,
            }),
            Self::AdjustPortions(data) => serde_json::json!({
                "user_id": user_id,
                "portion_multiplier": data.portion_multiplier,
                "nutrition": data.nutrition,
            }),
            Self::SkipMeal(data) => serde_json::json!({
                "user_id": user_id,
                "skip_data": data,
            }),
            Self::ReplaceMeal(data) => serde_json::json!({
                "user_id": user_id,
                "replacement_data": data,
            }),
        }
    }
}
