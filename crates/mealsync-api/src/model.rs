use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    #[serde(alias = "snacks")]
    Snack,
}

impl MealType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a tracking. `Planned` is the only non-terminal state.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    #[default]
    Planned,
    Consumed,
    Modified,
    Skipped,
    Replaced,
}

impl TrackingStatus {
    pub const ALL: [TrackingStatus; 5] = [
        Self::Planned,
        Self::Consumed,
        Self::Modified,
        Self::Skipped,
        Self::Replaced,
    ];

    /// Statuses whose actual nutrition counts toward the day's totals.
    pub fn uses_actual_nutrition(self) -> bool {
        matches!(self, Self::Consumed | Self::Modified | Self::Replaced)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Consumed => "consumed",
            Self::Modified => "modified",
            Self::Skipped => "skipped",
            Self::Replaced => "replaced",
        }
    }
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub sodium: f64,
    #[serde(default)]
    pub sugar: f64,
}

impl Nutrition {
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            protein: self.protein * factor,
            carbs: self.carbs * factor,
            fat: self.fat * factor,
            fiber: self.fiber * factor,
            sodium: self.sodium * factor,
            sugar: self.sugar * factor,
        }
    }

    pub fn is_non_negative(&self) -> bool {
        [
            self.calories,
            self.protein,
            self.carbs,
            self.fat,
            self.fiber,
            self.sodium,
            self.sugar,
        ]
        .iter()
        .all(|value| value.is_finite() && *value >= 0.0)
    }
}

impl Add for Nutrition {
    type Output = Nutrition;

    fn add(mut self, rhs: Nutrition) -> Nutrition {
        self += rhs;
        self
    }
}

impl AddAssign for Nutrition {
    fn add_assign(&mut self, rhs: Nutrition) {
        self.calories += rhs.calories;
        self.protein += rhs.protein;
        self.carbs += rhs.carbs;
        self.fat += rhs.fat;
        self.fiber += rhs.fiber;
        self.sodium += rhs.sodium;
        self.sugar += rhs.sugar;
    }
}

impl Sum for Nutrition {
    fn sum<I: Iterator<Item = Nutrition>>(iter: I) -> Nutrition {
        iter.fold(Nutrition::default(), Add::add)
    }
}

fn default_portion_size() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealTracking {
    pub id: i64,
    pub meal_type: MealType,
    #[serde(default)]
    pub meal_date: Option<NaiveDate>,
    #[serde(default)]
    pub recipe_id: Option<i64>,
    #[serde(default)]
    pub recipe_name: Option<String>,
    #[serde(default)]
    pub planned_time: Option<String>,
    #[serde(default)]
    pub status: TrackingStatus,
    #[serde(default)]
    pub planned_nutrition: Nutrition,
    #[serde(default)]
    pub actual_nutrition: Option<Nutrition>,
    #[serde(default = "default_portion_size")]
    pub planned_portion_size: f64,
    #[serde(default)]
    pub actual_portion_size: Option<f64>,
    #[serde(default)]
    pub consumption_datetime: Option<String>,
    #[serde(default)]
    pub satisfaction_rating: Option<u8>,
    #[serde(default)]
    pub user_notes: Option<String>,
    #[serde(default)]
    pub skip_reason: Option<String>,
    #[serde(default)]
    pub replacement_name: Option<String>,
    #[serde(default)]
    pub replacement_reason: Option<String>,
}

impl MealTracking {
    pub fn planned(id: i64, meal_type: MealType, planned_nutrition: Nutrition) -> Self {
        Self {
            id,
            meal_type,
            meal_date: None,
            recipe_id: None,
            recipe_name: None,
            planned_time: None,
            status: TrackingStatus::Planned,
            planned_nutrition,
            actual_nutrition: None,
            planned_portion_size: default_portion_size(),
            actual_portion_size: None,
            consumption_datetime: None,
            satisfaction_rating: None,
            user_notes: None,
            skip_reason: None,
            replacement_name: None,
            replacement_reason: None,
        }
    }

    /// Values that count toward daily totals. Falls back to the plan when a
    /// consumed-like status has no actual values recorded yet.
    pub fn effective_nutrition(&self) -> Nutrition {
        if self.status.uses_actual_nutrition()
            && let Some(actual) = self.actual_nutrition
        {
            return actual;
        }

        self.planned_nutrition
    }

    pub fn display_name(&self) -> String {
        match (&self.replacement_name, &self.recipe_name) {
            (Some(name), _) if self.status == TrackingStatus::Replaced => name.clone(),
            (_, Some(name)) => name.clone(),
            _ => format!("{} #{}", self.meal_type, self.id),
        }
    }
}

/// Server-computed aggregate for one date. Fields this client does not know
/// about are kept in `extra` so a cached summary round-trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub calorie_adherence: Option<f64>,
    #[serde(default)]
    pub protein_adherence: Option<f64>,
    #[serde(default)]
    pub carbs_adherence: Option<f64>,
    #[serde(default)]
    pub fat_adherence: Option<f64>,
    #[serde(default)]
    pub overall_adherence: Option<f64>,
    #[serde(default)]
    pub meals_planned: u32,
    #[serde(default)]
    pub meals_consumed: u32,
    #[serde(default)]
    pub meals_modified: u32,
    #[serde(default)]
    pub meals_skipped: u32,
    #[serde(default)]
    pub meals_replaced: u32,
    #[serde(default)]
    pub calorie_deficit: Option<f64>,
    #[serde(default)]
    pub protein_deficit: Option<f64>,
    #[serde(default)]
    pub timing_score: Option<f64>,
    #[serde(default)]
    pub average_satisfaction: Option<f64>,
    #[serde(default)]
    pub achievements: BTreeMap<String, bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nutrition(calories: f64) -> Nutrition {
        Nutrition {
            calories,
            ..Nutrition::default()
        }
    }

    #[test]
    fn effective_nutrition_follows_status() {
        let mut tracking = MealTracking::planned(1, MealType::Lunch, nutrition(300.0));
        tracking.actual_nutrition = Some(nutrition(500.0));
        assert_eq!(tracking.effective_nutrition().calories, 300.0);

        tracking.status = TrackingStatus::Consumed;
        assert_eq!(tracking.effective_nutrition().calories, 500.0);

        tracking.status = TrackingStatus::Skipped;
        assert_eq!(tracking.effective_nutrition().calories, 300.0);
    }

    #[test]
    fn replaced_without_actual_values_counts_the_plan() {
        let mut tracking = MealTracking::planned(2, MealType::Dinner, nutrition(650.0));
        tracking.status = TrackingStatus::Replaced;
        assert_eq!(tracking.effective_nutrition().calories, 650.0);
    }

    #[test]
    fn tracking_decodes_server_payload_and_ignores_effective_field() {
        let tracking: MealTracking = serde_json::from_value(json!({
            "id": 42,
            "meal_type": "snacks",
            "meal_date": "2025-03-01",
            "status": "consumed",
            "planned_nutrition": {"calories": 200, "protein": 10},
            "actual_nutrition": {"calories": 240},
            "effective_nutrition": {"calories": 9999},
            "satisfaction_rating": 4
        }))
        .expect("decode tracking");

        assert_eq!(tracking.meal_type, MealType::Snack);
        assert_eq!(tracking.planned_portion_size, 1.0);
        assert_eq!(tracking.effective_nutrition().calories, 240.0);
        assert_eq!(tracking.planned_nutrition.protein, 10.0);
    }

    #[test]
    fn summary_keeps_unknown_fields() {
        let summary: DailySummary = serde_json::from_value(json!({
            "date": "2025-03-01",
            "overall_adherence": 87.5,
            "meals_planned": 4,
            "achievements": {"hit_protein_target": true},
            "hydration_score": 61
        }))
        .expect("decode summary");

        assert_eq!(summary.meals_planned, 4);
        assert_eq!(summary.achievements.get("hit_protein_target"), Some(&true));
        assert_eq!(summary.extra.get("hydration_score"), Some(&json!(61)));

        let encoded = serde_json::to_value(&summary).expect("encode summary");
        assert_eq!(encoded["hydration_score"], json!(61));
    }

    #[test]
    fn nutrition_sums_and_scales() {
        let total: Nutrition = [nutrition(100.0), nutrition(250.5)].into_iter().sum();
        assert_eq!(total.calories, 350.5);
        assert_eq!(nutrition(200.0).scaled(1.5).calories, 300.0);
        assert!(!nutrition(-1.0).is_non_negative());
    }
}
