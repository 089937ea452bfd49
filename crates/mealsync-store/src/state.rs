use chrono::{DateTime, NaiveDate, Utc};
use mealsync_api::{ActionKind, DailySummary, MealTracking, TrackingAction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the persisted client state layout. Bump together with a
/// migration in `legacy.rs` or `CacheStore::load_state`.
pub const SCHEMA_VERSION: u32 = 1;

/// Everything known about one calendar date. Trackings and summary are
/// fetched separately, so either may be missing; `Some(vec![])` is a day
/// that was loaded and has nothing planned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaySnapshot {
    #[serde(default)]
    pub meal_trackings: Option<Vec<MealTracking>>,
    #[serde(default)]
    pub daily_summary: Option<DailySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: String,
    pub tracking_id: i64,
    pub action: TrackingAction,
    pub selected_date: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

impl PendingAction {
    pub fn new(
        tracking_id: i64,
        action: TrackingAction,
        selected_date: NaiveDate,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let id = format!(
            "{}-{}-{}",
            action.kind(),
            tracking_id,
            timestamp.timestamp_millis()
        );

        Self {
            id,
            tracking_id,
            action,
            selected_date,
            timestamp,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }
}

/// The durable half of the tracking store: per-date snapshots, the pending
/// action queue and client bookkeeping for one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientState {
    pub schema_version: u32,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub selected_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub offline_mode: bool,
    #[serde(default)]
    pub cached_days: BTreeMap<NaiveDate, DaySnapshot>,
    #[serde(default)]
    pub pending_actions: Vec<PendingAction>,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            user_id: None,
            selected_date: None,
            last_sync: None,
            offline_mode: false,
            cached_days: BTreeMap::new(),
            pending_actions: Vec::new(),
        }
    }
}

/// Bookkeeping row stored next to the snapshot and queue tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StateHeader {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub selected_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub offline_mode: bool,
}

impl From<&ClientState> for StateHeader {
    fn from(state: &ClientState) -> Self {
        Self {
            user_id: state.user_id,
            selected_date: state.selected_date,
            last_sync: state.last_sync,
            offline_mode: state.offline_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mealsync_api::SkipData;
    use serde_json::json;

    #[test]
    fn pending_action_id_combines_kind_tracking_and_timestamp() {
        let timestamp = Utc
            .with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        let action = PendingAction::new(
            42,
            TrackingAction::SkipMeal(SkipData {
                reason: "busy".to_string(),
            }),
            NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"),
            timestamp,
        );

        assert_eq!(action.id, format!("skip_meal-42-{}", timestamp.timestamp_millis()));
        assert_eq!(action.kind(), ActionKind::SkipMeal);
    }

    #[test]
    fn client_state_uses_date_keys() {
        let mut state = ClientState::default();
        state.cached_days.insert(
            NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"),
            DaySnapshot::default(),
        );

        let encoded = serde_json::to_value(&state).expect("encode state");
        assert_eq!(encoded["schema_version"], json!(SCHEMA_VERSION));
        assert!(encoded["cached_days"].get("2025-03-01").is_some());
    }
}
