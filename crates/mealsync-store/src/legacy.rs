//! Import of the browser client's persisted blob (`meal-tracking-storage`),
//! which predates `schema_version` and uses camelCase keys.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use mealsync_api::{DailySummary, MealTracking, TrackingAction};
use mealsync_core::{MealError, MealResult};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use crate::state::{ClientState, DaySnapshot, PendingAction};

#[derive(Debug, Clone)]
pub struct LegacyImport {
    pub state: ClientState,
    pub imported_days: usize,
    pub imported_actions: usize,
    pub skipped: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyBlob {
    #[serde(default)]
    cached_trackings: Map<String, Value>,
    #[serde(default)]
    cached_summaries: Map<String, Value>,
    #[serde(default)]
    last_sync: Option<Value>,
    #[serde(default)]
    pending_actions: Vec<Value>,
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    selected_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPendingAction {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(alias = "tracking_id")]
    tracking_id: i64,
    #[serde(default, alias = "data")]
    payload: Value,
    #[serde(default, alias = "selected_date")]
    selected_date: Option<String>,
    #[serde(default)]
    timestamp: Option<Value>,
}

/// Parses a version-0 blob. Accepts either the bare state object or the
/// `{"state": {...}, "version": 0}` wrapper written by the persistence
/// middleware.
pub fn parse_legacy_blob(raw: &str) -> MealResult<LegacyImport> {
    let value = serde_json::from_str::<Value>(raw)
        .map_err(|err| MealError::io(format!("failed to parse legacy state blob: {err}")))?;

    let inner = match value.get("state") {
        Some(state) if state.is_object() => state.clone(),
        _ => value,
    };

    let blob = serde_json::from_value::<LegacyBlob>(inner)
        .map_err(|err| MealError::io(format!("unexpected legacy state layout: {err}")))?;

    let mut skipped = Vec::new();
    let mut cached_days: BTreeMap<NaiveDate, DaySnapshot> = BTreeMap::new();

    for (key, entry) in blob.cached_trackings {
        let Some(date) = parse_date(&key) else {
            skipped.push(format!("cached trackings for unparseable date '{key}'"));
            continue;
        };

        match legacy_snapshot(entry) {
            Ok(snapshot) => {
                cached_days.insert(date, snapshot);
            }
            Err(reason) => skipped.push(format!("cached trackings for {key}: {reason}")),
        }
    }

    for (key, entry) in blob.cached_summaries {
        let Some(date) = parse_date(&key) else {
            skipped.push(format!("cached summary for unparseable date '{key}'"));
            continue;
        };

        match serde_json::from_value::<DailySummary>(entry) {
            Ok(summary) => {
                cached_days.entry(date).or_default().daily_summary = Some(summary);
            }
            Err(err) => skipped.push(format!("cached summary for {key}: {err}")),
        }
    }

    let fallback_date = blob
        .selected_date
        .as_deref()
        .and_then(parse_date)
        .unwrap_or_else(|| Utc::now().date_naive());

    let mut pending_actions = Vec::new();
    for entry in blob.pending_actions {
        match legacy_action(entry, fallback_date) {
            Ok(action) => pending_actions.push(action),
            Err(reason) => skipped.push(format!("pending action: {reason}")),
        }
    }

    let imported_days = cached_days.len();
    let imported_actions = pending_actions.len();

    Ok(LegacyImport {
        state: ClientState {
            user_id: blob.user_id.as_ref().and_then(value_as_i64),
            selected_date: blob.selected_date.as_deref().and_then(parse_date),
            last_sync: blob.last_sync.as_ref().and_then(value_as_datetime),
            cached_days,
            pending_actions,
            ..ClientState::default()
        },
        imported_days,
        imported_actions,
        skipped,
    })
}

fn legacy_snapshot(entry: Value) -> Result<DaySnapshot, String> {
    match entry {
        Value::Array(_) => {
            let meal_trackings =
                serde_json::from_value::<Vec<MealTracking>>(entry).map_err(|err| err.to_string())?;
            Ok(DaySnapshot {
                meal_trackings: Some(meal_trackings),
                daily_summary: None,
            })
        }
        Value::Object(map) => {
            let meal_trackings = match map
                .get("mealTrackings")
                .or_else(|| map.get("meal_trackings"))
            {
                Some(Value::Null) | None => None,
                Some(trackings) => Some(
                    serde_json::from_value::<Vec<MealTracking>>(trackings.clone())
                        .map_err(|err| err.to_string())?,
                ),
            };

            let daily_summary = match map.get("dailySummary").or_else(|| map.get("daily_summary"))
            {
                Some(Value::Null) | None => None,
                Some(summary) => Some(
                    serde_json::from_value::<DailySummary>(summary.clone())
                        .map_err(|err| err.to_string())?,
                ),
            };

            Ok(DaySnapshot {
                meal_trackings,
                daily_summary,
            })
        }
        other => Err(format!("expected array or object, found {other}")),
    }
}

fn legacy_action(entry: Value, fallback_date: NaiveDate) -> Result<PendingAction, String> {
    let legacy =
        serde_json::from_value::<LegacyPendingAction>(entry).map_err(|err| err.to_string())?;

    let timestamp = legacy
        .timestamp
        .as_ref()
        .and_then(value_as_datetime)
        .unwrap_or_else(Utc::now);

    let mut payload = match legacy.payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => return Err(format!("payload must be an object, found {other}")),
    };

    if legacy.kind == "consume_meal" && !payload.contains_key("consumption_time") {
        payload.insert(
            "consumption_time".to_string(),
            Value::String(timestamp.to_rfc3339()),
        );
    }
    if legacy.kind == "skip_meal" && !payload.contains_key("reason") {
        payload.insert("reason".to_string(), Value::String(String::new()));
    }
    if legacy.kind == "replace_meal" && !payload.contains_key("reason") {
        payload.insert("reason".to_string(), Value::String(String::new()));
    }

    let action = serde_json::from_value::<TrackingAction>(json!({
        "type": legacy.kind,
        "payload": payload,
    }))
    .map_err(|err| format!("tracking {}: {err}", legacy.tracking_id))?;

    let selected_date = legacy
        .selected_date
        .as_deref()
        .and_then(parse_date)
        .unwrap_or(fallback_date);

    let mut pending = PendingAction::new(legacy.tracking_id, action, selected_date, timestamp);
    if let Some(id) = legacy.id
        && !id.trim().is_empty()
    {
        pending.id = id;
    }

    Ok(pending)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc)),
        _ => None,
    }
}
