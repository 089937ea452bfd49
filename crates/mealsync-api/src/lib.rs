mod action;
mod model;

pub use action::{ActionKind, AdjustData, ConsumeData, ReplaceData, SkipData, TrackingAction};
pub use model::{DailySummary, MealTracking, MealType, Nutrition, TrackingStatus};

use chrono::NaiveDate;
use mealsync_core::{MealError, MealResult};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Operations the sync engine needs from the meal-tracking backend.
pub trait MealTrackingClient {
    fn fetch_day(&self, user_id: i64, date: NaiveDate) -> MealResult<DayPayload>;

    fn fetch_summary(&self, user_id: i64, date: NaiveDate) -> MealResult<DailySummary>;

    /// Sends one tracking action and returns the server's authoritative copy
    /// of the tracking.
    fn submit_action(
        &self,
        user_id: i64,
        tracking_id: i64,
        action: &TrackingAction,
    ) -> MealResult<MealTracking>;
}

#[derive(Debug, Clone)]
pub struct MealTrackingApi {
    base_url: String,
    client: Client,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayPayload {
    pub meal_trackings: Vec<MealTracking>,
    pub daily_summary: Option<DailySummary>,
}

#[derive(Debug, Deserialize)]
struct DayEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    meal_trackings: Option<Vec<MealTracking>>,
    #[serde(default)]
    daily_summary: Option<DailySummary>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    daily_summary: Option<DailySummary>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackingEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    meal_tracking: Option<MealTracking>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorField>,
    detail: Option<Value>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Text(String),
    Body { message: Option<String> },
}

impl MealTrackingApi {
    pub fn new(base_url: &str) -> MealResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> MealResult<Self> {
        let trimmed = base_url.trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            return Err(MealError::usage("server URL cannot be empty"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("mealsync/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| MealError::io(format!("failed to construct API client: {err}")))?;

        Ok(Self {
            base_url: trimmed,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Reachability check: any HTTP response at all means the server is
    /// reachable, only transport failures count as offline.
    pub fn ping(&self) -> MealResult<()> {
        self.client
            .get(self.url("/"))
            .send()
            .map(|_| ())
            .map_err(network_error)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> MealResult<T> {
        let request = self.client.get(self.url(path)).query(query);
        parse_json_response(request.send().map_err(network_error)?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl MealTrackingClient for MealTrackingApi {
    fn fetch_day(&self, user_id: i64, date: NaiveDate) -> MealResult<DayPayload> {
        let envelope: DayEnvelope = self.get_json(
            "/meal-tracking/today",
            &[
                ("user_id", user_id.to_string()),
                ("date", date.format("%Y-%m-%d").to_string()),
            ],
        )?;
        reject_unsuccessful(envelope.success, envelope.error, envelope.message)?;

        let meal_trackings = envelope.meal_trackings.ok_or_else(|| {
            MealError::sync("meal tracking response did not include meal_trackings")
        })?;

        Ok(DayPayload {
            meal_trackings,
            daily_summary: envelope.daily_summary,
        })
    }

    fn fetch_summary(&self, user_id: i64, date: NaiveDate) -> MealResult<DailySummary> {
        let path = format!("/meal-tracking/summary/{}", date.format("%Y-%m-%d"));
        let envelope: SummaryEnvelope =
            self.get_json(&path, &[("user_id", user_id.to_string())])?;
        reject_unsuccessful(envelope.success, envelope.error, envelope.message)?;

        envelope
            .daily_summary
            .ok_or_else(|| MealError::sync("summary response did not include daily_summary"))
    }

    fn submit_action(
        &self,
        user_id: i64,
        tracking_id: i64,
        action: &TrackingAction,
    ) -> MealResult<MealTracking> {
        let (method, path) = action.method_and_path(tracking_id);
        let response = self
            .client
            .request(method, self.url(&path))
            .json(&action.request_body(user_id))
            .send()
            .map_err(network_error)?;

        let envelope: TrackingEnvelope = parse_json_response(response)?;
        reject_unsuccessful(envelope.success, envelope.error, envelope.message)?;

        envelope.meal_tracking.ok_or_else(|| {
            MealError::sync(format!(
                "{} response did not include meal_tracking",
                action.kind()
            ))
        })
    }
}

fn reject_unsuccessful(
    success: Option<bool>,
    error: Option<String>,
    message: Option<String>,
) -> MealResult<()> {
    if success == Some(false) {
        let detail = error
            .or(message)
            .unwrap_or_else(|| "server reported failure".to_string());
        return Err(MealError::server(detail));
    }

    Ok(())
}

fn parse_json_response<T: DeserializeOwned>(response: Response) -> MealResult<T> {
    let status = response.status();
    let body_text = response.text().unwrap_or_default();

    if !status.is_success() {
        return Err(parse_error_response(status, &body_text));
    }

    let value = serde_json::from_str::<Value>(&body_text)
        .map_err(|err| MealError::sync(format!("failed to decode API response JSON: {err}")))?;

    if let Some(data) = value.get("data")
        && !data.is_null()
        && let Ok(parsed) = serde_json::from_value::<T>(data.clone())
    {
        return Ok(parsed);
    }

    serde_json::from_value::<T>(value).map_err(|err| {
        MealError::sync(format!(
            "failed to map API response to expected shape: {err}"
        ))
    })
}

fn parse_error_response(status: StatusCode, body_text: &str) -> MealError {
    let body_trimmed = body_text.trim();
    let fallback = if body_trimmed.is_empty() {
        format!("request failed with status {}", status.as_u16())
    } else {
        format!(
            "request failed with status {}: {}",
            status.as_u16(),
            truncate_for_error(body_trimmed, 240)
        )
    };

    let parsed = serde_json::from_str::<ErrorEnvelope>(body_text).ok();
    let message = parsed
        .as_ref()
        .and_then(|payload| match payload.error.as_ref() {
            Some(ErrorField::Text(text)) => Some(text.clone()),
            Some(ErrorField::Body { message }) => message.clone(),
            None => None,
        })
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(|payload| payload.detail.as_ref())
                .map(|detail| match detail {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
        })
        .or_else(|| parsed.as_ref().and_then(|payload| payload.message.clone()))
        .unwrap_or(fallback);

    MealError::server(format!("{message} [http_status={}]", status.as_u16()))
}

fn truncate_for_error(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }

    let truncated: String = input.chars().take(max_chars).collect();
    format!("{truncated}...")
}

fn network_error(err: reqwest::Error) -> MealError {
    MealError::network(format!("network request failed: {err}"))
}
