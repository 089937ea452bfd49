use chrono::{DateTime, NaiveDate, Utc};
use mealsync_api::{DailySummary, MealTracking, Nutrition, TrackingAction, TrackingStatus};
use mealsync_core::{MealError, MealResult};
use mealsync_store::{CacheStore, ClientState, DaySnapshot, PendingAction};
use serde::Serialize;
use std::collections::BTreeMap;

/// Field-level update for one tracking. `None` leaves a field alone,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingPatch {
    pub status: Option<TrackingStatus>,
    pub actual_nutrition: Option<Option<Nutrition>>,
    pub actual_portion_size: Option<Option<f64>>,
    pub consumption_datetime: Option<Option<String>>,
    pub satisfaction_rating: Option<Option<u8>>,
    pub user_notes: Option<Option<String>>,
    pub skip_reason: Option<Option<String>>,
    pub replacement_name: Option<Option<String>>,
    pub replacement_reason: Option<Option<String>>,
}

impl TrackingPatch {
    /// The speculative state an action leads to, applied before the server
    /// has seen it. Fields belonging to other statuses are cleared.
    pub fn optimistic(action: &TrackingAction) -> Self {
        let cleared = Self::rollback();
        match action {
            TrackingAction::ConsumeMeal(data) => Self {
                status: Some(TrackingStatus::Consumed),
                consumption_datetime: Some(Some(data.consumption_time.clone())),
                satisfaction_rating: Some(data.satisfaction_rating),
                user_notes: Some(data.notes.clone()),
                ..cleared
            },
            TrackingAction::AdjustPortions(data) => Self {
                status: Some(TrackingStatus::Modified),
                actual_portion_size: Some(Some(data.portion_multiplier)),
                actual_nutrition: Some(Some(data.nutrition)),
                ..cleared
            },
            TrackingAction::SkipMeal(data) => Self {
                status: Some(TrackingStatus::Skipped),
                skip_reason: Some(Some(data.reason.clone())),
                ..cleared
            },
            TrackingAction::ReplaceMeal(data) => Self {
                status: Some(TrackingStatus::Replaced),
                replacement_name: Some(Some(data.replacement_name.clone())),
                replacement_reason: Some(Some(data.reason.clone())),
                actual_nutrition: Some(data.nutrition),
                ..cleared
            },
        }
    }

    /// Back to `planned` with every status-specific field cleared.
    pub fn rollback() -> Self {
        Self {
            status: Some(TrackingStatus::Planned),
            actual_nutrition: Some(None),
            actual_portion_size: Some(None),
            consumption_datetime: Some(None),
            satisfaction_rating: Some(None),
            user_notes: Some(None),
            skip_reason: Some(None),
            replacement_name: Some(None),
            replacement_reason: Some(None),
        }
    }

    pub fn apply(&self, tracking: &mut MealTracking) {
        if let Some(status) = self.status {
            tracking.status = status;
        }
        if let Some(value) = self.actual_nutrition {
            tracking.actual_nutrition = value;
        }
        if let Some(value) = self.actual_portion_size {
            tracking.actual_portion_size = value;
        }
        if let Some(value) = &self.consumption_datetime {
            tracking.consumption_datetime = value.clone();
        }
        if let Some(value) = self.satisfaction_rating {
            tracking.satisfaction_rating = value;
        }
        if let Some(value) = &self.user_notes {
            tracking.user_notes = value.clone();
        }
        if let Some(value) = &self.skip_reason {
            tracking.skip_reason = value.clone();
        }
        if let Some(value) = &self.replacement_name {
            tracking.replacement_name = value.clone();
        }
        if let Some(value) = &self.replacement_reason {
            tracking.replacement_reason = value.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletionStats {
    pub total: usize,
    pub planned: usize,
    pub consumed: usize,
    pub modified: usize,
    pub skipped: usize,
    pub replaced: usize,
    /// Share of trackings eaten in some form (consumed, modified or
    /// replaced), 0-100.
    pub percentage_consumed: f64,
}

/// In-memory state for the selected date plus the persisted client state it
/// mirrors into. Every read of derived data is computed on the spot.
#[derive(Debug, Clone)]
pub struct TrackingStore {
    persisted: ClientState,
    selected_date: NaiveDate,
    today_meal_trackings: Vec<MealTracking>,
    daily_summary: Option<DailySummary>,
    is_loading: bool,
    error: Option<MealError>,
}

impl TrackingStore {
    /// Builds the store from persisted state, selecting the stored date or
    /// `today` when none was stored.
    pub fn new(persisted: ClientState, today: NaiveDate) -> Self {
        let selected_date = persisted.selected_date.unwrap_or(today);
        let mut store = Self {
            persisted,
            selected_date,
            today_meal_trackings: Vec::new(),
            daily_summary: None,
            is_loading: false,
            error: None,
        };
        store.set_selected_date(selected_date);
        store
    }

    pub fn load(cache: &CacheStore, profile: &str, today: NaiveDate) -> MealResult<Self> {
        let persisted = cache.load_state(profile)?;
        Ok(Self::new(persisted, today))
    }

    pub fn persist(&self, cache: &CacheStore, profile: &str) -> MealResult<()> {
        cache.save_state(profile, &self.persisted)
    }

    pub fn persisted(&self) -> &ClientState {
        &self.persisted
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn set_selected_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
        self.persisted.selected_date = Some(date);

        match self.persisted.cached_days.get(&date) {
            Some(snapshot) => {
                self.today_meal_trackings = snapshot.meal_trackings.clone().unwrap_or_default();
                self.daily_summary = snapshot.daily_summary.clone();
            }
            None => {
                self.today_meal_trackings.clear();
                self.daily_summary = None;
            }
        }
    }

    pub fn today_meal_trackings(&self) -> &[MealTracking] {
        &self.today_meal_trackings
    }

    pub fn daily_summary(&self) -> Option<&DailySummary> {
        self.daily_summary.as_ref()
    }

    pub fn find(&self, tracking_id: i64) -> Option<&MealTracking> {
        self.today_meal_trackings
            .iter()
            .find(|tracking| tracking.id == tracking_id)
    }

    pub fn cached_snapshot(&self, date: NaiveDate) -> Option<&DaySnapshot> {
        self.persisted.cached_days.get(&date)
    }

    /// True once the trackings for `date` have been loaded, even if the
    /// day turned out to be empty. A cached summary alone does not count.
    pub fn has_cached_trackings(&self, date: NaiveDate) -> bool {
        self.cached_snapshot(date)
            .is_some_and(|snapshot| snapshot.meal_trackings.is_some())
    }

    pub fn set_today_meal_trackings(&mut self, trackings: Vec<MealTracking>) {
        self.today_meal_trackings = trackings;
        self.mirror_trackings();
    }

    pub fn set_daily_summary(&mut self, summary: DailySummary) {
        self.persisted
            .cached_days
            .entry(self.selected_date)
            .or_default()
            .daily_summary = Some(summary.clone());
        self.daily_summary = Some(summary);
    }

    /// Returns false when no tracking with that id is loaded.
    pub fn update_meal_tracking(&mut self, tracking_id: i64, patch: &TrackingPatch) -> bool {
        let Some(tracking) = self
            .today_meal_trackings
            .iter_mut()
            .find(|tracking| tracking.id == tracking_id)
        else {
            return false;
        };

        patch.apply(tracking);
        self.mirror_trackings();
        true
    }

    /// Overwrites the loaded tracking with the server's copy.
    pub fn reconcile_meal_tracking(&mut self, server: MealTracking) -> bool {
        let Some(tracking) = self
            .today_meal_trackings
            .iter_mut()
            .find(|tracking| tracking.id == server.id)
        else {
            return false;
        };

        let meal_date = tracking.meal_date;
        *tracking = server;
        if tracking.meal_date.is_none() {
            tracking.meal_date = meal_date;
        }
        self.mirror_trackings();
        true
    }

    pub fn pending_actions(&self) -> &[PendingAction] {
        &self.persisted.pending_actions
    }

    pub fn pending_actions_count(&self) -> usize {
        self.persisted.pending_actions.len()
    }

    /// Appends to the queue, suffixing the id if an action created in the
    /// same millisecond already holds it. Returns the stored id.
    pub fn add_pending_action(&mut self, mut action: PendingAction) -> String {
        let base = action.id.clone();
        let mut suffix = 1;
        while self
            .persisted
            .pending_actions
            .iter()
            .any(|existing| existing.id == action.id)
        {
            action.id = format!("{base}-{suffix}");
            suffix += 1;
        }

        let id = action.id.clone();
        self.persisted.pending_actions.push(action);
        id
    }

    pub fn remove_pending_action(&mut self, id: &str) -> bool {
        let before = self.persisted.pending_actions.len();
        self.persisted
            .pending_actions
            .retain(|action| action.id != id);
        self.persisted.pending_actions.len() != before
    }

    pub fn remove_pending_actions(&mut self, ids: &[String]) {
        self.persisted
            .pending_actions
            .retain(|action| !ids.contains(&action.id));
    }

    pub fn clear_pending_actions(&mut self) -> usize {
        let cleared = self.persisted.pending_actions.len();
        self.persisted.pending_actions.clear();
        cleared
    }

    pub fn error(&self) -> Option<&MealError> {
        self.error.as_ref()
    }

    pub fn set_error(&mut self, error: MealError) {
        self.error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn is_offline(&self) -> bool {
        self.persisted.offline_mode
    }

    pub fn set_offline_mode(&mut self, offline: bool) {
        self.persisted.offline_mode = offline;
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.persisted.last_sync
    }

    pub fn mark_synced(&mut self, at: DateTime<Utc>) {
        self.persisted.last_sync = Some(at);
    }

    pub fn user_id(&self) -> Option<i64> {
        self.persisted.user_id
    }

    pub fn set_user_id(&mut self, user_id: i64) {
        self.persisted.user_id = Some(user_id);
    }

    pub fn nutrition_totals(&self) -> Nutrition {
        self.today_meal_trackings
            .iter()
            .map(MealTracking::effective_nutrition)
            .sum()
    }

    pub fn completion_stats(&self) -> CompletionStats {
        let mut stats = CompletionStats {
            total: self.today_meal_trackings.len(),
            ..CompletionStats::default()
        };

        for tracking in &self.today_meal_trackings {
            match tracking.status {
                TrackingStatus::Planned => stats.planned += 1,
                TrackingStatus::Consumed => stats.consumed += 1,
                TrackingStatus::Modified => stats.modified += 1,
                TrackingStatus::Skipped => stats.skipped += 1,
                TrackingStatus::Replaced => stats.replaced += 1,
            }
        }

        if stats.total > 0 {
            let eaten = stats.consumed + stats.modified + stats.replaced;
            stats.percentage_consumed = eaten as f64 * 100.0 / stats.total as f64;
        }

        stats
    }

    /// Every status is present as a key, empty groups included.
    pub fn trackings_by_status(&self) -> BTreeMap<TrackingStatus, Vec<&MealTracking>> {
        let mut groups: BTreeMap<TrackingStatus, Vec<&MealTracking>> = TrackingStatus::ALL
            .iter()
            .map(|status| (*status, Vec::new()))
            .collect();

        for tracking in &self.today_meal_trackings {
            groups.entry(tracking.status).or_default().push(tracking);
        }

        groups
    }

    fn mirror_trackings(&mut self) {
        self.persisted
            .cached_days
            .entry(self.selected_date)
            .or_default()
            .meal_trackings = Some(self.today_meal_trackings.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mealsync_api::{AdjustData, ConsumeData, MealType, SkipData};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).expect("valid date")
    }

    fn nutrition(calories: f64) -> Nutrition {
        Nutrition {
            calories,
            ..Nutrition::default()
        }
    }

    fn store_with(trackings: Vec<MealTracking>) -> TrackingStore {
        let mut store = TrackingStore::new(ClientState::default(), day(1));
        store.set_today_meal_trackings(trackings);
        store
    }

    fn skip(tracking_id: i64) -> PendingAction {
        PendingAction::new(
            tracking_id,
            TrackingAction::SkipMeal(SkipData {
                reason: "busy".to_string(),
            }),
            day(1),
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
                .single()
                .expect("valid timestamp"),
        )
    }

    #[test]
    fn totals_sum_effective_nutrition() {
        let mut consumed = MealTracking::planned(1, MealType::Lunch, nutrition(450.0));
        consumed.status = TrackingStatus::Consumed;
        consumed.actual_nutrition = Some(nutrition(500.0));
        let planned = MealTracking::planned(2, MealType::Dinner, nutrition(300.0));

        let store = store_with(vec![consumed, planned]);
        assert_eq!(store.nutrition_totals().calories, 800.0);
    }

    #[test]
    fn date_switch_empties_unknown_days_and_restores_cached_ones() {
        let mut store = store_with(vec![MealTracking::planned(
            1,
            MealType::Breakfast,
            nutrition(350.0),
        )]);
        store.set_daily_summary(DailySummary {
            meals_planned: 1,
            ..DailySummary::default()
        });
        let before: Vec<MealTracking> = store.today_meal_trackings().to_vec();

        store.set_selected_date(day(2));
        assert!(store.today_meal_trackings().is_empty());
        assert!(store.daily_summary().is_none());
        assert!(store.cached_snapshot(day(2)).is_none());

        store.set_selected_date(day(1));
        assert_eq!(store.today_meal_trackings(), before.as_slice());
        assert_eq!(store.daily_summary().map(|s| s.meals_planned), Some(1));
    }

    #[test]
    fn update_is_mirrored_and_ignores_unknown_ids() {
        let mut store = store_with(vec![MealTracking::planned(
            3,
            MealType::Lunch,
            nutrition(500.0),
        )]);

        let patch = TrackingPatch::optimistic(&TrackingAction::ConsumeMeal(ConsumeData {
            consumption_time: "2025-03-01T12:00:00Z".to_string(),
            satisfaction_rating: Some(4),
            notes: None,
        }));
        assert!(store.update_meal_tracking(3, &patch));
        assert!(!store.update_meal_tracking(99, &patch));

        let cached = &store
            .cached_snapshot(day(1))
            .and_then(|snapshot| snapshot.meal_trackings.as_ref())
            .expect("cached trackings")[0];
        assert_eq!(cached.status, TrackingStatus::Consumed);
        assert_eq!(cached.satisfaction_rating, Some(4));
    }

    #[test]
    fn rollback_clears_status_specific_fields() {
        let mut tracking = MealTracking::planned(4, MealType::Dinner, nutrition(600.0));
        TrackingPatch::optimistic(&TrackingAction::SkipMeal(SkipData {
            reason: "late meeting".to_string(),
        }))
        .apply(&mut tracking);
        assert_eq!(tracking.status, TrackingStatus::Skipped);

        TrackingPatch::rollback().apply(&mut tracking);
        assert_eq!(tracking.status, TrackingStatus::Planned);
        assert!(tracking.skip_reason.is_none());
        assert_eq!(tracking.planned_nutrition.calories, 600.0);
    }

    #[test]
    fn next_optimistic_patch_replaces_previous_status_fields() {
        let mut tracking = MealTracking::planned(5, MealType::Lunch, nutrition(500.0));
        TrackingPatch::optimistic(&TrackingAction::SkipMeal(SkipData {
            reason: "late meeting".to_string(),
        }))
        .apply(&mut tracking);
        TrackingPatch::optimistic(&TrackingAction::AdjustPortions(AdjustData {
            portion_multiplier: 0.5,
            nutrition: nutrition(250.0),
        }))
        .apply(&mut tracking);

        assert_eq!(tracking.status, TrackingStatus::Modified);
        assert!(tracking.skip_reason.is_none());
        assert_eq!(tracking.effective_nutrition().calories, 250.0);

        TrackingPatch::optimistic(&TrackingAction::ConsumeMeal(ConsumeData {
            consumption_time: "2025-03-01T12:00:00Z".to_string(),
            satisfaction_rating: None,
            notes: None,
        }))
        .apply(&mut tracking);

        assert_eq!(tracking.status, TrackingStatus::Consumed);
        assert!(tracking.actual_portion_size.is_none());
        assert!(tracking.actual_nutrition.is_none());
        assert_eq!(tracking.effective_nutrition().calories, 500.0);
    }

    #[test]
    fn pending_queue_keeps_unique_ids_and_derived_count() {
        let mut store = store_with(Vec::new());
        let first = store.add_pending_action(skip(1));
        let second = store.add_pending_action(skip(1));

        assert_ne!(first, second);
        assert_eq!(second, format!("{first}-1"));
        assert_eq!(store.pending_actions_count(), 2);

        assert!(store.remove_pending_action(&first));
        assert!(!store.remove_pending_action(&first));
        assert_eq!(store.pending_actions_count(), 1);
        assert_eq!(store.clear_pending_actions(), 1);
        assert_eq!(store.pending_actions_count(), 0);
    }

    #[test]
    fn completion_stats_count_modified_and_replaced_as_eaten() {
        let mut trackings: Vec<MealTracking> = (1..=4)
            .map(|id| MealTracking::planned(id, MealType::Snack, nutrition(100.0)))
            .collect();
        trackings[0].status = TrackingStatus::Consumed;
        trackings[1].status = TrackingStatus::Modified;
        trackings[2].status = TrackingStatus::Skipped;

        let store = store_with(trackings);
        let stats = store.completion_stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.planned, 1);
        assert_eq!(stats.percentage_consumed, 50.0);

        let groups = store.trackings_by_status();
        assert_eq!(groups.len(), TrackingStatus::ALL.len());
        assert!(groups[&TrackingStatus::Replaced].is_empty());
        assert_eq!(groups[&TrackingStatus::Consumed][0].id, 1);
    }
}
