use chrono::{NaiveDate, Utc};
use mealsync_api::{
    AdjustData, ConsumeData, MealTracking, MealTrackingClient, Nutrition, ReplaceData, SkipData,
    TrackingAction,
};
use mealsync_core::{MealError, MealResult};
use mealsync_store::PendingAction;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::tracking::{TrackingPatch, TrackingStore};

/// How a mutation settled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MutationOutcome {
    /// Optimistic state applied, not yet dispatched. Only seen between
    /// phases.
    Applied,
    Confirmed { tracking: MealTracking },
    Queued { action_id: String },
    RolledBack { error: MealError },
}

/// Where the data shown after a load came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    Cache,
    Network,
    /// Server unreachable; showing the cached entry if `cached` is set,
    /// nothing otherwise.
    OfflineFallback { cached: bool },
    Failed,
}

enum Phase {
    Applied,
    Confirmed(MealTracking),
    Queued,
    RolledBack(MealError),
}

#[derive(Debug)]
pub struct SyncEngine<'a, C: MealTrackingClient> {
    client: &'a C,
    store: TrackingStore,
    user_id: i64,
}

impl<'a, C: MealTrackingClient> SyncEngine<'a, C> {
    pub fn new(client: &'a C, mut store: TrackingStore, user_id: i64) -> Self {
        store.set_user_id(user_id);
        Self {
            client,
            store,
            user_id,
        }
    }

    pub fn store(&self) -> &TrackingStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TrackingStore {
        &mut self.store
    }

    pub fn into_store(self) -> TrackingStore {
        self.store
    }

    pub fn consume_meal(
        &mut self,
        tracking_id: i64,
        data: ConsumeData,
    ) -> MealResult<MutationOutcome> {
        self.mutate(tracking_id, TrackingAction::ConsumeMeal(data))
    }

    /// `nutrition` defaults to the planned values scaled by the multiplier.
    pub fn adjust_portions(
        &mut self,
        tracking_id: i64,
        portion_multiplier: f64,
        nutrition: Option<Nutrition>,
    ) -> MealResult<MutationOutcome> {
        let nutrition = match nutrition {
            Some(nutrition) => nutrition,
            None => self
                .require_tracking(tracking_id)?
                .planned_nutrition
                .scaled(portion_multiplier),
        };

        self.mutate(
            tracking_id,
            TrackingAction::AdjustPortions(AdjustData {
                portion_multiplier,
                nutrition,
            }),
        )
    }

    pub fn skip_meal(
        &mut self,
        tracking_id: i64,
        reason: impl Into<String>,
    ) -> MealResult<MutationOutcome> {
        self.mutate(
            tracking_id,
            TrackingAction::SkipMeal(SkipData {
                reason: reason.into(),
            }),
        )
    }

    pub fn replace_meal(
        &mut self,
        tracking_id: i64,
        data: ReplaceData,
    ) -> MealResult<MutationOutcome> {
        self.mutate(tracking_id, TrackingAction::ReplaceMeal(data))
    }

    /// Runs one mutation through apply, dispatch and settle. Only input
    /// problems are returned as errors; network and server failures end up
    /// in the outcome and the store.
    pub fn mutate(
        &mut self,
        tracking_id: i64,
        action: TrackingAction,
    ) -> MealResult<MutationOutcome> {
        action.validate()?;
        self.require_tracking(tracking_id)?;

        self.store.clear_error();
        self.transition(tracking_id, &action, Phase::Applied);

        if self.store.is_offline() {
            debug!(tracking_id, action = %action.kind(), "offline, queueing without dispatch");
            return Ok(self.transition(tracking_id, &action, Phase::Queued));
        }

        self.store.set_loading(true);
        let phase = match self.client.submit_action(self.user_id, tracking_id, &action) {
            Ok(server) => Phase::Confirmed(server),
            Err(error) if error.is_connectivity() => {
                warn!(tracking_id, action = %action.kind(), error = %error, "server unreachable, queueing action");
                Phase::Queued
            }
            Err(error) => Phase::RolledBack(error),
        };
        self.store.set_loading(false);

        Ok(self.transition(tracking_id, &action, phase))
    }

    /// Replays the queue in order. Failed actions stay queued and are not
    /// retried in the same pass. Returns how many actions were confirmed.
    pub fn sync_pending_actions(&mut self) -> usize {
        if self.store.pending_actions_count() == 0 {
            return 0;
        }

        self.store.set_loading(true);
        let queued = self.store.pending_actions().to_vec();
        let mut synced = Vec::new();

        for pending in &queued {
            match self
                .client
                .submit_action(self.user_id, pending.tracking_id, &pending.action)
            {
                Ok(server) => {
                    debug!(action_id = %pending.id, "replayed pending action");
                    if pending.selected_date == self.store.selected_date() {
                        self.store.reconcile_meal_tracking(server);
                    }
                    synced.push(pending.id.clone());
                }
                Err(error) => {
                    warn!(action_id = %pending.id, error = %error, "replay failed, keeping action queued");
                }
            }
        }

        self.store.remove_pending_actions(&synced);

        if !synced.is_empty() {
            self.store.mark_synced(Utc::now());
            if self.store.is_offline() {
                info!("pending actions replayed, leaving offline mode");
            }
            self.store.set_offline_mode(false);
            self.load_today_meal_trackings(true);
        }

        self.store.set_loading(false);
        info!(
            synced = synced.len(),
            remaining = self.store.pending_actions_count(),
            "queue replay finished"
        );

        synced.len()
    }

    /// Cache-first load of the selected date's trackings and summary.
    pub fn load_today_meal_trackings(&mut self, force_refresh: bool) -> LoadOutcome {
        let date = self.store.selected_date();

        if !force_refresh && self.store.has_cached_trackings(date) {
            debug!(%date, "serving trackings from cache");
            self.store.set_selected_date(date);
            return LoadOutcome::Cache;
        }

        self.store.set_loading(true);
        let outcome = match self.client.fetch_day(self.user_id, date) {
            Ok(payload) => {
                self.store.set_today_meal_trackings(payload.meal_trackings);
                if let Some(summary) = payload.daily_summary {
                    self.store.set_daily_summary(summary);
                }
                self.reapply_pending(date);
                self.store.mark_synced(Utc::now());
                self.store.clear_error();
                LoadOutcome::Network
            }
            Err(error) if error.is_connectivity() => {
                self.enter_offline(&error);
                let cached = self.store.has_cached_trackings(date);
                self.store.set_selected_date(date);
                LoadOutcome::OfflineFallback { cached }
            }
            Err(error) => {
                warn!(%date, error = %error, "failed to load meal trackings");
                self.store.set_error(error);
                LoadOutcome::Failed
            }
        };
        self.store.set_loading(false);

        outcome
    }

    /// Same contract as [`Self::load_today_meal_trackings`], scoped to the
    /// summary.
    pub fn load_daily_summary(&mut self, force_refresh: bool) -> LoadOutcome {
        let date = self.store.selected_date();
        let cached = self
            .store
            .cached_snapshot(date)
            .and_then(|snapshot| snapshot.daily_summary.clone());

        if !force_refresh && let Some(summary) = &cached {
            debug!(%date, "serving summary from cache");
            self.store.set_daily_summary(summary.clone());
            return LoadOutcome::Cache;
        }

        match self.client.fetch_summary(self.user_id, date) {
            Ok(summary) => {
                self.store.set_daily_summary(summary);
                LoadOutcome::Network
            }
            Err(error) if error.is_connectivity() => {
                self.enter_offline(&error);
                let has_cached = cached.is_some();
                if let Some(summary) = cached {
                    self.store.set_daily_summary(summary);
                }
                LoadOutcome::OfflineFallback { cached: has_cached }
            }
            Err(error) => {
                warn!(%date, error = %error, "failed to load daily summary");
                self.store.set_error(error);
                LoadOutcome::Failed
            }
        }
    }

    /// The single place a mutation moves the store between states.
    fn transition(
        &mut self,
        tracking_id: i64,
        action: &TrackingAction,
        phase: Phase,
    ) -> MutationOutcome {
        match phase {
            Phase::Applied => {
                self.store
                    .update_meal_tracking(tracking_id, &TrackingPatch::optimistic(action));
                MutationOutcome::Applied
            }
            Phase::Confirmed(server) => {
                self.store.reconcile_meal_tracking(server.clone());
                self.load_daily_summary(true);
                MutationOutcome::Confirmed { tracking: server }
            }
            Phase::Queued => {
                if !self.store.is_offline() {
                    info!("entering offline mode");
                }
                self.store.set_offline_mode(true);
                self.store
                    .update_meal_tracking(tracking_id, &TrackingPatch::optimistic(action));
                let pending = PendingAction::new(
                    tracking_id,
                    action.clone(),
                    self.store.selected_date(),
                    Utc::now(),
                );
                let action_id = self.store.add_pending_action(pending);
                MutationOutcome::Queued { action_id }
            }
            Phase::RolledBack(error) => {
                warn!(tracking_id, action = %action.kind(), error = %error, "server rejected action, rolling back");
                self.store
                    .update_meal_tracking(tracking_id, &TrackingPatch::rollback());
                self.store.set_error(error.clone());
                MutationOutcome::RolledBack { error }
            }
        }
    }

    /// Server data for a date does not know about actions still queued for
    /// it, so their optimistic state is put back on top.
    fn reapply_pending(&mut self, date: NaiveDate) {
        let patches: Vec<(i64, TrackingPatch)> = self
            .store
            .pending_actions()
            .iter()
            .filter(|pending| pending.selected_date == date)
            .map(|pending| {
                (
                    pending.tracking_id,
                    TrackingPatch::optimistic(&pending.action),
                )
            })
            .collect();

        for (tracking_id, patch) in patches {
            self.store.update_meal_tracking(tracking_id, &patch);
        }
    }

    fn enter_offline(&mut self, error: &MealError) {
        if !self.store.is_offline() {
            info!(error = %error, "server unreachable, entering offline mode");
        }
        self.store.set_offline_mode(true);
    }

    fn require_tracking(&self, tracking_id: i64) -> MealResult<&MealTracking> {
        self.store.find(tracking_id).ok_or_else(|| {
            MealError::usage(format!(
                "meal tracking {tracking_id} is not loaded for {}; run `mealsync day show` first",
                self.store.selected_date()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealsync_api::{DailySummary, DayPayload, MealType, TrackingStatus};
    use mealsync_store::ClientState;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Scripted client: each call pops the next canned result.
    #[derive(Default)]
    struct FakeClient {
        submits: RefCell<VecDeque<MealResult<MealTracking>>>,
        days: RefCell<VecDeque<MealResult<DayPayload>>>,
        summaries: RefCell<VecDeque<MealResult<DailySummary>>>,
        submitted: RefCell<Vec<(i64, String)>>,
        fetches: RefCell<usize>,
        summary_fetches: RefCell<usize>,
    }

    impl MealTrackingClient for FakeClient {
        fn fetch_day(&self, _user_id: i64, _date: NaiveDate) -> MealResult<DayPayload> {
            *self.fetches.borrow_mut() += 1;
            self.days
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(MealError::network("no scripted day")))
        }

        fn fetch_summary(&self, _user_id: i64, _date: NaiveDate) -> MealResult<DailySummary> {
            *self.summary_fetches.borrow_mut() += 1;
            self.summaries
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(DailySummary::default()))
        }

        fn submit_action(
            &self,
            _user_id: i64,
            tracking_id: i64,
            action: &TrackingAction,
        ) -> MealResult<MealTracking> {
            self.submitted
                .borrow_mut()
                .push((tracking_id, action.kind().to_string()));
            self.submits
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(MealError::network("no scripted submit")))
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date")
    }

    fn planned(id: i64) -> MealTracking {
        MealTracking::planned(
            id,
            MealType::Lunch,
            Nutrition {
                calories: 400.0,
                ..Nutrition::default()
            },
        )
    }

    fn store() -> TrackingStore {
        let mut store = TrackingStore::new(ClientState::default(), day());
        store.set_today_meal_trackings(vec![planned(1), planned(2)]);
        store
    }

    fn consume() -> ConsumeData {
        ConsumeData {
            consumption_time: "2025-03-01T12:00:00Z".to_string(),
            satisfaction_rating: Some(4),
            notes: None,
        }
    }

    #[test]
    fn applied_phase_shows_target_status_before_dispatch() {
        let client = FakeClient::default();
        let mut engine = SyncEngine::new(&client, store(), 7);

        let outcome = engine.transition(
            1,
            &TrackingAction::ConsumeMeal(consume()),
            Phase::Applied,
        );

        assert_eq!(outcome, MutationOutcome::Applied);
        assert_eq!(
            engine.store().find(1).map(|t| t.status),
            Some(TrackingStatus::Consumed)
        );
        assert!(client.submitted.borrow().is_empty());
    }

    #[test]
    fn server_rejection_rolls_back_and_sets_error() {
        let client = FakeClient::default();
        client
            .submits
            .borrow_mut()
            .push_back(Err(MealError::server("already skipped [http_status=409]")));
        let mut engine = SyncEngine::new(&client, store(), 7);

        let outcome = engine.skip_meal(2, "travel").expect("valid input");

        assert!(matches!(outcome, MutationOutcome::RolledBack { .. }));
        let tracking = engine.store().find(2).expect("tracking");
        assert_eq!(tracking.status, TrackingStatus::Planned);
        assert!(tracking.skip_reason.is_none());
        assert!(engine.store().error().is_some());
        assert_eq!(engine.store().pending_actions_count(), 0);
        assert!(!engine.store().is_offline());
    }

    #[test]
    fn offline_skip_never_dispatches_and_queues_once() {
        let client = FakeClient::default();
        let mut store = store();
        store.set_offline_mode(true);
        let mut engine = SyncEngine::new(&client, store, 7);

        let outcome = engine.skip_meal(1, "fasting").expect("valid input");

        assert!(matches!(outcome, MutationOutcome::Queued { .. }));
        assert!(client.submitted.borrow().is_empty());
        let pending = engine.store().pending_actions();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind().as_str(), "skip_meal");
        assert_eq!(
            engine.store().find(1).map(|t| t.status),
            Some(TrackingStatus::Skipped)
        );
    }

    #[test]
    fn replay_keeps_failures_and_counts_successes() {
        let client = FakeClient::default();
        let mut store = store();
        store.set_offline_mode(true);
        let mut engine = SyncEngine::new(&client, store, 7);

        engine.skip_meal(1, "a").expect("queue first");
        engine.consume_meal(2, consume()).expect("queue second");
        engine.skip_meal(2, "b").expect("queue third");

        let mut confirmed = planned(1);
        confirmed.status = TrackingStatus::Skipped;
        client.submits.borrow_mut().extend([
            Ok(confirmed),
            Err(MealError::server("boom [http_status=500]")),
            Err(MealError::network("dropped")),
        ]);
        client.days.borrow_mut().push_back(Ok(DayPayload {
            meal_trackings: vec![planned(1), planned(2)],
            daily_summary: None,
        }));

        let synced = engine.sync_pending_actions();

        assert_eq!(synced, 1);
        assert_eq!(engine.store().pending_actions_count(), 2);
        assert!(!engine.store().is_offline());
        assert!(engine.store().last_sync().is_some());
        assert!(!engine.store().is_loading());
        // the refetch still shows what the queued actions will do
        assert_eq!(
            engine.store().find(2).map(|t| t.status),
            Some(TrackingStatus::Skipped)
        );
    }

    #[test]
    fn replay_with_no_successes_stays_offline() {
        let client = FakeClient::default();
        let mut store = store();
        store.set_offline_mode(true);
        let mut engine = SyncEngine::new(&client, store, 7);
        engine.skip_meal(1, "a").expect("queue");

        assert_eq!(engine.sync_pending_actions(), 0);
        assert!(engine.store().is_offline());
        assert_eq!(*client.fetches.borrow(), 0);
    }

    #[test]
    fn empty_queue_replay_is_a_no_op() {
        let client = FakeClient::default();
        let mut engine = SyncEngine::new(&client, store(), 7);
        assert_eq!(engine.sync_pending_actions(), 0);
        assert!(client.submitted.borrow().is_empty());
    }

    #[test]
    fn adjust_scales_planned_nutrition_by_default() {
        let client = FakeClient::default();
        let mut store = store();
        store.set_offline_mode(true);
        let mut engine = SyncEngine::new(&client, store, 7);

        engine.adjust_portions(1, 1.5, None).expect("queue adjust");

        let tracking = engine.store().find(1).expect("tracking");
        assert_eq!(tracking.status, TrackingStatus::Modified);
        assert_eq!(tracking.actual_portion_size, Some(1.5));
        assert_eq!(tracking.effective_nutrition().calories, 600.0);
    }

    #[test]
    fn unknown_tracking_and_bad_input_touch_nothing() {
        let client = FakeClient::default();
        let mut engine = SyncEngine::new(&client, store(), 7);

        assert!(engine.skip_meal(99, "x").is_err());
        let mut bad = consume();
        bad.satisfaction_rating = Some(9);
        assert!(engine.consume_meal(1, bad).is_err());

        assert_eq!(
            engine.store().find(1).map(|t| t.status),
            Some(TrackingStatus::Planned)
        );
        assert!(client.submitted.borrow().is_empty());
    }

    #[test]
    fn failed_fetch_without_cache_falls_back_to_empty_offline_view() {
        let client = FakeClient::default();
        let store = TrackingStore::new(ClientState::default(), day());
        let mut engine = SyncEngine::new(&client, store, 7);

        let outcome = engine.load_today_meal_trackings(false);

        assert_eq!(outcome, LoadOutcome::OfflineFallback { cached: false });
        assert!(engine.store().is_offline());
        assert!(engine.store().today_meal_trackings().is_empty());
    }

    #[test]
    fn non_connectivity_fetch_error_keeps_cache_and_sets_error() {
        let client = FakeClient::default();
        client
            .days
            .borrow_mut()
            .push_back(Err(MealError::server("bad user [http_status=404]")));
        let mut engine = SyncEngine::new(&client, store(), 7);

        let outcome = engine.load_today_meal_trackings(true);

        assert_eq!(outcome, LoadOutcome::Failed);
        assert!(engine.store().error().is_some());
        assert_eq!(engine.store().today_meal_trackings().len(), 2);
        assert!(!engine.store().is_offline());
    }

    #[test]
    fn consuming_after_an_offline_replace_drops_the_replacement() {
        let client = FakeClient::default();
        let mut store = store();
        store.set_offline_mode(true);
        let mut engine = SyncEngine::new(&client, store, 7);

        engine
            .replace_meal(
                1,
                ReplaceData {
                    replacement_name: "pizza".to_string(),
                    reason: "craving".to_string(),
                    nutrition: Some(Nutrition {
                        calories: 900.0,
                        ..Nutrition::default()
                    }),
                },
            )
            .expect("queue replace");
        engine.consume_meal(1, consume()).expect("queue consume");

        let tracking = engine.store().find(1).expect("tracking");
        assert_eq!(tracking.status, TrackingStatus::Consumed);
        assert!(tracking.replacement_name.is_none());
        assert!(tracking.replacement_reason.is_none());
        assert_eq!(tracking.effective_nutrition().calories, 400.0);
        assert_eq!(engine.store().nutrition_totals().calories, 800.0);

        let kinds: Vec<&str> = engine
            .store()
            .pending_actions()
            .iter()
            .map(|action| action.kind().as_str())
            .collect();
        assert_eq!(kinds, vec!["replace_meal", "consume_meal"]);
    }

    #[test]
    fn cached_summary_alone_does_not_count_as_loaded_trackings() {
        let client = FakeClient::default();
        client.summaries.borrow_mut().push_back(Ok(DailySummary {
            meals_planned: 1,
            ..DailySummary::default()
        }));
        client.days.borrow_mut().push_back(Ok(DayPayload {
            meal_trackings: vec![planned(1)],
            daily_summary: None,
        }));
        let store = TrackingStore::new(ClientState::default(), day());
        let mut engine = SyncEngine::new(&client, store, 7);

        assert_eq!(engine.load_daily_summary(false), LoadOutcome::Network);
        assert_eq!(engine.load_today_meal_trackings(false), LoadOutcome::Network);
        assert_eq!(*client.fetches.borrow(), 1);
        assert_eq!(engine.store().today_meal_trackings().len(), 1);
        assert_eq!(
            engine.store().daily_summary().map(|summary| summary.meals_planned),
            Some(1)
        );

        assert_eq!(engine.load_today_meal_trackings(false), LoadOutcome::Cache);
        assert_eq!(*client.fetches.borrow(), 1);
    }

    #[test]
    fn loaded_empty_day_is_served_from_cache() {
        let client = FakeClient::default();
        client.days.borrow_mut().push_back(Ok(DayPayload {
            meal_trackings: Vec::new(),
            daily_summary: None,
        }));
        let store = TrackingStore::new(ClientState::default(), day());
        let mut engine = SyncEngine::new(&client, store, 7);

        assert_eq!(engine.load_today_meal_trackings(false), LoadOutcome::Network);
        assert_eq!(engine.load_today_meal_trackings(false), LoadOutcome::Cache);
        assert_eq!(*client.fetches.borrow(), 1);
    }

    fn store_with_summary(meals_planned: u32) -> TrackingStore {
        let mut store = store();
        store.set_daily_summary(DailySummary {
            meals_planned,
            ..DailySummary::default()
        });
        store
    }

    #[test]
    fn summary_is_served_from_cache_unless_forced() {
        let client = FakeClient::default();
        client.summaries.borrow_mut().push_back(Ok(DailySummary {
            meals_planned: 3,
            ..DailySummary::default()
        }));
        let mut engine = SyncEngine::new(&client, store_with_summary(2), 7);

        assert_eq!(engine.load_daily_summary(false), LoadOutcome::Cache);
        assert_eq!(*client.summary_fetches.borrow(), 0);
        assert_eq!(
            engine.store().daily_summary().map(|summary| summary.meals_planned),
            Some(2)
        );

        assert_eq!(engine.load_daily_summary(true), LoadOutcome::Network);
        assert_eq!(*client.summary_fetches.borrow(), 1);
        assert_eq!(
            engine.store().daily_summary().map(|summary| summary.meals_planned),
            Some(3)
        );
    }

    #[test]
    fn unreachable_summary_falls_back_to_cached_copy() {
        let client = FakeClient::default();
        client
            .summaries
            .borrow_mut()
            .push_back(Err(MealError::network("connection refused")));
        let mut engine = SyncEngine::new(&client, store_with_summary(2), 7);

        let outcome = engine.load_daily_summary(true);

        assert_eq!(outcome, LoadOutcome::OfflineFallback { cached: true });
        assert!(engine.store().is_offline());
        assert_eq!(
            engine.store().daily_summary().map(|summary| summary.meals_planned),
            Some(2)
        );
    }

    #[test]
    fn unreachable_summary_without_cache_reports_no_fallback_data() {
        let client = FakeClient::default();
        client
            .summaries
            .borrow_mut()
            .push_back(Err(MealError::network("connection refused")));
        let store = TrackingStore::new(ClientState::default(), day());
        let mut engine = SyncEngine::new(&client, store, 7);

        let outcome = engine.load_daily_summary(false);

        assert_eq!(outcome, LoadOutcome::OfflineFallback { cached: false });
        assert!(engine.store().is_offline());
        assert!(engine.store().daily_summary().is_none());
    }

    #[test]
    fn rejected_summary_sets_error_and_keeps_cached_copy() {
        let client = FakeClient::default();
        client
            .summaries
            .borrow_mut()
            .push_back(Err(MealError::server("bad user [http_status=404]")));
        let mut engine = SyncEngine::new(&client, store_with_summary(2), 7);

        let outcome = engine.load_daily_summary(true);

        assert_eq!(outcome, LoadOutcome::Failed);
        assert!(engine.store().error().is_some());
        assert!(!engine.store().is_offline());
        assert_eq!(
            engine.store().daily_summary().map(|summary| summary.meals_planned),
            Some(2)
        );
    }
}
