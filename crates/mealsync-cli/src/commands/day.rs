use chrono::{DateTime, NaiveDate, Utc};
use mealsync_api::{DailySummary, MealTracking, MealTrackingApi, Nutrition};
use mealsync_core::{ExitCode, MealError, MealResult};
use mealsync_sync::{CompletionStats, LoadOutcome, SyncEngine};
use serde::Serialize;
use serde_json::json;

use crate::{DayCommand, GlobalOptions, print_json, render_error, with_engine};

#[derive(Debug, Serialize)]
struct DayView {
    date: NaiveDate,
    source: LoadOutcome,
    offline_mode: bool,
    pending_actions: usize,
    last_sync: Option<DateTime<Utc>>,
    meal_trackings: Vec<MealTracking>,
    daily_summary: Option<DailySummary>,
    nutrition_totals: Nutrition,
    completion: CompletionStats,
}

pub(crate) fn cmd_day(command: DayCommand, globals: &GlobalOptions) -> MealResult<ExitCode> {
    with_engine(globals, |engine, _ctx| match command {
        DayCommand::Show { refresh } => show_day(engine, refresh, globals),
        DayCommand::Select { date } => {
            engine.store_mut().set_selected_date(date);
            show_day(engine, false, globals)
        }
        DayCommand::Summary { refresh } => {
            let source = engine.load_daily_summary(refresh);
            if let Some(code) = failed_load(engine, source, globals) {
                return Ok(code);
            }

            let store = engine.store();
            if globals.json {
                print_json(&json!({
                    "ok": true,
                    "result": {
                        "date": store.selected_date(),
                        "source": source,
                        "offline_mode": store.is_offline(),
                        "daily_summary": store.daily_summary(),
                    }
                }))?;
            } else {
                println!("Summary for {} ({})", store.selected_date(), source_label(source));
                match store.daily_summary() {
                    Some(summary) => print_summary(summary),
                    None => println!("No summary available."),
                }
            }

            Ok(ExitCode::Success)
        }
    })
}

fn show_day(
    engine: &mut SyncEngine<'_, MealTrackingApi>,
    refresh: bool,
    globals: &GlobalOptions,
) -> MealResult<ExitCode> {
    let source = engine.load_today_meal_trackings(refresh);
    if let Some(code) = failed_load(engine, source, globals) {
        return Ok(code);
    }

    // A summary request while the server is unreachable would only fail again.
    if !matches!(source, LoadOutcome::OfflineFallback { .. }) {
        let summary_source = engine.load_daily_summary(false);
        if summary_source == LoadOutcome::Failed {
            engine.store_mut().clear_error();
        }
    }

    let store = engine.store();
    let view = DayView {
        date: store.selected_date(),
        source,
        offline_mode: store.is_offline(),
        pending_actions: store.pending_actions_count(),
        last_sync: store.last_sync(),
        meal_trackings: store.today_meal_trackings().to_vec(),
        daily_summary: store.daily_summary().cloned(),
        nutrition_totals: store.nutrition_totals(),
        completion: store.completion_stats(),
    };

    if globals.json {
        print_json(&json!({"ok": true, "result": view}))?;
        return Ok(ExitCode::Success);
    }

    println!("{} ({})", view.date, source_label(view.source));
    if view.offline_mode {
        println!("Offline mode: {} pending actions", view.pending_actions);
    } else if view.pending_actions > 0 {
        println!("Pending actions: {}", view.pending_actions);
    }

    if view.meal_trackings.is_empty() {
        println!("No meals planned.");
    }
    for tracking in &view.meal_trackings {
        println!(
            "  #{:<6} {:<9} {:<9} {:>6.0} kcal  {}",
            tracking.id,
            tracking.meal_type.as_str(),
            tracking.status.as_str(),
            tracking.effective_nutrition().calories,
            tracking.display_name()
        );
    }

    let totals = view.nutrition_totals;
    println!(
        "Totals: {:.0} kcal, {:.1}g protein, {:.1}g carbs, {:.1}g fat",
        totals.calories, totals.protein, totals.carbs, totals.fat
    );
    println!(
        "Completion: {}/{} eaten ({:.0}%), {} skipped",
        view.completion.consumed + view.completion.modified + view.completion.replaced,
        view.completion.total,
        view.completion.percentage_consumed,
        view.completion.skipped
    );
    if let Some(summary) = &view.daily_summary {
        print_summary(summary);
    }
    if let Some(last_sync) = view.last_sync {
        println!("Last sync: {}", last_sync.to_rfc3339());
    }

    Ok(ExitCode::Success)
}

/// Reports the error a failed load left in the store.
fn failed_load(
    engine: &SyncEngine<'_, MealTrackingApi>,
    source: LoadOutcome,
    globals: &GlobalOptions,
) -> Option<ExitCode> {
    if source != LoadOutcome::Failed {
        return None;
    }

    let error = engine
        .store()
        .error()
        .cloned()
        .unwrap_or_else(|| MealError::server("failed to load meal trackings"));
    render_error(&error, globals.json);
    Some(error.exit_code())
}

fn source_label(source: LoadOutcome) -> &'static str {
    match source {
        LoadOutcome::Cache => "cached",
        LoadOutcome::Network => "from server",
        LoadOutcome::OfflineFallback { cached: true } => "offline, cached copy",
        LoadOutcome::OfflineFallback { cached: false } => "offline, nothing cached",
        LoadOutcome::Failed => "failed",
    }
}

fn print_summary(summary: &DailySummary) {
    if let Some(adherence) = summary.overall_adherence {
        println!("Adherence: {adherence:.0}%");
    }
    println!(
        "Meals: {} planned, {} consumed, {} modified, {} skipped, {} replaced",
        summary.meals_planned,
        summary.meals_consumed,
        summary.meals_modified,
        summary.meals_skipped,
        summary.meals_replaced
    );
}
