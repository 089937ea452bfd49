use mealsync_core::{ExitCode, MealError, MealResult};
use mealsync_sync::{
    ConnectivityEvent, MonitorReport, connectivity_channel, spawn_probe_poller,
};
use serde_json::json;
use std::time::Duration;
use tracing::info;

use crate::{GlobalOptions, NetCommand, build_api, print_json, with_engine};

pub(crate) fn cmd_net(command: NetCommand, globals: &GlobalOptions) -> MealResult<ExitCode> {
    with_engine(globals, |engine, ctx| {
        let (notifier, monitor) = connectivity_channel();

        match command {
            NetCommand::Check => {
                let api = build_api(ctx)?;
                let report = monitor.mount(&api, engine);
                print_report(&report, &ctx.server, globals)?;
                Ok(ExitCode::Success)
            }
            NetCommand::Online => {
                let report = monitor.handle(engine, ConnectivityEvent::Online);
                print_report(&report, &ctx.server, globals)?;
                Ok(ExitCode::Success)
            }
            NetCommand::Offline => {
                let report = monitor.handle(engine, ConnectivityEvent::Offline);
                print_report(&report, &ctx.server, globals)?;
                Ok(ExitCode::Success)
            }
            NetCommand::Watch {
                interval,
                iterations,
            } => {
                let interval = Duration::from_secs(
                    interval.unwrap_or(ctx.config.network.watch_interval_secs),
                );
                if interval.is_zero() {
                    return Err(MealError::usage("--interval must be at least 1 second"));
                }

                let poller = spawn_probe_poller(build_api(ctx)?, interval, iterations, notifier);
                info!(server = %ctx.server, interval_secs = interval.as_secs(), "watching connectivity");

                let mut reports = Vec::new();
                while let Some(report) = monitor.wait(engine) {
                    engine.store().persist(&ctx.cache, &ctx.profile)?;
                    if !globals.json {
                        print_report(&report, &ctx.server, globals)?;
                    }
                    reports.push(report);
                }

                poller
                    .join()
                    .map_err(|_| MealError::io("connectivity poller thread panicked"))?;

                if globals.json {
                    print_json(&json!({"ok": true, "result": {"reports": reports}}))?;
                }
                Ok(ExitCode::Success)
            }
        }
    })
}

fn print_report(report: &MonitorReport, server: &str, globals: &GlobalOptions) -> MealResult<()> {
    if globals.json {
        return print_json(&json!({"ok": true, "result": report}));
    }

    match report.event {
        ConnectivityEvent::Online => println!("Online: {server} is reachable."),
        ConnectivityEvent::Offline => println!("Offline: actions will be queued locally."),
    }
    if let Some(replayed) = report.replayed {
        println!("Replayed {replayed} queued actions.");
    }
    println!("Pending actions: {}", report.pending_actions);
    Ok(())
}
