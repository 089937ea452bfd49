use mealsync_api::{MealTrackingApi, MealTrackingClient};
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

use crate::engine::SyncEngine;

/// Answers "can the server be reached right now".
pub trait ConnectivityProbe {
    fn is_online(&self) -> bool;
}

impl ConnectivityProbe for MealTrackingApi {
    fn is_online(&self) -> bool {
        self.ping().is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

impl ConnectivityEvent {
    pub fn from_online(online: bool) -> Self {
        if online { Self::Online } else { Self::Offline }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorReport {
    pub event: ConnectivityEvent,
    pub offline_mode: bool,
    /// Set when the transition triggered a queue replay.
    pub replayed: Option<usize>,
    pub pending_actions: usize,
}

/// Sending half held by whoever observes connectivity.
#[derive(Debug, Clone)]
pub struct ConnectivityNotifier {
    sender: Sender<ConnectivityEvent>,
}

impl ConnectivityNotifier {
    /// Returns false once the monitor has been dropped.
    pub fn notify(&self, event: ConnectivityEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Bridges connectivity transitions to the store's offline flag. Dropping
/// the monitor unsubscribes every notifier.
#[derive(Debug)]
pub struct NetworkMonitor {
    events: Receiver<ConnectivityEvent>,
}

pub fn connectivity_channel() -> (ConnectivityNotifier, NetworkMonitor) {
    let (sender, events) = mpsc::channel();
    (ConnectivityNotifier { sender }, NetworkMonitor { events })
}

impl NetworkMonitor {
    /// Aligns the offline flag with what the probe sees and replays the
    /// queue if the server is reachable.
    pub fn mount<C, P>(&self, probe: &P, engine: &mut SyncEngine<'_, C>) -> MonitorReport
    where
        C: MealTrackingClient,
        P: ConnectivityProbe + ?Sized,
    {
        let online = probe.is_online();
        if engine.store().is_offline() == online {
            info!(online, "stored offline flag disagrees with probe, correcting");
        }
        self.handle(engine, ConnectivityEvent::from_online(online))
    }

    pub fn handle<C>(
        &self,
        engine: &mut SyncEngine<'_, C>,
        event: ConnectivityEvent,
    ) -> MonitorReport
    where
        C: MealTrackingClient,
    {
        let mut replayed = None;

        match event {
            ConnectivityEvent::Online => {
                engine.store_mut().set_offline_mode(false);
                if engine.store().pending_actions_count() > 0 {
                    debug!(
                        pending = engine.store().pending_actions_count(),
                        "back online, replaying queue"
                    );
                    replayed = Some(engine.sync_pending_actions());
                }
            }
            ConnectivityEvent::Offline => {
                if !engine.store().is_offline() {
                    info!("connectivity lost, entering offline mode");
                }
                engine.store_mut().set_offline_mode(true);
            }
        }

        MonitorReport {
            event,
            offline_mode: engine.store().is_offline(),
            replayed,
            pending_actions: engine.store().pending_actions_count(),
        }
    }

    /// Handles every event already delivered without blocking.
    pub fn pump<C>(&self, engine: &mut SyncEngine<'_, C>) -> Vec<MonitorReport>
    where
        C: MealTrackingClient,
    {
        let mut reports = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            reports.push(self.handle(engine, event));
        }
        reports
    }

    /// Blocks for the next event. `None` once every notifier is gone.
    pub fn wait<C>(&self, engine: &mut SyncEngine<'_, C>) -> Option<MonitorReport>
    where
        C: MealTrackingClient,
    {
        let event = self.events.recv().ok()?;
        Some(self.handle(engine, event))
    }
}

/// Probes on a background thread and sends an event whenever the observed
/// state changes (the first probe always sends). Stops after `iterations`
/// probes, or when the monitor is dropped.
pub fn spawn_probe_poller<P>(
    probe: P,
    interval: Duration,
    iterations: Option<u32>,
    notifier: ConnectivityNotifier,
) -> JoinHandle<()>
where
    P: ConnectivityProbe + Send + 'static,
{
    thread::spawn(move || {
        let mut last: Option<bool> = None;
        let mut count = 0u32;

        loop {
            let online = probe.is_online();
            if last != Some(online) {
                if !notifier.notify(ConnectivityEvent::from_online(online)) {
                    break;
                }
                last = Some(online);
            }

            count += 1;
            if iterations.is_some_and(|limit| count >= limit) {
                break;
            }
            thread::sleep(interval);
        }
    })
}
