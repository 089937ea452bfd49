mod engine;
mod monitor;
mod tracking;

pub use engine::{LoadOutcome, MutationOutcome, SyncEngine};
pub use monitor::{
    ConnectivityEvent, ConnectivityNotifier, ConnectivityProbe, MonitorReport, NetworkMonitor,
    connectivity_channel, spawn_probe_poller,
};
pub use tracking::{CompletionStats, TrackingPatch, TrackingStore};
