//! Background tick loop owning one simulated vehicle.
//!
//! A single tokio task is the only caller of `Simulation::step`. Control
//! calls take the same short-lived mutex, so every published snapshot is a
//! copy taken between two whole ticks. Subscribers are called from the loop
//! task after the lock is released; a failing or panicking subscriber is
//! logged and skipped.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sim_control::{ControlSource, ControlUpdate, ManualControls};
use sim_core::{
    ControlInput, DrivingMode, EventKind, ModelKind, SimError, SimEvent, Simulation, Snapshot,
};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::history::History;
use crate::subscribers::{SnapshotSubscriber, SubscriberId, SubscriberRegistry};

#[derive(Debug, Clone, PartialEq)]
pub enum LoopStatus {
    Stopped,
    Running,
    /// The loop hit a fatal error and stopped itself.
    Faulted(SimError),
}

impl LoopStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LoopStatus::Stopped => "stopped",
            LoopStatus::Running => "running",
            LoopStatus::Faulted(_) => "faulted",
        }
    }
}

struct Shared {
    sim: Mutex<Simulation>,
    controls: Mutex<ManualControls>,
    subscribers: Mutex<SubscriberRegistry>,
    history: Mutex<History>,
    running: AtomicBool,
    wake: Notify,
    status_tx: watch::Sender<LoopStatus>,
    tick_interval: Duration,
    stop_timeout: Duration,
}

pub struct SimulationLoop {
    shared: Arc<Shared>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SimulationLoop {
    pub fn new(sim: Simulation) -> Self {
        let config = sim.config();
        let tick_interval = Duration::from_millis(config.tick_interval_ms);
        let stop_timeout = Duration::from_millis(config.stop_timeout_ms);
        let history = History::new(config.history_len);
        let subscribers = SubscriberRegistry::new(config.max_subscribers);
        let (status_tx, _) = watch::channel(LoopStatus::Stopped);
        Self {
            shared: Arc::new(Shared {
                sim: Mutex::new(sim),
                controls: Mutex::new(ManualControls::default()),
                subscribers: Mutex::new(subscribers),
                history: Mutex::new(history),
                running: AtomicBool::new(false),
                wake: Notify::new(),
                status_tx,
                tick_interval,
                stop_timeout,
            }),
            task: tokio::sync::Mutex::new(None),
        }
    }

    /// Start ticking, optionally switching mode first. Calling `start` on a
    /// running loop only applies the mode. An unknown mode key is logged and
    /// ignored. The returned receiver observes `Faulted` if the loop dies.
    ///
    /// A loop that `stop` had to abort may still be inside its last tick;
    /// `start` waits for it to exit before spawning a new one.
    pub async fn start(&self, mode: Option<&str>) -> watch::Receiver<LoopStatus> {
        let mut task = self.task.lock().await;
        if let Some(key) = mode {
            if let Err(err) = self.change_mode(key) {
                tracing::warn!("start: {err}; keeping current mode");
            }
        }
        let alive = task.as_ref().is_some_and(|handle| !handle.is_finished());
        if alive && self.shared.running.load(Ordering::Acquire) {
            return self.shared.status_tx.subscribe();
        }
        if let Some(previous) = task.take() {
            let _ = previous.await;
        }
        self.shared.running.store(true, Ordering::Release);
        self.shared.status_tx.send_replace(LoopStatus::Running);
        *task = Some(tokio::spawn(run_loop(Arc::clone(&self.shared))));
        log_started(&self.shared.sim.lock(), self.shared.tick_interval);
        self.shared.status_tx.subscribe()
    }

    /// Signal the loop to stop and wait at most `stop_timeout` for it. A loop
    /// that does not exit in time is aborted at its next await point; its
    /// handle is kept so the next `start` can wait for it.
    pub async fn stop(&self) -> LoopStatus {
        let mut task = self.task.lock().await;
        self.shared.running.store(false, Ordering::Release);
        self.shared.wake.notify_waiters();
        let timed_out = match task.as_mut() {
            Some(handle) => tokio::time::timeout(self.shared.stop_timeout, handle)
                .await
                .is_err(),
            None => false,
        };
        if timed_out {
            warn_stop_timeout(self.shared.stop_timeout);
            if let Some(handle) = task.as_ref() {
                handle.abort();
            }
        } else {
            *task = None;
        }
        self.shared.status_tx.send_if_modified(|status| {
            if *status == LoopStatus::Running {
                *status = LoopStatus::Stopped;
                true
            } else {
                false
            }
        });
        tracing::info!("simulation stopped");
        self.status()
    }

    /// Back to initial state. Works whether or not the loop is running.
    pub fn reset(&self) -> Snapshot {
        let snapshot = {
            let mut sim = self.shared.sim.lock();
            sim.reset();
            sim.snapshot()
        };
        self.shared.controls.lock().release();
        self.shared.history.lock().clear();
        tracing::info!("simulation reset");
        snapshot
    }

    pub fn change_mode(&self, key: &str) -> Result<DrivingMode, SimError> {
        let event = self.shared.sim.lock().change_mode(key)?;
        log_event(&event);
        Ok(self.shared.sim.lock().mode())
    }

    /// Apply a partial pedal/steering update. Values are clamped.
    pub fn set_controls(&self, update: ControlUpdate) -> ControlInput {
        let input = self.shared.controls.lock().apply(update);
        self.shared.sim.lock().set_controls(input);
        input
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.sim.lock().snapshot()
    }

    pub fn history(&self, from: Option<f64>, to: Option<f64>) -> Vec<Snapshot> {
        self.shared.history.lock().range(from, to)
    }

    pub fn history_len(&self) -> usize {
        self.shared.history.lock().len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    pub fn status(&self) -> LoopStatus {
        self.shared.status_tx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn tick_interval(&self) -> Duration {
        self.shared.tick_interval
    }

    /// Run `f` with shared access to the simulation.
    pub fn with_sim<T>(&self, f: impl FnOnce(&Simulation) -> T) -> T {
        f(&self.shared.sim.lock())
    }

    pub fn register(
        &self,
        subscriber: Arc<dyn SnapshotSubscriber>,
    ) -> Result<SubscriberId, SimError> {
        self.shared.subscribers.lock().register(subscriber)
    }

    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.shared.subscribers.lock().unregister(id)
    }

    /// Direct simulation access for tests that need to stage a fault.
    #[cfg(test)]
    fn with_sim_mut<T>(&self, f: impl FnOnce(&mut Simulation) -> T) -> T {
        f(&mut self.shared.sim.lock())
    }
}

async fn run_loop(shared: Arc<Shared>) {
    let interval = shared.tick_interval;
    let mut last_tick: Option<Instant> = None;

    while shared.running.load(Ordering::Acquire) {
        let started = Instant::now();
        let dt = last_tick.map_or(interval, |last| started - last);
        last_tick = Some(started);

        match shared.tick_once(dt.as_secs_f64()) {
            Ok(snapshot) => shared.deliver(&snapshot),
            Err(err) => {
                tracing::error!("fatal simulation fault, stopping loop: {err}");
                shared.running.store(false, Ordering::Release);
                shared.status_tx.send_replace(LoopStatus::Faulted(err));
                break;
            }
        }

        // An overrun tick is followed immediately by the next one.
        if let Some(remaining) = interval.checked_sub(started.elapsed()) {
            tokio::select! {
                () = tokio::time::sleep(remaining) => {}
                () = shared.wake.notified() => {}
            }
        } else {
            tokio::task::yield_now().await;
        }
    }
}

impl Shared {
    fn tick_once(&self, dt: f64) -> Result<Snapshot, SimError> {
        let output = {
            let mut sim = self.sim.lock();
            let input = {
                let profile = sim.state().mode.profile();
                self.controls.lock().controls(sim.state(), profile)
            };
            sim.set_controls(input);
            sim.step(dt)?
        };
        for event in &output.events {
            log_event(event);
        }
        self.history.lock().push(output.snapshot.clone());
        Ok(output.snapshot)
    }

    fn deliver(&self, snapshot: &Snapshot) {
        let handles = self.subscribers.lock().handles();
        for (id, subscriber) in handles {
            match catch_unwind(AssertUnwindSafe(|| subscriber.on_snapshot(snapshot))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(subscriber = id.0, "subscriber failed: {err:#}"),
                Err(_) => tracing::warn!(subscriber = id.0, "subscriber panicked"),
            }
        }
    }
}

fn log_started(sim: &Simulation, interval: Duration) {
    tracing::info!(
        vehicle = %sim.vehicle_id(),
        mode = %sim.mode(),
        interval_ms = interval.as_millis(),
        "simulation started"
    );
}

fn warn_stop_timeout(timeout: Duration) {
    tracing::warn!(
        timeout_ms = timeout.as_millis(),
        "tick loop did not stop in time; aborting"
    );
}

fn log_event(event: &SimEvent) {
    match event {
        SimEvent::EnvironmentEventStarted {
            kind,
            duration_ticks,
            ..
        } => log_environment_started(*kind, *duration_ticks),
        SimEvent::EnvironmentEventEnded { kind } => log_environment_ended(*kind),
        SimEvent::ModelFault { model, detail } => log_model_fault(*model, detail),
        SimEvent::BatteryDepleted => log_battery_depleted(),
        SimEvent::ModeChanged { from, to } => log_mode_changed(*from, *to),
    }
}

fn log_environment_started(kind: EventKind, duration_ticks: u32) {
    tracing::info!(?kind, duration_ticks, "environment event started");
}

fn log_environment_ended(kind: EventKind) {
    tracing::info!(?kind, "environment event ended");
}

fn log_model_fault(model: ModelKind, detail: &str) {
    tracing::warn!(?model, "model fault, previous values kept: {detail}");
}

fn log_battery_depleted() {
    tracing::warn!("battery depleted");
}

fn log_mode_changed(from: DrivingMode, to: DrivingMode) {
    tracing::info!(%from, %to, "mode changed");
}
