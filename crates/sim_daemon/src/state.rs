use std::sync::Arc;

use sim_core::Snapshot;
use tokio::sync::broadcast;

use crate::tick_loop::SimulationLoop;

pub type SnapshotTx = broadcast::Sender<Snapshot>;

#[derive(Clone)]
pub struct AppState {
    pub sim_loop: Arc<SimulationLoop>,
    pub snapshot_tx: SnapshotTx,
}
