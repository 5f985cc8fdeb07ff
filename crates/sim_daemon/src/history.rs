use std::collections::VecDeque;

use sim_core::Snapshot;

/// Last `capacity` snapshots, oldest first.
#[derive(Debug)]
pub struct History {
    buf: VecDeque<Snapshot>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(snapshot);
    }

    /// Snapshots whose `timestamp_s` lies in `[from, to]`; open bounds when `None`.
    pub fn range(&self, from: Option<f64>, to: Option<f64>) -> Vec<Snapshot> {
        self.buf
            .iter()
            .filter(|s| from.map_or(true, |f| s.timestamp_s >= f))
            .filter(|s| to.map_or(true, |t| s.timestamp_s <= t))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
