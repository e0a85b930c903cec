//! Progress reporting for the scrape and check stages

use std::sync::Mutex;

/// Handle to one progress lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneId(usize);

/// Sink the pipeline reports progress to
pub trait ProgressSink: Send + Sync {
    /// Register a lane expecting `total` steps
    fn create_lane(&self, total: usize, label: &str) -> LaneId;

    fn advance(&self, lane: LaneId, by: usize);
}

/// Snapshot of one lane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    pub label: String,
    pub total: usize,
    pub completed: usize,
}

impl Lane {
    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }

    /// Completion in percent, clamped to 100
    pub fn percent(&self) -> u16 {
        if self.total == 0 {
            return 100;
        }
        (self.completed.min(self.total) * 100 / self.total) as u16
    }
}

/// Shared lane counters, rendered by the terminal dashboard
#[derive(Debug, Default)]
pub struct ProgressBoard {
    lanes: Mutex<Vec<Lane>>,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lanes(&self) -> Vec<Lane> {
        self.lock().clone()
    }

    /// Sum of `completed` over every lane
    pub fn total_completed(&self) -> usize {
        self.lock().iter().map(|lane| lane.completed).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Lane>> {
        self.lanes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressSink for ProgressBoard {
    fn create_lane(&self, total: usize, label: &str) -> LaneId {
        let mut lanes = self.lock();
        lanes.push(Lane {
            label: label.to_string(),
            total,
            completed: 0,
        });
        LaneId(lanes.len() - 1)
    }

    fn advance(&self, lane: LaneId, by: usize) {
        if let Some(lane) = self.lock().get_mut(lane.0) {
            lane.completed += by;
        }
    }
}

/// Sink that discards every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn create_lane(&self, _total: usize, _label: &str) -> LaneId {
        LaneId(0)
    }

    fn advance(&self, _lane: LaneId, _by: usize) {}
}
