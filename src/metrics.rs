use crate::direction::{Direction, DirectionMap};
use serde::Serialize;

/// Receives the results of a finished run.
pub trait MetricsConsumer {
    fn consume(&mut self, report: &MetricsReport);
}

impl<F: FnMut(&MetricsReport)> MetricsConsumer for F {
    fn consume(&mut self, report: &MetricsReport) {
        self(report)
    }
}

/// Wait and queue statistics for one approach.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DirectionMetrics {
    max_wait: f64,
    total_wait: f64,
    wait_count: u64,
    max_queue: usize,
}

impl DirectionMetrics {
    pub fn record_wait(&mut self, wait: f64) {
        self.max_wait = self.max_wait.max(wait);
        self.total_wait += wait;
        self.wait_count += 1;
    }

    pub fn observe_queue(&mut self, length: usize) {
        self.max_queue = self.max_queue.max(length);
    }

    pub fn max_wait(&self) -> f64 {
        self.max_wait
    }

    pub fn wait_count(&self) -> u64 {
        self.wait_count
    }

    pub fn max_queue(&self) -> usize {
        self.max_queue
    }

    /// The mean recorded wait, or zero if none were recorded.
    pub fn average_wait(&self) -> f64 {
        if self.wait_count == 0 {
            0.0
        } else {
            self.total_wait / self.wait_count as f64
        }
    }
}

/// The final statistics for one approach.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionReport {
    pub max_wait_time: f64,
    pub max_queue_length: usize,
    pub avg_wait_time: f64,
}

/// The final statistics of a run, keyed by approach.
pub type MetricsReport = DirectionMap<DirectionReport>;

/// Statistics accumulated over one run.
#[derive(Clone, Debug, Default)]
pub struct RunMetrics {
    directions: DirectionMap<DirectionMetrics>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dir: Direction) -> &DirectionMetrics {
        &self.directions[dir]
    }

    pub fn record_wait(&mut self, dir: Direction, wait: f64) {
        self.directions[dir].record_wait(wait);
    }

    pub fn observe_queue(&mut self, dir: Direction, length: usize) {
        self.directions[dir].observe_queue(length);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn report(&self) -> MetricsReport {
        DirectionMap::from_fn(|dir| {
            let metrics = &self.directions[dir];
            DirectionReport {
                max_wait_time: metrics.max_wait(),
                max_queue_length: metrics.max_queue(),
                avg_wait_time: metrics.average_wait(),
            }
        })
    }
}
