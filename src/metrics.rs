use std::collections::VecDeque;

use glam::Vec3;
use serde::Serialize;

pub struct SimpleMovingAverage {
    window: VecDeque<f32>,
    period: usize,
    sum: f32,
}

impl SimpleMovingAverage {
    /// Grows the window on demand, `period` only bounds it
    pub fn new(period: usize) -> Self {
        Self {
            window: VecDeque::new(),
            period: period.max(1),
            sum: 0.0,
        }
    }

    pub fn add(&mut self, value: f32) -> f32 {
        self.window.push_back(value);
        self.sum += value;

        if self.window.len() > self.period {
            if let Some(removed) = self.window.pop_front() {
                self.sum -= removed;
            }
        }

        self.get()
    }

    /// Zero until the first sample arrives
    pub fn get(&self) -> f32 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.sum / self.window.len() as f32
    }
}

/// Magnitude of the discrete second derivative of a position stream.
/// High frequency jitter shows up here much stronger than smooth motion.
#[derive(Default)]
struct SecondDifference {
    previous: Option<Vec3>,
    before_previous: Option<Vec3>,
}

impl SecondDifference {
    fn push(&mut self, position: Vec3) -> Option<f32> {
        let result = match (self.previous, self.before_previous) {
            (Some(p1), Some(p2)) => Some((position - 2.0 * p1 + p2).length()),
            _ => None,
        };
        self.before_previous = self.previous;
        self.previous = Some(position);
        result
    }
}

/// Tracks how far the virtual pose trails the target and how much jitter the
/// damper removes
pub struct FollowMetrics {
    pub sma_lag: SimpleMovingAverage,
    pub sma_follow_factor: SimpleMovingAverage,
    pub sma_raw_jitter: SimpleMovingAverage,
    pub sma_filtered_jitter: SimpleMovingAverage,
    pub max_lag: f32,
    pub ticks: u64,
    raw_path: SecondDifference,
    filtered_path: SecondDifference,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub ticks: u64,
    pub avg_lag: f32,
    pub max_lag: f32,
    pub avg_follow_factor: f32,
    pub avg_raw_jitter: f32,
    pub avg_filtered_jitter: f32,
}

impl FollowMetrics {
    pub fn new(window: usize) -> FollowMetrics {
        Self {
            sma_lag: SimpleMovingAverage::new(window),
            sma_follow_factor: SimpleMovingAverage::new(window),
            sma_raw_jitter: SimpleMovingAverage::new(window),
            sma_filtered_jitter: SimpleMovingAverage::new(window),
            max_lag: 0.0,
            ticks: 0,
            raw_path: SecondDifference::default(),
            filtered_path: SecondDifference::default(),
        }
    }

    pub fn record(&mut self, target: Vec3, filtered: Vec3, follow_factor: Option<f32>) {
        self.ticks += 1;
        let lag = (target - filtered).length();
        self.sma_lag.add(lag);
        self.max_lag = self.max_lag.max(lag);
        if let Some(alpha) = follow_factor {
            self.sma_follow_factor.add(alpha);
        }
        if let Some(jitter) = self.raw_path.push(target) {
            self.sma_raw_jitter.add(jitter);
        }
        if let Some(jitter) = self.filtered_path.push(filtered) {
            self.sma_filtered_jitter.add(jitter);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            ticks: self.ticks,
            avg_lag: self.sma_lag.get(),
            max_lag: self.max_lag,
            avg_follow_factor: self.sma_follow_factor.get(),
            avg_raw_jitter: self.sma_raw_jitter.get(),
            avg_filtered_jitter: self.sma_filtered_jitter.get(),
        }
    }
}
