//! Per-step records and convergence tracking.

use std::collections::VecDeque;

use vesicle_core::Point3;

use crate::energy::{EnergySummary, LossComponents};

/// What one optimizer step measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRecord {
    /// Step index, starting at 0.
    pub step: usize,
    /// Total loss.
    pub total_loss: f32,
    /// Per-term breakdown.
    pub components: LossComponents,
    /// Measured area.
    pub area: f32,
    /// Measured volume.
    pub volume: f32,
    /// Measured centroid.
    pub center_of_mass: Point3,
    /// Reduced volume `v`.
    pub reduced_volume: f32,
}

impl StepRecord {
    /// Record of an evaluation at `step`.
    pub fn from_summary(step: usize, summary: &EnergySummary) -> Self {
        Self {
            step,
            total_loss: summary.total,
            components: summary.components,
            area: summary.measurements.area,
            volume: summary.measurements.volume,
            center_of_mass: summary.measurements.center_of_mass,
            reduced_volume: summary.reduced_volume(),
        }
    }

    /// Emit the record at info level.
    pub fn log(&self, prefix: &str) {
        let c = self.center_of_mass;
        log::info!(
            "{} step={} loss={:.6} bending={:.6} area={:.5} volume={:.5} com=({:.4}, {:.4}, {:.4}) v={:.4}",
            prefix,
            self.step,
            self.total_loss,
            self.components.bending_energy,
            self.area,
            self.volume,
            c.x,
            c.y,
            c.z,
            self.reduced_volume,
        );
    }
}

/// Sliding-window loss statistics.
///
/// Keeps the last two windows of losses; convergence compares their means.
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    window: usize,
    recent: VecDeque<f32>,
    total_steps: usize,
    best_loss: f32,
}

impl MetricsTracker {
    /// Tracker with the given window length (at least 1).
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            recent: VecDeque::with_capacity(2 * window),
            total_steps: 0,
            best_loss: f32::INFINITY,
        }
    }

    /// Add the loss of one step.
    pub fn push(&mut self, loss: f32) {
        if self.recent.len() == 2 * self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(loss);
        self.total_steps += 1;
        if loss < self.best_loss {
            self.best_loss = loss;
        }
    }

    /// Steps recorded so far.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Lowest loss seen.
    pub fn best_loss(&self) -> f32 {
        self.best_loss
    }

    /// Mean of the last full window.
    pub fn window_mean(&self) -> Option<f32> {
        if self.recent.len() < self.window {
            return None;
        }
        Some(mean(self.recent.iter().rev().take(self.window)))
    }

    /// Mean of the window before the last one.
    pub fn previous_window_mean(&self) -> Option<f32> {
        if self.recent.len() < 2 * self.window {
            return None;
        }
        Some(mean(self.recent.iter().take(self.window)))
    }

    /// `|current - previous| / |previous|` of the two window means.
    pub fn relative_change(&self) -> Option<f32> {
        let current = self.window_mean()?;
        let previous = self.previous_window_mean()?;
        Some((current - previous).abs() / previous.abs().max(f32::MIN_POSITIVE))
    }

    /// True once the relative change drops below `tolerance`.
    ///
    /// Always false for a zero tolerance.
    pub fn has_converged(&self, tolerance: f32) -> bool {
        tolerance > 0.0 && self.relative_change().is_some_and(|c| c < tolerance)
    }
}

fn mean<'a>(values: impl Iterator<Item = &'a f32>) -> f32 {
    let (sum, n) = values.fold((0.0f64, 0usize), |(s, n), &v| (s + v as f64, n + 1));
    if n == 0 {
        0.0
    } else {
        (sum / n as f64) as f32
    }
}
