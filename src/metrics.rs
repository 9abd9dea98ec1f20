//! Read-only tick telemetry.

use std::cell::Cell;
use std::rc::Rc;

use serde::Serialize;

use crate::sim::StepReport;

/// Weight of the newest sample in the fps moving average.
const FPS_SMOOTHING: f64 = 0.1;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Smoothed ticks per second from wall-clock deltas.
    pub fps: f64,
    pub body_count: usize,
    pub constraint_count: usize,
    /// Wall time spent inside the last tick.
    pub tick_duration_ms: f64,
    pub tick_count: u64,
    /// Simulated seconds since the last reset.
    pub simulation_time: f64,
    pub unstable_recoveries: u64,
    pub rejected_commands: u64,
    pub kinetic_energy: f64,
    pub moving_bodies: usize,
}

/// Millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct SystemClock;

#[cfg(target_arch = "wasm32")]
impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

/// Clock advanced by hand; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[derive(Debug, Default)]
pub struct MetricsTracker {
    metrics: Metrics,
    last_tick_start: Option<f64>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn set_counts(&mut self, bodies: usize, constraints: usize) {
        self.metrics.body_count = bodies;
        self.metrics.constraint_count = constraints;
    }

    pub fn record_rejected(&mut self, n: usize) {
        self.metrics.rejected_commands += n as u64;
    }

    pub fn record_tick(&mut self, start_ms: f64, end_ms: f64, dt: f64, report: &StepReport) {
        if let Some(last) = self.last_tick_start {
            let delta = start_ms - last;
            if delta > 0.0 {
                let instant = 1000.0 / delta;
                self.metrics.fps = if self.metrics.fps == 0.0 {
                    instant
                } else {
                    self.metrics.fps + FPS_SMOOTHING * (instant - self.metrics.fps)
                };
            }
        }
        self.last_tick_start = Some(start_ms);

        let m = &mut self.metrics;
        m.tick_duration_ms = (end_ms - start_ms).max(0.0);
        m.tick_count += 1;
        m.simulation_time += dt;
        m.unstable_recoveries += report.recovered.len() as u64;
        m.kinetic_energy = report.kinetic_energy;
        m.moving_bodies = report.moving;
    }

    /// Forget the fps baseline, e.g. after a pause.
    pub fn resume(&mut self) {
        self.last_tick_start = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_starts_at_first_delta_then_smooths() {
        let mut t = MetricsTracker::new();
        let report = StepReport::default();

        t.record_tick(0.0, 1.0, 0.01, &report);
        assert_eq!(t.metrics().fps, 0.0);

        t.record_tick(20.0, 21.0, 0.01, &report);
        assert!((t.metrics().fps - 50.0).abs() < 1e-9);

        t.record_tick(30.0, 32.5, 0.01, &report);
        // 50 + 0.1 * (100 - 50)
        assert!((t.metrics().fps - 55.0).abs() < 1e-9);
        assert!((t.metrics().tick_duration_ms - 2.5).abs() < 1e-9);
        assert_eq!(t.metrics().tick_count, 3);
        assert!((t.metrics().simulation_time - 0.03).abs() < 1e-12);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(16.0);
        assert_eq!(clock.now_ms(), 16.0);
    }

    #[test]
    fn metrics_serialize_camel_case() {
        let json = serde_json::to_value(Metrics::default()).unwrap();
        assert!(json.get("bodyCount").is_some());
        assert!(json.get("tickDurationMs").is_some());
    }
}
