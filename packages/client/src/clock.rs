//! Clock offset estimation and smoothing.
//!
//! The server reports its time on handshake and on every `timeSync` round
//! trip. The synchronizer turns each report into a target offset
//! (`server_time - local_now`) and moves the smoothed offset toward it in
//! bounded linear steps, so that timestamps translated onto the shared
//! timeline never jump.

use std::time::Duration;

/// Timing constants of the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSyncConfig {
    /// Interval between `timeSync` round trips.
    pub sync_interval: Duration,
    /// Time over which a new offset estimate is blended in.
    pub smoothing_window: Duration,
    /// Number of discrete steps within the smoothing window.
    pub smoothing_steps: u32,
}

impl Default for ClockSyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(20),
            smoothing_window: Duration::from_millis(1000),
            smoothing_steps: 50,
        }
    }
}

impl ClockSyncConfig {
    /// Delay between two smoothing steps.
    pub fn step_interval(&self) -> Duration {
        self.smoothing_window / self.smoothing_steps.max(1)
    }
}

/// Offset state of one connection. All values are milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockState {
    /// Latest unsmoothed estimate (`server_time - local_now`).
    pub raw_offset: f64,
    /// Offset currently applied to local time.
    pub smoothed_offset: f64,
    /// Local time of the latest sample.
    pub last_sync_at: i64,
}

#[derive(Debug, Clone, Copy)]
struct Interpolation {
    target: f64,
    remaining: u32,
}

/// Per-connection clock synchronizer.
///
/// Purely computational: the caller owns the timers and calls
/// [`ClockSynchronizer::step`] every [`ClockSyncConfig::step_interval`]
/// while [`ClockSynchronizer::is_smoothing`] is true.
#[derive(Debug, Clone)]
pub struct ClockSynchronizer {
    config: ClockSyncConfig,
    state: Option<ClockState>,
    interpolation: Option<Interpolation>,
}

impl ClockSynchronizer {
    pub fn new(config: ClockSyncConfig) -> Self {
        Self {
            config,
            state: None,
            interpolation: None,
        }
    }

    pub fn config(&self) -> &ClockSyncConfig {
        &self.config
    }

    pub fn state(&self) -> Option<&ClockState> {
        self.state.as_ref()
    }

    /// Offset applied to local time; zero before the first sample.
    pub fn smoothed_offset(&self) -> f64 {
        self.state.map(|s| s.smoothed_offset).unwrap_or(0.0)
    }

    /// Local time translated onto the shared timeline.
    pub fn shared_now(&self, local_now: i64) -> f64 {
        local_now as f64 + self.smoothed_offset()
    }

    pub fn is_smoothing(&self) -> bool {
        self.interpolation.is_some()
    }

    /// Feed a server time report received at `local_now`.
    ///
    /// The first sample is applied directly. Later samples start a new
    /// interpolation run toward the new target, replacing any run in
    /// progress. Returns `true` when a run was started.
    pub fn receive_server_time(&mut self, server_time: f64, local_now: i64) -> bool {
        let target = server_time - local_now as f64;

        let Some(state) = self.state.as_mut() else {
            tracing::debug!("Initial clock offset: {:.1}ms", target);
            self.state = Some(ClockState {
                raw_offset: target,
                smoothed_offset: target,
                last_sync_at: local_now,
            });
            return false;
        };

        state.raw_offset = target;
        state.last_sync_at = local_now;
        tracing::debug!(
            "Smoothing clock offset {:.1}ms -> {:.1}ms",
            state.smoothed_offset,
            target
        );
        self.interpolation = Some(Interpolation {
            target,
            remaining: self.config.smoothing_steps.max(1),
        });
        true
    }

    /// Apply one interpolation step; returns the new smoothed offset.
    ///
    /// Each step covers `1/remaining` of the distance left, so the steps are
    /// equal in size and never overshoot. The final step lands exactly on
    /// the target.
    pub fn step(&mut self) -> Option<f64> {
        let interpolation = self.interpolation.as_mut()?;
        let state = self.state.as_mut()?;

        if interpolation.remaining <= 1 {
            state.smoothed_offset = interpolation.target;
            self.interpolation = None;
        } else {
            let distance = interpolation.target - state.smoothed_offset;
            state.smoothed_offset += distance / f64::from(interpolation.remaining);
            interpolation.remaining -= 1;
        }
        Some(state.smoothed_offset)
    }

    /// Abort the interpolation run in progress, keeping the current offset.
    pub fn cancel(&mut self) {
        self.interpolation = None;
    }

    /// Forget every sample; used when the connection closes.
    pub fn reset(&mut self) {
        self.state = None;
        self.interpolation = None;
    }
}

impl Default for ClockSynchronizer {
    fn default() -> Self {
        Self::new(ClockSyncConfig::default())
    }
}
