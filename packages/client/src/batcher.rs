//! Input event batching.
//!
//! Note and control events are collected into a batch anchored at the
//! shared-timeline time of its first event; later events carry their offset
//! from the anchor. The connection flushes the batch at a fixed cadence,
//! trading up to one flush interval of added latency for fewer messages
//! while keeping relative timing exact.

use std::time::Duration;

use keyroom_shared::protocol::{InputAction, InputBatch, InputEvent};

/// Batching constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatcherConfig {
    pub flush_interval: Duration,
    /// Decimal digits kept for numeric payload values.
    pub precision_digits: u32,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_millis(200),
            precision_digits: 3,
        }
    }
}

#[derive(Debug, Clone)]
struct OpenBatch {
    anchor_time: f64,
    events: Vec<InputEvent>,
}

/// Accumulates input events between flushes.
#[derive(Debug, Clone, Default)]
pub struct EventBatcher {
    config: BatcherConfig,
    open: Option<OpenBatch>,
}

impl EventBatcher {
    pub fn new(config: BatcherConfig) -> Self {
        Self { config, open: None }
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_none()
    }

    pub fn len(&self) -> usize {
        self.open.as_ref().map(|b| b.events.len()).unwrap_or(0)
    }

    /// Append an event observed at `shared_now` (shared-timeline ms).
    ///
    /// The first event of a batch becomes its anchor with `delta_ms = 0`.
    /// A delta never decreases within a batch, even if the shared clock was
    /// adjusted backwards since the previous event. Numeric values are
    /// rounded to the configured precision, which is lossy.
    pub fn record(&mut self, action: InputAction, shared_now: f64) {
        let action = self.round_action(action);

        match self.open.as_mut() {
            None => {
                self.open = Some(OpenBatch {
                    anchor_time: shared_now,
                    events: vec![InputEvent {
                        delta_ms: 0.0,
                        action,
                    }],
                });
            }
            Some(batch) => {
                let last = batch.events.last().map(|e| e.delta_ms).unwrap_or(0.0);
                let delta_ms = (shared_now - batch.anchor_time).max(last);
                batch.events.push(InputEvent { delta_ms, action });
            }
        }
    }

    /// Close the open batch; `None` when nothing was recorded.
    pub fn flush(&mut self) -> Option<InputBatch> {
        let batch = self.open.take()?;
        Some(InputBatch {
            participant_id: None,
            anchor_time: batch.anchor_time,
            events: batch.events,
        })
    }

    /// Drop pending events without emitting them.
    pub fn clear(&mut self) {
        self.open = None;
    }

    fn round_action(&self, action: InputAction) -> InputAction {
        match action {
            InputAction::NoteOn { note, velocity } => InputAction::NoteOn {
                note,
                velocity: velocity.map(|v| round_to(v, self.config.precision_digits)),
            },
            InputAction::Control { controller, value } => InputAction::Control {
                controller,
                value: round_to(value, self.config.precision_digits),
            },
            off @ InputAction::NoteOff { .. } => off,
        }
    }
}

/// Round `value` to `digits` decimal places.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}
