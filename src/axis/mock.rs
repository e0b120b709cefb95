//! Mock axis implementations.
//!
//! Provides simulated devices for exercising the scan engine without
//! physical hardware. All mocks use async-safe primitives (tokio locks and
//! `tokio::time::sleep`, never `std::thread::sleep`).
//!
//! # Available Mocks
//!
//! - [`MockAxis`] — simulated motor with instant or finite-speed motion and
//!   optional move-failure injection
//! - [`MockDetector`] — read-only device replaying a programmed sequence of
//!   readings, one per scan point

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::axis::Axis;

/// Simulated motor.
///
/// With the default (infinite) speed a move completes as soon as it is
/// started, which keeps unit tests free of sleeps. A finite speed models
/// travel time: the axis reports busy until the move duration has elapsed
/// and interpolates its position while in flight.
///
/// # Example
///
/// ```rust,ignore
/// let axis = MockAxis::at("sx", 7.0);
/// axis.start_move(10.0).await?;
/// assert!(!axis.is_busy().await?);
/// assert_eq!(axis.position().await?, 10.0);
/// ```
pub struct MockAxis {
    name: String,
    speed: f64,
    fail_all: bool,
    fail_on: Option<f64>,
    state: Arc<RwLock<MotionState>>,
}

struct MotionState {
    position: f64,
    from: f64,
    target: f64,
    started: Option<Instant>,
    duration: Duration,
    targets: Vec<f64>,
}

impl MotionState {
    fn at(position: f64) -> Self {
        Self {
            position,
            from: position,
            target: position,
            started: None,
            duration: Duration::ZERO,
            targets: Vec::new(),
        }
    }

    /// Folds a finished in-flight move into the settled position.
    fn settle(&mut self) {
        if let Some(started) = self.started {
            if started.elapsed() >= self.duration {
                self.position = self.target;
                self.started = None;
            }
        }
    }

    fn current(&self) -> f64 {
        match self.started {
            None => self.position,
            Some(started) => {
                let progress =
                    (started.elapsed().as_secs_f64() / self.duration.as_secs_f64()).min(1.0);
                self.from + (self.target - self.from) * progress
            }
        }
    }
}

impl MockAxis {
    /// Creates an instant-motion axis at position 0.0.
    pub fn new(name: &str) -> Self {
        Self::at(name, 0.0)
    }

    /// Creates an instant-motion axis at the given starting position.
    pub fn at(name: &str, position: f64) -> Self {
        Self {
            name: name.to_string(),
            speed: f64::INFINITY,
            fail_all: false,
            fail_on: None,
            state: Arc::new(RwLock::new(MotionState::at(position))),
        }
    }

    /// Creates an axis with finite travel speed in units per second.
    pub fn with_speed(name: &str, speed: f64) -> Self {
        Self {
            speed,
            ..Self::new(name)
        }
    }

    /// Creates an axis that refuses every move request.
    pub fn failing(name: &str) -> Self {
        Self {
            fail_all: true,
            ..Self::new(name)
        }
    }

    /// Creates an axis at `position` that refuses moves to one specific
    /// target, for exercising mid-scan and restoration failures.
    pub fn fail_on_target(name: &str, position: f64, target: f64) -> Self {
        Self {
            fail_on: Some(target),
            ..Self::at(name, position)
        }
    }

    /// Overrides the current position without recording a move.
    pub async fn set_position(&self, position: f64) {
        let mut state = self.state.write().await;
        *state = MotionState::at(position);
    }

    /// Every target this axis has been asked to move to, in order.
    pub async fn recorded_targets(&self) -> Vec<f64> {
        self.state.read().await.targets.clone()
    }
}

#[async_trait]
impl Axis for MockAxis {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_busy(&self) -> Result<bool> {
        let mut state = self.state.write().await;
        state.settle();
        Ok(state.started.is_some())
    }

    async fn position(&self) -> Result<f64> {
        let mut state = self.state.write().await;
        state.settle();
        Ok(state.current())
    }

    async fn start_move(&self, target: f64) -> Result<()> {
        if self.fail_all || self.fail_on == Some(target) {
            bail!("axis '{}' refused move to {}", self.name, target);
        }
        let mut state = self.state.write().await;
        state.settle();
        state.from = state.current();
        state.target = target;
        state.targets.push(target);
        if self.speed.is_finite() {
            state.duration =
                Duration::from_secs_f64((target - state.from).abs() / self.speed);
            state.started = Some(Instant::now());
        } else {
            state.position = target;
            state.started = None;
        }
        Ok(())
    }
}

/// Read-only device replaying a programmed sequence of readings.
///
/// Each call to [`Axis::position`] consumes the next value, cycling when
/// the sequence is exhausted. Attempting to move a detector is an error.
pub struct MockDetector {
    name: String,
    state: Arc<RwLock<DetectorState>>,
}

struct DetectorState {
    values: Vec<f64>,
    cursor: usize,
}

impl MockDetector {
    /// Creates a detector replaying `values` in order, cyclically.
    pub fn new(name: &str, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            state: Arc::new(RwLock::new(DetectorState { values, cursor: 0 })),
        }
    }
}

#[async_trait]
impl Axis for MockDetector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_busy(&self) -> Result<bool> {
        Ok(false)
    }

    async fn position(&self) -> Result<f64> {
        let mut state = self.state.write().await;
        if state.values.is_empty() {
            return Ok(0.0);
        }
        let value = state.values[state.cursor % state.values.len()];
        state.cursor += 1;
        Ok(value)
    }

    async fn start_move(&self, target: f64) -> Result<()> {
        bail!("detector '{}' cannot be moved (to {})", self.name, target);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
