//! Per-point scan processors.
//!
//! Processors are ordinary [`ScanListener`]s that accumulate live analysis
//! state while a scan runs and stay queryable afterwards — the operator
//! asks the processor, not the data files, for the last-known extremum.

use crate::scan::executor::{ScanListener, ScanPoint, ScanStats};
use log::info;
use serde::Serialize;
use std::sync::Mutex;

/// A located extremum of the primary reading.
#[derive(Clone, Debug, Serialize)]
pub struct Extremum {
    /// The extreme reading value.
    pub value: f64,
    /// Point index at which it occurred.
    pub index: usize,
    /// Driven-axis positions at that point.
    pub positions: Vec<(String, f64)>,
}

struct ExtremumState {
    minimum: Extremum,
    maximum: Extremum,
}

/// Tracks the running minimum and maximum of the primary reading.
///
/// State resets automatically when a new scan delivers its first point, so
/// one processor instance can stay attached across scans; after a scan it
/// answers for the most recent one.
#[derive(Default)]
pub struct ExtremumProcessor {
    state: Mutex<Option<ExtremumState>>,
}

impl ExtremumProcessor {
    /// Creates an empty processor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum of the most recent scan, if any point carried a reading.
    pub fn minimum(&self) -> Option<Extremum> {
        self.lock().as_ref().map(|state| state.minimum.clone())
    }

    /// Maximum of the most recent scan, if any point carried a reading.
    pub fn maximum(&self) -> Option<Extremum> {
        self.lock().as_ref().map(|state| state.maximum.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ExtremumState>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ScanListener for ExtremumProcessor {
    fn point_collected(&self, point: &ScanPoint) {
        let mut state = self.lock();
        if point.index == 0 {
            *state = None;
        }
        let Some(value) = point.primary_reading() else {
            return;
        };
        let here = Extremum {
            value,
            index: point.index,
            positions: point.positions.clone(),
        };
        match state.as_mut() {
            None => {
                *state = Some(ExtremumState {
                    minimum: here.clone(),
                    maximum: here,
                });
            }
            Some(state) => {
                if value < state.minimum.value {
                    state.minimum = here.clone();
                }
                if value > state.maximum.value {
                    state.maximum = here;
                }
            }
        }
    }

    fn scan_ended(&self, stats: &ScanStats) {
        let state = self.lock();
        if let Some(state) = state.as_ref() {
            info!(
                "extrema over {} points: min {} at point {}, max {} at point {}",
                stats.points_collected,
                state.minimum.value,
                state.minimum.index,
                state.maximum.value,
                state.maximum.index
            );
        }
    }
}
