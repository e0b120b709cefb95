//! The scan executor adapter.
//!
//! Construction ends here: the adapter flattens a resolved [`ScanSpec`]
//! plan into the [`ScanRequest`] the external engine consumes, hands over
//! the listeners in registration order, and awaits the engine's terminal
//! [`ScanOutcome`].
//!
//! The halted-vs-failed distinction is a value, not an exception: an
//! operator-requested stop comes back as [`ScanOutcome::Halted`] and is
//! never raised as an error anywhere in the crate.

use crate::scan::spec::ScanPlan;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Point counts of a finished (or stopped) scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Points the plan asked for.
    pub points_requested: usize,
    /// Points actually collected before the scan ended.
    pub points_collected: usize,
}

/// Terminal outcome of an engine run.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Every requested point was collected.
    Completed(ScanStats),
    /// The operator stopped the scan; not an error.
    Halted(ScanStats),
    /// The engine or an axis failed. Carries full context (axis name,
    /// attempted value) from the failure site.
    Failed(anyhow::Error),
}

/// One collected data point.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanPoint {
    /// Zero-based point index within the scan.
    pub index: usize,
    /// Collection timestamp.
    pub timestamp: DateTime<Utc>,
    /// Per-axis demanded/readback positions of every driven axis, in plan
    /// order.
    pub positions: Vec<(String, f64)>,
    /// Per-monitor readings (all position fields), in plan order.
    pub readings: Vec<(String, Vec<f64>)>,
}

impl ScanPoint {
    /// The first field of the first reading, the conventional "signal" of
    /// a one-detector scan.
    pub fn primary_reading(&self) -> Option<f64> {
        self.readings.first().and_then(|(_, values)| values.first().copied())
    }
}

/// External data processor notified once per collected point and once at
/// scan end. Listener internals are not this crate's concern; only the
/// registration order is.
pub trait ScanListener: Send + Sync {
    /// Called after each point is collected.
    fn point_collected(&self, point: &ScanPoint);
    /// Called exactly once when the scan ends, whatever the outcome.
    fn scan_ended(&self, stats: &ScanStats);
}

/// Everything the engine needs to run one scan.
pub struct ScanRequest {
    /// Annotated command string, for engine-side logging and metadata.
    pub command: String,
    /// Flattened dimensions, movers and monitors.
    pub plan: ScanPlan,
}

/// The external scan engine: iterates points, drives motion and data
/// collection, and reports a terminal outcome.
#[async_trait]
pub trait ScanEngine: Send + Sync {
    /// Runs one scan to a terminal outcome. Listeners must be invoked once
    /// per collected point and once at scan end, in the order given.
    async fn run_scan(
        &mut self,
        request: ScanRequest,
        listeners: &[Arc<dyn ScanListener>],
    ) -> ScanOutcome;
}

/// Owns the engine handle and the listener registration order.
pub struct ScanExecutor {
    engine: Box<dyn ScanEngine>,
    listeners: Vec<Arc<dyn ScanListener>>,
}

impl ScanExecutor {
    /// Wraps an engine with an empty listener list.
    pub fn new(engine: Box<dyn ScanEngine>) -> Self {
        Self {
            engine,
            listeners: Vec::new(),
        }
    }

    /// Registers a listener. Listeners fire in registration order.
    pub fn attach_listener(&mut self, listener: Arc<dyn ScanListener>) {
        self.listeners.push(listener);
    }

    /// Currently registered listeners, in order.
    pub fn listeners(&self) -> &[Arc<dyn ScanListener>] {
        &self.listeners
    }

    /// Submits one flattened plan to the engine and awaits its outcome.
    pub async fn execute(&mut self, command: &str, plan: ScanPlan) -> ScanOutcome {
        let request = ScanRequest {
            command: command.to_string(),
            plan,
        };
        self.engine.run_scan(request, &self.listeners).await
    }
}
