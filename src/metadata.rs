//! Scan metadata records.
//!
//! A [`ScanReport`] is the durable record of one scan invocation: its id,
//! the canonical command string downstream systems key on, timing, point
//! counts and whether the operator stopped it. Reports are plain serde
//! values so they can be written alongside the acquired data or embedded in
//! a self-describing file by whatever storage layer sits above this crate.

use crate::scan::executor::ScanStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record of one scan invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanReport {
    /// Unique id, shared with the command-history entry.
    pub id: Uuid,
    /// Canonical command string.
    pub command: String,
    /// When execution began.
    pub started: DateTime<Utc>,
    /// When execution (and restoration, if any) finished.
    pub finished: DateTime<Utc>,
    /// Points the plan asked for.
    pub points_requested: usize,
    /// Points actually collected.
    pub points_collected: usize,
    /// Whether the operator stopped the scan early.
    pub halted: bool,
}

impl ScanReport {
    /// Builds a report from a finished run.
    pub fn new(
        id: Uuid,
        command: &str,
        started: DateTime<Utc>,
        stats: ScanStats,
        halted: bool,
    ) -> Self {
        Self {
            id,
            command: command.to_string(),
            started,
            finished: Utc::now(),
            points_requested: stats.points_requested,
            points_collected: stats.points_collected,
            halted,
        }
    }

    /// Whether every requested point was collected.
    pub fn completed(&self) -> bool {
        !self.halted && self.points_collected == self.points_requested
    }

    /// Wall-clock duration of the run.
    pub fn duration(&self) -> chrono::Duration {
        self.finished - self.started
    }

    /// Pretty JSON form, for writing alongside the acquired data.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
