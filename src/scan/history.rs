//! Command annotation and history.
//!
//! Downstream metadata systems key on the canonical command string, so it
//! is rebuilt token-by-token from the grouped arguments in their original
//! order: command name, then each axis name followed by its raw,
//! pre-conversion parameters. Formatting precision is not a correctness
//! invariant — presence and ordering are.

use crate::scan::args::ArgGroup;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Builds the canonical command string for one invocation.
pub fn describe(command: &str, groups: &[ArgGroup]) -> String {
    let mut tokens = vec![command.to_string()];
    for group in groups {
        tokens.push(group.axis.name().to_string());
        for param in &group.params {
            tokens.push(param.to_string());
        }
    }
    tokens.join(" ")
}

/// One recorded invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Scan id shared with the scan's report.
    pub id: Uuid,
    /// Canonical command string.
    pub command: String,
    /// When the command was issued.
    pub at: DateTime<Utc>,
}

/// Bounded record of annotated command strings, newest last.
pub struct CommandHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl CommandHistory {
    /// Creates a history retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    /// Records an invocation, evicting the oldest entry when full.
    pub fn record(&mut self, id: Uuid, command: String) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            id,
            command,
            at: Utc::now(),
        });
    }

    /// The most recent entry.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// All retained entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any entry is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::mock::MockAxis;
    use crate::axis::AxisRef;
    use crate::scan::value::ScanValue;
    use std::sync::Arc;

    fn group(name: &str, params: Vec<ScanValue>) -> ArgGroup {
        let axis: AxisRef = Arc::new(MockAxis::new(name));
        ArgGroup { axis, params }
    }

    #[test]
    fn test_describe_preserves_order() {
        let groups = vec![
            group(
                "sx",
                vec![
                    ScanValue::Int(0),
                    ScanValue::Int(10),
                    ScanValue::Float(2.5),
                ],
            ),
            group("diode", vec![]),
        ];
        assert_eq!(describe("ascan", &groups), "ascan sx 0 10 2.5 diode");
    }

    #[test]
    fn test_describe_region_tuple() {
        let tuple = ScanValue::List(vec![
            ScanValue::Int(1),
            ScanValue::List(vec![ScanValue::Int(2), ScanValue::Int(4), ScanValue::Int(1)]),
        ]);
        let groups = vec![group("sx", vec![tuple])];
        assert_eq!(describe("mrscan", &groups), "mrscan sx (1, (2, 4, 1))");
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = CommandHistory::new(2);
        history.record(Uuid::new_v4(), "scan sx 0 1 1".into());
        history.record(Uuid::new_v4(), "scan sx 0 2 1".into());
        history.record(Uuid::new_v4(), "scan sx 0 3 1".into());

        assert_eq!(history.len(), 2);
        let commands: Vec<_> = history.iter().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["scan sx 0 2 1", "scan sx 0 3 1"]);
        assert_eq!(history.latest().map(|e| e.command.as_str()), Some("scan sx 0 3 1"));
    }
}
