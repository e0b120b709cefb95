//! The operator-facing scan commands.
//!
//! [`ScanCommand`] is the table of supported commands — name, usage string
//! and conversion strategy — and [`ScanRunner`] is the front-end that takes
//! one flat argument list through the whole pipeline: grouping, conversion,
//! default-axis injection, history annotation, relative resolution and
//! execution.
//!
//! The runner owns its default-axis list explicitly; there is no
//! process-wide registry. Defaults ride along as monitors on every scan
//! they are not already part of.

use crate::axis::{same_axis, AxisRef};
use crate::config::Settings;
use crate::error::{AppResult, ScanError};
use crate::metadata::ScanReport;
use crate::scan::args::{group_args, ScanArg};
use crate::scan::convert::{
    CentreConvert, CentreCountConvert, Converter, IntervalConvert, PassThroughConvert,
    RegionPathConvert, StaticConvert,
};
use crate::scan::executor::{ScanEngine, ScanExecutor, ScanListener};
use crate::scan::history::{describe, CommandHistory};
use crate::scan::resolver::run_with_restore;
use crate::scan::spec::{ScanEntry, ScanSpec};
use crate::scan::value::ScanValue;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

/// Every scan command the runner understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanCommand {
    /// Positional pass-through scan.
    Scan,
    /// Absolute sweep with the step derived from an interval count.
    Ascan,
    /// Two axes swept together through one dimension.
    A2scan,
    /// Three axes swept together through one dimension.
    A3scan,
    /// Second axis rastered inside the first.
    Mesh,
    /// Relative `ascan`; axes are restored afterwards.
    Dscan,
    /// Relative `a2scan`; axes are restored afterwards.
    D2scan,
    /// Relative `a3scan`; axes are restored afterwards.
    D3scan,
    /// Sweep centred on each axis's current position.
    Cscan,
    /// Centred sweep defined by step size and point count.
    Scancn,
    /// Absolute scan that returns every moved axis to its start.
    Rscan,
    /// Multi-region path scan.
    Mrscan,
    /// Single point, monitors only.
    Staticscan,
}

impl ScanCommand {
    /// All commands, in documentation order.
    pub const ALL: [ScanCommand; 13] = [
        ScanCommand::Scan,
        ScanCommand::Ascan,
        ScanCommand::A2scan,
        ScanCommand::A3scan,
        ScanCommand::Mesh,
        ScanCommand::Dscan,
        ScanCommand::D2scan,
        ScanCommand::D3scan,
        ScanCommand::Cscan,
        ScanCommand::Scancn,
        ScanCommand::Rscan,
        ScanCommand::Mrscan,
        ScanCommand::Staticscan,
    ];

    /// Command name as typed by the operator.
    pub fn name(self) -> &'static str {
        match self {
            ScanCommand::Scan => "scan",
            ScanCommand::Ascan => "ascan",
            ScanCommand::A2scan => "a2scan",
            ScanCommand::A3scan => "a3scan",
            ScanCommand::Mesh => "mesh",
            ScanCommand::Dscan => "dscan",
            ScanCommand::D2scan => "d2scan",
            ScanCommand::D3scan => "d3scan",
            ScanCommand::Cscan => "cscan",
            ScanCommand::Scancn => "scancn",
            ScanCommand::Rscan => "rscan",
            ScanCommand::Mrscan => "mrscan",
            ScanCommand::Staticscan => "staticscan",
        }
    }

    /// Usage string shown alongside syntax errors.
    pub fn usage(self) -> &'static str {
        match self {
            ScanCommand::Scan => {
                "scan axis [start stop step | position | (positions...)] [axis ...]"
            }
            ScanCommand::Ascan => "ascan axis start stop intervals [axis ...]",
            ScanCommand::A2scan => {
                "a2scan axis1 start1 stop1 intervals axis2 start2 stop2 intervals [axis ...]"
            }
            ScanCommand::A3scan => {
                "a3scan axis1 start1 stop1 intervals axis2 start2 stop2 intervals \
                 axis3 start3 stop3 intervals [axis ...]"
            }
            ScanCommand::Mesh => {
                "mesh axis1 start1 stop1 intervals1 axis2 start2 stop2 intervals2 [axis ...]"
            }
            ScanCommand::Dscan => "dscan axis relstart relstop intervals [axis ...]",
            ScanCommand::D2scan => {
                "d2scan axis1 relstart1 relstop1 intervals axis2 relstart2 relstop2 intervals \
                 [axis ...]"
            }
            ScanCommand::D3scan => {
                "d3scan axis1 relstart1 relstop1 intervals axis2 relstart2 relstop2 intervals \
                 axis3 relstart3 relstop3 intervals [axis ...]"
            }
            ScanCommand::Cscan => "cscan axis halfwidth step [axis halfwidth step ...] [axis ...]",
            ScanCommand::Scancn => "scancn axis stepsize numpoints [axis ...]",
            ScanCommand::Rscan => {
                "rscan axis start stop step [axis ...] | rscan axis (region, ...) [axis ...]"
            }
            ScanCommand::Mrscan => {
                "mrscan axis (region [, region ...]) [axis ...] \
                 where region = position | [start, stop, step]"
            }
            ScanCommand::Staticscan => "staticscan axis [axis ...]",
        }
    }

    /// Whether the scan returns every moved axis to its start position
    /// even though its coordinates are absolute.
    fn returns_to_start(self) -> bool {
        matches!(self, ScanCommand::Rscan)
    }

    /// Whether the command reinterprets absolute conversions as relative.
    fn marks_relative(self) -> bool {
        matches!(
            self,
            ScanCommand::Dscan | ScanCommand::D2scan | ScanCommand::D3scan
        )
    }

    /// Runs this command's conversion strategy over the grouped arguments.
    fn convert(self, groups: &[crate::scan::args::ArgGroup]) -> Result<ScanSpec, ScanError> {
        let converter: Box<dyn Converter> = match self {
            ScanCommand::Scan => Box::new(PassThroughConvert),
            ScanCommand::Ascan | ScanCommand::Dscan => {
                Box::new(IntervalConvert { axes: 1, nested: false })
            }
            ScanCommand::A2scan | ScanCommand::D2scan => {
                Box::new(IntervalConvert { axes: 2, nested: false })
            }
            ScanCommand::A3scan | ScanCommand::D3scan => {
                Box::new(IntervalConvert { axes: 3, nested: false })
            }
            ScanCommand::Mesh => Box::new(IntervalConvert { axes: 2, nested: true }),
            ScanCommand::Cscan => Box::new(CentreConvert),
            ScanCommand::Scancn => Box::new(CentreCountConvert),
            ScanCommand::Mrscan => Box::new(RegionPathConvert),
            ScanCommand::Rscan => {
                // Legacy region form: a single tuple parameter on the
                // leading axis.
                let legacy = groups
                    .first()
                    .map(|g| matches!(g.params.as_slice(), [ScanValue::List(_)]))
                    .unwrap_or(false);
                if legacy {
                    Box::new(RegionPathConvert)
                } else {
                    Box::new(PassThroughConvert)
                }
            }
            ScanCommand::Staticscan => Box::new(StaticConvert),
        };

        let mut spec = converter.convert(groups)?;
        if self.marks_relative() {
            spec.mark_relative();
        }
        Ok(spec)
    }
}

/// Front-end taking flat argument lists through grouping, conversion,
/// resolution and execution.
pub struct ScanRunner {
    executor: ScanExecutor,
    settings: Settings,
    defaults: Vec<AxisRef>,
    history: CommandHistory,
}

impl ScanRunner {
    /// Creates a runner submitting scans to the given engine.
    pub fn new(engine: Box<dyn ScanEngine>, settings: Settings) -> Self {
        let history = CommandHistory::new(settings.history_capacity);
        Self {
            executor: ScanExecutor::new(engine),
            settings,
            defaults: Vec::new(),
            history,
        }
    }

    /// Registers a listener invoked once per point and once at scan end.
    pub fn attach_listener(&mut self, listener: Arc<dyn ScanListener>) {
        self.executor.attach_listener(listener);
    }

    /// Adds an axis observed by every scan it does not already take part
    /// in. Adding the same handle twice is a no-op.
    pub fn add_default(&mut self, axis: AxisRef) {
        if !self.defaults.iter().any(|known| same_axis(known, &axis)) {
            info!("'{}' added to the default axes", axis.name());
            self.defaults.push(axis);
        }
    }

    /// Removes a default axis by identity. Returns whether it was present.
    pub fn remove_default(&mut self, axis: &AxisRef) -> bool {
        let before = self.defaults.len();
        self.defaults.retain(|known| !same_axis(known, axis));
        if self.defaults.len() != before {
            info!("'{}' removed from the default axes", axis.name());
            true
        } else {
            false
        }
    }

    /// Current default axes, in addition order.
    pub fn defaults(&self) -> &[AxisRef] {
        &self.defaults
    }

    /// Record of annotated command strings, oldest first.
    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Runs any command over a flat argument list.
    pub async fn run(
        &mut self,
        command: ScanCommand,
        args: Vec<ScanArg>,
    ) -> AppResult<ScanReport> {
        let groups = group_args(&args).map_err(|e| e.with_usage(command.usage()))?;
        let mut spec = command
            .convert(&groups)
            .map_err(|e| e.with_usage(command.usage()))?;

        for axis in &self.defaults {
            if !spec.contains_axis(axis) {
                spec.push(ScanEntry::Monitor { axis: axis.clone() });
            }
        }

        let text = describe(command.name(), &groups);
        let id = Uuid::new_v4();
        info!("starting scan {}: {}", id, text);
        self.history.record(id, text.clone());

        run_with_restore(
            &mut self.executor,
            spec,
            command.returns_to_start(),
            &text,
            id,
            &self.settings,
        )
        .await
    }

    /// `scan`: positional pass-through scan.
    pub async fn scan(&mut self, args: Vec<ScanArg>) -> AppResult<ScanReport> {
        self.run(ScanCommand::Scan, args).await
    }

    /// `ascan`: absolute sweep with a derived step.
    pub async fn ascan(&mut self, args: Vec<ScanArg>) -> AppResult<ScanReport> {
        self.run(ScanCommand::Ascan, args).await
    }

    /// `a2scan`: two axes swept together.
    pub async fn a2scan(&mut self, args: Vec<ScanArg>) -> AppResult<ScanReport> {
        self.run(ScanCommand::A2scan, args).await
    }

    /// `a3scan`: three axes swept together.
    pub async fn a3scan(&mut self, args: Vec<ScanArg>) -> AppResult<ScanReport> {
        self.run(ScanCommand::A3scan, args).await
    }

    /// `mesh`: second axis rastered inside the first.
    pub async fn mesh(&mut self, args: Vec<ScanArg>) -> AppResult<ScanReport> {
        self.run(ScanCommand::Mesh, args).await
    }

    /// `dscan`: relative `ascan` with guaranteed restoration.
    pub async fn dscan(&mut self, args: Vec<ScanArg>) -> AppResult<ScanReport> {
        self.run(ScanCommand::Dscan, args).await
    }

    /// `d2scan`: relative `a2scan` with guaranteed restoration.
    pub async fn d2scan(&mut self, args: Vec<ScanArg>) -> AppResult<ScanReport> {
        self.run(ScanCommand::D2scan, args).await
    }

    /// `d3scan`: relative `a3scan` with guaranteed restoration.
    pub async fn d3scan(&mut self, args: Vec<ScanArg>) -> AppResult<ScanReport> {
        self.run(ScanCommand::D3scan, args).await
    }

    /// `cscan`: sweep centred on the current position.
    pub async fn cscan(&mut self, args: Vec<ScanArg>) -> AppResult<ScanReport> {
        self.run(ScanCommand::Cscan, args).await
    }

    /// `scancn`: centred sweep defined by step size and point count.
    pub async fn scancn(&mut self, args: Vec<ScanArg>) -> AppResult<ScanReport> {
        self.run(ScanCommand::Scancn, args).await
    }

    /// `rscan`: absolute scan that returns every moved axis to its start.
    pub async fn rscan(&mut self, args: Vec<ScanArg>) -> AppResult<ScanReport> {
        self.run(ScanCommand::Rscan, args).await
    }

    /// `mrscan`: multi-region path scan.
    pub async fn mrscan(&mut self, args: Vec<ScanArg>) -> AppResult<ScanReport> {
        self.run(ScanCommand::Mrscan, args).await
    }

    /// `staticscan`: single point, monitors only.
    pub async fn staticscan(&mut self, args: Vec<ScanArg>) -> AppResult<ScanReport> {
        self.run(ScanCommand::Staticscan, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::mock::MockAxis;
    use crate::scan::args::ArgGroup;

    fn group(axis_name: &str, params: Vec<ScanValue>) -> ArgGroup {
        let axis: AxisRef = Arc::new(MockAxis::new(axis_name));
        ArgGroup { axis, params }
    }

    #[test]
    fn test_every_command_has_name_and_usage() {
        for command in ScanCommand::ALL {
            assert!(!command.name().is_empty());
            assert!(command.usage().starts_with(command.name()));
        }
    }

    #[test]
    fn test_dscan_marks_spec_relative() {
        let groups = vec![group(
            "sx",
            vec![
                ScanValue::Float(-1.0),
                ScanValue::Float(1.0),
                ScanValue::Int(4),
            ],
        )];
        let spec = ScanCommand::Dscan.convert(&groups).unwrap();
        assert_eq!(spec.relative_axes().len(), 1);

        let spec = ScanCommand::Ascan.convert(&groups).unwrap();
        assert!(spec.relative_axes().is_empty());
    }

    #[test]
    fn test_rscan_dispatches_on_legacy_region_form() {
        let region_groups = vec![group(
            "sx",
            vec![ScanValue::List(vec![
                ScanValue::Int(0),
                ScanValue::List(vec![
                    ScanValue::Int(1),
                    ScanValue::Int(3),
                    ScanValue::Int(1),
                ]),
            ])],
        )];
        let spec = ScanCommand::Rscan.convert(&region_groups).unwrap();
        assert!(matches!(&spec.entries[0], ScanEntry::Path { .. }));

        let sweep_groups = vec![group(
            "sx",
            vec![
                ScanValue::Float(0.0),
                ScanValue::Float(5.0),
                ScanValue::Float(1.0),
            ],
        )];
        let spec = ScanCommand::Rscan.convert(&sweep_groups).unwrap();
        assert!(matches!(&spec.entries[0], ScanEntry::Sweep { .. }));
    }
}
