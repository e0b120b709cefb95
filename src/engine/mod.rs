//! Simulated scan engine.
//!
//! [`SimEngine`] is a reference implementation of the
//! [`ScanEngine`](crate::scan::executor::ScanEngine) contract, good for
//! development and tests without hardware. It iterates the flattened plan
//! as nested loops (innermost dimension varying fastest), drives every axis
//! of a changing dimension concurrently, reads monitors at each point and
//! notifies listeners in order.
//!
//! Halting is cooperative: a [`HaltHandle`] raised by the operator is
//! polled between points, so the point in flight completes before the scan
//! stops. A pending halt request is cleared when a new scan starts.

use crate::axis::AxisRef;
use crate::config::Settings;
use crate::scan::executor::{ScanEngine, ScanListener, ScanOutcome, ScanPoint, ScanRequest, ScanStats};
use crate::scan::spec::{Dimension, ScanPlan};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cloneable operator stop request.
#[derive(Clone, Default)]
pub struct HaltHandle {
    flag: Arc<AtomicBool>,
}

impl HaltHandle {
    /// Creates an un-raised handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the running scan to stop after the current point.
    pub fn halt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    pub fn is_halted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clears a pending request.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Reference engine driving mock (or any) axes through a scan plan.
pub struct SimEngine {
    settings: Settings,
    halt: HaltHandle,
}

impl SimEngine {
    /// Creates an engine with the given execution settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            halt: HaltHandle::new(),
        }
    }

    /// Handle the operator uses to stop a running scan.
    pub fn halt_handle(&self) -> HaltHandle {
        self.halt.clone()
    }

    async fn execute(
        &self,
        plan: &ScanPlan,
        listeners: &[Arc<dyn ScanListener>],
        stats: &mut ScanStats,
    ) -> Result<bool> {
        // Hold-position axes are placed before the first point is taken.
        let movers: Vec<(AxisRef, f64)> = plan
            .movers
            .iter()
            .map(|(axis, target)| (axis.clone(), *target))
            .collect();
        self.move_point(&movers).await?;

        let sizes: Vec<usize> = plan.dimensions.iter().map(Dimension::len).collect();
        let mut previous: Option<Vec<usize>> = None;

        for index in 0..stats.points_requested {
            if self.halt.is_halted() {
                return Ok(false);
            }

            let indices = odometer(index, &sizes);
            let mut moves = Vec::new();
            for (level, dimension) in plan.dimensions.iter().enumerate() {
                let changed = previous
                    .as_ref()
                    .map_or(true, |last| last[level] != indices[level]);
                if changed {
                    for axis in &dimension.axes {
                        moves.push((axis.axis.clone(), axis.positions[indices[level]]));
                    }
                }
            }
            self.move_point(&moves).await?;
            previous = Some(indices);

            let point = self.collect_point(index, plan).await?;
            debug!(
                "point {}/{} collected",
                index + 1,
                stats.points_requested
            );
            for listener in listeners {
                listener.point_collected(&point);
            }
            stats.points_collected += 1;
        }
        Ok(true)
    }

    /// Starts every move of a point, then waits for each axis in turn. The
    /// first failure aborts the point with the axis and target named.
    async fn move_point(&self, moves: &[(AxisRef, f64)]) -> Result<()> {
        for (axis, target) in moves {
            axis.start_move(*target)
                .await
                .with_context(|| format!("moving axis '{}' to {}", axis.name(), target))?;
        }
        for (axis, target) in moves {
            self.wait_settled(axis)
                .await
                .with_context(|| format!("waiting for axis '{}' to reach {}", axis.name(), target))?;
        }
        Ok(())
    }

    async fn wait_settled(&self, axis: &AxisRef) -> Result<()> {
        let deadline = Instant::now() + self.settings.settle_timeout();
        while axis.is_busy().await? {
            if Instant::now() >= deadline {
                bail!(
                    "timed out after {:.1}s",
                    self.settings.settle_timeout_s
                );
            }
            tokio::time::sleep(self.settings.poll_interval()).await;
        }
        Ok(())
    }

    async fn collect_point(&self, index: usize, plan: &ScanPlan) -> Result<ScanPoint> {
        let mut positions = Vec::new();
        for dimension in &plan.dimensions {
            for axis in &dimension.axes {
                positions.push((axis.axis.name().to_string(), axis.axis.position().await?));
            }
        }
        for (axis, _) in &plan.movers {
            positions.push((axis.name().to_string(), axis.position().await?));
        }

        let mut readings = Vec::new();
        for monitor in &plan.monitors {
            readings.push((monitor.name().to_string(), monitor.positions().await?));
        }

        Ok(ScanPoint {
            index,
            timestamp: Utc::now(),
            positions,
            readings,
        })
    }
}

#[async_trait]
impl ScanEngine for SimEngine {
    async fn run_scan(
        &mut self,
        request: ScanRequest,
        listeners: &[Arc<dyn ScanListener>],
    ) -> ScanOutcome {
        // A leftover halt request belongs to the run it interrupted.
        self.halt.reset();

        let mut stats = ScanStats {
            points_requested: request.plan.total_points(),
            points_collected: 0,
        };
        info!(
            "running '{}' ({} points)",
            request.command, stats.points_requested
        );

        let result = self.execute(&request.plan, listeners, &mut stats).await;
        for listener in listeners {
            listener.scan_ended(&stats);
        }

        match result {
            Ok(true) => ScanOutcome::Completed(stats),
            Ok(false) => ScanOutcome::Halted(stats),
            Err(error) => {
                ScanOutcome::Failed(error.context(format!("command '{}'", request.command)))
            }
        }
    }
}

/// Mixed-radix decomposition of a flat point index; the last dimension
/// varies fastest.
fn odometer(index: usize, sizes: &[usize]) -> Vec<usize> {
    let mut indices = vec![0; sizes.len()];
    let mut remainder = index;
    for level in (0..sizes.len()).rev() {
        indices[level] = remainder % sizes[level];
        remainder /= sizes[level];
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::mock::{MockAxis, MockDetector};
    use crate::scan::executor::ScanExecutor;
    use crate::scan::region::Region;
    use crate::scan::spec::{ScanEntry, ScanSpec};
    use std::sync::Mutex;

    fn executor() -> (ScanExecutor, HaltHandle) {
        let engine = SimEngine::new(Settings::default());
        let halt = engine.halt_handle();
        (ScanExecutor::new(Box::new(engine)), halt)
    }

    fn sweep(axis: &AxisRef, start: f64, stop: f64, step: f64) -> ScanEntry {
        ScanEntry::Sweep {
            axis: axis.clone(),
            region: Region::new(start, stop, step),
            follows: false,
            relative: false,
        }
    }

    #[test]
    fn test_odometer_inner_fastest() {
        let sizes = [3, 2];
        let trail: Vec<Vec<usize>> = (0..6).map(|i| odometer(i, &sizes)).collect();
        assert_eq!(
            trail,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![1, 0],
                vec![1, 1],
                vec![2, 0],
                vec![2, 1]
            ]
        );
    }

    #[tokio::test]
    async fn test_raster_moves_outer_axis_once_per_row() {
        let sx = Arc::new(MockAxis::new("sx"));
        let sy = Arc::new(MockAxis::new("sy"));
        let (sx_ref, sy_ref): (AxisRef, AxisRef) = (sx.clone(), sy.clone());

        let mut spec = ScanSpec::new();
        spec.push(sweep(&sx_ref, 0.0, 2.0, 1.0));
        spec.push(sweep(&sy_ref, 0.0, 1.0, 1.0));

        let (mut executor, _halt) = executor();
        let outcome = executor.execute("scan", spec.plan().unwrap()).await;
        match outcome {
            ScanOutcome::Completed(stats) => assert_eq!(stats.points_collected, 6),
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert_eq!(sx.recorded_targets().await, vec![0.0, 1.0, 2.0]);
        assert_eq!(
            sy.recorded_targets().await,
            vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]
        );
    }

    #[tokio::test]
    async fn test_movers_placed_once_and_monitors_read() {
        let sx = Arc::new(MockAxis::new("sx"));
        let hold = Arc::new(MockAxis::new("sz"));
        let diode = Arc::new(MockDetector::new("diode", vec![1.0, 2.0, 3.0]));
        let (sx_ref, hold_ref, diode_ref): (AxisRef, AxisRef, AxisRef) =
            (sx.clone(), hold.clone(), diode.clone());

        let mut spec = ScanSpec::new();
        spec.push(sweep(&sx_ref, 0.0, 2.0, 1.0));
        spec.push(ScanEntry::Move {
            axis: hold_ref,
            target: 5.5,
            relative: false,
        });
        spec.push(ScanEntry::Monitor { axis: diode_ref });

        struct Collect {
            points: Mutex<Vec<ScanPoint>>,
        }
        impl ScanListener for Collect {
            fn point_collected(&self, point: &ScanPoint) {
                if let Ok(mut points) = self.points.lock() {
                    points.push(point.clone());
                }
            }
            fn scan_ended(&self, _stats: &ScanStats) {}
        }

        let collect = Arc::new(Collect {
            points: Mutex::new(Vec::new()),
        });
        let (mut executor, _halt) = executor();
        executor.attach_listener(collect.clone());

        let outcome = executor.execute("scan", spec.plan().unwrap()).await;
        assert!(matches!(outcome, ScanOutcome::Completed(_)));

        // Hold axis moved exactly once, before the first point.
        assert_eq!(hold.recorded_targets().await, vec![5.5]);

        let points = collect.points.lock().unwrap().clone();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].primary_reading(), Some(1.0));
        assert_eq!(points[2].primary_reading(), Some(3.0));
        // Every point reports the held axis position.
        assert!(points.iter().all(|p| p
            .positions
            .iter()
            .any(|(name, value)| name == "sz" && *value == 5.5)));
    }

    #[tokio::test]
    async fn test_halt_between_points() {
        let sx = Arc::new(MockAxis::new("sx"));
        let sx_ref: AxisRef = sx.clone();

        let mut spec = ScanSpec::new();
        spec.push(sweep(&sx_ref, 0.0, 9.0, 1.0));

        struct HaltAfter {
            after: usize,
            halt: HaltHandle,
        }
        impl ScanListener for HaltAfter {
            fn point_collected(&self, point: &ScanPoint) {
                if point.index + 1 == self.after {
                    self.halt.halt();
                }
            }
            fn scan_ended(&self, _stats: &ScanStats) {}
        }

        let (mut executor, halt) = executor();
        executor.attach_listener(Arc::new(HaltAfter { after: 3, halt }));

        let outcome = executor.execute("scan", spec.plan().unwrap()).await;
        match outcome {
            ScanOutcome::Halted(stats) => {
                assert_eq!(stats.points_collected, 3);
                assert_eq!(stats.points_requested, 10);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_axis_failure_reported_with_context() {
        let sx: AxisRef = Arc::new(MockAxis::failing("sx"));

        let mut spec = ScanSpec::new();
        spec.push(sweep(&sx, 0.0, 2.0, 1.0));

        let (mut executor, _halt) = executor();
        let outcome = executor.execute("scan sx 0 2 1", spec.plan().unwrap()).await;
        match outcome {
            ScanOutcome::Failed(error) => {
                let text = format!("{error:#}");
                assert!(text.contains("scan sx 0 2 1"));
                assert!(text.contains("moving axis 'sx' to 0"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
