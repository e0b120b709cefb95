//! Relative/absolute resolution and guaranteed restoration.
//!
//! Relative scans are converted to absolute device coordinates here, not
//! in the converters: each participating axis's position is captured into
//! a [`RelativeScanContext`] immediately before execution and added to
//! every relative bound. The same context drives the restoration barrier —
//! captured axes are driven back to their pre-scan positions exactly once,
//! whether the engine completed, was stopped by the operator, or failed.
//!
//! An operator halt terminates quietly: after restoration it becomes a
//! report with `halted: true`, never an error. Any other engine failure
//! propagates only after restoration has run.

use crate::axis::AxisRef;
use crate::config::Settings;
use crate::error::{AppResult, ScanError};
use crate::metadata::ScanReport;
use crate::scan::executor::{ScanExecutor, ScanOutcome};
use crate::scan::spec::ScanSpec;
use chrono::Utc;
use futures::future::join_all;
use log::{info, warn};
use uuid::Uuid;

/// Pre-scan positions of the axes a scan must put back.
///
/// Created once per invocation and consumed by [`RelativeScanContext::restore`];
/// it never outlives the invocation.
pub struct RelativeScanContext {
    saved: Vec<(AxisRef, f64)>,
}

impl RelativeScanContext {
    /// Reads and records the current position of every given axis.
    pub async fn capture(axes: &[AxisRef]) -> AppResult<Self> {
        let mut saved = Vec::with_capacity(axes.len());
        for axis in axes {
            let position = axis.position().await?;
            saved.push((axis.clone(), position));
        }
        Ok(Self { saved })
    }

    /// Captured `(axis, position)` pairs, in capture order.
    pub fn saved(&self) -> &[(AxisRef, f64)] {
        &self.saved
    }

    /// Drives every captured axis back to its recorded position, verifying
    /// each within `tolerance`. All axes are attempted; failures are
    /// aggregated rather than short-circuiting.
    pub async fn restore(self, tolerance: f64) -> Result<(), ScanError> {
        let results = join_all(self.saved.iter().map(|(axis, position)| async move {
            if let Err(error) = axis.move_to(*position).await {
                return Err(format!("{}: {:#}", axis.name(), error));
            }
            match axis.position().await {
                Ok(now) if (now - position).abs() <= tolerance => Ok(()),
                Ok(now) => Err(format!(
                    "{}: ended at {} but expected {} (tolerance {})",
                    axis.name(),
                    now,
                    position,
                    tolerance
                )),
                Err(error) => Err(format!(
                    "{}: could not verify restored position: {:#}",
                    axis.name(),
                    error
                )),
            }
        }))
        .await;

        let failures: Vec<String> = results.into_iter().filter_map(Result::err).collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ScanError::Restore(failures))
        }
    }
}

/// Resolves a spec, runs it, and interprets the outcome — with the
/// restoration barrier in between.
///
/// `return_to_start` widens restoration from the relative axes to every
/// moved axis, independent of relativity (the rscan behaviour).
pub async fn run_with_restore(
    executor: &mut ScanExecutor,
    mut spec: ScanSpec,
    return_to_start: bool,
    command: &str,
    id: Uuid,
    settings: &Settings,
) -> AppResult<ScanReport> {
    // Structural problems must surface before any axis is touched.
    spec.plan()?;

    let capture_axes = if return_to_start {
        spec.moved_axes()
    } else {
        spec.relative_axes()
    };
    let context = if capture_axes.is_empty() {
        None
    } else {
        Some(RelativeScanContext::capture(&capture_axes).await?)
    };
    if let Some(context) = &context {
        spec.apply_offsets(context.saved());
    }
    let plan = spec.plan()?;

    let started = Utc::now();
    let outcome = executor.execute(command, plan).await;

    // Cleanup barrier: restoration runs exactly once, whatever the outcome.
    let restored = match context {
        Some(context) => context.restore(settings.position_tolerance).await,
        None => Ok(()),
    };

    match outcome {
        ScanOutcome::Failed(error) => {
            if let Err(restore_error) = restored {
                warn!("after scan failure, {}", restore_error);
            }
            Err(ScanError::Engine(error))
        }
        ScanOutcome::Halted(stats) => {
            warn!(
                "scan stopped by user after {} of {} points",
                stats.points_collected, stats.points_requested
            );
            restored?;
            Ok(ScanReport::new(id, command, started, stats, true))
        }
        ScanOutcome::Completed(stats) => {
            restored?;
            info!(
                "scan complete: {} points collected",
                stats.points_collected
            );
            Ok(ScanReport::new(id, command, started, stats, false))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::mock::MockAxis;
    use crate::axis::Axis;
    use crate::scan::region::Region;
    use crate::scan::spec::ScanEntry;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_capture_and_restore_round_trip() {
        let axis = Arc::new(MockAxis::at("sx", 7.0));
        let handle: AxisRef = axis.clone();

        let context = RelativeScanContext::capture(&[handle.clone()]).await.unwrap();
        handle.move_to(123.0).await.unwrap();

        context.restore(1e-9).await.unwrap();
        assert_eq!(axis.position().await.unwrap(), 7.0);
    }

    #[tokio::test]
    async fn test_restore_aggregates_failures() {
        let good = Arc::new(MockAxis::at("sx", 1.0));
        let bad: AxisRef = Arc::new(MockAxis::failing("broken"));
        let good_ref: AxisRef = good.clone();

        let context = RelativeScanContext {
            saved: vec![(good_ref, 1.0), (bad, 0.0)],
        };
        let err = context.restore(1e-9).await.unwrap_err();
        match err {
            ScanError::Restore(failures) => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].contains("broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // The healthy axis was still restored.
        assert_eq!(good.position().await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_offsets_translate_relative_bounds() {
        let axis = Arc::new(MockAxis::at("sx", 7.0));
        let handle: AxisRef = axis.clone();

        let mut spec = ScanSpec::new();
        spec.push(ScanEntry::Sweep {
            axis: handle.clone(),
            region: Region::new(-3.0, 3.0, 1.0),
            follows: false,
            relative: true,
        });

        let context = RelativeScanContext::capture(&spec.relative_axes()).await.unwrap();
        spec.apply_offsets(context.saved());

        let plan = spec.plan().unwrap();
        assert_eq!(
            plan.dimensions[0].axes[0].positions,
            vec![4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]
        );
    }
}
