//! The resolved scan specification.
//!
//! A [`ScanSpec`] is the typed result of argument conversion: an ordered
//! list of tagged entries saying what each axis does. Multi-dimensional
//! structure is positional — every non-following swept entry opens a new
//! dimension nested inside the previous one, and a [`ScanEntry::Nested`]
//! spec runs to completion at every point of its enclosing dimension
//! (Cartesian product semantics). The outermost dimension therefore
//! determines the point count of a simple scan.
//!
//! [`ScanSpec::plan`] flattens the spec into the [`ScanPlan`] the executor
//! consumes: nested dimensions of axis/position pairs, move-once targets,
//! and read-only monitors.

use crate::axis::{same_axis, AxisRef};
use crate::error::ScanError;
use crate::scan::region::Region;
use std::fmt;

/// What a single axis does during a scan.
#[derive(Clone)]
pub enum ScanEntry {
    /// Drive the axis through a linear sweep.
    Sweep {
        /// The swept axis.
        axis: AxisRef,
        /// Sweep bounds and step.
        region: Region,
        /// When set, the axis is locked to the preceding sweep's dimension
        /// and moves with it point-by-point instead of nesting inside it.
        follows: bool,
        /// Bounds are relative to the axis's position at scan start.
        relative: bool,
    },
    /// Drive the axis through an explicit position sequence.
    Path {
        /// The driven axis.
        axis: AxisRef,
        /// Absolute (or, before resolution, relative) positions in order.
        positions: Vec<f64>,
        /// Positions are relative to the axis's position at scan start.
        relative: bool,
    },
    /// Move the axis once, then hold for the whole scan.
    Move {
        /// The axis to position.
        axis: AxisRef,
        /// Target position.
        target: f64,
        /// Target is relative to the axis's position at scan start.
        relative: bool,
    },
    /// Read the axis at every point without moving it.
    Monitor {
        /// The observed axis.
        axis: AxisRef,
    },
    /// An inner scan run to completion at every point of the enclosing
    /// dimension.
    Nested(ScanSpec),
}

impl fmt::Debug for ScanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanEntry::Sweep { axis, region, follows, relative } => f
                .debug_struct("Sweep")
                .field("axis", &axis.name())
                .field("region", region)
                .field("follows", follows)
                .field("relative", relative)
                .finish(),
            ScanEntry::Path { axis, positions, relative } => f
                .debug_struct("Path")
                .field("axis", &axis.name())
                .field("points", &positions.len())
                .field("relative", relative)
                .finish(),
            ScanEntry::Move { axis, target, relative } => f
                .debug_struct("Move")
                .field("axis", &axis.name())
                .field("target", target)
                .field("relative", relative)
                .finish(),
            ScanEntry::Monitor { axis } => {
                f.debug_struct("Monitor").field("axis", &axis.name()).finish()
            }
            ScanEntry::Nested(spec) => f.debug_tuple("Nested").field(spec).finish(),
        }
    }
}

/// Ordered, fully converted description of a scan.
#[derive(Clone, Debug, Default)]
pub struct ScanSpec {
    /// Entries in command-line order.
    pub entries: Vec<ScanEntry>,
}

impl ScanSpec {
    /// An empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: ScanEntry) {
        self.entries.push(entry);
    }

    /// Every axis this scan drives (swept, pathed or moved once), in
    /// order of first appearance, without duplicates.
    pub fn moved_axes(&self) -> Vec<AxisRef> {
        let mut axes = Vec::new();
        self.collect_moved(&mut axes);
        axes
    }

    fn collect_moved(&self, axes: &mut Vec<AxisRef>) {
        for entry in &self.entries {
            let axis = match entry {
                ScanEntry::Sweep { axis, .. }
                | ScanEntry::Path { axis, .. }
                | ScanEntry::Move { axis, .. } => Some(axis),
                ScanEntry::Monitor { .. } => None,
                ScanEntry::Nested(inner) => {
                    inner.collect_moved(axes);
                    None
                }
            };
            if let Some(axis) = axis {
                if !axes.iter().any(|known| same_axis(known, axis)) {
                    axes.push(axis.clone());
                }
            }
        }
    }

    /// The subset of [`ScanSpec::moved_axes`] whose entries carry relative
    /// coordinates.
    pub fn relative_axes(&self) -> Vec<AxisRef> {
        let mut axes = Vec::new();
        self.collect_relative(&mut axes);
        axes
    }

    fn collect_relative(&self, axes: &mut Vec<AxisRef>) {
        for entry in &self.entries {
            let axis = match entry {
                ScanEntry::Sweep { axis, relative: true, .. }
                | ScanEntry::Path { axis, relative: true, .. }
                | ScanEntry::Move { axis, relative: true, .. } => Some(axis),
                ScanEntry::Nested(inner) => {
                    inner.collect_relative(axes);
                    None
                }
                _ => None,
            };
            if let Some(axis) = axis {
                if !axes.iter().any(|known| same_axis(known, axis)) {
                    axes.push(axis.clone());
                }
            }
        }
    }

    /// Whether the given axis participates in this scan in any role.
    pub fn contains_axis(&self, candidate: &AxisRef) -> bool {
        self.entries.iter().any(|entry| match entry {
            ScanEntry::Sweep { axis, .. }
            | ScanEntry::Path { axis, .. }
            | ScanEntry::Move { axis, .. }
            | ScanEntry::Monitor { axis } => same_axis(axis, candidate),
            ScanEntry::Nested(inner) => inner.contains_axis(candidate),
        })
    }

    /// Marks every moved entry as relative (the dscan family reuses an
    /// absolute conversion and flips the whole spec afterwards).
    pub fn mark_relative(&mut self) {
        for entry in &mut self.entries {
            match entry {
                ScanEntry::Sweep { relative, .. }
                | ScanEntry::Path { relative, .. }
                | ScanEntry::Move { relative, .. } => *relative = true,
                ScanEntry::Monitor { .. } => {}
                ScanEntry::Nested(inner) => inner.mark_relative(),
            }
        }
    }

    /// Shifts every relative entry by its axis's captured start position,
    /// turning converter-relative bounds into absolute device coordinates.
    pub fn apply_offsets(&mut self, offsets: &[(AxisRef, f64)]) {
        let offset_for = |axis: &AxisRef| {
            offsets
                .iter()
                .find(|(candidate, _)| same_axis(candidate, axis))
                .map(|(_, offset)| *offset)
        };
        for entry in &mut self.entries {
            match entry {
                ScanEntry::Sweep { axis, region, relative: true, .. } => {
                    if let Some(offset) = offset_for(axis) {
                        *region = region.offset(offset);
                    }
                }
                ScanEntry::Path { axis, positions, relative: true } => {
                    if let Some(offset) = offset_for(axis) {
                        for position in positions.iter_mut() {
                            *position += offset;
                        }
                    }
                }
                ScanEntry::Move { axis, target, relative: true } => {
                    if let Some(offset) = offset_for(axis) {
                        *target += offset;
                    }
                }
                ScanEntry::Nested(inner) => inner.apply_offsets(offsets),
                _ => {}
            }
        }
    }

    /// Flattens the spec into the executable plan: nested dimensions,
    /// move-once targets and monitors.
    pub fn plan(&self) -> Result<ScanPlan, ScanError> {
        let mut plan = ScanPlan {
            dimensions: Vec::new(),
            movers: Vec::new(),
            monitors: Vec::new(),
        };
        self.plan_into(&mut plan)?;
        Ok(plan)
    }

    fn plan_into(&self, plan: &mut ScanPlan) -> Result<(), ScanError> {
        for entry in &self.entries {
            match entry {
                ScanEntry::Sweep { axis, region, follows, .. } => {
                    let positions = region.positions();
                    if *follows {
                        let dimension = plan.dimensions.last_mut().ok_or_else(|| {
                            ScanError::syntax(format!(
                                "axis '{}' cannot move with a preceding sweep: there is none",
                                axis.name()
                            ))
                        })?;
                        if dimension.len() != positions.len() {
                            return Err(ScanError::syntax(format!(
                                "axes scanned together must cover the same number of \
                                 points ('{}' defines {}, expected {})",
                                axis.name(),
                                positions.len(),
                                dimension.len()
                            )));
                        }
                        dimension.axes.push(DimensionAxis {
                            axis: axis.clone(),
                            positions,
                        });
                    } else {
                        plan.dimensions.push(Dimension {
                            axes: vec![DimensionAxis {
                                axis: axis.clone(),
                                positions,
                            }],
                        });
                    }
                }
                ScanEntry::Path { axis, positions, .. } => {
                    if positions.is_empty() {
                        return Err(ScanError::syntax(format!(
                            "region list for axis '{}' expands to no positions",
                            axis.name()
                        )));
                    }
                    plan.dimensions.push(Dimension {
                        axes: vec![DimensionAxis {
                            axis: axis.clone(),
                            positions: positions.clone(),
                        }],
                    });
                }
                ScanEntry::Move { axis, target, .. } => {
                    plan.movers.push((axis.clone(), *target));
                }
                ScanEntry::Monitor { axis } => {
                    plan.monitors.push(axis.clone());
                }
                ScanEntry::Nested(inner) => inner.plan_into(plan)?,
            }
        }
        Ok(())
    }
}

/// One axis of a scan dimension with its per-point positions.
#[derive(Clone)]
pub struct DimensionAxis {
    /// The driven axis.
    pub axis: AxisRef,
    /// Position at each index of the dimension.
    pub positions: Vec<f64>,
}

/// A set of axes moved together through the same number of points.
///
/// Dimensions nest: the first dimension is the outermost loop, and each
/// later dimension runs to completion at every point of the one before it.
#[derive(Clone)]
pub struct Dimension {
    /// Axes locked to this dimension. All position lists share one length.
    pub axes: Vec<DimensionAxis>,
}

impl Dimension {
    /// Number of points in this dimension.
    pub fn len(&self) -> usize {
        self.axes.first().map_or(0, |a| a.positions.len())
    }

    /// Whether the dimension is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Executor-ready flattening of a [`ScanSpec`].
#[derive(Clone, Default)]
pub struct ScanPlan {
    /// Nested dimensions, outermost first.
    pub dimensions: Vec<Dimension>,
    /// Axes moved once at scan start, with their targets.
    pub movers: Vec<(AxisRef, f64)>,
    /// Axes read at every point.
    pub monitors: Vec<AxisRef>,
}

impl ScanPlan {
    /// Total number of points (Cartesian product of all dimensions; a scan
    /// with no dimension collects exactly one point).
    pub fn total_points(&self) -> usize {
        self.dimensions.iter().map(Dimension::len).product()
    }
}

impl std::fmt::Debug for ScanPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanPlan")
            .field(
                "dimensions",
                &self.dimensions.iter().map(Dimension::len).collect::<Vec<_>>(),
            )
            .field(
                "movers",
                &self
                    .movers
                    .iter()
                    .map(|(axis, target)| (axis.name().to_string(), *target))
                    .collect::<Vec<_>>(),
            )
            .field(
                "monitors",
                &self
                    .monitors
                    .iter()
                    .map(|axis| axis.name().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::mock::MockAxis;
    use std::sync::Arc;

    fn axis(name: &str) -> AxisRef {
        Arc::new(MockAxis::new(name))
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
    fn test_two_sweeps_nest() {
        let (sx, sy) = (axis("sx"), axis("sy"));
        let mut spec = ScanSpec::new();
        spec.push(sweep(&sx, 0.0, 2.0, 1.0));
        spec.push(sweep(&sy, 0.0, 1.0, 1.0));

        let plan = spec.plan().unwrap();
        assert_eq!(plan.dimensions.len(), 2);
        assert_eq!(plan.total_points(), 3 * 2);
    }

    #[test]
    fn test_following_sweep_shares_dimension() {
        let (sx, sy) = (axis("sx"), axis("sy"));
        let mut spec = ScanSpec::new();
        spec.push(sweep(&sx, 0.0, 4.0, 1.0));
        spec.push(ScanEntry::Sweep {
            axis: sy.clone(),
            region: Region::new(10.0, 18.0, 2.0),
            follows: true,
            relative: false,
        });

        let plan = spec.plan().unwrap();
        assert_eq!(plan.dimensions.len(), 1);
        assert_eq!(plan.dimensions[0].axes.len(), 2);
        assert_eq!(plan.total_points(), 5);
    }

    #[test]
    fn test_following_sweep_length_mismatch_rejected() {
        let (sx, sy) = (axis("sx"), axis("sy"));
        let mut spec = ScanSpec::new();
        spec.push(sweep(&sx, 0.0, 4.0, 1.0));
        spec.push(ScanEntry::Sweep {
            axis: sy.clone(),
            region: Region::new(0.0, 2.0, 1.0),
            follows: true,
            relative: false,
        });

        let err = spec.plan().unwrap_err();
        assert!(err.to_string().contains("same number of points"));
    }

    #[test]
    fn test_nested_spec_appends_inner_dimension() {
        let (sx, sy, diode) = (axis("sx"), axis("sy"), axis("diode"));
        let mut inner = ScanSpec::new();
        inner.push(sweep(&sy, 0.0, 1.0, 1.0));

        let mut spec = ScanSpec::new();
        spec.push(sweep(&sx, 0.0, 2.0, 1.0));
        spec.push(ScanEntry::Nested(inner));
        spec.push(ScanEntry::Monitor { axis: diode.clone() });

        let plan = spec.plan().unwrap();
        assert_eq!(plan.dimensions.len(), 2);
        assert_eq!(plan.monitors.len(), 1);
        assert_eq!(plan.total_points(), 6);

        let moved = spec.moved_axes();
        assert_eq!(moved.len(), 2);
        assert!(spec.contains_axis(&diode));
    }

    #[test]
    fn test_plan_with_no_dimensions_is_single_point() {
        let diode = axis("diode");
        let mut spec = ScanSpec::new();
        spec.push(ScanEntry::Monitor { axis: diode });
        assert_eq!(spec.plan().unwrap().total_points(), 1);
    }

    #[test]
    fn test_empty_path_rejected() {
        let sx = axis("sx");
        let mut spec = ScanSpec::new();
        spec.push(ScanEntry::Path {
            axis: sx,
            positions: Vec::new(),
            relative: false,
        });
        assert!(spec.plan().is_err());
    }

    #[test]
    fn test_mark_relative_and_apply_offsets() {
        let (sx, sy) = (axis("sx"), axis("sy"));
        let mut spec = ScanSpec::new();
        spec.push(sweep(&sx, -3.0, 3.0, 1.0));
        spec.push(ScanEntry::Move {
            axis: sy.clone(),
            target: 1.0,
            relative: false,
        });
        spec.mark_relative();
        assert_eq!(spec.relative_axes().len(), 2);

        spec.apply_offsets(&[(sx.clone(), 7.0), (sy.clone(), 100.0)]);
        match &spec.entries[0] {
            ScanEntry::Sweep { region, .. } => {
                assert_eq!((region.start, region.stop), (4.0, 10.0));
            }
            other => panic!("unexpected entry: {other:?}"),
        }
        match &spec.entries[1] {
            ScanEntry::Move { target, .. } => assert_eq!(*target, 101.0),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_offsets_skip_absolute_entries() {
        let sx = axis("sx");
        let mut spec = ScanSpec::new();
        spec.push(sweep(&sx, 0.0, 10.0, 2.0));
        spec.apply_offsets(&[(sx.clone(), 7.0)]);
        match &spec.entries[0] {
            ScanEntry::Sweep { region, .. } => {
                assert_eq!((region.start, region.stop), (0.0, 10.0));
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }
}
