//! Region normalization and expansion.
//!
//! A region is the `[start, stop, step]` descriptor of a linear sweep. The
//! shorthand forms accepted on the command line — a bare number for "move
//! here and hold", a tuple mixing numbers and triples — are canonicalised
//! here before any command-specific interpretation happens.
//!
//! Expansion of a region list is a *concatenation* of each region's own
//! sweep: three consecutive segments with different step sizes yield one
//! contiguous 1-D path, never a merged single-step range and never a
//! Cartesian product.

use crate::error::ScanError;
use crate::scan::value::ScanValue;
use serde::{Deserialize, Serialize};

/// Floating-point slack when deciding whether a sweep's endpoint is
/// reached. Keeps `6 → 10 step 0.1` at 41 points instead of 40.
const STEP_TOLERANCE: f64 = 1e-9;

/// Canonical `[start, stop, step]` sweep descriptor.
///
/// A region whose `start` equals its `stop` is a single point: "move here
/// and hold, do not sweep".
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// First position of the sweep.
    pub start: f64,
    /// Last position of the sweep (inclusive).
    pub stop: f64,
    /// Signed increment between positions.
    pub step: f64,
}

impl Region {
    /// Builds a region, correcting the step's sign to walk from `start`
    /// toward `stop`.
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        let step = if (stop - start) < 0.0 {
            -step.abs()
        } else {
            step.abs()
        };
        Self { start, stop, step }
    }

    /// The `[v, v, 1]` single-point region.
    pub fn point(value: f64) -> Self {
        Self {
            start: value,
            stop: value,
            step: 1.0,
        }
    }

    /// Whether this region holds at a single position.
    pub fn is_point(&self) -> bool {
        self.start == self.stop
    }

    /// Number of positions the sweep visits, endpoints inclusive.
    ///
    /// Degenerate regions (zero width, zero or non-finite step, or a step
    /// walking away from `stop`) collapse to a single position rather than
    /// failing.
    pub fn point_count(&self) -> usize {
        if self.is_point() || self.step == 0.0 {
            return 1;
        }
        let span = (self.stop - self.start) / self.step;
        if !span.is_finite() || span < 0.0 {
            return 1;
        }
        (span + STEP_TOLERANCE).floor() as usize + 1
    }

    /// The positions of the sweep, in order.
    pub fn positions(&self) -> Vec<f64> {
        let count = self.point_count();
        (0..count)
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }

    /// The same sweep shifted by `offset` (used to translate relative
    /// bounds into absolute device coordinates).
    pub fn offset(&self, offset: f64) -> Self {
        Self {
            start: self.start + offset,
            stop: self.stop + offset,
            step: self.step,
        }
    }
}

/// Canonicalises a single region descriptor: a bare number becomes the
/// `[v, v, 1]` point region, a three-element numeric list is kept as-is.
///
/// Anything else is a [`ScanError::MalformedRegion`] naming the offending
/// value.
pub fn normalize(value: &ScanValue) -> Result<Region, ScanError> {
    normalize_at(value, 0)
}

/// Canonicalises every element of a region tuple.
pub fn normalize_regions(values: &[ScanValue]) -> Result<Vec<Region>, ScanError> {
    values
        .iter()
        .enumerate()
        .map(|(position, value)| normalize_at(value, position))
        .collect()
}

/// Expands a region list into one contiguous position path: the
/// concatenation of each region's own sweep, in order.
pub fn expand_regions(regions: &[Region]) -> Vec<f64> {
    regions.iter().flat_map(Region::positions).collect()
}

fn normalize_at(value: &ScanValue, position: usize) -> Result<Region, ScanError> {
    if let Some(number) = value.as_f64() {
        return Ok(Region::point(number));
    }
    if let Some(items) = value.as_list() {
        if items.len() == 3 {
            if let (Some(start), Some(stop), Some(step)) = (
                items[0].as_f64(),
                items[1].as_f64(),
                items[2].as_f64(),
            ) {
                return Ok(Region::new(start, stop, step));
            }
        }
    }
    Err(ScanError::MalformedRegion {
        value: value.to_string(),
        position,
    })
}
