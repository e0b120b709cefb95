//! Per-command argument conversion.
//!
//! Each scan command owns a conversion strategy that turns the grouped
//! argument structure into a canonical [`ScanSpec`]. Converters are the
//! only place where the *meaning* of positional parameters lives: the same
//! three numbers are `(start, stop, step)` to `scan` and
//! `(start, stop, intervals)` to `ascan`.
//!
//! Syntax errors raised here carry a message only; the command layer
//! attaches its usage string before the error reaches the operator. All
//! converters permit extra trailing groups beyond their fixed-arity
//! leading ones; those pass through positionally, unchanged.

use crate::error::ScanError;
use crate::scan::args::ArgGroup;
use crate::scan::region::{expand_regions, normalize_regions, Region};
use crate::scan::spec::{ScanEntry, ScanSpec};
use crate::scan::value::ScanValue;

/// A command's conversion strategy from grouped arguments to a spec.
pub trait Converter: Send + Sync {
    /// Converts grouped arguments into a canonical scan spec.
    fn convert(&self, groups: &[ArgGroup]) -> Result<ScanSpec, ScanError>;
}

/// Interprets a group positionally, with no derivation:
/// no parameters = monitor, one number = move-once,
/// `(start, stop, step)` = sweep, one tuple = explicit position path.
pub(crate) fn positional_entry(group: &ArgGroup) -> Result<ScanEntry, ScanError> {
    match group.params.as_slice() {
        [] => Ok(ScanEntry::Monitor {
            axis: group.axis.clone(),
        }),
        [value] if value.is_number() => Ok(ScanEntry::Move {
            axis: group.axis.clone(),
            // Checked numeric just above.
            target: value.as_f64().unwrap_or_default(),
            relative: false,
        }),
        [ScanValue::List(items)] => {
            let regions = normalize_regions(items)?;
            Ok(ScanEntry::Path {
                axis: group.axis.clone(),
                positions: expand_regions(&regions),
                relative: false,
            })
        }
        [start, stop, step] if start.is_number() && stop.is_number() && step.is_number() => {
            Ok(ScanEntry::Sweep {
                axis: group.axis.clone(),
                region: Region::new(
                    start.as_f64().unwrap_or_default(),
                    stop.as_f64().unwrap_or_default(),
                    step.as_f64().unwrap_or_default(),
                ),
                follows: false,
                relative: false,
            })
        }
        params => Err(ScanError::syntax(format!(
            "cannot interpret parameters for axis '{}': expected none, a position, \
             (start, stop, step) or a region tuple, got {}",
            group.axis.name(),
            display_params(params)
        ))),
    }
}

fn display_params(params: &[ScanValue]) -> String {
    params
        .iter()
        .map(ScanValue::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads a group's parameters as exactly `count` numbers.
fn fixed_numbers(group: &ArgGroup, count: usize, what: &str) -> Result<Vec<f64>, ScanError> {
    let numbers: Option<Vec<f64>> = group.params.iter().map(ScanValue::as_f64).collect();
    match numbers {
        Some(numbers) if numbers.len() == count => Ok(numbers),
        _ => Err(ScanError::syntax(format!(
            "axis '{}' needs {}, got {}",
            group.axis.name(),
            what,
            display_params(&group.params)
        ))),
    }
}

/// Reads a whole, at-least-one count parameter.
fn whole_count(value: f64, what: &str, axis: &str) -> Result<f64, ScanError> {
    if value.fract() != 0.0 {
        return Err(ScanError::syntax(format!(
            "{what} for axis '{axis}' must be a whole number, got {value}"
        )));
    }
    if value < 1.0 {
        return Err(ScanError::syntax(format!(
            "{what} for axis '{axis}' must be at least 1, got {value}"
        )));
    }
    Ok(value)
}

// =============================================================================
// Converters
// =============================================================================

/// `scan`: pure pass-through — every group is already in final positional
/// form.
pub struct PassThroughConvert;

impl Converter for PassThroughConvert {
    fn convert(&self, groups: &[ArgGroup]) -> Result<ScanSpec, ScanError> {
        let mut spec = ScanSpec::new();
        for group in groups {
            spec.push(positional_entry(group)?);
        }
        Ok(spec)
    }
}

/// The ascan family: `axes` leading groups each carry
/// `(start, stop, intervals)` and the step is derived as
/// `(stop - start) / intervals`.
///
/// With `nested` unset the leading axes are locked together into one
/// dimension (`a2scan`, `a3scan`); with it set each further axis nests
/// inside the previous one (`mesh`).
pub struct IntervalConvert {
    /// Number of fixed-arity leading groups.
    pub axes: usize,
    /// Nest the leading axes instead of locking them together.
    pub nested: bool,
}

impl Converter for IntervalConvert {
    fn convert(&self, groups: &[ArgGroup]) -> Result<ScanSpec, ScanError> {
        if groups.len() < self.axes {
            return Err(ScanError::syntax(format!(
                "expected {} swept axes, got {}",
                self.axes,
                groups.len()
            )));
        }

        let mut sweeps = Vec::with_capacity(self.axes);
        let mut counts = Vec::with_capacity(self.axes);
        for (index, group) in groups[..self.axes].iter().enumerate() {
            let numbers = fixed_numbers(group, 3, "(start, stop, intervals)")?;
            let (start, stop) = (numbers[0], numbers[1]);
            let intervals = whole_count(numbers[2], "interval count", group.axis.name())?;
            counts.push(intervals);
            sweeps.push(ScanEntry::Sweep {
                axis: group.axis.clone(),
                region: Region::new(start, stop, (stop - start) / intervals),
                follows: !self.nested && index > 0,
                relative: false,
            });
        }

        if !self.nested && counts.windows(2).any(|pair| pair[0] != pair[1]) {
            return Err(ScanError::syntax(
                "axes scanned together must share the same interval count",
            ));
        }

        let mut spec = ScanSpec::new();
        let mut leading = sweeps.into_iter();
        if let Some(first) = leading.next() {
            spec.push(first);
        }
        let rest: Vec<ScanEntry> = leading.collect();
        if !rest.is_empty() {
            if self.nested {
                spec.push(ScanEntry::Nested(nest_chain(rest)));
            } else {
                for entry in rest {
                    spec.push(entry);
                }
            }
        }

        for group in &groups[self.axes..] {
            spec.push(positional_entry(group)?);
        }
        Ok(spec)
    }
}

/// Wraps sweeps into a chain of nested specs, deepest last.
fn nest_chain(entries: Vec<ScanEntry>) -> ScanSpec {
    let mut inner: Option<ScanSpec> = None;
    for entry in entries.into_iter().rev() {
        let mut spec = ScanSpec::new();
        spec.push(entry);
        if let Some(deeper) = inner.take() {
            spec.push(ScanEntry::Nested(deeper));
        }
        inner = Some(spec);
    }
    inner.unwrap_or_default()
}

/// `cscan`: leading `(halfwidth, step)` groups sweep `[-hw, +hw]` around
/// each axis's position at scan start.
pub struct CentreConvert;

impl Converter for CentreConvert {
    fn convert(&self, groups: &[ArgGroup]) -> Result<ScanSpec, ScanError> {
        let mut spec = ScanSpec::new();
        let mut pass_through = false;
        for group in groups {
            if !pass_through {
                let pair: Option<Vec<f64>> =
                    group.params.iter().map(ScanValue::as_f64).collect();
                match pair.as_deref() {
                    Some([halfwidth, step]) => {
                        let halfwidth = halfwidth.abs();
                        spec.push(ScanEntry::Sweep {
                            axis: group.axis.clone(),
                            region: Region::new(-halfwidth, halfwidth, *step),
                            follows: false,
                            relative: true,
                        });
                        continue;
                    }
                    _ => {
                        // A group without exactly (halfwidth, step) switches
                        // this and every later group to plain positional
                        // interpretation, so read-only axes can trail a
                        // centred scan. A mistyped pair lands here too and
                        // is accepted the same way.
                        pass_through = true;
                    }
                }
            }
            spec.push(positional_entry(group)?);
        }
        Ok(spec)
    }
}

/// `scancn`: the sole leading group carries `(stepsize, numpoints)`; the
/// sweep is centred on the axis's position at scan start with
/// `intervals = numpoints - 1`.
pub struct CentreCountConvert;

impl Converter for CentreCountConvert {
    fn convert(&self, groups: &[ArgGroup]) -> Result<ScanSpec, ScanError> {
        let Some(lead) = groups.first() else {
            return Err(ScanError::syntax("expected at least one axis"));
        };
        let numbers = fixed_numbers(lead, 2, "(stepsize, numpoints)")?;
        let step = numbers[0];
        let numpoints = whole_count(numbers[1], "number of points", lead.axis.name())?;

        let intervals = numpoints - 1.0;
        let halfwidth = step.abs() * intervals / 2.0;

        let mut spec = ScanSpec::new();
        spec.push(ScanEntry::Sweep {
            axis: lead.axis.clone(),
            region: Region::new(-halfwidth, halfwidth, step),
            follows: false,
            relative: true,
        });
        for group in &groups[1..] {
            spec.push(positional_entry(group)?);
        }
        Ok(spec)
    }
}

/// `mrscan`: the leading group's single tuple-of-regions parameter expands
/// into one contiguous position path.
pub struct RegionPathConvert;

impl Converter for RegionPathConvert {
    fn convert(&self, groups: &[ArgGroup]) -> Result<ScanSpec, ScanError> {
        let Some(lead) = groups.first() else {
            return Err(ScanError::syntax("expected at least one axis"));
        };
        let items = match lead.params.as_slice() {
            [ScanValue::List(items)] => items,
            params => {
                return Err(ScanError::syntax(format!(
                    "axis '{}' needs a single region tuple, got {}",
                    lead.axis.name(),
                    display_params(params)
                )))
            }
        };
        let regions = normalize_regions(items)?;

        let mut spec = ScanSpec::new();
        spec.push(ScanEntry::Path {
            axis: lead.axis.clone(),
            positions: expand_regions(&regions),
            relative: false,
        });
        for group in &groups[1..] {
            spec.push(positional_entry(group)?);
        }
        Ok(spec)
    }
}

/// `staticscan`: monitor-only single point; every group must be
/// parameterless.
pub struct StaticConvert;

impl Converter for StaticConvert {
    fn convert(&self, groups: &[ArgGroup]) -> Result<ScanSpec, ScanError> {
        let mut spec = ScanSpec::new();
        for group in groups {
            if !group.params.is_empty() {
                return Err(ScanError::syntax(format!(
                    "takes axes only, but axis '{}' has parameters {}",
                    group.axis.name(),
                    display_params(&group.params)
                )));
            }
            spec.push(ScanEntry::Monitor {
                axis: group.axis.clone(),
            });
        }
        Ok(spec)
    }
}
