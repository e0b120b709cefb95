//! Argument grouping.
//!
//! A scan command receives one flat, heterogeneous argument list. The
//! grouper partitions it into ordered [`ArgGroup`]s, one per axis: each
//! axis encountered left-to-right opens a new group, and every non-axis
//! value attaches to the most recently opened group as a raw parameter.
//!
//! Grouping assigns no meaning to the parameters — whether a number is a
//! stop, a step or an interval count is strictly the converters' business.

use crate::axis::{same_axis, AxisRef};
use crate::error::ScanError;
use crate::scan::value::ScanValue;
use std::fmt;

/// One element of a scan command's flat argument list.
#[derive(Clone)]
pub enum ScanArg {
    /// An axis reference; opens a new argument group.
    Axis(AxisRef),
    /// A raw parameter attached to the preceding axis.
    Value(ScanValue),
}

impl fmt::Debug for ScanArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanArg::Axis(axis) => write!(f, "Axis({})", axis.name()),
            ScanArg::Value(value) => write!(f, "Value({})", value),
        }
    }
}

impl From<AxisRef> for ScanArg {
    fn from(axis: AxisRef) -> Self {
        ScanArg::Axis(axis)
    }
}

impl From<f64> for ScanArg {
    fn from(value: f64) -> Self {
        ScanArg::Value(ScanValue::Float(value))
    }
}

impl From<i64> for ScanArg {
    fn from(value: i64) -> Self {
        ScanArg::Value(ScanValue::Int(value))
    }
}

impl From<ScanValue> for ScanArg {
    fn from(value: ScanValue) -> Self {
        ScanArg::Value(value)
    }
}

impl From<Vec<ScanValue>> for ScanArg {
    fn from(items: Vec<ScanValue>) -> Self {
        ScanArg::Value(ScanValue::List(items))
    }
}

/// An axis together with the raw parameters that followed it.
#[derive(Clone)]
pub struct ArgGroup {
    /// The axis heading this group.
    pub axis: AxisRef,
    /// Raw parameters collected up to the next axis, in order.
    pub params: Vec<ScanValue>,
}

impl fmt::Debug for ArgGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgGroup")
            .field("axis", &self.axis.name())
            .field("params", &self.params)
            .finish()
    }
}

/// Partitions a flat argument list into axis-headed groups.
///
/// Fails if the list does not begin with an axis (a scan must always start
/// by naming what it moves) or if the same axis heads two groups in one
/// invocation.
pub fn group_args(args: &[ScanArg]) -> Result<Vec<ArgGroup>, ScanError> {
    let mut groups: Vec<ArgGroup> = Vec::new();

    for arg in args {
        match arg {
            ScanArg::Axis(axis) => {
                if groups.iter().any(|g| same_axis(&g.axis, axis)) {
                    return Err(ScanError::syntax(format!(
                        "axis '{}' appears more than once in the argument list",
                        axis.name()
                    )));
                }
                groups.push(ArgGroup {
                    axis: axis.clone(),
                    params: Vec::new(),
                });
            }
            ScanArg::Value(value) => match groups.last_mut() {
                Some(group) => group.params.push(value.clone()),
                None => {
                    return Err(ScanError::syntax(
                        "first argument to scan command must be an axis",
                    ))
                }
            },
        }
    }

    if groups.is_empty() {
        return Err(ScanError::syntax(
            "first argument to scan command must be an axis",
        ));
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::mock::MockAxis;
    use std::sync::Arc;

    fn axis(name: &str) -> AxisRef {
        Arc::new(MockAxis::new(name))
    }

    #[test]
    fn test_grouping_determinism() {
        let (sx, sy) = (axis("sx"), axis("sy"));
        let args = vec![
            ScanArg::from(sx.clone()),
            ScanArg::from(0.0),
            ScanArg::from(10.0),
            ScanArg::from(1.0),
            ScanArg::from(sy.clone()),
            ScanArg::from(2.5),
        ];

        let groups = group_args(&args).unwrap();
        assert_eq!(groups.len(), 2);
        assert!(same_axis(&groups[0].axis, &sx));
        assert_eq!(
            groups[0].params,
            vec![
                ScanValue::Float(0.0),
                ScanValue::Float(10.0),
                ScanValue::Float(1.0)
            ]
        );
        assert!(same_axis(&groups[1].axis, &sy));
        assert_eq!(groups[1].params, vec![ScanValue::Float(2.5)]);

        // No element dropped or duplicated.
        let total: usize = groups.iter().map(|g| 1 + g.params.len()).sum();
        assert_eq!(total, args.len());
    }

    #[test]
    fn test_parameterless_groups() {
        let (sx, diode) = (axis("sx"), axis("diode"));
        let args = vec![ScanArg::from(sx), ScanArg::from(diode)];
        let groups = group_args(&args).unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups[0].params.is_empty());
        assert!(groups[1].params.is_empty());
    }

    #[test]
    fn test_first_argument_must_be_axis() {
        let args = vec![ScanArg::from(1.0), ScanArg::from(2.0), ScanArg::from(3.0)];
        let err = group_args(&args).unwrap_err();
        assert!(err
            .to_string()
            .contains("first argument to scan command must be an axis"));
    }

    #[test]
    fn test_empty_argument_list_rejected() {
        assert!(group_args(&[]).is_err());
    }

    #[test]
    fn test_duplicate_axis_rejected() {
        let sx = axis("sx");
        let args = vec![
            ScanArg::from(sx.clone()),
            ScanArg::from(0.0),
            ScanArg::from(sx.clone()),
            ScanArg::from(1.0),
        ];
        let err = group_args(&args).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_same_name_different_axis_is_allowed() {
        // Identity, not name, decides duplication.
        let args = vec![ScanArg::from(axis("sx")), ScanArg::from(axis("sx"))];
        assert_eq!(group_args(&args).unwrap().len(), 2);
    }
}
