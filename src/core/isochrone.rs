//! Isochrone threshold planning
//!
//! Turns a user budget (range + interval in kilometers or minutes) into the
//! list of integer thresholds the backend expects (meters or seconds).

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// What an isochrone range measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeUnit {
    /// Kilometers in, meters out
    Distance,
    /// Minutes in, seconds out
    Time,
}

impl RangeUnit {
    /// Backend `range_type` value
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeUnit::Distance => "distance",
            RangeUnit::Time => "time",
        }
    }

    /// Converts one step from user units to backend units
    pub fn to_backend(&self, step: f64) -> u64 {
        match self {
            RangeUnit::Distance => to_meters(step),
            RangeUnit::Time => to_seconds(step),
        }
    }

    fn scale(&self) -> f64 {
        match self {
            RangeUnit::Distance => 1000.0,
            RangeUnit::Time => 60.0,
        }
    }
}

impl std::str::FromStr for RangeUnit {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "distance" => Ok(RangeUnit::Distance),
            "time" => Ok(RangeUnit::Time),
            other => Err(Error::InvalidInput(format!(
                "Unknown range unit '{other}' (expected 'distance' or 'time')"
            ))),
        }
    }
}

/// Most thresholds openrouteservice accepts in one isochrone request
pub const MAX_ISOCHRONE_STEPS: usize = 10;

/// Largest threshold sent to the backend, in meters or seconds
pub const MAX_THRESHOLD: u64 = 1 << 53;

/// Kilometers to whole meters, never below 1
pub fn to_meters(km: f64) -> u64 {
    at_least_one((km * 1000.0).round())
}

/// Minutes to whole seconds, never below 1
pub fn to_seconds(minutes: f64) -> u64 {
    at_least_one((minutes * 60.0).round())
}

fn at_least_one(value: f64) -> u64 {
    // `as` saturates and maps NaN to 0
    (value as u64).max(1)
}

/// Step sizes in user units: `interval, 2*interval, ...` up to `range`.
///
/// The interval is floored at 1 and the list always holds at least one step,
/// so an interval larger than the range still yields a single threshold.
/// More than [`MAX_ISOCHRONE_STEPS`] steps is rejected.
pub fn plan_steps(range: f64, interval: f64) -> Result<Vec<f64>> {
    let interval = if interval.is_finite() { interval.max(1.0) } else { 1.0 };
    let range = if range.is_finite() { range.max(0.0) } else { 0.0 };

    // Counted in f64 so a huge range cannot overflow the cast
    let step_count = (range / interval).floor().max(1.0);
    if step_count > MAX_ISOCHRONE_STEPS as f64 {
        return Err(Error::InvalidInput(format!(
            "Isochrone range {range} in steps of {interval} needs {step_count} thresholds \
             (at most {MAX_ISOCHRONE_STEPS} allowed)"
        )));
    }

    Ok((1..=step_count as usize).map(|i| i as f64 * interval).collect())
}

/// Backend thresholds for a range/interval pair, strictly increasing
pub fn plan_thresholds(range: f64, interval: f64, unit: RangeUnit) -> Result<Vec<u64>> {
    let steps = plan_steps(range, interval)?;
    if let Some(last) = steps.last() {
        if (last * unit.scale()).round() > MAX_THRESHOLD as f64 {
            return Err(Error::InvalidInput(format!(
                "Isochrone step {last} is too large for a {} threshold",
                unit.as_str()
            )));
        }
    }
    Ok(steps.into_iter().map(|step| unit.to_backend(step)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        assert_eq!(to_meters(1.234), 1234);
        assert_eq!(to_meters(0.0004), 1);
        assert_eq!(to_seconds(0.5), 30);
        assert_eq!(to_seconds(0.0), 1);
    }

    #[test]
    fn test_time_thresholds() {
        assert_eq!(plan_thresholds(30.0, 10.0, RangeUnit::Time).unwrap(), vec![600, 1200, 1800]);
    }

    #[test]
    fn test_distance_thresholds() {
        assert_eq!(plan_thresholds(5.0, 2.0, RangeUnit::Distance).unwrap(), vec![2000, 4000]);
    }

    #[test]
    fn test_interval_larger_than_range_yields_one_step() {
        assert_eq!(plan_steps(3.0, 10.0).unwrap(), vec![10.0]);
        assert_eq!(plan_thresholds(3.0, 10.0, RangeUnit::Time).unwrap(), vec![600]);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(plan_steps(0.0, 0.0).unwrap(), vec![1.0]);
        assert_eq!(plan_steps(f64::NAN, 5.0).unwrap(), vec![5.0]);
        // interval below 1 is treated as 1
        assert_eq!(plan_steps(3.0, 0.5).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_step_count_is_capped() {
        assert_eq!(plan_steps(10.0, 1.0).unwrap().len(), MAX_ISOCHRONE_STEPS);
        assert!(matches!(plan_steps(11.0, 1.0), Err(Error::InvalidInput(_))));
        assert!(matches!(plan_steps(1e30, 1.0), Err(Error::InvalidInput(_))));
        assert!(matches!(plan_steps(f64::MAX, 1.0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_large_steps_stay_distinct() {
        let thresholds = plan_thresholds(10_000_000.0, 5_000_000.0, RangeUnit::Distance).unwrap();
        assert_eq!(thresholds, vec![5_000_000_000, 10_000_000_000]);

        let huge = plan_thresholds(1e30, 1e30, RangeUnit::Time);
        assert!(matches!(huge, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_steps_strictly_increasing_with_expected_length() {
        for range in [1.0_f64, 2.5, 7.0, 15.0, 60.0, 99.9] {
            for interval in [1.0_f64, 1.5, 2.0, 5.0, 7.0, 30.0] {
                let expected_len = (range / interval).floor().max(1.0) as usize;
                for unit in [RangeUnit::Distance, RangeUnit::Time] {
                    let planned = plan_thresholds(range, interval, unit);
                    if expected_len > MAX_ISOCHRONE_STEPS {
                        assert!(planned.is_err(), "range={range} interval={interval}");
                        continue;
                    }
                    let thresholds = planned.unwrap();
                    assert_eq!(thresholds.len(), expected_len, "range={range} interval={interval}");
                    assert!(thresholds.windows(2).all(|w| w[0] < w[1]));
                    assert!(thresholds.iter().all(|t| *t >= 1));
                }
            }
        }
    }
}
