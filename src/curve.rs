// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Fan curve points and interpolation.
//!
//! A curve maps temperature readings to fan speed fractions (0.0-1.0).
//! Points are linearly interpolated between defined thresholds and held flat
//! outside the covered range.

use serde::{Deserialize, Serialize};

/// A single point on a fan curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FanPoint {
    /// Temperature in degrees Celsius
    pub temperature: f64,
    /// Fan speed fraction (0.0-1.0)
    pub speed: f64,
}

impl FanPoint {
    /// Create a point from a temperature in C and a speed fraction.
    pub const fn new(temperature: f64, speed: f64) -> Self {
        Self { temperature, speed }
    }
}

/// Evaluate the target speed for a given temperature.
///
/// The curve must be in non-decreasing temperature order; it is never sorted
/// here. [`FanConfig::validate`](crate::config::FanConfig::validate) rejects
/// curves that violate this.
///
/// - At or below the first point: returns the first point's speed
/// - Above the last point: returns the last point's speed
/// - Between two points: linear interpolation
/// - Single-point curve: always that point's speed
/// - Empty curve: 0.0
pub fn evaluate(curve: &[FanPoint], temperature: f64) -> f64 {
    let Some(first) = curve.first() else {
        return 0.0;
    };
    if temperature <= first.temperature {
        return first.speed;
    }

    // Highest point strictly below the reading.
    let index = curve
        .iter()
        .rposition(|p| p.temperature < temperature)
        .unwrap_or(0);

    let lo = &curve[index];
    match curve.get(index + 1) {
        None => lo.speed,
        Some(hi) => {
            let frac = (temperature - lo.temperature) / (hi.temperature - lo.temperature);
            lo.speed * (1.0 - frac) + hi.speed * frac
        }
    }
}

/// The default software curve: a straight line from 0% at 0C to 100% at 100C,
/// sampled every 10C.
pub fn default_linear_curve() -> Vec<FanPoint> {
    (0..=10)
        .map(|i| FanPoint::new(f64::from(i) * 10.0, f64::from(i) * 0.1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_point() -> Vec<FanPoint> {
        vec![
            FanPoint::new(0.0, 0.0),
            FanPoint::new(50.0, 0.5),
            FanPoint::new(100.0, 1.0),
        ]
    }

    #[test]
    fn test_interpolation_midpoints() {
        let curve = three_point();
        assert_eq!(evaluate(&curve, 25.0), 0.25);
        assert_eq!(evaluate(&curve, 75.0), 0.75);
    }

    #[test]
    fn test_interpolation_exact_point() {
        assert_eq!(evaluate(&three_point(), 50.0), 0.5);
    }

    #[test]
    fn test_interpolation_below_range() {
        assert_eq!(evaluate(&three_point(), -10.0), 0.0);
    }

    #[test]
    fn test_interpolation_above_range() {
        assert_eq!(evaluate(&three_point(), 150.0), 1.0);
    }

    #[test]
    fn test_below_range_does_not_extrapolate() {
        let curve = vec![FanPoint::new(40.0, 0.3), FanPoint::new(80.0, 0.9)];
        assert_eq!(evaluate(&curve, 0.0), 0.3);
        assert_eq!(evaluate(&curve, 40.0), 0.3);
    }

    #[test]
    fn test_single_point_curve() {
        let curve = vec![FanPoint::new(20.0, 0.3)];
        for t in [-40.0, 0.0, 20.0, 20.5, 100.0] {
            assert_eq!(evaluate(&curve, t), 0.3);
        }
    }

    #[test]
    fn test_equal_temperatures_form_a_step() {
        let curve = vec![
            FanPoint::new(0.0, 0.2),
            FanPoint::new(50.0, 0.2),
            FanPoint::new(50.0, 0.8),
            FanPoint::new(100.0, 1.0),
        ];
        assert_eq!(evaluate(&curve, 50.0), 0.2);
        let just_above = evaluate(&curve, 50.001);
        assert!(just_above >= 0.8 && just_above < 0.81, "got {just_above}");
    }

    #[test]
    fn test_empty_curve() {
        assert_eq!(evaluate(&[], 42.0), 0.0);
    }

    #[test]
    fn test_default_linear_curve() {
        let curve = default_linear_curve();
        assert_eq!(curve.len(), 11);
        assert_eq!(curve[0], FanPoint::new(0.0, 0.0));
        assert_eq!(curve[10], FanPoint::new(100.0, 1.0));
        assert!((evaluate(&curve, 55.0) - 0.55).abs() < 1e-12);
    }
}
