// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Ramp (slew rate) limiting of the commanded fan speed.

/// Differences at or below this are treated as "already at target".
pub const RAMP_EPSILON: f64 = 0.001;

/// Outcome of one limiter step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RampStep {
    /// Move the fan to this speed.
    Apply(f64),
    /// Change too small to bother the fan with.
    Hold,
}

/// Slew `current` toward `target` over `elapsed_secs`.
///
/// `current == None` means no speed has been commanded yet; the target is
/// returned directly with no limiting. Rates are in speed fraction per second
/// and must be positive. The result never overshoots `target` and is not
/// clamped to [0, 1].
pub fn limit(
    current: Option<f64>,
    target: f64,
    elapsed_secs: f64,
    ramp_up: f64,
    ramp_down: f64,
) -> RampStep {
    let Some(current) = current else {
        return RampStep::Apply(target);
    };

    let diff = target - current;
    let delta = if diff > RAMP_EPSILON {
        diff.min(ramp_up * elapsed_secs)
    } else if diff < -RAMP_EPSILON {
        diff.max(-ramp_down * elapsed_secs)
    } else {
        return RampStep::Hold;
    };

    RampStep::Apply(current + delta)
}
