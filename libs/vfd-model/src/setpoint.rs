//! Operator intent

use serde::{Deserialize, Serialize};

/// Upper bound of the target frequency, hundredths of Hz (60.00 Hz)
pub const MAX_FREQUENCY: u16 = 6000;

/// Rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn toggled(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }

    pub fn is_reverse(self) -> bool {
        self == Self::Reverse
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Forward => "FWD",
            Self::Reverse => "REV",
        }
    }
}

/// Frequency adjustment granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyStep {
    /// 1.00 Hz
    Coarse,
    /// 0.10 Hz
    Fine,
}

impl FrequencyStep {
    pub const fn hundredths(self) -> i32 {
        match self {
            Self::Coarse => 100,
            Self::Fine => 10,
        }
    }
}

/// A requested frequency fell outside `[0, MAX_FREQUENCY]` and was saturated
///
/// Recorded for the operator, never raised as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRejected {
    pub requested: i32,
    pub applied: u16,
}

/// Saturate a candidate target frequency into the valid range
pub fn clamp_frequency(candidate: i32) -> (u16, Option<RangeRejected>) {
    let applied = candidate.clamp(0, i32::from(MAX_FREQUENCY)) as u16;
    let rejected = (i32::from(applied) != candidate).then_some(RangeRejected {
        requested: candidate,
        applied,
    });
    (applied, rejected)
}

/// Run state, direction and target frequency requested by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Setpoint {
    pub run_state: bool,
    pub direction: Direction,
    /// Hundredths of Hz, always within `[0, MAX_FREQUENCY]`
    target_frequency: u16,
}

impl Setpoint {
    /// Build a setpoint, clamping the frequency
    pub fn new(run_state: bool, direction: Direction, target_frequency: i32) -> Self {
        let (target_frequency, _) = clamp_frequency(target_frequency);
        Self {
            run_state,
            direction,
            target_frequency,
        }
    }

    pub fn target_frequency(&self) -> u16 {
        self.target_frequency
    }

    /// Target frequency in Hz
    pub fn target_hz(&self) -> f64 {
        f64::from(self.target_frequency) / 100.0
    }

    pub fn toggle_run(&mut self) {
        self.run_state = !self.run_state;
    }

    pub fn toggle_direction(&mut self) {
        self.direction = self.direction.toggled();
    }

    /// Set the target frequency, saturating at the range bounds
    pub fn set_frequency(&mut self, hundredths: i32) -> Option<RangeRejected> {
        let (applied, rejected) = clamp_frequency(hundredths);
        self.target_frequency = applied;
        rejected
    }

    /// Step the target frequency up or down
    pub fn adjust_frequency(&mut self, step: FrequencyStep, up: bool) -> Option<RangeRejected> {
        let delta = if up {
            step.hundredths()
        } else {
            -step.hundredths()
        };
        self.set_frequency(i32::from(self.target_frequency) + delta)
    }

    /// Whether the control word would differ between the two setpoints
    pub fn control_differs(&self, other: &Setpoint) -> bool {
        self.run_state != other.run_state || self.direction != other.direction
    }
}
