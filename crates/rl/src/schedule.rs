//! Noise-scale schedules.
//!
//! The sampled exploration noise is multiplied by the schedule's value
//! before it is added to the agent's action, so exploration can be annealed
//! without touching the process itself.

use ml::ConfigError;
use serde::{Deserialize, Serialize};

/// What the schedule counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayClock {
    /// Total environment steps.
    #[default]
    Steps,
    /// Completed episodes.
    Episodes,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecaySchedule {
    Constant {
        value: f32,
    },
    /// Straight line from `start` to `end` over `steps` ticks, then flat.
    Linear {
        start: f32,
        end: f32,
        steps: usize,
    },
    /// `start` for `plateau` ticks, then `start * rate^(t - plateau)`, never
    /// below `floor`.
    Exponential {
        start: f32,
        rate: f32,
        floor: f32,
        #[serde(default)]
        plateau: usize,
    },
}

impl Default for DecaySchedule {
    fn default() -> Self {
        Self::Constant { value: 1.0 }
    }
}

impl DecaySchedule {
    #[must_use]
    pub fn value(&self, t: usize) -> f32 {
        match *self {
            Self::Constant { value } => value,
            Self::Linear { start, end, steps } => {
                if t >= steps {
                    end
                } else {
                    start + (end - start) * (t as f32 / steps as f32)
                }
            }
            Self::Exponential { start, rate, floor, plateau } => {
                let Some(elapsed) = t.checked_sub(plateau) else {
                    return start;
                };
                let exponent = i32::try_from(elapsed).unwrap_or(i32::MAX);
                (start * rate.powi(exponent)).max(floor)
            }
        }
    }

    /// # Errors
    ///
    /// Non-finite or negative scales, or an exponential rate outside
    /// `(0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scales = match *self {
            Self::Constant { value } => vec![value],
            Self::Linear { start, end, .. } => vec![start, end],
            Self::Exponential { start, rate, floor, .. } => {
                if !(rate > 0.0 && rate <= 1.0) {
                    return Err(ConfigError::OutOfRange {
                        field: "schedule.rate",
                        reason: format!("{rate} not in (0, 1]"),
                    });
                }
                vec![start, floor]
            }
        };
        if scales.iter().any(|s| !s.is_finite()) {
            return Err(ConfigError::NonFinite { field: "schedule" });
        }
        if scales.iter().any(|s| *s < 0.0) {
            return Err(ConfigError::OutOfRange { field: "schedule", reason: "scales must be non-negative".into() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_reaches_end_and_stays() {
        let s = DecaySchedule::Linear { start: 1.0, end: 0.0, steps: 10 };
        assert_eq!(s.value(0), 1.0);
        assert!((s.value(5) - 0.5).abs() < 1e-6);
        assert_eq!(s.value(10), 0.0);
        assert_eq!(s.value(1000), 0.0);
    }

    #[test]
    fn linear_with_zero_steps_is_end() {
        let s = DecaySchedule::Linear { start: 1.0, end: 0.2, steps: 0 };
        assert_eq!(s.value(0), 0.2);
    }

    #[test]
    fn exponential_holds_plateau_then_decays_to_floor() {
        let s = DecaySchedule::Exponential { start: 1.0, rate: 0.5, floor: 0.1, plateau: 3 };
        assert_eq!(s.value(2), 1.0);
        assert_eq!(s.value(3), 1.0);
        assert_eq!(s.value(4), 0.5);
        assert_eq!(s.value(5), 0.25);
        assert_eq!(s.value(100), 0.1);
    }

    #[test]
    fn rate_above_one_is_rejected() {
        let s = DecaySchedule::Exponential { start: 1.0, rate: 1.5, floor: 0.0, plateau: 0 };
        assert!(s.validate().is_err());
    }
}
