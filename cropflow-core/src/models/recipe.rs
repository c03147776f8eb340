//! Crop recipe data models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Days added on top of a stage's minimum duration when no explicit
/// maximum is declared.
pub const DEFAULT_MAX_DURATION_BUFFER_DAYS: u32 = 5;

/// Target range for a single environmental parameter.
///
/// Recipe files may declare a parameter either as a `{min, max, optimal}`
/// object or as a bare number; the bare form normalizes to a degenerate
/// range at deserialization so the rest of the crate only ever sees the
/// canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamRange {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
    /// Preferred setpoint within the range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimal: Option<f64>,
}

impl ParamRange {
    /// Setpoint to drive actuators toward: the declared optimal, or the
    /// midpoint of the range when none is declared.
    pub fn setpoint(&self) -> f64 {
        self.optimal.unwrap_or((self.min + self.max) / 2.0)
    }
}

impl<'de> Deserialize<'de> for ParamRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Scalar(f64),
            Range {
                min: f64,
                max: f64,
                #[serde(default)]
                optimal: Option<f64>,
            },
        }

        match Raw::deserialize(deserializer)? {
            Raw::Scalar(value) => Ok(ParamRange {
                min: value,
                max: value,
                optimal: Some(value),
            }),
            Raw::Range { min, max, optimal } => Ok(ParamRange { min, max, optimal }),
        }
    }
}

/// Environmental targets for one growth stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentalTargets {
    /// Temperature range in degrees Celsius
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<ParamRange>,
    /// Relative humidity range in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<ParamRange>,
    /// CO2 range in ppm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2: Option<ParamRange>,
    /// Light level range in lux
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<ParamRange>,
}

/// Photoperiod configuration for one growth stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightingSchedule {
    /// Scheduled light hours per day (0 = keep lights off)
    pub hours_per_day: u32,
    /// Light intensity in percent when lights are on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<u32>,
}

/// Irrigation configuration for one growth stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrigationSchedule {
    /// Watering cycles per day (0 = no irrigation)
    pub frequency_per_day: u32,
}

/// Single growth stage within a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    /// Stage name (e.g. "incubation", "fruiting")
    pub name: String,
    /// Minimum days the crop must spend in this stage
    pub duration_days: u32,
    /// Soft cap on days in this stage before escalation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_days: Option<u32>,
    /// Environmental setpoints applied on stage entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environmental: Option<EnvironmentalTargets>,
    /// Photoperiod applied on stage entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lighting: Option<LightingSchedule>,
    /// Irrigation applied on stage entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irrigation: Option<IrrigationSchedule>,
    /// Human tasks expected before the stage can be signed off
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manual_tasks: Vec<String>,
}

impl Stage {
    /// Effective soft cap: the declared maximum, or minimum plus a fixed buffer.
    pub fn effective_max_duration_days(&self) -> u32 {
        self.max_duration_days
            .unwrap_or(self.duration_days + DEFAULT_MAX_DURATION_BUFFER_DAYS)
    }
}

/// Crop recipe - an ordered sequence of growth stages.
///
/// Stage identity is the array index; recipes are treated as immutable once
/// executions reference them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique recipe identifier
    pub id: Uuid,
    /// Display name of the crop
    pub crop_name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered growth stages
    pub stages: Vec<Stage>,
}

impl Recipe {
    /// Check structural invariants: at least one stage, every duration positive.
    pub fn validate(&self) -> Result<(), String> {
        if self.stages.is_empty() {
            return Err("recipe has no stages defined".to_string());
        }
        for (index, stage) in self.stages.iter().enumerate() {
            if stage.duration_days == 0 {
                return Err(format!(
                    "stage {} ('{}') has zero duration",
                    index, stage.name
                ));
            }
        }
        Ok(())
    }

    /// Sum of minimum stage durations in days
    pub fn total_duration_days(&self) -> u32 {
        self.stages.iter().map(|s| s.duration_days).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(name: &str, duration: u32) -> Stage {
        Stage {
            name: name.to_string(),
            duration_days: duration,
            max_duration_days: None,
            environmental: None,
            lighting: None,
            irrigation: None,
            manual_tasks: vec![],
        }
    }

    #[test]
    fn test_param_range_scalar_normalization() {
        let range: ParamRange = serde_json::from_str("22.5").unwrap();
        assert_eq!(range.min, 22.5);
        assert_eq!(range.max, 22.5);
        assert_eq!(range.optimal, Some(22.5));
    }

    #[test]
    fn test_param_range_object_form() {
        let range: ParamRange = serde_json::from_str(r#"{"min": 18, "max": 24}"#).unwrap();
        assert_eq!(range.min, 18.0);
        assert_eq!(range.max, 24.0);
        assert_eq!(range.optimal, None);
        assert_eq!(range.setpoint(), 21.0);
    }

    #[test]
    fn test_effective_max_duration_defaults() {
        let mut s = stage("pinning", 4);
        assert_eq!(s.effective_max_duration_days(), 9);
        s.max_duration_days = Some(6);
        assert_eq!(s.effective_max_duration_days(), 6);
    }

    #[test]
    fn test_recipe_validation() {
        let recipe = Recipe {
            id: Uuid::new_v4(),
            crop_name: "Oyster Mushroom".to_string(),
            description: None,
            stages: vec![],
        };
        assert!(recipe.validate().is_err());

        let recipe = Recipe {
            stages: vec![stage("incubation", 14), stage("fruiting", 0)],
            ..recipe
        };
        assert!(recipe.validate().unwrap_err().contains("zero duration"));

        let recipe = Recipe {
            stages: vec![stage("incubation", 14), stage("fruiting", 7)],
            ..recipe
        };
        assert!(recipe.validate().is_ok());
        assert_eq!(recipe.total_duration_days(), 21);
    }
}
