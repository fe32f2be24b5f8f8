//! Threshold Verdicts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Invalid threshold configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskBandError {
    #[error("{name} threshold {value} must be in (0, 1]")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("critical threshold {critical} must be above the required threshold {required}")]
    Unordered { required: f64, critical: f64 },
}

/// Probability thresholds. Both are inclusive lower bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskBands {
    /// At or above this, maintenance is required (default: 0.5)
    pub required_threshold: f64,
    /// At or above this, maintenance is critical. Unset means a single
    /// safe/required split.
    pub critical_threshold: Option<f64>,
}

impl Default for RiskBands {
    fn default() -> Self {
        Self {
            required_threshold: 0.5,
            critical_threshold: None,
        }
    }
}

/// Severity bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    MaintenanceRequired,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::MaintenanceRequired => "maintenance_required",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "VEHICLE SAFE",
            RiskLevel::MaintenanceRequired => "MAINTENANCE REQUIRED",
            RiskLevel::Critical => "CRITICAL: IMMEDIATE MAINTENANCE",
        }
    }
}

/// Presentation colour bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Success,
    Warning,
    Error,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Success => "success",
            Tone::Warning => "warning",
            Tone::Error => "error",
        }
    }

    /// CSS colour for the verdict panel
    pub fn color(&self) -> &'static str {
        match self {
            Tone::Success => "#1e7b34",
            Tone::Warning => "#b36b00",
            Tone::Error => "#c62828",
        }
    }
}

/// Outcome of one assessment
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub id: Uuid,
    /// Risk factor in [0, 1]
    pub probability: f64,
    /// Risk factor as a percentage
    pub risk_percent: f64,
    pub level: RiskLevel,
    pub tone: Tone,
    pub headline: &'static str,
    pub message: String,
    pub assessed_at: DateTime<Utc>,
}

impl RiskBands {
    /// Two thresholds: required at 0.5, critical at 0.75
    pub fn with_critical() -> Self {
        Self {
            required_threshold: 0.5,
            critical_threshold: Some(0.75),
        }
    }

    /// Check `0 < required < critical <= 1`
    pub fn validate(&self) -> Result<(), RiskBandError> {
        let in_range = |v: f64| v > 0.0 && v <= 1.0;
        if !in_range(self.required_threshold) {
            return Err(RiskBandError::OutOfRange {
                name: "required",
                value: self.required_threshold,
            });
        }
        if let Some(critical) = self.critical_threshold {
            if !in_range(critical) {
                return Err(RiskBandError::OutOfRange {
                    name: "critical",
                    value: critical,
                });
            }
            if critical <= self.required_threshold {
                return Err(RiskBandError::Unordered {
                    required: self.required_threshold,
                    critical,
                });
            }
        }
        Ok(())
    }

    /// Get severity level for a probability
    pub fn level(&self, probability: f64) -> RiskLevel {
        match self.critical_threshold {
            Some(critical) if probability >= critical => RiskLevel::Critical,
            _ if probability >= self.required_threshold => RiskLevel::MaintenanceRequired,
            _ => RiskLevel::Safe,
        }
    }

    /// Colour bucket for a level. Without a critical band, "required" is
    /// already the most severe outcome and is shown as an error.
    pub fn tone(&self, level: RiskLevel) -> Tone {
        match (level, self.critical_threshold) {
            (RiskLevel::Safe, _) => Tone::Success,
            (RiskLevel::MaintenanceRequired, Some(_)) => Tone::Warning,
            (RiskLevel::MaintenanceRequired, None) => Tone::Error,
            (RiskLevel::Critical, _) => Tone::Error,
        }
    }

    /// Build the verdict for a classifier probability
    pub fn assess(&self, probability: f64) -> Verdict {
        let level = self.level(probability);
        let tone = self.tone(level);
        let risk_percent = probability * 100.0;
        let message = format!("{} (Risk Factor: {:.1}%)", level.headline(), risk_percent);

        info!("Assessment: {} at {:.1}%", level.as_str(), risk_percent);

        Verdict {
            id: Uuid::new_v4(),
            probability,
            risk_percent,
            level,
            tone,
            headline: level.headline(),
            message,
            assessed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_threshold_inclusive() {
        let bands = RiskBands::default();

        assert_eq!(bands.level(0.4999), RiskLevel::Safe);
        assert_eq!(bands.level(0.5), RiskLevel::MaintenanceRequired);
        assert_eq!(bands.level(1.0), RiskLevel::MaintenanceRequired);
        assert_eq!(bands.tone(RiskLevel::MaintenanceRequired), Tone::Error);
    }

    #[test]
    fn test_critical_band() {
        let bands = RiskBands::with_critical();

        assert_eq!(bands.level(0.2), RiskLevel::Safe);
        assert_eq!(bands.level(0.6), RiskLevel::MaintenanceRequired);
        assert_eq!(bands.level(0.75), RiskLevel::Critical);
        assert_eq!(bands.tone(RiskLevel::MaintenanceRequired), Tone::Warning);
        assert_eq!(bands.tone(RiskLevel::Critical), Tone::Error);
    }

    #[test]
    fn test_message_format() {
        let bands = RiskBands::default();

        let verdict = bands.assess(0.123);
        assert_eq!(verdict.message, "VEHICLE SAFE (Risk Factor: 12.3%)");
        assert_eq!(verdict.tone, Tone::Success);

        let verdict = bands.assess(0.5);
        assert_eq!(verdict.message, "MAINTENANCE REQUIRED (Risk Factor: 50.0%)");
    }

    #[test]
    fn test_verdict_serializes_snake_case() {
        let verdict = RiskBands::with_critical().assess(0.9);
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["level"], "critical");
        assert_eq!(json["tone"], "error");
        assert_eq!(json["headline"], "CRITICAL: IMMEDIATE MAINTENANCE");
    }

    #[test]
    fn test_band_validation() {
        assert!(RiskBands::default().validate().is_ok());
        assert!(RiskBands::with_critical().validate().is_ok());

        let zero = RiskBands {
            required_threshold: 0.0,
            critical_threshold: None,
        };
        assert!(matches!(
            zero.validate(),
            Err(RiskBandError::OutOfRange { name: "required", .. })
        ));

        let inverted = RiskBands {
            required_threshold: 0.8,
            critical_threshold: Some(0.6),
        };
        assert_eq!(
            inverted.validate(),
            Err(RiskBandError::Unordered {
                required: 0.8,
                critical: 0.6
            })
        );
    }

    proptest! {
        #[test]
        fn prop_level_monotone(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let bands = RiskBands::with_critical();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(bands.level(lo) <= bands.level(hi));
        }
    }
}
