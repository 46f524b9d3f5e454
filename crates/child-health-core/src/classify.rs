//! Deviation Classification
//!
//! Verdicts for observed metrics against reference values, BMI
//! computation and classification, and score assessment bands.

use serde::{Deserialize, Serialize};

/// Relative tolerance band around the reference value (10%)
pub const DEFAULT_TOLERANCE: f64 = 0.10;

/// BMI strictly below this is classified `Below`
pub const BMI_BELOW_THRESHOLD: f64 = 14.0;

/// BMI strictly above this is classified `Above`
pub const BMI_ABOVE_THRESHOLD: f64 = 18.5;

/// Classification of an observed value against its reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    /// More than the tolerance above the reference
    Above,
    /// More than the tolerance below the reference
    Below,
    /// Inside the tolerance band, boundaries included
    Within,
    /// Value missing or not comparable
    Undefined,
}

impl MetricStatus {
    pub fn is_defined(&self) -> bool {
        !matches!(self, MetricStatus::Undefined)
    }
}

/// Verdict for one metric of one measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricVerdict {
    pub status: MetricStatus,
    /// `observed - reference_value`
    pub difference: Option<f64>,
    /// `difference / reference_value`
    pub percentual: Option<f64>,
    pub reference_value: f64,
}

impl MetricVerdict {
    pub fn undefined(reference_value: f64) -> Self {
        MetricVerdict {
            status: MetricStatus::Undefined,
            difference: None,
            percentual: None,
            reference_value,
        }
    }
}

/// Classify `observed` against `reference_value` with a relative tolerance.
///
/// `Above` requires `percentual > tolerance` and `Below` requires
/// `percentual < -tolerance`; exactly on the boundary is `Within`.
/// Missing or NaN values, and a zero or non-finite reference, give
/// `Undefined`.
pub fn classify_deviation(observed: Option<f64>, reference_value: f64, tolerance: f64) -> MetricVerdict {
    let observed = match observed {
        Some(value) if !value.is_nan() => value,
        _ => return MetricVerdict::undefined(reference_value),
    };
    if !reference_value.is_finite() || reference_value == 0.0 {
        return MetricVerdict::undefined(reference_value);
    }

    let difference = observed - reference_value;
    let percentual = difference / reference_value;

    let status = if percentual > tolerance {
        MetricStatus::Above
    } else if percentual < -tolerance {
        MetricStatus::Below
    } else {
        MetricStatus::Within
    };

    MetricVerdict {
        status,
        difference: Some(difference),
        percentual: Some(percentual),
        reference_value,
    }
}

/// Body mass index, `weight / (height in metres)^2`.
///
/// `None` unless both values are present, finite and non-zero.
pub fn compute_bmi(weight_kg: Option<f64>, height_cm: Option<f64>) -> Option<f64> {
    let weight = weight_kg.filter(|w| w.is_finite() && *w != 0.0)?;
    let height_m = height_cm.filter(|h| h.is_finite() && *h != 0.0)? / 100.0;
    Some(weight / (height_m * height_m))
}

/// Classify a BMI against fixed lower and upper thresholds
pub fn classify_bmi(bmi: Option<f64>, below_threshold: f64, above_threshold: f64) -> MetricStatus {
    match bmi {
        Some(value) if !value.is_nan() => {
            if value < below_threshold {
                MetricStatus::Below
            } else if value > above_threshold {
                MetricStatus::Above
            } else {
                MetricStatus::Within
            }
        }
        _ => MetricStatus::Undefined,
    }
}

/// Assessment band for a composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    /// 90 and above
    Expected,
    /// 70 to 89
    Monitor,
    /// 1 to 69
    ActionRecommended,
    /// 0, nothing could be assessed
    NotAssessed,
}

impl ScoreBand {
    pub fn from_score(score: u8) -> Self {
        if score >= 90 {
            ScoreBand::Expected
        } else if score >= 70 {
            ScoreBand::Monitor
        } else if score > 0 {
            ScoreBand::ActionRecommended
        } else {
            ScoreBand::NotAssessed
        }
    }
}
