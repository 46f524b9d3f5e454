//! Growth Analysis
//!
//! Compares each growth measurement against the reference values for the
//! child's age at the measurement date.

use crate::age::{months_between_dates, parse_iso_date, parse_iso_instant};
use crate::classify::{classify_bmi, classify_deviation, compute_bmi, MetricStatus, MetricVerdict, ScoreBand};
use crate::config::AnalysisConfig;
use crate::reference::{GrowthReferencePoint, ReferenceTable};
use crate::Result;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// A caregiver-recorded growth measurement.
///
/// At least one metric should be present for the record to be
/// meaningful; the analyzer does not enforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthMeasurement {
    pub child_id: String,
    /// ISO-8601 date of the measurement
    pub date: String,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub head_circumference_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl GrowthMeasurement {
    pub fn new(child_id: impl Into<String>, date: impl Into<String>) -> Self {
        GrowthMeasurement {
            child_id: child_id.into(),
            date: date.into(),
            weight_kg: None,
            height_cm: None,
            head_circumference_cm: None,
            notes: None,
        }
    }

    pub fn with_weight(mut self, weight_kg: f64) -> Self {
        self.weight_kg = Some(weight_kg);
        self
    }

    pub fn with_height(mut self, height_cm: f64) -> Self {
        self.height_cm = Some(height_cm);
        self
    }

    pub fn with_head_circumference(mut self, head_circumference_cm: f64) -> Self {
        self.head_circumference_cm = Some(head_circumference_cm);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Derived analysis of one measurement; recomputed on every query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthAnalysis {
    pub measurement: GrowthMeasurement,
    pub age_months: u32,
    pub reference: GrowthReferencePoint,
    pub weight: MetricVerdict,
    pub height: MetricVerdict,
    pub head_circumference: MetricVerdict,
    pub bmi: Option<f64>,
    pub bmi_verdict: MetricStatus,
    /// Composite 0-100 score over the defined verdicts
    pub score: u8,
}

impl GrowthAnalysis {
    pub fn score_band(&self) -> ScoreBand {
        ScoreBand::from_score(self.score)
    }
}

/// Growth analyzer over a reference table and thresholds
#[derive(Debug, Clone, Default)]
pub struct GrowthAnalyzer {
    table: ReferenceTable,
    config: AnalysisConfig,
}

impl GrowthAnalyzer {
    /// Build an analyzer, rejecting an out-of-range config
    pub fn new(table: ReferenceTable, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(GrowthAnalyzer { table, config })
    }

    /// Built-in reference table with custom thresholds
    pub fn with_config(config: AnalysisConfig) -> Result<Self> {
        Self::new(ReferenceTable::default(), config)
    }

    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze every measurement, most recent first.
    ///
    /// Without a parseable birth date no age can be derived, so the
    /// result is empty. Ordering uses the full timestamp when one is
    /// given, so same-day readings keep their time of day. Measurements
    /// with unparseable dates are analyzed at age 0 and sorted after all
    /// dated ones.
    pub fn analyze(&self, birth_iso: Option<&str>, measurements: &[GrowthMeasurement]) -> Vec<GrowthAnalysis> {
        let birth = match birth_iso.and_then(parse_iso_date) {
            Some(birth) => birth,
            None => {
                warn!(birth = ?birth_iso, "no usable birth date, skipping growth analysis");
                return Vec::new();
            }
        };

        let mut dated: Vec<(Option<NaiveDateTime>, GrowthAnalysis)> = measurements
            .iter()
            .map(|m| (parse_iso_instant(&m.date), self.analyze_at(birth, parse_iso_date(&m.date), m)))
            .collect();

        dated.sort_by(|(a, _), (b, _)| most_recent_first(a, b));

        dated.into_iter().map(|(_, analysis)| analysis).collect()
    }

    /// Analysis of the most recent measurement
    pub fn latest(&self, birth_iso: Option<&str>, measurements: &[GrowthMeasurement]) -> Option<GrowthAnalysis> {
        self.analyze(birth_iso, measurements).into_iter().next()
    }

    /// Analyze a single measurement for a known birth date
    pub fn analyze_measurement(&self, birth: NaiveDate, measurement: &GrowthMeasurement) -> GrowthAnalysis {
        self.analyze_at(birth, parse_iso_date(&measurement.date), measurement)
    }

    fn analyze_at(&self, birth: NaiveDate, date: Option<NaiveDate>, measurement: &GrowthMeasurement) -> GrowthAnalysis {
        let age_months = match date {
            Some(date) => months_between_dates(birth, date),
            None => {
                debug!(date = %measurement.date, "unparseable measurement date, using age 0");
                0
            }
        };
        let reference = self.table.reference_at(age_months as f64);
        let tolerance = self.config.tolerance;

        let weight = classify_deviation(measurement.weight_kg, reference.avg_weight_kg, tolerance);
        let height = classify_deviation(measurement.height_cm, reference.avg_height_cm, tolerance);
        let head_circumference = classify_deviation(
            measurement.head_circumference_cm,
            reference.avg_head_circumference_cm,
            tolerance,
        );

        let bmi = compute_bmi(measurement.weight_kg, measurement.height_cm);
        let bmi_verdict = classify_bmi(bmi, self.config.bmi_below, self.config.bmi_above);

        let score = self.composite_score(&[weight.status, height.status, head_circumference.status, bmi_verdict]);

        GrowthAnalysis {
            measurement: measurement.clone(),
            age_months,
            reference,
            weight,
            height,
            head_circumference,
            bmi,
            bmi_verdict,
            score,
        }
    }

    /// Average contribution of the defined verdicts, rounded.
    ///
    /// `Undefined` verdicts are left out rather than counted as zero, so a
    /// metric that was never taken does not lower the score. With no
    /// defined verdict the score is 0.
    pub fn composite_score(&self, statuses: &[MetricStatus]) -> u8 {
        let contributions: Vec<f64> = statuses
            .iter()
            .filter_map(|status| match status {
                MetricStatus::Within => Some(self.config.within_score),
                MetricStatus::Above | MetricStatus::Below => Some(self.config.deviation_score),
                MetricStatus::Undefined => None,
            })
            .collect();

        if contributions.is_empty() {
            return 0;
        }

        let mean = contributions.iter().sum::<f64>() / contributions.len() as f64;
        mean.round().clamp(0.0, 100.0) as u8
    }
}

// Descending by instant; undated entries last
fn most_recent_first(a: &Option<NaiveDateTime>, b: &Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
