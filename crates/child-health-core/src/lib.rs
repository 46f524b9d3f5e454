//! Child Health Core - Growth & Vaccination Analysis Engine
//!
//! Pure Rust implementation of the analysis behind a child's health
//! booklet: how growth measurements compare to population reference
//! values, and which vaccine doses are pending or due next.
//!
//! # Features
//!
//! - Whole-month age calculation with fail-soft date parsing
//! - Linear interpolation over a sparse age-indexed reference table
//! - Per-metric deviation verdicts, BMI classification, composite score
//! - Vaccination pendencies and deterministically ordered next-due doses
//!
//! Every computation is a pure function of its inputs. "Today" is always
//! passed in by the caller, never read from the system clock.
//!
//! # Example
//!
//! ```rust
//! use child_health_core::{GrowthAnalyzer, GrowthMeasurement, MetricStatus};
//!
//! let analyzer = GrowthAnalyzer::default();
//! let measurement = GrowthMeasurement::new("child-1", "2024-06-15")
//!     .with_weight(10.0)
//!     .with_height(74.0);
//!
//! let analyses = analyzer.analyze(Some("2023-06-15"), &[measurement]);
//! assert_eq!(analyses[0].age_months, 12);
//! assert_eq!(analyses[0].weight.status, MetricStatus::Within);
//! ```

pub mod age;
pub mod classify;
pub mod config;
pub mod growth;
pub mod record;
pub mod reference;
pub mod vaccination;

// Re-export commonly used types for convenience
pub use age::{
    age_in_months_on, months_between, months_between_dates, parse_iso_date, parse_iso_instant, AgeBreakdown,
};
pub use classify::{classify_bmi, classify_deviation, compute_bmi, MetricStatus, MetricVerdict, ScoreBand};
pub use config::AnalysisConfig;
pub use growth::{GrowthAnalysis, GrowthAnalyzer, GrowthMeasurement};
pub use record::{ChildHealthReport, ChildRecord};
pub use reference::{GrowthReferencePoint, ReferenceTable};
pub use vaccination::{
    next_due, pendencies, AdministeredDoses, CoverageSummary, DoseKey, NextDose, Pendency,
    ScheduleResolver, VaccineAdministrationRecord, VaccineCatalog, VaccineCatalogEntry, VaccineDose,
};

/// Errors raised while loading or validating tables, catalogs and configuration.
///
/// The analysis functions themselves never fail; they degrade to
/// `Undefined` verdicts, empty lists or an age of zero instead.
#[derive(Debug, thiserror::Error)]
pub enum ChildHealthError {
    /// Reference table has no points
    #[error("reference table is empty")]
    EmptyReferenceTable,
    /// Reference ages are not strictly ascending
    #[error("reference table is not strictly ascending at index {index}: {previous} >= {current} months")]
    UnsortedReferenceTable { index: usize, previous: f64, current: f64 },
    /// A reference point carries NaN or infinite values
    #[error("reference point at index {index} has a non-finite value")]
    NonFiniteReferencePoint { index: usize },
    /// Two catalog entries share an id
    #[error("duplicate vaccine id in catalog: {0}")]
    DuplicateVaccine(String),
    /// Two doses of one vaccine share a code
    #[error("duplicate dose code {dose_code} for vaccine {vaccine_id}")]
    DuplicateDose { vaccine_id: String, dose_code: String },
    /// Configuration value out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Date string could not be parsed
    #[error("invalid date: '{0}'")]
    InvalidDate(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChildHealthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ChildHealthError::UnsortedReferenceTable { index: 3, previous: 6.0, current: 5.0 };
        assert_eq!(
            err.to_string(),
            "reference table is not strictly ascending at index 3: 6 >= 5 months"
        );

        let err = ChildHealthError::DuplicateDose {
            vaccine_id: "PENTA".to_string(),
            dose_code: "D1".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate dose code D1 for vaccine PENTA");
    }

    #[test]
    fn test_json_error_converts() {
        let parse: std::result::Result<AnalysisConfig, _> = serde_json::from_str("{not json");
        let err: ChildHealthError = parse.unwrap_err().into();
        assert!(matches!(err, ChildHealthError::Json(_)));
    }
}
