//! Child Health Record
//!
//! A child's booklet as supplied by the record store, and the combined
//! report computed from it for a given day.

use crate::age::{age_in_months_on, AgeBreakdown};
use crate::classify::ScoreBand;
use crate::growth::{GrowthAnalysis, GrowthAnalyzer, GrowthMeasurement};
use crate::vaccination::{
    CoverageSummary, NextDose, Pendency, ScheduleResolver, VaccineAdministrationRecord, VaccineCatalog,
};
use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Birth date plus the two source collections for one child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRecord {
    pub child_id: String,
    /// ISO-8601 birth date; analysis degrades when absent
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub measurements: Vec<GrowthMeasurement>,
    #[serde(default)]
    pub administrations: Vec<VaccineAdministrationRecord>,
}

/// Every read model for one child on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildHealthReport<'a> {
    pub child_id: String,
    pub today: NaiveDate,
    pub age_months: u32,
    pub age: AgeBreakdown,
    pub growth: Vec<GrowthAnalysis>,
    pub latest_score: Option<u8>,
    pub latest_band: ScoreBand,
    pub pendencies: Vec<Pendency<'a>>,
    pub next_due: Vec<NextDose<'a>>,
    pub coverage: CoverageSummary,
}

impl ChildRecord {
    pub fn new(child_id: impl Into<String>, birth_date: Option<&str>) -> Self {
        ChildRecord {
            child_id: child_id.into(),
            birth_date: birth_date.map(str::to_string),
            measurements: Vec::new(),
            administrations: Vec::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Measurements belonging to this child; foreign entries are skipped
    pub fn own_measurements(&self) -> Vec<GrowthMeasurement> {
        self.measurements
            .iter()
            .filter(|m| {
                let own = m.child_id == self.child_id;
                if !own {
                    warn!(child = %self.child_id, other = %m.child_id, "ignoring measurement for another child");
                }
                own
            })
            .cloned()
            .collect()
    }

    /// Administrations belonging to this child; foreign entries are skipped
    pub fn own_administrations(&self) -> Vec<VaccineAdministrationRecord> {
        self.administrations
            .iter()
            .filter(|r| {
                let own = r.child_id == self.child_id;
                if !own {
                    warn!(child = %self.child_id, other = %r.child_id, "ignoring administration for another child");
                }
                own
            })
            .cloned()
            .collect()
    }

    pub fn age_months_on(&self, today: NaiveDate) -> u32 {
        age_in_months_on(self.birth_date.as_deref(), today)
    }

    pub fn growth(&self, analyzer: &GrowthAnalyzer) -> Vec<GrowthAnalysis> {
        analyzer.analyze(self.birth_date.as_deref(), &self.own_measurements())
    }

    pub fn schedule<'a>(&self, catalog: &'a VaccineCatalog, today: NaiveDate) -> ScheduleResolver<'a> {
        ScheduleResolver::for_child(catalog, self.birth_date.as_deref(), today, &self.own_administrations())
    }

    /// Compute growth, schedule and coverage together
    pub fn report<'a>(
        &self,
        catalog: &'a VaccineCatalog,
        analyzer: &GrowthAnalyzer,
        today: NaiveDate,
    ) -> ChildHealthReport<'a> {
        let growth = self.growth(analyzer);
        let schedule = self.schedule(catalog, today);
        let latest_score = growth.first().map(|a| a.score);
        let age_months = schedule.age_months();
        let pendencies = schedule.pendencies();
        let next_due = schedule.next_due();
        let coverage = schedule.coverage_of(&pendencies, &next_due);

        ChildHealthReport {
            child_id: self.child_id.clone(),
            today,
            age_months,
            age: AgeBreakdown::from_months(age_months),
            latest_band: ScoreBand::from_score(latest_score.unwrap_or(0)),
            latest_score,
            pendencies,
            next_due,
            coverage,
            growth,
        }
    }
}
