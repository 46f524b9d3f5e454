//! Vaccination Schedule Resolution
//!
//! Resolves a child's administered doses against a vaccine catalog into
//! two independent read models:
//!
//! - **pendencies**: per vaccine, doses whose target age has passed
//!   without administration
//! - **next due**: every dose not yet administered, ordered by target
//!   age and flagged when overdue
//!
//! An overdue dose appears in both. The two lists answer different
//! questions ("what is behind" and "what to do next") and are not meant
//! to be mutually exclusive.

use crate::age::age_in_months_on;
use crate::{ChildHealthError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One dose of a vaccine in the schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineDose {
    pub code: String,
    pub label: String,
    /// Target age in months; `None` means the dose is not age-gated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_age_months: Option<u32>,
}

impl VaccineDose {
    pub fn new(code: impl Into<String>, label: impl Into<String>, target_age_months: Option<u32>) -> Self {
        VaccineDose {
            code: code.into(),
            label: label.into(),
            target_age_months,
        }
    }

    /// Overdue once the child is strictly older than the target age
    pub fn is_overdue_at(&self, age_months: u32) -> bool {
        matches!(self.target_age_months, Some(target) if target < age_months)
    }
}

/// A vaccine and its doses, in real-world administration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineCatalogEntry {
    pub id: String,
    pub label: String,
    pub doses: Vec<VaccineDose>,
}

impl VaccineCatalogEntry {
    pub fn new(id: impl Into<String>, label: impl Into<String>, doses: Vec<VaccineDose>) -> Self {
        VaccineCatalogEntry {
            id: id.into(),
            label: label.into(),
            doses,
        }
    }

    pub fn dose(&self, code: &str) -> Option<&VaccineDose> {
        self.doses.iter().find(|d| d.code == code)
    }
}

/// Validated vaccine catalog: unique vaccine ids, unique dose codes per vaccine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VaccineCatalog {
    entries: Vec<VaccineCatalogEntry>,
}

impl VaccineCatalog {
    pub fn new(entries: Vec<VaccineCatalogEntry>) -> Result<Self> {
        let mut ids = HashSet::new();
        for entry in &entries {
            if !ids.insert(entry.id.as_str()) {
                return Err(ChildHealthError::DuplicateVaccine(entry.id.clone()));
            }
            let mut codes = HashSet::new();
            for dose in &entry.doses {
                if !codes.insert(dose.code.as_str()) {
                    return Err(ChildHealthError::DuplicateDose {
                        vaccine_id: entry.id.clone(),
                        dose_code: dose.code.clone(),
                    });
                }
            }
        }
        Ok(VaccineCatalog { entries })
    }

    /// Parse a JSON array of catalog entries
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<VaccineCatalogEntry> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// National childhood immunization schedule, birth to 6 years
    pub fn national_schedule() -> Self {
        let dose = |code: &str, label: &str, target: u32| VaccineDose::new(code, label, Some(target));
        let primary_series = |booster: u32| {
            vec![
                dose("D1", "1st dose", 2),
                dose("D2", "2nd dose", 4),
                dose("D3", "3rd dose", 6),
                dose("R1", "Booster", booster),
            ]
        };

        VaccineCatalog {
            entries: vec![
                VaccineCatalogEntry::new("BCG", "BCG", vec![dose("U", "Single dose", 0)]),
                VaccineCatalogEntry::new("HEPB", "Hepatitis B", vec![dose("D0", "Birth dose", 0)]),
                VaccineCatalogEntry::new("PENTA", "Pentavalent (DTP/Hib/HepB)", primary_series(15)),
                VaccineCatalogEntry::new("POLIO", "Poliomyelitis", primary_series(15)),
                VaccineCatalogEntry::new(
                    "PNEUMO",
                    "Pneumococcal 10-valent",
                    vec![dose("D1", "1st dose", 2), dose("D2", "2nd dose", 4), dose("R1", "Booster", 12)],
                ),
                VaccineCatalogEntry::new(
                    "MENINGO",
                    "Meningococcal C/ACWY",
                    vec![dose("D1", "1st dose", 3), dose("R1", "Booster", 12)],
                ),
                VaccineCatalogEntry::new(
                    "ROTA",
                    "Rotavirus",
                    vec![dose("D1", "1st dose", 2), dose("D2", "2nd dose", 4)],
                ),
                VaccineCatalogEntry::new(
                    "SCR",
                    "MMR (measles, mumps, rubella)",
                    vec![dose("D1", "1st dose", 12), dose("D2", "2nd dose", 15)],
                ),
                VaccineCatalogEntry::new(
                    "DTP",
                    "DTP",
                    vec![dose("R1", "1st booster", 48), dose("R2", "2nd booster", 72)],
                ),
                VaccineCatalogEntry::new(
                    "VARICELA",
                    "Varicella",
                    vec![dose("D1", "1st dose", 15), dose("D2", "2nd dose", 48)],
                ),
            ],
        }
    }

    pub fn entries(&self) -> &[VaccineCatalogEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&VaccineCatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Total number of doses across all vaccines
    pub fn total_doses(&self) -> usize {
        self.entries.iter().map(|e| e.doses.len()).sum()
    }
}

impl Default for VaccineCatalog {
    fn default() -> Self {
        Self::national_schedule()
    }
}

impl<'de> Deserialize<'de> for VaccineCatalog {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let entries = Vec::<VaccineCatalogEntry>::deserialize(deserializer)?;
        VaccineCatalog::new(entries).map_err(serde::de::Error::custom)
    }
}

/// A dose given to a child
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineAdministrationRecord {
    pub child_id: String,
    pub vaccine_id: String,
    pub dose_code: String,
    /// ISO-8601 date of administration
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl VaccineAdministrationRecord {
    pub fn new(
        child_id: impl Into<String>,
        vaccine_id: impl Into<String>,
        dose_code: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        VaccineAdministrationRecord {
            child_id: child_id.into(),
            vaccine_id: vaccine_id.into(),
            dose_code: dose_code.into(),
            date: date.into(),
            lot: None,
            site: None,
            provider: None,
            notes: None,
        }
    }

    pub fn key(&self) -> DoseKey {
        DoseKey::new(&self.vaccine_id, &self.dose_code)
    }
}

/// Identity of a dose for "has it been given" purposes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DoseKey {
    pub vaccine_id: String,
    pub dose_code: String,
}

impl DoseKey {
    pub fn new(vaccine_id: impl Into<String>, dose_code: impl Into<String>) -> Self {
        DoseKey {
            vaccine_id: vaccine_id.into(),
            dose_code: dose_code.into(),
        }
    }
}

/// Set of administered doses. Repeated records of one dose count once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdministeredDoses {
    keys: HashSet<DoseKey>,
}

impl AdministeredDoses {
    pub fn from_records(records: &[VaccineAdministrationRecord]) -> Self {
        records.iter().collect()
    }

    pub fn insert(&mut self, key: DoseKey) -> bool {
        self.keys.insert(key)
    }

    pub fn contains(&self, vaccine_id: &str, dose_code: &str) -> bool {
        self.keys.contains(&DoseKey::new(vaccine_id, dose_code))
    }

    pub fn is_administered(&self, vaccine: &VaccineCatalogEntry, dose: &VaccineDose) -> bool {
        self.contains(&vaccine.id, &dose.code)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<'a> FromIterator<&'a VaccineAdministrationRecord> for AdministeredDoses {
    fn from_iter<I: IntoIterator<Item = &'a VaccineAdministrationRecord>>(iter: I) -> Self {
        AdministeredDoses {
            keys: iter.into_iter().map(VaccineAdministrationRecord::key).collect(),
        }
    }
}

impl FromIterator<DoseKey> for AdministeredDoses {
    fn from_iter<I: IntoIterator<Item = DoseKey>>(iter: I) -> Self {
        AdministeredDoses {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Doses of one vaccine whose target age has passed without administration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pendency<'a> {
    #[serde(serialize_with = "serialize_vaccine_ref")]
    pub vaccine: &'a VaccineCatalogEntry,
    pub doses: Vec<&'a VaccineDose>,
}

/// A dose not yet administered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextDose<'a> {
    #[serde(serialize_with = "serialize_vaccine_ref")]
    pub vaccine: &'a VaccineCatalogEntry,
    pub dose: &'a VaccineDose,
    pub overdue: bool,
}

// Views name the vaccine by id and label; its doses are not repeated
fn serialize_vaccine_ref<S>(vaccine: &&VaccineCatalogEntry, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    #[derive(Serialize)]
    struct VaccineRef<'v> {
        id: &'v str,
        label: &'v str,
    }

    VaccineRef {
        id: &vaccine.id,
        label: &vaccine.label,
    }
    .serialize(serializer)
}

/// Pending doses grouped by vaccine, in catalog order.
///
/// Only doses with a target age strictly below `age_months` qualify;
/// doses without a target are never pending.
pub fn pendencies<'a>(
    catalog: &'a VaccineCatalog,
    administered: &AdministeredDoses,
    age_months: u32,
) -> Vec<Pendency<'a>> {
    catalog
        .entries()
        .iter()
        .filter_map(|vaccine| {
            let doses: Vec<&VaccineDose> = vaccine
                .doses
                .iter()
                .filter(|dose| !administered.is_administered(vaccine, dose))
                .filter(|dose| dose.is_overdue_at(age_months))
                .collect();
            if doses.is_empty() {
                None
            } else {
                Some(Pendency { vaccine, doses })
            }
        })
        .collect()
}

/// Every non-administered dose, ordered by target age.
///
/// Doses without a target sort last. Equal targets are ordered by vaccine
/// label (byte-wise), then catalog order.
pub fn next_due<'a>(catalog: &'a VaccineCatalog, administered: &AdministeredDoses, age_months: u32) -> Vec<NextDose<'a>> {
    let mut due: Vec<NextDose<'a>> = catalog
        .entries()
        .iter()
        .flat_map(move |vaccine| {
            vaccine
                .doses
                .iter()
                .filter(move |dose| !administered.is_administered(vaccine, dose))
                .map(move |dose| NextDose {
                    vaccine,
                    dose,
                    overdue: dose.is_overdue_at(age_months),
                })
        })
        .collect();

    due.sort_by(|a, b| {
        let target_a = a.dose.target_age_months.unwrap_or(u32::MAX);
        let target_b = b.dose.target_age_months.unwrap_or(u32::MAX);
        target_a.cmp(&target_b).then_with(|| a.vaccine.label.cmp(&b.vaccine.label))
    });

    due
}

/// Dose counts for a coverage overview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Administration records on file
    pub administered: usize,
    /// Doses across all pendencies
    pub pending: usize,
    /// Entries in the next-due list
    pub upcoming: usize,
    /// Doses in the whole catalog
    pub total_doses: usize,
}

impl CoverageSummary {
    /// Summarize already-resolved views without recomputing them
    pub fn from_views(
        pendencies: &[Pendency<'_>],
        next_due: &[NextDose<'_>],
        administered: usize,
        total_doses: usize,
    ) -> Self {
        CoverageSummary {
            administered,
            pending: pendencies.iter().map(|p| p.doses.len()).sum(),
            upcoming: next_due.len(),
            total_doses,
        }
    }

    /// `value` as a percentage of the catalog total, capped at 100
    pub fn percent_of_total(&self, value: usize) -> u8 {
        let total = self.total_doses.max(1) as f64;
        ((value as f64 / total) * 100.0).round().min(100.0) as u8
    }
}

/// Schedule resolution for one child at one age
#[derive(Debug, Clone)]
pub struct ScheduleResolver<'a> {
    catalog: &'a VaccineCatalog,
    administered: AdministeredDoses,
    record_count: usize,
    age_months: u32,
}

impl<'a> ScheduleResolver<'a> {
    pub fn new(catalog: &'a VaccineCatalog, records: &[VaccineAdministrationRecord], age_months: u32) -> Self {
        ScheduleResolver {
            catalog,
            administered: AdministeredDoses::from_records(records),
            record_count: records.len(),
            age_months,
        }
    }

    /// Resolver at the child's age on `today`; no birth date means age 0
    pub fn for_child(
        catalog: &'a VaccineCatalog,
        birth_iso: Option<&str>,
        today: NaiveDate,
        records: &[VaccineAdministrationRecord],
    ) -> Self {
        Self::new(catalog, records, age_in_months_on(birth_iso, today))
    }

    pub fn age_months(&self) -> u32 {
        self.age_months
    }

    pub fn administered(&self) -> &AdministeredDoses {
        &self.administered
    }

    pub fn pendencies(&self) -> Vec<Pendency<'a>> {
        pendencies(self.catalog, &self.administered, self.age_months)
    }

    pub fn next_due(&self) -> Vec<NextDose<'a>> {
        next_due(self.catalog, &self.administered, self.age_months)
    }

    pub fn coverage(&self) -> CoverageSummary {
        self.coverage_of(&self.pendencies(), &self.next_due())
    }

    /// Coverage over views this resolver already produced
    pub fn coverage_of(&self, pendencies: &[Pendency<'_>], next_due: &[NextDose<'_>]) -> CoverageSummary {
        CoverageSummary::from_views(pendencies, next_due, self.record_count, self.catalog.total_doses())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_abc() -> VaccineCatalog {
        VaccineCatalog::new(vec![
            VaccineCatalogEntry::new("A", "A", vec![VaccineDose::new("D1", "1st dose", Some(12))]),
            VaccineCatalogEntry::new("B", "B", vec![VaccineDose::new("D1", "1st dose", Some(6))]),
            VaccineCatalogEntry::new("C", "C", vec![VaccineDose::new("D1", "Any age", None)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_next_due_sort_order() {
        let catalog = catalog_abc();
        let due = next_due(&catalog, &AdministeredDoses::default(), 18);

        let order: Vec<(&str, bool)> = due.iter().map(|d| (d.vaccine.id.as_str(), d.overdue)).collect();
        assert_eq!(order, vec![("B", true), ("A", true), ("C", false)]);
    }

    #[test]
    fn test_overdue_dose_in_both_views() {
        let catalog = VaccineCatalog::new(vec![VaccineCatalogEntry::new(
            "ROTA",
            "Rotavirus",
            vec![VaccineDose::new("D1", "1st dose", Some(2))],
        )])
        .unwrap();
        let administered = AdministeredDoses::default();

        let pending = pendencies(&catalog, &administered, 6);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].vaccine.id, "ROTA");
        assert_eq!(pending[0].doses[0].code, "D1");

        let due = next_due(&catalog, &administered, 6);
        assert_eq!(due.len(), 1);
        assert!(due[0].overdue);
    }

    #[test]
    fn test_target_equal_to_age_is_not_overdue() {
        let catalog = catalog_abc();
        let administered = AdministeredDoses::default();

        assert!(pendencies(&catalog, &administered, 6).is_empty());
        let due = next_due(&catalog, &administered, 6);
        assert_eq!(due[0].vaccine.id, "B");
        assert!(!due[0].overdue);
    }

    #[test]
    fn test_untargeted_doses_never_pending() {
        let catalog = catalog_abc();
        let pending = pendencies(&catalog, &AdministeredDoses::default(), 600);
        let ids: Vec<&str> = pending.iter().map(|p| p.vaccine.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_administered_doses_excluded() {
        let catalog = catalog_abc();
        let records = vec![
            VaccineAdministrationRecord::new("c1", "B", "D1", "2024-01-01"),
            VaccineAdministrationRecord::new("c1", "B", "D1", "2024-02-01"),
        ];
        let administered = AdministeredDoses::from_records(&records);
        assert_eq!(administered.len(), 1);

        let due = next_due(&catalog, &administered, 18);
        assert!(due.iter().all(|d| d.vaccine.id != "B"));
        assert!(pendencies(&catalog, &administered, 18).iter().all(|p| p.vaccine.id != "B"));
    }

    #[test]
    fn test_dose_key_has_no_separator_collisions() {
        let administered: AdministeredDoses = vec![DoseKey::new("A:B", "C")].into_iter().collect();
        assert!(administered.contains("A:B", "C"));
        assert!(!administered.contains("A", "B:C"));
    }

    #[test]
    fn test_ties_broken_by_label_case_sensitive() {
        let catalog = VaccineCatalog::new(vec![
            VaccineCatalogEntry::new("x", "beta", vec![VaccineDose::new("D1", "1st dose", Some(4))]),
            VaccineCatalogEntry::new("y", "Alpha", vec![VaccineDose::new("D1", "1st dose", Some(4))]),
            VaccineCatalogEntry::new("z", "Beta", vec![VaccineDose::new("D1", "1st dose", Some(4))]),
        ])
        .unwrap();
        let due = next_due(&catalog, &AdministeredDoses::default(), 0);
        let labels: Vec<&str> = due.iter().map(|d| d.vaccine.label.as_str()).collect();
        assert_eq!(labels, vec!["Alpha", "Beta", "beta"]);
    }

    #[test]
    fn test_catalog_validation() {
        let duplicate_vaccine = VaccineCatalog::new(vec![
            VaccineCatalogEntry::new("A", "A", vec![]),
            VaccineCatalogEntry::new("A", "A again", vec![]),
        ]);
        assert!(matches!(duplicate_vaccine, Err(ChildHealthError::DuplicateVaccine(id)) if id == "A"));

        let duplicate_dose = VaccineCatalog::new(vec![VaccineCatalogEntry::new(
            "A",
            "A",
            vec![VaccineDose::new("D1", "1st", Some(2)), VaccineDose::new("D1", "again", Some(4))],
        )]);
        assert!(matches!(duplicate_dose, Err(ChildHealthError::DuplicateDose { .. })));
    }

    #[test]
    fn test_national_schedule() {
        let catalog = VaccineCatalog::national_schedule();
        assert!(VaccineCatalog::new(catalog.entries().to_vec()).is_ok());
        assert_eq!(catalog.entries().len(), 10);
        assert_eq!(catalog.total_doses(), 23);
        assert_eq!(catalog.get("PENTA").and_then(|v| v.dose("R1")).and_then(|d| d.target_age_months), Some(15));
        assert!(catalog.get("UNKNOWN").is_none());
    }

    #[test]
    fn test_catalog_json_roundtrip_keeps_order() {
        let json = r#"[
            {"id": "HEPB", "label": "Hepatitis B", "doses": [{"code": "D0", "label": "Birth dose"}]},
            {"id": "ROTA", "label": "Rotavirus", "doses": [{"code": "D1", "label": "1st dose", "target_age_months": 2}]}
        ]"#;
        let catalog = VaccineCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.entries()[0].doses[0].target_age_months, None);
        assert_eq!(catalog.entries()[1].id, "ROTA");
    }

    #[test]
    fn test_resolver_for_child_and_coverage() {
        let catalog = VaccineCatalog::national_schedule();
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let records = vec![
            VaccineAdministrationRecord::new("c1", "BCG", "U", "2023-06-16"),
            VaccineAdministrationRecord::new("c1", "HEPB", "D0", "2023-06-16"),
        ];
        let resolver = ScheduleResolver::for_child(&catalog, Some("2023-06-15"), today, &records);
        assert_eq!(resolver.age_months(), 6);

        // Targets below 6: PENTA/POLIO D1 D2, PNEUMO D1 D2, MENINGO D1, ROTA D1 D2
        let coverage = resolver.coverage();
        assert_eq!(coverage.administered, 2);
        assert_eq!(coverage.pending, 9);
        assert_eq!(coverage.upcoming, 21);
        assert_eq!(coverage.total_doses, 23);
        assert_eq!(coverage.percent_of_total(coverage.administered), 9);
    }

    #[test]
    fn test_resolver_without_birth_uses_age_zero() {
        let catalog = VaccineCatalog::national_schedule();
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let resolver = ScheduleResolver::for_child(&catalog, None, today, &[]);
        assert_eq!(resolver.age_months(), 0);
        assert!(resolver.pendencies().is_empty());
        assert!(resolver.next_due().iter().all(|d| !d.overdue));
    }

    #[test]
    fn test_coverage_from_views_matches_resolver() {
        let catalog = VaccineCatalog::national_schedule();
        let records = vec![VaccineAdministrationRecord::new("c1", "BCG", "U", "2023-06-16")];
        let resolver = ScheduleResolver::new(&catalog, &records, 6);

        let pending = resolver.pendencies();
        let due = resolver.next_due();
        let summary = resolver.coverage_of(&pending, &due);
        assert_eq!(summary, resolver.coverage());
        assert_eq!(summary, CoverageSummary::from_views(&pending, &due, 1, 23));
        assert_eq!(summary.upcoming, 22);
    }

    #[test]
    fn test_views_serialize_vaccine_reference_only() {
        let catalog = VaccineCatalog::national_schedule();
        let resolver = ScheduleResolver::new(&catalog, &[], 6);

        let due = serde_json::to_value(&resolver.next_due()[0]).unwrap();
        assert_eq!(due["vaccine"], serde_json::json!({"id": "BCG", "label": "BCG"}));
        assert_eq!(due["dose"]["code"], "U");
        assert_eq!(due["overdue"], true);

        let pending = serde_json::to_value(&resolver.pendencies()[0]).unwrap();
        assert!(pending["vaccine"].get("doses").is_none());
        assert_eq!(pending["doses"][0]["code"], "U");
    }

    #[test]
    fn test_percent_of_total_caps_and_handles_empty() {
        let empty = CoverageSummary { administered: 3, pending: 0, upcoming: 0, total_doses: 0 };
        assert_eq!(empty.percent_of_total(3), 100);
        assert_eq!(empty.percent_of_total(0), 0);
    }
}
