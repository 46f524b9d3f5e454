//! Growth Reference Table
//!
//! Age-indexed population averages for weight, height and head
//! circumference, with linear interpolation between the sparse points.
//!
//! This is a coarse, interpretable baseline. It has no z-scores and no
//! sex-specific curves, and must not be presented as a clinical growth
//! percentile.

use crate::{ChildHealthError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single age-indexed reference value set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthReferencePoint {
    pub age_months: f64,
    pub avg_weight_kg: f64,
    pub avg_height_cm: f64,
    pub avg_head_circumference_cm: f64,
}

impl GrowthReferencePoint {
    pub const fn new(
        age_months: f64,
        avg_weight_kg: f64,
        avg_height_cm: f64,
        avg_head_circumference_cm: f64,
    ) -> Self {
        GrowthReferencePoint {
            age_months,
            avg_weight_kg,
            avg_height_cm,
            avg_head_circumference_cm,
        }
    }

    fn is_finite(&self) -> bool {
        self.age_months.is_finite()
            && self.avg_weight_kg.is_finite()
            && self.avg_height_cm.is_finite()
            && self.avg_head_circumference_cm.is_finite()
    }
}

/// Built-in reference values, 0 to 60 months
const DEFAULT_POINTS: [GrowthReferencePoint; 16] = [
    GrowthReferencePoint::new(0.0, 3.3, 50.0, 34.0),
    GrowthReferencePoint::new(1.0, 4.5, 54.0, 36.0),
    GrowthReferencePoint::new(2.0, 5.6, 58.0, 38.0),
    GrowthReferencePoint::new(3.0, 6.4, 61.0, 39.5),
    GrowthReferencePoint::new(4.0, 7.0, 63.0, 40.5),
    GrowthReferencePoint::new(5.0, 7.5, 65.0, 41.5),
    GrowthReferencePoint::new(6.0, 7.9, 67.0, 42.5),
    GrowthReferencePoint::new(9.0, 9.0, 71.0, 44.0),
    GrowthReferencePoint::new(12.0, 10.0, 74.0, 45.5),
    GrowthReferencePoint::new(15.0, 10.9, 77.0, 46.5),
    GrowthReferencePoint::new(18.0, 11.8, 80.0, 47.5),
    GrowthReferencePoint::new(24.0, 13.0, 85.0, 48.5),
    GrowthReferencePoint::new(30.0, 14.3, 89.0, 49.0),
    GrowthReferencePoint::new(36.0, 15.3, 95.0, 49.5),
    GrowthReferencePoint::new(48.0, 17.2, 102.0, 50.5),
    GrowthReferencePoint::new(60.0, 18.4, 109.0, 51.5),
];

/// A validated reference table: never empty, ages strictly ascending.
///
/// Bracketing uses binary search, so custom tables of any size stay cheap.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReferenceTable {
    points: Vec<GrowthReferencePoint>,
}

impl ReferenceTable {
    /// Build a table from points, validating order and values
    pub fn new(points: Vec<GrowthReferencePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(ChildHealthError::EmptyReferenceTable);
        }

        for (index, point) in points.iter().enumerate() {
            if !point.is_finite() {
                return Err(ChildHealthError::NonFiniteReferencePoint { index });
            }
        }

        for (index, pair) in points.windows(2).enumerate() {
            if pair[0].age_months >= pair[1].age_months {
                return Err(ChildHealthError::UnsortedReferenceTable {
                    index: index + 1,
                    previous: pair[0].age_months,
                    current: pair[1].age_months,
                });
            }
        }

        Ok(ReferenceTable { points })
    }

    /// Parse a JSON array of reference points
    pub fn from_json_str(json: &str) -> Result<Self> {
        let points: Vec<GrowthReferencePoint> = serde_json::from_str(json)?;
        Self::new(points)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn points(&self) -> &[GrowthReferencePoint] {
        &self.points
    }

    pub fn first(&self) -> &GrowthReferencePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &GrowthReferencePoint {
        &self.points[self.points.len() - 1]
    }

    /// Reference values at `age_months`.
    ///
    /// Ages outside the table return the nearest end point verbatim;
    /// ages inside are linearly interpolated per metric and tagged with
    /// the query age.
    pub fn reference_at(&self, age_months: f64) -> GrowthReferencePoint {
        let first = self.first();
        let last = self.last();

        if age_months.is_nan() || age_months <= first.age_months {
            return *first;
        }
        if age_months >= last.age_months {
            return *last;
        }

        // First index with age > query; 1..len given the clamps above
        let upper = self.points.partition_point(|p| p.age_months <= age_months);
        let lo = &self.points[upper - 1];
        let hi = &self.points[upper];

        if lo.age_months == age_months {
            return *lo;
        }

        let span = hi.age_months - lo.age_months;
        let t = if span > 0.0 { (age_months - lo.age_months) / span } else { 0.0 };

        GrowthReferencePoint {
            age_months,
            avg_weight_kg: interpolate(lo.avg_weight_kg, hi.avg_weight_kg, t),
            avg_height_cm: interpolate(lo.avg_height_cm, hi.avg_height_cm, t),
            avg_head_circumference_cm: interpolate(
                lo.avg_head_circumference_cm,
                hi.avg_head_circumference_cm,
                t,
            ),
        }
    }
}

impl Default for ReferenceTable {
    fn default() -> Self {
        ReferenceTable {
            points: DEFAULT_POINTS.to_vec(),
        }
    }
}

impl<'de> Deserialize<'de> for ReferenceTable {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let points = Vec::<GrowthReferencePoint>::deserialize(deserializer)?;
        ReferenceTable::new(points).map_err(serde::de::Error::custom)
    }
}

fn interpolate(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_default_table_is_valid() {
        let table = ReferenceTable::default();
        assert!(ReferenceTable::new(table.points().to_vec()).is_ok());
        assert_eq!(table.points().len(), 16);
    }

    #[test]
    fn test_clamps_below_and_above() {
        let table = ReferenceTable::default();
        assert_eq!(table.reference_at(-3.0), *table.first());
        assert_eq!(table.reference_at(0.0), *table.first());
        assert_eq!(table.reference_at(60.0), *table.last());
        assert_eq!(table.reference_at(240.0), *table.last());
        assert_eq!(table.reference_at(f64::NAN), *table.first());
    }

    #[test]
    fn test_exact_point_is_returned() {
        let table = ReferenceTable::default();
        let point = table.reference_at(12.0);
        assert_eq!(point, GrowthReferencePoint::new(12.0, 10.0, 74.0, 45.5));
    }

    #[test]
    fn test_interpolates_between_points() {
        let table = ReferenceTable::default();
        // Between 6 (7.9, 67, 42.5) and 9 (9.0, 71, 44.0), one third of the way
        let point = table.reference_at(7.0);
        assert_eq!(point.age_months, 7.0);
        assert!(approx(point.avg_weight_kg, 7.9 + 1.1 / 3.0));
        assert!(approx(point.avg_height_cm, 67.0 + 4.0 / 3.0));
        assert!(approx(point.avg_head_circumference_cm, 43.0));
    }

    #[test]
    fn test_single_point_table() {
        let only = GrowthReferencePoint::new(10.0, 9.5, 72.0, 45.0);
        let table = ReferenceTable::new(vec![only]).unwrap();
        assert_eq!(table.reference_at(0.0), only);
        assert_eq!(table.reference_at(10.0), only);
        assert_eq!(table.reference_at(30.0), only);
    }

    #[test]
    fn test_rejects_invalid_tables() {
        assert!(matches!(
            ReferenceTable::new(vec![]),
            Err(ChildHealthError::EmptyReferenceTable)
        ));

        let duplicate = vec![
            GrowthReferencePoint::new(0.0, 3.3, 50.0, 34.0),
            GrowthReferencePoint::new(0.0, 3.4, 50.5, 34.1),
        ];
        assert!(matches!(
            ReferenceTable::new(duplicate),
            Err(ChildHealthError::UnsortedReferenceTable { index: 1, .. })
        ));

        let non_finite = vec![GrowthReferencePoint::new(0.0, f64::INFINITY, 50.0, 34.0)];
        assert!(matches!(
            ReferenceTable::new(non_finite),
            Err(ChildHealthError::NonFiniteReferencePoint { index: 0 })
        ));
    }

    #[test]
    fn test_json_loading() {
        let json = r#"[
            {"age_months": 0, "avg_weight_kg": 3.0, "avg_height_cm": 49, "avg_head_circumference_cm": 33},
            {"age_months": 12, "avg_weight_kg": 9.0, "avg_height_cm": 73, "avg_head_circumference_cm": 45}
        ]"#;
        let table = ReferenceTable::from_json_str(json).unwrap();
        assert!(approx(table.reference_at(6.0).avg_weight_kg, 6.0));

        let unsorted = r#"[
            {"age_months": 12, "avg_weight_kg": 9.0, "avg_height_cm": 73, "avg_head_circumference_cm": 45},
            {"age_months": 0, "avg_weight_kg": 3.0, "avg_height_cm": 49, "avg_head_circumference_cm": 33}
        ]"#;
        assert!(ReferenceTable::from_json_str(unsorted).is_err());
        assert!(serde_json::from_str::<ReferenceTable>(unsorted).is_err());
    }
}
