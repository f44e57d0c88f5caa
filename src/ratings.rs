//! Derived labels computed on read and never persisted.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::schema::collections::{CITIZENS, GREEN_CHAMPIONS, WASTE_FACILITIES, WASTE_WORKERS};
use crate::utils::json::lookup_f64;

pub const COMPLIANCE_STATUS: &str = "complianceStatus";
pub const PERFORMANCE_RATING: &str = "performanceRating";
pub const UTILIZATION: &str = "utilization";

const DERIVED_FIELDS: &[&str] = &[COMPLIANCE_STATUS, PERFORMANCE_RATING, UTILIZATION];

const PRIMARY_WEIGHT: f64 = 0.6;
const SECONDARY_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RatingLabel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl RatingLabel {
    pub const ALL: [RatingLabel; 4] = [
        RatingLabel::Excellent,
        RatingLabel::Good,
        RatingLabel::Fair,
        RatingLabel::Poor,
    ];

    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RatingLabel::Excellent
        } else if score >= 70.0 {
            RatingLabel::Good
        } else if score >= 50.0 {
            RatingLabel::Fair
        } else {
            RatingLabel::Poor
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RatingLabel::Excellent => "Excellent",
            RatingLabel::Good => "Good",
            RatingLabel::Fair => "Fair",
            RatingLabel::Poor => "Poor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceRating {
    pub score: f64,
    pub label: RatingLabel,
}

/// `part / whole` as a percentage, `None` when `whole` is not positive.
pub fn percentage(part: f64, whole: f64) -> Option<f64> {
    (whole > 0.0).then(|| (part / whole * 100.0).clamp(0.0, 100.0))
}

/// Weighted blend of two percentages, rounded to one decimal.
pub fn weighted_rating(primary: f64, secondary: f64) -> PerformanceRating {
    let raw = (PRIMARY_WEIGHT * primary + SECONDARY_WEIGHT * secondary).clamp(0.0, 100.0);
    let score = (raw * 10.0).round() / 10.0;
    PerformanceRating {
        score,
        label: RatingLabel::from_score(score),
    }
}

pub fn citizen_compliance(document: &Value) -> Option<f64> {
    lookup_f64(document, "segregationCompliance.score")
}

fn ratio(document: &Value, part: &str, whole: &str) -> Option<f64> {
    percentage(lookup_f64(document, part)?, lookup_f64(document, whole)?)
}

/// Collection coverage and segregated-pickup share.
pub fn worker_rating(document: &Value) -> Option<PerformanceRating> {
    let coverage = ratio(
        document,
        "performanceMetrics.housesCovered",
        "performanceMetrics.housesAssigned",
    )?;
    let segregation = ratio(
        document,
        "performanceMetrics.segregatedCollections",
        "performanceMetrics.totalCollections",
    )?;
    Some(weighted_rating(coverage, segregation))
}

/// Training reach and inspection completion.
pub fn champion_rating(document: &Value) -> Option<PerformanceRating> {
    let training = ratio(
        document,
        "performanceMetrics.citizensTrained",
        "performanceMetrics.citizensAssigned",
    )?;
    let inspections = ratio(
        document,
        "performanceMetrics.inspectionsCompleted",
        "performanceMetrics.inspectionsScheduled",
    )?;
    Some(weighted_rating(training, inspections))
}

pub fn facility_utilization(document: &Value) -> Option<f64> {
    let capacity = lookup_f64(document, "capacity")?;
    let load = lookup_f64(document, "currentLoad").unwrap_or(0.0);
    (capacity > 0.0).then(|| ((load / capacity * 100.0) * 10.0).round() / 10.0)
}

pub fn decorate(collection: &str, document: &mut Value) {
    let derived = match collection {
        CITIZENS => citizen_compliance(document)
            .map(|score| (COMPLIANCE_STATUS, json!(RatingLabel::from_score(score)))),
        WASTE_WORKERS => worker_rating(document).map(|rating| (PERFORMANCE_RATING, json!(rating))),
        GREEN_CHAMPIONS => {
            champion_rating(document).map(|rating| (PERFORMANCE_RATING, json!(rating)))
        }
        WASTE_FACILITIES => facility_utilization(document).map(|u| (UTILIZATION, json!(u))),
        _ => None,
    };

    if let (Some((key, value)), Some(fields)) = (derived, document.as_object_mut()) {
        fields.insert(key.to_string(), value);
    }
}

pub fn strip_derived(fields: &mut Map<String, Value>) {
    for key in DERIVED_FIELDS {
        fields.remove(*key);
    }
}
