//! Per-collection field table and presence validation.
//!
//! The document store is schema-on-read; this table is the only place the
//! application states which fields a document must carry. Validation checks
//! presence only: a field counts as present when its key exists and its value
//! is not `null`. Shape and type are left to readers.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub mod collections {
    pub const USERS: &str = "users";
    pub const CITIZENS: &str = "citizens";
    pub const WASTE_WORKERS: &str = "wasteWorkers";
    pub const GREEN_CHAMPIONS: &str = "greenChampions";
    pub const ULBS: &str = "ulbs";
    pub const POLICIES: &str = "policies";
    pub const WASTE_FACILITIES: &str = "wasteFacilities";
    pub const WASTE_GUIDELINES: &str = "wasteGuidelines";
    pub const WASTE_RECORDS: &str = "wasteRecords";
    pub const COLLECTION_VEHICLES: &str = "collectionVehicles";
    pub const MONITORING_REPORTS: &str = "monitoringReports";
    pub const INCENTIVES: &str = "incentives";
    pub const COMMUNITY_REPORTS: &str = "communityReports";
    pub const SHOP_ITEMS: &str = "shopItems";
}

use collections::*;

#[derive(Debug, Serialize)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

pub static COLLECTIONS: &[CollectionSchema] = &[
    CollectionSchema {
        name: USERS,
        required: &["email", "passwordHash", "role"],
        optional: &["name", "isActive", "permissions", "lastLogin", "passwordChangedAt"],
    },
    CollectionSchema {
        name: CITIZENS,
        required: &["personalInfo", "aadhaar", "address"],
        optional: &[
            "trainingStatus",
            "segregationCompliance",
            "rewardPoints",
            "penaltyHistory",
            "householdType",
            "ulbCode",
        ],
    },
    CollectionSchema {
        name: WASTE_WORKERS,
        required: &["personalInfo", "employeeId", "areaAssigned"],
        optional: &[
            "performanceMetrics",
            "trainingStatus",
            "safetyKit",
            "shift",
            "ulbCode",
        ],
    },
    CollectionSchema {
        name: GREEN_CHAMPIONS,
        required: &["personalInfo", "areaAssigned"],
        optional: &["performanceMetrics", "certifications", "ulbCode"],
    },
    CollectionSchema {
        name: ULBS,
        required: &["name", "code", "state", "district"],
        optional: &[
            "population",
            "wasteManagementStatus",
            "policies",
            "contactInfo",
        ],
    },
    CollectionSchema {
        name: POLICIES,
        required: &["title", "ulbCode", "category"],
        optional: &["description", "effectiveFrom", "status", "documentUrl"],
    },
    CollectionSchema {
        name: WASTE_FACILITIES,
        required: &["name", "type", "location", "capacity"],
        optional: &["currentLoad", "efficiency", "status", "operator", "ulbCode"],
    },
    CollectionSchema {
        name: WASTE_GUIDELINES,
        required: &["categories"],
        optional: &["version", "lastUpdated"],
    },
    CollectionSchema {
        name: WASTE_RECORDS,
        required: &["source", "category", "quantityKg"],
        optional: &["collectedAt", "collectedBy", "facilityId", "bulkGenerator"],
    },
    CollectionSchema {
        name: COLLECTION_VEHICLES,
        required: &["vehicleNumber", "type", "capacity"],
        optional: &["route", "driver", "status", "lastServiced", "ulbCode"],
    },
    CollectionSchema {
        name: MONITORING_REPORTS,
        required: &["area", "inspector", "findings"],
        optional: &["complianceScore", "photos", "status", "followUpDate"],
    },
    CollectionSchema {
        name: INCENTIVES,
        required: &["recipientId", "kind", "points"],
        optional: &["recipientType", "reason", "issuedBy", "status"],
    },
    CollectionSchema {
        name: COMMUNITY_REPORTS,
        required: &["reportedBy", "category", "location"],
        optional: &["description", "status", "photos", "upvotes"],
    },
    CollectionSchema {
        name: SHOP_ITEMS,
        required: &["name", "price", "stock"],
        optional: &["category", "description", "imageUrl", "ecoPointsPrice"],
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),
    #[error("{collection} document must be a JSON object")]
    NotAnObject { collection: String },
    #[error("Missing required fields: {}", fields.join(", "))]
    MissingFields {
        collection: String,
        fields: Vec<String>,
    },
}

pub fn schema_for(collection: &str) -> Option<&'static CollectionSchema> {
    COLLECTIONS.iter().find(|schema| schema.name == collection)
}

pub fn validate_document(collection: &str, document: &Value) -> Result<(), ValidationError> {
    let schema = schema_for(collection)
        .ok_or_else(|| ValidationError::UnknownCollection(collection.to_string()))?;
    let fields = document
        .as_object()
        .ok_or_else(|| ValidationError::NotAnObject {
            collection: collection.to_string(),
        })?;

    let missing: Vec<String> = schema
        .required
        .iter()
        .filter(|field| fields.get(**field).map_or(true, Value::is_null))
        .map(|field| field.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields {
            collection: collection.to_string(),
            fields: missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_citizen_names_every_required_field() {
        let err = validate_document(CITIZENS, &json!({})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingFields {
                collection: CITIZENS.into(),
                fields: vec!["personalInfo".into(), "aadhaar".into(), "address".into()],
            }
        );
        assert_eq!(
            err.to_string(),
            "Missing required fields: personalInfo, aadhaar, address"
        );
    }

    #[test]
    fn empty_objects_count_as_present() {
        let doc = json!({ "personalInfo": {}, "aadhaar": "x", "address": {} });
        assert!(validate_document(CITIZENS, &doc).is_ok());
    }

    #[test]
    fn null_values_are_missing() {
        let doc = json!({ "personalInfo": {}, "aadhaar": null, "address": {} });
        let err = validate_document(CITIZENS, &doc).unwrap_err();
        assert!(matches!(err, ValidationError::MissingFields { fields, .. } if fields == ["aadhaar"]));
    }

    #[test]
    fn rejects_unknown_collection_and_non_objects() {
        assert_eq!(
            validate_document("spaceships", &json!({})),
            Err(ValidationError::UnknownCollection("spaceships".into()))
        );
        assert!(matches!(
            validate_document(CITIZENS, &json!([1, 2])),
            Err(ValidationError::NotAnObject { .. })
        ));
    }

    #[test]
    fn collection_names_are_unique() {
        let mut names: Vec<_> = COLLECTIONS.iter().map(|schema| schema.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COLLECTIONS.len());
    }

    #[test]
    fn required_and_optional_do_not_overlap() {
        for schema in COLLECTIONS {
            for field in schema.required {
                assert!(
                    !schema.optional.contains(field),
                    "{} lists {field} twice",
                    schema.name
                );
            }
        }
    }
}
