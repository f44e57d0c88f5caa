//! Startup seeding.
//!
//! Every step is an existence check followed by a write, so running the whole
//! sequence again after a partial failure completes whatever is missing. The
//! admin account is the only document ever overwritten: unless repair is
//! disabled or the password was changed on purpose (and still has a usable
//! hash), its hash is checked against the configured default credential on
//! every start and regenerated when it no longer verifies. Its email follows
//! the configured admin email.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    auth::password,
    config::AppConfig,
    models::{self, Role, User},
    schema::{
        collections::{ULBS, USERS, WASTE_FACILITIES, WASTE_GUIDELINES},
        validate_document,
    },
    store::DocumentStore,
};

pub const ADMIN_USER_ID: &str = "admin-user";
pub const SAMPLE_ULB_ID: &str = "sample-ulb";
pub const GUIDELINES_ID: &str = "default";
pub const SAMPLE_FACILITY_IDS: [&str; 3] = ["facility-001", "facility-002", "facility-003"];

const ADMIN_PERMISSIONS: &[&str] = &[
    "manage_users",
    "manage_ulbs",
    "manage_facilities",
    "manage_incentives",
    "view_analytics",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminSeedOutcome {
    Created,
    Verified,
    Repaired,
    /// Repair disabled; whatever is stored stays.
    Untouched,
    /// The password was changed through the API and is no longer the default.
    Customized,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapReport {
    pub admin: AdminSeedOutcome,
    pub ulb_created: bool,
    pub guidelines_created: bool,
    pub facilities_created: usize,
}

pub async fn initialize(store: &dyn DocumentStore, config: &AppConfig) -> Result<BootstrapReport> {
    let admin = initialize_admin_user(store, config)
        .await
        .context("failed to initialize admin user")?;
    let ulb_created = ensure_sample_ulb(store)
        .await
        .context("failed to seed sample ULB")?;
    let guidelines_created = ensure_waste_guidelines(store)
        .await
        .context("failed to seed waste guidelines")?;
    let facilities_created = ensure_sample_facilities(store)
        .await
        .context("failed to seed sample facilities")?;

    let report = BootstrapReport {
        admin,
        ulb_created,
        guidelines_created,
        facilities_created,
    };
    tracing::info!(
        component = "bootstrap",
        admin = ?report.admin,
        ulb_created,
        guidelines_created,
        facilities_created,
        "seed documents ensured"
    );
    Ok(report)
}

fn default_admin(config: &AppConfig) -> Result<User> {
    let now = Utc::now();
    Ok(User {
        id: ADMIN_USER_ID.to_string(),
        email: models::normalize_email(&config.admin_email),
        name: "System Administrator".to_string(),
        password_hash: Some(password::hash_password(&config.admin_default_password)?),
        role: Role::Admin.as_str().to_string(),
        is_active: true,
        permissions: ADMIN_PERMISSIONS.iter().map(|p| p.to_string()).collect(),
        created_at: now,
        updated_at: now,
        last_login: None,
        password_changed_at: None,
    })
}

pub async fn initialize_admin_user(
    store: &dyn DocumentStore,
    config: &AppConfig,
) -> Result<AdminSeedOutcome> {
    let Some(raw) = store.get(USERS, ADMIN_USER_ID).await? else {
        let admin = default_admin(config)?;
        validate_document(USERS, &serde_json::to_value(&admin)?)?;
        models::save_user(store, &admin).await?;
        tracing::info!(component = "bootstrap", email = %admin.email, "created admin user");
        return Ok(AdminSeedOutcome::Created);
    };

    if !config.admin_auto_repair {
        tracing::info!(component = "bootstrap", "admin auto-repair disabled; leaving admin user untouched");
        return Ok(AdminSeedOutcome::Untouched);
    }

    let mut admin = match serde_json::from_value::<User>(raw) {
        Ok(admin) => admin,
        Err(err) => {
            tracing::warn!(component = "bootstrap", error = %err, "stored admin user is malformed; rebuilding");
            let admin = default_admin(config)?;
            models::save_user(store, &admin).await?;
            return Ok(AdminSeedOutcome::Repaired);
        }
    };

    let expected_email = models::normalize_email(&config.admin_email);
    let usable_hash = admin
        .password_hash
        .as_deref()
        .is_some_and(password::is_usable_hash);
    if admin.password_changed_at.is_some() && usable_hash {
        return Ok(AdminSeedOutcome::Customized);
    }

    let verified = admin
        .password_hash
        .as_deref()
        .map(|hash| password::verify_password(&config.admin_default_password, hash))
        .transpose()
        .unwrap_or_else(|err| {
            tracing::warn!(component = "bootstrap", error = %err, "stored admin hash is unreadable");
            None
        })
        .unwrap_or(false);

    if verified && admin.email == expected_email {
        return Ok(AdminSeedOutcome::Verified);
    }

    if !verified {
        tracing::warn!(
            component = "bootstrap",
            email = %expected_email,
            "admin password does not verify against the default credential; regenerating hash"
        );
        admin.password_hash = Some(password::hash_password(&config.admin_default_password)?);
        admin.password_changed_at = None;
    }
    if admin.email != expected_email {
        tracing::warn!(
            component = "bootstrap",
            from = %admin.email,
            to = %expected_email,
            "admin email differs from configuration; resetting"
        );
        admin.email = expected_email;
    }
    admin.updated_at = Utc::now();
    admin.is_active = true;
    admin.role = Role::Admin.as_str().to_string();
    models::save_user(store, &admin).await?;
    Ok(AdminSeedOutcome::Repaired)
}

async fn ensure_document(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    mut document: Value,
) -> Result<bool> {
    if store.get(collection, id).await?.is_some() {
        return Ok(false);
    }

    let now = Utc::now().to_rfc3339();
    if let Some(fields) = document.as_object_mut() {
        fields.insert("id".into(), json!(id));
        fields.insert("createdAt".into(), json!(now));
        fields.insert("updatedAt".into(), json!(now));
    }
    validate_document(collection, &document)?;
    store.put(collection, id, &document).await?;
    tracing::info!(component = "bootstrap", collection, id, "seeded document");
    Ok(true)
}

pub async fn ensure_sample_ulb(store: &dyn DocumentStore) -> Result<bool> {
    ensure_document(store, ULBS, SAMPLE_ULB_ID, sample_ulb()).await
}

pub async fn ensure_waste_guidelines(store: &dyn DocumentStore) -> Result<bool> {
    ensure_document(store, WASTE_GUIDELINES, GUIDELINES_ID, waste_guidelines()).await
}

/// Returns how many of the sample facilities had to be written.
pub async fn ensure_sample_facilities(store: &dyn DocumentStore) -> Result<usize> {
    let mut created = 0;
    for (id, facility) in SAMPLE_FACILITY_IDS.into_iter().zip(sample_facilities()) {
        if ensure_document(store, WASTE_FACILITIES, id, facility).await? {
            created += 1;
        }
    }
    Ok(created)
}

fn sample_ulb() -> Value {
    json!({
        "name": "Sample Municipal Corporation",
        "code": "SMC001",
        "state": "Maharashtra",
        "district": "Pune",
        "population": 350000,
        "wasteManagementStatus": {
            "dailyGenerationTonnes": 120,
            "segregationRate": 68,
            "collectionCoverage": 92,
            "processingRate": 74
        },
        "policies": {
            "plasticBan": true,
            "userCharges": true,
            "bulkGeneratorRules": true
        },
        "contactInfo": {
            "email": "swm@smc.gov.in",
            "phone": "020-25501000"
        }
    })
}

fn waste_guidelines() -> Value {
    json!({
        "version": 1,
        "categories": {
            "wet": {
                "label": "Wet / Biodegradable",
                "binColor": "green",
                "examples": ["vegetable peels", "food leftovers", "tea leaves", "garden waste"],
                "disposalMethod": "Home or community composting, biomethanation"
            },
            "dry": {
                "label": "Dry / Recyclable",
                "binColor": "blue",
                "examples": ["paper", "plastic bottles", "metal cans", "glass", "cardboard"],
                "disposalMethod": "Hand over to collection for material recovery facility"
            },
            "hazardous": {
                "label": "Domestic Hazardous",
                "binColor": "red",
                "examples": ["batteries", "expired medicines", "paint cans", "tube lights", "sanitary waste"],
                "disposalMethod": "Store separately and hand over to authorised hazardous waste collection"
            }
        }
    })
}

fn sample_facilities() -> [Value; 3] {
    [
        json!({
            "name": "Hadapsar Composting Plant",
            "type": "composting",
            "location": { "address": "Hadapsar Industrial Estate", "lat": 18.5089, "lng": 73.9260 },
            "capacity": 200,
            "currentLoad": 150,
            "efficiency": 85,
            "status": "operational",
            "ulbCode": "SMC001"
        }),
        json!({
            "name": "Kothrud Material Recovery Facility",
            "type": "mrf",
            "location": { "address": "Kothrud Depot Road", "lat": 18.5074, "lng": 73.8077 },
            "capacity": 100,
            "currentLoad": 60,
            "efficiency": 78,
            "status": "operational",
            "ulbCode": "SMC001"
        }),
        json!({
            "name": "Uruli Waste-to-Energy Plant",
            "type": "waste_to_energy",
            "location": { "address": "Uruli Devachi", "lat": 18.4560, "lng": 73.9840 },
            "capacity": 300,
            "currentLoad": 120,
            "efficiency": 65,
            "status": "maintenance",
            "ulbCode": "SMC001"
        }),
    ]
}
