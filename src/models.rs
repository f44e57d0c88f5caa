use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::collections::USERS;
use crate::store::DocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    UlbAdmin,
    Supervisor,
    GreenChampion,
    WasteWorker,
    Citizen,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::UlbAdmin => "ulb_admin",
            Role::Supervisor => "supervisor",
            Role::GreenChampion => "green_champion",
            Role::WasteWorker => "waste_worker",
            Role::Citizen => "citizen",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Role::Admin),
            "ulb_admin" => Ok(Role::UlbAdmin),
            "supervisor" => Ok(Role::Supervisor),
            "green_champion" => Ok(Role::GreenChampion),
            "waste_worker" => Ok(Role::WasteWorker),
            "citizen" => Ok(Role::Citizen),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

pub mod roles {
    use super::Role::{self, *};

    pub const ADMIN_ONLY: &[Role] = &[Admin];
    pub const MANAGERS: &[Role] = &[Admin, UlbAdmin];
    pub const STAFF: &[Role] = &[Admin, UlbAdmin, Supervisor];
    pub const STAFF_AND_CHAMPIONS: &[Role] = &[Admin, UlbAdmin, Supervisor, GreenChampion];
    pub const STAFF_AND_WORKERS: &[Role] = &[Admin, UlbAdmin, Supervisor, WasteWorker];
    pub const FIELD: &[Role] = &[Admin, UlbAdmin, Supervisor, WasteWorker, GreenChampion];
    pub const EVERYONE: &[Role] = &[
        Admin,
        UlbAdmin,
        Supervisor,
        GreenChampion,
        WasteWorker,
        Citizen,
    ];
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub role: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_changed_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
            permissions: self.permissions.clone(),
            is_active: self.is_active,
            last_login: self.last_login,
        }
    }
}

/// User as exposed over the API; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn load_user(store: &dyn DocumentStore, id: &str) -> Result<Option<User>> {
    match store.get(USERS, id).await? {
        Some(raw) => {
            let user = serde_json::from_value(raw)
                .with_context(|| format!("stored user {id} is malformed"))?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

pub async fn find_user_by_email(store: &dyn DocumentStore, email: &str) -> Result<Option<User>> {
    let email = serde_json::Value::String(normalize_email(email));
    match store.find_one(USERS, "email", &email).await? {
        Some(raw) => Ok(Some(
            serde_json::from_value(raw).context("stored user is malformed")?,
        )),
        None => Ok(None),
    }
}

pub async fn save_user(store: &dyn DocumentStore, user: &User) -> Result<()> {
    let document = serde_json::to_value(user)?;
    store.put(USERS, &user.id, &document).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roles_roundtrip_through_strings() {
        for role in roles::EVERYONE {
            assert_eq!(role.as_str().parse::<Role>(), Ok(*role));
            assert_eq!(
                serde_json::to_value(role).unwrap(),
                json!(role.as_str())
            );
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn stored_user_defaults_to_active() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "email": "worker@swm.gov.in",
            "role": "waste_worker"
        }))
        .unwrap();
        assert!(user.is_active);
        assert!(user.password_hash.is_none());
        assert_eq!(user.role(), Some(Role::WasteWorker));
    }

    #[test]
    fn profile_omits_password_hash() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "email": "a@b.in",
            "role": "admin",
            "passwordHash": "$argon2id$secret"
        }))
        .unwrap();
        let profile = serde_json::to_value(user.profile()).unwrap();
        assert!(profile.get("passwordHash").is_none());
        assert_eq!(profile["isActive"], json!(true));
    }
}
