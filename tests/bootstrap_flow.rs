mod common;

use anyhow::Result;
use common::{test_config, TestApp, ADMIN_PASSWORD};
use swm_admin::auth::password;
use swm_admin::bootstrap::{self, AdminSeedOutcome, ADMIN_USER_ID};
use swm_admin::models;
use swm_admin::schema::collections::{ULBS, WASTE_FACILITIES, WASTE_GUIDELINES};
use swm_admin::store::{DocumentStore, SledStore};

async fn corrupt_admin_hash(store: &dyn DocumentStore) -> Result<()> {
    let mut admin = models::load_user(store, ADMIN_USER_ID)
        .await?
        .expect("admin seeded");
    admin.password_hash = Some(password::hash_password("someone-else")?);
    models::save_user(store, &admin).await
}

#[tokio::test]
async fn first_run_seeds_everything_once() -> Result<()> {
    let store = SledStore::temporary()?;
    let config = test_config();

    let first = bootstrap::initialize(&store, &config).await?;
    assert_eq!(first.admin, AdminSeedOutcome::Created);
    assert!(first.ulb_created);
    assert!(first.guidelines_created);
    assert_eq!(first.facilities_created, 3);

    let second = bootstrap::initialize(&store, &config).await?;
    assert_eq!(second.admin, AdminSeedOutcome::Verified);
    assert!(!second.ulb_created);
    assert!(!second.guidelines_created);
    assert_eq!(second.facilities_created, 0);

    assert_eq!(store.count(ULBS).await?, 1);
    assert_eq!(store.count(WASTE_GUIDELINES).await?, 1);
    assert_eq!(store.count(WASTE_FACILITIES).await?, 3);
    Ok(())
}

#[tokio::test]
async fn drifted_admin_hash_is_repaired() -> Result<()> {
    let store = SledStore::temporary()?;
    let config = test_config();
    bootstrap::initialize(&store, &config).await?;
    corrupt_admin_hash(&store).await?;

    let report = bootstrap::initialize(&store, &config).await?;
    assert_eq!(report.admin, AdminSeedOutcome::Repaired);

    let admin = models::load_user(&store, ADMIN_USER_ID)
        .await?
        .expect("admin present");
    let repaired_hash = admin.password_hash.clone().unwrap_or_default();
    assert!(password::verify_password(ADMIN_PASSWORD, &repaired_hash)?);

    let again = bootstrap::initialize(&store, &config).await?;
    assert_eq!(again.admin, AdminSeedOutcome::Verified);

    let admin = models::load_user(&store, ADMIN_USER_ID)
        .await?
        .expect("admin present");
    assert_eq!(admin.password_hash.as_deref(), Some(repaired_hash.as_str()));
    Ok(())
}

#[tokio::test]
async fn changed_password_without_usable_hash_is_repaired() -> Result<()> {
    let store = SledStore::temporary()?;
    let config = test_config();
    bootstrap::initialize(&store, &config).await?;

    for broken in [None, Some("not-a-phc-string".to_string())] {
        let mut admin = models::load_user(&store, ADMIN_USER_ID)
            .await?
            .expect("admin seeded");
        admin.password_changed_at = Some(chrono::Utc::now());
        admin.password_hash = broken;
        models::save_user(&store, &admin).await?;

        let report = bootstrap::initialize(&store, &config).await?;
        assert_eq!(report.admin, AdminSeedOutcome::Repaired);

        let admin = models::load_user(&store, ADMIN_USER_ID)
            .await?
            .expect("admin present");
        let hash = admin.password_hash.as_deref().unwrap_or_default();
        assert!(password::verify_password(ADMIN_PASSWORD, hash)?);
        assert!(admin.password_changed_at.is_none());
    }
    Ok(())
}

#[tokio::test]
async fn admin_email_follows_configuration() -> Result<()> {
    let mut config = test_config();
    let app = TestApp::with_config(config.clone()).await?;

    config.admin_email = "chief@swm.test".to_string();
    let report = bootstrap::initialize(app.store(), &config).await?;
    assert_eq!(report.admin, AdminSeedOutcome::Repaired);

    let admin = models::load_user(app.store(), ADMIN_USER_ID)
        .await?
        .expect("admin present");
    assert_eq!(admin.email, "chief@swm.test");
    app.login_token("chief@swm.test", ADMIN_PASSWORD).await?;

    let report = bootstrap::initialize(app.store(), &config).await?;
    assert_eq!(report.admin, AdminSeedOutcome::Verified);
    Ok(())
}

#[tokio::test]
async fn repair_disabled_leaves_admin_alone() -> Result<()> {
    let store = SledStore::temporary()?;
    let mut config = test_config();
    bootstrap::initialize(&store, &config).await?;
    corrupt_admin_hash(&store).await?;

    config.admin_auto_repair = false;
    let report = bootstrap::initialize(&store, &config).await?;
    assert_eq!(report.admin, AdminSeedOutcome::Untouched);

    let admin = models::load_user(&store, ADMIN_USER_ID)
        .await?
        .expect("admin present");
    let hash = admin.password_hash.as_deref().unwrap_or_default();
    assert!(!password::verify_password(ADMIN_PASSWORD, hash)?);
    assert!(password::verify_password("someone-else", hash)?);
    Ok(())
}

#[tokio::test]
async fn changed_password_survives_restart() -> Result<()> {
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let response = app
        .put_json(
            "/api/auth/password",
            &serde_json::json!({ "currentPassword": ADMIN_PASSWORD, "newPassword": "a-much-better-one" }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), axum::http::StatusCode::NO_CONTENT);

    let report = bootstrap::initialize(app.store(), &app.state.config).await?;
    assert_eq!(report.admin, AdminSeedOutcome::Customized);

    app.login_token(common::ADMIN_EMAIL, "a-much-better-one").await?;
    Ok(())
}
