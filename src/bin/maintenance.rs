use std::env;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use swm_admin::{
    auth::password,
    bootstrap::{self, ADMIN_USER_ID},
    config::AppConfig,
    models,
    store::SledStore,
};

const USAGE: &str = "Usage: maintenance <seed | hash-password <password> | check-admin>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("seed") => seed().await?,
        Some("hash-password") => {
            let Some(plain) = args.next() else {
                eprintln!("{USAGE}");
                std::process::exit(1);
            };
            println!("{}", password::hash_password(&plain)?);
        }
        Some("check-admin") => check_admin().await?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn seed() -> Result<()> {
    let config = AppConfig::from_env()?;
    let store = SledStore::open(&config.data_dir)?;
    let report = bootstrap::initialize(&store, &config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Reports whether the stored admin still accepts the configured default password.
async fn check_admin() -> Result<()> {
    let config = AppConfig::from_env()?;
    let store = SledStore::open(&config.data_dir)?;

    let Some(admin) = models::load_user(&store, ADMIN_USER_ID).await? else {
        bail!("no admin user stored under {ADMIN_USER_ID}; run `maintenance seed`");
    };
    let hash = admin
        .password_hash
        .as_deref()
        .context("admin user has no password hash")?;

    println!("email:    {}", admin.email);
    println!("active:   {}", admin.is_active);
    println!("role:     {}", admin.role);
    match admin.password_changed_at {
        Some(changed) => println!("password: changed at {changed}"),
        None if password::verify_password(&config.admin_default_password, hash)? => {
            println!("password: default credential verifies")
        }
        None => println!("password: does NOT verify; the next start will repair it"),
    }
    Ok(())
}
