use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?
        .to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|err| anyhow!(err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Whether `password_hash` is a PHC string a login could verify against.
pub fn is_usable_hash(password_hash: &str) -> bool {
    PasswordHash::new(password_hash).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_and_verifiable() {
        let first = hash_password("Admin@123").unwrap();
        let second = hash_password("Admin@123").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("Admin@123", &first).unwrap());
        assert!(!verify_password("admin@123", &first).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
        assert!(!is_usable_hash("not-a-phc-string"));
        assert!(!is_usable_hash(""));
    }

    #[test]
    fn generated_hashes_are_usable() {
        assert!(is_usable_hash(&hash_password("Admin@123").unwrap()));
    }
}
