//! Credential handling for the login route and first-run admin seeding.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use navwatch::EventStore;
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use tracing::{info, warn};

const INITIAL_ADMIN: &str = "admin";
const INITIAL_PASSWORD_LEN: usize = 12;

/// Hash a password into a PHC string (Argon2id, random salt).
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, phc_hash: &str) -> bool {
    match PasswordHash::new(phc_hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

/// Create the `admin` account with a one-time random password when no user exists.
///
/// Returns the generated password so the caller can show it once.
pub async fn ensure_admin(store: &dyn EventStore) -> anyhow::Result<Option<String>> {
    if store.count_users().await? > 0 {
        return Ok(None);
    }

    let password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INITIAL_PASSWORD_LEN)
        .map(char::from)
        .collect();
    let hash = hash_password(&password)?;
    store.create_user(INITIAL_ADMIN, &hash).await?;

    info!(username = INITIAL_ADMIN, "Created initial administrator account");
    Ok(Some(password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("", ""));
    }

    #[tokio::test]
    async fn test_ensure_admin_runs_once() {
        let (_dir, state) = crate::routes::test_support::test_state().await;

        let password = ensure_admin(state.store.as_ref()).await.unwrap().expect("first run seeds");
        assert_eq!(password.len(), INITIAL_PASSWORD_LEN);
        assert!(ensure_admin(state.store.as_ref()).await.unwrap().is_none());

        let user = state.store.find_user_by_username("admin").await.unwrap().expect("admin");
        assert!(verify_password(&password, &user.password_hash));
    }
}
