use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{distributions::Alphanumeric, Rng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Argon2 is CPU bound, so hashing runs on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Password hashing task failed: {e}")))?
}

/// False for malformed hashes as well as mismatches.
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let (password, hash) = (password.to_owned(), hash.to_owned());
    match tokio::task::spawn_blocking(move || verify_blocking(&password, &hash)).await {
        Ok(verified) => verified,
        Err(e) => {
            tracing::error!(error = %e, "Password verification task failed");
            false
        }
    }
}

fn hash_blocking(password: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::InternalServerError(format!("Failed to encode salt: {e}")))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {e}")))
}

fn verify_blocking(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            false
        }
    }
}

/// Returns the fluent key of the first failed rule.
pub fn check_new_password(password: &str, confirmation: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("error-password-too-short");
    }
    if password != confirmation {
        return Err("error-password-mismatch");
    }
    Ok(())
}

pub fn generate_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Reset tokens are mailed in clear and stored only as this digest.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("rahasia-123").await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("rahasia-123", &hash).await);
        assert!(!verify_password("rahasia-124", &hash).await);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn other_tasks_progress_while_hashing() {
        let done = std::cell::Cell::new(false);
        let (hash, progressed) = tokio::join!(
            async {
                let hash = hash_password("rahasia-123").await;
                done.set(true);
                hash
            },
            async {
                tokio::task::yield_now().await;
                !done.get()
            }
        );
        assert!(hash.unwrap().starts_with("$argon2"));
        assert!(progressed);
    }

    #[tokio::test]
    async fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string").await);
    }

    #[test]
    fn new_password_rules() {
        assert_eq!(check_new_password("short", "short"), Err("error-password-too-short"));
        assert_eq!(
            check_new_password("longenough", "longenougH"),
            Err("error-password-mismatch")
        );
        assert_eq!(check_new_password("longenough", "longenough"), Ok(()));
    }

    #[test]
    fn tokens_are_alphanumeric_and_distinct() {
        let a = generate_token(48);
        let b = generate_token(48);
        assert_eq!(a.len(), 48);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn token_digest_is_stable_hex() {
        let digest = hash_token("abc");
        assert_eq!(digest.len(), 64);
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
