// ============================
// notes-backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Scrypt,
};
use zeroize::Zeroize;

/// scrypt cost used when nothing is configured (`N = 2^15`)
pub const DEFAULT_LOG_N: u8 = 15;

/// Longest accepted password, in characters
pub const MAX_PASSWORD_LENGTH: usize = 100;

const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;
const SCRYPT_LEN: usize = 32;

/// Hash a password using scrypt with cost `2^log_n`
pub fn hash_password(plain: &str, log_n: u8) -> anyhow::Result<String> {
    let params = Params::new(log_n, SCRYPT_R, SCRYPT_P, SCRYPT_LEN)
        .map_err(|e| anyhow::anyhow!("invalid scrypt parameters: {e}"))?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt
        .hash_password_customized(plain.as_bytes(), None, None, params, &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
        .to_string();
    Ok(hash)
}

/// Verify a password against a PHC hash string.
///
/// A malformed hash never verifies.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}

/// Hash a password and zeroize the original
pub fn hash_password_secure(plain: &mut String, log_n: u8) -> anyhow::Result<String> {
    let hash = hash_password(plain, log_n);
    plain.zeroize();
    hash
}

/// Hash on the blocking pool; scrypt is deliberately slow.
pub async fn hash_password_blocking(mut plain: String, log_n: u8) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password_secure(&mut plain, log_n)).await?
}

/// Verify on the blocking pool
pub async fn verify_password_blocking(hash: String, plain: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&hash, &plain))
        .await
        .unwrap_or(false)
}
