use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use rand::{rngs::OsRng, RngCore};
use std::sync::OnceLock;
use zeroize::Zeroize;

use crate::error::{AppError, Result};

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 2;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 1;

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the PHC-formatted hash.
pub fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Encryption(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Encryption(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Encryption(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    Ok(password_hash)
}

/// Verifies a password against a stored hash.
///
/// The parameters are read back from the hash itself.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let mut password_bytes = password.as_bytes().to_vec();
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Encryption(format!("Hash parse error: {}", e)))?;
    let result = Argon2::default()
        .verify_password(&password_bytes, &parsed_hash)
        .is_ok();

    password_bytes.zeroize();
    Ok(result)
}

/// Runs a full verification against a throwaway hash so that a login for
/// an unknown username costs as much as one with a wrong password.
pub fn verify_without_account(password: &str) {
    static STAND_IN: OnceLock<Option<String>> = OnceLock::new();
    let stand_in = STAND_IN.get_or_init(|| {
        let mut filler = [0u8; 24];
        OsRng.fill_bytes(&mut filler);
        let filler: String = filler.iter().map(|b| format!("{:02x}", b)).collect();
        hash_password(&filler).ok()
    });
    match stand_in {
        Some(hash) => {
            let _ = verify_password(password, hash);
        }
        None => tracing::warn!("⚠️ No stand-in hash available for unknown-user logins"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("Sup3r$ecret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Sup3r$ecret", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password("Sup3r$ecret").unwrap();
        let b = hash_password("Sup3r$ecret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_account_verification_costs_a_real_verification() {
        verify_without_account("warm-up");
        let hash = hash_password("Sup3r$ecret").unwrap();

        let started = std::time::Instant::now();
        verify_password("Sup3r$ecret", &hash).unwrap();
        let real = started.elapsed();

        let started = std::time::Instant::now();
        verify_without_account("Sup3r$ecret");
        let stand_in = started.elapsed();

        assert!(stand_in * 4 >= real, "stand-in {:?} vs real {:?}", stand_in, real);
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("pw", "not-a-phc-string").is_err());
    }
}
