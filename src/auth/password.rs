use argon2::Argon2;
use rand::Rng;

use crate::error::AppError;

/// Generate a cryptographically secure random salt
pub fn generate_salt() -> [u8; 32] {
    rand::thread_rng().gen()
}

/// Derive a 32-byte Argon2id digest from the password and salt. A slow KDF
/// rather than a general-purpose hash; plaintext is never stored.
pub fn hash_password(password: &str, salt: &[u8]) -> Result<[u8; 32], AppError> {
    let argon2 = Argon2::default();
    let mut hash = [0u8; 32];

    argon2
        .hash_password_into(password.as_bytes(), salt, &mut hash)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    Ok(hash)
}

/// Verify a password against a stored hash and salt
pub fn verify_password(password: &str, stored_hash: &[u8], salt: &[u8]) -> Result<bool, AppError> {
    let computed_hash = hash_password(password, salt)?;
    Ok(computed_hash.as_slice() == stored_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verify() {
        let password = "correct horse battery";
        let salt = generate_salt();

        let hash = hash_password(password, &salt).unwrap();
        assert!(verify_password(password, &hash, &salt).unwrap());
        assert!(!verify_password("wrong password", &hash, &salt).unwrap());
    }

    #[test]
    fn test_same_password_different_salts() {
        let password = "hunter22";
        let a = hash_password(password, &generate_salt()).unwrap();
        let b = hash_password(password, &generate_salt()).unwrap();
        assert_ne!(a, b);
    }
}
