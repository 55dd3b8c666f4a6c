use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sha3::{Digest, Sha3_256};

/// Hex SHA3-256 digest. Session slots store this instead of the bearer token.
pub fn get_sha3_256_hash(data: &str) -> String {
    let mut hasher = Sha3_256::default();
    hasher.update(data.as_bytes());
    format!("{:X}", hasher.finalize())
}

/// Argon2id with a fresh random salt, PHC encoded.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}
