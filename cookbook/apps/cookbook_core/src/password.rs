use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm as ArgonAlgorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

use crate::settings::PasswordCfg;

/// Hashes `password` with Argon2id into a self-describing PHC string.
pub fn hash_password(password: &str, cfg: &PasswordCfg) -> Result<String, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)?;
    let argon = Argon2::new(ArgonAlgorithm::Argon2id, Version::V0x13, params);
    Ok(argon.hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Cost parameters are read back from the PHC string, so hashes made under
/// older settings keep verifying.
pub fn verify_password(phc: &str, password: &str) -> Result<bool, anyhow::Error> {
    let parsed = PasswordHash::new(phc)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// [`hash_password`] on the blocking pool; Argon2 at production cost is
/// too slow for an async worker.
pub async fn hash_blocking(password: &str, cfg: &PasswordCfg) -> Result<String, anyhow::Error> {
    let (password, cfg) = (password.to_owned(), cfg.clone());
    tokio::task::spawn_blocking(move || hash_password(&password, &cfg)).await?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_blocking(phc: &str, password: &str) -> Result<bool, anyhow::Error> {
    let (phc, password) = (phc.to_owned(), password.to_owned());
    tokio::task::spawn_blocking(move || verify_password(&phc, &password)).await?
}
