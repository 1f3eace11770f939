//! Hashing and verification of user passwords as PHC-encoded Argon2id hashes.

use anyhow::Context;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use secrecy::{ExposeSecret, Secret};

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error("Something went wrong when validating credentials")]
    UnexpectedError(#[source] anyhow::Error),
}

/// Verified against when the email is unknown, so both failure paths cost the same.
const DUMMY_PASSWORD_HASH: &str = "$argon2id$v=19$m=15000,t=2,p=1$\
    gZiV/M1gPc22ElAH/Jh1Hw$\
    CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

fn hasher() -> Result<Argon2<'static>, anyhow::Error> {
    let params = Params::new(15000, 2, 1, None)
        .map_err(anyhow::Error::msg)
        .context("Invalid Argon2 parameters.")?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Compute the password hash using the Argon2id algorithm.
///
/// The returned hash is in the PHC string format, which includes the salt and
/// the algorithm parameters.
pub fn compute_password_hash(password: Secret<String>) -> Result<Secret<String>, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = hasher()?
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(anyhow::Error::msg)
        .context("Failed to hash password.")?
        .to_string();
    Ok(Secret::new(password_hash))
}

#[tracing::instrument(name = "Verify password hash", skip_all)]
pub fn verify_password_hash(
    expected_password_hash: Secret<String>,
    password_candidate: Secret<String>,
) -> Result<(), AuthError> {
    let expected_password_hash = PasswordHash::new(expected_password_hash.expose_secret())
        .map_err(anyhow::Error::msg)
        .context("Failed to parse hash in PHC string format.")
        .map_err(AuthError::UnexpectedError)?;

    Argon2::default()
        .verify_password(
            password_candidate.expose_secret().as_bytes(),
            &expected_password_hash,
        )
        .map_err(anyhow::Error::msg)
        .context("Invalid password.")
        .map_err(AuthError::InvalidCredentials)
}

/// Hash a password off the async runtime.
pub async fn hash_password(password: Secret<String>) -> Result<Secret<String>, AuthError> {
    tokio::task::spawn_blocking(move || compute_password_hash(password))
        .await
        .context("Failed to spawn blocking task.")
        .map_err(AuthError::UnexpectedError)?
        .map_err(AuthError::UnexpectedError)
}

/// Check `candidate` against the stored hash, if any.
///
/// A missing hash (unknown email) still runs a full verification against a
/// dummy hash and then reports `InvalidCredentials`.
#[tracing::instrument(name = "Validate credentials", skip_all)]
pub async fn verify_password(
    stored_password_hash: Option<Secret<String>>,
    candidate: Secret<String>,
) -> Result<(), AuthError> {
    let known = stored_password_hash.is_some();
    let expected = stored_password_hash
        .unwrap_or_else(|| Secret::new(DUMMY_PASSWORD_HASH.to_string()));

    tokio::task::spawn_blocking(move || verify_password_hash(expected, candidate))
        .await
        .context("Failed to spawn blocking task.")
        .map_err(AuthError::UnexpectedError)??;

    if known {
        Ok(())
    } else {
        Err(AuthError::InvalidCredentials(anyhow::anyhow!("Unknown email.")))
    }
}
