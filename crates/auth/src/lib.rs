//! Credential handling for `bloodbank-auth`.
//!
//! Passwords are stored as Argon2id PHC strings. There are no sessions or
//! tokens: a successful login simply returns the user record.

pub mod password;

pub use password::{AuthError, compute_password_hash, hash_password, verify_password, verify_password_hash};
