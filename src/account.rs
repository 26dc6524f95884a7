//! Account registration and authentication
//!
//! Usernames are case-insensitive: every storage key and comparison
//! uses the canonical (uppercased) form, so `Alice`, `alice` and
//! `ALICE` are one account. Passwords are never stored; the account
//! directory holds a hex-encoded SHA-256 verifier, and login compares
//! digests without short-circuiting.

#![allow(clippy::future_not_send)]

use crate::error::{AuthFailure, Error, Result};
use crate::storage::Storage;
use sha2::{Digest, Sha256};
use std::io;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 10;

/// The canonical form of a username: the unique storage key.
#[must_use]
pub fn canonical_username(raw: &str) -> String {
    raw.to_uppercase()
}

/// Hex-encoded SHA-256 verifier for a password.
#[must_use]
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn username_charset_ok(name: &str) -> bool {
    // `.` is in the allowed set, but a name made only of dots would
    // resolve to the data root or its parent as a directory name.
    !name.is_empty()
        && name.chars().any(|c| c.is_ascii_alphanumeric())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn password_rule_breaches(password: &str) -> Vec<String> {
    let mut breaches = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        breaches.push(format!(
            "the password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        breaches.push("the password must contain at least one digit".to_string());
    }
    if !password.chars().any(char::is_lowercase) {
        breaches.push("the password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(char::is_uppercase) {
        breaches.push("the password must contain at least one uppercase letter".to_string());
    }
    breaches
}

/// Compare a stored hex verifier against a candidate password without
/// short-circuiting on the first differing byte.
fn verifier_matches(stored_hex: &str, password: &str) -> bool {
    let Ok(stored) = hex::decode(stored_hex.trim()) else {
        return false;
    };
    let candidate = Sha256::digest(password.as_bytes());
    if stored.len() != candidate.len() {
        return false;
    }
    stored
        .iter()
        .zip(candidate.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Create an account and return its canonical username.
///
/// Every unmet rule (username charset, each password rule) is reported
/// together in one validation error. On success the account directory
/// and verifier exist durably; the caller is expected to treat the new
/// identity as logged in.
///
/// # Errors
///
/// Returns [`Error::Validation`] for bad input or a taken username,
/// or [`Error::Io`] if the account cannot be created on disk.
pub async fn register<S: Storage>(storage: &S, username: &str, password: &str) -> Result<String> {
    let canonical = canonical_username(username);

    let mut problems = Vec::new();
    if !username_charset_ok(&canonical) {
        problems.push(
            "the username may only contain letters, digits, '_', '.' and '-'".to_string(),
        );
    }
    problems.extend(password_rule_breaches(password));
    if !problems.is_empty() {
        return Err(Error::Validation(problems));
    }

    match storage.create_account(&canonical, &hash_password(password)).await {
        Err(Error::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists => Err(Error::Validation(
            vec!["this username is already taken".to_string()],
        )),
        Err(e) => Err(e),
        Ok(()) => Ok(canonical),
    }
}

/// Check credentials and return the canonical username.
///
/// # Errors
///
/// Returns [`Error::Auth`] when the user is unknown or the password
/// does not match (the two render as the same wire message), or
/// [`Error::Io`] if the verifier cannot be read.
pub async fn authenticate<S: Storage>(
    storage: &S,
    username: &str,
    password: &str,
) -> Result<String> {
    let canonical = canonical_username(username);

    if !username_charset_ok(&canonical) || !storage.account_exists(&canonical).await? {
        return Err(Error::Auth(AuthFailure::UnknownUser));
    }

    let stored = storage.read_credential(&canonical).await?;
    if verifier_matches(&stored, password) {
        Ok(canonical)
    } else {
        Err(Error::Auth(AuthFailure::BadPassword))
    }
}
