//! Random operational secrets for OS and database accounts.
//!
//! These are service passwords stored in the registry and shown to the
//! operator, not key material. The alphabet is restricted to ASCII letters and
//! digits so a secret can be embedded unescaped in a shell argument or a SQL
//! string literal.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Characters a generated secret may contain.
pub const SECRET_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate an alphanumeric secret of `length` characters.
#[must_use]
pub fn random_secret(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// `true` if `value` only uses characters from [`SECRET_ALPHABET`].
#[must_use]
pub fn is_safe_secret(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_alphanumeric())
}
