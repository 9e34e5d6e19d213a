// Account keys, address derivation and bet amount rules.

use crate::domain::errors::{AccountError, BetError};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const PRIVATE_KEY_PREFIX: &str = "priv_test_";
pub const ADDRESS_PREFIX: &str = "aleo_";
const ADDRESS_HASH_CHARS: usize = 40;

/// Returns a fresh private key (`priv_test_` followed by 32 hex characters).
pub fn generate_private_key() -> String {
    format!("{PRIVATE_KEY_PREFIX}{}", Uuid::new_v4().simple())
}

/// Accepts `priv_<body>` where the body is non-empty ASCII alphanumerics or underscores.
pub fn validate_private_key(private_key: &str) -> Result<(), AccountError> {
    if private_key.is_empty() {
        return Err(AccountError::MissingKey);
    }

    let body = private_key
        .strip_prefix("priv_")
        .ok_or(AccountError::MalformedKey)?;
    let well_formed = !body.is_empty()
        && body
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !well_formed {
        return Err(AccountError::MalformedKey);
    }

    Ok(())
}

/// Derives the public address for a private key.
pub fn derive_address(private_key: &str) -> Result<String, AccountError> {
    validate_private_key(private_key)?;

    let mut hasher = Sha256::new();
    hasher.update(private_key.as_bytes());
    let digest = hex::encode(hasher.finalize());

    Ok(format!("{ADDRESS_PREFIX}{}", &digest[..ADDRESS_HASH_CHARS]))
}

/// Converts a caller-supplied amount into whole chips.
pub fn validate_bet_amount(amount: f64) -> Result<u64, BetError> {
    if !amount.is_finite() {
        return Err(BetError::NotFinite);
    }
    if amount < 0.0 {
        return Err(BetError::Negative(amount));
    }
    if amount.fract() != 0.0 {
        return Err(BetError::Fractional(amount));
    }
    // 2^64 is the first value that no longer fits.
    if amount >= 18_446_744_073_709_551_616.0 {
        return Err(BetError::TooLarge(amount));
    }

    Ok(amount as u64)
}
