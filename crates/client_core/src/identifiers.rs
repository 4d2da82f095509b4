//! Locally issued complaint identifiers for offline mode.
//!
//! These values are drawn from the operating system RNG but carry no uniqueness guarantee.
//! Whenever a server answers a submission, its identifiers are the ones shown to the user.

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use rand_core::{OsRng, RngCore};
use regex::Regex;
use thiserror::Error;

const ACCESS_KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ACCESS_KEY_LEN: usize = 12;
const ACCESS_KEY_GROUP: usize = 4;

// `byte % len` is only uniform when the alphabet size divides 256.
const _: () = assert!(256 % ACCESS_KEY_ALPHABET.len() == 0);

static COMPLAINT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^CMP-\d{4}-\d{6}$").expect("complaint id pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid complaint ID format. Expected format: CMP-YYYY-XXXXXX")]
pub struct ComplaintIdFormatError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("system randomness unavailable: {0}")]
pub struct EntropyError(String);

fn fill(bytes: &mut [u8]) -> Result<(), EntropyError> {
    OsRng
        .try_fill_bytes(bytes)
        .map_err(|err| EntropyError(err.to_string()))
}

/// Uniform value in `0..bound`, rejecting draws from the incomplete top slice.
fn random_below(bound: u32) -> Result<u32, EntropyError> {
    let span = 1u64 << 32;
    let cutoff = span - span % u64::from(bound);
    loop {
        let mut buf = [0u8; 4];
        fill(&mut buf)?;
        let draw = u64::from(u32::from_le_bytes(buf));
        if draw < cutoff {
            return Ok((draw % u64::from(bound)) as u32);
        }
    }
}

/// `CMP-{year}-{six digits}` for the current UTC year.
pub fn local_complaint_id() -> Result<String, EntropyError> {
    Ok(format!(
        "CMP-{}-{:06}",
        Utc::now().year(),
        random_below(1_000_000)?
    ))
}

/// Six-digit secret, never starting with zero.
pub fn local_pin() -> Result<String, EntropyError> {
    Ok((100_000 + random_below(900_000)?).to_string())
}

/// `XXXX-XXXX-XXXX` over an alphabet without look-alike characters.
pub fn local_access_key() -> Result<String, EntropyError> {
    let mut bytes = [0u8; ACCESS_KEY_LEN];
    fill(&mut bytes)?;
    let mut key = String::with_capacity(ACCESS_KEY_LEN + ACCESS_KEY_LEN / ACCESS_KEY_GROUP);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 && i % ACCESS_KEY_GROUP == 0 {
            key.push('-');
        }
        let idx = usize::from(*byte) % ACCESS_KEY_ALPHABET.len();
        key.push(char::from(ACCESS_KEY_ALPHABET[idx]));
    }
    Ok(key)
}

/// Validates the tracking-page format of a complaint ID after trimming.
pub fn parse_complaint_id(raw: &str) -> Result<&str, ComplaintIdFormatError> {
    let trimmed = raw.trim();
    if COMPLAINT_ID_RE.is_match(trimmed) {
        Ok(trimmed)
    } else {
        Err(ComplaintIdFormatError)
    }
}
