//! Opaque identifier minting. Both identifiers come from the OS random
//! source; neither encodes the internal key or anything about the applicant.

use rand::rngs::OsRng;
use rand::Rng;

use super::domain::{PublicApplicationId, ResumeToken};

/// Lowercase alphanumeric, URL- and QR-friendly. 10 chars over 36 symbols is
/// plenty for uniqueness at this system's volume.
const PUBLIC_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
pub const PUBLIC_ID_LEN: usize = 10;

/// The resume token is the sole credential protecting a draft across
/// devices, so it gets a materially larger space: 40 chars over 62 symbols.
const RESUME_TOKEN_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
pub const RESUME_TOKEN_LEN: usize = 40;

fn random_string(alphabet: &'static [u8], len: usize) -> String {
    let mut rng = OsRng;
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

pub fn generate_public_id() -> PublicApplicationId {
    PublicApplicationId(random_string(PUBLIC_ID_ALPHABET, PUBLIC_ID_LEN))
}

pub fn generate_resume_token() -> ResumeToken {
    ResumeToken(random_string(RESUME_TOKEN_ALPHABET, RESUME_TOKEN_LEN))
}
