use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// FNV-1a 64-bit hash.
#[must_use]
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut h = FNV_OFFSET;
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Places an external id on the `0..=100` scale for a given seed.
///
/// The result depends only on its inputs, so a pilot stays in the same
/// bucket until the flag's seed changes.
#[must_use]
pub fn percentile(external_id: &str, rand_seed: i64) -> i32 {
    let seed = (fnv1a64(external_id.as_bytes()) as i64).wrapping_add(rand_seed);
    let mut rng = StdRng::seed_from_u64(seed as u64);
    rng.gen_range(0..=100)
}

/// Percentage strategy: 0 never enrolls, otherwise enroll when the pilot's
/// percentile is within the configured percentage.
#[must_use]
pub fn is_enrolled_by_percentage(external_id: &str, rand_seed: i64, percentage: i32) -> bool {
    if percentage <= 0 {
        return false;
    }
    percentile(external_id, rand_seed) <= percentage
}
