//! Consistent-hash rollout bucketing.
//!
//! Assigns every (feature, actor) pair a stable bucket in
//! `[0, 100_000)` via CRC-32 of the feature name concatenated with the
//! actor id (feature name first, no separator). The comparison scales
//! percentages by 1000 so fractional thresholds like `0.05%` keep their
//! precision. Sibling SDKs in other languages share the hash function,
//! the scaling constant, and the concatenation order; changing any of
//! them reshuffles every live rollout.

/// Both the bucket modulus and the percentage threshold are scaled by
/// this factor.
pub const SCALING_FACTOR: u64 = 1000;

/// Stable bucket for the pair, in `[0, 100 * SCALING_FACTOR)`.
pub fn bucket(feature_name: &str, actor_id: &str) -> u64 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(feature_name.as_bytes());
    hasher.update(actor_id.as_bytes());
    u64::from(hasher.finalize()) % (100 * SCALING_FACTOR)
}

/// True iff the actor falls inside the rollout percentage for this
/// feature. Empty actor ids and a zero percentage are always excluded.
pub fn included(feature_name: &str, actor_id: &str, percent: f64) -> bool {
    if actor_id.is_empty() || percent <= 0.0 {
        return false;
    }
    (bucket(feature_name, actor_id) as f64) < percent * SCALING_FACTOR as f64
}
