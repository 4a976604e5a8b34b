use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

/// Derives a stable RNG seed from a session identifier and a scope label, so the
/// same session always sees the same order and different scopes (question list,
/// one question's options) are shuffled independently.
pub fn session_seed(session_id: &str, scope: &str) -> u64 {
    let digest = Sha256::new()
        .chain_update(session_id.as_bytes())
        .chain_update([0u8])
        .chain_update(scope.as_bytes())
        .finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

pub fn shuffle_for_session<T>(items: &mut [T], session_id: &str, scope: &str) {
    let mut rng = StdRng::seed_from_u64(session_seed(session_id, scope));
    items.shuffle(&mut rng);
}
