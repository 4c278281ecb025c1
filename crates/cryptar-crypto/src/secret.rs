//! Shamir (n,k)-sharing of the data key
//!
//! Shard mode splits a random data key into n shares of which any k recover
//! it. The threshold is not persisted anywhere: combining fewer than k shares
//! interpolates to a wrong key, which the archive tag then rejects. Shares
//! carry an id in 1..=n and 32 bytes of share data.

use std::collections::BTreeMap;

use crate::error::{CryptoError, CryptoResult};
use crate::{DataKey, KEY_SIZE};

/// One Shamir share of a data key.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyShare {
    pub id: u8,
    pub data: [u8; KEY_SIZE],
}

impl std::fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyShare")
            .field("id", &self.id)
            .field("data", &"[REDACTED]")
            .finish()
    }
}

/// Split `key` into `count` shares with recovery threshold `threshold`.
///
/// Bounds: `2 <= threshold <= count <= 255`. Share ids are assigned 1..=count.
pub fn split(key: &DataKey, count: u8, threshold: u8) -> CryptoResult<Vec<KeyShare>> {
    if threshold < 2 || threshold > count {
        return Err(CryptoError::SecretSharing(format!(
            "threshold {threshold} out of range for {count} shares"
        )));
    }

    let sharks = sharks::Sharks(threshold);
    let dealer = sharks.dealer_rng(key.as_bytes(), &mut rand::thread_rng());

    let mut shares = Vec::with_capacity(count as usize);
    for share in dealer.take(count as usize) {
        let raw: Vec<u8> = (&share).into();
        let mut data = [0u8; KEY_SIZE];
        data.copy_from_slice(&raw[1..]);
        shares.push(KeyShare { id: raw[0], data });
    }
    Ok(shares)
}

/// Interpolate a data key from whatever shares are presented.
///
/// Duplicate ids collapse to one share. This always produces *a* key when
/// given at least one share; whether it is the right key is decided by the
/// archive tag, not here.
pub fn combine(shares: &[KeyShare]) -> CryptoResult<DataKey> {
    let unique: BTreeMap<u8, &KeyShare> = shares.iter().map(|s| (s.id, s)).collect();
    if unique.is_empty() {
        return Err(CryptoError::SecretSharing("no shares presented".into()));
    }
    if unique.len() > 255 {
        return Err(CryptoError::SecretSharing("more than 255 shares".into()));
    }

    let mut parsed = Vec::with_capacity(unique.len());
    for share in unique.values() {
        let mut raw = Vec::with_capacity(1 + KEY_SIZE);
        raw.push(share.id);
        raw.extend_from_slice(&share.data);
        let share = sharks::Share::try_from(raw.as_slice())
            .map_err(|e| CryptoError::SecretSharing(e.to_string()))?;
        parsed.push(share);
    }

    let sharks = sharks::Sharks(parsed.len() as u8);
    let secret = sharks
        .recover(parsed.iter())
        .map_err(|e| CryptoError::SecretSharing(e.to_string()))?;

    if secret.len() != KEY_SIZE {
        return Err(CryptoError::SecretSharing(format!(
            "recovered secret has {} bytes, expected {KEY_SIZE}",
            secret.len()
        )));
    }

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&secret);
    Ok(DataKey::from_bytes(key))
}
