//! Key and value encodings
//!
//! Tick keys must sort by time under sled's byte-wise key order, so the
//! signed timestamp is sign-flipped and written big-endian. Watch keys are
//! the raw bytes of the dir, which matches `OsStr` ordering.

use crate::{JournalError, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tt_core::Timestamp;

const SIGN_BIT: u64 = 1 << 63;

/// Encode a tick time as an order-preserving key
pub fn tick_key(time: Timestamp) -> [u8; 8] {
    ((time as u64) ^ SIGN_BIT).to_be_bytes()
}

/// Decode a key produced by `tick_key`
pub fn decode_tick_key(key: &[u8]) -> Result<Timestamp> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| JournalError::BadTickKey(key.len()))?;
    Ok((u64::from_be_bytes(bytes) ^ SIGN_BIT) as Timestamp)
}

pub fn dir_key(dir: &Path) -> &[u8] {
    dir.as_os_str().as_bytes()
}

pub fn decode_dir(key: &[u8]) -> PathBuf {
    PathBuf::from(OsStr::from_bytes(key))
}

/// Value stored under a watch key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRecord {
    pub label: String,
    pub last_write: Timestamp,
}

impl WatchRecord {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_keys_sort_by_time() {
        let times = [-5_000, -1, 0, 1, 59, 1_700_000_000, i64::MAX];
        let keys: Vec<[u8; 8]> = times.iter().map(|&t| tick_key(t)).collect();

        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        for (&t, key) in times.iter().zip(&keys) {
            assert_eq!(decode_tick_key(key).unwrap(), t);
        }
    }

    #[test]
    fn test_bad_tick_key() {
        assert!(matches!(
            decode_tick_key(&[1, 2, 3]),
            Err(JournalError::BadTickKey(3))
        ));
    }
}
