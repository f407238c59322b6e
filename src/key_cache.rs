// cvc-trustcenter/src/key_cache.rs
//
// CHR → public-key mapping. Entries arrive from the trust-anchor
// directory and from admitted certificates; a CHR never maps to two
// different keys. Reads and the compound add are guarded internally,
// so parallel adds of the same CHR either collapse or report the
// conflict.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::ber::Tlv;
use crate::crypto::EccPublicKey;
use crate::error::{Error, Result};

/// File-name suffix of stored trust-anchor keys; the file-name prefix
/// is the CHR the key is cached under.
pub const PUBLIC_KEY_SUFFIX: &str = "_ELC-PublicKey.der";

/// Thread-safe CHR → elliptic-curve public key cache.
#[derive(Debug, Default)]
pub struct PublicKeyCache {
    keys: RwLock<HashMap<String, EccPublicKey>>,
}

impl PublicKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key under a CHR. Re-adding the identical key is a
    /// no-op; a different key under an occupied CHR is a conflict.
    pub fn add(&self, chr: &str, key: EccPublicKey) -> Result<()> {
        let mut keys = self.keys.write().expect("public key cache lock poisoned");
        match keys.get(chr) {
            Some(existing) if *existing == key => Ok(()),
            Some(_) => Err(Error::KeyConflict { chr: chr.to_string() }),
            None => {
                keys.insert(chr.to_string(), key);
                Ok(())
            }
        }
    }

    /// Look up the key cached under a CHR.
    pub fn get(&self, chr: &str) -> Result<EccPublicKey> {
        self.keys
            .read()
            .expect("public key cache lock poisoned")
            .get(chr)
            .cloned()
            .ok_or_else(|| Error::KeyMissing { chr: chr.to_string() })
    }

    pub fn contains(&self, chr: &str) -> bool {
        self.keys
            .read()
            .expect("public key cache lock poisoned")
            .contains_key(chr)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.keys
            .write()
            .expect("public key cache lock poisoned")
            .clear();
    }

    pub fn len(&self) -> usize {
        self.keys.read().expect("public key cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the cached CHRs.
    pub fn chrs(&self) -> Vec<String> {
        self.keys
            .read()
            .expect("public key cache lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Clear the cache, then walk `root` recursively and add every
    /// stored trust-anchor key (`<CHR>_ELC-PublicKey.der`). Faults in
    /// individual files are logged and skipped; a failing directory
    /// walk aborts the load. Returns the number of keys added.
    pub fn load(&self, root: &Path) -> Result<usize> {
        self.clear();
        let mut loaded = 0;

        for entry in jwalk::WalkDir::new(root).sort(true) {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(chr) = name.strip_suffix(PUBLIC_KEY_SUFFIX) else {
                continue;
            };

            match read_public_key(&path) {
                Ok(key) => match self.add(chr, key) {
                    Ok(()) => {
                        debug!(chr, "trust-anchor key loaded");
                        loaded += 1;
                    }
                    Err(error) => warn!(%error, chr, "trust-anchor key not cached"),
                },
                Err(error) => {
                    warn!(%error, path = %path.display(), "skipping unreadable trust-anchor file");
                }
            }
        }

        Ok(loaded)
    }
}

fn read_public_key(path: &Path) -> Result<EccPublicKey> {
    let bytes = std::fs::read(path)?;
    EccPublicKey::from_tlv(&Tlv::parse(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Curve;
    use crate::testutil::generate_key;

    fn some_key() -> EccPublicKey {
        EccPublicKey::from_ec_key(Curve::BrainpoolP256r1, &generate_key(Curve::BrainpoolP256r1))
            .unwrap()
    }

    #[test]
    fn test_add_and_get() {
        let cache = PublicKeyCache::new();
        let key = some_key();
        cache.add("DEGXX_8-7-02-22", key.clone()).unwrap();
        assert_eq!(cache.get("DEGXX_8-7-02-22").unwrap(), key);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_readding_identical_key_is_noop() {
        let cache = PublicKeyCache::new();
        let key = some_key();
        cache.add("DEGXX_8-7-02-22", key.clone()).unwrap();
        cache.add("DEGXX_8-7-02-22", key).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_conflicting_key_is_rejected() {
        let cache = PublicKeyCache::new();
        cache.add("DEGXX_8-7-02-22", some_key()).unwrap();
        assert!(matches!(
            cache.add("DEGXX_8-7-02-22", some_key()),
            Err(Error::KeyConflict { .. })
        ));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_chr() {
        let cache = PublicKeyCache::new();
        assert!(matches!(
            cache.get("DEGXX_8-7-02-22"),
            Err(Error::KeyMissing { .. })
        ));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("generation22");
        std::fs::create_dir(&nested).unwrap();

        let key_a = some_key();
        let key_b = some_key();
        std::fs::write(
            dir.path().join("DEGXX_8-7-02-22_ELC-PublicKey.der"),
            key_a.to_tlv_der(),
        )
        .unwrap();
        std::fs::write(
            nested.join("DEGXX_1-7-02-22_ELC-PublicKey.der"),
            key_b.to_tlv_der(),
        )
        .unwrap();
        // ignored: wrong suffix, unreadable content
        std::fs::write(dir.path().join("DEGXX_8-7-02-22_ELC-PublicKey.txt"), b"text").unwrap();
        std::fs::write(dir.path().join("BROKEN_ELC-PublicKey.der"), b"not a tlv").unwrap();

        let cache = PublicKeyCache::new();
        let loaded = cache.load(dir.path()).unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("DEGXX_8-7-02-22").unwrap(), key_a);
        assert_eq!(cache.get("DEGXX_1-7-02-22").unwrap(), key_b);
        assert!(!cache.contains("BROKEN"));
    }

    #[test]
    fn test_load_clears_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PublicKeyCache::new();
        cache.add("STALE_8-7-02-21", some_key()).unwrap();
        cache.load(dir.path()).unwrap();
        assert!(cache.is_empty());
    }
}
