// cvc-trustcenter/src/trust_center.rs
//
// Orchestration of the two caches: trust-anchor ingestion, the
// closure validation pass, the admission policy, and persistence of
// accepted and quarantined certificates under the configured store
// directory. The trust center is an explicit handle; callers decide
// whether to share it process-wide.
//
// Concurrency contract: queries (public_key, chain, parents) run under
// a shared lock and may be issued from multiple threads; add,
// initialize_cache and clear_cache take the exclusive lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info, warn};

use crate::crypto::EccPublicKey;
use crate::cvc::Cvc;
use crate::cvc_cache::{load_cvc_files, validate_closure, CvcCache};
use crate::error::{Error, Result};
use crate::key_cache::PublicKeyCache;

/// Platform-fixed location of the trust-center properties file.
pub const CONFIG_PATH: &str = "/etc/cvc-trustcenter/trustcenter.properties";

/// Property naming the trust-center store directory.
pub const CONFIG_KEY_ROOT: &str = "pathTrustCenter";

/// Directory of trust-anchor public keys, relative to the store root.
pub const TRUST_ANCHOR_DIR: &str = "input/trust-anchor";

/// Export directory for validated certificates.
pub const TRUSTED_DIR: &str = "trusted";

/// Export directory for rejected certificates.
pub const UNTRUSTED_DIR: &str = "untrusted";

/// Marker file; its presence makes the store persist end-entity
/// certificates too. Read once per cache initialisation.
pub const STORE_END_ENTITY_MARKER: &str = "storeEndEntityCvc";

const CVC_FILE_SUFFIX: &str = "_CV-Certificate.cvc";
const CVC_REPORT_SUFFIX: &str = "_CV-Certificate.txt";
const CVC_HEX_SUFFIX: &str = "_CV-Certificate_DER.txt";

/// The CV-certificate trust center: key cache, certificate cache,
/// admission policy and store persistence behind one handle.
#[derive(Debug, Default)]
pub struct TrustCenter {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    root: Option<PathBuf>,
    keys: PublicKeyCache,
    cvcs: CvcCache,
    store_end_entity: bool,
}

impl TrustCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure from the properties file at the platform-fixed
    /// location (`pathTrustCenter=<absolute path>`).
    pub fn initialize(&self) -> Result<()> {
        self.initialize_from(Path::new(CONFIG_PATH))
    }

    /// Configure from a specific properties file. A no-op when the
    /// trust center is already configured with the same path.
    pub fn initialize_from(&self, config: &Path) -> Result<()> {
        let properties = read_properties(config)?;
        let root = properties
            .get(CONFIG_KEY_ROOT)
            .map(PathBuf::from)
            .ok_or_else(|| {
                Error::Config(format!(
                    "{} does not define {CONFIG_KEY_ROOT}",
                    config.display()
                ))
            })?;

        {
            let inner = self.inner.read().expect("trust center lock poisoned");
            if inner.root.as_deref() == Some(root.as_path()) {
                debug!(root = %root.display(), "trust center already configured");
                return Ok(());
            }
        }
        self.initialize_cache(&root)
    }

    /// Clear both caches, reload trust anchors and run the closure
    /// validation over every certificate file under `root`, exporting
    /// accepted certificates to `trusted/` and the residue to
    /// `untrusted/`. Fails when a required subdirectory is absent.
    pub fn initialize_cache(&self, root: &Path) -> Result<()> {
        self.inner
            .write()
            .expect("trust center lock poisoned")
            .initialize_cache(root)
    }

    /// Present one certificate to the admission policy: no critical
    /// findings and a VALID signature against the cached keys. On
    /// admission the subject key joins the key cache and the
    /// certificate joins the certificate set; a newly inserted
    /// certificate is exported unless it is an end-entity certificate
    /// and the store-end-entity marker was absent.
    pub fn add(&self, cvc: &Cvc) -> bool {
        self.inner
            .write()
            .expect("trust center lock poisoned")
            .admit(cvc)
    }

    /// Resolve the import chain of `leaf` (§ chain resolution); the
    /// result ends one step before the root.
    pub fn chain(&self, leaf: &Cvc, target_root_car: Option<&str>) -> Result<Vec<Cvc>> {
        self.inner
            .read()
            .expect("trust center lock poisoned")
            .cvcs
            .chain(leaf, target_root_car)
    }

    /// Cached certificates whose CHR equals the child's CAR.
    pub fn parents(&self, child: &Cvc) -> Vec<Cvc> {
        self.inner
            .read()
            .expect("trust center lock poisoned")
            .cvcs
            .parents_of(child)
    }

    /// Look up a cached public key by CHR.
    pub fn public_key(&self, chr: &str) -> Result<EccPublicKey> {
        self.inner
            .read()
            .expect("trust center lock poisoned")
            .keys
            .get(chr)
    }

    /// Forget all state. The store directory is left untouched.
    pub fn clear_cache(&self) {
        let mut inner = self.inner.write().expect("trust center lock poisoned");
        inner.root = None;
        inner.store_end_entity = false;
        inner.keys.clear();
        inner.cvcs.clear();
    }

    /// Number of cached certificates.
    pub fn cvc_count(&self) -> usize {
        self.inner.read().expect("trust center lock poisoned").cvcs.len()
    }

    /// Number of cached public keys.
    pub fn key_count(&self) -> usize {
        self.inner.read().expect("trust center lock poisoned").keys.len()
    }

    /// Whether end-entity certificates are persisted, as read from the
    /// marker file at the last cache initialisation.
    pub fn stores_end_entity_cvcs(&self) -> bool {
        self.inner
            .read()
            .expect("trust center lock poisoned")
            .store_end_entity
    }
}

impl Inner {
    fn initialize_cache(&mut self, root: &Path) -> Result<()> {
        for required in [TRUST_ANCHOR_DIR, TRUSTED_DIR, UNTRUSTED_DIR] {
            let dir = root.join(required);
            if !dir.is_dir() {
                return Err(Error::DirectoryAbsent(dir));
            }
        }

        self.keys.clear();
        self.cvcs.clear();
        self.root = Some(root.to_path_buf());
        // one-shot read; later changes to the marker take effect on the
        // next initialisation only
        self.store_end_entity = root.join(STORE_END_ENTITY_MARKER).is_file();

        let anchors = self.keys.load(&root.join(TRUST_ANCHOR_DIR))?;
        info!(anchors, root = %root.display(), "trust anchors loaded");

        let input = load_cvc_files(root)?;
        let candidates = input.len();
        let untrusted = validate_closure(input, |cvc| self.admit(cvc));

        info!(
            candidates,
            trusted = self.cvcs.len(),
            untrusted = untrusted.len(),
            "closure validation finished"
        );

        for cvc in &untrusted {
            self.export(UNTRUSTED_DIR, cvc);
        }
        Ok(())
    }

    fn admit(&mut self, cvc: &Cvc) -> bool {
        if cvc.has_critical_findings() {
            debug!(chr = %cvc.chr_string(), "rejected: critical findings");
            return false;
        }

        let status = cvc.signature_status(&self.keys);
        if status != crate::cvc::SignatureStatus::Valid {
            debug!(chr = %cvc.chr_string(), %status, "rejected: signature not valid");
            return false;
        }

        // an uncritical certificate with a VALID signature always
        // carries a decoded subject key
        let Some(key) = cvc.public_key().cloned() else {
            debug!(chr = %cvc.chr_string(), "rejected: no decodable subject key");
            return false;
        };

        if let Err(error) = self.keys.add(&cvc.chr_string(), key) {
            warn!(%error, chr = %cvc.chr_string(), "rejected: key cache conflict");
            return false;
        }

        let inserted = self.cvcs.add(cvc.clone());
        if inserted
            && self.root.is_some()
            && (!cvc.is_end_entity() || self.store_end_entity)
        {
            self.export(TRUSTED_DIR, cvc);
        }
        debug!(chr = %cvc.chr_string(), inserted, "certificate admitted");
        true
    }

    /// Persist a certificate (DER plus its human-readable mirrors)
    /// under `<root>/<kind>/<path elements>/`. Export faults are
    /// logged, never propagated: one unwritable file must not poison
    /// the cache state.
    fn export(&self, kind: &str, cvc: &Cvc) {
        let Some(root) = self.root.as_ref() else {
            return;
        };
        let elements = self
            .cvcs
            .path_elements(cvc)
            .unwrap_or_else(|_| vec![cvc.chr_string()]);

        let mut dir = root.join(kind);
        for element in &elements {
            dir.push(element);
        }

        if let Err(error) = write_export(&dir, &cvc.chr_string(), cvc) {
            warn!(%error, dir = %dir.display(), "certificate export failed");
        }
    }
}

fn write_export(dir: &Path, prefix: &str, cvc: &Cvc) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(format!("{prefix}{CVC_FILE_SUFFIX}")), cvc.encoded())?;
    std::fs::write(dir.join(format!("{prefix}{CVC_REPORT_SUFFIX}")), cvc.report())?;
    std::fs::write(
        dir.join(format!("{prefix}{CVC_HEX_SUFFIX}")),
        hex::encode(cvc.encoded()),
    )?;
    Ok(())
}

/// Parse a simple `key=value` properties file. Blank lines and lines
/// starting with `#` are ignored.
fn read_properties(path: &Path) -> Result<HashMap<String, String>> {
    let text = std::fs::read_to_string(path)?;
    let mut properties = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            properties.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(properties)
}
