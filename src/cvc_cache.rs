// cvc-trustcenter/src/cvc_cache.rs
//
// The set of trusted certificates, deduplicated over the exact outer
// encoding, plus the two algorithms that live on top of it: the
// closure-building validation pass over a directory of candidate
// certificates, and breadth-first chain resolution from a leaf towards
// a self-signed root.

use std::path::Path;

use tracing::warn;

use crate::cvc::Cvc;
use crate::error::{Error, Result};

/// File-name suffix of stored certificates.
pub const CVC_SUFFIX: &str = ".cvc";

/// Insertion-ordered certificate set. Iteration order is discovery
/// order; chain resolution deliberately keeps the first path it finds
/// rather than imposing an artificial ordering.
#[derive(Debug, Default)]
pub struct CvcCache {
    cvcs: Vec<Cvc>,
}

impl CvcCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set-add: true when the certificate was not cached before.
    pub fn add(&mut self, cvc: Cvc) -> bool {
        if self.cvcs.contains(&cvc) {
            return false;
        }
        self.cvcs.push(cvc);
        true
    }

    pub fn contains(&self, cvc: &Cvc) -> bool {
        self.cvcs.contains(cvc)
    }

    pub fn len(&self) -> usize {
        self.cvcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cvcs.is_empty()
    }

    pub fn clear(&mut self) {
        self.cvcs.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cvc> {
        self.cvcs.iter()
    }

    /// All cached certificates whose CHR equals the given reference.
    pub fn find_by_chr(&self, reference: &str) -> Vec<&Cvc> {
        self.cvcs
            .iter()
            .filter(|cvc| cvc.chr_string() == reference)
            .collect()
    }

    /// The cached certificates of the child's issuer: CHR = child.CAR.
    pub fn parents_of(&self, child: &Cvc) -> Vec<Cvc> {
        self.find_by_chr(&child.car_string())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Resolve the import chain from `leaf` towards a self-signed root.
    ///
    /// With `target_root_car` given, the search runs until that root is
    /// reached; without it, any self-signed root terminates the search.
    /// The returned chain starts at the leaf and ends one step before
    /// the root: the last element is the certificate whose CAR equals
    /// the root's CAR, which is what the on-card import protocol
    /// expects.
    ///
    /// Where several parents share a CHR (a root plus link
    /// certificates), all are explored and the first path found wins;
    /// no preference order is imposed.
    pub fn chain(&self, leaf: &Cvc, target_root_car: Option<&str>) -> Result<Vec<Cvc>> {
        if leaf.is_self_signed() {
            return Err(Error::LeafIsRoot);
        }

        let is_target_root = |cvc: &Cvc| {
            cvc.is_self_signed()
                && match target_root_car {
                    Some(target) => cvc.car_string() == target,
                    None => true,
                }
        };

        // Breadth-first reverse tree: nodes plus parent indices.
        let mut nodes: Vec<&Cvc> = vec![leaf];
        let mut parents: Vec<isize> = vec![-1];
        let mut ptr = 0usize;

        let break_index = loop {
            let car = nodes[ptr].car_string();
            for candidate in &self.cvcs {
                if candidate.chr_string() == car && !nodes.iter().any(|n| *n == candidate) {
                    nodes.push(candidate);
                    parents.push(ptr as isize);
                }
            }

            if let Some(index) = nodes.iter().position(|n| is_target_root(n)) {
                break index;
            }

            ptr += 1;
            if ptr >= nodes.len() {
                return Err(Error::NoPath {
                    car: target_root_car.unwrap_or("<any>").to_string(),
                });
            }
        };

        // Reconstruct root-to-leaf by walking the parent indices, then
        // drop the root itself.
        let mut chain: Vec<Cvc> = Vec::new();
        let mut index = break_index as isize;
        while index >= 0 {
            chain.insert(0, nodes[index as usize].clone());
            index = parents[index as usize];
        }
        chain.pop();
        Ok(chain)
    }

    /// Human-readable storage path of a certificate: the root's CAR,
    /// the reference of each CA below it in order, and finally the
    /// certificate's own CHR. A self-signed root renders as its CAR
    /// alone.
    pub fn path_elements(&self, cvc: &Cvc) -> Result<Vec<String>> {
        if cvc.is_self_signed() {
            return Ok(vec![cvc.car_string()]);
        }
        let chain = self.chain(cvc, None)?;
        let mut elements = Vec::with_capacity(chain.len() + 1);
        // chain is never empty here: a non-root leaf resolves through
        // at least itself
        elements.push(chain[chain.len() - 1].car_string());
        for link in chain.iter().rev() {
            elements.push(link.chr_string());
        }
        Ok(elements)
    }
}

/// Read every `*.cvc` file under `root` into memory. Unparseable files
/// are logged and skipped; a failing directory walk aborts the load.
pub fn load_cvc_files(root: &Path) -> Result<Vec<Cvc>> {
    let mut cvcs = Vec::new();
    for entry in jwalk::WalkDir::new(root).sort(true) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_cvc = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(CVC_SUFFIX));
        if !is_cvc {
            continue;
        }
        let parsed = std::fs::read(&path)
            .map_err(Error::from)
            .and_then(|bytes| Cvc::parse(&bytes));
        match parsed {
            Ok(cvc) => cvcs.push(cvc),
            Err(error) => {
                warn!(%error, path = %path.display(), "skipping unreadable certificate file");
            }
        }
    }
    Ok(cvcs)
}

/// Closure-building validation: present every input certificate to the
/// admission policy, remove the accepted ones, and repeat until the
/// input is exhausted or an iteration admits nothing. Certificates
/// admitted in one iteration typically unlock their children in the
/// next, so the loop builds the maximal trust closure reachable from
/// the trust anchors. The residue is returned as untrusted.
pub fn validate_closure(input: Vec<Cvc>, mut admit: impl FnMut(&Cvc) -> bool) -> Vec<Cvc> {
    let mut input_set = input;
    loop {
        let mut remaining = Vec::with_capacity(input_set.len());
        let mut transferred = false;
        for cvc in input_set {
            if admit(&cvc) {
                transferred = true;
            } else {
                remaining.push(cvc);
            }
        }
        input_set = remaining;
        if input_set.is_empty() || !transferred {
            return input_set;
        }
    }
}
