//! # CV-Certificate Trust Center & Secure Messaging
//!
//! Software-side infrastructure for second-generation health-care
//! smart cards: a trust center for card-verifiable certificates (CVC)
//! of the German health-care PKI, and the secure messaging session
//! context that protects APDU traffic after the key agreement.
//!
//! ## Trust center
//!
//! A CVC enters through [`Cvc::parse`], which accepts any octet string
//! with a sound outer TLV skeleton and records every semantic fault as
//! a finding instead of failing. The [`TrustCenter`] mediates between
//! the certificate set and the CHR-keyed public-key cache: trust
//! anchors are loaded from disk, candidate certificates are admitted
//! through a closure-building validation pass (a certificate becomes
//! trustworthy the moment its issuer's key is cached), and accepted or
//! quarantined certificates are exported back to the store directory.
//! Import chains for the on-card protocol are resolved breadth-first
//! and end one step before the root.
//!
//! ## Secure messaging
//!
//! [`SessionContext`] derives the encryption and MAC session keys plus
//! the send-sequence counter from the key-agreement output, computes
//! and verifies truncated AES-CMAC checksums, and enciphers or
//! deciphers payloads with AES-CBC under a counter-derived IV. Any
//! authentication failure closes the session for good.
//!
//! ```no_run
//! use cvc_trustcenter::{Cvc, TrustCenter};
//!
//! # fn main() -> cvc_trustcenter::Result<()> {
//! let trust_center = TrustCenter::new();
//! trust_center.initialize_cache(std::path::Path::new("/var/lib/trustcenter"))?;
//!
//! let cvc = Cvc::parse(&std::fs::read("candidate.cvc")?)?;
//! if trust_center.add(&cvc) {
//!     let chain = trust_center.chain(&cvc, None)?;
//!     println!("import chain of {} certificates", chain.len());
//! } else {
//!     println!("{}", cvc.report());
//! }
//! # Ok(())
//! # }
//! ```

pub mod ber;
pub mod component;
pub mod crypto;
pub mod cvc;
pub mod cvc_cache;
pub mod error;
pub mod key_cache;
pub mod oid;
pub mod session;
pub mod trust_center;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenience
pub use ber::Tlv;
pub use component::{Car, Chat, Chr, Cpi, CvcClass, CvcDate, Findings, PublicKeyTemplate};
pub use crypto::{Curve, EccPublicKey, HashAlg};
pub use cvc::{Cvc, SignatureStatus};
pub use cvc_cache::CvcCache;
pub use error::{Error, Result};
pub use key_cache::PublicKeyCache;
pub use session::SessionContext;
pub use trust_center::TrustCenter;
