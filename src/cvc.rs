// cvc-trustcenter/src/cvc.rs
//
// The card-verifiable certificate. Construction from octets succeeds
// whenever the outer TLV skeleton is sound; every semantic fault inside
// is collected as a finding instead of an error, and findings that make
// the certificate untrustworthy flip the critical flag. The ECDSA
// signature is evaluated lazily against a public-key cache and the
// outcome is published through an atomic cell: VALID and INVALID are
// terminal, NO_PUBLIC_KEY may be retried once new keys arrive.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::ber::Tlv;
use crate::component::{Car, Chat, Chr, Cpi, CvcClass, CvcDate, Findings, PublicKeyTemplate};
use crate::crypto::{self, EccPublicKey, TAG_PUBLIC_KEY_TEMPLATE};
use crate::error::{Error, Result};
use crate::key_cache::PublicKeyCache;

/// Outer certificate template tag.
pub const TAG_CVC: u32 = 0x7f21;
/// Certificate content template tag (the signed message).
pub const TAG_CVC_CONTENT: u32 = 0x7f4e;
/// Signature data object tag.
pub const TAG_SIGNATURE: u32 = 0x5f37;
/// Certificate profile indicator tag.
pub const TAG_CPI: u32 = 0x5f29;
/// Certification authority reference tag.
pub const TAG_CAR: u32 = 0x42;
/// Cardholder reference tag.
pub const TAG_CHR: u32 = 0x5f20;
/// Certificate holder authorisation template tag.
pub const TAG_CHAT: u32 = 0x7f4c;
/// Certificate effective date tag.
pub const TAG_CED: u32 = 0x5f25;
/// Certificate expiration date tag.
pub const TAG_CXD: u32 = 0x5f24;

/// Outcome of the deferred signature evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SignatureStatus {
    /// Not evaluated yet.
    Unknown = 0,
    /// Signature verifies under the issuer key. Terminal.
    Valid = 1,
    /// Signature does not verify under the issuer key. Terminal.
    Invalid = 2,
    /// The issuer key is not cached; evaluation may be retried.
    NoPublicKey = 3,
}

impl SignatureStatus {
    /// VALID and INVALID never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, SignatureStatus::Valid | SignatureStatus::Invalid)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SignatureStatus::Valid,
            2 => SignatureStatus::Invalid,
            3 => SignatureStatus::NoPublicKey,
            _ => SignatureStatus::Unknown,
        }
    }
}

impl std::fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SignatureStatus::Unknown => "UNKNOWN",
            SignatureStatus::Valid => "VALID",
            SignatureStatus::Invalid => "INVALID",
            SignatureStatus::NoPublicKey => "NO_PUBLIC_KEY",
        };
        write!(f, "{name}")
    }
}

/// Atomic publication cell for the signature status. A terminal value,
/// once stored, wins against any later store.
#[derive(Debug)]
struct StatusCell(AtomicU8);

impl StatusCell {
    fn new(status: SignatureStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    fn load(&self) -> SignatureStatus {
        SignatureStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    fn publish(&self, status: SignatureStatus) {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if SignatureStatus::from_u8(current).is_terminal() {
                return;
            }
            match self.0.compare_exchange(
                current,
                status as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }
}

/// A parsed card-verifiable certificate. Immutable apart from the
/// signature-status cell; equality and hashing cover the exact outer
/// encoding, so re-encoding an accepted certificate is the identity.
#[derive(Debug)]
pub struct Cvc {
    raw: Vec<u8>,
    message: Vec<u8>,
    signature: Vec<u8>,
    cpi: Option<Cpi>,
    car: Option<Car>,
    chr: Option<Chr>,
    key_template: Option<PublicKeyTemplate>,
    chat: Option<Chat>,
    ced: Option<CvcDate>,
    cxd: Option<CvcDate>,
    findings: Findings,
    status: StatusCell,
}

impl Cvc {
    /// Parse a certificate from its outer `7f21` encoding.
    ///
    /// Fails only when the TLV skeleton (outer template, content
    /// template, signature object) cannot be decoded; all semantic
    /// faults surface through [`Cvc::has_critical_findings`] and
    /// [`Cvc::report`] instead.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let outer = Tlv::parse(bytes)?;
        if outer.tag() != TAG_CVC {
            return Err(Error::InvalidTlv(format!(
                "expected certificate template 7f21, got {:x}",
                outer.tag()
            )));
        }

        let content = outer
            .find(TAG_CVC_CONTENT)?
            .ok_or_else(|| Error::InvalidTlv("certificate lacks the 7f4e content template".into()))?;
        let signature_do = outer
            .find(TAG_SIGNATURE)?
            .ok_or_else(|| Error::InvalidTlv("certificate lacks the 5f37 signature object".into()))?;

        let mut findings = Findings::new();
        let mut cpi = None;
        let mut car = None;
        let mut chr = None;
        let mut key_template = None;
        let mut chat = None;
        let mut ced = None;
        let mut cxd = None;

        match content.children() {
            Ok(_) => {
                match content.find(TAG_CPI)? {
                    Some(tlv) => cpi = Some(Cpi::parse(tlv.value())),
                    None => findings.critical("content lacks the CPI data object"),
                }
                match content.find(TAG_CAR)? {
                    Some(tlv) => car = Some(Car::parse(tlv.value())),
                    None => findings.critical("content lacks the CAR data object"),
                }
                match content.find(TAG_PUBLIC_KEY_TEMPLATE)? {
                    Some(tlv) => key_template = Some(PublicKeyTemplate::parse(&tlv)),
                    None => findings.critical("content lacks the public-key template"),
                }
                match content.find(TAG_CHR)? {
                    Some(tlv) => chr = Some(Chr::parse(tlv.value())),
                    None => findings.critical("content lacks the CHR data object"),
                }
                match content.find(TAG_CHAT)? {
                    Some(tlv) => chat = Some(Chat::parse(&tlv)),
                    None => findings.critical("content lacks the CHAT template"),
                }
                match content.find(TAG_CED)? {
                    Some(tlv) => ced = Some(CvcDate::parse("CED", tlv.value())),
                    None => findings.critical("content lacks the CED data object"),
                }
                match content.find(TAG_CXD)? {
                    Some(tlv) => cxd = Some(CvcDate::parse("CXD", tlv.value())),
                    None => findings.critical("content lacks the CXD data object"),
                }
            }
            Err(_) => findings.critical("content template is not a well-formed TLV concatenation"),
        }

        let cvc = Self {
            raw: bytes.to_vec(),
            message: content.to_der(),
            signature: signature_do.value().to_vec(),
            cpi,
            car,
            chr,
            key_template,
            chat,
            ced,
            cxd,
            findings,
            status: StatusCell::new(SignatureStatus::Unknown),
        };
        Ok(cvc.cross_checked())
    }

    /// Cross-field invariants that no single component can see.
    fn cross_checked(mut self) -> Self {
        let class = self.chat.as_ref().and_then(|chat| chat.class());

        if let (Some(chr), Some(class)) = (self.chr.as_ref(), class) {
            let ca_shaped = chr.is_ca_shaped();
            match class {
                CvcClass::RootCa | CvcClass::SubCa if !ca_shaped => {
                    self.findings.critical(format!(
                        "CHR: {class} certificate must carry the 8-octet CA reference"
                    ));
                }
                CvcClass::EndEntity if ca_shaped => {
                    self.findings.critical(
                        "CHR: end-entity certificate must carry the 12-octet ICCSN reference",
                    );
                }
                _ => {}
            }
        }

        if let (Some(chr), Some(usage)) =
            (self.chr.as_ref(), self.key_template.as_ref().and_then(|t| t.usage()))
        {
            if usage.ca_key && !chr.is_ca_shaped() {
                self.findings
                    .critical("public key: CA signature OID paired with an end-entity CHR");
            }
            if !usage.ca_key && chr.is_ca_shaped() {
                self.findings
                    .critical("public key: authentication OID paired with a CA CHR");
            }
        }

        if let (Some(ced), Some(cxd)) = (
            self.ced.as_ref().and_then(|d| d.date()),
            self.cxd.as_ref().and_then(|d| d.date()),
        ) {
            if ced > cxd {
                self.findings
                    .critical(format!("CED {ced} lies after CXD {cxd}"));
            }
        }

        if let Some(curve) = self.key_template.as_ref().and_then(|t| t.curve()) {
            let expected = 2 * curve.field_len();
            if self.signature.len() != expected {
                self.findings.note(format!(
                    "signature: {} octets, expected {expected} for {curve}",
                    self.signature.len()
                ));
            }
        }

        self
    }

    /// The exact outer encoding the certificate was parsed from.
    pub fn encoded(&self) -> &[u8] {
        &self.raw
    }

    /// The encoded `7f4e` content template, i.e. the ECDSA message.
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// The raw `R || S` signature.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn cpi(&self) -> Option<&Cpi> {
        self.cpi.as_ref()
    }

    pub fn car(&self) -> Option<&Car> {
        self.car.as_ref()
    }

    pub fn chr(&self) -> Option<&Chr> {
        self.chr.as_ref()
    }

    pub fn key_template(&self) -> Option<&PublicKeyTemplate> {
        self.key_template.as_ref()
    }

    pub fn chat(&self) -> Option<&Chat> {
        self.chat.as_ref()
    }

    pub fn ced(&self) -> Option<&CvcDate> {
        self.ced.as_ref()
    }

    pub fn cxd(&self) -> Option<&CvcDate> {
        self.cxd.as_ref()
    }

    /// The subject public key, when the template parsed cleanly.
    pub fn public_key(&self) -> Option<&EccPublicKey> {
        self.key_template.as_ref().and_then(|t| t.key())
    }

    /// Issuer reference in display form (`DEGXX_8-7-02-22` style).
    pub fn car_string(&self) -> String {
        self.car.as_ref().map(|c| c.to_string()).unwrap_or_default()
    }

    /// Subject reference in display form.
    pub fn chr_string(&self) -> String {
        self.chr.as_ref().map(|c| c.to_string()).unwrap_or_default()
    }

    /// Certificate class from the flag-list bits.
    pub fn class(&self) -> Option<CvcClass> {
        self.chat.as_ref().and_then(|chat| chat.class())
    }

    pub fn is_root_ca(&self) -> bool {
        self.class() == Some(CvcClass::RootCa)
    }

    pub fn is_sub_ca(&self) -> bool {
        self.class() == Some(CvcClass::SubCa)
    }

    pub fn is_end_entity(&self) -> bool {
        self.class() == Some(CvcClass::EndEntity)
    }

    /// Issuer and subject reference are the same octets.
    pub fn is_self_signed(&self) -> bool {
        match (self.car.as_ref(), self.chr.as_ref()) {
            (Some(car), Some(chr)) => chr.is_ca_shaped() && car.raw() == chr.raw(),
            _ => false,
        }
    }

    /// Whether anything about this certificate forbids trusting it.
    /// An INVALID signature counts; UNKNOWN and NO_PUBLIC_KEY do not.
    pub fn has_critical_findings(&self) -> bool {
        self.status.load() == SignatureStatus::Invalid
            || self.findings.is_critical()
            || self.component_findings().any(|f| f.is_critical())
    }

    fn component_findings(&self) -> impl Iterator<Item = &Findings> {
        [
            self.cpi.as_ref().map(|c| c.findings()),
            self.car.as_ref().map(|c| c.findings()),
            self.chr.as_ref().map(|c| c.findings()),
            self.key_template.as_ref().map(|c| c.findings()),
            self.chat.as_ref().map(|c| c.findings()),
            self.ced.as_ref().map(|c| c.findings()),
            self.cxd.as_ref().map(|c| c.findings()),
        ]
        .into_iter()
        .flatten()
    }

    /// All finding strings, component findings included.
    pub fn findings(&self) -> Vec<String> {
        let mut items: Vec<String> = self.findings.items().to_vec();
        for findings in self.component_findings() {
            items.extend(findings.items().iter().cloned());
        }
        if self.status.load() == SignatureStatus::Invalid {
            items.push("signature is INVALID".to_string());
        }
        items
    }

    /// The cached signature status, without triggering evaluation.
    pub fn signature_status_cached(&self) -> SignatureStatus {
        self.status.load()
    }

    /// Deferred, idempotent signature evaluation against the key cache.
    ///
    /// A terminal cached value is returned as is. Otherwise the issuer
    /// key is looked up under the CAR; a missing key publishes
    /// NO_PUBLIC_KEY (retryable), a present key decides VALID or
    /// INVALID once and for all.
    pub fn signature_status(&self, keys: &PublicKeyCache) -> SignatureStatus {
        let current = self.status.load();
        if current.is_terminal() {
            return current;
        }

        let key = match keys.get(&self.car_string()) {
            Ok(key) => key,
            Err(_) => {
                self.status.publish(SignatureStatus::NoPublicKey);
                return self.status.load();
            }
        };

        let usage = self.key_template.as_ref().and_then(|t| t.usage());
        let verified = match usage {
            Some(usage) => {
                match crypto::ecdsa_verify(&key, usage.hash, &self.message, &self.signature) {
                    Ok(outcome) => outcome,
                    Err(error) => {
                        tracing::warn!(%error, chr = %self.chr_string(),
                            "signature verification backend failure");
                        return current;
                    }
                }
            }
            // Without an admissible usage OID there is no hash family
            // to verify under; the certificate is critical regardless.
            None => false,
        };

        self.status.publish(if verified {
            SignatureStatus::Valid
        } else {
            SignatureStatus::Invalid
        });
        self.status.load()
    }

    /// Multi-line diagnostic dump: every field plus every finding.
    pub fn report(&self) -> String {
        fn line<T: std::fmt::Display>(out: &mut String, label: &str, value: Option<T>) {
            match value {
                Some(value) => out.push_str(&format!("  {label:<10} {value}\n")),
                None => out.push_str(&format!("  {label:<10} <absent>\n")),
            }
        }

        let mut out = format!("CV certificate {}\n", self.chr_string());
        line(
            &mut out,
            "CPI:",
            self.cpi
                .as_ref()
                .and_then(|c| c.value())
                .map(|v| format!("{v:02x}")),
        );
        line(&mut out, "CAR:", self.car.as_ref());
        line(&mut out, "CHR:", self.chr.as_ref());
        line(&mut out, "class:", self.class());
        line(
            &mut out,
            "key usage:",
            self.key_template.as_ref().and_then(|t| t.oid()).map(|o| {
                match crate::oid::name(o) {
                    Some(name) => name.to_string(),
                    None => hex::encode(o),
                }
            }),
        );
        line(
            &mut out,
            "curve:",
            self.key_template.as_ref().and_then(|t| t.curve()),
        );
        line(
            &mut out,
            "flag list:",
            self.chat
                .as_ref()
                .and_then(|c| c.flag_list())
                .map(hex::encode),
        );
        line(&mut out, "CED:", self.ced.as_ref());
        line(&mut out, "CXD:", self.cxd.as_ref());
        out.push_str(&format!(
            "  {:<10} {} octets, status {}\n",
            "signature:",
            self.signature.len(),
            self.status.load()
        ));

        let findings = self.findings();
        if findings.is_empty() {
            out.push_str("  findings:  none\n");
        } else {
            out.push_str("  findings:\n");
            for finding in findings {
                out.push_str(&format!("    - {finding}\n"));
            }
        }
        out
    }
}

impl Clone for Cvc {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            message: self.message.clone(),
            signature: self.signature.clone(),
            cpi: self.cpi.clone(),
            car: self.car.clone(),
            chr: self.chr.clone(),
            key_template: self.key_template.clone(),
            chat: self.chat.clone(),
            ced: self.ced.clone(),
            cxd: self.cxd.clone(),
            findings: self.findings.clone(),
            status: StatusCell::new(self.status.load()),
        }
    }
}

impl PartialEq for Cvc {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Cvc {}

impl std::hash::Hash for Cvc {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Curve;
    use crate::key_cache::PublicKeyCache;
    use crate::testutil::{self, Hierarchy};

    #[test]
    fn test_parse_roundtrip_is_identity() {
        let h = Hierarchy::generate();
        let bytes = h.sub.encoded().to_vec();
        let reparsed = Cvc::parse(&bytes).unwrap();
        assert_eq!(reparsed.encoded(), &bytes[..]);
        assert_eq!(reparsed, h.sub);
    }

    #[test]
    fn test_parse_sub_ca_fields() {
        let h = Hierarchy::generate();
        let sub = &h.sub;
        assert!(!sub.has_critical_findings(), "{}", sub.report());
        assert_eq!(sub.car_string(), "DEGXX_8-7-02-22");
        assert_eq!(sub.chr_string(), "DESCA_8-1-02-23");
        assert_eq!(sub.cpi().unwrap().value(), Some(0x70));
        assert!(sub.is_sub_ca());
        assert!(!sub.is_self_signed());
        assert_eq!(sub.ced().unwrap().to_string(), "2023-08-01");
        assert_eq!(sub.cxd().unwrap().to_string(), "2031-07-31");
        assert_eq!(sub.signature_status_cached(), SignatureStatus::Unknown);
    }

    #[test]
    fn test_root_is_self_signed() {
        let h = Hierarchy::generate();
        assert!(h.root.is_self_signed());
        assert!(h.root.is_root_ca());
        assert!(h.end.is_end_entity());
        assert!(!h.end.is_self_signed());
    }

    #[test]
    fn test_rejects_non_cvc_outer_tag() {
        let tlv = crate::ber::Tlv::new(0x7f4e, vec![0x00]);
        assert!(matches!(Cvc::parse(&tlv.to_der()), Err(Error::InvalidTlv(_))));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Cvc::parse(&[0xde, 0xad]).is_err());
    }

    #[test]
    fn test_status_no_public_key_without_anchor() {
        let h = Hierarchy::generate();
        let keys = PublicKeyCache::new();
        assert_eq!(h.sub.signature_status(&keys), SignatureStatus::NoPublicKey);
        // not critical: the anchor may still arrive
        assert!(!h.sub.has_critical_findings());
    }

    #[test]
    fn test_status_becomes_valid_and_terminal() {
        let h = Hierarchy::generate();
        let keys = PublicKeyCache::new();
        keys.add(&h.root.chr_string(), h.root_public_key()).unwrap();

        assert_eq!(h.sub.signature_status(&keys), SignatureStatus::Valid);

        // terminal: dropping the key does not reopen the question
        keys.clear();
        assert_eq!(h.sub.signature_status(&keys), SignatureStatus::Valid);
    }

    #[test]
    fn test_no_public_key_is_retryable() {
        let h = Hierarchy::generate();
        let keys = PublicKeyCache::new();
        assert_eq!(h.sub.signature_status(&keys), SignatureStatus::NoPublicKey);

        keys.add(&h.root.chr_string(), h.root_public_key()).unwrap();
        assert_eq!(h.sub.signature_status(&keys), SignatureStatus::Valid);
    }

    #[test]
    fn test_tampered_signature_is_invalid_and_critical() {
        let h = Hierarchy::generate();
        let mut bytes = h.sub.encoded().to_vec();
        let index = bytes.len() - 1;
        bytes[index] ^= 0x01;
        let tampered = Cvc::parse(&bytes).unwrap();

        let keys = PublicKeyCache::new();
        keys.add(&h.root.chr_string(), h.root_public_key()).unwrap();

        assert_eq!(tampered.signature_status(&keys), SignatureStatus::Invalid);
        assert!(tampered.has_critical_findings());
        assert!(tampered.findings().contains(&"signature is INVALID".to_string()));
        assert!(tampered.report().contains("signature is INVALID"));
    }

    #[test]
    fn test_tampered_message_is_invalid() {
        let h = Hierarchy::generate();
        let mut bytes = h.sub.encoded().to_vec();
        // flip one octet inside the CAR value
        let car_pos = bytes
            .windows(8)
            .position(|w| w == h.sub.car().unwrap().raw())
            .unwrap();
        bytes[car_pos + 1] ^= 0x20;
        let tampered = Cvc::parse(&bytes).unwrap();
        assert_eq!(tampered.car_string(), "DeGXX_8-7-02-22");

        let keys = PublicKeyCache::new();
        keys.add(&h.root.chr_string(), h.root_public_key()).unwrap();
        // lookup under the altered CAR finds nothing
        assert_eq!(tampered.signature_status(&keys), SignatureStatus::NoPublicKey);

        keys.add(&tampered.car_string(), h.root_public_key()).unwrap();
        assert_eq!(tampered.signature_status(&keys), SignatureStatus::Invalid);
    }

    #[test]
    fn test_flipped_cpi_is_critical() {
        let h = Hierarchy::generate();
        let mut bytes = h.root.encoded().to_vec();
        let pos = bytes
            .windows(3)
            .position(|w| w == [0x5f, 0x29, 0x01])
            .unwrap();
        bytes[pos + 3] = 0x71;
        let parsed = Cvc::parse(&bytes).unwrap();
        assert!(parsed.has_critical_findings());
        assert!(parsed
            .findings()
            .iter()
            .any(|f| f.contains("CPI")));
    }

    #[test]
    fn test_missing_data_object_is_critical() {
        // content with only a CPI inside
        let content = crate::ber::Tlv::new(TAG_CVC_CONTENT, crate::ber::Tlv::new(TAG_CPI, vec![0x70]).to_der());
        let mut outer = content.to_der();
        outer.extend(crate::ber::Tlv::new(TAG_SIGNATURE, vec![0u8; 64]).to_der());
        let cvc = Cvc::parse(&crate::ber::Tlv::new(TAG_CVC, outer).to_der()).unwrap();
        assert!(cvc.has_critical_findings());
        assert!(cvc.findings().iter().any(|f| f.contains("lacks")));
    }

    #[test]
    fn test_report_lists_fields() {
        let h = Hierarchy::generate();
        let report = h.end.report();
        assert!(report.contains("80276883110000012345"));
        assert!(report.contains("DESCA_8-1-02-23"));
        assert!(report.contains("end entity"));
        assert!(report.contains("brainpoolP256r1"));
        assert!(report.contains("findings:  none"));
    }

    #[test]
    fn test_clone_preserves_status() {
        let h = Hierarchy::generate();
        let keys = PublicKeyCache::new();
        keys.add(&h.root.chr_string(), h.root_public_key()).unwrap();
        assert_eq!(h.sub.signature_status(&keys), SignatureStatus::Valid);

        let cloned = h.sub.clone();
        assert_eq!(cloned.signature_status_cached(), SignatureStatus::Valid);
    }

    #[test]
    fn test_usage_pairing_cross_check() {
        // end-entity flag list with a CA signature OID
        let curve = Curve::BrainpoolP256r1;
        let key = testutil::generate_key(curve);
        let bytes = testutil::build_cvc(
            &testutil::CvcFixture {
                car: testutil::ca_reference("DEGXX", 8, 7, 22),
                chr: testutil::end_entity_chr("80276883110000012345"),
                usage_oid: crate::oid::ECDSA_WITH_SHA256,
                flag_oid: crate::oid::CVC_FLAGLIST_TI,
                flags: testutil::END_ENTITY_FLAGS,
                ced: testutil::CED,
                cxd: testutil::CXD,
                point: testutil::public_point(curve, &key),
            },
            &key,
            curve,
            crate::crypto::HashAlg::Sha256,
        );
        let cvc = Cvc::parse(&bytes).unwrap();
        assert!(cvc.has_critical_findings());
        assert!(cvc
            .findings()
            .iter()
            .any(|f| f.contains("CA signature OID")));
    }

    #[test]
    fn test_dates_out_of_order_is_critical() {
        let curve = Curve::BrainpoolP256r1;
        let key = testutil::generate_key(curve);
        let reference = testutil::ca_reference("DEGXX", 8, 7, 22);
        let bytes = testutil::build_cvc(
            &testutil::CvcFixture {
                car: reference.clone(),
                chr: reference,
                usage_oid: crate::oid::ECDSA_WITH_SHA256,
                flag_oid: crate::oid::CVC_FLAGLIST_TI,
                flags: testutil::ROOT_FLAGS,
                ced: testutil::CXD,
                cxd: testutil::CED,
                point: testutil::public_point(curve, &key),
            },
            &key,
            curve,
            crate::crypto::HashAlg::Sha256,
        );
        let cvc = Cvc::parse(&bytes).unwrap();
        assert!(cvc.has_critical_findings());
    }
}
