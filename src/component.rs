// cvc-trustcenter/src/component.rs
//
// The semantic fields of a card-verifiable certificate. Each field
// parses itself leniently: structural faults never abort certificate
// construction, they accumulate as findings, and faults that must not
// be trusted through mark the component critical. Trust decisions key
// off the critical flag; the finding strings are diagnostics.

use chrono::NaiveDate;

use crate::ber::Tlv;
use crate::crypto::{Curve, EccPublicKey, HashAlg, TAG_OID, TAG_PUBLIC_POINT};
use crate::oid;

/// Tag of the flag-list octet string inside the CHAT template.
pub const TAG_FLAG_LIST: u32 = 0x53;

/// The certificate profile indicator every CVC of this profile carries.
pub const EXPECTED_CPI: u8 = 0x70;

/// Structural findings collected while parsing a component.
#[derive(Debug, Clone, Default)]
pub struct Findings {
    items: Vec<String>,
    critical: bool,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an informational finding.
    pub fn note(&mut self, msg: impl Into<String>) {
        self.items.push(msg.into());
    }

    /// Record a finding that makes the component untrustworthy.
    pub fn critical(&mut self, msg: impl Into<String>) {
        self.items.push(msg.into());
        self.critical = true;
    }

    pub fn merge(&mut self, other: &Findings) {
        self.items.extend(other.items.iter().cloned());
        self.critical |= other.critical;
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Certificate class encoded in the two most-significant flag-list bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvcClass {
    RootCa,
    SubCa,
    EndEntity,
}

impl std::fmt::Display for CvcClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CvcClass::RootCa => "root CA",
            CvcClass::SubCa => "sub CA",
            CvcClass::EndEntity => "end entity",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// CPI
// ---------------------------------------------------------------------------

/// Certificate profile indicator, a single octet with expected value `70`.
#[derive(Debug, Clone)]
pub struct Cpi {
    value: Option<u8>,
    findings: Findings,
}

impl Cpi {
    pub fn parse(value: &[u8]) -> Self {
        let mut findings = Findings::new();
        let parsed = if value.len() != 1 {
            findings.critical(format!("CPI: expected one octet, got {}", value.len()));
            None
        } else {
            if value[0] != EXPECTED_CPI {
                findings.critical(format!(
                    "CPI: expected {EXPECTED_CPI:02x}, found {:02x}",
                    value[0]
                ));
            }
            Some(value[0])
        };
        Self { value: parsed, findings }
    }

    pub fn value(&self) -> Option<u8> {
        self.value
    }

    pub fn findings(&self) -> &Findings {
        &self.findings
    }
}

// ---------------------------------------------------------------------------
// CA reference (CAR, and the 8-octet CA form of CHR)
// ---------------------------------------------------------------------------

/// Decomposed eight-octet certification authority reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaReference {
    /// Five-character ASCII CA name.
    pub name: String,
    /// Service indicator nibble, 1 or 8.
    pub service_indicator: u8,
    /// Discretionary BCD nibble.
    pub discretionary: u8,
    /// BCD algorithm reference, expected 02.
    pub algorithm_reference: u8,
    /// BCD two-digit generation year.
    pub generation_year: u8,
}

impl std::fmt::Display for CaReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}-{}-{:02}-{:02}",
            self.name,
            self.service_indicator,
            self.discretionary,
            self.algorithm_reference,
            self.generation_year
        )
    }
}

fn bcd(byte: u8) -> Option<u8> {
    let hi = byte >> 4;
    let lo = byte & 0x0f;
    (hi <= 9 && lo <= 9).then_some(hi * 10 + lo)
}

/// Parse the eight-octet CA reference substructure, recording faults
/// against `findings` under the given field label.
fn parse_ca_reference(label: &str, octets: &[u8], findings: &mut Findings) -> Option<CaReference> {
    if octets.len() != 8 {
        findings.critical(format!(
            "{label}: expected 8 octets, got {}",
            octets.len()
        ));
        return None;
    }

    let mut ok = true;
    let name: String = octets[..5].iter().map(|&b| b as char).collect();
    if !octets[..5].iter().all(|b| b.is_ascii_graphic()) {
        findings.critical(format!(
            "{label}: CA name {} is not printable ASCII",
            hex::encode(&octets[..5])
        ));
        ok = false;
    }

    let service_indicator = octets[5] >> 4;
    if service_indicator != 1 && service_indicator != 8 {
        findings.critical(format!(
            "{label}: service indicator {service_indicator} not in {{1, 8}}"
        ));
        ok = false;
    }

    let discretionary = octets[5] & 0x0f;
    if discretionary > 9 {
        findings.critical(format!(
            "{label}: discretionary nibble {discretionary:x} is not BCD"
        ));
        ok = false;
    }

    let algorithm_reference = match bcd(octets[6]) {
        Some(2) => 2,
        Some(other) => {
            findings.critical(format!("{label}: algorithm reference {other:02}, expected 02"));
            ok = false;
            other
        }
        None => {
            findings.critical(format!(
                "{label}: algorithm reference {:02x} is not BCD",
                octets[6]
            ));
            ok = false;
            0
        }
    };

    let generation_year = match bcd(octets[7]) {
        Some(year) => year,
        None => {
            findings.critical(format!(
                "{label}: generation year {:02x} is not BCD",
                octets[7]
            ));
            ok = false;
            0
        }
    };

    ok.then_some(CaReference {
        name,
        service_indicator,
        discretionary,
        algorithm_reference,
        generation_year,
    })
}

/// Certification authority reference, the issuer identifier.
#[derive(Debug, Clone)]
pub struct Car {
    raw: Vec<u8>,
    parsed: Option<CaReference>,
    findings: Findings,
}

impl Car {
    pub fn parse(value: &[u8]) -> Self {
        let mut findings = Findings::new();
        let parsed = parse_ca_reference("CAR", value, &mut findings);
        Self { raw: value.to_vec(), parsed, findings }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn reference(&self) -> Option<&CaReference> {
        self.parsed.as_ref()
    }

    pub fn findings(&self) -> &Findings {
        &self.findings
    }
}

impl std::fmt::Display for Car {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.parsed {
            Some(reference) => write!(f, "{reference}"),
            None => write!(f, "{}", hex::encode(&self.raw)),
        }
    }
}

// ---------------------------------------------------------------------------
// CHR
// ---------------------------------------------------------------------------

/// The two shapes a cardholder reference takes.
#[derive(Debug, Clone)]
pub enum ChrForm {
    /// Eight octets, same substructure as a CA reference.
    Ca(CaReference),
    /// Twelve octets: two discretionary plus the ten-octet BCD ICCSN.
    EndEntity { discretionary: [u8; 2], iccsn: String },
}

/// Cardholder reference, the subject identifier.
#[derive(Debug, Clone)]
pub struct Chr {
    raw: Vec<u8>,
    form: Option<ChrForm>,
    findings: Findings,
}

impl Chr {
    pub fn parse(value: &[u8]) -> Self {
        let mut findings = Findings::new();
        let form = match value.len() {
            8 => parse_ca_reference("CHR", value, &mut findings).map(ChrForm::Ca),
            12 => {
                let discretionary = [value[0], value[1]];
                let mut iccsn = String::with_capacity(20);
                let mut ok = true;
                for &byte in &value[2..] {
                    match bcd(byte) {
                        Some(digits) => {
                            iccsn.push((b'0' + digits / 10) as char);
                            iccsn.push((b'0' + digits % 10) as char);
                        }
                        None => {
                            findings.critical(format!(
                                "CHR: ICCSN octet {byte:02x} is not BCD"
                            ));
                            ok = false;
                            break;
                        }
                    }
                }
                ok.then_some(ChrForm::EndEntity { discretionary, iccsn })
            }
            other => {
                findings.critical(format!("CHR: expected 8 or 12 octets, got {other}"));
                None
            }
        };
        Self { raw: value.to_vec(), form, findings }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn form(&self) -> Option<&ChrForm> {
        self.form.as_ref()
    }

    /// Whether the reference has the eight-octet CA shape.
    pub fn is_ca_shaped(&self) -> bool {
        self.raw.len() == 8
    }

    pub fn findings(&self) -> &Findings {
        &self.findings
    }
}

impl std::fmt::Display for Chr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.form {
            Some(ChrForm::Ca(reference)) => write!(f, "{reference}"),
            Some(ChrForm::EndEntity { iccsn, .. }) => write!(f, "{iccsn}"),
            None => write!(f, "{}", hex::encode(&self.raw)),
        }
    }
}

// ---------------------------------------------------------------------------
// Public-key template
// ---------------------------------------------------------------------------

/// What a key-usage OID implies about the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage {
    pub hash: HashAlg,
    pub curve: Curve,
    /// True for the ecdsa-with-* CA signature OIDs, false for the
    /// authS end-entity authentication OIDs.
    pub ca_key: bool,
}

fn key_usage(oid_value: &[u8]) -> Option<KeyUsage> {
    let (hash, ca_key) = match oid_value {
        o if o == oid::ECDSA_WITH_SHA256 => (HashAlg::Sha256, true),
        o if o == oid::ECDSA_WITH_SHA384 => (HashAlg::Sha384, true),
        o if o == oid::ECDSA_WITH_SHA512 => (HashAlg::Sha512, true),
        o if o == oid::AUTS_COS_ECC_WITH_SHA256 => (HashAlg::Sha256, false),
        o if o == oid::AUTS_COS_ECC_WITH_SHA384 => (HashAlg::Sha384, false),
        o if o == oid::AUTS_COS_ECC_WITH_SHA512 => (HashAlg::Sha512, false),
        _ => return None,
    };
    Some(KeyUsage { hash, curve: hash.matching_curve(), ca_key })
}

/// The `7f49` public-key template: intended-use OID plus public point.
#[derive(Debug, Clone)]
pub struct PublicKeyTemplate {
    oid: Option<Vec<u8>>,
    usage: Option<KeyUsage>,
    key: Option<EccPublicKey>,
    point_curve: Option<Curve>,
    findings: Findings,
}

impl PublicKeyTemplate {
    pub fn parse(template: &Tlv) -> Self {
        let mut findings = Findings::new();
        let mut oid_value = None;
        let mut usage = None;
        let mut key = None;
        let mut point_curve = None;

        match template.find(TAG_OID) {
            Ok(Some(oid_do)) => {
                let value = oid_do.value().to_vec();
                usage = key_usage(&value);
                if usage.is_none() {
                    findings.critical(format!(
                        "public key: usage OID {} is not admissible",
                        hex::encode(&value)
                    ));
                }
                oid_value = Some(value);
            }
            Ok(None) => findings.critical("public key: template lacks the usage OID"),
            Err(_) => findings.critical("public key: template content is not well-formed TLV"),
        }

        match template.find(TAG_PUBLIC_POINT) {
            Ok(Some(point_do)) => {
                let octets = point_do.value();
                match octets.first().copied() {
                    Some(0x04) => match Curve::from_uncompressed_len(octets.len()) {
                        Some(curve) => {
                            point_curve = Some(curve);
                            match EccPublicKey::new(curve, octets.to_vec()) {
                                Ok(parsed) => key = Some(parsed),
                                Err(_) => findings.critical(
                                    "public key: point coordinates are not on the curve",
                                ),
                            }
                        }
                        None => findings.critical(format!(
                            "public key: no curve with uncompressed point length {}",
                            octets.len()
                        )),
                    },
                    Some(form @ (0x02 | 0x03)) => {
                        findings.critical(format!(
                            "public key: compressed point encoding {form:02x} is not accepted"
                        ));
                        point_curve = Curve::from_compressed_len(octets.len());
                    }
                    Some(form) => findings.critical(format!(
                        "public key: unknown point encoding {form:02x}"
                    )),
                    None => findings.critical("public key: empty point octet string"),
                }
            }
            Ok(None) => findings.critical("public key: template lacks the public point"),
            Err(_) => {}
        }

        if let (Some(usage), Some(curve)) = (usage, point_curve) {
            if usage.curve != curve {
                findings.critical(format!(
                    "public key: {curve} point does not match the {} strength of the usage OID",
                    usage.curve
                ));
            }
        }

        Self { oid: oid_value, usage, key, point_curve, findings }
    }

    pub fn oid(&self) -> Option<&[u8]> {
        self.oid.as_deref()
    }

    pub fn usage(&self) -> Option<KeyUsage> {
        self.usage
    }

    pub fn key(&self) -> Option<&EccPublicKey> {
        self.key.as_ref()
    }

    pub fn curve(&self) -> Option<Curve> {
        self.point_curve
    }

    pub fn findings(&self) -> &Findings {
        &self.findings
    }
}

// ---------------------------------------------------------------------------
// CHAT
// ---------------------------------------------------------------------------

/// Flag-list octets that are reserved for future use: everything
/// between the class bits and the access-rights nibble.
const FLAG_LIST_RFU_MASK: [u8; 7] = [0x3f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xf0];

/// Certificate holder authorisation template: flag-list interpretation
/// OID plus the 56-bit flag list.
#[derive(Debug, Clone)]
pub struct Chat {
    oid: Option<Vec<u8>>,
    flag_list: Option<[u8; 7]>,
    class: Option<CvcClass>,
    findings: Findings,
}

impl Chat {
    pub fn parse(template: &Tlv) -> Self {
        let mut findings = Findings::new();
        let mut oid_value = None;
        let mut flag_list = None;
        let mut class = None;

        match template.find(TAG_OID) {
            Ok(Some(oid_do)) => {
                let value = oid_do.value().to_vec();
                if value != oid::CVC_FLAGLIST_TI && value != oid::CVC_FLAGLIST_CMS {
                    findings.critical(format!(
                        "CHAT: flag-list OID {} is not admissible",
                        hex::encode(&value)
                    ));
                }
                oid_value = Some(value);
            }
            Ok(None) => findings.critical("CHAT: template lacks the flag-list OID"),
            Err(_) => findings.critical("CHAT: template content is not well-formed TLV"),
        }

        match template.find(TAG_FLAG_LIST) {
            Ok(Some(flags_do)) => {
                let octets = flags_do.value();
                if octets.len() != 7 {
                    findings.critical(format!(
                        "CHAT: expected 7 flag-list octets, got {}",
                        octets.len()
                    ));
                } else {
                    let mut flags = [0u8; 7];
                    flags.copy_from_slice(octets);
                    class = match flags[0] >> 6 {
                        0b11 => Some(CvcClass::RootCa),
                        0b10 => Some(CvcClass::SubCa),
                        0b00 => Some(CvcClass::EndEntity),
                        _ => {
                            findings.critical("CHAT: class bits 01 are not assigned");
                            None
                        }
                    };
                    match class {
                        Some(CvcClass::RootCa) => {
                            if flags != [0xff; 7] {
                                findings.critical(
                                    "CHAT: root CA flag list must have all flags set",
                                );
                            }
                        }
                        Some(_) => {
                            let rfu_set = flags
                                .iter()
                                .zip(FLAG_LIST_RFU_MASK)
                                .any(|(&flag, mask)| flag & mask != 0);
                            if rfu_set {
                                findings.critical("CHAT: RFU flag set on a non-root certificate");
                            }
                        }
                        None => {}
                    }
                    flag_list = Some(flags);
                }
            }
            Ok(None) => findings.critical("CHAT: template lacks the flag list"),
            Err(_) => {}
        }

        Self { oid: oid_value, flag_list, class, findings }
    }

    pub fn oid(&self) -> Option<&[u8]> {
        self.oid.as_deref()
    }

    pub fn flag_list(&self) -> Option<&[u8; 7]> {
        self.flag_list.as_ref()
    }

    pub fn class(&self) -> Option<CvcClass> {
        self.class
    }

    pub fn findings(&self) -> &Findings {
        &self.findings
    }
}

// ---------------------------------------------------------------------------
// CED / CXD
// ---------------------------------------------------------------------------

/// Certificate effective or expiration date: six octets, one BCD digit
/// each, YYMMDD relative to the year 2000.
#[derive(Debug, Clone)]
pub struct CvcDate {
    raw: Vec<u8>,
    date: Option<NaiveDate>,
    findings: Findings,
}

impl CvcDate {
    pub fn parse(label: &str, value: &[u8]) -> Self {
        let mut findings = Findings::new();
        let date = if value.len() != 6 {
            findings.critical(format!("{label}: expected 6 octets, got {}", value.len()));
            None
        } else if value.iter().any(|&digit| digit > 9) {
            findings.critical(format!("{label}: {} holds a non-BCD digit", hex::encode(value)));
            None
        } else {
            let year = 2000 + i32::from(value[0]) * 10 + i32::from(value[1]);
            let month = u32::from(value[2]) * 10 + u32::from(value[3]);
            let day = u32::from(value[4]) * 10 + u32::from(value[5]);
            let date = NaiveDate::from_ymd_opt(year, month, day);
            if date.is_none() {
                findings.critical(format!("{label}: {year:04}-{month:02}-{day:02} is not a date"));
            }
            date
        };
        Self { raw: value.to_vec(), date, findings }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn findings(&self) -> &Findings {
        &self.findings
    }
}

impl std::fmt::Display for CvcDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.date {
            Some(date) => write!(f, "{date}"),
            None => write!(f, "{}", hex::encode(&self.raw)),
        }
    }
}
