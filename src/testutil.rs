// cvc-trustcenter/src/testutil.rs
//
// Shared fixtures for the module tests: an in-memory certification
// hierarchy signed with freshly generated brainpool keys, so cache,
// chain and admission tests run against real ECDSA signatures.

use openssl::ec::{EcGroup, EcKey};
use openssl::ecdsa::EcdsaSig;
use openssl::pkey::Private;

use crate::ber::Tlv;
use crate::component::TAG_FLAG_LIST;
use crate::crypto::{Curve, EccPublicKey, HashAlg, TAG_OID, TAG_PUBLIC_KEY_TEMPLATE, TAG_PUBLIC_POINT};
use crate::cvc::{
    Cvc, TAG_CAR, TAG_CED, TAG_CHAT, TAG_CHR, TAG_CPI, TAG_CVC, TAG_CVC_CONTENT, TAG_CXD,
    TAG_SIGNATURE,
};
use crate::oid;

pub(crate) const ROOT_FLAGS: [u8; 7] = [0xff; 7];
pub(crate) const SUB_CA_FLAGS: [u8; 7] = [0x80, 0, 0, 0, 0, 0, 0x03];
pub(crate) const END_ENTITY_FLAGS: [u8; 7] = [0x00, 0, 0, 0, 0, 0, 0x03];

/// CED 2023-08-01, CXD 2031-07-31: the validity window used by all
/// generated fixtures.
pub(crate) const CED: [u8; 6] = [2, 3, 0, 8, 0, 1];
pub(crate) const CXD: [u8; 6] = [3, 1, 0, 7, 3, 1];

fn bcd_byte(n: u8) -> u8 {
    ((n / 10) << 4) | (n % 10)
}

/// Eight-octet CA reference: five ASCII name characters, service
/// indicator and discretionary nibbles, algorithm reference 02, year.
pub(crate) fn ca_reference(name: &str, service: u8, discretionary: u8, year: u8) -> Vec<u8> {
    assert_eq!(name.len(), 5);
    let mut out = name.as_bytes().to_vec();
    out.push((service << 4) | discretionary);
    out.push(0x02);
    out.push(bcd_byte(year));
    out
}

/// Twelve-octet end-entity CHR: two discretionary octets plus the
/// packed-BCD twenty-digit ICCSN.
pub(crate) fn end_entity_chr(iccsn_digits: &str) -> Vec<u8> {
    assert_eq!(iccsn_digits.len(), 20);
    let mut out = vec![0x00, 0x00];
    let digits: Vec<u8> = iccsn_digits.bytes().map(|b| b - b'0').collect();
    for pair in digits.chunks(2) {
        out.push((pair[0] << 4) | pair[1]);
    }
    out
}

pub(crate) fn generate_key(curve: Curve) -> EcKey<Private> {
    let nid = match curve {
        Curve::BrainpoolP256r1 => openssl::nid::Nid::BRAINPOOL_P256R1,
        Curve::BrainpoolP384r1 => openssl::nid::Nid::BRAINPOOL_P384R1,
        Curve::BrainpoolP512r1 => openssl::nid::Nid::BRAINPOOL_P512R1,
    };
    EcKey::generate(&EcGroup::from_curve_name(nid).unwrap()).unwrap()
}

pub(crate) fn public_point(curve: Curve, key: &EcKey<Private>) -> Vec<u8> {
    EccPublicKey::from_ec_key(curve, key).unwrap().point().to_vec()
}

/// Everything that goes into one generated certificate.
pub(crate) struct CvcFixture {
    pub car: Vec<u8>,
    pub chr: Vec<u8>,
    pub usage_oid: &'static [u8],
    pub flag_oid: &'static [u8],
    pub flags: [u8; 7],
    pub ced: [u8; 6],
    pub cxd: [u8; 6],
    pub point: Vec<u8>,
}

/// Encode and sign a certificate over the fixture's content.
pub(crate) fn build_cvc(
    fixture: &CvcFixture,
    signer: &EcKey<Private>,
    signer_curve: Curve,
    hash: HashAlg,
) -> Vec<u8> {
    let mut key_template = Tlv::new(TAG_OID, fixture.usage_oid.to_vec()).to_der();
    key_template.extend(Tlv::new(TAG_PUBLIC_POINT, fixture.point.clone()).to_der());

    let mut chat = Tlv::new(TAG_OID, fixture.flag_oid.to_vec()).to_der();
    chat.extend(Tlv::new(TAG_FLAG_LIST, fixture.flags.to_vec()).to_der());

    let mut content = Tlv::new(TAG_CPI, vec![0x70]).to_der();
    content.extend(Tlv::new(TAG_CAR, fixture.car.clone()).to_der());
    content.extend(Tlv::new(TAG_PUBLIC_KEY_TEMPLATE, key_template).to_der());
    content.extend(Tlv::new(TAG_CHR, fixture.chr.clone()).to_der());
    content.extend(Tlv::new(TAG_CHAT, chat).to_der());
    content.extend(Tlv::new(TAG_CED, fixture.ced.to_vec()).to_der());
    content.extend(Tlv::new(TAG_CXD, fixture.cxd.to_vec()).to_der());

    let message = Tlv::new(TAG_CVC_CONTENT, content);
    let digest = hash.digest(message.der());
    let sig = EcdsaSig::sign(&digest, signer).unwrap();
    let half = signer_curve.field_len() as i32;
    let mut raw_sig = sig.r().to_vec_padded(half).unwrap();
    raw_sig.extend(sig.s().to_vec_padded(half).unwrap());

    let mut outer = message.to_der();
    outer.extend(Tlv::new(TAG_SIGNATURE, raw_sig).to_der());
    Tlv::new(TAG_CVC, outer).to_der()
}

/// A three-level hierarchy on brainpoolP256r1: self-signed root,
/// sub CA signed by the root, end entity signed by the sub CA.
pub(crate) struct Hierarchy {
    pub root_key: EcKey<Private>,
    pub sub_key: EcKey<Private>,
    pub end_key: EcKey<Private>,
    pub root: Cvc,
    pub sub: Cvc,
    pub end: Cvc,
}

impl Hierarchy {
    pub fn generate() -> Self {
        let curve = Curve::BrainpoolP256r1;
        let root_key = generate_key(curve);
        let sub_key = generate_key(curve);
        let end_key = generate_key(curve);

        let root_ref = ca_reference("DEGXX", 8, 7, 22);
        let sub_ref = ca_reference("DESCA", 8, 1, 23);

        let root = build_cvc(
            &CvcFixture {
                car: root_ref.clone(),
                chr: root_ref.clone(),
                usage_oid: oid::ECDSA_WITH_SHA256,
                flag_oid: oid::CVC_FLAGLIST_TI,
                flags: ROOT_FLAGS,
                ced: CED,
                cxd: CXD,
                point: public_point(curve, &root_key),
            },
            &root_key,
            curve,
            HashAlg::Sha256,
        );

        let sub = build_cvc(
            &CvcFixture {
                car: root_ref.clone(),
                chr: sub_ref.clone(),
                usage_oid: oid::ECDSA_WITH_SHA256,
                flag_oid: oid::CVC_FLAGLIST_TI,
                flags: SUB_CA_FLAGS,
                ced: CED,
                cxd: CXD,
                point: public_point(curve, &sub_key),
            },
            &root_key,
            curve,
            HashAlg::Sha256,
        );

        let end = build_cvc(
            &CvcFixture {
                car: sub_ref,
                chr: end_entity_chr("80276883110000012345"),
                usage_oid: oid::AUTS_COS_ECC_WITH_SHA256,
                flag_oid: oid::CVC_FLAGLIST_TI,
                flags: END_ENTITY_FLAGS,
                ced: CED,
                cxd: CXD,
                point: public_point(curve, &end_key),
            },
            &sub_key,
            curve,
            HashAlg::Sha256,
        );

        Self {
            root_key,
            sub_key,
            end_key,
            root: Cvc::parse(&root).unwrap(),
            sub: Cvc::parse(&sub).unwrap(),
            end: Cvc::parse(&end).unwrap(),
        }
    }

    /// The trust-anchor public key of the hierarchy.
    pub fn root_public_key(&self) -> EccPublicKey {
        EccPublicKey::from_ec_key(Curve::BrainpoolP256r1, &self.root_key).unwrap()
    }
}
