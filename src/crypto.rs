// cvc-trustcenter/src/crypto.rs
//
// Elliptic-curve and AES primitives for the certificate and session
// layers. Curve arithmetic, ECDSA verification, AES-CBC/CMAC and the
// single-block cipher all go through OpenSSL; digests use the
// RustCrypto hash crates.

use openssl::bn::{BigNum, BigNumContext};
use openssl::ec::{EcGroup, EcKey, EcPoint, PointConversionForm};
use openssl::ecdsa::EcdsaSig;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Public};
use openssl::sign::Signer;
use openssl::symm::{Cipher, Crypter, Mode};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::ber::Tlv;
use crate::error::{Error, Result};
use crate::oid;

/// AES cipher block size in octets.
pub const BLOCK_SIZE: usize = 16;

/// Tag of the ISO/IEC 7816 public-key template.
pub const TAG_PUBLIC_KEY_TEMPLATE: u32 = 0x7f49;

/// Tag of the object identifier inside a public-key template.
pub const TAG_OID: u32 = 0x06;

/// Tag of the public-point octet string inside a public-key template.
pub const TAG_PUBLIC_POINT: u32 = 0x86;

/// The three brainpool curves the health-care PKI issues keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    BrainpoolP256r1,
    BrainpoolP384r1,
    BrainpoolP512r1,
}

impl Curve {
    /// Field element size in octets.
    pub fn field_len(self) -> usize {
        match self {
            Curve::BrainpoolP256r1 => 32,
            Curve::BrainpoolP384r1 => 48,
            Curve::BrainpoolP512r1 => 64,
        }
    }

    /// Length of the full uncompressed point encoding `04 || X || Y`.
    pub fn uncompressed_len(self) -> usize {
        1 + 2 * self.field_len()
    }

    /// Curve selected by the length of an uncompressed point encoding.
    pub fn from_uncompressed_len(len: usize) -> Option<Self> {
        match len {
            0x41 => Some(Curve::BrainpoolP256r1),
            0x61 => Some(Curve::BrainpoolP384r1),
            0x81 => Some(Curve::BrainpoolP512r1),
            _ => None,
        }
    }

    /// Curve selected by the length of a compressed point encoding.
    pub fn from_compressed_len(len: usize) -> Option<Self> {
        match len {
            0x21 => Some(Curve::BrainpoolP256r1),
            0x31 => Some(Curve::BrainpoolP384r1),
            0x41 => Some(Curve::BrainpoolP512r1),
            _ => None,
        }
    }

    /// Curve named by a brainpool domain-parameter OID.
    pub fn from_oid(oid_value: &[u8]) -> Option<Self> {
        match oid_value {
            o if o == oid::BRAINPOOL_P256R1 => Some(Curve::BrainpoolP256r1),
            o if o == oid::BRAINPOOL_P384R1 => Some(Curve::BrainpoolP384r1),
            o if o == oid::BRAINPOOL_P512R1 => Some(Curve::BrainpoolP512r1),
            _ => None,
        }
    }

    /// Domain-parameter OID content octets.
    pub fn oid(self) -> &'static [u8] {
        match self {
            Curve::BrainpoolP256r1 => oid::BRAINPOOL_P256R1,
            Curve::BrainpoolP384r1 => oid::BRAINPOOL_P384R1,
            Curve::BrainpoolP512r1 => oid::BRAINPOOL_P512R1,
        }
    }

    fn nid(self) -> Nid {
        match self {
            Curve::BrainpoolP256r1 => Nid::BRAINPOOL_P256R1,
            Curve::BrainpoolP384r1 => Nid::BRAINPOOL_P384R1,
            Curve::BrainpoolP512r1 => Nid::BRAINPOOL_P512R1,
        }
    }

    fn group(self) -> Result<EcGroup> {
        Ok(EcGroup::from_curve_name(self.nid())?)
    }
}

impl std::fmt::Display for Curve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Curve::BrainpoolP256r1 => "brainpoolP256r1",
            Curve::BrainpoolP384r1 => "brainpoolP384r1",
            Curve::BrainpoolP512r1 => "brainpoolP512r1",
        };
        write!(f, "{name}")
    }
}

/// Hash family used for ECDSA over a given curve strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlg {
    /// Digest the input with this hash family.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlg::Sha256 => Sha256::digest(data).to_vec(),
            HashAlg::Sha384 => Sha384::digest(data).to_vec(),
            HashAlg::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// The curve strength this hash family is paired with.
    pub fn matching_curve(self) -> Curve {
        match self {
            HashAlg::Sha256 => Curve::BrainpoolP256r1,
            HashAlg::Sha384 => Curve::BrainpoolP384r1,
            HashAlg::Sha512 => Curve::BrainpoolP512r1,
        }
    }
}

/// An immutable elliptic-curve public key: a point on one of the
/// brainpool curves, stored in uncompressed `04 || X || Y` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EccPublicKey {
    curve: Curve,
    point: Vec<u8>,
}

impl EccPublicKey {
    /// Build from an uncompressed point encoding, validating that the
    /// octets describe a point on the curve.
    pub fn new(curve: Curve, point: Vec<u8>) -> Result<Self> {
        if point.len() != curve.uncompressed_len() || point[0] != 0x04 {
            return Err(Error::InvalidPublicKey(format!(
                "expected uncompressed point of {} octets for {curve}, got {} octets",
                curve.uncompressed_len(),
                point.len()
            )));
        }
        let key = Self { curve, point };
        // Decoding through OpenSSL rejects coordinates off the curve.
        key.to_ec_key()?;
        Ok(key)
    }

    /// Parse an ISO/IEC 7816 public-key template (`7f49` containing an
    /// OID and the public-point octet string), as stored in trust-anchor
    /// `*_ELC-PublicKey.der` files.
    pub fn from_tlv(tlv: &Tlv) -> Result<Self> {
        if tlv.tag() != TAG_PUBLIC_KEY_TEMPLATE {
            return Err(Error::InvalidPublicKey(format!(
                "expected tag 7f49, got {:x}",
                tlv.tag()
            )));
        }
        let point_do = tlv.find(TAG_PUBLIC_POINT)?.ok_or_else(|| {
            Error::InvalidPublicKey("public-key template lacks a point octet string".into())
        })?;
        let point = point_do.value().to_vec();
        if point.first() != Some(&0x04) {
            return Err(Error::InvalidPublicKey(
                "stored public key uses a non-uncompressed point".into(),
            ));
        }
        let curve = Curve::from_uncompressed_len(point.len()).ok_or_else(|| {
            Error::InvalidPublicKey(format!("no brainpool curve with point length {}", point.len()))
        })?;

        // When the template names domain parameters, they must agree
        // with the curve implied by the point length.
        if let Some(oid_do) = tlv.find(TAG_OID)? {
            if let Some(named) = Curve::from_oid(oid_do.value()) {
                if named != curve {
                    return Err(Error::InvalidPublicKey(format!(
                        "domain parameters {named} disagree with point length {}",
                        point.len()
                    )));
                }
            }
        }

        Self::new(curve, point)
    }

    /// Extract the public key of an OpenSSL EC key pair.
    pub fn from_ec_key<T: openssl::pkey::HasPublic>(curve: Curve, key: &EcKey<T>) -> Result<Self> {
        let group = curve.group()?;
        let mut ctx = BigNumContext::new()?;
        let point = key
            .public_key()
            .to_bytes(&group, PointConversionForm::UNCOMPRESSED, &mut ctx)?;
        Self::new(curve, point)
    }

    /// The curve this key lives on.
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// The uncompressed point encoding `04 || X || Y`.
    pub fn point(&self) -> &[u8] {
        &self.point
    }

    /// The X coordinate.
    pub fn x(&self) -> &[u8] {
        &self.point[1..1 + self.curve.field_len()]
    }

    /// The Y coordinate.
    pub fn y(&self) -> &[u8] {
        &self.point[1 + self.curve.field_len()..]
    }

    /// Emit the `7f49` template with domain-parameter OID and point.
    pub fn to_tlv_der(&self) -> Vec<u8> {
        let mut value = Tlv::new(TAG_OID, self.curve.oid().to_vec()).to_der();
        value.extend(Tlv::new(TAG_PUBLIC_POINT, self.point.clone()).to_der());
        Tlv::new(TAG_PUBLIC_KEY_TEMPLATE, value).to_der()
    }

    /// Convert to an OpenSSL public key for verification.
    pub fn to_ec_key(&self) -> Result<EcKey<Public>> {
        let group = self.curve.group()?;
        let mut ctx = BigNumContext::new()?;
        let point = EcPoint::from_bytes(&group, &self.point, &mut ctx)?;
        let key = EcKey::from_public_key(&group, &point)?;
        key.check_key()?;
        Ok(key)
    }
}

/// Verify a raw `R || S` ECDSA signature over `message`. The signature
/// is split into two equal halves; a signature that cannot be split
/// verifies as false rather than erroring, since the outcome for the
/// caller is the same: not a valid signature by this key.
pub fn ecdsa_verify(
    key: &EccPublicKey,
    hash: HashAlg,
    message: &[u8],
    signature: &[u8],
) -> Result<bool> {
    if signature.is_empty() || signature.len() % 2 != 0 {
        return Ok(false);
    }
    let half = signature.len() / 2;
    let r = BigNum::from_slice(&signature[..half])?;
    let s = BigNum::from_slice(&signature[half..])?;
    let sig = EcdsaSig::from_private_components(r, s)?;
    let digest = hash.digest(message);
    Ok(sig.verify(&digest, &key.to_ec_key()?.as_ref())?)
}

fn cbc_cipher(key_len: usize) -> Result<Cipher> {
    match key_len {
        16 => Ok(Cipher::aes_128_cbc()),
        24 => Ok(Cipher::aes_192_cbc()),
        32 => Ok(Cipher::aes_256_cbc()),
        other => Err(Error::InvalidKeyLength(other * 8)),
    }
}

fn ecb_cipher(key_len: usize) -> Result<Cipher> {
    match key_len {
        16 => Ok(Cipher::aes_128_ecb()),
        24 => Ok(Cipher::aes_192_ecb()),
        32 => Ok(Cipher::aes_256_ecb()),
        other => Err(Error::InvalidKeyLength(other * 8)),
    }
}

fn run_crypter(cipher: Cipher, mode: Mode, key: &[u8], iv: Option<&[u8]>, data: &[u8]) -> Result<Vec<u8>> {
    let mut crypter = Crypter::new(cipher, mode, key, iv)?;
    crypter.pad(false);
    let mut out = vec![0u8; data.len() + BLOCK_SIZE];
    let mut written = crypter.update(data, &mut out)?;
    written += crypter.finalize(&mut out[written..])?;
    out.truncate(written);
    Ok(out)
}

/// AES-CBC encryption without padding; `data` must be block-aligned.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    run_crypter(cbc_cipher(key.len())?, Mode::Encrypt, key, Some(iv), data)
}

/// AES-CBC decryption without padding; `data` must be block-aligned.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    run_crypter(cbc_cipher(key.len())?, Mode::Decrypt, key, Some(iv), data)
}

/// Encrypt a single AES block (the session layer derives CBC IVs from
/// the send-sequence counter this way).
pub fn aes_encrypt_block(key: &[u8], block: &[u8; BLOCK_SIZE]) -> Result<[u8; BLOCK_SIZE]> {
    let out = run_crypter(ecb_cipher(key.len())?, Mode::Encrypt, key, None, block)?;
    let mut result = [0u8; BLOCK_SIZE];
    result.copy_from_slice(&out[..BLOCK_SIZE]);
    Ok(result)
}

/// AES-CMAC (NIST SP 800-38B) over `data`, full-width output.
pub fn aes_cmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let pkey = PKey::cmac(&cbc_cipher(key.len())?, key)?;
    let mut signer = Signer::new_without_digest(&pkey)?;
    Ok(signer.sign_oneshot_to_vec(data)?)
}

/// Constant-time equality; differing lengths compare unequal.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && openssl::memcmp::eq(a, b)
}
