//! Secure messaging session context.
//!
//! The symmetric state machine an APDU pipeline drives after the
//! general-authenticate key agreement: two AES session keys and a
//! 128-bit send-sequence counter derived from the shared secret,
//! ISO/IEC 7816-4 padding, AES-CMAC checksums truncated to eight
//! octets, and AES-CBC encipherment with the IV derived by encrypting
//! the counter.
//!
//! The context fails closed: the first MAC mismatch, bad padding or
//! malformed cryptogram kills the session, and every later operation
//! reports *session-closed*. A dead session is never revived.
//!
//! Counter discipline: `encipher` increments the counter before
//! deriving the IV, so the checksum of the secured command that
//! follows is computed over the same counter value without a second
//! increment. `verify_cryptographic_checksum` always increments;
//! `decipher` never does.

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::crypto::{
    aes_cbc_decrypt, aes_cbc_encrypt, aes_cmac, aes_encrypt_block, ct_eq, BLOCK_SIZE,
};
use crate::error::{Error, Result};

/// Truncated MAC length in octets.
pub const MAC_LEN: usize = 8;

/// Leading octet of a cryptogram: plaintext was ISO padded.
const PADDING_CONTENT_INDICATOR: u8 = 0x01;

/// A live secure messaging session.
pub struct SessionContext {
    kenc: Vec<u8>,
    kmac: Vec<u8>,
    ssc_mac: [u8; BLOCK_SIZE],
    alive: bool,
}

impl SessionContext {
    /// Derive a session from key-derivation material and the AES key
    /// length in bits.
    ///
    /// 128-bit keys use `SHA-1(KD || counter)`, longer keys use
    /// `SHA-256(KD || counter)`, truncated to the key length; the
    /// counter is `00000001` for the encryption key and `00000002`
    /// for the MAC key. The send-sequence counter starts at zero.
    pub fn new(derivation_material: &[u8], key_bits: usize) -> Result<Self> {
        let (kenc, kmac) = match key_bits {
            128 => (
                derive_sha1(derivation_material, 1),
                derive_sha1(derivation_material, 2),
            ),
            192 | 256 => (
                derive_sha256(derivation_material, 1, key_bits / 8),
                derive_sha256(derivation_material, 2, key_bits / 8),
            ),
            other => return Err(Error::InvalidKeyLength(other)),
        };
        Ok(Self {
            kenc,
            kmac,
            ssc_mac: [0; BLOCK_SIZE],
            alive: true,
        })
    }

    /// Whether the session still accepts operations.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// The encryption session key.
    pub fn enc_key(&self) -> &[u8] {
        &self.kenc
    }

    /// The MAC session key.
    pub fn mac_key(&self) -> &[u8] {
        &self.kmac
    }

    /// The current send-sequence counter.
    pub fn ssc_mac(&self) -> &[u8; BLOCK_SIZE] {
        &self.ssc_mac
    }

    /// AES-CMAC over `SSC || pad(message)`, truncated to eight octets.
    /// The counter is incremented first when `increment_ssc` is set;
    /// a checksum covering a cryptogram produced by [`Self::encipher`]
    /// reuses the counter value the cryptogram already consumed.
    pub fn compute_cryptographic_checksum(
        &mut self,
        message: &[u8],
        increment_ssc: bool,
    ) -> Result<Vec<u8>> {
        self.ensure_alive()?;
        if increment_ssc {
            self.increment_ssc();
        }
        let mac = aes_cmac(&self.kmac, &self.mac_input(message))?;
        Ok(mac[..MAC_LEN].to_vec())
    }

    /// Increment the counter, recompute the checksum over `data` and
    /// compare in constant time. A mismatch closes the session and
    /// returns false; it is an answer, not an error.
    pub fn verify_cryptographic_checksum(&mut self, data: &[u8], mac: &[u8]) -> Result<bool> {
        self.ensure_alive()?;
        self.increment_ssc();
        let computed = aes_cmac(&self.kmac, &self.mac_input(data))?;
        let matches = ct_eq(&computed[..MAC_LEN], mac);
        if !matches {
            self.alive = false;
        }
        Ok(matches)
    }

    /// Increment the counter, derive `IV = AES-ENC(Kenc, SSC)`, pad
    /// and CBC-encrypt the message. The cryptogram is prefixed with
    /// the padding-content indicator octet.
    pub fn encipher(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        self.ensure_alive()?;
        self.increment_ssc();
        let iv = aes_encrypt_block(&self.kenc, &self.ssc_mac)?;
        let cipher = aes_cbc_encrypt(&self.kenc, &iv, &pad(message))?;

        let mut out = Vec::with_capacity(1 + cipher.len());
        out.push(PADDING_CONTENT_INDICATOR);
        out.extend(cipher);
        Ok(out)
    }

    /// Invert [`Self::encipher`] with the current counter value: the
    /// checksum verification of the surrounding response has already
    /// incremented it. A missing indicator octet or a ragged
    /// cryptogram closes the session with *decipher-error*; missing
    /// ISO padding in the plaintext closes it with *padding-error*.
    pub fn decipher(&mut self, cryptogram: &[u8]) -> Result<Vec<u8>> {
        self.ensure_alive()?;
        if cryptogram.first() != Some(&PADDING_CONTENT_INDICATOR) {
            self.alive = false;
            return Err(Error::DecipherError);
        }
        let cipher = &cryptogram[1..];
        if cipher.is_empty() || cipher.len() % BLOCK_SIZE != 0 {
            self.alive = false;
            return Err(Error::DecipherError);
        }

        let iv = aes_encrypt_block(&self.kenc, &self.ssc_mac)?;
        let padded = aes_cbc_decrypt(&self.kenc, &iv, cipher)?;
        match unpad(&padded) {
            Some(message) => Ok(message.to_vec()),
            None => {
                self.alive = false;
                Err(Error::PaddingError)
            }
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.alive {
            Ok(())
        } else {
            Err(Error::SessionClosed)
        }
    }

    /// Big-endian 128-bit increment.
    fn increment_ssc(&mut self) {
        for octet in self.ssc_mac.iter_mut().rev() {
            let (incremented, carry) = octet.overflowing_add(1);
            *octet = incremented;
            if !carry {
                break;
            }
        }
    }

    fn mac_input(&self, message: &[u8]) -> Vec<u8> {
        let mut input = self.ssc_mac.to_vec();
        input.extend(pad(message));
        input
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // keys stay out of debug output
        f.debug_struct("SessionContext")
            .field("key_bits", &(self.kenc.len() * 8))
            .field("ssc_mac", &hex::encode(self.ssc_mac))
            .field("alive", &self.alive)
            .finish()
    }
}

fn derive_sha1(material: &[u8], counter: u32) -> Vec<u8> {
    let mut hasher = Sha1::new();
    hasher.update(material);
    hasher.update(counter.to_be_bytes());
    hasher.finalize()[..16].to_vec()
}

fn derive_sha256(material: &[u8], counter: u32, key_len: usize) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(material);
    hasher.update(counter.to_be_bytes());
    hasher.finalize()[..key_len].to_vec()
}

/// ISO/IEC 7816-4 padding: append `80`, zero-fill to the block size.
fn pad(message: &[u8]) -> Vec<u8> {
    let mut out = message.to_vec();
    out.push(0x80);
    while out.len() % BLOCK_SIZE != 0 {
        out.push(0x00);
    }
    out
}

/// Strip ISO padding: drop trailing zeros up to and including the
/// rightmost `80`. None when no `80` delimiter exists.
fn unpad(padded: &[u8]) -> Option<&[u8]> {
    let mut end = padded.len();
    while end > 0 && padded[end - 1] == 0x00 {
        end -= 1;
    }
    if end == 0 || padded[end - 1] != 0x80 {
        return None;
    }
    Some(&padded[..end - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_128() -> SessionContext {
        SessionContext::new(&[0u8; 32], 128).unwrap()
    }

    #[test]
    fn test_key_derivation_128() {
        let ctx = fresh_128();
        assert_eq!(hex::encode(ctx.enc_key()), "e30a76daec16b27664f6a8460f1647e2");
        assert_eq!(hex::encode(ctx.mac_key()), "3ad00393e1013305aa8d1c3b7ece3864");
        assert_eq!(ctx.ssc_mac(), &[0u8; 16]);
        assert!(ctx.is_alive());
    }

    #[test]
    fn test_key_derivation_192_and_256() {
        let ctx = SessionContext::new(&[0u8; 32], 192).unwrap();
        assert_eq!(
            hex::encode(ctx.enc_key()),
            "2158a8906d5e2c2be001bac943ab9cab4063536e1c546b40"
        );
        assert_eq!(
            hex::encode(ctx.mac_key()),
            "e15f374423633701e04fe17c1d640b34f2e27b8f6aec00e2"
        );

        let ctx = SessionContext::new(&[0u8; 32], 256).unwrap();
        assert_eq!(
            hex::encode(ctx.enc_key()),
            "2158a8906d5e2c2be001bac943ab9cab4063536e1c546b40221fdf8db031a4bb"
        );
        assert_eq!(ctx.enc_key().len(), 32);
    }

    #[test]
    fn test_rejects_unknown_key_length() {
        assert!(matches!(
            SessionContext::new(&[0u8; 32], 160),
            Err(Error::InvalidKeyLength(160))
        ));
    }

    #[test]
    fn test_encipher_first_message_vector() {
        let mut ctx = fresh_128();
        let cryptogram = ctx.encipher(&[0x00]).unwrap();
        // counter was incremented before the IV derivation
        assert_eq!(ctx.ssc_mac()[15], 1);
        assert_eq!(
            hex::encode(&cryptogram),
            "016dd9cd5a36594091d891795e56fc6676"
        );
    }

    #[test]
    fn test_checksum_vector() {
        let mut ctx = fresh_128();
        let mac = ctx.compute_cryptographic_checksum(&[0x00], true).unwrap();
        assert_eq!(hex::encode(&mac), "b77c4c7cce1d5d47");
        assert_eq!(ctx.ssc_mac()[15], 1);
    }

    #[test]
    fn test_checksum_without_increment_keeps_counter() {
        let mut ctx = fresh_128();
        let first = ctx.compute_cryptographic_checksum(&[0x00], false).unwrap();
        let second = ctx.compute_cryptographic_checksum(&[0x00], false).unwrap();
        assert_eq!(first, second);
        assert_eq!(ctx.ssc_mac(), &[0u8; 16]);
    }

    #[test]
    fn test_checksum_roundtrip_with_peer() {
        let mut sender = fresh_128();
        let mut receiver = fresh_128();

        let message = b"secured command header and data";
        let mac = sender
            .compute_cryptographic_checksum(message, true)
            .unwrap();
        assert!(receiver
            .verify_cryptographic_checksum(message, &mac)
            .unwrap());
        assert_eq!(sender.ssc_mac(), receiver.ssc_mac());
    }

    #[test]
    fn test_diverged_counters_fail_verification() {
        let mut sender = fresh_128();
        let mut receiver = fresh_128();

        // sender runs one extra increment the receiver never saw
        sender.compute_cryptographic_checksum(b"lost", true).unwrap();
        let mac = sender.compute_cryptographic_checksum(b"m", true).unwrap();
        assert!(!receiver.verify_cryptographic_checksum(b"m", &mac).unwrap());
        assert!(!receiver.is_alive());
    }

    #[test]
    fn test_encipher_decipher_inverse() {
        for len in [0usize, 1, 15, 16, 17, 31, 64] {
            let mut ctx = fresh_128();
            let message: Vec<u8> = (0..len as u8).collect();
            let cryptogram = ctx.encipher(&message).unwrap();
            // same counter on both operations: decipher does not
            // increment, encipher already did
            assert_eq!(ctx.decipher(&cryptogram).unwrap(), message);
        }
    }

    #[test]
    fn test_random_material_roundtrip() {
        use rand::RngCore;
        let mut material = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut material);
        for bits in [128, 192, 256] {
            let mut ctx = SessionContext::new(&material, bits).unwrap();
            let mut message = vec![0u8; 100];
            rand::thread_rng().fill_bytes(&mut message);
            let cryptogram = ctx.encipher(&message).unwrap();
            assert_eq!(ctx.decipher(&cryptogram).unwrap(), message);
        }
    }

    #[test]
    fn test_secured_response_flow_across_contexts() {
        // card side: encipher, then MAC the cryptogram over the same
        // counter value
        let mut card = fresh_128();
        let plain = b"response data";
        let cryptogram = card.encipher(plain).unwrap();
        let mac = card
            .compute_cryptographic_checksum(&cryptogram, false)
            .unwrap();

        // terminal side: verify (incrementing), then decipher with the
        // counter it just advanced
        let mut terminal = fresh_128();
        assert!(terminal
            .verify_cryptographic_checksum(&cryptogram, &mac)
            .unwrap());
        assert_eq!(terminal.decipher(&cryptogram).unwrap(), plain);
    }

    #[test]
    fn test_mac_mismatch_closes_the_session() {
        let mut ctx = fresh_128();
        assert!(!ctx
            .verify_cryptographic_checksum(&[0x01], &[0x02, 0x03])
            .unwrap());
        assert!(!ctx.is_alive());

        assert!(matches!(ctx.encipher(&[0x00]), Err(Error::SessionClosed)));
        assert!(matches!(
            ctx.compute_cryptographic_checksum(&[0x00], true),
            Err(Error::SessionClosed)
        ));
        assert!(matches!(
            ctx.verify_cryptographic_checksum(&[0x00], &[0x00; 8]),
            Err(Error::SessionClosed)
        ));
        assert!(matches!(ctx.decipher(&[0x01]), Err(Error::SessionClosed)));
    }

    #[test]
    fn test_bad_indicator_closes_the_session() {
        let mut ctx = fresh_128();
        assert!(matches!(
            ctx.decipher(&[0x02, 0xaa, 0xbb]),
            Err(Error::DecipherError)
        ));
        assert!(!ctx.is_alive());
        assert!(matches!(ctx.encipher(&[0x00]), Err(Error::SessionClosed)));
    }

    #[test]
    fn test_ragged_cryptogram_closes_the_session() {
        let mut ctx = fresh_128();
        assert!(matches!(
            ctx.decipher(&[0x01, 0xaa, 0xbb]),
            Err(Error::DecipherError)
        ));
        assert!(!ctx.is_alive());
    }

    #[test]
    fn test_missing_padding_closes_the_session() {
        let mut ctx = fresh_128();
        // build a cryptogram whose plaintext is all zeros: no 80
        // delimiter survives the unpadding scan
        let iv = aes_encrypt_block(ctx.enc_key(), ctx.ssc_mac()).unwrap();
        let key = ctx.enc_key().to_vec();
        let cipher = aes_cbc_encrypt(&key, &iv, &[0u8; 16]).unwrap();
        let mut cryptogram = vec![PADDING_CONTENT_INDICATOR];
        cryptogram.extend(cipher);

        assert!(matches!(ctx.decipher(&cryptogram), Err(Error::PaddingError)));
        assert!(!ctx.is_alive());
        assert!(matches!(ctx.encipher(&[0x00]), Err(Error::SessionClosed)));
    }

    #[test]
    fn test_counter_increment_carries() {
        let mut ctx = fresh_128();
        ctx.ssc_mac = [0xff; 16];
        ctx.increment_ssc();
        assert_eq!(ctx.ssc_mac(), &[0u8; 16]);

        let mut ctx = fresh_128();
        ctx.ssc_mac[15] = 0xff;
        ctx.increment_ssc();
        assert_eq!(ctx.ssc_mac()[14], 1);
        assert_eq!(ctx.ssc_mac()[15], 0);
    }

    #[test]
    fn test_pad_unpad() {
        assert_eq!(pad(&[]).len(), 16);
        assert_eq!(pad(&[0u8; 15]).len(), 16);
        assert_eq!(pad(&[0u8; 16]).len(), 32);
        assert_eq!(pad(&[0xab]), {
            let mut expected = vec![0xab, 0x80];
            expected.extend(vec![0u8; 14]);
            expected
        });

        assert_eq!(unpad(&pad(&[0xab])), Some(&[0xab][..]));
        assert_eq!(unpad(&pad(&[])), Some(&[][..]));
        assert_eq!(unpad(&[0u8; 16]), None);
        assert_eq!(unpad(&[]), None);
        // trailing 80 octets inside the message survive
        let message = [0x01, 0x80];
        assert_eq!(unpad(&pad(&message)), Some(&message[..]));
    }
}
