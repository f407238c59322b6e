// cvc-trustcenter/src/ber.rs
//
// Minimal BER-TLV object for the card-verifiable certificate layer.
// Supports what ISO/IEC 7816 inter-industry templates need: one- and
// two-octet tags, definite lengths in short or long form, children
// enumeration on constructed objects, and DER emission. The object
// retains its exact source octets, so re-encoding an accepted input
// is the identity.

use crate::error::{Error, Result};

/// A single BER-TLV data object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tlv {
    tag: u32,
    value: Vec<u8>,
    raw: Vec<u8>,
}

impl Tlv {
    /// Build a data object from tag and value, emitting DER length form.
    pub fn new(tag: u32, value: Vec<u8>) -> Self {
        let mut raw = encode_tag(tag);
        raw.extend_from_slice(&encode_length(value.len()));
        raw.extend_from_slice(&value);
        Self { tag, value, raw }
    }

    /// Parse exactly one data object covering the whole input.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (tlv, consumed) = Self::parse_prefix(bytes)?;
        if consumed != bytes.len() {
            return Err(Error::InvalidTlv(format!(
                "{} trailing octets after data object",
                bytes.len() - consumed
            )));
        }
        Ok(tlv)
    }

    /// Parse a concatenation of data objects.
    pub fn parse_all(bytes: &[u8]) -> Result<Vec<Self>> {
        let mut objects = Vec::new();
        let mut rest = bytes;
        while !rest.is_empty() {
            let (tlv, consumed) = Self::parse_prefix(rest)?;
            rest = &rest[consumed..];
            objects.push(tlv);
        }
        Ok(objects)
    }

    /// Parse one data object from the front of the input, returning it
    /// together with the number of octets consumed.
    fn parse_prefix(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.is_empty() {
            return Err(Error::InvalidTlv("empty input".into()));
        }

        // Tag: one octet, or two when the low five bits are all set.
        let mut pos = 0;
        let first = bytes[pos];
        pos += 1;
        let tag = if first & 0x1f == 0x1f {
            let second = *bytes
                .get(pos)
                .ok_or_else(|| Error::InvalidTlv("truncated tag".into()))?;
            if second & 0x80 != 0 {
                return Err(Error::InvalidTlv(format!(
                    "tag longer than two octets at {first:02x}{second:02x}"
                )));
            }
            pos += 1;
            (u32::from(first) << 8) | u32::from(second)
        } else {
            u32::from(first)
        };

        // Length: short form, or long form with one or two length octets.
        let len_byte = *bytes
            .get(pos)
            .ok_or_else(|| Error::InvalidTlv("truncated length".into()))?;
        pos += 1;
        let length = match len_byte {
            0x00..=0x7f => usize::from(len_byte),
            0x81 => {
                let b = *bytes
                    .get(pos)
                    .ok_or_else(|| Error::InvalidTlv("truncated length".into()))?;
                pos += 1;
                usize::from(b)
            }
            0x82 => {
                let hi = *bytes
                    .get(pos)
                    .ok_or_else(|| Error::InvalidTlv("truncated length".into()))?;
                let lo = *bytes
                    .get(pos + 1)
                    .ok_or_else(|| Error::InvalidTlv("truncated length".into()))?;
                pos += 2;
                (usize::from(hi) << 8) | usize::from(lo)
            }
            0x80 => {
                return Err(Error::InvalidTlv("indefinite length not supported".into()));
            }
            other => {
                return Err(Error::InvalidTlv(format!(
                    "unsupported length form {other:02x}"
                )));
            }
        };

        let end = pos
            .checked_add(length)
            .ok_or_else(|| Error::InvalidTlv("length overflow".into()))?;
        if end > bytes.len() {
            return Err(Error::InvalidTlv(format!(
                "value truncated: need {length} octets, have {}",
                bytes.len() - pos
            )));
        }

        let value = bytes[pos..end].to_vec();
        let raw = bytes[..end].to_vec();
        Ok((Self { tag, value, raw }, end))
    }

    /// The numeric tag (`0x7f21` for a two-octet tag `7f 21`).
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// The value field.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The exact source (or constructed) octets: tag, length, value.
    pub fn to_der(&self) -> Vec<u8> {
        self.raw.clone()
    }

    /// DER octets as a slice, without cloning.
    pub fn der(&self) -> &[u8] {
        &self.raw
    }

    /// Whether the tag marks a constructed object.
    pub fn is_constructed(&self) -> bool {
        let first = if self.tag > 0xff {
            (self.tag >> 8) as u8
        } else {
            self.tag as u8
        };
        first & 0x20 != 0
    }

    /// Children of a constructed object.
    pub fn children(&self) -> Result<Vec<Tlv>> {
        Self::parse_all(&self.value)
    }

    /// First child with the given tag, if any.
    pub fn find(&self, tag: u32) -> Result<Option<Tlv>> {
        Ok(self.children()?.into_iter().find(|c| c.tag == tag))
    }
}

fn encode_tag(tag: u32) -> Vec<u8> {
    if tag > 0xff {
        vec![(tag >> 8) as u8, tag as u8]
    } else {
        vec![tag as u8]
    }
}

fn encode_length(len: usize) -> Vec<u8> {
    match len {
        0..=0x7f => vec![len as u8],
        0x80..=0xff => vec![0x81, len as u8],
        _ => vec![0x82, (len >> 8) as u8, len as u8],
    }
}
