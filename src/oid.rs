// cvc-trustcenter/src/oid.rs
//
// The closed set of object identifiers the CVC profile works with,
// as DER content octets. The certificate layer never consults a
// general OID registry; everything it accepts is listed here.

/// ecdsa-with-SHA256 (1.2.840.10045.4.3.2), for CA signature keys.
pub const ECDSA_WITH_SHA256: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x03, 0x02];

/// ecdsa-with-SHA384 (1.2.840.10045.4.3.3), for CA signature keys.
pub const ECDSA_WITH_SHA384: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x03, 0x03];

/// ecdsa-with-SHA512 (1.2.840.10045.4.3.4), for CA signature keys.
pub const ECDSA_WITH_SHA512: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x03, 0x04];

/// authS_gemSpec-COS_ecc-with-sha256 (1.2.276.0.76.4.145),
/// end-entity authentication keys.
pub const AUTS_COS_ECC_WITH_SHA256: &[u8] =
    &[0x2a, 0x82, 0x14, 0x00, 0x4c, 0x04, 0x81, 0x11];

/// authS_gemSpec-COS_ecc-with-sha384 (1.2.276.0.76.4.146).
pub const AUTS_COS_ECC_WITH_SHA384: &[u8] =
    &[0x2a, 0x82, 0x14, 0x00, 0x4c, 0x04, 0x81, 0x12];

/// authS_gemSpec-COS_ecc-with-sha512 (1.2.276.0.76.4.147).
pub const AUTS_COS_ECC_WITH_SHA512: &[u8] =
    &[0x2a, 0x82, 0x14, 0x00, 0x4c, 0x04, 0x81, 0x13];

/// CVC_FlagList_TI (1.2.276.0.76.4.152), flag-list interpretation for
/// the telematics infrastructure.
pub const CVC_FLAGLIST_TI: &[u8] = &[0x2a, 0x82, 0x14, 0x00, 0x4c, 0x04, 0x81, 0x18];

/// CVC_FlagList_CMS (1.2.276.0.76.4.153), flag-list interpretation for
/// the card management system.
pub const CVC_FLAGLIST_CMS: &[u8] = &[0x2a, 0x82, 0x14, 0x00, 0x4c, 0x04, 0x81, 0x19];

/// brainpoolP256r1 (1.3.36.3.3.2.8.1.1.7).
pub const BRAINPOOL_P256R1: &[u8] = &[0x2b, 0x24, 0x03, 0x03, 0x02, 0x08, 0x01, 0x01, 0x07];

/// brainpoolP384r1 (1.3.36.3.3.2.8.1.1.11).
pub const BRAINPOOL_P384R1: &[u8] = &[0x2b, 0x24, 0x03, 0x03, 0x02, 0x08, 0x01, 0x01, 0x0b];

/// brainpoolP512r1 (1.3.36.3.3.2.8.1.1.13).
pub const BRAINPOOL_P512R1: &[u8] = &[0x2b, 0x24, 0x03, 0x03, 0x02, 0x08, 0x01, 0x01, 0x0d];

/// Human-readable name for a known OID, for report rendering.
pub fn name(oid: &[u8]) -> Option<&'static str> {
    match oid {
        ECDSA_WITH_SHA256 => Some("ecdsa-with-SHA256"),
        ECDSA_WITH_SHA384 => Some("ecdsa-with-SHA384"),
        ECDSA_WITH_SHA512 => Some("ecdsa-with-SHA512"),
        AUTS_COS_ECC_WITH_SHA256 => Some("authS_gemSpec-COS_ecc-with-sha256"),
        AUTS_COS_ECC_WITH_SHA384 => Some("authS_gemSpec-COS_ecc-with-sha384"),
        AUTS_COS_ECC_WITH_SHA512 => Some("authS_gemSpec-COS_ecc-with-sha512"),
        CVC_FLAGLIST_TI => Some("CVC_FlagList_TI"),
        CVC_FLAGLIST_CMS => Some("CVC_FlagList_CMS"),
        BRAINPOOL_P256R1 => Some("brainpoolP256r1"),
        BRAINPOOL_P384R1 => Some("brainpoolP384r1"),
        BRAINPOOL_P512R1 => Some("brainpoolP512r1"),
        _ => None,
    }
}
