//! Reserved record keys.
//!
//! Values under the port keys are big-endian integers with leading zeros
//! stripped. IPv4 addresses are 4 bytes, IPv6 addresses 16 bytes.

/// Name of the identity scheme.
pub const ID: &[u8] = b"id";
/// Compressed secp256k1 public key (`v4` scheme).
pub const SECP256K1: &[u8] = b"secp256k1";
/// Ed25519 public key (`ed25519` scheme).
pub const ED25519: &[u8] = b"ed25519";

pub const IP: &[u8] = b"ip";
pub const UDP: &[u8] = b"udp";
pub const TCP: &[u8] = b"tcp";
pub const IP6: &[u8] = b"ip6";
pub const UDP6: &[u8] = b"udp6";
pub const TCP6: &[u8] = b"tcp6";

/// Encode a port as a minimal big-endian integer.
pub fn encode_port(port: u16) -> Vec<u8> {
    let bytes = port.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

/// Decode a port written by [`encode_port`].
pub fn decode_port(value: &[u8]) -> Option<u16> {
    match value {
        [] => Some(0),
        [b] => Some(u16::from(*b)),
        [0, _] => None,
        [hi, lo] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}
