//! Golden test vectors for deterministic verification.
//!
//! The v4 vector is the example record from EIP-778. Any v4 implementation
//! must reproduce its public key, node id, signature, and encoding exactly.

use node_record_core::{keys, PrivateKey, UnsignedRecord};

/// A golden v4 record with its expected outputs, all hex encoded.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub private_key: &'static str,
    pub seq: u64,
    pub ip: [u8; 4],
    pub udp: u16,
    /// Compressed secp256k1 public key.
    pub expected_public_key: &'static str,
    pub expected_node_id: &'static str,
    pub expected_signature: &'static str,
    /// The full RLP-encoded signed record.
    pub expected_record: &'static str,
}

impl GoldenVector {
    pub fn private_key(&self) -> PrivateKey {
        PrivateKey::from_hex(self.private_key).expect("golden private key is valid hex")
    }

    /// The unsigned record: `id`, `secp256k1`, `ip` and `udp`.
    pub fn unsigned(&self) -> UnsignedRecord {
        let public_key = hex::decode(self.expected_public_key).expect("golden public key is valid hex");
        UnsignedRecord::new(
            self.seq,
            [
                (keys::ID, b"v4".to_vec()),
                (keys::SECP256K1, public_key),
                (keys::IP, self.ip.to_vec()),
                (keys::UDP, keys::encode_port(self.udp)),
            ],
        )
    }
}

/// The EIP-778 example record.
pub const EIP778: GoldenVector = GoldenVector {
    name: "EIP-778 example record",
    private_key: "b71c71a67e1177ad4e901695e1b4b9ee17ae16c6668d313eac2f96dbcda3f291",
    seq: 1,
    ip: [127, 0, 0, 1],
    udp: 30303,
    expected_public_key: "03ca634cae0d49acb401d8a4c6b6fe8c55b70d115bf400769cc1400f3258cd3138",
    expected_node_id: "a448f24c6d18e575453db13171562b71999873db5b286df957af199ec94617f7",
    expected_signature: "7098ad865b00a582051940cb9cf36836572411a47278783077011599ed5cd16b76f2635f4e234738f30813a89eb9137e3e3df5266e3a1f11df72ecf1145ccb9c",
    expected_record: "f884b8407098ad865b00a582051940cb9cf36836572411a47278783077011599ed5cd16b76f2635f4e234738f30813a89eb9137e3e3df5266e3a1f11df72ecf1145ccb9c01826964827634826970847f00000189736563703235366b31a103ca634cae0d49acb401d8a4c6b6fe8c55b70d115bf400769cc1400f3258cd31388375647082765f",
};

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![EIP778]
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_record_core::{IdentityScheme, NodeId, SchemeRegistry, SignedRecord, V4Scheme};

    #[test]
    fn test_public_key() {
        for vector in all_vectors() {
            let public_key = V4Scheme.public_key(&vector.private_key()).unwrap();
            assert_eq!(hex::encode(public_key), vector.expected_public_key, "{}", vector.name);
        }
    }

    #[test]
    fn test_node_id() {
        for vector in all_vectors() {
            let public_key = hex::decode(vector.expected_public_key).unwrap();
            let node_id = V4Scheme.node_id(&public_key).unwrap();
            assert_eq!(node_id.to_hex(), vector.expected_node_id, "{}", vector.name);
        }
    }

    #[test]
    fn test_signed_record_matches() {
        for vector in all_vectors() {
            let record = vector
                .unsigned()
                .sign(&SchemeRegistry::default(), &vector.private_key())
                .unwrap();

            assert_eq!(hex::encode(record.signature()), vector.expected_signature, "{}", vector.name);
            assert_eq!(hex::encode(record.to_bytes()), vector.expected_record, "{}", vector.name);
            assert_eq!(record.node_id().to_hex(), vector.expected_node_id);
        }
    }

    #[test]
    fn test_decode_golden_record() {
        let bytes = hex::decode(EIP778.expected_record).unwrap();
        let record = SignedRecord::from_bytes(&bytes, &SchemeRegistry::default()).unwrap();

        assert_eq!(record.seq(), 1);
        assert_eq!(record.node_id(), NodeId::from_hex(EIP778.expected_node_id).unwrap());
        assert_eq!(
            record.udp_endpoint(),
            Some("127.0.0.1:30303".parse().unwrap())
        );
        assert_eq!(record.to_bytes(), bytes);
    }

    #[test]
    fn test_tampered_golden_record_rejected() {
        let mut bytes = hex::decode(EIP778.expected_record).unwrap();
        // Last byte is the low byte of the udp port.
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        assert!(SignedRecord::from_bytes(&bytes, &SchemeRegistry::default()).is_err());
    }
}
