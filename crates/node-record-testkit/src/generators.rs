//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use node_record_core::{
    keys, IdentityScheme, PrivateKey, SchemeRegistry, SignedRecord, UnsignedRecord, V4Scheme,
};

const RESERVED: &[&[u8]] = &[
    keys::ID,
    keys::SECP256K1,
    keys::ED25519,
    keys::IP,
    keys::UDP,
    keys::TCP,
    keys::IP6,
    keys::UDP6,
    keys::TCP6,
];

/// Generate a valid secp256k1 private key.
pub fn private_key() -> impl Strategy<Value = PrivateKey> {
    any::<[u8; 32]>()
        .prop_map(PrivateKey::from_bytes)
        .prop_filter("valid secp256k1 scalar", |key| {
            V4Scheme.public_key(key).is_ok()
        })
}

/// Generate a key that is not one of the reserved record keys.
pub fn key() -> impl Strategy<Value = Bytes> {
    "[a-z][a-z0-9]{0,5}"
        .prop_filter("reserved key", |k| !RESERVED.iter().any(|r| *r == k.as_bytes()))
        .prop_map(Bytes::from)
}

/// Generate a short value.
pub fn value() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..=8).prop_map(Bytes::from)
}

/// Generate up to `max` non-reserved pairs. Keys may repeat.
pub fn pairs(max: usize) -> impl Strategy<Value = Vec<(Bytes, Bytes)>> {
    prop::collection::vec((key(), value()), 0..=max)
}

/// Generate a valid sequence number (1-indexed).
pub fn seq() -> impl Strategy<Value = u64> {
    1u64..=u64::MAX
}

/// Parameters for generating a v4 record.
#[derive(Debug, Clone)]
pub struct RecordParams {
    pub private_key: PrivateKey,
    pub seq: u64,
    pub pairs: Vec<(Bytes, Bytes)>,
}

impl Arbitrary for RecordParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        // Short pairs keep merged records under the size limit.
        (private_key(), seq(), pairs(6))
            .prop_map(|(private_key, seq, pairs)| RecordParams {
                private_key,
                seq,
                pairs,
            })
            .boxed()
    }
}

/// The unsigned v4 record described by `params`.
pub fn unsigned_from_params(params: &RecordParams) -> UnsignedRecord {
    let public_key = V4Scheme
        .public_key(&params.private_key)
        .expect("generated key is valid");
    UnsignedRecord::new(params.seq, params.pairs.iter().cloned())
        .with_pair(keys::ID, V4Scheme::NAME)
        .with_pair(keys::SECP256K1, public_key)
}

/// Sign the record described by `params`.
pub fn record_from_params(params: &RecordParams) -> SignedRecord {
    unsigned_from_params(params)
        .sign(&SchemeRegistry::default(), &params.private_key)
        .expect("generated record signs")
}
