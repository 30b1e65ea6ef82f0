//! Records: signed, versioned key/value documents describing a node.
//!
//! An [`UnsignedRecord`] is a sequence number plus sorted key/value pairs.
//! Signing it with an identity scheme yields a [`SignedRecord`], whose node id
//! is derived from the public key the record carries. Records are immutable;
//! a change is a new record with a higher sequence number.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

use bytes::Bytes;

use crate::canonical::{self, MAX_RECORD_SIZE};
use crate::crypto::{PrivateKey, SchemeRegistry};
use crate::error::CoreError;
use crate::keys;
use crate::types::NodeId;

/// Record content before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedRecord {
    seq: u64,
    pairs: BTreeMap<Bytes, Bytes>,
}

impl UnsignedRecord {
    /// Create a record at `seq` from key/value pairs.
    ///
    /// Later pairs win when a key appears more than once.
    pub fn new<K, V>(seq: u64, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Bytes>,
        V: Into<Bytes>,
    {
        Self {
            seq,
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Add or replace a single pair.
    pub fn with_pair(mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        self.pairs.insert(key.into(), value.into());
        self
    }

    /// Merge pairs into the record. Supplied pairs override existing keys;
    /// every other key is kept.
    pub fn merge<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Bytes>,
        V: Into<Bytes>,
    {
        self.pairs
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Replace the sequence number, keeping every pair.
    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn pairs(&self) -> &BTreeMap<Bytes, Bytes> {
        &self.pairs
    }

    pub fn get(&self, key: &[u8]) -> Option<&Bytes> {
        self.pairs.get(key)
    }

    /// The canonical content that gets signed.
    pub fn content_bytes(&self) -> Vec<u8> {
        canonical::content_bytes(self.seq, &self.pairs)
    }

    /// Sign the record with the scheme it names under `id`.
    ///
    /// Fails if the scheme is missing or unregistered, if the record's public
    /// key does not belong to `private_key`, or if the signed record would
    /// exceed [`MAX_RECORD_SIZE`].
    pub fn sign(
        self,
        registry: &SchemeRegistry,
        private_key: &PrivateKey,
    ) -> Result<SignedRecord, CoreError> {
        let scheme_name = self.pairs.get(keys::ID).ok_or(CoreError::MissingScheme)?;
        let scheme = registry.get(scheme_name)?;

        let expected = scheme.public_key(private_key)?;
        let public_key = self.pairs.get(scheme.public_key_key()).ok_or_else(|| {
            CoreError::SigningFailure(format!(
                "record has no {} key",
                String::from_utf8_lossy(scheme.public_key_key())
            ))
        })?;
        if public_key.as_ref() != expected.as_slice() {
            return Err(CoreError::SigningFailure(
                "public key does not match private key".into(),
            ));
        }

        let signature = scheme.sign(&self.content_bytes(), private_key)?;
        let node_id = scheme.node_id(public_key)?;

        let record = SignedRecord {
            seq: self.seq,
            pairs: self.pairs,
            signature: Bytes::from(signature),
            node_id,
        };

        let size = record.to_bytes().len();
        if size > MAX_RECORD_SIZE {
            return Err(CoreError::RecordTooLarge {
                size,
                max: MAX_RECORD_SIZE,
            });
        }

        Ok(record)
    }
}

/// A signed record. The node id is derived once, at signing or decoding time.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedRecord {
    seq: u64,
    pairs: BTreeMap<Bytes, Bytes>,
    signature: Bytes,
    node_id: NodeId,
}

impl SignedRecord {
    /// Assemble a record from trusted parts (e.g. a local store row).
    ///
    /// No signature check is made; use [`crate::validate_record`] for
    /// untrusted input.
    pub fn from_parts(node_id: NodeId, parts: canonical::RecordParts) -> Self {
        Self {
            seq: parts.seq,
            pairs: parts.pairs,
            signature: parts.signature,
            node_id,
        }
    }

    /// Decode a record, derive its node id, and verify its signature.
    pub fn from_bytes(bytes: &[u8], registry: &SchemeRegistry) -> Result<Self, CoreError> {
        let parts = canonical::decode_record(bytes)?;
        let scheme_name = parts.pairs.get(keys::ID).ok_or(CoreError::MissingScheme)?;
        let scheme = registry.get(scheme_name)?;
        let public_key = parts
            .pairs
            .get(scheme.public_key_key())
            .ok_or(CoreError::InvalidPublicKey)?;

        let content = canonical::content_bytes(parts.seq, &parts.pairs);
        scheme.verify(&content, &parts.signature, public_key)?;
        let node_id = scheme.node_id(public_key)?;

        Ok(Self::from_parts(node_id, parts))
    }

    /// Encode as `rlp([signature, seq, k1, v1, ...])`.
    pub fn to_bytes(&self) -> Vec<u8> {
        canonical::record_bytes(&self.signature, self.seq, &self.pairs)
    }

    /// The canonical content covered by the signature.
    pub fn content_bytes(&self) -> Vec<u8> {
        canonical::content_bytes(self.seq, &self.pairs)
    }

    /// Strip the signature, keeping seq and pairs.
    pub fn to_unsigned(&self) -> UnsignedRecord {
        UnsignedRecord {
            seq: self.seq,
            pairs: self.pairs.clone(),
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    pub fn get(&self, key: &[u8]) -> Option<&Bytes> {
        self.pairs.get(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.pairs.contains_key(key)
    }

    pub fn pairs(&self) -> &BTreeMap<Bytes, Bytes> {
        &self.pairs
    }

    /// Iterate pairs in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, &Bytes)> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The identity scheme name under `id`, if any.
    pub fn scheme_name(&self) -> Option<&Bytes> {
        self.pairs.get(keys::ID)
    }

    /// The public key stored under the record's scheme key.
    pub fn public_key(&self, registry: &SchemeRegistry) -> Result<Bytes, CoreError> {
        let scheme = registry.get(self.scheme_name().ok_or(CoreError::MissingScheme)?)?;
        self.pairs
            .get(scheme.public_key_key())
            .cloned()
            .ok_or(CoreError::InvalidPublicKey)
    }

    /// Whether any pair is absent from this record or present with a
    /// different value.
    pub fn differs_from<'a>(&self, pairs: impl IntoIterator<Item = (&'a [u8], &'a [u8])>) -> bool {
        pairs
            .into_iter()
            .any(|(key, value)| self.pairs.get(key).map(|v| &v[..]) != Some(value))
    }

    /// The IPv4 UDP endpoint from `ip` and `udp`, if both are present and well formed.
    pub fn udp_endpoint(&self) -> Option<SocketAddr> {
        let ip: [u8; 4] = self.get(keys::IP)?.as_ref().try_into().ok()?;
        let port = keys::decode_port(self.get(keys::UDP)?)?;
        Some(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::from(ip), port)))
    }

    /// The IPv6 UDP endpoint from `ip6` and `udp6`.
    pub fn udp6_endpoint(&self) -> Option<SocketAddr> {
        let ip: [u8; 16] = self.get(keys::IP6)?.as_ref().try_into().ok()?;
        let port = keys::decode_port(self.get(keys::UDP6)?)?;
        Some(SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::from(ip), port, 0, 0)))
    }
}

impl fmt::Debug for SignedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .pairs
            .iter()
            .map(|(k, v)| format!("{}={}", String::from_utf8_lossy(k), hex::encode(v)))
            .collect();
        f.debug_struct("SignedRecord")
            .field("node_id", &self.node_id)
            .field("seq", &self.seq)
            .field("pairs", &pairs)
            .finish()
    }
}
