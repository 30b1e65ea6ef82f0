//! Identity schemes: how a record is signed and how its node id is derived.
//!
//! A record names its scheme under the `id` key. Schemes are looked up by that
//! name in a [`SchemeRegistry`]. Two schemes are provided:
//!
//! - [`V4Scheme`] (`v4`): secp256k1 ECDSA over keccak256 of the content,
//!   compressed public key under `secp256k1`, node id = keccak256 of the
//!   uncompressed public key (without the 0x04 prefix).
//! - [`Ed25519Scheme`] (`ed25519`): Ed25519 over the raw content, public key
//!   under `ed25519`, node id = blake3 of the public key.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

use crate::error::CoreError;
use crate::keys;
use crate::types::NodeId;

/// Raw 32-byte private key material, supplied by the caller.
///
/// The key is interpreted by the identity scheme that signs with it.
#[derive(Clone)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            CoreError::SigningFailure(format!("private key must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// Get the raw key material.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// An identity scheme: a named signing algorithm plus node id derivation.
pub trait IdentityScheme: Send + Sync {
    /// The scheme name stored under the `id` key.
    fn name(&self) -> &'static [u8];

    /// The record key holding this scheme's public key.
    fn public_key_key(&self) -> &'static [u8];

    /// Public key bytes, as stored in the record, for a private key.
    fn public_key(&self, private_key: &PrivateKey) -> Result<Vec<u8>, CoreError>;

    /// Sign canonical record content.
    fn sign(&self, content: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>, CoreError>;

    /// Verify a signature over canonical record content.
    fn verify(&self, content: &[u8], signature: &[u8], public_key: &[u8]) -> Result<(), CoreError>;

    /// Derive the node id from the record's public key bytes.
    fn node_id(&self, public_key: &[u8]) -> Result<NodeId, CoreError>;
}

/// The `v4` identity scheme (secp256k1 + keccak256).
#[derive(Debug, Clone, Copy, Default)]
pub struct V4Scheme;

impl V4Scheme {
    pub const NAME: &'static [u8] = b"v4";

    fn signing_key(private_key: &PrivateKey) -> Result<k256::ecdsa::SigningKey, CoreError> {
        k256::ecdsa::SigningKey::from_slice(private_key.as_bytes())
            .map_err(|_| CoreError::SigningFailure("invalid secp256k1 private key".into()))
    }
}

impl IdentityScheme for V4Scheme {
    fn name(&self) -> &'static [u8] {
        Self::NAME
    }

    fn public_key_key(&self) -> &'static [u8] {
        keys::SECP256K1
    }

    fn public_key(&self, private_key: &PrivateKey) -> Result<Vec<u8>, CoreError> {
        let signing_key = Self::signing_key(private_key)?;
        let public_key = k256::PublicKey::from(signing_key.verifying_key());
        Ok(public_key.to_encoded_point(true).as_bytes().to_vec())
    }

    fn sign(&self, content: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>, CoreError> {
        let signing_key = Self::signing_key(private_key)?;
        let digest = Keccak256::digest(content);
        let signature: k256::ecdsa::Signature = signing_key
            .sign_prehash(&digest)
            .map_err(|e| CoreError::SigningFailure(e.to_string()))?;
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(&self, content: &[u8], signature: &[u8], public_key: &[u8]) -> Result<(), CoreError> {
        let verifying_key = k256::ecdsa::VerifyingKey::from_sec1_bytes(public_key)
            .map_err(|_| CoreError::InvalidPublicKey)?;
        let signature =
            k256::ecdsa::Signature::from_slice(signature).map_err(|_| CoreError::InvalidSignature)?;
        let digest = Keccak256::digest(content);
        verifying_key
            .verify_prehash(&digest, &signature)
            .map_err(|_| CoreError::InvalidSignature)
    }

    fn node_id(&self, public_key: &[u8]) -> Result<NodeId, CoreError> {
        let public_key =
            k256::PublicKey::from_sec1_bytes(public_key).map_err(|_| CoreError::InvalidPublicKey)?;
        let uncompressed = public_key.to_encoded_point(false);
        let hash: [u8; 32] = Keccak256::digest(&uncompressed.as_bytes()[1..]).into();
        Ok(NodeId(hash))
    }
}

/// The `ed25519` identity scheme (Ed25519 + blake3).
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Scheme;

impl Ed25519Scheme {
    pub const NAME: &'static [u8] = b"ed25519";

    fn verifying_key(public_key: &[u8]) -> Result<ed25519_dalek::VerifyingKey, CoreError> {
        let bytes: [u8; 32] = public_key
            .try_into()
            .map_err(|_| CoreError::InvalidPublicKey)?;
        ed25519_dalek::VerifyingKey::from_bytes(&bytes).map_err(|_| CoreError::InvalidPublicKey)
    }
}

impl IdentityScheme for Ed25519Scheme {
    fn name(&self) -> &'static [u8] {
        Self::NAME
    }

    fn public_key_key(&self) -> &'static [u8] {
        keys::ED25519
    }

    fn public_key(&self, private_key: &PrivateKey) -> Result<Vec<u8>, CoreError> {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(private_key.as_bytes());
        Ok(signing_key.verifying_key().to_bytes().to_vec())
    }

    fn sign(&self, content: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>, CoreError> {
        use ed25519_dalek::Signer;

        let signing_key = ed25519_dalek::SigningKey::from_bytes(private_key.as_bytes());
        Ok(signing_key.sign(content).to_bytes().to_vec())
    }

    fn verify(&self, content: &[u8], signature: &[u8], public_key: &[u8]) -> Result<(), CoreError> {
        use ed25519_dalek::Verifier;

        let verifying_key = Self::verifying_key(public_key)?;
        let signature = ed25519_dalek::Signature::from_slice(signature)
            .map_err(|_| CoreError::InvalidSignature)?;
        verifying_key
            .verify(content, &signature)
            .map_err(|_| CoreError::InvalidSignature)
    }

    fn node_id(&self, public_key: &[u8]) -> Result<NodeId, CoreError> {
        let verifying_key = Self::verifying_key(public_key)?;
        Ok(NodeId(*blake3::hash(verifying_key.as_bytes()).as_bytes()))
    }
}

/// Registry of identity schemes, keyed by scheme name.
#[derive(Clone)]
pub struct SchemeRegistry {
    schemes: HashMap<Vec<u8>, Arc<dyn IdentityScheme>>,
}

impl SchemeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            schemes: HashMap::new(),
        }
    }

    /// Register a scheme, replacing any scheme with the same name.
    pub fn register(&mut self, scheme: impl IdentityScheme + 'static) -> &mut Self {
        self.schemes.insert(scheme.name().to_vec(), Arc::new(scheme));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, scheme: impl IdentityScheme + 'static) -> Self {
        self.register(scheme);
        self
    }

    /// Look up a scheme by name.
    pub fn get(&self, name: &[u8]) -> Result<Arc<dyn IdentityScheme>, CoreError> {
        self.schemes
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownScheme(String::from_utf8_lossy(name).into_owned()))
    }

    /// Check whether a scheme name is registered.
    pub fn contains(&self, name: &[u8]) -> bool {
        self.schemes.contains_key(name)
    }
}

/// The default registry contains only the `v4` scheme.
impl Default for SchemeRegistry {
    fn default() -> Self {
        Self::new().with(V4Scheme)
    }
}

impl fmt::Debug for SchemeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .schemes
            .keys()
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .collect();
        names.sort();
        f.debug_struct("SchemeRegistry").field("schemes", &names).finish()
    }
}
