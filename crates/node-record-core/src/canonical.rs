//! Canonical RLP encoding for records.
//!
//! Signed content is `rlp([seq, k1, v1, k2, v2, ...])` and the full record is
//! `rlp([signature, seq, k1, v1, ...])`, with pairs sorted by key bytes and no
//! duplicate keys. The encoding must be byte-identical across platforms:
//! signatures from other implementations are verified against it.
//!
//! Only the subset of RLP needed for records is implemented: byte strings,
//! unsigned integers, and a single outer list. Values are opaque byte strings.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::error::CoreError;

/// Maximum encoded record size in bytes.
pub const MAX_RECORD_SIZE: usize = 300;

/// Encode record content (the signed message before hashing).
pub fn content_bytes(seq: u64, pairs: &BTreeMap<Bytes, Bytes>) -> Vec<u8> {
    let mut payload = Vec::new();
    encode_uint(&mut payload, seq);
    encode_pairs(&mut payload, pairs);
    wrap_list(payload)
}

/// Encode a full signed record.
pub fn record_bytes(signature: &[u8], seq: u64, pairs: &BTreeMap<Bytes, Bytes>) -> Vec<u8> {
    let mut payload = Vec::new();
    encode_bytes(&mut payload, signature);
    encode_uint(&mut payload, seq);
    encode_pairs(&mut payload, pairs);
    wrap_list(payload)
}

/// The parts of a decoded record, before the node id is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordParts {
    pub signature: Bytes,
    pub seq: u64,
    pub pairs: BTreeMap<Bytes, Bytes>,
}

/// Decode a full signed record.
pub fn decode_record(bytes: &[u8]) -> Result<RecordParts, CoreError> {
    if bytes.len() > MAX_RECORD_SIZE {
        return Err(CoreError::RecordTooLarge {
            size: bytes.len(),
            max: MAX_RECORD_SIZE,
        });
    }

    let (payload, rest) = decode_list(bytes)?;
    if !rest.is_empty() {
        return Err(malformed("trailing bytes after record"));
    }

    let mut items = Vec::new();
    let mut cursor = payload;
    while !cursor.is_empty() {
        let (item, rest) = decode_string(cursor)?;
        items.push(item);
        cursor = rest;
    }

    if items.len() < 2 {
        return Err(malformed("missing signature or sequence number"));
    }
    if items.len() % 2 != 0 {
        return Err(malformed("odd number of key/value items"));
    }

    let signature = Bytes::copy_from_slice(items[0]);
    let seq = decode_uint(items[1])?;

    let mut pairs = BTreeMap::new();
    let mut prev_key: Option<&[u8]> = None;
    for kv in items[2..].chunks_exact(2) {
        let (key, value) = (kv[0], kv[1]);
        if let Some(prev) = prev_key {
            if key <= prev {
                return Err(malformed("keys not sorted or duplicated"));
            }
        }
        prev_key = Some(key);
        pairs.insert(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value));
    }

    Ok(RecordParts {
        signature,
        seq,
        pairs,
    })
}

fn encode_pairs(buf: &mut Vec<u8>, pairs: &BTreeMap<Bytes, Bytes>) {
    // BTreeMap iterates in byte order of the keys.
    for (key, value) in pairs {
        encode_bytes(buf, key);
        encode_bytes(buf, value);
    }
}

/// Encode a byte string.
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.len() == 1 && bytes[0] < 0x80 {
        buf.push(bytes[0]);
    } else {
        encode_length(buf, 0x80, bytes.len());
        buf.extend_from_slice(bytes);
    }
}

/// Encode an unsigned integer as a big-endian byte string without leading zeros.
fn encode_uint(buf: &mut Vec<u8>, n: u64) {
    let be = n.to_be_bytes();
    let start = be.iter().position(|&b| b != 0).unwrap_or(be.len());
    encode_bytes(buf, &be[start..]);
}

fn wrap_list(payload: Vec<u8>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 9);
    encode_length(&mut buf, 0xc0, payload.len());
    buf.extend_from_slice(&payload);
    buf
}

/// Write a string (offset 0x80) or list (offset 0xc0) header.
fn encode_length(buf: &mut Vec<u8>, offset: u8, len: usize) {
    if len <= 55 {
        buf.push(offset + len as u8);
    } else {
        let be = (len as u64).to_be_bytes();
        let start = be.iter().position(|&b| b != 0).unwrap_or(be.len());
        let len_bytes = &be[start..];
        buf.push(offset + 55 + len_bytes.len() as u8);
        buf.extend_from_slice(len_bytes);
    }
}

/// Decode a byte string, returning it and the remaining input.
fn decode_string(input: &[u8]) -> Result<(&[u8], &[u8]), CoreError> {
    let prefix = *input.first().ok_or_else(|| malformed("unexpected end of input"))?;
    match prefix {
        0x00..=0x7f => Ok((&input[..1], &input[1..])),
        0x80..=0xb7 => {
            let len = (prefix - 0x80) as usize;
            let (item, rest) = split(&input[1..], len)?;
            if len == 1 && item[0] < 0x80 {
                return Err(malformed("single byte must not carry a string prefix"));
            }
            Ok((item, rest))
        }
        0xb8..=0xbf => {
            let (len, body) = decode_long_length(&input[1..], (prefix - 0xb7) as usize)?;
            split(body, len)
        }
        _ => Err(malformed("expected byte string, found list")),
    }
}

/// Decode a list header, returning the list payload and the remaining input.
fn decode_list(input: &[u8]) -> Result<(&[u8], &[u8]), CoreError> {
    let prefix = *input.first().ok_or_else(|| malformed("empty input"))?;
    match prefix {
        0xc0..=0xf7 => split(&input[1..], (prefix - 0xc0) as usize),
        0xf8..=0xff => {
            let (len, body) = decode_long_length(&input[1..], (prefix - 0xf7) as usize)?;
            split(body, len)
        }
        _ => Err(malformed("expected list")),
    }
}

fn decode_long_length(input: &[u8], len_of_len: usize) -> Result<(usize, &[u8]), CoreError> {
    let (len_bytes, rest) = split(input, len_of_len)?;
    if len_bytes[0] == 0 {
        return Err(malformed("length has leading zero"));
    }
    if len_of_len > std::mem::size_of::<usize>() {
        return Err(malformed("length overflow"));
    }
    let len = len_bytes
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);
    if len <= 55 {
        return Err(malformed("long form used for short length"));
    }
    Ok((len, rest))
}

fn decode_uint(bytes: &[u8]) -> Result<u64, CoreError> {
    if bytes.len() > 8 {
        return Err(malformed("integer overflow"));
    }
    if bytes.first() == Some(&0) {
        return Err(malformed("integer has leading zero"));
    }
    Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

fn split(input: &[u8], len: usize) -> Result<(&[u8], &[u8]), CoreError> {
    if input.len() < len {
        return Err(malformed("truncated input"));
    }
    Ok(input.split_at(len))
}

fn malformed(msg: &str) -> CoreError {
    CoreError::MalformedRecord(msg.into())
}
