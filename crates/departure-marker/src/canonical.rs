//! Canonical encoding and content addressing.
//!
//! Every hash and every signature in this crate is computed over the output
//! of [`canonicalize`]:
//!
//! - object keys sorted at every depth, by UTF-16 code units (RFC 8785 order)
//! - arrays keep their order
//! - every string, keys included, is NFC-normalized before encoding
//! - no insignificant whitespace
//!
//! The distributed JSON of a marker may reorder keys or add whitespace; it
//! re-canonicalizes to the same bytes, so ids and signatures survive transit.
//!
//! Two distinct keys of one object can normalize to the same string. The
//! total [`canonicalize`] keeps only the entry whose raw key sorts first;
//! everything that hashes or signs goes through [`try_canonicalize`], which
//! refuses such input instead.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::error::{MarkerError, Result};
use crate::marker::DepartureMarker;

/// Fields excluded from a marker's content address and signing payload.
pub const UNSIGNED_FIELDS: [&str; 2] = ["proof", "id"];

/// Encode a JSON value canonically. Total: never fails.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// Canonicalize, rejecting objects whose keys collide after NFC.
pub fn try_canonicalize(value: &Value) -> Result<String> {
    match normalized_key_collision(value) {
        Some(key) => Err(MarkerError::Canonicalization(format!(
            "object keys collide after NFC normalization: {key:?}"
        ))),
        None => Ok(canonicalize(value)),
    }
}

/// First key, NFC-normalized, shared by two distinct keys of one object.
pub fn normalized_key_collision(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(normalized_key_collision),
        Value::Object(map) => {
            let mut seen = BTreeSet::new();
            for key in map.keys() {
                let key = nfc(key);
                if seen.contains(&key) {
                    return Some(key);
                }
                seen.insert(key);
            }
            map.values().find_map(normalized_key_collision)
        }
        _ => None,
    }
}

/// Serialize then canonicalize any serde value.
pub fn canonicalize_serializable<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value =
        serde_json::to_value(value).map_err(|e| MarkerError::Canonicalization(e.to_string()))?;
    try_canonicalize(&value)
}

/// SHA-256 of `bytes`, lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// The marker as JSON with `proof` and `id` removed.
///
/// This is the exact view that gets signed and hashed.
pub fn signing_view(marker: &DepartureMarker) -> Result<Value> {
    let value =
        serde_json::to_value(marker).map_err(|e| MarkerError::Canonicalization(e.to_string()))?;
    Ok(strip_fields(value, &UNSIGNED_FIELDS))
}

/// Content address of a marker: hex SHA-256 of its canonical signing view.
pub fn compute_id(marker: &DepartureMarker) -> Result<String> {
    let view = signing_view(marker)?;
    Ok(sha256_hex(try_canonicalize(&view)?.as_bytes()))
}

/// Content address of already-parsed marker JSON.
pub fn compute_id_value(value: &Value) -> String {
    let view = strip_fields(value.clone(), &UNSIGNED_FIELDS);
    sha256_hex(canonicalize(&view).as_bytes())
}

/// Content address of any serializable value with the named top-level
/// fields removed first.
pub fn content_address<T: Serialize + ?Sized>(value: &T, strip: &[&str]) -> Result<String> {
    let value =
        serde_json::to_value(value).map_err(|e| MarkerError::Canonicalization(e.to_string()))?;
    let view = strip_fields(value, strip);
    Ok(sha256_hex(try_canonicalize(&view)?.as_bytes()))
}

/// Remove top-level fields from a JSON object. Non-objects pass through.
pub fn strip_fields(mut value: Value, fields: &[&str]) -> Value {
    if let Value::Object(map) = &mut value {
        for field in fields {
            map.remove(*field);
        }
    }
    value
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(String, &String, &Value)> =
                map.iter().map(|(k, v)| (nfc(k), k, v)).collect();
            entries.sort_by(|a, b| {
                a.0.encode_utf16()
                    .cmp(b.0.encode_utf16())
                    .then_with(|| a.1.encode_utf16().cmp(b.1.encode_utf16()))
            });
            entries.dedup_by(|later, kept| later.0 == kept.0);

            out.push('{');
            for (i, (key, _, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_escaped(key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    write_escaped(&nfc(s), out);
}

fn write_escaped(s: &str, out: &mut String) {
    // serde_json's string escaping matches JSON.stringify for all of UTF-8.
    out.push_str(&Value::String(s.to_owned()).to_string());
}

fn nfc(s: &str) -> String {
    s.nfc().collect()
}
