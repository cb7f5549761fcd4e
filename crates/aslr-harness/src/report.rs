//! Address report extraction and decoding.
//!
//! The guest prints a boot log, then the marker, then a single JSON object
//! mapping region names to hexadecimal addresses:
//!
//! ```text
//! ...boot log...
//! ADDRESS_LIST:{"kernel":"ffffffff81000000","heap":"7f0000000000"}
//! ```

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::HarnessError;
use crate::runner::{output_tail, OUTPUT_TAIL_BYTES};

/// Region name to base address, as reported by one guest boot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressReport {
    addresses: BTreeMap<String, u64>,
}

impl AddressReport {
    pub fn get(&self, key: &str) -> Option<u64> {
        self.addresses.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.addresses.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.addresses.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.addresses.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl FromIterator<(String, u64)> for AddressReport {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            addresses: iter.into_iter().collect(),
        }
    }
}

/// Serializes back into the wire shape, with `0x`-prefixed values.
impl Serialize for AddressReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.addresses.len()))?;
        for (key, addr) in &self.addresses {
            map.serialize_entry(key, &format!("{:#x}", addr))?;
        }
        map.end()
    }
}

/// Locate `marker` in `output` and decode everything after its first
/// occurrence as an address report.
pub fn extract_report(output: &str, marker: &str) -> Result<AddressReport, HarnessError> {
    let (_, encoded) = output
        .split_once(marker)
        .ok_or_else(|| HarnessError::MarkerNotFound {
            marker: marker.to_string(),
            output_len: output.len(),
            output_tail: output_tail(output, OUTPUT_TAIL_BYTES).to_string(),
        })?;
    decode_report(encoded)
}

/// Decode a JSON object of hexadecimal strings.
///
/// Surrounding whitespace is allowed, any other trailing data is not.
pub fn decode_report(encoded: &str) -> Result<AddressReport, HarnessError> {
    let raw: BTreeMap<String, String> = serde_json::from_str(encoded)?;
    raw.into_iter()
        .map(|(key, value)| match parse_address(&value) {
            Some(addr) => Ok((key, addr)),
            None => Err(HarnessError::InvalidAddress { key, value }),
        })
        .collect()
}

/// Parse a base-16 address. Accepts an optional `0x`/`0X` prefix and any
/// number of digits that fits in 64 bits.
pub fn parse_address(text: &str) -> Option<u64> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    // from_str_radix would also take a leading sign
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}
