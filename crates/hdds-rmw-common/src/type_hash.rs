// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-identity hash and its USER_DATA QoS encoding.
//!
//! The hash travels in the endpoint's USER_DATA as a flat ASCII string of
//! `key=value;` tokens; only the `typehash` key is interpreted here.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

pub const TYPE_HASH_VERSION_UNSET: u8 = 0;
pub const TYPE_HASH_SIZE: usize = 32;

const RIHS_PREFIX: &str = "RIHS";
const TYPEHASH_KEY: &str = "typehash";

/// Versioned hash of a message type description.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeHash {
    pub version: u8,
    pub value: [u8; TYPE_HASH_SIZE],
}

impl TypeHash {
    /// Unset hash (version 0, all zero bytes).
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            version: TYPE_HASH_VERSION_UNSET,
            value: [0u8; TYPE_HASH_SIZE],
        }
    }

    #[must_use]
    pub const fn new(version: u8, value: [u8; TYPE_HASH_SIZE]) -> Self {
        Self { version, value }
    }

    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.version == TYPE_HASH_VERSION_UNSET
    }

    /// `RIHS<vv>_<64 lowercase hex digits>`.
    #[must_use]
    pub fn stringify(&self) -> String {
        self.to_string()
    }

    /// Parse the output of [`TypeHash::stringify`].
    pub fn parse_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidTypeHash(s.to_string());

        let rest = s.strip_prefix(RIHS_PREFIX).ok_or_else(invalid)?;
        let (version_str, hex) = rest.split_once('_').ok_or_else(invalid)?;
        if version_str.len() != 2
            || !version_str.bytes().all(|b| b.is_ascii_digit())
            || hex.len() != TYPE_HASH_SIZE * 2
            || !hex.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(invalid());
        }
        let version = u8::from_str_radix(version_str, 10).map_err(|_| invalid())?;
        if version == TYPE_HASH_VERSION_UNSET {
            return Err(invalid());
        }

        let mut value = [0u8; TYPE_HASH_SIZE];
        for (i, byte) in value.iter_mut().enumerate() {
            let pair = hex.get(i * 2..i * 2 + 2).ok_or_else(invalid)?;
            *byte = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }
        Ok(Self { version, value })
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}_", RIHS_PREFIX, self.version)?;
        for byte in &self.value {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unset() {
            f.write_str("TypeHash(unset)")
        } else {
            write!(f, "TypeHash({})", self)
        }
    }
}

/// Split USER_DATA bytes into `key -> value` pairs.
///
/// Tokens are `;`-separated and split at the first `=`. Tokens without `=`
/// or with an empty key are skipped; later duplicates overwrite earlier ones.
#[must_use]
pub fn parse_key_value(data: &[u8]) -> HashMap<String, Vec<u8>> {
    let mut out = HashMap::new();
    for token in data.split(|b| *b == b';') {
        let Some(eq) = token.iter().position(|b| *b == b'=') else {
            continue;
        };
        let (key, value) = (&token[..eq], &token[eq + 1..]);
        if key.is_empty() {
            continue;
        }
        out.insert(String::from_utf8_lossy(key).into_owned(), value.to_vec());
    }
    out
}

/// Extract the `typehash` entry from USER_DATA.
///
/// A missing key yields [`TypeHash::zero`]; a present but malformed value
/// is an error.
pub fn parse_type_hash_from_user_data(user_data: &[u8]) -> Result<TypeHash> {
    let key_value = parse_key_value(user_data);
    let Some(raw) = key_value.get(TYPEHASH_KEY) else {
        return Ok(TypeHash::zero());
    };
    let text = std::str::from_utf8(raw)
        .map_err(|_| Error::InvalidTypeHash(String::from_utf8_lossy(raw).into_owned()))?;
    TypeHash::parse_str(text)
}

/// USER_DATA fragment announcing `type_hash`; empty when the hash is unset.
#[must_use]
pub fn encode_type_hash_for_user_data_qos(type_hash: &TypeHash) -> String {
    if type_hash.is_unset() {
        return String::new();
    }
    format!("{}={};", TYPEHASH_KEY, type_hash)
}
