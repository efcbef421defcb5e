// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content digest handling for artifact references.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    #[error("digest {0:?} has no algorithm separator")]
    MissingSeparator(String),
    #[error("digest {0:?} has an empty algorithm or hex half")]
    EmptyComponent(String),
    #[error("digest {0:?} contains non-hex characters")]
    InvalidHex(String),
}

/// A parsed `algorithm:hex` content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    pub algorithm: String,
    pub hex: String,
}

impl Digest {
    /// Digest set form used by in-toto subjects and predicate materials.
    pub fn digest_set(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(self.algorithm.clone(), self.hex.clone())])
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| DigestError::MissingSeparator(s.to_string()))?;
        if algorithm.is_empty() || hex.is_empty() {
            return Err(DigestError::EmptyComponent(s.to_string()));
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DigestError::InvalidHex(s.to_string()));
        }
        Ok(Self { algorithm: algorithm.to_string(), hex: hex.to_string() })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

#[cfg(test)]
#[path = "digest_tests.rs"]
mod tests;
