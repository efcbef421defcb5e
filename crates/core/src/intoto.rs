// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! in-toto statement and DSSE envelope types.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::digest::Digest;
use crate::predicate::Predicate;

pub const STATEMENT_TYPE: &str = "https://in-toto.io/Statement/v0.1";
pub const PREDICATE_TYPE: &str = "https://provenant.io/provenance/v0.1";
pub const INTOTO_PAYLOAD_TYPE: &str = "application/vnd.in-toto+json";

/// The artifact a statement speaks about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub digest: BTreeMap<String, String>,
}

/// An in-toto statement binding a provenance predicate to a subject digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "_type")]
    pub statement_type: String,
    #[serde(rename = "predicateType")]
    pub predicate_type: String,
    pub subject: Vec<Subject>,
    pub predicate: Predicate,
}

impl Statement {
    /// Statement for one artifact at one digest.
    pub fn provenance(artifact_name: &str, digest: &Digest, predicate: Predicate) -> Self {
        Self {
            statement_type: STATEMENT_TYPE.to_string(),
            predicate_type: PREDICATE_TYPE.to_string(),
            subject: vec![Subject {
                name: artifact_name.to_string(),
                digest: digest.digest_set(),
            }],
            predicate,
        }
    }
}

/// DSSE pre-authentication encoding: what signers actually sign.
pub fn pae(payload_type: &str, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + payload_type.len() + 32);
    out.extend_from_slice(b"DSSEv1 ");
    out.extend_from_slice(payload_type.len().to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(payload_type.as_bytes());
    out.push(b' ');
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(payload);
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub keyid: String,
    pub sig: String,
}

/// A signed DSSE envelope around a serialized statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub payload_type: String,
    pub payload: String,
    pub signatures: Vec<Signature>,
}

impl Envelope {
    /// Wrap `payload` with one raw signature over its PAE.
    pub fn new(payload: &[u8], keyid: String, raw_signature: &[u8]) -> Self {
        Self {
            payload_type: INTOTO_PAYLOAD_TYPE.to_string(),
            payload: BASE64.encode(payload),
            signatures: vec![Signature { keyid, sig: BASE64.encode(raw_signature) }],
        }
    }

    /// The decoded statement payload.
    pub fn decoded_payload(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.payload)
    }
}

#[cfg(test)]
#[path = "intoto_tests.rs"]
mod tests;
