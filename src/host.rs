//! Capabilities the ledger borrows from the log platform that orders interactions.
//!
//! The core never reads a wall clock, a random source or a network. Everything it
//! needs about "the outside" arrives through these traits, which keeps replay of an
//! ordered interaction log byte-for-byte deterministic.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub trait Clock {
    /// Block time of the interaction being applied.
    fn now(&self) -> u64;
}

pub trait RandomSeed {
    /// A replay-stable pseudo-random integer in `[0, max_exclusive)`.
    ///
    /// Distinct `nonce` values give independent draws within one interaction.
    fn random_int(&self, max_exclusive: u64, caller: &str, nonce: &str) -> u64;
}

pub trait DocumentStore {
    /// Read-only fetch of an externally stored document.
    fn fetch(&self, id: &str) -> Option<Value>;
}

/// Everything a handler may consult about the environment.
pub trait Host: Clock + RandomSeed + DocumentStore {}

impl<T: Clock + RandomSeed + DocumentStore> Host for T {}

/// Documents kept in memory, keyed by transaction id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryDocuments {
    documents: BTreeMap<String, Value>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, document: Value) {
        self.documents.insert(id.into(), document);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentStore for MemoryDocuments {
    fn fetch(&self, id: &str) -> Option<Value> {
        self.documents.get(id).cloned()
    }
}

/// Metadata of the block and interaction currently being applied.
#[derive(Clone, Debug)]
pub struct BlockContext {
    pub height: u64,
    pub timestamp: u64,
    pub interaction_id: String,
    pub documents: MemoryDocuments,
}

impl BlockContext {
    pub fn new(height: u64, timestamp: u64, interaction_id: impl Into<String>) -> Self {
        Self {
            height,
            timestamp,
            interaction_id: interaction_id.into(),
            documents: MemoryDocuments::new(),
        }
    }

    pub fn with_documents(mut self, documents: MemoryDocuments) -> Self {
        self.documents = documents;
        self
    }
}

impl Clock for BlockContext {
    fn now(&self) -> u64 {
        self.timestamp
    }
}

impl RandomSeed for BlockContext {
    fn random_int(&self, max_exclusive: u64, caller: &str, nonce: &str) -> u64 {
        if max_exclusive <= 1 {
            return 0;
        }
        let mut hasher = Sha256::new();
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        for field in [self.interaction_id.as_str(), caller, nonce] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        reduce_digest(&hasher.finalize(), max_exclusive)
    }
}

impl DocumentStore for BlockContext {
    fn fetch(&self, id: &str) -> Option<Value> {
        self.documents.fetch(id)
    }
}

/// Reduces a big-endian digest modulo `modulus` without a bignum type.
fn reduce_digest(bytes: &[u8], modulus: u64) -> u64 {
    let modulus = u128::from(modulus);
    let remainder = bytes
        .iter()
        .fold(0u128, |acc, &byte| ((acc << 8) | u128::from(byte)) % modulus);
    remainder as u64
}
