use serde::{Deserialize, Serialize};
use crate::wallet::types::Address;

/// Number of sequential replication donation rounds per paper.
pub const REPLICATION_ROUNDS: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub url: String,
    pub symbol: String,
    pub authors: Vec<Address>,
    /// Publication time reported by the authors
    pub publish_timestamp: u64,
    /// Block time at which the paper entered the network
    pub network_publish_timestamp: u64,
    /// Terminal once set
    pub invalidated: bool,
    /// Author who posted the publication stake
    pub staking_wallet: Address,
    pub impact_score: f64,
    pub extra_falsification_pool: f64,
    pub replication_rosetta_pool: [f64; REPLICATION_ROUNDS],
    /// Rounds already paid out; rounds are consumed strictly in order
    pub replication_count: usize,
    pub replication_reserved_tokens: f64,
}

impl Paper {
    pub fn is_author(&self, address: &str) -> bool {
        self.authors.iter().any(|a| a == address)
    }

    /// Rosetta held by the paper's own pools.
    pub fn pooled_value(&self) -> f64 {
        self.extra_falsification_pool + self.replication_rosetta_pool.iter().sum::<f64>()
    }

    /// Knowledge tokens a single replication round releases.
    pub fn replication_round_tokens(&self) -> f64 {
        self.replication_reserved_tokens / REPLICATION_ROUNDS as f64
    }
}
