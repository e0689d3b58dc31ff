//! The single snapshot every interaction reads and replaces.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use crate::config::NetworkConfig;
use crate::error::{LedgerError, Result};
use crate::governance::types::{Administrator, NetworkChangeProposal};
use crate::paper::types::Paper;
use crate::roles::RoleTiers;
use crate::tribunal::types::Trial;
use crate::wallet::types::{Address, PaperId, Wallet};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkState {
    /// Rosetta in existence; only burns lower it
    pub total_rosetta: f64,
    pub config: NetworkConfig,
    pub roles: RoleTiers,
    pub wallets: BTreeMap<Address, Wallet>,
    pub papers: BTreeMap<PaperId, Paper>,
    pub next_paper_id: PaperId,
    /// At most one record per paper
    pub trials: BTreeMap<PaperId, Trial>,
    pub past_trials: Vec<Trial>,
    pub jury_pool: Vec<Address>,
    pub administrators: BTreeMap<Address, Administrator>,
    pub network_change_proposals: BTreeMap<u64, NetworkChangeProposal>,
    pub next_network_change_id: u64,
}

impl NetworkState {
    /// Builds a snapshot whose supply counter matches the balances it holds.
    pub fn genesis(
        config: NetworkConfig,
        wallets: BTreeMap<Address, Wallet>,
        administrators: BTreeMap<Address, Administrator>,
    ) -> Self {
        let mut state = Self {
            config,
            wallets,
            administrators,
            ..Self::default()
        };
        state.total_rosetta = state.tracked_supply();
        state
    }

    /// Sum of every place Rosetta can sit.
    pub fn tracked_supply(&self) -> f64 {
        let wallets: f64 = self.wallets.values().map(Wallet::tracked_value).sum();
        let papers: f64 = self.papers.values().map(Paper::pooled_value).sum();
        let trials: f64 = self.trials.values().map(Trial::held_value).sum();
        wallets + papers + trials
    }

    /// Checks that no balance went negative and that supply is conserved.
    pub fn check_invariants(&self) -> Result<()> {
        for (address, wallet) in &self.wallets {
            let negative_tokens = wallet
                .knowledge_tokens
                .values()
                .any(|k| k.amount < 0.0 || k.locked.amount < 0.0);
            if wallet.amount < 0.0 || wallet.jury_stake < 0.0 || negative_tokens {
                return Err(LedgerError::InvariantViolation(format!(
                    "wallet {} holds a negative balance",
                    address
                )));
            }
        }
        let tracked = self.tracked_supply();
        let tolerance = 1e-6 * self.total_rosetta.abs().max(1.0);
        if (tracked - self.total_rosetta).abs() > tolerance {
            return Err(LedgerError::InvariantViolation(format!(
                "tracked supply {} differs from total {}",
                tracked, self.total_rosetta
            )));
        }
        Ok(())
    }

    pub fn wallet(&self, address: &str) -> Result<&Wallet> {
        self.wallets
            .get(address)
            .ok_or_else(|| LedgerError::NotFound(format!("wallet {}", address)))
    }

    pub fn wallet_mut(&mut self, address: &str) -> Result<&mut Wallet> {
        self.wallets
            .get_mut(address)
            .ok_or_else(|| LedgerError::NotFound(format!("wallet {}", address)))
    }

    /// Returns the wallet, creating a default one on first reference.
    pub fn wallet_or_default(&mut self, address: &str) -> &mut Wallet {
        self.wallets.entry(address.to_string()).or_default()
    }

    pub fn paper(&self, paper_id: PaperId) -> Result<&Paper> {
        self.papers
            .get(&paper_id)
            .ok_or_else(|| LedgerError::NotFound(format!("paper {}", paper_id)))
    }

    pub fn paper_mut(&mut self, paper_id: PaperId) -> Result<&mut Paper> {
        self.papers
            .get_mut(&paper_id)
            .ok_or_else(|| LedgerError::NotFound(format!("paper {}", paper_id)))
    }

    pub fn trial(&self, paper_id: PaperId) -> Result<&Trial> {
        self.trials
            .get(&paper_id)
            .ok_or_else(|| LedgerError::NotFound(format!("tribunal for paper {}", paper_id)))
    }

    pub fn trial_mut(&mut self, paper_id: PaperId) -> Result<&mut Trial> {
        self.trials
            .get_mut(&paper_id)
            .ok_or_else(|| LedgerError::NotFound(format!("tribunal for paper {}", paper_id)))
    }

    /// Removes value from circulation.
    pub fn burn(&mut self, amount: f64) {
        self.total_rosetta -= amount;
    }

    /// Hex SHA-256 of the bincode encoding; equal snapshots share a digest.
    pub fn digest(&self) -> anyhow::Result<String> {
        let encoded = bincode::serialize(self)?;
        Ok(hex::encode(Sha256::digest(&encoded)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::state_with_wallets;

    #[test]
    fn test_genesis_counts_supply() {
        let state = state_with_wallets(&[("a", 1000.0, 1), ("b", 250.0, 1)]);
        assert_eq!(state.total_rosetta, 1250.0);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_invariants_catch_leaks() {
        let mut state = state_with_wallets(&[("a", 1000.0, 1)]);
        state.wallets.get_mut("a").unwrap().amount = 900.0;
        assert!(matches!(
            state.check_invariants(),
            Err(LedgerError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_invariants_catch_negative_balance() {
        let mut state = state_with_wallets(&[("a", 0.0, 1)]);
        state.wallets.get_mut("a").unwrap().jury_stake = -5.0;
        state.total_rosetta = -5.0;
        assert!(state.check_invariants().is_err());
    }

    #[test]
    fn test_digest_is_stable() {
        let a = state_with_wallets(&[("a", 1.0, 1), ("b", 2.0, 1)]);
        let b = state_with_wallets(&[("b", 2.0, 1), ("a", 1.0, 1)]);
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());

        let c = state_with_wallets(&[("a", 1.0, 1), ("b", 3.0, 1)]);
        assert_ne!(a.digest().unwrap(), c.digest().unwrap());
    }

    #[test]
    fn test_state_loads_from_sparse_json() {
        let json = r#"{
            "wallets": { "alice": { "amount": 1000, "role": 100, "trust": 1 } },
            "juryPool": []
        }"#;
        let state: NetworkState = serde_json::from_str(json).unwrap();
        assert_eq!(state.wallets["alice"].amount, 1000.0);
        assert_eq!(state.roles, RoleTiers::default());
        assert_eq!(state.config, NetworkConfig::default());
    }
}
