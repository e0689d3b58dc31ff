//! Paper publication economics and the donation pools attached to each paper.

pub mod types;

pub use types::{Paper, REPLICATION_ROUNDS};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use crate::config::NetworkConfig;
use crate::error::{LedgerError, Result};
use crate::host::DocumentStore;
use crate::roles::{require_not_banned, require_specific_role, require_tiered_role};
use crate::state::NetworkState;
use crate::wallet::{validate_amount, Address, PaperId, WalletOperations};

/// Parameters of a `publishPaper` interaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishPaperRequest {
    #[serde(rename = "paperURL", alias = "paperUrl")]
    pub paper_url: String,
    pub paper_symbol: String,
    pub publish_timestamp: u64,
    pub authors: Vec<Address>,
    pub author_weights: Vec<f64>,
}

pub trait PaperOperations {
    /// Publishes a paper, minting its knowledge tokens and locking the creator's stake.
    fn publish_paper(&mut self, creator: &str, request: PublishPaperRequest, now: u64) -> Result<PaperId>;

    /// Adds Rosetta to the value at risk if the paper is falsified.
    fn volunteer_falsification_donate(&mut self, volunteer: &str, paper_id: PaperId, amount: f64) -> Result<()>;

    /// Funds one of the paper's sequential replication rounds.
    fn volunteer_replication_donation(&mut self, volunteer: &str, paper_id: PaperId, amount: f64, pool: i64) -> Result<()>;

    /// Staking wallet's remaining publication stake plus donated falsification value.
    fn total_falsification_stake(&self, paper_id: PaperId) -> Result<f64>;

    /// Returns a matured publication stake to the wallet that posted it.
    fn release_paper_stake(&mut self, caller: &str, paper_id: PaperId, now: u64) -> Result<f64>;

    /// Copies a paper's score out of an impact-score index document.
    fn update_impact_score<D: DocumentStore + ?Sized>(&mut self, caller: &str, paper_id: PaperId, index_tx: &str, documents: &D) -> Result<f64>;
}

/// Sum of the author weights, which normalizes each author's share of the mint.
fn weight_sum(authors: &[Address], weights: &[f64]) -> Result<f64> {
    if authors.is_empty() {
        return Err(LedgerError::Validation("a paper needs at least one author".into()));
    }
    if authors.len() != weights.len() {
        return Err(LedgerError::Validation(
            "Number of authors is not equal to number of author weights".into(),
        ));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(LedgerError::Validation("author weights must be non-negative numbers".into()));
    }
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return Err(LedgerError::Validation("author weights must not all be zero".into()));
    }
    Ok(sum)
}

impl PaperOperations for NetworkState {
    fn publish_paper(&mut self, creator: &str, request: PublishPaperRequest, now: u64) -> Result<PaperId> {
        let weight_sum = weight_sum(&request.authors, &request.author_weights)?;

        let available = self.wallet(creator)?.amount;
        require_not_banned(self, creator)?;
        require_tiered_role(self, creator, self.roles.author)?;
        let stake = self.config.publication_stake;
        if available < stake {
            return Err(LedgerError::insufficient(creator, stake, available));
        }

        let unlock = NetworkConfig::deadline(now, self.config.publication_lock_duration)?;
        let paper_id = self.next_paper_id;
        self.next_paper_id += 1;

        let author_mint = self.config.knowledge_token_author_mint;
        for (author, weight) in request.authors.iter().zip(&request.author_weights) {
            let tokens = author_mint * weight / weight_sum;
            self.wallet_or_default(author)
                .knowledge_tokens
                .entry(paper_id)
                .or_default()
                .add_locked(tokens, unlock, now);
        }
        debug!("Minted {} author tokens for paper {} until {}", author_mint, paper_id, unlock);

        let treasury = self.config.treasury_wallet.clone();
        let treasury_mint = self.config.knowledge_token_treasury_mint;
        let treasury_tokens = self
            .wallet_or_default(&treasury)
            .knowledge_tokens
            .entry(paper_id)
            .or_default();
        treasury_tokens.settle(now);
        treasury_tokens.amount += treasury_mint;

        if stake > 0.0 {
            self.stake_on_paper(creator, paper_id, stake, unlock)?;
        }

        self.papers.insert(
            paper_id,
            Paper {
                url: request.paper_url,
                symbol: request.paper_symbol,
                authors: request.authors,
                publish_timestamp: request.publish_timestamp,
                network_publish_timestamp: now,
                invalidated: false,
                staking_wallet: creator.to_string(),
                impact_score: 0.0,
                extra_falsification_pool: 0.0,
                replication_rosetta_pool: [0.0; REPLICATION_ROUNDS],
                replication_count: 0,
                replication_reserved_tokens: self.config.knowledge_token_replicator_mint,
            },
        );

        info!(
            "Paper {} published by {} with stake {} (tokens unlock at {})",
            paper_id, creator, stake, unlock
        );
        Ok(paper_id)
    }

    fn volunteer_falsification_donate(&mut self, volunteer: &str, paper_id: PaperId, amount: f64) -> Result<()> {
        if self.paper(paper_id)?.invalidated {
            return Err(LedgerError::StateConflict(format!("paper {} is already invalidated", paper_id)));
        }
        let available = self.wallet(volunteer)?.amount;
        require_not_banned(self, volunteer)?;
        validate_amount(amount)?;
        if available < amount {
            return Err(LedgerError::insufficient(volunteer, amount, available));
        }

        self.debit(volunteer, amount)?;
        self.paper_mut(paper_id)?.extra_falsification_pool += amount;
        info!("{} donated {} to the falsification pool of paper {}", volunteer, amount, paper_id);
        Ok(())
    }

    fn volunteer_replication_donation(&mut self, volunteer: &str, paper_id: PaperId, amount: f64, pool: i64) -> Result<()> {
        let paper = self.paper(paper_id)?;
        let round = usize::try_from(pool)
            .ok()
            .filter(|r| *r < REPLICATION_ROUNDS)
            .ok_or_else(|| {
                LedgerError::Validation(format!("There are only {} pools", REPLICATION_ROUNDS))
            })?;
        if round < paper.replication_count {
            return Err(LedgerError::StateConflict(format!(
                "There have already been {} replications",
                paper.replication_count
            )));
        }
        if paper.invalidated {
            return Err(LedgerError::StateConflict(format!("paper {} is invalidated", paper_id)));
        }
        let available = self.wallet(volunteer)?.amount;
        require_not_banned(self, volunteer)?;
        validate_amount(amount)?;
        if available < amount {
            return Err(LedgerError::insufficient(volunteer, amount, available));
        }

        self.debit(volunteer, amount)?;
        self.paper_mut(paper_id)?.replication_rosetta_pool[round] += amount;
        info!(
            "{} donated {} to replication pool {} of paper {}",
            volunteer, amount, round, paper_id
        );
        Ok(())
    }

    fn total_falsification_stake(&self, paper_id: PaperId) -> Result<f64> {
        let paper = self.paper(paper_id)?;
        let stake = self
            .wallets
            .get(&paper.staking_wallet)
            .and_then(|w| w.paper_stakes.get(&paper_id))
            .map(|s| s.amount)
            .unwrap_or(0.0);
        Ok(stake + paper.extra_falsification_pool)
    }

    fn release_paper_stake(&mut self, caller: &str, paper_id: PaperId, now: u64) -> Result<f64> {
        self.paper(paper_id)?;
        if let Some(trial) = self.trials.get(&paper_id) {
            if trial.current_state.is_open() {
                return Err(LedgerError::StateConflict(format!(
                    "paper {} has an open tribunal",
                    paper_id
                )));
            }
        }
        self.unstake_paper(caller, paper_id, now)
    }

    fn update_impact_score<D: DocumentStore + ?Sized>(&mut self, caller: &str, paper_id: PaperId, index_tx: &str, documents: &D) -> Result<f64> {
        require_specific_role(self, caller, self.roles.admin)?;
        self.paper(paper_id)?;
        let index = documents
            .fetch(index_tx)
            .ok_or_else(|| LedgerError::NotFound(format!("impact index {}", index_tx)))?;
        let score = index
            .get(paper_id.to_string())
            .ok_or_else(|| {
                LedgerError::NotFound(format!("paper {} in impact index {}", paper_id, index_tx))
            })?
            .as_f64()
            .filter(|s| s.is_finite() && *s >= 0.0)
            .ok_or_else(|| LedgerError::Validation("impact score must be a non-negative number".into()))?;

        self.paper_mut(paper_id)?.impact_score = score;
        info!("Impact score of paper {} set to {} from {}", paper_id, score, index_tx);
        Ok(score)
    }
}
