pub mod types;

pub use types::{Address, KnowledgeWallet, LockedKnowledge, PaperId, PaperStake, Wallet};

use log::info;
use crate::error::{LedgerError, Result};
use crate::roles::require_not_banned;
use crate::state::NetworkState;

/// Token bookkeeping primitives.
///
/// Guards always run in the same order: existence, ban check, amount validity,
/// then sufficiency.
pub trait WalletOperations {
    /// Moves Rosetta, creating `to` on first reference.
    fn transfer(&mut self, from: &str, to: &str, amount: f64) -> Result<()>;

    /// Moves liquid knowledge tokens of `paper_id`, folding matured locks first.
    fn transfer_knowledge(&mut self, from: &str, to: &str, amount: f64, paper_id: PaperId, now: u64) -> Result<()>;

    /// Liquid knowledge-token balance as of `now`.
    fn spendable_knowledge(&self, address: &str, paper_id: PaperId, now: u64) -> f64;

    /// Removes Rosetta from a wallet's liquid balance.
    fn debit(&mut self, address: &str, amount: f64) -> Result<()>;

    /// Adds Rosetta to a wallet, creating it if needed.
    fn credit(&mut self, address: &str, amount: f64);

    /// Escrows `amount` of the wallet's balance as jury stake.
    fn stake_for_jury(&mut self, address: &str, amount: f64) -> Result<()>;

    /// Returns the whole jury stake to the liquid balance.
    fn unstake_jury(&mut self, address: &str) -> Result<f64>;

    /// Locks `amount` against `paper_id` until `until`.
    fn stake_on_paper(&mut self, address: &str, paper_id: PaperId, amount: f64, until: u64) -> Result<()>;

    /// Releases a matured publication stake.
    fn unstake_paper(&mut self, address: &str, paper_id: PaperId, now: u64) -> Result<f64>;
}

pub fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

impl WalletOperations for NetworkState {
    fn transfer(&mut self, from: &str, to: &str, amount: f64) -> Result<()> {
        let available = self.wallet(from)?.amount;
        require_not_banned(self, from)?;
        require_not_banned(self, to)?;
        validate_amount(amount)?;
        if available < amount {
            return Err(LedgerError::insufficient(from, amount, available));
        }

        self.wallet_mut(from)?.amount -= amount;
        self.wallet_or_default(to).amount += amount;
        info!("Transferred {} rosetta from {} to {}", amount, from, to);
        Ok(())
    }

    fn transfer_knowledge(&mut self, from: &str, to: &str, amount: f64, paper_id: PaperId, now: u64) -> Result<()> {
        let sender = self.wallet(from)?;
        let holding = sender.knowledge_tokens.get(&paper_id).ok_or_else(|| {
            LedgerError::NotFound(format!("{} holds no knowledge tokens for paper {}", from, paper_id))
        })?;
        let available = holding.spendable(now);
        require_not_banned(self, from)?;
        require_not_banned(self, to)?;
        validate_amount(amount)?;
        if available < amount {
            return Err(LedgerError::insufficient(from, amount, available));
        }

        let sender_tokens = self
            .wallet_mut(from)?
            .knowledge_tokens
            .get_mut(&paper_id)
            .ok_or_else(|| LedgerError::InvariantViolation("knowledge wallet vanished".into()))?;
        sender_tokens.settle(now);
        sender_tokens.amount -= amount;

        let receiver_tokens = self
            .wallet_or_default(to)
            .knowledge_tokens
            .entry(paper_id)
            .or_default();
        receiver_tokens.settle(now);
        receiver_tokens.amount += amount;

        info!(
            "Transferred {} knowledge tokens of paper {} from {} to {}",
            amount, paper_id, from, to
        );
        Ok(())
    }

    fn spendable_knowledge(&self, address: &str, paper_id: PaperId, now: u64) -> f64 {
        self.wallets
            .get(address)
            .and_then(|w| w.knowledge_tokens.get(&paper_id))
            .map(|k| k.spendable(now))
            .unwrap_or(0.0)
    }

    fn debit(&mut self, address: &str, amount: f64) -> Result<()> {
        let wallet = self.wallet_mut(address)?;
        if wallet.amount < amount {
            return Err(LedgerError::insufficient(address, amount, wallet.amount));
        }
        wallet.amount -= amount;
        Ok(())
    }

    fn credit(&mut self, address: &str, amount: f64) {
        self.wallet_or_default(address).amount += amount;
    }

    fn stake_for_jury(&mut self, address: &str, amount: f64) -> Result<()> {
        let available = self.wallet(address)?.amount;
        require_not_banned(self, address)?;
        validate_amount(amount)?;
        if available < amount {
            return Err(LedgerError::insufficient(address, amount, available));
        }

        let wallet = self.wallet_mut(address)?;
        wallet.amount -= amount;
        wallet.jury_stake += amount;
        Ok(())
    }

    fn unstake_jury(&mut self, address: &str) -> Result<f64> {
        let wallet = self.wallet_mut(address)?;
        let refund = wallet.jury_stake;
        wallet.amount += refund;
        wallet.jury_stake = 0.0;
        Ok(refund)
    }

    fn stake_on_paper(&mut self, address: &str, paper_id: PaperId, amount: f64, until: u64) -> Result<()> {
        let available = self.wallet(address)?.amount;
        require_not_banned(self, address)?;
        validate_amount(amount)?;
        if available < amount {
            return Err(LedgerError::insufficient(address, amount, available));
        }

        let wallet = self.wallet_mut(address)?;
        wallet.amount -= amount;
        let stake = wallet.paper_stakes.entry(paper_id).or_default();
        stake.amount += amount;
        stake.until = stake.until.max(until);
        Ok(())
    }

    fn unstake_paper(&mut self, address: &str, paper_id: PaperId, now: u64) -> Result<f64> {
        let wallet = self.wallet(address)?;
        let stake = wallet.paper_stakes.get(&paper_id).cloned().ok_or_else(|| {
            LedgerError::NotFound(format!("{} has no stake on paper {}", address, paper_id))
        })?;
        require_not_banned(self, address)?;
        if now < stake.until {
            return Err(LedgerError::StateConflict(format!(
                "stake on paper {} is locked until {}",
                paper_id, stake.until
            )));
        }

        let wallet = self.wallet_mut(address)?;
        wallet.paper_stakes.remove(&paper_id);
        wallet.amount += stake.amount;
        info!("Released {} rosetta staked by {} on paper {}", stake.amount, address, paper_id);
        Ok(stake.amount)
    }
}
