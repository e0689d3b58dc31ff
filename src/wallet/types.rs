use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

pub type Address = String;
pub type PaperId = u64;

/// Rosetta locked against a published paper.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperStake {
    pub amount: f64,
    /// When the stake can be released back to the staking wallet
    pub until: u64,
}

/// Knowledge tokens waiting for their unlock time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LockedKnowledge {
    pub amount: f64,
    pub unlock: u64,
}

/// A wallet's holdings of one paper's knowledge token.
///
/// Only a single pending lock exists per paper. It is folded into `amount`
/// lazily, whenever the balance is read or spent at or after `locked.unlock`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeWallet {
    pub amount: f64,
    pub locked: LockedKnowledge,
}

impl KnowledgeWallet {
    pub fn liquid(amount: f64) -> Self {
        Self {
            amount,
            locked: LockedKnowledge::default(),
        }
    }

    pub fn locked_until(amount: f64, unlock: u64) -> Self {
        Self {
            amount: 0.0,
            locked: LockedKnowledge { amount, unlock },
        }
    }

    /// Moves a matured lock into the liquid balance.
    pub fn settle(&mut self, now: u64) {
        if self.locked.amount > 0.0 && now >= self.locked.unlock {
            self.amount += self.locked.amount;
            self.locked = LockedKnowledge::default();
        }
    }

    /// Liquid balance as of `now`, without mutating.
    pub fn spendable(&self, now: u64) -> f64 {
        if self.locked.amount > 0.0 && now >= self.locked.unlock {
            self.amount + self.locked.amount
        } else {
            self.amount
        }
    }

    /// Liquid plus locked tokens.
    pub fn total(&self) -> f64 {
        self.amount + self.locked.amount
    }

    /// Adds to the pending lock, keeping the later unlock time.
    pub fn add_locked(&mut self, amount: f64, unlock: u64, now: u64) {
        self.settle(now);
        if self.locked.amount > 0.0 {
            self.locked.unlock = self.locked.unlock.max(unlock);
        } else {
            self.locked.unlock = unlock;
        }
        self.locked.amount += amount;
    }
}

/// A participant's account: Rosetta, stakes, reputation and knowledge tokens.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Wallet {
    pub amount: f64,
    pub role: i64,
    pub trust: f64,
    /// Escrowed while the wallet sits in the jury pool
    pub jury_stake: f64,
    pub paper_stakes: BTreeMap<PaperId, PaperStake>,
    pub knowledge_tokens: BTreeMap<PaperId, KnowledgeWallet>,
}

impl Wallet {
    /// Knowledge tokens held for `paper_id`, liquid and locked.
    pub fn knowledge_total(&self, paper_id: PaperId) -> f64 {
        self.knowledge_tokens
            .get(&paper_id)
            .map(KnowledgeWallet::total)
            .unwrap_or(0.0)
    }

    /// Rosetta held in any form by this wallet.
    pub fn tracked_value(&self) -> f64 {
        self.amount
            + self.jury_stake
            + self.paper_stakes.values().map(|s| s.amount).sum::<f64>()
    }
}
