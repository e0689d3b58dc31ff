use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::wallet::types::{Address, PaperId};

/// Verdicts, declared from least to most severe so `Ord` breaks ties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TribunalOutcome {
    NoChanges,
    Validation,
    Mistake,
    Fraud,
    MaliciousActivity,
}

impl TribunalOutcome {
    /// Outcomes that find the paper at fault.
    pub fn is_charge(self) -> bool {
        matches!(
            self,
            TribunalOutcome::Mistake | TribunalOutcome::Fraud | TribunalOutcome::MaliciousActivity
        )
    }

    /// Whether a juror who voted `self` sided with the `winner`.
    pub fn sides_with(self, winner: TribunalOutcome) -> bool {
        if winner.is_charge() {
            self.is_charge()
        } else {
            self == winner
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TribunalState {
    PreJury,
    Settlement,
    JuryDeliberation,
    ClosedWithAppealOption,
    Closed,
    Appealed,
}

impl TribunalState {
    /// States in which the trial still blocks a new one on the same paper.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            TribunalState::PreJury
                | TribunalState::JuryDeliberation
                | TribunalState::ClosedWithAppealOption
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum TrialKind {
    #[serde(rename_all = "camelCase")]
    Falsification {
        prosecution_evidence: Vec<String>,
        defense_evidence: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Validation { validating_paper_id: PaperId },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trial {
    pub paper_id: PaperId,
    pub kind: TrialKind,
    pub validator: Address,
    /// Set when this record was opened by an appeal
    pub appellant: Option<Address>,
    pub validation_stake: f64,
    pub juror_fees: f64,
    /// Publication stake taken from the staking wallet by a charge verdict
    pub seized_stake: f64,
    /// Unlock time the seized stake had, restored if it is handed back
    pub seized_stake_until: u64,
    /// Extra falsification pool taken by a charge verdict
    pub seized_pool: f64,
    pub trial_size: u32,
    pub settlement_votes: BTreeMap<Address, TribunalOutcome>,
    pub settlement_documents: BTreeMap<Address, String>,
    pub juror_votes: BTreeMap<Address, TribunalOutcome>,
    pub juror_documents: BTreeMap<Address, String>,
    pub current_jurors: Vec<Address>,
    pub current_state: TribunalState,
    pub outcome: Option<TribunalOutcome>,
    pub settlement_until: u64,
    pub jury_until: u64,
    pub appeal_until: u64,
}

impl Trial {
    pub fn is_falsification(&self) -> bool {
        matches!(self.kind, TrialKind::Falsification { .. })
    }

    /// Rosetta escrowed by this record.
    pub fn held_value(&self) -> f64 {
        self.validation_stake + self.juror_fees + self.seized_stake + self.seized_pool
    }

    pub fn is_juror(&self, address: &str) -> bool {
        self.current_jurors.iter().any(|j| j == address)
    }

    pub fn all_jurors_voted(&self) -> bool {
        self.current_jurors
            .iter()
            .all(|j| self.juror_votes.contains_key(j))
    }
}
