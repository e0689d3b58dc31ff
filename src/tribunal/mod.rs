//! Dispute lifecycle: settlement, jury deliberation, appeal and finalisation.
//!
//! ```text
//! PreJury ──unanimous──────────────▶ Settlement
//!    │
//!    └─deadline─▶ JuryDeliberation ──NoChanges/Validation──▶ Closed
//!                        │
//!                        └─charge─▶ ClosedWithAppealOption ──finalize──▶ Closed
//!                                          │
//!                                          └─appeal─▶ Appealed (archived) + fresh JuryDeliberation
//! ```

pub mod deliberation;
pub mod selection;
pub mod types;

#[cfg(test)]
mod tests;

pub use types::{Trial, TrialKind, TribunalOutcome, TribunalState};

use std::collections::BTreeMap;
use log::{debug, info};
use crate::config::NetworkConfig;
use crate::error::{LedgerError, Result};
use crate::host::Host;
use crate::roles::{require_not_banned, require_tiered_role};
use crate::state::NetworkState;
use crate::wallet::{Address, PaperId, WalletOperations};
use selection::{draw_jury, impartial_candidates};

pub trait TribunalOperations {
    /// Opens a trial on `paper_id`, escrowing `stake` plus the initial jury fees.
    fn create_tribunal(&mut self, caller: &str, paper_id: PaperId, stake: f64, kind: TrialKind, now: u64) -> Result<()>;

    fn create_falsification_tribunal(&mut self, caller: &str, paper_id: PaperId, evidence_tx: &str, host: &dyn Host) -> Result<()>;

    /// Challenges `paper_id` with a replication published as `validating_paper_id`.
    fn submit_paper_as_validation(&mut self, caller: &str, paper_id: PaperId, validating_paper_id: PaperId, now: u64) -> Result<()>;

    fn submit_evidence(&mut self, caller: &str, paper_id: PaperId, evidence_tx: &str, host: &dyn Host) -> Result<()>;

    fn vote_on_tribunal_settlement(&mut self, caller: &str, paper_id: PaperId, outcome: TribunalOutcome, explanation: String, host: &dyn Host) -> Result<()>;

    /// Resolves a unanimous settlement, or convenes a jury once the deadline passed.
    fn complete_settlement(&mut self, caller: &str, paper_id: PaperId, host: &dyn Host) -> Result<()>;

    /// Seats up to `count` impartial jurors on the trial.
    fn create_jury(&mut self, caller: &str, paper_id: PaperId, count: usize, host: &dyn Host) -> Result<Vec<Address>>;

    fn vote_as_juror(&mut self, caller: &str, paper_id: PaperId, outcome: TribunalOutcome, explanation: String, now: u64) -> Result<()>;

    /// Tallies the jury once every juror voted or the deadline passed.
    fn complete_juror_deliberation(&mut self, caller: &str, paper_id: PaperId, now: u64) -> Result<()>;

    fn appeal_tribunal(&mut self, caller: &str, paper_id: PaperId, host: &dyn Host) -> Result<()>;

    /// Pays out a charge verdict whose appeal window has lapsed.
    fn finalize_tribunal(&mut self, caller: &str, paper_id: PaperId, now: u64) -> Result<()>;
}

/// Authors of the paper followed by the validator, without duplicates.
fn trial_parties(state: &NetworkState, paper_id: PaperId) -> Result<Vec<Address>> {
    let trial = state.trial(paper_id)?;
    let mut parties = state.paper(paper_id)?.authors.clone();
    if !parties.contains(&trial.validator) {
        parties.push(trial.validator.clone());
    }
    Ok(parties)
}

fn jury_nonce(state: &NetworkState, paper_id: PaperId) -> String {
    format!("jury:{}:{}", paper_id, state.past_trials.len())
}

/// Runs `step` on a copy of the snapshot and keeps the result only if it succeeds.
fn attempt<F>(state: &mut NetworkState, what: &str, step: F)
where
    F: FnOnce(&mut NetworkState) -> Result<()>,
{
    let mut working = state.clone();
    match step(&mut working) {
        Ok(()) => *state = working,
        Err(err) => debug!("{} deferred: {}", what, err),
    }
}

impl TribunalOperations for NetworkState {
    fn create_tribunal(&mut self, caller: &str, paper_id: PaperId, stake: f64, kind: TrialKind, now: u64) -> Result<()> {
        if self.paper(paper_id)?.invalidated {
            return Err(LedgerError::StateConflict(format!("paper {} is already invalidated", paper_id)));
        }
        if let Some(existing) = self.trials.get(&paper_id) {
            if existing.current_state.is_open() {
                return Err(LedgerError::StateConflict(format!(
                    "paper {} already has a tribunal in {:?}",
                    paper_id, existing.current_state
                )));
            }
        }
        let available = self.wallet(caller)?.amount;
        require_not_banned(self, caller)?;
        require_tiered_role(self, caller, self.roles.participant)?;
        if !stake.is_finite() || stake < 0.0 {
            return Err(LedgerError::InvalidAmount(stake));
        }
        let trial_size = self.config.initial_jury;
        let fees = self.config.initial_jury_fees();
        let cost = stake + fees;
        if available < cost {
            return Err(LedgerError::insufficient(caller, cost, available));
        }
        let settlement_until = NetworkConfig::deadline(now, self.config.settlement_duration)?;

        self.debit(caller, cost)?;
        if let Some(previous) = self.trials.remove(&paper_id) {
            self.past_trials.push(previous);
        }
        self.trials.insert(
            paper_id,
            Trial {
                paper_id,
                kind,
                validator: caller.to_string(),
                appellant: None,
                validation_stake: stake,
                juror_fees: fees,
                seized_stake: 0.0,
                seized_stake_until: 0,
                seized_pool: 0.0,
                trial_size,
                settlement_votes: BTreeMap::new(),
                settlement_documents: BTreeMap::new(),
                juror_votes: BTreeMap::new(),
                juror_documents: BTreeMap::new(),
                current_jurors: Vec::new(),
                current_state: TribunalState::PreJury,
                outcome: None,
                settlement_until,
                jury_until: 0,
                appeal_until: 0,
            },
        );
        info!(
            "Tribunal opened on paper {} by {} (stake {}, fees {})",
            paper_id, caller, stake, fees
        );
        Ok(())
    }

    fn create_falsification_tribunal(&mut self, caller: &str, paper_id: PaperId, evidence_tx: &str, host: &dyn Host) -> Result<()> {
        if host.fetch(evidence_tx).is_none() {
            return Err(LedgerError::NotFound(format!("evidence {}", evidence_tx)));
        }
        let kind = TrialKind::Falsification {
            prosecution_evidence: vec![evidence_tx.to_string()],
            defense_evidence: Vec::new(),
        };
        self.create_tribunal(caller, paper_id, self.config.falsification_stake, kind, host.now())
    }

    fn submit_paper_as_validation(&mut self, caller: &str, paper_id: PaperId, validating_paper_id: PaperId, now: u64) -> Result<()> {
        if paper_id == validating_paper_id {
            return Err(LedgerError::Validation("a paper cannot validate itself".into()));
        }
        let validating = self.paper(validating_paper_id)?;
        if !validating.is_author(caller) {
            return Err(LedgerError::Unauthorized(format!(
                "{} is not an author of paper {}",
                caller, validating_paper_id
            )));
        }
        if validating.invalidated {
            return Err(LedgerError::StateConflict(format!(
                "paper {} is invalidated and cannot validate others",
                validating_paper_id
            )));
        }
        let kind = TrialKind::Validation { validating_paper_id };
        self.create_tribunal(caller, paper_id, self.config.validation_stake, kind, now)
    }

    fn submit_evidence(&mut self, caller: &str, paper_id: PaperId, evidence_tx: &str, host: &dyn Host) -> Result<()> {
        let is_author = self.paper(paper_id)?.is_author(caller);
        let trial = self.trial(paper_id)?;
        if !matches!(
            trial.current_state,
            TribunalState::PreJury | TribunalState::JuryDeliberation
        ) {
            return Err(LedgerError::StateConflict(format!(
                "tribunal on paper {} no longer accepts evidence",
                paper_id
            )));
        }
        let is_validator = trial.validator == caller;
        if !is_validator && !is_author {
            return Err(LedgerError::Unauthorized(format!(
                "{} is not a party to the tribunal on paper {}",
                caller, paper_id
            )));
        }
        if host.fetch(evidence_tx).is_none() {
            return Err(LedgerError::NotFound(format!("evidence {}", evidence_tx)));
        }

        match &mut self.trial_mut(paper_id)?.kind {
            TrialKind::Falsification {
                prosecution_evidence,
                defense_evidence,
            } => {
                let side = if is_validator { prosecution_evidence } else { defense_evidence };
                if !side.iter().any(|e| e == evidence_tx) {
                    side.push(evidence_tx.to_string());
                }
            }
            TrialKind::Validation { .. } => {
                return Err(LedgerError::Validation(
                    "evidence is only collected for falsification tribunals".into(),
                ));
            }
        }
        info!("{} submitted evidence {} on paper {}", caller, evidence_tx, paper_id);
        Ok(())
    }

    fn vote_on_tribunal_settlement(&mut self, caller: &str, paper_id: PaperId, outcome: TribunalOutcome, explanation: String, host: &dyn Host) -> Result<()> {
        if outcome == TribunalOutcome::Validation {
            return Err(LedgerError::Validation(
                "Validation is decided by a jury, not by settlement".into(),
            ));
        }
        let parties = trial_parties(self, paper_id)?;
        if self.trial(paper_id)?.current_state != TribunalState::PreJury {
            return Err(LedgerError::StateConflict(format!(
                "settlement on paper {} is over",
                paper_id
            )));
        }
        if !parties.iter().any(|p| p == caller) {
            return Err(LedgerError::Unauthorized(format!(
                "{} may not vote on the settlement of paper {}",
                caller, paper_id
            )));
        }

        let trial = self.trial_mut(paper_id)?;
        trial.settlement_votes.insert(caller.to_string(), outcome);
        trial.settlement_documents.insert(caller.to_string(), explanation);
        info!("{} voted {:?} in the settlement of paper {}", caller, outcome, paper_id);

        attempt(self, "settlement", |state| state.complete_settlement(caller, paper_id, host));
        Ok(())
    }

    fn complete_settlement(&mut self, caller: &str, paper_id: PaperId, host: &dyn Host) -> Result<()> {
        let now = host.now();
        let parties = trial_parties(self, paper_id)?;
        let trial = self.trial(paper_id)?;
        if trial.current_state != TribunalState::PreJury {
            return Err(LedgerError::StateConflict(format!(
                "tribunal on paper {} is not in settlement",
                paper_id
            )));
        }
        if !parties.iter().any(|p| p == caller) {
            return Err(LedgerError::Unauthorized(format!(
                "{} is not a party to the settlement of paper {}",
                caller, paper_id
            )));
        }

        let first = parties.first().and_then(|p| trial.settlement_votes.get(p)).copied();
        let unanimous = first.filter(|outcome| {
            parties
                .iter()
                .all(|p| trial.settlement_votes.get(p) == Some(outcome))
        });
        if let Some(outcome) = unanimous {
            return deliberation::apply_settlement(self, paper_id, outcome);
        }

        if now <= trial.settlement_until {
            return Err(LedgerError::StateConflict(format!(
                "settlement on paper {} is not yet resolvable ({} of {} votes, deadline {})",
                paper_id,
                trial.settlement_votes.len(),
                parties.len(),
                trial.settlement_until
            )));
        }

        let size = trial.trial_size as usize;
        let jury_until = NetworkConfig::deadline(now, self.config.jury_duration)?;
        self.create_jury(caller, paper_id, size, host)?;
        let trial = self.trial_mut(paper_id)?;
        trial.current_state = TribunalState::JuryDeliberation;
        trial.jury_until = jury_until;
        info!(
            "Settlement on paper {} failed; jury of {} deliberates until {}",
            paper_id,
            trial.current_jurors.len(),
            jury_until
        );
        Ok(())
    }

    fn create_jury(&mut self, caller: &str, paper_id: PaperId, count: usize, host: &dyn Host) -> Result<Vec<Address>> {
        let mut parties = trial_parties(self, paper_id)?;
        parties.extend(self.trial(paper_id)?.appellant.clone());
        let candidates = impartial_candidates(self, paper_id, &parties);
        let nonce = jury_nonce(self, paper_id);
        let jurors = draw_jury(candidates, count, host, caller, &nonce)?;
        debug!("Drew jury {:?} for paper {} with nonce {}", jurors, paper_id, nonce);

        let trial = self.trial_mut(paper_id)?;
        trial.current_jurors = jurors.clone();
        trial.juror_votes.clear();
        trial.juror_documents.clear();
        Ok(jurors)
    }

    fn vote_as_juror(&mut self, caller: &str, paper_id: PaperId, outcome: TribunalOutcome, explanation: String, now: u64) -> Result<()> {
        let trial = self.trial(paper_id)?;
        if trial.current_state != TribunalState::JuryDeliberation {
            return Err(LedgerError::StateConflict(format!(
                "no jury is deliberating on paper {}",
                paper_id
            )));
        }
        if !trial.is_juror(caller) {
            return Err(LedgerError::Unauthorized(format!(
                "{} is not a juror on paper {}",
                caller, paper_id
            )));
        }
        if now > trial.jury_until {
            return Err(LedgerError::StateConflict(format!(
                "jury on paper {} stopped accepting votes at {}",
                paper_id, trial.jury_until
            )));
        }
        if outcome == TribunalOutcome::Validation && trial.is_falsification() {
            return Err(LedgerError::Validation(
                "Validation is not a verdict of a falsification tribunal".into(),
            ));
        }

        let trial = self.trial_mut(paper_id)?;
        trial.juror_votes.insert(caller.to_string(), outcome);
        trial.juror_documents.insert(caller.to_string(), explanation);
        info!("Juror {} voted {:?} on paper {}", caller, outcome, paper_id);

        attempt(self, "deliberation", |state| {
            state.complete_juror_deliberation(caller, paper_id, now)
        });
        Ok(())
    }

    fn complete_juror_deliberation(&mut self, caller: &str, paper_id: PaperId, now: u64) -> Result<()> {
        let trial = self.trial(paper_id)?;
        if trial.current_state != TribunalState::JuryDeliberation {
            return Err(LedgerError::StateConflict(format!(
                "no jury is deliberating on paper {}",
                paper_id
            )));
        }
        if !trial.all_jurors_voted() && now <= trial.jury_until {
            return Err(LedgerError::StateConflict(format!(
                "jury on paper {} is still deliberating ({} of {} votes, deadline {})",
                paper_id,
                trial.juror_votes.len(),
                trial.current_jurors.len(),
                trial.jury_until
            )));
        }

        let Some(winner) = deliberation::winning_outcome(&trial.juror_votes) else {
            return deliberation::refund_unheard(self, paper_id);
        };
        deliberation::settle_jurors(self, paper_id, winner)?;
        deliberation::apply_jury_verdict(self, paper_id, winner, now)?;
        info!("Deliberation on paper {} closed by {} with {:?}", paper_id, caller, winner);
        Ok(())
    }

    fn appeal_tribunal(&mut self, caller: &str, paper_id: PaperId, host: &dyn Host) -> Result<()> {
        let now = host.now();
        let trial = self.trial(paper_id)?;
        if trial.current_state != TribunalState::ClosedWithAppealOption {
            return Err(LedgerError::StateConflict(format!(
                "tribunal on paper {} cannot be appealed",
                paper_id
            )));
        }
        if now > trial.appeal_until {
            return Err(LedgerError::StateConflict(format!(
                "appeal window on paper {} closed at {}",
                paper_id, trial.appeal_until
            )));
        }
        if !self.paper(paper_id)?.is_author(caller) {
            return Err(LedgerError::Unauthorized(format!(
                "only authors of paper {} may appeal",
                paper_id
            )));
        }
        require_not_banned(self, caller)?;
        let trial_size = trial
            .trial_size
            .checked_mul(2)
            .and_then(|size| size.checked_add(1))
            .ok_or_else(|| LedgerError::Validation(format!("jury for paper {} cannot grow further", paper_id)))?;
        let fees = self.config.jury_duty_fee * f64::from(trial_size);
        let available = self.wallet(caller)?.amount;
        if available < fees {
            return Err(LedgerError::insufficient(caller, fees, available));
        }

        let mut parties = trial_parties(self, paper_id)?;
        parties.push(caller.to_string());
        let candidates = impartial_candidates(self, paper_id, &parties);
        let nonce = format!("appeal:{}:{}", paper_id, self.past_trials.len());
        let jurors = draw_jury(candidates, trial_size as usize, host, caller, &nonce)?;

        let jury_until = NetworkConfig::deadline(now, self.config.jury_duration)?;
        self.debit(caller, fees)?;
        let mut appealed = self
            .trials
            .remove(&paper_id)
            .ok_or_else(|| LedgerError::InvariantViolation("appealed trial vanished".into()))?;
        let fresh = Trial {
            paper_id,
            kind: appealed.kind.clone(),
            validator: appealed.validator.clone(),
            appellant: Some(caller.to_string()),
            validation_stake: std::mem::take(&mut appealed.validation_stake),
            juror_fees: fees,
            seized_stake: std::mem::take(&mut appealed.seized_stake),
            seized_stake_until: appealed.seized_stake_until,
            seized_pool: std::mem::take(&mut appealed.seized_pool),
            trial_size,
            settlement_votes: BTreeMap::new(),
            settlement_documents: BTreeMap::new(),
            juror_votes: BTreeMap::new(),
            juror_documents: BTreeMap::new(),
            current_jurors: jurors,
            current_state: TribunalState::JuryDeliberation,
            outcome: appealed.outcome,
            settlement_until: appealed.settlement_until,
            jury_until,
            appeal_until: 0,
        };
        appealed.current_state = TribunalState::Appealed;
        self.past_trials.push(appealed);
        self.trials.insert(paper_id, fresh);

        info!(
            "{} appealed the verdict on paper {}; {} jurors deliberate until {}",
            caller, paper_id, trial_size, jury_until
        );
        Ok(())
    }

    fn finalize_tribunal(&mut self, caller: &str, paper_id: PaperId, now: u64) -> Result<()> {
        let trial = self.trial(paper_id)?;
        if trial.current_state != TribunalState::ClosedWithAppealOption {
            return Err(LedgerError::StateConflict(format!(
                "tribunal on paper {} has nothing to finalize",
                paper_id
            )));
        }
        if now <= trial.appeal_until {
            return Err(LedgerError::StateConflict(format!(
                "tribunal on paper {} is open to appeal until {}",
                paper_id, trial.appeal_until
            )));
        }

        let trial = self.trial_mut(paper_id)?;
        let validator = trial.validator.clone();
        let payout = std::mem::take(&mut trial.validation_stake)
            + std::mem::take(&mut trial.juror_fees)
            + std::mem::take(&mut trial.seized_stake)
            + std::mem::take(&mut trial.seized_pool);
        trial.current_state = TribunalState::Closed;
        self.wallet_or_default(&validator).amount += payout;
        info!(
            "Tribunal on paper {} finalized by {}: validator {} receives {}",
            paper_id, caller, validator, payout
        );
        Ok(())
    }
}
