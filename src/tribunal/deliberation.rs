//! Tallying and the value movements each verdict triggers.

use std::collections::BTreeMap;
use log::info;
use crate::config::NetworkConfig;
use crate::error::{LedgerError, Result};
use crate::paper::REPLICATION_ROUNDS;
use crate::state::NetworkState;
use crate::tribunal::types::{TribunalOutcome, TribunalState};
use crate::wallet::{Address, PaperId, WalletOperations};

/// Outcome with the most votes; ties go to the least severe outcome.
pub fn winning_outcome(votes: &BTreeMap<Address, TribunalOutcome>) -> Option<TribunalOutcome> {
    let mut counts: BTreeMap<TribunalOutcome, usize> = BTreeMap::new();
    for outcome in votes.values() {
        *counts.entry(*outcome).or_default() += 1;
    }
    let mut winner: Option<(TribunalOutcome, usize)> = None;
    for (outcome, count) in counts {
        if winner.map_or(true, |(_, best)| count > best) {
            winner = Some((outcome, count));
        }
    }
    winner.map(|(outcome, _)| outcome)
}

/// Splits seated jurors into (majority, minority). Jurors who never voted are minority.
pub fn split_jurors(
    jurors: &[Address],
    votes: &BTreeMap<Address, TribunalOutcome>,
    winner: TribunalOutcome,
) -> (Vec<Address>, Vec<Address>) {
    jurors
        .iter()
        .cloned()
        .partition(|juror| votes.get(juror).map_or(false, |vote| vote.sides_with(winner)))
}

/// Pays the majority the juror fees plus whatever the minority forfeits.
pub(crate) fn settle_jurors(state: &mut NetworkState, paper_id: PaperId, winner: TribunalOutcome) -> Result<()> {
    let trial = state.trial(paper_id)?;
    let (majority, minority) = split_jurors(&trial.current_jurors, &trial.juror_votes, winner);
    if majority.is_empty() {
        return Err(LedgerError::InvariantViolation(format!(
            "no juror sided with the {:?} verdict on paper {}",
            winner, paper_id
        )));
    }

    let penalty = state.config.jury_minority_penalty;
    let mut forfeited = 0.0;
    for juror in &minority {
        let wallet = state.wallet_or_default(juror);
        let taken = penalty.min(wallet.jury_stake);
        wallet.jury_stake -= taken;
        forfeited += taken;
        let drained = wallet.jury_stake <= 0.0;
        if drained {
            wallet.jury_stake = 0.0;
            state.jury_pool.retain(|member| member != juror);
            info!("{} lost the last of its jury stake and left the pool", juror);
        }
    }

    let fees = std::mem::take(&mut state.trial_mut(paper_id)?.juror_fees);
    let share = (fees + forfeited) / majority.len() as f64;
    for juror in &majority {
        state.credit(juror, share);
    }
    info!(
        "Jurors of paper {}: {} paid {} each, {} penalised ({} forfeited)",
        paper_id,
        majority.len(),
        share,
        minority.len(),
        forfeited
    );
    Ok(())
}

/// Applies a unanimous settlement and closes the trial in `Settlement`.
pub(crate) fn apply_settlement(state: &mut NetworkState, paper_id: PaperId, outcome: TribunalOutcome) -> Result<()> {
    let refund_rate = state.config.settlement_refund_rate;
    let bounty_rate = state.config.settlement_bounty_rate;
    let staking_wallet = state.paper(paper_id)?.staking_wallet.clone();

    let trial = state.trial_mut(paper_id)?;
    let validator = trial.validator.clone();
    let stake = std::mem::take(&mut trial.validation_stake);
    let fees = std::mem::take(&mut trial.juror_fees);
    trial.outcome = Some(outcome);
    trial.current_state = TribunalState::Settlement;

    if outcome.is_charge() {
        let mut bounty = 0.0;
        if let Some(paper_stake) = state
            .wallets
            .get_mut(&staking_wallet)
            .and_then(|w| w.paper_stakes.get_mut(&paper_id))
        {
            let taken = paper_stake.amount * bounty_rate;
            paper_stake.amount -= taken;
            bounty += taken;
        }
        let paper = state.paper_mut(paper_id)?;
        let from_pool = paper.extra_falsification_pool * bounty_rate;
        paper.extra_falsification_pool -= from_pool;
        paper.invalidated = true;
        bounty += from_pool;

        state.credit(&validator, stake + fees + bounty);
        info!(
            "Paper {} settled as {:?}: invalidated, validator {} receives bounty {}",
            paper_id, outcome, validator, bounty
        );
    } else {
        let refund = stake * refund_rate;
        let burned = stake - refund;
        state.credit(&validator, fees + refund);
        state.burn(burned);
        info!(
            "Paper {} settled without changes: validator {} refunded {}, {} burned",
            paper_id,
            validator,
            fees + refund,
            burned
        );
    }
    Ok(())
}

/// Applies the jury's verdict once juror rewards are paid.
pub(crate) fn apply_jury_verdict(state: &mut NetworkState, paper_id: PaperId, winner: TribunalOutcome, now: u64) -> Result<()> {
    let appeal_until = NetworkConfig::deadline(now, state.config.appeal_duration)?;
    state.trial_mut(paper_id)?.outcome = Some(winner);

    match winner {
        outcome if outcome.is_charge() => {
            seize_paper_value(state, paper_id)?;
            let trial = state.trial_mut(paper_id)?;
            trial.current_state = TribunalState::ClosedWithAppealOption;
            trial.appeal_until = appeal_until;
            info!(
                "Jury found paper {} at fault ({:?}); appeals accepted until {}",
                paper_id, outcome, trial.appeal_until
            );
        }
        TribunalOutcome::Validation => {
            let trial = state.trial_mut(paper_id)?;
            let validator = trial.validator.clone();
            let stake = std::mem::take(&mut trial.validation_stake);
            trial.current_state = TribunalState::Closed;
            state.credit(&validator, stake);
            pay_replication_round(state, paper_id, &validator, now)?;
            return_seized_value(state, paper_id)?;
        }
        _ => {
            let trial = state.trial_mut(paper_id)?;
            let burned = std::mem::take(&mut trial.validation_stake);
            trial.current_state = TribunalState::Closed;
            state.burn(burned);
            return_seized_value(state, paper_id)?;
            info!("Jury upheld paper {}; validator stake of {} burned", paper_id, burned);
        }
    }
    Ok(())
}

/// Closes a deliberation in which no juror voted.
///
/// Fees go back to whoever paid them. On an appeal the earlier verdict stands.
pub(crate) fn refund_unheard(state: &mut NetworkState, paper_id: PaperId) -> Result<()> {
    let trial = state.trial_mut(paper_id)?;
    let validator = trial.validator.clone();
    let fee_payer = trial.appellant.clone().unwrap_or_else(|| validator.clone());
    let fees = std::mem::take(&mut trial.juror_fees);
    let mut validator_payout = std::mem::take(&mut trial.validation_stake);
    if trial.appellant.is_some() {
        validator_payout += std::mem::take(&mut trial.seized_stake) + std::mem::take(&mut trial.seized_pool);
    } else {
        trial.outcome = Some(TribunalOutcome::NoChanges);
    }
    trial.current_state = TribunalState::Closed;

    state.credit(&fee_payer, fees);
    state.credit(&validator, validator_payout);
    info!(
        "No juror voted on paper {}: {} refunded to {}, {} to validator {}",
        paper_id, fees, fee_payer, validator_payout, validator
    );
    Ok(())
}

fn seize_paper_value(state: &mut NetworkState, paper_id: PaperId) -> Result<()> {
    let staking_wallet = state.paper(paper_id)?.staking_wallet.clone();
    let stake = state
        .wallets
        .get_mut(&staking_wallet)
        .and_then(|w| w.paper_stakes.remove(&paper_id))
        .unwrap_or_default();

    let paper = state.paper_mut(paper_id)?;
    paper.invalidated = true;
    let pool = std::mem::take(&mut paper.extra_falsification_pool);

    let trial = state.trial_mut(paper_id)?;
    trial.seized_stake += stake.amount;
    trial.seized_stake_until = trial.seized_stake_until.max(stake.until);
    trial.seized_pool += pool;
    Ok(())
}

fn return_seized_value(state: &mut NetworkState, paper_id: PaperId) -> Result<()> {
    let trial = state.trial_mut(paper_id)?;
    let stake = std::mem::take(&mut trial.seized_stake);
    let until = trial.seized_stake_until;
    let pool = std::mem::take(&mut trial.seized_pool);
    if stake == 0.0 && pool == 0.0 {
        return Ok(());
    }

    let staking_wallet = state.paper(paper_id)?.staking_wallet.clone();
    if stake > 0.0 {
        let paper_stake = state
            .wallet_or_default(&staking_wallet)
            .paper_stakes
            .entry(paper_id)
            .or_default();
        paper_stake.amount += stake;
        paper_stake.until = paper_stake.until.max(until);
    }
    state.paper_mut(paper_id)?.extra_falsification_pool += pool;
    info!(
        "Returned seized stake {} to {} and pool {} to paper {}",
        stake, staking_wallet, pool, paper_id
    );
    Ok(())
}

fn pay_replication_round(state: &mut NetworkState, paper_id: PaperId, validator: &str, now: u64) -> Result<()> {
    let paper = state.paper_mut(paper_id)?;
    if paper.replication_count >= REPLICATION_ROUNDS {
        info!("Paper {} has no replication rounds left to pay", paper_id);
        return Ok(());
    }
    let round = paper.replication_count;
    let rosetta = std::mem::take(&mut paper.replication_rosetta_pool[round]);
    let tokens = paper.replication_round_tokens();
    paper.replication_count += 1;

    state.credit(validator, rosetta);
    let knowledge = state
        .wallet_or_default(validator)
        .knowledge_tokens
        .entry(paper_id)
        .or_default();
    knowledge.settle(now);
    knowledge.amount += tokens;
    info!(
        "Replication round {} of paper {} validated: {} receives {} rosetta and {} tokens",
        round, paper_id, validator, rosetta, tokens
    );
    Ok(())
}
