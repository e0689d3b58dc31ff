use pretty_assertions::assert_eq;
use super::open_falsification;
use crate::error::LedgerError;
use crate::jury::JuryPoolOperations;
use crate::paper::{PaperOperations, REPLICATION_ROUNDS};
use crate::testing::{ctx, paper_request, TribunalFixture};
use crate::tribunal::{TribunalOperations, TribunalOutcome, TribunalState};

/// Fails settlement and seats a jury at time 1200, returning the seated jurors.
fn convene_jury(fixture: &mut TribunalFixture) -> Vec<String> {
    open_falsification(fixture);
    fixture.state.complete_settlement("validator", 0, &ctx(1_200)).unwrap();
    fixture.state.trials[&0].current_jurors.clone()
}

fn vote_all(fixture: &mut TribunalFixture, jurors: &[String], outcomes: &[TribunalOutcome], now: u64) {
    for (juror, outcome) in jurors.iter().zip(outcomes) {
        fixture
            .state
            .vote_as_juror(juror, 0, *outcome, "reasons".into(), now)
            .unwrap();
    }
}

#[test]
fn test_jury_draw_is_deterministic() {
    let mut first = TribunalFixture::new(12);
    let mut second = TribunalFixture::new(12);
    let a = convene_jury(&mut first);
    let b = convene_jury(&mut second);
    assert_eq!(a, b);
    assert_eq!(a.len(), 3);
    assert_eq!(first.state.digest().unwrap(), second.state.digest().unwrap());
}

#[test]
fn test_undersized_pool_fails_jury_formation() {
    let mut fixture = TribunalFixture::new(2);
    open_falsification(&mut fixture);
    let before = fixture.state.clone();
    assert!(matches!(
        fixture.state.complete_settlement("validator", 0, &ctx(1_200)),
        Err(LedgerError::JuryFormation { available: 2, required: 3 })
    ));
    assert_eq!(fixture.state, before);
}

#[test]
fn test_outsider_cannot_convene_jury() {
    let mut fixture = TribunalFixture::new(5);
    open_falsification(&mut fixture);
    let before = fixture.state.clone();
    for outsider in ["total-stranger", "juror0"] {
        assert!(matches!(
            fixture.state.complete_settlement(outsider, 0, &ctx(1_200)),
            Err(LedgerError::Unauthorized(_))
        ));
    }
    assert_eq!(fixture.state, before);
    fixture.state.complete_settlement("coauthor", 0, &ctx(1_200)).unwrap();
    assert_eq!(fixture.state.trials[&0].current_state, TribunalState::JuryDeliberation);
}

#[test]
fn test_token_holders_are_not_impartial() {
    let mut fixture = TribunalFixture::new(4);
    fixture.state.wallets.get_mut("juror1").unwrap().knowledge_tokens.insert(
        0,
        crate::wallet::KnowledgeWallet::liquid(1.0),
    );
    let jurors = convene_jury(&mut fixture);
    assert_eq!(jurors.len(), 3);
    assert!(!jurors.contains(&"juror1".to_string()));
}

#[test]
fn test_zero_votes_refund_validator() {
    let mut fixture = TribunalFixture::new(5);
    convene_jury(&mut fixture);
    let total = fixture.state.total_rosetta;

    assert!(matches!(
        fixture.state.complete_juror_deliberation("anyone", 0, 2_200),
        Err(LedgerError::StateConflict(_))
    ));
    fixture.state.complete_juror_deliberation("anyone", 0, 2_201).unwrap();

    let trial = &fixture.state.trials[&0];
    assert_eq!(trial.current_state, TribunalState::Closed);
    assert_eq!(trial.outcome, Some(TribunalOutcome::NoChanges));
    assert_eq!(fixture.state.wallets["validator"].amount, 1000.0);
    assert_eq!(fixture.state.total_rosetta, total);
    assert!(fixture.state.check_invariants().is_ok());
}

#[test]
fn test_juror_vote_guards() {
    let mut fixture = TribunalFixture::new(5);
    let jurors = convene_jury(&mut fixture);
    let outsider = fixture
        .jurors
        .iter()
        .find(|j| !jurors.contains(*j))
        .cloned()
        .unwrap();

    assert!(matches!(
        fixture.state.vote_as_juror(&outsider, 0, TribunalOutcome::Fraud, "".into(), 1_300),
        Err(LedgerError::Unauthorized(_))
    ));
    assert!(matches!(
        fixture.state.vote_as_juror(&jurors[0], 0, TribunalOutcome::Validation, "".into(), 1_300),
        Err(LedgerError::Validation(_))
    ));
    assert!(matches!(
        fixture.state.vote_as_juror(&jurors[0], 0, TribunalOutcome::Fraud, "".into(), 2_201),
        Err(LedgerError::StateConflict(_))
    ));
    assert!(matches!(
        fixture.state.leave_jury_pool(&jurors[0]),
        Err(LedgerError::StateConflict(_))
    ));
    fixture.state.leave_jury_pool(&outsider).unwrap();
}

#[test]
fn test_no_changes_verdict_burns_validator_stake() {
    let mut fixture = TribunalFixture::new(5);
    let jurors = convene_jury(&mut fixture);
    let total = fixture.state.total_rosetta;
    use TribunalOutcome::*;
    vote_all(&mut fixture, &jurors, &[NoChanges, NoChanges, Fraud], 1_300);

    let state = &fixture.state;
    let trial = &state.trials[&0];
    assert_eq!(trial.current_state, TribunalState::Closed);
    assert_eq!(trial.outcome, Some(NoChanges));
    assert!(!state.papers[&0].invalidated);
    assert_eq!(state.total_rosetta, total - 100.0);
    // Majority split 30 in fees and 20 forfeited by the minority.
    assert_eq!(state.wallets[&jurors[0]].amount, 425.0);
    assert_eq!(state.wallets[&jurors[1]].amount, 425.0);
    assert_eq!(state.wallets[&jurors[2]].amount, 400.0);
    assert_eq!(state.wallets[&jurors[2]].jury_stake, 80.0);
    assert!(state.check_invariants().is_ok());
}

#[test]
fn test_drained_minority_juror_leaves_pool() {
    let mut fixture = TribunalFixture::new(5);
    fixture.state.config.jury_minority_penalty = 150.0;
    let jurors = convene_jury(&mut fixture);
    use TribunalOutcome::*;
    vote_all(&mut fixture, &jurors, &[Mistake, Mistake, NoChanges], 1_300);

    let state = &fixture.state;
    assert_eq!(state.trials[&0].outcome, Some(Mistake));
    assert_eq!(state.wallets[&jurors[2]].jury_stake, 0.0);
    assert!(!state.in_jury_pool(&jurors[2]));
    assert_eq!(state.wallets[&jurors[0]].amount, 400.0 + 65.0);
    assert!(state.check_invariants().is_ok());
}

#[test]
fn test_charge_verdict_then_finalize() {
    let mut fixture = TribunalFixture::new(5);
    let jurors = convene_jury(&mut fixture);
    use TribunalOutcome::*;
    vote_all(&mut fixture, &jurors, &[Fraud, Fraud, NoChanges], 1_300);

    let trial = &fixture.state.trials[&0];
    assert_eq!(trial.current_state, TribunalState::ClosedWithAppealOption);
    assert_eq!(trial.appeal_until, 2_300);
    assert_eq!(trial.seized_stake, 50.0);
    assert!(fixture.state.papers[&0].invalidated);
    assert!(!fixture.state.wallets["author"].paper_stakes.contains_key(&0));
    assert!(fixture.state.check_invariants().is_ok());

    assert!(matches!(
        fixture.state.finalize_tribunal("validator", 0, 2_300),
        Err(LedgerError::StateConflict(_))
    ));
    fixture.state.finalize_tribunal("validator", 0, 2_301).unwrap();
    assert_eq!(fixture.state.trials[&0].current_state, TribunalState::Closed);
    assert_eq!(fixture.state.wallets["validator"].amount, 870.0 + 150.0);
    assert!(fixture.state.check_invariants().is_ok());

    // A closed tribunal no longer blocks a new one, but the paper is invalidated.
    assert!(matches!(
        fixture.state.create_tribunal("validator", 0, 100.0, crate::tribunal::TrialKind::Validation { validating_paper_id: 0 }, 2_400),
        Err(LedgerError::StateConflict(_))
    ));
}

#[test]
fn test_successful_appeal_returns_seized_stake() {
    let mut fixture = TribunalFixture::new(5);
    let jurors = convene_jury(&mut fixture);
    use TribunalOutcome::*;
    vote_all(&mut fixture, &jurors, &[Fraud, Fraud, NoChanges], 1_300);
    let total = fixture.state.total_rosetta;

    assert!(matches!(
        fixture.state.appeal_tribunal("validator", 0, &ctx(1_400)),
        Err(LedgerError::Unauthorized(_))
    ));
    assert!(matches!(
        fixture.state.appeal_tribunal("coauthor", 0, &ctx(2_301)),
        Err(LedgerError::StateConflict(_))
    ));
    fixture.state.appeal_tribunal("coauthor", 0, &ctx(1_400)).unwrap();

    assert_eq!(fixture.state.past_trials.len(), 1);
    assert_eq!(fixture.state.past_trials[0].current_state, TribunalState::Appealed);
    assert_eq!(fixture.state.past_trials[0].held_value(), 0.0);
    let appeal = fixture.state.trials[&0].clone();
    assert_eq!(appeal.current_state, TribunalState::JuryDeliberation);
    assert_eq!(appeal.trial_size, 7);
    assert_eq!(appeal.juror_fees, 70.0);
    assert_eq!(appeal.appellant.as_deref(), Some("coauthor"));
    assert_eq!(appeal.current_jurors.len(), 5);
    assert_eq!(fixture.state.wallets["coauthor"].amount, 930.0);
    assert!(fixture.state.check_invariants().is_ok());

    let outcomes = vec![NoChanges; appeal.current_jurors.len()];
    for (juror, outcome) in appeal.current_jurors.iter().zip(&outcomes) {
        fixture
            .state
            .vote_as_juror(juror, 0, *outcome, "".into(), 1_500)
            .unwrap();
    }

    let state = &fixture.state;
    assert_eq!(state.trials[&0].current_state, TribunalState::Closed);
    assert_eq!(state.trials[&0].outcome, Some(NoChanges));
    assert_eq!(state.wallets["author"].paper_stakes[&0].amount, 50.0);
    assert_eq!(state.wallets["author"].paper_stakes[&0].until, 5_000);
    assert!(state.papers[&0].invalidated);
    assert_eq!(state.total_rosetta, total - 100.0);
    assert!(state.check_invariants().is_ok());
}

#[test]
fn test_validation_verdict_pays_replication_round() {
    let mut fixture = TribunalFixture::new(5);
    let replication_id = fixture
        .state
        .publish_paper("admin", paper_request(&["admin"], &[1.0]), 50)
        .unwrap();
    fixture.state.volunteer_replication_donation("coauthor", 0, 60.0, 0).unwrap();
    fixture.state.submit_paper_as_validation("admin", 0, replication_id, 100).unwrap();
    fixture.state.complete_settlement("admin", 0, &ctx(1_200)).unwrap();
    let jurors = fixture.state.trials[&0].current_jurors.clone();
    vote_all(&mut fixture, &jurors, &[TribunalOutcome::Validation; 3], 1_300);

    let state = &fixture.state;
    let paper = &state.papers[&0];
    assert_eq!(state.trials[&0].current_state, TribunalState::Closed);
    assert_eq!(paper.replication_count, 1);
    assert_eq!(paper.replication_rosetta_pool[0], 0.0);
    // 1000 - 50 publication stake - 130 escrow + 100 refund + 60 pool.
    assert_eq!(state.wallets["admin"].amount, 980.0);
    let tokens = state.wallets["admin"].knowledge_tokens[&0].amount;
    assert!((tokens - 100.0 / REPLICATION_ROUNDS as f64).abs() < 1e-9);
    assert!(state.check_invariants().is_ok());
}

#[test]
fn test_unheard_appeal_refunds_appellant() {
    let mut fixture = TribunalFixture::new(5);
    let jurors = convene_jury(&mut fixture);
    use TribunalOutcome::*;
    vote_all(&mut fixture, &jurors, &[Fraud, Fraud, NoChanges], 1_300);
    fixture.state.appeal_tribunal("coauthor", 0, &ctx(1_400)).unwrap();
    assert_eq!(fixture.state.wallets["coauthor"].amount, 930.0);
    let total = fixture.state.total_rosetta;

    assert!(matches!(
        fixture.state.complete_juror_deliberation("anyone", 0, 2_400),
        Err(LedgerError::StateConflict(_))
    ));
    fixture.state.complete_juror_deliberation("anyone", 0, 2_401).unwrap();

    let state = &fixture.state;
    let trial = &state.trials[&0];
    assert_eq!(trial.current_state, TribunalState::Closed);
    assert_eq!(trial.outcome, Some(Fraud));
    assert_eq!(trial.held_value(), 0.0);
    assert_eq!(state.wallets["coauthor"].amount, 1000.0);
    // The earlier verdict stands: stake plus the seized publication stake.
    assert_eq!(state.wallets["validator"].amount, 870.0 + 150.0);
    assert!(!state.wallets["author"].paper_stakes.contains_key(&0));
    assert!(state.papers[&0].invalidated);
    assert_eq!(state.total_rosetta, total);
    assert!(state.check_invariants().is_ok());
}
