//! Deterministic jury draws.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use crate::error::{LedgerError, Result};
use crate::host::RandomSeed;
use crate::state::NetworkState;
use crate::wallet::{Address, PaperId};

/// Smallest jury that may deliberate.
pub const MIN_JURY_SIZE: usize = 3;

/// Pool members holding no knowledge tokens of the paper, in pool order.
///
/// Locked tokens count; parties to the trial are never impartial.
pub fn impartial_candidates(state: &NetworkState, paper_id: PaperId, parties: &[Address]) -> Vec<Address> {
    state
        .jury_pool
        .iter()
        .filter(|member| !parties.iter().any(|party| party == *member))
        .filter(|member| {
            state
                .wallets
                .get(member.as_str())
                .map(|w| w.knowledge_total(paper_id) == 0.0)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Draws up to `count` jurors from `candidates`.
///
/// Undersized pools seat everyone. The shuffle is seeded from the host's
/// replay-stable randomness, so identical history yields an identical jury.
pub fn draw_jury<S: RandomSeed + ?Sized>(
    mut candidates: Vec<Address>,
    count: usize,
    seed: &S,
    caller: &str,
    nonce: &str,
) -> Result<Vec<Address>> {
    let seated = candidates.len().min(count);
    if seated < MIN_JURY_SIZE {
        return Err(LedgerError::JuryFormation {
            available: seated,
            required: MIN_JURY_SIZE,
        });
    }
    if candidates.len() <= count {
        return Ok(candidates);
    }

    let mut rng = StdRng::seed_from_u64(seed.random_int(u64::MAX, caller, nonce));
    candidates.shuffle(&mut rng);
    candidates.truncate(count);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::host::BlockContext;
    use crate::testing::state_with_wallets;
    use crate::wallet::KnowledgeWallet;

    fn names(n: usize) -> Vec<Address> {
        (0..n).map(|i| format!("j{}", i)).collect()
    }

    #[test]
    fn test_same_context_same_jury() {
        let ctx = BlockContext::new(5, 500, "tx-a");
        let a = draw_jury(names(20), 5, &ctx, "validator", "0").unwrap();
        let b = draw_jury(names(20), 5, &ctx, "validator", "0").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);

        let mut unique = a.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn test_different_interaction_changes_draw() {
        let draws: Vec<Vec<Address>> = (0..8)
            .map(|i| {
                let ctx = BlockContext::new(5, 500, format!("tx-{}", i));
                draw_jury(names(30), 3, &ctx, "validator", "0").unwrap()
            })
            .collect();
        assert!(draws.iter().any(|d| d != &draws[0]));
    }

    #[test]
    fn test_small_pool_is_seated_whole() {
        let ctx = BlockContext::new(1, 1, "tx");
        assert_eq!(draw_jury(names(4), 7, &ctx, "v", "").unwrap(), names(4));
    }

    #[test]
    fn test_too_few_jurors() {
        let ctx = BlockContext::new(1, 1, "tx");
        assert!(matches!(
            draw_jury(names(2), 3, &ctx, "v", ""),
            Err(LedgerError::JuryFormation { available: 2, required: 3 })
        ));
    }

    #[test]
    fn test_impartiality_counts_locked_tokens() {
        let mut state = state_with_wallets(&[("a", 0.0, 100), ("b", 0.0, 100), ("c", 0.0, 100), ("v", 0.0, 1)]);
        state.jury_pool = vec!["a".into(), "b".into(), "c".into(), "v".into()];
        state
            .wallets
            .get_mut("b")
            .unwrap()
            .knowledge_tokens
            .insert(0, KnowledgeWallet::locked_until(1.0, 99));

        let candidates = impartial_candidates(&state, 0, &["v".to_string()]);
        assert_eq!(candidates, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(impartial_candidates(&state, 1, &[]).len(), 4);
    }
}
