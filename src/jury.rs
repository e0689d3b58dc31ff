//! Membership of the pool jurors are drawn from.

use log::info;
use crate::error::{LedgerError, Result};
use crate::roles::{require_not_banned, require_tiered_role};
use crate::state::NetworkState;
use crate::tribunal::types::TribunalState;
use crate::wallet::WalletOperations;

pub trait JuryPoolOperations {
    /// Escrows the jury duty stake and adds the address to the pool.
    fn join_jury_pool(&mut self, address: &str) -> Result<()>;

    /// Removes the address from the pool and refunds its escrowed stake.
    fn leave_jury_pool(&mut self, address: &str) -> Result<f64>;

    fn in_jury_pool(&self, address: &str) -> bool;

    /// Whether the address sits on a jury that is still deliberating.
    fn is_seated(&self, address: &str) -> bool;
}

impl JuryPoolOperations for NetworkState {
    fn join_jury_pool(&mut self, address: &str) -> Result<()> {
        let wallet = self.wallet(address)?;
        let trust = wallet.trust;
        require_not_banned(self, address)?;
        require_tiered_role(self, address, self.roles.author)?;
        if trust < 1.0 {
            return Err(LedgerError::Unauthorized(format!(
                "{} has trust {} but jury duty needs at least 1",
                address, trust
            )));
        }
        if self.in_jury_pool(address) {
            return Err(LedgerError::StateConflict(format!("{} is already in the jury pool", address)));
        }

        let stake = self.config.jury_duty_stake;
        if stake > 0.0 {
            self.stake_for_jury(address, stake)?;
        }
        self.jury_pool.push(address.to_string());
        info!("{} joined the jury pool with stake {}", address, stake);
        Ok(())
    }

    fn leave_jury_pool(&mut self, address: &str) -> Result<f64> {
        if !self.in_jury_pool(address) {
            return Err(LedgerError::NotFound(format!("{} is not in the jury pool", address)));
        }
        if self.is_seated(address) {
            return Err(LedgerError::StateConflict(format!(
                "{} sits on a jury that has not concluded",
                address
            )));
        }

        self.jury_pool.retain(|member| member != address);
        let refund = self.unstake_jury(address)?;
        info!("{} left the jury pool, {} refunded", address, refund);
        Ok(refund)
    }

    fn in_jury_pool(&self, address: &str) -> bool {
        self.jury_pool.iter().any(|member| member == address)
    }

    fn is_seated(&self, address: &str) -> bool {
        self.trials.values().any(|trial| {
            trial.current_state == TribunalState::JuryDeliberation && trial.is_juror(address)
        })
    }
}
