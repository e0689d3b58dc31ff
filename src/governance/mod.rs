//! Administrator voting on network changes, and author onboarding.

pub mod types;

pub use types::{Administrator, NetworkChange, NetworkChangeProposal, Vote};

use log::info;
use crate::error::{LedgerError, Result};
use crate::roles::{require_not_banned, require_specific_role};
use crate::state::NetworkState;

pub trait GovernanceOperations {
    /// Opens a proposal carrying the proposer's own "yes" vote.
    fn propose_network_change(&mut self, caller: &str, changes: Vec<NetworkChange>, now: u64) -> Result<u64>;

    /// Records or replaces a vote, applying or rejecting the proposal once a side
    /// holds a strict majority of the voting administrators.
    fn vote_on_network_change_proposal(&mut self, caller: &str, proposal_id: u64, vote: bool, now: u64) -> Result<()>;

    /// Raises `new_author` to the author tier, creating the wallet if needed.
    fn onboard_author(&mut self, caller: &str, new_author: &str) -> Result<()>;

    fn voting_administrators(&self) -> usize;
}

fn require_voting_rights(state: &NetworkState, caller: &str) -> Result<()> {
    match state.administrators.get(caller) {
        Some(admin) if admin.can_vote => Ok(()),
        _ => Err(LedgerError::Unauthorized(format!(
            "{} has no administrator voting rights",
            caller
        ))),
    }
}

impl NetworkState {
    fn apply_network_change(&mut self, change: NetworkChange) -> Result<()> {
        match change {
            NetworkChange::NewConfig(config) => {
                config.validate()?;
                self.config = config;
                info!("Network configuration replaced");
            }
            NetworkChange::NewAdmin(address) => {
                require_not_banned(self, &address)?;
                let admin_role = self.roles.admin;
                let wallet = self.wallet_or_default(&address);
                let prior_role = wallet.role;
                wallet.role = wallet.role.max(admin_role);
                self.administrators
                    .entry(address.clone())
                    .and_modify(|admin| admin.can_vote = true)
                    .or_insert(Administrator {
                        can_vote: true,
                        prior_role: Some(prior_role),
                    });
                info!("{} became an administrator", address);
            }
            NetworkChange::RemoveAdmin(address) => {
                let removed = self
                    .administrators
                    .remove(&address)
                    .ok_or_else(|| LedgerError::NotFound(format!("administrator {}", address)))?;
                let restored = removed.prior_role.unwrap_or(self.roles.none);
                let admin_role = self.roles.admin;
                if let Some(wallet) = self.wallets.get_mut(&address) {
                    if wallet.role == admin_role {
                        wallet.role = restored;
                    }
                }
                info!("{} is no longer an administrator", address);
            }
            NetworkChange::GrantAdminVotingRights(address) => {
                self.administrator_mut(&address)?.can_vote = true;
                info!("{} may vote on network changes", address);
            }
            NetworkChange::RevokeAdminVotingRights(address) => {
                self.administrator_mut(&address)?.can_vote = false;
                info!("{} may no longer vote on network changes", address);
            }
        }
        Ok(())
    }

    fn administrator_mut(&mut self, address: &str) -> Result<&mut Administrator> {
        self.administrators
            .get_mut(address)
            .ok_or_else(|| LedgerError::NotFound(format!("administrator {}", address)))
    }
}

impl GovernanceOperations for NetworkState {
    fn propose_network_change(&mut self, caller: &str, changes: Vec<NetworkChange>, now: u64) -> Result<u64> {
        require_voting_rights(self, caller)?;
        if changes.is_empty() {
            return Err(LedgerError::Validation("a proposal needs at least one change".into()));
        }
        for change in &changes {
            if let NetworkChange::NewConfig(config) = change {
                config.validate()?;
            }
        }

        let proposal_id = self.next_network_change_id;
        self.next_network_change_id += 1;
        self.network_change_proposals.insert(
            proposal_id,
            NetworkChangeProposal {
                votes: vec![Vote {
                    address: caller.to_string(),
                    vote: true,
                }],
                voting_active: true,
                voting_ended: 0,
                outcome: false,
                created: now,
                changes,
            },
        );
        info!("{} opened network change proposal {}", caller, proposal_id);
        Ok(proposal_id)
    }

    fn vote_on_network_change_proposal(&mut self, caller: &str, proposal_id: u64, vote: bool, now: u64) -> Result<()> {
        let proposal = self
            .network_change_proposals
            .get(&proposal_id)
            .ok_or_else(|| LedgerError::NotFound(format!("proposal {}", proposal_id)))?;
        if !proposal.voting_active {
            return Err(LedgerError::StateConflict(format!(
                "voting on proposal {} has ended",
                proposal_id
            )));
        }
        require_voting_rights(self, caller)?;

        let required_votes = self.voting_administrators() / 2;
        let mut proposal = proposal.clone();
        proposal.cast(caller, vote);
        let (yes, no) = (proposal.yes_votes(), proposal.no_votes());
        info!(
            "{} voted {} on proposal {} ({} yes, {} no, {} needed)",
            caller, vote, proposal_id, yes, no, required_votes + 1
        );

        if yes > required_votes {
            let mut working = self.clone();
            for change in proposal.changes.iter().cloned() {
                working.apply_network_change(change)?;
            }
            *self = working;
            proposal.voting_active = false;
            proposal.voting_ended = now;
            proposal.outcome = true;
            info!("Proposal {} passed and was applied", proposal_id);
        } else if no > required_votes {
            proposal.voting_active = false;
            proposal.voting_ended = now;
            proposal.outcome = false;
            info!("Proposal {} was rejected", proposal_id);
        }

        self.network_change_proposals.insert(proposal_id, proposal);
        Ok(())
    }

    fn onboard_author(&mut self, caller: &str, new_author: &str) -> Result<()> {
        require_specific_role(self, caller, self.roles.admin)?;
        require_not_banned(self, new_author)?;

        let author_role = self.roles.author;
        let wallet = self.wallet_or_default(new_author);
        wallet.role = wallet.role.max(author_role);
        info!("{} onboarded {} as an author", caller, new_author);
        Ok(())
    }

    fn voting_administrators(&self) -> usize {
        self.administrators.values().filter(|a| a.can_vote).count()
    }
}
