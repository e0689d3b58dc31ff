use serde::{Deserialize, Serialize};
use crate::config::NetworkConfig;
use crate::wallet::types::Address;

/// A single amendment carried by a proposal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "changeId", content = "data")]
pub enum NetworkChange {
    NewConfig(NetworkConfig),
    NewAdmin(Address),
    RemoveAdmin(Address),
    GrantAdminVotingRights(Address),
    RevokeAdminVotingRights(Address),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub address: Address,
    pub vote: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkChangeProposal {
    /// One entry per address, ordered by first vote
    pub votes: Vec<Vote>,
    pub voting_active: bool,
    pub voting_ended: u64,
    pub outcome: bool,
    pub created: u64,
    pub changes: Vec<NetworkChange>,
}

impl NetworkChangeProposal {
    pub fn yes_votes(&self) -> usize {
        self.votes.iter().filter(|v| v.vote).count()
    }

    pub fn no_votes(&self) -> usize {
        self.votes.len() - self.yes_votes()
    }

    /// Records `vote`, replacing any earlier vote by the same address in place.
    pub fn cast(&mut self, address: &str, vote: bool) {
        match self.votes.iter_mut().find(|v| v.address == address) {
            Some(existing) => existing.vote = vote,
            None => self.votes.push(Vote {
                address: address.to_string(),
                vote,
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Administrator {
    pub can_vote: bool,
    /// Wallet role before promotion, restored on removal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_role: Option<i64>,
}

impl Administrator {
    pub fn voting() -> Self {
        Self {
            can_vote: true,
            prior_role: None,
        }
    }
}
