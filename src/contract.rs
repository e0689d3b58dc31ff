//! The single entry point: one ordered interaction in, one new snapshot out.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use crate::error::{LedgerError, Result};
use crate::governance::{GovernanceOperations, NetworkChange};
use crate::host::Host;
use crate::jury::JuryPoolOperations;
use crate::paper::{PaperOperations, PublishPaperRequest};
use crate::state::NetworkState;
use crate::tribunal::{TribunalOperations, TribunalOutcome};
use crate::wallet::{Address, PaperId, WalletOperations};

/// Dispatch table version baked into this build.
pub const CONTRACT_VERSION: u32 = 1;

/// An interaction as ordered by the log platform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub function: String,
    #[serde(default)]
    pub parameters: Value,
    pub caller: Address,
}

impl Action {
    pub fn new(caller: impl Into<Address>, function: impl Into<String>, parameters: Value) -> Self {
        Self {
            function: function.into(),
            parameters,
            caller: caller.into(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Decodes the envelope into the closed set of operations.
    pub fn operation(&self) -> Result<Operation> {
        let parameters = if self.parameters.is_null() {
            json!({})
        } else {
            self.parameters.clone()
        };
        serde_json::from_value(json!({
            "function": self.function,
            "parameters": parameters,
        }))
        .map_err(|err| {
            LedgerError::Validation(format!("malformed {} interaction: {}", self.function, err))
        })
    }
}

/// Every operation an interaction may invoke.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", content = "parameters", rename_all = "camelCase")]
pub enum Operation {
    Transfer {
        target: Address,
        qty: f64,
    },
    #[serde(rename_all = "camelCase")]
    TransferKnowledge {
        target: Address,
        qty: f64,
        paper_id: PaperId,
    },
    PublishPaper(PublishPaperRequest),
    #[serde(rename_all = "camelCase")]
    VolunteerReplicationDonation {
        paper_id: PaperId,
        qty: f64,
        pool: i64,
    },
    #[serde(rename_all = "camelCase")]
    VolunteerFalsificationDonate {
        paper_id: PaperId,
        qty: f64,
    },
    #[serde(rename_all = "camelCase")]
    ReleasePaperStake {
        paper_id: PaperId,
    },
    #[serde(rename_all = "camelCase")]
    UpdateImpactScore {
        paper_id: PaperId,
        index_tx: String,
    },
    #[serde(rename_all = "camelCase")]
    OnboardAuthor {
        new_author: Address,
    },
    ProposeNetworkChange {
        changes: Vec<NetworkChange>,
    },
    #[serde(rename_all = "camelCase")]
    VoteOnNetworkChangeProposal {
        network_change_id: u64,
        vote: bool,
    },
    #[serde(rename_all = "camelCase")]
    CreateFalsificationTribunal {
        paper_id: PaperId,
        evidence_tx: String,
    },
    #[serde(rename_all = "camelCase")]
    SubmitPaperAsValidation {
        paper_id: PaperId,
        validating_paper_id: PaperId,
    },
    #[serde(rename_all = "camelCase")]
    SubmitEvidence {
        paper_id: PaperId,
        evidence_tx: String,
    },
    #[serde(rename_all = "camelCase")]
    VoteOnTribunalSettlement {
        paper_id: PaperId,
        outcome: TribunalOutcome,
        #[serde(default)]
        explanation: String,
    },
    #[serde(rename_all = "camelCase")]
    CompleteSettlement {
        paper_id: PaperId,
    },
    #[serde(rename_all = "camelCase")]
    VoteAsJuror {
        paper_id: PaperId,
        outcome: TribunalOutcome,
        #[serde(default)]
        explanation: String,
    },
    #[serde(rename_all = "camelCase")]
    CompleteJurorDeliberation {
        paper_id: PaperId,
    },
    #[serde(rename_all = "camelCase")]
    AppealTribunal {
        paper_id: PaperId,
    },
    #[serde(rename_all = "camelCase")]
    FinalizeTribunal {
        paper_id: PaperId,
    },
    JoinJuryPool {},
    LeaveJuryPool {},
}

/// Applies interactions to snapshots.
///
/// A rejected interaction returns the error and leaves the input snapshot as the
/// current one; a successful one returns a fresh snapshot that passed the supply
/// and non-negativity checks.
#[derive(Clone, Debug)]
pub struct Contract {
    version: u32,
}

impl Default for Contract {
    fn default() -> Self {
        Self {
            version: CONTRACT_VERSION,
        }
    }
}

impl Contract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn transition<H: Host>(&self, state: &NetworkState, action: &Action, host: &H) -> Result<NetworkState> {
        let result = action.operation().and_then(|operation| {
            let mut working = state.clone();
            apply(&mut working, &action.caller, operation, host)?;
            working.check_invariants()?;
            Ok(working)
        });
        match &result {
            Ok(_) => debug!(
                "v{} applied {} from {} at {}",
                self.version,
                action.function,
                action.caller,
                host.now()
            ),
            Err(err) => warn!(
                "Rejected {} from {}: {}",
                action.function, action.caller, err
            ),
        }
        result
    }
}

fn apply(state: &mut NetworkState, caller: &str, operation: Operation, host: &dyn Host) -> Result<()> {
    let now = host.now();
    match operation {
        Operation::Transfer { target, qty } => state.transfer(caller, &target, qty),
        Operation::TransferKnowledge { target, qty, paper_id } => {
            state.transfer_knowledge(caller, &target, qty, paper_id, now)
        }
        Operation::PublishPaper(request) => state.publish_paper(caller, request, now).map(|_| ()),
        Operation::VolunteerReplicationDonation { paper_id, qty, pool } => {
            state.volunteer_replication_donation(caller, paper_id, qty, pool)
        }
        Operation::VolunteerFalsificationDonate { paper_id, qty } => {
            state.volunteer_falsification_donate(caller, paper_id, qty)
        }
        Operation::ReleasePaperStake { paper_id } => {
            state.release_paper_stake(caller, paper_id, now).map(|_| ())
        }
        Operation::UpdateImpactScore { paper_id, index_tx } => {
            state.update_impact_score(caller, paper_id, &index_tx, host).map(|_| ())
        }
        Operation::OnboardAuthor { new_author } => state.onboard_author(caller, &new_author),
        Operation::ProposeNetworkChange { changes } => {
            state.propose_network_change(caller, changes, now).map(|_| ())
        }
        Operation::VoteOnNetworkChangeProposal { network_change_id, vote } => {
            state.vote_on_network_change_proposal(caller, network_change_id, vote, now)
        }
        Operation::CreateFalsificationTribunal { paper_id, evidence_tx } => {
            state.create_falsification_tribunal(caller, paper_id, &evidence_tx, host)
        }
        Operation::SubmitPaperAsValidation { paper_id, validating_paper_id } => {
            state.submit_paper_as_validation(caller, paper_id, validating_paper_id, now)
        }
        Operation::SubmitEvidence { paper_id, evidence_tx } => {
            state.submit_evidence(caller, paper_id, &evidence_tx, host)
        }
        Operation::VoteOnTribunalSettlement { paper_id, outcome, explanation } => {
            state.vote_on_tribunal_settlement(caller, paper_id, outcome, explanation, host)
        }
        Operation::CompleteSettlement { paper_id } => state.complete_settlement(caller, paper_id, host),
        Operation::VoteAsJuror { paper_id, outcome, explanation } => {
            state.vote_as_juror(caller, paper_id, outcome, explanation, now)
        }
        Operation::CompleteJurorDeliberation { paper_id } => {
            state.complete_juror_deliberation(caller, paper_id, now)
        }
        Operation::AppealTribunal { paper_id } => state.appeal_tribunal(caller, paper_id, host),
        Operation::FinalizeTribunal { paper_id } => state.finalize_tribunal(caller, paper_id, now),
        Operation::JoinJuryPool {} => state.join_jury_pool(caller),
        Operation::LeaveJuryPool {} => state.leave_jury_pool(caller).map(|_| ()),
    }
}
