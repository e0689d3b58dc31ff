use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use crate::contract::{Action, Contract};
use crate::host::{BlockContext, MemoryDocuments};
use crate::state::NetworkState;
use crate::wallet::PaperId;

#[derive(Parser)]
#[command(author, version, about = "Replays and inspects Rosetta ledger snapshots", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply an ordered interaction log to a genesis snapshot
    Replay {
        /// Genesis snapshot (JSON)
        #[arg(short, long)]
        genesis: PathBuf,

        /// Interactions, one JSON object per line
        #[arg(short, long)]
        interactions: PathBuf,

        /// Externally stored documents as a JSON object keyed by transaction id
        #[arg(short, long)]
        documents: Option<PathBuf>,

        /// Where to write the final snapshot
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Abort on the first rejected interaction
        #[arg(long)]
        strict: bool,
    },

    /// Print the digest of a snapshot
    Digest {
        #[arg(short, long)]
        state: PathBuf,
    },

    /// Show one wallet of a snapshot
    Wallet {
        #[arg(short, long)]
        state: PathBuf,

        #[arg(short, long)]
        address: String,
    },

    /// Show the tribunal on a paper
    Trial {
        #[arg(short, long)]
        state: PathBuf,

        #[arg(short, long)]
        paper_id: PaperId,
    },
}

/// One line of an interaction log: block metadata plus the action envelope.
#[derive(Debug, Deserialize)]
pub struct LoggedInteraction {
    pub height: u64,
    pub timestamp: u64,
    pub id: String,
    #[serde(flatten)]
    pub action: Action,
}

/// Loads a snapshot, recomputing the supply counter when the file leaves it out.
pub fn load_state(path: &Path) -> Result<NetworkState> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    let has_total = value.get("totalRosetta").is_some();
    let mut state: NetworkState = serde_json::from_value(value)?;
    if !has_total {
        state.total_rosetta = state.tracked_supply();
    }
    state.config.validate()?;
    state.check_invariants()?;
    Ok(state)
}

fn load_documents(path: Option<&Path>) -> Result<MemoryDocuments> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(MemoryDocuments::new()),
    }
}

pub struct CliHandler {
    contract: Contract,
}

impl Default for CliHandler {
    fn default() -> Self {
        Self::new(Contract::new())
    }
}

impl CliHandler {
    pub fn new(contract: Contract) -> Self {
        Self { contract }
    }

    /// Applies every interaction in order, returning the final snapshot and the
    /// number of rejected interactions.
    pub fn replay(
        &self,
        genesis: NetworkState,
        interactions: impl BufRead,
        documents: &MemoryDocuments,
        strict: bool,
    ) -> Result<(NetworkState, usize)> {
        let mut state = genesis;
        let mut rejected = 0;
        for (line_no, line) in interactions.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let interaction: LoggedInteraction = serde_json::from_str(&line)
                .with_context(|| format!("interaction on line {}", line_no + 1))?;
            let ctx = BlockContext::new(interaction.height, interaction.timestamp, interaction.id.clone())
                .with_documents(documents.clone());
            match self.contract.transition(&state, &interaction.action, &ctx) {
                Ok(next) => state = next,
                Err(err) if strict => bail!("interaction {} rejected: {}", interaction.id, err),
                Err(err) => {
                    warn!("Interaction {} left the state unchanged: {}", interaction.id, err);
                    rejected += 1;
                }
            }
        }
        Ok((state, rejected))
    }

    pub fn handle_command(&self, cli: Cli) -> Result<()> {
        match cli.command {
            Commands::Replay {
                genesis,
                interactions,
                documents,
                out,
                strict,
            } => {
                let state = load_state(&genesis)?;
                let documents = load_documents(documents.as_deref())?;
                let file = fs::File::open(&interactions)
                    .with_context(|| format!("opening {}", interactions.display()))?;
                let (state, rejected) = self.replay(state, BufReader::new(file), &documents, strict)?;

                info!(
                    "Replay finished with contract v{}: {} rejected, total supply {}",
                    self.contract.version(),
                    rejected,
                    state.total_rosetta
                );
                if let Some(out) = out {
                    fs::write(&out, serde_json::to_string_pretty(&state)?)
                        .with_context(|| format!("writing {}", out.display()))?;
                }
                println!("{}", state.digest()?);
                Ok(())
            }

            Commands::Digest { state } => {
                println!("{}", load_state(&state)?.digest()?);
                Ok(())
            }

            Commands::Wallet { state, address } => {
                let state = load_state(&state)?;
                let wallet = state.wallet(&address)?;
                println!("{}", serde_json::to_string_pretty(wallet)?);
                Ok(())
            }

            Commands::Trial { state, paper_id } => {
                let state = load_state(&state)?;
                let trial = state.trial(paper_id)?;
                println!("{}", serde_json::to_string_pretty(trial)?);
                Ok(())
            }
        }
    }
}
