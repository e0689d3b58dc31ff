/*!
Rosetta Ledger - an academic publication economy with on-ledger dispute resolution

Every interaction ordered by the host log platform is applied by
[`Contract::transition`], which turns one [`NetworkState`] snapshot into the next
or rejects the interaction without touching it.

# Main Components

- `wallet`: Rosetta balances, knowledge tokens, jury and publication stakes
- `paper`: publication, knowledge-token minting and donation pools
- `jury`: membership of the jury pool
- `tribunal`: settlement, jury deliberation, appeals and payouts
- `governance`: administrator votes on network changes
- `roles`: privilege tiers and guards
- `host`: clock, replay-stable randomness and document lookup supplied by the host
- `cli`: replay and inspection of snapshots

# Example Usage

```rust
use rosetta_ledger::{Action, BlockContext, Contract, NetworkState};
use serde_json::json;

let genesis: NetworkState = serde_json::from_value(json!({
    "totalRosetta": 1000,
    "wallets": { "alice": { "amount": 1000, "role": 1, "trust": 1 } }
})).unwrap();

let action = Action::new("alice", "transfer", json!({ "target": "bob", "qty": 500 }));
let next = Contract::new()
    .transition(&genesis, &action, &BlockContext::new(1, 100, "tx-1"))
    .unwrap();
assert_eq!(next.wallets["bob"].amount, 500.0);
```
*/

pub mod config;
pub mod contract;
pub mod error;
pub mod host;
pub mod roles;
pub mod state;

/// Rosetta and knowledge-token bookkeeping.
pub mod wallet;

/// Paper publication and donation pools.
pub mod paper;

pub mod jury;

/// Dispute lifecycle and jury selection.
pub mod tribunal;

/// Network change proposals and administrator votes.
pub mod governance;

/// Command-line replay and inspection tool.
pub mod cli;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::NetworkConfig;
pub use contract::{Action, Contract, Operation};
pub use error::{LedgerError, Result};
pub use host::{BlockContext, Clock, DocumentStore, Host, MemoryDocuments, RandomSeed};
pub use state::NetworkState;
pub use tribunal::{TribunalOutcome, TribunalState};
pub use wallet::{Address, PaperId, Wallet};
