//! Fixtures shared by the unit tests.

use std::collections::BTreeMap;
use crate::config::NetworkConfig;
use crate::governance::types::Administrator;
use crate::host::{BlockContext, MemoryDocuments};
use crate::jury::JuryPoolOperations;
use crate::paper::{PaperOperations, PublishPaperRequest};
use crate::state::NetworkState;
use crate::wallet::{PaperId, Wallet};

/// Genesis snapshot with default config, one wallet per `(address, amount, role)`.
///
/// Every wallet gets trust 1 and every admin-tier wallet is a voting administrator.
pub fn state_with_wallets(wallets: &[(&str, f64, i64)]) -> NetworkState {
    let config = NetworkConfig::default();
    let admin_role = crate::roles::RoleTiers::default().admin;
    let mut accounts = BTreeMap::new();
    let mut administrators = BTreeMap::new();
    for (address, amount, role) in wallets {
        accounts.insert(
            address.to_string(),
            Wallet {
                amount: *amount,
                role: *role,
                trust: 1.0,
                ..Wallet::default()
            },
        );
        if *role == admin_role {
            administrators.insert(address.to_string(), Administrator::voting());
        }
    }
    NetworkState::genesis(config, accounts, administrators)
}

pub fn ctx(timestamp: u64) -> BlockContext {
    BlockContext::new(timestamp / 10, timestamp, format!("tx-{}", timestamp))
}

pub fn ctx_with_documents(timestamp: u64, ids: &[&str]) -> BlockContext {
    let mut documents = MemoryDocuments::new();
    for id in ids {
        documents.insert(*id, serde_json::json!({ "id": id }));
    }
    ctx(timestamp).with_documents(documents)
}

pub fn paper_request(authors: &[&str], weights: &[f64]) -> PublishPaperRequest {
    PublishPaperRequest {
        paper_url: "https://papers.example/p".into(),
        paper_symbol: "PAP".into(),
        publish_timestamp: 0,
        authors: authors.iter().map(|a| a.to_string()).collect(),
        author_weights: weights.to_vec(),
    }
}

/// A network with one published paper and a funded jury pool.
///
/// Wallets: `author` (author, publishes paper 0 at time 0), `coauthor`,
/// `validator` (participant), `admin`, and `juror0..juror{jurors-1}` who all
/// joined the pool.
pub struct TribunalFixture {
    pub state: NetworkState,
    pub paper_id: PaperId,
    pub jurors: Vec<String>,
}

impl TribunalFixture {
    pub fn new(jurors: usize) -> Self {
        let juror_names: Vec<String> = (0..jurors).map(|i| format!("juror{}", i)).collect();
        let mut wallets: Vec<(&str, f64, i64)> = vec![
            ("author", 1000.0, 100),
            ("coauthor", 1000.0, 100),
            ("validator", 1000.0, 1),
            ("admin", 1000.0, 65000),
        ];
        for name in &juror_names {
            wallets.push((name.as_str(), 500.0, 100));
        }
        let mut state = state_with_wallets(&wallets);
        let paper_id = state
            .publish_paper("author", paper_request(&["author", "coauthor"], &[1.0, 1.0]), 0)
            .unwrap();
        for name in &juror_names {
            state.join_jury_pool(name).unwrap();
        }
        Self {
            state,
            paper_id,
            jurors: juror_names,
        }
    }
}
