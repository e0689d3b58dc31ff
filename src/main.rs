use anyhow::Result;
use clap::Parser;
use log::info;
use rosetta_ledger::cli::{Cli, CliHandler};
use rosetta_ledger::contract::Contract;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let contract = Contract::new();
    info!("Rosetta ledger contract v{}", contract.version());
    CliHandler::new(contract).handle_command(cli)
}
