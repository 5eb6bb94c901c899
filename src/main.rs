use clap::Parser;
use rlconsensus::{
    cli::{init_verbose, Cli, Command, FULL_VERSION},
    commands::{consensus, pileup, validate},
    utils::{handle_error_and_exit, Result},
};

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    let subcommand_name = match cli.command {
        Command::Consensus(_) => "consensus",
        Command::Pileup(_) => "pileup",
        Command::Validate(_) => "validate",
    };

    log::info!(
        "Running {}-{} [{}]",
        env!("CARGO_PKG_NAME"),
        *FULL_VERSION,
        subcommand_name
    );
    match cli.command {
        Command::Consensus(args) => consensus::consensus(args)?,
        Command::Pileup(args) => pileup::pileup(args)?,
        Command::Validate(args) => validate::validate(args)?,
    }
    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}
