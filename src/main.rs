//! rflasher - a flash chip programming CLI

mod chipset;
mod cli;
mod commands;
mod engine;
mod error;
mod layout_resolve;
mod programmer;

use std::fs::File;

use clap::Parser;
use rflasher_core::chip::ChipDatabase;

use cli::{Cli, Commands, ProgrammerSpec};
use engine::Engine;
use error::CliError;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let db = chipset::builtin_chip_database();
    log::debug!("loaded {} chip definition(s)", db.len());

    if let Err(e) = run(&cli, &db) {
        if let CliError::Core(core_err) = &e {
            log::error!("{core_err} (code {})", core_err.code());
        }
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli, db: &ChipDatabase) -> error::Result<()> {
    match &cli.command {
        Commands::ListSupported => return commands::run_list_supported(db),
        Commands::ListWiki => return commands::run_list_wiki(db),
        _ => {}
    }

    let spec = ProgrammerSpec::parse(&cli.programmer);
    let mut master = programmer::build(&spec)?;
    let ctx = commands::identify_chip(cli, &mut master, db)?;
    let mut engine = Engine::new(master, ctx);

    let result = match &cli.command {
        Commands::Read { file } => commands::run_read(cli, &mut engine, file),
        Commands::Write { file } => commands::run_write(cli, &mut engine, file),
        Commands::Verify { file } => commands::run_verify(cli, &mut engine, file),
        Commands::Erase => commands::run_erase(cli, &mut engine),
        Commands::ListSupported | Commands::ListWiki => unreachable!("handled above"),
    };

    engine.shutdown();
    result
}

fn init_logging(cli: &Cli) {
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter),
    );

    if let Some(path) = &cli.output {
        match File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("warning: failed to open {} for logging: {e}", path.display());
            }
        }
    }

    builder.init();
}
