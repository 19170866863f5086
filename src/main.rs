use huffmania::if_tracing;

if_tracing! {
    use tracing_subscriber::{EnvFilter, fmt};
}

use crate::cli::{Cli, Command};
use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    if_tracing! {
        let subscriber = fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }

    let cli = Cli::parse();
    match cli.command {
        Command::Encode(args) => cli::encode::encode(args)?,
        Command::Decode(args) => cli::decode::decode(args)?,
        Command::Test(args) => cli::test::test(args)?,
        Command::Dump(args) => cli::dump::dump(args)?,
    }
    Ok(())
}
