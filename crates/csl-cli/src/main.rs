//! `consilium` - command-line client

mod console;
mod render;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, Command};
use csl_core::{telemetry, Consilium, ConsiliumConfig};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("consilium")
        .version(csl_core::VERSION)
        .about("Multi-agent analysis assistant")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("chat")
                .about("Ask the agent panel one question")
                .arg(
                    Arg::new("query")
                        .required(true)
                        .num_args(1..)
                        .help("Question text"),
                ),
        )
        .subcommand(Command::new("console").about("Interactive console"))
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing_with("warn");
    let matches = cli().get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ConsiliumConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConsiliumConfig::from_env(),
    };
    let app = Consilium::connect(config)?;

    match matches.subcommand() {
        Some(("chat", args)) => {
            let query = args
                .get_many::<String>("query")
                .map(|words| words.cloned().collect::<Vec<_>>().join(" "))
                .unwrap_or_default();
            let submission = app.ask(&query).await;
            render::turn(&app.conversation(), &submission);
            if !submission.was_sent() || matches!(submission, csl_core::session::Submission::Failed(_)) {
                std::process::exit(1);
            }
        }
        Some(("console", _)) => console::run(&app).await?,
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn chat_joins_words() {
        let matches = cli()
            .try_get_matches_from(["consilium", "--config", "c.toml", "chat", "churn", "risk?"])
            .unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>("config"),
            Some(&PathBuf::from("c.toml"))
        );
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "chat");
        assert_eq!(args.get_many::<String>("query").unwrap().count(), 2);
    }
}
