use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "arsim",
    about = "Local development server for Arweave apps",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve an app with live reload and a simulated network API
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// HTML entry document of the app
    pub entry: PathBuf,
    /// Config file (.json or .toml)
    #[arg(long = "serve-config", alias = "config")]
    pub config: Option<PathBuf>,
    /// Override the API port
    #[arg(long)]
    pub port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve() {
        let cli = Cli::parse_from(["arsim", "serve", "app/index.html", "--serve-config", "serve.json", "-v"]);
        assert!(cli.verbose);
        let Command::Serve(args) = cli.command;
        assert_eq!(args.entry, PathBuf::from("app/index.html"));
        assert_eq!(args.config, Some(PathBuf::from("serve.json")));
        assert_eq!(args.port, None);
    }

    #[test]
    fn entry_is_required() {
        assert!(Cli::try_parse_from(["arsim", "serve"]).is_err());
    }
}
