use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;

use arsim_build::HttpFetcher;
use arsim_server::{ArsimServer, HttpNetworkClient, ServeConfig, Session};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
    }
}

fn load_config(args: &ServeArgs) -> anyhow::Result<ServeConfig> {
    let mut config = match &args.config {
        Some(path) => ServeConfig::load(path)?,
        None => ServeConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    tracing::debug!(?config, "serve config");
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let entry = args
        .entry
        .canonicalize()
        .with_context(|| format!("File not found: {}", args.entry.display()))?;
    let cwd = std::env::current_dir().context("working directory is not accessible")?;
    let data_dir = config.data_dir_in(&cwd);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let network = Arc::new(HttpNetworkClient::new(&config.network)?);
        let fetcher = Arc::new(HttpFetcher::default());
        let session = Session::open(config, &entry, &data_dir, network, fetcher)
            .await
            .context("cannot open the transaction store")?;
        let server = ArsimServer::new(Arc::new(session)).ignoring(&data_dir);
        print_banner(&server, &entry);
        server.serve().await?;
        Ok::<_, anyhow::Error>(())
    })
}

fn print_banner(server: &ArsimServer, entry: &Path) {
    let config = server.session().config();
    let root = entry.parent().unwrap_or(entry);
    println!("{}", "arsim local development server".cyan().bold());
    println!();
    println!("API proxy ({})", config.network.dimmed());
    println!("  {}", format!("http://localhost:{}", config.port).bright_cyan());
    println!("Your application");
    println!("  {}", format!("http://localhost:{}/app", config.port).bright_cyan());
    println!("Live reload");
    println!("  {}", format!("ws://localhost:{}", config.live_reload_port).bright_cyan());
    println!();
    println!("Watching {} for changes", root.display().to_string().bold());
    if config.package {
        println!("{} packaging is not supported; assets are inlined unminified", "!".yellow());
    }
    println!("{} Server ready and waiting for connections", "✓".green().bold());
}
