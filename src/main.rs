//! layer-export command line entry point

use clap::Parser;
use layer_export::{BearerToken, Config, ConsoleHandoff, LayerExporter, run_until_interrupted};
use std::error::Error as _;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Export a Layer application's conversations", long_about = None)]
struct Cli {
    /// Application id, bare or URI-shaped (prompted for when omitted)
    #[arg(long)]
    app_id: Option<String>,
    /// Bearer token for the platform API (prompted for with hidden input when omitted)
    #[arg(long)]
    token: Option<String>,
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        // Exit here so a handoff prompt still blocked on stdin does not hold the runtime open
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> layer_export::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let app_id = match cli.app_id {
        Some(app_id) => app_id,
        None => prompt_line("App ID: ")?,
    };
    let token = match cli.token {
        Some(token) => token,
        None => rpassword::prompt_password("Bearer Token: ")?,
    };

    let exporter = LayerExporter::new(config, &app_id, BearerToken::new(token.trim()))?;
    tracing::info!(app_id = %exporter.app_id(), "starting export");

    let summary = run_until_interrupted(&exporter, &ConsoleHandoff).await?;
    println!(
        "Export {} complete: {} attachments, archive at {}",
        summary.export_id,
        summary.attachments,
        summary.archive_path.display()
    );
    Ok(())
}

fn prompt_line(prompt: &str) -> std::io::Result<String> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
