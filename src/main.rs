use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;

mod cache;
mod check;
mod export;
mod extraction;
mod fetch;
mod page;
mod render;
mod serve;
mod telemetry;
mod util;
mod video;

#[derive(Parser)]
#[command(name = "tgrab", about = "Video transcript retrieval and cache CLI")]
struct Cli {
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull the transcript for a watch page, DOM first with API fallback
    Extract(extraction::ExtractCmd),
    /// Probe whether a transcript looks available
    Check(check::CheckCmd),
    /// Extract and write the downloadable transcript document
    Export(export::ExportCmd),
    /// Hand a watch URL to the rendering backend
    Render(render::RenderCmd),
    /// Answer the extraction message contract over stdio, one JSON per line
    Serve(serve::ServeCmd),
    /// Inspect or clear the transcript cache
    Cache(cache::CacheCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // initialize logging/tracing (stderr). Respect RUST_LOG and TGRAB_LOG_FORMAT
    telemetry::config::init_tracing();

    // Ctrl-C cancels in-flight waits instead of killing mid-write.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Extract(args) => extraction::run(args, cancel).await?,
        Commands::Check(args) => check::run(args).await?,
        Commands::Export(args) => export::run(args, cancel).await?,
        Commands::Render(args) => render::run(args).await?,
        Commands::Serve(args) => serve::run(args, cancel).await?,
        Commands::Cache(args) => cache::run(args).await?,
    }

    Ok(())
}
