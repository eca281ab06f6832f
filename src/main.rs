use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use dlsync::api::ApiClient;
use dlsync::application::report;
use dlsync::domain::DownloadState;
use dlsync::{config, logging, ClientConfig, StartOutcome, SyncClient, SyncUpdate};

#[derive(Debug, Parser)]
#[command(name = "dlsync", version, about = "Follow download runs of a download backend")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend origin, overrides the configuration.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Push channel URL, overrides the configuration.
    #[arg(long, global = true)]
    ws_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a run, follow it until its report arrives and save the report.
    Run {
        /// Directory for the report file.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Download the report of a finished run.
    Report {
        session_id: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Download the list of URLs deleted after a stall.
    DeletedUrls {
        session_id: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show the backend's status for a run.
    Status { session_id: String },
    /// List the reports the backend kept from earlier runs.
    Reports,
}

#[tokio::main]
async fn main() {
    logging::init_logging();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("dlsync error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = config::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        cfg.base_url = base_url;
    }
    if let Some(ws_url) = cli.ws_url {
        cfg.ws_url = ws_url;
    }

    match cli.command.unwrap_or(Command::Run { out: None }) {
        Command::Run { out } => {
            let out = out.unwrap_or_else(|| cfg.output_dir.clone());
            follow_run(&cfg, out).await
        }
        Command::Report { session_id, out } => {
            let api = ApiClient::new(cfg.api());
            let artifact = report::export_report(&api, Some(session_id.as_str()))
                .await
                .context("could not download report")?;
            let path = artifact
                .save_to(&out.unwrap_or_else(|| cfg.output_dir.clone()))
                .await?;
            println!("Report saved to {}", path.display());
            Ok(())
        }
        Command::DeletedUrls { session_id, out } => {
            let api = ApiClient::new(cfg.api());
            let artifact = report::export_deleted_urls(&api, Some(session_id.as_str()))
                .await
                .context("could not download deleted URL list")?;
            let path = artifact
                .save_to(&out.unwrap_or_else(|| cfg.output_dir.clone()))
                .await?;
            println!("Deleted URL list saved to {}", path.display());
            Ok(())
        }
        Command::Status { session_id } => {
            let api = ApiClient::new(cfg.api());
            let status = api
                .fetch_status(&session_id)
                .await
                .context("could not fetch run status")?;
            println!("Session {}", status.session_id);
            let mut files: Vec<_> = status.files.values().collect();
            files.sort_by(|a, b| a.file_id.cmp(&b.file_id));
            for file in files {
                println!(
                    "  {:<16} {:<12} {:>3}% {}",
                    file.file_id,
                    file.status.label(),
                    file.progress.round(),
                    file.error.as_deref().unwrap_or("")
                );
            }
            Ok(())
        }
        Command::Reports => {
            let api = ApiClient::new(cfg.api());
            let reports = api.list_reports().await.context("could not list reports")?;
            if reports.is_empty() {
                println!("No reports");
            }
            for stored in reports {
                let summary = stored.data.summary();
                println!(
                    "{:<24} {} completed, {} deleted, {} pending",
                    stored.session_id, summary.completed, summary.deleted, summary.pending
                );
            }
            Ok(())
        }
    }
}

async fn follow_run(cfg: &ClientConfig, out: PathBuf) -> Result<()> {
    let mut client = SyncClient::from_config(cfg);
    client.connect();

    let urls = client.load_urls().await.context("could not load URL list")?;
    println!("{} files listed", urls.len());

    match client.start_run().await.context("could not start downloads")? {
        StartOutcome::Started { session_id } => println!("Run started, session {}", session_id),
        StartOutcome::Degraded { session_id } => println!(
            "Run start was not confirmed, using local session {} (may not match the backend)",
            session_id
        ),
    }

    loop {
        tokio::select! {
            update = client.next_update() => match update {
                Some(SyncUpdate::Connection(state)) => {
                    println!("Channel: {}", state.label());
                }
                Some(SyncUpdate::Progress(state)) => print_download(&state),
                Some(SyncUpdate::Finished(summary)) => {
                    println!(
                        "Report: {} completed, {} deleted after stall, {} not downloaded",
                        summary.completed, summary.deleted, summary.pending
                    );
                    let unfinished = client
                        .downloads()
                        .filter(|state| !state.status.is_terminal())
                        .count();
                    if unfinished > 0 {
                        println!("{} files never reached completed or failed", unfinished);
                    }
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted");
                client.shutdown();
                return Ok(());
            }
        }
    }

    let result = client.export_report().await;
    client.shutdown();
    let artifact = result.context("could not download report")?;
    let path = artifact.save_to(&out).await?;
    println!("Report saved to {}", path.display());
    Ok(())
}

fn print_download(state: &DownloadState) {
    if state.shows_progress() {
        println!(
            "  {:<16} {:<12} {:>3}% {}",
            state.file_id,
            state.status.label(),
            state.progress,
            state.size_line()
        );
    } else {
        println!("  {:<16} {:<12}", state.file_id, state.status.label());
    }
    if let Some(error) = &state.error {
        println!("    error: {}", error);
    }
    if let Some(message) = &state.message {
        println!("    {}", message);
    }
}
