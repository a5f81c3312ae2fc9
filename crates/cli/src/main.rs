//! Command-line client for uploading podcast episodes.

mod config;
mod progress;

use anyhow::{Context, Result};
use castup_client::{
    CancellationToken, EpisodeUploader, HttpEpisodeApi, ProgressReporter, ProgressUpdate,
    UploadError, UploadOptions,
};
use castup_core::{
    Attachment, AudioSource, ChunkPlan, EpisodeDraft, EpisodeMetadata, episode::audio_content_type,
};
use clap::{Args, Parser, Subcommand};
use config::Overrides;
use progress::BarReporter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "castup")]
#[command(about = "Upload podcast episodes in chunks")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ConfigArgs {
    /// Client config file path
    #[arg(long, env = "CASTUP_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum audio bytes per request (overrides client config)
    #[arg(long)]
    chunk_size: Option<u64>,
}

#[derive(Args, Clone)]
struct ApiArgs {
    /// Podcast API base URL (overrides client config)
    #[arg(long)]
    server: Option<String>,

    /// Bearer token (overrides client config)
    #[arg(long, env = "CASTUP_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args)]
struct UploadArgs {
    /// Podcast the episode belongs to
    #[arg(long)]
    podcast_id: String,

    /// Episode name
    #[arg(long)]
    name: String,

    /// Episode description
    #[arg(long)]
    description: String,

    /// Cover image file
    #[arg(long)]
    cover: PathBuf,

    /// Audio file (mp3, wav, aac, ogg, flac or m4a)
    #[arg(long)]
    audio: PathBuf,

    /// Mark the episode as explicit
    #[arg(long, default_value_t = false)]
    explicit: bool,

    /// Do not draw a progress bar
    #[arg(long, default_value_t = false)]
    no_progress: bool,

    #[command(flatten)]
    api: ApiArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a new episode
    Upload(UploadArgs),
    /// Show how an audio file would be split into requests
    Plan {
        /// Audio file
        #[arg(long)]
        audio: PathBuf,

        #[command(flatten)]
        settings: ConfigArgs,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let Cli { verbose, command } = Cli::parse();
    init_tracing(verbose);

    let result = match command {
        Commands::Upload(args) => handle_upload_command(args).await,
        Commands::Plan { audio, settings } => handle_plan_command(&audio, &settings).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", error_message(&err));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Server messages are shown verbatim; everything else with its cause chain.
fn error_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<UploadError>() {
        Some(upload)
            if matches!(
                upload.root(),
                UploadError::Status { .. } | UploadError::Validation(_)
            ) =>
        {
            upload.user_message()
        }
        _ => format!("{err:#}"),
    }
}

async fn handle_upload_command(args: UploadArgs) -> Result<()> {
    let UploadArgs {
        podcast_id,
        name,
        description,
        cover,
        audio,
        explicit,
        no_progress,
        api,
    } = args;

    let config = config::resolve(
        api.config.config.as_deref(),
        &Overrides {
            server: api.server,
            token: api.token,
            chunk_size: api.config.chunk_size,
        },
    )?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid client configuration: {e}"))?;

    let cover = Attachment::from_path(&cover)
        .await
        .with_context(|| format!("failed to read cover image {}", cover.display()))?;
    let audio = AudioSource::open(&audio)
        .await
        .with_context(|| format!("failed to open audio file {}", audio.display()))?;
    let file_name = audio.file_name().to_string();

    let draft = EpisodeDraft {
        metadata: EpisodeMetadata {
            podcast_id,
            name,
            description,
            is_explicit: explicit,
        },
        cover: Some(cover),
        audio: Some(audio),
    };

    let uploader = EpisodeUploader::new(
        HttpEpisodeApi::new(&config)?,
        UploadOptions::from_config(&config),
    );

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling upload");
            watcher.cancel();
        }
    });

    let bar = (!no_progress).then(|| Arc::new(BarReporter::new(&file_name)));
    let reporter: Arc<dyn ProgressReporter> = match &bar {
        Some(bar) => Arc::clone(bar) as Arc<dyn ProgressReporter>,
        None => Arc::new(|_: ProgressUpdate| {}) as Arc<dyn ProgressReporter>,
    };

    let result = uploader.upload(&draft, reporter, &cancel).await;
    if let Some(bar) = &bar {
        match &result {
            Ok(_) => bar.finish("done"),
            Err(_) => bar.abandon(),
        }
    }

    let receipt = result?;
    eprintln!(
        "Uploaded {} in {} chunk(s) ({} bytes)",
        file_name,
        receipt.chunks,
        receipt.bytes
    );
    println!("{}", receipt.episode_id);
    Ok(())
}

async fn handle_plan_command(audio: &Path, args: &ConfigArgs) -> Result<()> {
    let config = config::resolve(
        args.config.as_deref(),
        &Overrides {
            chunk_size: args.chunk_size,
            ..Overrides::default()
        },
    )?;
    config
        .validate_chunk_size()
        .map_err(|e| anyhow::anyhow!("invalid client configuration: {e}"))?;

    let source = AudioSource::open(audio)
        .await
        .with_context(|| format!("failed to open audio file {}", audio.display()))?;
    let plan = ChunkPlan::new(source.size(), config.chunk_size)?;

    println!(
        "{}: {} bytes, {}",
        source.file_name(),
        plan.file_size(),
        audio_content_type(source.file_name()).unwrap_or("unsupported format")
    );
    println!(
        "{} request(s) of up to {} bytes",
        plan.total_chunks(),
        plan.chunk_size()
    );
    for range in &plan {
        let endpoint = if range.index == 0 {
            "create"
        } else {
            "append"
        };
        println!(
            "  {}/{} {:<6} bytes {}..{} ({} bytes)",
            range.sequence(),
            plan.total_chunks(),
            endpoint,
            range.start,
            range.end,
            range.len()
        );
    }
    Ok(())
}
