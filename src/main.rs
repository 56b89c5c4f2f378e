//! # CMS Media Ingest - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione (`.env.local` + ambiente)
//! - Esecuzione dei due step del workflow per il sottocomando scelto
//!
//! ## Flusso di esecuzione:
//! 1. Step 1: processa tutti i file selezionati e mostra il riepilogo
//! 2. Chiede la password di upload (o usa `--password`)
//! 3. Step 2: upload, con possibilità di riprovare gli item falliti
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-ingest images ./photos --mode square
//! media-ingest audio ./recordings --channels stereo --password "$UPLOAD_PASSWORD"
//! media-ingest team-member --name "Asha Rao" --role coordinator --photo asha.png
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cms_media_ingest::json_output::JsonMessage;
use cms_media_ingest::progress::ProgressManager;
use cms_media_ingest::{
    AudioProcessor, BatchState, Channels, ClearPolicy, Config, FileManager, IngestError, IngestSession,
    MediaKind, NormalizeMode, RawMedia, Role, TeamMemberForm,
};

#[derive(Parser)]
#[command(name = "media-ingest")]
#[command(about = "Normalize images and audio, then upload them to the CMS")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Upload password (prompted on stdin when omitted)
    #[arg(long, global = true)]
    password: Option<String>,

    /// Number of files processed in parallel
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Output progress and results as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resize/compress images and upload them as assets
    Images {
        /// Image files or directories (jpg, jpeg, png, webp)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(short, long, value_enum, default_value = "horizontal")]
        mode: ModeArg,

        /// What to do with the batch after a partially failed upload
        #[arg(long, value_enum)]
        clear_policy: Option<PolicyArg>,
    },

    /// Compress audio to 64 kbps MP3 and upload it as assets
    Audio {
        /// Audio files or directories (mp3, wav, m4a, ogg)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(short, long, value_enum, default_value = "mono")]
        channels: ChannelsArg,

        #[arg(long, value_enum)]
        clear_policy: Option<PolicyArg>,
    },

    /// Add a team member entry with a square profile photo
    TeamMember {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        /// coordinator, secretary or ex-coordinator
        #[arg(long)]
        role: Option<String>,
        /// Only for coordinators
        #[arg(long, default_value = "")]
        phone: String,
        /// Only for ex-coordinators
        #[arg(long, default_value = "")]
        year: String,
        /// Max 2 lines
        #[arg(long, default_value = "")]
        sher: String,
        #[arg(long, default_value = "")]
        sher_author: String,
        #[arg(long)]
        photo: Option<PathBuf>,
    },

    /// Verify configuration and external tools
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Horizontal,
    Square,
}

#[derive(Clone, Copy, ValueEnum)]
enum ChannelsArg {
    Mono,
    Stereo,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    RequireAll,
    Always,
    DropSucceeded,
}

impl From<PolicyArg> for ClearPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::RequireAll => ClearPolicy::RequireAllSucceeded,
            PolicyArg::Always => ClearPolicy::AlwaysClear,
            PolicyArg::DropSucceeded => ClearPolicy::DropSucceeded,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::from_env().context("Missing Configuration! Check .env.local or the environment")?;
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.json_output = args.json;

    let result = run(args.command, config, args.password).await;
    if let Err(ref e) = result {
        if args.json {
            if let Some(ingest_error) = e.downcast_ref::<IngestError>() {
                JsonMessage::error(ingest_error).emit();
            }
        }
    }
    result
}

async fn run(command: Commands, mut config: Config, password: Option<String>) -> Result<()> {
    match command {
        Commands::Images { paths, mode, clear_policy } => {
            if let Some(policy) = clear_policy {
                config.image_clear_policy = policy.into();
            }
            let mode = match mode {
                ModeArg::Horizontal => NormalizeMode::Horizontal,
                ModeArg::Square => NormalizeMode::Square,
            };

            let files = load(&paths, MediaKind::Image).await?;
            let mut session = IngestSession::new(&config)?;
            let report = session.process_images(files, mode).await?;
            print_process_report(&report);
            commit_loop(&mut session, MediaKind::Image, password.as_deref()).await
        }
        Commands::Audio { paths, channels, clear_policy } => {
            if let Some(policy) = clear_policy {
                config.audio_clear_policy = policy.into();
            }
            let channels = match channels {
                ChannelsArg::Mono => Channels::Mono,
                ChannelsArg::Stereo => Channels::Stereo,
            };

            AudioProcessor::check_dependencies()?;
            let files = load(&paths, MediaKind::Audio).await?;
            let mut session = IngestSession::new(&config)?;
            let report = session.process_audio(files, channels).await?;
            print_process_report(&report);
            commit_loop(&mut session, MediaKind::Audio, password.as_deref()).await
        }
        Commands::TeamMember { name, email, role, phone, year, sher, sher_author, photo } => {
            let role = role.map(|r| r.parse::<Role>()).transpose()?;
            let photo = match photo {
                Some(path) => FileManager::read_media(&[path]).await?.pop(),
                None => None,
            };
            let form = TeamMemberForm { name, email, role, phone, year, sher, sher_author, photo };

            let mut session = IngestSession::new(&config)?;
            let draft = session.prepare_team_member(form).await?;
            eprintln!(
                "✅ Data prepared for '{}' ({} square photo). Please authenticate to upload.",
                draft.name,
                FileManager::format_size(draft.photo.size())
            );
            team_commit_loop(&mut session, password.as_deref()).await
        }
        Commands::Check => {
            eprintln!("✅ Configuration loaded for {}", config.api_url);
            match AudioProcessor::check_dependencies() {
                Ok(()) => eprintln!("✅ ffmpeg available"),
                Err(e) => eprintln!("❌ {}", e),
            }
            Ok(())
        }
    }
}

async fn load(paths: &[PathBuf], kind: MediaKind) -> Result<Vec<RawMedia>> {
    let files = FileManager::find_media_files(paths, kind)?;
    info!("Found {} {}", files.len(), kind.label());
    Ok(FileManager::read_media(&files).await?)
}

fn print_process_report(report: &cms_media_ingest::ProcessReport) {
    for failure in &report.failures {
        eprintln!("❌ {} skipped: {}", failure.name, failure.error);
    }
    eprintln!("✅ {}", report.summary());
}

/// Ask for the password until the batch is committed or the user gives up
async fn commit_loop(session: &mut IngestSession, kind: MediaKind, password: Option<&str>) -> Result<()> {
    loop {
        if session.batch(kind).is_empty() {
            return Ok(());
        }
        eprintln!("Ready to upload {} {}.", session.batch(kind).len(), kind.label());

        let Some(attempt) = password_attempt(password)? else {
            session.discard(kind);
            eprintln!("Batch discarded, nothing uploaded.");
            return Ok(());
        };

        match session.commit(kind, &attempt).await {
            Ok(report) => {
                for failure in &report.failures {
                    eprintln!("❌ {}: {}", failure.name, failure.error);
                }
                for record in &report.records {
                    let label = record.path().map(str::to_string).unwrap_or_else(|| record.id_label());
                    eprintln!("✅ Uploaded: {}", label);
                }
                eprintln!("{}", report.summary());

                if report.state != BatchState::PartiallyUploaded || password.is_some() || !confirm("Retry failed uploads? [y/N] ")? {
                    return Ok(());
                }
            }
            Err(IngestError::AuthMismatch) if password.is_none() => eprintln!("❌ Incorrect Password."),
            Err(e) => return Err(e.into()),
        }
    }
}

async fn team_commit_loop(session: &mut IngestSession, password: Option<&str>) -> Result<()> {
    loop {
        let Some(attempt) = password_attempt(password)? else {
            eprintln!("Team member discarded, nothing uploaded.");
            return Ok(());
        };

        let spinner = ProgressManager::spinner("Uploading asset and creating entry...");
        let result = session.commit_team_member(&attempt).await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => {
                eprintln!("✅ Team member added successfully!");
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }
            Err(IngestError::AuthMismatch) if password.is_none() => eprintln!("❌ Incorrect Password."),
            Err(e) if password.is_none() => {
                eprintln!("❌ {}", e);
                if !confirm("Retry? [y/N] ")? {
                    return Ok(());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// The `--password` value, or one line from stdin. An empty line means "give up".
fn password_attempt(password: Option<&str>) -> Result<Option<String>> {
    if let Some(p) = password {
        return Ok(Some(p.to_string()));
    }
    let line = prompt("Enter Upload Password: ")?;
    Ok((!line.is_empty()).then_some(line))
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(question)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn prompt(message: &str) -> Result<String> {
    eprint!("{}", message);
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
