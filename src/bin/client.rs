//! # Client Binary Entry Point
//!
//! Command-line front-end for the session orchestrator.
//!
//! ## Usage
//!
//! One-shot upload (sign in, pick, upload, sign out):
//! ```bash
//! cargo run --bin client -- --config config/client.toml upload \
//!   --source library --image cat.jpg --dest photos
//! ```
//!
//! Long-lived interactive session:
//! ```bash
//! cargo run --bin client -- --config config/client.toml shell
//! ```
//!
//! The password comes from `--password`, then the config file, then a prompt. Credentials live
//! only for the lifetime of the process.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

use cloud_uploader::client::{
    FileAcquirer, IdentityInput, IdentityMode, ImageSource, Outcome, SessionMetrics,
    SessionOrchestrator,
};
use cloud_uploader::common::config::{load_config, ClientConfig};
use cloud_uploader::utils::logging::init_logger;

/// Command-line arguments for the client binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the client configuration file (TOML format)
    ///
    /// Example: config/client.toml
    #[arg(short, long)]
    config: String,

    /// Password for the configured identity (prompted for when absent)
    #[arg(long)]
    password: Option<String>,

    /// Path to write metrics JSON output (optional)
    #[arg(long)]
    metrics_output: Option<String>,

    /// Log debug output, including every HTTP call
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in, acquire one image, upload it, and sign out
    Upload {
        /// Image source
        #[arg(long, value_enum, default_value_t = ImageSource::Library)]
        source: ImageSource,

        /// Library image to upload (relative paths resolve against the library directory)
        #[arg(long)]
        image: Option<PathBuf>,

        /// Destination path under private file storage (defaults to the config value)
        #[arg(long)]
        dest: Option<String>,
    },

    /// Interactive session driven by line commands
    Shell,
}

/// Line-oriented stdin reader shared by prompts and the shell loop.
struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Prints `label` and reads one line; `None` at end of input.
    async fn ask(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(label.as_bytes()).await?;
        stdout.flush().await?;
        Ok(self.lines.next_line().await?.map(|l| l.trim().to_string()))
    }
}

type Session = SessionOrchestrator<FileAcquirer>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    init_logger(level, Some("reqwest=warn,hyper=warn"));

    // Load client configuration from TOML file
    let config: ClientConfig = load_config(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config))?;

    let acquirer = FileAcquirer::new(config.images.clone());
    let mut session = SessionOrchestrator::new(config.api.clone(), acquirer)?;

    // Initialize metrics if output path is specified
    let metrics = if args.metrics_output.is_some() {
        let m = Arc::new(Mutex::new(SessionMetrics::new(session_name(&config))));
        session = session.with_metrics(m.clone());
        Some(m)
    } else {
        None
    };

    let mut prompt = Prompt::new();
    let result = match args.command {
        Command::Upload {
            source,
            image,
            dest,
        } => {
            let dest = dest
                .or_else(|| config.upload.destination_path.clone())
                .unwrap_or_default();
            run_once(
                &mut session,
                &config,
                args.password.as_deref(),
                &mut prompt,
                source,
                image,
                &dest,
            )
            .await
        }
        Command::Shell => {
            run_shell(&mut session, &config, args.password.as_deref(), &mut prompt).await
        }
    };

    // Export metrics if enabled
    if let (Some(metrics), Some(output_path)) = (metrics, args.metrics_output) {
        let metrics = metrics.lock().unwrap_or_else(|e| e.into_inner());
        metrics.export_to_json(&output_path)?;
        println!("Metrics exported to: {}", output_path);
    }

    result
}

fn session_name(config: &ClientConfig) -> String {
    match config.identity.mode {
        IdentityMode::Root => config.identity.email.clone(),
        IdentityMode::Sam => format!(
            "{}/{}",
            config.identity.operator_id, config.identity.user_name
        ),
    }
}

/// Builds the identity for the configured mode, asking for the password when needed.
async fn identity(
    config: &ClientConfig,
    password: Option<&str>,
    prompt: &mut Prompt,
) -> anyhow::Result<IdentityInput> {
    let password = match password.or(config.identity.password.as_deref()) {
        Some(p) => p.to_string(),
        None => prompt.ask("Password: ").await?.unwrap_or_default(),
    };
    let identity = IdentityInput::from_form(
        config.identity.mode,
        &config.identity.email,
        &config.identity.operator_id,
        &config.identity.user_name,
        &password,
    )?;
    Ok(identity)
}

async fn run_once(
    session: &mut Session,
    config: &ClientConfig,
    password: Option<&str>,
    prompt: &mut Prompt,
    source: ImageSource,
    image: Option<PathBuf>,
    dest: &str,
) -> anyhow::Result<()> {
    if source == ImageSource::Library && image.is_none() {
        bail!("--image is required with --source library");
    }

    let identity = identity(config, password, prompt).await?;
    report(&session.authenticate(identity).await?);

    if let Some(image) = image {
        session.acquirer().queue_pick(image);
    }

    let upload = select_and_upload(session, source, dest).await;

    // Sign out whatever happened to the upload.
    let sign_out = session.sign_out().await;
    upload?;
    report(&sign_out?);
    Ok(())
}

async fn select_and_upload(
    session: &mut Session,
    source: ImageSource,
    dest: &str,
) -> anyhow::Result<()> {
    match session.select_image(source).await? {
        Outcome::SelectionCancelled => bail!("No image selected"),
        selected => report(&selected),
    }
    report(&session.upload(dest).await?);
    Ok(())
}

const SHELL_HELP: &str = "\
Commands:
  login                      sign in with the configured identity
  select camera              take the newest capture
  select library <file>      pick a file from the library directory
  upload [path]              upload the selected image
  status                     show session state
  logout                     sign out
  quit                       leave the shell";

async fn run_shell(
    session: &mut Session,
    config: &ClientConfig,
    password: Option<&str>,
    prompt: &mut Prompt,
) -> anyhow::Result<()> {
    println!("{}", SHELL_HELP);

    while let Some(line) = prompt.ask("> ").await? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };

        let result = match (command, words.next()) {
            ("login", _) => match identity(config, password, prompt).await {
                Ok(identity) => session.authenticate(identity).await.map(Some),
                Err(e) => {
                    println!("Error: {}", e);
                    continue;
                }
            },
            ("select", Some("camera")) => session.select_image(ImageSource::Camera).await.map(Some),
            ("select", Some("library")) => {
                let Some(file) = words.next() else {
                    println!("Usage: select library <file>");
                    continue;
                };
                session.acquirer().queue_pick(file);
                session.select_image(ImageSource::Library).await.map(Some)
            }
            ("upload", path) => {
                let dest = path
                    .map(str::to_string)
                    .or_else(|| config.upload.destination_path.clone())
                    .unwrap_or_default();
                session.upload(&dest).await.map(Some)
            }
            ("logout", _) => session.sign_out().await.map(Some),
            ("status", _) => {
                print_status(session, config);
                Ok(None)
            }
            ("quit" | "exit", _) => break,
            _ => {
                println!("{}", SHELL_HELP);
                Ok(None)
            }
        };

        match result {
            Ok(Some(outcome)) => report(&outcome),
            Ok(None) => {}
            Err(e) => println!("Error: {}", e),
        }
    }

    // Leaving the shell ends the process; sign out so the token does not outlive it.
    if session.is_authenticated() {
        match session.sign_out().await {
            Ok(outcome) => report(&outcome),
            Err(e) => println!("Error: {}", e),
        }
    }
    Ok(())
}

fn print_status(session: &Session, config: &ClientConfig) {
    println!("State: {}", session.state());
    match session.current_image() {
        Some(image) => println!("Image: {} ({})", image.uri(), image.content_type()),
        None => println!("Image: none"),
    }
    if let Some(dest) = &config.upload.destination_path {
        println!(
            "Default destination: {} (upload {})",
            dest,
            if session.can_upload(dest) {
                "ready"
            } else {
                "not ready"
            }
        );
    }
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Uploaded(receipt) => println!(
            "{}: {} ({} bytes)",
            outcome.message(),
            receipt.remote_url,
            receipt.bytes
        ),
        other => println!("{}", other.message()),
    }
}
