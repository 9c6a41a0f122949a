//! Interactive prompt refinement CLI.
//!
//! Everything here is presentation: state lives in the [`Workbench`] and
//! below it in `prompt_core` / `session_store`.

mod workbench;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;
use gemini_client::{GeminiClient, GeminiConfig};
use prompt_core::PromptTree;
use session_store::{SessionStore, SqliteSessionStore};

use crate::workbench::{Workbench, WorkbenchError};

#[derive(Parser)]
#[command(name = "optimizer-cli")]
#[command(about = "Iteratively refine a prompt through critique-and-revise branches")]
#[command(version)]
struct Cli {
    /// Session database path
    #[arg(long, default_value = "prompt_optimizer.db")]
    db: PathBuf,

    /// Model used to produce responses to prompts under evaluation
    #[arg(long)]
    target_model: Option<String>,

    /// Model used to rewrite prompts from critiques
    #[arg(long)]
    aligning_model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List sessions, newest first
    Sessions,
    /// Create a session and start refining
    New {
        /// Session name
        name: String,
        /// Initial prompt; prompted for interactively if omitted
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Resume an existing session
    Open {
        /// Session id as shown by `sessions`
        session_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let store = Arc::new(SqliteSessionStore::new(&cli.db));
    store.init().await.context("initialize session database")?;

    if let Commands::Sessions = cli.command {
        return list_sessions(&store).await;
    }

    let config = GeminiConfig::new();
    let Some(api_key) = config.api_key.clone() else {
        bail!("GEMINI_API_KEY is not set; set it in the environment or in config.toml");
    };
    let mut client = GeminiClient::new(api_key);
    if let Some(base_url) = &config.base_url {
        client = client.with_base_url(base_url);
    }
    let generator = Arc::new(client);

    let target_model = cli
        .target_model
        .unwrap_or_else(|| config.target_model().to_string());
    let aligning_model = cli
        .aligning_model
        .unwrap_or_else(|| config.aligning_model().to_string());
    log::debug!("target model '{}', aligning model '{}'", target_model, aligning_model);

    match cli.command {
        Commands::Sessions => unreachable!("handled above"),
        Commands::New { name, prompt } => {
            let mut bench =
                Workbench::create(store, generator, &name, target_model, aligning_model)
                    .await
                    .context("create session")?;
            println!(
                "Created session {} ({})",
                bench.session_id().to_string().bold(),
                name
            );

            let initial = match prompt {
                Some(text) => text,
                None => read_line("Initial prompt> ")?,
            };
            bench.start(&initial).await.context("store initial prompt")?;
            run_loop(bench).await
        }
        Commands::Open { session_id } => {
            let bench = Workbench::open(store, generator, session_id, target_model, aligning_model)
                .await
                .with_context(|| format!("open session {}", session_id))?;
            run_loop(bench).await
        }
    }
}

async fn list_sessions(store: &SqliteSessionStore) -> anyhow::Result<()> {
    let sessions = store.list_sessions().await.context("list sessions")?;
    if sessions.is_empty() {
        println!("No sessions yet. Start one with `optimizer-cli new <name>`.");
        return Ok(());
    }
    for session in sessions {
        println!("{:>6}  {}", session.id.to_string().bold(), session.name);
    }
    Ok(())
}

/// The critique-and-revise loop: render the current version, make sure it
/// has a response, then read either a critique or a `/` command.
async fn run_loop<S: SessionStore>(mut bench: Workbench<S>) -> anyhow::Result<()> {
    if bench.current().is_none() {
        let initial = read_line("Initial prompt> ")?;
        bench.start(&initial).await.context("store initial prompt")?;
    }

    loop {
        render_current(&bench);

        match bench.ensure_response().await {
            Ok(true) => {
                render_current(&bench);
            }
            Ok(false) => {}
            Err(error @ WorkbenchError::Generation(_)) => {
                eprintln!("{} {}", "error:".red().bold(), error);
                eprintln!("The prompt is unchanged; press enter to retry or type /quit.");
            }
            Err(error) => return Err(error.into()),
        }

        let line = read_line("critique (or /help)> ")?;
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/q" => return Ok(()),
            "/help" => {
                println!("/versions        list all versions, newest first");
                println!("/use <node-id>   switch to a version");
                println!("/quit            leave the session");
                println!("Any other text is taken as a critique of the current response.");
            }
            "/versions" => render_versions(bench.tree()),
            _ if line.starts_with("/use ") => {
                let node_id = line.trim_start_matches("/use ").trim();
                match bench.select(node_id).await {
                    Ok(()) => {}
                    Err(error @ WorkbenchError::Tree(_)) => {
                        eprintln!("{} {}", "error:".red().bold(), error)
                    }
                    Err(error) => return Err(error.into()),
                }
            }
            _ if line.starts_with('/') => {
                eprintln!("{} unknown command {}", "error:".red().bold(), line)
            }
            critique => match bench.refine(critique).await {
                Ok(node_id) => {
                    let version = bench.tree().version_of(&node_id).unwrap_or_default();
                    println!(
                        "{} version {} ({})",
                        "Created".green().bold(),
                        version,
                        node_id
                    );
                }
                Err(
                    error @ (WorkbenchError::Generation(_)
                    | WorkbenchError::Revise(_)
                    | WorkbenchError::MissingResponse),
                ) => {
                    eprintln!("{} {}", "error:".red().bold(), error);
                    eprintln!("Nothing was changed; you can retry the critique.");
                }
                Err(error) => return Err(error.into()),
            },
        }
    }
}

fn render_current<S: SessionStore>(bench: &Workbench<S>) {
    let Some(node) = bench.current() else {
        return;
    };
    let version = bench.tree().version_of(&node.id).unwrap_or_default();

    println!();
    println!(
        "{} {} {}",
        format!("Version {}", version).cyan().bold(),
        node.id.dimmed(),
        if node.is_root() { "(root)" } else { "" }
    );
    println!("{}", "Prompt:".bold());
    println!("{}", node.prompt_text);
    match &node.response_text {
        Some(response) => {
            println!("{}", "Response:".bold());
            println!("{}", response);
        }
        None => println!("{}", "(no response yet, generating...)".dimmed()),
    }
    if !node.children.is_empty() {
        println!("{}", "Branches:".bold());
        for child_id in &node.children {
            let critique = node
                .critiques
                .get(child_id)
                .map(String::as_str)
                .unwrap_or("");
            let child_version = bench.tree().version_of(child_id).unwrap_or_default();
            println!("  version {} <- {}", child_version, critique.italic());
        }
    }
}

fn render_versions(tree: &PromptTree) {
    for (node_id, version) in tree.list_versions() {
        let marker = if tree.current_id() == Some(node_id.as_str()) {
            "(current)"
        } else {
            ""
        };
        println!("  version {:>3}  {}  {}", version, node_id, marker.dimmed());
    }
}

fn read_line(prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt.bold());
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}
