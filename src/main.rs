use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use log::info;

mod api;
mod app;
mod config;
mod handler;
mod markdown;
mod transcript;
mod tui;
mod ui;

use api::ChatClient;
use app::App;
use config::Config;

#[derive(Parser)]
#[command(name = "gamebot")]
#[command(about = "Terminal chat client for a video-game assistant backend")]
#[command(version)]
struct Cli {
    /// Base URL of the chat backend (overrides the config file)
    #[arg(short, long)]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session (default)
    Chat,
    /// Send a single message and print the reply
    Ask {
        /// The message to send
        message: String,
    },
    /// Persist default settings to the config file
    Config {
        /// Default server URL
        #[arg(long)]
        server: Option<String>,
        /// Default transcript output path
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_default();

    let server_url = cli
        .server
        .or_else(|| config.server_url.clone())
        .unwrap_or_else(|| config::DEFAULT_SERVER_URL.to_string());
    let client = ChatClient::new(&server_url);

    match cli.command {
        Some(Commands::Ask { message }) => {
            init_logging(false)?;
            ask(&client, &message).await
        }
        Some(Commands::Config { server, transcript }) => set_config(config, server, transcript),
        Some(Commands::Chat) | None => {
            init_logging(true)?;
            run_chat(client, config).await
        }
    }
}

/// In chat mode the terminal owns stderr, so diagnostics go to a log file
/// next to the working directory instead.
fn init_logging(to_file: bool) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if to_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("gamebot.log")?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

async fn ask(client: &ChatClient, message: &str) -> Result<()> {
    let message = message.trim();
    anyhow::ensure!(!message.is_empty(), "message is empty");

    let reply = client.send_message(message, &[]).await?;
    println!("{}", "Bot:".yellow().bold());
    println!("{reply}");
    Ok(())
}

fn set_config(
    mut config: Config,
    server: Option<String>,
    transcript: Option<PathBuf>,
) -> Result<()> {
    if server.is_none() && transcript.is_none() {
        println!("Nothing to change. Pass --server and/or --transcript.");
        return Ok(());
    }
    if let Some(server) = server {
        config.server_url = Some(server);
    }
    if let Some(transcript) = transcript {
        config.transcript_path = Some(transcript);
    }
    config.save()?;
    println!("{}", "Configuration saved.".green());
    Ok(())
}

async fn run_chat(client: ChatClient, config: Config) -> Result<()> {
    info!("starting chat session against {}", client.base_url());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::Events::new(Duration::from_millis(250));

    let transcript_path = config
        .transcript_path
        .unwrap_or_else(|| PathBuf::from("gamebot-transcript.html"));
    let mut app = App::new(client, transcript_path);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;
        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event).await?,
            None => break,
        }
    }

    tui::restore()?;
    Ok(())
}
