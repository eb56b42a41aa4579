//! AI Tutor CLI
//!
//! Terminal front end for chatting with, and studying from, an uploaded PDF.

mod commands;
mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tutor_core::{
    ApiClient, Command, Config, ModeShell, Notice, Sender, TutorApp, DEFAULT_BASE_URL,
};

use crate::commands::{parse_input, Input, HELP};

/// AI Tutor - study a PDF with an AI tutor
///
/// Upload a lecture PDF, then ask questions about it, take a timed mock exam
/// generated from it, or review flashcards summarizing it.
#[derive(Parser, Debug)]
#[command(name = "tutor")]
#[command(version, about, long_about = None)]
struct Args {
    /// PDF to upload on start
    #[arg(value_name = "PDF")]
    document: Option<PathBuf>,

    /// Path to configuration file (default: tutor.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Number of exam questions (3, 5 or 10)
    #[arg(long, value_name = "N")]
    questions: Option<u32>,

    /// Exam time limit in seconds (60, 180, 300 or 600)
    #[arg(long, value_name = "SECS")]
    time_limit: Option<u32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("AI Tutor starting");
    tracing::debug!(config = ?args.config, "Config file");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs the interactive session until `/quit`, end of input or Ctrl+C.
async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(questions) = args.questions {
        config.exam_question_count = questions;
    }
    if let Some(time_limit) = args.time_limit {
        config.exam_time_limit = time_limit;
    }

    // Re-validate after overrides
    config.validate()?;

    let client = ApiClient::new();
    check_backend(&client).await;

    let (mut app, mut events) = TutorApp::new(client, &config);

    println!();
    println!("{}", render::mode_tabs(app.shell().mode()));
    println!("{}", render::view(app.shell()));
    println!("/help 로 명령어를 확인하세요.");

    if let Some(document) = args.document {
        for command in [Command::SelectFile(document), Command::Upload] {
            let notices = app.execute(command);
            present(app.shell(), &notices);
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::debug!("End of input");
                    break;
                };

                match parse_input(&line, app.shell().mode()) {
                    Ok(None) => {}
                    Ok(Some(Input::Quit)) => break,
                    Ok(Some(Input::Help)) => println!("{HELP}"),
                    Ok(Some(Input::Show)) => {
                        println!("{}", render::mode_tabs(app.shell().mode()));
                        println!("{}", render::view(app.shell()));
                    }
                    Ok(Some(Input::Run(commands))) => {
                        for command in commands {
                            let notices = app.execute(command);
                            present(app.shell(), &notices);
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }
            Some(event) = events.recv() => {
                let notices = app.handle(event);
                present(app.shell(), &notices);
            }
        }
    }

    println!("안녕히 가세요.");
    Ok(())
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Reports whether the backend answers. The session starts either way.
async fn check_backend(client: &ApiClient) {
    match client.health_check().await {
        Ok(message) => {
            tracing::info!(backend = %client.base_url(), message = %message, "Backend is up");
        }
        Err(e) => {
            tracing::warn!(backend = %client.base_url(), error = %e, "Backend health check failed");
            println!("백엔드에 연결할 수 없습니다 ({DEFAULT_BASE_URL}). 서버를 먼저 실행해주세요.");
        }
    }
}

/// Prints what the driver reported.
fn present(shell: &ModeShell, notices: &[Notice]) {
    for notice in notices {
        match notice {
            Notice::Alert(message) => println!("[알림] {message}"),
            Notice::Status(message) => println!("{message}"),
            Notice::ChatUpdated => print_chat_update(shell),
            Notice::ViewChanged => {
                println!("{}", render::mode_tabs(shell.mode()));
                println!("{}", render::view(shell));
            }
            Notice::Countdown { remaining_secs } => {
                // Every tick would flood the terminal.
                if let Some(exam) = shell.exam() {
                    if remaining_secs % 30 == 0 || exam.is_urgent() {
                        println!("{}", render::countdown_line(exam));
                    }
                }
            }
        }
    }
}

/// Prints the newest assistant turn, or the waiting indicator.
fn print_chat_update(shell: &ModeShell) {
    if shell.chat().is_awaiting() {
        println!("{}", render::thinking());
        return;
    }
    if let Some(turn) = shell
        .transcript()
        .turns()
        .last()
        .filter(|turn| turn.sender == Sender::Assistant)
    {
        println!("{}", render::chat_turn(turn));
    }
}
