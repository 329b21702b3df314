// src/main.rs
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::ai::gemini::GeminiClient;
use crate::config::GenerationConfig;
use crate::controller::{AppController, AppStatus, DOWNLOAD_FILE_NAME};
use crate::intake::SlotKind;

mod ai;
mod config;
mod controller;
mod gui;
mod intake;

#[derive(Parser)]
#[command(name = "aevora")]
#[command(about = "Create a picture of your adult self hugging your childhood self", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run graphical user interface (default)
    Gui,
    /// Generate a hug image without opening a window
    Generate {
        /// Photo of you as a child
        #[arg(long)]
        child: PathBuf,

        /// Recent photo of you as an adult
        #[arg(long)]
        adult: PathBuf,

        /// Where to save the result
        #[arg(long, short = 'o', default_value = DOWNLOAD_FILE_NAME)]
        output: PathBuf,
    },
    /// Check that the API key and model are accepted
    CheckApi,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or("RUST_LOG", "info")
    );

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Gui) {
        Commands::Gui => gui::run_gui(build_controller()),
        Commands::Generate { child, adult, output } => run_generate_cli(child, adult, output),
        Commands::CheckApi => check_api(),
    }
}

/// Resolve configuration once. A missing key still yields a usable
/// controller; Generate then reports the problem in the UI.
fn build_controller() -> AppController {
    match GenerationConfig::from_env().and_then(GeminiClient::new) {
        Ok(client) => AppController::new(Arc::new(client)),
        Err(e) => {
            error!("Generation is unavailable: {}", e);
            AppController::unconfigured(e.to_string())
        }
    }
}

fn run_generate_cli(child: PathBuf, adult: PathBuf, output: PathBuf) -> Result<()> {
    info!("Starting headless generation");
    let mut controller = build_controller();

    controller.select_image(SlotKind::Child, child);
    controller.select_image(SlotKind::Adult, adult);
    wait_while_busy(&mut controller);

    if controller.can_generate() {
        controller.generate();
        wait_while_busy(&mut controller);
    }

    match controller.status() {
        AppStatus::Success => {
            controller.save_result(&output)?;
            println!("Memory created: {}", output.display());
            Ok(())
        }
        _ => {
            let message = controller
                .error()
                .unwrap_or(controller::FALLBACK_ERROR_MESSAGE)
                .to_string();
            Err(anyhow!(message))
        }
    }
}

fn wait_while_busy(controller: &mut AppController) {
    while matches!(controller.status(), AppStatus::Uploading | AppStatus::Processing) {
        controller.poll_blocking(Duration::from_millis(250));
    }
}

fn check_api() -> Result<()> {
    let config = GenerationConfig::from_env()?;
    info!("Checking model {} at {}...", config.model, config.endpoint);
    let client = GeminiClient::new(config)?;

    match client.health_check() {
        Ok(()) => {
            println!("✓ API key accepted, model {} is available", client.model());
            Ok(())
        }
        Err(e) => {
            println!("✗ Check failed: {}", e);
            println!("\nTroubleshooting:");
            println!("  1. Set API_KEY to a Gemini API key from https://aistudio.google.com");
            println!("  2. Make sure the model name in AEVORA_MODEL (if set) exists");
            Err(e.into())
        }
    }
}
