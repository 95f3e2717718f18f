use crate::backend::SimulatedPlatform;
use crate::cli::RunCliArgs;
use crate::config::Config;
use crate::coordinator::{self, CoordinatorHandle, CoordinatorParts, StatusEvent, WorkerOptions};
use anyhow::{anyhow, Result};
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub script: Option<String>,
    pub json: bool,
}

impl From<RunCliArgs> for RunOptions {
    fn from(args: RunCliArgs) -> Self {
        Self {
            script: args.script,
            json: args.json,
        }
    }
}

/// Foreground events the control surface forwards to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForegroundCommand {
    Initialize,
    Show,
    Hide,
    Resume,
    Status,
    Quit,
}

impl FromStr for ForegroundCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "init" | "initialize" => Ok(Self::Initialize),
            "show" | "visible" => Ok(Self::Show),
            "hide" | "hidden" => Ok(Self::Hide),
            "resume" | "retry" => Ok(Self::Resume),
            "status" => Ok(Self::Status),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(anyhow!(
                "Unknown command '{other}' (expected init, show, hide, resume, status, quit)"
            )),
        }
    }
}

pub fn coordinator_parts(config: &Config, platform: &SimulatedPlatform) -> CoordinatorParts {
    CoordinatorParts {
        capture: Box::new(platform.clone()),
        authorization: Arc::new(platform.clone()),
        enumerator: Arc::new(platform.clone()),
        video_selector: config.selection.video.to_selector(),
        audio_selector: config.selection.audio.to_selector(),
        options: WorkerOptions {
            binding: config.session.binding_request(),
            request_audio_authorization: config.session.request_audio_authorization,
        },
    }
}

pub async fn run_service(config: Config, options: RunOptions) -> Result<()> {
    info!("Starting capture session coordinator");

    let platform = SimulatedPlatform::from_config(&config.simulation);
    let (handle, events) = coordinator::spawn(coordinator_parts(&config, &platform));
    let printer = tokio::spawn(print_events(events, options.json));

    handle.initialize()?;

    match &options.script {
        Some(script) => {
            for step in script.split(',').filter(|s| !s.trim().is_empty()) {
                let command = step.parse::<ForegroundCommand>()?;
                if !dispatch(&handle, command, options.json).await? {
                    break;
                }
            }
        }
        None => {
            info!("Commands: show, hide, resume, init, status, quit");
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ForegroundCommand>() {
                    Ok(command) => {
                        if !dispatch(&handle, command, options.json).await? {
                            break;
                        }
                    }
                    Err(e) => warn!("{}", e),
                }
            }
        }
    }

    handle.shutdown().await?;
    printer.await?;
    info!("Capture session coordinator stopped");
    Ok(())
}

/// Forward one command. Returns `false` once the surface should close.
async fn dispatch(handle: &CoordinatorHandle, command: ForegroundCommand, json: bool) -> Result<bool> {
    match command {
        ForegroundCommand::Initialize => handle.initialize()?,
        ForegroundCommand::Show => handle.become_visible()?,
        ForegroundCommand::Hide => handle.become_hidden()?,
        ForegroundCommand::Resume => handle.resume()?,
        ForegroundCommand::Status => {
            handle.settled().await?;
            let snapshot = handle.snapshot();
            if json {
                println!("{}", serde_json::to_string(&snapshot)?);
            } else {
                println!(
                    "phase={} setup={} running={}{}",
                    snapshot.phase.as_str(),
                    snapshot.setup_result.map_or("pending", |r| r.as_str()),
                    snapshot.is_running,
                    snapshot
                        .last_error
                        .map(|e| format!(" error=\"{e}\""))
                        .unwrap_or_default()
                );
            }
        }
        ForegroundCommand::Quit => return Ok(false),
    }
    Ok(true)
}

async fn print_events(mut events: mpsc::UnboundedReceiver<StatusEvent>, json: bool) {
    while let Some(event) = events.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("Failed to encode status event: {}", e),
            }
        } else if event.is_failure() {
            println!("[!] {}", event.message());
        } else {
            println!("[*] {}", event.message());
        }
    }
}
