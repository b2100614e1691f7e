//! # Gatekeep Station
//!
//! Headless operator terminal for one gate. Lists and manages gates, and
//! runs a check-in / check-out session driven by typed commands on stdin.
//! Scanner input is simulated with `qr CODE` lines.

mod cli;
mod console;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatekeep_core::{
    ConfigSource, StationConfig,
    gates::{GateDraft, GateService},
    roster::{HttpRosterClient, InMemoryRoster, RosterSource},
    scan::ChannelCamera,
    session::{GateEvent, GateSession, SessionSettings},
};
use gatekeep_model::{EventId, GateId, GateScope, SessionAreaId};

use crate::cli::{Cli, Command, RunArgs};
use crate::console::{HELP, Input, parse_line, render};

const DEMO_AREA: &str = "main-hall";
const DEMO_ROSTER_SIZE: usize = 40;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Override via RUST_LOG.
                "warn,gate::session=info,gate::gates=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(path) = env_file {
        info!(path = %path.display(), "loaded .env file");
    }

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Gates { event } => list_gates(&config, event.into()).await,
        Command::Areas { event } => list_areas(&config, event.into()).await,
        Command::CreateGate {
            event,
            area,
            agenda,
        } => {
            let draft = match area {
                Some(area) => GateDraft::area(event, Some(area.into())),
                None => GateDraft::event(event),
            };
            let draft = match agenda {
                Some(agenda) => draft.with_agenda(agenda),
                None => draft,
            };
            create_gate(&config, draft).await
        }
        Command::DeleteGate { gate } => delete_gate(&config, gate.into()).await,
        Command::Run(args) => run_session(&config, args).await,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<StationConfig> {
    let (mut config, source) = StationConfig::load_from_env()?;
    match &source {
        ConfigSource::Default => info!("using default station config"),
        ConfigSource::EnvPath(path) | ConfigSource::File(path) => {
            info!(path = %path.display(), "loaded station config")
        }
        ConfigSource::EnvInline => {
            info!("loaded station config from GATEKEEP_CONFIG_JSON")
        }
    }

    if let Some(server) = &cli.server {
        config.server_url = server.clone();
    }
    if let Some(token) = &cli.token {
        config.api_token = Some(token.clone());
    }
    config.validate()?;
    Ok(config)
}

fn gate_service(config: &StationConfig) -> anyhow::Result<GateService> {
    let client = HttpRosterClient::from_config(config)
        .context("failed to build roster client")?;
    Ok(GateService::new(
        Arc::new(client),
        config.station_base_url.clone(),
    ))
}

async fn list_gates(
    config: &StationConfig,
    event: EventId,
) -> anyhow::Result<()> {
    let gates = gate_service(config)?
        .list_gates(&event)
        .await
        .with_context(|| format!("failed to list gates for event {event}"))?;
    if gates.is_empty() {
        println!("no gates for event {event}");
    }
    for gate in gates {
        let scope = match &gate.session_area_id {
            Some(area) => format!("area {area}"),
            None => "event".to_string(),
        };
        println!(
            "{:>8}  {:<16}  {}",
            gate.id.as_str(),
            scope,
            gate.url.unwrap_or_default()
        );
    }
    Ok(())
}

async fn list_areas(
    config: &StationConfig,
    event: EventId,
) -> anyhow::Result<()> {
    let areas = gate_service(config)?
        .session_areas(&event)
        .await
        .with_context(|| {
            format!("failed to list session areas for event {event}")
        })?;
    for area in areas {
        println!("{:>8}  {}", area.id.as_str(), area.name);
    }
    Ok(())
}

async fn create_gate(
    config: &StationConfig,
    draft: GateDraft,
) -> anyhow::Result<()> {
    let gate = gate_service(config)?
        .create_gate(draft)
        .await
        .context("failed to create gate")?;
    println!("created gate {}", gate.id);
    if let Some(url) = gate.url {
        println!("share: {url}");
    }
    Ok(())
}

async fn delete_gate(
    config: &StationConfig,
    gate: GateId,
) -> anyhow::Result<()> {
    gate_service(config)?
        .delete_gate(&gate)
        .await
        .with_context(|| format!("failed to delete gate {gate}"))?;
    println!("deleted gate {gate}");
    Ok(())
}

async fn run_session(
    config: &StationConfig,
    args: RunArgs,
) -> anyhow::Result<()> {
    let event = EventId::from(args.event);
    let area = args.area.map(SessionAreaId::from);

    let source: Arc<dyn RosterSource> = if args.demo {
        let demo_area = area
            .clone()
            .unwrap_or_else(|| SessionAreaId::from(DEMO_AREA));
        info!(event = %event, area = %demo_area, "using demo roster");
        Arc::new(InMemoryRoster::demo(&event, &demo_area, DEMO_ROSTER_SIZE))
    } else {
        Arc::new(
            HttpRosterClient::from_config(config)
                .context("failed to build roster client")?,
        )
    };

    let scope = match area {
        Some(area) => GateScope::area(event, area),
        None => GateScope::event(event),
    };
    let camera = ChannelCamera::new();
    let (session, handle) = GateSession::new(
        SessionSettings::from(config),
        source,
        Arc::new(camera.clone()),
        scope,
        args.queue.into(),
    );
    let mut events = handle.subscribe();
    let task = session.spawn();

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                let line = line.context("failed to read stdin")?;
                let Some(line) = line else {
                    // EOF ends the session like `quit`.
                    stdin_open = false;
                    handle.shutdown().await;
                    continue;
                };
                match parse_line(&line) {
                    Ok(None) => {}
                    Ok(Some(Input::Command(command))) => {
                        handle.send(command).await?
                    }
                    Ok(Some(Input::Decode(code))) => {
                        if !camera.feed(code.clone()) {
                            println!("camera is off, {code:?} ignored");
                        }
                    }
                    Ok(Some(Input::Help)) => println!("{HELP}"),
                    Ok(Some(Input::Quit)) => handle.shutdown().await,
                    Err(message) => println!("{message}"),
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    println!("{}", render(&event));
                    if matches!(event, GateEvent::Closed) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "console fell behind session events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    task.await.context("gate session task failed")?;
    Ok(())
}
