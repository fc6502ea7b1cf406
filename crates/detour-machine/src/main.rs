//! `detour-replay`: drive a detour session from JSON files

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, Command};
use detour_machine::logging::{init_logging, LogFormat};
use detour_machine::prelude::*;
use detour_machine::RouteId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("detour-replay")
        .version(detour_machine::VERSION)
        .about("Replay detour authoring events and print the resulting snapshot")
        .arg(
            Arg::new("input")
                .long("input")
                .value_parser(value_parser!(PathBuf))
                .conflicts_with("snapshot")
                .help("Construction input JSON ({ route?, routePattern? })"),
        )
        .arg(
            Arg::new("snapshot")
                .long("snapshot")
                .value_parser(value_parser!(PathBuf))
                .help("Resume from a persisted snapshot instead of an input"),
        )
        .arg(
            Arg::new("patterns")
                .long("patterns")
                .value_parser(value_parser!(PathBuf))
                .help("Route patterns by route id ({ \"66\": [..] })"),
        )
        .arg(
            Arg::new("events")
                .long("events")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON array of events to send in order"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("TOML session configuration"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help("trace|debug|info|warn|error|off"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_parser(LogFormat::variants().to_vec())
                .help("Log output format"),
        )
        .arg(
            Arg::new("verbose-states")
                .long("verbose-states")
                .action(ArgAction::SetTrue)
                .help("Log the state after every event"),
        );

    let matches = cli.get_matches();

    init_logging(
        matches.get_one::<String>("log-level").map(String::as_str),
        matches.get_one::<String>("log-format").map(String::as_str),
    )?;

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => DetourConfig::from_toml_str(&read(path)?)?,
        None => DetourConfig::default(),
    };

    let lookup = match matches.get_one::<PathBuf>("patterns") {
        Some(path) => load_patterns(path)?,
        None => InMemoryRoutePatternLookup::new(),
    };
    let lookup: Arc<dyn RoutePatternLookup> = Arc::new(lookup);

    let mut session = if let Some(path) = matches.get_one::<PathBuf>("snapshot") {
        let snapshot = DetourSnapshot::from_json(&read(path)?)?;
        DetourSession::restore(snapshot, lookup, config)?
    } else {
        let input = match matches.get_one::<PathBuf>("input") {
            Some(path) => serde_json::from_str::<DetourInput>(&read(path)?)
                .with_context(|| format!("invalid input in {}", path.display()))?,
            None => DetourInput::Blank,
        };
        DetourSession::start(input, lookup, config)
    };
    session.settle().await;

    let events_path = matches
        .get_one::<PathBuf>("events")
        .context("--events is required")?;
    let events: serde_json::Value = serde_json::from_str(&read(events_path)?)?;
    let Some(events) = events.as_array() else {
        bail!("{} must contain a JSON array", events_path.display());
    };

    let verbose = matches.get_flag("verbose-states");
    for (index, event) in events.iter().enumerate() {
        let handled = session.send_value(event);
        session.settle().await;
        if !handled {
            tracing::warn!(index, "event not handled");
        }
        if verbose {
            tracing::info!(index, state = %session.state(), "replayed");
        }
    }

    if let Some(error) = session.last_lookup_error() {
        tracing::warn!(%error, "last route pattern lookup failed");
    }

    let snapshot = session.snapshot().to_value()?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_patterns(path: &Path) -> anyhow::Result<InMemoryRoutePatternLookup> {
    let entries: HashMap<String, Vec<RoutePattern>> = serde_json::from_str(&read(path)?)
        .with_context(|| format!("invalid route patterns in {}", path.display()))?;
    Ok(InMemoryRoutePatternLookup::from_entries(
        entries
            .into_iter()
            .map(|(route_id, route_patterns)| (RouteId::new(route_id), route_patterns)),
    ))
}
