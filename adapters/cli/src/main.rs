#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a scripted Waterworks session.

mod config;
mod script;
mod session;
mod terminal;

use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, Level};
use waterworks_rendering::{Color, Presentation, RenderingBackend};
use waterworks_system_bootstrap::Bootstrap;
use waterworks_system_turn::TurnEngine;

use crate::{config::GameConfig, session::Session, terminal::TerminalBackend};

const WINDOW_TITLE: &str = "Waterworks";

/// Plumbers against saboteurs on a network of pipes, played from a script.
#[derive(Debug, Parser)]
#[command(name = "waterworks", version)]
struct Args {
    /// TOML file overriding the default game settings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Script of input frames; standard input is read when omitted.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Increase log verbosity; repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Entry point for the Waterworks command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(log_level(args.verbose))
        .with_writer(io::stderr)
        .init();

    let config = GameConfig::load(args.config.as_deref())?;
    let frames = script::parse(&read_script(args.script.as_deref())?)
        .context("failed to parse input script")?;

    let bootstrap = Bootstrap;
    let roster = config.roster(bootstrap.default_roster());
    let world = bootstrap
        .world(config.world(), &roster)
        .context("failed to build the standard map")?;
    println!("{}", bootstrap.welcome_banner(&world));
    info!(players = roster.len(), frames = frames.len(), "starting session");

    let mut session = Session::start(world, TurnEngine::new(config.turn()))
        .context("failed to start the game")?;
    let presentation = Presentation::new(
        WINDOW_TITLE,
        Color::from_rgb_u8(0, 0, 0),
        session.scene(),
    );
    let backend = TerminalBackend::new(frames, config.tick(), io::stdout().lock());

    backend.run(presentation, move |dt, input, scene| {
        let _ = session.tick(dt, input).map_err(|violation| {
            error!(%violation, "halting on inconsistent network");
            violation
        })?;
        *scene = session.scene();
        Ok(())
    })
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn read_script(path: Option<&std::path::Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read script at {}", path.display())),
        None => {
            let mut contents = String::new();
            let _ = io::stdin()
                .read_to_string(&mut contents)
                .context("failed to read script from standard input")?;
            Ok(contents)
        }
    }
}
