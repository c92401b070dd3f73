//! Game configuration loaded from an optional TOML file.

use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use waterworks_core::Role;
use waterworks_system_bootstrap::RosterEntry;
use waterworks_system_turn::Config as TurnConfig;
use waterworks_world::WorldConfig;

const DEFAULT_TURN_MILLIS: u64 = 10_000;
const DEFAULT_MAX_ACTIONS: u8 = 2;
const DEFAULT_TICK_MILLIS: u64 = 100;

/// Settings for one session; every field falls back to its default.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    /// Time budget of one turn, in milliseconds.
    pub(crate) turn_millis: u64,
    /// Actions a player may take per turn.
    pub(crate) max_actions: u8,
    /// Simulated time that passes per script line without an explicit delay.
    pub(crate) tick_millis: u64,
    /// Seed of the pump failure generator.
    pub(crate) seed: u64,
    /// Chance, per thousand, that a working pump breaks each round.
    pub(crate) pump_failure_per_mille: u16,
    /// Rounds between pump deliveries to idle cisterns; zero disables them.
    pub(crate) manufacture_interval: u64,
    /// Players in turn order.
    pub(crate) players: Vec<PlayerEntry>,
}

/// Player listed in the configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlayerEntry {
    /// Display name.
    pub(crate) name: String,
    /// Team, `Plumber` or `Saboteur`.
    pub(crate) role: Role,
}

impl Default for GameConfig {
    fn default() -> Self {
        let world = WorldConfig::default();
        Self {
            turn_millis: DEFAULT_TURN_MILLIS,
            max_actions: DEFAULT_MAX_ACTIONS,
            tick_millis: DEFAULT_TICK_MILLIS,
            seed: world.rng_seed(),
            pump_failure_per_mille: world.pump_failure_per_mille(),
            manufacture_interval: world.manufacture_interval(),
            players: Vec::new(),
        }
    }
}

impl GameConfig {
    /// Loads the configuration at `path`, or the defaults when none is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read game config at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid game config at {}", path.display()))
    }

    /// Parses and validates TOML configuration contents.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse game config toml contents")?;
        if config.turn_millis == 0 {
            bail!("turn_millis must be positive");
        }
        if config.max_actions == 0 {
            bail!("max_actions must be positive");
        }
        if config.pump_failure_per_mille > 1000 {
            bail!(
                "pump_failure_per_mille must not exceed 1000 (received {})",
                config.pump_failure_per_mille
            );
        }
        Ok(config)
    }

    /// Settings consumed by the world.
    pub(crate) const fn world(&self) -> WorldConfig {
        WorldConfig::new(
            self.seed,
            self.pump_failure_per_mille,
            self.manufacture_interval,
        )
    }

    /// Settings consumed by the turn engine.
    pub(crate) const fn turn(&self) -> TurnConfig {
        TurnConfig::new(Duration::from_millis(self.turn_millis), self.max_actions)
    }

    /// Simulated time per script line.
    pub(crate) const fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    /// Configured players, or `fallback` when the file lists none.
    pub(crate) fn roster(&self, fallback: Vec<RosterEntry>) -> Vec<RosterEntry> {
        if self.players.is_empty() {
            return fallback;
        }
        self.players
            .iter()
            .map(|player| RosterEntry::new(player.name.clone(), player.role))
            .collect()
    }
}
