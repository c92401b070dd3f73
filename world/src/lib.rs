#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Waterworks.
//!
//! The world owns the pipe network and the players. Every mutation flows
//! through [`apply`], which executes one [`Command`] to completion, including
//! all graph surgery, and reports what changed as [`Event`] values.

pub mod flow;
pub mod graph;
pub mod splice;

mod error;
mod player;
mod plumber;
mod saboteur;

pub use error::{ActionFailure, InvariantViolation};
pub use player::PlayerSetup;

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, warn};
use waterworks_core::{
    Action, ActionError, Command, ElementKind, Event, PlayerId, Selection, Size, TurnEndReason,
    WELCOME_BANNER,
};

use crate::{
    graph::{Element, NetworkGraph},
    player::Player,
    splice::PUMP_SIZE,
};

const DEFAULT_RNG_SEED: u64 = 0x5eed_7a7e_12c0_ffee;
const DEFAULT_PUMP_FAILURE_PER_MILLE: u16 = 50;
const DEFAULT_MANUFACTURE_INTERVAL: u64 = 2;
const PER_MILLE: u16 = 1000;

/// Tunables of the round lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldConfig {
    rng_seed: u64,
    pump_failure_per_mille: u16,
    manufacture_interval: u64,
}

impl WorldConfig {
    /// Creates a new configuration.
    ///
    /// `pump_failure_per_mille` is the chance, out of 1000, that a working pump
    /// breaks at the end of a round. A `manufacture_interval` of zero disables
    /// pump manufacturing.
    #[must_use]
    pub const fn new(rng_seed: u64, pump_failure_per_mille: u16, manufacture_interval: u64) -> Self {
        Self {
            rng_seed,
            pump_failure_per_mille,
            manufacture_interval,
        }
    }

    /// Seed of the random number generator driving pump failures.
    #[must_use]
    pub const fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Chance, out of 1000, that a working pump breaks each round.
    #[must_use]
    pub const fn pump_failure_per_mille(&self) -> u16 {
        self.pump_failure_per_mille
    }

    /// Number of rounds between pump deliveries at each cistern.
    #[must_use]
    pub const fn manufacture_interval(&self) -> u64 {
        self.manufacture_interval
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_RNG_SEED,
            DEFAULT_PUMP_FAILURE_PER_MILLE,
            DEFAULT_MANUFACTURE_INTERVAL,
        )
    }
}

/// Represents the authoritative Waterworks world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    config: WorldConfig,
    network: NetworkGraph,
    players: Vec<Player>,
    active: usize,
    started: bool,
    round: u64,
    rng: ChaCha8Rng,
    manufactured: u32,
}

impl World {
    /// Creates a world around `network` with players joining in roster order.
    ///
    /// Fails when the network is inconsistent, a player starts on an element
    /// that does not exist, or two players start on the same pipe.
    pub fn new(
        config: WorldConfig,
        mut network: NetworkGraph,
        roster: Vec<PlayerSetup>,
    ) -> Result<Self, InvariantViolation> {
        network.verify()?;

        let mut players = Vec::with_capacity(roster.len());
        for (index, setup) in (0_u32..).zip(roster) {
            let id = PlayerId::new(index);
            let start = setup.start();
            let element = network
                .element_mut(start)
                .ok_or(InvariantViolation::DanglingPlayer {
                    player: id,
                    element: start,
                })?;
            if let Some(pipe) = element.as_pipe_mut() {
                if pipe.is_occupied() {
                    return Err(InvariantViolation::CrowdedPipe {
                        player: id,
                        pipe: start,
                    });
                }
                pipe.set_occupied(true);
            }
            players.push(Player::from_setup(id, setup));
        }

        Ok(Self {
            banner: WELCOME_BANNER,
            config,
            network,
            players,
            active: 0,
            started: false,
            round: 0,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            manufactured: 0,
        })
    }

    fn active_index_for(&self, player: PlayerId) -> Option<usize> {
        let active = self.players.get(self.active)?;
        (self.started && active.id == player).then_some(self.active)
    }

    fn perform(
        &mut self,
        player: PlayerId,
        action: Action,
        selection: Selection,
        out_events: &mut Vec<Event>,
    ) -> Result<(), InvariantViolation> {
        match self.try_perform(player, action, selection) {
            Ok(detail) => {
                debug!(player = player.get(), ?action, "action performed");
                out_events.push(detail);
                out_events.push(Event::ActionPerformed { player, action });
                self.verify()
            }
            Err(ActionFailure::Rejected(reason)) => {
                warn!(player = player.get(), ?action, %reason, "action rejected");
                out_events.push(Event::ActionRejected {
                    player,
                    action,
                    reason,
                });
                Ok(())
            }
            Err(ActionFailure::Invariant(violation)) => {
                error!(player = player.get(), ?action, %violation, "network invariant violated");
                Err(violation)
            }
        }
    }

    fn try_perform(
        &mut self,
        player: PlayerId,
        action: Action,
        selection: Selection,
    ) -> Result<Event, ActionFailure> {
        let index = self
            .active_index_for(player)
            .ok_or(ActionError::NotYourTurn)?;
        let endpoint_held_elsewhere = self
            .players
            .iter()
            .enumerate()
            .any(|(other, state)| other != index && state.held_endpoint.is_some());
        let actor = self
            .players
            .get_mut(index)
            .ok_or(ActionError::NotYourTurn)?;
        if action.role() != actor.role {
            return Err(ActionError::RoleMismatch.into());
        }

        match action {
            Action::Plumber(action) => plumber::perform(
                &mut self.network,
                actor,
                action,
                selection,
                endpoint_held_elsewhere,
            ),
            Action::Saboteur(action) => {
                saboteur::perform(&mut self.network, actor, action, selection)
            }
        }
    }

    fn end_turn(
        &mut self,
        player: PlayerId,
        reason: TurnEndReason,
        out_events: &mut Vec<Event>,
    ) -> Result<(), InvariantViolation> {
        if self.active_index_for(player).is_none() {
            warn!(player = player.get(), ?reason, "ignoring end of turn for inactive player");
            return Ok(());
        }

        debug!(player = player.get(), ?reason, "turn ended");
        out_events.push(Event::TurnEnded { player, reason });
        self.active += 1;
        if self.active >= self.players.len() {
            self.active = 0;
            self.complete_round(out_events)?;
        }
        self.announce_turn(out_events);
        Ok(())
    }

    fn announce_turn(&self, out_events: &mut Vec<Event>) {
        if let Some(next) = self.players.get(self.active) {
            info!(player = %next.name, role = ?next.role, "turn started");
            out_events.push(Event::TurnStarted {
                player: next.id,
                role: next.role,
            });
        }
    }

    fn complete_round(&mut self, out_events: &mut Vec<Event>) -> Result<(), InvariantViolation> {
        self.round = self.round.saturating_add(1);

        let report = flow::transfer_water(&mut self.network);
        out_events.push(Event::WaterTransferred {
            collected: report.collected(),
            leaked: report.leaked(),
        });

        self.break_pumps(out_events);
        self.manufacture_pumps(out_events)?;

        info!(
            round = self.round,
            collected = flow::collected_water(&self.network),
            leaked = flow::leaked_water(&self.network),
            "round completed"
        );
        out_events.push(Event::RoundCompleted { round: self.round });
        self.verify()
    }

    fn break_pumps(&mut self, out_events: &mut Vec<Event>) {
        let chance = self.config.pump_failure_per_mille.min(PER_MILLE);
        let pumps: Vec<_> = self.network.ids_of_kind(ElementKind::Pump).collect();
        for pump in pumps {
            let Some(element) = self.network.element_mut(pump) else {
                continue;
            };
            if !element.is_visible() || !element.is_working() {
                continue;
            }
            if self.rng.gen_range(0..PER_MILLE) < chance {
                element.set_working(false);
                out_events.push(Event::PumpBroke { pump });
            }
        }
    }

    fn manufacture_pumps(&mut self, out_events: &mut Vec<Event>) -> Result<(), InvariantViolation> {
        let interval = self.config.manufacture_interval;
        if interval == 0 || self.round % interval != 0 {
            return Ok(());
        }

        let idle: Vec<_> = self
            .network
            .ids_of_kind(ElementKind::Cistern)
            .filter(|id| {
                self.network
                    .cistern(*id)
                    .is_some_and(|cistern| cistern.manufactured().is_none())
            })
            .collect();
        for cistern in idle {
            let position = self
                .network
                .element(cistern)
                .ok_or(InvariantViolation::MissingElement(cistern))?
                .position();
            self.manufactured = self.manufactured.saturating_add(1);
            let pump = self.network.add_element(
                Element::pump(
                    format!("pump {}", self.manufactured),
                    position,
                    Size::new(PUMP_SIZE, PUMP_SIZE),
                )
                .hidden(),
            );
            self.network
                .element_mut(cistern)
                .and_then(Element::as_cistern_mut)
                .ok_or(InvariantViolation::MissingElement(cistern))?
                .set_manufactured(Some(pump));
            out_events.push(Event::PumpManufactured { cistern, pump });
        }
        Ok(())
    }

    /// Checks every structural invariant of the network and the players.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        self.network.verify()?;

        let held = self
            .players
            .iter()
            .filter(|player| player.held_endpoint.is_some())
            .count();
        if held > 1 {
            return Err(InvariantViolation::MultipleHeldEndpoints);
        }

        let mut pipes_held = BTreeSet::new();
        for player in &self.players {
            if let Some(element) = player.current {
                let standing_on = self.network.element(element).ok_or(
                    InvariantViolation::DanglingPlayer {
                        player: player.id,
                        element,
                    },
                )?;
                if standing_on.as_pipe().is_some() && !pipes_held.insert(element) {
                    return Err(InvariantViolation::CrowdedPipe {
                        player: player.id,
                        pipe: element,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Player mistakes are reported as [`Event::ActionRejected`] and leave the
/// world untouched. A structural fault aborts the command with an
/// [`InvariantViolation`]; the world must not be used afterwards.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), InvariantViolation> {
    match command {
        Command::StartGame => {
            if world.started {
                warn!("ignoring start of an already running game");
                return Ok(());
            }
            world.started = true;
            world.announce_turn(out_events);
            Ok(())
        }
        Command::Perform {
            player,
            action,
            selection,
        } => world.perform(player, action, selection, out_events),
        Command::EndTurn { player, reason } => world.end_turn(player, reason, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use waterworks_core::{Hit, NetworkView, PlayerSnapshot, Point, Scores};

    use super::{flow, graph::NetworkGraph, World, WorldConfig};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> WorldConfig {
        world.config
    }

    /// Provides read-only access to the pipe network.
    #[must_use]
    pub fn network(world: &World) -> &NetworkGraph {
        &world.network
    }

    /// Captures ordered snapshots of every element and endpoint.
    #[must_use]
    pub fn network_view(world: &World) -> NetworkView {
        world.network.view()
    }

    /// Resolves a pointer position against the live registries.
    #[must_use]
    pub fn hit_test(world: &World, point: Point) -> Option<Hit> {
        world.network.hit_test(point)
    }

    /// Water delivered to cisterns so far.
    #[must_use]
    pub fn collected_water(world: &World) -> u32 {
        flow::collected_water(&world.network)
    }

    /// Water lost through leaks so far.
    #[must_use]
    pub fn leaked_water(world: &World) -> u32 {
        flow::leaked_water(&world.network)
    }

    /// Scores of both teams.
    #[must_use]
    pub fn scores(world: &World) -> Scores {
        Scores {
            collected: collected_water(world),
            leaked: leaked_water(world),
        }
    }

    /// Player whose turn is running, once the game has started.
    #[must_use]
    pub fn current_player(world: &World) -> Option<PlayerSnapshot> {
        if !world.started {
            return None;
        }
        world
            .players
            .get(world.active)
            .map(|player| player.snapshot(&world.network))
    }

    /// Snapshots of every player in turn order.
    #[must_use]
    pub fn players(world: &World) -> Vec<PlayerSnapshot> {
        world
            .players
            .iter()
            .map(|player| player.snapshot(&world.network))
            .collect()
    }

    /// Number of completed rounds.
    #[must_use]
    pub fn round(world: &World) -> u64 {
        world.round
    }
}
