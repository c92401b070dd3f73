#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn engine that time-boxes each player's turn and caps its actions.
//!
//! The engine is a pure system: it consumes world events, the elapsed time and
//! the input gathered by an adapter, and emits commands. It never touches the
//! world directly.

use std::time::Duration;

use tracing::{debug, warn};
use waterworks_core::{Command, Event, KeyBinding, PlayerId, Role, Selection, TurnEndReason};

const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(10);
const DEFAULT_MAX_ACTIONS: u8 = 2;

/// Configuration parameters required to construct the turn engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    time_budget: Duration,
    max_actions: u8,
}

impl Config {
    /// Creates a new configuration with the provided budget and action cap.
    #[must_use]
    pub const fn new(time_budget: Duration, max_actions: u8) -> Self {
        Self {
            time_budget,
            max_actions,
        }
    }

    /// Time a player may spend on one turn.
    #[must_use]
    pub const fn time_budget(&self) -> Duration {
        self.time_budget
    }

    /// Number of actions a player may take in one turn.
    #[must_use]
    pub const fn max_actions(&self) -> u8 {
        self.max_actions
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_BUDGET, DEFAULT_MAX_ACTIONS)
    }
}

/// Phase of the running turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    /// The player may press an action key.
    WaitingForAction,
    /// An action was requested and the world has not resolved it yet.
    ActionInProgress,
    /// The turn is over; the engine waits for the next one to start.
    TurnComplete,
}

/// Input gathered by an adapter during one host tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TurnInput {
    /// Edge-triggered key pressed this tick, if any.
    pub key: Option<char>,
    /// Target resolved from the latest pointer click.
    pub selection: Selection,
}

impl TurnInput {
    /// Input carrying only a key press.
    #[must_use]
    pub const fn key(key: char) -> Self {
        Self {
            key: Some(key),
            selection: Selection::none(),
        }
    }

    /// Input carrying a key press and an explicit target.
    #[must_use]
    pub const fn with_selection(key: char, selection: Selection) -> Self {
        Self {
            key: Some(key),
            selection,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ActiveTurn {
    player: PlayerId,
    role: Role,
    remaining: Duration,
    actions_taken: u8,
    state: TurnState,
}

impl ActiveTurn {
    fn finish(&mut self, reason: TurnEndReason, out: &mut Vec<Command>) {
        debug!(player = self.player.get(), ?reason, "turn finished");
        self.state = TurnState::TurnComplete;
        out.push(Command::EndTurn {
            player: self.player,
            reason,
        });
    }
}

/// Pure system that drives turns from host ticks.
#[derive(Debug)]
pub struct TurnEngine {
    config: Config,
    turn: Option<ActiveTurn>,
}

impl TurnEngine {
    /// Creates a new engine using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, turn: None }
    }

    /// Phase of the running turn; idle engines report a completed turn.
    #[must_use]
    pub fn state(&self) -> TurnState {
        self.turn
            .map_or(TurnState::TurnComplete, |turn| turn.state)
    }

    /// Time left in the running turn.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.turn.map_or(Duration::ZERO, |turn| turn.remaining)
    }

    /// Actions requested so far in the running turn.
    #[must_use]
    pub fn actions_taken(&self) -> u8 {
        self.turn.map_or(0, |turn| turn.actions_taken)
    }

    /// Player owning the running turn.
    #[must_use]
    pub fn active_player(&self) -> Option<PlayerId> {
        self.turn.map(|turn| turn.player)
    }

    /// Consumes world events and one tick of input to emit turn commands.
    ///
    /// The elapsed time is charged before the key is read, so a key pressed on
    /// the tick that exhausts the budget is ignored.
    pub fn handle(
        &mut self,
        events: &[Event],
        dt: Duration,
        input: TurnInput,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            self.observe(event, out);
        }

        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        if turn.state == TurnState::TurnComplete {
            return;
        }

        turn.remaining = turn.remaining.saturating_sub(dt);
        if turn.remaining.is_zero() {
            turn.finish(TurnEndReason::TimeExpired, out);
            return;
        }

        let Some(key) = input.key else {
            return;
        };
        if turn.state == TurnState::ActionInProgress {
            debug!(key = %key, "ignoring key while an action is in progress");
            return;
        }

        match turn.role.binding_for(key) {
            Some(KeyBinding::Act(action)) => {
                turn.actions_taken = turn.actions_taken.saturating_add(1);
                turn.state = TurnState::ActionInProgress;
                out.push(Command::Perform {
                    player: turn.player,
                    action,
                    selection: input.selection,
                });
            }
            Some(KeyBinding::Pass) => turn.finish(TurnEndReason::Passed, out),
            None => warn!(key = %key, role = ?turn.role, "unrecognised key"),
        }
    }

    fn observe(&mut self, event: &Event, out: &mut Vec<Command>) {
        match *event {
            Event::TurnStarted { player, role } => {
                self.turn = Some(ActiveTurn {
                    player,
                    role,
                    remaining: self.config.time_budget,
                    actions_taken: 0,
                    state: TurnState::WaitingForAction,
                });
            }
            Event::ActionPerformed { player, .. } | Event::ActionRejected { player, .. } => {
                let max_actions = self.config.max_actions;
                let Some(turn) = self.turn.as_mut() else {
                    return;
                };
                if turn.player != player || turn.state != TurnState::ActionInProgress {
                    return;
                }
                turn.state = TurnState::WaitingForAction;
                if turn.actions_taken >= max_actions {
                    turn.finish(TurnEndReason::ActionsExhausted, out);
                }
            }
            _ => {}
        }
    }
}

/// Converts a level-triggered key state into single presses.
///
/// Adapters register the key held during each frame; a press is latched only
/// when the held key changes, and [`KeyLatch::take`] hands it out once.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyLatch {
    held: Option<char>,
    latched: Option<char>,
}

impl KeyLatch {
    /// Records the key held during this frame, latching it when newly pressed.
    pub fn register(&mut self, key: Option<char>) {
        let key = key.map(|key| key.to_ascii_uppercase());
        if key.is_some() && key != self.held {
            self.latched = key;
        }
        self.held = key;
    }

    /// Returns the latched press and clears it so the action fires only once.
    pub fn take(&mut self) -> Option<char> {
        self.latched.take()
    }
}
