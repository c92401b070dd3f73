//! Host loop gluing the turn engine to the world.

use std::time::Duration;

use tracing::{debug, info};
use waterworks_core::{Command, Event, Selection};
use waterworks_rendering::{vec2_to_point, FrameInput, Hud, Palette, Scene};
use waterworks_system_turn::{TurnEngine, TurnInput};
use waterworks_world::{self as world, query, InvariantViolation, World};

/// Running game: the world, the turn engine and the pending selection.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    engine: TurnEngine,
    selection: Selection,
    pending: Vec<Event>,
    palette: Palette,
}

impl Session {
    /// Starts the game on `world`.
    pub(crate) fn start(mut world: World, engine: TurnEngine) -> Result<Self, InvariantViolation> {
        let mut pending = Vec::new();
        world::apply(&mut world, Command::StartGame, &mut pending)?;
        Ok(Self {
            world,
            engine,
            selection: Selection::none(),
            pending,
            palette: Palette::default(),
        })
    }

    /// World driven by the session.
    #[cfg(test)]
    pub(crate) const fn world(&self) -> &World {
        &self.world
    }

    /// Advances the game by one frame and returns the events it produced.
    ///
    /// A click replaces the selection with whatever lies under the pointer;
    /// a miss clears it. The selection then travels with every action until
    /// the next click or the start of the next turn.
    pub(crate) fn tick(
        &mut self,
        dt: Duration,
        input: FrameInput,
    ) -> Result<Vec<Event>, InvariantViolation> {
        if self
            .pending
            .iter()
            .any(|event| matches!(event, Event::TurnStarted { .. }))
        {
            self.selection = Selection::none();
        }
        if let Some(click) = input.click {
            let hit = query::hit_test(&self.world, vec2_to_point(click));
            self.selection = Selection::from_hit(hit);
            debug!(?hit, "pointer click resolved");
        }

        let observed = std::mem::take(&mut self.pending);
        let mut commands = Vec::new();
        self.engine.handle(
            &observed,
            dt,
            TurnInput {
                key: input.key,
                selection: self.selection,
            },
            &mut commands,
        );

        for command in commands {
            world::apply(&mut self.world, command, &mut self.pending)?;
        }
        for event in &self.pending {
            info!(?event, "world event");
        }
        Ok(self.pending.clone())
    }

    /// Scene describing the current state of the game.
    pub(crate) fn scene(&self) -> Scene {
        let active = query::current_player(&self.world);
        let hud = Hud::new(
            active.as_ref(),
            self.engine.remaining(),
            query::scores(&self.world),
        );
        Scene::from_snapshots(
            &query::network_view(&self.world),
            &query::players(&self.world),
            active.map(|player| player.id),
            self.selection,
            hud,
            &self.palette,
        )
    }
}
