#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure bootstrap system that prepares a Waterworks session.

use waterworks_core::{ElementId, Orientation, Point, Role, Size};
use waterworks_world::{
    graph::{Element, NetworkGraph},
    query, InvariantViolation, PlayerSetup, World, WorldConfig,
};

const NODE_SIZE: Size = Size::new(60, 60);
const PUMP_SIZE: Size = Size::new(50, 50);
const PIPE_THICKNESS: i32 = 20;

/// Player taking part in a session, before being seated on the map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterEntry {
    name: String,
    role: Role,
}

impl RosterEntry {
    /// Creates a roster entry.
    #[must_use]
    pub fn new<N>(name: N, role: Role) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            role,
        }
    }

    /// Display name of the player.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Team of the player.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }
}

/// Network every session starts from, with the landmarks players start on.
#[derive(Debug)]
pub struct StandardMap {
    network: NetworkGraph,
    cisterns: Vec<ElementId>,
    springs: Vec<ElementId>,
    pump: ElementId,
}

impl StandardMap {
    /// Network of the map.
    #[must_use]
    pub fn network(&self) -> &NetworkGraph {
        &self.network
    }

    /// Cisterns in registry order; plumbers start on them.
    #[must_use]
    pub fn cisterns(&self) -> &[ElementId] {
        &self.cisterns
    }

    /// Springs in registry order; saboteurs start on them.
    #[must_use]
    pub fn springs(&self) -> &[ElementId] {
        &self.springs
    }

    /// Pump joining the map's two halves.
    #[must_use]
    pub const fn pump(&self) -> ElementId {
        self.pump
    }
}

/// Produces the data a session starts from.
#[derive(Debug, Default)]
pub struct Bootstrap;

impl Bootstrap {
    /// Derives the banner that should be shown when the session starts.
    #[must_use]
    pub fn welcome_banner(&self, world: &World) -> &'static str {
        query::welcome_banner(world)
    }

    /// Two players per team, alternating plumbers and saboteurs.
    #[must_use]
    pub fn default_roster(&self) -> Vec<RosterEntry> {
        vec![
            RosterEntry::new("Mario", Role::Plumber),
            RosterEntry::new("Wario", Role::Saboteur),
            RosterEntry::new("Luigi", Role::Plumber),
            RosterEntry::new("Waluigi", Role::Saboteur),
        ]
    }

    /// Builds the standard map.
    ///
    /// The west spring feeds the central pump, which forwards into the east
    /// cistern. The north cistern and south spring hang off the pump's idle
    /// connections until a player redirects it.
    pub fn standard_map(&self) -> Result<StandardMap, InvariantViolation> {
        let mut network = NetworkGraph::new();

        let north = network.add_element(Element::cistern(
            "north cistern",
            Point::new(370, 110),
            NODE_SIZE,
        ));
        let east = network.add_element(Element::cistern(
            "east cistern",
            Point::new(700, 300),
            NODE_SIZE,
        ));
        let west = network.add_element(Element::spring(
            "west spring",
            Point::new(40, 300),
            NODE_SIZE,
            1,
        ));
        let south = network.add_element(Element::spring(
            "south spring",
            Point::new(370, 520),
            NODE_SIZE,
            1,
        ));
        let pump = network.add_element(Element::pump(
            "central pump",
            Point::new(375, 300),
            PUMP_SIZE,
        ));

        let feed = lay_pipe(
            &mut network,
            "pipe 1",
            (Point::new(100, 315), 275, Orientation::Horizontal),
            west,
            pump,
        )?;
        let delivery = lay_pipe(
            &mut network,
            "pipe 2",
            (Point::new(425, 315), 275, Orientation::Horizontal),
            pump,
            east,
        )?;
        let _ = lay_pipe(
            &mut network,
            "pipe 3",
            (Point::new(390, 170), 130, Orientation::Vertical),
            north,
            pump,
        )?;
        let _ = lay_pipe(
            &mut network,
            "pipe 4",
            (Point::new(390, 350), 170, Orientation::Vertical),
            pump,
            south,
        )?;
        network.direct_pump(pump, feed, delivery)?;
        network.verify()?;

        Ok(StandardMap {
            network,
            cisterns: vec![north, east],
            springs: vec![west, south],
            pump,
        })
    }

    /// Seats the roster: plumbers cycle over cisterns, saboteurs over springs.
    #[must_use]
    pub fn seat(&self, map: &StandardMap, roster: &[RosterEntry]) -> Vec<PlayerSetup> {
        let mut plumbers = map.cisterns.iter().cycle();
        let mut saboteurs = map.springs.iter().cycle();
        roster
            .iter()
            .filter_map(|entry| {
                let start = match entry.role {
                    Role::Plumber => plumbers.next(),
                    Role::Saboteur => saboteurs.next(),
                }?;
                Some(PlayerSetup::new(entry.name.clone(), entry.role, *start))
            })
            .collect()
    }

    /// Creates a world on the standard map with the roster seated.
    pub fn world(
        &self,
        config: WorldConfig,
        roster: &[RosterEntry],
    ) -> Result<World, InvariantViolation> {
        let map = self.standard_map()?;
        let players = self.seat(&map, roster);
        World::new(config, map.network, players)
    }
}

fn lay_pipe(
    network: &mut NetworkGraph,
    name: &str,
    (position, length, orientation): (Point, i32, Orientation),
    from: ElementId,
    to: ElementId,
) -> Result<ElementId, InvariantViolation> {
    let size = match orientation {
        Orientation::Horizontal => Size::new(length, PIPE_THICKNESS),
        Orientation::Vertical => Size::new(PIPE_THICKNESS, length),
    };
    let pipe = network.add_element(Element::pipe(name, position, size, orientation));
    let start = network.add_endpoint(pipe, true)?;
    let end = network.add_endpoint(pipe, false)?;
    network.connect(start, from)?;
    network.connect(end, to)?;
    Ok(pipe)
}
