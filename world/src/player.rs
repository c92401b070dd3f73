//! Players and the actions shared by both teams.

use waterworks_core::{
    ActionError, ElementId, ElementKind, PlayerId, PlayerSnapshot, Point, Role, Selection,
};

use crate::{
    graph::{Element, NetworkGraph},
    splice::DetachedEndpoint,
    ActionFailure,
};

/// Entry of the starting roster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerSetup {
    name: String,
    role: Role,
    start: ElementId,
}

impl PlayerSetup {
    /// Describes a player joining the game on `start`.
    #[must_use]
    pub fn new<N>(name: N, role: Role, start: ElementId) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            role,
            start,
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

    /// Element the player starts on.
    #[must_use]
    pub const fn start(&self) -> ElementId {
        self.start
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Player {
    pub(crate) id: PlayerId,
    pub(crate) name: String,
    pub(crate) role: Role,
    pub(crate) current: Option<ElementId>,
    pub(crate) held_pump: Option<Element>,
    pub(crate) held_endpoint: Option<DetachedEndpoint>,
}

impl Player {
    pub(crate) fn from_setup(id: PlayerId, setup: PlayerSetup) -> Self {
        Self {
            id,
            name: setup.name,
            role: setup.role,
            current: Some(setup.start),
            held_pump: None,
            held_endpoint: None,
        }
    }

    pub(crate) fn snapshot(&self, graph: &NetworkGraph) -> PlayerSnapshot {
        let position = self
            .current
            .and_then(|id| graph.element(id))
            .map_or(Point::default(), Element::position);
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            role: self.role,
            current_element: self.current,
            position,
            holds_pump: self.held_pump.is_some(),
            holds_endpoint: self.held_endpoint.is_some(),
        }
    }
}

/// Direction of a pump assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PumpSide {
    Input,
    Output,
}

/// Moves `player` onto the selected element.
///
/// Pipes hold one player at a time; leaving a pipe frees it.
pub(crate) fn move_to(
    graph: &mut NetworkGraph,
    player: &mut Player,
    selection: Selection,
) -> Result<ElementId, ActionFailure> {
    let target = selection.element.ok_or(ActionError::NothingSelected)?;
    let element = graph
        .element(target)
        .filter(|element| element.is_visible())
        .ok_or(ActionError::UnknownTarget)?;
    if player.current == Some(target) {
        return Err(ActionError::AlreadyThere.into());
    }
    if element.as_pipe().is_some_and(|pipe| pipe.is_occupied()) {
        return Err(ActionError::Occupied.into());
    }

    if let Some(pipe) = player
        .current
        .and_then(|current| graph.element_mut(current))
        .and_then(Element::as_pipe_mut)
    {
        pipe.set_occupied(false);
    }
    if let Some(pipe) = graph.element_mut(target).and_then(Element::as_pipe_mut) {
        pipe.set_occupied(true);
    }
    player.current = Some(target);
    Ok(target)
}

/// Assigns the selected pipe as the input or output of the pump underfoot.
pub(crate) fn redirect_pump(
    graph: &mut NetworkGraph,
    player: &Player,
    selection: Selection,
    side: PumpSide,
) -> Result<(ElementId, ElementId), ActionFailure> {
    let pump_id = player.current.ok_or(ActionError::NotOnPump)?;
    let element = graph
        .element(pump_id)
        .filter(|element| element.kind() == ElementKind::Pump)
        .ok_or(ActionError::NotOnPump)?;
    let pipe = selection.element.ok_or(ActionError::NothingSelected)?;
    if !element.connected_pipes().contains(&pipe) {
        return Err(ActionError::PipeNotConnected.into());
    }

    let pump = graph
        .element_mut(pump_id)
        .and_then(Element::as_pump_mut)
        .ok_or(ActionError::NotOnPump)?;
    let opposite = match side {
        PumpSide::Input => pump.out_pipe(),
        PumpSide::Output => pump.in_pipe(),
    };
    if opposite == Some(pipe) {
        return Err(ActionError::SameInputAndOutput.into());
    }

    match side {
        PumpSide::Input => pump.set_in_pipe(Some(pipe)),
        PumpSide::Output => pump.set_out_pipe(Some(pipe)),
    }
    Ok((pump_id, pipe))
}

#[cfg(test)]
mod tests {
    use waterworks_core::{Orientation, Size};

    use super::*;

    fn player_on(start: ElementId) -> Player {
        Player::from_setup(
            PlayerId::new(0),
            PlayerSetup::new("tester", Role::Plumber, start),
        )
    }

    fn two_pipes() -> (NetworkGraph, ElementId, ElementId) {
        let mut graph = NetworkGraph::new();
        let first = graph.add_element(Element::pipe(
            "first",
            Point::new(0, 0),
            Size::new(100, 20),
            Orientation::Horizontal,
        ));
        let second = graph.add_element(Element::pipe(
            "second",
            Point::new(0, 100),
            Size::new(100, 20),
            Orientation::Horizontal,
        ));
        (graph, first, second)
    }

    #[test]
    fn moving_off_a_pipe_frees_it() {
        let (mut graph, first, second) = two_pipes();
        let mut player = player_on(first);
        graph
            .element_mut(first)
            .and_then(Element::as_pipe_mut)
            .expect("pipe")
            .set_occupied(true);

        let moved = move_to(&mut graph, &mut player, Selection::element(second));

        assert_eq!(moved, Ok(second));
        assert!(!graph.pipe(first).expect("first").is_occupied());
        assert!(graph.pipe(second).expect("second").is_occupied());
        assert_eq!(player.current, Some(second));
    }

    #[test]
    fn occupied_pipes_and_the_current_element_are_refused() {
        let (mut graph, first, second) = two_pipes();
        let mut player = player_on(first);
        graph
            .element_mut(second)
            .and_then(Element::as_pipe_mut)
            .expect("pipe")
            .set_occupied(true);

        assert_eq!(
            move_to(&mut graph, &mut player, Selection::element(second)),
            Err(ActionFailure::Rejected(ActionError::Occupied))
        );
        assert_eq!(
            move_to(&mut graph, &mut player, Selection::element(first)),
            Err(ActionFailure::Rejected(ActionError::AlreadyThere))
        );
        assert_eq!(
            move_to(&mut graph, &mut player, Selection::none()),
            Err(ActionFailure::Rejected(ActionError::NothingSelected))
        );
        assert_eq!(player.current, Some(first));
    }

    #[test]
    fn redirecting_requires_a_pump_underfoot() {
        let (mut graph, first, second) = two_pipes();
        let player = player_on(first);

        assert_eq!(
            redirect_pump(&mut graph, &player, Selection::element(second), PumpSide::Input),
            Err(ActionFailure::Rejected(ActionError::NotOnPump))
        );
    }

    #[test]
    fn snapshot_reports_held_items_and_position() {
        let (graph, first, _) = two_pipes();
        let mut player = player_on(first);
        player.held_pump = Some(Element::pump("spare", Point::new(0, 0), Size::new(50, 50)));

        let snapshot = player.snapshot(&graph);

        assert!(snapshot.holds_pump);
        assert!(!snapshot.holds_endpoint);
        assert_eq!(snapshot.position, Point::new(0, 0));
        assert_eq!(snapshot.current_element, Some(first));
    }
}
