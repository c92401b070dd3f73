//! Plumber action handlers.

use tracing::debug;
use waterworks_core::{ActionError, ElementId, ElementKind, Event, PlumberAction, Selection};

use crate::{
    graph::{Element, NetworkGraph},
    player::{self, Player, PumpSide},
    splice, ActionFailure, InvariantViolation,
};

/// Executes a plumber action and returns the event describing its effect.
///
/// Preconditions are checked before anything is mutated, so a rejected action
/// leaves both the network and the player untouched.
pub(crate) fn perform(
    graph: &mut NetworkGraph,
    plumber: &mut Player,
    action: PlumberAction,
    selection: Selection,
    endpoint_held_elsewhere: bool,
) -> Result<Event, ActionFailure> {
    let player = plumber.id;
    match action {
        PlumberAction::Move => {
            let to = player::move_to(graph, plumber, selection)?;
            Ok(Event::PlayerMoved { player, to })
        }
        PlumberAction::PickUpPump => pick_up_pump(graph, plumber),
        PlumberAction::InsertPump => insert_pump(graph, plumber),
        PlumberAction::FixPump => {
            let pump = standing_on(graph, plumber, ElementKind::Pump, ActionError::NotOnPump)?;
            repair(graph, pump)?;
            Ok(Event::PumpFixed { player, pump })
        }
        PlumberAction::FixPipe => {
            let pipe = standing_on(graph, plumber, ElementKind::Pipe, ActionError::NotOnPipe)?;
            repair(graph, pipe)?;
            Ok(Event::PipeFixed { player, pipe })
        }
        PlumberAction::PickUpEndpoint => {
            pick_up_endpoint(graph, plumber, selection, endpoint_held_elsewhere)
        }
        PlumberAction::InsertEndpoint => insert_endpoint(graph, plumber),
        PlumberAction::ChangeInputPipe => {
            let (pump, pipe) = player::redirect_pump(graph, plumber, selection, PumpSide::Input)?;
            Ok(Event::PumpInputChanged { pump, pipe })
        }
        PlumberAction::ChangeOutputPipe => {
            let (pump, pipe) =
                player::redirect_pump(graph, plumber, selection, PumpSide::Output)?;
            Ok(Event::PumpOutputChanged { pump, pipe })
        }
    }
}

fn standing_on(
    graph: &NetworkGraph,
    plumber: &Player,
    kind: ElementKind,
    otherwise: ActionError,
) -> Result<ElementId, ActionError> {
    plumber
        .current
        .filter(|id| graph.element(*id).is_some_and(|element| element.kind() == kind))
        .ok_or(otherwise)
}

fn repair(graph: &mut NetworkGraph, id: ElementId) -> Result<(), ActionFailure> {
    let element = graph
        .element_mut(id)
        .ok_or(InvariantViolation::MissingElement(id))?;
    if element.is_working() {
        return Err(ActionError::AlreadyWorking.into());
    }
    element.set_working(true);
    Ok(())
}

fn pick_up_pump(graph: &mut NetworkGraph, plumber: &mut Player) -> Result<Event, ActionFailure> {
    let cistern = standing_on(graph, plumber, ElementKind::Cistern, ActionError::NotOnCistern)?;
    if plumber.held_pump.is_some() {
        return Err(ActionError::AlreadyHoldingPump.into());
    }
    let pump = graph
        .cistern(cistern)
        .and_then(|state| state.manufactured())
        .ok_or(ActionError::NoManufacturedPump)?;

    let removed = graph
        .remove_element(pump)
        .ok_or(InvariantViolation::MissingElement(pump))?;
    if let Some(state) = graph.element_mut(cistern).and_then(Element::as_cistern_mut) {
        state.set_manufactured(None);
    }
    debug!(pump = removed.name(), "pump picked up");
    plumber.held_pump = Some(removed);
    Ok(Event::PumpPickedUp {
        player: plumber.id,
        cistern,
    })
}

fn insert_pump(graph: &mut NetworkGraph, plumber: &mut Player) -> Result<Event, ActionFailure> {
    let pipe = standing_on(graph, plumber, ElementKind::Pipe, ActionError::NotOnPipe)?;
    let held = plumber.held_pump.as_ref().ok_or(ActionError::NoPumpHeld)?;

    let insertion = splice::insert_pump(graph, pipe, held.name())?;
    plumber.held_pump = None;
    plumber.current = Some(insertion.pump);
    Ok(Event::PumpInserted {
        player: plumber.id,
        replaced: pipe,
        pump: insertion.pump,
        pipes: insertion.pipes,
    })
}

fn pick_up_endpoint(
    graph: &mut NetworkGraph,
    plumber: &mut Player,
    selection: Selection,
    endpoint_held_elsewhere: bool,
) -> Result<Event, ActionFailure> {
    let endpoint = selection.endpoint.ok_or(ActionError::NothingSelected)?;
    let element = plumber.current.ok_or(ActionError::NotOnElement)?;
    if graph
        .element(element)
        .is_some_and(|state| state.kind() == ElementKind::Pipe)
    {
        return Err(ActionError::CannotDetachFromPipe.into());
    }
    if plumber.held_endpoint.is_some() {
        return Err(ActionError::AlreadyHoldingEndpoint.into());
    }
    if endpoint_held_elsewhere {
        return Err(ActionError::EndpointHeldElsewhere.into());
    }

    let detached = splice::pickup_endpoint(graph, endpoint, element)?;
    plumber.held_endpoint = Some(detached);
    Ok(Event::EndpointPickedUp {
        player: plumber.id,
        element,
        pipe: detached.origin_pipe(),
    })
}

fn insert_endpoint(graph: &mut NetworkGraph, plumber: &mut Player) -> Result<Event, ActionFailure> {
    if plumber.held_endpoint.is_none() {
        return Err(ActionError::NoEndpointHeld.into());
    }
    let element = plumber.current.ok_or(ActionError::NotOnElement)?;

    let inserted = splice::insert_endpoint(graph, element)?;
    plumber.held_endpoint = None;
    Ok(Event::EndpointInserted {
        player: plumber.id,
        endpoint: inserted.endpoint,
        pipe: inserted.pipe,
        element,
    })
}
