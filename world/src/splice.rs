//! Structural edits: splitting pipes around pumps and moving pipe ends.
//!
//! Every routine validates the player-facing preconditions before it touches
//! the graph, so a rejected edit leaves the network exactly as it was.

use waterworks_core::{ActionError, ElementId, EndpointId, Orientation, Point, Size};

use crate::{
    graph::{Element, NetworkGraph},
    ActionFailure, InvariantViolation,
};

/// Side length of a placed pump.
pub const PUMP_SIZE: i32 = 50;

const HORIZONTAL_PUMP_RAISE: i32 = 10;

/// Elements created when a pipe is split around a pump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PumpInsertion {
    /// Newly placed pump.
    pub pump: ElementId,
    /// Child pipes in registry order: the start half, then the end half.
    pub pipes: [ElementId; 2],
}

/// Pipe end removed from the network and carried by a plumber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetachedEndpoint {
    at_start: bool,
    origin_pipe: ElementId,
}

impl DetachedEndpoint {
    /// Polarity the endpoint had while attached.
    #[must_use]
    pub const fn at_start(&self) -> bool {
        self.at_start
    }

    /// Pipe the endpoint was taken from.
    #[must_use]
    pub const fn origin_pipe(&self) -> ElementId {
        self.origin_pipe
    }
}

/// Pipe end created when a held endpoint is attached to an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndpointInsertion {
    /// Fresh endpoint registered for the attachment.
    pub endpoint: EndpointId,
    /// Pipe that received the endpoint.
    pub pipe: ElementId,
}

#[derive(Clone, Copy, Debug)]
struct OuterEnd {
    at_start: bool,
    connected: Option<ElementId>,
}

/// Replaces `pipe` with two shorter pipes joined by a new pump.
///
/// The start half keeps the parent's origin, the pump follows it and the end
/// half follows the pump. External elements keep their position-in-list
/// references, now pointing at the matching half, and leaked water is split
/// between the halves without loss.
pub fn insert_pump(
    graph: &mut NetworkGraph,
    pipe: ElementId,
    pump_name: &str,
) -> Result<PumpInsertion, ActionFailure> {
    let parent = graph.element(pipe).ok_or(ActionError::UnknownTarget)?;
    let state = parent.as_pipe().ok_or(ActionError::NotOnPipe)?;
    let orientation = state.orientation();
    let ends = state.ends();
    let leaked = state.leaked();
    let origin = parent.position();
    let size = parent.size();
    let name = parent.name().to_owned();

    let length = match orientation {
        Orientation::Vertical => size.height,
        Orientation::Horizontal => size.width,
    };
    let child_length = (length - PUMP_SIZE) / 2;
    if child_length <= 0 {
        return Err(ActionError::PipeTooShort.into());
    }

    let (child_size, pump_origin, second_origin) = match orientation {
        Orientation::Vertical => (
            Size::new(size.width, child_length),
            Point::new(origin.x, origin.y + child_length),
            Point::new(origin.x, origin.y + child_length + PUMP_SIZE),
        ),
        Orientation::Horizontal => (
            Size::new(child_length, size.height),
            Point::new(origin.x + child_length, origin.y - HORIZONTAL_PUMP_RAISE),
            Point::new(origin.x + child_length + PUMP_SIZE, origin.y),
        ),
    };

    let mut outer: [Option<OuterEnd>; 2] = [None, None];
    for (entry, endpoint) in outer.iter_mut().zip(ends) {
        if let Some(endpoint) = endpoint {
            let state = graph
                .endpoint(endpoint)
                .ok_or(InvariantViolation::MissingEndpoint(endpoint))?;
            *entry = Some(OuterEnd {
                at_start: state.at_start(),
                connected: state.connected(),
            });
        }
    }

    let linked: Vec<ElementId> = graph
        .elements()
        .filter(|(_, element)| {
            element.connected_pipes().contains(&pipe) || element.connectable_pipes().contains(&pipe)
        })
        .map(|(id, _)| id)
        .collect();
    let index = graph
        .element_index(pipe)
        .ok_or(InvariantViolation::MissingElement(pipe))?;

    let first = graph.insert_element_at(
        index,
        Element::pipe(format!("{name}.1"), origin, child_size, orientation)
            .with_leaked(leaked / 2),
    );
    let pump = graph.insert_element_at(
        index + 1,
        Element::pump(pump_name, pump_origin, Size::new(PUMP_SIZE, PUMP_SIZE)),
    );
    let second = graph.insert_element_at(
        index + 2,
        Element::pipe(format!("{name}.2"), second_origin, child_size, orientation)
            .with_leaked(leaked - leaked / 2),
    );

    let is_open = |end: Option<OuterEnd>| end.map_or(true, |end| end.connected.is_none());
    let open_side = if !is_open(outer[0]) && is_open(outer[1]) {
        second
    } else {
        first
    };
    for element in linked {
        let child = match outer {
            [Some(OuterEnd {
                connected: Some(target),
                ..
            }), _] if target == element => first,
            [_, Some(OuterEnd {
                connected: Some(target),
                ..
            })] if target == element => second,
            _ => open_side,
        };
        graph.replace_pipe_reference(element, pipe, child)?;
    }

    for endpoint in ends.into_iter().flatten() {
        let _ = graph.remove_endpoint(endpoint)?;
    }
    let _ = graph
        .remove_element(pipe)
        .ok_or(InvariantViolation::MissingElement(pipe))?;

    let [start_end, finish_end] = outer;
    if let Some(end) = start_end {
        attach_outer(graph, first, 0, end)?;
    }
    let inner_first = start_end.is_some_and(|end| !end.at_start);
    let inner = graph.attach_endpoint_at(first, 1, inner_first)?;
    graph.connect(inner, pump)?;
    let inner_second = finish_end.map_or(true, |end| !end.at_start);
    let inner = graph.attach_endpoint_at(second, 0, inner_second)?;
    graph.connect(inner, pump)?;
    if let Some(end) = finish_end {
        attach_outer(graph, second, 1, end)?;
    }

    Ok(PumpInsertion {
        pump,
        pipes: [first, second],
    })
}

fn attach_outer(
    graph: &mut NetworkGraph,
    pipe: ElementId,
    slot: usize,
    end: OuterEnd,
) -> Result<(), InvariantViolation> {
    let endpoint = graph.attach_endpoint_at(pipe, slot, end.at_start)?;
    if let Some(element) = end.connected {
        graph.connect(endpoint, element)?;
    }
    Ok(())
}

/// Detaches `endpoint` from `element` and removes it from the network.
///
/// The endpoint must currently be attached to `element`.
pub fn pickup_endpoint(
    graph: &mut NetworkGraph,
    endpoint: EndpointId,
    element: ElementId,
) -> Result<DetachedEndpoint, ActionFailure> {
    let state = graph.endpoint(endpoint).ok_or(ActionError::UnknownTarget)?;
    if state.connected() != Some(element) {
        return Err(ActionError::NotOnElement.into());
    }
    let origin_pipe = state
        .pipe()
        .ok_or(InvariantViolation::DetachedEndpoint(endpoint))?;

    let removed = graph.remove_endpoint(endpoint)?;
    Ok(DetachedEndpoint {
        at_start: removed.at_start(),
        origin_pipe,
    })
}

/// Attaches a fresh pipe end to `element`.
///
/// The first connectable pipe that is not yet connected and still has a free
/// slot receives the endpoint. Its polarity complements the pipe's remaining
/// end, or marks the start when the pipe has no ends left.
pub fn insert_endpoint(
    graph: &mut NetworkGraph,
    element: ElementId,
) -> Result<EndpointInsertion, ActionFailure> {
    let target = graph.element(element).ok_or(ActionError::UnknownTarget)?;
    if target.connectable_pipes().is_empty() {
        return Err(ActionError::NoConnectablePipe.into());
    }

    let pipe = target
        .connectable_pipes()
        .iter()
        .copied()
        .filter(|pipe| !target.connected_pipes().contains(pipe))
        .find(|pipe| {
            graph
                .pipe(*pipe)
                .is_some_and(|state| state.ends().iter().any(Option::is_none))
        })
        .ok_or(ActionError::AllPipesConnected)?;

    let remaining = graph
        .pipe(pipe)
        .and_then(|state| state.ends().into_iter().flatten().next());
    let at_start = match remaining {
        Some(other) => !graph
            .endpoint(other)
            .ok_or(InvariantViolation::MissingEndpoint(other))?
            .at_start(),
        None => true,
    };

    let endpoint = graph.add_endpoint(pipe, at_start)?;
    graph.connect(endpoint, element)?;
    Ok(EndpointInsertion { endpoint, pipe })
}
