//! Network storage: elements, pipe endpoints and their adjacency.
//!
//! Entities live in id-keyed storage next to ordered registries. Registry order
//! is part of the contract: presentation and positional lookups rely on it, so
//! every insertion and removal keeps the relative order of the other entries.

use std::collections::{BTreeMap, BTreeSet};

use waterworks_core::{
    ElementId, ElementKind, ElementSnapshot, EndpointId, EndpointSnapshot, Hit, NetworkView,
    Orientation, Point, Rect, Size,
};

use crate::InvariantViolation;

/// Side length of the square drawn for a pipe endpoint.
pub const ENDPOINT_SIZE: i32 = 15;

/// Margin added around an endpoint when hit-testing pointer positions.
pub const ENDPOINT_HIT_MARGIN: i32 = 30;

const VERTICAL_ENDPOINT_SHIFT: i32 = -25;
const VERTICAL_END_INSET: i32 = 40;

/// Placeable network node: a pipe, pump, cistern or spring.
#[derive(Clone, Debug)]
pub struct Element {
    name: String,
    position: Point,
    size: Size,
    visible: bool,
    working: bool,
    connected_pipes: Vec<ElementId>,
    connectable_pipes: Vec<ElementId>,
    variant: Variant,
}

/// Variant-specific state of an element.
#[derive(Clone, Debug)]
pub enum Variant {
    /// State carried by pipes.
    Pipe(Pipe),
    /// State carried by pumps.
    Pump(Pump),
    /// State carried by cisterns.
    Cistern(Cistern),
    /// State carried by springs.
    Spring(Spring),
}

impl Element {
    fn with_variant(name: String, position: Point, size: Size, variant: Variant) -> Self {
        Self {
            name,
            position,
            size,
            visible: true,
            working: true,
            connected_pipes: Vec::new(),
            connectable_pipes: Vec::new(),
            variant,
        }
    }

    /// Creates a working pipe with two empty endpoint slots.
    #[must_use]
    pub fn pipe<N>(name: N, position: Point, size: Size, orientation: Orientation) -> Self
    where
        N: Into<String>,
    {
        Self::with_variant(
            name.into(),
            position,
            size,
            Variant::Pipe(Pipe {
                orientation,
                ends: [None, None],
                leaked: 0,
                occupied: false,
            }),
        )
    }

    /// Creates a working pump without input or output pipes.
    #[must_use]
    pub fn pump<N>(name: N, position: Point, size: Size) -> Self
    where
        N: Into<String>,
    {
        Self::with_variant(
            name.into(),
            position,
            size,
            Variant::Pump(Pump {
                in_pipe: None,
                out_pipe: None,
            }),
        )
    }

    /// Creates an empty cistern.
    #[must_use]
    pub fn cistern<N>(name: N, position: Point, size: Size) -> Self
    where
        N: Into<String>,
    {
        Self::with_variant(
            name.into(),
            position,
            size,
            Variant::Cistern(Cistern {
                manufactured: None,
                collected: 0,
            }),
        )
    }

    /// Creates a spring emitting `flow_rate` units per water transfer.
    #[must_use]
    pub fn spring<N>(name: N, position: Point, size: Size, flow_rate: u32) -> Self
    where
        N: Into<String>,
    {
        Self::with_variant(name.into(), position, size, Variant::Spring(Spring { flow_rate }))
    }

    /// Presets the leaked-water accumulator; ignored for non-pipes.
    #[must_use]
    pub fn with_leaked(mut self, leaked: u32) -> Self {
        if let Variant::Pipe(pipe) = &mut self.variant {
            pipe.leaked = leaked;
        }
        self
    }

    /// Presets the working flag.
    #[must_use]
    pub fn with_working(mut self, working: bool) -> Self {
        self.working = working;
        self
    }

    /// Marks the element as not drawn and not selectable.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Display name of the element.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upper-left corner of the element.
    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Dimensions of the element.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Screen-space bounds of the element.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    /// Whether the element is drawn and selectable.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the element works or is broken.
    #[must_use]
    pub const fn is_working(&self) -> bool {
        self.working
    }

    /// Pipes currently attached to the element, in attachment order.
    #[must_use]
    pub fn connected_pipes(&self) -> &[ElementId] {
        &self.connected_pipes
    }

    /// Pipes the element may be attached to.
    #[must_use]
    pub fn connectable_pipes(&self) -> &[ElementId] {
        &self.connectable_pipes
    }

    /// Variant tag of the element.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self.variant {
            Variant::Pipe(_) => ElementKind::Pipe,
            Variant::Pump(_) => ElementKind::Pump,
            Variant::Cistern(_) => ElementKind::Cistern,
            Variant::Spring(_) => ElementKind::Spring,
        }
    }

    /// Variant-specific state of the element.
    #[must_use]
    pub const fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Pipe state, when the element is a pipe.
    #[must_use]
    pub const fn as_pipe(&self) -> Option<&Pipe> {
        match &self.variant {
            Variant::Pipe(pipe) => Some(pipe),
            _ => None,
        }
    }

    /// Pump state, when the element is a pump.
    #[must_use]
    pub const fn as_pump(&self) -> Option<&Pump> {
        match &self.variant {
            Variant::Pump(pump) => Some(pump),
            _ => None,
        }
    }

    /// Cistern state, when the element is a cistern.
    #[must_use]
    pub const fn as_cistern(&self) -> Option<&Cistern> {
        match &self.variant {
            Variant::Cistern(cistern) => Some(cistern),
            _ => None,
        }
    }

    /// Spring state, when the element is a spring.
    #[must_use]
    pub const fn as_spring(&self) -> Option<&Spring> {
        match &self.variant {
            Variant::Spring(spring) => Some(spring),
            _ => None,
        }
    }

    pub(crate) fn set_working(&mut self, working: bool) {
        self.working = working;
    }

    pub(crate) fn as_pipe_mut(&mut self) -> Option<&mut Pipe> {
        match &mut self.variant {
            Variant::Pipe(pipe) => Some(pipe),
            _ => None,
        }
    }

    pub(crate) fn as_pump_mut(&mut self) -> Option<&mut Pump> {
        match &mut self.variant {
            Variant::Pump(pump) => Some(pump),
            _ => None,
        }
    }

    pub(crate) fn as_cistern_mut(&mut self) -> Option<&mut Cistern> {
        match &mut self.variant {
            Variant::Cistern(cistern) => Some(cistern),
            _ => None,
        }
    }
}

/// Pipe-specific state.
#[derive(Clone, Debug)]
pub struct Pipe {
    orientation: Orientation,
    ends: [Option<EndpointId>; 2],
    leaked: u32,
    occupied: bool,
}

impl Pipe {
    /// Direction the pipe runs in.
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// The two endpoint slots; an empty slot is an open pipe end.
    #[must_use]
    pub const fn ends(&self) -> [Option<EndpointId>; 2] {
        self.ends
    }

    /// Water lost through this pipe so far.
    #[must_use]
    pub const fn leaked(&self) -> u32 {
        self.leaked
    }

    /// Whether a player stands on the pipe.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.occupied
    }

    pub(crate) fn set_occupied(&mut self, occupied: bool) {
        self.occupied = occupied;
    }

    pub(crate) fn add_leaked(&mut self, amount: u32) {
        self.leaked = self.leaked.saturating_add(amount);
    }

    fn slot_of(&self, endpoint: EndpointId) -> Option<usize> {
        self.ends.iter().position(|slot| *slot == Some(endpoint))
    }
}

/// Pump-specific state.
#[derive(Clone, Debug)]
pub struct Pump {
    in_pipe: Option<ElementId>,
    out_pipe: Option<ElementId>,
}

impl Pump {
    /// Pipe water is drawn from.
    #[must_use]
    pub const fn in_pipe(&self) -> Option<ElementId> {
        self.in_pipe
    }

    /// Pipe water is pushed into.
    #[must_use]
    pub const fn out_pipe(&self) -> Option<ElementId> {
        self.out_pipe
    }

    pub(crate) fn set_in_pipe(&mut self, pipe: Option<ElementId>) {
        self.in_pipe = pipe;
    }

    pub(crate) fn set_out_pipe(&mut self, pipe: Option<ElementId>) {
        self.out_pipe = pipe;
    }
}

/// Cistern-specific state.
#[derive(Clone, Debug)]
pub struct Cistern {
    manufactured: Option<ElementId>,
    collected: u32,
}

impl Cistern {
    /// Invisible pump waiting at the cistern for a plumber.
    #[must_use]
    pub const fn manufactured(&self) -> Option<ElementId> {
        self.manufactured
    }

    /// Water delivered to the cistern so far.
    #[must_use]
    pub const fn collected(&self) -> u32 {
        self.collected
    }

    pub(crate) fn set_manufactured(&mut self, pump: Option<ElementId>) {
        self.manufactured = pump;
    }

    pub(crate) fn add_collected(&mut self, amount: u32) {
        self.collected = self.collected.saturating_add(amount);
    }
}

/// Spring-specific state.
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    flow_rate: u32,
}

impl Spring {
    /// Units emitted into the network per water transfer.
    #[must_use]
    pub const fn flow_rate(&self) -> u32 {
        self.flow_rate
    }
}

/// One of the two attachable ends of a pipe.
#[derive(Clone, Copy, Debug)]
pub struct Endpoint {
    pipe: Option<ElementId>,
    at_start: bool,
    connected: Option<ElementId>,
    visible: bool,
}

impl Endpoint {
    /// Pipe owning the endpoint; `None` once detached.
    #[must_use]
    pub const fn pipe(&self) -> Option<ElementId> {
        self.pipe
    }

    /// Whether the endpoint sits at the start of its pipe.
    #[must_use]
    pub const fn at_start(&self) -> bool {
        self.at_start
    }

    /// Element the endpoint is attached to.
    #[must_use]
    pub const fn connected(&self) -> Option<ElementId> {
        self.connected
    }

    /// Whether the endpoint is drawn and selectable.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Owner of every network entity and of the registries that order them.
#[derive(Clone, Debug, Default)]
pub struct NetworkGraph {
    elements: BTreeMap<ElementId, Element>,
    element_order: Vec<ElementId>,
    endpoints: BTreeMap<EndpointId, Endpoint>,
    endpoint_order: Vec<EndpointId>,
    next_element_id: u32,
    next_endpoint_id: u32,
}

impl NetworkGraph {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an element to the registry.
    pub fn add_element(&mut self, element: Element) -> ElementId {
        let index = self.element_order.len();
        self.insert_element_at(index, element)
    }

    /// Inserts an element at `index` in the registry, shifting later entries.
    ///
    /// Indices past the end append.
    pub fn insert_element_at(&mut self, index: usize, element: Element) -> ElementId {
        let id = ElementId::new(self.next_element_id);
        self.next_element_id = self.next_element_id.saturating_add(1);
        let index = index.min(self.element_order.len());
        self.element_order.insert(index, id);
        let _ = self.elements.insert(id, element);
        id
    }

    /// Removes an element while preserving the order of the remaining entries.
    ///
    /// References held by other entities are left untouched; callers detach
    /// them first and [`NetworkGraph::verify`] reports anything left behind.
    pub fn remove_element(&mut self, id: ElementId) -> Option<Element> {
        let index = self.element_index(id)?;
        let _ = self.element_order.remove(index);
        self.elements.remove(&id)
    }

    /// Looks up an element.
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    /// Looks up a pipe.
    #[must_use]
    pub fn pipe(&self, id: ElementId) -> Option<&Pipe> {
        self.element(id).and_then(Element::as_pipe)
    }

    /// Looks up a pump.
    #[must_use]
    pub fn pump(&self, id: ElementId) -> Option<&Pump> {
        self.element(id).and_then(Element::as_pump)
    }

    /// Looks up a cistern.
    #[must_use]
    pub fn cistern(&self, id: ElementId) -> Option<&Cistern> {
        self.element(id).and_then(Element::as_cistern)
    }

    /// Position of an element within the registry.
    #[must_use]
    pub fn element_index(&self, id: ElementId) -> Option<usize> {
        self.element_order.iter().position(|entry| *entry == id)
    }

    /// Element identifiers in registry order.
    #[must_use]
    pub fn element_ids(&self) -> &[ElementId] {
        &self.element_order
    }

    /// Elements in registry order.
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &Element)> + '_ {
        self.element_order
            .iter()
            .filter_map(|id| self.elements.get(id).map(|element| (*id, element)))
    }

    /// Identifiers of every element of the given kind, in registry order.
    pub fn ids_of_kind(&self, kind: ElementKind) -> impl Iterator<Item = ElementId> + '_ {
        self.elements()
            .filter(move |(_, element)| element.kind() == kind)
            .map(|(id, _)| id)
    }

    /// Looks up an endpoint.
    #[must_use]
    pub fn endpoint(&self, id: EndpointId) -> Option<&Endpoint> {
        self.endpoints.get(&id)
    }

    /// Endpoint identifiers in registry order.
    #[must_use]
    pub fn endpoint_ids(&self) -> &[EndpointId] {
        &self.endpoint_order
    }

    /// Creates an endpoint in the first free slot of `pipe`.
    pub fn add_endpoint(
        &mut self,
        pipe: ElementId,
        at_start: bool,
    ) -> Result<EndpointId, InvariantViolation> {
        let ends = self.pipe_state(pipe)?.ends;
        let slot = ends
            .iter()
            .position(Option::is_none)
            .ok_or(InvariantViolation::NoFreeSlot(pipe))?;
        self.attach_endpoint_at(pipe, slot, at_start)
    }

    /// Creates an endpoint in a specific, currently empty slot of `pipe`.
    pub fn attach_endpoint_at(
        &mut self,
        pipe: ElementId,
        slot: usize,
        at_start: bool,
    ) -> Result<EndpointId, InvariantViolation> {
        let id = EndpointId::new(self.next_endpoint_id);
        let state = self.pipe_state_mut(pipe)?;
        let Some(entry) = state.ends.get_mut(slot).filter(|entry| entry.is_none()) else {
            return Err(InvariantViolation::SlotOccupied { pipe, slot });
        };
        *entry = Some(id);

        self.next_endpoint_id = self.next_endpoint_id.saturating_add(1);
        let _ = self.endpoints.insert(
            id,
            Endpoint {
                pipe: Some(pipe),
                at_start,
                connected: None,
                visible: true,
            },
        );
        self.endpoint_order.push(id);
        Ok(id)
    }

    /// Disconnects, detaches and unregisters an endpoint, returning its state.
    pub fn remove_endpoint(&mut self, endpoint: EndpointId) -> Result<Endpoint, InvariantViolation> {
        let _ = self.disconnect(endpoint)?;
        self.detach_from_pipe(endpoint)?;
        self.endpoint_order.retain(|id| *id != endpoint);
        self.endpoints
            .remove(&endpoint)
            .ok_or(InvariantViolation::MissingEndpoint(endpoint))
    }

    /// Attaches an endpoint to an element, updating both sides.
    ///
    /// The pipe becomes connected to, and connectable from, the element. The
    /// call validates everything before mutating, so a failure leaves both
    /// sides untouched.
    pub fn connect(
        &mut self,
        endpoint: EndpointId,
        element: ElementId,
    ) -> Result<(), InvariantViolation> {
        let state = self
            .endpoints
            .get(&endpoint)
            .ok_or(InvariantViolation::MissingEndpoint(endpoint))?;
        let pipe = state
            .pipe
            .ok_or(InvariantViolation::DetachedEndpoint(endpoint))?;
        if state.connected.is_some() {
            return Err(InvariantViolation::AlreadyConnected(endpoint));
        }

        let target = self
            .elements
            .get(&element)
            .ok_or(InvariantViolation::MissingElement(element))?;
        if target.kind() == ElementKind::Pipe {
            return Err(InvariantViolation::PipeToPipe(element));
        }

        for other in self.pipe_state(pipe)?.ends.into_iter().flatten() {
            let other_target = self.endpoints.get(&other).and_then(Endpoint::connected);
            if other != endpoint && other_target == Some(element) {
                return Err(InvariantViolation::DuplicateConnection { pipe, element });
            }
        }

        if let Some(state) = self.endpoints.get_mut(&endpoint) {
            state.connected = Some(element);
        }
        if let Some(target) = self.elements.get_mut(&element) {
            push_unique(&mut target.connected_pipes, pipe);
            push_unique(&mut target.connectable_pipes, pipe);
        }
        Ok(())
    }

    /// Detaches an endpoint from its element, updating both sides.
    ///
    /// The pipe stays connectable. A pump drops the pipe from its input or
    /// output assignment. Returns the element the endpoint was attached to.
    pub fn disconnect(
        &mut self,
        endpoint: EndpointId,
    ) -> Result<Option<ElementId>, InvariantViolation> {
        let state = self
            .endpoints
            .get(&endpoint)
            .ok_or(InvariantViolation::MissingEndpoint(endpoint))?;
        let Some(element) = state.connected else {
            return Ok(None);
        };
        let pipe = state.pipe;

        let target = self
            .elements
            .get_mut(&element)
            .ok_or(InvariantViolation::MissingElement(element))?;
        if let Some(pipe) = pipe {
            target.connected_pipes.retain(|entry| *entry != pipe);
            if let Some(pump) = target.as_pump_mut() {
                if pump.in_pipe == Some(pipe) {
                    pump.in_pipe = None;
                }
                if pump.out_pipe == Some(pipe) {
                    pump.out_pipe = None;
                }
            }
        }

        if let Some(state) = self.endpoints.get_mut(&endpoint) {
            state.connected = None;
        }
        Ok(Some(element))
    }

    /// Lists `pipe` as connectable from `element` without attaching it.
    pub fn allow_connection(
        &mut self,
        element: ElementId,
        pipe: ElementId,
    ) -> Result<(), InvariantViolation> {
        let _ = self.pipe_state(pipe)?;
        let target = self
            .elements
            .get_mut(&element)
            .ok_or(InvariantViolation::MissingElement(element))?;
        if target.kind() == ElementKind::Pipe {
            return Err(InvariantViolation::PipeToPipe(element));
        }
        push_unique(&mut target.connectable_pipes, pipe);
        Ok(())
    }

    /// Assigns the input and output pipes of a pump.
    ///
    /// Both pipes must be connected to the pump and differ from each other.
    pub fn direct_pump(
        &mut self,
        pump: ElementId,
        input: ElementId,
        output: ElementId,
    ) -> Result<(), InvariantViolation> {
        let element = self
            .elements
            .get_mut(&pump)
            .ok_or(InvariantViolation::MissingElement(pump))?;
        let attached = [input, output]
            .iter()
            .all(|pipe| element.connected_pipes.contains(pipe));
        let state = element
            .as_pump_mut()
            .ok_or(InvariantViolation::PumpDirection(pump))?;
        if !attached || input == output {
            return Err(InvariantViolation::PumpDirection(pump));
        }
        state.in_pipe = Some(input);
        state.out_pipe = Some(output);
        Ok(())
    }

    /// Swaps every reference `element` holds to `old` for `new`, in place.
    pub(crate) fn replace_pipe_reference(
        &mut self,
        element: ElementId,
        old: ElementId,
        new: ElementId,
    ) -> Result<(), InvariantViolation> {
        let target = self
            .elements
            .get_mut(&element)
            .ok_or(InvariantViolation::MissingElement(element))?;
        for entry in target
            .connected_pipes
            .iter_mut()
            .chain(target.connectable_pipes.iter_mut())
        {
            if *entry == old {
                *entry = new;
            }
        }
        if let Some(pump) = target.as_pump_mut() {
            if pump.in_pipe == Some(old) {
                pump.in_pipe = Some(new);
            }
            if pump.out_pipe == Some(old) {
                pump.out_pipe = Some(new);
            }
        }
        Ok(())
    }

    /// Screen-space bounds of an endpoint, derived from its pipe.
    ///
    /// Returns `None` for unknown or detached endpoints.
    #[must_use]
    pub fn endpoint_bounds(&self, id: EndpointId) -> Option<Rect> {
        let endpoint = self.endpoints.get(&id)?;
        let pipe_element = self.elements.get(&endpoint.pipe?)?;
        let pipe = pipe_element.as_pipe()?;
        Some(endpoint_rect(
            pipe_element.position,
            pipe_element.size,
            pipe.orientation,
            endpoint.at_start,
        ))
    }

    /// Finds the entity under `point`.
    ///
    /// Endpoints are tested before elements, using their expanded bounds;
    /// ties go to the earlier registry entry. Invisible entities are skipped.
    #[must_use]
    pub fn hit_test(&self, point: Point) -> Option<Hit> {
        for id in &self.endpoint_order {
            let visible = self.endpoints.get(id).is_some_and(Endpoint::is_visible);
            if !visible {
                continue;
            }
            if let Some(bounds) = self.endpoint_bounds(*id) {
                if bounds.expanded(ENDPOINT_HIT_MARGIN).contains(point) {
                    return Some(Hit::Endpoint(*id));
                }
            }
        }

        self.elements()
            .find(|(_, element)| element.visible && element.bounds().contains(point))
            .map(|(id, _)| Hit::Element(id))
    }

    /// Captures a read-only snapshot of the network in registry order.
    #[must_use]
    pub fn view(&self) -> NetworkView {
        let elements = self
            .elements()
            .map(|(id, element)| snapshot_element(id, element))
            .collect();
        let endpoints = self
            .endpoint_order
            .iter()
            .filter_map(|id| {
                let endpoint = self.endpoints.get(id)?;
                Some(EndpointSnapshot {
                    id: *id,
                    pipe: endpoint.pipe,
                    at_start: endpoint.at_start,
                    connected: endpoint.connected,
                    bounds: self.endpoint_bounds(*id).unwrap_or_default(),
                    visible: endpoint.visible,
                })
            })
            .collect();
        NetworkView::new(elements, endpoints)
    }

    /// Checks the structural invariants of the network.
    ///
    /// * registries hold no duplicates and match storage;
    /// * every registered endpoint belongs to a pipe whose slot points back;
    /// * no pipe has both ends on the same element;
    /// * adjacency sets agree with attached endpoints and reference live pipes;
    /// * pump input and output pipes are distinct and connected.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        self.verify_registries()?;
        self.verify_endpoints()?;
        self.verify_pipes()?;
        self.verify_adjacency()
    }

    fn verify_registries(&self) -> Result<(), InvariantViolation> {
        let unique_elements: BTreeSet<_> = self.element_order.iter().collect();
        let unique_endpoints: BTreeSet<_> = self.endpoint_order.iter().collect();
        if unique_elements.len() != self.element_order.len()
            || unique_endpoints.len() != self.endpoint_order.len()
            || self.elements.len() != self.element_order.len()
            || self.endpoints.len() != self.endpoint_order.len()
        {
            return Err(InvariantViolation::DuplicateEntry);
        }
        if let Some(missing) = self
            .element_order
            .iter()
            .find(|id| !self.elements.contains_key(*id))
        {
            return Err(InvariantViolation::MissingElement(*missing));
        }
        if let Some(missing) = self
            .endpoint_order
            .iter()
            .find(|id| !self.endpoints.contains_key(*id))
        {
            return Err(InvariantViolation::MissingEndpoint(*missing));
        }
        Ok(())
    }

    fn verify_endpoints(&self) -> Result<(), InvariantViolation> {
        for (id, endpoint) in &self.endpoints {
            let pipe = endpoint
                .pipe
                .ok_or(InvariantViolation::DetachedEndpoint(*id))?;
            let state = self.pipe_state(pipe)?;
            if state.slot_of(*id).is_none() {
                return Err(InvariantViolation::AsymmetricSlot {
                    pipe,
                    endpoint: *id,
                });
            }
            if let Some(element) = endpoint.connected {
                let target = self
                    .elements
                    .get(&element)
                    .ok_or(InvariantViolation::MissingElement(element))?;
                if !target.connected_pipes.contains(&pipe) {
                    return Err(InvariantViolation::ConnectionMismatch { element, pipe });
                }
            }
        }
        Ok(())
    }

    fn verify_pipes(&self) -> Result<(), InvariantViolation> {
        for (pipe, element) in &self.elements {
            let Some(state) = element.as_pipe() else {
                continue;
            };
            let mut targets = Vec::with_capacity(2);
            for endpoint in state.ends.into_iter().flatten() {
                let entry = self
                    .endpoints
                    .get(&endpoint)
                    .ok_or(InvariantViolation::MissingEndpoint(endpoint))?;
                if entry.pipe != Some(*pipe) {
                    return Err(InvariantViolation::AsymmetricSlot {
                        pipe: *pipe,
                        endpoint,
                    });
                }
                if let Some(target) = entry.connected {
                    if targets.contains(&target) {
                        return Err(InvariantViolation::DuplicateConnection {
                            pipe: *pipe,
                            element: target,
                        });
                    }
                    targets.push(target);
                }
            }
            if let [Some(first), Some(second)] = state.ends {
                if first == second {
                    return Err(InvariantViolation::AsymmetricSlot {
                        pipe: *pipe,
                        endpoint: first,
                    });
                }
            }
        }
        Ok(())
    }

    fn verify_adjacency(&self) -> Result<(), InvariantViolation> {
        for (id, element) in &self.elements {
            for list in [&element.connected_pipes, &element.connectable_pipes] {
                let unique: BTreeSet<_> = list.iter().collect();
                if unique.len() != list.len() {
                    return Err(InvariantViolation::DuplicateEntry);
                }
                for pipe in list {
                    if self.pipe(*pipe).is_none() {
                        return Err(InvariantViolation::DanglingReference {
                            element: *id,
                            pipe: *pipe,
                        });
                    }
                }
            }

            for pipe in &element.connected_pipes {
                if !self.pipe_attaches_to(*pipe, *id) {
                    return Err(InvariantViolation::ConnectionMismatch {
                        element: *id,
                        pipe: *pipe,
                    });
                }
            }

            if let Some(pump) = element.as_pump() {
                let assigned = [pump.in_pipe, pump.out_pipe];
                if assigned
                    .iter()
                    .flatten()
                    .any(|pipe| !element.connected_pipes.contains(pipe))
                {
                    return Err(InvariantViolation::PumpDirection(*id));
                }
                if pump.in_pipe.is_some() && pump.in_pipe == pump.out_pipe {
                    return Err(InvariantViolation::PumpDirection(*id));
                }
            }

            if let Some(pump) = element.as_cistern().and_then(Cistern::manufactured) {
                if !self.elements.contains_key(&pump) {
                    return Err(InvariantViolation::MissingElement(pump));
                }
            }
        }
        Ok(())
    }

    fn pipe_attaches_to(&self, pipe: ElementId, element: ElementId) -> bool {
        self.pipe(pipe).is_some_and(|state| {
            state.ends.into_iter().flatten().any(|endpoint| {
                self.endpoints.get(&endpoint).and_then(Endpoint::connected) == Some(element)
            })
        })
    }

    fn pipe_state(&self, pipe: ElementId) -> Result<&Pipe, InvariantViolation> {
        self.elements
            .get(&pipe)
            .ok_or(InvariantViolation::MissingElement(pipe))?
            .as_pipe()
            .ok_or(InvariantViolation::NotAPipe(pipe))
    }

    fn pipe_state_mut(&mut self, pipe: ElementId) -> Result<&mut Pipe, InvariantViolation> {
        self.elements
            .get_mut(&pipe)
            .ok_or(InvariantViolation::MissingElement(pipe))?
            .as_pipe_mut()
            .ok_or(InvariantViolation::NotAPipe(pipe))
    }

    /// Clears the slot holding `endpoint` and its back-reference to the pipe.
    ///
    /// The endpoint must be disconnected first.
    pub fn detach_from_pipe(&mut self, endpoint: EndpointId) -> Result<(), InvariantViolation> {
        let state = self
            .endpoints
            .get(&endpoint)
            .ok_or(InvariantViolation::MissingEndpoint(endpoint))?;
        if state.connected.is_some() {
            return Err(InvariantViolation::AlreadyConnected(endpoint));
        }
        let Some(pipe) = state.pipe else {
            return Ok(());
        };

        let pipe_state = self.pipe_state_mut(pipe)?;
        let slot = pipe_state
            .slot_of(endpoint)
            .ok_or(InvariantViolation::AsymmetricSlot { pipe, endpoint })?;
        pipe_state.ends[slot] = None;

        if let Some(state) = self.endpoints.get_mut(&endpoint) {
            state.pipe = None;
        }
        Ok(())
    }
}

fn push_unique(list: &mut Vec<ElementId>, id: ElementId) {
    if !list.contains(&id) {
        list.push(id);
    }
}

fn endpoint_rect(position: Point, size: Size, orientation: Orientation, at_start: bool) -> Rect {
    let origin = match orientation {
        Orientation::Vertical => {
            let x = position.x + (size.width - ENDPOINT_SIZE) / 2 + VERTICAL_ENDPOINT_SHIFT;
            let y = if at_start {
                position.y
            } else {
                position.y + size.height - ENDPOINT_SIZE - VERTICAL_END_INSET
            };
            Point::new(x, y)
        }
        Orientation::Horizontal => {
            let x = if at_start {
                position.x
            } else {
                position.x + size.width - ENDPOINT_SIZE
            };
            Point::new(x, position.y - ENDPOINT_SIZE)
        }
    };
    Rect::new(origin, Size::new(ENDPOINT_SIZE, ENDPOINT_SIZE))
}

fn snapshot_element(id: ElementId, element: &Element) -> ElementSnapshot {
    let pipe = element.as_pipe();
    let pump = element.as_pump();
    ElementSnapshot {
        id,
        name: element.name.clone(),
        kind: element.kind(),
        bounds: element.bounds(),
        visible: element.visible,
        working: element.working,
        occupied: pipe.is_some_and(Pipe::is_occupied),
        orientation: pipe.map(Pipe::orientation),
        leaked: pipe.map_or(0, Pipe::leaked),
        collected: element.as_cistern().map_or(0, Cistern::collected),
        in_pipe: pump.and_then(Pump::in_pipe),
        out_pipe: pump.and_then(Pump::out_pipe),
        connected_pipes: element.connected_pipes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe_between(graph: &mut NetworkGraph, a: ElementId, b: ElementId) -> ElementId {
        let pipe = graph.add_element(Element::pipe(
            "pipe",
            Point::new(100, 100),
            Size::new(20, 120),
            Orientation::Vertical,
        ));
        let start = graph.add_endpoint(pipe, true).expect("start endpoint");
        let end = graph.add_endpoint(pipe, false).expect("end endpoint");
        graph.connect(start, a).expect("connect start");
        graph.connect(end, b).expect("connect end");
        pipe
    }

    fn cistern_and_spring(graph: &mut NetworkGraph) -> (ElementId, ElementId) {
        let cistern = graph.add_element(Element::cistern(
            "cistern",
            Point::new(0, 0),
            Size::new(60, 60),
        ));
        let spring = graph.add_element(Element::spring(
            "spring",
            Point::new(0, 300),
            Size::new(60, 60),
            1,
        ));
        (cistern, spring)
    }

    #[test]
    fn connect_updates_both_sides() {
        let mut graph = NetworkGraph::new();
        let (cistern, spring) = cistern_and_spring(&mut graph);
        let pipe = pipe_between(&mut graph, cistern, spring);

        let [start, end] = graph.pipe(pipe).expect("pipe").ends();
        let start = start.expect("start slot");
        let end = end.expect("end slot");

        assert_eq!(graph.endpoint(start).and_then(Endpoint::connected), Some(cistern));
        assert_eq!(graph.endpoint(end).and_then(Endpoint::connected), Some(spring));
        let cistern_element = graph.element(cistern).expect("cistern");
        assert_eq!(cistern_element.connected_pipes(), &[pipe]);
        assert_eq!(cistern_element.connectable_pipes(), &[pipe]);
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn disconnect_keeps_pipe_connectable() {
        let mut graph = NetworkGraph::new();
        let (cistern, spring) = cistern_and_spring(&mut graph);
        let pipe = pipe_between(&mut graph, cistern, spring);
        let start = graph.pipe(pipe).and_then(|p| p.ends()[0]).expect("start");

        let previous = graph.disconnect(start).expect("disconnect");

        assert_eq!(previous, Some(cistern));
        assert_eq!(graph.endpoint(start).and_then(Endpoint::connected), None);
        let cistern_element = graph.element(cistern).expect("cistern");
        assert!(cistern_element.connected_pipes().is_empty());
        assert_eq!(cistern_element.connectable_pipes(), &[pipe]);
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn connecting_both_ends_to_one_element_is_refused() {
        let mut graph = NetworkGraph::new();
        let (cistern, spring) = cistern_and_spring(&mut graph);
        let pipe = pipe_between(&mut graph, cistern, spring);
        let end = graph.pipe(pipe).and_then(|p| p.ends()[1]).expect("end");
        let _ = graph.disconnect(end).expect("disconnect");

        let result = graph.connect(end, cistern);

        assert_eq!(
            result,
            Err(InvariantViolation::DuplicateConnection {
                pipe,
                element: cistern,
            })
        );
        assert_eq!(graph.endpoint(end).and_then(Endpoint::connected), None);
    }

    #[test]
    fn connecting_to_a_pipe_is_refused() {
        let mut graph = NetworkGraph::new();
        let (cistern, spring) = cistern_and_spring(&mut graph);
        let pipe = pipe_between(&mut graph, cistern, spring);
        let other = graph.add_element(Element::pipe(
            "other",
            Point::new(300, 0),
            Size::new(120, 20),
            Orientation::Horizontal,
        ));
        let loose = graph.add_endpoint(other, true).expect("endpoint");

        assert_eq!(
            graph.connect(loose, pipe),
            Err(InvariantViolation::PipeToPipe(pipe))
        );
    }

    #[test]
    fn disconnecting_a_pump_pipe_clears_its_direction() {
        let mut graph = NetworkGraph::new();
        let (cistern, _) = cistern_and_spring(&mut graph);
        let pump = graph.add_element(Element::pump("pump", Point::new(0, 150), Size::new(50, 50)));
        let pipe = pipe_between(&mut graph, cistern, pump);
        graph
            .element_mut(pump)
            .and_then(Element::as_pump_mut)
            .expect("pump")
            .set_in_pipe(Some(pipe));
        let end = graph.pipe(pipe).and_then(|p| p.ends()[1]).expect("end");

        let _ = graph.disconnect(end).expect("disconnect");

        assert_eq!(graph.pump(pump).and_then(Pump::in_pipe), None);
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn remove_element_preserves_registry_order() {
        let mut graph = NetworkGraph::new();
        let ids: Vec<_> = (0..4)
            .map(|index| {
                graph.add_element(Element::cistern(
                    format!("cistern {index}"),
                    Point::new(index * 100, 0),
                    Size::new(50, 50),
                ))
            })
            .collect();

        let removed = graph.remove_element(ids[1]);

        assert!(removed.is_some());
        assert_eq!(graph.element_ids(), &[ids[0], ids[2], ids[3]]);
        let inserted = graph.insert_element_at(
            1,
            Element::spring("spring", Point::new(0, 0), Size::new(10, 10), 1),
        );
        assert_eq!(graph.element_ids(), &[ids[0], inserted, ids[2], ids[3]]);
    }

    #[test]
    fn hit_test_prefers_endpoints_over_elements() {
        let mut graph = NetworkGraph::new();
        let (cistern, spring) = cistern_and_spring(&mut graph);
        let pipe = pipe_between(&mut graph, cistern, spring);
        let start = graph.pipe(pipe).and_then(|p| p.ends()[0]).expect("start");
        let bounds = graph.endpoint_bounds(start).expect("bounds");
        let inside_pipe = Point::new(bounds.origin().x + 40, bounds.origin().y + 5);

        assert!(graph.element(pipe).expect("pipe").bounds().contains(inside_pipe));
        assert_eq!(graph.hit_test(inside_pipe), Some(Hit::Endpoint(start)));
    }

    #[test]
    fn hit_test_falls_back_to_elements_in_registry_order() {
        let mut graph = NetworkGraph::new();
        let first = graph.add_element(Element::cistern(
            "first",
            Point::new(500, 500),
            Size::new(60, 60),
        ));
        let _second = graph.add_element(Element::cistern(
            "second",
            Point::new(520, 520),
            Size::new(60, 60),
        ));

        assert_eq!(graph.hit_test(Point::new(530, 530)), Some(Hit::Element(first)));
        assert_eq!(graph.hit_test(Point::new(900, 900)), None);
    }

    #[test]
    fn hit_test_skips_hidden_elements() {
        let mut graph = NetworkGraph::new();
        let _hidden = graph.add_element(
            Element::pump("pump", Point::new(0, 0), Size::new(50, 50)).hidden(),
        );
        assert_eq!(graph.hit_test(Point::new(10, 10)), None);
    }

    #[test]
    fn endpoint_positions_follow_pipe_geometry() {
        let mut graph = NetworkGraph::new();
        let vertical = graph.add_element(Element::pipe(
            "vertical",
            Point::new(100, 100),
            Size::new(20, 120),
            Orientation::Vertical,
        ));
        let horizontal = graph.add_element(Element::pipe(
            "horizontal",
            Point::new(300, 100),
            Size::new(120, 20),
            Orientation::Horizontal,
        ));
        let top = graph.add_endpoint(vertical, true).expect("top");
        let bottom = graph.add_endpoint(vertical, false).expect("bottom");
        let left = graph.add_endpoint(horizontal, true).expect("left");
        let right = graph.add_endpoint(horizontal, false).expect("right");

        let origin = |id| graph.endpoint_bounds(id).expect("bounds").origin();
        assert_eq!(origin(top), Point::new(77, 100));
        assert_eq!(origin(bottom), Point::new(77, 165));
        assert_eq!(origin(left), Point::new(300, 85));
        assert_eq!(origin(right), Point::new(405, 85));
    }

    #[test]
    fn verify_reports_asymmetric_slots() {
        let mut graph = NetworkGraph::new();
        let (cistern, spring) = cistern_and_spring(&mut graph);
        let pipe = pipe_between(&mut graph, cistern, spring);
        let start = graph.pipe(pipe).and_then(|p| p.ends()[0]).expect("start");
        graph.pipe_state_mut(pipe).expect("pipe").ends[0] = None;

        assert_eq!(
            graph.verify(),
            Err(InvariantViolation::AsymmetricSlot {
                pipe,
                endpoint: start,
            })
        );
    }

    #[test]
    fn verify_reports_dangling_adjacency() {
        let mut graph = NetworkGraph::new();
        let (cistern, _) = cistern_and_spring(&mut graph);
        let pipe = graph.add_element(Element::pipe(
            "loose",
            Point::new(0, 0),
            Size::new(120, 20),
            Orientation::Horizontal,
        ));
        graph.allow_connection(cistern, pipe).expect("allow");
        let _ = graph.remove_element(pipe);

        assert_eq!(
            graph.verify(),
            Err(InvariantViolation::DanglingReference {
                element: cistern,
                pipe,
            })
        );
    }

    #[test]
    fn remove_endpoint_clears_every_reference() {
        let mut graph = NetworkGraph::new();
        let (cistern, spring) = cistern_and_spring(&mut graph);
        let pipe = pipe_between(&mut graph, cistern, spring);
        let start = graph.pipe(pipe).and_then(|p| p.ends()[0]).expect("start");

        let removed = graph.remove_endpoint(start).expect("remove");

        assert!(removed.at_start());
        assert_eq!(removed.pipe(), None);
        assert_eq!(removed.connected(), None);
        assert!(graph.endpoint(start).is_none());
        assert!(!graph.endpoint_ids().contains(&start));
        assert_eq!(graph.pipe(pipe).expect("pipe").ends()[0], None);
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn direct_pump_requires_two_distinct_connected_pipes() {
        let mut graph = NetworkGraph::new();
        let pump = graph.add_element(Element::pump("pump", Point::new(200, 200), Size::new(50, 50)));
        let mut pipes = Vec::new();
        for x in [0, 300] {
            let pipe = graph.add_element(Element::pipe(
                "pipe",
                Point::new(x, 215),
                Size::new(100, 20),
                Orientation::Horizontal,
            ));
            let end = graph.add_endpoint(pipe, true).expect("endpoint");
            graph.connect(end, pump).expect("connect");
            pipes.push(pipe);
        }
        let loose = graph.add_element(Element::pipe(
            "loose",
            Point::new(0, 400),
            Size::new(100, 20),
            Orientation::Horizontal,
        ));

        assert_eq!(
            graph.direct_pump(pump, pipes[0], pipes[0]),
            Err(InvariantViolation::PumpDirection(pump))
        );
        assert_eq!(
            graph.direct_pump(pump, pipes[0], loose),
            Err(InvariantViolation::PumpDirection(pump))
        );
        graph.direct_pump(pump, pipes[0], pipes[1]).expect("direct");

        let state = graph.pump(pump).expect("pump");
        assert_eq!(state.in_pipe(), Some(pipes[0]));
        assert_eq!(state.out_pipe(), Some(pipes[1]));
        assert!(graph.verify().is_ok());
    }
}
