//! Failure types raised while mutating the network.

use thiserror::Error;
use waterworks_core::{ActionError, ElementId, EndpointId, PlayerId};

/// Structural fault detected in the network.
///
/// These indicate a broken mutation algorithm rather than a player mistake, so
/// they abort the offending operation and propagate to the host loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// An element referenced by the network does not exist.
    #[error("element {0:?} is missing from the registry")]
    MissingElement(ElementId),
    /// An endpoint referenced by the network does not exist.
    #[error("endpoint {0:?} is missing from the registry")]
    MissingEndpoint(EndpointId),
    /// A pipe was required but the element is of another kind.
    #[error("element {0:?} is not a pipe")]
    NotAPipe(ElementId),
    /// Pipes attach only to pumps, cisterns and springs.
    #[error("pipe end cannot be attached to pipe {0:?}")]
    PipeToPipe(ElementId),
    /// Both endpoint slots of the pipe are taken.
    #[error("pipe {0:?} has no free endpoint slot")]
    NoFreeSlot(ElementId),
    /// A specific endpoint slot was expected to be empty.
    #[error("slot {slot} of pipe {pipe:?} is already taken")]
    SlotOccupied {
        /// Pipe owning the slot.
        pipe: ElementId,
        /// Index of the slot.
        slot: usize,
    },
    /// A registered endpoint has no owning pipe.
    #[error("endpoint {0:?} is detached from every pipe")]
    DetachedEndpoint(EndpointId),
    /// The endpoint is already attached to an element.
    #[error("endpoint {0:?} is already connected")]
    AlreadyConnected(EndpointId),
    /// Endpoint and pipe slot disagree about their relationship.
    #[error("endpoint {endpoint:?} and pipe {pipe:?} disagree about their slot")]
    AsymmetricSlot {
        /// Pipe whose slots were inspected.
        pipe: ElementId,
        /// Endpoint whose back-reference was inspected.
        endpoint: EndpointId,
    },
    /// Both ends of a pipe are attached to the same element.
    #[error("both ends of pipe {pipe:?} are attached to element {element:?}")]
    DuplicateConnection {
        /// Pipe with two ends on the same element.
        pipe: ElementId,
        /// Element holding both ends.
        element: ElementId,
    },
    /// An element's adjacency disagrees with the endpoints attached to it.
    #[error("element {element:?} lists pipe {pipe:?} without a matching endpoint")]
    ConnectionMismatch {
        /// Element whose adjacency was inspected.
        element: ElementId,
        /// Pipe listed by the element.
        pipe: ElementId,
    },
    /// An adjacency set references a pipe that no longer exists.
    #[error("element {element:?} references removed pipe {pipe:?}")]
    DanglingReference {
        /// Element holding the stale reference.
        element: ElementId,
        /// Pipe that was removed.
        pipe: ElementId,
    },
    /// A registry or adjacency set lists the same entry twice.
    #[error("duplicate registry entry")]
    DuplicateEntry,
    /// A pump's input and output pipes are equal or not connected to it.
    #[error("pump {0:?} has an invalid input/output assignment")]
    PumpDirection(ElementId),
    /// More than one endpoint is held by players at once.
    #[error("more than one pipe end is picked up")]
    MultipleHeldEndpoints,
    /// A player stands on an element that no longer exists.
    #[error("player {player:?} stands on removed element {element:?}")]
    DanglingPlayer {
        /// Player holding the stale reference.
        player: PlayerId,
        /// Element that was removed.
        element: ElementId,
    },
    /// A pipe holds more than one player.
    #[error("player {player:?} shares pipe {pipe:?} with another player")]
    CrowdedPipe {
        /// Player found on an already occupied pipe.
        player: PlayerId,
        /// Pipe holding both players.
        pipe: ElementId,
    },
}

/// Failure of a single player action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ActionFailure {
    /// The player made a mistake; nothing was mutated.
    #[error("action rejected: {0}")]
    Rejected(#[from] ActionError),
    /// The network is structurally broken.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}
