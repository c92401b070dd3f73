#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Waterworks engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters resolve raw input into an
//! explicit [`Selection`], systems translate input into [`Command`] values,
//! the world executes those commands via its `apply` entry point and then
//! broadcasts [`Event`] values describing what changed. Nothing in this crate
//! holds references into the network; everything is addressed by identifier.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Waterworks.";

/// Key that ends the active turn regardless of the actions taken so far.
pub const PASS_KEY: char = 'W';

/// Team a player belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Maintains and extends the network.
    Plumber,
    /// Damages the network.
    Saboteur,
}

impl Role {
    /// Resolves a key press into the binding it triggers for this role.
    ///
    /// Keys are case-insensitive. Returns `None` for keys the role does not
    /// recognise, including keys that belong exclusively to the other team.
    #[must_use]
    pub fn binding_for(self, key: char) -> Option<KeyBinding> {
        let key = key.to_ascii_uppercase();
        if key == PASS_KEY {
            return Some(KeyBinding::Pass);
        }

        let action = match self {
            Self::Plumber => Action::Plumber(match key {
                'Q' => PlumberAction::Move,
                'D' => PlumberAction::PickUpPump,
                'I' => PlumberAction::InsertPump,
                'F' => PlumberAction::FixPump,
                'O' => PlumberAction::FixPipe,
                'R' => PlumberAction::PickUpEndpoint,
                'T' => PlumberAction::InsertEndpoint,
                'A' => PlumberAction::ChangeInputPipe,
                'S' => PlumberAction::ChangeOutputPipe,
                _ => return None,
            }),
            Self::Saboteur => Action::Saboteur(match key {
                'Q' => SaboteurAction::Move,
                'P' => SaboteurAction::PuncturePipe,
                'A' => SaboteurAction::ChangeInputPipe,
                'S' => SaboteurAction::ChangeOutputPipe,
                _ => return None,
            }),
        };
        Some(KeyBinding::Act(action))
    }
}

/// Outcome of resolving a key press against a role's bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyBinding {
    /// The key requests an action that consumes one slot of the turn.
    Act(Action),
    /// The key ends the turn immediately.
    Pass,
}

/// Action requested by a player, tagged with the role that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Action from the plumber action set.
    Plumber(PlumberAction),
    /// Action from the saboteur action set.
    Saboteur(SaboteurAction),
}

impl Action {
    /// Role whose action set contains this action.
    #[must_use]
    pub const fn role(self) -> Role {
        match self {
            Self::Plumber(_) => Role::Plumber,
            Self::Saboteur(_) => Role::Saboteur,
        }
    }
}

/// Actions available to plumbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlumberAction {
    /// Move onto the selected element.
    Move,
    /// Pick up the pump manufactured at the cistern underfoot.
    PickUpPump,
    /// Split the pipe underfoot around the held pump.
    InsertPump,
    /// Repair the broken pump underfoot.
    FixPump,
    /// Repair the punctured pipe underfoot.
    FixPipe,
    /// Detach the selected pipe end from the element underfoot.
    PickUpEndpoint,
    /// Attach the held pipe end to the element underfoot.
    InsertEndpoint,
    /// Make the selected pipe the input of the pump underfoot.
    ChangeInputPipe,
    /// Make the selected pipe the output of the pump underfoot.
    ChangeOutputPipe,
}

/// Actions available to saboteurs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaboteurAction {
    /// Move onto the selected element.
    Move,
    /// Puncture the pipe underfoot.
    PuncturePipe,
    /// Make the selected pipe the input of the pump underfoot.
    ChangeInputPipe,
    /// Make the selected pipe the output of the pump underfoot.
    ChangeOutputPipe,
}

/// Unique identifier assigned to a network element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(u32);

impl ElementId {
    /// Creates a new element identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a pipe endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointId(u32);

impl EndpointId {
    /// Creates a new endpoint identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Screen-space location measured in whole units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate, growing to the right.
    pub x: i32,
    /// Vertical coordinate, growing downwards.
    pub y: i32,
}

impl Point {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width and height of an axis-aligned box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Horizontal extent.
    pub width: i32,
    /// Vertical extent.
    pub height: i32,
}

impl Size {
    /// Creates a new size descriptor.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle anchored at its upper-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    origin: Point,
    size: Size,
}

impl Rect {
    /// Constructs a rectangle from an origin and size.
    #[must_use]
    pub const fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Upper-left corner of the rectangle.
    #[must_use]
    pub const fn origin(&self) -> Point {
        self.origin
    }

    /// Dimensions of the rectangle.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Returns the rectangle grown by `margin` on every side.
    #[must_use]
    pub const fn expanded(&self, margin: i32) -> Self {
        Self {
            origin: Point::new(self.origin.x - margin, self.origin.y - margin),
            size: Size::new(self.size.width + 2 * margin, self.size.height + 2 * margin),
        }
    }

    /// Reports whether the point lies inside the rectangle, edges included.
    #[must_use]
    pub const fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x <= self.origin.x + self.size.width
            && point.y >= self.origin.y
            && point.y <= self.origin.y + self.size.height
    }
}

/// Direction along which a pipe runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Pipe runs top to bottom; its length is its height.
    Vertical,
    /// Pipe runs left to right; its length is its width.
    Horizontal,
}

/// Variant tag of a network element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Carries water between two endpoints.
    Pipe,
    /// Forwards water from its input pipe to its output pipe.
    Pump,
    /// Collects delivered water and manufactures pumps.
    Cistern,
    /// Emits water into its connected pipes.
    Spring,
}

/// Entity found under a pointer position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hit {
    /// A pipe endpoint was hit.
    Endpoint(EndpointId),
    /// A network element was hit.
    Element(ElementId),
}

/// Target chosen through the pointer and passed explicitly with each action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    /// Element picked by the latest click, if any.
    pub element: Option<ElementId>,
    /// Endpoint picked by the latest click, if any.
    pub endpoint: Option<EndpointId>,
}

impl Selection {
    /// Selection that targets nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            element: None,
            endpoint: None,
        }
    }

    /// Selection that targets a single element.
    #[must_use]
    pub const fn element(element: ElementId) -> Self {
        Self {
            element: Some(element),
            endpoint: None,
        }
    }

    /// Selection that targets a single endpoint.
    #[must_use]
    pub const fn endpoint(endpoint: EndpointId) -> Self {
        Self {
            element: None,
            endpoint: Some(endpoint),
        }
    }

    /// Converts a hit-test result into a selection; a miss selects nothing.
    #[must_use]
    pub const fn from_hit(hit: Option<Hit>) -> Self {
        match hit {
            Some(Hit::Element(element)) => Self::element(element),
            Some(Hit::Endpoint(endpoint)) => Self::endpoint(endpoint),
            None => Self::none(),
        }
    }
}

/// Reason a turn came to an end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnEndReason {
    /// The player passed.
    Passed,
    /// The player used every action slot.
    ActionsExhausted,
    /// The time budget elapsed.
    TimeExpired,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Announces the first turn of the game.
    StartGame,
    /// Performs an action on behalf of a player.
    Perform {
        /// Player attempting the action.
        player: PlayerId,
        /// Action requested by the player.
        action: Action,
        /// Target resolved from the pointer when the action was requested.
        selection: Selection,
    },
    /// Ends the turn of the active player and starts the next one.
    EndTurn {
        /// Player whose turn ends.
        player: PlayerId,
        /// Why the turn ended.
        reason: TurnEndReason,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A player's turn began.
    TurnStarted {
        /// Player who may now act.
        player: PlayerId,
        /// Role of the player, selecting the active key bindings.
        role: Role,
    },
    /// A player's turn ended.
    TurnEnded {
        /// Player whose turn ended.
        player: PlayerId,
        /// Why the turn ended.
        reason: TurnEndReason,
    },
    /// Every player completed a turn.
    RoundCompleted {
        /// One-based index of the completed round.
        round: u64,
    },
    /// An action finished and mutated the world.
    ActionPerformed {
        /// Player who acted.
        player: PlayerId,
        /// Action that succeeded.
        action: Action,
    },
    /// An action was rejected without mutating the world.
    ActionRejected {
        /// Player who attempted the action.
        player: PlayerId,
        /// Action that was rejected.
        action: Action,
        /// Specific reason the action failed.
        reason: ActionError,
    },
    /// A player moved onto an element.
    PlayerMoved {
        /// Player who moved.
        player: PlayerId,
        /// Element the player now stands on.
        to: ElementId,
    },
    /// A plumber picked up the pump manufactured at a cistern.
    PumpPickedUp {
        /// Plumber now holding the pump.
        player: PlayerId,
        /// Cistern that manufactured the pump.
        cistern: ElementId,
    },
    /// A plumber split a pipe around a pump.
    PumpInserted {
        /// Plumber who inserted the pump.
        player: PlayerId,
        /// Pipe that was replaced.
        replaced: ElementId,
        /// Newly placed pump.
        pump: ElementId,
        /// The two pipes that replaced the original, in registry order.
        pipes: [ElementId; 2],
    },
    /// A plumber repaired a pump.
    PumpFixed {
        /// Plumber who repaired the pump.
        player: PlayerId,
        /// Pump that works again.
        pump: ElementId,
    },
    /// A plumber repaired a pipe.
    PipeFixed {
        /// Plumber who repaired the pipe.
        player: PlayerId,
        /// Pipe that works again.
        pipe: ElementId,
    },
    /// A saboteur punctured a pipe.
    PipePunctured {
        /// Saboteur who punctured the pipe.
        player: PlayerId,
        /// Pipe that now leaks.
        pipe: ElementId,
    },
    /// A plumber detached a pipe end from an element.
    EndpointPickedUp {
        /// Plumber now holding the pipe end.
        player: PlayerId,
        /// Element the pipe end was detached from.
        element: ElementId,
        /// Pipe the end belonged to.
        pipe: ElementId,
    },
    /// A plumber attached a pipe end to an element.
    EndpointInserted {
        /// Plumber who attached the pipe end.
        player: PlayerId,
        /// Endpoint created for the attachment.
        endpoint: EndpointId,
        /// Pipe that received the endpoint.
        pipe: ElementId,
        /// Element the pipe is now connected to.
        element: ElementId,
    },
    /// A pump's input pipe changed.
    PumpInputChanged {
        /// Pump that was reconfigured.
        pump: ElementId,
        /// New input pipe.
        pipe: ElementId,
    },
    /// A pump's output pipe changed.
    PumpOutputChanged {
        /// Pump that was reconfigured.
        pump: ElementId,
        /// New output pipe.
        pipe: ElementId,
    },
    /// Water moved through the network at the end of a round.
    WaterTransferred {
        /// Volume delivered to cisterns during the transfer.
        collected: u32,
        /// Volume lost through leaks during the transfer.
        leaked: u32,
    },
    /// A pump stopped working.
    PumpBroke {
        /// Pump that broke.
        pump: ElementId,
    },
    /// A cistern manufactured a pump awaiting pickup.
    PumpManufactured {
        /// Cistern holding the pump.
        cistern: ElementId,
        /// Invisible pump waiting at the cistern.
        pump: ElementId,
    },
}

/// Reasons an action may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ActionError {
    /// The acting player does not own the current turn.
    #[error("it is not this player's turn")]
    NotYourTurn,
    /// The action belongs to the other team's action set.
    #[error("the action is not available to this player's role")]
    RoleMismatch,
    /// The action needs a target but nothing suitable was selected.
    #[error("select a target first")]
    NothingSelected,
    /// The selection refers to an entity that no longer exists.
    #[error("the selected target no longer exists")]
    UnknownTarget,
    /// The player already stands on the requested element.
    #[error("already at this location")]
    AlreadyThere,
    /// Another player stands on the requested pipe.
    #[error("this location is currently occupied")]
    Occupied,
    /// The action needs the player to stand on a cistern.
    #[error("stand on a cistern first")]
    NotOnCistern,
    /// The cistern underfoot has no pump ready.
    #[error("this cistern has no pump available for pickup")]
    NoManufacturedPump,
    /// The plumber already carries a pump.
    #[error("already holding a pump")]
    AlreadyHoldingPump,
    /// The action needs the player to stand on a pipe.
    #[error("stand on a pipe first")]
    NotOnPipe,
    /// The plumber carries no pump to insert.
    #[error("no pump picked up to insert")]
    NoPumpHeld,
    /// The pipe is too short to make room for a pump.
    #[error("the pipe is too short to hold a pump")]
    PipeTooShort,
    /// The action needs the player to stand on a pump.
    #[error("stand on a pump first")]
    NotOnPump,
    /// The repair target already works.
    #[error("already working")]
    AlreadyWorking,
    /// The pipe is already punctured.
    #[error("already punctured")]
    AlreadyBroken,
    /// The selected pipe end is not attached to the element underfoot.
    #[error("stand on the element the pipe end is attached to")]
    NotOnElement,
    /// Pipe ends cannot be detached while standing on a pipe.
    #[error("pipe ends cannot be picked up from a pipe")]
    CannotDetachFromPipe,
    /// The plumber already carries a pipe end.
    #[error("already holding a pipe end")]
    AlreadyHoldingEndpoint,
    /// Another player already carries a pipe end.
    #[error("another player is holding a pipe end")]
    EndpointHeldElsewhere,
    /// The plumber carries no pipe end to insert.
    #[error("no pipe end picked up to insert")]
    NoEndpointHeld,
    /// The element underfoot accepts no pipes.
    #[error("no connectable pipes at this element")]
    NoConnectablePipe,
    /// Every connectable pipe is already attached to the element.
    #[error("all connectable pipes are already connected")]
    AllPipesConnected,
    /// The selected pipe is not connected to the pump underfoot.
    #[error("select a pipe connected to the pump")]
    PipeNotConnected,
    /// The selected pipe is already used for the opposite direction.
    #[error("input and output pipe cannot be the same")]
    SameInputAndOutput,
}

/// Immutable representation of a single element used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementSnapshot {
    /// Identifier of the element.
    pub id: ElementId,
    /// Display name of the element.
    pub name: String,
    /// Variant of the element.
    pub kind: ElementKind,
    /// Screen-space bounds of the element.
    pub bounds: Rect,
    /// Whether the element should be drawn.
    pub visible: bool,
    /// Whether the element works or is broken.
    pub working: bool,
    /// Whether a player stands on the element (pipes only).
    pub occupied: bool,
    /// Orientation of the element when it is a pipe.
    pub orientation: Option<Orientation>,
    /// Water leaked by the element when it is a pipe.
    pub leaked: u32,
    /// Water collected by the element when it is a cistern.
    pub collected: u32,
    /// Input pipe when the element is a pump.
    pub in_pipe: Option<ElementId>,
    /// Output pipe when the element is a pump.
    pub out_pipe: Option<ElementId>,
    /// Pipes currently connected to the element, in connection order.
    pub connected_pipes: Vec<ElementId>,
}

/// Immutable representation of a single pipe endpoint used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndpointSnapshot {
    /// Identifier of the endpoint.
    pub id: EndpointId,
    /// Pipe owning the endpoint.
    pub pipe: Option<ElementId>,
    /// Whether the endpoint sits at the start of its pipe.
    pub at_start: bool,
    /// Element the endpoint is attached to.
    pub connected: Option<ElementId>,
    /// Screen-space bounds derived from the owning pipe.
    pub bounds: Rect,
    /// Whether the endpoint should be drawn.
    pub visible: bool,
}

/// Read-only snapshot of the network in registry order.
///
/// Order matches the world's internal registries; presentation relies on it.
#[derive(Clone, Debug, Default)]
pub struct NetworkView {
    elements: Vec<ElementSnapshot>,
    endpoints: Vec<EndpointSnapshot>,
}

impl NetworkView {
    /// Creates a new network view; the snapshots keep their given order.
    #[must_use]
    pub fn new(elements: Vec<ElementSnapshot>, endpoints: Vec<EndpointSnapshot>) -> Self {
        Self {
            elements,
            endpoints,
        }
    }

    /// Element snapshots in registry order.
    #[must_use]
    pub fn elements(&self) -> &[ElementSnapshot] {
        &self.elements
    }

    /// Endpoint snapshots in registry order.
    #[must_use]
    pub fn endpoints(&self) -> &[EndpointSnapshot] {
        &self.endpoints
    }

    /// Looks up an element snapshot by identifier.
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<&ElementSnapshot> {
        self.elements.iter().find(|element| element.id == id)
    }
}

/// Immutable representation of a player used for HUD display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerSnapshot {
    /// Identifier of the player.
    pub id: PlayerId,
    /// Display name of the player.
    pub name: String,
    /// Team of the player.
    pub role: Role,
    /// Element the player stands on.
    pub current_element: Option<ElementId>,
    /// Screen-space position of the player.
    pub position: Point,
    /// Whether the player carries a pump.
    pub holds_pump: bool,
    /// Whether the player carries a pipe end.
    pub holds_endpoint: bool,
}

/// Aggregate score of both teams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scores {
    /// Water delivered to cisterns; the plumbers' score.
    pub collected: u32,
    /// Water lost through leaks; the saboteurs' score.
    pub leaked: u32,
}

#[cfg(test)]
mod tests {
    use super::{
        Action, Command, ElementId, Hit, KeyBinding, PlayerId, PlumberAction, Point, Rect, Role,
        SaboteurAction, Selection, Size,
    };

    #[test]
    fn plumber_bindings_are_case_insensitive() {
        assert_eq!(
            Role::Plumber.binding_for('i'),
            Some(KeyBinding::Act(Action::Plumber(PlumberAction::InsertPump)))
        );
        assert_eq!(
            Role::Plumber.binding_for('I'),
            Role::Plumber.binding_for('i')
        );
    }

    #[test]
    fn pass_key_is_shared_by_both_roles() {
        assert_eq!(Role::Plumber.binding_for('w'), Some(KeyBinding::Pass));
        assert_eq!(Role::Saboteur.binding_for('W'), Some(KeyBinding::Pass));
    }

    #[test]
    fn team_specific_keys_are_not_shared() {
        assert_eq!(Role::Saboteur.binding_for('I'), None);
        assert_eq!(Role::Saboteur.binding_for('R'), None);
        assert_eq!(Role::Plumber.binding_for('P'), None);
        assert_eq!(
            Role::Saboteur.binding_for('p'),
            Some(KeyBinding::Act(Action::Saboteur(
                SaboteurAction::PuncturePipe
            )))
        );
    }

    #[test]
    fn unknown_keys_have_no_binding() {
        assert_eq!(Role::Plumber.binding_for('Z'), None);
        assert_eq!(Role::Saboteur.binding_for('\0'), None);
    }

    #[test]
    fn expanded_rect_contains_points_in_margin() {
        let rect = Rect::new(Point::new(100, 100), Size::new(15, 15));
        assert!(!rect.contains(Point::new(80, 100)));
        assert!(rect.expanded(30).contains(Point::new(80, 100)));
        assert!(rect.expanded(30).contains(Point::new(145, 145)));
        assert!(!rect.expanded(30).contains(Point::new(146, 145)));
    }

    #[test]
    fn selection_from_miss_is_empty() {
        assert_eq!(Selection::from_hit(None), Selection::none());
        assert_eq!(
            Selection::from_hit(Some(Hit::Element(ElementId::new(3)))),
            Selection::element(ElementId::new(3))
        );
    }

    #[test]
    fn perform_command_round_trips_through_bincode() {
        let command = Command::Perform {
            player: PlayerId::new(1),
            action: Action::Plumber(PlumberAction::Move),
            selection: Selection::element(ElementId::new(4)),
        };
        let bytes = bincode::serialize(&command).expect("serialize");
        let restored: Command = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, command);
    }
}
