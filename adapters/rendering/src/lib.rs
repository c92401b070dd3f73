#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Waterworks adapters.

use std::time::Duration;

use anyhow::Result as AnyResult;
use glam::Vec2;
use waterworks_core::{
    ElementId, ElementKind, EndpointId, NetworkView, PlayerId, PlayerSnapshot, Point, Rect, Role,
    Scores, Selection, PASS_KEY,
};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Colors used to draw the network, its players and the selection highlight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    /// Fill of working pipes.
    pub pipe: Color,
    /// Fill of working pumps.
    pub pump: Color,
    /// Fill of cisterns.
    pub cistern: Color,
    /// Fill of springs.
    pub spring: Color,
    /// Fill of broken elements, whatever their kind.
    pub broken: Color,
    /// Fill of pipe endpoints.
    pub endpoint: Color,
    /// Marker of plumbers.
    pub plumber: Color,
    /// Marker of saboteurs.
    pub saboteur: Color,
    /// Outline drawn around the selected entity.
    pub highlight: Color,
}

impl Palette {
    /// Fill used for an element of `kind`.
    #[must_use]
    pub const fn element(&self, kind: ElementKind, working: bool) -> Color {
        if !working {
            return self.broken;
        }
        match kind {
            ElementKind::Pipe => self.pipe,
            ElementKind::Pump => self.pump,
            ElementKind::Cistern => self.cistern,
            ElementKind::Spring => self.spring,
        }
    }

    /// Marker used for a player of `role`.
    #[must_use]
    pub const fn player(&self, role: Role) -> Color {
        match role {
            Role::Plumber => self.plumber,
            Role::Saboteur => self.saboteur,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            pipe: Color::from_rgb_u8(150, 150, 160),
            pump: Color::from_rgb_u8(230, 160, 40),
            cistern: Color::from_rgb_u8(40, 90, 200),
            spring: Color::from_rgb_u8(60, 190, 220),
            broken: Color::from_rgb_u8(200, 40, 40),
            endpoint: Color::from_rgb_u8(90, 90, 90),
            plumber: Color::from_rgb_u8(30, 120, 255),
            saboteur: Color::from_rgb_u8(0, 200, 80),
            highlight: Color::from_rgb_u8(255, 0, 0),
        }
    }
}

/// Axis-aligned box expressed in presentation units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    /// Upper-left corner.
    pub origin: Vec2,
    /// Width and height.
    pub size: Vec2,
}

impl Bounds {
    /// Converts world-space bounds into presentation units.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            origin: point_to_vec2(rect.origin()),
            size: Vec2::new(rect.size().width as f32, rect.size().height as f32),
        }
    }
}

/// Converts a world-space point into presentation units.
#[must_use]
pub fn point_to_vec2(point: Point) -> Vec2 {
    Vec2::new(point.x as f32, point.y as f32)
}

/// Converts a presentation-space position into the nearest world-space point.
#[must_use]
pub fn vec2_to_point(position: Vec2) -> Point {
    Point::new(position.x.round() as i32, position.y.round() as i32)
}

/// Element drawn in the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementPresentation {
    /// Identifier of the element.
    pub id: ElementId,
    /// Label drawn next to the element.
    pub label: String,
    /// Variant of the element.
    pub kind: ElementKind,
    /// Screen-space bounds.
    pub bounds: Bounds,
    /// Fill color.
    pub color: Color,
}

/// Pipe endpoint drawn in the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EndpointPresentation {
    /// Identifier of the endpoint.
    pub id: EndpointId,
    /// Screen-space bounds.
    pub bounds: Bounds,
    /// Fill color.
    pub color: Color,
    /// Whether the endpoint is attached to an element.
    pub connected: bool,
}

/// Player marker drawn in the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerPresentation {
    /// Identifier of the player.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Screen-space position of the marker.
    pub position: Vec2,
    /// Marker color.
    pub color: Color,
    /// Whether the player owns the running turn.
    pub active: bool,
}

/// Heads-up display shown above the network.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hud {
    /// Name of the player owning the running turn.
    pub player: Option<String>,
    /// Team of the player owning the running turn.
    pub role: Option<Role>,
    /// Whether the active player carries a pump.
    pub holds_pump: bool,
    /// Whether the active player carries a pipe end.
    pub holds_endpoint: bool,
    /// Time left in the running turn.
    pub remaining: Duration,
    /// Scores of both teams.
    pub scores: Scores,
}

impl Hud {
    /// Builds the HUD from the active player's snapshot.
    #[must_use]
    pub fn new(active: Option<&PlayerSnapshot>, remaining: Duration, scores: Scores) -> Self {
        Self {
            player: active.map(|player| player.name.clone()),
            role: active.map(|player| player.role),
            holds_pump: active.is_some_and(|player| player.holds_pump),
            holds_endpoint: active.is_some_and(|player| player.holds_endpoint),
            remaining,
            scores,
        }
    }

    /// Line describing whose turn it is and what they carry.
    #[must_use]
    pub fn status_line(&self) -> String {
        let Some(player) = &self.player else {
            return String::from("Waiting for the game to start");
        };
        format!(
            "Player: {player}'s turn | Team: {} | Has a picked up pump: {} | Has a picked up end of pipe: {}",
            team_name(self.role),
            yes_no(self.holds_pump),
            yes_no(self.holds_endpoint),
        )
    }

    /// Lines showing both team scores.
    #[must_use]
    pub fn score_lines(&self) -> [String; 2] {
        [
            format!("Team Plumbers: {}", self.scores.collected),
            format!("Team Saboteurs: {}", self.scores.leaked),
        ]
    }

    /// Remaining turn time as `mm:ss`, rounded up to whole seconds.
    #[must_use]
    pub fn timer_text(&self) -> String {
        let seconds = self.remaining.as_millis().div_ceil(1000);
        format!("{:02}:{:02}", seconds / 60, seconds % 60)
    }
}

fn team_name(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Plumber) => "Plumbers",
        Some(Role::Saboteur) => "Saboteurs",
        None => "None",
    }
}

const fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Key bindings shown to players of `role`, as `(key, description)` pairs.
#[must_use]
pub fn key_legend(role: Role) -> Vec<(char, &'static str)> {
    let mut legend = vec![
        ('Q', "Move to an element"),
        ('A', "Change the input pipe of a pump"),
        ('S', "Change the output pipe of a pump"),
        (PASS_KEY, "Pass turn"),
    ];
    match role {
        Role::Saboteur => legend.push(('P', "Puncture a pipe")),
        Role::Plumber => legend.extend([
            ('D', "Pick up a pump"),
            ('I', "Insert pump"),
            ('F', "Fix a broken pump"),
            ('O', "Fix a broken pipe"),
            ('R', "Pick up end of pipe"),
            ('T', "Insert end of pipe"),
        ]),
    }
    legend
}

/// Scene description combining the network, its players and the HUD.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Visible elements in registry order.
    pub elements: Vec<ElementPresentation>,
    /// Visible endpoints in registry order, drawn above the elements.
    pub endpoints: Vec<EndpointPresentation>,
    /// Player markers in turn order.
    pub players: Vec<PlayerPresentation>,
    /// Outline of the selected entity, when it is visible.
    pub highlight: Option<Bounds>,
    /// Heads-up display.
    pub hud: Hud,
}

impl Scene {
    /// Builds a scene from world snapshots.
    #[must_use]
    pub fn from_snapshots(
        view: &NetworkView,
        players: &[PlayerSnapshot],
        active: Option<PlayerId>,
        selection: Selection,
        hud: Hud,
        palette: &Palette,
    ) -> Self {
        let elements = view
            .elements()
            .iter()
            .filter(|element| element.visible)
            .map(|element| ElementPresentation {
                id: element.id,
                label: element.name.clone(),
                kind: element.kind,
                bounds: Bounds::from_rect(element.bounds),
                color: palette.element(element.kind, element.working),
            })
            .collect();
        let endpoints = view
            .endpoints()
            .iter()
            .filter(|endpoint| endpoint.visible)
            .map(|endpoint| EndpointPresentation {
                id: endpoint.id,
                bounds: Bounds::from_rect(endpoint.bounds),
                color: palette.endpoint,
                connected: endpoint.connected.is_some(),
            })
            .collect();
        let players = players
            .iter()
            .map(|player| PlayerPresentation {
                id: player.id,
                name: player.name.clone(),
                position: point_to_vec2(player.position),
                color: palette.player(player.role),
                active: active == Some(player.id),
            })
            .collect();

        Self {
            elements,
            endpoints,
            players,
            highlight: highlight_for(view, selection),
            hud,
        }
    }
}

fn highlight_for(view: &NetworkView, selection: Selection) -> Option<Bounds> {
    if let Some(endpoint) = selection.endpoint {
        return view
            .endpoints()
            .iter()
            .find(|entry| entry.id == endpoint && entry.visible)
            .map(|entry| Bounds::from_rect(entry.bounds));
    }
    let element = view.element(selection.element?)?;
    element.visible.then(|| Bounds::from_rect(element.bounds))
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window or terminal header.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct FrameInput {
    /// Key pressed on this frame, already latched to a single press.
    pub key: Option<char>,
    /// Pointer click on this frame, in presentation units.
    pub click: Option<Vec2>,
}

/// Rendering backend capable of presenting Waterworks scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until its input is exhausted or it is asked
    /// to exit.
    ///
    /// The provided `update_scene` closure receives the simulated frame delta
    /// and per-frame input captured by the adapter, and refreshes the scene
    /// before it is presented. An error returned by the closure stops the
    /// backend and is propagated to the caller.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> AnyResult<()>;
}
