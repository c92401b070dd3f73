use proptest::prelude::*;
use waterworks_core::{
    Action, Command, ElementId, ElementKind, Event, Orientation, PlayerId, PlumberAction, Point,
    Role, SaboteurAction, Selection, Size, TurnEndReason,
};
use waterworks_world::{
    self as world,
    graph::{Element, NetworkGraph},
    query, splice, PlayerSetup, World, WorldConfig,
};

const PLUMBER: PlayerId = PlayerId::new(0);
const SABOTEUR: PlayerId = PlayerId::new(1);

struct Network {
    graph: NetworkGraph,
    cistern: ElementId,
    pipe: ElementId,
    spring: ElementId,
}

/// Cistern `C` on slot 0 and spring `S` on slot 1 of the vertical pipe `P`.
fn cistern_pipe_spring(height: i32, leaked: u32) -> Network {
    let mut graph = NetworkGraph::new();
    let cistern = graph.add_element(Element::cistern(
        "C",
        Point::new(80, 0),
        Size::new(60, 60),
    ));
    let pipe = graph.add_element(
        Element::pipe(
            "P",
            Point::new(100, 100),
            Size::new(20, height),
            Orientation::Vertical,
        )
        .with_leaked(leaked),
    );
    let spring = graph.add_element(Element::spring(
        "S",
        Point::new(80, 140 + height),
        Size::new(60, 60),
        1,
    ));
    let to_cistern = graph.add_endpoint(pipe, true).expect("slot 0");
    let to_spring = graph.add_endpoint(pipe, false).expect("slot 1");
    graph.connect(to_cistern, cistern).expect("connect cistern");
    graph.connect(to_spring, spring).expect("connect spring");
    Network {
        graph,
        cistern,
        pipe,
        spring,
    }
}

fn apply_all(world: &mut World, commands: &[Command]) -> Vec<Event> {
    let mut log = Vec::new();
    for command in commands {
        let mut events = Vec::new();
        world::apply(world, *command, &mut events).expect("network stays consistent");
        log.extend(events);
    }
    log
}

fn plumber(action: PlumberAction, selection: Selection) -> Command {
    Command::Perform {
        player: PLUMBER,
        action: Action::Plumber(action),
        selection,
    }
}

fn saboteur(action: SaboteurAction, selection: Selection) -> Command {
    Command::Perform {
        player: SABOTEUR,
        action: Action::Saboteur(action),
        selection,
    }
}

fn pass(player: PlayerId) -> Command {
    Command::EndTurn {
        player,
        reason: TurnEndReason::Passed,
    }
}

#[test]
fn inserting_a_pump_splits_the_pipe_between_cistern_and_spring() {
    let Network {
        graph,
        cistern,
        pipe,
        spring,
    } = cistern_pipe_spring(120, 10);
    let roster = vec![
        PlayerSetup::new("Mario", Role::Plumber, cistern),
        PlayerSetup::new("Wario", Role::Saboteur, spring),
    ];
    let mut world = World::new(WorldConfig::new(1, 0, 1), graph, roster).expect("world");

    let _ = apply_all(
        &mut world,
        &[
            Command::StartGame,
            pass(PLUMBER),
            pass(SABOTEUR),
            plumber(PlumberAction::PickUpPump, Selection::none()),
            plumber(PlumberAction::Move, Selection::element(pipe)),
        ],
    );
    assert!(query::players(&world)[0].holds_pump, "plumber holds a pump");
    let leaked_before = query::leaked_water(&world);

    let events = apply_all(
        &mut world,
        &[plumber(PlumberAction::InsertPump, Selection::none())],
    );

    let Some(&Event::PumpInserted {
        replaced,
        pump,
        pipes: [first, second],
        ..
    }) = events.first()
    else {
        panic!("expected a pump insertion, got {events:?}");
    };
    assert_eq!(replaced, pipe);

    let network = query::network(&world);
    assert!(network.element(pipe).is_none(), "P is gone from storage");
    assert!(!network.element_ids().contains(&pipe), "P is gone from the registry");
    assert!(network
        .endpoint_ids()
        .iter()
        .all(|id| network.endpoint(*id).and_then(|e| e.pipe()) != Some(pipe)));

    assert_eq!(network.pipe(first).expect("first").leaked(), 5);
    assert_eq!(network.pipe(second).expect("second").leaked(), 5);
    assert_eq!(query::leaked_water(&world), leaked_before);

    let pump_state = network.pump(pump).expect("pump");
    assert_eq!(pump_state.in_pipe(), None);
    assert_eq!(pump_state.out_pipe(), None);

    assert_eq!(
        network.element(cistern).expect("C").connected_pipes(),
        &[first]
    );
    assert_eq!(
        network.element(spring).expect("S").connected_pipes(),
        &[second]
    );
    assert_eq!(
        query::players(&world)[0].current_element,
        Some(pump),
        "the plumber ends up on the new pump"
    );
    assert!(!query::players(&world)[0].holds_pump);
    assert!(world.verify().is_ok());
}

#[test]
fn directed_pump_delivers_water_after_the_round() {
    let Network {
        mut graph,
        cistern,
        pipe,
        ..
    } = cistern_pipe_spring(200, 0);
    let insertion = splice::insert_pump(&mut graph, pipe, "pump").expect("split");
    let [toward_cistern, toward_spring] = insertion.pipes;
    let roster = vec![
        PlayerSetup::new("Mario", Role::Plumber, insertion.pump),
        PlayerSetup::new("Wario", Role::Saboteur, cistern),
    ];
    let mut world = World::new(WorldConfig::new(1, 0, 0), graph, roster).expect("world");

    let events = apply_all(
        &mut world,
        &[
            Command::StartGame,
            plumber(
                PlumberAction::ChangeInputPipe,
                Selection::element(toward_spring),
            ),
            plumber(
                PlumberAction::ChangeOutputPipe,
                Selection::element(toward_spring),
            ),
            plumber(
                PlumberAction::ChangeOutputPipe,
                Selection::element(toward_cistern),
            ),
            pass(PLUMBER),
            pass(SABOTEUR),
        ],
    );

    assert!(events.contains(&Event::ActionRejected {
        player: PLUMBER,
        action: Action::Plumber(PlumberAction::ChangeOutputPipe),
        reason: waterworks_core::ActionError::SameInputAndOutput,
    }));
    assert!(events.contains(&Event::WaterTransferred {
        collected: 1,
        leaked: 0,
    }));
    assert_eq!(query::scores(&world).collected, 1);
}

#[test]
fn punctured_pipe_scores_for_the_saboteur() {
    let Network {
        graph,
        cistern,
        pipe,
        ..
    } = cistern_pipe_spring(200, 0);
    let roster = vec![
        PlayerSetup::new("Mario", Role::Plumber, cistern),
        PlayerSetup::new("Wario", Role::Saboteur, pipe),
    ];
    let mut world = World::new(WorldConfig::new(1, 0, 0), graph, roster).expect("world");

    let events = apply_all(
        &mut world,
        &[
            Command::StartGame,
            pass(PLUMBER),
            saboteur(SaboteurAction::PuncturePipe, Selection::none()),
            pass(SABOTEUR),
        ],
    );

    assert!(events.contains(&Event::PipePunctured {
        player: SABOTEUR,
        pipe,
    }));
    assert_eq!(query::leaked_water(&world), 1);
    assert_eq!(query::collected_water(&world), 0);

    let repair = apply_all(
        &mut world,
        &[plumber(PlumberAction::Move, Selection::element(pipe))],
    );
    assert_eq!(
        repair.first(),
        Some(&Event::ActionRejected {
            player: PLUMBER,
            action: Action::Plumber(PlumberAction::Move),
            reason: waterworks_core::ActionError::Occupied,
        }),
        "the saboteur still blocks the pipe"
    );
}

#[test]
fn only_one_pipe_end_can_be_carried_at_a_time() {
    let Network {
        graph,
        cistern,
        pipe,
        spring,
    } = cistern_pipe_spring(200, 0);
    let roster = vec![
        PlayerSetup::new("Mario", Role::Plumber, cistern),
        PlayerSetup::new("Luigi", Role::Plumber, spring),
    ];
    let mut world = World::new(WorldConfig::new(1, 0, 0), graph, roster).expect("world");
    let network = query::network(&world);
    let [to_cistern, to_spring] = network.pipe(pipe).expect("P").ends();
    let to_cistern = to_cistern.expect("cistern end");
    let to_spring = to_spring.expect("spring end");

    let events = apply_all(
        &mut world,
        &[
            Command::StartGame,
            plumber(
                PlumberAction::PickUpEndpoint,
                Selection::endpoint(to_cistern),
            ),
            pass(PLUMBER),
            Command::Perform {
                player: PlayerId::new(1),
                action: Action::Plumber(PlumberAction::PickUpEndpoint),
                selection: Selection::endpoint(to_spring),
            },
        ],
    );

    assert_eq!(
        events.last(),
        Some(&Event::ActionRejected {
            player: PlayerId::new(1),
            action: Action::Plumber(PlumberAction::PickUpEndpoint),
            reason: waterworks_core::ActionError::EndpointHeldElsewhere,
        })
    );

    let _ = apply_all(
        &mut world,
        &[
            pass(PlayerId::new(1)),
            plumber(PlumberAction::InsertEndpoint, Selection::none()),
        ],
    );
    let network = query::network(&world);
    assert_eq!(
        network.element(cistern).expect("C").connected_pipes(),
        &[pipe]
    );
    assert!(query::players(&world).iter().all(|p| !p.holds_endpoint));
    assert!(world.verify().is_ok());
}

#[test]
fn hit_test_prefers_endpoints_then_registry_order() {
    let Network {
        graph, pipe, ..
    } = cistern_pipe_spring(200, 0);
    let [to_cistern, _] = graph.pipe(pipe).expect("P").ends();
    let to_cistern = to_cistern.expect("cistern end");
    let bounds = graph.endpoint_bounds(to_cistern).expect("bounds");

    let near_endpoint = Point::new(bounds.origin().x + 35, bounds.origin().y + 10);
    assert_eq!(
        graph.hit_test(near_endpoint),
        Some(waterworks_core::Hit::Endpoint(to_cistern))
    );
    assert_eq!(
        graph.hit_test(Point::new(110, 200)),
        Some(waterworks_core::Hit::Element(pipe))
    );
}

#[test]
fn replay_is_deterministic() {
    fn session() -> (Vec<Event>, Vec<waterworks_core::ElementSnapshot>) {
        let Network {
            graph,
            cistern,
            pipe,
            spring,
        } = cistern_pipe_spring(200, 0);
        let roster = vec![
            PlayerSetup::new("Mario", Role::Plumber, cistern),
            PlayerSetup::new("Wario", Role::Saboteur, spring),
        ];
        let mut world =
            World::new(WorldConfig::new(99, 500, 1), graph, roster).expect("world");
        let mut commands = vec![Command::StartGame, pass(PLUMBER), pass(SABOTEUR)];
        commands.extend([
            plumber(PlumberAction::PickUpPump, Selection::none()),
            plumber(PlumberAction::Move, Selection::element(pipe)),
            plumber(PlumberAction::InsertPump, Selection::none()),
            saboteur(SaboteurAction::PuncturePipe, Selection::none()),
        ]);
        for _ in 0..5 {
            commands.push(pass(PLUMBER));
            commands.push(pass(SABOTEUR));
        }
        let events = apply_all(&mut world, &commands);
        (events, query::network_view(&world).elements().to_vec())
    }

    let first = session();
    let second = session();

    assert_eq!(first, second, "replay diverged between runs");
    assert!(first
        .1
        .iter()
        .any(|element| element.kind == ElementKind::Pump && element.visible));
}

proptest! {
    #[test]
    fn splitting_conserves_leaked_water(
        length in 52_i32..2_000,
        leaked in 0_u32..100_000,
        horizontal in any::<bool>(),
        open_end in any::<bool>(),
    ) {
        let orientation = if horizontal {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };
        let size = if horizontal {
            Size::new(length, 20)
        } else {
            Size::new(20, length)
        };
        let mut graph = NetworkGraph::new();
        let cistern = graph.add_element(Element::cistern("C", Point::new(0, 0), Size::new(60, 60)));
        let pipe = graph.add_element(
            Element::pipe("P", Point::new(100, 100), size, orientation).with_leaked(leaked),
        );
        let spring = graph.add_element(Element::spring("S", Point::new(0, 500), Size::new(60, 60), 1));
        let start = graph.add_endpoint(pipe, true).expect("start");
        graph.connect(start, cistern).expect("cistern");
        if open_end {
            graph.allow_connection(spring, pipe).expect("allow");
        } else {
            let end = graph.add_endpoint(pipe, false).expect("end");
            graph.connect(end, spring).expect("spring");
        }

        let insertion = splice::insert_pump(&mut graph, pipe, "pump").expect("split");

        let [first, second] = insertion.pipes;
        let first_leak = graph.pipe(first).expect("first").leaked();
        let second_leak = graph.pipe(second).expect("second").leaked();
        prop_assert_eq!(first_leak + second_leak, leaked);
        prop_assert!(second_leak >= first_leak && second_leak - first_leak <= 1);
        prop_assert!(graph.verify().is_ok());
        prop_assert_eq!(graph.element_ids(), &[cistern, first, insertion.pump, second, spring][..]);
        prop_assert_eq!(
            graph.element(spring).expect("S").connectable_pipes(),
            &[second][..]
        );
    }
}
