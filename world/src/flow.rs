//! Water accounting: score totals and the end-of-round transfer.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use waterworks_core::{ElementId, EndpointId};

use crate::graph::{Cistern, Endpoint, NetworkGraph, Pipe, Variant};

/// Total water delivered to every cistern; the plumbers' score.
#[must_use]
pub fn collected_water(graph: &NetworkGraph) -> u32 {
    graph
        .elements()
        .filter_map(|(_, element)| element.as_cistern())
        .map(Cistern::collected)
        .fold(0, u32::saturating_add)
}

/// Total water lost through every pipe; the saboteurs' score.
#[must_use]
pub fn leaked_water(graph: &NetworkGraph) -> u32 {
    graph
        .elements()
        .filter_map(|(_, element)| element.as_pipe())
        .map(Pipe::leaked)
        .fold(0, u32::saturating_add)
}

/// Place where transferred water ends up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sink {
    /// Water reached a cistern.
    Cistern(ElementId),
    /// Water escaped through a pipe.
    Leak(ElementId),
}

/// Volumes credited to each sink by a single transfer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowReport {
    credits: BTreeMap<Sink, u32>,
}

impl FlowReport {
    /// Volume credited to `sink`.
    #[must_use]
    pub fn credit(&self, sink: Sink) -> u32 {
        self.credits.get(&sink).copied().unwrap_or(0)
    }

    /// Every credited sink with its volume, ordered by sink.
    pub fn credits(&self) -> impl Iterator<Item = (Sink, u32)> + '_ {
        self.credits.iter().map(|(sink, volume)| (*sink, *volume))
    }

    /// Volume delivered to cisterns.
    #[must_use]
    pub fn collected(&self) -> u32 {
        self.total(|sink| matches!(sink, Sink::Cistern(_)))
    }

    /// Volume lost through leaks.
    #[must_use]
    pub fn leaked(&self) -> u32 {
        self.total(|sink| matches!(sink, Sink::Leak(_)))
    }

    fn total(&self, keep: impl Fn(&Sink) -> bool) -> u32 {
        self.credits
            .iter()
            .filter(|(sink, _)| keep(sink))
            .map(|(_, volume)| *volume)
            .fold(0, u32::saturating_add)
    }

    fn add(&mut self, sink: Sink, volume: u32) {
        let entry = self.credits.entry(sink).or_insert(0);
        *entry = entry.saturating_add(volume);
    }
}

/// Computes where water from every working spring would go, without mutating.
///
/// Water enters each pipe connected to a spring. A broken pipe, or one whose
/// far end is missing or unattached, leaks. Otherwise the far element decides:
/// cisterns collect, springs absorb nothing, and pumps forward into their
/// output only when they work and the water arrived through their input.
/// Each pipe is crossed at most once per spring and every sink reached is
/// credited the spring's flow rate once.
#[must_use]
pub fn trace(graph: &NetworkGraph) -> FlowReport {
    let mut report = FlowReport::default();

    for (spring_id, element) in graph.elements() {
        let Some(spring) = element.as_spring() else {
            continue;
        };
        if !element.is_working() {
            continue;
        }

        let mut sinks = BTreeSet::new();
        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<(ElementId, ElementId)> = element
            .connected_pipes()
            .iter()
            .map(|pipe| (*pipe, spring_id))
            .collect();

        while let Some((pipe, from)) = queue.pop_front() {
            if !visited.insert(pipe) {
                continue;
            }
            let Some(pipe_element) = graph.element(pipe) else {
                continue;
            };
            let Some(state) = pipe_element.as_pipe() else {
                continue;
            };

            let far = far_element(graph, state.ends(), from).filter(|_| pipe_element.is_working());
            let Some(far) = far else {
                let _ = sinks.insert(Sink::Leak(pipe));
                continue;
            };
            let Some(target) = graph.element(far) else {
                continue;
            };

            match target.variant() {
                Variant::Cistern(_) => {
                    let _ = sinks.insert(Sink::Cistern(far));
                }
                Variant::Pump(pump) => {
                    if target.is_working() && pump.in_pipe() == Some(pipe) {
                        if let Some(out) = pump.out_pipe().filter(|out| *out != pipe) {
                            queue.push_back((out, far));
                        }
                    }
                }
                Variant::Spring(_) | Variant::Pipe(_) => {}
            }
        }

        for sink in sinks {
            report.add(sink, spring.flow_rate());
        }
    }

    report
}

/// Moves water through the network once and returns what was credited.
pub fn transfer_water(graph: &mut NetworkGraph) -> FlowReport {
    let report = trace(graph);
    for (sink, volume) in report.credits() {
        match sink {
            Sink::Cistern(id) => {
                if let Some(cistern) = graph.element_mut(id).and_then(|e| e.as_cistern_mut()) {
                    cistern.add_collected(volume);
                }
            }
            Sink::Leak(id) => {
                if let Some(pipe) = graph.element_mut(id).and_then(|e| e.as_pipe_mut()) {
                    pipe.add_leaked(volume);
                }
            }
        }
    }
    report
}

fn far_element(
    graph: &NetworkGraph,
    ends: [Option<EndpointId>; 2],
    from: ElementId,
) -> Option<ElementId> {
    let attached_to = |slot: Option<EndpointId>| {
        slot.and_then(|id| graph.endpoint(id))
            .and_then(Endpoint::connected)
    };
    let near = ends.iter().position(|slot| attached_to(*slot) == Some(from))?;
    attached_to(ends[1 - near])
}
