//! Saboteur action handlers.

use waterworks_core::{ActionError, ElementKind, Event, SaboteurAction, Selection};

use crate::{
    graph::NetworkGraph,
    player::{self, Player, PumpSide},
    ActionFailure,
};

/// Executes a saboteur action and returns the event describing its effect.
pub(crate) fn perform(
    graph: &mut NetworkGraph,
    saboteur: &mut Player,
    action: SaboteurAction,
    selection: Selection,
) -> Result<Event, ActionFailure> {
    let player = saboteur.id;
    match action {
        SaboteurAction::Move => {
            let to = player::move_to(graph, saboteur, selection)?;
            Ok(Event::PlayerMoved { player, to })
        }
        SaboteurAction::PuncturePipe => {
            let pipe = saboteur
                .current
                .filter(|id| {
                    graph
                        .element(*id)
                        .is_some_and(|element| element.kind() == ElementKind::Pipe)
                })
                .ok_or(ActionError::NotOnPipe)?;
            let element = graph.element_mut(pipe).ok_or(ActionError::NotOnPipe)?;
            if !element.is_working() {
                return Err(ActionError::AlreadyBroken.into());
            }
            element.set_working(false);
            Ok(Event::PipePunctured { player, pipe })
        }
        SaboteurAction::ChangeInputPipe => {
            let (pump, pipe) =
                player::redirect_pump(graph, saboteur, selection, PumpSide::Input)?;
            Ok(Event::PumpInputChanged { pump, pipe })
        }
        SaboteurAction::ChangeOutputPipe => {
            let (pump, pipe) =
                player::redirect_pump(graph, saboteur, selection, PumpSide::Output)?;
            Ok(Event::PumpOutputChanged { pump, pipe })
        }
    }
}
