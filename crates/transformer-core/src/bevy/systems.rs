//! Systems driving the transformer inside a Bevy app.

use bevy::prelude::*;

use super::components::AwaitingPlay;
use super::events::{GizmoStateChangedMessage, SelectionChangedMessage};
use super::resources::{PointerInput, TransformerCommand, TransformerCommandQueue, TransformerState};
use super::scene::WorldScene;

impl TransformerState {
    fn apply(&mut self, scene: &mut WorldScene<'_>, view: &PointerInput, command: TransformerCommand) {
        let transport = self.transport.as_mut();
        let transformer = &mut self.transformer;
        match command {
            TransformerCommand::Trace { filter, append } => {
                transformer.replicated_mouse_trace(scene, transport, view, &filter, append);
            }
            TransformerCommand::FinishTransform => transformer.finish_transform(scene, transport),
            TransformerCommand::SetDomain(domain) => transformer.server_set_domain(scene, transport, domain),
            TransformerCommand::ClearDomain => transformer.server_clear_domain(scene, transport),
            TransformerCommand::DeselectAll { destroy } => transformer.server_deselect_all(scene, transport, destroy),
            TransformerCommand::SetSpaceType(space) => transformer.server_set_space_type(scene, transport, space),
            TransformerCommand::SetTransformationType(kind) => {
                transformer.server_set_transformation_type(scene, transport, kind);
            }
            TransformerCommand::SetPartBased(part_based) => {
                transformer.server_set_part_based(scene, transport, part_based);
            }
            TransformerCommand::SetRotateOnLocalAxis(local) => {
                transformer.server_set_rotate_on_local_axis(scene, transport, local);
            }
            TransformerCommand::CloneSelected {
                select_new_clones,
                append,
            } => transformer.server_clone_selected(scene, transport, select_new_clones, append),
            TransformerCommand::SetSnapping { kind, enabled, value } => {
                let controller = transformer.controller_mut();
                controller.set_snapping_value(kind, value);
                controller.set_snapping_enabled(kind, enabled);
            }
            TransformerCommand::Receive(envelope) => {
                transformer.receive(scene, transport, envelope);
            }
        }
    }
}

/// Drain commands, tick the transformer and publish what changed.
pub fn run_transformer(world: &mut World) {
    let commands = world.resource::<TransformerCommandQueue>().drain();
    let view = *world.resource::<PointerInput>();
    let dt = world.resource::<Time>().delta_secs();

    let (selection, gizmo) = world.resource_scope(|world, mut state: Mut<TransformerState>| {
        let mut scene = WorldScene::new(world);
        for command in commands {
            tracing::debug!("[bevy] {command:?}");
            state.apply(&mut scene, &view, command);
        }
        let state = &mut *state;
        state
            .transformer
            .tick(&mut scene, state.transport.as_mut(), &view, dt);

        let controller = state.transformer.controller_mut();
        (controller.drain_selection_events(), controller.drain_gizmo_events())
    });

    for change in selection {
        world.write_message(SelectionChangedMessage::from(change));
    }
    for change in gizmo {
        world.write_message(GizmoStateChangedMessage::from(change));
    }
}

/// Nodes spawned during a frame go live on the next one.
pub fn begin_play(mut commands: Commands, pending: Query<Entity, With<AwaitingPlay>>) {
    for entity in &pending {
        commands.entity(entity).remove::<AwaitingPlay>();
    }
}
