//! Bevy plugin wiring the transformer into an app.

use bevy::prelude::*;

use super::events::{GizmoStateChangedMessage, SelectionChangedMessage};
use super::resources::{NodeIndex, PointerInput, TransformerCommandQueue, TransformerState};
use super::systems;

/// Registers transformer resources, messages and systems.
///
/// The host inserts a [`TransformerState`] for the local pawn; until then
/// the transformer systems do not run. Input arrives through
/// [`PointerInput`] and the [`TransformerCommandQueue`].
#[derive(Default)]
pub struct TransformerPlugin {
    pub command_queue: Option<TransformerCommandQueue>,
}

impl Plugin for TransformerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<NodeIndex>()
            .init_resource::<PointerInput>()
            .insert_resource(self.command_queue.clone().unwrap_or_default());

        app.add_message::<SelectionChangedMessage>()
            .add_message::<GizmoStateChangedMessage>();

        app.add_systems(
            Update,
            (
                systems::begin_play,
                systems::run_transformer.run_if(resource_exists::<TransformerState>),
            )
                .chain(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bevy::resources::TransformerCommand;
    use crate::bevy::test_utils::TestApp;
    use transformer_proto::{Body, Multicast, TraceFilter, TransformationDomain};

    #[test]
    fn test_trace_command_selects_and_broadcasts() {
        let mut app = TestApp::new();
        let a = app.scene().spawn_object(Transform::default());

        app.point_down(0.0, 0.0);
        app.push(TransformerCommand::Trace {
            filter: TraceFilter::default(),
            append: false,
        });
        app.update();

        assert_eq!(app.selected(), vec![a]);
        let seen = app.seen_selection();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].node, a);
        assert!(seen[0].selected);

        let bodies: Vec<Body> = app
            .hub
            .receive(app.observer)
            .expect("observer inbox")
            .into_iter()
            .map(|e| e.body)
            .collect();
        assert_eq!(
            bodies,
            vec![
                Body::Multicast(Multicast::SetDomain(TransformationDomain::None)),
                Body::Multicast(Multicast::SetSelection(vec![a])),
            ]
        );
    }

    #[test]
    fn test_drag_moves_entity_and_finish_clears_domain() {
        let mut app = TestApp::new();
        let a = app.scene().spawn_object(Transform::default());
        let trace = TransformerCommand::Trace {
            filter: TraceFilter::default(),
            append: false,
        };

        app.point_down(0.0, 0.0);
        app.push(trace.clone());
        app.update();

        // x axis handle once the gizmo is scaled for a camera 100 units away
        app.point_down(4.0, 0.0);
        app.push(trace);
        app.update();
        assert_eq!(app.state().transformer.controller().domain(), TransformationDomain::XAxis);

        app.point_down(14.0, 0.0);
        app.update();
        let moved = app.local_translation(a).expect("entity");
        assert!(moved.abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-3));

        app.push(TransformerCommand::FinishTransform);
        app.update();
        assert!(app.state().transformer.controller().domain().is_none());
        assert_eq!(app.local_translation(a), Some(moved));
    }

    #[test]
    fn test_systems_idle_without_state() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(TransformerPlugin::default());
        app.world()
            .resource::<TransformerCommandQueue>()
            .push(TransformerCommand::ClearDomain);
        app.update();
        assert_eq!(app.world().resource::<TransformerCommandQueue>().len(), 1);
    }

    #[test]
    fn test_shared_command_queue() {
        let queue = TransformerCommandQueue::new();
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(TransformerPlugin {
            command_queue: Some(queue.clone()),
        });
        queue.push(TransformerCommand::ClearDomain);
        assert_eq!(app.world().resource::<TransformerCommandQueue>().len(), 1);
        app.update();
        assert!(!queue.is_empty());
    }
}
