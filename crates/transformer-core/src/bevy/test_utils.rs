//! Headless app wrapper for transformer integration tests.

use bevy::prelude::*;
use transformer_proto::{NodeId, PawnId, PeerId};

use super::events::SelectionChangedMessage;
use super::plugin::TransformerPlugin;
use super::resources::{PointerInput, TransformerCommand, TransformerCommandQueue, TransformerState};
use super::scene::WorldScene;
use super::systems;
use crate::config::TransformerConfig;
use crate::controller::{CameraView, TransformController};
use crate::network::{LoopbackHub, NetworkedTransformer, Role};

#[derive(Resource, Default)]
pub(crate) struct SeenSelection(pub Vec<SelectionChangedMessage>);

fn collect_selection(mut reader: MessageReader<SelectionChangedMessage>, mut seen: ResMut<SeenSelection>) {
    seen.0.extend(reader.read().copied());
}

/// `MinimalPlugins` + [`TransformerPlugin`] driving an authority-controlled pawn.
///
/// A second peer is registered on the hub so broadcasts can be inspected.
pub(crate) struct TestApp {
    pub app: App,
    pub hub: LoopbackHub,
    pub observer: PeerId,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(TransformerConfig::default())
    }

    pub fn with_config(config: TransformerConfig) -> Self {
        crate::test_utils::init_test_tracing();
        let hub = LoopbackHub::new();
        let transport = hub.connect(PeerId::new(), Role::Authority);
        let observer = PeerId::new();
        hub.connect(observer, Role::Remote);

        let controller = TransformController::new(PawnId::new(), config);
        let transformer = NetworkedTransformer::new(controller, Role::Authority, true);

        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(TransformerPlugin::default());
        app.init_resource::<SeenSelection>();
        app.add_systems(Update, collect_selection.after(systems::run_transformer));
        app.insert_resource(TransformerState::new(transformer, transport));
        app.update();
        Self { app, hub, observer }
    }

    pub fn update(&mut self) {
        self.app.update();
    }

    pub fn scene(&mut self) -> WorldScene<'_> {
        WorldScene::new(self.app.world_mut())
    }

    pub fn push(&self, command: TransformerCommand) {
        self.app.world().resource::<TransformerCommandQueue>().push(command);
    }

    /// Point straight down at `(x, y)` from a camera 100 units above the ground plane.
    pub fn point_down(&mut self, x: f32, y: f32) {
        let location = Vec3::new(x, y, 100.0);
        *self.app.world_mut().resource_mut::<PointerInput>() = PointerInput {
            ray: Some((location, Vec3::NEG_Z)),
            camera: Some(CameraView {
                location,
                forward: Vec3::NEG_Z,
                fov_degrees: 90.0,
            }),
        };
    }

    pub fn state(&self) -> &TransformerState {
        self.app.world().resource::<TransformerState>()
    }

    pub fn selected(&self) -> Vec<NodeId> {
        self.state().transformer.selected().to_vec()
    }

    pub fn seen_selection(&self) -> &[SelectionChangedMessage] {
        &self.app.world().resource::<SeenSelection>().0
    }

    pub fn local_translation(&mut self, node: NodeId) -> Option<Vec3> {
        let entity = self.scene().entity(node)?;
        self.app.world().get::<Transform>(entity).map(|t| t.translation)
    }
}
