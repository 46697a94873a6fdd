//! Authority/remote replication for a [`TransformController`].
//!
//! Every peer holds one [`NetworkedTransformer`] per pawn. The peer that
//! controls a pawn manipulates locally and reports to the authority; the
//! authority executes requests and broadcasts the outcome to all peers.
//! Gestures are streamed as one accumulated delta when they finish.

mod loopback;
mod poll;
mod transport;

pub use loopback::{LoopbackHub, LoopbackTransport};
pub use poll::PollTimer;
pub use transport::{RecordingTransport, Transport};

use bevy::prelude::*;
use transformer_proto::{
    Body, Envelope, Multicast, NodeId, ServerRequest, SpaceType, TraceChannel, TraceFilter, TraceRequest,
    TransformationDomain, TransformationType,
};

use crate::controller::{TransformController, ViewSource};
use crate::math::{self, RaySegment};
use crate::scene::SceneGraph;
use poll::ClonePoll;

/// Gesture deltas below this are treated as no motion.
const SETTLE_EPSILON: f32 = 1.0e-5;

/// Which side of the replication a peer is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Authority,
    Remote,
}

#[derive(Debug, Clone)]
pub struct NetworkedTransformer {
    controller: TransformController,
    role: Role,
    locally_controlled: bool,
    /// Unsnapped delta of the current gesture.
    network_delta: Transform,
    /// What the gesture actually applied locally after snapping.
    gesture_applied: Transform,
    clone_poll: Option<ClonePoll>,
    resync_pending: bool,
    resync_timer: Option<PollTimer>,
}

impl NetworkedTransformer {
    pub fn new(controller: TransformController, role: Role, locally_controlled: bool) -> Self {
        Self {
            controller,
            role,
            locally_controlled,
            network_delta: math::zero_delta(),
            gesture_applied: math::zero_delta(),
            clone_poll: None,
            resync_pending: false,
            resync_timer: None,
        }
    }

    pub fn controller(&self) -> &TransformController {
        &self.controller
    }

    /// Direct access for local-only operations that are never replicated.
    pub fn controller_mut(&mut self) -> &mut TransformController {
        &mut self.controller
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_locally_controlled(&self) -> bool {
        self.locally_controlled
    }

    pub fn selected(&self) -> &[NodeId] {
        self.controller.selected()
    }

    pub fn network_delta(&self) -> &Transform {
        &self.network_delta
    }

    pub fn is_resync_pending(&self) -> bool {
        self.resync_pending
    }

    pub fn is_waiting_for_clones(&self) -> bool {
        self.clone_poll.is_some()
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// Run `request` on the authority: directly if we are it, through `transport` otherwise.
    fn request(&mut self, scene: &mut dyn SceneGraph, transport: &mut dyn Transport, request: ServerRequest) {
        match self.role {
            Role::Authority => self.handle_request(scene, transport, request),
            Role::Remote => transport.send_request(self.controller.pawn(), request),
        }
    }

    /// Apply `message` here and send it to every remote peer.
    fn multicast(&mut self, scene: &mut dyn SceneGraph, transport: &mut dyn Transport, message: Multicast) {
        self.handle_multicast(scene, message.clone());
        transport.multicast(self.controller.pawn(), message);
    }

    fn broadcast_trace_result(&mut self, scene: &mut dyn SceneGraph, transport: &mut dyn Transport) {
        let domain = self.controller.domain();
        let selection = self.controller.selected().to_vec();
        self.multicast(scene, transport, Multicast::SetDomain(domain));
        self.multicast(scene, transport, Multicast::SetSelection(selection));
    }

    /// Trace locally, then let the authority confirm the outcome.
    ///
    /// A remote that misses without `append` clears its selection at once
    /// and asks the authority to do the same.
    pub fn replicated_trace(
        &mut self,
        scene: &mut dyn SceneGraph,
        transport: &mut dyn Transport,
        ray: &RaySegment,
        filter: &TraceFilter,
        append: bool,
    ) -> bool {
        let success = self.controller.trace(scene, ray, filter, &[], append);
        match self.role {
            Role::Authority => {
                if !success && !append {
                    self.controller.deselect_all(scene, false);
                }
                self.broadcast_trace_result(scene, transport);
            }
            Role::Remote => {
                let pawn = self.controller.pawn();
                if !success && !append {
                    self.controller.deselect_all(scene, false);
                    transport.send_request(pawn, ServerRequest::DeselectAll { destroy: false });
                } else if self.controller.domain().is_none() {
                    let request = TraceRequest {
                        start: ray.start.to_array(),
                        end: ray.end.to_array(),
                        filter: filter.clone(),
                        append,
                    };
                    transport.send_request(pawn, ServerRequest::Trace(request));
                } else {
                    transport.send_request(pawn, ServerRequest::SetDomain(self.controller.domain()));
                }
            }
        }
        success
    }

    pub fn replicated_mouse_trace(
        &mut self,
        scene: &mut dyn SceneGraph,
        transport: &mut dyn Transport,
        view: &dyn ViewSource,
        filter: &TraceFilter,
        append: bool,
    ) -> bool {
        let Some(ray) = self.controller.pointer_segment(view) else {
            return false;
        };
        self.replicated_trace(scene, transport, &ray, filter, append)
    }

    pub fn replicated_mouse_trace_by_object_types(
        &mut self,
        scene: &mut dyn SceneGraph,
        transport: &mut dyn Transport,
        view: &dyn ViewSource,
        channels: Vec<TraceChannel>,
        append: bool,
    ) -> bool {
        let filter = TraceFilter::ObjectTypes(channels);
        self.replicated_mouse_trace(scene, transport, view, &filter, append)
    }

    /// Trace by channel. Returns whether the trace succeeded.
    pub fn replicated_mouse_trace_by_channel(
        &mut self,
        scene: &mut dyn SceneGraph,
        transport: &mut dyn Transport,
        view: &dyn ViewSource,
        channel: TraceChannel,
        append: bool,
    ) -> bool {
        let filter = TraceFilter::Channel(channel);
        self.replicated_mouse_trace(scene, transport, view, &filter, append)
    }

    pub fn replicated_mouse_trace_by_profile(
        &mut self,
        scene: &mut dyn SceneGraph,
        transport: &mut dyn Transport,
        view: &dyn ViewSource,
        profile: &str,
        append: bool,
    ) -> bool {
        let filter = TraceFilter::Profile(profile.to_string());
        self.replicated_mouse_trace(scene, transport, view, &filter, append)
    }

    pub fn server_set_domain(&mut self, scene: &mut dyn SceneGraph, transport: &mut dyn Transport, domain: TransformationDomain) {
        self.request(scene, transport, ServerRequest::SetDomain(domain));
    }

    pub fn server_clear_domain(&mut self, scene: &mut dyn SceneGraph, transport: &mut dyn Transport) {
        self.request(scene, transport, ServerRequest::ClearDomain);
    }

    pub fn server_deselect_all(&mut self, scene: &mut dyn SceneGraph, transport: &mut dyn Transport, destroy: bool) {
        self.request(scene, transport, ServerRequest::DeselectAll { destroy });
    }

    pub fn server_set_space_type(&mut self, scene: &mut dyn SceneGraph, transport: &mut dyn Transport, space: SpaceType) {
        self.request(scene, transport, ServerRequest::SetSpaceType(space));
    }

    pub fn server_set_transformation_type(
        &mut self,
        scene: &mut dyn SceneGraph,
        transport: &mut dyn Transport,
        kind: TransformationType,
    ) {
        self.request(scene, transport, ServerRequest::SetTransformationType(kind));
    }

    pub fn server_set_part_based(&mut self, scene: &mut dyn SceneGraph, transport: &mut dyn Transport, part_based: bool) {
        self.request(scene, transport, ServerRequest::SetPartBased(part_based));
    }

    pub fn server_set_rotate_on_local_axis(
        &mut self,
        scene: &mut dyn SceneGraph,
        transport: &mut dyn Transport,
        local: bool,
    ) {
        self.request(scene, transport, ServerRequest::SetRotateOnLocalAxis(local));
    }

    pub fn server_clone_selected(
        &mut self,
        scene: &mut dyn SceneGraph,
        transport: &mut dyn Transport,
        select_new_clones: bool,
        append: bool,
    ) {
        self.request(
            scene,
            transport,
            ServerRequest::CloneSelected {
                select_new_clones,
                append,
            },
        );
    }

    pub fn server_sync_selection(&mut self, scene: &mut dyn SceneGraph, transport: &mut dyn Transport) {
        self.request(scene, transport, ServerRequest::SyncSelection);
    }

    /// End the gesture and send its accumulated delta.
    ///
    /// Snapping is settled first: the local targets are corrected to where a
    /// fresh quantization of the whole delta puts them, which is also where
    /// every receiver puts them.
    pub fn finish_transform(&mut self, scene: &mut dyn SceneGraph, transport: &mut dyn Transport) {
        let moved = !math::is_zero_delta(&self.network_delta, SETTLE_EPSILON);
        if moved {
            let settled = self.controller.quantize_gesture(&self.network_delta);
            let correction = Transform {
                translation: settled.translation - self.gesture_applied.translation,
                rotation: (settled.rotation * self.gesture_applied.rotation.inverse()).normalize(),
                scale: settled.scale - self.gesture_applied.scale,
            };
            if !math::is_zero_delta(&correction, SETTLE_EPSILON) {
                self.controller.apply_delta_transform(scene, &correction);
            }
        }
        // Leave the domain here and now; the authority's echo then changes nothing.
        self.controller.clear_domain();
        let delta = self.network_delta;
        self.reset_gesture();

        if moved {
            self.request(scene, transport, ServerRequest::ApplyTransform(math::to_wire(&delta)));
        }
        self.request(scene, transport, ServerRequest::ClearDomain);
    }

    fn reset_gesture(&mut self) {
        self.network_delta = math::zero_delta();
        self.gesture_applied = math::zero_delta();
    }

    /// Per-frame update: manipulate, then run the clone and resync timers.
    pub fn tick(&mut self, scene: &mut dyn SceneGraph, transport: &mut dyn Transport, view: &dyn ViewSource, dt: f32) {
        if self.locally_controlled {
            if let Some(step) = self.controller.tick(scene, view) {
                self.network_delta = math::accumulate_delta(&self.network_delta, &step.raw);
                self.gesture_applied = math::accumulate_delta(&self.gesture_applied, &step.applied);
            }
        } else {
            self.controller.refresh(scene, view.camera());
        }

        let clones_ready = match self.clone_poll.as_mut() {
            Some(poll) => poll.poll(scene, dt),
            None => false,
        };
        if clones_ready {
            self.clone_poll = None;
            tracing::debug!(pawn = %self.controller.pawn(), "[net] clones replicated, broadcasting selection");
            let selection = self.controller.selected().to_vec();
            self.multicast(scene, transport, Multicast::SetSelection(selection));
        }

        let resync_due = self.resync_timer.as_mut().is_some_and(|timer| timer.advance(dt));
        if resync_due {
            if self.resync_pending {
                self.server_sync_selection(scene, transport);
            } else {
                self.resync_timer = None;
            }
        }
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Dispatch a received envelope. Returns false if it was not for this pawn or role.
    pub fn receive(&mut self, scene: &mut dyn SceneGraph, transport: &mut dyn Transport, envelope: Envelope) -> bool {
        if envelope.pawn != self.controller.pawn() {
            return false;
        }
        match (envelope.body, self.role) {
            (Body::Request(request), Role::Authority) => {
                self.handle_request(scene, transport, request);
                true
            }
            (Body::Multicast(message), Role::Remote) => {
                self.handle_multicast(scene, message);
                true
            }
            (body, role) => {
                tracing::warn!(?role, sender = %envelope.sender, "[net] ignoring misrouted {body:?}");
                false
            }
        }
    }

    /// Execute a request on the authority. Requests are always accepted.
    pub fn handle_request(&mut self, scene: &mut dyn SceneGraph, transport: &mut dyn Transport, request: ServerRequest) {
        if self.role != Role::Authority {
            tracing::warn!("[net] only the authority executes requests");
            return;
        }
        tracing::trace!(pawn = %self.controller.pawn(), "[net] request {request:?}");
        match request {
            ServerRequest::Trace(trace) => {
                let ray = RaySegment::new(Vec3::from_array(trace.start), Vec3::from_array(trace.end));
                // Someone else's gizmo only exists on their screen.
                let use_gizmo = self.locally_controlled;
                let success = self
                    .controller
                    .trace_with(scene, &ray, &trace.filter, &[], trace.append, use_gizmo);
                if !success && !trace.append {
                    self.controller.deselect_all(scene, false);
                }
                self.broadcast_trace_result(scene, transport);
            }
            ServerRequest::SetDomain(domain) => self.multicast(scene, transport, Multicast::SetDomain(domain)),
            ServerRequest::ClearDomain => self.multicast(scene, transport, Multicast::ClearDomain),
            ServerRequest::ApplyTransform(wire) => self.multicast(scene, transport, Multicast::ApplyTransform(wire)),
            ServerRequest::DeselectAll { destroy } => {
                self.multicast(scene, transport, Multicast::DeselectAll { destroy });
            }
            ServerRequest::SetSpaceType(space) => self.multicast(scene, transport, Multicast::SetSpaceType(space)),
            ServerRequest::SetTransformationType(kind) => {
                self.multicast(scene, transport, Multicast::SetTransformationType(kind));
            }
            ServerRequest::SetPartBased(part_based) => {
                self.multicast(scene, transport, Multicast::SetPartBased(part_based));
            }
            ServerRequest::SetRotateOnLocalAxis(local) => {
                self.multicast(scene, transport, Multicast::SetRotateOnLocalAxis(local));
            }
            ServerRequest::CloneSelected {
                select_new_clones,
                append,
            } => self.clone_on_authority(scene, select_new_clones, append),
            ServerRequest::SyncSelection => {
                let selection = self.controller.selected().to_vec();
                self.multicast(scene, transport, Multicast::SetSelection(selection));
            }
        }
    }

    fn clone_on_authority(&mut self, scene: &mut dyn SceneGraph, select_new_clones: bool, append: bool) {
        if self.controller.part_based() {
            tracing::warn!("[net] part cloning is not replicated, request ignored");
            return;
        }
        let clones = self.controller.clone_selected(scene, select_new_clones, append);
        if select_new_clones && !clones.is_empty() {
            let timing = self.controller.config().clone_replication;
            self.clone_poll = Some(ClonePoll::new(clones, timing.check_frequency, timing.minimum_time));
        }
    }

    /// Apply an authority broadcast on this peer.
    pub fn handle_multicast(&mut self, scene: &mut dyn SceneGraph, message: Multicast) {
        match message {
            Multicast::SetDomain(domain) => self.controller.set_domain(domain),
            Multicast::ClearDomain => self.controller.clear_domain(),
            Multicast::ApplyTransform(wire) => {
                // The controlling peer already moved its targets.
                if !self.locally_controlled {
                    let delta = math::from_wire(&wire);
                    let settled = self.controller.quantize_gesture(&delta);
                    self.controller.apply_delta_transform(scene, &settled);
                }
            }
            Multicast::DeselectAll { destroy } => {
                self.controller.deselect_all(scene, destroy);
            }
            Multicast::SetSpaceType(space) => self.controller.set_space_type(scene, space),
            Multicast::SetTransformationType(kind) => {
                if kind != self.controller.transformation() {
                    self.reset_gesture();
                }
                self.controller.set_transformation_type(scene, kind);
            }
            Multicast::SetPartBased(part_based) => self.controller.set_part_based(scene, part_based),
            Multicast::SetRotateOnLocalAxis(local) => self.controller.set_rotate_on_local_axis(local),
            Multicast::SetSelection(nodes) => self.apply_selection(scene, &nodes),
        }
    }

    fn apply_selection(&mut self, scene: &mut dyn SceneGraph, nodes: &[NodeId]) {
        if self.controller.selected() != nodes {
            self.controller.deselect_all(scene, false);
            self.controller.select_multiple(scene, nodes, true);
        }

        self.resync_pending = self.controller.selected().len() != nodes.len();
        if self.resync_pending {
            tracing::debug!(
                expected = nodes.len(),
                selected = self.controller.selected().len(),
                "[net] selection incomplete, scheduling resync"
            );
            if self.resync_timer.is_none() {
                self.resync_timer = Some(PollTimer::new(self.controller.config().resync_interval));
            }
        }
        self.controller.log_selection(scene);
    }
}
