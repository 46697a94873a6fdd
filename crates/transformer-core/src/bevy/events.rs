//! Messages emitted by the transformer systems.

use bevy::prelude::*;
use transformer_proto::{NodeId, TransformationDomain, TransformationType};

use crate::gizmo::GizmoStateChange;
use crate::selection::SelectionChange;

/// A node entered or left the selection.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct SelectionChangedMessage {
    pub node: NodeId,
    pub selected: bool,
    /// The node's focus hook handled the change itself.
    pub self_managed_focus: bool,
}

impl From<SelectionChange> for SelectionChangedMessage {
    fn from(change: SelectionChange) -> Self {
        Self {
            node: change.node,
            selected: change.selected,
            self_managed_focus: change.self_managed_focus,
        }
    }
}

/// The gizmo started or stopped a gesture.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct GizmoStateChangedMessage {
    pub kind: TransformationType,
    pub in_progress: bool,
    pub domain: TransformationDomain,
}

impl From<GizmoStateChange> for GizmoStateChangedMessage {
    fn from(change: GizmoStateChange) -> Self {
        Self {
            kind: change.kind,
            in_progress: change.in_progress,
            domain: change.domain,
        }
    }
}
