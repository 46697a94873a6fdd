//! Request and broadcast messages.
//!
//! A remote peer never mutates shared state directly: it sends a
//! [`ServerRequest`] for its pawn to the authority, which executes it and
//! answers every peer (itself included) with a [`Multicast`].

use serde::{Deserialize, Serialize};

use crate::types::{
    NodeId, PawnId, PeerId, SpaceType, TraceFilter, TransformationDomain, TransformationType,
    WireTransform,
};

/// Ray endpoints and filter for an authoritative trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRequest {
    pub start: [f32; 3],
    pub end: [f32; 3],
    pub filter: TraceFilter,
    /// Add the hit to the current selection instead of replacing it.
    pub append: bool,
}

/// Remote peer -> authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerRequest {
    /// Re-trace on the authority and broadcast the resulting domain/selection.
    Trace(TraceRequest),
    SetDomain(TransformationDomain),
    ClearDomain,
    /// Accumulated unsnapped delta of a finished gesture.
    ApplyTransform(WireTransform),
    DeselectAll {
        destroy: bool,
    },
    SetSpaceType(SpaceType),
    SetTransformationType(TransformationType),
    SetPartBased(bool),
    SetRotateOnLocalAxis(bool),
    CloneSelected {
        select_new_clones: bool,
        append: bool,
    },
    /// Ask the authority to re-broadcast its selection (resync loop).
    SyncSelection,
}

/// Authority -> all peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Multicast {
    SetDomain(TransformationDomain),
    ClearDomain,
    /// Applied only by peers that do not locally control the pawn.
    ApplyTransform(WireTransform),
    DeselectAll {
        destroy: bool,
    },
    SetSpaceType(SpaceType),
    SetTransformationType(TransformationType),
    SetPartBased(bool),
    SetRotateOnLocalAxis(bool),
    /// Full authoritative selection list, in selection order.
    SetSelection(Vec<NodeId>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Body {
    Request(ServerRequest),
    Multicast(Multicast),
}

/// A message addressed to one pawn, stamped with the peer that sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub pawn: PawnId,
    pub sender: PeerId,
    pub body: Body,
}

impl Envelope {
    pub fn request(pawn: PawnId, sender: PeerId, request: ServerRequest) -> Self {
        Self {
            pawn,
            sender,
            body: Body::Request(request),
        }
    }

    pub fn multicast(pawn: PawnId, sender: PeerId, multicast: Multicast) -> Self {
        Self {
            pawn,
            sender,
            body: Body::Multicast(multicast),
        }
    }
}
