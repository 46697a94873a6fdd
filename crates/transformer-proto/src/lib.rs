//! Runtime Transformer wire protocol.
//!
//! Plain data shared by every peer of a manipulation session: handles for
//! scene nodes and pawns, the domain/kind/space enums, trace parameters and
//! the request/broadcast messages carried between a remote peer and the
//! authority. No engine types appear here so the same bytes can be produced
//! and consumed by any host.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod message;
pub mod types;

pub use codec::{ProtoError, decode, encode};
pub use message::{Body, Envelope, Multicast, ServerRequest, TraceRequest};
pub use types::{
    NodeId, PawnId, PeerId, SpaceType, TraceChannel, TraceFilter, TransformationDomain,
    TransformationType, WireTransform,
};
