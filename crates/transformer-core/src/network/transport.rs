//! Outbound message seam.

use transformer_proto::{Multicast, PawnId, ServerRequest};

/// Delivers replication traffic for pawns.
///
/// Messages from one peer must arrive in the order they were sent.
pub trait Transport {
    /// Send a request to the authority.
    fn send_request(&mut self, pawn: PawnId, request: ServerRequest);

    /// Broadcast to every remote peer. The authority applies its own copy itself.
    fn multicast(&mut self, pawn: PawnId, message: Multicast);
}

/// Transport that records everything it is asked to send.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    pub requests: Vec<(PawnId, ServerRequest)>,
    pub multicasts: Vec<(PawnId, Multicast)>,
}

impl Transport for RecordingTransport {
    fn send_request(&mut self, pawn: PawnId, request: ServerRequest) {
        self.requests.push((pawn, request));
    }

    fn multicast(&mut self, pawn: PawnId, message: Multicast) {
        self.multicasts.push((pawn, message));
    }
}
