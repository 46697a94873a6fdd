//! In-process transport connecting several peers through shared inboxes.
//!
//! Every message is encoded with the wire codec on send and decoded on
//! receive, so the loopback exercises the same bytes a real link carries.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use transformer_proto::{Envelope, Multicast, PawnId, PeerId, ServerRequest};

use super::{Role, Transport};
use crate::error::TransformerError;

#[derive(Debug, Default)]
struct HubState {
    authority: Option<PeerId>,
    peers: Vec<PeerId>,
    inboxes: HashMap<PeerId, VecDeque<Vec<u8>>>,
}

impl HubState {
    fn push(&mut self, to: PeerId, bytes: Vec<u8>) {
        self.inboxes.entry(to).or_default().push_back(bytes);
    }
}

/// Shared message hub. Clones share the same inboxes.
#[derive(Debug, Clone, Default)]
pub struct LoopbackHub {
    state: Arc<Mutex<HubState>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer and hand back its transport.
    pub fn connect(&self, peer: PeerId, role: Role) -> LoopbackTransport {
        let mut state = self.state.lock();
        if role == Role::Authority {
            if let Some(previous) = state.authority.replace(peer) {
                tracing::warn!(%previous, %peer, "[net] authority replaced");
            }
        }
        if !state.peers.contains(&peer) {
            state.peers.push(peer);
        }
        state.inboxes.entry(peer).or_default();
        tracing::debug!(%peer, ?role, "[net] peer connected");
        LoopbackTransport {
            hub: self.clone(),
            peer,
        }
    }

    /// Take and decode every message waiting for `peer`.
    pub fn receive(&self, peer: PeerId) -> Result<Vec<Envelope>, TransformerError> {
        let pending: Vec<Vec<u8>> = {
            let mut state = self.state.lock();
            let inbox = state.inboxes.get_mut(&peer).ok_or(TransformerError::UnknownPeer(peer))?;
            inbox.drain(..).collect()
        };
        pending
            .iter()
            .map(|bytes| Envelope::from_bytes(bytes).map_err(TransformerError::from))
            .collect()
    }

    /// Number of messages waiting for `peer`.
    pub fn pending(&self, peer: PeerId) -> usize {
        self.state.lock().inboxes.get(&peer).map_or(0, VecDeque::len)
    }

    fn send(&self, envelope: &Envelope, to: impl Fn(&HubState) -> Vec<PeerId>) {
        let bytes = match envelope.to_bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(%err, "[net] failed to encode message");
                return;
            }
        };
        let mut state = self.state.lock();
        let targets = to(&state);
        if targets.is_empty() {
            tracing::debug!(sender = %envelope.sender, "[net] message has no recipients");
        }
        for peer in targets {
            state.push(peer, bytes.clone());
        }
    }
}

/// One peer's handle onto a [`LoopbackHub`].
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    hub: LoopbackHub,
    peer: PeerId,
}

impl LoopbackTransport {
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn hub(&self) -> &LoopbackHub {
        &self.hub
    }
}

impl Transport for LoopbackTransport {
    fn send_request(&mut self, pawn: PawnId, request: ServerRequest) {
        let envelope = Envelope::request(pawn, self.peer, request);
        self.hub.send(&envelope, |state| match state.authority {
            Some(authority) => vec![authority],
            None => {
                tracing::warn!("[net] request dropped: no authority connected");
                Vec::new()
            }
        });
    }

    fn multicast(&mut self, pawn: PawnId, message: Multicast) {
        let sender = self.peer;
        let envelope = Envelope::multicast(pawn, sender, message);
        self.hub.send(&envelope, |state| {
            state.peers.iter().copied().filter(|peer| *peer != sender).collect()
        });
    }
}
