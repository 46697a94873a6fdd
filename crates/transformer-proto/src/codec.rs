//! Binary encoding of [`Envelope`]s with postcard.

use crate::message::Envelope;

#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] postcard::Error),
    #[error("failed to decode envelope: {0}")]
    Decode(#[source] postcard::Error),
}

pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, ProtoError> {
    postcard::to_allocvec(envelope).map_err(ProtoError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<Envelope, ProtoError> {
    postcard::from_bytes(bytes).map_err(ProtoError::Decode)
}

impl Envelope {
    /// Serialize the envelope to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtoError> {
        encode(self)
    }

    /// Deserialize an envelope from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtoError> {
        decode(bytes)
    }
}
