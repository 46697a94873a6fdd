//! Error types for the transformer core.

use transformer_proto::{PeerId, ProtoError, TransformationType};

#[derive(Debug, thiserror::Error)]
pub enum TransformerError {
    #[error("failed to parse transformer config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("snap value for {kind:?} must be positive, got {value}")]
    InvalidSnapValue { kind: TransformationType, value: f32 },

    #[error("config field `{field}` must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("config field `{field}` must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error("no peer {0} is attached to the hub")]
    UnknownPeer(PeerId),
}
