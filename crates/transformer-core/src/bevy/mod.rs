//! Bevy integration.
//!
//! [`WorldScene`] exposes entities as transformer nodes, and
//! [`TransformerPlugin`] runs one pawn's [`NetworkedTransformer`](crate::NetworkedTransformer)
//! every frame from queued commands and the pointer state.

pub mod components;
pub mod events;
pub mod plugin;
pub mod resources;
pub mod scene;
pub mod systems;

#[cfg(test)]
pub(crate) mod test_utils;

pub use components::*;
pub use events::*;
pub use plugin::TransformerPlugin;
pub use resources::*;
pub use scene::WorldScene;
