//! Operator control surface
//!
//! The pause flag and the flash-rate bias override are the only state shared
//! between the lending loop and the operator. They live in one immutable
//! snapshot behind an [`ArcSwap`](arc_swap::ArcSwap):
//!
//! ```text
//! Lending loop ──► load() ──► Arc<ControlState> ──► read (never blocked)
//! Bridge       ──► build new state ──► store() ──► atomic swap
//! ```
//!
//! The bridge mirrors the snapshot to a small JSON settings file so an
//! external interface (or an operator with an editor) can drive it.

mod bridge;
mod settings;
mod state;

pub use bridge::ControlSurfaceBridge;
pub use settings::{SettingsError, SettingsRecord, SettingsStore};
pub use state::{ControlHandle, ControlState};
