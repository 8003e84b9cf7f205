//! The engine's three chainable stereo effects, plus the passthrough
//! timekeeper tap that advances the sample counter.

pub mod choke;
pub mod freeze;
pub mod stutter;
pub mod timekeeper;

pub use choke::Choke;
pub use freeze::Freeze;
pub use stutter::{Stutter, StutterState};
pub use timekeeper::Timekeeper;

/// Identifies one of the three performer-addressable effects, used by
/// [`crate::control::Command`] and the effect registry. `FuncModifier` is
/// not a registry entry — it is the shift-like modifier key handled
/// entirely by the input layer and the preset controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectId {
    Choke,
    Freeze,
    Stutter,
    FuncModifier,
}

/// FREE vs QUANTIZED onset/length mode, shared by Choke and Freeze (spec
/// §3.5, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantizeMode {
    Free,
    Quantized,
}
