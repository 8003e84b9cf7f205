//! Project-wide exports for easy access.

pub use crate::control::{
    Command, CommandKind, ControlThread, ChokeController, DisplayManager, FreezeController,
    PresetController, StutterController,
};
pub use crate::dsp::{Choke, EffectId, Effect, EffectRegistry, Freeze, QuantizeMode, Stutter, StutterState};
pub use crate::engine::AudioEngine;
pub use crate::error::{PresetError, RegistryError, TempoError};
pub use crate::midi_clock::MidiClockInput;
pub use crate::external::{
    BlockAllocator, DisplayBitmap, DisplayOutput, FileStore, LedOutput, MenuDisplayData,
    TransportEvent,
};
pub use crate::settings::{EngineConfig, Subdivision};
pub use crate::time_base::{TimeBase, TransportState};
pub use crate::util::*;

pub use atomic_float::AtomicF64;
