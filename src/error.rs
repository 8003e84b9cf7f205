//! Typed errors for the subsystems that can fail off the audio-interrupt
//! path. Nothing on the audio interrupt itself returns a `Result` — see
//! `SPEC_FULL.md` §7: errors there degrade output and are counted, never
//! propagated.

use crate::dsp::effects::EffectId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset slot {0} is empty")]
    NotFound(u8),

    #[error("preset length {len} exceeds stutter buffer capacity {capacity}")]
    LengthOutOfRange { len: u32, capacity: u32 },

    #[error("preset file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stutter must be idle to save or load a preset")]
    StutterNotIdle,

    #[error("preset slot index {0} is out of range")]
    InvalidSlot(u8),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("effect {0:?} is already registered")]
    DuplicateId(EffectId),

    #[error("effect registry is full")]
    Overflow,
}

/// Raised internally by the time base when a clock-derived tempo estimate
/// falls outside the supported range. The public contract
/// (`TimeBase::sync_to_musical_clock`) silently ignores out-of-range
/// updates per spec; this type exists so the control thread can still log
/// and count rejections for telemetry.
#[derive(Debug, Error)]
pub enum TempoError {
    #[error("clock period implies {period_micros} µs/tick, outside supported tempo range")]
    OutOfRange { period_micros: u32 },
}
