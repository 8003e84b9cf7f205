//! Global constants and the engine's startup configuration.
//!
//! The numeric invariants that the rest of the crate does arithmetic against
//! (block size, clock resolution, tempo bounds, grace window) are true
//! constants — changing them changes the meaning of a "sample" or a "tick"
//! everywhere, so they are not configuration. Everything that a deployer
//! might reasonably want to retune at startup lives in [`EngineConfig`]
//! instead.

use serde::{Deserialize, Serialize};

/// The audio sample rate. Unlike the creative-coding ancestor of this crate,
/// this is carried explicitly through [`EngineConfig`] rather than as a
/// mutable global — the engine only ever runs against one audio device for
/// its lifetime, so a value handed to it at startup is enough.
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 44_100.0;

/// Samples per stereo audio block, fixed by the hardware's audio interrupt.
pub const BLOCK_SIZE: usize = 128;

/// Pulses per quarter note of the external musical clock.
pub const PPQN: u32 = 24;

/// Lower bound of the accepted tempo range, in samples per beat
/// (≈300 BPM at 44.1 kHz).
pub const MIN_SAMPLES_PER_BEAT: u32 = 8_000;

/// Upper bound of the accepted tempo range, in samples per beat
/// (≈30 BPM at 44.1 kHz).
pub const MAX_SAMPLES_PER_BEAT: u32 = 100_000;

/// Default tempo estimate before any clock pulses have arrived: 120 BPM at
/// 44.1 kHz.
pub const DEFAULT_SAMPLES_PER_BEAT: u32 = 22_050;

/// Tolerance, in samples, within which "just past a boundary" collapses to
/// "fire now" rather than waiting a full grid cycle.
pub const GRACE_WINDOW_SAMPLES: u32 = 16;

/// Smoothing factor for the clock-period low-pass filter (exponential moving
/// average) used to derive the tempo estimate from successive clock pulses.
pub const TEMPO_EMA_ALPHA: f64 = 0.1;

/// Choke's linear gain ramp length, in samples (3 ms at 44.1 kHz). This is
/// the distilled specification's explicit figure; it intentionally
/// disagrees with the slower 10 ms fade used by the instrument this engine's
/// behavior is traced from (see `DESIGN.md`).
pub const CHOKE_RAMP_SAMPLES: u32 = 132;

/// Default Freeze capture-buffer length, in milliseconds.
pub const DEFAULT_FREEZE_BUFFER_MS: f64 = 3.0;

/// Minimum supported tempo used to size the Stutter capture buffer, in BPM.
/// A capture buffer sized for one bar (4 beats) at this tempo is guaranteed
/// to hold a full-bar capture at any supported tempo.
pub const STUTTER_MIN_TEMPO_BPM: f64 = 70.0;

/// Number of addressable effects in the registry.
pub const MAX_EFFECTS: usize = 8;

/// Number of preset slots backed by the file store.
pub const NUM_PRESET_SLOTS: usize = 4;

/// Default control-thread tick interval, in seconds.
pub const DEFAULT_CONTROL_TICK_SECS: f64 = 0.002;

/// Debounce window for the FUNC modifier key, in samples (100 ms at
/// 44.1 kHz). A preset-slot press arriving within this window of FUNC's
/// release is still treated as a FUNC-held press, absorbing the inevitable
/// few milliseconds of key-release jitter between two physical buttons
/// pressed together. Grounded on the original instrument's
/// `isFuncEffectivelyHeld` helper (`SPEC_FULL.md` §10).
pub const FUNC_DEBOUNCE_SAMPLES: u32 = 4_410;

/// Quantization grid subdivisions available to the performer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subdivision {
    ThirtySecond,
    Sixteenth,
    Eighth,
    Quarter,
}

impl Subdivision {
    /// Duration of this subdivision in samples, given the current tempo
    /// estimate. Computed exactly (no rounding) so that chained subdivisions
    /// never drift off the musical grid.
    pub fn duration_samples(self, samples_per_beat: u32) -> u32 {
        match self {
            Self::ThirtySecond => samples_per_beat / 8,
            Self::Sixteenth => samples_per_beat / 4,
            Self::Eighth => samples_per_beat / 2,
            Self::Quarter => samples_per_beat,
        }
    }
}

/// Startup configuration for the engine. Built once and handed to every
/// component that needs it; nothing in the audio-interrupt path consults it
/// directly (components snapshot the values they need at construction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sample_rate_hz: f64,
    pub default_subdivision: Subdivision,
    /// Samples subtracted from a quantized onset to compensate for expected
    /// transient latency. Open question in the distillation; defaults to 0.
    pub quantize_lookahead_samples: u32,
    pub freeze_buffer_ms: f64,
    pub stutter_min_tempo_bpm: f64,
    pub preset_dir: String,
    pub control_tick_secs: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            default_subdivision: Subdivision::Sixteenth,
            quantize_lookahead_samples: 0,
            freeze_buffer_ms: DEFAULT_FREEZE_BUFFER_MS,
            stutter_min_tempo_bpm: STUTTER_MIN_TEMPO_BPM,
            preset_dir: "presets".to_string(),
            control_tick_secs: DEFAULT_CONTROL_TICK_SECS,
        }
    }
}

impl EngineConfig {
    /// Stutter capture buffer capacity, in stereo sample frames: one bar (4
    /// beats) at the configured minimum tempo.
    pub fn stutter_buffer_capacity_frames(&self) -> usize {
        let seconds_per_beat = 60.0 / self.stutter_min_tempo_bpm;
        (seconds_per_beat * 4.0 * self.sample_rate_hz).ceil() as usize
    }

    /// Freeze capture buffer capacity, in stereo sample frames.
    pub fn freeze_buffer_capacity_frames(&self) -> usize {
        (self.freeze_buffer_ms / 1000.0 * self.sample_rate_hz).ceil() as usize
    }

    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.sample_rate_hz, 44_100.0);
        assert_eq!(cfg.quantize_lookahead_samples, 0);
        assert_eq!(cfg.stutter_buffer_capacity_frames() > 3_000_000, true);
    }

    #[test]
    fn subdivision_durations_are_exact() {
        let spb = DEFAULT_SAMPLES_PER_BEAT;
        assert_eq!(Subdivision::Quarter.duration_samples(spb), spb);
        assert_eq!(Subdivision::Eighth.duration_samples(spb), spb / 2);
        assert_eq!(Subdivision::Sixteenth.duration_samples(spb), spb / 4);
        assert_eq!(Subdivision::ThirtySecond.duration_samples(spb), spb / 8);
    }

    #[test]
    fn json_roundtrip() {
        let cfg = EngineConfig::default();
        let json = cfg.to_json_pretty().unwrap();
        let back = EngineConfig::from_json(&json).unwrap();
        assert_eq!(back.sample_rate_hz, cfg.sample_rate_hz);
    }
}
