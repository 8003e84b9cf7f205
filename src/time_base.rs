//! The engine's single time authority: fuses the audio-interrupt sample
//! counter with the externally supplied 24-PPQN musical clock into a
//! quantized coordinate system every effect schedules against.
//!
//! Grounded on the reference engine's `util/atomic_ops.rs` shorthand for
//! cross-thread scalar state; there is exactly one [`TimeBase`] instance for
//! the life of the process (see `SPEC_FULL.md` §9, "global mutable state →
//! process-wide services with explicit init").

use crate::settings::{
    DEFAULT_SAMPLES_PER_BEAT, GRACE_WINDOW_SAMPLES, MAX_SAMPLES_PER_BEAT, MIN_SAMPLES_PER_BEAT,
    PPQN, Subdivision,
};
use crate::util::atomic_ops::AtomicOps;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Transport state driven by the external musical clock's Start/Stop/
/// Continue events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransportState {
    Stopped = 0,
    Playing = 1,
    Recording = 2,
}

impl From<u8> for TransportState {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::Playing,
            2 => Self::Recording,
            _ => Self::Stopped,
        }
    }
}

/// Process-wide musical time authority.
///
/// `sample_position` is written exclusively by the audio interrupt via
/// [`TimeBase::increment_samples`]; every other field is written exclusively
/// by the control thread. `sample_position` uses a 64-bit atomic directly —
/// on a target lacking native 64-bit atomics, readers would need a brief
/// interrupt mask or a sequence-counter protocol around this field (see
/// `SPEC_FULL.md` §5); this crate targets platforms with native 64-bit
/// atomic support and does not implement that fallback.
pub struct TimeBase {
    sample_position: AtomicU64,
    beat_number: AtomicU32,
    tick_in_beat: AtomicU32,
    samples_per_beat: AtomicU32,
    transport_state: AtomicU32,
    beat_flag: AtomicBool,

    /// Low-pass-filtered clock-pulse period, in microseconds; feeds
    /// `sync_to_musical_clock`'s tempo estimate. Control-thread only.
    filtered_period_micros: AtomicU32,
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeBase {
    pub fn new() -> Self {
        Self {
            sample_position: AtomicU64::new(0),
            beat_number: AtomicU32::new(0),
            tick_in_beat: AtomicU32::new(0),
            samples_per_beat: AtomicU32::new(DEFAULT_SAMPLES_PER_BEAT),
            transport_state: AtomicU32::new(TransportState::Stopped as u32),
            beat_flag: AtomicBool::new(false),
            filtered_period_micros: AtomicU32::new(0),
        }
    }

    /// Advances the sample counter. Called once per processed audio block
    /// from the audio interrupt.
    pub fn increment_samples(&self, n: u32) {
        self.sample_position.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Current absolute sample position. Never decreases except on
    /// [`TimeBase::reset`].
    pub fn sample_position(&self) -> u64 {
        self.sample_position.load(Ordering::Relaxed)
    }

    pub fn samples_per_beat(&self) -> u32 {
        self.samples_per_beat.lr()
    }

    pub fn beat_number(&self) -> u32 {
        self.beat_number.lr()
    }

    pub fn tick_in_beat(&self) -> u32 {
        self.tick_in_beat.lr()
    }

    pub fn transport_state(&self) -> TransportState {
        TransportState::from(self.transport_state.lr() as u8)
    }

    /// Advances one 24-PPQN tick. Called by the control thread for every
    /// clock pulse drained from the clock ring.
    pub fn increment_tick(&self) {
        let next = self.tick_in_beat.lr() + 1;
        if next >= PPQN {
            self.tick_in_beat.sr(0);
            self.beat_number.sr(self.beat_number.lr() + 1);
            self.beat_flag.store(true, Ordering::Release);
        } else {
            self.tick_in_beat.sr(next);
        }
    }

    /// Folds a newly observed inter-tick period (microseconds) into the
    /// tempo estimate via an exponential moving average, then derives
    /// `samples_per_beat`. Out-of-range results are rejected and the
    /// previous estimate is kept; returns `false` in that case so the
    /// caller can log/count a [`crate::error::TempoError`].
    pub fn sync_to_musical_clock(&self, tick_period_micros: u32, sample_rate_hz: f64, alpha: f64) -> bool {
        let prev = self.filtered_period_micros.lr();
        let filtered = if prev == 0 {
            tick_period_micros as f64
        } else {
            alpha * tick_period_micros as f64 + (1.0 - alpha) * prev as f64
        };

        let samples_per_beat =
            (filtered * PPQN as f64 * sample_rate_hz / 1_000_000.0).round() as u32;

        if !(MIN_SAMPLES_PER_BEAT..=MAX_SAMPLES_PER_BEAT).contains(&samples_per_beat) {
            return false;
        }

        self.filtered_period_micros.sr(filtered.round() as u32);
        self.samples_per_beat.sr(samples_per_beat);
        true
    }

    /// Samples remaining until the next beat boundary, collapsing to `0`
    /// within the grace window just past one (spec: "equals 0 only within
    /// the 16-sample grace window" — past the boundary, never before it).
    pub fn samples_to_next_beat(&self) -> u32 {
        let spb = self.samples_per_beat() as u64;
        let pos = self.sample_position();
        let within = (pos % spb) as u32;
        let spb32 = spb as u32;

        if within <= GRACE_WINDOW_SAMPLES {
            0
        } else {
            spb32 - within
        }
    }

    /// Samples remaining until the next boundary of `subdivision`, anchored
    /// to the *current beat* (not to sample 0) so non-integer subdivisions
    /// never accumulate drift across beats. Rounded up to the next
    /// 128-sample block boundary per `SPEC_FULL.md` §4.1.
    pub fn samples_to_next_subdivision(&self, subdivision: Subdivision) -> u32 {
        let spb = self.samples_per_beat();
        let dur = subdivision.duration_samples(spb).max(1);
        let pos = self.sample_position();
        let within_beat = (pos % spb as u64) as u32;

        let within_sub = within_beat % dur;
        let raw = if within_sub <= GRACE_WINDOW_SAMPLES {
            0
        } else {
            dur - within_sub
        };

        if raw == 0 {
            return 0;
        }

        // Round up to the next audio-block boundary.
        let block = crate::settings::BLOCK_SIZE as u32;
        raw.div_ceil(block) * block
    }

    /// Absolute sample position of the next `subdivision` boundary.
    pub fn next_subdivision_sample(&self, subdivision: Subdivision) -> u64 {
        self.sample_position() + self.samples_to_next_subdivision(subdivision) as u64
    }

    /// Test-and-clear the beat flag; consumers use this to drive
    /// beat-synchronous visual feedback without missing a beat to a race.
    pub fn poll_beat_flag(&self) -> bool {
        self.beat_flag.swap(false, Ordering::AcqRel)
    }

    /// Resets all counters to zero. Called on a transport Start event.
    pub fn reset(&self) {
        self.sample_position.store(0, Ordering::Relaxed);
        self.beat_number.sr(0);
        self.tick_in_beat.sr(0);
        self.beat_flag.store(false, Ordering::Release);
    }

    pub fn set_transport_state(&self, state: TransportState) {
        self.transport_state.sr(state as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BLOCK_SIZE;

    #[test]
    fn sample_position_advances_exactly() {
        let tb = TimeBase::new();
        for _ in 0..100 {
            tb.increment_samples(BLOCK_SIZE as u32);
        }
        assert_eq!(tb.sample_position(), (100 * BLOCK_SIZE) as u64);
    }

    #[test]
    fn tick_in_beat_wraps_and_counts_beats() {
        let tb = TimeBase::new();
        for _ in 0..(24 * 3 + 5) {
            tb.increment_tick();
        }
        assert_eq!(tb.beat_number(), 3);
        assert_eq!(tb.tick_in_beat(), 5);
    }

    #[test]
    fn beat_flag_is_test_and_clear() {
        let tb = TimeBase::new();
        for _ in 0..24 {
            tb.increment_tick();
        }
        assert!(tb.poll_beat_flag());
        assert!(!tb.poll_beat_flag());
    }

    #[test]
    fn out_of_range_tempo_is_rejected() {
        let tb = TimeBase::new();
        let before = tb.samples_per_beat();
        // Absurdly short period -> samples_per_beat below MIN_SAMPLES_PER_BEAT.
        let accepted = tb.sync_to_musical_clock(1, 44_100.0, 1.0);
        assert!(!accepted);
        assert_eq!(tb.samples_per_beat(), before);
    }

    #[test]
    fn in_range_tempo_updates_estimate() {
        let tb = TimeBase::new();
        // 120 BPM: quarter note = 500_000 us, 24 ppqn tick = ~20833 us.
        let accepted = tb.sync_to_musical_clock(20_833, 44_100.0, 1.0);
        assert!(accepted);
        let spb = tb.samples_per_beat();
        assert!((spb as i64 - 22_050).abs() < 50);
    }

    #[test]
    fn beat_distance_does_not_fire_early() {
        let tb = TimeBase::new();
        let spb = tb.samples_per_beat();
        // One sample before the grace window begins: must NOT collapse to 0.
        tb.increment_samples(spb - GRACE_WINDOW_SAMPLES - 1);
        assert_ne!(tb.samples_to_next_beat(), 0);
    }

    #[test]
    fn beat_distance_fires_within_grace_window_past_the_boundary() {
        let tb = TimeBase::new();
        let spb = tb.samples_per_beat();
        tb.increment_samples(spb + GRACE_WINDOW_SAMPLES);
        assert_eq!(tb.samples_to_next_beat(), 0);
    }

    #[test]
    fn subdivision_distance_never_exceeds_duration() {
        let tb = TimeBase::new();
        tb.increment_samples(10_000);
        let dist = tb.samples_to_next_subdivision(Subdivision::Sixteenth);
        let dur = Subdivision::Sixteenth.duration_samples(tb.samples_per_beat());
        assert!(dist == 0 || dist <= dur + BLOCK_SIZE as u32);
    }

    #[test]
    fn reset_zeroes_counters() {
        let tb = TimeBase::new();
        tb.increment_samples(1000);
        for _ in 0..30 {
            tb.increment_tick();
        }
        tb.reset();
        assert_eq!(tb.sample_position(), 0);
        assert_eq!(tb.beat_number(), 0);
        assert_eq!(tb.tick_in_beat(), 0);
    }
}
