//! Freeze: captures a short rolling window of audio and, once engaged,
//! loops it indefinitely with no crossfade — the glitch is the point.
//!
//! Grounded on `original_source/include/audio_freeze.h`'s
//! `AudioEffectFreeze`: a circular record buffer that the effect writes to
//! continuously while disengaged, and reads from (looping) while engaged.

use super::QuantizeMode;
use crate::dsp::block::StereoBlock;
use crate::dsp::util::effect_trait::Effect;
use crate::settings::BLOCK_SIZE;
use crate::time_base::TimeBase;
use crate::util::atomic_ops::AtomicOps;
use std::cell::{Cell, UnsafeCell};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug)]
pub struct Freeze {
    enabled: AtomicBool,
    write_pos: AtomicU64,
    read_pos: AtomicU64,
    onset_at_sample: AtomicU64,
    release_at_sample: AtomicU64,
    onset_mode: Cell<QuantizeMode>,
    length_mode: Cell<QuantizeMode>,

    /// Sample data, touched only by the audio interrupt inside `update`.
    buffer: UnsafeCell<Box<[(i16, i16)]>>,
    capacity: usize,
}

// SAFETY: `buffer` is only ever read or written from inside `update`, which
// by the engine's concurrency model (spec §5) is only ever invoked from the
// single audio interrupt context.
unsafe impl Sync for Freeze {}

impl Freeze {
    pub fn new(capacity_frames: usize) -> Self {
        let capacity = capacity_frames.max(1);
        Self {
            enabled: AtomicBool::new(false),
            write_pos: AtomicU64::new(0),
            read_pos: AtomicU64::new(0),
            onset_at_sample: AtomicU64::new(0),
            release_at_sample: AtomicU64::new(0),
            onset_mode: Cell::new(QuantizeMode::Free),
            length_mode: Cell::new(QuantizeMode::Free),
            buffer: UnsafeCell::new(vec![(0i16, 0i16); capacity].into_boxed_slice()),
            capacity,
        }
    }

    pub fn onset_mode(&self) -> QuantizeMode {
        self.onset_mode.get()
    }

    pub fn length_mode(&self) -> QuantizeMode {
        self.length_mode.get()
    }

    pub fn set_onset_mode(&self, mode: QuantizeMode) {
        self.onset_mode.set(mode);
    }

    pub fn set_length_mode(&self, mode: QuantizeMode) {
        self.length_mode.set(mode);
    }

    pub fn schedule_onset(&self, absolute_sample: u64) {
        self.onset_at_sample.store(absolute_sample.max(1), Ordering::Relaxed);
    }

    pub fn cancel_scheduled_onset(&self) {
        self.onset_at_sample.store(0, Ordering::Relaxed);
    }

    pub fn onset_pending(&self) -> bool {
        self.onset_at_sample.load(Ordering::Relaxed) != 0
    }

    pub fn schedule_release(&self, absolute_sample: u64) {
        self.release_at_sample.store(absolute_sample.max(1), Ordering::Relaxed);
    }

    pub fn cancel_scheduled_release(&self) {
        self.release_at_sample.store(0, Ordering::Relaxed);
    }

    pub fn release_pending(&self) -> bool {
        self.release_at_sample.load(Ordering::Relaxed) != 0
    }
}

impl Effect for Freeze {
    fn enable(&self) {
        // Latch the read position to the current write position *before*
        // flipping the flag, so the first frozen block starts exactly where
        // recording left off.
        let w = self.write_pos.load(Ordering::Relaxed);
        self.read_pos.store(w, Ordering::Relaxed);
        self.enabled.store(true, Ordering::Release);
    }

    fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn name(&self) -> &'static str {
        "freeze"
    }

    fn update(&self, block: &mut StereoBlock, time: &TimeBase) {
        let pos = time.sample_position();
        let block_end = pos + BLOCK_SIZE as u64;

        let onset = self.onset_at_sample.load(Ordering::Relaxed);
        if onset != 0 && onset >= pos && onset < block_end {
            self.enable();
            self.onset_at_sample.store(0, Ordering::Relaxed);
        }

        let release = self.release_at_sample.load(Ordering::Relaxed);
        if release != 0 && release >= pos && release < block_end {
            self.disable();
            self.release_at_sample.store(0, Ordering::Relaxed);
        }

        // SAFETY: sole writer/reader is the audio interrupt, which never
        // calls `update` reentrantly.
        let buffer = unsafe { &mut *self.buffer.get() };

        if self.is_enabled() {
            let mut read = self.read_pos.load(Ordering::Relaxed) as usize;
            for i in 0..BLOCK_SIZE {
                let (l, r) = buffer[read];
                block.left[i] = l;
                block.right[i] = r;
                read = (read + 1) % self.capacity;
            }
            self.read_pos.store(read as u64, Ordering::Relaxed);
        } else {
            let mut write = self.write_pos.load(Ordering::Relaxed) as usize;
            for i in 0..BLOCK_SIZE {
                buffer[write] = (block.left[i], block.right[i]);
                write = (write + 1) % self.capacity;
            }
            self.write_pos.store(write as u64, Ordering::Relaxed);
        }
    }
}
