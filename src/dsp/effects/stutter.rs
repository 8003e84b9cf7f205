//! Stutter: one-shot loop capture and playback, driven by an eight-state
//! machine.
//!
//! Grounded directly on `original_source/src/dsp/AudioStutter.h` and
//! `StutterAudio.cpp`: the state enum ordinals, the four independently
//! scheduled transitions (capture-start, capture-end, playback-onset,
//! playback-length), and the buffer-full override that force-ends a
//! capture when the non-circular buffer fills, are all traced from that
//! implementation's `update()`.

use super::QuantizeMode;
use crate::dsp::block::StereoBlock;
use crate::dsp::util::effect_trait::Effect;
use crate::settings::BLOCK_SIZE;
use crate::time_base::TimeBase;
use std::cell::{Cell, UnsafeCell};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StutterState {
    IdleNoLoop = 0,
    IdleWithLoop = 1,
    WaitCaptureStart = 2,
    Capturing = 3,
    WaitCaptureEnd = 4,
    WaitPlaybackOnset = 5,
    Playing = 6,
    WaitPlaybackLength = 7,
}

impl From<u32> for StutterState {
    fn from(v: u32) -> Self {
        match v {
            1 => Self::IdleWithLoop,
            2 => Self::WaitCaptureStart,
            3 => Self::Capturing,
            4 => Self::WaitCaptureEnd,
            5 => Self::WaitPlaybackOnset,
            6 => Self::Playing,
            7 => Self::WaitPlaybackLength,
            _ => Self::IdleNoLoop,
        }
    }
}

#[derive(Debug)]
pub struct Stutter {
    state: AtomicU32,
    write_pos: AtomicU64,
    read_pos: AtomicU64,
    capture_length: AtomicU64,

    capture_start_at: AtomicU64,
    capture_end_at: AtomicU64,
    playback_onset_at: AtomicU64,
    playback_length_at: AtomicU64,

    /// Latched by the controller when it arms a capture-end: whether the
    /// loop should fall straight into playback (held) or park in
    /// `IdleWithLoop` (released before the boundary).
    stutter_held: AtomicBool,

    /// Governs capture-start (onset side) and capture-end (length side)
    /// scheduling, mirroring Choke/Freeze's `onsetMode`/`lengthMode` (spec
    /// §4.7): capture-start and playback-onset share `onset_mode`;
    /// capture-end and playback-length share `length_mode`.
    onset_mode: Cell<QuantizeMode>,
    length_mode: Cell<QuantizeMode>,

    buffer: UnsafeCell<Box<[(i16, i16)]>>,
    capacity: usize,
}

// SAFETY: `buffer` is touched only from inside `update`/`load_loop`, which by
// the engine's concurrency model (spec §5) never execute concurrently with
// each other — `load_loop` is only called from the control thread while the
// effect is idle, which the preset controller enforces before calling it.
unsafe impl Sync for Stutter {}

impl Stutter {
    pub fn new(capacity_frames: usize) -> Self {
        let capacity = capacity_frames.max(1);
        Self {
            state: AtomicU32::new(StutterState::IdleNoLoop as u32),
            write_pos: AtomicU64::new(0),
            read_pos: AtomicU64::new(0),
            capture_length: AtomicU64::new(0),
            capture_start_at: AtomicU64::new(0),
            capture_end_at: AtomicU64::new(0),
            playback_onset_at: AtomicU64::new(0),
            playback_length_at: AtomicU64::new(0),
            stutter_held: AtomicBool::new(false),
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

    pub fn state(&self) -> StutterState {
        StutterState::from(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, s: StutterState) {
        self.state.store(s as u32, Ordering::Release);
    }

    pub fn capture_length(&self) -> u64 {
        self.capture_length.load(Ordering::Relaxed)
    }

    /// Capacity of the capture buffer, in stereo sample frames.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // --- Controller-facing capture operations ---------------------------

    pub fn start_capture(&self) {
        self.capture_start_at.store(0, Ordering::Relaxed);
        self.write_pos.store(0, Ordering::Relaxed);
        self.capture_length.store(0, Ordering::Relaxed);
        self.set_state(StutterState::Capturing);
    }

    pub fn schedule_capture_start(&self, absolute_sample: u64) {
        self.capture_start_at.store(absolute_sample.max(1), Ordering::Relaxed);
        self.set_state(StutterState::WaitCaptureStart);
    }

    pub fn cancel_capture_start(&self) {
        self.capture_start_at.store(0, Ordering::Relaxed);
        self.set_state(StutterState::IdleNoLoop);
    }

    pub fn end_capture(&self, stutter_held: bool) {
        self.capture_end_at.store(0, Ordering::Relaxed);
        self.stutter_held.store(stutter_held, Ordering::Relaxed);
        self.finish_capture();
    }

    pub fn schedule_capture_end(&self, absolute_sample: u64, stutter_held: bool) {
        self.stutter_held.store(stutter_held, Ordering::Relaxed);
        self.capture_end_at.store(absolute_sample.max(1), Ordering::Relaxed);
        self.set_state(StutterState::WaitCaptureEnd);
    }

    fn finish_capture(&self) {
        let len = self.write_pos.load(Ordering::Relaxed);
        self.capture_length.store(len, Ordering::Relaxed);

        if self.stutter_held.load(Ordering::Relaxed) {
            self.read_pos.store(0, Ordering::Relaxed);
            self.set_state(StutterState::Playing);
        } else if len > 0 {
            self.set_state(StutterState::IdleWithLoop);
        } else {
            self.set_state(StutterState::IdleNoLoop);
        }
    }

    // --- Controller-facing playback operations ---------------------------

    pub fn start_playback(&self) {
        self.playback_onset_at.store(0, Ordering::Relaxed);
        self.read_pos.store(0, Ordering::Relaxed);
        self.set_state(StutterState::Playing);
    }

    pub fn schedule_playback_onset(&self, absolute_sample: u64) {
        self.playback_onset_at.store(absolute_sample.max(1), Ordering::Relaxed);
        self.set_state(StutterState::WaitPlaybackOnset);
    }

    pub fn stop_playback(&self) {
        self.playback_length_at.store(0, Ordering::Relaxed);
        self.set_state(StutterState::IdleWithLoop);
    }

    pub fn schedule_playback_length(&self, absolute_sample: u64) {
        self.playback_length_at.store(absolute_sample.max(1), Ordering::Relaxed);
        self.set_state(StutterState::WaitPlaybackLength);
    }

    /// Overwrites the capture buffer directly (preset load path). Only
    /// valid while idle; the preset controller enforces that precondition.
    pub fn load_loop(&self, left: &[i16], right: &[i16]) {
        let len = left.len().min(right.len()).min(self.capacity);
        // SAFETY: only called from the control thread while idle, never
        // concurrently with the audio interrupt's `update`.
        let buffer = unsafe { &mut *self.buffer.get() };
        for i in 0..len {
            buffer[i] = (left[i], right[i]);
        }
        self.write_pos.store(len as u64, Ordering::Relaxed);
        self.capture_length.store(len as u64, Ordering::Relaxed);
        self.set_state(if len > 0 {
            StutterState::IdleWithLoop
        } else {
            StutterState::IdleNoLoop
        });
    }

    pub fn buffer_channels(&self) -> (Vec<i16>, Vec<i16>) {
        let len = self.capture_length() as usize;
        // SAFETY: read-only snapshot taken from the control thread while
        // idle (preset save path); the audio interrupt does not resize or
        // relocate the buffer.
        let buffer = unsafe { &*self.buffer.get() };
        let left = buffer[..len].iter().map(|(l, _)| *l).collect();
        let right = buffer[..len].iter().map(|(_, r)| *r).collect();
        (left, right)
    }

    fn record_block(&self, block: &StereoBlock) {
        // SAFETY: sole writer is the audio interrupt, non-reentrant.
        let buffer = unsafe { &mut *self.buffer.get() };
        let mut write = self.write_pos.load(Ordering::Relaxed) as usize;
        for i in 0..BLOCK_SIZE {
            if write >= self.capacity {
                break;
            }
            buffer[write] = (block.left[i], block.right[i]);
            write += 1;
        }
        self.write_pos.store(write as u64, Ordering::Relaxed);
    }

    fn play_block(&self, block: &mut StereoBlock) {
        // SAFETY: sole reader is the audio interrupt, non-reentrant.
        let buffer = unsafe { &*self.buffer.get() };
        let len = self.capture_length.load(Ordering::Relaxed).max(1) as usize;
        let mut read = self.read_pos.load(Ordering::Relaxed) as usize % len;
        for i in 0..BLOCK_SIZE {
            let (l, r) = buffer[read];
            block.left[i] = l;
            block.right[i] = r;
            read = (read + 1) % len;
        }
        self.read_pos.store(read as u64, Ordering::Relaxed);
    }
}

impl Effect for Stutter {
    fn enable(&self) {
        match self.state() {
            StutterState::IdleNoLoop => self.start_capture(),
            StutterState::IdleWithLoop => self.start_playback(),
            _ => {}
        }
    }

    fn disable(&self) {
        match self.state() {
            StutterState::Capturing | StutterState::WaitCaptureEnd => self.end_capture(false),
            StutterState::Playing | StutterState::WaitPlaybackLength => self.stop_playback(),
            _ => {}
        }
    }

    fn is_enabled(&self) -> bool {
        !matches!(self.state(), StutterState::IdleNoLoop | StutterState::IdleWithLoop)
    }

    fn name(&self) -> &'static str {
        "stutter"
    }

    fn update(&self, block: &mut StereoBlock, time: &TimeBase) {
        let pos = time.sample_position();
        let block_end = pos + BLOCK_SIZE as u64;
        let in_window = |scheduled: u64| scheduled != 0 && scheduled >= pos && scheduled < block_end;

        let cs = self.capture_start_at.load(Ordering::Relaxed);
        if in_window(cs) && self.state() == StutterState::WaitCaptureStart {
            self.capture_start_at.store(0, Ordering::Relaxed);
            self.write_pos.store(0, Ordering::Relaxed);
            self.capture_length.store(0, Ordering::Relaxed);
            self.set_state(StutterState::Capturing);
        }

        let ce = self.capture_end_at.load(Ordering::Relaxed);
        if in_window(ce)
            && matches!(self.state(), StutterState::Capturing | StutterState::WaitCaptureEnd)
        {
            self.capture_end_at.store(0, Ordering::Relaxed);
            self.finish_capture();
        }

        let po = self.playback_onset_at.load(Ordering::Relaxed);
        if in_window(po) && self.state() == StutterState::WaitPlaybackOnset {
            self.playback_onset_at.store(0, Ordering::Relaxed);
            self.read_pos.store(0, Ordering::Relaxed);
            self.set_state(StutterState::Playing);
        }

        let pl = self.playback_length_at.load(Ordering::Relaxed);
        if in_window(pl)
            && matches!(self.state(), StutterState::Playing | StutterState::WaitPlaybackLength)
        {
            self.playback_length_at.store(0, Ordering::Relaxed);
            self.set_state(StutterState::IdleWithLoop);
        }

        match self.state() {
            StutterState::Capturing | StutterState::WaitCaptureEnd => {
                self.record_block(block);
                if self.write_pos.load(Ordering::Relaxed) as usize >= self.capacity {
                    self.capture_end_at.store(0, Ordering::Relaxed);
                    self.finish_capture();
                }
            }
            StutterState::Playing | StutterState::WaitPlaybackLength => {
                self.play_block(block);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_base::TimeBase;

    #[test]
    fn immediate_capture_then_held_release_starts_playback() {
        let stutter = Stutter::new(4096);
        let time = TimeBase::new();
        stutter.start_capture();
        assert_eq!(stutter.state(), StutterState::Capturing);

        let mut block = StereoBlock::from_fn(|i| (i as i16, -(i as i16)));
        let recorded = block;
        stutter.update(&mut block, &time);
        time.increment_samples(BLOCK_SIZE as u32);

        stutter.end_capture(true);
        assert_eq!(stutter.state(), StutterState::Playing);
        assert_eq!(stutter.capture_length(), BLOCK_SIZE as u64);

        let mut out = StereoBlock::silence();
        stutter.update(&mut out, &time);
        assert_eq!(out.left, recorded.left);
    }

    #[test]
    fn immediate_capture_then_free_release_parks_idle_with_loop() {
        let stutter = Stutter::new(4096);
        let time = TimeBase::new();
        stutter.start_capture();
        let mut block = StereoBlock::from_fn(|i| (i as i16, i as i16));
        stutter.update(&mut block, &time);
        stutter.end_capture(false);
        assert_eq!(stutter.state(), StutterState::IdleWithLoop);
    }

    #[test]
    fn quantized_onset_survives_early_release() {
        let stutter = Stutter::new(4096);
        // Seed a loop first.
        stutter.start_capture();
        stutter.capture_length.store(1000, Ordering::Relaxed);
        stutter.set_state(StutterState::IdleWithLoop);

        let time = TimeBase::new();
        time.increment_samples(1000);
        stutter.schedule_playback_onset(1050);
        assert_eq!(stutter.state(), StutterState::WaitPlaybackOnset);

        // "Release" happens before the boundary — nothing to do since the
        // controller, not the effect, owns release timing; state must stay
        // parked in WaitPlaybackOnset until the interrupt fires it.
        assert_eq!(stutter.state(), StutterState::WaitPlaybackOnset);

        let mut block = StereoBlock::silence();
        stutter.update(&mut block, &time);
        assert_eq!(stutter.state(), StutterState::Playing);
    }

    #[test]
    fn buffer_full_forces_capture_end() {
        let capacity = BLOCK_SIZE * 2;
        let stutter = Stutter::new(capacity);
        let time = TimeBase::new();
        stutter.start_capture();

        for _ in 0..3 {
            let mut block = StereoBlock::from_fn(|i| (i as i16, i as i16));
            stutter.update(&mut block, &time);
            time.increment_samples(BLOCK_SIZE as u32);
        }

        assert_eq!(stutter.capture_length(), capacity as u64);
        assert_eq!(stutter.state(), StutterState::IdleWithLoop);
    }

    #[test]
    fn playback_loops_perfectly() {
        let stutter = Stutter::new(4096);
        let time = TimeBase::new();
        stutter.start_capture();
        let mut block = StereoBlock::from_fn(|i| ((i % 7) as i16, (i % 5) as i16));
        let recorded = block;
        stutter.update(&mut block, &time);
        stutter.end_capture(true);

        let mut first = StereoBlock::silence();
        stutter.update(&mut first, &time);
        let mut second = StereoBlock::silence();
        stutter.update(&mut second, &time);

        assert_eq!(first.left, recorded.left);
        assert_eq!(second.left, recorded.left);
    }
}
