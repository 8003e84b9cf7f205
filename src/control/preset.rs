//! Manages the four preset slots: synchronous save/load/delete against the
//! file store, plus the FUNC-modifier debounce that lets two physically
//! distinct buttons (FUNC and a preset key) register as "pressed together"
//! despite a few milliseconds of release jitter between them.
//!
//! Grounded on `SPEC_FULL.md` §4.10 and §10 (the debounce, traced from the
//! original instrument's `isFuncEffectivelyHeld`).

use crate::dsp::effects::{Stutter, StutterState};
use crate::dsp::util::effect_trait::Effect;
use crate::external::{FileStore, LedOutput};
use crate::settings::{FUNC_DEBOUNCE_SAMPLES, NUM_PRESET_SLOTS};
use crate::time_base::TimeBase;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
struct SlotState {
    exists: bool,
}

pub struct PresetController {
    store: Box<dyn FileStore>,
    slots: [SlotState; NUM_PRESET_SLOTS],
    selected: Option<u8>,

    func_held: bool,
    func_released_at: Option<u64>,
}

impl PresetController {
    pub fn new(mut store: Box<dyn FileStore>) -> Self {
        let mut slots = [SlotState::default(); NUM_PRESET_SLOTS];
        for (i, slot) in slots.iter_mut().enumerate() {
            slot.exists = store.exists(i as u8);
        }
        Self { store, slots, selected: None, func_held: false, func_released_at: None }
    }

    /// Records a FUNC press/release edge. Called from the control thread
    /// whenever a `FuncModifier`-targeted command is drained.
    pub fn note_func_edge(&mut self, held: bool, time: &TimeBase) {
        self.func_held = held;
        if !held {
            self.func_released_at = Some(time.sample_position());
        }
    }

    /// Whether FUNC should be treated as held for the purposes of a
    /// simultaneous preset-key press: true if actually held, or released
    /// within the debounce window.
    fn is_func_effectively_held(&self, time: &TimeBase) -> bool {
        if self.func_held {
            return true;
        }
        match self.func_released_at {
            Some(at) => time.sample_position().saturating_sub(at) <= FUNC_DEBOUNCE_SAMPLES as u64,
            None => false,
        }
    }

    /// Entry point for one of the four dedicated preset-slot keys.
    pub fn handle_button_press(&mut self, slot: u8, stutter: &Stutter, time: &TimeBase) {
        if slot as usize >= NUM_PRESET_SLOTS {
            warn!(slot, "preset slot index out of range");
            return;
        }
        let exists = self.slots[slot as usize].exists;
        let func = self.is_func_effectively_held(time);
        let stutter_idle_with_loop = stutter.state() == StutterState::IdleWithLoop;
        let stutter_idle = matches!(
            stutter.state(),
            StutterState::IdleNoLoop | StutterState::IdleWithLoop
        );

        if func && !exists && stutter_idle_with_loop {
            self.save(slot, stutter);
        } else if func && exists && stutter_idle {
            self.delete(slot);
        } else if !func && exists && stutter_idle {
            self.load(slot, stutter);
        }
    }

    /// Called by the control thread whenever Stutter finishes a *new*
    /// capture (as opposed to a preset load): the freshly captured buffer is
    /// a scratch loop, not bound to any preset slot, so deselect.
    pub fn on_capture_complete(&mut self) {
        self.selected = None;
    }

    fn save(&mut self, slot: u8, stutter: &Stutter) {
        let (left, right) = stutter.buffer_channels();
        match self.store.save(slot, &left, &right) {
            Ok(()) => {
                self.slots[slot as usize].exists = true;
                self.selected = Some(slot);
                info!(slot, frames = left.len(), "preset saved");
            }
            Err(err) => warn!(slot, %err, "preset save failed"),
        }
    }

    fn load(&mut self, slot: u8, stutter: &Stutter) {
        match self.store.load(slot, stutter.capacity()) {
            Ok((left, right)) => {
                stutter.load_loop(&left, &right);
                self.selected = Some(slot);
                info!(slot, frames = left.len(), "preset loaded");
            }
            Err(err) => warn!(slot, %err, "preset load failed, buffer left untouched"),
        }
    }

    fn delete(&mut self, slot: u8) {
        match self.store.delete(slot) {
            Ok(()) => {
                self.slots[slot as usize].exists = false;
                if self.selected == Some(slot) {
                    self.selected = None;
                }
                info!(slot, "preset deleted");
            }
            Err(err) => warn!(slot, %err, "preset delete failed"),
        }
    }

    /// empty = off, written-not-selected = solid, selected = blink
    /// synchronized to the beat LED (spec §4.10).
    pub fn update_leds(&self, leds: &mut dyn LedOutput, beat_flag_state: bool) {
        for (i, slot) in self.slots.iter().enumerate() {
            let brightness = if !slot.exists {
                0.0
            } else if self.selected == Some(i as u8) {
                if beat_flag_state { 1.0 } else { 0.2 }
            } else {
                0.7
            };
            leds.set_preset_brightness(i as u8, brightness);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PresetError;
    use std::collections::HashMap;

    struct MemoryFileStore {
        files: HashMap<u8, (Vec<i16>, Vec<i16>)>,
    }

    impl FileStore for MemoryFileStore {
        fn save(&mut self, slot: u8, left: &[i16], right: &[i16]) -> Result<(), PresetError> {
            self.files.insert(slot, (left.to_vec(), right.to_vec()));
            Ok(())
        }
        fn load(&mut self, slot: u8, capacity: usize) -> Result<(Vec<i16>, Vec<i16>), PresetError> {
            let (left, right) =
                self.files.get(&slot).cloned().ok_or(PresetError::NotFound(slot))?;
            if left.len() > capacity {
                return Err(PresetError::LengthOutOfRange {
                    len: left.len() as u32,
                    capacity: capacity as u32,
                });
            }
            Ok((left, right))
        }
        fn delete(&mut self, slot: u8) -> Result<(), PresetError> {
            self.files.remove(&slot);
            Ok(())
        }
        fn exists(&self, slot: u8) -> bool {
            self.files.contains_key(&slot)
        }
    }

    #[test]
    fn save_then_load_roundtrips_through_stutter_buffer() {
        let store = Box::new(MemoryFileStore { files: HashMap::new() });
        let mut preset = PresetController::new(store);
        let stutter = Stutter::new(4096);
        let time = TimeBase::new();

        stutter.start_capture();
        let mut block = crate::dsp::block::StereoBlock::from_fn(|i| (i as i16, -(i as i16)));
        stutter.update(&mut block, &time);
        stutter.end_capture(false);
        assert_eq!(stutter.state(), StutterState::IdleWithLoop);

        preset.note_func_edge(true, &time);
        preset.handle_button_press(0, &stutter, &time);
        assert!(preset.slots[0].exists);
        assert_eq!(preset.selected, Some(0));

        let stutter2 = Stutter::new(4096);
        preset.note_func_edge(false, &time);
        preset.handle_button_press(0, &stutter2, &time);
        assert_eq!(stutter2.state(), StutterState::IdleWithLoop);
        assert_eq!(stutter2.capture_length(), stutter.capture_length());
    }

    #[test]
    fn debounced_func_release_still_counts_as_held() {
        let store = Box::new(MemoryFileStore { files: HashMap::new() });
        let mut preset = PresetController::new(store);
        let stutter = Stutter::new(4096);
        let time = TimeBase::new();
        stutter.start_capture();
        let mut block = crate::dsp::block::StereoBlock::silence();
        stutter.update(&mut block, &time);
        stutter.end_capture(false);

        preset.note_func_edge(true, &time);
        preset.note_func_edge(false, &time);
        // A few samples later, well within the debounce window.
        time.increment_samples(10);
        preset.handle_button_press(1, &stutter, &time);
        assert!(preset.slots[1].exists);
    }
}
