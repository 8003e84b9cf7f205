//! The audio-interrupt side of the engine: the hard-real-time block loop
//! that spec §3 and §5 describe but that, by design, has no subsystem of
//! its own to own — it is invoked once per `BLOCK_SIZE`-sample block by
//! whatever host drives the sample-rate clock.
//!
//! Grounded on the teacher's `app/audio/process.rs` (`process`): a bare
//! function over the audio-side state and the current buffer, called once
//! per callback by nannou_audio rather than a struct running its own loop.
//! [`AudioEngine`] plays the same role as the teacher's `AudioModel` — the
//! audio-side state bundle the callback closes over — but here that bundle
//! is exactly the three pieces spec §5 names: the block source, the
//! sample-counter tap, and the effect chain.

use crate::dsp::effects::Timekeeper;
use crate::dsp::registry::EffectRegistry;
use crate::dsp::util::effect_trait::Effect;
use crate::external::BlockAllocator;
use crate::time_base::TimeBase;
use std::sync::Arc;

/// Owns the audio-interrupt-side handles: the block source, the shared time
/// base, and the effect registry. `registry` is the same [`Arc`] the control
/// thread holds (spec §5 — both contexts share ownership of the effect
/// chain; only the audio interrupt ever calls [`EffectRegistry::process_block`]).
pub struct AudioEngine {
    allocator: Box<dyn BlockAllocator>,
    timekeeper: Timekeeper,
    registry: Arc<EffectRegistry>,
    time_base: Arc<TimeBase>,
}

impl AudioEngine {
    pub fn new(
        allocator: Box<dyn BlockAllocator>,
        registry: Arc<EffectRegistry>,
        time_base: Arc<TimeBase>,
    ) -> Self {
        Self { allocator, timekeeper: Timekeeper, registry, time_base }
    }

    /// Runs one block: pulls a block from the allocator, advances the
    /// sample counter, chains it through every registered effect in order
    /// (Choke, then Freeze, then Stutter), and hands the block back.
    ///
    /// Returns `false` if the allocator had nothing to give this call —
    /// the caller's interrupt period ran dry, not an error condition on
    /// its own.
    pub fn process_block(&self) -> bool {
        let Some(mut block) = self.allocator.allocate() else {
            return false;
        };
        self.timekeeper.update(&mut block, &self.time_base);
        self.registry.process_block(&mut block, &self.time_base);
        self.allocator.release(block);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::block::StereoBlock;
    use crate::dsp::effects::{Choke, EffectId};
    use crate::settings::{BLOCK_SIZE, CHOKE_RAMP_SAMPLES};
    use std::cell::Cell;

    struct CountingAllocator {
        remaining: Cell<u32>,
    }

    impl BlockAllocator for CountingAllocator {
        fn allocate(&self) -> Option<StereoBlock> {
            let n = self.remaining.get();
            if n == 0 {
                return None;
            }
            self.remaining.set(n - 1);
            Some(StereoBlock::from_fn(|i| (i as i16, i as i16)))
        }

        fn release(&self, _block: StereoBlock) {}
    }

    fn build(remaining: u32) -> (AudioEngine, Arc<EffectRegistry>, Arc<TimeBase>) {
        let time_base = Arc::new(TimeBase::new());
        let mut reg = EffectRegistry::new();
        let choke: Arc<dyn Effect> = Arc::new(Choke::new(CHOKE_RAMP_SAMPLES));
        reg.register(EffectId::Choke, choke).unwrap();
        let registry = Arc::new(reg);
        let allocator = Box::new(CountingAllocator { remaining: Cell::new(remaining) });
        let engine = AudioEngine::new(allocator, registry.clone(), time_base.clone());
        (engine, registry, time_base)
    }

    #[test]
    fn advances_sample_position_once_per_block() {
        let (engine, _registry, time_base) = build(3);
        assert!(engine.process_block());
        assert_eq!(time_base.sample_position(), BLOCK_SIZE as u64);
        assert!(engine.process_block());
        assert_eq!(time_base.sample_position(), 2 * BLOCK_SIZE as u64);
    }

    #[test]
    fn an_exhausted_allocator_is_not_an_error() {
        let (engine, _registry, _time_base) = build(0);
        assert!(!engine.process_block());
    }

    #[test]
    fn chained_effects_see_the_time_base_the_timekeeper_just_advanced() {
        let (engine, registry, time_base) = build(1);
        registry.enable(EffectId::Choke);
        assert!(engine.process_block());
        // Choke ramps to silence over CHOKE_RAMP_SAMPLES; by the time the
        // ramp completes sample_position reflects the timekeeper's advance.
        assert!(time_base.sample_position() >= BLOCK_SIZE as u64);
    }
}
