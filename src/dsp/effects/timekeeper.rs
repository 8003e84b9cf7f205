//! A passthrough audio node whose only job is to advance the sample
//! counter. Grounded on `original_source/include/audio_timekeeper.h`'s
//! `AudioTimeKeeper`, which does the same thing as the first stage of its
//! audio graph so that every downstream effect sees an already-advanced
//! `samplePosition`.

use crate::dsp::block::StereoBlock;
use crate::dsp::util::effect_trait::Effect;
use crate::settings::BLOCK_SIZE;
use crate::time_base::TimeBase;

#[derive(Debug, Clone)]
pub struct Timekeeper;

impl Effect for Timekeeper {
    fn enable(&self) {}
    fn disable(&self) {}
    fn is_enabled(&self) -> bool {
        true
    }
    fn name(&self) -> &'static str {
        "timekeeper"
    }

    fn update(&self, _block: &mut StereoBlock, time: &TimeBase) {
        time.increment_samples(BLOCK_SIZE as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_sample_position_by_one_block() {
        let time = TimeBase::new();
        let tk = Timekeeper;
        let mut block = StereoBlock::silence();
        tk.update(&mut block, &time);
        assert_eq!(time.sample_position(), BLOCK_SIZE as u64);
    }
}
