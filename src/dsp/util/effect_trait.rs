//! Trait for the engine's audio-processing effect nodes.

use crate::dsp::block::StereoBlock;
use crate::time_base::TimeBase;

/// Generic trait for a chainable stereo audio effect node.
///
/// Every method takes `&self`: the audio interrupt and the control thread
/// hold the *same* effect instance behind an `Arc` (spec §5 — the audio
/// interrupt is the sole writer of buffer contents and gain ramps, the
/// control thread is the sole writer of modes and scheduled-sample fields,
/// and `is_enabled`/`enable`/`disable` are shared atomics), so every
/// implementor reaches its non-atomic audio-thread-private state through
/// interior mutability rather than classic `&mut self` exclusivity. This
/// departs from the single-threaded, `Box<dyn Effect>`-owned chain the
/// reference engine's `Effect` trait was built for — see `DESIGN.md`.
pub trait Effect: Send + Sync + std::fmt::Debug {
    /// Engages the effect. For Choke this means "mute"; see `SPEC_FULL.md`
    /// §9 for why that polarity was chosen.
    fn enable(&self);

    /// Disengages the effect.
    fn disable(&self);

    /// Toggles the effect's enabled state.
    fn toggle(&self) {
        if self.is_enabled() {
            self.disable();
        } else {
            self.enable();
        }
    }

    fn is_enabled(&self) -> bool;

    /// Static identifier, used by the registry and visual feedback.
    fn name(&self) -> &'static str;

    /// Processes one audio block in place. Called once per block boundary
    /// by the audio interrupt; must check scheduled events before doing any
    /// block I/O (spec §5: "scheduled-event checks happen before block
    /// I/O").
    fn update(&self, block: &mut StereoBlock, time: &TimeBase);
}
