//! The effect registry: a fixed-capacity `EffectId -> node` map populated
//! once at startup and immutable thereafter.
//!
//! Grounded on the reference engine's `dsp/fx/fx_bank.rs` (`FXBank`): same
//! fixed-array-of-`Option` shape, same O(N) linear lookup over a tiny `N`.
//! Unlike `FXBank`, slots are keyed by a stable [`EffectId`] rather than by
//! insertion order, since the registry's contract is "look up *this*
//! effect", not "chain whatever's been pushed so far". Slots hold
//! `Arc<dyn Effect>` rather than `Box<dyn Effect>`: the control thread keeps
//! its own concrete `Arc<Choke>`/`Arc<Freeze>`/`Arc<Stutter>` handles onto
//! the *same* instances (to reach effect-specific controller methods), while
//! the registry only ever needs the generic `Effect` surface for dispatch
//! and feedback. See `DESIGN.md`.

use crate::dsp::block::StereoBlock;
use crate::dsp::effects::EffectId;
use crate::dsp::util::effect_trait::Effect;
use crate::error::RegistryError;
use crate::settings::MAX_EFFECTS;
use crate::time_base::TimeBase;
use std::sync::Arc;

struct Slot {
    id: EffectId,
    node: Arc<dyn Effect>,
}

/// Holds every performer-addressable effect. Registration happens once
/// during setup, before the audio interrupt or input contexts start; after
/// that the slot array itself is never mutated, only the effects' own
/// interior atomic state.
pub struct EffectRegistry {
    slots: Vec<Slot>,
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self { slots: Vec::with_capacity(MAX_EFFECTS) }
    }

    /// Registers an effect under `id`. Only valid during setup.
    pub fn register(&mut self, id: EffectId, node: Arc<dyn Effect>) -> Result<(), RegistryError> {
        if self.slots.iter().any(|s| s.id == id) {
            return Err(RegistryError::DuplicateId(id));
        }
        if self.slots.len() >= MAX_EFFECTS {
            return Err(RegistryError::Overflow);
        }
        self.slots.push(Slot { id, node });
        Ok(())
    }

    pub fn get(&self, id: EffectId) -> Option<&Arc<dyn Effect>> {
        self.slots.iter().find(|s| s.id == id).map(|s| &s.node)
    }

    /// Enables, disables, or toggles the named effect. Used by the control
    /// thread to dispatch a drained [`crate::control::Command`].
    pub fn enable(&self, id: EffectId) {
        if let Some(e) = self.get(id) {
            e.enable();
        }
    }

    pub fn disable(&self, id: EffectId) {
        if let Some(e) = self.get(id) {
            e.disable();
        }
    }

    pub fn toggle(&self, id: EffectId) {
        if let Some(e) = self.get(id) {
            e.toggle();
        }
    }

    pub fn is_enabled(&self, id: EffectId) -> bool {
        self.get(id).map(|e| e.is_enabled()).unwrap_or(false)
    }

    /// Bitmask of currently engaged effects, one bit per registration order.
    pub fn enabled_mask(&self) -> u32 {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.node.is_enabled())
            .fold(0u32, |mask, (i, _)| mask | (1 << i))
    }

    /// Runs every registered effect's `update` on `block`, in registration
    /// order, chaining output to input — the signal path is Choke then
    /// Freeze then Stutter (or whatever order was registered).
    pub fn process_block(&self, block: &mut StereoBlock, time: &TimeBase) {
        for slot in &self.slots {
            slot.node.update(block, time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::effects::Choke;
    use crate::settings::CHOKE_RAMP_SAMPLES;

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut reg = EffectRegistry::new();
        reg.register(EffectId::Choke, Arc::new(Choke::new(CHOKE_RAMP_SAMPLES))).unwrap();
        let err = reg.register(EffectId::Choke, Arc::new(Choke::new(CHOKE_RAMP_SAMPLES)));
        assert!(matches!(err, Err(RegistryError::DuplicateId(EffectId::Choke))));
    }

    #[test]
    fn dispatch_reaches_the_right_effect() {
        let mut reg = EffectRegistry::new();
        reg.register(EffectId::Choke, Arc::new(Choke::new(CHOKE_RAMP_SAMPLES))).unwrap();
        reg.enable(EffectId::Choke);
        assert!(reg.is_enabled(EffectId::Choke));
        assert_eq!(reg.enabled_mask(), 0b1);
    }
}
