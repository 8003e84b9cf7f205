//! Translates button edges into Choke's scheduling primitives per the
//! quantized-scheduling policy table (`SPEC_FULL.md` §4.7).

use super::feedback::{gamma_ramp_brightness, wait_progress};
use super::{Command, CommandKind};
use crate::dsp::effects::{Choke, EffectId, QuantizeMode};
use crate::dsp::util::effect_trait::Effect;
use crate::external::LedOutput;
use crate::settings::Subdivision;
use crate::time_base::TimeBase;
use std::cell::Cell;

pub struct ChokeController {
    lookahead_samples: u32,
    armed_duration: Cell<u32>,
}

impl ChokeController {
    pub fn new(lookahead_samples: u32) -> Self {
        Self { lookahead_samples, armed_duration: Cell::new(0) }
    }

    pub fn handle_command(
        &self,
        cmd: Command,
        choke: &Choke,
        time: &TimeBase,
        subdivision: Subdivision,
    ) {
        match cmd.kind {
            CommandKind::EnableEffect => self.on_press(choke, time, subdivision),
            CommandKind::DisableEffect => self.on_release(choke),
            CommandKind::ToggleEffect => choke.toggle(),
            CommandKind::SetParameter => Self::set_parameter(choke, cmd),
        }
    }

    fn on_press(&self, choke: &Choke, time: &TimeBase, subdivision: Subdivision) {
        match (choke.onset_mode(), choke.length_mode()) {
            (QuantizeMode::Free, QuantizeMode::Free) => choke.enable(),
            (QuantizeMode::Free, QuantizeMode::Quantized) => {
                choke.enable();
                let dur = subdivision.duration_samples(time.samples_per_beat()) as u64;
                choke.schedule_release(time.sample_position() + dur);
            }
            (QuantizeMode::Quantized, QuantizeMode::Free) => {
                let dist = time.samples_to_next_subdivision(subdivision);
                self.armed_duration.set(dist);
                let target = time.sample_position() + dist as u64;
                let target = target.saturating_sub(self.lookahead_samples as u64).max(1);
                choke.schedule_onset(target);
            }
            (QuantizeMode::Quantized, QuantizeMode::Quantized) => {
                let dist = time.samples_to_next_subdivision(subdivision);
                self.armed_duration.set(dist);
                let onset = time.sample_position() + dist as u64;
                let onset = onset.saturating_sub(self.lookahead_samples as u64).max(1);
                let dur = subdivision.duration_samples(time.samples_per_beat()) as u64;
                choke.schedule_onset(onset);
                choke.schedule_release(onset + dur);
            }
        }
    }

    fn on_release(&self, choke: &Choke) {
        match (choke.onset_mode(), choke.length_mode()) {
            (QuantizeMode::Free, QuantizeMode::Free) => choke.disable(),
            (QuantizeMode::Free, QuantizeMode::Quantized) => {
                // Auto-releases via the scheduled release; nothing to do.
            }
            (QuantizeMode::Quantized, QuantizeMode::Free) => {
                if choke.onset_pending() {
                    choke.cancel_scheduled_onset();
                } else {
                    choke.disable();
                }
            }
            (QuantizeMode::Quantized, QuantizeMode::Quantized) => {
                // Ignored: the scheduled release already governs the length.
            }
        }
    }

    fn set_parameter(choke: &Choke, cmd: Command) {
        let mode = if cmd.value >= 0.5 { QuantizeMode::Quantized } else { QuantizeMode::Free };
        match cmd.param1 {
            0 => choke.set_onset_mode(mode),
            _ => choke.set_length_mode(mode),
        }
    }

    pub fn update_leds(&self, choke: &Choke, time: &TimeBase, leds: &mut dyn LedOutput) {
        let brightness = if choke.is_enabled() {
            1.0
        } else if choke.onset_pending() {
            let remaining = time.samples_to_next_subdivision(Subdivision::Sixteenth);
            gamma_ramp_brightness(wait_progress(self.armed_duration.get(), remaining))
        } else {
            0.0
        };
        leds.set_brightness(EffectId::Choke, brightness);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CHOKE_RAMP_SAMPLES;

    #[test]
    fn free_onset_free_length_presses_and_releases_immediately() {
        let controller = ChokeController::new(0);
        let choke = Choke::new(CHOKE_RAMP_SAMPLES);
        let time = TimeBase::new();

        let press = Command {
            kind: CommandKind::EnableEffect,
            target: EffectId::Choke,
            param1: 0,
            value: 0.0,
        };
        controller.handle_command(press, &choke, &time, Subdivision::Sixteenth);
        assert!(choke.is_enabled());

        let release = Command { kind: CommandKind::DisableEffect, ..press };
        controller.handle_command(release, &choke, &time, Subdivision::Sixteenth);
        assert!(!choke.is_enabled());
    }

    #[test]
    fn quantized_onset_free_length_cancels_on_early_release() {
        let controller = ChokeController::new(0);
        let choke = Choke::new(CHOKE_RAMP_SAMPLES);
        choke.set_onset_mode(QuantizeMode::Quantized);
        let time = TimeBase::new();

        let press = Command {
            kind: CommandKind::EnableEffect,
            target: EffectId::Choke,
            param1: 0,
            value: 0.0,
        };
        controller.handle_command(press, &choke, &time, Subdivision::Sixteenth);
        assert!(choke.onset_pending());

        let release = Command { kind: CommandKind::DisableEffect, ..press };
        controller.handle_command(release, &choke, &time, Subdivision::Sixteenth);
        assert!(!choke.onset_pending());
        assert!(!choke.is_enabled());
    }
}
