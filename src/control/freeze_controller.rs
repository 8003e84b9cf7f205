//! Translates button edges into Freeze's scheduling primitives. Same policy
//! shape as [`super::choke_controller::ChokeController`] (`SPEC_FULL.md`
//! §4.7 describes the two as "identical shape").

use super::feedback::{gamma_ramp_brightness, wait_progress};
use super::{Command, CommandKind};
use crate::dsp::effects::{EffectId, Freeze, QuantizeMode};
use crate::dsp::util::effect_trait::Effect;
use crate::external::LedOutput;
use crate::settings::Subdivision;
use crate::time_base::TimeBase;
use std::cell::Cell;

pub struct FreezeController {
    lookahead_samples: u32,
    armed_duration: Cell<u32>,
}

impl FreezeController {
    pub fn new(lookahead_samples: u32) -> Self {
        Self { lookahead_samples, armed_duration: Cell::new(0) }
    }

    pub fn handle_command(
        &self,
        cmd: Command,
        freeze: &Freeze,
        time: &TimeBase,
        subdivision: Subdivision,
    ) {
        match cmd.kind {
            CommandKind::EnableEffect => self.on_press(freeze, time, subdivision),
            CommandKind::DisableEffect => self.on_release(freeze),
            CommandKind::ToggleEffect => freeze.toggle(),
            CommandKind::SetParameter => Self::set_parameter(freeze, cmd),
        }
    }

    fn on_press(&self, freeze: &Freeze, time: &TimeBase, subdivision: Subdivision) {
        match (freeze.onset_mode(), freeze.length_mode()) {
            (QuantizeMode::Free, QuantizeMode::Free) => freeze.enable(),
            (QuantizeMode::Free, QuantizeMode::Quantized) => {
                freeze.enable();
                let dur = subdivision.duration_samples(time.samples_per_beat()) as u64;
                freeze.schedule_release(time.sample_position() + dur);
            }
            (QuantizeMode::Quantized, QuantizeMode::Free) => {
                let dist = time.samples_to_next_subdivision(subdivision);
                self.armed_duration.set(dist);
                let target = time.sample_position() + dist as u64;
                let target = target.saturating_sub(self.lookahead_samples as u64).max(1);
                freeze.schedule_onset(target);
            }
            (QuantizeMode::Quantized, QuantizeMode::Quantized) => {
                let dist = time.samples_to_next_subdivision(subdivision);
                self.armed_duration.set(dist);
                let onset = time.sample_position() + dist as u64;
                let onset = onset.saturating_sub(self.lookahead_samples as u64).max(1);
                let dur = subdivision.duration_samples(time.samples_per_beat()) as u64;
                freeze.schedule_onset(onset);
                freeze.schedule_release(onset + dur);
            }
        }
    }

    fn on_release(&self, freeze: &Freeze) {
        match (freeze.onset_mode(), freeze.length_mode()) {
            (QuantizeMode::Free, QuantizeMode::Free) => freeze.disable(),
            (QuantizeMode::Free, QuantizeMode::Quantized) => {}
            (QuantizeMode::Quantized, QuantizeMode::Free) => {
                if freeze.onset_pending() {
                    freeze.cancel_scheduled_onset();
                } else {
                    freeze.disable();
                }
            }
            (QuantizeMode::Quantized, QuantizeMode::Quantized) => {}
        }
    }

    fn set_parameter(freeze: &Freeze, cmd: Command) {
        let mode = if cmd.value >= 0.5 { QuantizeMode::Quantized } else { QuantizeMode::Free };
        match cmd.param1 {
            0 => freeze.set_onset_mode(mode),
            _ => freeze.set_length_mode(mode),
        }
    }

    pub fn update_leds(&self, freeze: &Freeze, time: &TimeBase, leds: &mut dyn LedOutput) {
        let brightness = if freeze.is_enabled() {
            1.0
        } else if freeze.onset_pending() {
            let remaining = time.samples_to_next_subdivision(Subdivision::Sixteenth);
            gamma_ramp_brightness(wait_progress(self.armed_duration.get(), remaining))
        } else {
            0.0
        };
        leds.set_brightness(EffectId::Freeze, brightness);
    }
}
