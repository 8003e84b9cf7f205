//! Translates STUTTER button edges into the eight-state machine's
//! primitives. Same onset/length-mode shape as Choke/Freeze, but release
//! while waiting for a scheduled boundary never cancels (`SPEC_FULL.md`
//! §4.7): "let the boundary fire — the user's intent is capture/playback on
//! the grid no matter when I released."

use super::feedback::{gamma_ramp_brightness, wait_progress};
use super::{Command, CommandKind};
use crate::dsp::effects::{EffectId, QuantizeMode, Stutter, StutterState};
use crate::dsp::util::effect_trait::Effect;
use crate::external::LedOutput;
use crate::settings::Subdivision;
use crate::time_base::TimeBase;
use std::cell::Cell;

pub struct StutterController {
    lookahead_samples: u32,
    armed_duration: Cell<u32>,
}

impl StutterController {
    pub fn new(lookahead_samples: u32) -> Self {
        Self { lookahead_samples, armed_duration: Cell::new(0) }
    }

    pub fn handle_command(
        &self,
        cmd: Command,
        stutter: &Stutter,
        time: &TimeBase,
        subdivision: Subdivision,
    ) {
        match cmd.kind {
            CommandKind::EnableEffect => self.on_press(stutter, time, subdivision),
            CommandKind::DisableEffect => self.on_release(stutter, time, subdivision),
            CommandKind::ToggleEffect => stutter.toggle(),
            CommandKind::SetParameter => Self::set_parameter(stutter, cmd),
        }
    }

    fn on_press(&self, stutter: &Stutter, time: &TimeBase, subdivision: Subdivision) {
        match stutter.state() {
            StutterState::IdleNoLoop => match stutter.onset_mode() {
                QuantizeMode::Free => stutter.start_capture(),
                QuantizeMode::Quantized => {
                    let target = self.quantized_target(time, subdivision);
                    stutter.schedule_capture_start(target);
                }
            },
            StutterState::IdleWithLoop => match stutter.onset_mode() {
                QuantizeMode::Free => stutter.start_playback(),
                QuantizeMode::Quantized => {
                    let target = self.quantized_target(time, subdivision);
                    stutter.schedule_playback_onset(target);
                }
            },
            _ => {}
        }
    }

    fn on_release(&self, stutter: &Stutter, time: &TimeBase, subdivision: Subdivision) {
        match stutter.state() {
            StutterState::Capturing => match stutter.length_mode() {
                QuantizeMode::Free => stutter.end_capture(true),
                QuantizeMode::Quantized => {
                    let dur = subdivision.duration_samples(time.samples_per_beat()) as u64;
                    stutter.schedule_capture_end(time.sample_position() + dur, true);
                }
            },
            StutterState::Playing => match stutter.length_mode() {
                QuantizeMode::Free => stutter.stop_playback(),
                QuantizeMode::Quantized => {
                    let dur = subdivision.duration_samples(time.samples_per_beat()) as u64;
                    stutter.schedule_playback_length(time.sample_position() + dur);
                }
            },
            // WaitCaptureStart / WaitPlaybackOnset / WaitCaptureEnd /
            // WaitPlaybackLength: release before the boundary never cancels.
            _ => {}
        }
    }

    fn quantized_target(&self, time: &TimeBase, subdivision: Subdivision) -> u64 {
        let dist = time.samples_to_next_subdivision(subdivision);
        self.armed_duration.set(dist);
        (time.sample_position() + dist as u64).saturating_sub(self.lookahead_samples as u64).max(1)
    }

    fn set_parameter(stutter: &Stutter, cmd: Command) {
        let mode = if cmd.value >= 0.5 { QuantizeMode::Quantized } else { QuantizeMode::Free };
        match cmd.param1 {
            0 => stutter.set_onset_mode(mode),
            _ => stutter.set_length_mode(mode),
        }
    }

    pub fn update_leds(&self, stutter: &Stutter, time: &TimeBase, leds: &mut dyn LedOutput) {
        let brightness = match stutter.state() {
            StutterState::Playing | StutterState::Capturing => 1.0,
            StutterState::WaitCaptureStart
            | StutterState::WaitCaptureEnd
            | StutterState::WaitPlaybackOnset
            | StutterState::WaitPlaybackLength => {
                let remaining = time.samples_to_next_subdivision(Subdivision::Sixteenth);
                gamma_ramp_brightness(wait_progress(self.armed_duration.get(), remaining))
            }
            StutterState::IdleWithLoop => 0.3,
            StutterState::IdleNoLoop => 0.0,
        };
        leds.set_brightness(EffectId::Stutter, brightness);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_press_then_release_captures_and_starts_looping() {
        let controller = StutterController::new(0);
        let stutter = Stutter::new(4096);
        let time = TimeBase::new();

        let press = Command {
            kind: CommandKind::EnableEffect,
            target: EffectId::Stutter,
            param1: 0,
            value: 0.0,
        };
        controller.handle_command(press, &stutter, &time, Subdivision::Sixteenth);
        assert_eq!(stutter.state(), StutterState::Capturing);

        let release = Command { kind: CommandKind::DisableEffect, ..press };
        controller.handle_command(release, &stutter, &time, Subdivision::Sixteenth);
        assert_eq!(stutter.state(), StutterState::Playing);
    }

    #[test]
    fn release_during_wait_capture_start_does_not_cancel() {
        let controller = StutterController::new(0);
        let stutter = Stutter::new(4096);
        stutter.set_onset_mode(QuantizeMode::Quantized);
        let time = TimeBase::new();

        let press = Command {
            kind: CommandKind::EnableEffect,
            target: EffectId::Stutter,
            param1: 0,
            value: 0.0,
        };
        controller.handle_command(press, &stutter, &time, Subdivision::Sixteenth);
        assert_eq!(stutter.state(), StutterState::WaitCaptureStart);

        let release = Command { kind: CommandKind::DisableEffect, ..press };
        controller.handle_command(release, &stutter, &time, Subdivision::Sixteenth);
        assert_eq!(stutter.state(), StutterState::WaitCaptureStart);
    }
}
