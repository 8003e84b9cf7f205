//! The control thread: drains the clock, event, and command rings, owns the
//! effect registry, the per-effect controllers, the display manager, and
//! the preset controller, and is invoked periodically (spec: ~2 ms) by
//! whatever host drives it.
//!
//! Grounded on the reference engine's `app/params/updater.rs`
//! (`ParameterUpdater`): a periodic tick function that drains channels and
//! fans work out to a handful of owned subsystems, paired with
//! `util/timer.rs`'s `TimerThread` for the actual periodic invocation.

pub mod choke_controller;
pub mod display;
pub mod feedback;
pub mod freeze_controller;
pub mod preset;
pub mod stutter_controller;

pub use choke_controller::ChokeController;
pub use display::DisplayManager;
pub use freeze_controller::FreezeController;
pub use preset::PresetController;
pub use stutter_controller::StutterController;

use crate::dsp::effects::{Choke, EffectId, Freeze, Stutter, StutterState};
use crate::dsp::registry::EffectRegistry;
use crate::dsp::util::effect_trait::Effect;
use crate::external::{DisplayOutput, FileStore, LedOutput, TransportEvent};
use crate::settings::{EngineConfig, Subdivision};
use crate::time_base::TimeBase;
use crate::util::ring::SpscRing;
use std::sync::Arc;
use tracing::{debug, warn};

/// A command emitted by the input layer (spec §3.4). `EnableEffect` and
/// `DisableEffect` correspond to a momentary control's press/release edges;
/// `ToggleEffect` is for latching controls; `SetParameter` carries
/// quantization-mode and grid changes via `param1`/`value`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub target: EffectId,
    pub param1: u8,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    EnableEffect,
    DisableEffect,
    ToggleEffect,
    /// `param1 == 0` sets onset mode, `param1 == 1` sets length mode
    /// (`value >= 0.5` selects Quantized), and `param1 == 2` changes the
    /// global subdivision grid (`value` is the `Subdivision` ordinal),
    /// regardless of `target` — the grid is process-wide (spec §4.6).
    SetParameter,
}

/// Default-constructible placeholder so `SpscRing<Command>` can zero-fill
/// its backing array.
impl Default for Command {
    fn default() -> Self {
        Self { kind: CommandKind::ToggleEffect, target: EffectId::Choke, param1: 0, value: 0.0 }
    }
}

impl Default for CommandKind {
    fn default() -> Self {
        Self::ToggleEffect
    }
}

fn subdivision_from_ordinal(value: f32) -> Subdivision {
    match value.round() as i32 {
        0 => Subdivision::ThirtySecond,
        1 => Subdivision::Sixteenth,
        2 => Subdivision::Eighth,
        _ => Subdivision::Quarter,
    }
}

/// Owns every control-plane subsystem and advances them once per tick.
///
/// Holds concrete `Arc<Choke>` / `Arc<Freeze>` / `Arc<Stutter>` handles
/// alongside the type-erased [`EffectRegistry`]: the registry's `Arc<dyn
/// Effect>` slots are clones of these same instances (spec §5 — the audio
/// interrupt and the control thread share ownership of each effect), used
/// for generic dispatch (toggle, enabled mask, display priority), while
/// these concrete handles let each controller reach effect-specific
/// scheduling methods the generic trait doesn't expose.
pub struct ControlThread {
    pub time_base: Arc<TimeBase>,
    pub registry: Arc<EffectRegistry>,
    pub choke: Arc<Choke>,
    pub freeze: Arc<Freeze>,
    pub stutter: Arc<Stutter>,

    pub choke_controller: ChokeController,
    pub freeze_controller: FreezeController,
    pub stutter_controller: StutterController,
    pub display: DisplayManager,
    pub preset: PresetController,

    clock_queue: Arc<SpscRing<u32>>,
    event_queue: Arc<SpscRing<u32>>,
    command_queue: Arc<SpscRing<Command>>,

    config: EngineConfig,
    subdivision: Subdivision,
    last_clock_micros: Option<u32>,
    last_stutter_state: StutterState,
}

impl ControlThread {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        time_base: Arc<TimeBase>,
        choke: Arc<Choke>,
        freeze: Arc<Freeze>,
        stutter: Arc<Stutter>,
        clock_queue: Arc<SpscRing<u32>>,
        event_queue: Arc<SpscRing<u32>>,
        command_queue: Arc<SpscRing<Command>>,
        file_store: Box<dyn FileStore>,
        config: EngineConfig,
    ) -> Result<Self, crate::error::RegistryError> {
        let mut registry = EffectRegistry::new();
        let choke_dyn: Arc<dyn Effect> = choke.clone();
        let freeze_dyn: Arc<dyn Effect> = freeze.clone();
        let stutter_dyn: Arc<dyn Effect> = stutter.clone();
        registry.register(EffectId::Choke, choke_dyn)?;
        registry.register(EffectId::Freeze, freeze_dyn)?;
        registry.register(EffectId::Stutter, stutter_dyn)?;
        let registry = Arc::new(registry);

        let subdivision = config.default_subdivision;
        Ok(Self {
            time_base,
            registry,
            choke,
            freeze,
            stutter,
            choke_controller: ChokeController::new(config.quantize_lookahead_samples),
            freeze_controller: FreezeController::new(config.quantize_lookahead_samples),
            stutter_controller: StutterController::new(config.quantize_lookahead_samples),
            display: DisplayManager::new(),
            preset: PresetController::new(file_store),
            clock_queue,
            event_queue,
            command_queue,
            config,
            subdivision,
            last_clock_micros: None,
            last_stutter_state: StutterState::IdleNoLoop,
        })
    }

    /// One control-thread tick: drain every ring, update the tempo
    /// estimate, dispatch commands, and refresh visual feedback. Intended
    /// to be called on a ~2 ms cadence (`EngineConfig::control_tick_secs`).
    pub fn tick(&mut self, leds: &mut dyn LedOutput, display: &mut dyn DisplayOutput) {
        self.drain_clock_queue();
        self.drain_event_queue();
        self.drain_command_queue();
        self.notify_capture_complete();
        self.refresh_feedback(leds, display);
    }

    fn drain_clock_queue(&mut self) {
        while let Some(timestamp_micros) = self.clock_queue.pop() {
            if let Some(prev) = self.last_clock_micros {
                let period = timestamp_micros.wrapping_sub(prev);
                if !self.time_base.sync_to_musical_clock(
                    period,
                    self.config.sample_rate_hz,
                    crate::settings::TEMPO_EMA_ALPHA,
                ) {
                    warn!(period, "rejected out-of-range tempo estimate");
                }
            }
            self.last_clock_micros = Some(timestamp_micros);
            self.time_base.increment_tick();
        }
    }

    fn drain_event_queue(&mut self) {
        while let Some(raw) = self.event_queue.pop() {
            let event = match raw {
                0 => TransportEvent::Start,
                1 => TransportEvent::Stop,
                _ => TransportEvent::Continue,
            };
            match event {
                TransportEvent::Start => {
                    self.time_base.reset();
                    self.time_base.set_transport_state(crate::time_base::TransportState::Playing);
                    debug!("transport start");
                }
                TransportEvent::Stop => {
                    self.time_base.set_transport_state(crate::time_base::TransportState::Stopped);
                    debug!("transport stop");
                }
                TransportEvent::Continue => {
                    self.time_base.set_transport_state(crate::time_base::TransportState::Playing);
                    debug!("transport continue");
                }
            }
        }
    }

    fn drain_command_queue(&mut self) {
        while let Some(cmd) = self.command_queue.pop() {
            if cmd.kind == CommandKind::SetParameter && cmd.param1 == 2 {
                self.subdivision = subdivision_from_ordinal(cmd.value);
                continue;
            }

            match cmd.target {
                EffectId::FuncModifier => {
                    self.preset.note_func_edge(cmd.kind == CommandKind::EnableEffect, &self.time_base);
                }
                EffectId::Choke => {
                    self.choke_controller.handle_command(
                        cmd,
                        &self.choke,
                        &self.time_base,
                        self.subdivision,
                    );
                }
                EffectId::Freeze => {
                    self.freeze_controller.handle_command(
                        cmd,
                        &self.freeze,
                        &self.time_base,
                        self.subdivision,
                    );
                }
                EffectId::Stutter => {
                    self.stutter_controller.handle_command(
                        cmd,
                        &self.stutter,
                        &self.time_base,
                        self.subdivision,
                    );
                }
            }
        }
    }

    /// Entry point for the four dedicated preset-slot keys. These are
    /// distinct physical controls from the three effect keys and a FUNC
    /// modifier (spec §4.10, §6.3); they are not carried through
    /// [`Command`] because they address the preset controller directly
    /// rather than an [`EffectId`].
    pub fn handle_preset_key_press(&mut self, slot: u8) {
        self.preset.handle_button_press(slot, &self.stutter, &self.time_base);
    }

    /// Detects a Stutter transition out of an active capture into idle or
    /// playback and tells the preset controller the resulting loop is a
    /// scratch capture, not bound to any preset slot (spec §4.10).
    fn notify_capture_complete(&mut self) {
        let current = self.stutter.state();
        let was_capturing =
            matches!(self.last_stutter_state, StutterState::Capturing | StutterState::WaitCaptureEnd);
        let now_settled =
            matches!(current, StutterState::IdleWithLoop | StutterState::Playing | StutterState::IdleNoLoop);
        if was_capturing && now_settled {
            self.preset.on_capture_complete();
        }
        self.last_stutter_state = current;
    }

    fn refresh_feedback(&mut self, leds: &mut dyn LedOutput, display: &mut dyn DisplayOutput) {
        let beat = self.time_base.poll_beat_flag();
        self.display.update(&self.choke, &self.freeze, &self.stutter, display);
        self.choke_controller.update_leds(&self.choke, &self.time_base, leds);
        self.freeze_controller.update_leds(&self.freeze, &self.time_base, leds);
        self.stutter_controller.update_leds(&self.stutter, &self.time_base, leds);
        self.preset.update_leds(leds, beat);
    }

    pub fn default_subdivision(&self) -> Subdivision {
        self.config.default_subdivision
    }

    pub fn subdivision(&self) -> Subdivision {
        self.subdivision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PresetError;
    use crate::external::{DisplayBitmap, MenuDisplayData};
    use crate::settings::CHOKE_RAMP_SAMPLES;

    struct NullFileStore;
    impl FileStore for NullFileStore {
        fn save(&mut self, _slot: u8, _left: &[i16], _right: &[i16]) -> Result<(), PresetError> {
            Ok(())
        }
        fn load(&mut self, slot: u8, _capacity: usize) -> Result<(Vec<i16>, Vec<i16>), PresetError> {
            Err(PresetError::NotFound(slot))
        }
        fn delete(&mut self, _slot: u8) -> Result<(), PresetError> {
            Ok(())
        }
        fn exists(&self, _slot: u8) -> bool {
            false
        }
    }

    struct NullLeds;
    impl LedOutput for NullLeds {
        fn set_brightness(&mut self, _key: EffectId, _brightness: f32) {}
        fn set_preset_brightness(&mut self, _slot: u8, _brightness: f32) {}
    }

    struct NullDisplay;
    impl DisplayOutput for NullDisplay {
        fn show_bitmap(&mut self, _bitmap: DisplayBitmap) {}
        fn show_menu(&mut self, _menu: &MenuDisplayData) {}
    }

    fn build() -> ControlThread {
        ControlThread::new(
            Arc::new(TimeBase::new()),
            Arc::new(Choke::new(CHOKE_RAMP_SAMPLES)),
            Arc::new(Freeze::new(512)),
            Arc::new(Stutter::new(4096)),
            Arc::new(SpscRing::new(16)),
            Arc::new(SpscRing::new(16)),
            Arc::new(SpscRing::new(16)),
            Box::new(NullFileStore),
            EngineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn command_dispatch_reaches_the_concrete_choke() {
        let mut ct = build();
        ct.command_queue.push(Command {
            kind: CommandKind::EnableEffect,
            target: EffectId::Choke,
            param1: 0,
            value: 0.0,
        });
        ct.tick(&mut NullLeds, &mut NullDisplay);
        assert!(ct.choke.is_enabled());
        assert!(ct.registry.is_enabled(EffectId::Choke));
    }

    #[test]
    fn set_parameter_changes_global_subdivision() {
        let mut ct = build();
        ct.command_queue.push(Command {
            kind: CommandKind::SetParameter,
            target: EffectId::Choke,
            param1: 2,
            value: 3.0,
        });
        ct.tick(&mut NullLeds, &mut NullDisplay);
        assert_eq!(ct.subdivision(), Subdivision::Quarter);
    }
}
