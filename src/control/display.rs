//! Selects the small display's current view by fixed priority (spec §4.9).

use crate::dsp::effects::{Choke, Freeze, Stutter};
use crate::dsp::util::effect_trait::Effect;
use crate::external::{DisplayBitmap, DisplayOutput, MenuDisplayData};

/// Owns the "is a menu showing" bit; effect activity is read fresh from the
/// effects each tick rather than mirrored here, so there is no state to go
/// stale.
pub struct DisplayManager {
    menu: Option<MenuDisplayData>,
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayManager {
    pub fn new() -> Self {
        Self { menu: None }
    }

    pub fn show_menu(&mut self, menu: MenuDisplayData) {
        self.menu = Some(menu);
    }

    pub fn hide_menu(&mut self) {
        self.menu = None;
    }

    pub fn menu_showing(&self) -> bool {
        self.menu.is_some()
    }

    /// Renders the current view: Choke, then Freeze, then any non-idle
    /// Stutter state, then a showing menu, then idle — in that priority
    /// order, every tick.
    pub fn update(
        &self,
        choke: &Choke,
        freeze: &Freeze,
        stutter: &Stutter,
        output: &mut dyn DisplayOutput,
    ) {
        if choke.is_enabled() {
            output.show_bitmap(DisplayBitmap::Choke);
        } else if freeze.is_enabled() {
            output.show_bitmap(DisplayBitmap::Freeze);
        } else if stutter.is_enabled() {
            output.show_bitmap(DisplayBitmap::Stutter);
        } else if let Some(menu) = &self.menu {
            output.show_menu(menu);
        } else {
            output.show_bitmap(DisplayBitmap::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CHOKE_RAMP_SAMPLES;

    struct RecordingOutput {
        bitmaps: Vec<DisplayBitmap>,
    }

    impl DisplayOutput for RecordingOutput {
        fn show_bitmap(&mut self, bitmap: DisplayBitmap) {
            self.bitmaps.push(bitmap);
        }
        fn show_menu(&mut self, _menu: &MenuDisplayData) {}
    }

    #[test]
    fn choke_takes_priority_over_everything() {
        let choke = Choke::new(CHOKE_RAMP_SAMPLES);
        choke.enable();
        let freeze = Freeze::new(512);
        freeze.enable();
        let stutter = Stutter::new(512);
        stutter.start_capture();

        let manager = DisplayManager::new();
        let mut out = RecordingOutput { bitmaps: Vec::new() };
        manager.update(&choke, &freeze, &stutter, &mut out);
        assert_eq!(out.bitmaps, vec![DisplayBitmap::Choke]);
    }

    #[test]
    fn idle_falls_back_to_idle_bitmap() {
        let choke = Choke::new(CHOKE_RAMP_SAMPLES);
        let freeze = Freeze::new(512);
        let stutter = Stutter::new(512);

        let manager = DisplayManager::new();
        let mut out = RecordingOutput { bitmaps: Vec::new() };
        manager.update(&choke, &freeze, &stutter, &mut out);
        assert_eq!(out.bitmaps, vec![DisplayBitmap::Idle]);
    }
}
