use std::collections::BTreeSet;

pub(crate) const HUE_STEP: f32 = 0.001;
pub(crate) const COLOR_STEP: f32 = 0.01;
pub(crate) const POINT_SIZE_STEP: f32 = 0.02;
pub(crate) const MIN_POINT_SIZE: f32 = 0.5;
pub(crate) const MAX_POINT_SIZE: f32 = 16.0;

/// Flags flipped by single key presses and read every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ToggleFlags {
    pub(crate) paused: bool,
    pub(crate) exploding: bool,
    pub(crate) spawning: bool,
    pub(crate) frozen_hue: bool,
}

/// Discrete key-press actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    TogglePause,
    Quit,
    ToggleExplode,
    ClearAttractors,
    ToggleFreezeHue,
    ToggleSpawn,
    Reset,
}

/// Controls that act every frame for as long as their key is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum HeldControl {
    Brighten,
    Darken,
    Saturate,
    Desaturate,
    RaiseValue,
    LowerValue,
    DollyIn,
    DollyOut,
    PanRight,
    PanLeft,
    GrowPoints,
    ShrinkPoints,
}

pub(crate) type HeldKeys = BTreeSet<HeldControl>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Palette {
    pub(crate) hue: f32,
    pub(crate) saturation: f32,
    pub(crate) value: f32,
    pub(crate) brightness: f32,
    pub(crate) point_size: f32,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            hue: 0.0,
            saturation: 0.6,
            value: 1.0,
            brightness: 0.0,
            point_size: 1.0,
        }
    }
}

impl Palette {
    pub(crate) fn advance_hue(&mut self, frozen: bool) {
        if frozen {
            return;
        }
        self.hue += HUE_STEP;
        if self.hue >= 1.0 {
            self.hue -= 1.0;
        }
    }

    /// Applies one frame of a held colour control. Camera controls are
    /// ignored here.
    pub(crate) fn hold(&mut self, control: HeldControl) {
        match control {
            HeldControl::Brighten => self.brightness = step(self.brightness, COLOR_STEP, 0.0, 1.0),
            HeldControl::Darken => self.brightness = step(self.brightness, -COLOR_STEP, 0.0, 1.0),
            HeldControl::Saturate => self.saturation = step(self.saturation, COLOR_STEP, 0.0, 1.0),
            HeldControl::Desaturate => {
                self.saturation = step(self.saturation, -COLOR_STEP, 0.0, 1.0)
            }
            HeldControl::RaiseValue => self.value = step(self.value, COLOR_STEP, 0.0, 1.0),
            HeldControl::LowerValue => self.value = step(self.value, -COLOR_STEP, 0.0, 1.0),
            HeldControl::GrowPoints => {
                self.point_size =
                    step(self.point_size, POINT_SIZE_STEP, MIN_POINT_SIZE, MAX_POINT_SIZE)
            }
            HeldControl::ShrinkPoints => {
                self.point_size =
                    step(self.point_size, -POINT_SIZE_STEP, MIN_POINT_SIZE, MAX_POINT_SIZE)
            }
            HeldControl::DollyIn
            | HeldControl::DollyOut
            | HeldControl::PanRight
            | HeldControl::PanLeft => {}
        }
    }
}

pub(crate) fn step(current: f32, delta: f32, min: f32, max: f32) -> f32 {
    (current + delta).clamp(min, max)
}
