//! Active selection state and the input commands that change it.

use winit::keyboard::KeyCode;

use crate::demos::DemoType;

/// The mip level, demo mode and texture preset currently selected.
///
/// Every field changes only through the transition methods, which clamp or
/// wrap out-of-range requests and report whether anything changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    mip_level: u32,
    mip_level_count: u32,
    demo: DemoType,
    preset: usize,
    preset_count: usize,
}

impl Selection {
    pub fn new(mip_level_count: u32, preset_count: usize, demo: DemoType) -> Self {
        Self {
            mip_level: 0,
            mip_level_count: mip_level_count.max(1),
            demo,
            preset: 0,
            preset_count: preset_count.max(1),
        }
    }

    pub fn mip_level(&self) -> u32 {
        self.mip_level
    }

    pub fn mip_level_count(&self) -> u32 {
        self.mip_level_count
    }

    pub fn demo(&self) -> DemoType {
        self.demo
    }

    pub fn preset(&self) -> usize {
        self.preset
    }

    pub fn preset_count(&self) -> usize {
        self.preset_count
    }

    /// Clamp `level` into the chain; `false` if the clamped level is the current one.
    pub fn set_mip_level(&mut self, level: i64) -> bool {
        let level = level.clamp(0, i64::from(self.mip_level_count) - 1) as u32;
        if level == self.mip_level {
            return false;
        }
        self.mip_level = level;
        log::info!("mip level: {}", level);
        true
    }

    pub fn next_mip_level(&mut self) -> bool {
        self.set_mip_level(i64::from(self.mip_level) + 1)
    }

    pub fn previous_mip_level(&mut self) -> bool {
        self.set_mip_level(i64::from(self.mip_level) - 1)
    }

    pub fn select_demo(&mut self, demo: DemoType) -> bool {
        if demo == self.demo {
            return false;
        }
        self.demo = demo;
        log::info!("demo: {}", demo);
        true
    }

    /// Select a preset by position, wrapping around the list.
    pub fn set_preset(&mut self, preset: usize) -> bool {
        let preset = preset % self.preset_count;
        if preset == self.preset {
            return false;
        }
        self.preset = preset;
        true
    }

    pub fn next_preset(&mut self) -> bool {
        self.set_preset(self.preset + 1)
    }

    pub fn previous_preset(&mut self) -> bool {
        self.set_preset(self.preset + self.preset_count - 1)
    }

    /// Track a preset list that grew or shrank, keeping the selection in range.
    pub fn set_preset_count(&mut self, preset_count: usize) {
        self.preset_count = preset_count.max(1);
        self.preset = self.preset.min(self.preset_count - 1);
    }
}

/// A discrete input event understood by the voxel demo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemoCommand {
    /// Select the demo with this ordinal.
    SelectDemo(usize),
    NextMipLevel,
    PreviousMipLevel,
    NextTexture,
    PreviousTexture,
}

impl DemoCommand {
    /// Digits select a demo, `.`/`,` step the level and `;`/`'` the texture.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '1'..='9' => Some(DemoCommand::SelectDemo(c as usize - '1' as usize)),
            '.' => Some(DemoCommand::NextMipLevel),
            ',' => Some(DemoCommand::PreviousMipLevel),
            ';' => Some(DemoCommand::NextTexture),
            '\'' => Some(DemoCommand::PreviousTexture),
            _ => None,
        }
    }

    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        let c = match code {
            KeyCode::Digit1 | KeyCode::Numpad1 => '1',
            KeyCode::Digit2 | KeyCode::Numpad2 => '2',
            KeyCode::Digit3 | KeyCode::Numpad3 => '3',
            KeyCode::Digit4 | KeyCode::Numpad4 => '4',
            KeyCode::Digit5 | KeyCode::Numpad5 => '5',
            KeyCode::Digit6 | KeyCode::Numpad6 => '6',
            KeyCode::Digit7 | KeyCode::Numpad7 => '7',
            KeyCode::Digit8 | KeyCode::Numpad8 => '8',
            KeyCode::Digit9 | KeyCode::Numpad9 => '9',
            KeyCode::Period => '.',
            KeyCode::Comma => ',',
            KeyCode::Semicolon => ';',
            KeyCode::Quote => '\'',
            _ => return None,
        };
        Self::from_char(c)
    }
}
