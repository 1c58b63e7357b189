/// Master clock of the console in T-cycles per second.
pub const CPU_CLOCK_HZ: u32 = 4_194_304;

/// T-cycles in one complete video frame (154 lines of 456 cycles).
pub const CYCLES_PER_FRAME: u32 = 70_224;

pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
/// Console model being emulated.
///
/// Selects the post-boot register state, the palette model used by the PPU
/// and whether the banked VRAM/WRAM registers are live.
pub enum Model {
    #[default]
    Dmg,
    Cgb,
}

impl Model {
    #[inline]
    pub const fn is_cgb(self) -> bool {
        matches!(self, Model::Cgb)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
/// How the model is chosen when an image is loaded.
pub enum ModelPreference {
    /// Use color mode when the cartridge header advertises support.
    #[default]
    Auto,
    ForceDmg,
    ForceCgb,
}

impl ModelPreference {
    /// Resolves the preference against the header's color-support flag.
    pub const fn resolve(self, cgb_supported: bool) -> Model {
        match self {
            ModelPreference::Auto => {
                if cgb_supported {
                    Model::Cgb
                } else {
                    Model::Dmg
                }
            }
            ModelPreference::ForceDmg => Model::Dmg,
            ModelPreference::ForceCgb => Model::Cgb,
        }
    }
}
