use gbc_emu_core::{apu::DEFAULT_BUFFER_LEN, hardware::ModelPreference};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmulationMode {
    #[default]
    Auto,
    ForceDmg,
    ForceCgb,
}

impl From<EmulationMode> for ModelPreference {
    fn from(mode: EmulationMode) -> Self {
        match mode {
            EmulationMode::Auto => ModelPreference::Auto,
            EmulationMode::ForceDmg => ModelPreference::ForceDmg,
            EmulationMode::ForceCgb => ModelPreference::ForceCgb,
        }
    }
}

/// Defaults for the headless runner. Any field missing from the file keeps
/// its default; command-line flags win over both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CliConfig {
    pub emulation_mode: EmulationMode,
    pub strict_header: bool,
    /// Frames to run when neither `--frames` nor `--cycles` is given.
    pub frames: u64,
    pub sample_buffer_len: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            emulation_mode: EmulationMode::Auto,
            strict_header: false,
            frames: 60,
            sample_buffer_len: DEFAULT_BUFFER_LEN,
        }
    }
}

pub fn default_cli_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("gbc-emu").join("cli.toml");
        }
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("gbc-emu").join("cli.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("gbc-emu")
            .join("cli.toml");
    }

    PathBuf::from("cli.toml")
}

/// Reads the config at `path`. A missing file silently yields defaults, an
/// unparsable one logs a warning first.
pub fn load_from_file(path: &Path) -> CliConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return CliConfig::default(),
    };

    match toml::from_str::<CliConfig>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to parse CLI config {}: {e}; using defaults",
                path.display()
            );
            CliConfig::default()
        }
    }
}
