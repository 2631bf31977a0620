// src/game/settings.rs
use crate::{
    errors::TentacleError,
    scripting::LuaState,
    vfs::VirtualFs,
};

pub const SETTINGS_PATH: &str = "settings.lua";

/// Startup configuration, read from `settings.lua` globals.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub manifest_path: String,
    pub main_script: String,
    pub on_update: String,
    pub frames_per_second: u32,
    /// Zero turns hot-reload polling off.
    pub reload_poll_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "Tentacle".to_string(),
            width: 640,
            height: 360,
            manifest_path: "manifest.lua".to_string(),
            main_script: "main.lua".to_string(),
            on_update: "update()".to_string(),
            frames_per_second: 60,
            reload_poll_ms: 1000,
        }
    }
}

impl Settings {
    pub fn load(vfs: &VirtualFs, path: &str) -> Result<Self, TentacleError> {
        let defaults = Settings::default();

        if !vfs.exists(path) {
            log::info!("No {} found, using default settings", path);
            return Ok(defaults);
        }

        let state = LuaState::new("Settings")?;
        if !state.do_file(vfs, path) {
            return Err(TentacleError::SettingsError(format!("{} failed to run", path)));
        }

        let settings = Settings {
            name: state.get_string("name", &defaults.name),
            width: positive(state.get_int("width", defaults.width as i64)),
            height: positive(state.get_int("height", defaults.height as i64)),
            manifest_path: state.get_string("manifestPath", &defaults.manifest_path),
            main_script: state.get_string("mainScript", &defaults.main_script),
            on_update: state.get_string("onUpdate", &defaults.on_update),
            frames_per_second: positive(state.get_int("framesPerSecond", defaults.frames_per_second as i64)),
            reload_poll_ms: state.get_int("reloadPollMs", defaults.reload_poll_ms as i64).max(0) as u64,
        };

        log::info!(
            "Settings: {} {}x{} @ {} fps, manifest {}, main script {}",
            settings.name,
            settings.width,
            settings.height,
            settings.frames_per_second,
            settings.manifest_path,
            settings.main_script
        );
        Ok(settings)
    }
}

fn positive(value: i64) -> u32 {
    value.clamp(1, u32::MAX as i64) as u32
}
