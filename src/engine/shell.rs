// src/engine/shell.rs - settings, assets and scripts stepped without a window
use std::rc::Rc;
use std::time::{Duration, Instant};
use winit::event::VirtualKeyCode;

use crate::{
    assets::{ManifestAssetStore, RefreshReport},
    errors::TentacleError,
    game::{Game, Settings, SETTINGS_PATH},
    input::InputSnapshot,
    renderer::FrameCommands,
    vfs::VirtualFs,
};
use super::FrameTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Running,
    /// F2 re-read the settings; the window should follow them.
    Reloaded,
    Quit,
}

/// Everything the frame loop does that does not touch the window or GPU.
pub struct Shell {
    vfs: Rc<VirtualFs>,
    settings: Settings,
    assets: ManifestAssetStore,
    game: Game,

    timer: FrameTimer,
    last_poll: Instant,
    last_poll_error: Option<String>,
}

impl Shell {
    pub fn new(vfs: Rc<VirtualFs>, now: Instant) -> Result<Self, TentacleError> {
        let settings = Settings::load(&vfs, SETTINGS_PATH).unwrap_or_else(|e| {
            log::error!("{}; starting with default settings", e);
            Settings::default()
        });

        let assets = ManifestAssetStore::load(&vfs, &settings.manifest_path).unwrap_or_else(|e| {
            log::error!("Could not load {}: {}", settings.manifest_path, e);
            ManifestAssetStore::empty(settings.manifest_path.as_str())
        });

        let game = Game::new(vfs.clone(), &settings)?;

        let mut shell = Self {
            vfs,
            timer: FrameTimer::new(settings.frames_per_second, now),
            settings,
            assets,
            game,
            last_poll: now,
            last_poll_error: None,
        };
        shell.force_reload(now);
        Ok(shell)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn assets(&self) -> &ManifestAssetStore {
        &self.assets
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        self.timer.tick(now)
    }

    /// Re-reads settings and the manifest, then restarts the scripts on the
    /// next frame.
    pub fn force_reload(&mut self, now: Instant) {
        match Settings::load(&self.vfs, SETTINGS_PATH) {
            Ok(settings) => self.settings = settings,
            Err(e) => log::error!("{}; keeping previous settings", e),
        }

        self.assets.set_manifest_path(&self.settings.manifest_path);
        match self.assets.refresh(&self.vfs, &mut self.game) {
            Ok(report) => log::debug!("Manifest refresh: {:?}", report),
            Err(e) => log::error!("Manifest reload failed, keeping previous assets: {}", e),
        }

        if self.timer.frames_per_second() != self.settings.frames_per_second {
            log::info!(
                "Frame rate changed from {} to {}",
                self.timer.frames_per_second(),
                self.settings.frames_per_second
            );
            self.timer = FrameTimer::new(self.settings.frames_per_second, now);
        }

        self.game.force_reload();
    }

    /// Runs one frame. Escape stops before the scripts see it.
    pub fn frame(&mut self, delta_time: Duration, now: Instant, input: &InputSnapshot) -> FrameStatus {
        if input.just_pressed.contains(&VirtualKeyCode::Escape) {
            log::info!("Stopped looping because escape pressed.");
            return FrameStatus::Quit;
        }

        let mut status = FrameStatus::Running;
        if input.just_pressed.contains(&VirtualKeyCode::F2) {
            self.force_reload(now);
            status = FrameStatus::Reloaded;
        }

        self.poll_assets(now);

        if self.game.reload_pending() {
            if let Err(e) = self.game.reset(&self.settings, &self.assets) {
                log::error!("Could not reset the game: {}", e);
            }
        }

        self.game.update(delta_time, input);
        status
    }

    pub fn take_frame(&mut self) -> FrameCommands {
        self.game.take_frame()
    }

    /// Refreshes the store once `reloadPollMs` has passed since the last
    /// poll. Returns the report when a poll ran and succeeded.
    pub fn poll_assets(&mut self, now: Instant) -> Option<RefreshReport> {
        let interval = self.settings.reload_poll_ms;
        if interval == 0 || now.saturating_duration_since(self.last_poll) < Duration::from_millis(interval) {
            return None;
        }
        self.last_poll = now;

        match self.assets.refresh(&self.vfs, &mut self.game) {
            Ok(report) => {
                self.last_poll_error = None;
                if !report.is_empty() {
                    log::info!(
                        "Hot reload: {} added, {} changed, {} ignored, {} removed",
                        report.added.len(),
                        report.reloaded.len(),
                        report.rejected.len(),
                        report.destroyed.len()
                    );
                    self.game.sync_assets(&self.assets);
                }
                Some(report)
            }
            Err(e) => {
                let message = e.to_string();
                if self.last_poll_error.as_deref() != Some(message.as_str()) {
                    log::warn!("Asset poll failed: {}", message);
                    self.last_poll_error = Some(message);
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::test_support::write_file;

    const MANIFEST: &str = r#"return {
        ["main.lua"] = "scripts/main.lua",
        level = "data/level.txt",
    }"#;

    const MAIN: &str = "version = 1 ticks = 0 function update() ticks = ticks + 1 end";

    fn setup(settings: &str) -> (tempfile::TempDir, Instant, Shell) {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "settings.lua", settings);
        write_file(dir.path(), "manifest.lua", MANIFEST);
        write_file(dir.path(), "scripts/main.lua", MAIN);
        write_file(dir.path(), "data/level.txt", "####");

        let mut vfs = VirtualFs::new();
        vfs.mount(dir.path(), true).unwrap();

        let start = Instant::now();
        let mut shell = Shell::new(Rc::new(vfs), start).unwrap();
        // First frame brings the scripts up.
        let status = shell.frame(Duration::from_millis(16), start, &InputSnapshot::default());
        assert_eq!(status, FrameStatus::Running);
        assert!(shell.game().is_ready());
        (dir, start, shell)
    }

    fn pressed(key: VirtualKeyCode) -> InputSnapshot {
        let mut input = InputSnapshot::default();
        input.down.insert(key);
        input.just_pressed.insert(key);
        input
    }

    #[test]
    fn polls_wait_for_the_interval() {
        let (dir, start, mut shell) = setup("reloadPollMs = 100");
        write_file(dir.path(), "scripts/main.lua", "version = 2 function update() end");

        assert!(shell.poll_assets(start + Duration::from_millis(50)).is_none());
        assert!(!shell.game().reload_pending());

        let report = shell.poll_assets(start + Duration::from_millis(100)).unwrap();
        assert_eq!(report.reloaded, vec!["main.lua".to_string()]);
        assert!(shell.game().reload_pending());

        // The interval restarts from the last poll.
        assert!(shell.poll_assets(start + Duration::from_millis(150)).is_none());
    }

    #[test]
    fn zero_interval_turns_polling_off() {
        let (dir, start, mut shell) = setup("reloadPollMs = 0");
        write_file(dir.path(), "scripts/main.lua", "version = 2 function update() end");

        assert!(shell.poll_assets(start + Duration::from_secs(60)).is_none());
        shell.frame(Duration::from_millis(16), start + Duration::from_secs(61), &InputSnapshot::default());
        assert_eq!(shell.game().lua_state().get_int("version", 0), 1);
    }

    #[test]
    fn broken_settings_keep_the_previous_ones() {
        let (dir, start, mut shell) = setup("name = 'Before' width = 320");
        write_file(dir.path(), "settings.lua", "width = ");

        shell.force_reload(start);
        assert_eq!(shell.settings().name, "Before");
        assert_eq!(shell.settings().width, 320);
    }

    #[test]
    fn frame_rate_change_rebuilds_the_timer() {
        let (dir, start, mut shell) = setup("framesPerSecond = 30");
        assert_eq!(shell.timer().frames_per_second(), 30);

        write_file(dir.path(), "settings.lua", "framesPerSecond = 50");
        let later = start + Duration::from_secs(1);
        shell.force_reload(later);

        assert_eq!(shell.timer().frames_per_second(), 50);
        assert_eq!(shell.timer().frame_duration(), Duration::from_millis(20));
        assert_eq!(shell.timer().next_deadline(), later);
    }

    #[test]
    fn data_changes_reach_scripts_without_a_restart() {
        let (dir, start, mut shell) = setup("reloadPollMs = 10");
        write_file(
            dir.path(),
            "manifest.lua",
            r#"return {
                ["main.lua"] = "scripts/main.lua",
                level = "data/level.txt",
                extra = "data/extra.txt",
            }"#,
        );
        write_file(dir.path(), "data/extra.txt", "more");

        let report = shell.poll_assets(start + Duration::from_millis(10)).unwrap();
        assert_eq!(report.added, vec!["extra".to_string()]);
        assert!(!shell.game().reload_pending());

        let state = shell.game().lua_state();
        assert!(state.do_string("assert(assets.read('extra') == 'more')"));
        assert_eq!(state.get_int("ticks", 0), 1);
    }

    #[test]
    fn pending_reload_restarts_scripts_before_update() {
        let (dir, start, mut shell) = setup("reloadPollMs = 10");
        write_file(
            dir.path(),
            "scripts/main.lua",
            "version = 2 ticks = 0 function update() ticks = ticks + 1 end",
        );

        let now = start + Duration::from_millis(10);
        shell.frame(Duration::from_millis(16), now, &InputSnapshot::default());

        let state = shell.game().lua_state();
        assert_eq!(state.get_int("version", 0), 2);
        assert_eq!(state.get_int("ticks", 0), 1);
        assert!(!shell.game().reload_pending());
    }

    #[test]
    fn escape_quits_before_scripts_run() {
        let (_dir, start, mut shell) = setup("");
        let status = shell.frame(Duration::from_millis(16), start, &pressed(VirtualKeyCode::Escape));

        assert_eq!(status, FrameStatus::Quit);
        assert_eq!(shell.game().lua_state().get_int("ticks", 0), 1);
    }

    #[test]
    fn f2_reloads_settings_and_scripts() {
        let (dir, start, mut shell) = setup("name = 'Old'");
        write_file(dir.path(), "settings.lua", "name = 'New' width = 200");
        assert!(shell.game().lua_state().do_string("ticks = 40"));

        let status = shell.frame(Duration::from_millis(16), start, &pressed(VirtualKeyCode::F2));

        assert_eq!(status, FrameStatus::Reloaded);
        assert_eq!(shell.settings().name, "New");
        assert_eq!(shell.settings().width, 200);
        // A fresh state ran one update.
        assert_eq!(shell.game().lua_state().get_int("ticks", 0), 1);
    }
}
