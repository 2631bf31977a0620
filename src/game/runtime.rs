// src/game/runtime.rs
use std::rc::Rc;
use std::time::Duration;
use crate::{
    assets::{Asset, AssetKind, AssetOwner, ManifestAssetStore},
    errors::TentacleError,
    input::InputSnapshot,
    renderer::FrameCommands,
    scripting::LuaState,
    vfs::VirtualFs,
};
use super::{
    bindings::{self, ScriptContext},
    Settings,
};

pub struct Game {
    lua_state: LuaState,
    vfs: Rc<VirtualFs>,
    reload_count: u32,
    ready: bool,
    on_update: String,
    view: (u32, u32),
}

impl Game {
    pub fn new(vfs: Rc<VirtualFs>, settings: &Settings) -> Result<Self, TentacleError> {
        let lua_state = LuaState::new("Game")?;
        let game = Self {
            lua_state,
            vfs,
            reload_count: 0,
            ready: false,
            on_update: settings.on_update.clone(),
            view: (settings.width, settings.height),
        };
        game.bind(&ManifestAssetStore::empty(settings.manifest_path.as_str()))?;
        Ok(game)
    }

    fn bind(&self, store: &ManifestAssetStore) -> Result<(), TentacleError> {
        let context = ScriptContext::new(self.vfs.clone(), store.index(), self.view);
        bindings::bind(&self.lua_state, context)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn force_reload(&mut self) {
        self.reload_count += 1;
    }

    pub fn reload_pending(&self) -> bool {
        self.reload_count > 0
    }

    pub fn lua_state(&self) -> &LuaState {
        &self.lua_state
    }

    /// Rebuilds the interpreter and runs the main script from scratch.
    pub fn reset(&mut self, settings: &Settings, store: &ManifestAssetStore) -> Result<(), TentacleError> {
        log::info!("Going to reload the lua state.");
        self.reload_count = 0;
        self.ready = false;
        self.on_update = settings.on_update.clone();
        self.view = (settings.width, settings.height);

        self.lua_state.reset()?;
        self.bind(store)?;

        let main_script_name = settings.main_script.as_str();
        let Some(main_script) = store.get_asset_by_name(main_script_name) else {
            log::error!(
                "Main script [{}], defined in settings.lua, does not exist in asset store.",
                main_script_name
            );
            return Ok(());
        };

        log::info!("Running main script {} ({})", main_script_name, main_script.path());
        if self.lua_state.do_file(&self.vfs, main_script.path()) {
            log::info!("Reload success");
            self.ready = true;
        } else {
            log::error!("Reload failed. Press F2 to reload.");
        }
        Ok(())
    }

    /// Publishes the store's current name to path table to scripts.
    pub fn sync_assets(&self, store: &ManifestAssetStore) {
        if let Some(mut context) = LuaState::from_registry_mut::<ScriptContext>(self.lua_state.lua()) {
            context.assets = store.index();
        }
    }

    pub fn set_view(&mut self, width: u32, height: u32) {
        self.view = (width, height);
        if let Some(mut context) = LuaState::from_registry_mut::<ScriptContext>(self.lua_state.lua()) {
            context.view = self.view;
        }
    }

    pub fn update(&mut self, delta_time: Duration, input: &InputSnapshot) {
        if !self.ready {
            return;
        }

        if let Some(mut context) = LuaState::from_registry_mut::<ScriptContext>(self.lua_state.lua()) {
            let delta = delta_time.as_secs_f64();
            context.delta = delta;
            context.elapsed += delta;
            context.frame += 1;
            context.input = input.clone();
            context.commands.rects.clear();
        }

        if !self.lua_state.do_string(&self.on_update) {
            log::error!("Press F2 to reload.");
            self.ready = false;
        }

        // Force a full collect each frame
        self.lua_state.collect_garbage();
    }

    /// Hands over what the scripts drew since the last call.
    pub fn take_frame(&mut self) -> FrameCommands {
        match LuaState::from_registry_mut::<ScriptContext>(self.lua_state.lua()) {
            Some(mut context) => FrameCommands {
                clear_color: context.commands.clear_color,
                rects: std::mem::take(&mut context.commands.rects),
            },
            None => FrameCommands::default(),
        }
    }
}

impl AssetOwner for Game {
    fn on_asset_reload(&mut self, asset: &Asset) -> bool {
        if asset.kind() != AssetKind::Script {
            return false;
        }
        log::info!("Script asset should be reloaded: [{}]", asset.name());
        self.reload_count += 1;
        true
    }

    fn on_asset_destroyed(&mut self, asset: &Asset) {
        // Losing a script means the state no longer matches the manifest.
        if asset.kind() == AssetKind::Script {
            self.reload_count += 1;
        }
    }
}
