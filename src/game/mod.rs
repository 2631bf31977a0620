// src/game/mod.rs
pub mod bindings;
pub mod runtime;
pub mod settings;

pub use bindings::ScriptContext;
pub use runtime::Game;
pub use settings::{Settings, SETTINGS_PATH};
