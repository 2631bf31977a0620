// src/scripting/mod.rs
pub mod state;

pub use state::{LuaState, StateTag};
