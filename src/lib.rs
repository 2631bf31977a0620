// ============================================================================
// FILE: src/lib.rs - Library Root
// ============================================================================
pub mod assets;
pub mod engine;
pub mod errors;
pub mod game;
pub mod input;
pub mod renderer;
pub mod scripting;
pub mod vfs;

pub use engine::TentacleEngine;
pub use errors::TentacleError;
pub use game::{Game, Settings};
pub use scripting::LuaState;
pub use vfs::VirtualFs;
