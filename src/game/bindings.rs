// src/game/bindings.rs - the Lua API every game state gets
use std::collections::HashMap;
use std::rc::Rc;
use mlua::{Error as LuaError, Lua, Result as LuaResult, Value, Variadic};
use winit::event::VirtualKeyCode;
use crate::{
    errors::TentacleError,
    input::{key_from_name, mouse_button_from_name, InputSnapshot},
    renderer::FrameCommands,
    scripting::LuaState,
    vfs::VirtualFs,
};

/// Host-side state that script callbacks read and write, stored in the
/// interpreter's registry.
pub struct ScriptContext {
    pub vfs: Rc<VirtualFs>,
    pub assets: HashMap<String, String>,
    pub input: InputSnapshot,
    pub delta: f64,
    pub elapsed: f64,
    pub frame: u64,
    pub view: (u32, u32),
    pub commands: FrameCommands,
}

impl ScriptContext {
    pub fn new(vfs: Rc<VirtualFs>, assets: HashMap<String, String>, view: (u32, u32)) -> Self {
        Self {
            vfs,
            assets,
            input: InputSnapshot::default(),
            delta: 0.0,
            elapsed: 0.0,
            frame: 0,
            view,
            commands: FrameCommands::default(),
        }
    }
}

pub fn bind(state: &LuaState, context: ScriptContext) -> Result<(), TentacleError> {
    state.inject_into_registry(context);

    let lua = state.lua();
    let globals = lua.globals();

    state.register("LoadLibrary", load_library)?;

    let time = lua.create_table()?;
    time.set("delta", lua.create_function(|lua, ()| with_context(lua, |c| c.delta))?)?;
    time.set("elapsed", lua.create_function(|lua, ()| with_context(lua, |c| c.elapsed))?)?;
    time.set("frame", lua.create_function(|lua, ()| with_context(lua, |c| c.frame))?)?;
    globals.set("time", time)?;

    let input = lua.create_table()?;
    input.set(
        "is_down",
        lua.create_function(|lua, name: String| {
            let key = parse_key(&name)?;
            with_context(lua, |c| c.input.down.contains(&key))
        })?,
    )?;
    input.set(
        "just_pressed",
        lua.create_function(|lua, name: String| {
            let key = parse_key(&name)?;
            with_context(lua, |c| c.input.just_pressed.contains(&key))
        })?,
    )?;
    input.set(
        "just_released",
        lua.create_function(|lua, name: String| {
            let key = parse_key(&name)?;
            with_context(lua, |c| c.input.just_released.contains(&key))
        })?,
    )?;
    input.set(
        "mouse",
        lua.create_function(|lua, ()| {
            with_context(lua, |c| (c.input.mouse_position.x, c.input.mouse_position.y))
        })?,
    )?;
    input.set(
        "mouse_down",
        lua.create_function(|lua, name: String| {
            let button = mouse_button_from_name(&name)
                .ok_or_else(|| LuaError::RuntimeError(format!("unknown mouse button '{}'", name)))?;
            with_context(lua, |c| c.input.mouse_buttons.contains(&button))
        })?,
    )?;
    input.set(
        "scroll",
        lua.create_function(|lua, ()| {
            with_context(lua, |c| (c.input.scroll_delta.x, c.input.scroll_delta.y))
        })?,
    )?;
    globals.set("input", input)?;

    let gfx = lua.create_table()?;
    gfx.set(
        "clear",
        lua.create_function(|lua, (r, g, b, a): (f32, f32, f32, Option<f32>)| {
            with_context_mut(lua, |c| c.commands.set_clear_color([r, g, b, a.unwrap_or(1.0)]))
        })?,
    )?;
    gfx.set(
        "rect",
        lua.create_function(
            |lua, (x, y, w, h, r, g, b, a): (f32, f32, f32, f32, f32, f32, f32, Option<f32>)| {
                with_context_mut(lua, |c| c.commands.push_rect(x, y, w, h, [r, g, b, a.unwrap_or(1.0)]))
            },
        )?,
    )?;
    gfx.set("size", lua.create_function(|lua, ()| with_context(lua, |c| c.view))?)?;
    globals.set("gfx", gfx)?;

    let assets = lua.create_table()?;
    assets.set(
        "exists",
        lua.create_function(|lua, name: String| with_context(lua, |c| c.assets.contains_key(&name)))?,
    )?;
    assets.set(
        "path",
        lua.create_function(|lua, name: String| with_context(lua, |c| c.assets.get(&name).cloned()))?,
    )?;
    assets.set(
        "read",
        lua.create_function(|lua, name: String| {
            let bytes = read_asset(lua, &name)?;
            lua.create_string(&bytes)
        })?,
    )?;
    globals.set("assets", assets)?;

    Ok(())
}

/// `LoadLibrary(name)`: runs another script asset inside the calling state.
fn load_library<'lua>(lua: &'lua Lua, args: Variadic<Value<'lua>>) -> LuaResult<()> {
    // Numbers are accepted as names, the way Lua coerces them to strings.
    let name = match (args.len(), args.first()) {
        (1, Some(value @ (Value::String(_) | Value::Integer(_) | Value::Number(_)))) => {
            lua.coerce_string(value.clone())?
        }
        _ => None,
    };
    let name = match name {
        Some(name) => name.to_str()?.to_string(),
        None => {
            return Err(LuaError::RuntimeError(
                "Load Library: library name expected.".to_string(),
            ))
        }
    };

    log::info!("[LUASTATE|{}] Requested loading:[{}]", LuaState::wrapper_name(lua), name);

    let path = with_context(lua, |c| c.assets.get(&name).cloned())?
        .ok_or_else(|| LuaError::RuntimeError(format!("Load Library: no asset named [{}]", name)))?;
    let bytes = read_asset(lua, &name)?;

    lua.load(&bytes[..]).set_name(format!("@{}", path)).exec()
}

fn read_asset(lua: &Lua, name: &str) -> LuaResult<Vec<u8>> {
    let (vfs, path) = with_context(lua, |c| (c.vfs.clone(), c.assets.get(name).cloned()))?;
    let path = path.ok_or_else(|| LuaError::RuntimeError(format!("no asset named [{}]", name)))?;
    vfs.read(&path)
        .map_err(|e| LuaError::RuntimeError(e.to_string()))
}

fn parse_key(name: &str) -> LuaResult<VirtualKeyCode> {
    key_from_name(name).ok_or_else(|| LuaError::RuntimeError(format!("unknown key '{}'", name)))
}

fn with_context<R>(lua: &Lua, f: impl FnOnce(&ScriptContext) -> R) -> LuaResult<R> {
    let context = LuaState::from_registry::<ScriptContext>(lua)
        .ok_or_else(|| LuaError::RuntimeError("script context is not bound".to_string()))?;
    Ok(f(&context))
}

fn with_context_mut<R>(lua: &Lua, f: impl FnOnce(&mut ScriptContext) -> R) -> LuaResult<R> {
    let mut context = LuaState::from_registry_mut::<ScriptContext>(lua)
        .ok_or_else(|| LuaError::RuntimeError("script context is not bound".to_string()))?;
    Ok(f(&mut context))
}
