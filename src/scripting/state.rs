// src/scripting/state.rs
use mlua::{AppDataRef, AppDataRefMut, Error as LuaError, FromLuaMulti, Function, IntoLuaMulti, Lua, Value};
use crate::{
    errors::TentacleError,
    vfs::{AssetFile, VirtualFs},
};

const XPCALL_KEY: &str = "tentacle.xpcall";

/// Identity of the wrapper that owns an interpreter, kept in its app data.
#[derive(Debug, Clone)]
pub struct StateTag(pub String);

/// A named Lua interpreter that can be torn down and rebuilt in place.
///
/// Chunks run under `xpcall` with `debug.traceback` as the message handler,
/// so a failing script reports its stack instead of just the message. A
/// failure never poisons the state: the caller gets `false` and can keep
/// using it or `reset` it.
pub struct LuaState {
    name: String,
    lua: Lua,
}

impl LuaState {
    pub fn new(name: &str) -> Result<Self, TentacleError> {
        let lua = Self::build(name)?;
        log::debug!("[LUASTATE|{}] Fresh interpreter", name);
        Ok(Self {
            name: name.to_string(),
            lua,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Drops the interpreter and everything bound into it.
    pub fn reset(&mut self) -> Result<(), TentacleError> {
        self.lua = Self::build(&self.name)?;
        log::debug!("[LUASTATE|{}] Fresh interpreter", self.name);
        Ok(())
    }

    fn build(name: &str) -> Result<Lua, TentacleError> {
        // The full library set includes `debug`, which the traceback handler needs.
        let lua = unsafe { Lua::unsafe_new() };
        lua.set_app_data(StateTag(name.to_string()));
        {
            let xpcall: Function = lua.globals().get("xpcall")?;
            lua.set_named_registry_value(XPCALL_KEY, xpcall)?;
        }
        Ok(lua)
    }

    pub fn do_string(&self, source: &str) -> bool {
        match self.lua.load(source).set_name(source).into_function() {
            Ok(chunk) => self.run_protected(chunk),
            Err(e) => {
                self.report(&compile_message(&e));
                false
            }
        }
    }

    pub fn do_file(&self, vfs: &VirtualFs, path: &str) -> bool {
        let mut file = AssetFile::new(path);
        match file.load_into_buffer(vfs) {
            Ok(true) => {}
            Ok(false) => {
                self.report(&format!("cannot open {}", path));
                return false;
            }
            Err(e) => {
                self.report(&format!("cannot read {}: {}", path, e));
                return false;
            }
        }

        match self
            .lua
            .load(file.buffer())
            .set_name(format!("@{}", path))
            .into_function()
        {
            Ok(chunk) => self.run_protected(chunk),
            Err(e) => {
                self.report(&compile_message(&e));
                false
            }
        }
    }

    /// Runs a file and hands back what it returns, failing loudly.
    pub fn eval_file<'lua, R>(&'lua self, vfs: &VirtualFs, path: &str) -> Result<R, TentacleError>
    where
        R: FromLuaMulti<'lua>,
    {
        let source = vfs.read(path)?;
        let value = self
            .lua
            .load(source)
            .set_name(format!("@{}", path))
            .eval::<R>()?;
        Ok(value)
    }

    /// Reads a global as text. Numbers are converted the way `tostring` does.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        let value = match self.lua.globals().get::<_, Value>(key) {
            Ok(value @ (Value::String(_) | Value::Integer(_) | Value::Number(_))) => value,
            _ => return default.to_string(),
        };

        match self.lua.coerce_string(value) {
            Ok(Some(s)) => s.to_string_lossy().into_owned(),
            _ => default.to_string(),
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.lua.globals().get::<_, Value>(key) {
            Ok(Value::Integer(i)) => i,
            Ok(Value::Number(n)) if n.is_finite() => n as i64,
            Ok(Value::String(s)) => {
                let text = s.to_string_lossy();
                let text = text.trim();
                text.parse::<i64>()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n as i64))
                    .unwrap_or(default)
            }
            _ => default,
        }
    }

    pub fn collect_garbage(&self) {
        if let Err(e) = self.lua.gc_collect() {
            log::warn!("[LUASTATE|{}] Garbage collection failed: {}", self.name, e);
        }
    }

    /// Makes `value` reachable from any callback running in this state.
    /// One value per type; a second injection replaces the first.
    pub fn inject_into_registry<T: 'static>(&self, value: T) {
        self.lua.set_app_data(value);
    }

    pub fn from_registry<T: 'static>(lua: &Lua) -> Option<AppDataRef<T>> {
        lua.app_data_ref::<T>()
    }

    pub fn from_registry_mut<T: 'static>(lua: &Lua) -> Option<AppDataRefMut<T>> {
        lua.app_data_mut::<T>()
    }

    /// Binds a Rust function as a global of this state.
    pub fn register<'lua, A, R, F>(&'lua self, name: &str, func: F) -> Result<(), TentacleError>
    where
        A: FromLuaMulti<'lua>,
        R: IntoLuaMulti<'lua>,
        F: Fn(&'lua Lua, A) -> mlua::Result<R> + 'static,
    {
        let function = self.lua.create_function(func)?;
        self.lua.globals().set(name, function)?;
        Ok(())
    }

    /// Name of the wrapper owning `lua`, for messages raised from callbacks.
    pub fn wrapper_name(lua: &Lua) -> String {
        Self::from_registry::<StateTag>(lua)
            .map(|tag| tag.0.clone())
            .unwrap_or_else(|| "?".to_string())
    }

    fn run_protected(&self, chunk: Function) -> bool {
        let Some(handler) = self.traceback_handler() else {
            return match chunk.call::<_, ()>(()) {
                Ok(()) => true,
                Err(e) => {
                    self.report(&e.to_string());
                    false
                }
            };
        };

        let xpcall: Function = match self.lua.named_registry_value(XPCALL_KEY) {
            Ok(xpcall) => xpcall,
            Err(e) => {
                self.report(&format!("xpcall unavailable: {}", e));
                return false;
            }
        };

        match xpcall.call::<_, (bool, Value)>((chunk, handler)) {
            Ok((true, _)) => true,
            Ok((false, message)) => {
                self.report(&describe_value(&message));
                false
            }
            Err(e) => {
                self.report(&e.to_string());
                false
            }
        }
    }

    fn traceback_handler(&self) -> Option<Function> {
        let debug = match self.lua.globals().get::<_, Value>("debug") {
            Ok(Value::Table(debug)) => debug,
            _ => {
                log::warn!("[LUASTATE|{}] Debug library not loaded. Couldn't get stack trace", self.name);
                return None;
            }
        };

        match debug.get::<_, Value>("traceback") {
            Ok(Value::Function(traceback)) => Some(traceback),
            _ => {
                log::warn!(
                    "[LUASTATE|{}] debug.traceback is missing. Has the debug table been overridden?",
                    self.name
                );
                None
            }
        }
    }

    fn report(&self, message: &str) {
        log::error!("[LUASTATE|{}] Error: {}", self.name, message);
    }
}

fn compile_message(err: &LuaError) -> String {
    match err {
        LuaError::SyntaxError { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string_lossy().into_owned(),
        Value::Error(e) => e.to_string(),
        Value::Nil => "nil".to_string(),
        other => format!("(error object is a {} value)", other.type_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::test_support::write_file;

    #[test]
    fn do_string_runs_and_reports_failure() {
        let state = LuaState::new("Test").unwrap();
        assert!(state.do_string("answer = 6 * 7"));
        assert_eq!(state.get_int("answer", 0), 42);

        assert!(!state.do_string("this is not lua"));
        assert!(!state.do_string("error('boom')"));
        assert!(!state.do_string("local t = nil; return t.field"));

        // Still usable after errors.
        assert!(state.do_string("answer = answer + 1"));
        assert_eq!(state.get_int("answer", 0), 43);
    }

    #[test]
    fn failure_without_debug_library_still_returns_false() {
        let state = LuaState::new("Test").unwrap();
        assert!(state.do_string("debug = nil"));
        assert!(!state.do_string("error('no traceback')"));
        assert!(state.do_string("ok = true"));
    }

    #[test]
    fn typed_global_reads_fall_back_to_defaults() {
        let state = LuaState::new("Test").unwrap();
        assert!(state.do_string(
            "name = 'Squid' width = 320.9 height = '200' flag = true count = 12"
        ));

        assert_eq!(state.get_string("name", "x"), "Squid");
        assert_eq!(state.get_string("count", "x"), "12");
        assert_eq!(state.get_string("missing", "fallback"), "fallback");
        assert_eq!(state.get_string("flag", "fallback"), "fallback");

        assert_eq!(state.get_int("width", 0), 320);
        assert_eq!(state.get_int("height", 0), 200);
        assert_eq!(state.get_int("name", 7), 7);
        assert_eq!(state.get_int("missing", -1), -1);
    }

    #[test]
    fn numbers_read_as_strings_match_tostring() {
        let state = LuaState::new("Test").unwrap();
        assert!(state.do_string("ratio = 3.0 big = 1e100 small = 0.5"));

        assert_eq!(state.get_string("ratio", ""), "3.0");
        assert_eq!(state.get_string("big", ""), "1e+100");
        assert_eq!(state.get_string("small", ""), "0.5");
    }

    #[test]
    fn new_state_is_ready_for_protected_calls() {
        let state = LuaState::new("Fresh").unwrap();
        let lua = state.lua();
        let xpcall: Function = lua.named_registry_value(XPCALL_KEY).unwrap();
        let chunk = lua.load("error('x')").into_function().unwrap();
        let handler = lua.create_function(|_, message: String| Ok(message)).unwrap();
        let (ok, _): (bool, Value) = xpcall.call((chunk, handler)).unwrap();
        assert!(!ok);
        assert_eq!(LuaState::wrapper_name(state.lua()), "Fresh");
        assert!(state.do_string("assert(type(debug.traceback) == 'function')"));
    }

    #[test]
    fn reset_discards_globals_but_keeps_identity() {
        let mut state = LuaState::new("Game").unwrap();
        assert!(state.do_string("leftover = 1"));
        state.reset().unwrap();

        assert_eq!(state.get_int("leftover", 0), 0);
        assert_eq!(LuaState::wrapper_name(state.lua()), "Game");
    }

    #[test]
    fn callbacks_reach_injected_objects() {
        struct Counter(u32);

        let state = LuaState::new("Test").unwrap();
        state.inject_into_registry(Counter(0));
        let bump = state
            .lua()
            .create_function(|lua, ()| {
                if let Some(mut counter) = LuaState::from_registry_mut::<Counter>(lua) {
                    counter.0 += 1;
                }
                Ok(LuaState::wrapper_name(lua))
            })
            .unwrap();
        state.lua().globals().set("bump", bump).unwrap();

        assert!(state.do_string("owner = bump() bump()"));
        assert_eq!(LuaState::from_registry::<Counter>(state.lua()).unwrap().0, 2);
        assert_eq!(state.get_string("owner", ""), "Test");
    }

    #[test]
    fn registered_functions_are_globals() {
        let state = LuaState::new("Test").unwrap();
        state
            .register("add", |_, (a, b): (i64, i64)| Ok(a + b))
            .unwrap();
        state
            .register("whoami", |lua, ()| Ok(LuaState::wrapper_name(lua)))
            .unwrap();

        assert!(state.do_string("sum = add(2, 3) me = whoami()"));
        assert_eq!(state.get_int("sum", 0), 5);
        assert_eq!(state.get_string("me", ""), "Test");
        assert!(!state.do_string("add('x', 1)"));
    }

    #[test]
    fn do_file_reads_through_the_vfs() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "scripts/main.lua", "loaded = 'yes'");
        write_file(dir.path(), "scripts/broken.lua", "function (");
        let mut vfs = VirtualFs::new();
        vfs.mount(dir.path(), true).unwrap();

        let state = LuaState::new("Test").unwrap();
        assert!(state.do_file(&vfs, "scripts/main.lua"));
        assert_eq!(state.get_string("loaded", "no"), "yes");
        assert!(!state.do_file(&vfs, "scripts/broken.lua"));
        assert!(!state.do_file(&vfs, "scripts/absent.lua"));

        let value: i64 = {
            write_file(dir.path(), "value.lua", "return 5");
            state.eval_file(&vfs, "value.lua").unwrap()
        };
        assert_eq!(value, 5);
    }
}
