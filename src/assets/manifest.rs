// src/assets/manifest.rs - reading manifest.lua
use mlua::{LuaSerdeExt, Table, Value};
use serde::Deserialize;
use crate::{errors::TentacleError, scripting::LuaState, vfs::VirtualFs};
use super::AssetKind;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub kind: Option<AssetKind>,
}

/// Evaluates a manifest script in a throwaway interpreter.
///
/// The script either returns its table or assigns it to the global
/// `manifest`. Entries are `name = "path"` pairs or tables with `name`,
/// `path` and an optional `kind`; a keyed table may leave out `name`.
pub fn read_manifest(vfs: &VirtualFs, manifest_path: &str) -> Result<Vec<ManifestEntry>, TentacleError> {
    let state = LuaState::new("Manifest")?;
    let returned: Value = state.eval_file(vfs, manifest_path)?;

    let table = match returned {
        Value::Table(table) => table,
        Value::Nil => match state.lua().globals().get::<_, Value>("manifest")? {
            Value::Table(table) => table,
            _ => {
                return Err(TentacleError::AssetError(format!(
                    "{} must return a table or set a global `manifest` table",
                    manifest_path
                )))
            }
        },
        other => {
            return Err(TentacleError::AssetError(format!(
                "{} returned a {} instead of a table",
                manifest_path,
                other.type_name()
            )))
        }
    };

    let mut entries = Vec::new();
    for pair in table.pairs::<Value, Value>() {
        let (key, value) = pair?;
        let entry = match (key, value) {
            (Value::String(name), Value::String(path)) => ManifestEntry {
                name: name.to_str()?.to_string(),
                path: path.to_str()?.to_string(),
                kind: None,
            },
            (key, Value::Table(fields)) => {
                fill_name_from_key(&key, &fields)?;
                state
                    .lua()
                    .from_value::<ManifestEntry>(Value::Table(fields))
                    .map_err(|e| {
                        TentacleError::AssetError(format!("Bad entry in {}: {}", manifest_path, e))
                    })?
            }
            (key, value) => {
                return Err(TentacleError::AssetError(format!(
                    "Bad entry in {}: {} key with {} value",
                    manifest_path,
                    key.type_name(),
                    value.type_name()
                )))
            }
        };
        entries.push(entry);
    }

    Ok(entries)
}

fn fill_name_from_key(key: &Value, fields: &Table) -> Result<(), TentacleError> {
    if let Value::String(name) = key {
        if !fields.contains_key("name")? {
            fields.set("name", name.clone())?;
        }
    }
    Ok(())
}
