use std::fmt;
use mlua::Error as LuaError;
use zip::result::ZipError;

#[derive(Debug)]
pub enum TentacleError {
    IoError(std::io::Error),
    RenderError(String),
    LuaError(LuaError),
    AssetError(String),
    ArchiveError(ZipError),
    SettingsError(String),
}

impl fmt::Display for TentacleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TentacleError::IoError(err) => write!(f, "IO Error: {}", err),
            TentacleError::RenderError(msg) => write!(f, "Render Error: {}", msg),
            TentacleError::LuaError(err) => write!(f, "Lua Error: {}", err),
            TentacleError::AssetError(msg) => write!(f, "Asset Error: {}", msg),
            TentacleError::ArchiveError(err) => write!(f, "Archive Error: {}", err),
            TentacleError::SettingsError(msg) => write!(f, "Settings Error: {}", msg),
        }
    }
}

impl std::error::Error for TentacleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TentacleError::IoError(err) => Some(err),
            TentacleError::LuaError(err) => Some(err),
            TentacleError::ArchiveError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TentacleError {
    fn from(err: std::io::Error) -> Self {
        TentacleError::IoError(err)
    }
}

impl From<LuaError> for TentacleError {
    fn from(err: LuaError) -> Self {
        TentacleError::LuaError(err)
    }
}

impl From<ZipError> for TentacleError {
    fn from(err: ZipError) -> Self {
        TentacleError::ArchiveError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_the_error_kind() {
        let err = TentacleError::AssetError("missing main.lua".to_string());
        assert_eq!(err.to_string(), "Asset Error: missing main.lua");

        let err: TentacleError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("IO Error:"));
    }
}
