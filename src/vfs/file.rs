// src/vfs/file.rs
use super::VirtualFs;
use crate::errors::TentacleError;

/// A named file pulled out of the virtual filesystem into memory.
#[derive(Debug, Clone)]
pub struct AssetFile {
    name: String,
    buffer: Vec<u8>,
    loaded: bool,
}

impl AssetFile {
    pub fn exists(vfs: &VirtualFs, name: &str) -> bool {
        vfs.exists(name)
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buffer: Vec::new(),
            loaded: false,
        }
    }

    /// Reads the whole file. Returns `Ok(false)` if no mount has it.
    pub fn load_into_buffer(&mut self, vfs: &VirtualFs) -> Result<bool, TentacleError> {
        if !vfs.exists(&self.name) {
            log::warn!("Asset file not found: {}", self.name);
            self.clear_buffer();
            return Ok(false);
        }

        self.buffer = vfs.read(&self.name)?;
        self.loaded = true;
        Ok(true)
    }

    pub fn set_buffer(&mut self, bytes: Vec<u8>) {
        self.buffer = bytes;
        self.loaded = true;
    }

    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
        self.loaded = false;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn as_str(&self) -> Result<&str, TentacleError> {
        std::str::from_utf8(&self.buffer)
            .map_err(|_| TentacleError::AssetError(format!("File is not valid UTF-8: {}", self.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::test_support::write_file;

    #[test]
    fn loads_and_clears_buffer() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "settings.lua", "width = 320");
        let mut vfs = VirtualFs::new();
        vfs.mount(dir.path(), true).unwrap();

        assert!(AssetFile::exists(&vfs, "settings.lua"));
        let mut file = AssetFile::new("settings.lua");
        assert!(!file.is_loaded());
        assert!(file.load_into_buffer(&vfs).unwrap());
        assert_eq!(file.size(), 11);
        assert_eq!(file.as_str().unwrap(), "width = 320");

        file.clear_buffer();
        assert_eq!(file.size(), 0);
        assert!(!file.is_loaded());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let vfs = VirtualFs::new();
        let mut file = AssetFile::new("nowhere.lua");
        assert!(!file.load_into_buffer(&vfs).unwrap());

        file.set_buffer(vec![0xff, 0xfe]);
        assert_eq!(file.buffer(), &[0xff, 0xfe]);
        assert!(file.as_str().is_err());
    }
}
